//! Database access layer.
//!
//! This module provides database access functionality:
//! - Connection provisioning (one connection per tool call)
//! - Parameter binding for catalog queries and routine arguments
//! - Identifier validation and quoting for generated SQL
//! - Type mappings from TDS values to JSON

pub mod connection;
pub mod identifier;
pub mod params;
pub mod types;

pub use connection::{Connection, ConnectionProvider, SqlConnectionFactory, TdsConnection, release};
pub use params::SqlParam;
pub use types::{RowRef, RowSet};
