//! MCP server integration module.
//!
//! This module provides the integration between the MCP protocol and
//! the database tools using the rmcp framework.

pub mod registry;
pub mod service;

pub use registry::{DispatchResponse, ToolListing, ToolRegistry};
pub use service::MssqlService;
