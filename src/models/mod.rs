//! Data models for the SQL Server MCP Server.
//!
//! This module re-exports all model types used throughout the application.

pub mod result;
pub mod routine;
pub mod schema;

// Re-export commonly used types
pub use result::OperationResult;
pub use routine::{RoutineDocument, RoutineObject, RoutineParameter, RoutineSummary};
pub use schema::{
    ColumnInfo, ConstraintInfo, ForeignKeyInfo, IndexInfo, ResolvedTable, TableIdentity, TableRef,
    TableSchemaDocument,
};
