//! MCP tool implementations.
//!
//! This module contains all database tool handlers:
//! - `list_tables`: List base tables as `schema.table`
//! - `describe_table`: Reconstruct a table's full schema document
//! - `read_data`: Run a query and return its rows
//! - `create_table`, `drop_table`, `insert_data`, `update_data`,
//!   `create_procedure`, `create_function`: Run caller-supplied SQL and commit
//! - `test_connection`: Report basic server information
//! - `list_procedures_and_functions`, `describe_procedure_or_function`:
//!   Stored procedure and function introspection
//! - `execute_stored_procedure`, `execute_function`: Run a routine with bound
//!   arguments
//! - `create_index`: Create an index from structured arguments
//!
//! Every tool opens one connection, releases it before returning, and folds
//! any failure into a failed [`OperationResult`](crate::models::OperationResult).

pub mod connection;
pub mod create_index;
pub mod describe_table;
pub mod execute;
pub mod list_tables;
pub mod read_data;
pub mod routines;
pub mod statement;

pub use connection::TestConnectionTool;
pub use create_index::CreateIndexTool;
pub use describe_table::DescribeTableTool;
pub use execute::{ExecuteFunctionTool, ExecuteProcedureTool};
pub use list_tables::ListTablesTool;
pub use read_data::ReadDataTool;
pub use routines::{DescribeRoutineTool, ListRoutinesTool};
pub use statement::{SqlStatementTool, StatementKind};

use crate::error::DbResult;
use crate::models::OperationResult;
use rmcp::model::JsonObject;
use schemars::{JsonSchema, schema_for};
use serde::Deserialize;
use serde_json::{Map, Value as JsonValue, json};
use tracing::error;

/// Static metadata published for a tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToolDescriptor {
    pub name: &'static str,
    pub title: &'static str,
    pub description: &'static str,
    pub readonly: bool,
    pub idempotent: bool,
    pub destructive: bool,
}

/// Common capability of every tool.
///
/// The `execute` entry point is an inherent method on each tool because its
/// arguments differ from tool to tool.
pub trait Tool {
    fn descriptor(&self) -> &'static ToolDescriptor;
}

/// Arguments of `describe_table`.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct TableNameInput {
    /// Name of table, optionally qualified as 'schema.table'
    pub table_name: String,
}

/// Arguments of every tool that runs caller-supplied SQL.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct SqlInput {
    /// SQL statement to execute
    pub sql: String,
}

/// Arguments of `describe_procedure_or_function`.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct RoutineInput {
    /// Schema name
    pub schema_name: String,
    /// Procedure or function name
    pub object_name: String,
}

/// Arguments of `execute_stored_procedure`.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExecuteProcedureInput {
    /// Name of the stored procedure, optionally schema-qualified
    pub procedure_name: String,
    /// Procedure parameters keyed by name
    #[serde(default)]
    pub parameters: Option<Map<String, JsonValue>>,
}

/// Arguments of `execute_function`.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExecuteFunctionInput {
    /// Name of the function, optionally schema-qualified
    pub function_name: String,
    /// Function arguments, passed in the order given
    #[serde(default)]
    pub parameters: Option<Map<String, JsonValue>>,
}

/// Arguments of `create_index`.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateIndexInput {
    /// Name of the schema containing the table
    #[serde(default)]
    pub schema_name: Option<String>,
    /// Name of the table to create index on
    pub table_name: String,
    /// Name for the new index
    pub index_name: String,
    /// Array of column names to include in the index
    pub columns: Vec<String>,
    /// Whether the index should enforce uniqueness (default: false)
    #[serde(default)]
    pub is_unique: bool,
    /// Whether the index should be clustered (default: false)
    #[serde(default)]
    pub is_clustered: bool,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct NoInput {}

/// Closed set of tools the server knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolId {
    ListTables,
    DescribeTable,
    CreateTable,
    DropTable,
    ReadData,
    InsertData,
    UpdateData,
    TestConnection,
    ListProceduresAndFunctions,
    DescribeProcedureOrFunction,
    CreateProcedure,
    CreateFunction,
    ExecuteStoredProcedure,
    ExecuteFunction,
    CreateIndex,
}

impl ToolId {
    /// All tools in catalog order.
    pub const ALL: [ToolId; 15] = [
        ToolId::ListTables,
        ToolId::DescribeTable,
        ToolId::CreateTable,
        ToolId::DropTable,
        ToolId::ReadData,
        ToolId::InsertData,
        ToolId::UpdateData,
        ToolId::TestConnection,
        ToolId::ListProceduresAndFunctions,
        ToolId::DescribeProcedureOrFunction,
        ToolId::CreateProcedure,
        ToolId::CreateFunction,
        ToolId::ExecuteStoredProcedure,
        ToolId::ExecuteFunction,
        ToolId::CreateIndex,
    ];

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "list_tables" => Some(Self::ListTables),
            "describe_table" => Some(Self::DescribeTable),
            "create_table" => Some(Self::CreateTable),
            "drop_table" => Some(Self::DropTable),
            "read_data" => Some(Self::ReadData),
            "insert_data" => Some(Self::InsertData),
            "update_data" => Some(Self::UpdateData),
            "test_connection" => Some(Self::TestConnection),
            "list_procedures_and_functions" => Some(Self::ListProceduresAndFunctions),
            "describe_procedure_or_function" => Some(Self::DescribeProcedureOrFunction),
            "create_procedure" => Some(Self::CreateProcedure),
            "create_function" => Some(Self::CreateFunction),
            "execute_stored_procedure" => Some(Self::ExecuteStoredProcedure),
            "execute_function" => Some(Self::ExecuteFunction),
            "create_index" => Some(Self::CreateIndex),
            _ => None,
        }
    }

    pub fn descriptor(self) -> &'static ToolDescriptor {
        match self {
            Self::ListTables => &list_tables::DESCRIPTOR,
            Self::DescribeTable => &describe_table::DESCRIPTOR,
            Self::ReadData => &read_data::DESCRIPTOR,
            Self::TestConnection => &connection::DESCRIPTOR,
            Self::ListProceduresAndFunctions => &routines::LIST_DESCRIPTOR,
            Self::DescribeProcedureOrFunction => &routines::DESCRIBE_DESCRIPTOR,
            Self::CreateTable => StatementKind::CreateTable.descriptor(),
            Self::DropTable => StatementKind::DropTable.descriptor(),
            Self::InsertData => StatementKind::InsertData.descriptor(),
            Self::UpdateData => StatementKind::UpdateData.descriptor(),
            Self::CreateProcedure => StatementKind::CreateProcedure.descriptor(),
            Self::CreateFunction => StatementKind::CreateFunction.descriptor(),
            Self::ExecuteStoredProcedure => &execute::PROCEDURE_DESCRIPTOR,
            Self::ExecuteFunction => &execute::FUNCTION_DESCRIPTOR,
            Self::CreateIndex => &create_index::DESCRIPTOR,
        }
    }

    pub fn name(self) -> &'static str {
        self.descriptor().name
    }

    /// JSON Schema for the tool's arguments.
    ///
    /// Optional arguments are left out of `required`. Argumentless tools still
    /// publish an object schema with empty `properties` and `required`.
    pub fn input_schema(self) -> JsonObject {
        let schema = match self {
            Self::DescribeTable => schema_for!(TableNameInput),
            Self::DescribeProcedureOrFunction => schema_for!(RoutineInput),
            Self::ExecuteStoredProcedure => schema_for!(ExecuteProcedureInput),
            Self::ExecuteFunction => schema_for!(ExecuteFunctionInput),
            Self::CreateIndex => schema_for!(CreateIndexInput),
            Self::CreateTable
            | Self::DropTable
            | Self::ReadData
            | Self::InsertData
            | Self::UpdateData
            | Self::CreateProcedure
            | Self::CreateFunction => schema_for!(SqlInput),
            Self::ListTables | Self::TestConnection | Self::ListProceduresAndFunctions => {
                schema_for!(NoInput)
            }
        };

        let mut object = match schema.to_value() {
            JsonValue::Object(map) => map,
            _ => JsonObject::new(),
        };
        object.remove("$schema");
        object.remove("title");
        object.insert("type".into(), json!("object"));
        object
            .entry("properties")
            .or_insert_with(|| JsonValue::Object(Map::new()));
        object.entry("required").or_insert_with(|| json!([]));
        object
    }
}

/// Turn a tool's internal outcome into its result, logging failures.
pub(crate) fn finish(
    descriptor: &'static ToolDescriptor,
    outcome: DbResult<OperationResult>,
) -> OperationResult {
    match outcome {
        Ok(result) => result,
        Err(e) => {
            error!(
                tool = descriptor.name,
                error = %e,
                retryable = e.is_retryable(),
                "{} failed",
                descriptor.title
            );
            OperationResult::from(e)
        }
    }
}
