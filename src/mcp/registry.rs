//! Tool registry and dispatcher.
//!
//! The registry is built once at startup and never changes afterwards. It
//! publishes the catalog of enabled tools and routes an incoming
//! `(name, arguments)` pair to the matching tool, turning every outcome into
//! a text response flagged as success or error.

use crate::db::ConnectionProvider;
use crate::error::{DbError, DbResult};
use crate::models::OperationResult;
use crate::tools::{
    CreateIndexInput, CreateIndexTool, DescribeRoutineTool, DescribeTableTool,
    ExecuteFunctionInput, ExecuteFunctionTool, ExecuteProcedureInput, ExecuteProcedureTool,
    ListRoutinesTool, ListTablesTool, ReadDataTool, SqlStatementTool, StatementKind,
    TestConnectionTool, Tool, ToolDescriptor, ToolId,
};
use futures_util::FutureExt;
use rmcp::model::{CallToolResult, Content, JsonObject, Tool as McpTool, ToolAnnotations};
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{debug, error, warn};

/// One entry of the published tool catalog.
#[derive(Debug, Clone)]
pub struct ToolListing {
    pub id: ToolId,
    pub descriptor: &'static ToolDescriptor,
    pub input_schema: JsonObject,
}

impl ToolListing {
    fn new(id: ToolId, tool: &dyn Tool) -> Self {
        Self {
            id,
            descriptor: tool.descriptor(),
            input_schema: id.input_schema(),
        }
    }
}

impl From<ToolListing> for McpTool {
    fn from(listing: ToolListing) -> Self {
        let descriptor = listing.descriptor;
        let mut tool = McpTool::new(
            descriptor.name,
            descriptor.description,
            Arc::new(listing.input_schema),
        )
        .annotate(
            ToolAnnotations::new()
                .read_only(descriptor.readonly)
                .destructive(descriptor.destructive)
                .idempotent(descriptor.idempotent),
        );
        tool.title = Some(descriptor.title.to_string());
        tool
    }
}

/// Text response of one dispatched call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchResponse {
    pub is_error: bool,
    pub text: String,
}

impl DispatchResponse {
    fn success(text: String) -> Self {
        Self {
            is_error: false,
            text,
        }
    }

    fn error(text: impl Into<String>) -> Self {
        Self {
            is_error: true,
            text: text.into(),
        }
    }
}

impl From<DispatchResponse> for CallToolResult {
    fn from(response: DispatchResponse) -> Self {
        let content = vec![Content::text(response.text)];
        if response.is_error {
            CallToolResult::error(content)
        } else {
            CallToolResult::success(content)
        }
    }
}

/// Fixed mapping from [`ToolId`] to tool instance.
pub struct ToolRegistry<P> {
    enabled: Vec<ToolId>,
    list_tables: ListTablesTool<P>,
    describe_table: DescribeTableTool<P>,
    read_data: ReadDataTool<P>,
    create_table: SqlStatementTool<P>,
    drop_table: SqlStatementTool<P>,
    insert_data: SqlStatementTool<P>,
    update_data: SqlStatementTool<P>,
    create_procedure: SqlStatementTool<P>,
    create_function: SqlStatementTool<P>,
    test_connection: TestConnectionTool<P>,
    list_routines: ListRoutinesTool<P>,
    describe_routine: DescribeRoutineTool<P>,
    execute_procedure: ExecuteProcedureTool<P>,
    execute_function: ExecuteFunctionTool<P>,
    create_index: CreateIndexTool<P>,
}

impl<P: ConnectionProvider> ToolRegistry<P> {
    /// Build the registry. In read-only mode mutating tools are not registered.
    pub fn new(provider: Arc<P>, readonly: bool) -> Self {
        let enabled = ToolId::ALL
            .into_iter()
            .filter(|id| !readonly || id.descriptor().readonly)
            .collect();

        let statement = |kind| SqlStatementTool::new(provider.clone(), kind);

        Self {
            enabled,
            list_tables: ListTablesTool::new(provider.clone()),
            describe_table: DescribeTableTool::new(provider.clone()),
            read_data: ReadDataTool::new(provider.clone()),
            create_table: statement(StatementKind::CreateTable),
            drop_table: statement(StatementKind::DropTable),
            insert_data: statement(StatementKind::InsertData),
            update_data: statement(StatementKind::UpdateData),
            create_procedure: statement(StatementKind::CreateProcedure),
            create_function: statement(StatementKind::CreateFunction),
            test_connection: TestConnectionTool::new(provider.clone()),
            list_routines: ListRoutinesTool::new(provider.clone()),
            describe_routine: DescribeRoutineTool::new(provider.clone()),
            execute_procedure: ExecuteProcedureTool::new(provider.clone()),
            execute_function: ExecuteFunctionTool::new(provider.clone()),
            create_index: CreateIndexTool::new(provider),
        }
    }

    pub fn is_enabled(&self, id: ToolId) -> bool {
        self.enabled.contains(&id)
    }

    /// Catalog of enabled tools, in registration order.
    pub fn list(&self) -> Vec<ToolListing> {
        self.enabled
            .iter()
            .map(|&id| ToolListing::new(id, self.tool(id)))
            .collect()
    }

    fn tool(&self, id: ToolId) -> &dyn Tool {
        match id {
            ToolId::ListTables => &self.list_tables,
            ToolId::DescribeTable => &self.describe_table,
            ToolId::ReadData => &self.read_data,
            ToolId::CreateTable => &self.create_table,
            ToolId::DropTable => &self.drop_table,
            ToolId::InsertData => &self.insert_data,
            ToolId::UpdateData => &self.update_data,
            ToolId::CreateProcedure => &self.create_procedure,
            ToolId::CreateFunction => &self.create_function,
            ToolId::TestConnection => &self.test_connection,
            ToolId::ListProceduresAndFunctions => &self.list_routines,
            ToolId::DescribeProcedureOrFunction => &self.describe_routine,
            ToolId::ExecuteStoredProcedure => &self.execute_procedure,
            ToolId::ExecuteFunction => &self.execute_function,
            ToolId::CreateIndex => &self.create_index,
        }
    }

    /// Route one call to its tool.
    ///
    /// Never fails: unknown tools, bad arguments, failed operations and
    /// panics all come back as error-flagged responses.
    pub async fn call(&self, name: &str, arguments: Option<&JsonObject>) -> DispatchResponse {
        let Some(id) = ToolId::from_name(name).filter(|id| self.is_enabled(*id)) else {
            warn!(tool = name, "Unknown tool requested");
            return DispatchResponse::error(DbError::unknown_tool(name).to_string());
        };

        debug!(tool = name, "Dispatching tool call");

        let outcome = AssertUnwindSafe(self.dispatch(id, arguments))
            .catch_unwind()
            .await;

        match outcome {
            Ok(Ok(result)) => Self::render(result),
            Ok(Err(e)) => {
                warn!(tool = name, error = %e, "Rejected tool arguments");
                DispatchResponse::error(format!("Error: {}", e))
            }
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                error!(tool = name, panic = %message, "Tool execution failed");
                DispatchResponse::error(format!("Tool execution failed: {}", message))
            }
        }
    }

    async fn dispatch(
        &self,
        id: ToolId,
        arguments: Option<&JsonObject>,
    ) -> DbResult<OperationResult> {
        let result = match id {
            ToolId::ListTables => self.list_tables.execute().await,
            ToolId::DescribeTable => {
                let table_name = string_argument(arguments, "table_name")?;
                self.describe_table.execute(&table_name).await
            }
            ToolId::ReadData => self.read_data.execute(&sql_argument(arguments)?).await,
            ToolId::CreateTable => self.create_table.execute(&sql_argument(arguments)?).await,
            ToolId::DropTable => self.drop_table.execute(&sql_argument(arguments)?).await,
            ToolId::InsertData => self.insert_data.execute(&sql_argument(arguments)?).await,
            ToolId::UpdateData => self.update_data.execute(&sql_argument(arguments)?).await,
            ToolId::CreateProcedure => {
                self.create_procedure
                    .execute(&sql_argument(arguments)?)
                    .await
            }
            ToolId::CreateFunction => {
                self.create_function
                    .execute(&sql_argument(arguments)?)
                    .await
            }
            ToolId::TestConnection => self.test_connection.execute().await,
            ToolId::ListProceduresAndFunctions => self.list_routines.execute().await,
            ToolId::DescribeProcedureOrFunction => {
                let schema_name = string_argument(arguments, "schema_name")?;
                let object_name = string_argument(arguments, "object_name")?;
                self.describe_routine
                    .execute(&schema_name, &object_name)
                    .await
            }
            ToolId::ExecuteStoredProcedure => {
                let input: ExecuteProcedureInput = typed_arguments(arguments)?;
                self.execute_procedure
                    .execute(&input.procedure_name, input.parameters.as_ref())
                    .await
            }
            ToolId::ExecuteFunction => {
                let input: ExecuteFunctionInput = typed_arguments(arguments)?;
                self.execute_function
                    .execute(&input.function_name, input.parameters.as_ref())
                    .await
            }
            ToolId::CreateIndex => {
                let input: CreateIndexInput = typed_arguments(arguments)?;
                self.create_index.execute(&input).await
            }
        };

        Ok(result)
    }

    fn render(result: OperationResult) -> DispatchResponse {
        if !result.is_success() {
            return DispatchResponse::error(format!(
                "Error: {}",
                result.error().unwrap_or_default()
            ));
        }

        match result.to_pretty_json() {
            Ok(text) => DispatchResponse::success(text),
            Err(e) => DispatchResponse::error(format!("Error: {}", e)),
        }
    }
}

fn sql_argument(arguments: Option<&JsonObject>) -> DbResult<String> {
    string_argument(arguments, "sql")
}

/// A string argument; absent or null becomes an empty string.
fn string_argument(arguments: Option<&JsonObject>, name: &str) -> DbResult<String> {
    match arguments.and_then(|args| args.get(name)) {
        None | Some(JsonValue::Null) => Ok(String::new()),
        Some(JsonValue::String(value)) => Ok(value.clone()),
        Some(_) => Err(DbError::invalid_input(format!(
            "Argument '{}' must be a string",
            name
        ))),
    }
}

/// Deserialize structured arguments; absent arguments read as `{}`.
fn typed_arguments<T: DeserializeOwned>(arguments: Option<&JsonObject>) -> DbResult<T> {
    let value = JsonValue::Object(arguments.cloned().unwrap_or_default());
    serde_json::from_value(value).map_err(|e| DbError::invalid_input(e.to_string()))
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
