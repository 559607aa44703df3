//! MCP service implementation using rmcp.
//!
//! `MssqlService` implements `ServerHandler` by hand: the tool catalog and
//! dispatch live in [`ToolRegistry`], which this type only adapts to the
//! protocol's request and result types.

use crate::db::ConnectionProvider;
use crate::mcp::registry::ToolRegistry;
use rmcp::{
    ErrorData as McpError, RoleServer, ServerHandler,
    model::{
        CallToolRequestParam, CallToolResult, Implementation, ListToolsResult,
        PaginatedRequestParam, ProtocolVersion, ServerCapabilities, ServerInfo, Tool,
    },
    service::RequestContext,
};
use std::future::Future;
use std::sync::Arc;

pub struct MssqlService<P> {
    /// Shared by every session of the HTTP transport
    registry: Arc<ToolRegistry<P>>,
}

impl<P> Clone for MssqlService<P> {
    fn clone(&self) -> Self {
        Self {
            registry: self.registry.clone(),
        }
    }
}

impl<P: ConnectionProvider> MssqlService<P> {
    pub fn new(registry: Arc<ToolRegistry<P>>) -> Self {
        Self { registry }
    }
}

impl<P: ConnectionProvider> ServerHandler for MssqlService<P> {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2025_03_26,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "mssql-mcp-server".to_owned(),
                title: Some("SQL Server MCP Server".to_owned()),
                version: env!("CARGO_PKG_VERSION").to_owned(),
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "Tools for inspecting and modifying a Microsoft SQL Server or Azure SQL database.\n\
                \n\
                ## Workflow\n\
                1. Call `list_tables` to see the available tables as `schema.table`\n\
                2. Call `describe_table` with a table name before writing queries against it\n\
                3. Use `read_data` for SELECT statements and `execute_function` for functions\n\
                \n\
                ## Writes\n\
                `create_table`, `drop_table`, `insert_data`, `update_data`, `create_procedure` and\n\
                `create_function` run the given statement and commit it. `create_index` and\n\
                `execute_stored_procedure` take structured arguments. None of these are available\n\
                when the server runs in read-only mode.\n\
                \n\
                ## Results\n\
                Every tool returns `{ success, error?, rows_affected?, data? }`. A table name that\n\
                exists in several schemas must be qualified as `schema.table`."
                    .to_string(),
            ),
        }
    }

    fn list_tools(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> impl Future<Output = Result<ListToolsResult, McpError>> + Send + '_ {
        async move {
            let tools: Vec<Tool> = self.registry.list().into_iter().map(Tool::from).collect();
            Ok(ListToolsResult::with_all_items(tools))
        }
    }

    fn call_tool(
        &self,
        request: CallToolRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> impl Future<Output = Result<CallToolResult, McpError>> + Send + '_ {
        async move {
            let response = self
                .registry
                .call(&request.name, request.arguments.as_ref())
                .await;
            Ok(response.into())
        }
    }
}
