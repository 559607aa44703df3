//! Routine execution: `execute_stored_procedure` and `execute_function`.
//!
//! The routine name is validated and quoted, and every argument is bound as a
//! typed `@Pn` parameter, so caller input never becomes SQL text. Both tools
//! return the rows of the first result set with the row count as
//! `rows_affected`.

use crate::db::identifier::{parameter_name, quote_object_name};
use crate::db::{Connection, ConnectionProvider, SqlParam, release};
use crate::error::{DbError, DbResult};
use crate::models::OperationResult;
use crate::tools::{Tool, ToolDescriptor, finish};
use serde_json::{Map, Value as JsonValue};
use std::sync::Arc;
use tracing::{debug, info};

pub const PROCEDURE_DESCRIPTOR: ToolDescriptor = ToolDescriptor {
    name: "execute_stored_procedure",
    title: "Execute Stored Procedure",
    description: "Executes a stored procedure in the SQL Database with optional parameters. Can return result sets or scalar values.",
    readonly: false,
    idempotent: false,
    destructive: false,
};

pub const FUNCTION_DESCRIPTOR: ToolDescriptor = ToolDescriptor {
    name: "execute_function",
    title: "Execute Function",
    description: "Executes a SQL function (table-valued or scalar) in the SQL Database with optional parameters. Returns the function's result set.",
    readonly: true,
    idempotent: true,
    destructive: false,
};

/// A routine call ready to send: SQL text plus its bound arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct RoutineCall {
    pub sql: String,
    pub params: Vec<SqlParam>,
}

impl RoutineCall {
    /// `EXEC [schema].[proc] @Name = @P1, ...`, arguments bound by name.
    pub fn procedure(name: &str, arguments: Option<&Map<String, JsonValue>>) -> DbResult<Self> {
        let target = routine_name(name, "Procedure")?;
        let (names, params) = bind_arguments(arguments)?;

        let assignments: Vec<String> = names
            .iter()
            .enumerate()
            .map(|(idx, name)| format!("@{} = @P{}", name, idx + 1))
            .collect();

        let sql = if assignments.is_empty() {
            format!("EXEC {}", target)
        } else {
            format!("EXEC {} {}", target, assignments.join(", "))
        };
        Ok(Self { sql, params })
    }

    /// `SELECT * FROM [schema].[fn](@P1, ...)`, arguments bound in the order given.
    pub fn function(name: &str, arguments: Option<&Map<String, JsonValue>>) -> DbResult<Self> {
        let target = routine_name(name, "Function")?;
        let (_, params) = bind_arguments(arguments)?;

        let placeholders: Vec<String> = (1..=params.len()).map(|idx| format!("@P{}", idx)).collect();
        let sql = format!("SELECT * FROM {}({})", target, placeholders.join(", "));
        Ok(Self { sql, params })
    }
}

fn routine_name(name: &str, kind: &str) -> DbResult<String> {
    if name.trim().is_empty() {
        return Err(DbError::invalid_input(format!("{} name is required", kind)));
    }
    quote_object_name(name)
}

/// Validate argument names and convert values, keeping the caller's order.
fn bind_arguments(
    arguments: Option<&Map<String, JsonValue>>,
) -> DbResult<(Vec<String>, Vec<SqlParam>)> {
    let Some(arguments) = arguments else {
        return Ok((Vec::new(), Vec::new()));
    };

    let mut names = Vec::with_capacity(arguments.len());
    let mut params = Vec::with_capacity(arguments.len());
    for (name, value) in arguments {
        names.push(parameter_name(name)?.to_string());
        params.push(SqlParam::from_json(name, value)?);
    }
    Ok((names, params))
}

async fn run_call<P: ConnectionProvider>(provider: &P, call: RoutineCall) -> DbResult<OperationResult> {
    debug!(sql = %call.sql, params = call.params.len(), "Executing routine");

    let mut conn = provider.get_open_connection().await?;
    let outcome = conn.query(&call.sql, &call.params).await;
    release(conn).await;

    let records = outcome?.into_records();
    let row_count = records.len() as u64;
    let rows: Vec<JsonValue> = records.into_iter().map(JsonValue::Object).collect();

    Ok(OperationResult::with_rows_and_data(
        row_count,
        JsonValue::Array(rows),
    ))
}

/// Runs a stored procedure.
#[derive(Debug)]
pub struct ExecuteProcedureTool<P> {
    provider: Arc<P>,
}

impl<P: ConnectionProvider> ExecuteProcedureTool<P> {
    pub fn new(provider: Arc<P>) -> Self {
        Self { provider }
    }

    pub async fn execute(
        &self,
        procedure_name: &str,
        parameters: Option<&Map<String, JsonValue>>,
    ) -> OperationResult {
        finish(
            &PROCEDURE_DESCRIPTOR,
            self.run(procedure_name, parameters).await,
        )
    }

    async fn run(
        &self,
        procedure_name: &str,
        parameters: Option<&Map<String, JsonValue>>,
    ) -> DbResult<OperationResult> {
        let call = RoutineCall::procedure(procedure_name, parameters)?;
        let result = run_call(self.provider.as_ref(), call).await?;
        info!(procedure = procedure_name, "Stored procedure executed");
        Ok(result)
    }
}

impl<P> Tool for ExecuteProcedureTool<P> {
    fn descriptor(&self) -> &'static ToolDescriptor {
        &PROCEDURE_DESCRIPTOR
    }
}

/// Selects from a table-valued or scalar function.
#[derive(Debug)]
pub struct ExecuteFunctionTool<P> {
    provider: Arc<P>,
}

impl<P: ConnectionProvider> ExecuteFunctionTool<P> {
    pub fn new(provider: Arc<P>) -> Self {
        Self { provider }
    }

    pub async fn execute(
        &self,
        function_name: &str,
        parameters: Option<&Map<String, JsonValue>>,
    ) -> OperationResult {
        finish(
            &FUNCTION_DESCRIPTOR,
            self.run(function_name, parameters).await,
        )
    }

    async fn run(
        &self,
        function_name: &str,
        parameters: Option<&Map<String, JsonValue>>,
    ) -> DbResult<OperationResult> {
        let call = RoutineCall::function(function_name, parameters)?;
        let result = run_call(self.provider.as_ref(), call).await?;
        info!(function = function_name, "Function executed");
        Ok(result)
    }
}

impl<P> Tool for ExecuteFunctionTool<P> {
    fn descriptor(&self) -> &'static ToolDescriptor {
        &FUNCTION_DESCRIPTOR
    }
}
