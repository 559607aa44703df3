//! Stored procedure and function introspection.
//!
//! - `list_procedures_and_functions`: every procedure and function in the database
//! - `describe_procedure_or_function`: one routine's definition and parameters

use crate::db::{Connection, ConnectionProvider, RowRef, SqlParam, release};
use crate::error::{DbError, DbResult};
use crate::models::{
    OperationResult, RoutineDocument, RoutineObject, RoutineParameter, RoutineSummary,
};
use crate::tools::{Tool, ToolDescriptor, finish};
use std::sync::Arc;
use tracing::info;

pub const LIST_DESCRIPTOR: ToolDescriptor = ToolDescriptor {
    name: "list_procedures_and_functions",
    title: "List Procedures and Functions",
    description: "Lists all stored procedures and functions in the SQL Database.",
    readonly: true,
    idempotent: true,
    destructive: false,
};

pub const DESCRIBE_DESCRIPTOR: ToolDescriptor = ToolDescriptor {
    name: "describe_procedure_or_function",
    title: "Describe Procedure or Function",
    description: "Describes a stored procedure or function including its definition and parameters.",
    readonly: true,
    idempotent: true,
    destructive: false,
};

pub(crate) const LIST_ROUTINES_QUERY: &str = "\
SELECT SCHEMA_NAME(schema_id) AS [schema], name, type_desc AS type, \
       create_date AS created, modify_date AS modified \
FROM sys.objects \
WHERE type IN ('P', 'FN', 'IF', 'TF', 'PC', 'FS', 'FT') \
ORDER BY SCHEMA_NAME(schema_id), type_desc, name";

// @P1 is the schema name, @P2 the object name.

pub(crate) const ROUTINE_OBJECT_QUERY: &str = "\
SELECT SCHEMA_NAME(o.schema_id) AS [schema], o.name, o.type_desc AS type, \
       o.create_date AS created, o.modify_date AS modified, m.definition \
FROM sys.objects o \
LEFT JOIN sys.sql_modules m ON o.object_id = m.object_id \
WHERE o.type IN ('P', 'FN', 'IF', 'TF', 'PC', 'FS', 'FT') \
  AND SCHEMA_NAME(o.schema_id) = @P1 AND o.name = @P2";

pub(crate) const ROUTINE_PARAMETERS_QUERY: &str = "\
SELECT p.name, TYPE_NAME(p.user_type_id) AS data_type, p.max_length, p.precision, p.scale, \
       p.is_output, p.has_default_value AS has_default, \
       CAST(p.default_value AS NVARCHAR(4000)) AS default_value \
FROM sys.parameters p \
INNER JOIN sys.objects o ON p.object_id = o.object_id \
WHERE o.type IN ('P', 'FN', 'IF', 'TF', 'PC', 'FS', 'FT') \
  AND SCHEMA_NAME(o.schema_id) = @P1 AND o.name = @P2 \
ORDER BY p.parameter_id";

/// Lists stored procedures and functions.
#[derive(Debug)]
pub struct ListRoutinesTool<P> {
    provider: Arc<P>,
}

impl<P: ConnectionProvider> ListRoutinesTool<P> {
    pub fn new(provider: Arc<P>) -> Self {
        Self { provider }
    }

    pub async fn execute(&self) -> OperationResult {
        finish(&LIST_DESCRIPTOR, self.list().await)
    }

    async fn list(&self) -> DbResult<OperationResult> {
        let mut conn = self.provider.get_open_connection().await?;
        let outcome = conn.query(LIST_ROUTINES_QUERY, &[]).await;
        release(conn).await;

        let routines: Vec<RoutineSummary> = outcome?
            .rows()
            .map(|row| {
                RoutineSummary::new(
                    row.str("schema"),
                    row.str("name"),
                    row.str("type"),
                    row.value("created"),
                    row.value("modified"),
                )
            })
            .collect();

        info!(count = routines.len(), "Listed procedures and functions");
        Ok(OperationResult::from_payload(&routines))
    }
}

impl<P> Tool for ListRoutinesTool<P> {
    fn descriptor(&self) -> &'static ToolDescriptor {
        &LIST_DESCRIPTOR
    }
}

/// Describes one stored procedure or function.
#[derive(Debug)]
pub struct DescribeRoutineTool<P> {
    provider: Arc<P>,
}

impl<P: ConnectionProvider> DescribeRoutineTool<P> {
    pub fn new(provider: Arc<P>) -> Self {
        Self { provider }
    }

    pub async fn execute(&self, schema_name: &str, object_name: &str) -> OperationResult {
        finish(
            &DESCRIBE_DESCRIPTOR,
            self.describe(schema_name, object_name).await,
        )
    }

    async fn describe(&self, schema_name: &str, object_name: &str) -> DbResult<OperationResult> {
        if schema_name.trim().is_empty() {
            return Err(DbError::invalid_input("Schema name is required"));
        }
        if object_name.trim().is_empty() {
            return Err(DbError::invalid_input("Object name is required"));
        }

        let params = [SqlParam::text(schema_name), SqlParam::text(object_name)];

        let mut conn = self.provider.get_open_connection().await?;
        let outcome = Self::load(&mut conn, &params).await;
        release(conn).await;

        let document = outcome?
            .ok_or_else(|| DbError::routine_not_found(format!("{}.{}", schema_name, object_name)))?;

        info!(
            routine = %format!("{}.{}", schema_name, object_name),
            parameters = document.parameters.len(),
            "Described procedure or function"
        );
        Ok(OperationResult::from_payload(&document))
    }

    /// Object lookup, then its parameters; `None` when the object does not exist.
    async fn load(
        conn: &mut P::Connection,
        params: &[SqlParam],
    ) -> DbResult<Option<RoutineDocument>> {
        let objects = conn.query(ROUTINE_OBJECT_QUERY, params).await?;
        let Some(object) = objects.first().map(object_from_row) else {
            return Ok(None);
        };

        let parameters = conn
            .query(ROUTINE_PARAMETERS_QUERY, params)
            .await?
            .rows()
            .map(|row| parameter_from_row(&row))
            .collect();

        Ok(Some(RoutineDocument { object, parameters }))
    }
}

impl<P> Tool for DescribeRoutineTool<P> {
    fn descriptor(&self) -> &'static ToolDescriptor {
        &DESCRIBE_DESCRIPTOR
    }
}

fn object_from_row(row: RowRef<'_>) -> RoutineObject {
    RoutineObject {
        schema: row.str("schema"),
        name: row.str("name"),
        routine_type: row.str("type"),
        created: row.value("created"),
        modified: row.value("modified"),
        definition: row.opt_str("definition"),
    }
}

fn parameter_from_row(row: &RowRef<'_>) -> RoutineParameter {
    let default_value = row.value("default_value");
    RoutineParameter {
        name: row.opt_str("name"),
        data_type: row.str("data_type"),
        max_length: row.int("max_length"),
        precision: row.int("precision"),
        scale: row.int("scale"),
        is_output: row.bool("is_output"),
        has_default: row.bool("has_default"),
        default_value: (!default_value.is_null()).then_some(default_value),
    }
}
