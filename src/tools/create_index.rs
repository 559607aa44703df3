//! `create_index`: build and commit a `CREATE INDEX` statement.
//!
//! Every name is bracket-quoted before it is placed in the statement, so the
//! caller picks names but never writes SQL.

use crate::db::identifier::safe_identifier;
use crate::db::{Connection, ConnectionProvider, release};
use crate::error::{DbError, DbResult};
use crate::models::OperationResult;
use crate::tools::{CreateIndexInput, Tool, ToolDescriptor, finish};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info};

pub const DESCRIPTOR: ToolDescriptor = ToolDescriptor {
    name: "create_index",
    title: "Create Index",
    description: "Creates an index on a specified column or columns in an MSSQL Database table",
    readonly: false,
    idempotent: false,
    destructive: false,
};

/// What was created, echoed back to the caller.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexDetails {
    pub schema_name: Option<String>,
    pub table_name: String,
    pub index_name: String,
    pub column_names: String,
    pub is_unique: bool,
    pub is_clustered: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndexCreated {
    pub message: String,
    pub details: IndexDetails,
}

/// Build the `CREATE INDEX` statement for a request.
pub fn create_index_sql(request: &CreateIndexInput) -> DbResult<String> {
    if request.table_name.trim().is_empty() {
        return Err(DbError::invalid_input("Table name is required"));
    }
    if request.index_name.trim().is_empty() {
        return Err(DbError::invalid_input("Index name is required"));
    }
    if request.columns.is_empty() {
        return Err(DbError::invalid_input("At least one column is required"));
    }

    let table = match request.schema_name.as_deref() {
        Some(schema) if !schema.trim().is_empty() => format!(
            "{}.{}",
            safe_identifier(schema)?,
            safe_identifier(&request.table_name)?
        ),
        _ => safe_identifier(&request.table_name)?,
    };
    let columns = request
        .columns
        .iter()
        .map(|column| safe_identifier(column))
        .collect::<DbResult<Vec<_>>>()?;

    let mut kind = String::new();
    if request.is_unique {
        kind.push_str("UNIQUE ");
    }
    kind.push_str(if request.is_clustered {
        "CLUSTERED"
    } else {
        "NONCLUSTERED"
    });

    Ok(format!(
        "CREATE {} INDEX {} ON {} ({})",
        kind,
        safe_identifier(&request.index_name)?,
        table,
        columns.join(", ")
    ))
}

/// Creates an index inside a committed transaction.
#[derive(Debug)]
pub struct CreateIndexTool<P> {
    provider: Arc<P>,
}

impl<P: ConnectionProvider> CreateIndexTool<P> {
    pub fn new(provider: Arc<P>) -> Self {
        Self { provider }
    }

    pub async fn execute(&self, request: &CreateIndexInput) -> OperationResult {
        finish(&DESCRIPTOR, self.run(request).await)
    }

    async fn run(&self, request: &CreateIndexInput) -> DbResult<OperationResult> {
        let sql = create_index_sql(request)?;

        let mut conn = self.provider.get_open_connection().await?;
        let outcome = Self::execute_committed(&mut conn, &sql).await;
        release(conn).await;
        outcome?;

        let target = match request.schema_name.as_deref() {
            Some(schema) if !schema.trim().is_empty() => {
                format!("{}.{}", schema, request.table_name)
            }
            _ => request.table_name.clone(),
        };
        info!(index = %request.index_name, table = %target, "Index created");

        Ok(OperationResult::from_payload(&IndexCreated {
            message: format!(
                "Index [{}] created successfully on table [{}]",
                request.index_name, target
            ),
            details: IndexDetails {
                schema_name: request.schema_name.clone(),
                table_name: request.table_name.clone(),
                index_name: request.index_name.clone(),
                column_names: request.columns.join(", "),
                is_unique: request.is_unique,
                is_clustered: request.is_clustered,
            },
        }))
    }

    async fn execute_committed(conn: &mut P::Connection, sql: &str) -> DbResult<()> {
        debug!(sql = %sql, "Creating index");
        conn.begin_transaction().await?;
        conn.execute(sql).await?;
        conn.commit().await
    }
}

impl<P> Tool for CreateIndexTool<P> {
    fn descriptor(&self) -> &'static ToolDescriptor {
        &DESCRIPTOR
    }
}
