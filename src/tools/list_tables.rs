//! The `list_tables` tool.

use crate::db::{Connection, ConnectionProvider, release};
use crate::error::DbResult;
use crate::models::OperationResult;
use crate::tools::{Tool, ToolDescriptor, finish};
use std::sync::Arc;
use tracing::info;

pub const DESCRIPTOR: ToolDescriptor = ToolDescriptor {
    name: "list_tables",
    title: "List Tables",
    description: "Lists all tables in the SQL Database.",
    readonly: true,
    idempotent: true,
    destructive: false,
};

pub(crate) const LIST_TABLES_QUERY: &str = "SELECT TABLE_SCHEMA, TABLE_NAME \
    FROM INFORMATION_SCHEMA.TABLES \
    WHERE TABLE_TYPE = 'BASE TABLE' \
    ORDER BY TABLE_SCHEMA, TABLE_NAME";

/// Enumerates base tables as `schema.table` strings.
#[derive(Debug)]
pub struct ListTablesTool<P> {
    provider: Arc<P>,
}

impl<P: ConnectionProvider> ListTablesTool<P> {
    pub fn new(provider: Arc<P>) -> Self {
        Self { provider }
    }

    pub async fn execute(&self) -> OperationResult {
        finish(&DESCRIPTOR, self.list().await)
    }

    async fn list(&self) -> DbResult<OperationResult> {
        let mut conn = self.provider.get_open_connection().await?;
        let outcome = conn.query(LIST_TABLES_QUERY, &[]).await;
        release(conn).await;

        let rows = outcome?;
        let tables: Vec<String> = rows
            .rows()
            .map(|row| format!("{}.{}", row.str("TABLE_SCHEMA"), row.str("TABLE_NAME")))
            .collect();

        info!(count = tables.len(), "Listed tables");
        Ok(OperationResult::from_payload(&tables))
    }
}

impl<P> Tool for ListTablesTool<P> {
    fn descriptor(&self) -> &'static ToolDescriptor {
        &DESCRIPTOR
    }
}
