//! The `read_data` tool.

use crate::db::{Connection, ConnectionProvider, release};
use crate::error::DbResult;
use crate::models::OperationResult;
use crate::tools::{Tool, ToolDescriptor, finish};
use serde_json::Value as JsonValue;
use std::sync::Arc;
use tracing::{debug, info};

pub const DESCRIPTOR: ToolDescriptor = ToolDescriptor {
    name: "read_data",
    title: "Read Data",
    description: "Executes SQL queries against SQL Database to read data",
    readonly: true,
    idempotent: true,
    destructive: false,
};

/// Runs a caller-supplied query and returns every row of its first result set.
///
/// Each row becomes a column-name to value map in result-set column order.
/// The SQL is sent verbatim.
#[derive(Debug)]
pub struct ReadDataTool<P> {
    provider: Arc<P>,
}

impl<P: ConnectionProvider> ReadDataTool<P> {
    pub fn new(provider: Arc<P>) -> Self {
        Self { provider }
    }

    pub async fn execute(&self, sql: &str) -> OperationResult {
        finish(&DESCRIPTOR, self.read(sql).await)
    }

    async fn read(&self, sql: &str) -> DbResult<OperationResult> {
        debug!(sql = %sql, "Executing query");

        let mut conn = self.provider.get_open_connection().await?;
        let outcome = conn.query(sql, &[]).await;
        release(conn).await;

        let records = outcome?.into_records();
        info!(row_count = records.len(), "Query completed");

        let rows: Vec<JsonValue> = records.into_iter().map(JsonValue::Object).collect();
        Ok(OperationResult::with_data(JsonValue::Array(rows)))
    }
}

impl<P> Tool for ReadDataTool<P> {
    fn descriptor(&self) -> &'static ToolDescriptor {
        &DESCRIPTOR
    }
}
