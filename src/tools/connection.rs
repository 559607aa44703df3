//! The `test_connection` tool.

use crate::db::{Connection, ConnectionProvider, release};
use crate::error::DbResult;
use crate::models::OperationResult;
use crate::tools::{Tool, ToolDescriptor, finish};
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

pub const DESCRIPTOR: ToolDescriptor = ToolDescriptor {
    name: "test_connection",
    title: "Test Connection",
    description: "Tests the database connection and returns connection status and basic server information.",
    readonly: true,
    idempotent: true,
    destructive: false,
};

pub(crate) const SERVER_INFO_QUERY: &str = "\
SELECT DB_NAME() AS [database], \
       CAST(SERVERPROPERTY('ProductVersion') AS NVARCHAR(128)) AS server_version, \
       @@SERVERNAME AS data_source";

/// Output of the test_connection tool.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConnectionInfo {
    pub database: Option<String>,
    pub server_version: Option<String>,
    pub data_source: Option<String>,
    pub connect_timeout_secs: u64,
}

/// Opens a connection and reports what it is connected to.
#[derive(Debug)]
pub struct TestConnectionTool<P> {
    provider: Arc<P>,
}

impl<P: ConnectionProvider> TestConnectionTool<P> {
    pub fn new(provider: Arc<P>) -> Self {
        Self { provider }
    }

    pub async fn execute(&self) -> OperationResult {
        finish(&DESCRIPTOR, self.server_info().await)
    }

    async fn server_info(&self) -> DbResult<OperationResult> {
        let mut conn = self.provider.get_open_connection().await?;
        let outcome = conn.query(SERVER_INFO_QUERY, &[]).await;
        release(conn).await;

        let rows = outcome?;
        let row = rows.first();
        let info = ConnectionInfo {
            database: row.and_then(|r| r.opt_str("database")),
            server_version: row.and_then(|r| r.opt_str("server_version")),
            data_source: row.and_then(|r| r.opt_str("data_source")),
            connect_timeout_secs: self.provider.connect_timeout().as_secs(),
        };

        info!(
            database = info.database.as_deref().unwrap_or_default(),
            server_version = info.server_version.as_deref().unwrap_or_default(),
            "Database connection test successful"
        );
        Ok(OperationResult::from_payload(&info))
    }
}

impl<P> Tool for TestConnectionTool<P> {
    fn descriptor(&self) -> &'static ToolDescriptor {
        &DESCRIPTOR
    }
}
