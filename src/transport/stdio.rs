//! Stdio transport for the MCP server.

use crate::db::ConnectionProvider;
use crate::error::{DbError, DbResult};
use crate::mcp::{MssqlService, ToolRegistry};
use crate::transport::{Transport, wait_for_signal};
use rmcp::{ServiceExt, transport::stdio};
use std::sync::Arc;
use tracing::{info, warn};

/// Reads JSON-RPC messages from stdin and writes responses to stdout.
pub struct StdioTransport<P> {
    registry: Arc<ToolRegistry<P>>,
}

impl<P: ConnectionProvider> StdioTransport<P> {
    pub fn new(registry: Arc<ToolRegistry<P>>) -> Self {
        Self { registry }
    }
}

impl<P: ConnectionProvider> Transport for StdioTransport<P> {
    async fn run(&self) -> DbResult<()> {
        info!("Starting MCP server with stdio transport");

        let service = MssqlService::new(self.registry.clone());
        let running_service = service
            .serve(stdio())
            .await
            .map_err(|e| DbError::internal(format!("Failed to start stdio transport: {}", e)))?;

        tokio::select! {
            result = running_service.waiting() => {
                match result {
                    Ok(_quit_reason) => {
                        info!("Stdio transport completed normally");
                        Ok(())
                    }
                    Err(e) => {
                        warn!(error = %e, "Stdio transport error");
                        Err(DbError::internal(format!("Stdio transport error: {}", e)))
                    }
                }
            }
            _ = wait_for_signal() => {
                // A pending stdin read cannot be cancelled, so leave immediately.
                // No connection outlives a tool call, so there is nothing to close.
                info!("Shutdown signal received, exiting");
                std::process::exit(0);
            }
        }
    }

    fn name(&self) -> &'static str {
        "stdio"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::SqlConnectionFactory;
    use std::time::Duration;

    #[test]
    fn test_stdio_transport_creation() {
        let factory = SqlConnectionFactory::new(
            Some("Server=tcp:localhost,1433;Database=test;User Id=sa;Password=x"),
            Duration::from_secs(10),
        )
        .unwrap();
        let registry = Arc::new(ToolRegistry::new(Arc::new(factory), true));
        let transport = StdioTransport::new(registry);
        assert_eq!(transport.name(), "stdio");
    }
}
