//! SQL Server MCP Server - Main entry point.
//!
//! This server provides MCP (Model Context Protocol) tools for AI assistants
//! to interact with Microsoft SQL Server and Azure SQL databases.

use clap::Parser;
use mssql_mcp_server::config::{Config, TransportMode};
use mssql_mcp_server::db::SqlConnectionFactory;
use mssql_mcp_server::mcp::ToolRegistry;
use mssql_mcp_server::transport::{HttpTransport, StdioTransport, Transport};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Initialize the tracing subscriber for logging.
///
/// Logs always go to stderr; stdout carries the stdio transport.
fn init_tracing(config: &Config) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let subscriber = tracing_subscriber::registry().with(filter);

    if config.json_logs {
        subscriber
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        subscriber
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_thread_ids(false),
            )
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::parse();

    init_tracing(&config);

    // Configuration problems are fatal before any transport starts
    let factory = match config.validate().and_then(|()| {
        SqlConnectionFactory::new(config.connection_string(), config.connect_timeout_duration())
    }) {
        Ok(factory) => factory,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    info!(
        transport = %config.transport,
        readonly = config.readonly,
        server = %factory.addr(),
        "Starting SQL Server MCP Server v{}",
        env!("CARGO_PKG_VERSION")
    );

    let registry = Arc::new(ToolRegistry::new(Arc::new(factory), config.readonly));
    info!(tools = registry.list().len(), "Registered tools");

    let result = match config.transport {
        TransportMode::Stdio => StdioTransport::new(registry).run().await,
        TransportMode::Http => {
            info!(
                addr = %config.http_bind_addr(),
                endpoint = %config.mcp_endpoint,
                "Using HTTP transport"
            );
            HttpTransport::new(
                registry,
                &config.http_host,
                config.http_port,
                &config.mcp_endpoint,
            )
            .run()
            .await
        }
    };

    if let Err(e) = result {
        error!(error = %e, "Server error");
        return Err(e.into());
    }

    info!("Server shutdown complete");
    Ok(())
}
