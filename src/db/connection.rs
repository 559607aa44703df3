//! Connection provisioning.
//!
//! Every tool call opens exactly one connection, owns it for the duration of
//! the call and closes it afterwards. There is no pooling and no retry.
//!
//! The [`ConnectionProvider`] and [`Connection`] traits are the seam between
//! the tools and the driver: [`SqlConnectionFactory`] talks TDS to SQL Server
//! through `tiberius`, while tests plug in an in-memory implementation.

use crate::db::params::SqlParam;
use crate::db::types::{RowSet, row_to_values};
use crate::error::{CONNECTION_STRING_HINT, DbError, DbResult};
use std::future::Future;
use std::time::Duration;
use tiberius::{Client, ToSql};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_util::compat::{Compat, TokioAsyncWriteCompatExt};
use tracing::{debug, info, warn};

/// A live, exclusively owned database connection.
pub trait Connection: Send {
    /// Run a statement and materialize its first result set.
    ///
    /// Without parameters the SQL is sent as a plain batch, exactly as given.
    fn query(
        &mut self,
        sql: &str,
        params: &[SqlParam],
    ) -> impl Future<Output = DbResult<RowSet>> + Send;

    /// Run a statement and return the total number of affected rows.
    fn execute(&mut self, sql: &str) -> impl Future<Output = DbResult<u64>> + Send;

    fn begin_transaction(&mut self) -> impl Future<Output = DbResult<()>> + Send;

    fn commit(&mut self) -> impl Future<Output = DbResult<()>> + Send;

    /// Close the connection. Any open transaction is rolled back by the server.
    fn close(self) -> impl Future<Output = DbResult<()>> + Send
    where
        Self: Sized;
}

/// Produces a fresh connection per call.
pub trait ConnectionProvider: Send + Sync + 'static {
    type Connection: Connection;

    fn get_open_connection(&self) -> impl Future<Output = DbResult<Self::Connection>> + Send;

    /// Upper bound on connection establishment.
    fn connect_timeout(&self) -> Duration;
}

/// Close a connection, logging instead of failing when teardown errors.
///
/// Teardown problems never change the outcome of the call that used the connection.
pub async fn release<C: Connection>(conn: C) {
    if let Err(e) = conn.close().await {
        warn!(error = %e, "Failed to close database connection");
    }
}

// =============================================================================
// SQL Server
// =============================================================================

/// SQL Server connection factory.
///
/// Holds only the parsed, immutable connection configuration.
#[derive(Debug, Clone)]
pub struct SqlConnectionFactory {
    config: tiberius::Config,
    connect_timeout: Duration,
}

impl SqlConnectionFactory {
    /// Create a factory from a connection string.
    ///
    /// Fails with a configuration error when the string is missing, blank or
    /// cannot be parsed. This runs at startup, never inside a tool call.
    pub fn new(connection_string: Option<&str>, connect_timeout: Duration) -> DbResult<Self> {
        let connection_string = connection_string
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| {
                DbError::configuration(format!(
                    "Connection string is not set in the environment variable 'CONNECTION_STRING'.\n\n{}",
                    CONNECTION_STRING_HINT
                ))
            })?;

        if connect_timeout.is_zero() {
            return Err(DbError::configuration(
                "Connect timeout must be greater than 0 seconds",
            ));
        }

        let config = Self::parse_connection_string(connection_string)?;

        Ok(Self {
            config,
            connect_timeout,
        })
    }

    /// Parse an ADO.NET (`Server=...;Database=...`) or JDBC (`jdbc:sqlserver://...`) string.
    fn parse_connection_string(connection_string: &str) -> DbResult<tiberius::Config> {
        let parsed = if connection_string
            .get(..5)
            .is_some_and(|prefix| prefix.eq_ignore_ascii_case("jdbc:"))
        {
            tiberius::Config::from_jdbc_string(connection_string)
        } else {
            tiberius::Config::from_ado_string(connection_string)
        };

        parsed.map_err(|e| DbError::configuration(format!("Invalid connection string: {}", e)))
    }

    /// Server address the factory connects to, as `host:port`.
    pub fn addr(&self) -> String {
        self.config.get_addr()
    }

    async fn connect(config: tiberius::Config) -> DbResult<TdsConnection> {
        let tcp = Self::open_socket(&config).await?;

        match Client::connect(config.clone(), tcp.compat_write()).await {
            Ok(client) => Ok(TdsConnection { client }),
            // Azure SQL gateways answer the login with a redirect to the actual node
            Err(tiberius::error::Error::Routing { host, port }) => {
                info!(host = %host, port = port, "Following server redirect");
                let mut config = config;
                config.host(&host);
                config.port(port);

                let tcp = Self::open_socket(&config).await?;
                let client = Client::connect(config, tcp.compat_write())
                    .await
                    .map_err(connect_error)?;
                Ok(TdsConnection { client })
            }
            Err(e) => Err(connect_error(e)),
        }
    }

    async fn open_socket(config: &tiberius::Config) -> DbResult<TcpStream> {
        let tcp = TcpStream::connect(config.get_addr())
            .await
            .map_err(|e| DbError::connection(e.to_string()))?;
        tcp.set_nodelay(true)
            .map_err(|e| DbError::connection(e.to_string()))?;
        Ok(tcp)
    }
}

impl ConnectionProvider for SqlConnectionFactory {
    type Connection = TdsConnection;

    async fn get_open_connection(&self) -> DbResult<TdsConnection> {
        debug!(addr = %self.addr(), "Opening database connection");

        match timeout(self.connect_timeout, Self::connect(self.config.clone())).await {
            Ok(result) => result,
            Err(_) => Err(DbError::connection(format!(
                "timed out after {}s connecting to {}",
                self.connect_timeout.as_secs(),
                self.addr()
            ))),
        }
    }

    fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }
}

/// Login-phase failures are connection errors, including server-side rejections.
fn connect_error(err: tiberius::error::Error) -> DbError {
    match err {
        tiberius::error::Error::Server(token) => DbError::connection(token.message()),
        other => DbError::connection(other.to_string()),
    }
}

/// A TDS connection to SQL Server.
pub struct TdsConnection {
    client: Client<Compat<TcpStream>>,
}

impl std::fmt::Debug for TdsConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TdsConnection").finish_non_exhaustive()
    }
}

impl Connection for TdsConnection {
    async fn query(&mut self, sql: &str, params: &[SqlParam]) -> DbResult<RowSet> {
        let stream = if params.is_empty() {
            self.client.simple_query(sql).await?
        } else {
            let bound: Vec<&dyn ToSql> = params.iter().map(|p| p as &dyn ToSql).collect();
            self.client.query(sql, &bound).await?
        };

        let rows = stream.into_first_result().await?;

        let columns = rows
            .first()
            .map(|row| {
                row.columns()
                    .iter()
                    .map(|c| c.name().to_string())
                    .collect()
            })
            .unwrap_or_default();
        let values = rows.into_iter().map(row_to_values).collect();

        Ok(RowSet::new(columns, values))
    }

    async fn execute(&mut self, sql: &str) -> DbResult<u64> {
        let result = self.client.execute(sql, &[]).await?;
        Ok(result.total())
    }

    async fn begin_transaction(&mut self) -> DbResult<()> {
        self.client
            .simple_query("BEGIN TRANSACTION")
            .await?
            .into_results()
            .await?;
        Ok(())
    }

    async fn commit(&mut self) -> DbResult<()> {
        self.client
            .simple_query("COMMIT TRANSACTION")
            .await?
            .into_results()
            .await?;
        Ok(())
    }

    async fn close(self) -> DbResult<()> {
        self.client.close().await?;
        Ok(())
    }
}
