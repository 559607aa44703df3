//! Error types for the SQL Server MCP Server.
//!
//! This module defines all error types using `thiserror` for ergonomic error handling.
//! Tool-level failures are folded into a failed `OperationResult` by each tool, so
//! most variants only ever surface as the `error` string of that envelope. The
//! message text is therefore kept close to what the database reported.

use thiserror::Error;

/// Remediation hint shown when no connection string is configured.
pub const CONNECTION_STRING_HINT: &str = "HINT: Have a local SQL Server, with a database called 'test', from console, run \
    `export CONNECTION_STRING='Server=localhost,1433;Database=test;User Id=sa;Password=<password>;TrustServerCertificate=true'` \
    and then run the server";

#[derive(Error, Debug)]
pub enum DbError {
    /// Fatal at startup; never produced by a tool call.
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Failed to connect to database: {message}")]
    Connection { message: String },

    #[error("{object_type} '{name}' not found.")]
    NotFound { object_type: String, name: String },

    #[error(
        "Table '{table}' exists in several schemas ({}). Qualify the name as 'schema.table'.",
        .schemas.join(", ")
    )]
    AmbiguousTable { table: String, schemas: Vec<String> },

    /// Server message is passed through verbatim.
    #[error("{message}")]
    Statement {
        message: String,
        /// SQL Server error number, e.g. 208 for "Invalid object name"
        code: Option<u32>,
    },

    #[error("Unknown tool: {name}")]
    UnknownTool { name: String },

    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl DbError {
    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create a connection error.
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Create a not found error for a table.
    pub fn table_not_found(name: impl Into<String>) -> Self {
        Self::NotFound {
            object_type: "Table".to_string(),
            name: name.into(),
        }
    }

    /// Create a not found error for a stored procedure or function.
    pub fn routine_not_found(name: impl Into<String>) -> Self {
        Self::NotFound {
            object_type: "Procedure or function".to_string(),
            name: name.into(),
        }
    }

    /// Create an ambiguous table error.
    pub fn ambiguous_table(table: impl Into<String>, schemas: Vec<String>) -> Self {
        Self::AmbiguousTable {
            table: table.into(),
            schemas,
        }
    }

    /// Create a statement error with an optional SQL Server error number.
    pub fn statement(message: impl Into<String>, code: Option<u32>) -> Self {
        Self::Statement {
            message: message.into(),
            code,
        }
    }

    /// Create an unknown tool error.
    pub fn unknown_tool(name: impl Into<String>) -> Self {
        Self::UnknownTool { name: name.into() }
    }

    /// Create an invalid input error.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Check if this error is retryable by the caller.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Connection { .. })
    }
}

/// Convert tiberius errors to DbError.
impl From<tiberius::error::Error> for DbError {
    fn from(err: tiberius::error::Error) -> Self {
        use tiberius::error::Error as TdsError;

        match err {
            TdsError::Server(token) => DbError::statement(token.message(), Some(token.code())),
            TdsError::Io { message, .. } => DbError::connection(format!("I/O error: {}", message)),
            TdsError::Tls(msg) => DbError::connection(format!("TLS error: {}", msg)),
            TdsError::Protocol(msg) => DbError::connection(format!("Protocol error: {}", msg)),
            TdsError::Routing { host, port } => DbError::connection(format!(
                "Server requested a redirect to {}:{} that could not be followed",
                host, port
            )),
            TdsError::Conversion(msg) => DbError::internal(format!("Conversion error: {}", msg)),
            TdsError::Utf8 | TdsError::Utf16 => {
                DbError::internal("Invalid text encoding in server response")
            }
            other => DbError::connection(other.to_string()),
        }
    }
}

/// Result type alias for database operations.
pub type DbResult<T> = Result<T, DbError>;

/// Convert DbError to MCP ErrorData for transport-level failures.
impl From<DbError> for rmcp::ErrorData {
    fn from(err: DbError) -> Self {
        match &err {
            DbError::InvalidInput { .. } | DbError::Statement { .. } | DbError::UnknownTool { .. } => {
                rmcp::ErrorData::invalid_params(err.to_string(), None)
            }
            DbError::AmbiguousTable { schemas, .. } => rmcp::ErrorData::invalid_params(
                err.to_string(),
                Some(serde_json::json!({ "schemas": schemas })),
            ),

            DbError::NotFound { .. } => rmcp::ErrorData::resource_not_found(err.to_string(), None),

            DbError::Configuration { .. } | DbError::Connection { .. } | DbError::Internal { .. } => {
                rmcp::ErrorData::internal_error(err.to_string(), None)
            }
        }
    }
}
