//! The result envelope returned by every tool.

use crate::error::{DbError, DbResult};
use serde::Serialize;
use serde_json::Value as JsonValue;

/// Outcome of a single tool invocation.
///
/// Fields are private so the only way to build one is through the
/// constructors below: a successful result never carries an error, and a
/// failed one never carries data or a row count.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OperationResult {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    rows_affected: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<JsonValue>,
}

impl OperationResult {
    /// Success without payload.
    pub fn ok() -> Self {
        Self {
            success: true,
            error: None,
            rows_affected: None,
            data: None,
        }
    }

    /// Success carrying a payload.
    pub fn with_data(data: JsonValue) -> Self {
        Self {
            data: Some(data),
            ..Self::ok()
        }
    }

    /// Success carrying an affected-row count.
    pub fn with_rows_affected(rows_affected: u64) -> Self {
        Self {
            rows_affected: Some(rows_affected),
            ..Self::ok()
        }
    }

    /// Success carrying both a row count and the rows themselves.
    pub fn with_rows_and_data(rows_affected: u64, data: JsonValue) -> Self {
        Self {
            rows_affected: Some(rows_affected),
            data: Some(data),
            ..Self::ok()
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            rows_affected: None,
            data: None,
        }
    }

    /// Serialize a typed payload into a successful result.
    ///
    /// A payload that cannot be represented as JSON becomes a failure.
    pub fn from_payload<T: Serialize>(payload: &T) -> Self {
        match serde_json::to_value(payload) {
            Ok(data) => Self::with_data(data),
            Err(e) => Self::failure(DbError::internal(e.to_string()).to_string()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.success
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn rows_affected(&self) -> Option<u64> {
        self.rows_affected
    }

    pub fn data(&self) -> Option<&JsonValue> {
        self.data.as_ref()
    }

    /// Pretty-printed JSON, the text sent back to the client.
    pub fn to_pretty_json(&self) -> DbResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| DbError::internal(e.to_string()))
    }
}

impl From<DbError> for OperationResult {
    fn from(err: DbError) -> Self {
        Self::failure(err.to_string())
    }
}
