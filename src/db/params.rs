//! Parameter binding.
//!
//! Catalog queries bind their filters as text. `execute_stored_procedure` and
//! `execute_function` bind caller-supplied JSON values, typed by their JSON
//! kind. Caller-supplied SQL text is always sent verbatim.

use crate::error::{DbError, DbResult};
use serde_json::Value as JsonValue;
use std::borrow::Cow;
use tiberius::{ColumnData, ToSql};

/// A value bound to an `@Pn` placeholder.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlParam {
    /// NVARCHAR value; `None` binds a typed NULL.
    Text(Option<String>),
    /// BIGINT value.
    Int(i64),
    /// FLOAT value.
    Float(f64),
    /// BIT value.
    Bool(bool),
}

impl SqlParam {
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(Some(value.into()))
    }

    /// Bind an optional value, producing NULL for `None`.
    pub fn optional_text(value: Option<&str>) -> Self {
        Self::Text(value.map(str::to_string))
    }

    /// Bind a JSON argument value.
    ///
    /// Strings, numbers, booleans and null are accepted; arrays and objects
    /// have no scalar SQL counterpart and are rejected.
    pub fn from_json(name: &str, value: &JsonValue) -> DbResult<Self> {
        match value {
            JsonValue::Null => Ok(Self::Text(None)),
            JsonValue::String(s) => Ok(Self::text(s.as_str())),
            JsonValue::Bool(b) => Ok(Self::Bool(*b)),
            JsonValue::Number(n) => match n.as_i64() {
                Some(i) => Ok(Self::Int(i)),
                None => n.as_f64().map(Self::Float).ok_or_else(|| {
                    DbError::invalid_input(format!("Parameter '{}' is out of range", name))
                }),
            },
            JsonValue::Array(_) | JsonValue::Object(_) => Err(DbError::invalid_input(format!(
                "Parameter '{}' must be a string, number, boolean or null",
                name
            ))),
        }
    }

    /// The bound string, if this is a non-NULL text value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(v) => v.as_deref(),
            _ => None,
        }
    }

    /// Render the bound value as text; `None` for NULL.
    pub fn render(&self) -> Option<String> {
        match self {
            Self::Text(v) => v.clone(),
            Self::Int(i) => Some(i.to_string()),
            Self::Float(f) => Some(f.to_string()),
            Self::Bool(b) => Some(b.to_string()),
        }
    }
}

impl ToSql for SqlParam {
    fn to_sql(&self) -> ColumnData<'_> {
        match self {
            SqlParam::Text(v) => ColumnData::String(v.as_deref().map(Cow::Borrowed)),
            SqlParam::Int(i) => ColumnData::I64(Some(*i)),
            SqlParam::Float(f) => ColumnData::F64(Some(*f)),
            SqlParam::Bool(b) => ColumnData::Bit(Some(*b)),
        }
    }
}
