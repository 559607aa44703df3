//! SQL Server value mappings.
//!
//! This module converts TDS column values into JSON and provides the
//! driver-independent [`RowSet`] that every tool consumes.
//!
//! # Architecture
//!
//! Conversion happens once, when a result set is drained from the wire:
//! 1. `typed_column_to_json` maps each value using its column's declared type
//!    (MONEY arrives as a float and is re-rendered as exact text)
//! 2. `column_to_json` maps each remaining `ColumnData` variant to JSON
//! 3. `RowSet` keeps column names and values in result-set order
//!
//! Tools never see driver types, which keeps them testable against an
//! in-memory connection.

use serde_json::{Map, Value as JsonValue};
use tiberius::{ColumnData, ColumnType, FromSql};

// =============================================================================
// Result Sets
// =============================================================================

/// A fully materialized result set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowSet {
    columns: Vec<String>,
    rows: Vec<Vec<JsonValue>>,
}

impl RowSet {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<JsonValue>>) -> Self {
        Self { columns, rows }
    }

    /// Build a row set from (column, value) records, the shape test doubles use.
    pub fn from_records<const N: usize>(columns: [&str; N], rows: Vec<[JsonValue; N]>) -> Self {
        Self {
            columns: columns.iter().map(|c| c.to_string()).collect(),
            rows: rows.into_iter().map(Vec::from).collect(),
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> impl Iterator<Item = RowRef<'_>> {
        self.rows.iter().map(|values| RowRef {
            columns: &self.columns,
            values,
        })
    }

    pub fn first(&self) -> Option<RowRef<'_>> {
        self.rows().next()
    }

    /// Convert into column-name → value maps, preserving column order.
    ///
    /// Duplicate column names keep the last value, as a map can hold only one.
    pub fn into_records(self) -> Vec<Map<String, JsonValue>> {
        let columns = self.columns;
        self.rows
            .into_iter()
            .map(|values| columns.iter().cloned().zip(values).collect())
            .collect()
    }
}

/// Borrowed view of one row with lookup by column name.
#[derive(Debug, Clone, Copy)]
pub struct RowRef<'a> {
    columns: &'a [String],
    values: &'a [JsonValue],
}

impl<'a> RowRef<'a> {
    /// Value of the named column, or `Null` when the column is absent.
    pub fn get(&self, column: &str) -> &'a JsonValue {
        self.columns
            .iter()
            .position(|c| c.eq_ignore_ascii_case(column))
            .and_then(|idx| self.values.get(idx))
            .unwrap_or(&JsonValue::Null)
    }

    /// The value as an owned JSON value.
    pub fn value(&self, column: &str) -> JsonValue {
        self.get(column).clone()
    }

    /// String value; NULL and empty strings become `None`.
    pub fn opt_str(&self, column: &str) -> Option<String> {
        match self.get(column) {
            JsonValue::String(s) if !s.is_empty() => Some(s.clone()),
            JsonValue::Null => None,
            JsonValue::String(_) => None,
            other => Some(other.to_string()),
        }
    }

    /// String value with NULL mapped to an empty string.
    pub fn str(&self, column: &str) -> String {
        match self.get(column) {
            JsonValue::String(s) => s.clone(),
            JsonValue::Null => String::new(),
            other => other.to_string(),
        }
    }

    /// Integer value; NULL and non-numeric values become 0.
    pub fn int(&self, column: &str) -> i64 {
        match self.get(column) {
            JsonValue::Number(n) => n.as_i64().unwrap_or_default(),
            JsonValue::String(s) => s.trim().parse().unwrap_or_default(),
            _ => 0,
        }
    }

    /// Boolean value; BIT columns arrive as JSON booleans, computed flags may be integers.
    pub fn bool(&self, column: &str) -> bool {
        match self.get(column) {
            JsonValue::Bool(b) => *b,
            JsonValue::Number(n) => n.as_i64().is_some_and(|v| v != 0),
            _ => false,
        }
    }
}

// =============================================================================
// Binary Encoding
// =============================================================================

/// Encode binary column data as base64 text.
pub fn encode_binary_value(bytes: &[u8]) -> JsonValue {
    use base64::{Engine as _, engine::general_purpose::STANDARD};

    JsonValue::String(STANDARD.encode(bytes))
}

// =============================================================================
// Column Decoding
// =============================================================================

/// Convert a single TDS column value to JSON.
///
/// DECIMAL/NUMERIC/MONEY are rendered as strings to keep their exact
/// representation; temporal types use ISO-8601.
pub fn column_to_json(data: ColumnData<'static>) -> JsonValue {
    match data {
        ColumnData::U8(v) => v.map(JsonValue::from).unwrap_or(JsonValue::Null),
        ColumnData::I16(v) => v.map(JsonValue::from).unwrap_or(JsonValue::Null),
        ColumnData::I32(v) => v.map(JsonValue::from).unwrap_or(JsonValue::Null),
        ColumnData::I64(v) => v.map(JsonValue::from).unwrap_or(JsonValue::Null),
        ColumnData::F32(v) => v
            .and_then(|f| serde_json::Number::from_f64(f as f64))
            .map(JsonValue::Number)
            .unwrap_or(JsonValue::Null),
        ColumnData::F64(v) => v
            .and_then(serde_json::Number::from_f64)
            .map(JsonValue::Number)
            .unwrap_or(JsonValue::Null),
        ColumnData::Bit(v) => v.map(JsonValue::Bool).unwrap_or(JsonValue::Null),
        ColumnData::String(v) => v
            .map(|s| JsonValue::String(s.into_owned()))
            .unwrap_or(JsonValue::Null),
        ColumnData::Guid(v) => v
            .map(|g| JsonValue::String(g.to_string()))
            .unwrap_or(JsonValue::Null),
        ColumnData::Binary(v) => v
            .map(|b| encode_binary_value(&b))
            .unwrap_or(JsonValue::Null),
        ColumnData::Numeric(v) => v
            .map(|n| JsonValue::String(n.to_string()))
            .unwrap_or(JsonValue::Null),
        ColumnData::Xml(v) => v
            .map(|x| JsonValue::String(x.into_owned().into_string()))
            .unwrap_or(JsonValue::Null),
        ColumnData::DateTime(_) | ColumnData::SmallDateTime(_) | ColumnData::DateTime2(_) => {
            decode_with::<chrono::NaiveDateTime>(&data, |v| {
                v.format("%Y-%m-%dT%H:%M:%S%.f").to_string()
            })
        }
        ColumnData::Date(_) => {
            decode_with::<chrono::NaiveDate>(&data, |v| v.format("%Y-%m-%d").to_string())
        }
        ColumnData::Time(_) => {
            decode_with::<chrono::NaiveTime>(&data, |v| v.format("%H:%M:%S%.f").to_string())
        }
        ColumnData::DateTimeOffset(_) => {
            decode_with::<chrono::DateTime<chrono::FixedOffset>>(&data, |v| v.to_rfc3339())
        }
        #[allow(unreachable_patterns)]
        _ => JsonValue::Null,
    }
}

fn decode_with<'a, T>(data: &'a ColumnData<'static>, render: impl FnOnce(T) -> String) -> JsonValue
where
    T: FromSql<'a>,
{
    match T::from_sql(data) {
        Ok(Some(v)) => JsonValue::String(render(v)),
        Ok(None) => JsonValue::Null,
        Err(e) => {
            tracing::error!("Failed to decode temporal value: {}", e);
            JsonValue::Null
        }
    }
}

/// Convert a column value, taking the column's declared type into account.
pub fn typed_column_to_json(data: ColumnData<'static>, column_type: ColumnType) -> JsonValue {
    match column_type {
        ColumnType::Money | ColumnType::Money4 => money_to_json(data),
        _ => column_to_json(data),
    }
}

/// MONEY/SMALLMONEY as a fixed four-decimal string.
///
/// The driver decodes both as `F64`; rounding back to the scaled integer
/// restores the stored value.
pub fn money_to_json(data: ColumnData<'static>) -> JsonValue {
    match data {
        ColumnData::F64(Some(v)) => JsonValue::String(format_money(v)),
        ColumnData::F32(Some(v)) => JsonValue::String(format_money(f64::from(v))),
        other => column_to_json(other),
    }
}

fn format_money(value: f64) -> String {
    // Saturates at the MONEY range bounds
    let scaled = (value * 10_000.0).round() as i64;
    let sign = if scaled < 0 { "-" } else { "" };
    let abs = scaled.unsigned_abs();
    format!("{}{}.{:04}", sign, abs / 10_000, abs % 10_000)
}

/// Drain a tiberius row into JSON values, in column order.
pub fn row_to_values(row: tiberius::Row) -> Vec<JsonValue> {
    let types: Vec<ColumnType> = row.columns().iter().map(|c| c.column_type()).collect();
    row.into_iter()
        .zip(types)
        .map(|(data, column_type)| typed_column_to_json(data, column_type))
        .collect()
}
