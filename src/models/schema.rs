//! Table schema models.
//!
//! This module defines the document produced by `describe_table` and the
//! identifiers used to locate a table in the catalog.

use serde::Serialize;
use serde_json::Value as JsonValue;
use std::fmt;

/// A table identifier as supplied by the caller.
///
/// `"schema.table"` is split on the first `.`; an undotted name leaves the
/// schema unresolved so it matches a table of that name in any schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRef {
    identifier: String,
    schema: Option<String>,
    name: String,
}

impl TableRef {
    pub fn parse(identifier: &str) -> Self {
        let (schema, name) = match identifier.split_once('.') {
            Some((schema, name)) => (Some(schema.to_string()), name.to_string()),
            None => (None, identifier.to_string()),
        };

        Self {
            identifier: identifier.to_string(),
            schema,
            name,
        }
    }

    pub fn schema(&self) -> Option<&str> {
        self.schema.as_deref()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The identifier exactly as given.
    pub fn identifier(&self) -> &str {
        &self.identifier
    }
}

impl fmt::Display for TableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.identifier)
    }
}

/// The (schema, table) pair the identity lookup settled on.
///
/// Every sub-query of one `describe_table` call binds this same value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTable {
    pub schema: String,
    pub name: String,
}

impl ResolvedTable {
    pub fn new(schema: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for ResolvedTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.schema, self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableIdentity {
    /// `sys.tables.object_id`
    pub id: JsonValue,
    pub name: String,
    pub schema: String,
    pub owner: Option<String>,
    /// Object type code, `U` for user tables
    #[serde(rename = "type")]
    pub table_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnInfo {
    pub name: String,
    #[serde(rename = "type")]
    pub data_type: String,
    /// Bytes; -1 for MAX types
    pub length: i64,
    pub precision: i64,
    pub scale: i64,
    pub nullable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// An index that does not back a primary-key or unique constraint.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndexInfo {
    pub name: String,
    #[serde(rename = "type")]
    pub index_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Comma-separated key columns in key order
    pub keys: Option<String>,
}

/// A primary-key or unique constraint.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConstraintInfo {
    pub name: String,
    #[serde(rename = "type")]
    pub constraint_type: String,
    pub keys: Option<String>,
}

/// One foreign key, with its column pairs joined in constraint order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForeignKeyInfo {
    pub name: String,
    pub schema: String,
    pub table_name: String,
    pub column_name: String,
    pub referenced_schema: String,
    pub referenced_table: String,
    pub referenced_column: String,
}

/// Full logical description of one table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableSchemaDocument {
    pub table: TableIdentity,
    pub columns: Vec<ColumnInfo>,
    pub indexes: Vec<IndexInfo>,
    pub constraints: Vec<ConstraintInfo>,
    #[serde(rename = "foreignKeys")]
    pub foreign_keys: Vec<ForeignKeyInfo>,
}
