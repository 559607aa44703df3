//! The `describe_table` tool and the schema introspector behind it.
//!
//! A table description is assembled from five catalog queries on a single
//! connection:
//! 1. Identity (`sys.tables` ⋈ `sys.schemas`) settles the [`ResolvedTable`]
//! 2. Columns, in catalog order
//! 3. Indexes that do not back a primary-key or unique constraint (heaps have none)
//! 4. Primary-key and unique constraints
//! 5. Foreign keys, one row per constraint with joined column lists
//!
//! Steps 2-5 all bind the resolved schema and table name from step 1, so the
//! document never mixes objects from different schemas.

use crate::db::{Connection, ConnectionProvider, RowRef, SqlParam, release};
use crate::error::{DbError, DbResult};
use crate::models::{
    ColumnInfo, ConstraintInfo, ForeignKeyInfo, IndexInfo, OperationResult, ResolvedTable,
    TableIdentity, TableRef, TableSchemaDocument,
};
use crate::tools::{Tool, ToolDescriptor, finish};
use std::sync::Arc;
use tracing::{debug, info};

pub const DESCRIPTOR: ToolDescriptor = ToolDescriptor {
    name: "describe_table",
    title: "Describe Table",
    description: "Returns table schema",
    readonly: true,
    idempotent: true,
    destructive: false,
};

// @P1 is the table name, @P2 the schema name (NULL matches any schema).

pub(crate) const TABLE_IDENTITY_QUERY: &str = "\
SELECT t.object_id AS id, t.name, s.name AS [schema], \
       CAST(p.value AS NVARCHAR(4000)) AS description, RTRIM(t.type) AS type, u.name AS owner \
FROM sys.tables t \
INNER JOIN sys.schemas s ON t.schema_id = s.schema_id \
LEFT JOIN sys.extended_properties p \
       ON p.class = 1 AND p.major_id = t.object_id AND p.minor_id = 0 AND p.name = 'MS_Description' \
LEFT JOIN sys.sysusers u ON t.principal_id = u.uid \
WHERE t.name = @P1 AND (s.name = @P2 OR @P2 IS NULL) \
ORDER BY s.name";

pub(crate) const COLUMNS_QUERY: &str = "\
SELECT c.name, ty.name AS type, c.max_length AS length, c.precision, c.scale, \
       c.is_nullable AS nullable, CAST(p.value AS NVARCHAR(4000)) AS description \
FROM sys.columns c \
INNER JOIN sys.types ty ON c.user_type_id = ty.user_type_id \
LEFT JOIN sys.extended_properties p \
       ON p.class = 1 AND p.major_id = c.object_id AND p.minor_id = c.column_id AND p.name = 'MS_Description' \
WHERE c.object_id = ( \
    SELECT t.object_id FROM sys.tables t \
    INNER JOIN sys.schemas s ON t.schema_id = s.schema_id \
    WHERE t.name = @P1 AND (s.name = @P2 OR @P2 IS NULL)) \
ORDER BY c.column_id";

pub(crate) const INDEXES_QUERY: &str = "\
SELECT i.name, i.type_desc AS type, CAST(p.value AS NVARCHAR(4000)) AS description, \
       STUFF(( \
           SELECT ',' + c.name FROM sys.index_columns ic \
           INNER JOIN sys.columns c ON ic.object_id = c.object_id AND ic.column_id = c.column_id \
           WHERE ic.object_id = i.object_id AND ic.index_id = i.index_id \
           ORDER BY ic.key_ordinal \
           FOR XML PATH(''), TYPE).value('.', 'NVARCHAR(MAX)'), 1, 1, '') AS keys \
FROM sys.indexes i \
LEFT JOIN sys.extended_properties p \
       ON p.class = 7 AND p.major_id = i.object_id AND p.minor_id = i.index_id AND p.name = 'MS_Description' \
WHERE i.object_id = ( \
    SELECT t.object_id FROM sys.tables t \
    INNER JOIN sys.schemas s ON t.schema_id = s.schema_id \
    WHERE t.name = @P1 AND (s.name = @P2 OR @P2 IS NULL)) \
  AND i.index_id > 0 AND i.is_primary_key = 0 AND i.is_unique_constraint = 0 \
ORDER BY i.index_id";

pub(crate) const CONSTRAINTS_QUERY: &str = "\
SELECT kc.name, kc.type_desc AS type, \
       STUFF(( \
           SELECT ',' + c.name FROM sys.index_columns ic \
           INNER JOIN sys.columns c ON ic.object_id = c.object_id AND ic.column_id = c.column_id \
           WHERE ic.object_id = kc.parent_object_id AND ic.index_id = kc.unique_index_id \
           ORDER BY ic.key_ordinal \
           FOR XML PATH(''), TYPE).value('.', 'NVARCHAR(MAX)'), 1, 1, '') AS keys \
FROM sys.key_constraints kc \
WHERE kc.parent_object_id = ( \
    SELECT t.object_id FROM sys.tables t \
    INNER JOIN sys.schemas s ON t.schema_id = s.schema_id \
    WHERE t.name = @P1 AND (s.name = @P2 OR @P2 IS NULL)) \
ORDER BY kc.name";

pub(crate) const FOREIGN_KEYS_QUERY: &str = "\
SELECT fk.name AS name, SCHEMA_NAME(tp.schema_id) AS [schema], tp.name AS table_name, \
       STRING_AGG(cp.name, ', ') WITHIN GROUP (ORDER BY fkc.constraint_column_id) AS column_names, \
       SCHEMA_NAME(tr.schema_id) AS referenced_schema, tr.name AS referenced_table, \
       STRING_AGG(cr.name, ', ') WITHIN GROUP (ORDER BY fkc.constraint_column_id) AS referenced_column_names \
FROM sys.foreign_keys AS fk \
JOIN sys.foreign_key_columns AS fkc ON fk.object_id = fkc.constraint_object_id \
JOIN sys.tables AS tp ON fkc.parent_object_id = tp.object_id \
JOIN sys.columns AS cp ON fkc.parent_object_id = cp.object_id AND fkc.parent_column_id = cp.column_id \
JOIN sys.tables AS tr ON fkc.referenced_object_id = tr.object_id \
JOIN sys.columns AS cr ON fkc.referenced_object_id = cr.object_id AND fkc.referenced_column_id = cr.column_id \
WHERE tp.name = @P1 AND (SCHEMA_NAME(tp.schema_id) = @P2 OR @P2 IS NULL) \
GROUP BY fk.name, tp.schema_id, tp.name, tr.schema_id, tr.name \
ORDER BY fk.name";

/// Describes one table: identity, columns, indexes, constraints, foreign keys.
#[derive(Debug)]
pub struct DescribeTableTool<P> {
    provider: Arc<P>,
}

impl<P: ConnectionProvider> DescribeTableTool<P> {
    pub fn new(provider: Arc<P>) -> Self {
        Self { provider }
    }

    pub async fn execute(&self, table_name: &str) -> OperationResult {
        finish(&DESCRIPTOR, self.describe(table_name).await)
    }

    async fn describe(&self, table_name: &str) -> DbResult<OperationResult> {
        let table = TableRef::parse(table_name);

        let mut conn = self.provider.get_open_connection().await?;
        let outcome = SchemaIntrospector::new(&mut conn).describe(&table).await;
        release(conn).await;
        let document = outcome?;

        info!(
            table = %table,
            columns = document.columns.len(),
            indexes = document.indexes.len(),
            constraints = document.constraints.len(),
            foreign_keys = document.foreign_keys.len(),
            "Described table"
        );

        Ok(OperationResult::from_payload(&document))
    }
}

impl<P> Tool for DescribeTableTool<P> {
    fn descriptor(&self) -> &'static ToolDescriptor {
        &DESCRIPTOR
    }
}

/// Runs the catalog queries for one table over a borrowed connection.
pub struct SchemaIntrospector<'c, C> {
    conn: &'c mut C,
}

impl<'c, C: Connection> SchemaIntrospector<'c, C> {
    pub fn new(conn: &'c mut C) -> Self {
        Self { conn }
    }

    pub async fn describe(&mut self, table: &TableRef) -> DbResult<TableSchemaDocument> {
        let (resolved, identity) = self.resolve(table).await?;
        debug!(table = %resolved, "Resolved table identity");

        let columns = self.columns(&resolved).await?;
        let indexes = self.indexes(&resolved).await?;
        let constraints = self.constraints(&resolved).await?;
        let foreign_keys = self.foreign_keys(&resolved).await?;

        Ok(TableSchemaDocument {
            table: identity,
            columns,
            indexes,
            constraints,
            foreign_keys,
        })
    }

    /// Run the identity query and settle on exactly one (schema, table).
    ///
    /// An unqualified name present in more than one schema is rejected
    /// rather than silently picking one.
    async fn resolve(&mut self, table: &TableRef) -> DbResult<(ResolvedTable, TableIdentity)> {
        let params = [
            SqlParam::text(table.name()),
            SqlParam::optional_text(table.schema()),
        ];
        let rows = self.conn.query(TABLE_IDENTITY_QUERY, &params).await?;

        if rows.len() > 1 {
            let schemas = rows.rows().map(|row| row.str("schema")).collect();
            return Err(DbError::ambiguous_table(table.identifier(), schemas));
        }

        let identity = rows
            .first()
            .map(identity_from_row)
            .ok_or_else(|| DbError::table_not_found(table.identifier()))?;

        let resolved = ResolvedTable::new(&identity.schema, &identity.name);
        Ok((resolved, identity))
    }

    async fn columns(&mut self, table: &ResolvedTable) -> DbResult<Vec<ColumnInfo>> {
        let rows = self.conn.query(COLUMNS_QUERY, &bind(table)).await?;
        Ok(rows.rows().map(|row| column_from_row(&row)).collect())
    }

    async fn indexes(&mut self, table: &ResolvedTable) -> DbResult<Vec<IndexInfo>> {
        let rows = self.conn.query(INDEXES_QUERY, &bind(table)).await?;
        Ok(rows
            .rows()
            .map(|row| IndexInfo {
                name: row.str("name"),
                index_type: row.str("type"),
                description: row.opt_str("description"),
                keys: row.opt_str("keys"),
            })
            .collect())
    }

    async fn constraints(&mut self, table: &ResolvedTable) -> DbResult<Vec<ConstraintInfo>> {
        let rows = self.conn.query(CONSTRAINTS_QUERY, &bind(table)).await?;
        Ok(rows
            .rows()
            .map(|row| ConstraintInfo {
                name: row.str("name"),
                constraint_type: row.str("type"),
                keys: row.opt_str("keys"),
            })
            .collect())
    }

    async fn foreign_keys(&mut self, table: &ResolvedTable) -> DbResult<Vec<ForeignKeyInfo>> {
        let rows = self.conn.query(FOREIGN_KEYS_QUERY, &bind(table)).await?;
        Ok(rows
            .rows()
            .map(|row| ForeignKeyInfo {
                name: row.str("name"),
                schema: row.str("schema"),
                table_name: row.str("table_name"),
                column_name: row.str("column_names"),
                referenced_schema: row.str("referenced_schema"),
                referenced_table: row.str("referenced_table"),
                referenced_column: row.str("referenced_column_names"),
            })
            .collect())
    }
}

fn bind(table: &ResolvedTable) -> [SqlParam; 2] {
    [
        SqlParam::text(&table.name),
        SqlParam::text(&table.schema),
    ]
}

fn identity_from_row(row: RowRef<'_>) -> TableIdentity {
    TableIdentity {
        id: row.value("id"),
        name: row.str("name"),
        schema: row.str("schema"),
        owner: row.opt_str("owner"),
        table_type: row.str("type"),
        description: row.opt_str("description"),
    }
}

fn column_from_row(row: &RowRef<'_>) -> ColumnInfo {
    ColumnInfo {
        name: row.str("name"),
        data_type: row.str("type"),
        length: row.int("length"),
        precision: row.int("precision"),
        scale: row.int("scale"),
        nullable: row.bool("nullable"),
        description: row.opt_str("description"),
    }
}
