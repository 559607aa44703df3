//! Tools that run caller-supplied SQL and commit it.
//!
//! `create_table`, `drop_table`, `insert_data`, `update_data`,
//! `create_procedure` and `create_function` share one shape: open a
//! connection, begin a transaction, execute the SQL exactly as given, commit,
//! and release the connection. A failure at any step skips the commit; the
//! open transaction is rolled back when the connection goes away.

use crate::db::{Connection, ConnectionProvider, release};
use crate::error::{DbError, DbResult};
use crate::models::OperationResult;
use crate::tools::{Tool, ToolDescriptor, finish};
use std::sync::Arc;
use tracing::{debug, info};

const CREATE_TABLE: ToolDescriptor = ToolDescriptor {
    name: "create_table",
    title: "Create Table",
    description: "Creates a new table in the SQL Database. Expects a valid CREATE TABLE SQL statement as input.",
    readonly: false,
    idempotent: false,
    destructive: false,
};

const DROP_TABLE: ToolDescriptor = ToolDescriptor {
    name: "drop_table",
    title: "Drop Table",
    description: "Drops a table in the SQL Database. Expects a valid DROP TABLE SQL statement as input.",
    readonly: false,
    idempotent: false,
    destructive: true,
};

const INSERT_DATA: ToolDescriptor = ToolDescriptor {
    name: "insert_data",
    title: "Insert Data",
    description: "Inserts data into a table in the SQL Database. Expects a valid INSERT SQL statement as input.",
    readonly: false,
    idempotent: false,
    destructive: false,
};

const UPDATE_DATA: ToolDescriptor = ToolDescriptor {
    name: "update_data",
    title: "Update Data",
    description: "Updates data in a table in the SQL Database. Expects a valid UPDATE SQL statement as input.",
    readonly: false,
    idempotent: false,
    destructive: true,
};

const CREATE_PROCEDURE: ToolDescriptor = ToolDescriptor {
    name: "create_procedure",
    title: "Create Procedure",
    description: "Creates a new stored procedure in the SQL Database. Expects a valid CREATE PROCEDURE SQL statement as input. Use CREATE OR ALTER to update existing procedures.",
    readonly: false,
    idempotent: false,
    destructive: false,
};

const CREATE_FUNCTION: ToolDescriptor = ToolDescriptor {
    name: "create_function",
    title: "Create Function",
    description: "Creates a new function in the SQL Database. Expects a valid CREATE FUNCTION SQL statement as input. Use CREATE OR ALTER to update existing functions.",
    readonly: false,
    idempotent: false,
    destructive: false,
};

/// Which committed-statement tool a [`SqlStatementTool`] acts as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    CreateTable,
    DropTable,
    InsertData,
    UpdateData,
    CreateProcedure,
    CreateFunction,
}

impl StatementKind {
    pub fn descriptor(self) -> &'static ToolDescriptor {
        match self {
            Self::CreateTable => &CREATE_TABLE,
            Self::DropTable => &DROP_TABLE,
            Self::InsertData => &INSERT_DATA,
            Self::UpdateData => &UPDATE_DATA,
            Self::CreateProcedure => &CREATE_PROCEDURE,
            Self::CreateFunction => &CREATE_FUNCTION,
        }
    }

    /// DML tools report how many rows they touched.
    pub fn reports_rows_affected(self) -> bool {
        matches!(self, Self::InsertData | Self::UpdateData)
    }

    /// Object keyword a routine-creating statement must contain.
    fn required_keyword(self) -> Option<&'static str> {
        match self {
            Self::CreateProcedure => Some("PROCEDURE"),
            Self::CreateFunction => Some("FUNCTION"),
            _ => None,
        }
    }

    /// Reject statements that cannot be what this tool creates.
    ///
    /// Only routine-creating tools check their input; everything else is
    /// handed to the server as-is.
    pub fn validate(self, sql: &str) -> DbResult<()> {
        let Some(keyword) = self.required_keyword() else {
            return Ok(());
        };

        let trimmed = sql.trim();
        if trimmed.is_empty() {
            return Err(DbError::invalid_input("SQL statement is required"));
        }

        let upper = trimmed.to_uppercase();
        if !upper.starts_with("CREATE") || !upper.contains(keyword) {
            return Err(DbError::invalid_input(format!(
                "SQL statement must be a CREATE {} statement",
                keyword
            )));
        }

        Ok(())
    }
}

/// Runs one caller-supplied statement inside a committed transaction.
#[derive(Debug)]
pub struct SqlStatementTool<P> {
    provider: Arc<P>,
    kind: StatementKind,
}

impl<P: ConnectionProvider> SqlStatementTool<P> {
    pub fn new(provider: Arc<P>, kind: StatementKind) -> Self {
        Self { provider, kind }
    }

    pub async fn execute(&self, sql: &str) -> OperationResult {
        finish(self.kind.descriptor(), self.run(sql).await)
    }

    async fn run(&self, sql: &str) -> DbResult<OperationResult> {
        self.kind.validate(sql)?;

        let mut conn = self.provider.get_open_connection().await?;
        let outcome = Self::execute_committed(&mut conn, sql).await;
        release(conn).await;
        let rows_affected = outcome?;

        info!(
            tool = self.kind.descriptor().name,
            rows_affected = rows_affected,
            "Statement committed"
        );

        if self.kind.reports_rows_affected() {
            Ok(OperationResult::with_rows_affected(rows_affected))
        } else {
            Ok(OperationResult::ok())
        }
    }

    async fn execute_committed(conn: &mut P::Connection, sql: &str) -> DbResult<u64> {
        debug!(sql = %sql, "Executing statement");
        conn.begin_transaction().await?;
        let rows_affected = conn.execute(sql).await?;
        conn.commit().await?;
        Ok(rows_affected)
    }
}

impl<P> Tool for SqlStatementTool<P> {
    fn descriptor(&self) -> &'static ToolDescriptor {
        self.kind.descriptor()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_dml_reports_rows() {
        assert!(StatementKind::InsertData.reports_rows_affected());
        assert!(StatementKind::UpdateData.reports_rows_affected());
        assert!(!StatementKind::CreateTable.reports_rows_affected());
        assert!(!StatementKind::DropTable.reports_rows_affected());
        assert!(!StatementKind::CreateProcedure.reports_rows_affected());
    }

    #[test]
    fn test_table_tools_accept_anything() {
        assert!(StatementKind::CreateTable.validate("").is_ok());
        assert!(StatementKind::DropTable.validate("SELECT 1").is_ok());
    }

    #[test]
    fn test_create_procedure_validation() {
        let kind = StatementKind::CreateProcedure;
        assert!(kind.validate("CREATE PROCEDURE dbo.p AS SELECT 1").is_ok());
        assert!(kind.validate("  create or alter procedure dbo.p as select 1").is_ok());
        assert!(kind.validate("CREATE PROC dbo.p AS SELECT 1").is_err());
        assert!(kind.validate("ALTER PROCEDURE dbo.p AS SELECT 1").is_err());

        let err = kind.validate("   ").unwrap_err();
        assert_eq!(err.to_string(), "Invalid input: SQL statement is required");
    }

    #[test]
    fn test_create_function_validation() {
        let kind = StatementKind::CreateFunction;
        assert!(
            kind.validate("CREATE FUNCTION dbo.f() RETURNS INT AS BEGIN RETURN 1 END")
                .is_ok()
        );
        let err = kind
            .validate("CREATE PROCEDURE dbo.p AS SELECT 1")
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid input: SQL statement must be a CREATE FUNCTION statement"
        );
    }
}
