//! In-memory connection provider for exercising tools without a database.
//!
//! Every connection records what it is asked to do into a shared log, and
//! answers queries and statements through closures supplied by the test.

#![allow(dead_code)]

use mssql_mcp_server::db::{Connection, ConnectionProvider, RowSet, SqlParam};
use mssql_mcp_server::error::{DbError, DbResult};
use mssql_mcp_server::mcp::ToolRegistry;
use serde_json::Value as JsonValue;
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub type QueryHandler = dyn Fn(&str, &[SqlParam]) -> DbResult<RowSet> + Send + Sync;
pub type ExecuteHandler = dyn Fn(&str) -> DbResult<u64> + Send + Sync;

/// One recorded interaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Connect,
    Query {
        sql: String,
        params: Vec<Option<String>>,
    },
    Execute(String),
    Begin,
    Commit,
    Close,
}

pub struct FakeProvider {
    log: Arc<Mutex<Vec<Call>>>,
    query: Arc<QueryHandler>,
    execute: Arc<ExecuteHandler>,
    connect_error: Option<String>,
}

impl FakeProvider {
    pub fn new() -> Self {
        Self {
            log: Arc::new(Mutex::new(Vec::new())),
            query: Arc::new(|_: &str, _: &[SqlParam]| -> DbResult<RowSet> {
                Ok(RowSet::default())
            }),
            execute: Arc::new(|_: &str| -> DbResult<u64> { Ok(0) }),
            connect_error: None,
        }
    }

    pub fn on_query(
        mut self,
        handler: impl Fn(&str, &[SqlParam]) -> DbResult<RowSet> + Send + Sync + 'static,
    ) -> Self {
        self.query = Arc::new(handler);
        self
    }

    pub fn on_execute(
        mut self,
        handler: impl Fn(&str) -> DbResult<u64> + Send + Sync + 'static,
    ) -> Self {
        self.execute = Arc::new(handler);
        self
    }

    pub fn refuse_connections(mut self, message: &str) -> Self {
        self.connect_error = Some(message.to_string());
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.log.lock().unwrap().clone()
    }

    pub fn queries(&self) -> Vec<(String, Vec<Option<String>>)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Query { sql, params } => Some((sql, params)),
                _ => None,
            })
            .collect()
    }
}

pub struct FakeConnection {
    log: Arc<Mutex<Vec<Call>>>,
    query: Arc<QueryHandler>,
    execute: Arc<ExecuteHandler>,
}

impl FakeConnection {
    fn record(&self, call: Call) {
        self.log.lock().unwrap().push(call);
    }
}

impl Connection for FakeConnection {
    async fn query(&mut self, sql: &str, params: &[SqlParam]) -> DbResult<RowSet> {
        self.record(Call::Query {
            sql: sql.to_string(),
            params: params.iter().map(SqlParam::render).collect(),
        });
        (self.query)(sql, params)
    }

    async fn execute(&mut self, sql: &str) -> DbResult<u64> {
        self.record(Call::Execute(sql.to_string()));
        (self.execute)(sql)
    }

    async fn begin_transaction(&mut self) -> DbResult<()> {
        self.record(Call::Begin);
        Ok(())
    }

    async fn commit(&mut self) -> DbResult<()> {
        self.record(Call::Commit);
        Ok(())
    }

    async fn close(self) -> DbResult<()> {
        self.record(Call::Close);
        Ok(())
    }
}

impl ConnectionProvider for FakeProvider {
    type Connection = FakeConnection;

    async fn get_open_connection(&self) -> DbResult<FakeConnection> {
        self.log.lock().unwrap().push(Call::Connect);
        if let Some(message) = &self.connect_error {
            return Err(DbError::connection(message.clone()));
        }
        Ok(FakeConnection {
            log: self.log.clone(),
            query: self.query.clone(),
            execute: self.execute.clone(),
        })
    }

    fn connect_timeout(&self) -> Duration {
        Duration::from_secs(10)
    }
}

/// Build a registry over the provider, keeping a handle for assertions.
pub fn registry(provider: FakeProvider, readonly: bool) -> (ToolRegistry<FakeProvider>, Arc<FakeProvider>) {
    let provider = Arc::new(provider);
    (ToolRegistry::new(provider.clone(), readonly), provider)
}

/// Parse a successful response body.
pub fn body(text: &str) -> JsonValue {
    serde_json::from_str(text).unwrap_or_else(|e| panic!("not JSON ({}): {}", e, text))
}

pub fn args(value: JsonValue) -> serde_json::Map<String, JsonValue> {
    match value {
        JsonValue::Object(map) => map,
        other => panic!("expected object, got {}", other),
    }
}
