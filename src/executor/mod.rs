//! Query execution.
//!
//! An executor runs one prepared, read-only statement with a row cap and a
//! timeout and hands back the materialised rows. Failures of any kind
//! (connectivity, timeout, server-side rejection) surface as a single
//! [`DatabaseError`] type and are never retried here.
//!
//! - [`SqliteExecutor`] - in process, pooled read-only connections
//! - [`WorkerExecutor`] - SQL Server / DuckDB through the worker process

mod sqlite;
mod worker;

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;

use crate::config::{ConnectionConfig, Driver, Settings};
use crate::sql::Dialect;
use crate::worker::WorkerClient;

pub use sqlite::SqliteExecutor;
pub use worker::WorkerExecutor;

/// Any failure while running a statement.
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("database connection failed: {0}")]
    Connection(String),

    #[error("query timed out after {0} seconds")]
    Timeout(u64),

    #[error("query failed: {0}")]
    Query(String),

    #[error("statement is not read-only")]
    NotReadOnly,
}

/// A single result cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    /// Strings, and dates/times as the server renders them.
    Text(String),
    Blob(Vec<u8>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("NULL"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{}", x),
            Value::Text(s) => f.write_str(s),
            Value::Blob(b) => write!(f, "<{} bytes>", b.len()),
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => n.as_f64().map(Value::Float).unwrap_or_else(|| Value::Text(n.to_string())),
            },
            serde_json::Value::String(s) => Value::Text(s),
            other => Value::Text(other.to_string()),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

/// Rows returned by one statement, columns in server order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryResult {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl QueryResult {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        Self { columns, rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Cell lookup by row index and column name.
    pub fn get(&self, row: usize, column: &str) -> Option<&Value> {
        let idx = self.columns.iter().position(|c| c == column)?;
        self.rows.get(row)?.get(idx)
    }

    /// Each row as `(column, value)` pairs in column order.
    pub fn records(&self) -> impl Iterator<Item = Vec<(&str, &Value)>> {
        self.rows.iter().map(move |row| {
            self.columns
                .iter()
                .map(String::as_str)
                .zip(row.iter())
                .collect()
        })
    }
}

/// Runs prepared statements against one database.
#[async_trait]
pub trait QueryExecutor: Send + Sync {
    /// Dialect statements must be prepared for.
    fn dialect(&self) -> Dialect;

    /// Execute `sql`, materialising at most `limit` rows.
    async fn execute(&self, sql: &str, limit: u64) -> Result<QueryResult, DatabaseError>;
}

/// Open the executor matching the connection's driver.
pub async fn connect(
    settings: &Settings,
    connection: &ConnectionConfig,
) -> Result<Box<dyn QueryExecutor>, DatabaseError> {
    let timeout = Duration::from_secs(settings.query.timeout_secs);

    match connection.driver {
        Driver::Sqlite => {
            let executor = SqliteExecutor::open(
                &connection.connection_string,
                timeout,
                settings.worker.pool.max_idle_conns as usize,
            )?
            .with_dialect(connection.dialect);
            Ok(Box::new(executor))
        }
        Driver::MsSql | Driver::DuckDb => {
            let client = WorkerClient::spawn_with_settings(settings)
                .await
                .map_err(|e| DatabaseError::Connection(e.to_string()))?;
            Ok(Box::new(WorkerExecutor::new(client, connection.clone())))
        }
    }
}
