//! In-process SQLite executor.

use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use rusqlite::types::ValueRef;
use rusqlite::{Connection, ErrorCode, OpenFlags};
use tracing::{debug, warn};

use super::{DatabaseError, QueryExecutor, QueryResult, Value};
use crate::sql::Dialect;

/// Runs statements against a SQLite file over read-only connections.
///
/// Idle connections are kept for reuse up to `max_idle`. A statement that
/// outlives the timeout is interrupted and its connection discarded.
pub struct SqliteExecutor {
    path: PathBuf,
    idle: Mutex<Vec<Connection>>,
    max_idle: usize,
    timeout: Duration,
    dialect: Dialect,
}

impl SqliteExecutor {
    /// Open the database, verifying it can be read.
    pub fn open<P: AsRef<Path>>(path: P, timeout: Duration, max_idle: usize) -> Result<Self, DatabaseError> {
        let path = path.as_ref().to_path_buf();
        let first = open_read_only(&path)?;

        Ok(Self {
            path,
            idle: Mutex::new(vec![first]),
            max_idle,
            timeout,
            dialect: Dialect::Sqlite,
        })
    }

    pub fn with_dialect(mut self, dialect: Dialect) -> Self {
        self.dialect = dialect;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn checkout(&self) -> Result<Connection, DatabaseError> {
        let pooled = self.idle.lock().ok().and_then(|mut idle| idle.pop());
        match pooled {
            Some(conn) => Ok(conn),
            None => open_read_only(&self.path),
        }
    }

    fn checkin(&self, conn: Connection) {
        if let Ok(mut idle) = self.idle.lock() {
            if idle.len() < self.max_idle {
                idle.push(conn);
            }
        }
    }
}

fn open_read_only(path: &Path) -> Result<Connection, DatabaseError> {
    Connection::open_with_flags(
        path,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_URI | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )
    .map_err(|e| DatabaseError::Connection(e.to_string()))
}

fn run_query(conn: &Connection, sql: &str, limit: u64) -> Result<QueryResult, DatabaseError> {
    let mut stmt = conn.prepare(sql).map_err(query_error)?;
    if !stmt.readonly() {
        return Err(DatabaseError::NotReadOnly);
    }

    let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
    let width = columns.len();

    let mut rows = stmt.query([]).map_err(query_error)?;
    let mut out = Vec::new();

    while (out.len() as u64) < limit {
        let Some(row) = rows.next().map_err(query_error)? else {
            break;
        };
        let mut values = Vec::with_capacity(width);
        for i in 0..width {
            values.push(convert(row.get_ref(i).map_err(query_error)?));
        }
        out.push(values);
    }

    Ok(QueryResult::new(columns, out))
}

fn convert(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::Int(i),
        ValueRef::Real(f) => Value::Float(f),
        ValueRef::Text(bytes) => Value::Text(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(bytes) => Value::Blob(bytes.to_vec()),
    }
}

fn query_error(e: rusqlite::Error) -> DatabaseError {
    match e.sqlite_error_code() {
        Some(ErrorCode::OperationInterrupted) => DatabaseError::Query("statement interrupted".to_string()),
        Some(ErrorCode::CannotOpen) | Some(ErrorCode::NotADatabase) => DatabaseError::Connection(e.to_string()),
        _ => DatabaseError::Query(e.to_string()),
    }
}

#[async_trait]
impl QueryExecutor for SqliteExecutor {
    fn dialect(&self) -> Dialect {
        self.dialect
    }

    async fn execute(&self, sql: &str, limit: u64) -> Result<QueryResult, DatabaseError> {
        let conn = self.checkout()?;
        let interrupt = conn.get_interrupt_handle();
        let sql_owned = sql.to_string();

        let task = tokio::task::spawn_blocking(move || {
            let result = run_query(&conn, &sql_owned, limit);
            (conn, result)
        });

        match tokio::time::timeout(self.timeout, task).await {
            Ok(Ok((conn, result))) => {
                self.checkin(conn);
                if let Ok(rows) = &result {
                    debug!(rows = rows.len(), "sqlite query complete");
                }
                result
            }
            Ok(Err(join_error)) => Err(DatabaseError::Query(format!("query task failed: {join_error}"))),
            Err(_) => {
                // The blocking task drops its connection once interrupted.
                interrupt.interrupt();
                warn!(timeout_secs = self.timeout.as_secs(), "sqlite query timed out");
                Err(DatabaseError::Timeout(self.timeout.as_secs()))
            }
        }
    }
}
