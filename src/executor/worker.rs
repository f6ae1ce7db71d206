//! Executor backed by the database worker process.

use async_trait::async_trait;
use tracing::debug;

use super::{DatabaseError, QueryExecutor, QueryResult, Value};
use crate::config::ConnectionConfig;
use crate::sql::Dialect;
use crate::worker::{WorkerClient, WorkerError};

/// Sends prepared statements to the worker's `query.execute` method.
pub struct WorkerExecutor {
    client: WorkerClient,
    connection: ConnectionConfig,
}

impl WorkerExecutor {
    pub fn new(client: WorkerClient, connection: ConnectionConfig) -> Self {
        Self { client, connection }
    }
}

impl From<WorkerError> for DatabaseError {
    fn from(e: WorkerError) -> Self {
        match e {
            WorkerError::Timeout(secs) => DatabaseError::Timeout(secs),
            e if e.is_connection_failure() => DatabaseError::Connection(e.to_string()),
            e => DatabaseError::Query(e.to_string()),
        }
    }
}

#[async_trait]
impl QueryExecutor for WorkerExecutor {
    fn dialect(&self) -> Dialect {
        self.connection.dialect
    }

    async fn execute(&self, sql: &str, limit: u64) -> Result<QueryResult, DatabaseError> {
        let response = self
            .client
            .execute_query(
                self.connection.driver_name(),
                &self.connection.connection_string,
                sql,
                Some(limit),
            )
            .await?;

        debug!(rows = response.row_count, driver = self.connection.driver_name(), "worker query complete");

        let columns = response.columns.into_iter().map(|c| c.name).collect();
        let rows = response
            .rows
            .into_iter()
            .take(limit as usize)
            .map(|row| row.into_iter().map(Value::from).collect())
            .collect();

        Ok(QueryResult::new(columns, rows))
    }
}
