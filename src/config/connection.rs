//! Database connection configuration.
//!
//! Supports configuration via environment variables when no connection is
//! named in the config file:
//! - `HERON_DB_DRIVER`: Database driver (mssql, duckdb, sqlite)
//! - `HERON_DB_CONNECTION`: Connection string or file path
//! - `HERON_DB_DIALECT`: SQL dialect override (optional)

use std::env;
use std::fmt;
use std::str::FromStr;

use crate::sql::Dialect;

/// Error type for connection configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Unsupported driver: {0}. Supported: mssql, duckdb, sqlite")]
    UnsupportedDriver(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Supported database drivers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Driver {
    /// Microsoft SQL Server, through the worker
    MsSql,
    /// DuckDB (file or in-memory), through the worker
    DuckDb,
    /// SQLite, in process
    Sqlite,
}

impl Driver {
    /// Get the driver name for the worker.
    pub fn as_str(&self) -> &'static str {
        match self {
            Driver::MsSql => "mssql",
            Driver::DuckDb => "duckdb",
            Driver::Sqlite => "sqlite",
        }
    }

    /// The dialect generated SQL is rewritten for by default.
    pub fn default_dialect(&self) -> Dialect {
        match self {
            Driver::MsSql => Dialect::TSql,
            Driver::DuckDb => Dialect::DuckDb,
            Driver::Sqlite => Dialect::Sqlite,
        }
    }

    /// Whether queries run through the external worker process.
    pub fn uses_worker(&self) -> bool {
        !matches!(self, Driver::Sqlite)
    }
}

impl FromStr for Driver {
    type Err = ConnectionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mssql" | "sqlserver" | "sql_server" => Ok(Driver::MsSql),
            "duckdb" | "duck" => Ok(Driver::DuckDb),
            "sqlite" | "sqlite3" => Ok(Driver::Sqlite),
            other => Err(ConnectionError::UnsupportedDriver(other.to_string())),
        }
    }
}

impl fmt::Display for Driver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Database connection configuration.
#[derive(Clone)]
pub struct ConnectionConfig {
    /// Database driver.
    pub driver: Driver,
    /// Driver-specific connection string (a file path for SQLite/DuckDB).
    pub connection_string: String,
    /// Dialect generated SQL is prepared for.
    pub dialect: Dialect,
}

impl ConnectionConfig {
    /// A connection using the driver's default dialect.
    pub fn new(driver: Driver, connection_string: impl Into<String>) -> Self {
        Self {
            driver,
            connection_string: connection_string.into(),
            dialect: driver.default_dialect(),
        }
    }

    /// Create a new connection config for a SQLite file.
    pub fn sqlite(path: impl Into<String>) -> Self {
        Self::new(Driver::Sqlite, path)
    }

    /// Override the dialect.
    pub fn with_dialect(mut self, dialect: Dialect) -> Self {
        self.dialect = dialect;
        self
    }

    /// Load configuration from environment variables.
    ///
    /// Required:
    /// - `HERON_DB_DRIVER`: mssql, duckdb or sqlite
    /// - `HERON_DB_CONNECTION`: Connection string or file path
    ///
    /// Optional:
    /// - `HERON_DB_DIALECT`: Dialect override
    pub fn from_env() -> Result<Self, ConnectionError> {
        let driver_str = env::var("HERON_DB_DRIVER")
            .map_err(|_| ConnectionError::MissingEnvVar("HERON_DB_DRIVER".to_string()))?;
        let driver: Driver = driver_str.parse()?;

        let connection_string = env::var("HERON_DB_CONNECTION")
            .map_err(|_| ConnectionError::MissingEnvVar("HERON_DB_CONNECTION".to_string()))?;

        let mut config = Self::new(driver, connection_string);
        if let Ok(dialect) = env::var("HERON_DB_DIALECT") {
            config.dialect = dialect
                .parse::<Dialect>()
                .map_err(|e| ConnectionError::InvalidConfig(e.to_string()))?;
        }

        Ok(config)
    }

    /// Get the driver name for the worker.
    pub fn driver_name(&self) -> &'static str {
        self.driver.as_str()
    }
}

// Connection strings may carry credentials; keep them out of Debug output.
impl fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("driver", &self.driver)
            .field("connection_string", &"<redacted>")
            .field("dialect", &self.dialect)
            .finish()
    }
}
