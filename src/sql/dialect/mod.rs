//! SQL dialect definitions and rewrite rules.
//!
//! Generated SQL is written against a loosely ANSI mental model, but every
//! engine disagrees on a few details that matter for executing it safely.
//! Each dialect implements `SqlDialect` to describe those details:
//!
//! - Identifier quoting: `"` (ANSI/PG/DuckDB/SQLite), `` ` `` (MySQL), `[]` (T-SQL)
//! - Row limiting: `SELECT TOP n` (head) vs `LIMIT n` / `FETCH NEXT n ROWS ONLY` (trailing)
//! - Whether `ORDER BY ... NULLS FIRST/LAST` is understood natively
//!
//! # Usage
//!
//! ```ignore
//! use heron::sql::dialect::{Dialect, LimitPlacement, SqlDialect};
//!
//! let dialect: Dialect = "tsql".parse()?;
//! assert_eq!(dialect.limit_placement(), LimitPlacement::Head);
//! assert_eq!(dialect.emit_row_limit(10), "TOP 10");
//! ```
//!
//! # Feature Matrix
//!
//! | Feature | SQL Server | PostgreSQL | MySQL | DuckDB | SQLite | ANSI |
//! |---------|-----------|------------|-------|--------|--------|------|
//! | Row limit | `TOP n` | `LIMIT n` | `LIMIT n` | `LIMIT n` | `LIMIT n` | `OFFSET 0 ROWS FETCH NEXT n ROWS ONLY` |
//! | NULLS FIRST/LAST | 2022+ | ✓ | ❌ | ✓ | 3.30+ | ✓ |
//!
//! SQL Server is treated as lacking NULLS ordering, since older servers are
//! still common.

mod ansi;
mod duckdb;
pub mod helpers;
mod mysql;
mod postgres;
mod sqlite;
mod tsql;

use std::str::FromStr;

pub use ansi::Ansi;
pub use duckdb::DuckDb;
pub use mysql::MySql;
pub use postgres::Postgres;
pub use sqlite::Sqlite;
pub use tsql::TSql;

/// Where a dialect expects its row-limit clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitPlacement {
    /// Modifier right after `SELECT` (and after `DISTINCT` if present), e.g. `SELECT TOP 10`.
    Head,
    /// Clause appended after the ordering clause, e.g. `LIMIT 10`.
    Trailing,
}

/// SQL dialect trait - defines how dialect-sensitive constructs are rendered.
///
/// The default implementations follow ANSI SQL where possible.
pub trait SqlDialect: std::fmt::Debug + Send + Sync {
    /// Dialect name for display/logging.
    fn name(&self) -> &'static str;

    /// Human-readable engine name, used when instructing the model.
    fn engine_name(&self) -> &'static str {
        "ANSI SQL"
    }

    // =========================================================================
    // Identifier Quoting
    // =========================================================================

    /// Quote an identifier (table, column, alias).
    ///
    /// - ANSI/PostgreSQL/DuckDB/SQLite: `"identifier"`
    /// - MySQL: `` `identifier` ``
    /// - T-SQL: `[identifier]`
    fn quote_identifier(&self, ident: &str) -> String;

    // =========================================================================
    // Row Limiting
    // =========================================================================

    /// Where the row-limit clause goes.
    fn limit_placement(&self) -> LimitPlacement {
        LimitPlacement::Trailing
    }

    /// Emit the row-limit clause or modifier for `n` rows.
    ///
    /// For head dialects this is the modifier inserted after `SELECT`;
    /// for trailing dialects it is the clause appended to the statement.
    fn emit_row_limit(&self, n: u64) -> String {
        helpers::emit_limit_standard(n)
    }

    // =========================================================================
    // NULLS Ordering
    // =========================================================================

    /// Whether this dialect supports NULLS FIRST/LAST in ORDER BY.
    fn supports_nulls_ordering(&self) -> bool {
        true
    }

    // =========================================================================
    // Parsing
    // =========================================================================

    /// The `sqlparser` dialect used to inspect statements for this engine.
    fn parser_dialect(&self) -> Box<dyn sqlparser::dialect::Dialect> {
        Box::new(sqlparser::dialect::GenericDialect {})
    }
}

/// Supported SQL dialects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Dialect {
    #[default]
    TSql,
    Postgres,
    MySql,
    DuckDb,
    Sqlite,
    Ansi,
}

impl Dialect {
    /// Get the dialect implementation.
    pub fn dialect(&self) -> &'static dyn SqlDialect {
        match self {
            Dialect::TSql => &TSql,
            Dialect::Postgres => &Postgres,
            Dialect::MySql => &MySql,
            Dialect::DuckDb => &DuckDb,
            Dialect::Sqlite => &Sqlite,
            Dialect::Ansi => &Ansi,
        }
    }
}

/// Error returned when a dialect name is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unsupported dialect: {0}. Supported: tsql, postgres, mysql, duckdb, sqlite, ansi")]
pub struct UnknownDialect(pub String);

impl FromStr for Dialect {
    type Err = UnknownDialect;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "tsql" | "mssql" | "sqlserver" | "sql_server" => Ok(Dialect::TSql),
            "postgres" | "postgresql" | "pg" => Ok(Dialect::Postgres),
            "mysql" | "mariadb" => Ok(Dialect::MySql),
            "duckdb" | "duck" => Ok(Dialect::DuckDb),
            "sqlite" | "sqlite3" => Ok(Dialect::Sqlite),
            "ansi" => Ok(Dialect::Ansi),
            other => Err(UnknownDialect(other.to_string())),
        }
    }
}

// Implement SqlDialect for Dialect enum by delegating to concrete types
impl SqlDialect for Dialect {
    fn name(&self) -> &'static str {
        self.dialect().name()
    }

    fn engine_name(&self) -> &'static str {
        self.dialect().engine_name()
    }

    fn quote_identifier(&self, ident: &str) -> String {
        self.dialect().quote_identifier(ident)
    }

    fn limit_placement(&self) -> LimitPlacement {
        self.dialect().limit_placement()
    }

    fn emit_row_limit(&self, n: u64) -> String {
        self.dialect().emit_row_limit(n)
    }

    fn supports_nulls_ordering(&self) -> bool {
        self.dialect().supports_nulls_ordering()
    }

    fn parser_dialect(&self) -> Box<dyn sqlparser::dialect::Dialect> {
        self.dialect().parser_dialect()
    }
}

impl std::fmt::Display for Dialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.dialect().name())
    }
}
