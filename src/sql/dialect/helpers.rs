//! Shared helper functions for SQL dialect implementations.
//!
//! This module provides reusable building blocks that dialects can compose
//! to implement the `SqlDialect` trait with minimal duplication.

// =============================================================================
// Identifier Quoting
// =============================================================================

/// Quote identifier with double quotes (ANSI style).
/// Used by: Postgres, DuckDB, SQLite, ANSI
pub fn quote_double(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

/// Quote identifier with backticks.
/// Used by: MySQL
pub fn quote_backtick(ident: &str) -> String {
    format!("`{}`", ident.replace('`', "``"))
}

/// Quote identifier with square brackets.
/// Used by: T-SQL (SQL Server, Azure SQL)
pub fn quote_bracket(ident: &str) -> String {
    format!("[{}]", ident.replace(']', "]]"))
}

// =============================================================================
// Row Limiting
// =============================================================================

/// Emit `LIMIT n` (standard trailing form).
/// Used by: Postgres, DuckDB, MySQL, SQLite
pub fn emit_limit_standard(n: u64) -> String {
    format!("LIMIT {}", n)
}

/// Emit `OFFSET 0 ROWS FETCH NEXT n ROWS ONLY` (SQL:2008 trailing form).
/// Used by: ANSI
pub fn emit_fetch_next(n: u64) -> String {
    format!("OFFSET 0 ROWS FETCH NEXT {} ROWS ONLY", n)
}

/// Emit `TOP n` (head modifier).
/// Used by: T-SQL
pub fn emit_top(n: u64) -> String {
    format!("TOP {}", n)
}
