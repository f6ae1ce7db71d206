//! SQLite dialect.
//!
//! - ANSI identifier quoting (`"`), brackets and backticks also accepted
//! - Trailing `LIMIT n`
//! - NULLS FIRST/LAST since 3.30 (the bundled library is newer)

use super::helpers;
use super::SqlDialect;

/// SQLite dialect.
#[derive(Debug, Clone, Copy)]
pub struct Sqlite;

impl SqlDialect for Sqlite {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn engine_name(&self) -> &'static str {
        "SQLite"
    }

    fn quote_identifier(&self, ident: &str) -> String {
        helpers::quote_double(ident)
    }

    fn parser_dialect(&self) -> Box<dyn sqlparser::dialect::Dialect> {
        Box::new(sqlparser::dialect::SQLiteDialect {})
    }
}
