//! DuckDB SQL dialect.
//!
//! DuckDB is PostgreSQL-compatible for everything the rewriter touches:
//! ANSI quoting, trailing `LIMIT n`, native NULLS FIRST/LAST.

use super::helpers;
use super::SqlDialect;

/// DuckDB SQL dialect.
#[derive(Debug, Clone, Copy)]
pub struct DuckDb;

impl SqlDialect for DuckDb {
    fn name(&self) -> &'static str {
        "duckdb"
    }

    fn engine_name(&self) -> &'static str {
        "DuckDB"
    }

    fn quote_identifier(&self, ident: &str) -> String {
        helpers::quote_double(ident)
    }

    // Uses default emit_row_limit (LIMIT n)

    fn parser_dialect(&self) -> Box<dyn sqlparser::dialect::Dialect> {
        Box::new(sqlparser::dialect::DuckDbDialect {})
    }
}
