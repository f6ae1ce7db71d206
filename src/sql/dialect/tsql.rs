//! T-SQL (SQL Server / Azure SQL) dialect.
//!
//! The differences that matter when running generated queries:
//! - Square bracket identifier quoting (`[name]`)
//! - `SELECT TOP n` for limiting (OFFSET FETCH needs an ORDER BY)
//! - N'...' prefix for Unicode strings
//! - No NULLS FIRST/LAST before SQL Server 2022

use super::helpers;
use super::{LimitPlacement, SqlDialect};

/// T-SQL (SQL Server) dialect.
#[derive(Debug, Clone, Copy)]
pub struct TSql;

impl SqlDialect for TSql {
    fn name(&self) -> &'static str {
        "tsql"
    }

    fn engine_name(&self) -> &'static str {
        "Microsoft SQL-Server"
    }

    fn quote_identifier(&self, ident: &str) -> String {
        helpers::quote_bracket(ident)
    }

    fn limit_placement(&self) -> LimitPlacement {
        LimitPlacement::Head
    }

    fn emit_row_limit(&self, n: u64) -> String {
        helpers::emit_top(n)
    }

    fn supports_nulls_ordering(&self) -> bool {
        // 2022+ supports it, older versions don't. Being conservative here.
        false
    }

    fn parser_dialect(&self) -> Box<dyn sqlparser::dialect::Dialect> {
        Box::new(sqlparser::dialect::MsSqlDialect {})
    }
}
