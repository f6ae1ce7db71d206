//! ANSI SQL dialect.
//!
//! Used for engines without a dedicated implementation. Limits rows with the
//! SQL:2008 `OFFSET 0 ROWS FETCH NEXT n ROWS ONLY` clause, which most
//! servers accept.

use super::helpers;
use super::SqlDialect;

/// ANSI SQL dialect.
#[derive(Debug, Clone, Copy)]
pub struct Ansi;

impl SqlDialect for Ansi {
    fn name(&self) -> &'static str {
        "ansi"
    }

    fn quote_identifier(&self, ident: &str) -> String {
        helpers::quote_double(ident)
    }

    fn emit_row_limit(&self, n: u64) -> String {
        helpers::emit_fetch_next(n)
    }
}
