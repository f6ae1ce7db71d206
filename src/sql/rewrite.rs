//! Sanitising, read-only enforcement and dialect rewrites for generated SQL.
//!
//! [`prepare`] is the only path from a candidate statement to an executor.
//! Its steps are order-sensitive:
//!
//! ```text
//! candidate SQL
//!     │ isolate_statement   cut at the first `;` outside quotes and comments
//!     │ strip_comments      `--` and `/* */` comments become a space
//!     │ strip_chatter       drop echoed `assistant:` / `user:` lines and after
//!     │ ensure_read_only    SELECT only, no SELECT INTO / FOR UPDATE
//!     │ rewrite_nulls_ordering   only when the dialect lacks NULLS FIRST/LAST
//!     ▼ apply_row_limit     TOP n after SELECT [DISTINCT], or a trailing clause
//! bounded, read-only statement
//! ```

use std::borrow::Cow;

use once_cell::sync::Lazy;
use regex::Regex;
use sqlparser::ast::{Query, SetExpr, Statement};
use sqlparser::parser::Parser;
use tracing::debug;

use super::dialect::{LimitPlacement, SqlDialect};
use super::salvage::starts_with_select;

/// Alias given to the derived table when a statement has to be wrapped.
pub const SUBQUERY_ALIAS: &str = "_sub";

static ROLE_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^\s*(assistant|system|user)\b").expect("valid regex"));

static NULLS_MODIFIER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?ix)
        (?: \s+ (?P<dir> ASC | DESC ) )?      # optional direction
        \s+ NULLS \s+ (?P<place> FIRST | LAST ) \b
        ",
    )
    .expect("valid regex")
});

static SORT_LIST_START: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bby$").expect("valid regex"));

/// Words that can precede a NULLS modifier without being a sort key.
const NOT_SORT_KEYS: &[&str] = &["ASC", "DESC", "BY", "ORDER", "NULLS"];

static HEAD_SELECT_DISTINCT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^select\s+distinct\b").expect("valid regex"));

static HEAD_SELECT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^select\b").expect("valid regex"));

static EXISTING_TOP: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(select\s+(?:distinct\s+)?)top\s*(?:\(\s*(\d+)\s*\)|(\d+))(\s+percent\b)?")
        .expect("valid regex")
});

static TRAILING_LIMIT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\blimit\s+(\d+)\s*$").expect("valid regex"));

static OTHER_ROW_LIMIT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(limit|offset|fetch\s+(first|next))\b").expect("valid regex")
});

/// The statement may not be executed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UnsafeQueryError {
    /// Anything that does not begin with SELECT, including an empty statement.
    #[error("only SELECT statements may be executed")]
    NotSelect,

    /// A SELECT that writes or locks (`SELECT ... INTO`, `FOR UPDATE`).
    #[error("statement would modify data: {0}")]
    Writes(&'static str),

    /// Unparseable text that still carries a statement separator.
    #[error("multiple statements are not allowed")]
    MultipleStatements,
}

/// Turn a candidate statement into a bounded, read-only statement for `dialect`.
pub fn prepare(
    sql: &str,
    limit: u64,
    dialect: &dyn SqlDialect,
) -> Result<String, UnsafeQueryError> {
    let cleaned = sanitize(sql);
    ensure_read_only(&cleaned, dialect)?;

    let ordered = if dialect.supports_nulls_ordering() {
        Cow::Borrowed(cleaned.as_str())
    } else {
        rewrite_nulls_ordering(&cleaned)
    };

    let prepared = apply_row_limit(&ordered, limit, dialect);
    debug!(dialect = dialect.name(), sql = %prepared, "prepared statement");
    Ok(prepared)
}

/// Statement isolation, comment removal, then chatter removal.
pub fn sanitize(sql: &str) -> String {
    strip_chatter(&strip_comments(isolate_statement(sql)))
}

// =============================================================================
// Sanitising
// =============================================================================

/// Everything before the first statement terminator.
///
/// Semicolons inside string literals, quoted identifiers or comments don't
/// count.
pub fn isolate_statement(sql: &str) -> &str {
    let mut end = sql.len();
    scan(sql, |idx, c, lexeme| {
        if lexeme == Lexeme::Code && c == ';' {
            end = idx;
            return false;
        }
        true
    });
    &sql[..end]
}

/// Replace `-- line` and `/* block */` comments with a single space.
///
/// Line breaks that end a line comment are kept. Comment markers inside
/// literals are left alone.
pub fn strip_comments(sql: &str) -> String {
    let mut out = String::with_capacity(sql.len());
    let mut in_comment = false;
    scan(sql, |_, c, lexeme| {
        match lexeme {
            Lexeme::LineComment | Lexeme::BlockComment => {
                if !in_comment {
                    out.push(' ');
                    in_comment = true;
                }
            }
            Lexeme::Code | Lexeme::Quoted(_) => {
                out.push(c);
                in_comment = false;
            }
        }
        true
    });
    out
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lexeme {
    Code,
    /// Inside a literal or quoted identifier closed by the given char.
    Quoted(char),
    LineComment,
    BlockComment,
}

/// Walk `sql`, reporting each char with its byte offset and the lexeme it
/// belongs to, until `visit` returns false. Returns the state at the end of
/// the walk so callers can spot an unterminated literal or comment.
///
/// The second char of `/*` and `*/` is consumed without a visit.
fn scan<F>(sql: &str, mut visit: F) -> Lexeme
where
    F: FnMut(usize, char, Lexeme) -> bool,
{
    let mut state = Lexeme::Code;
    let mut chars = sql.char_indices().peekable();

    while let Some((idx, c)) = chars.next() {
        let next = chars.peek().map(|&(_, n)| n);
        let lexeme = match state {
            Lexeme::Code => {
                state = match (c, next) {
                    ('-', Some('-')) => Lexeme::LineComment,
                    ('/', Some('*')) => {
                        chars.next();
                        Lexeme::BlockComment
                    }
                    ('\'' | '"' | '`', _) => Lexeme::Quoted(c),
                    ('[', _) => Lexeme::Quoted(']'),
                    _ => Lexeme::Code,
                };
                state
            }
            Lexeme::Quoted(end) => {
                if c == end {
                    state = Lexeme::Code;
                }
                Lexeme::Quoted(end)
            }
            Lexeme::LineComment => {
                if c == '\n' {
                    state = Lexeme::Code;
                }
                state
            }
            Lexeme::BlockComment => {
                if c == '*' && next == Some('/') {
                    chars.next();
                    state = Lexeme::Code;
                }
                Lexeme::BlockComment
            }
        };

        if !visit(idx, c, lexeme) {
            break;
        }
    }

    state
}

/// Drop the first line that starts with a conversational role marker and
/// everything after it.
pub fn strip_chatter(sql: &str) -> String {
    sql.lines()
        .take_while(|line| !ROLE_MARKER.is_match(line))
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

// =============================================================================
// Read-only Enforcement
// =============================================================================

/// Reject anything that is not a single read-only SELECT.
///
/// The leading keyword check is authoritative. Statements the parser
/// understands are additionally inspected for writes. Statements it can't
/// parse are left for the server to judge, unless a `;` survives anywhere
/// in them.
pub fn ensure_read_only(sql: &str, dialect: &dyn SqlDialect) -> Result<(), UnsafeQueryError> {
    if !starts_with_select(sql.trim_start()) {
        return Err(UnsafeQueryError::NotSelect);
    }

    let parser_dialect = dialect.parser_dialect();
    match Parser::parse_sql(&*parser_dialect, sql) {
        Ok(statements) => {
            for statement in &statements {
                match statement {
                    Statement::Query(query) => check_query(query)?,
                    _ => return Err(UnsafeQueryError::NotSelect),
                }
            }
            Ok(())
        }
        Err(_) if sql.contains(';') => Err(UnsafeQueryError::MultipleStatements),
        Err(e) => {
            debug!(error = %e, "statement not parseable, leaving syntax to the server");
            Ok(())
        }
    }
}

fn check_query(query: &Query) -> Result<(), UnsafeQueryError> {
    if !query.locks.is_empty() {
        return Err(UnsafeQueryError::Writes("row locking clause"));
    }
    check_set_expr(&query.body)
}

fn check_set_expr(body: &SetExpr) -> Result<(), UnsafeQueryError> {
    match body {
        SetExpr::Select(select) if select.into.is_some() => {
            Err(UnsafeQueryError::Writes("SELECT INTO"))
        }
        SetExpr::Query(query) => check_query(query),
        SetExpr::SetOperation { left, right, .. } => {
            check_set_expr(left)?;
            check_set_expr(right)
        }
        SetExpr::Insert(_) | SetExpr::Update(_) => Err(UnsafeQueryError::Writes("DML")),
        _ => Ok(()),
    }
}

// =============================================================================
// NULLS Ordering
// =============================================================================

/// Rewrite `expr [ASC|DESC] NULLS FIRST|LAST` into a two-key ordering.
///
/// `x DESC NULLS LAST` becomes
/// `CASE WHEN x IS NULL THEN 0 ELSE 1 END DESC, x DESC`: the rank key sorts
/// in the same direction as the expression, so the 0/1 assignment flips
/// with the direction. The sort key is a name (`s.Name`, `[Current]`) or a
/// parenthesised call such as `COALESCE(a, b)` that forms a whole ordering
/// item; anything else is left as is.
pub fn rewrite_nulls_ordering(sql: &str) -> Cow<'_, str> {
    let mut out = String::with_capacity(sql.len());
    let mut copied = 0;
    let mut changed = false;

    for caps in NULLS_MODIFIER.captures_iter(sql) {
        let Some(modifier) = caps.get(0) else { continue };
        let Some(start) = sort_key_start(&sql[..modifier.start()]) else {
            continue;
        };
        if start < copied {
            continue;
        }

        let expr = &sql[start..modifier.start()];
        let dir = caps.name("dir").map(|m| m.as_str().to_uppercase());
        let nulls_first = caps["place"].eq_ignore_ascii_case("FIRST");

        out.push_str(&sql[copied..start]);
        out.push_str(&null_rank_ordering(expr, dir.as_deref(), nulls_first));
        copied = modifier.end();
        changed = true;
    }

    if !changed {
        return Cow::Borrowed(sql);
    }
    out.push_str(&sql[copied..]);
    Cow::Owned(out)
}

fn null_rank_ordering(expr: &str, dir: Option<&str>, nulls_first: bool) -> String {
    let descending = dir == Some("DESC");
    let (null_rank, value_rank) = if nulls_first != descending {
        (0, 1)
    } else {
        (1, 0)
    };

    match dir {
        Some(dir) => format!(
            "CASE WHEN {expr} IS NULL THEN {null_rank} ELSE {value_rank} END {dir}, {expr} {dir}"
        ),
        None => format!("CASE WHEN {expr} IS NULL THEN {null_rank} ELSE {value_rank} END, {expr}"),
    }
}

/// Byte offset where the sort key ending at the end of `before` starts.
fn sort_key_start(before: &str) -> Option<usize> {
    let end = before.len();
    let mut start = end;

    if before.ends_with(')') {
        let mut depth = 0usize;
        let mut open = None;
        for (idx, c) in before.char_indices().rev() {
            match c {
                ')' => depth += 1,
                '(' => {
                    depth = depth.checked_sub(1)?;
                    if depth == 0 {
                        open = Some(idx);
                        break;
                    }
                }
                _ => {}
            }
        }
        start = open?;
    }

    // Name chars directly before the key: a column, or the function name of a call.
    for (idx, c) in before[..start].char_indices().rev() {
        if c.is_alphanumeric() || matches!(c, '_' | '.' | '[' | ']' | '"' | '`') {
            start = idx;
        } else {
            break;
        }
    }

    let expr = &before[start..end];
    if expr.is_empty() || NOT_SORT_KEYS.iter().any(|k| expr.eq_ignore_ascii_case(k)) {
        return None;
    }

    // The key must be a whole ordering item, not the tail of `a + b`.
    let preceding = before[..start].trim_end();
    let whole_item = preceding.ends_with(',')
        || SORT_LIST_START.is_match(preceding);
    whole_item.then_some(start)
}

// =============================================================================
// Row Limiting
// =============================================================================

/// Bound `sql` to at most `limit` rows using the dialect's limit syntax.
///
/// `sql` is expected to be sanitised: a trailing comment would swallow an
/// appended clause.
pub fn apply_row_limit(sql: &str, limit: u64, dialect: &dyn SqlDialect) -> String {
    let sql = sql.trim();
    match dialect.limit_placement() {
        LimitPlacement::Head => apply_head_limit(sql, limit, dialect),
        LimitPlacement::Trailing => apply_trailing_limit(sql, limit, dialect),
    }
}

fn apply_head_limit(sql: &str, limit: u64, dialect: &dyn SqlDialect) -> String {
    let modifier = dialect.emit_row_limit(limit);

    if let Some(caps) = EXISTING_TOP.captures(sql) {
        if caps.get(4).is_none() {
            let existing = caps.get(2).or_else(|| caps.get(3)).map(|m| m.as_str());
            let n = clamp(existing, limit);
            let end = caps.get(0).map(|m| m.end()).unwrap_or(0);
            return format!("{}{}{}", &caps[1], dialect.emit_row_limit(n), &sql[end..]);
        }
        return wrap_head(sql, &modifier);
    }

    let head = HEAD_SELECT_DISTINCT
        .find(sql)
        .or_else(|| HEAD_SELECT.find(sql));

    match head {
        Some(m) => {
            let rest = &sql[m.end()..];
            let sep = if rest.starts_with(char::is_whitespace) { "" } else { " " };
            format!("{} {}{}{}", &sql[..m.end()], modifier, sep, rest)
        }
        None => wrap_head(sql, &modifier),
    }
}

fn wrap_head(sql: &str, modifier: &str) -> String {
    format!("SELECT {} * FROM ({}) AS {}", modifier, sql, SUBQUERY_ALIAS)
}

fn apply_trailing_limit(sql: &str, limit: u64, dialect: &dyn SqlDialect) -> String {
    let clause = dialect.emit_row_limit(limit);
    let uses_limit_keyword = clause.starts_with("LIMIT");

    if uses_limit_keyword {
        if let Some(caps) = TRAILING_LIMIT.captures(sql) {
            let n = clamp(caps.get(1).map(|m| m.as_str()), limit);
            let start = caps.get(0).map(|m| m.start()).unwrap_or(sql.len());
            let before = &sql[..start];
            // Any other limit form before the trailing LIMIT needs the wrap instead.
            if !OTHER_ROW_LIMIT.is_match(before) {
                return format!("{}{}", before, dialect.emit_row_limit(n));
            }
        }
    }

    if OTHER_ROW_LIMIT.is_match(sql) {
        return format!("SELECT * FROM ({}) AS {} {}", sql, SUBQUERY_ALIAS, clause);
    }

    format!("{} {}", sql, clause)
}

fn clamp(existing: Option<&str>, limit: u64) -> u64 {
    existing
        .and_then(|n| n.parse::<u64>().ok())
        .map(|n| n.min(limit))
        .unwrap_or(limit)
}
