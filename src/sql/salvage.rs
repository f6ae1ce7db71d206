//! Recovery of a single SELECT statement from raw model output.
//!
//! The completion endpoint is not guaranteed to return clean SQL: it may
//! prepend a sentence, drop the leading keyword (the prompt already ends in
//! `SELECT`), or wrap the answer in a markdown fence. Salvage rules are tried
//! in order and the first match wins:
//!
//! 1. Text that already starts with `SELECT` is returned as is.
//! 2. A column-list-looking prefix followed by `FROM` gets `SELECT ` prepended.
//!    Prefixes holding `SELECT` or opening with a statement keyword
//!    (`DELETE`, `DROP`, ...) do not count.
//! 3. `SELECT` within the first 15 characters: the chatter before it is cut.
//! 4. Anything else is a [`SqlGenerationError`].
//!
//! A surrounding ```` ```sql ```` fence is removed before the rules run.

use once_cell::sync::Lazy;
use regex::Regex;

/// How far into the text a `SELECT` may appear for rule 3 to apply.
pub const MAX_CHATTER_PREFIX: usize = 15;

static COLUMNS_THEN_FROM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)^[\w.*\[\]`]+.*?\sfrom\s").expect("valid regex"));

static SELECT_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bselect\b").expect("valid regex"));

static STATEMENT_KEYWORD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(delete|update|insert|merge|drop|alter|create|truncate|exec|execute|grant|revoke)\b")
        .expect("valid regex")
});

/// The model output could not be turned into a SELECT statement.
///
/// The raw completion is kept for diagnostics but deliberately left out of
/// the `Display` output so it cannot leak into user-facing messages.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("model did not return a SELECT statement")]
pub struct SqlGenerationError {
    raw: String,
}

impl SqlGenerationError {
    pub fn new(raw: impl Into<String>) -> Self {
        Self { raw: raw.into() }
    }

    /// The raw completion text, for logs only.
    pub fn raw(&self) -> &str {
        &self.raw
    }
}

/// Extract one SELECT statement from raw completion text.
pub fn extract_select(raw_text: &str) -> Result<String, SqlGenerationError> {
    let text = strip_code_fence(raw_text.trim());

    if starts_with_select(text) {
        return Ok(text.to_string());
    }

    // A prefix that already holds SELECT is chatter, not a column list, and
    // a leading statement keyword is never a column.
    if let Some(m) = COLUMNS_THEN_FROM.find(text) {
        if !SELECT_WORD.is_match(m.as_str()) && !STATEMENT_KEYWORD.is_match(text) {
            return Ok(format!("SELECT {}", text));
        }
    }

    // to_ascii_lowercase keeps byte offsets aligned with `text`
    if let Some(idx) = text.to_ascii_lowercase().find("select") {
        if text[..idx].chars().count() <= MAX_CHATTER_PREFIX {
            let trimmed = text[idx..].trim_start();
            if starts_with_select(trimmed) {
                return Ok(trimmed.to_string());
            }
        }
    }

    Err(SqlGenerationError::new(raw_text))
}

/// Case-insensitive check for a leading `SELECT` keyword.
pub(crate) fn starts_with_select(s: &str) -> bool {
    s.get(..6)
        .map(|head| head.eq_ignore_ascii_case("select"))
        .unwrap_or(false)
}

fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    // Drop the info string (```sql) up to the end of the opening line.
    let body = match rest.find('\n') {
        Some(pos) => &rest[pos + 1..],
        None => rest.trim_start_matches(|c: char| c.is_ascii_alphabetic()),
    };
    body.trim_end()
        .strip_suffix("```")
        .unwrap_or(body)
        .trim()
}
