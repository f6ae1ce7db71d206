//! Normalised token overlap with fuzzy matching.

use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;

use super::{has_close_match, TableRetriever};
use crate::schema::TableInfo;

/// Points for an exact normalised token hit.
pub const EXACT_WEIGHT: u32 = 3;
/// Points for a fuzzy near-match.
pub const FUZZY_WEIGHT: u32 = 1;

static IDENT_TOKEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"[A-Za-z0-9_]+").expect("valid regex"));

/// Lowercase and strip one trailing `s`.
pub fn normalize_token(token: &str) -> String {
    let lower = token.to_lowercase();
    match lower.strip_suffix('s') {
        Some(stem) => stem.to_string(),
        None => lower,
    }
}

/// Scores tables by overlap between question tokens and table/column names.
///
/// Sample values are not consulted, so this works on an index built without
/// sampling.
#[derive(Debug, Clone)]
pub struct OverlapRetriever {
    cutoff: f64,
}

impl OverlapRetriever {
    pub fn new(cutoff: f64) -> Self {
        Self { cutoff }
    }

    fn table_tokens(table: &TableInfo) -> HashSet<String> {
        std::iter::once(table.name.as_str())
            .chain(table.column_names())
            .map(normalize_token)
            .collect()
    }
}

impl Default for OverlapRetriever {
    fn default() -> Self {
        Self::new(0.8)
    }
}

impl TableRetriever for OverlapRetriever {
    fn name(&self) -> &'static str {
        "overlap"
    }

    fn tokenize(&self, question: &str) -> HashSet<String> {
        let lower = question.to_lowercase();
        IDENT_TOKEN
            .find_iter(&lower)
            .map(|m| m.as_str().to_string())
            .collect()
    }

    fn score_table(&self, table: &TableInfo, tokens: &HashSet<String>) -> u32 {
        let table_tokens = Self::table_tokens(table);

        tokens
            .iter()
            .map(|token| {
                let normalized = normalize_token(token);
                if table_tokens.contains(&normalized) {
                    EXACT_WEIGHT
                } else if has_close_match(&normalized, &table_tokens, self.cutoff) {
                    FUZZY_WEIGHT
                } else {
                    0
                }
            })
            .sum()
    }
}
