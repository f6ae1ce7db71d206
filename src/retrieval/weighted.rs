//! Weighted keyword and sample-value scoring.

use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;

use super::{BoostRule, TableRetriever};
use crate::schema::TableInfo;

/// Points for the table name appearing as a token.
pub const TABLE_NAME_WEIGHT: u32 = 3;
/// Points per column name appearing as a token.
pub const COLUMN_WEIGHT: u32 = 2;
/// Points per sample value appearing as a token.
pub const SAMPLE_WEIGHT: u32 = 5;

static WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b\w+\b").expect("valid regex"));

/// Scores tables by name, column and sample-value hits plus boosts.
///
/// Samples only match single-token values: `Surat` can match, `New Delhi`
/// never will.
#[derive(Debug, Clone, Default)]
pub struct WeightedRetriever {
    boosts: Vec<BoostRule>,
}

impl WeightedRetriever {
    pub fn new(boosts: Vec<BoostRule>) -> Self {
        Self { boosts }
    }

    pub fn boosts(&self) -> &[BoostRule] {
        &self.boosts
    }
}

impl TableRetriever for WeightedRetriever {
    fn name(&self) -> &'static str {
        "weighted"
    }

    fn tokenize(&self, question: &str) -> HashSet<String> {
        let lower = question.to_lowercase();
        WORD.find_iter(&lower).map(|m| m.as_str().to_string()).collect()
    }

    fn score_table(&self, table: &TableInfo, tokens: &HashSet<String>) -> u32 {
        let mut score = 0;

        if tokens.contains(&table.name.to_lowercase()) {
            score += TABLE_NAME_WEIGHT;
        }

        score += COLUMN_WEIGHT
            * table
                .column_names()
                .filter(|c| tokens.contains(&c.to_lowercase()))
                .count() as u32;

        score += SAMPLE_WEIGHT
            * table
                .samples()
                .filter(|s| tokens.contains(&s.to_lowercase()))
                .count() as u32;

        score
            + self
                .boosts
                .iter()
                .map(|rule| rule.bonus_for(&table.name, tokens))
                .sum::<u32>()
    }
}
