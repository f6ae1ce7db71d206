//! Table relevance retrieval.
//!
//! Narrows an arbitrary question down to a handful of candidate tables that
//! ground the prompt. Two scoring strategies share one contract:
//!
//! - [`WeightedRetriever`] - table/column/sample-value hits plus declarative
//!   keyword boosts ([`BoostRule`])
//! - [`OverlapRetriever`] - normalised token overlap against table and column
//!   names, with fuzzy near-matches
//!
//! Both are pure functions of the schema index and the question: tables with
//! a zero score are dropped, the rest are stably sorted by descending score
//! (equal scores keep schema order) and truncated to `k`.

mod boost;
mod fuzzy;
mod overlap;
mod weighted;

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::config::RetrievalSettings;
use crate::schema::{SchemaIndex, TableInfo};

pub use boost::{BoostRule, TablePredicate};
pub use fuzzy::{has_close_match, similarity_ratio};
pub use overlap::OverlapRetriever;
pub use weighted::WeightedRetriever;

/// A table and the score it earned for one question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoredTable {
    pub name: String,
    pub score: u32,
}

/// Common contract for retrieval strategies.
pub trait TableRetriever: fmt::Debug + Send + Sync {
    /// Strategy name, for logs.
    fn name(&self) -> &'static str;

    /// Split a question into the token set this strategy matches against.
    fn tokenize(&self, question: &str) -> HashSet<String>;

    /// Score one table against the question's tokens.
    fn score_table(&self, table: &TableInfo, tokens: &HashSet<String>) -> u32;

    /// Every table with a non-zero score, best first.
    fn rank(&self, schema: &SchemaIndex, question: &str) -> Vec<ScoredTable> {
        let tokens = self.tokenize(question);
        if tokens.is_empty() {
            return Vec::new();
        }

        let mut scored: Vec<ScoredTable> = schema
            .tables()
            .filter_map(|table| {
                let score = self.score_table(table, &tokens);
                (score > 0).then(|| ScoredTable {
                    name: table.name.clone(),
                    score,
                })
            })
            .collect();

        // sort_by is stable: ties keep schema order
        scored.sort_by(|a, b| b.score.cmp(&a.score));
        scored
    }

    /// Up to `k` relevant table names, best first.
    fn find_relevant_tables(&self, schema: &SchemaIndex, question: &str, k: usize) -> Vec<String> {
        self.rank(schema, question)
            .into_iter()
            .take(k)
            .map(|t| t.name)
            .collect()
    }
}

/// Which retriever the pipeline uses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RetrievalStrategy {
    #[default]
    Weighted,
    Overlap,
}

impl RetrievalStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Weighted => "weighted",
            Self::Overlap => "overlap",
        }
    }
}

impl fmt::Display for RetrievalStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, thiserror::Error)]
#[error("Unknown retrieval strategy '{0}', expected 'weighted' or 'overlap'")]
pub struct UnknownStrategy(pub String);

impl FromStr for RetrievalStrategy {
    type Err = UnknownStrategy;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "weighted" => Ok(Self::Weighted),
            "overlap" => Ok(Self::Overlap),
            _ => Err(UnknownStrategy(s.to_string())),
        }
    }
}

/// Build the configured retriever.
pub fn from_settings(settings: &RetrievalSettings) -> Box<dyn TableRetriever> {
    build(settings.strategy, settings)
}

/// Build a specific strategy, taking its parameters from `settings`.
pub fn build(strategy: RetrievalStrategy, settings: &RetrievalSettings) -> Box<dyn TableRetriever> {
    match strategy {
        RetrievalStrategy::Weighted => Box::new(WeightedRetriever::new(settings.boosts.clone())),
        RetrievalStrategy::Overlap => Box::new(OverlapRetriever::new(settings.fuzzy_cutoff)),
    }
}
