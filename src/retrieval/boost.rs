//! Declarative domain-keyword boosts.
//!
//! Each rule reads "if the question mentions any of these keywords, add
//! `bonus` to every table the target predicate accepts". Rules come from the
//! `[[retrieval.boosts]]` config table:
//!
//! ```toml
//! [[retrieval.boosts]]
//! keywords = ["current", "voltage"]
//! target = { named = ["PointMachineData", "SiteAttributeData", "Asset"] }
//! bonus = 4
//!
//! [[retrieval.boosts]]
//! keywords = ["alert"]
//! target = { prefix = "alert" }
//! bonus = 5
//! ```

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// Which tables a boost applies to. Matching is case-insensitive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TablePredicate {
    /// Every table.
    Any,
    /// Tables with one of these names.
    Named(Vec<String>),
    /// Tables whose name starts with this prefix.
    Prefix(String),
}

impl TablePredicate {
    pub fn matches(&self, table: &str) -> bool {
        match self {
            Self::Any => true,
            Self::Named(names) => names.iter().any(|n| n.eq_ignore_ascii_case(table)),
            Self::Prefix(prefix) => table
                .get(..prefix.len())
                .map(|head| head.eq_ignore_ascii_case(prefix))
                .unwrap_or(false),
        }
    }
}

/// A (keyword set, table predicate, bonus) triple.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoostRule {
    pub keywords: Vec<String>,
    pub target: TablePredicate,
    pub bonus: u32,
}

impl BoostRule {
    pub fn new(keywords: &[&str], target: TablePredicate, bonus: u32) -> Self {
        Self {
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
            target,
            bonus,
        }
    }

    /// Whether any keyword appears among the (lowercased) question tokens.
    pub fn triggered_by(&self, tokens: &HashSet<String>) -> bool {
        self.keywords
            .iter()
            .any(|k| tokens.contains(&k.to_lowercase()))
    }

    /// Bonus this rule awards `table` for the given tokens.
    pub fn bonus_for(&self, table: &str, tokens: &HashSet<String>) -> u32 {
        if self.target.matches(table) && self.triggered_by(tokens) {
            self.bonus
        } else {
            0
        }
    }
}
