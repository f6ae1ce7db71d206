//! Prompt assembly.
//!
//! A SQL prompt is four blocks separated by blank lines:
//!
//! ```text
//! ### You are an expert SQL generator for Microsoft SQL-Server.
//! ### Return a *single* valid SELECT statement – no comments, no `GO`.
//!
//! -- Site(Id, Name, ZoneId)
//! -- Zone(Id, Name)
//!
//! -- Question: give me all sites named Surat
//!
//! ### Answer
//! SELECT
//! ```
//!
//! with an optional few-shot block after the header. The prompt ends in
//! `SELECT` so the continuation usually starts at the column list.

use tracing::warn;

use crate::schema::SchemaIndex;

/// Columns listed per table unless configured otherwise.
pub const DEFAULT_MAX_COLUMNS: usize = 6;

/// None of the candidate tables had columns to show.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("no usable columns found for tables: {}", tables.join(", "))]
pub struct NoUsableSchemaError {
    pub tables: Vec<String>,
}

/// Renders the schema snippet for a set of candidate tables.
#[derive(Debug, Clone)]
pub struct SnippetBuilder {
    max_columns: usize,
}

impl Default for SnippetBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_COLUMNS)
    }
}

impl SnippetBuilder {
    /// `max_columns == 0` lists every column.
    pub fn new(max_columns: usize) -> Self {
        Self { max_columns }
    }

    /// One `-- Table(col, ...)` line per table.
    ///
    /// Unknown or column-less tables degrade to a bare `-- Table` line. If no
    /// table produced columns the snippet is useless and an error is returned.
    pub fn build(&self, schema: &SchemaIndex, tables: &[String]) -> Result<String, NoUsableSchemaError> {
        let cap = if self.max_columns == 0 {
            usize::MAX
        } else {
            self.max_columns
        };

        let mut lines = Vec::with_capacity(tables.len());
        let mut usable = 0;

        for name in tables {
            match schema.describe_table(name) {
                Ok(columns) if !columns.is_empty() => {
                    let cols: Vec<&str> = columns.iter().take(cap).map(|c| c.name.as_str()).collect();
                    lines.push(format!("-- {}({})", name, cols.join(", ")));
                    usable += 1;
                }
                Ok(_) => {
                    warn!(table = %name, "table has no columns, listing name only");
                    lines.push(format!("-- {}", name));
                }
                Err(e) => {
                    warn!(table = %name, error = %e, "could not describe table, listing name only");
                    lines.push(format!("-- {}", name));
                }
            }
        }

        if usable == 0 {
            return Err(NoUsableSchemaError {
                tables: tables.to_vec(),
            });
        }

        Ok(lines.join("\n"))
    }
}

/// Assembles the full SQL-generation prompt.
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    engine_name: String,
    few_shot: Option<String>,
}

impl PromptBuilder {
    /// `engine_name` is the product named in the header, e.g. `Microsoft SQL-Server`.
    pub fn new(engine_name: impl Into<String>) -> Self {
        Self {
            engine_name: engine_name.into(),
            few_shot: None,
        }
    }

    /// Add example question/SQL pairs between the header and the snippet.
    pub fn with_few_shot(mut self, examples: Option<String>) -> Self {
        self.few_shot = examples
            .map(|e| e.trim().to_string())
            .filter(|e| !e.is_empty());
        self
    }

    pub fn header(&self) -> String {
        format!(
            "### You are an expert SQL generator for {}.\n\
             ### Return a *single* valid SELECT statement – no comments, no `GO`.",
            self.engine_name
        )
    }

    pub fn build(&self, snippet: &str, question: &str) -> String {
        let mut blocks = vec![self.header()];
        if let Some(examples) = &self.few_shot {
            blocks.push(examples.clone());
        }
        blocks.push(snippet.to_string());
        blocks.push(format!("-- Question: {}", question.trim()));
        blocks.push("### Answer\nSELECT".to_string());
        blocks.join("\n\n")
    }
}
