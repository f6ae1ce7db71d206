//! End-to-end question answering.
//!
//! ```text
//! question ─► retriever ─► snippet ─► prompt ─► generator ─► salvage
//!                                                              │
//!            answer ◄─ format ◄─ executor ◄─ prepare (rewrite) ◄┘
//! ```
//!
//! [`Pipeline::run`] returns typed results and errors; [`Pipeline::answer`]
//! wraps it into the string shown to a user, catching every failure
//! (including panics) and logging the details.
//!
//! Questions that contain none of the configured database hints are answered
//! conversationally when the chat fallback is on.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tracing::{debug, error, info, warn};

use crate::config::Settings;
use crate::error::{PipelineError, GENERIC_FAILURE_MESSAGE};
use crate::executor::{QueryExecutor, QueryResult};
use crate::format::render_table;
use crate::inference::{GenerateOptions, TextGenerator};
use crate::prompt::{PromptBuilder, SnippetBuilder};
use crate::retrieval::{self, TableRetriever};
use crate::schema::SchemaIndex;
use crate::sql::{extract_select, prepare, SqlDialect};

/// Reply when a statement ran but matched nothing.
pub const NO_ROWS_MESSAGE: &str = "Query executed but returned no rows.";

/// Tunables for one pipeline, usually taken from [`Settings`].
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub top_k: usize,
    pub row_limit: u64,
    pub max_snippet_columns: usize,
    pub few_shot: Option<String>,
    pub sql_options: GenerateOptions,
    pub chat_options: GenerateOptions,
    pub chat_fallback: bool,
    pub db_hints: Vec<String>,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self::from_settings(&Settings::default())
    }
}

impl PipelineOptions {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            top_k: settings.retrieval.top_k,
            row_limit: settings.query.row_limit,
            max_snippet_columns: settings.prompt.max_snippet_columns,
            few_shot: settings.prompt.few_shot.clone(),
            sql_options: settings.inference.sql.clone(),
            chat_options: settings.inference.chat.clone(),
            chat_fallback: settings.assistant.chat_fallback,
            db_hints: settings.assistant.db_hints.clone(),
        }
    }
}

/// Successful outcome of [`Pipeline::run`].
#[derive(Debug, Clone, PartialEq)]
pub enum Answer {
    /// The question was answered from the database.
    Rows { sql: String, result: QueryResult },
    /// The question was not about data; a conversational reply.
    Chat(String),
}

/// Whether the question mentions any database hint (case-insensitive substring).
pub fn looks_like_db_question(question: &str, hints: &[String]) -> bool {
    let lower = question.to_lowercase();
    hints.iter().any(|h| lower.contains(&h.to_lowercase()))
}

/// The natural-language-to-SQL pipeline.
///
/// Holds no per-question state, so one instance can serve concurrent
/// questions.
pub struct Pipeline {
    schema: Arc<SchemaIndex>,
    retriever: Box<dyn TableRetriever>,
    snippets: SnippetBuilder,
    prompts: PromptBuilder,
    generator: Arc<dyn TextGenerator>,
    executor: Arc<dyn QueryExecutor>,
    options: PipelineOptions,
}

impl Pipeline {
    pub fn new(
        schema: Arc<SchemaIndex>,
        retriever: Box<dyn TableRetriever>,
        generator: Arc<dyn TextGenerator>,
        executor: Arc<dyn QueryExecutor>,
        options: PipelineOptions,
    ) -> Self {
        let prompts = PromptBuilder::new(executor.dialect().engine_name())
            .with_few_shot(options.few_shot.clone());

        Self {
            schema,
            retriever,
            snippets: SnippetBuilder::new(options.max_snippet_columns),
            prompts,
            generator,
            executor,
            options,
        }
    }

    /// Wire a pipeline from settings.
    pub fn from_settings(
        settings: &Settings,
        schema: Arc<SchemaIndex>,
        generator: Arc<dyn TextGenerator>,
        executor: Arc<dyn QueryExecutor>,
    ) -> Self {
        Self::new(
            schema,
            retrieval::from_settings(&settings.retrieval),
            generator,
            executor,
            PipelineOptions::from_settings(settings),
        )
    }

    pub fn schema(&self) -> &SchemaIndex {
        &self.schema
    }

    /// Answer a question, returning typed errors.
    pub async fn run(&self, question: &str) -> Result<Answer, PipelineError> {
        let question = question.trim();
        if question.is_empty() {
            return Err(PipelineError::NoRelevantTables);
        }

        if self.options.chat_fallback && !looks_like_db_question(question, &self.options.db_hints) {
            debug!("no database hints, answering conversationally");
            let reply = self
                .generator
                .generate(question, &self.options.chat_options)
                .await?;
            return Ok(Answer::Chat(reply.trim().to_string()));
        }

        let tables = self
            .retriever
            .find_relevant_tables(&self.schema, question, self.options.top_k);
        if tables.is_empty() {
            return Err(PipelineError::NoRelevantTables);
        }
        info!(strategy = self.retriever.name(), tables = ?tables, "selected tables");

        let snippet = self.snippets.build(&self.schema, &tables)?;
        let prompt = self.prompts.build(&snippet, question);
        debug!(prompt = %prompt, "sql prompt");

        let raw = self
            .generator
            .generate(&prompt, &self.options.sql_options)
            .await?;
        debug!(raw = %raw, "raw completion");

        let candidate = extract_select(&raw).inspect_err(|e| {
            warn!(raw = %e.raw(), "could not salvage a SELECT from model output");
        })?;

        let dialect = self.executor.dialect();
        let sql = prepare(&candidate, self.options.row_limit, &dialect)?;
        info!(dialect = dialect.name(), sql = %sql, "generated sql");

        let result = self.executor.execute(&sql, self.options.row_limit).await?;
        Ok(Answer::Rows { sql, result })
    }

    /// Answer a question with a user-safe string. Never fails.
    pub async fn answer(&self, question: &str) -> String {
        let outcome = AssertUnwindSafe(self.run(question)).catch_unwind().await;

        match outcome {
            Ok(Ok(Answer::Chat(reply))) => reply,
            Ok(Ok(Answer::Rows { result, .. })) if result.is_empty() => NO_ROWS_MESSAGE.to_string(),
            Ok(Ok(Answer::Rows { result, .. })) => format!("Result:\n\n{}", render_table(&result)),
            Ok(Err(e)) => {
                match &e {
                    PipelineError::NoUsableSchema(_) => error!(kind = e.kind(), error = %e, "pipeline failed"),
                    _ => warn!(kind = e.kind(), error = %e, "pipeline failed"),
                }
                e.user_message().to_string()
            }
            Err(panic) => {
                error!(panic = %panic_message(panic.as_ref()), question, "pipeline panicked");
                GENERIC_FAILURE_MESSAGE.to_string()
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("<non-string panic>")
}
