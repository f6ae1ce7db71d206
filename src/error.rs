//! Pipeline error taxonomy.
//!
//! Each stage fails fast with its own error type; [`PipelineError`] unifies
//! them so the caller-facing `answer` can map every kind to a distinct,
//! user-safe message. Details stay in the logs.

use crate::executor::DatabaseError;
use crate::inference::InferenceError;
use crate::prompt::NoUsableSchemaError;
use crate::sql::{SqlGenerationError, UnsafeQueryError};

/// Message for anything that escaped the known error kinds.
pub const GENERIC_FAILURE_MESSAGE: &str = "Sorry, something went wrong while answering that question.";

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("no relevant tables for question")]
    NoRelevantTables,

    #[error(transparent)]
    NoUsableSchema(#[from] NoUsableSchemaError),

    #[error(transparent)]
    SqlGeneration(#[from] SqlGenerationError),

    #[error(transparent)]
    Inference(#[from] InferenceError),

    #[error(transparent)]
    UnsafeQuery(#[from] UnsafeQueryError),

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

impl PipelineError {
    /// The message shown to the end user.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::NoRelevantTables => "Sorry, I couldn't map that to any database tables.",
            Self::NoUsableSchema(_) => {
                "Sorry, I couldn't describe the matching tables. Please check the schema index."
            }
            Self::SqlGeneration(_) | Self::Inference(_) => {
                "Sorry, I couldn't generate a SQL query for that question."
            }
            Self::UnsafeQuery(_) => "Sorry, the generated query was not a read-only SELECT and was not run.",
            Self::Database(_) => "Sorry, the database returned an error while running the query.",
        }
    }

    /// Stable kind name, for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NoRelevantTables => "no_relevant_tables",
            Self::NoUsableSchema(_) => "no_usable_schema",
            Self::SqlGeneration(_) => "sql_generation",
            Self::Inference(_) => "inference",
            Self::UnsafeQuery(_) => "unsafe_query",
            Self::Database(_) => "database",
        }
    }
}
