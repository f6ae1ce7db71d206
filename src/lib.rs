//! # Heron
//!
//! Natural-language questions answered from a relational database.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │              Schema Index (schema_index.json)            │
//! │      (tables, columns, declared types, sample values)    │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [retrieval]
//! ┌─────────────────────────────────────────────────────────┐
//! │        Relevant tables (weighted or overlap scoring)     │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [prompt]
//! ┌─────────────────────────────────────────────────────────┐
//! │          Schema snippet + few-shot SQL prompt            │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [inference]
//! ┌─────────────────────────────────────────────────────────┐
//! │     Raw completion ─► salvaged SELECT (sql::salvage)     │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [sql::rewrite]
//! ┌─────────────────────────────────────────────────────────┐
//! │    Read-only, row-capped statement in the target dialect │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [executor]
//! ┌─────────────────────────────────────────────────────────┐
//! │            Rows ─► plain-text table (format)             │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! [`pipeline::Pipeline`] wires the stages together.

pub mod config;
pub mod error;
pub mod executor;
pub mod format;
pub mod inference;
pub mod logging;
pub mod pipeline;
pub mod prompt;
pub mod retrieval;
pub mod schema;
pub mod sql;
pub mod worker;

// Re-export at crate level for convenience
pub use sql::dialect;

pub use error::PipelineError;
pub use pipeline::{Answer, Pipeline, PipelineOptions};
pub use schema::SchemaIndex;
