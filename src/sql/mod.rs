//! SQL handling for generated statements.
//!
//! - [`salvage`] - recover one SELECT from raw model output
//! - [`rewrite`] - sanitise, enforce read-only, rewrite for the target dialect
//! - [`dialect`] - SQL dialect implementations

pub mod dialect;
pub mod rewrite;
pub mod salvage;

pub use dialect::{Dialect, LimitPlacement, SqlDialect};
pub use rewrite::{prepare, UnsafeQueryError};
pub use salvage::{extract_select, SqlGenerationError};
