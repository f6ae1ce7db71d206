//! Text generation.
//!
//! The pipeline only needs `generate(prompt, options) -> text`. The
//! [`TextGenerator`] trait is that seam; [`HttpGenerator`] talks to a
//! text-generation-inference style HTTP endpoint, tests plug in doubles.

mod http;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use http::HttpGenerator;

/// Errors from the generation endpoint.
#[derive(Debug, thiserror::Error)]
pub enum InferenceError {
    #[error("inference endpoint unreachable: {0}")]
    Unavailable(String),

    #[error("inference request timed out after {0} seconds")]
    Timeout(u64),

    #[error("inference endpoint returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("invalid inference response: {0}")]
    InvalidResponse(String),

    #[error("invalid inference configuration: {0}")]
    Config(String),
}

/// Sampling options for one generation call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerateOptions {
    /// Maximum new tokens.
    pub max_tokens: u32,
    /// 0.0 means greedy decoding.
    pub temperature: f32,
    pub top_p: f32,
    /// Generation stops at any of these strings.
    pub stop: Vec<String>,
}

impl GenerateOptions {
    /// Greedy decoding for SQL generation.
    pub fn sql() -> Self {
        Self {
            max_tokens: 192,
            temperature: 0.0,
            top_p: 1.0,
            stop: Vec::new(),
        }
    }

    /// Sampled decoding for conversational replies.
    pub fn chat() -> Self {
        Self {
            max_tokens: 256,
            temperature: 0.7,
            top_p: 0.9,
            stop: vec!["User:".to_string()],
        }
    }

    pub fn is_greedy(&self) -> bool {
        self.temperature <= 0.0
    }
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self::sql()
    }
}

/// Turns a prompt into raw completion text.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Generator name, for logs.
    fn name(&self) -> &str;

    /// Generate a continuation of `prompt`.
    async fn generate(&self, prompt: &str, options: &GenerateOptions) -> Result<String, InferenceError>;
}
