//! HTTP client for a text-generation endpoint.
//!
//! Request body:
//! ```json
//! {"inputs": "...", "parameters": {"max_new_tokens": 192, "do_sample": false, "return_full_text": false}}
//! ```
//! The response is either `{"generated_text": "..."}` or a one-element array
//! of that object. Only the continuation is returned, never the prompt.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{GenerateOptions, InferenceError, TextGenerator};
use crate::config::{InferenceSettings, SettingsError};

/// Generator backed by an HTTP endpoint.
#[derive(Debug, Clone)]
pub struct HttpGenerator {
    client: reqwest::Client,
    endpoint: String,
    api_token: Option<String>,
    timeout: Duration,
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    inputs: &'a str,
    parameters: Parameters<'a>,
}

#[derive(Debug, Serialize)]
struct Parameters<'a> {
    max_new_tokens: u32,
    do_sample: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    #[serde(skip_serializing_if = "<[String]>::is_empty")]
    stop: &'a [String],
    return_full_text: bool,
}

impl<'a> Parameters<'a> {
    fn from_options(options: &'a GenerateOptions) -> Self {
        // Sampling parameters are rejected by some servers when greedy.
        let greedy = options.is_greedy();
        Self {
            max_new_tokens: options.max_tokens,
            do_sample: !greedy,
            temperature: (!greedy).then_some(options.temperature),
            top_p: (!greedy && options.top_p < 1.0).then_some(options.top_p),
            stop: &options.stop,
            return_full_text: false,
        }
    }
}

#[derive(Debug, Deserialize)]
struct Generation {
    generated_text: String,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum GenerateResponse {
    One(Generation),
    Many(Vec<Generation>),
}

impl GenerateResponse {
    fn into_text(self) -> Option<String> {
        match self {
            Self::One(g) => Some(g.generated_text),
            Self::Many(list) => list.into_iter().next().map(|g| g.generated_text),
        }
    }
}

impl HttpGenerator {
    pub fn new(endpoint: impl Into<String>, api_token: Option<String>, timeout: Duration) -> Result<Self, InferenceError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| InferenceError::Config(format!("failed to build http client: {e}")))?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
            api_token,
            timeout,
        })
    }

    /// Build from `[inference]` settings, expanding the token.
    pub fn from_settings(settings: &InferenceSettings) -> Result<Self, InferenceError> {
        let token = settings
            .resolved_api_token()
            .map_err(|e: SettingsError| InferenceError::Config(e.to_string()))?;
        Self::new(
            settings.endpoint.clone(),
            token,
            Duration::from_secs(settings.timeout_secs),
        )
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn map_send_error(&self, e: reqwest::Error) -> InferenceError {
        if e.is_timeout() {
            InferenceError::Timeout(self.timeout.as_secs())
        } else {
            InferenceError::Unavailable(e.to_string())
        }
    }
}

#[async_trait]
impl TextGenerator for HttpGenerator {
    fn name(&self) -> &str {
        "http"
    }

    async fn generate(&self, prompt: &str, options: &GenerateOptions) -> Result<String, InferenceError> {
        let body = GenerateRequest {
            inputs: prompt,
            parameters: Parameters::from_options(options),
        };

        let mut request = self.client.post(&self.endpoint).json(&body);
        if let Some(token) = &self.api_token {
            request = request.bearer_auth(token);
        }

        let resp = request.send().await.map_err(|e| self.map_send_error(e))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(InferenceError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: GenerateResponse = resp.json().await.map_err(|e| {
            if e.is_timeout() {
                InferenceError::Timeout(self.timeout.as_secs())
            } else {
                InferenceError::InvalidResponse(e.to_string())
            }
        })?;

        let text = parsed
            .into_text()
            .ok_or_else(|| InferenceError::InvalidResponse("empty generation list".to_string()))?;

        debug!(endpoint = %self.endpoint, chars = text.len(), "generation complete");
        Ok(text)
    }
}
