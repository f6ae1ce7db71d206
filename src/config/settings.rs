//! TOML-based configuration for Heron.
//!
//! Supports a config file (heron.toml) with environment variable expansion.
//!
//! Example configuration:
//! ```toml
//! [connections.production]
//! driver = "mssql"
//! connection_string = "${PROD_DB_CONNECTION_STRING}"
//!
//! [connections.local]
//! driver = "sqlite"
//! connection_string = "./data/assets.db"
//!
//! [query]
//! row_limit = 200
//! timeout_secs = 30
//!
//! [inference]
//! endpoint = "http://localhost:8080/generate"
//! api_token = "${HF_TOKEN}"
//!
//! [inference.chat]
//! temperature = 0.7
//!
//! [retrieval]
//! strategy = "weighted"
//! top_k = 4
//!
//! [[retrieval.boosts]]
//! keywords = ["alert"]
//! target = { prefix = "alert" }
//! bonus = 5
//! ```

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use super::connection::{ConnectionConfig, Driver};
use crate::inference::GenerateOptions;
use crate::retrieval::{BoostRule, RetrievalStrategy};
use crate::sql::Dialect;

/// Error type for settings.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("Config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Connection not found: {0}")]
    ConnectionNotFound(String),

    #[error("Unsupported driver: {0}")]
    UnsupportedDriver(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Root configuration structure.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    /// Named database connections.
    pub connections: HashMap<String, ConnectionSettings>,

    /// Row cap and timeout for executed queries.
    pub query: QuerySettings,

    /// Out-of-process database worker.
    pub worker: WorkerSettings,

    /// Text-generation endpoint.
    pub inference: InferenceSettings,

    /// Table retrieval.
    pub retrieval: RetrievalSettings,

    /// Prompt assembly.
    pub prompt: PromptSettings,

    /// Question routing.
    pub assistant: AssistantSettings,

    /// Schema index location.
    pub schema: SchemaSettings,

    /// Log output.
    pub logging: LoggingSettings,
}

/// Connection configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ConnectionSettings {
    /// Database driver (mssql, duckdb, sqlite).
    pub driver: String,

    /// Connection string (supports ${ENV_VAR} expansion).
    pub connection_string: String,

    /// SQL dialect override; defaults to the driver's dialect.
    #[serde(default)]
    pub dialect: Option<String>,
}

impl ConnectionSettings {
    /// Get the driver type.
    pub fn driver_type(&self) -> Result<Driver, SettingsError> {
        self.driver
            .parse()
            .map_err(|_| SettingsError::UnsupportedDriver(self.driver.clone()))
    }

    /// Get the connection string with environment variables expanded.
    pub fn resolved_connection_string(&self) -> Result<String, SettingsError> {
        expand_env_vars(&self.connection_string)
    }

    /// Resolve into a ready-to-use connection config.
    pub fn resolve(&self) -> Result<ConnectionConfig, SettingsError> {
        let mut config = ConnectionConfig::new(self.driver_type()?, self.resolved_connection_string()?);
        if let Some(dialect) = &self.dialect {
            let dialect = dialect
                .parse::<Dialect>()
                .map_err(|e| SettingsError::InvalidConfig(e.to_string()))?;
            config = config.with_dialect(dialect);
        }
        Ok(config)
    }
}

/// Query execution settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct QuerySettings {
    /// Maximum rows materialised per query.
    pub row_limit: u64,

    /// Execution timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for QuerySettings {
    fn default() -> Self {
        Self {
            row_limit: 200,
            timeout_secs: 30,
        }
    }
}

/// Worker configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct WorkerSettings {
    /// Path to the worker binary; searched for when unset.
    pub path: Option<String>,

    /// Connection pool settings.
    pub pool: PoolSettings,
}

/// Connection pool settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PoolSettings {
    /// Maximum number of idle connections per pool.
    pub max_idle_conns: u32,

    /// Maximum number of open connections per pool.
    pub max_open_conns: u32,

    /// Maximum connection lifetime (e.g., "5m", "1h").
    pub conn_max_lifetime: String,

    /// Maximum connection idle time (e.g., "1m", "30s").
    pub conn_max_idle_time: String,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            max_idle_conns: 5,
            max_open_conns: 10,
            conn_max_lifetime: "5m".to_string(),
            conn_max_idle_time: "1m".to_string(),
        }
    }
}

impl PoolSettings {
    /// Convert to worker command-line arguments.
    pub fn to_worker_args(&self) -> Vec<String> {
        vec![
            "-pool".to_string(),
            format!("-pool-max-idle={}", self.max_idle_conns),
            format!("-pool-max-open={}", self.max_open_conns),
            format!("-pool-conn-lifetime={}", self.conn_max_lifetime),
            format!("-pool-conn-idle={}", self.conn_max_idle_time),
        ]
    }
}

/// Inference endpoint settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct InferenceSettings {
    /// URL of a text-generation endpoint.
    pub endpoint: String,

    /// Bearer token (supports ${ENV_VAR} expansion).
    pub api_token: Option<String>,

    /// Request timeout in seconds.
    pub timeout_secs: u64,

    /// Options for SQL generation.
    #[serde(deserialize_with = "sql_options")]
    pub sql: GenerateOptions,

    /// Options for chit-chat replies.
    #[serde(deserialize_with = "chat_options")]
    pub chat: GenerateOptions,
}

impl Default for InferenceSettings {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:8080/generate".to_string(),
            api_token: None,
            timeout_secs: 60,
            sql: GenerateOptions::sql(),
            chat: GenerateOptions::chat(),
        }
    }
}

impl InferenceSettings {
    /// The API token with environment variables expanded.
    pub fn resolved_api_token(&self) -> Result<Option<String>, SettingsError> {
        self.api_token.as_deref().map(expand_env_vars).transpose()
    }
}

/// Generation options where every key is optional.
#[derive(Debug, Default, Deserialize)]
struct PartialOptions {
    max_tokens: Option<u32>,
    temperature: Option<f32>,
    top_p: Option<f32>,
    stop: Option<Vec<String>>,
}

impl PartialOptions {
    fn merge_onto(self, base: GenerateOptions) -> GenerateOptions {
        GenerateOptions {
            max_tokens: self.max_tokens.unwrap_or(base.max_tokens),
            temperature: self.temperature.unwrap_or(base.temperature),
            top_p: self.top_p.unwrap_or(base.top_p),
            stop: self.stop.unwrap_or(base.stop),
        }
    }
}

fn sql_options<'de, D: Deserializer<'de>>(d: D) -> Result<GenerateOptions, D::Error> {
    Ok(PartialOptions::deserialize(d)?.merge_onto(GenerateOptions::sql()))
}

fn chat_options<'de, D: Deserializer<'de>>(d: D) -> Result<GenerateOptions, D::Error> {
    Ok(PartialOptions::deserialize(d)?.merge_onto(GenerateOptions::chat()))
}

/// Table retrieval settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RetrievalSettings {
    /// Scoring strategy.
    pub strategy: RetrievalStrategy,

    /// Number of candidate tables handed to the prompt.
    pub top_k: usize,

    /// Similarity cutoff for fuzzy token matches (overlap strategy).
    pub fuzzy_cutoff: f64,

    /// Keyword boosts (weighted strategy).
    pub boosts: Vec<BoostRule>,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self {
            strategy: RetrievalStrategy::Weighted,
            top_k: 4,
            fuzzy_cutoff: 0.8,
            boosts: Vec::new(),
        }
    }
}

/// Prompt assembly settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PromptSettings {
    /// Columns listed per table in the schema snippet.
    pub max_snippet_columns: usize,

    /// Example question/SQL pairs placed before the snippet.
    pub few_shot: Option<String>,
}

impl Default for PromptSettings {
    fn default() -> Self {
        Self {
            max_snippet_columns: 6,
            few_shot: None,
        }
    }
}

/// Question routing settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AssistantSettings {
    /// Answer non-data questions conversationally instead of failing retrieval.
    pub chat_fallback: bool,

    /// Phrases that mark a question as a database question.
    pub db_hints: Vec<String>,
}

impl Default for AssistantSettings {
    fn default() -> Self {
        Self {
            chat_fallback: true,
            db_hints: [
                "select", "list", "show", "give", "count", "how many", "average", "avg", "mean",
                "max", "min", "sum",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        }
    }
}

/// Schema index settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SchemaSettings {
    /// Path of the JSON schema index.
    pub index_path: String,

    /// Samples kept per text-like column.
    pub max_samples: usize,
}

impl Default for SchemaSettings {
    fn default() -> Self {
        Self {
            index_path: "schema_index.json".to_string(),
            max_samples: 5,
        }
    }
}

impl SchemaSettings {
    pub fn resolved_index_path(&self) -> Result<PathBuf, SettingsError> {
        Ok(PathBuf::from(expand_env_vars(&self.index_path)?))
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Json,
}

/// Logging settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Base level directive (`RUST_LOG` wins when set).
    pub level: String,

    /// Line format.
    pub format: LogFormat,

    /// Append logs to this file instead of stderr.
    pub file: Option<String>,

    /// Per-target level overrides.
    pub targets: HashMap<String, String>,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            format: LogFormat::Compact,
            file: None,
            targets: HashMap::new(),
        }
    }
}

impl Settings {
    /// Load settings from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(SettingsError::FileNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        let settings: Settings = toml::from_str(&content)?;
        Ok(settings)
    }

    /// Load settings from the default config file locations.
    ///
    /// Searches in order:
    /// 1. Environment variable `HERON_CONFIG`
    /// 2. `./heron.toml`
    /// 3. `~/.config/heron/config.toml`
    pub fn load() -> Result<Self, SettingsError> {
        if let Ok(path) = env::var("HERON_CONFIG") {
            return Self::from_file(&path);
        }

        let local_config = PathBuf::from("heron.toml");
        if local_config.exists() {
            return Self::from_file(&local_config);
        }

        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("heron").join("config.toml");
            if user_config.exists() {
                return Self::from_file(&user_config);
            }
        }

        Ok(Settings::default())
    }

    /// Get a connection by name.
    pub fn get_connection(&self, name: &str) -> Result<&ConnectionSettings, SettingsError> {
        self.connections
            .get(name)
            .ok_or_else(|| SettingsError::ConnectionNotFound(name.to_string()))
    }

    /// Get the default connection ("default" if it exists, else the first by name).
    pub fn default_connection(&self) -> Option<(&str, &ConnectionSettings)> {
        if let Some(conn) = self.connections.get("default") {
            return Some(("default", conn));
        }
        self.connections
            .iter()
            .min_by(|a, b| a.0.cmp(b.0))
            .map(|(k, v)| (k.as_str(), v))
    }

    /// Resolve the connection to use: the named one, else the default one,
    /// else the `HERON_DB_*` environment variables.
    pub fn resolve_connection(&self, name: Option<&str>) -> Result<ConnectionConfig, SettingsError> {
        if let Some(name) = name {
            return self.get_connection(name)?.resolve();
        }
        if let Some((_, conn)) = self.default_connection() {
            return conn.resolve();
        }
        ConnectionConfig::from_env().map_err(|e| SettingsError::InvalidConfig(e.to_string()))
    }

    /// Get the worker binary path: configured, or searched for.
    pub fn worker_path(&self) -> Option<PathBuf> {
        if let Some(path) = &self.worker.path {
            let expanded = expand_env_vars(path).ok()?;
            return Some(PathBuf::from(expanded));
        }

        let candidates = ["heron-worker", "./heron-worker", "./worker/heron-worker"];

        for candidate in candidates {
            let path = PathBuf::from(candidate);
            if path.exists() {
                return Some(path);
            }
        }

        if let Ok(output) = std::process::Command::new("which")
            .arg("heron-worker")
            .output()
        {
            if output.status.success() {
                let path = String::from_utf8_lossy(&output.stdout).trim().to_string();
                if !path.is_empty() {
                    return Some(PathBuf::from(path));
                }
            }
        }

        None
    }
}

/// Expand environment variables in a string.
///
/// Supports `${VAR}` and `$VAR` syntax.
pub fn expand_env_vars(s: &str) -> Result<String, SettingsError> {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '$' {
            result.push(c);
            continue;
        }

        let var_name = if chars.peek() == Some(&'{') {
            chars.next(); // consume '{'
            let mut name = String::new();
            for ch in chars.by_ref() {
                if ch == '}' {
                    break;
                }
                name.push(ch);
            }
            name
        } else {
            // $VAR ends at non-alphanumeric/underscore
            let mut name = String::new();
            while let Some(&ch) = chars.peek() {
                if !(ch.is_alphanumeric() || ch == '_') {
                    break;
                }
                name.push(ch);
                chars.next();
            }
            if name.is_empty() {
                // Just a lone $, keep it
                result.push('$');
                continue;
            }
            name
        };

        let value = env::var(&var_name).map_err(|_| SettingsError::MissingEnvVar(var_name.clone()))?;
        result.push_str(&value);
    }

    Ok(result)
}
