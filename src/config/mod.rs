//! Configuration module for Heron.
//!
//! Handles connection configuration, environment variables, and settings.

mod connection;
mod settings;

pub use connection::{ConnectionConfig, ConnectionError, Driver};
pub use settings::{
    expand_env_vars, AssistantSettings, ConnectionSettings, InferenceSettings, LogFormat,
    LoggingSettings, PoolSettings, PromptSettings, QuerySettings, RetrievalSettings,
    SchemaSettings, Settings, SettingsError, WorkerSettings,
};
