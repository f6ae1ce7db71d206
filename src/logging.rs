//! Logging setup, powered by tracing-subscriber.
//!
//! Logs go to stderr (so they never mix with answers printed on stdout) or,
//! when `logging.file` is set, to that file in append mode without ANSI
//! colours. `RUST_LOG` overrides the configured level when present.

use std::fs::{self, OpenOptions};
use std::path::Path;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use crate::config::{LogFormat, LoggingSettings};

#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("Invalid tracing filter '{filter}': {message}")]
    InvalidFilter { filter: String, message: String },

    #[error("Failed to open log file: {0}")]
    File(#[from] std::io::Error),

    #[error("Failed to install subscriber: {0}")]
    Install(String),
}

/// Third-party crates that are chatty at debug level.
const NOISY_TARGETS: &[(&str, &str)] = &[
    ("hyper", "warn"),
    ("hyper_util", "warn"),
    ("reqwest", "warn"),
    ("rustls", "warn"),
    ("h2", "warn"),
    ("sqlparser", "warn"),
];

/// Build the filter directive string from settings.
pub fn filter_directives(settings: &LoggingSettings) -> String {
    let mut directives = vec![settings.level.clone()];
    for (target, level) in NOISY_TARGETS {
        directives.push(format!("{}={}", target, level));
    }

    let mut overrides: Vec<_> = settings.targets.iter().collect();
    overrides.sort();
    for (target, level) in overrides {
        directives.push(format!("{}={}", target, level));
    }

    directives.join(",")
}

fn build_env_filter(settings: &LoggingSettings) -> Result<EnvFilter, LoggingError> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }

    let directives = filter_directives(settings);
    EnvFilter::try_new(&directives).map_err(|e| LoggingError::InvalidFilter {
        filter: directives.clone(),
        message: e.to_string(),
    })
}

/// Install the global subscriber.
pub fn init(settings: &LoggingSettings) -> Result<(), LoggingError> {
    let filter = build_env_filter(settings)?;

    let layer = match &settings.file {
        Some(path) => {
            if let Some(parent) = Path::new(path).parent() {
                if !parent.as_os_str().is_empty() {
                    fs::create_dir_all(parent)?;
                }
            }
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            let base = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(file)
                .with_target(true);
            match settings.format {
                LogFormat::Json => base.json().boxed(),
                LogFormat::Compact => base.compact().boxed(),
            }
        }
        None => {
            let base = tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true);
            match settings.format {
                LogFormat::Json => base.json().boxed(),
                LogFormat::Compact => base.compact().boxed(),
            }
        }
    };

    tracing_subscriber::registry()
        .with(layer.with_filter(filter))
        .try_init()
        .map_err(|e| LoggingError::Install(e.to_string()))?;

    tracing::trace!(level = %settings.level, file = ?settings.file, "logging initialized");
    Ok(())
}
