//! Tracing subscriber setup.
//!
//! `MACDLAB_LOG` overrides the level passed in, using `EnvFilter` syntax
//! (e.g. `MACDLAB_LOG=macdlab_core=debug,info`).

use std::str::FromStr;

use thiserror::Error;
use tracing_subscriber::EnvFilter;

pub const LOG_ENV_VAR: &str = "MACDLAB_LOG";

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("invalid log filter '{filter}': {message}")]
    InvalidFilter { filter: String, message: String },
    #[error("unknown log format '{0}' (expected 'plain' or 'json')")]
    UnknownFormat(String),
    #[error("a global subscriber is already installed: {0}")]
    AlreadyInitialized(String),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Plain,
    Json,
}

impl FromStr for LogFormat {
    type Err = LoggingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "" | "plain" | "text" | "pretty" => Ok(Self::Plain),
            "json" => Ok(Self::Json),
            other => Err(LoggingError::UnknownFormat(other.to_string())),
        }
    }
}

/// Build the filter from `MACDLAB_LOG`, falling back to `level`.
pub fn env_filter(level: &str) -> Result<EnvFilter, LoggingError> {
    let filter = std::env::var(LOG_ENV_VAR).unwrap_or_else(|_| level.to_string());
    EnvFilter::try_new(&filter).map_err(|e| LoggingError::InvalidFilter {
        filter,
        message: e.to_string(),
    })
}

/// Install the global fmt subscriber. Fails if one is already installed.
pub fn init_tracing(level: &str, format: &str) -> Result<(), LoggingError> {
    let format: LogFormat = format.parse()?;
    let filter = env_filter(level)?;
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    let installed = match format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Plain => builder.try_init(),
    };
    installed.map_err(|e| LoggingError::AlreadyInitialized(e.to_string()))
}
