//! Structured logging initialization
//!
//! Installs a global `tracing` subscriber filtered by `RUST_LOG` (or the configured
//! level) with either human-readable or JSON output.

use crate::config::parse_env_var;
use crate::error::CoreError;
use std::str::FromStr;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Output format of the log layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pretty" | "text" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("unknown log format '{}'", other)),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq)]
pub struct LogConfig {
    /// Default filter directive used when `RUST_LOG` is unset (e.g. "info")
    pub level: String,
    pub format: LogFormat,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

impl LogConfig {
    /// Create config from environment variables
    ///
    /// - ATTRMF_LOG_LEVEL: default filter directive (default: info)
    /// - ATTRMF_LOG_FORMAT: `pretty` or `json` (default: pretty)
    pub fn from_env() -> Result<Self, CoreError> {
        let defaults = Self::default();
        Ok(Self {
            level: parse_env_var("ATTRMF_LOG_LEVEL", defaults.level)?,
            format: parse_env_var("ATTRMF_LOG_FORMAT", defaults.format)?,
        })
    }
}

/// Initialize the global tracing subscriber
///
/// `RUST_LOG` takes precedence over `config.level`. Must be called at most once per
/// process.
///
/// # Errors
///
/// Returns `SubscriberInit` if a global subscriber is already installed.
pub fn init_logging(config: &LogConfig) -> Result<(), CoreError> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    let subscriber = tracing_subscriber::registry().with(env_filter);

    match config.format {
        LogFormat::Json => subscriber
            .with(tracing_subscriber::fmt::layer().json().with_target(true))
            .try_init(),
        LogFormat::Pretty => subscriber
            .with(tracing_subscriber::fmt::layer().with_target(false))
            .try_init(),
    }
    .map_err(|e| CoreError::SubscriberInit(e.to_string()))?;

    tracing::debug!(level = %config.level, format = ?config.format, "Logging initialized");

    Ok(())
}
