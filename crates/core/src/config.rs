//! Shared configuration loading for attrmf crates
//!
//! Configuration follows the override hierarchy: defaults < config file < environment.
//! Environment variables use a crate-chosen prefix (the model crate uses `ATTRMF_`).
//!
//! # Example
//!
//! ```no_run
//! use attrmf_core::config::{load_dotenv, parse_env_var};
//!
//! # fn example() -> Result<(), attrmf_core::CoreError> {
//! load_dotenv();
//! let epochs: usize = parse_env_var("ATTRMF_N_EPOCHS", 20)?;
//! # Ok(())
//! # }
//! ```

use crate::error::CoreError;
use serde::de::DeserializeOwned;
use std::path::Path;

/// Configuration loader trait
///
/// Provides standardized methods for loading and validating configuration from
/// environment variables.
pub trait ConfigLoader: Sized {
    /// Load configuration from environment variables, falling back to defaults for
    /// anything not set.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigurationError` if a variable is set but cannot be parsed.
    fn from_env() -> Result<Self, CoreError>;

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns a `ConfigurationError` naming the offending key if any check fails.
    fn validate(&self) -> Result<(), CoreError>;
}

/// Parse an environment variable with a default value
///
/// # Errors
///
/// Returns a `ConfigurationError` if the variable is set but cannot be parsed into `T`.
pub fn parse_env_var<T>(key: &str, default: T) -> Result<T, CoreError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    Ok(parse_env_optional(key)?.unwrap_or(default))
}

/// Parse an environment variable that has no default
///
/// Returns `Ok(None)` when the variable is unset or empty.
pub fn parse_env_optional<T>(key: &str) -> Result<Option<T>, CoreError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(v) if v.trim().is_empty() => Ok(None),
        Ok(v) => v
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| CoreError::config(format!("Failed to parse {}: {}", key, e), key)),
        Err(_) => Ok(None),
    }
}

/// Parse a boolean flag, accepting `true/false`, `1/0`, `yes/no` and `on/off`
pub fn parse_env_bool(key: &str, default: bool) -> Result<bool, CoreError> {
    let Ok(raw) = std::env::var(key) else {
        return Ok(default);
    };

    match raw.trim().to_ascii_lowercase().as_str() {
        "" => Ok(default),
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        other => Err(CoreError::config(
            format!("Failed to parse {}: '{}' is not a boolean", key, other),
            key,
        )),
    }
}

/// Load a serde-deserializable configuration in layers
///
/// Values come from, in increasing priority: the type's serde defaults, the optional
/// file at `path` (format picked from its extension), and environment variables named
/// `{prefix}_{FIELD}`.
///
/// # Errors
///
/// Returns a `ConfigurationError` if the file is missing or malformed, or a value
/// cannot be deserialized into `T`.
pub fn load_layered<T>(path: Option<&Path>, prefix: &str) -> Result<T, CoreError>
where
    T: DeserializeOwned,
{
    let mut builder = config::Config::builder();

    if let Some(path) = path {
        builder = builder.add_source(config::File::from(path).required(true));
    }

    builder
        .add_source(config::Environment::with_prefix(prefix).try_parsing(true))
        .build()
        .and_then(|settings| settings.try_deserialize::<T>())
        .map_err(|e| CoreError::ConfigurationError {
            message: format!("Failed to load layered configuration: {}", e),
            key: path.map(|p| p.display().to_string()),
        })
}

/// Load .env file if present
///
/// Does not return an error if the .env file is not found.
pub fn load_dotenv() {
    if let Err(e) = dotenvy::dotenv() {
        // Only log if it's not a "file not found" error
        if !e.not_found() {
            tracing::warn!(error = %e, "Failed to load .env file");
        }
    }
}
