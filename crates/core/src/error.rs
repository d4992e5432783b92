//! Error types shared across attrmf crates

use thiserror::Error;

/// Errors raised by the shared configuration and logging layers
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoreError {
    /// A configuration value is missing, unparsable, or out of range
    #[error("Configuration error: {message}")]
    ConfigurationError {
        message: String,
        /// Environment variable or config key that caused the failure
        key: Option<String>,
    },

    /// The global tracing subscriber could not be installed
    #[error("Failed to initialize tracing subscriber: {0}")]
    SubscriberInit(String),
}

impl CoreError {
    /// Build a configuration error tied to a specific key
    pub fn config(message: impl Into<String>, key: impl Into<String>) -> Self {
        Self::ConfigurationError {
            message: message.into(),
            key: Some(key.into()),
        }
    }

    /// Key associated with a configuration error, if any
    pub fn key(&self) -> Option<&str> {
        match self {
            Self::ConfigurationError { key, .. } => key.as_deref(),
            Self::SubscriberInit(_) => None,
        }
    }
}
