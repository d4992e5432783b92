//! # attrmf core
//!
//! Ambient building blocks shared by the attrmf crates.
//!
//! ## Modules
//!
//! - `error`: Error types and handling
//! - `config`: Configuration loading and validation
//! - `observability`: Structured logging initialization

pub mod config;
pub mod error;
pub mod observability;

// Re-export commonly used types
pub use config::{
    load_dotenv, load_layered, parse_env_bool, parse_env_optional, parse_env_var, ConfigLoader,
};
pub use error::CoreError;
pub use observability::{init_logging, LogConfig, LogFormat};

/// Result type alias for core operations
pub type Result<T> = std::result::Result<T, CoreError>;
