//! Model hyperparameters
//!
//! # Environment Variables
//!
//! - `ATTRMF_N_LATENT_FACTOR`: latent dimensionality, 0 disables the term (default: 200)
//! - `ATTRMF_LEARNING_RATE`: initial SGD step size (default: 0.005)
//! - `ATTRMF_REGULARIZATION_WEIGHT`: L2 weight (default: 0.02)
//! - `ATTRMF_N_EPOCHS`: hard cap on training epochs (default: 20)
//! - `ATTRMF_GLOBAL_BIAS`: enable the global bias (default: true)
//! - `ATTRMF_ID_BIAS`: enable user and item biases (default: true)
//! - `ATTRMF_VERBOSE`: log progress every 10 epochs (default: false)
//! - `ATTRMF_RANDOM_SEED`: seed for the latent factor initializer (default: unset)

use attrmf_core::{
    load_layered, parse_env_bool, parse_env_optional, parse_env_var, ConfigLoader, CoreError,
};
use serde::{Deserialize, Serialize};
use std::path::Path;

const ENV_PREFIX: &str = "ATTRMF";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Number of latent factors (0 disables P and Q)
    pub n_latent_factor: usize,
    /// Initial learning rate; halved whenever an epoch stalls
    pub learning_rate: f64,
    /// Regularization parameter (lambda)
    pub regularization_weight: f64,
    /// Maximum number of epochs
    pub n_epochs: usize,
    pub global_bias: bool,
    /// Per-user and per-item biases
    pub id_bias: bool,
    pub verbose: bool,
    pub random_seed: Option<u64>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            n_latent_factor: 200,
            learning_rate: 0.005,
            regularization_weight: 0.02,
            n_epochs: 20,
            global_bias: true,
            id_bias: true,
            verbose: false,
            random_seed: None,
        }
    }
}

impl ModelConfig {
    /// Override the fields of `base` that have an `ATTRMF_*` variable set
    pub fn from_env_with(base: Self) -> Result<Self, CoreError> {
        Ok(Self {
            n_latent_factor: parse_env_var("ATTRMF_N_LATENT_FACTOR", base.n_latent_factor)?,
            learning_rate: parse_env_var("ATTRMF_LEARNING_RATE", base.learning_rate)?,
            regularization_weight: parse_env_var(
                "ATTRMF_REGULARIZATION_WEIGHT",
                base.regularization_weight,
            )?,
            n_epochs: parse_env_var("ATTRMF_N_EPOCHS", base.n_epochs)?,
            global_bias: parse_env_bool("ATTRMF_GLOBAL_BIAS", base.global_bias)?,
            id_bias: parse_env_bool("ATTRMF_ID_BIAS", base.id_bias)?,
            verbose: parse_env_bool("ATTRMF_VERBOSE", base.verbose)?,
            random_seed: parse_env_optional("ATTRMF_RANDOM_SEED")?.or(base.random_seed),
        })
    }

    /// Load from an optional config file layered under `ATTRMF_*` variables
    pub fn load(path: Option<&Path>) -> Result<Self, CoreError> {
        load_layered(path, ENV_PREFIX)
    }
}

impl ConfigLoader for ModelConfig {
    fn from_env() -> Result<Self, CoreError> {
        Self::from_env_with(Self::default())
    }

    fn validate(&self) -> Result<(), CoreError> {
        if !self.learning_rate.is_finite() || self.learning_rate <= 0.0 {
            return Err(CoreError::config(
                format!("learning_rate must be positive, got {}", self.learning_rate),
                "ATTRMF_LEARNING_RATE",
            ));
        }

        if !self.regularization_weight.is_finite() || self.regularization_weight < 0.0 {
            return Err(CoreError::config(
                format!(
                    "regularization_weight must be non-negative, got {}",
                    self.regularization_weight
                ),
                "ATTRMF_REGULARIZATION_WEIGHT",
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    #[test]
    fn test_default_settings() {
        let config = ModelConfig::default();
        assert_eq!(config.n_latent_factor, 200);
        assert_eq!(config.learning_rate, 0.005);
        assert_eq!(config.regularization_weight, 0.02);
        assert_eq!(config.n_epochs, 20);
        assert!(config.global_bias);
        assert!(config.id_bias);
        assert!(!config.verbose);
        assert!(config.random_seed.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_learning_rate() {
        let config = ModelConfig {
            learning_rate: 0.0,
            ..ModelConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert_eq!(err.key(), Some("ATTRMF_LEARNING_RATE"));

        let config = ModelConfig {
            learning_rate: f64::NAN,
            ..ModelConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_negative_regularization() {
        let config = ModelConfig {
            regularization_weight: -0.1,
            ..ModelConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert_eq!(err.key(), Some("ATTRMF_REGULARIZATION_WEIGHT"));
    }

    // All ATTRMF_* variables are touched by this single test so parallel tests in
    // this crate never observe them.
    #[test]
    fn test_env_overrides() {
        env::set_var("ATTRMF_N_LATENT_FACTOR", "4");
        env::set_var("ATTRMF_VERBOSE", "1");
        env::set_var("ATTRMF_RANDOM_SEED", "1234");

        let base = ModelConfig {
            n_epochs: 500,
            ..ModelConfig::default()
        };
        let config = ModelConfig::from_env_with(base).unwrap();
        assert_eq!(config.n_latent_factor, 4);
        assert_eq!(config.n_epochs, 500);
        assert!(config.verbose);
        assert_eq!(config.random_seed, Some(1234));

        let layered = ModelConfig::load(None).unwrap();
        assert_eq!(layered.n_latent_factor, 4);
        assert_eq!(layered.n_epochs, 20);
        assert_eq!(layered.random_seed, Some(1234));

        env::set_var("ATTRMF_N_EPOCHS", "many");
        assert!(ModelConfig::from_env().is_err());

        env::remove_var("ATTRMF_N_LATENT_FACTOR");
        env::remove_var("ATTRMF_VERBOSE");
        env::remove_var("ATTRMF_RANDOM_SEED");
        env::remove_var("ATTRMF_N_EPOCHS");
    }
}
