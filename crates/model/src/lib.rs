//! attrmf: rating prediction by biased matrix factorization with side attributes
//!
//! Learns a global bias, per-user and per-item biases, latent factors and linear
//! weights over optional user/item attribute vectors from sparse
//! `(user, item, rating)` observations, using plain SGD with learning-rate decay.
//!
//! ```
//! use attrmf_model::{FactorizationModel, ModelConfig};
//!
//! let mut model = FactorizationModel::new(ModelConfig {
//!     n_latent_factor: 2,
//!     n_epochs: 50,
//!     random_seed: Some(7),
//!     ..ModelConfig::default()
//! });
//! model
//!     .fit(&[1, 1, 2], &["a", "b", "a"], &[5.0, 3.0, 4.0], None, None)
//!     .unwrap();
//!
//! let scores = model.predict(&[2, 3], &["b", "a"], None, None).unwrap();
//! assert_eq!(scores.len(), 2);
//! ```

pub mod attributes;
pub mod channels;
pub mod config;
pub mod convergence;
pub mod error;
pub mod index;
pub mod matrix_factorization;

// Re-export key types
pub use attributes::{AttributeMatrix, Attributes};
pub use channels::{ChannelKind, Contribution, Sample, Step};
pub use config::ModelConfig;
pub use convergence::{ConvergenceMonitor, EpochOutcome, MAX_STALLS, STALL_THRESHOLD};
pub use error::{ModelError, Result, Side};
pub use index::{IdentifierIndex, RawId};
pub use matrix_factorization::{FactorizationModel, FitSummary, Observation};

#[cfg(test)]
mod tests;
