//! Model error types

use attrmf_core::CoreError;
use std::fmt;

/// Which side of the (user, item) pair a value belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    User,
    Item,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::User => write!(f, "user"),
            Side::Item => write!(f, "item"),
        }
    }
}

pub type Result<T> = std::result::Result<T, ModelError>;

#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("Model not trained yet")]
    NotFitted,

    /// The model learned a coefficient vector for this side, so every prediction call
    /// has to pass an attribute map for it, even one that only repeats training data.
    #[error("Model was fitted using {side} attributes, but no {side} attributes were passed")]
    MissingAttributes { side: Side },

    #[error("{side} attribute vector has length {actual}, expected {expected}")]
    DimensionMismatch {
        side: Side,
        expected: usize,
        actual: usize,
    },

    #[error("Input length mismatch: expected {expected} entries, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },

    #[error("{side} index {index} out of range for {len} known ids")]
    IndexOutOfRange { side: Side, index: usize, len: usize },

    #[error(transparent)]
    Config(#[from] CoreError),
}
