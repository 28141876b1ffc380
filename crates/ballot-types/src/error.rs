use thiserror::Error;

/// Errors produced by type operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid hex string: {0}")]
    InvalidHex(String),

    #[error("invalid byte length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    #[error("proposal label is {actual} bytes, limit is {max}")]
    LabelTooLong { max: usize, actual: usize },

    #[error("empty identity")]
    EmptyIdentity,
}
