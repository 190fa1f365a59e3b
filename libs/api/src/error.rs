//! Error types for resource decoding.

use loopstacks_id::IdError;
use thiserror::Error;

use crate::ResourceKind;

/// Errors that can occur when building or decoding resources.
#[derive(Debug, Error, Clone)]
pub enum ApiError {
    /// The kind name is unknown.
    #[error("unknown resource kind: {0}")]
    UnknownKind(String),

    /// A dynamic object was decoded as the wrong kind.
    #[error("kind mismatch: expected {expected}, got {actual}")]
    KindMismatch {
        expected: ResourceKind,
        actual: ResourceKind,
    },

    /// A namespace or name failed validation.
    #[error("invalid name: {0}")]
    InvalidName(#[from] IdError),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::Serialization(err.to_string())
    }
}
