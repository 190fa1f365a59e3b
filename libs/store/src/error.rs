//! Store error types.

use loopstacks_api::{ApiError, ResourceKind};
use loopstacks_id::{ObjectKey, ResourceVersion};
use thiserror::Error;

/// Store operation errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The object does not exist.
    #[error("{kind} {key} not found")]
    NotFound { kind: ResourceKind, key: ObjectKey },

    /// An object with the same kind and key already exists.
    #[error("{kind} {key} already exists")]
    AlreadyExists { kind: ResourceKind, key: ObjectKey },

    /// Optimistic concurrency rejection.
    #[error("resource version conflict on {kind} {key}: expected {expected}, stored {actual}")]
    Conflict {
        kind: ResourceKind,
        key: ObjectKey,
        expected: ResourceVersion,
        actual: ResourceVersion,
    },

    /// The request is not allowed in the object's current state.
    #[error("invalid request: {0}")]
    Invalid(String),

    /// The backend cannot be reached.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// A stored object could not be decoded into its typed form.
    #[error("decode error: {0}")]
    Decode(String),
}

impl StoreError {
    /// Returns true for optimistic-concurrency rejections.
    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::Conflict { .. })
    }

    /// Returns true if the object does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }
}

impl From<ApiError> for StoreError {
    fn from(err: ApiError) -> Self {
        StoreError::Decode(err.to_string())
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
