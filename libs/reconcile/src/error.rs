//! Reconciliation errors.
//!
//! Only failures the dispatcher must retry are errors. Validation failures
//! and blocked deletions are recorded in status and returned as normal
//! outcomes.

use std::time::Duration;

use loopstacks_api::ApiError;
use loopstacks_store::StoreError;
use thiserror::Error;

/// Reconciliation errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ReconcileError {
    /// A write was rejected by optimistic concurrency; the pass was abandoned.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The store failed; surfaced uninterpreted.
    #[error("store error: {0}")]
    Store(StoreError),

    /// A stored object could not be decoded.
    #[error("decode error: {0}")]
    Decode(String),

    /// The pass exceeded the dispatcher's deadline.
    #[error("timeout after {elapsed:?} reconciling {resource}")]
    Timeout { resource: String, elapsed: Duration },

    /// The pass was cancelled by shutdown.
    #[error("cancelled: {0}")]
    Cancelled(String),
}

impl ReconcileError {
    pub fn is_conflict(&self) -> bool {
        matches!(self, ReconcileError::Conflict(_))
    }
}

impl From<StoreError> for ReconcileError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict { .. } => ReconcileError::Conflict(err.to_string()),
            StoreError::Decode(msg) => ReconcileError::Decode(msg),
            other => ReconcileError::Store(other),
        }
    }
}

impl From<ApiError> for ReconcileError {
    fn from(err: ApiError) -> Self {
        ReconcileError::Decode(err.to_string())
    }
}
