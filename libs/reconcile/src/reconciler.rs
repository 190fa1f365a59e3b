//! The per-kind reconciler capability the dispatcher drives.

use async_trait::async_trait;
use loopstacks_api::{DynamicObject, ResourceKind};
use loopstacks_id::ObjectKey;

use crate::{Action, ReconcileError};

/// How a pass ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
    /// The object no longer exists.
    Absent,
    /// The finalizer was added; nothing else happened.
    FinalizerAttached,
    /// Validation passed and the status reports `Ready`.
    Ready,
    /// Validation failed and the status reports `Failed`.
    Invalid,
    /// Deletion is waiting on dependents; the status reports `Terminating`.
    Blocked,
    /// The finalizer was removed so the store can remove the object.
    Released,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Absent => "absent",
            Outcome::FinalizerAttached => "finalizer_attached",
            Outcome::Ready => "ready",
            Outcome::Invalid => "invalid",
            Outcome::Blocked => "blocked",
            Outcome::Released => "released",
        }
    }
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of a successful pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reconciled {
    pub outcome: Outcome,
    pub action: Action,
}

impl Reconciled {
    pub fn new(outcome: Outcome, action: Action) -> Self {
        Self { outcome, action }
    }
}

/// One reconciler per managed kind.
#[async_trait]
pub trait Reconciler: Send + Sync {
    /// The kind this reconciler owns.
    fn kind(&self) -> ResourceKind;

    /// Runs one pass for `key`. Callers must not run two passes for the same
    /// key concurrently.
    async fn reconcile(&self, key: &ObjectKey) -> Result<Reconciled, ReconcileError>;

    /// Returns the key of the object of this kind that `dependent` references,
    /// so changes to dependents can wake their owner.
    fn owner_of(&self, _dependent: &DynamicObject) -> Option<ObjectKey> {
        None
    }
}
