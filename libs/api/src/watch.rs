//! Change notifications emitted by the store.

use chrono::{DateTime, Utc};
use loopstacks_id::ObjectKey;
use serde::{Deserialize, Serialize};

use crate::{DynamicObject, ResourceKind};

/// What happened to the object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WatchEventType {
    Added,
    /// Metadata or spec changed.
    Modified,
    /// Only status changed.
    StatusModified,
    /// The object was hard-removed.
    Deleted,
}

/// A change notification carrying a snapshot of the object after the change
/// (or the last stored copy, for `Deleted`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WatchEvent {
    pub event_type: WatchEventType,
    pub object: DynamicObject,
    pub occurred_at: DateTime<Utc>,
}

impl WatchEvent {
    pub fn new(event_type: WatchEventType, object: DynamicObject) -> Self {
        Self {
            event_type,
            object,
            occurred_at: Utc::now(),
        }
    }

    pub fn kind(&self) -> ResourceKind {
        self.object.kind
    }

    pub fn key(&self) -> ObjectKey {
        self.object.key()
    }

    /// Returns false for status-only writes, which the operator itself
    /// produces and must not react to.
    pub fn triggers_reconcile(&self) -> bool {
        !matches!(self.event_type, WatchEventType::StatusModified)
    }
}
