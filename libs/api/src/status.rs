//! Operator-owned status model.

use std::fmt::Debug;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Lifecycle phase reported in `status.phase`.
///
/// An absent phase means the operator has not observed the object yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Phase {
    /// Observed, validation not finished.
    Pending,
    /// The last validation pass succeeded.
    Ready,
    /// The spec failed validation; `message` carries the reason.
    Failed,
    /// Deletion requested but blocked; `message` carries the reason.
    Terminating,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Pending => "Pending",
            Phase::Ready => "Ready",
            Phase::Failed => "Failed",
            Phase::Terminating => "Terminating",
        }
    }

    /// Returns true for phases that must carry a non-empty message.
    pub fn requires_message(&self) -> bool {
        matches!(self, Phase::Failed | Phase::Terminating)
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status fields every kind exposes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusCore {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase: Option<Phase>,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub message: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<DateTime<Utc>>,
}

impl StatusCore {
    /// Sets phase and message together.
    pub fn set(&mut self, phase: Phase, message: impl Into<String>) {
        self.phase = Some(phase);
        self.message = message.into();
    }
}

/// Kind-specific status: the common fields plus kind counters.
pub trait ResourceStatus:
    Clone + Default + PartialEq + Debug + Serialize + DeserializeOwned + Send + Sync + 'static
{
    fn core(&self) -> &StatusCore;

    fn core_mut(&mut self) -> &mut StatusCore;

    /// Records the dependent count for kinds that publish one.
    fn set_dependents(&mut self, _count: u32) {}

    /// Returns true if both statuses report the same observation, ignoring
    /// the `last_updated` stamp.
    fn same_observation(&self, other: &Self) -> bool {
        let mut a = self.clone();
        let mut b = other.clone();
        a.core_mut().last_updated = None;
        b.core_mut().last_updated = None;
        a == b
    }
}
