//! Watch-driven dispatch of reconciliation passes.
//!
//! The dispatcher:
//! - Lists every registered kind at startup and enqueues each object
//! - Pumps store watch events into a deduplicating work queue
//! - Wakes owners when one of their dependents changes
//! - Runs passes on a fixed pool of workers, one pass per key at a time
//! - Schedules the next pass from the returned requeue hint, or from the
//!   per-key error backoff when a pass fails

mod queue;
mod worker;

pub use queue::WorkQueue;
pub use worker::{DispatchError, Dispatcher};

use std::time::Duration;

use anyhow::Context;
use tokio::task::JoinError;

use loopstacks_api::ResourceKind;
use loopstacks_id::ObjectKey;
use loopstacks_reconcile::{DEFAULT_BACKOFF_BASE, DEFAULT_BACKOFF_MAX};

/// Configuration for the dispatcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchConfig {
    /// Number of concurrent workers.
    pub workers: usize,

    /// Deadline for a single pass.
    pub pass_timeout: Duration,

    /// First retry delay after a failed pass.
    pub backoff_base: Duration,

    /// Ceiling of the retry delay.
    pub backoff_max: Duration,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            pass_timeout: Duration::from_secs(30),
            backoff_base: DEFAULT_BACKOFF_BASE,
            backoff_max: DEFAULT_BACKOFF_MAX,
        }
    }
}

/// The unit of work: one object of one kind.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WorkKey {
    pub kind: ResourceKind,
    pub key: ObjectKey,
}

impl WorkKey {
    pub fn new(kind: ResourceKind, key: ObjectKey) -> Self {
        Self { kind, key }
    }
}

impl std::fmt::Display for WorkKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.kind, self.key)
    }
}

/// Maps how the dispatcher task ended to the process result.
pub fn dispatcher_exit(joined: Result<Result<(), DispatchError>, JoinError>) -> anyhow::Result<()> {
    match joined {
        Ok(result) => result.context("dispatcher failed"),
        Err(e) => Err(anyhow::Error::new(e).context("dispatcher task ended abnormally")),
    }
}
