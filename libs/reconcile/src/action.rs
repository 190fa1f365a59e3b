//! Requeue hints returned by a reconciliation pass.

use std::time::Duration;

use crate::{DEFAULT_DELETION_POLL, DEFAULT_FAILURE_RETRY, DEFAULT_RESYNC_INTERVAL};

/// What the dispatcher should do with the key after a pass.
///
/// A hint, not a guarantee: an external change may trigger the next pass
/// earlier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Action {
    requeue_after: Option<Duration>,
}

impl Action {
    /// Reconcile again after `duration`.
    pub fn requeue(duration: Duration) -> Self {
        Self {
            requeue_after: Some(duration),
        }
    }

    /// Do not schedule anything; wait for the next watch event.
    pub fn await_change() -> Self {
        Self {
            requeue_after: None,
        }
    }

    pub fn requeue_after(&self) -> Option<Duration> {
        self.requeue_after
    }
}

/// Requeue intervals for the three recoverable outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequeuePolicy {
    /// Fixed retry after a validation failure. Not exponential: only a spec
    /// edit can fix it.
    pub failure_retry: Duration,

    /// Safety-net resync for `Ready` objects.
    pub resync: Duration,

    /// Poll while deletion waits on dependents.
    pub deletion_poll: Duration,
}

impl Default for RequeuePolicy {
    fn default() -> Self {
        Self {
            failure_retry: DEFAULT_FAILURE_RETRY,
            resync: DEFAULT_RESYNC_INTERVAL,
            deletion_poll: DEFAULT_DELETION_POLL,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy() {
        let policy = RequeuePolicy::default();
        assert_eq!(policy.failure_retry, Duration::from_secs(300));
        assert_eq!(policy.resync, Duration::from_secs(600));
        assert_eq!(policy.deletion_poll, Duration::from_secs(30));
        assert!(policy.deletion_poll < policy.resync);
    }

    #[test]
    fn test_action() {
        assert_eq!(Action::await_change().requeue_after(), None);
        assert_eq!(
            Action::requeue(Duration::from_secs(1)).requeue_after(),
            Some(Duration::from_secs(1))
        );
    }
}
