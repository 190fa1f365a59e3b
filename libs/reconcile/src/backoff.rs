//! Per-key exponential backoff for passes that end in an error.

use std::collections::BTreeMap;
use std::time::Duration;

use crate::{DEFAULT_BACKOFF_BASE, DEFAULT_BACKOFF_MAX};

/// Backoff tracker for failed passes.
///
/// Each consecutive failure of a key doubles its delay, starting at `base`
/// and capped at `max`. A success clears the key.
#[derive(Debug, Clone)]
pub struct ErrorBackoff<K: Ord> {
    base: Duration,
    max: Duration,

    /// Consecutive failures per key.
    failures: BTreeMap<K, u32>,
}

impl<K: Ord + Clone> ErrorBackoff<K> {
    pub fn new(base: Duration, max: Duration) -> Self {
        Self {
            base,
            max,
            failures: BTreeMap::new(),
        }
    }

    /// Records a failure and returns the delay before the next attempt.
    pub fn record_failure(&mut self, key: &K) -> Duration {
        let count = self.failures.entry(key.clone()).or_insert(0);
        *count = count.saturating_add(1);

        let exponent = (*count - 1).min(31);
        self.base.saturating_mul(1u32 << exponent).min(self.max)
    }

    /// Consecutive failures recorded for `key`.
    pub fn failures(&self, key: &K) -> u32 {
        self.failures.get(key).copied().unwrap_or(0)
    }

    /// Clears failure tracking for a key (on success).
    pub fn clear(&mut self, key: &K) {
        self.failures.remove(key);
    }

    /// Keys with at least one failure since their last success.
    pub fn tracked(&self) -> usize {
        self.failures.len()
    }
}

impl<K: Ord + Clone> Default for ErrorBackoff<K> {
    fn default() -> Self {
        Self::new(DEFAULT_BACKOFF_BASE, DEFAULT_BACKOFF_MAX)
    }
}
