//! Reconciliation loop primitives.
//!
//! This library implements the level-triggered reconciliation pass shared by
//! every managed kind. One pass observes an object, decides the next step,
//! persists it, and returns a requeue hint:
//!
//! - **Finalizer attach**: a live object without the operator's finalizer
//!   gets it added, and nothing else happens in that pass.
//! - **Deletion**: once deletion is requested, the finalizer is removed only
//!   when no dependents reference the object any more.
//! - **Normal**: the spec is validated (first failing rule wins) and the
//!   status advances to `Ready` or `Failed`.
//!
//! # Invariants
//!
//! - All passes are idempotent; re-running a pass on unchanged input
//!   produces no writes
//! - Decisions are pure functions of the object and its dependent count
//! - Conflicting writes abandon the pass; nothing is merged in place

mod action;
mod backoff;
mod controller;
pub mod decision;
mod dependents;
mod error;
mod projector;
mod reconciler;
mod rules;

pub use action::{Action, RequeuePolicy};
pub use backoff::ErrorBackoff;
pub use controller::{Controller, KindPolicy};
pub use dependents::Dependents;
pub use error::ReconcileError;
pub use projector::StatusProjector;
pub use reconciler::{Outcome, Reconciled, Reconciler};
pub use rules::{Rule, RuleSet, RuleViolation, SPEC_DECODE_RULE};

use std::time::Duration;

/// Default retry interval after a validation failure.
pub const DEFAULT_FAILURE_RETRY: Duration = Duration::from_secs(5 * 60);

/// Default steady-state resync interval.
pub const DEFAULT_RESYNC_INTERVAL: Duration = Duration::from_secs(10 * 60);

/// Default poll interval while deletion is blocked by dependents.
pub const DEFAULT_DELETION_POLL: Duration = Duration::from_secs(30);

/// Default first delay of the per-key error backoff.
pub const DEFAULT_BACKOFF_BASE: Duration = Duration::from_millis(5);

/// Default ceiling of the per-key error backoff.
pub const DEFAULT_BACKOFF_MAX: Duration = Duration::from_secs(5 * 60);
