//! Pure decisions of a reconciliation pass.
//!
//! Nothing here touches the store. The controller feeds in the observed
//! object and dependent count and persists whatever comes out.

use loopstacks_api::{ObjectMeta, Phase, ResourceKind, ResourceStatus};

use crate::{Action, Outcome, RequeuePolicy, RuleViolation};

/// Which protocol a pass runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Branch {
    /// Live object missing the finalizer.
    AttachFinalizer,
    /// Deletion requested.
    Deletion,
    /// Live object carrying the finalizer.
    Normal,
}

/// Selects the branch. Deletion takes precedence: a finalizer is never added
/// once deletion has been requested.
pub fn select_branch(meta: &ObjectMeta, finalizer: &str) -> Branch {
    if meta.is_deletion_requested() {
        Branch::Deletion
    } else if !meta.has_finalizer(finalizer) {
        Branch::AttachFinalizer
    } else {
        Branch::Normal
    }
}

/// Returns true on first observation.
pub fn needs_initialization<St: ResourceStatus>(status: &St) -> bool {
    status.core().phase.is_none()
}

/// The first-observation status: `Pending`, everything else untouched.
pub fn initialized<St: ResourceStatus>(status: &St) -> St {
    let mut next = status.clone();
    next.core_mut().set(Phase::Pending, "");
    next
}

/// Normal-branch decision after validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Readiness {
    Failed { reason: String },
    Ready { dependents: u32 },
}

impl Readiness {
    /// `dependents` is only consulted when validation passed.
    pub fn decide(verdict: Result<(), RuleViolation>, dependents: impl FnOnce() -> u32) -> Self {
        match verdict {
            Err(violation) => Readiness::Failed {
                reason: violation.reason,
            },
            Ok(()) => Readiness::Ready {
                dependents: dependents(),
            },
        }
    }

    /// Projects the decision onto the current status.
    ///
    /// A failure leaves the counters at their last snapshot.
    pub fn apply<St: ResourceStatus>(&self, current: &St, ready_message: &str) -> St {
        let mut next = current.clone();
        match self {
            Readiness::Failed { reason } => next.core_mut().set(Phase::Failed, reason.as_str()),
            Readiness::Ready { dependents } => {
                next.core_mut().set(Phase::Ready, ready_message);
                next.set_dependents(*dependents);
            }
        }
        next
    }

    pub fn outcome(&self) -> Outcome {
        match self {
            Readiness::Failed { .. } => Outcome::Invalid,
            Readiness::Ready { .. } => Outcome::Ready,
        }
    }

    pub fn action(&self, policy: &RequeuePolicy) -> Action {
        match self {
            Readiness::Failed { .. } => Action::requeue(policy.failure_retry),
            Readiness::Ready { .. } => Action::requeue(policy.resync),
        }
    }
}

/// Deletion-branch decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Deletion {
    Block { remaining: u32, message: String },
    Release,
}

impl Deletion {
    /// `dependent_kind` is the kind counted; `None` means the kind has no
    /// dependents and deletion is never blocked.
    pub fn decide(remaining: u32, dependent_kind: Option<ResourceKind>) -> Self {
        match dependent_kind {
            Some(kind) if remaining > 0 => Deletion::Block {
                remaining,
                message: blocked_message(remaining, kind),
            },
            _ => Deletion::Release,
        }
    }

    /// The `Terminating` status for a blocked deletion, or `None` on release.
    pub fn blocked_status<St: ResourceStatus>(&self, current: &St) -> Option<St> {
        match self {
            Deletion::Block { remaining, message } => {
                let mut next = current.clone();
                next.core_mut().set(Phase::Terminating, message.as_str());
                next.set_dependents(*remaining);
                Some(next)
            }
            Deletion::Release => None,
        }
    }

    pub fn outcome(&self) -> Outcome {
        match self {
            Deletion::Block { .. } => Outcome::Blocked,
            Deletion::Release => Outcome::Released,
        }
    }

    /// Blocked deletions poll; a release needs no requeue because the
    /// object is about to disappear.
    pub fn action(&self, policy: &RequeuePolicy) -> Action {
        match self {
            Deletion::Block { .. } => Action::requeue(policy.deletion_poll),
            Deletion::Release => Action::await_change(),
        }
    }
}

/// `Waiting for 3 AgentInstance(s) to be deleted`.
pub fn blocked_message(remaining: u32, kind: ResourceKind) -> String {
    format!("Waiting for {remaining} {kind}(s) to be deleted")
}
