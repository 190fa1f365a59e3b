//! AgentInstance controller.

use std::sync::Arc;

use loopstacks_api::AgentInstanceSpec;
use loopstacks_reconcile::{Controller, KindPolicy, RequeuePolicy};
use loopstacks_store::ObjectStore;

pub const READY_MESSAGE: &str = "AgentInstance is ready";

/// No rules and no dependents. Replica and condition fields in status are
/// left to the components that run the instance.
pub fn policy() -> KindPolicy<AgentInstanceSpec> {
    KindPolicy::new(READY_MESSAGE)
}

pub fn controller(
    store: Arc<dyn ObjectStore>,
    requeue: RequeuePolicy,
) -> Controller<AgentInstanceSpec> {
    Controller::new(store, policy(), requeue)
}
