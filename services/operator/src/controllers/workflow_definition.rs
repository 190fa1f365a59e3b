//! WorkflowDefinition controller.

use std::sync::Arc;

use loopstacks_api::WorkflowDefinitionSpec;
use loopstacks_reconcile::{Controller, KindPolicy, RequeuePolicy};
use loopstacks_store::ObjectStore;

pub const READY_MESSAGE: &str = "WorkflowDefinition is ready";

pub fn policy() -> KindPolicy<WorkflowDefinitionSpec> {
    KindPolicy::new(READY_MESSAGE)
}

pub fn controller(
    store: Arc<dyn ObjectStore>,
    requeue: RequeuePolicy,
) -> Controller<WorkflowDefinitionSpec> {
    Controller::new(store, policy(), requeue)
}
