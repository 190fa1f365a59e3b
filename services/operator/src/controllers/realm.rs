//! Realm controller.
//!
//! Realms carry no validation rules yet. They count the AgentInstances placed
//! in them and cannot be removed while any remain.

use std::sync::Arc;

use loopstacks_api::{RealmSpec, ResourceKind};
use loopstacks_reconcile::{Controller, Dependents, KindPolicy, RequeuePolicy};
use loopstacks_store::ObjectStore;

pub const READY_MESSAGE: &str = "Realm is ready";

/// AgentInstances reference their Realm through `spec.realm`.
pub const DEPENDENTS: Dependents = Dependents::new(ResourceKind::AgentInstance, "spec.realm");

pub fn policy() -> KindPolicy<RealmSpec> {
    KindPolicy::new(READY_MESSAGE).with_dependents(DEPENDENTS)
}

pub fn controller(store: Arc<dyn ObjectStore>, requeue: RequeuePolicy) -> Controller<RealmSpec> {
    Controller::new(store, policy(), requeue)
}
