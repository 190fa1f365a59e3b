//! Per-kind controllers.
//!
//! Every kind runs the same reconciliation pass; the modules here only pick
//! the kind's validation rules, dependents and ready message.
//!
//! | kind | rules | dependents |
//! |------|-------|------------|
//! | Agent | runtime image, language, schemas | AgentInstance `spec.agent` |
//! | Realm | none | AgentInstance `spec.realm` |
//! | AgentInstance | none | none |
//! | WorkflowDefinition | none | none |

pub mod agent;
pub mod agent_instance;
pub mod realm;
pub mod workflow_definition;

use std::sync::Arc;

use loopstacks_reconcile::RequeuePolicy;
use loopstacks_store::ObjectStore;

use crate::registry::{ControllerRegistry, RegistryError};

/// Builds a registry holding one controller per managed kind.
pub fn registry(
    store: Arc<dyn ObjectStore>,
    requeue: RequeuePolicy,
) -> Result<ControllerRegistry, RegistryError> {
    let mut registry = ControllerRegistry::new();
    registry.register(Arc::new(agent::controller(store.clone(), requeue)))?;
    registry.register(Arc::new(realm::controller(store.clone(), requeue)))?;
    registry.register(Arc::new(agent_instance::controller(store.clone(), requeue)))?;
    registry.register(Arc::new(workflow_definition::controller(store, requeue)))?;
    Ok(registry)
}
