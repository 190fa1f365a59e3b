//! Explicit controller registry.
//!
//! Built once at startup and shared with the dispatcher by handle; there is
//! no process-wide registration state.

use std::collections::BTreeMap;
use std::sync::Arc;

use loopstacks_api::{DynamicObject, ResourceKind};
use loopstacks_id::ObjectKey;
use loopstacks_reconcile::Reconciler;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("a reconciler for {0} is already registered")]
    Duplicate(ResourceKind),
}

/// Maps each kind to its reconciler.
#[derive(Default)]
pub struct ControllerRegistry {
    reconcilers: BTreeMap<ResourceKind, Arc<dyn Reconciler>>,
}

impl ControllerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a reconciler under its own kind.
    pub fn register(&mut self, reconciler: Arc<dyn Reconciler>) -> Result<(), RegistryError> {
        let kind = reconciler.kind();
        if self.reconcilers.contains_key(&kind) {
            return Err(RegistryError::Duplicate(kind));
        }
        self.reconcilers.insert(kind, reconciler);
        Ok(())
    }

    pub fn get(&self, kind: ResourceKind) -> Option<&Arc<dyn Reconciler>> {
        self.reconcilers.get(&kind)
    }

    /// Registered kinds in a stable order.
    pub fn kinds(&self) -> Vec<ResourceKind> {
        self.reconcilers.keys().copied().collect()
    }

    /// Owner objects that `dependent` references, across all registered kinds.
    pub fn owners_of(&self, dependent: &DynamicObject) -> Vec<(ResourceKind, ObjectKey)> {
        self.reconcilers
            .iter()
            .filter_map(|(kind, reconciler)| reconciler.owner_of(dependent).map(|key| (*kind, key)))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.reconcilers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reconcilers.is_empty()
    }
}
