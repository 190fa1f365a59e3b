//! Dependent counting for deletion gating and readiness counters.

use loopstacks_api::{DynamicObject, ResourceKind};
use loopstacks_id::ObjectKey;
use loopstacks_store::{FieldSelector, ListParams, ObjectStore, StoreResult};

/// A dependency relation: objects of `kind` reference their owner by name
/// through the string field at `reference_field`, within the owner's
/// namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dependents {
    pub kind: ResourceKind,
    pub reference_field: &'static str,
}

impl Dependents {
    pub const fn new(kind: ResourceKind, reference_field: &'static str) -> Self {
        Self {
            kind,
            reference_field,
        }
    }

    /// List parameters selecting the dependents of `owner`.
    pub fn params(&self, owner: &ObjectKey) -> ListParams {
        ListParams::namespaced(owner.namespace.clone())
            .fields(FieldSelector::equals(self.reference_field, owner.name.as_str()))
    }

    /// Counts dependents of `owner` with a namespace scan.
    pub async fn count(&self, store: &dyn ObjectStore, owner: &ObjectKey) -> StoreResult<u32> {
        let found = store.list(self.kind, &self.params(owner)).await?;
        Ok(u32::try_from(found.len()).unwrap_or(u32::MAX))
    }

    /// Returns the owner key a dependent object points at, if `dependent` is
    /// of this relation's kind and its reference is a valid name.
    pub fn owner_of(&self, dependent: &DynamicObject) -> Option<ObjectKey> {
        if dependent.kind != self.kind {
            return None;
        }
        let name = dependent.field_str(self.reference_field)?;
        ObjectKey::from_parts(dependent.metadata.namespace.as_str(), name).ok()
    }
}
