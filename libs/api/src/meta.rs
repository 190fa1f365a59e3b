//! Object metadata shared by every kind.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use loopstacks_id::{Generation, Namespace, ObjectKey, ObjectUid, ResourceName, ResourceVersion};
use serde::{Deserialize, Serialize};

/// Metadata carried by every managed object.
///
/// `uid`, `resource_version`, `generation` and `created_at` are assigned by
/// the store; user-supplied values are ignored on create.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMeta {
    pub namespace: Namespace,

    pub name: ResourceName,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uid: Option<ObjectUid>,

    /// Optimistic-concurrency token of the stored copy this value was read from.
    #[serde(default, skip_serializing_if = "ResourceVersion::is_unset")]
    pub resource_version: ResourceVersion,

    #[serde(default)]
    pub generation: Generation,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,

    /// Tokens that block hard removal until cleared. Kept free of duplicates.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub finalizers: Vec<String>,

    /// Deletion-intent marker: present once deletion was requested.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deletion_requested_at: Option<DateTime<Utc>>,
}

impl ObjectMeta {
    /// Creates metadata for a not-yet-stored object.
    pub fn new(namespace: Namespace, name: ResourceName) -> Self {
        Self {
            namespace,
            name,
            uid: None,
            resource_version: ResourceVersion::default(),
            generation: Generation::default(),
            created_at: None,
            labels: BTreeMap::new(),
            finalizers: Vec::new(),
            deletion_requested_at: None,
        }
    }

    /// Returns the `(namespace, name)` key.
    pub fn key(&self) -> ObjectKey {
        ObjectKey::new(self.namespace.clone(), self.name.clone())
    }

    /// Returns true once deletion has been requested.
    pub fn is_deletion_requested(&self) -> bool {
        self.deletion_requested_at.is_some()
    }

    /// Returns true if the finalizer token is present.
    pub fn has_finalizer(&self, token: &str) -> bool {
        self.finalizers.iter().any(|f| f == token)
    }

    /// Adds a finalizer token. Returns false if it was already present.
    pub fn add_finalizer(&mut self, token: &str) -> bool {
        if self.has_finalizer(token) {
            return false;
        }
        self.finalizers.push(token.to_string());
        true
    }

    /// Removes a finalizer token. Returns false if it was not present.
    pub fn remove_finalizer(&mut self, token: &str) -> bool {
        let before = self.finalizers.len();
        self.finalizers.retain(|f| f != token);
        self.finalizers.len() != before
    }
}
