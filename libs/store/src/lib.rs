//! # loopstacks-store
//!
//! The object store the operator reads from and writes to.
//!
//! The operator never owns its storage: it consumes the [`ObjectStore`]
//! capability, which any backend can implement. This crate ships the
//! capability, a typed [`Api`] facade over it, and [`MemoryStore`], an
//! in-process backend with API-server semantics:
//!
//! - every write is conflict-checked against `metadata.resourceVersion`
//! - spec/metadata writes and status writes are separate calls
//! - deletion sets a marker; removal waits until all finalizers are cleared
//! - every change is published on a broadcast watch stream

mod api;
mod error;
mod memory;
mod params;

pub use api::Api;
pub use error::{StoreError, StoreResult};
pub use memory::{MemoryStore, DEFAULT_WATCH_CAPACITY};
pub use params::{FieldSelector, ListParams};

use async_trait::async_trait;
use loopstacks_api::{DynamicObject, ResourceKind, WatchEvent};
use loopstacks_id::ObjectKey;
use tokio::sync::broadcast;

/// Capability interface over a namespaced, versioned object store.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Fetches one object. `Ok(None)` if it does not exist.
    async fn get(&self, kind: ResourceKind, key: &ObjectKey) -> StoreResult<Option<DynamicObject>>;

    /// Lists objects of a kind matching the parameters, ordered by key.
    async fn list(&self, kind: ResourceKind, params: &ListParams) -> StoreResult<Vec<DynamicObject>>;

    /// Creates an object. Store-owned metadata is assigned here.
    async fn create(&self, obj: DynamicObject) -> StoreResult<DynamicObject>;

    /// Replaces metadata and spec. `status` in the argument is ignored.
    ///
    /// Fails with [`StoreError::Conflict`] if the object's resource version
    /// is not the stored one.
    async fn update(&self, obj: DynamicObject) -> StoreResult<DynamicObject>;

    /// Replaces status only. Conflict-checked like [`ObjectStore::update`].
    async fn update_status(&self, obj: DynamicObject) -> StoreResult<DynamicObject>;

    /// Marks the object for deletion.
    ///
    /// Returns the marked object, or `None` if it had no finalizers and was
    /// removed immediately.
    async fn request_deletion(
        &self,
        kind: ResourceKind,
        key: &ObjectKey,
    ) -> StoreResult<Option<DynamicObject>>;

    /// Subscribes to change notifications for all kinds.
    fn watch(&self) -> broadcast::Receiver<WatchEvent>;
}
