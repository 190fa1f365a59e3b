//! A store wrapper that simulates a concurrent writer.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use loopstacks_api::{DynamicObject, ResourceKind, WatchEvent};
use loopstacks_id::ObjectKey;
use loopstacks_store::{ListParams, ObjectStore, StoreResult};
use tokio::sync::broadcast;

/// Label bumped by the simulated concurrent writer.
pub const TOUCH_LABEL: &str = "testing.loopstacks.io/touched";

/// Wraps a store. When armed, the next writes are each preceded by an
/// unrelated label update to the same object, so they fail with a
/// resource-version conflict. Also counts successful writes.
pub struct InterferingStore {
    inner: Arc<dyn ObjectStore>,
    armed: AtomicUsize,
    writes: AtomicUsize,
}

impl InterferingStore {
    pub fn new(inner: Arc<dyn ObjectStore>) -> Self {
        Self {
            inner,
            armed: AtomicUsize::new(0),
            writes: AtomicUsize::new(0),
        }
    }

    /// Interferes with the next `count` writes.
    pub fn interfere_with_next_writes(&self, count: usize) {
        self.armed.store(count, Ordering::SeqCst);
    }

    /// Successful `update` and `update_status` calls through this wrapper.
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    async fn interfere(&self, kind: ResourceKind, key: &ObjectKey) -> StoreResult<()> {
        let armed = self
            .armed
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if !armed {
            return Ok(());
        }
        if let Some(mut current) = self.inner.get(kind, key).await? {
            let touched = current.metadata.resource_version.to_string();
            current.metadata.labels.insert(TOUCH_LABEL.to_string(), touched);
            self.inner.update(current).await?;
        }
        Ok(())
    }

    fn count_write<T>(&self, result: StoreResult<T>) -> StoreResult<T> {
        if result.is_ok() {
            self.writes.fetch_add(1, Ordering::SeqCst);
        }
        result
    }
}

#[async_trait]
impl ObjectStore for InterferingStore {
    async fn get(&self, kind: ResourceKind, key: &ObjectKey) -> StoreResult<Option<DynamicObject>> {
        self.inner.get(kind, key).await
    }

    async fn list(&self, kind: ResourceKind, params: &ListParams) -> StoreResult<Vec<DynamicObject>> {
        self.inner.list(kind, params).await
    }

    async fn create(&self, obj: DynamicObject) -> StoreResult<DynamicObject> {
        self.inner.create(obj).await
    }

    async fn update(&self, obj: DynamicObject) -> StoreResult<DynamicObject> {
        self.interfere(obj.kind, &obj.key()).await?;
        let result = self.inner.update(obj).await;
        self.count_write(result)
    }

    async fn update_status(&self, obj: DynamicObject) -> StoreResult<DynamicObject> {
        self.interfere(obj.kind, &obj.key()).await?;
        let result = self.inner.update_status(obj).await;
        self.count_write(result)
    }

    async fn request_deletion(
        &self,
        kind: ResourceKind,
        key: &ObjectKey,
    ) -> StoreResult<Option<DynamicObject>> {
        self.inner.request_deletion(kind, key).await
    }

    fn watch(&self) -> broadcast::Receiver<WatchEvent> {
        self.inner.watch()
    }
}
