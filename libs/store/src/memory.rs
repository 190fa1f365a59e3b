//! In-process store backend.

use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use loopstacks_api::{DynamicObject, ResourceKind, WatchEvent, WatchEventType};
use loopstacks_id::{Generation, ObjectKey, ObjectUid, ResourceVersion};
use tokio::sync::{broadcast, RwLock};
use tracing::debug;

use crate::{ListParams, ObjectStore, StoreError, StoreResult};

/// Default buffer size of the watch channel.
pub const DEFAULT_WATCH_CAPACITY: usize = 1024;

#[derive(Default)]
struct State {
    objects: BTreeMap<(ResourceKind, ObjectKey), DynamicObject>,
    last_version: u64,
}

impl State {
    fn next_version(&mut self) -> ResourceVersion {
        self.last_version += 1;
        ResourceVersion::new(self.last_version)
    }

    fn stored(&self, kind: ResourceKind, key: &ObjectKey) -> StoreResult<DynamicObject> {
        self.objects
            .get(&(kind, key.clone()))
            .cloned()
            .ok_or_else(|| StoreError::NotFound {
                kind,
                key: key.clone(),
            })
    }
}

/// Store backend holding every object in memory.
///
/// Behaves like a minimal API server: store-wide monotonically increasing
/// resource versions, conflict-checked writes, finalizer-gated removal, and a
/// broadcast watch stream. Watch events are sent while the write lock is
/// held, so subscribers see them in commit order.
pub struct MemoryStore {
    state: RwLock<State>,
    events: broadcast::Sender<WatchEvent>,
    unavailable: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_watch_capacity(DEFAULT_WATCH_CAPACITY)
    }

    pub fn with_watch_capacity(capacity: usize) -> Self {
        let (events, _) = broadcast::channel(capacity);
        Self {
            state: RwLock::new(State::default()),
            events,
            unavailable: AtomicBool::new(false),
        }
    }

    /// Makes every subsequent call fail with [`StoreError::Unavailable`].
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Number of stored objects across all kinds.
    pub async fn len(&self) -> usize {
        self.state.read().await.objects.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    fn check_available(&self) -> StoreResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable(
                "memory store marked unavailable".to_string(),
            ));
        }
        Ok(())
    }

    fn emit(&self, event_type: WatchEventType, obj: &DynamicObject) {
        // No subscribers is not an error.
        let _ = self.events.send(WatchEvent::new(event_type, obj.clone()));
    }

    /// Stores `next` or, if it is marked for deletion with no finalizers
    /// left, removes it.
    fn commit(&self, state: &mut State, next: DynamicObject, event_type: WatchEventType) {
        let id = (next.kind, next.key());
        if next.metadata.is_deletion_requested() && next.metadata.finalizers.is_empty() {
            state.objects.remove(&id);
            debug!(kind = %next.kind, key = %id.1, "object removed");
            self.emit(WatchEventType::Deleted, &next);
        } else {
            state.objects.insert(id, next.clone());
            self.emit(event_type, &next);
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn check_version(stored: &DynamicObject, incoming: &DynamicObject) -> StoreResult<()> {
    if stored.metadata.resource_version != incoming.metadata.resource_version {
        return Err(StoreError::Conflict {
            kind: stored.kind,
            key: stored.key(),
            expected: incoming.metadata.resource_version,
            actual: stored.metadata.resource_version,
        });
    }
    Ok(())
}

fn dedupe(finalizers: &mut Vec<String>) {
    let mut seen = HashSet::new();
    finalizers.retain(|f| seen.insert(f.clone()));
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn get(&self, kind: ResourceKind, key: &ObjectKey) -> StoreResult<Option<DynamicObject>> {
        self.check_available()?;
        let state = self.state.read().await;
        Ok(state.objects.get(&(kind, key.clone())).cloned())
    }

    async fn list(&self, kind: ResourceKind, params: &ListParams) -> StoreResult<Vec<DynamicObject>> {
        self.check_available()?;
        let state = self.state.read().await;
        Ok(state
            .objects
            .iter()
            .filter(|((k, _), obj)| *k == kind && params.matches(obj))
            .map(|(_, obj)| obj.clone())
            .collect())
    }

    async fn create(&self, mut obj: DynamicObject) -> StoreResult<DynamicObject> {
        self.check_available()?;
        let mut state = self.state.write().await;
        let id = (obj.kind, obj.key());
        if state.objects.contains_key(&id) {
            return Err(StoreError::AlreadyExists {
                kind: id.0,
                key: id.1,
            });
        }

        obj.metadata.uid = Some(ObjectUid::new());
        obj.metadata.resource_version = state.next_version();
        obj.metadata.generation = Generation::FIRST;
        obj.metadata.created_at = Some(Utc::now());
        obj.metadata.deletion_requested_at = None;
        dedupe(&mut obj.metadata.finalizers);

        state.objects.insert(id, obj.clone());
        self.emit(WatchEventType::Added, &obj);
        Ok(obj)
    }

    async fn update(&self, obj: DynamicObject) -> StoreResult<DynamicObject> {
        self.check_available()?;
        let mut state = self.state.write().await;
        let stored = state.stored(obj.kind, &obj.key())?;
        check_version(&stored, &obj)?;

        let mut finalizers = obj.metadata.finalizers;
        dedupe(&mut finalizers);
        if stored.metadata.is_deletion_requested() {
            if let Some(added) = finalizers.iter().find(|f| !stored.metadata.has_finalizer(f)) {
                return Err(StoreError::Invalid(format!(
                    "cannot add finalizer '{added}' to {} {}: deletion already requested",
                    stored.kind,
                    stored.key()
                )));
            }
        }

        let mut next = stored.clone();
        next.metadata.finalizers = finalizers;
        next.metadata.labels = obj.metadata.labels;
        if next.spec != obj.spec {
            next.spec = obj.spec;
            next.metadata.generation = next.metadata.generation.next();
        }

        if next == stored {
            return Ok(stored);
        }

        next.metadata.resource_version = state.next_version();
        self.commit(&mut state, next.clone(), WatchEventType::Modified);
        Ok(next)
    }

    async fn update_status(&self, obj: DynamicObject) -> StoreResult<DynamicObject> {
        self.check_available()?;
        let mut state = self.state.write().await;
        let stored = state.stored(obj.kind, &obj.key())?;
        check_version(&stored, &obj)?;

        if stored.status == obj.status {
            return Ok(stored);
        }

        let mut next = stored;
        next.status = obj.status;
        next.metadata.resource_version = state.next_version();
        self.commit(&mut state, next.clone(), WatchEventType::StatusModified);
        Ok(next)
    }

    async fn request_deletion(
        &self,
        kind: ResourceKind,
        key: &ObjectKey,
    ) -> StoreResult<Option<DynamicObject>> {
        self.check_available()?;
        let mut state = self.state.write().await;
        let stored = state.stored(kind, key)?;
        if stored.metadata.is_deletion_requested() {
            return Ok(Some(stored));
        }

        let mut next = stored;
        next.metadata.deletion_requested_at = Some(Utc::now());
        next.metadata.generation = next.metadata.generation.next();
        next.metadata.resource_version = state.next_version();
        let removed = next.metadata.finalizers.is_empty();
        self.commit(&mut state, next.clone(), WatchEventType::Modified);
        Ok((!removed).then_some(next))
    }

    fn watch(&self) -> broadcast::Receiver<WatchEvent> {
        self.events.subscribe()
    }
}
