//! Persists reconciler decisions through the store.
//!
//! Writes go out on the object exactly as it was read: only the status or
//! the finalizer list changes, so spec fields this build does not know
//! survive a pass untouched.

use std::marker::PhantomData;
use std::sync::Arc;

use chrono::Utc;
use loopstacks_api::{DynamicObject, ResourceSpec, ResourceStatus};
use loopstacks_store::ObjectStore;
use tracing::debug;

use crate::ReconcileError;

/// Writes status and finalizer changes back to the store.
///
/// Conflicts surface as [`ReconcileError::Conflict`]; nothing is merged or
/// retried here.
pub struct StatusProjector<S: ResourceSpec> {
    store: Arc<dyn ObjectStore>,
    _spec: PhantomData<fn() -> S>,
}

impl<S: ResourceSpec> StatusProjector<S> {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self {
            store,
            _spec: PhantomData,
        }
    }

    /// Writes `status` and stamps `lastUpdated`.
    ///
    /// Skips the write when `status` reports the same observation as the
    /// stored one, and returns `obj` unchanged in that case.
    pub async fn persist_status(
        &self,
        obj: DynamicObject,
        status: S::Status,
    ) -> Result<DynamicObject, ReconcileError> {
        if obj.status_as::<S>()?.same_observation(&status) {
            debug!("status unchanged, skipping write");
            return Ok(obj);
        }

        let mut status = status;
        status.core_mut().last_updated = Some(Utc::now());

        let written = self.store.update_status(obj.with_status(&status)?).await?;
        debug!(
            phase = ?status.core().phase,
            resource_version = %written.metadata.resource_version,
            "status persisted"
        );
        Ok(written)
    }

    /// Writes the finalizer list of `obj`; spec and labels go back as read.
    pub async fn persist_finalizers(&self, obj: DynamicObject) -> Result<DynamicObject, ReconcileError> {
        let written = self.store.update(obj).await?;
        debug!(
            finalizers = ?written.metadata.finalizers,
            resource_version = %written.metadata.resource_version,
            "finalizers persisted"
        );
        Ok(written)
    }
}
