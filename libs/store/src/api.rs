//! Typed facade over an [`ObjectStore`].

use std::marker::PhantomData;
use std::sync::Arc;

use loopstacks_api::{Resource, ResourceSpec};
use loopstacks_id::ObjectKey;

use crate::{ListParams, ObjectStore, StoreResult};

/// Typed access to objects of one kind.
///
/// Decode failures surface as [`crate::StoreError::Decode`].
pub struct Api<S: ResourceSpec> {
    store: Arc<dyn ObjectStore>,
    _spec: PhantomData<fn() -> S>,
}

impl<S: ResourceSpec> Clone for Api<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            _spec: PhantomData,
        }
    }
}

impl<S: ResourceSpec> Api<S> {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self {
            store,
            _spec: PhantomData,
        }
    }

    /// The untyped store underneath.
    pub fn store(&self) -> &Arc<dyn ObjectStore> {
        &self.store
    }

    pub async fn get(&self, key: &ObjectKey) -> StoreResult<Option<Resource<S>>> {
        match self.store.get(S::KIND, key).await? {
            Some(obj) => Ok(Some(Resource::from_dynamic(obj)?)),
            None => Ok(None),
        }
    }

    pub async fn list(&self, params: &ListParams) -> StoreResult<Vec<Resource<S>>> {
        self.store
            .list(S::KIND, params)
            .await?
            .into_iter()
            .map(|obj| Resource::from_dynamic(obj).map_err(Into::into))
            .collect()
    }

    pub async fn create(&self, resource: &Resource<S>) -> StoreResult<Resource<S>> {
        let created = self.store.create(resource.to_dynamic()?).await?;
        Ok(Resource::from_dynamic(created)?)
    }

    /// Writes metadata and spec.
    pub async fn replace(&self, resource: &Resource<S>) -> StoreResult<Resource<S>> {
        let written = self.store.update(resource.to_dynamic()?).await?;
        Ok(Resource::from_dynamic(written)?)
    }

    /// Writes status only.
    pub async fn replace_status(&self, resource: &Resource<S>) -> StoreResult<Resource<S>> {
        let written = self.store.update_status(resource.to_dynamic()?).await?;
        Ok(Resource::from_dynamic(written)?)
    }

    pub async fn request_deletion(&self, key: &ObjectKey) -> StoreResult<Option<Resource<S>>> {
        match self.store.request_deletion(S::KIND, key).await? {
            Some(obj) => Ok(Some(Resource::from_dynamic(obj)?)),
            None => Ok(None),
        }
    }
}
