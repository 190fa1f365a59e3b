//! Seed manifests: objects loaded into the store at startup.
//!
//! A manifest is a JSON array of documents:
//!
//! ```json
//! [
//!   {
//!     "kind": "Agent",
//!     "metadata": { "namespace": "default", "name": "summarizer" },
//!     "spec": { "runtime": { "image": "ghcr.io/loopstacks/summarizer:1.0", "language": "python" } }
//!   }
//! ]
//! ```
//!
//! `namespace` defaults to `default`. Store-owned metadata and status are
//! never taken from the manifest.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use loopstacks_api::{
    Agent, AgentInstance, ApiError, DynamicObject, ObjectMeta, Realm, ResourceKind,
    WorkflowDefinition,
};
use loopstacks_id::{Namespace, ResourceName};
use loopstacks_store::{ObjectStore, StoreError};
use serde::Deserialize;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum SeedError {
    #[error("failed to read seed file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid seed manifest: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid seed object #{index}: {source}")]
    Object {
        index: usize,
        #[source]
        source: ApiError,
    },

    #[error("failed to store seed object: {0}")]
    Store(#[from] StoreError),
}

#[derive(Debug, Deserialize)]
struct SeedDocument {
    kind: ResourceKind,
    metadata: SeedMetadata,
    #[serde(default)]
    spec: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct SeedMetadata {
    #[serde(default = "default_namespace")]
    namespace: String,
    name: String,
    #[serde(default)]
    labels: BTreeMap<String, String>,
}

fn default_namespace() -> String {
    "default".to_string()
}

/// Parses a manifest, checking every spec decodes as its kind.
pub fn parse_manifest(json: &str) -> Result<Vec<DynamicObject>, SeedError> {
    let documents: Vec<SeedDocument> = serde_json::from_str(json)?;
    documents
        .into_iter()
        .enumerate()
        .map(|(index, doc)| to_object(doc).map_err(|source| SeedError::Object { index, source }))
        .collect()
}

fn to_object(doc: SeedDocument) -> Result<DynamicObject, ApiError> {
    let mut metadata = ObjectMeta::new(
        Namespace::parse(&doc.metadata.namespace)?,
        ResourceName::parse(&doc.metadata.name)?,
    );
    metadata.labels = doc.metadata.labels;

    let obj = DynamicObject {
        kind: doc.kind,
        metadata,
        spec: doc.spec,
        status: serde_json::Value::Null,
    };

    // Round-trip through the typed kind: malformed specs fail here, and the
    // stored spec carries every field with its default.
    match obj.kind {
        ResourceKind::Agent => Agent::from_dynamic(obj)?.to_dynamic(),
        ResourceKind::Realm => Realm::from_dynamic(obj)?.to_dynamic(),
        ResourceKind::AgentInstance => AgentInstance::from_dynamic(obj)?.to_dynamic(),
        ResourceKind::WorkflowDefinition => WorkflowDefinition::from_dynamic(obj)?.to_dynamic(),
    }
}

/// Creates each object, skipping ones that already exist. Returns how many
/// were created.
pub async fn apply(store: &dyn ObjectStore, objects: Vec<DynamicObject>) -> Result<usize, SeedError> {
    let mut created = 0;
    for obj in objects {
        let (kind, key) = (obj.kind, obj.key());
        match store.create(obj).await {
            Ok(_) => {
                info!(kind = %kind, key = %key, "Seeded object");
                created += 1;
            }
            Err(StoreError::AlreadyExists { .. }) => {
                warn!(kind = %kind, key = %key, "Seed object already exists, skipping");
            }
            Err(e) => return Err(e.into()),
        }
    }
    Ok(created)
}

/// Reads, parses and applies a manifest file.
pub async fn load_file(store: &dyn ObjectStore, path: &Path) -> Result<usize, SeedError> {
    let json = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| SeedError::Read {
            path: path.to_path_buf(),
            source,
        })?;
    apply(store, parse_manifest(&json)?).await
}
