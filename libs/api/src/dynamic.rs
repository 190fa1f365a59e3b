//! Untyped object representation used at the store boundary.

use loopstacks_id::ObjectKey;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{ApiError, ObjectMeta, Resource, ResourceKind, ResourceSpec};

/// An object of any kind with `spec` and `status` kept as raw JSON.
///
/// The store persists and watches `DynamicObject`s; controllers decode them
/// into typed [`Resource`] values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DynamicObject {
    pub kind: ResourceKind,

    pub metadata: ObjectMeta,

    #[serde(default)]
    pub spec: Value,

    #[serde(default)]
    pub status: Value,
}

impl DynamicObject {
    pub fn key(&self) -> ObjectKey {
        self.metadata.key()
    }

    /// Looks up a string field by dotted path.
    ///
    /// Supports `metadata.name`, `metadata.namespace`, and any path under
    /// `spec` or `status`. Returns `None` if the path is absent or does not
    /// resolve to a string.
    pub fn field_str(&self, path: &str) -> Option<&str> {
        let mut parts = path.split('.');
        let root = match parts.next()? {
            "metadata" => {
                let field = parts.next()?;
                if parts.next().is_some() {
                    return None;
                }
                return match field {
                    "name" => Some(self.metadata.name.as_str()),
                    "namespace" => Some(self.metadata.namespace.as_str()),
                    _ => None,
                };
            }
            "spec" => &self.spec,
            "status" => &self.status,
            _ => return None,
        };

        parts
            .try_fold(root, |value, part| value.get(part))
            .and_then(Value::as_str)
    }
}

impl DynamicObject {
    /// Decodes `spec` as kind `S`. A null spec decodes like `{}`.
    pub fn spec_as<S: ResourceSpec>(&self) -> Result<S, ApiError> {
        decode_spec(self.spec.clone())
    }

    /// Decodes `status` for kind `S`. A null status is the default status.
    pub fn status_as<S: ResourceSpec>(&self) -> Result<S::Status, ApiError> {
        decode_status::<S>(self.status.clone())
    }

    /// Replaces `status` with the encoded value, leaving everything else as
    /// stored.
    pub fn with_status<St: Serialize>(mut self, status: &St) -> Result<Self, ApiError> {
        self.status = serde_json::to_value(status)?;
        Ok(self)
    }
}

fn decode_spec<S: ResourceSpec>(spec: Value) -> Result<S, ApiError> {
    if spec.is_null() {
        Ok(serde_json::from_value(Value::Object(Default::default()))?)
    } else {
        Ok(serde_json::from_value(spec)?)
    }
}

fn decode_status<S: ResourceSpec>(status: Value) -> Result<S::Status, ApiError> {
    if status.is_null() {
        Ok(S::Status::default())
    } else {
        Ok(serde_json::from_value(status)?)
    }
}

impl<S: ResourceSpec> Resource<S> {
    /// Converts into the untyped store representation.
    pub fn to_dynamic(&self) -> Result<DynamicObject, ApiError> {
        Ok(DynamicObject {
            kind: S::KIND,
            metadata: self.metadata.clone(),
            spec: serde_json::to_value(&self.spec)?,
            status: serde_json::to_value(&self.status)?,
        })
    }

    /// Decodes an untyped object. A null status decodes as the default status.
    pub fn from_dynamic(obj: DynamicObject) -> Result<Self, ApiError> {
        if obj.kind != S::KIND {
            return Err(ApiError::KindMismatch {
                expected: S::KIND,
                actual: obj.kind,
            });
        }

        Ok(Self {
            spec: decode_spec(obj.spec)?,
            status: decode_status::<S>(obj.status)?,
            metadata: obj.metadata,
        })
    }
}
