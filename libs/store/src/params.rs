//! List parameters and field selectors.

use loopstacks_api::DynamicObject;
use loopstacks_id::Namespace;

use crate::StoreError;

/// An equality selector on a string field, e.g. `spec.agent=summarizer`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldSelector {
    pub path: String,
    pub value: String,
}

impl FieldSelector {
    pub fn equals(path: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            value: value.into(),
        }
    }

    /// Parses `path=value`.
    pub fn parse(s: &str) -> Result<Self, StoreError> {
        match s.split_once('=') {
            Some((path, value)) if !path.is_empty() => Ok(Self::equals(path, value)),
            _ => Err(StoreError::Invalid(format!("invalid field selector '{s}'"))),
        }
    }

    pub fn matches(&self, obj: &DynamicObject) -> bool {
        obj.field_str(&self.path) == Some(self.value.as_str())
    }
}

impl std::fmt::Display for FieldSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}={}", self.path, self.value)
    }
}

/// Filters for [`crate::ObjectStore::list`]. The default lists everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListParams {
    pub namespace: Option<Namespace>,
    pub field_selector: Option<FieldSelector>,
}

impl ListParams {
    /// Lists across all namespaces.
    pub fn all() -> Self {
        Self::default()
    }

    /// Lists within one namespace.
    pub fn namespaced(namespace: Namespace) -> Self {
        Self {
            namespace: Some(namespace),
            field_selector: None,
        }
    }

    pub fn fields(mut self, selector: FieldSelector) -> Self {
        self.field_selector = Some(selector);
        self
    }

    pub fn matches(&self, obj: &DynamicObject) -> bool {
        if let Some(ns) = &self.namespace {
            if obj.metadata.namespace != *ns {
                return false;
            }
        }
        self.field_selector
            .as_ref()
            .map_or(true, |selector| selector.matches(obj))
    }
}
