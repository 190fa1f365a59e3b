//! Typed identifiers for managed objects.

use crate::{define_id, define_name, IdError};

/// Maximum length of a DNS-1123 label.
pub const MAX_LABEL_LEN: usize = 63;

/// Validates a DNS-1123 label.
pub fn validate_label(s: &str) -> Result<(), IdError> {
    if s.is_empty() {
        return Err(IdError::Empty);
    }

    if s.len() > MAX_LABEL_LEN {
        return Err(IdError::TooLong {
            value: s.to_string(),
            max: MAX_LABEL_LEN,
        });
    }

    if let Some(found) = s
        .chars()
        .find(|c| !(c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '-'))
    {
        return Err(IdError::InvalidCharacter {
            value: s.to_string(),
            found,
        });
    }

    if s.starts_with('-') || s.ends_with('-') {
        return Err(IdError::InvalidBoundary {
            value: s.to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// Names
// =============================================================================

define_name!(Namespace, "namespace");
define_name!(ResourceName, "resource name");

/// Identifies one object within a kind: `(namespace, name)`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
pub struct ObjectKey {
    pub namespace: Namespace,
    pub name: ResourceName,
}

impl ObjectKey {
    /// Creates a key from already validated parts.
    #[must_use]
    pub fn new(namespace: Namespace, name: ResourceName) -> Self {
        Self { namespace, name }
    }

    /// Parses and validates both parts.
    pub fn from_parts(namespace: &str, name: &str) -> Result<Self, IdError> {
        Ok(Self {
            namespace: Namespace::parse(namespace)?,
            name: ResourceName::parse(name)?,
        })
    }
}

impl std::fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

impl std::str::FromStr for ObjectKey {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let Some((namespace, name)) = s.split_once('/') else {
            return Err(IdError::InvalidKey(s.to_string()));
        };
        Self::from_parts(namespace, name)
    }
}

// =============================================================================
// Uids
// =============================================================================

define_id!(ObjectUid, "obj");

// =============================================================================
// Versions
// =============================================================================

/// Optimistic-concurrency token assigned by the store on every write.
///
/// Callers treat it as opaque and only compare it for equality; the
/// in-memory store happens to allocate it from a monotonic counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct ResourceVersion(u64);

impl ResourceVersion {
    /// Creates a version from a raw counter value.
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Returns the underlying counter value.
    #[must_use]
    pub const fn value(&self) -> u64 {
        self.0
    }

    /// Returns true if no version has been assigned yet.
    #[must_use]
    pub const fn is_unset(&self) -> bool {
        self.0 == 0
    }
}

impl std::fmt::Display for ResourceVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for ResourceVersion {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<u64>()
            .map(Self)
            .map_err(|_| IdError::InvalidVersion(s.to_string()))
    }
}

// Serialized as a string, like Kubernetes resourceVersion.
impl serde::Serialize for ResourceVersion {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> serde::Deserialize<'de> for ResourceVersion {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Desired-state generation of one object.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, serde::Serialize, serde::Deserialize,
)]
#[serde(transparent)]
pub struct Generation(u64);

impl Generation {
    /// The generation of a freshly created object.
    pub const FIRST: Self = Self(1);

    /// Creates a generation from a raw value.
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Returns the underlying value.
    #[must_use]
    pub const fn value(&self) -> u64 {
        self.0
    }

    /// Returns the next generation.
    #[must_use]
    pub const fn next(&self) -> Self {
        Self(self.0 + 1)
    }
}

impl std::fmt::Display for Generation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// =============================================================================
// Tests
// =============================================================================
