//! Error types for name and identifier parsing.

use thiserror::Error;

/// Errors that can occur when parsing or validating identifiers.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IdError {
    /// The input string is empty.
    #[error("identifier cannot be empty")]
    Empty,

    /// The name exceeds the label length limit.
    #[error("name '{value}' is longer than {max} characters")]
    TooLong { value: String, max: usize },

    /// The name contains a character outside `[a-z0-9-]`.
    #[error("name '{value}' contains invalid character '{found}'")]
    InvalidCharacter { value: String, found: char },

    /// The name starts or ends with `-`.
    #[error("name '{value}' must start and end with an alphanumeric character")]
    InvalidBoundary { value: String },

    /// The uid is missing the required prefix.
    #[error("invalid uid prefix: expected '{expected}', got '{actual}'")]
    InvalidPrefix {
        expected: &'static str,
        actual: String,
    },

    /// The uid is missing the underscore separator.
    #[error("uid missing underscore separator")]
    MissingSeparator,

    /// The ULID portion of a uid is invalid.
    #[error("invalid ULID: {0}")]
    InvalidUlid(String),

    /// An object key is not in `namespace/name` form.
    #[error("invalid object key '{0}': expected 'namespace/name'")]
    InvalidKey(String),

    /// A numeric version could not be parsed.
    #[error("invalid version '{0}'")]
    InvalidVersion(String),
}

impl IdError {
    /// Returns true if this error indicates the input was empty.
    pub fn is_empty(&self) -> bool {
        matches!(self, IdError::Empty)
    }

    /// Returns true if this error comes from name syntax rules.
    pub fn is_name_error(&self) -> bool {
        matches!(
            self,
            IdError::TooLong { .. } | IdError::InvalidCharacter { .. } | IdError::InvalidBoundary { .. }
        )
    }
}
