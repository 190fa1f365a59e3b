//! # loopstacks-id
//!
//! Identity types for objects managed by the loopstacks operator.
//!
//! ## Design Principles
//!
//! - Names are user-controlled labels; uids are system-generated
//! - Every identifier has a canonical string form with strict parsing
//! - Identifiers are typed so a namespace can never be passed as a name
//!
//! ## Name Format
//!
//! Namespaces and resource names follow the DNS-1123 label rules used by
//! Kubernetes: lowercase alphanumerics and `-`, starting and ending with an
//! alphanumeric, at most 63 characters.
//!
//! ## Versions
//!
//! - [`ResourceVersion`] is the optimistic-concurrency token assigned by the
//!   store on every write.
//! - [`Generation`] counts changes to the desired state of one object.

mod error;
mod macros;
mod types;

pub use error::IdError;
pub use types::*;

/// Re-export ulid for consumers that need raw ULID operations
pub use ulid::Ulid;
