//! # loopstacks-api
//!
//! Resource definitions for the `loopstacks.io/v1` API group.
//!
//! ## Design Principles
//!
//! - Every managed object has the same three parts: `metadata`, `spec`, `status`
//! - `spec` is owned by users; `status` is owned by the operator
//! - Objects cross the store boundary as [`DynamicObject`] and are decoded
//!   into typed [`Resource`] values at the edge
//!
//! ## Kinds
//!
//! - `Agent` - an AI agent definition (runtime image, language, I/O schemas)
//! - `Realm` - an isolated execution environment
//! - `AgentInstance` - a running deployment of an Agent inside a Realm
//! - `WorkflowDefinition` - a phased workflow

mod dynamic;
mod error;
mod kind;
mod meta;
mod resources;
mod status;
mod watch;

pub use dynamic::DynamicObject;
pub use error::ApiError;
pub use kind::{ResourceKind, API_GROUP, API_VERSION};
pub use meta::ObjectMeta;
pub use resources::*;
pub use status::{Phase, ResourceStatus, StatusCore};
pub use watch::{WatchEvent, WatchEventType};
