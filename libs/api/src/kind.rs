//! Resource kinds of the `loopstacks.io` API group.

use serde::{Deserialize, Serialize};

use crate::ApiError;

/// API group of every managed kind.
pub const API_GROUP: &str = "loopstacks.io";

/// API version of every managed kind.
pub const API_VERSION: &str = "v1";

/// Kind of a managed resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ResourceKind {
    Agent,
    Realm,
    AgentInstance,
    WorkflowDefinition,
}

impl ResourceKind {
    /// All managed kinds.
    pub const ALL: [ResourceKind; 4] = [
        ResourceKind::Agent,
        ResourceKind::Realm,
        ResourceKind::AgentInstance,
        ResourceKind::WorkflowDefinition,
    ];

    /// Returns the kind name, e.g. `AgentInstance`.
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Agent => "Agent",
            ResourceKind::Realm => "Realm",
            ResourceKind::AgentInstance => "AgentInstance",
            ResourceKind::WorkflowDefinition => "WorkflowDefinition",
        }
    }

    /// Returns the lowercase plural resource name, e.g. `agentinstances`.
    pub fn plural(&self) -> &'static str {
        match self {
            ResourceKind::Agent => "agents",
            ResourceKind::Realm => "realms",
            ResourceKind::AgentInstance => "agentinstances",
            ResourceKind::WorkflowDefinition => "workflowdefinitions",
        }
    }

    /// Returns the finalizer token the operator owns for this kind.
    pub fn finalizer(&self) -> &'static str {
        match self {
            ResourceKind::Agent => "loopstacks.io/agent-finalizer",
            ResourceKind::Realm => "loopstacks.io/realm-finalizer",
            ResourceKind::AgentInstance => "loopstacks.io/agentinstance-finalizer",
            ResourceKind::WorkflowDefinition => "loopstacks.io/workflowdefinition-finalizer",
        }
    }

    /// Returns `loopstacks.io/v1`.
    pub fn api_version(&self) -> String {
        format!("{API_GROUP}/{API_VERSION}")
    }
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ResourceKind {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ResourceKind::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| ApiError::UnknownKind(s.to_string()))
    }
}
