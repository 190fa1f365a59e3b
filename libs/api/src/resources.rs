//! Typed resources for the four managed kinds.
//!
//! Spec fields mirror the `loopstacks.io/v1` CRDs. Every field is optional on
//! the wire so partially written objects still decode; validation is the
//! operator's job, not the decoder's.

use std::collections::BTreeMap;
use std::fmt::Debug;

use loopstacks_id::{Namespace, ObjectKey, ResourceName};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::{ApiError, ObjectMeta, ResourceKind, ResourceStatus, StatusCore};

// =============================================================================
// Generic Resource
// =============================================================================

/// The desired-state half of a kind; ties a spec type to its kind and status.
pub trait ResourceSpec:
    Clone + Debug + PartialEq + Serialize + DeserializeOwned + Send + Sync + 'static
{
    const KIND: ResourceKind;

    type Status: ResourceStatus;
}

/// A typed managed object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct Resource<S: ResourceSpec> {
    pub metadata: ObjectMeta,

    pub spec: S,

    #[serde(default)]
    pub status: S::Status,
}

impl<S: ResourceSpec> Resource<S> {
    /// Builds a not-yet-stored object, validating namespace and name.
    pub fn new(namespace: &str, name: &str, spec: S) -> Result<Self, ApiError> {
        Ok(Self {
            metadata: ObjectMeta::new(Namespace::parse(namespace)?, ResourceName::parse(name)?),
            spec,
            status: S::Status::default(),
        })
    }

    pub fn kind(&self) -> ResourceKind {
        S::KIND
    }

    pub fn key(&self) -> ObjectKey {
        self.metadata.key()
    }
}

// =============================================================================
// Shared Spec Fragments
// =============================================================================

/// Input/output schema documents.
///
/// Only presence is checked by the operator; the documents themselves are
/// opaque JSON.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IoSchema {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<serde_json::Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<serde_json::Value>,
}

impl IoSchema {
    pub fn has_input(&self) -> bool {
        is_present(self.input.as_ref())
    }

    pub fn has_output(&self) -> bool {
        is_present(self.output.as_ref())
    }
}

fn is_present(doc: Option<&serde_json::Value>) -> bool {
    matches!(doc, Some(v) if !v.is_null())
}

// =============================================================================
// Agent
// =============================================================================

/// An AI agent definition.
pub type Agent = Resource<AgentSpec>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentSpec {
    #[serde(default)]
    pub runtime: AgentRuntime,

    #[serde(default)]
    pub capabilities: Vec<String>,

    #[serde(default)]
    pub schema: IoSchema,

    #[serde(default)]
    pub metadata: AgentMetadata,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentRuntime {
    #[serde(default)]
    pub image: String,

    #[serde(default)]
    pub language: String,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub resources: BTreeMap<String, String>,
}

/// Descriptive metadata; not interpreted by the operator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentMetadata {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub version: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub author: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AgentStatus {
    #[serde(flatten)]
    pub core: StatusCore,

    /// AgentInstances referencing this agent at the last pass.
    pub instances: u32,
}

impl ResourceStatus for AgentStatus {
    fn core(&self) -> &StatusCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut StatusCore {
        &mut self.core
    }

    fn set_dependents(&mut self, count: u32) {
        self.instances = count;
    }
}

impl ResourceSpec for AgentSpec {
    const KIND: ResourceKind = ResourceKind::Agent;
    type Status = AgentStatus;
}

// =============================================================================
// Realm
// =============================================================================

/// An isolated environment for agent execution.
pub type Realm = Resource<RealmSpec>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RealmSpec {
    pub description: String,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub isolation: String,

    pub resources: RealmResources,

    pub networking: RealmNetworking,

    pub governance: RealmGovernance,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RealmResources {
    pub max_agent_instances: u32,
    pub max_concurrent_loops: u32,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub storage_class: String,
    pub redis_config: RedisConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RedisConfig {
    pub replicas: u32,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub memory: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RealmNetworking {
    pub allow_cross_realm_communication: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub federation_endpoints: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RealmGovernance {
    pub agent_approval_required: bool,
    pub loop_auditing_enabled: bool,
    pub retention_policy: RetentionPolicy,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RetentionPolicy {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub loop_history: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub agent_logs: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RealmStatus {
    #[serde(flatten)]
    pub core: StatusCore,

    /// AgentInstances placed in this realm at the last pass.
    pub agent_instances: u32,

    pub active_loops: u32,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub redis_status: String,
}

impl ResourceStatus for RealmStatus {
    fn core(&self) -> &StatusCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut StatusCore {
        &mut self.core
    }

    fn set_dependents(&mut self, count: u32) {
        self.agent_instances = count;
    }
}

impl ResourceSpec for RealmSpec {
    const KIND: ResourceKind = ResourceKind::Realm;
    type Status = RealmStatus;
}

// =============================================================================
// AgentInstance
// =============================================================================

/// A running deployment of an Agent in a Realm.
pub type AgentInstance = Resource<AgentInstanceSpec>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AgentInstanceSpec {
    /// Name of the referenced Agent in the same namespace.
    pub agent: String,

    /// Name of the hosting Realm in the same namespace.
    pub realm: String,

    pub replicas: u32,

    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub resources: BTreeMap<String, String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub config: Option<serde_json::Value>,

    pub autoscaling: Autoscaling,

    pub placement: Placement,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Autoscaling {
    pub enabled: bool,
    pub min_replicas: u32,
    pub max_replicas: u32,
    #[serde(rename = "targetCPUUtilization")]
    pub target_cpu_utilization: u32,
    pub target_memory_utilization: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Placement {
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub node_selector: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AgentInstanceStatus {
    #[serde(flatten)]
    pub core: StatusCore,

    pub ready_replicas: u32,

    pub current_replicas: u32,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Condition {
    #[serde(rename = "type")]
    pub condition_type: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_transition_time: Option<chrono::DateTime<chrono::Utc>>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub reason: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub message: String,
}

impl ResourceStatus for AgentInstanceStatus {
    fn core(&self) -> &StatusCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut StatusCore {
        &mut self.core
    }
}

impl ResourceSpec for AgentInstanceSpec {
    const KIND: ResourceKind = ResourceKind::AgentInstance;
    type Status = AgentInstanceStatus;
}

// =============================================================================
// WorkflowDefinition
// =============================================================================

/// A phased workflow definition.
pub type WorkflowDefinition = Resource<WorkflowDefinitionSpec>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WorkflowDefinitionSpec {
    pub description: String,
    pub schema: IoSchema,
    pub phases: WorkflowPhases,
    pub capabilities: Vec<String>,
    pub metadata: WorkflowMetadata,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WorkflowPhases {
    pub intake: IntakePhase,
    pub bidding: BiddingPhase,
    pub execution: ExecutionPhase,
    pub output: OutputPhase,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct IntakePhase {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub timeout: String,
    pub validation: IntakeValidation,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct IntakeValidation {
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BiddingPhase {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub timeout: String,
    pub min_bids: u32,
    pub max_bids: u32,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub selection_strategy: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExecutionPhase {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub timeout: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub parallelism: String,
    pub retry_policy: RetryPolicy,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RetryPolicy {
    pub max_retries: u32,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub backoff_strategy: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OutputPhase {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub timeout: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub aggregation_strategy: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WorkflowMetadata {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub version: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub author: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub category: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WorkflowDefinitionStatus {
    #[serde(flatten)]
    pub core: StatusCore,

    pub executions: ExecutionStats,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExecutionStats {
    pub total: u32,
    pub successful: u32,
    pub failed: u32,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub average_duration: String,
}

impl ResourceStatus for WorkflowDefinitionStatus {
    fn core(&self) -> &StatusCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut StatusCore {
        &mut self.core
    }
}

impl ResourceSpec for WorkflowDefinitionSpec {
    const KIND: ResourceKind = ResourceKind::WorkflowDefinition;
    type Status = WorkflowDefinitionStatus;
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Phase;
    use rstest::rstest;

    #[test]
    fn test_agent_spec_from_crd_json() {
        let spec: AgentSpec = serde_json::from_value(serde_json::json!({
            "runtime": { "image": "ghcr.io/loopstacks/summarizer:1.0", "language": "python" },
            "capabilities": ["summarize"],
            "schema": {
                "input": { "type": "object" },
                "output": { "type": "string" }
            }
        }))
        .unwrap();

        assert_eq!(spec.runtime.language, "python");
        assert!(spec.schema.has_input());
        assert!(spec.schema.has_output());
    }

    #[rstest]
    #[case(None, false)]
    #[case(Some(serde_json::Value::Null), false)]
    #[case(Some(serde_json::json!({})), true)]
    #[case(Some(serde_json::json!({"type": "object"})), true)]
    fn test_schema_presence(#[case] input: Option<serde_json::Value>, #[case] present: bool) {
        let schema = IoSchema {
            input,
            output: None,
        };
        assert_eq!(schema.has_input(), present);
    }

    #[test]
    fn test_agent_status_flattened_shape() {
        let mut status = AgentStatus::default();
        status.core.set(Phase::Ready, "Agent is ready for deployment");
        status.instances = 2;

        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json["phase"], "Ready");
        assert_eq!(json["message"], "Agent is ready for deployment");
        assert_eq!(json["instances"], 2);

        let back: AgentStatus = serde_json::from_value(json).unwrap();
        assert_eq!(back, status);
    }

    #[test]
    fn test_realm_status_counter() {
        let mut status = RealmStatus::default();
        status.set_dependents(4);
        assert_eq!(status.agent_instances, 4);
        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json["agentInstances"], 4);
    }

    #[test]
    fn test_kinds_without_counters_ignore_dependents() {
        let mut status = WorkflowDefinitionStatus::default();
        status.set_dependents(9);
        assert_eq!(status, WorkflowDefinitionStatus::default());
    }

    #[test]
    fn test_same_observation_ignores_timestamp() {
        let mut a = AgentStatus::default();
        a.core.set(Phase::Ready, "ok");
        let mut b = a.clone();
        b.core.last_updated = Some(chrono::Utc::now());
        assert!(a.same_observation(&b));

        b.instances = 1;
        assert!(!a.same_observation(&b));
    }

    #[test]
    fn test_instance_autoscaling_field_names() {
        let spec: AgentInstanceSpec = serde_json::from_value(serde_json::json!({
            "agent": "summarizer",
            "realm": "research",
            "autoscaling": { "enabled": true, "targetCPUUtilization": 70 }
        }))
        .unwrap();
        assert_eq!(spec.autoscaling.target_cpu_utilization, 70);
        assert_eq!(spec.agent, "summarizer");
    }

    #[test]
    fn test_resource_new_rejects_bad_name() {
        let result = Agent::new("default", "Not_Valid", AgentSpec::default());
        assert!(matches!(result.unwrap_err(), ApiError::InvalidName(_)));
    }
}
