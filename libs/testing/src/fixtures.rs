//! Object builders.
//!
//! Fixtures panic on invalid names; they are only used with literals.

use loopstacks_api::{
    Agent, AgentInstance, AgentInstanceSpec, AgentSpec, Realm, RealmSpec, WorkflowDefinition,
    WorkflowDefinitionSpec,
};
use serde_json::json;

pub const NAMESPACE: &str = "default";

/// An Agent spec that passes every validation rule.
pub fn valid_agent_spec() -> AgentSpec {
    let mut spec = AgentSpec::default();
    spec.runtime.image = "ghcr.io/loopstacks/summarizer:1.0".to_string();
    spec.runtime.language = "python".to_string();
    spec.capabilities = vec!["summarize".to_string()];
    spec.schema.input = Some(json!({ "type": "object", "properties": { "text": { "type": "string" } } }));
    spec.schema.output = Some(json!({ "type": "string" }));
    spec
}

/// An Agent spec violating every rule at once.
pub fn empty_agent_spec() -> AgentSpec {
    AgentSpec::default()
}

pub fn agent(name: &str, spec: AgentSpec) -> Agent {
    Agent::new(NAMESPACE, name, spec).expect("fixture agent name")
}

pub fn realm(name: &str) -> Realm {
    let mut spec = RealmSpec::default();
    spec.description = format!("{name} realm");
    Realm::new(NAMESPACE, name, spec).expect("fixture realm name")
}

pub fn agent_instance(name: &str, agent: &str, realm: &str) -> AgentInstance {
    agent_instance_in(NAMESPACE, name, agent, realm)
}

pub fn agent_instance_in(namespace: &str, name: &str, agent: &str, realm: &str) -> AgentInstance {
    let spec = AgentInstanceSpec {
        agent: agent.to_string(),
        realm: realm.to_string(),
        replicas: 1,
        ..Default::default()
    };
    AgentInstance::new(namespace, name, spec).expect("fixture instance name")
}

pub fn workflow(name: &str) -> WorkflowDefinition {
    let mut spec = WorkflowDefinitionSpec::default();
    spec.description = format!("{name} workflow");
    WorkflowDefinition::new(NAMESPACE, name, spec).expect("fixture workflow name")
}
