//! Agent controller.
//!
//! An Agent is ready once its runtime and I/O schemas are declared. Deletion
//! waits until no AgentInstance references it.

use std::sync::Arc;

use loopstacks_api::{AgentSpec, ResourceKind};
use loopstacks_reconcile::{Controller, Dependents, KindPolicy, RequeuePolicy, RuleSet};
use loopstacks_store::ObjectStore;

/// Runtime languages an agent image may declare.
pub const SUPPORTED_LANGUAGES: [&str; 3] = ["typescript", "python", "go"];

pub const READY_MESSAGE: &str = "Agent is ready for deployment";

/// AgentInstances reference their Agent through `spec.agent`.
pub const DEPENDENTS: Dependents = Dependents::new(ResourceKind::AgentInstance, "spec.agent");

fn runtime_image(spec: &AgentSpec) -> Result<(), String> {
    if spec.runtime.image.is_empty() {
        return Err("runtime image is required".to_string());
    }
    Ok(())
}

fn runtime_language(spec: &AgentSpec) -> Result<(), String> {
    let language = spec.runtime.language.as_str();
    if !SUPPORTED_LANGUAGES.contains(&language) {
        return Err(format!("unsupported runtime language: {language}"));
    }
    Ok(())
}

fn input_schema(spec: &AgentSpec) -> Result<(), String> {
    if !spec.schema.has_input() {
        return Err("input schema is required".to_string());
    }
    Ok(())
}

fn output_schema(spec: &AgentSpec) -> Result<(), String> {
    if !spec.schema.has_output() {
        return Err("output schema is required".to_string());
    }
    Ok(())
}

/// Agent validation rules, in evaluation order.
pub fn rules() -> RuleSet<AgentSpec> {
    RuleSet::empty()
        .rule("runtime-image", runtime_image)
        .rule("runtime-language", runtime_language)
        .rule("input-schema", input_schema)
        .rule("output-schema", output_schema)
}

pub fn policy() -> KindPolicy<AgentSpec> {
    KindPolicy::new(READY_MESSAGE)
        .with_rules(rules())
        .with_dependents(DEPENDENTS)
}

pub fn controller(store: Arc<dyn ObjectStore>, requeue: RequeuePolicy) -> Controller<AgentSpec> {
    Controller::new(store, policy(), requeue)
}
