//! Ordered validation rules.

use loopstacks_api::{ApiError, DynamicObject, ResourceSpec};

/// A single validation rule: `Err(reason)` on violation.
pub type Rule<S> = fn(&S) -> Result<(), String>;

/// The first rule a spec violated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleViolation {
    pub rule: &'static str,
    pub reason: String,
}

/// Rule name reported when a stored spec does not decode as its kind.
pub const SPEC_DECODE_RULE: &str = "spec-decode";

impl RuleViolation {
    /// A spec that does not decode fails ahead of every named rule.
    pub fn undecodable(err: &ApiError) -> Self {
        let detail = match err {
            ApiError::Serialization(msg) => msg.clone(),
            other => other.to_string(),
        };
        Self {
            rule: SPEC_DECODE_RULE,
            reason: format!("invalid spec: {detail}"),
        }
    }
}

/// An ordered list of named rules. Evaluation stops at the first failure;
/// reasons are never accumulated.
pub struct RuleSet<S> {
    rules: Vec<(&'static str, Rule<S>)>,
}

impl<S> RuleSet<S> {
    /// A rule set that accepts every spec.
    pub fn empty() -> Self {
        Self { rules: Vec::new() }
    }

    /// Appends a rule; rules run in insertion order.
    pub fn rule(mut self, name: &'static str, rule: Rule<S>) -> Self {
        self.rules.push((name, rule));
        self
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Runs the rules in order and returns the first violation.
    pub fn evaluate(&self, spec: &S) -> Result<(), RuleViolation> {
        for (name, rule) in &self.rules {
            rule(spec).map_err(|reason| RuleViolation { rule: *name, reason })?;
        }
        Ok(())
    }
}

impl<S: ResourceSpec> RuleSet<S> {
    /// Decodes the stored spec, then runs the rules against it.
    pub fn evaluate_object(&self, obj: &DynamicObject) -> Result<(), RuleViolation> {
        let spec = obj
            .spec_as::<S>()
            .map_err(|err| RuleViolation::undecodable(&err))?;
        self.evaluate(&spec)
    }
}

impl<S> Default for RuleSet<S> {
    fn default() -> Self {
        Self::empty()
    }
}
