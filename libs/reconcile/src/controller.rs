//! Generic controller running the reconciliation pass for one kind.

use std::sync::Arc;

use async_trait::async_trait;
use loopstacks_api::{DynamicObject, ResourceKind, ResourceSpec};
use loopstacks_id::ObjectKey;
use loopstacks_store::{ObjectStore, StoreError};
use tracing::{debug, info, instrument, warn};

use crate::decision::{self, Branch, Deletion, Readiness};
use crate::{
    Action, Dependents, Outcome, ReconcileError, Reconciled, Reconciler, RequeuePolicy, RuleSet,
    StatusProjector,
};

/// What varies between kinds.
pub struct KindPolicy<S> {
    pub rules: RuleSet<S>,
    pub dependents: Option<Dependents>,
    pub ready_message: &'static str,
}

impl<S> KindPolicy<S> {
    /// A policy with no rules and no dependents.
    pub fn new(ready_message: &'static str) -> Self {
        Self {
            rules: RuleSet::empty(),
            dependents: None,
            ready_message,
        }
    }

    pub fn with_rules(mut self, rules: RuleSet<S>) -> Self {
        self.rules = rules;
        self
    }

    pub fn with_dependents(mut self, dependents: Dependents) -> Self {
        self.dependents = Some(dependents);
        self
    }
}

/// Reconciles objects of kind `S::KIND`.
///
/// Works on the stored object as read; the spec is decoded for validation
/// only and never written back.
pub struct Controller<S: ResourceSpec> {
    store: Arc<dyn ObjectStore>,
    projector: StatusProjector<S>,
    policy: KindPolicy<S>,
    requeue: RequeuePolicy,
}

impl<S: ResourceSpec> Controller<S> {
    pub fn new(store: Arc<dyn ObjectStore>, policy: KindPolicy<S>, requeue: RequeuePolicy) -> Self {
        Self {
            projector: StatusProjector::new(store.clone()),
            store,
            policy,
            requeue,
        }
    }

    pub fn policy(&self) -> &KindPolicy<S> {
        &self.policy
    }

    pub fn requeue_policy(&self) -> &RequeuePolicy {
        &self.requeue
    }

    fn finalizer(&self) -> &'static str {
        S::KIND.finalizer()
    }

    /// Runs one reconciliation pass.
    #[instrument(
        skip(self),
        fields(kind = %S::KIND, namespace = %key.namespace, name = %key.name)
    )]
    pub async fn reconcile_key(&self, key: &ObjectKey) -> Result<Reconciled, ReconcileError> {
        let Some(obj) = self.store.get(S::KIND, key).await? else {
            debug!("object absent, nothing to do");
            return Ok(absent());
        };

        let result = match decision::select_branch(&obj.metadata, self.finalizer()) {
            Branch::AttachFinalizer => self.attach_finalizer(obj).await,
            Branch::Deletion => self.finalize(obj).await,
            Branch::Normal => self.validate(obj).await,
        };

        match result {
            Err(ReconcileError::Store(StoreError::NotFound { .. })) => {
                debug!("object removed during pass");
                Ok(absent())
            }
            Err(err) => {
                warn!(error = %err, "reconciliation pass failed");
                Err(err)
            }
            Ok(reconciled) => Ok(reconciled),
        }
    }

    async fn attach_finalizer(&self, mut obj: DynamicObject) -> Result<Reconciled, ReconcileError> {
        obj.metadata.add_finalizer(self.finalizer());
        self.projector.persist_finalizers(obj).await?;
        info!(finalizer = self.finalizer(), "finalizer attached");
        Ok(Reconciled::new(Outcome::FinalizerAttached, Action::await_change()))
    }

    async fn validate(&self, mut obj: DynamicObject) -> Result<Reconciled, ReconcileError> {
        let status = obj.status_as::<S>()?;
        if decision::needs_initialization(&status) {
            let pending = decision::initialized(&status);
            obj = self.projector.persist_status(obj, pending).await?;
        }

        let readiness = match self.policy.rules.evaluate_object(&obj) {
            Err(violation) => {
                info!(rule = violation.rule, reason = %violation.reason, "validation failed");
                Readiness::decide(Err(violation), || 0)
            }
            Ok(()) => {
                let count = self.count_dependents(&obj.key()).await?;
                Readiness::decide(Ok(()), || count)
            }
        };

        let next = readiness.apply(&obj.status_as::<S>()?, self.policy.ready_message);
        self.projector.persist_status(obj, next).await?;

        let outcome = readiness.outcome();
        debug!(%outcome, "validation pass complete");
        Ok(Reconciled::new(outcome, readiness.action(&self.requeue)))
    }

    async fn finalize(&self, mut obj: DynamicObject) -> Result<Reconciled, ReconcileError> {
        let remaining = self.count_dependents(&obj.key()).await?;
        let deletion = Deletion::decide(remaining, self.policy.dependents.map(|d| d.kind));

        match deletion.blocked_status(&obj.status_as::<S>()?) {
            Some(terminating) => {
                self.projector.persist_status(obj, terminating).await?;
                info!(remaining, "deletion blocked by dependents");
            }
            None => {
                if obj.metadata.remove_finalizer(self.finalizer()) {
                    self.projector.persist_finalizers(obj).await?;
                    info!(finalizer = self.finalizer(), "finalizer released");
                }
            }
        }

        Ok(Reconciled::new(deletion.outcome(), deletion.action(&self.requeue)))
    }

    async fn count_dependents(&self, key: &ObjectKey) -> Result<u32, ReconcileError> {
        match &self.policy.dependents {
            Some(dependents) => Ok(dependents.count(self.store.as_ref(), key).await?),
            None => Ok(0),
        }
    }
}

fn absent() -> Reconciled {
    Reconciled::new(Outcome::Absent, Action::await_change())
}

#[async_trait]
impl<S: ResourceSpec> Reconciler for Controller<S> {
    fn kind(&self) -> ResourceKind {
        S::KIND
    }

    async fn reconcile(&self, key: &ObjectKey) -> Result<Reconciled, ReconcileError> {
        self.reconcile_key(key).await
    }

    fn owner_of(&self, dependent: &DynamicObject) -> Option<ObjectKey> {
        self.policy.dependents.as_ref()?.owner_of(dependent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use loopstacks_api::{
        Agent, AgentInstance, AgentInstanceSpec, AgentSpec, Phase, WorkflowDefinition,
        WorkflowDefinitionSpec,
    };
    use loopstacks_store::{Api, MemoryStore};

    fn image_required(spec: &AgentSpec) -> Result<(), String> {
        if spec.runtime.image.is_empty() {
            Err("runtime image is required".to_string())
        } else {
            Ok(())
        }
    }

    fn agent_controller(store: Arc<MemoryStore>) -> Controller<AgentSpec> {
        let policy = KindPolicy::new("Agent is ready for deployment")
            .with_rules(RuleSet::empty().rule("image", image_required))
            .with_dependents(Dependents::new(ResourceKind::AgentInstance, "spec.agent"));
        Controller::new(store, policy, RequeuePolicy::default())
    }

    async fn create_agent(store: &Arc<MemoryStore>, image: &str) -> ObjectKey {
        let mut spec = AgentSpec::default();
        spec.runtime.image = image.to_string();
        let api: Api<AgentSpec> = Api::new(store.clone());
        api.create(&Agent::new("default", "summarizer", spec).unwrap())
            .await
            .unwrap()
            .key()
    }

    #[tokio::test]
    async fn test_absent_object_is_noop() {
        let store = Arc::new(MemoryStore::new());
        let controller = agent_controller(store);
        let key = ObjectKey::from_parts("default", "ghost").unwrap();

        let reconciled = controller.reconcile(&key).await.unwrap();
        assert_eq!(reconciled.outcome, Outcome::Absent);
        assert_eq!(reconciled.action, Action::await_change());
    }

    #[tokio::test]
    async fn test_first_pass_only_attaches_finalizer() {
        let store = Arc::new(MemoryStore::new());
        let controller = agent_controller(store.clone());
        let key = create_agent(&store, "").await;

        let reconciled = controller.reconcile(&key).await.unwrap();
        assert_eq!(reconciled.outcome, Outcome::FinalizerAttached);

        let agent = Api::<AgentSpec>::new(store).get(&key).await.unwrap().unwrap();
        assert!(agent.metadata.has_finalizer("loopstacks.io/agent-finalizer"));
        assert_eq!(agent.status.core.phase, None);
    }

    #[tokio::test]
    async fn test_invalid_then_ready_after_fix() {
        let store = Arc::new(MemoryStore::new());
        let controller = agent_controller(store.clone());
        let api: Api<AgentSpec> = Api::new(store.clone());
        let key = create_agent(&store, "").await;

        controller.reconcile(&key).await.unwrap();
        let reconciled = controller.reconcile(&key).await.unwrap();
        assert_eq!(reconciled.outcome, Outcome::Invalid);
        let agent = api.get(&key).await.unwrap().unwrap();
        assert_eq!(agent.status.core.phase, Some(Phase::Failed));
        assert_eq!(agent.status.core.message, "runtime image is required");

        let mut fixed = agent;
        fixed.spec.runtime.image = "ghcr.io/loopstacks/summarizer:1.0".into();
        api.replace(&fixed).await.unwrap();

        let reconciled = controller.reconcile(&key).await.unwrap();
        assert_eq!(reconciled.outcome, Outcome::Ready);
        let agent = api.get(&key).await.unwrap().unwrap();
        assert_eq!(agent.status.core.message, "Agent is ready for deployment");
    }

    #[tokio::test]
    async fn test_owner_of_only_for_dependents() {
        let store = Arc::new(MemoryStore::new());
        let controller = agent_controller(store.clone());

        let spec = AgentInstanceSpec {
            agent: "summarizer".into(),
            ..Default::default()
        };
        let instance = AgentInstance::new("default", "i1", spec).unwrap().to_dynamic().unwrap();
        assert_eq!(
            controller.owner_of(&instance),
            Some(ObjectKey::from_parts("default", "summarizer").unwrap())
        );

        let workflows: Controller<WorkflowDefinitionSpec> = Controller::new(
            store,
            KindPolicy::new("WorkflowDefinition is ready"),
            RequeuePolicy::default(),
        );
        assert_eq!(workflows.owner_of(&instance), None);
        assert_eq!(workflows.kind(), ResourceKind::WorkflowDefinition);
    }

    #[tokio::test]
    async fn test_kind_without_dependents_releases_immediately() {
        let store = Arc::new(MemoryStore::new());
        let controller: Controller<WorkflowDefinitionSpec> = Controller::new(
            store.clone(),
            KindPolicy::new("WorkflowDefinition is ready"),
            RequeuePolicy::default(),
        );
        let api: Api<WorkflowDefinitionSpec> = Api::new(store.clone());
        let key = api
            .create(&WorkflowDefinition::new("default", "triage", Default::default()).unwrap())
            .await
            .unwrap()
            .key();

        controller.reconcile(&key).await.unwrap();
        api.request_deletion(&key).await.unwrap();

        let reconciled = controller.reconcile(&key).await.unwrap();
        assert_eq!(reconciled.outcome, Outcome::Released);
        assert!(store.is_empty().await);
    }
}
