//! Reconciliation scenarios driven pass by pass, without the dispatcher.

use std::sync::Arc;
use std::time::Duration;

use loopstacks_api::{
    AgentInstanceSpec, AgentSpec, Phase, RealmSpec, ResourceKind, WatchEvent, WatchEventType,
    WorkflowDefinitionSpec,
};
use loopstacks_id::{Generation, ObjectKey};
use loopstacks_operator::controllers;
use loopstacks_reconcile::{
    Action, Controller, Outcome, ReconcileError, Reconciler, RequeuePolicy,
};
use loopstacks_store::{Api, MemoryStore, ObjectStore, StoreError};
use loopstacks_testing::{fixtures, init_tracing, InterferingStore};
use rstest::rstest;
use tokio::sync::broadcast;

const AGENT_FINALIZER: &str = "loopstacks.io/agent-finalizer";

struct Harness {
    store: Arc<MemoryStore>,
    agents: Api<AgentSpec>,
    instances: Api<AgentInstanceSpec>,
    controller: Controller<AgentSpec>,
}

impl Harness {
    fn new() -> Self {
        init_tracing();
        let store = Arc::new(MemoryStore::new());
        Self {
            agents: Api::new(store.clone()),
            instances: Api::new(store.clone()),
            controller: controllers::agent::controller(store.clone(), RequeuePolicy::default()),
            store,
        }
    }

    async fn create_agent(&self, spec: AgentSpec) -> ObjectKey {
        self.agents
            .create(&fixtures::agent("summarizer", spec))
            .await
            .unwrap()
            .key()
    }

    /// Creates the agent and runs the finalizer-attach pass.
    async fn attached_agent(&self, spec: AgentSpec) -> ObjectKey {
        let key = self.create_agent(spec).await;
        let reconciled = self.controller.reconcile(&key).await.unwrap();
        assert_eq!(reconciled.outcome, Outcome::FinalizerAttached);
        key
    }

    async fn create_instances(&self, count: usize, agent: &str) -> Vec<ObjectKey> {
        let mut keys = Vec::new();
        for i in 0..count {
            let instance = fixtures::agent_instance(&format!("{agent}-{i}"), agent, "research");
            keys.push(self.instances.create(&instance).await.unwrap().key());
        }
        keys
    }

    async fn agent(&self, key: &ObjectKey) -> Option<loopstacks_api::Agent> {
        self.agents.get(key).await.unwrap()
    }
}

fn drain(rx: &mut broadcast::Receiver<WatchEvent>) -> Vec<WatchEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

// =============================================================================
// Scenarios
// =============================================================================

#[tokio::test]
async fn empty_runtime_fails_on_missing_image() {
    let h = Harness::new();
    let key = h.attached_agent(fixtures::empty_agent_spec()).await;

    let reconciled = h.controller.reconcile(&key).await.unwrap();
    assert_eq!(reconciled.outcome, Outcome::Invalid);
    assert_eq!(reconciled.action, Action::requeue(Duration::from_secs(300)));

    let agent = h.agent(&key).await.unwrap();
    assert_eq!(agent.status.core.phase, Some(Phase::Failed));
    assert_eq!(agent.status.core.message, "runtime image is required");
    assert!(agent.status.core.last_updated.is_some());
}

#[tokio::test]
async fn valid_agent_without_instances_is_ready() {
    let h = Harness::new();
    let key = h.attached_agent(fixtures::valid_agent_spec()).await;

    let reconciled = h.controller.reconcile(&key).await.unwrap();
    assert_eq!(reconciled.outcome, Outcome::Ready);
    assert_eq!(reconciled.action, Action::requeue(Duration::from_secs(600)));

    let agent = h.agent(&key).await.unwrap();
    assert_eq!(agent.status.core.phase, Some(Phase::Ready));
    assert_eq!(agent.status.core.message, "Agent is ready for deployment");
    assert_eq!(agent.status.instances, 0);
}

#[tokio::test]
async fn deletion_with_instances_is_blocked() {
    let h = Harness::new();
    let key = h.attached_agent(fixtures::valid_agent_spec()).await;
    h.controller.reconcile(&key).await.unwrap();
    h.create_instances(3, "summarizer").await;

    h.agents.request_deletion(&key).await.unwrap();
    let reconciled = h.controller.reconcile(&key).await.unwrap();
    assert_eq!(reconciled.outcome, Outcome::Blocked);
    assert_eq!(reconciled.action, Action::requeue(Duration::from_secs(30)));

    let agent = h.agent(&key).await.unwrap();
    assert_eq!(agent.status.core.phase, Some(Phase::Terminating));
    assert_eq!(agent.status.core.message, "Waiting for 3 AgentInstance(s) to be deleted");
    assert_eq!(agent.status.instances, 3);
    assert!(agent.metadata.has_finalizer(AGENT_FINALIZER));
}

#[tokio::test]
async fn deletion_proceeds_once_instances_are_gone() {
    let h = Harness::new();
    let key = h.attached_agent(fixtures::valid_agent_spec()).await;
    h.controller.reconcile(&key).await.unwrap();
    let instances = h.create_instances(3, "summarizer").await;

    h.agents.request_deletion(&key).await.unwrap();
    h.controller.reconcile(&key).await.unwrap();

    for instance in &instances {
        h.instances.request_deletion(instance).await.unwrap();
    }

    let mut rx = h.store.watch();
    let reconciled = h.controller.reconcile(&key).await.unwrap();
    assert_eq!(reconciled.outcome, Outcome::Released);
    assert_eq!(reconciled.action, Action::await_change());
    assert!(h.agent(&key).await.is_none());

    // Only the finalizer write; no status write.
    let events: Vec<_> = drain(&mut rx).into_iter().map(|e| e.event_type).collect();
    assert_eq!(events, vec![WatchEventType::Deleted]);
}

#[tokio::test]
async fn concurrent_write_abandons_pass() {
    init_tracing();
    let memory = Arc::new(MemoryStore::new());
    let interfering = Arc::new(InterferingStore::new(memory.clone()));
    let controller = controllers::agent::controller(interfering.clone(), RequeuePolicy::default());
    let agents: Api<AgentSpec> = Api::new(memory.clone());

    let key = agents
        .create(&fixtures::agent("summarizer", fixtures::valid_agent_spec()))
        .await
        .unwrap()
        .key();
    controller.reconcile(&key).await.unwrap();

    interfering.interfere_with_next_writes(1);
    let err = controller.reconcile(&key).await.unwrap_err();
    assert!(matches!(err, ReconcileError::Conflict(_)));
    assert_eq!(agents.get(&key).await.unwrap().unwrap().status.core.phase, None);

    // Redelivery converges.
    let reconciled = controller.reconcile(&key).await.unwrap();
    assert_eq!(reconciled.outcome, Outcome::Ready);
    let agent = agents.get(&key).await.unwrap().unwrap();
    assert_eq!(agent.status.core.phase, Some(Phase::Ready));
}

// =============================================================================
// Properties
// =============================================================================

#[rstest]
#[case::valid(fixtures::valid_agent_spec())]
#[case::invalid(fixtures::empty_agent_spec())]
#[tokio::test]
async fn repeated_passes_are_idempotent(#[case] spec: AgentSpec) {
    init_tracing();
    let memory = Arc::new(MemoryStore::new());
    let counting = Arc::new(InterferingStore::new(memory.clone()));
    let controller = controllers::agent::controller(counting.clone(), RequeuePolicy::default());
    let agents: Api<AgentSpec> = Api::new(memory.clone());
    let key = agents
        .create(&fixtures::agent("summarizer", spec))
        .await
        .unwrap()
        .key();

    controller.reconcile(&key).await.unwrap();
    let first = controller.reconcile(&key).await.unwrap();
    let after_first = agents.get(&key).await.unwrap().unwrap();
    let writes = counting.writes();

    let second = controller.reconcile(&key).await.unwrap();
    let after_second = agents.get(&key).await.unwrap().unwrap();

    assert_eq!(first, second);
    assert_eq!(counting.writes(), writes);
    assert_eq!(after_first, after_second);
}

#[tokio::test]
async fn first_observation_writes_pending_before_verdict() {
    let h = Harness::new();
    let key = h.attached_agent(fixtures::valid_agent_spec()).await;

    let mut rx = h.store.watch();
    h.controller.reconcile(&key).await.unwrap();

    let phases: Vec<_> = drain(&mut rx)
        .into_iter()
        .filter(|e| e.event_type == WatchEventType::StatusModified)
        .map(|e| e.object.status["phase"].clone())
        .collect();
    assert_eq!(phases, vec![serde_json::json!("Pending"), serde_json::json!("Ready")]);
}

#[tokio::test]
async fn finalizer_pass_performs_no_other_mutation() {
    let h = Harness::new();
    let key = h.create_agent(fixtures::valid_agent_spec()).await;
    let before = h.agent(&key).await.unwrap();

    let mut rx = h.store.watch();
    h.controller.reconcile(&key).await.unwrap();
    let after = h.agent(&key).await.unwrap();

    assert_eq!(after.metadata.finalizers, vec![AGENT_FINALIZER.to_string()]);
    assert_eq!(after.spec, before.spec);
    assert_eq!(after.status, before.status);
    assert_eq!(after.metadata.generation, before.metadata.generation);

    let events: Vec<_> = drain(&mut rx).into_iter().map(|e| e.event_type).collect();
    assert_eq!(events, vec![WatchEventType::Modified]);
}

#[tokio::test]
async fn passes_leave_unknown_spec_fields_alone() {
    let h = Harness::new();
    let mut raw = fixtures::agent("summarizer", AgentSpec::default())
        .to_dynamic()
        .unwrap();
    raw.spec = serde_json::json!({
        "runtime": { "image": "ghcr.io/loopstacks/summarizer:1.0" },
        "futureField": { "keep": true },
    });
    let key = h.store.create(raw.clone()).await.unwrap().key();

    assert_eq!(
        h.controller.reconcile(&key).await.unwrap().outcome,
        Outcome::FinalizerAttached
    );
    let stored = h.store.get(ResourceKind::Agent, &key).await.unwrap().unwrap();
    assert_eq!(stored.spec, raw.spec);
    assert_eq!(stored.metadata.generation, Generation::FIRST);
    assert!(stored.metadata.has_finalizer(AGENT_FINALIZER));

    assert_eq!(h.controller.reconcile(&key).await.unwrap().outcome, Outcome::Ready);
    h.agents.request_deletion(&key).await.unwrap();
    assert_eq!(h.controller.reconcile(&key).await.unwrap().outcome, Outcome::Released);
    assert!(h.store.get(ResourceKind::Agent, &key).await.unwrap().is_none());
}

#[tokio::test]
async fn undecodable_spec_fails_with_decode_message() {
    init_tracing();
    let store = Arc::new(MemoryStore::new());
    let controller = controllers::agent_instance::controller(store.clone(), RequeuePolicy::default());
    let mut raw = fixtures::agent_instance("i1", "summarizer", "research")
        .to_dynamic()
        .unwrap();
    raw.spec = serde_json::json!({ "agent": "summarizer", "realm": "research", "replicas": "three" });
    let key = store.create(raw.clone()).await.unwrap().key();

    assert_eq!(
        controller.reconcile(&key).await.unwrap().outcome,
        Outcome::FinalizerAttached
    );
    let reconciled = controller.reconcile(&key).await.unwrap();
    assert_eq!(reconciled.outcome, Outcome::Invalid);
    assert_eq!(reconciled.action, Action::requeue(Duration::from_secs(300)));

    let stored = store
        .get(ResourceKind::AgentInstance, &key)
        .await
        .unwrap()
        .unwrap();
    let status = stored.status_as::<AgentInstanceSpec>().unwrap();
    assert_eq!(status.core.phase, Some(Phase::Failed));
    assert_eq!(
        status.core.message,
        "invalid spec: invalid type: string \"three\", expected u32"
    );
    assert_eq!(stored.spec, raw.spec);

    // Steady state: the same verdict is not rewritten.
    let version = stored.metadata.resource_version;
    controller.reconcile(&key).await.unwrap();
    let again = store
        .get(ResourceKind::AgentInstance, &key)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(again.metadata.resource_version, version);
}

#[rstest]
#[case(1)]
#[case(2)]
#[case(5)]
#[tokio::test]
async fn finalizer_held_until_last_instance_gone(#[case] count: usize) {
    let h = Harness::new();
    let key = h.attached_agent(fixtures::valid_agent_spec()).await;
    h.controller.reconcile(&key).await.unwrap();
    let instances = h.create_instances(count, "summarizer").await;
    h.agents.request_deletion(&key).await.unwrap();

    for (deleted, instance) in instances.iter().enumerate() {
        let remaining = count - deleted;
        let reconciled = h.controller.reconcile(&key).await.unwrap();
        assert_eq!(reconciled.outcome, Outcome::Blocked);

        let agent = h.agent(&key).await.unwrap();
        assert!(agent.metadata.has_finalizer(AGENT_FINALIZER));
        assert_eq!(
            agent.status.core.message,
            format!("Waiting for {remaining} AgentInstance(s) to be deleted")
        );

        h.instances.request_deletion(instance).await.unwrap();
    }

    let reconciled = h.controller.reconcile(&key).await.unwrap();
    assert_eq!(reconciled.outcome, Outcome::Released);
    assert!(h.agent(&key).await.is_none());
}

#[tokio::test]
async fn only_first_violation_is_reported() {
    let h = Harness::new();
    let mut spec = fixtures::empty_agent_spec();
    spec.runtime.language = "cobol".into();
    let key = h.attached_agent(spec).await;

    h.controller.reconcile(&key).await.unwrap();
    let agent = h.agent(&key).await.unwrap();
    assert_eq!(agent.status.core.message, "runtime image is required");
}

#[tokio::test]
async fn spec_edits_are_revalidated() {
    let h = Harness::new();
    let key = h.attached_agent(fixtures::valid_agent_spec()).await;
    h.controller.reconcile(&key).await.unwrap();

    let mut agent = h.agent(&key).await.unwrap();
    agent.spec.runtime.language = "rust".into();
    h.agents.replace(&agent).await.unwrap();

    let reconciled = h.controller.reconcile(&key).await.unwrap();
    assert_eq!(reconciled.outcome, Outcome::Invalid);
    let agent = h.agent(&key).await.unwrap();
    assert_eq!(agent.status.core.phase, Some(Phase::Failed));
    assert_eq!(agent.status.core.message, "unsupported runtime language: rust");
}

#[tokio::test]
async fn ready_counter_tracks_instances_in_namespace() {
    let h = Harness::new();
    let key = h.attached_agent(fixtures::valid_agent_spec()).await;
    h.create_instances(2, "summarizer").await;
    h.create_instances(1, "translator").await;
    h.instances
        .create(&fixtures::agent_instance_in("other", "elsewhere", "summarizer", "research"))
        .await
        .unwrap();

    h.controller.reconcile(&key).await.unwrap();
    assert_eq!(h.agent(&key).await.unwrap().status.instances, 2);
}

#[tokio::test]
async fn store_outage_surfaces_as_error() {
    let h = Harness::new();
    let key = h.attached_agent(fixtures::valid_agent_spec()).await;

    h.store.set_unavailable(true);
    let err = h.controller.reconcile(&key).await.unwrap_err();
    assert!(matches!(err, ReconcileError::Store(StoreError::Unavailable(_))));

    h.store.set_unavailable(false);
    assert_eq!(h.controller.reconcile(&key).await.unwrap().outcome, Outcome::Ready);
}

#[tokio::test]
async fn missing_object_is_a_noop() {
    let h = Harness::new();
    let key = ObjectKey::from_parts("default", "never-created").unwrap();
    let reconciled = h.controller.reconcile(&key).await.unwrap();
    assert_eq!(reconciled.outcome, Outcome::Absent);
    assert!(h.store.is_empty().await);
}

// =============================================================================
// Other kinds
// =============================================================================

#[tokio::test]
async fn realm_counts_and_waits_for_its_instances() {
    init_tracing();
    let store = Arc::new(MemoryStore::new());
    let controller = controllers::realm::controller(store.clone(), RequeuePolicy::default());
    let realms: Api<RealmSpec> = Api::new(store.clone());
    let instances: Api<AgentInstanceSpec> = Api::new(store.clone());

    let key = realms.create(&fixtures::realm("research")).await.unwrap().key();
    let instance = instances
        .create(&fixtures::agent_instance("i1", "summarizer", "research"))
        .await
        .unwrap()
        .key();

    controller.reconcile(&key).await.unwrap();
    assert_eq!(controller.reconcile(&key).await.unwrap().outcome, Outcome::Ready);
    let realm = realms.get(&key).await.unwrap().unwrap();
    assert_eq!(realm.status.core.message, "Realm is ready");
    assert_eq!(realm.status.agent_instances, 1);

    realms.request_deletion(&key).await.unwrap();
    assert_eq!(controller.reconcile(&key).await.unwrap().outcome, Outcome::Blocked);
    let realm = realms.get(&key).await.unwrap().unwrap();
    assert_eq!(realm.status.core.message, "Waiting for 1 AgentInstance(s) to be deleted");

    instances.request_deletion(&instance).await.unwrap();
    assert_eq!(controller.reconcile(&key).await.unwrap().outcome, Outcome::Released);
    assert!(realms.get(&key).await.unwrap().is_none());
}

#[tokio::test]
async fn kinds_without_rules_become_ready() {
    init_tracing();
    let store = Arc::new(MemoryStore::new());
    let requeue = RequeuePolicy::default();

    let instances = controllers::agent_instance::controller(store.clone(), requeue);
    let instance_api: Api<AgentInstanceSpec> = Api::new(store.clone());
    let key = instance_api
        .create(&fixtures::agent_instance("i1", "missing-agent", "missing-realm"))
        .await
        .unwrap()
        .key();
    instances.reconcile(&key).await.unwrap();
    assert_eq!(instances.reconcile(&key).await.unwrap().outcome, Outcome::Ready);
    let instance = instance_api.get(&key).await.unwrap().unwrap();
    assert_eq!(instance.status.core.message, "AgentInstance is ready");
    assert!(instance
        .metadata
        .has_finalizer(ResourceKind::AgentInstance.finalizer()));

    let workflows = controllers::workflow_definition::controller(store.clone(), requeue);
    let workflow_api: Api<WorkflowDefinitionSpec> = Api::new(store.clone());
    let key = workflow_api
        .create(&fixtures::workflow("triage"))
        .await
        .unwrap()
        .key();
    workflows.reconcile(&key).await.unwrap();
    assert_eq!(workflows.reconcile(&key).await.unwrap().outcome, Outcome::Ready);
    let workflow = workflow_api.get(&key).await.unwrap().unwrap();
    assert_eq!(workflow.status.core.message, "WorkflowDefinition is ready");
}
