//! End-to-end: the dispatcher drives every kind from store changes alone.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use loopstacks_api::{AgentInstanceSpec, AgentSpec, Phase};
use loopstacks_operator::controllers;
use loopstacks_operator::dispatch::{DispatchConfig, DispatchError, Dispatcher};
use loopstacks_reconcile::RequeuePolicy;
use loopstacks_store::{Api, MemoryStore, ObjectStore};
use loopstacks_testing::{fixtures, init_tracing};
use tokio::sync::watch;
use tokio::task::JoinHandle;

const DEADLINE: Duration = Duration::from_secs(5);

struct Running {
    store: Arc<MemoryStore>,
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<Result<(), DispatchError>>,
}

fn start(store: Arc<MemoryStore>) -> Running {
    init_tracing();
    let dyn_store: Arc<dyn ObjectStore> = store.clone();
    let registry = Arc::new(controllers::registry(dyn_store.clone(), RequeuePolicy::default()).unwrap());
    let config = DispatchConfig {
        workers: 2,
        pass_timeout: Duration::from_secs(2),
        backoff_base: Duration::from_millis(10),
        backoff_max: Duration::from_millis(100),
    };
    let (shutdown, rx) = watch::channel(false);
    let handle = tokio::spawn(Dispatcher::new(registry, dyn_store, config).run(rx));
    Running {
        store,
        shutdown,
        handle,
    }
}

impl Running {
    async fn stop(self) {
        self.shutdown.send(true).unwrap();
        tokio::time::timeout(DEADLINE, self.handle)
            .await
            .expect("dispatcher did not stop")
            .unwrap()
            .unwrap();
    }
}

/// Polls `check` until it returns true or the deadline passes.
async fn eventually<F, Fut>(what: &str, mut check: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let wait = async {
        while !check().await {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    };
    if tokio::time::timeout(DEADLINE, wait).await.is_err() {
        panic!("timed out waiting for {what}");
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn agent_lifecycle_follows_its_instances() {
    let store = Arc::new(MemoryStore::new());
    let agents: Api<AgentSpec> = Api::new(store.clone());
    let instances: Api<AgentInstanceSpec> = Api::new(store.clone());

    // Exists before the dispatcher starts: picked up by the initial sync.
    let agent_key = agents
        .create(&fixtures::agent("summarizer", fixtures::valid_agent_spec()))
        .await
        .unwrap()
        .key();

    let running = start(store);
    let (agents, instances, agent_key) = (&agents, &instances, &agent_key);

    eventually("agent ready", || async move {
        let agent = agents.get(agent_key).await.unwrap().unwrap();
        agent.status.core.phase == Some(Phase::Ready)
    })
    .await;

    let instance_key = instances
        .create(&fixtures::agent_instance("summarizer-0", "summarizer", "research"))
        .await
        .unwrap()
        .key();
    let instance_key = &instance_key;

    eventually("instance counted", || async move {
        agents.get(agent_key).await.unwrap().unwrap().status.instances == 1
    })
    .await;

    agents.request_deletion(agent_key).await.unwrap();
    eventually("agent terminating", || async move {
        let agent = agents.get(agent_key).await.unwrap().unwrap();
        agent.status.core.phase == Some(Phase::Terminating)
            && agent.status.core.message == "Waiting for 1 AgentInstance(s) to be deleted"
    })
    .await;

    // The instance's removal wakes the agent well before its deletion poll.
    instances.request_deletion(instance_key).await.unwrap();
    eventually("instance removed", || async move {
        instances.get(instance_key).await.unwrap().is_none()
    })
    .await;
    eventually("agent removed", || async move {
        agents.get(agent_key).await.unwrap().is_none()
    })
    .await;

    running.stop().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn recovers_after_store_outage() {
    let store = Arc::new(MemoryStore::new());
    let agents: Api<AgentSpec> = Api::new(store.clone());
    let running = start(store.clone());

    let key = agents
        .create(&fixtures::agent("summarizer", fixtures::empty_agent_spec()))
        .await
        .unwrap()
        .key();
    running.store.set_unavailable(true);
    tokio::time::sleep(Duration::from_millis(50)).await;
    running.store.set_unavailable(false);
    let (agents, key) = (&agents, &key);

    eventually("agent failed validation", || async move {
        let agent = agents.get(key).await.unwrap().unwrap();
        agent.status.core.phase == Some(Phase::Failed)
            && agent.status.core.message == "runtime image is required"
    })
    .await;

    running.stop().await;
}

#[tokio::test]
async fn stops_promptly_when_idle() {
    let running = start(Arc::new(MemoryStore::new()));
    tokio::time::sleep(Duration::from_millis(20)).await;
    running.stop().await;
}

#[tokio::test]
async fn initial_sync_failure_is_reported() {
    let store = Arc::new(MemoryStore::new());
    store.set_unavailable(true);
    let running = start(store);

    let result = tokio::time::timeout(DEADLINE, running.handle)
        .await
        .expect("dispatcher did not return")
        .unwrap();
    assert!(matches!(result, Err(DispatchError::InitialSync(_))));
}
