//! Dispatcher: watch pump and worker pool.

use std::sync::Arc;
use std::time::Instant;

use loopstacks_api::WatchEvent;
use loopstacks_reconcile::{ErrorBackoff, ReconcileError};
use loopstacks_store::{ListParams, ObjectStore, StoreError};
use thiserror::Error;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, watch, Mutex};
use tokio::task::JoinSet;
use tracing::{debug, error, info, instrument, warn};

use super::{DispatchConfig, WorkKey, WorkQueue};
use crate::registry::ControllerRegistry;

#[derive(Debug, Error)]
pub enum DispatchError {
    /// Listing objects for the initial sync failed.
    #[error("initial sync failed: {0}")]
    InitialSync(#[from] StoreError),
}

/// Drives registered reconcilers from store watch events and requeue hints.
pub struct Dispatcher {
    registry: Arc<ControllerRegistry>,
    store: Arc<dyn ObjectStore>,
    queue: Arc<WorkQueue<WorkKey>>,
    backoff: Arc<Mutex<ErrorBackoff<WorkKey>>>,
    config: DispatchConfig,
}

impl Dispatcher {
    pub fn new(
        registry: Arc<ControllerRegistry>,
        store: Arc<dyn ObjectStore>,
        config: DispatchConfig,
    ) -> Self {
        Self {
            registry,
            store,
            queue: WorkQueue::new(),
            backoff: Arc::new(Mutex::new(ErrorBackoff::new(
                config.backoff_base,
                config.backoff_max,
            ))),
            config,
        }
    }

    pub fn queue(&self) -> &Arc<WorkQueue<WorkKey>> {
        &self.queue
    }

    /// Runs until the shutdown signal is received.
    ///
    /// Subscribes to the watch stream before the initial sync so no change
    /// between the two is missed.
    #[instrument(skip(self, shutdown), name = "dispatcher")]
    pub async fn run(self, shutdown: watch::Receiver<bool>) -> Result<(), DispatchError> {
        let events = self.store.watch();
        let synced = resync(&self.registry, self.store.as_ref(), &self.queue).await?;
        info!(
            kinds = self.registry.len(),
            objects = synced,
            workers = self.config.workers,
            "Starting dispatcher"
        );

        let mut tasks = JoinSet::new();

        tasks.spawn(pump(
            Arc::clone(&self.registry),
            Arc::clone(&self.store),
            Arc::clone(&self.queue),
            events,
            shutdown.clone(),
        ));

        for id in 0..self.config.workers {
            tasks.spawn(work(
                id,
                Arc::clone(&self.registry),
                Arc::clone(&self.queue),
                Arc::clone(&self.backoff),
                self.config.clone(),
                shutdown.clone(),
            ));
        }

        let mut shutdown_rx = shutdown;
        cancelled(&mut shutdown_rx).await;
        info!("Shutdown signal received, stopping dispatcher");
        self.queue.shutdown().await;

        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                error!(error = %e, "Dispatcher task panicked");
            }
        }

        info!("Dispatcher stopped");
        Ok(())
    }
}

/// Resolves once shutdown is signalled or the sender is gone.
async fn cancelled(shutdown: &mut watch::Receiver<bool>) {
    while !*shutdown.borrow_and_update() {
        if shutdown.changed().await.is_err() {
            return;
        }
    }
}

/// Lists every registered kind and enqueues all objects.
async fn resync(
    registry: &ControllerRegistry,
    store: &dyn ObjectStore,
    queue: &WorkQueue<WorkKey>,
) -> Result<usize, StoreError> {
    let mut count = 0;
    for kind in registry.kinds() {
        for obj in store.list(kind, &ListParams::all()).await? {
            queue.add(WorkKey::new(kind, obj.key())).await;
            count += 1;
        }
    }
    Ok(count)
}

/// Enqueues the keys a watch event concerns.
async fn route(registry: &ControllerRegistry, queue: &WorkQueue<WorkKey>, event: &WatchEvent) {
    if !event.triggers_reconcile() {
        return;
    }

    if registry.get(event.kind()).is_some() {
        queue.add(WorkKey::new(event.kind(), event.key())).await;
    }

    for (kind, owner) in registry.owners_of(&event.object) {
        debug!(
            dependent = %event.key(),
            owner_kind = %kind,
            owner = %owner,
            "Waking owner of changed dependent"
        );
        queue.add(WorkKey::new(kind, owner)).await;
    }
}

#[instrument(skip_all, name = "watch_pump")]
async fn pump(
    registry: Arc<ControllerRegistry>,
    store: Arc<dyn ObjectStore>,
    queue: Arc<WorkQueue<WorkKey>>,
    mut events: broadcast::Receiver<WatchEvent>,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            _ = cancelled(&mut shutdown) => break,
            received = events.recv() => match received {
                Ok(event) => route(&registry, &queue, &event).await,
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Watch stream lagged, resyncing");
                    if let Err(e) = resync(&registry, store.as_ref(), &queue).await {
                        error!(error = %e, "Resync after lag failed");
                    }
                }
                Err(RecvError::Closed) => {
                    info!("Watch stream closed");
                    break;
                }
            },
        }
    }
}

#[instrument(skip(registry, queue, backoff, config, shutdown), name = "worker")]
async fn work(
    id: usize,
    registry: Arc<ControllerRegistry>,
    queue: Arc<WorkQueue<WorkKey>>,
    backoff: Arc<Mutex<ErrorBackoff<WorkKey>>>,
    config: DispatchConfig,
    mut shutdown: watch::Receiver<bool>,
) {
    while let Some(item) = queue.get().await {
        let Some(reconciler) = registry.get(item.kind).cloned() else {
            warn!(item = %item, "No reconciler registered for kind");
            queue.done(&item).await;
            continue;
        };

        let started = Instant::now();
        let result = tokio::select! {
            _ = cancelled(&mut shutdown) => Err(ReconcileError::Cancelled(item.to_string())),
            timed = tokio::time::timeout(config.pass_timeout, reconciler.reconcile(&item.key)) => {
                timed.unwrap_or_else(|_| Err(ReconcileError::Timeout {
                    resource: item.to_string(),
                    elapsed: started.elapsed(),
                }))
            }
        };

        match result {
            Ok(reconciled) => {
                backoff.lock().await.clear(&item);
                debug!(
                    item = %item,
                    outcome = %reconciled.outcome,
                    requeue_after = ?reconciled.action.requeue_after(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Pass complete"
                );
                if let Some(after) = reconciled.action.requeue_after() {
                    queue.add_after(item.clone(), after).await;
                }
            }
            Err(ReconcileError::Cancelled(_)) => {
                debug!(item = %item, "Pass cancelled by shutdown");
                queue.done(&item).await;
                break;
            }
            Err(e) => {
                let (delay, failing) = {
                    let mut backoff = backoff.lock().await;
                    (backoff.record_failure(&item), backoff.tracked())
                };
                warn!(
                    item = %item,
                    error = %e,
                    retry_in_ms = delay.as_millis() as u64,
                    failing,
                    "Pass failed, retrying with backoff"
                );
                queue.add_after(item.clone(), delay).await;
            }
        }

        queue.done(&item).await;
    }
}
