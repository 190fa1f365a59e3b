//! loopstacks operator
//!
//! Reconciles Agents, Realms, AgentInstances and WorkflowDefinitions against
//! an in-process object store, optionally seeded from a JSON manifest.

use std::sync::Arc;

use anyhow::Result;
use loopstacks_operator::dispatch::{dispatcher_exit, Dispatcher};
use loopstacks_operator::{config, controllers, seed};
use loopstacks_store::{MemoryStore, ObjectStore};
use tokio::sync::watch;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config = config::Config::from_env()?;

    // Initialize tracing (prefer RUST_LOG, fallback to LOOPSTACKS_LOG_LEVEL)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| config.log_level.clone().into());
    if config.dev_mode {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    }

    info!("Starting loopstacks operator");
    info!(
        workers = config.dispatch.workers,
        failure_retry_secs = config.requeue.failure_retry.as_secs(),
        resync_secs = config.requeue.resync.as_secs(),
        deletion_poll_secs = config.requeue.deletion_poll.as_secs(),
        "Configuration loaded"
    );

    let store: Arc<dyn ObjectStore> = Arc::new(MemoryStore::new());

    if let Some(path) = &config.seed_file {
        match seed::load_file(store.as_ref(), path).await {
            Ok(created) => info!(path = %path.display(), created, "Seed manifest loaded"),
            Err(e) => {
                error!(error = %e, "Failed to load seed manifest");
                return Err(e.into());
            }
        }
    }

    let registry = Arc::new(controllers::registry(Arc::clone(&store), config.requeue)?);

    // Create shutdown channel for graceful shutdown
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let dispatcher = Dispatcher::new(registry, store, config.dispatch.clone());
    let mut dispatcher_handle = tokio::spawn(dispatcher.run(shutdown_rx));

    // Wait for shutdown signal (Ctrl+C)
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Received shutdown signal");
        }
        joined = &mut dispatcher_handle => {
            let exit = dispatcher_exit(joined);
            match &exit {
                Ok(()) => info!("Dispatcher exited"),
                Err(e) => error!(error = %format!("{e:#}"), "Dispatcher stopped"),
            }
            return exit;
        }
    }

    // Signal shutdown to the dispatcher and its workers
    let _ = shutdown_tx.send(true);

    info!("Waiting for dispatcher to shut down...");
    let shutdown_timeout = std::time::Duration::from_secs(10);
    match tokio::time::timeout(shutdown_timeout, dispatcher_handle).await {
        Ok(joined) => dispatcher_exit(joined)?,
        Err(e) => warn!(error = %e, "Dispatcher did not shut down in time"),
    }

    info!("Operator shutdown complete");
    Ok(())
}
