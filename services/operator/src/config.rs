use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use loopstacks_reconcile::RequeuePolicy;

use crate::dispatch::DispatchConfig;

#[derive(Debug, Clone)]
pub struct Config {
    pub log_level: String,
    pub dev_mode: bool,
    pub requeue: RequeuePolicy,
    pub dispatch: DispatchConfig,
    pub seed_file: Option<PathBuf>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let log_level = lookup("LOOPSTACKS_LOG_LEVEL").unwrap_or_else(|| "info".to_string());

        let dev_mode = lookup("LOOPSTACKS_DEV")
            .map(|v| v == "1" || v.to_lowercase() == "true")
            .unwrap_or(false);

        let defaults = RequeuePolicy::default();
        let requeue = RequeuePolicy {
            failure_retry: secs(&lookup, "LOOPSTACKS_FAILURE_RETRY_SECS", defaults.failure_retry)?,
            resync: secs(&lookup, "LOOPSTACKS_RESYNC_SECS", defaults.resync)?,
            deletion_poll: secs(&lookup, "LOOPSTACKS_DELETION_POLL_SECS", defaults.deletion_poll)?,
        };

        let mut dispatch = DispatchConfig::default();
        if let Some(workers) = lookup("LOOPSTACKS_WORKERS") {
            dispatch.workers = workers
                .parse()
                .with_context(|| format!("LOOPSTACKS_WORKERS must be a number, got '{workers}'"))?;
            anyhow::ensure!(dispatch.workers > 0, "LOOPSTACKS_WORKERS must be at least 1");
        }
        dispatch.pass_timeout = secs(&lookup, "LOOPSTACKS_PASS_TIMEOUT_SECS", dispatch.pass_timeout)?;

        let seed_file = lookup("LOOPSTACKS_SEED_FILE")
            .filter(|v| !v.is_empty())
            .map(PathBuf::from);

        Ok(Self {
            log_level,
            dev_mode,
            requeue,
            dispatch,
            seed_file,
        })
    }
}

fn secs<F>(lookup: &F, name: &str, default: Duration) -> Result<Duration>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        Some(raw) => {
            let secs: u64 = raw
                .parse()
                .with_context(|| format!("{name} must be a number of seconds, got '{raw}'"))?;
            anyhow::ensure!(secs > 0, "{name} must be at least 1 second");
            Ok(Duration::from_secs(secs))
        }
        None => Ok(default),
    }
}
