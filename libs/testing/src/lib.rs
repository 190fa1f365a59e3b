//! Test support shared by the loopstacks crates.
//!
//! - [`fixtures`]: builders for valid and invalid objects of every kind
//! - [`InterferingStore`]: a store wrapper that simulates a concurrent writer
//! - [`init_tracing`]: test-writer tracing subscriber

pub mod fixtures;
mod interfering;

pub use interfering::InterferingStore;

/// Installs a tracing subscriber that writes through the test harness.
///
/// Safe to call from every test; only the first call installs.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,loopstacks_reconcile=debug,loopstacks_operator=debug".into()),
        )
        .with_test_writer()
        .try_init();
}
