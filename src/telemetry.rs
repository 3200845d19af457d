//! Tracing setup.
//!
//! The library only emits `tracing` events; installing a subscriber is up to
//! the application. These helpers cover the common case.

use tracing_subscriber::EnvFilter;

const DEFAULT_DIRECTIVE: &str = "spark_objects=info";

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVE))
}

/// Install a global fmt subscriber filtered by `RUST_LOG`, falling back to
/// `spark_objects=info`. Returns `false` if a subscriber was already set.
pub fn init_tracing() -> bool {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .try_init()
        .is_ok()
}

/// Like [`init_tracing`], but writes through the test harness so output is
/// captured per test. Safe to call from every test.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_test_writer()
        .try_init();
}
