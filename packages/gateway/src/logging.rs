//! `tracing` initialization. `blitz-core` only emits through the
//! `tracing` macros and never installs a subscriber itself; this is the
//! one place in the process that does, controlled by `RUST_LOG` with a
//! sane default.

use tracing_subscriber::EnvFilter;

/// Installs the global `tracing` subscriber. Must be called exactly once,
/// before any other module logs.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(true).init();
}
