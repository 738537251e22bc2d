//! Process entry point library for the Blitz edge gateway: CLI parsing,
//! TOML configuration loading, certificate reading, `tracing` setup, and
//! the TCP/UDP socket event loops built around `blitz-core`. Split out of
//! `main.rs` so integration tests can exercise config loading and state
//! construction without spawning the real listeners.

pub mod cli;
pub mod config_loader;
pub mod logging;
pub mod quic_listener;
pub mod state;
pub mod tcp_listener;
pub mod tls_setup;
