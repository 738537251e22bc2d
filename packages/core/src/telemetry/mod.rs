//! Telemetry counters. Structured logging goes straight through
//! `tracing`'s macros from call sites across the crate; this module owns
//! only the numeric counters and their snapshot type.

mod metrics;

pub use metrics::{MetricsCollector, MetricsSnapshot};
