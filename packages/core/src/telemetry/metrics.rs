//! Lock-free request/response counters: atomics incremented on the hot
//! path, a `snapshot()` taken whenever an external exporter needs one.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

#[derive(Debug, Default)]
pub struct MetricsCollector {
    pub requests_total: AtomicU64,
    pub requests_failed: AtomicU64,
    pub bytes_in: AtomicU64,
    pub bytes_out: AtomicU64,
    pub rate_limited_global: AtomicU64,
    pub rate_limited_per_ip: AtomicU64,
    pub jwt_rejected: AtomicU64,
    pub backend_failures: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct MetricsSnapshot {
    pub requests_total: u64,
    pub requests_failed: u64,
    pub bytes_in: u64,
    pub bytes_out: u64,
    pub rate_limited_global: u64,
    pub rate_limited_per_ip: u64,
    pub jwt_rejected: u64,
    pub backend_failures: u64,
}

impl MetricsCollector {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_request(&self, bytes_in: u64) {
        self.requests_total.fetch_add(1, Ordering::Relaxed);
        self.bytes_in.fetch_add(bytes_in, Ordering::Relaxed);
    }

    pub fn record_response(&self, bytes_out: u64, failed: bool) {
        self.bytes_out.fetch_add(bytes_out, Ordering::Relaxed);
        if failed {
            self.requests_failed.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_rate_limited(&self, global: bool) {
        if global {
            self.rate_limited_global.fetch_add(1, Ordering::Relaxed);
        } else {
            self.rate_limited_per_ip.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_jwt_rejected(&self) {
        self.jwt_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_backend_failure(&self) {
        self.backend_failures.fetch_add(1, Ordering::Relaxed);
    }

    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            requests_total: self.requests_total.load(Ordering::Relaxed),
            requests_failed: self.requests_failed.load(Ordering::Relaxed),
            bytes_in: self.bytes_in.load(Ordering::Relaxed),
            bytes_out: self.bytes_out.load(Ordering::Relaxed),
            rate_limited_global: self.rate_limited_global.load(Ordering::Relaxed),
            rate_limited_per_ip: self.rate_limited_per_ip.load(Ordering::Relaxed),
            jwt_rejected: self.jwt_rejected.load(Ordering::Relaxed),
            backend_failures: self.backend_failures.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_reflects_recorded_events() {
        let metrics = MetricsCollector::new();
        metrics.record_request(100);
        metrics.record_response(200, false);
        metrics.record_rate_limited(true);
        metrics.record_jwt_rejected();

        let snap = metrics.snapshot();
        assert_eq!(snap.requests_total, 1);
        assert_eq!(snap.bytes_in, 100);
        assert_eq!(snap.bytes_out, 200);
        assert_eq!(snap.rate_limited_global, 1);
        assert_eq!(snap.jwt_rejected, 1);
    }

    #[test]
    fn failed_responses_increment_requests_failed() {
        let metrics = MetricsCollector::new();
        metrics.record_response(0, true);
        assert_eq!(metrics.snapshot().requests_failed, 1);
    }
}
