//! Backend health tracking: three consecutive failures mark a
//! backend unhealthy, one success re-marks it healthy.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

const UNHEALTHY_THRESHOLD: u32 = 3;

#[derive(Debug)]
pub struct Health {
    healthy: AtomicBool,
    consecutive_failures: AtomicU64,
    total: AtomicU64,
    success: AtomicU64,
    fail: AtomicU64,
}

impl Default for Health {
    fn default() -> Self {
        Self {
            healthy: AtomicBool::new(true),
            consecutive_failures: AtomicU64::new(0),
            total: AtomicU64::new(0),
            success: AtomicU64::new(0),
            fail: AtomicU64::new(0),
        }
    }
}

impl Health {
    #[must_use]
    pub fn is_healthy(&self) -> bool {
        self.healthy.load(Ordering::Relaxed)
    }

    pub fn record_success(&self) {
        self.total.fetch_add(1, Ordering::Relaxed);
        self.success.fetch_add(1, Ordering::Relaxed);
        self.consecutive_failures.store(0, Ordering::Relaxed);
        self.healthy.store(true, Ordering::Relaxed);
    }

    pub fn record_failure(&self) {
        self.total.fetch_add(1, Ordering::Relaxed);
        self.fail.fetch_add(1, Ordering::Relaxed);
        let failures = self.consecutive_failures.fetch_add(1, Ordering::Relaxed) + 1;
        if failures >= u64::from(UNHEALTHY_THRESHOLD) {
            self.healthy.store(false, Ordering::Relaxed);
        }
    }

    #[must_use]
    pub fn counters(&self) -> (u64, u64, u64) {
        (self.total.load(Ordering::Relaxed), self.success.load(Ordering::Relaxed), self.fail.load(Ordering::Relaxed))
    }
}
