//! Backend pool and round-robin dispatch: the cursor advances
//! modulo N and returns the first healthy backend found; if none are
//! healthy, it returns the first backend anyway rather than fail the
//! request outright.

use std::sync::atomic::{AtomicUsize, Ordering};

use super::health::Health;
use crate::error::BackendError;

#[derive(Debug)]
pub struct Backend {
    pub host: String,
    pub port: u16,
    pub weight: u32,
    pub health_check_path: Option<String>,
    pub health: Health,
}

impl Backend {
    #[must_use]
    pub fn new(host: String, port: u16, weight: u32, health_check_path: Option<String>) -> Self {
        Self { host, port, weight, health_check_path, health: Health::default() }
    }
}

pub struct BackendPool {
    backends: Vec<Backend>,
    cursor: AtomicUsize,
}

impl BackendPool {
    pub fn new(backends: Vec<Backend>) -> Result<Self, BackendError> {
        if backends.is_empty() {
            return Err(BackendError::NoBackendsAvailable);
        }
        Ok(Self { backends, cursor: AtomicUsize::new(0) })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.backends.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.backends.is_empty()
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Backend> {
        self.backends.get(index)
    }

    /// Advances the round-robin cursor and returns the index of the
    /// backend to use next: the first healthy backend found scanning
    /// from the new cursor position, or the backend at the cursor itself
    /// if none are healthy — deliver a best-effort response rather than
    /// fail the request outright.
    pub fn next(&self) -> usize {
        let n = self.backends.len();
        let start = self.cursor.fetch_add(1, Ordering::Relaxed) % n;
        for offset in 0..n {
            let idx = (start + offset) % n;
            if self.backends[idx].health.is_healthy() {
                return idx;
            }
        }
        start
    }
}
