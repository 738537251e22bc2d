//! Time sources the core consumes rather than reads directly: a
//! monotonic clock for bucket refill, packet-number timers and idle
//! timeouts, and a wall clock for JWT `exp`/`nbf` comparisons. Splitting
//! these into a trait lets tests inject deterministic values instead of
//! depending on real elapsed time.

use std::time::{Instant, SystemTime, UNIX_EPOCH};

pub trait Clock: Send + Sync {
    fn monotonic_now(&self) -> Instant;
    fn unix_now(&self) -> i64;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn monotonic_now(&self) -> Instant {
        Instant::now()
    }

    fn unix_now(&self) -> i64 {
        SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_secs() as i64).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_clock_unix_now_is_a_plausible_recent_timestamp() {
        let now = SystemClock.unix_now();
        assert!(now > 1_700_000_000);
    }
}
