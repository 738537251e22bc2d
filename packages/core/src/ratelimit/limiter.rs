//! Global + per-IP rate limiter. The global bucket is mutex-
//! protected; the per-IP map is a [`DashMap`] keyed by peer address so
//! concurrent requests from different IPs don't serialize on one lock.

use std::net::IpAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use dashmap::DashMap;

use super::bucket::TokenBucket;
use crate::error::RateLimitError;

struct PerIpEntry {
    bucket: TokenBucket,
    last_seen: Instant,
}

pub struct RateLimiterConfig {
    pub global_rps: f64,
    pub per_ip_rps: f64,
    pub burst_multiplier: f64,
    pub cleanup_interval: Duration,
    pub max_tracked_ips: usize,
}

/// Running counters for telemetry, incremented without holding any
/// bucket lock.
#[derive(Debug, Default)]
pub struct RateLimiterStats {
    pub allowed: AtomicU64,
    pub denied_global: AtomicU64,
    pub denied_per_ip: AtomicU64,
}

pub struct RateLimiter {
    config: RateLimiterConfig,
    global: Option<Mutex<TokenBucket>>,
    per_ip: DashMap<IpAddr, PerIpEntry>,
    stats: RateLimiterStats,
    last_cleanup: Mutex<Instant>,
}

impl RateLimiter {
    #[must_use]
    pub fn new(config: RateLimiterConfig) -> Self {
        let now = Instant::now();
        let global = (config.global_rps > 0.0)
            .then(|| Mutex::new(TokenBucket::new(config.global_rps * config.burst_multiplier, config.global_rps, now)));
        Self { config, global, per_ip: DashMap::new(), stats: RateLimiterStats::default(), last_cleanup: Mutex::new(now) }
    }

    #[must_use]
    pub fn stats(&self) -> &RateLimiterStats {
        &self.stats
    }

    /// Checks both stages in order: global first, then per-IP. Consumes a
    /// token from each enabled stage only when both would allow.
    pub fn check(&self, ip: IpAddr, now: Instant) -> Result<(), RateLimitError> {
        self.maybe_cleanup(now);

        if let Some(global) = &self.global {
            let mut bucket = global.lock().expect("global rate limit mutex poisoned");
            if !bucket.try_consume(now) {
                self.stats.denied_global.fetch_add(1, Ordering::Relaxed);
                return Err(RateLimitError::Global);
            }
        }

        if self.config.per_ip_rps > 0.0 {
            match self.check_per_ip(ip, now) {
                Ok(true) => {}
                Ok(false) => {
                    self.stats.denied_per_ip.fetch_add(1, Ordering::Relaxed);
                    return Err(RateLimitError::PerIp);
                }
                Err(()) => {
                    // Fail-open: the entry couldn't be inserted (e.g. the
                    // map is at capacity and eviction raced), so this
                    // check is skipped for this request rather than
                    // denying a client we have no record for.
                }
            }
        }

        self.stats.allowed.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Returns `Ok(true/false)` for an existing or freshly inserted
    /// bucket, or `Err(())` if insertion failed and the caller should
    /// fail open.
    fn check_per_ip(&self, ip: IpAddr, now: Instant) -> Result<bool, ()> {
        if let Some(mut entry) = self.per_ip.get_mut(&ip) {
            entry.last_seen = now;
            return Ok(entry.bucket.try_consume(now));
        }

        if self.per_ip.len() >= self.config.max_tracked_ips {
            self.evict_lru();
        }
        if self.per_ip.len() >= self.config.max_tracked_ips {
            // Still at capacity after eviction: fail open rather than
            // deny a client with no tracked state.
            return Err(());
        }

        let capacity = self.config.per_ip_rps * self.config.burst_multiplier;
        let mut bucket = TokenBucket::new(capacity, self.config.per_ip_rps, now);
        let allowed = bucket.try_consume(now);
        self.per_ip.insert(ip, PerIpEntry { bucket, last_seen: now });
        Ok(allowed)
    }

    /// Unconditionally evicts the least-recently-seen entry so a new IP
    /// always gets a slot at capacity, even under sustained traffic where
    /// every tracked IP's `last_seen` stays fresh.
    fn evict_lru(&self) {
        if let Some(oldest_ip) = self
            .per_ip
            .iter()
            .min_by_key(|entry| entry.last_seen)
            .map(|entry| *entry.key())
        {
            self.per_ip.remove(&oldest_ip);
        }
    }

    fn maybe_cleanup(&self, now: Instant) {
        let mut last_cleanup = self.last_cleanup.lock().expect("cleanup mutex poisoned");
        if now.saturating_duration_since(*last_cleanup) < self.config.cleanup_interval {
            return;
        }
        *last_cleanup = now;
        drop(last_cleanup);

        let cutoff = self.config.cleanup_interval;
        self.per_ip.retain(|_, entry| now.saturating_duration_since(entry.last_seen) < cutoff);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> RateLimiterConfig {
        RateLimiterConfig {
            global_rps: 2.0,
            per_ip_rps: 1.0,
            burst_multiplier: 1.0,
            cleanup_interval: Duration::from_secs(60),
            max_tracked_ips: 1000,
        }
    }

    fn ip(n: u8) -> IpAddr {
        IpAddr::from([n, n, n, n])
    }

    #[test]
    fn global_limit_denies_once_exhausted() {
        let limiter = RateLimiter::new(config());
        let now = Instant::now();
        assert!(limiter.check(ip(1), now).is_ok());
        assert!(limiter.check(ip(2), now).is_ok());
        assert_eq!(limiter.check(ip(3), now), Err(RateLimitError::Global));
    }

    #[test]
    fn capacity_eviction_frees_a_slot_even_when_every_tracked_ip_is_fresh() {
        let mut cfg = config();
        cfg.global_rps = 1_000_000.0;
        cfg.max_tracked_ips = 2;
        let limiter = RateLimiter::new(cfg);
        let now = Instant::now();
        let later = now + Duration::from_millis(1);
        assert!(limiter.check(ip(1), now).is_ok());
        assert!(limiter.check(ip(2), later).is_ok());
        // At capacity with both entries freshly seen. Without unconditional
        // LRU eviction this would fail open forever instead of tracking ip(3).
        assert!(limiter.check(ip(3), later).is_ok());
        assert_eq!(limiter.per_ip.len(), 2);
        assert!(!limiter.per_ip.contains_key(&ip(1)));
    }

    #[test]
    fn per_ip_limit_denies_a_single_busy_client_without_affecting_others() {
        let mut cfg = config();
        cfg.global_rps = 100.0;
        let limiter = RateLimiter::new(cfg);
        let now = Instant::now();
        assert!(limiter.check(ip(1), now).is_ok());
        assert_eq!(limiter.check(ip(1), now), Err(RateLimitError::PerIp));
        assert!(limiter.check(ip(2), now).is_ok());
    }

    #[test]
    fn disabling_per_ip_limiting_allows_unbounded_requests_from_one_ip() {
        let mut cfg = config();
        cfg.global_rps = 100.0;
        cfg.per_ip_rps = 0.0;
        let limiter = RateLimiter::new(cfg);
        let now = Instant::now();
        for _ in 0..10 {
            assert!(limiter.check(ip(1), now).is_ok());
        }
    }

    #[test]
    fn stats_track_allow_and_deny_outcomes() {
        let limiter = RateLimiter::new(config());
        let now = Instant::now();
        limiter.check(ip(1), now).unwrap();
        limiter.check(ip(2), now).unwrap();
        let _ = limiter.check(ip(3), now);
        assert_eq!(limiter.stats().allowed.load(Ordering::Relaxed), 2);
        assert_eq!(limiter.stats().denied_global.load(Ordering::Relaxed), 1);
    }
}
