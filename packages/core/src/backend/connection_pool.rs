//! Per-backend pooled-connection cache. `get` returns the most
//! recently used idle, non-stale connection or makes room for a new one
//! up to `max_connections_per_backend`; a background tick evicts
//! connections that have sat idle longer than `max_idle_time`.

use std::time::{Duration, Instant};

use crate::error::BackendError;

pub struct PooledConnection<C> {
    pub conn: C,
    pub last_used: Instant,
    pub idle: bool,
}

pub struct ConnectionPool<C> {
    max_per_backend: usize,
    max_idle_time: Duration,
    slots: Vec<PooledConnection<C>>,
}

impl<C> ConnectionPool<C> {
    #[must_use]
    pub fn new(max_per_backend: usize, max_idle_time: Duration) -> Self {
        Self { max_per_backend, max_idle_time, slots: Vec::new() }
    }

    /// Returns the most-recently-used idle connection already in the
    /// pool, if any exist and none need evicting first.
    pub fn take_idle(&mut self, now: Instant) -> Option<C> {
        self.evict_stale(now);
        let idx = self
            .slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.idle)
            .max_by_key(|(_, slot)| slot.last_used)
            .map(|(idx, _)| idx)?;
        let mut slot = self.slots.swap_remove(idx);
        slot.idle = false;
        Some(slot.conn)
    }

    /// Reserves a slot for a newly created connection. Fails if the pool
    /// is already at capacity with no idle connections to reclaim.
    pub fn reserve_slot(&mut self) -> Result<(), BackendError> {
        if self.slots.len() >= self.max_per_backend {
            return Err(BackendError::PoolExhausted);
        }
        Ok(())
    }

    pub fn insert_active(&mut self, conn: C, now: Instant) {
        self.slots.push(PooledConnection { conn, last_used: now, idle: false });
    }

    /// Marks a connection idle and timestamps it, identified by a
    /// caller-supplied predicate (connections aren't `Eq`/hashable in
    /// general, so the pool can't look them up by value).
    pub fn return_idle(&mut self, matches: impl Fn(&C) -> bool, now: Instant) {
        if let Some(slot) = self.slots.iter_mut().find(|slot| matches(&slot.conn)) {
            slot.idle = true;
            slot.last_used = now;
        }
    }

    pub fn remove(&mut self, matches: impl Fn(&C) -> bool) {
        self.slots.retain(|slot| !matches(&slot.conn));
    }

    /// Evicts every idle connection that has sat longer than
    /// `max_idle_time`; called both from `take_idle` and from the
    /// periodic background tick.
    pub fn evict_stale(&mut self, now: Instant) {
        self.slots.retain(|slot| !(slot.idle && now.saturating_duration_since(slot.last_used) > self.max_idle_time));
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}
