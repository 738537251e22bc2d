//! Loss detection and congestion backoff: a simple NewReno-style scheme
//! rather than full RFC 9002 recovery. Tracks in-flight packets per
//! space, declares loss by a packet-number threshold, and halves the
//! congestion window on loss with slow-start growth otherwise.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

/// Reordering threshold: a packet is declared lost once a packet number
/// this much higher has been acknowledged (RFC 9002 §6.1's default).
const PACKET_THRESHOLD: u64 = 3;
const MIN_CONGESTION_WINDOW: u64 = 2 * 1200;
const INITIAL_CONGESTION_WINDOW: u64 = 10 * 1200;

#[derive(Debug, Clone, Copy)]
struct Sent {
    sent_at: Instant,
    size: u64,
}

#[derive(Debug)]
pub struct CongestionController {
    window: u64,
    slow_start: bool,
    in_flight: BTreeMap<u64, Sent>,
    bytes_in_flight: u64,
}

impl Default for CongestionController {
    fn default() -> Self {
        Self::new()
    }
}

impl CongestionController {
    #[must_use]
    pub fn new() -> Self {
        Self { window: INITIAL_CONGESTION_WINDOW, slow_start: true, in_flight: BTreeMap::new(), bytes_in_flight: 0 }
    }

    #[must_use]
    pub fn window(&self) -> u64 {
        self.window
    }

    #[must_use]
    pub fn can_send(&self, size: u64) -> bool {
        self.bytes_in_flight + size <= self.window
    }

    pub fn on_packet_sent(&mut self, packet_number: u64, size: u64, sent_at: Instant) {
        self.in_flight.insert(packet_number, Sent { sent_at, size });
        self.bytes_in_flight += size;
    }

    /// Acknowledges everything up to and including `largest_acked`,
    /// growing the window (slow-start: by the bytes acked; congestion
    /// avoidance: by one packet per window's worth of acks).
    pub fn on_ack(&mut self, largest_acked: u64) {
        let acked: Vec<u64> = self.in_flight.range(..=largest_acked).map(|(&pn, _)| pn).collect();
        for pn in acked {
            if let Some(sent) = self.in_flight.remove(&pn) {
                self.bytes_in_flight = self.bytes_in_flight.saturating_sub(sent.size);
                if self.slow_start {
                    self.window += sent.size;
                } else {
                    self.window += (1200 * sent.size) / self.window.max(1);
                }
            }
        }
        self.detect_and_apply_loss(largest_acked);
    }

    fn detect_and_apply_loss(&mut self, largest_acked: u64) {
        let lost: Vec<u64> = self
            .in_flight
            .range(..largest_acked.saturating_sub(PACKET_THRESHOLD.saturating_sub(1)))
            .map(|(&pn, _)| pn)
            .collect();
        if lost.is_empty() {
            return;
        }
        for pn in lost {
            if let Some(sent) = self.in_flight.remove(&pn) {
                self.bytes_in_flight = self.bytes_in_flight.saturating_sub(sent.size);
            }
        }
        self.on_congestion_event();
    }

    fn on_congestion_event(&mut self) {
        self.slow_start = false;
        self.window = (self.window / 2).max(MIN_CONGESTION_WINDOW);
    }

    /// Probe-timeout backoff: doubles the given base PTO on repeated
    /// expiry, a capped exponential backoff in place of full RFC 9002
    /// timers.
    #[must_use]
    pub fn pto_backoff(base: Duration, consecutive_expirations: u32) -> Duration {
        let factor = 1u32.checked_shl(consecutive_expirations.min(6)).unwrap_or(1 << 6);
        base * factor
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_grows_in_slow_start_on_ack() {
        let mut cc = CongestionController::new();
        let start = Instant::now();
        cc.on_packet_sent(0, 1200, start);
        let window_before = cc.window();
        cc.on_ack(0);
        assert!(cc.window() > window_before);
    }

    #[test]
    fn packets_far_behind_the_largest_acked_are_declared_lost_and_halve_the_window() {
        let mut cc = CongestionController::new();
        let start = Instant::now();
        for pn in 0..10 {
            cc.on_packet_sent(pn, 1200, start);
        }
        let window_before = cc.window();
        cc.on_ack(9);
        assert!(cc.window() < window_before);
    }

    #[test]
    fn window_never_drops_below_the_minimum() {
        let mut cc = CongestionController::new();
        let start = Instant::now();
        for round in 0..20 {
            for pn in 0..10 {
                cc.on_packet_sent(round * 100 + pn, 1200, start);
            }
            cc.on_ack(round * 100 + 9);
        }
        assert!(cc.window() >= MIN_CONGESTION_WINDOW);
    }

    #[test]
    fn pto_backoff_doubles_and_caps() {
        let base = Duration::from_millis(100);
        assert_eq!(CongestionController::pto_backoff(base, 0), base);
        assert_eq!(CongestionController::pto_backoff(base, 1), base * 2);
        assert_eq!(CongestionController::pto_backoff(base, 2), base * 4);
    }
}
