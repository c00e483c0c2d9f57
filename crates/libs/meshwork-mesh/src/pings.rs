//! Neighbor latency measurement: pending ping probes and measured rtts.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use meshwork_wire::VirtualAddress;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingPing {
    pub to: VirtualAddress,
    pub message_id: u32,
    pub sent_at: Instant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NeighborLatency {
    pub rtt_ms: i64,
    pub measured_at: Instant,
}

/// Pending probes plus the latest rtt per neighbor. Removal is by
/// `(neighbor, message id)` predicate and idempotent; latency writes are
/// last-write-wins.
#[derive(Default)]
pub struct PingTracker {
    pending: Vec<PendingPing>,
    latency: HashMap<VirtualAddress, NeighborLatency>,
}

impl PingTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_sent(&mut self, to: VirtualAddress, message_id: u32, now: Instant) {
        self.pending.push(PendingPing { to, message_id, sent_at: now });
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Match a pong against its probe. Returns the measured rtt (floored at
    /// 1 ms) when a matching probe existed; an unmatched pong is the caller's
    /// cue to drop silently.
    pub fn complete(
        &mut self,
        from: VirtualAddress,
        reply_to_message_id: u32,
        now: Instant,
    ) -> Option<i64> {
        let index = self
            .pending
            .iter()
            .position(|ping| ping.to == from && ping.message_id == reply_to_message_id)?;
        let ping = self.pending.swap_remove(index);

        let rtt_ms = i64::try_from(now.duration_since(ping.sent_at).as_millis())
            .unwrap_or(i64::MAX)
            .max(1);
        self.latency.insert(from, NeighborLatency { rtt_ms, measured_at: now });
        Some(rtt_ms)
    }

    /// Drop probes that outlived the timeout. Losing a probe is not a
    /// neighbor-lost signal; the routing sweep owns that.
    pub fn evict_stale(&mut self, now: Instant, timeout: Duration) -> usize {
        let before = self.pending.len();
        self.pending.retain(|ping| now.duration_since(ping.sent_at) <= timeout);
        before - self.pending.len()
    }

    pub fn rtt_ms(&self, neighbor: VirtualAddress) -> Option<i64> {
        self.latency.get(&neighbor).map(|entry| entry.rtt_ms)
    }

    pub fn latency(&self, neighbor: VirtualAddress) -> Option<NeighborLatency> {
        self.latency.get(&neighbor).copied()
    }
}
