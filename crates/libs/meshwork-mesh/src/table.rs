//! Routing table: destination address to best known originator record.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use meshwork_wire::{OriginatorMessage, VirtualAddress};

use crate::iface::InterfaceId;

/// Best originator accepted from one source, plus where it came from. The
/// `last_hop` neighbor is the reverse path back toward the source.
#[derive(Debug, Clone)]
pub struct OriginatorRecord {
    pub message: OriginatorMessage,
    pub time_received: Instant,
    pub last_hop: VirtualAddress,
    pub hop_count: u8,
    pub iface: InterfaceId,
}

/// What happened to an incoming originator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AcceptOutcome {
    /// The record was created or replaced.
    pub accepted: bool,
    /// First contact from a direct neighbor; worth an immediate origination
    /// pass so the new neighbor learns us quickly.
    pub new_neighbor: bool,
}

pub type RoutesSnapshot = Arc<HashMap<VirtualAddress, OriginatorRecord>>;

/// Keyed by the originator's `fromAddr`. Values are strictly replaced, never
/// merged: per key, `(sent_time, -hop_count)` only ever moves forward.
#[derive(Default)]
pub struct RoutingTable {
    map: HashMap<VirtualAddress, OriginatorRecord>,
}

impl RoutingTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn get(&self, destination: &VirtualAddress) -> Option<&OriginatorRecord> {
        self.map.get(destination)
    }

    /// Reverse-path neighbor for a destination, if one is known.
    pub fn next_hop(&self, destination: &VirtualAddress) -> Option<VirtualAddress> {
        self.map.get(destination).map(|record| record.last_hop)
    }

    /// Direct neighbors: sources whose originator arrived in one hop.
    pub fn neighbors(&self) -> Vec<VirtualAddress> {
        self.map
            .iter()
            .filter(|(_, record)| record.hop_count == 1)
            .map(|(addr, _)| *addr)
            .collect()
    }

    /// Apply the replacement rule to an incoming originator. Strictly better
    /// means a newer `sent_time`, or the same `sent_time` over fewer hops;
    /// ties never replace.
    pub fn accept(
        &mut self,
        from: VirtualAddress,
        message: OriginatorMessage,
        last_hop: VirtualAddress,
        hop_count: u8,
        iface: InterfaceId,
        now: Instant,
    ) -> AcceptOutcome {
        let new_neighbor = hop_count == 1 && !self.map.contains_key(&from);

        let accepted = match self.map.get(&from) {
            Some(current) => {
                message.sent_time > current.message.sent_time
                    || (message.sent_time == current.message.sent_time
                        && hop_count < current.hop_count)
            }
            None => true,
        };

        if accepted {
            log::debug!(
                "table: {} reachable over {} hops via {} on {}",
                from,
                hop_count,
                last_hop,
                iface,
            );
            self.map.insert(
                from,
                OriginatorRecord { message, time_received: now, last_hop, hop_count, iface },
            );
        }

        AcceptOutcome { accepted, new_neighbor }
    }

    /// Evict records that went quiet. Gone until rediscovered; there is no
    /// grace reinstatement.
    pub fn sweep(&mut self, now: Instant, threshold: Duration) -> Vec<VirtualAddress> {
        let mut lost = Vec::new();
        self.map.retain(|addr, record| {
            if now.duration_since(record.time_received) > threshold {
                lost.push(*addr);
                false
            } else {
                true
            }
        });
        lost
    }

    /// Evict every route learned through a departed interface.
    pub fn evict_iface(&mut self, iface: InterfaceId) -> Vec<VirtualAddress> {
        let mut lost = Vec::new();
        self.map.retain(|addr, record| {
            if record.iface == iface {
                lost.push(*addr);
                false
            } else {
                true
            }
        });
        lost
    }

    pub fn snapshot(&self) -> RoutesSnapshot {
        Arc::new(self.map.clone())
    }
}
