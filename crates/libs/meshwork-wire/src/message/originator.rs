//! Periodic originator announcement: the heartbeat of route discovery.

use crate::address::VirtualAddress;
use crate::error::CodecError;
use crate::wire::{WireReader, WireWriter};

/// Announcement a node emits so its existence and freshness propagate across
/// the mesh. Relays accrue path cost into `sent_time` before rebroadcasting,
/// so the freshest-looking message is also the cheapest to reach.
#[derive(Debug, Clone, PartialEq)]
pub struct OriginatorMessage {
    pub fitness_score: i32,
    pub node_role: u8,
    /// Wall-clock epoch milliseconds at origination, plus any ping-time
    /// adjustment applied by relays.
    pub sent_time: i64,
    pub neighbors: Vec<VirtualAddress>,
    pub centrality_score: f32,
}

impl OriginatorMessage {
    /// Copy with path cost accrued: the measured one-hop rtt is added onto
    /// `sent_time` before the message is stored or rebroadcast.
    pub fn with_ping_time(&self, rtt_ms: i64) -> Self {
        Self { sent_time: self.sent_time + rtt_ms, ..self.clone() }
    }

    pub(crate) fn write(&self, w: &mut WireWriter) {
        w.write_i32(self.fitness_score);
        w.write_u8(self.node_role);
        w.write_i64(self.sent_time);
        w.write_i32(self.neighbors.len() as i32);
        for neighbor in &self.neighbors {
            w.write_i32(neighbor.to_u32() as i32);
        }
        w.write_f32(self.centrality_score);
    }

    /// The fields after `sent_time` were appended to the frame after first
    /// release. A frame that ends at `sent_time` decodes with empty/zero
    /// trailing fields; a frame that continues must carry them in order.
    pub(crate) fn read(r: &mut WireReader<'_>) -> Result<Self, CodecError> {
        let fitness_score = r.read_i32()?;
        let node_role = r.read_u8()?;
        let sent_time = r.read_i64()?;

        let mut neighbors = Vec::new();
        let mut centrality_score = 0.0;

        if !r.is_empty() {
            let count = r.read_count(4)?;
            neighbors.reserve(count);
            for _ in 0..count {
                neighbors.push(VirtualAddress::new(r.read_i32()? as u32));
            }
            if !r.is_empty() {
                centrality_score = r.read_f32()?;
            }
        }

        Ok(Self { fitness_score, node_role, sent_time, neighbors, centrality_score })
    }
}
