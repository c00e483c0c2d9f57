//! Mesh-wide broadcast payloads: quorum proposals, metrics, emergencies.

use crate::error::CodecError;
use crate::types::EmergencySeverity;
use crate::wire::{WireReader, WireWriter};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuorumProposal {
    pub proposal_id: String,
    pub proposer_node_id: String,
    pub topic: String,
    pub payload: Vec<u8>,
    pub quorum_size: i32,
    pub deadline_ms: i64,
    pub timestamp: i64,
}

impl QuorumProposal {
    pub(crate) fn write(&self, w: &mut WireWriter) {
        w.write_string(&self.proposal_id);
        w.write_string(&self.proposer_node_id);
        w.write_string(&self.topic);
        w.write_bytes(&self.payload);
        w.write_i32(self.quorum_size);
        w.write_i64(self.deadline_ms);
        w.write_i64(self.timestamp);
    }

    pub(crate) fn read(r: &mut WireReader<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            proposal_id: r.read_string()?,
            proposer_node_id: r.read_string()?,
            topic: r.read_string()?,
            payload: r.read_bytes()?,
            quorum_size: r.read_i32()?,
            deadline_ms: r.read_i64()?,
            timestamp: r.read_i64()?,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NetworkMetrics {
    pub node_id: String,
    pub neighbor_count: i32,
    pub avg_latency_ms: f32,
    pub packet_loss_rate: f32,
    pub throughput_bps: i64,
    pub timestamp: i64,
}

impl NetworkMetrics {
    pub(crate) fn write(&self, w: &mut WireWriter) {
        w.write_string(&self.node_id);
        w.write_i32(self.neighbor_count);
        w.write_f32(self.avg_latency_ms);
        w.write_f32(self.packet_loss_rate);
        w.write_i64(self.throughput_bps);
        w.write_i64(self.timestamp);
    }

    pub(crate) fn read(r: &mut WireReader<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            node_id: r.read_string()?,
            neighbor_count: r.read_i32()?,
            avg_latency_ms: r.read_f32()?,
            packet_loss_rate: r.read_f32()?,
            throughput_bps: r.read_i64()?,
            timestamp: r.read_i64()?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmergencyBroadcast {
    pub origin_node_id: String,
    pub severity: EmergencySeverity,
    pub message: String,
    pub ttl_secs: i32,
    pub timestamp: i64,
}

impl EmergencyBroadcast {
    pub(crate) fn write(&self, w: &mut WireWriter) {
        w.write_string(&self.origin_node_id);
        w.write_u32(self.severity as u32);
        w.write_string(&self.message);
        w.write_i32(self.ttl_secs);
        w.write_i64(self.timestamp);
    }

    pub(crate) fn read(r: &mut WireReader<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            origin_node_id: r.read_string()?,
            severity: EmergencySeverity::from_ordinal(r.read_u32()?)?,
            message: r.read_string()?,
            ttl_secs: r.read_i32()?,
            timestamp: r.read_i64()?,
        })
    }
}
