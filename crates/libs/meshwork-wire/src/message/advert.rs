//! Service, storage, compute and I2P advertisements.

use crate::error::CodecError;
use crate::wire::{WireReader, WireWriter};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceAdvertisement {
    pub node_id: String,
    pub service_name: String,
    pub endpoint_port: i32,
    pub version: i32,
    pub metadata: String,
    pub timestamp: i64,
}

impl ServiceAdvertisement {
    pub(crate) fn write(&self, w: &mut WireWriter) {
        w.write_string(&self.node_id);
        w.write_string(&self.service_name);
        w.write_i32(self.endpoint_port);
        w.write_i32(self.version);
        w.write_string(&self.metadata);
        w.write_i64(self.timestamp);
    }

    pub(crate) fn read(r: &mut WireReader<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            node_id: r.read_string()?,
            service_name: r.read_string()?,
            endpoint_port: r.read_i32()?,
            version: r.read_i32()?,
            metadata: r.read_string()?,
            timestamp: r.read_i64()?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageAdvertisement {
    pub node_id: String,
    pub capacity_bytes: i64,
    pub used_bytes: i64,
    pub replication_factor: i32,
    pub is_active: bool,
    pub timestamp: i64,
}

impl StorageAdvertisement {
    pub(crate) fn write(&self, w: &mut WireWriter) {
        w.write_string(&self.node_id);
        w.write_i64(self.capacity_bytes);
        w.write_i64(self.used_bytes);
        w.write_i32(self.replication_factor);
        w.write_bool(self.is_active);
        w.write_i64(self.timestamp);
    }

    pub(crate) fn read(r: &mut WireReader<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            node_id: r.read_string()?,
            capacity_bytes: r.read_i64()?,
            used_bytes: r.read_i64()?,
            replication_factor: r.read_i32()?,
            is_active: r.read_bool()?,
            timestamp: r.read_i64()?,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ComputeTaskRequest {
    pub task_id: String,
    pub requester_node_id: String,
    pub required_cpu: f32,
    pub required_ram_bytes: i64,
    pub deadline_ms: i64,
    pub task_descriptor: String,
    pub timestamp: i64,
}

impl ComputeTaskRequest {
    pub(crate) fn write(&self, w: &mut WireWriter) {
        w.write_string(&self.task_id);
        w.write_string(&self.requester_node_id);
        w.write_f32(self.required_cpu);
        w.write_i64(self.required_ram_bytes);
        w.write_i64(self.deadline_ms);
        w.write_string(&self.task_descriptor);
        w.write_i64(self.timestamp);
    }

    pub(crate) fn read(r: &mut WireReader<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            task_id: r.read_string()?,
            requester_node_id: r.read_string()?,
            required_cpu: r.read_f32()?,
            required_ram_bytes: r.read_i64()?,
            deadline_ms: r.read_i64()?,
            task_descriptor: r.read_string()?,
            timestamp: r.read_i64()?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct I2pRouterAdvertisement {
    pub node_id: String,
    pub router_identity: String,
    pub is_floodfill: bool,
    pub tunnel_count: i32,
    pub timestamp: i64,
}

impl I2pRouterAdvertisement {
    pub(crate) fn write(&self, w: &mut WireWriter) {
        w.write_string(&self.node_id);
        w.write_string(&self.router_identity);
        w.write_bool(self.is_floodfill);
        w.write_i32(self.tunnel_count);
        w.write_i64(self.timestamp);
    }

    pub(crate) fn read(r: &mut WireReader<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            node_id: r.read_string()?,
            router_identity: r.read_string()?,
            is_floodfill: r.read_bool()?,
            tunnel_count: r.read_i32()?,
            timestamp: r.read_i64()?,
        })
    }
}
