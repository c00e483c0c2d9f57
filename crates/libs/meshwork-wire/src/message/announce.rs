//! Node and gateway announcements — the payloads the intelligence
//! aggregator counts role populations from.

use crate::error::CodecError;
use crate::types::{
    BatteryHealth, BatteryInfo, ChargingSource, GatewayType, MeshRole, NodeResources, NodeType,
    PowerState, ThermalState,
};
use crate::wire::{WireReader, WireWriter};

/// Full self-description a node gossips: identity, capability snapshot,
/// claimed roles, and its current neighborhood.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeAnnouncement {
    pub node_id: String,
    pub node_type: NodeType,
    pub fitness: f32,
    pub centrality: f32,
    pub roles: Vec<MeshRole>,
    pub resources: NodeResources,
    pub battery: BatteryInfo,
    pub thermal: ThermalState,
    pub timestamp: i64,
    pub sent_time: i64,
    pub neighbors: Vec<String>,
}

impl NodeAnnouncement {
    pub(crate) fn write(&self, w: &mut WireWriter) {
        w.write_string(&self.node_id);
        w.write_u32(self.node_type as u32);
        w.write_f32(self.fitness);
        w.write_f32(self.centrality);
        w.write_i32(self.roles.len() as i32);
        for role in &self.roles {
            w.write_u32(*role as u32);
        }
        write_resources(&self.resources, w);
        write_battery(&self.battery, w);
        w.write_u32(self.thermal as u32);
        w.write_i64(self.timestamp);
        w.write_i64(self.sent_time);
        w.write_string_set(&self.neighbors);
    }

    pub(crate) fn read(r: &mut WireReader<'_>) -> Result<Self, CodecError> {
        let node_id = r.read_string()?;
        let node_type = NodeType::from_ordinal(r.read_u32()?)?;
        let fitness = r.read_f32()?;
        let centrality = r.read_f32()?;

        let role_count = r.read_count(4)?;
        let mut roles = Vec::with_capacity(role_count);
        for _ in 0..role_count {
            roles.push(MeshRole::from_ordinal(r.read_u32()?)?);
        }

        let resources = read_resources(r)?;
        let battery = read_battery(r)?;
        let thermal = ThermalState::from_ordinal(r.read_u32()?)?;
        let timestamp = r.read_i64()?;
        let sent_time = r.read_i64()?;
        let neighbors = r.read_string_set()?;

        Ok(Self {
            node_id,
            node_type,
            fitness,
            centrality,
            roles,
            resources,
            battery,
            thermal,
            timestamp,
            sent_time,
            neighbors,
        })
    }
}

fn write_resources(resources: &NodeResources, w: &mut WireWriter) {
    w.write_f32(resources.available_cpu);
    w.write_i64(resources.available_ram_bytes);
    w.write_i64(resources.available_bandwidth_bps);
    w.write_i64(resources.storage_offered_bytes);
    w.write_i32(resources.battery_level);
    w.write_bool(resources.thermal_throttling);
    w.write_u32(resources.power_state as u32);
    w.write_string_set(&resources.network_interfaces);
}

fn read_resources(r: &mut WireReader<'_>) -> Result<NodeResources, CodecError> {
    Ok(NodeResources {
        available_cpu: r.read_f32()?,
        available_ram_bytes: r.read_i64()?,
        available_bandwidth_bps: r.read_i64()?,
        storage_offered_bytes: r.read_i64()?,
        battery_level: r.read_i32()?,
        thermal_throttling: r.read_bool()?,
        power_state: PowerState::from_ordinal(r.read_u32()?)?,
        network_interfaces: r.read_string_set()?,
    })
}

fn write_battery(battery: &BatteryInfo, w: &mut WireWriter) {
    w.write_i32(battery.level);
    w.write_bool(battery.is_charging);
    w.write_i32(battery.temperature_celsius);
    w.write_u32(battery.health as u32);
    // Absent charging source travels as -1.
    match battery.charging_source {
        Some(source) => w.write_i32(source as i32),
        None => w.write_i32(-1),
    }
}

fn read_battery(r: &mut WireReader<'_>) -> Result<BatteryInfo, CodecError> {
    let level = r.read_i32()?;
    let is_charging = r.read_bool()?;
    let temperature_celsius = r.read_i32()?;
    let health = BatteryHealth::from_ordinal(r.read_u32()?)?;
    let source_ordinal = r.read_i32()?;
    let charging_source = if source_ordinal < 0 {
        None
    } else {
        Some(ChargingSource::from_ordinal(source_ordinal as u32)?)
    };

    Ok(BatteryInfo { level, is_charging, temperature_celsius, health, charging_source })
}

/// Gateway capability claim. Deactivation is announced with
/// `is_active = false` rather than a separate message kind.
#[derive(Debug, Clone, PartialEq)]
pub struct GatewayAnnouncement {
    pub node_id: String,
    pub gateway_type: GatewayType,
    pub upload_mbps: f32,
    pub download_mbps: f32,
    pub avg_latency_ms: i32,
    pub jitter_ms: i32,
    pub is_active: bool,
    /// Comma-joined protocol names, e.g. `"http,https,dns"`.
    pub protocols: String,
    pub timestamp: i64,
}

impl GatewayAnnouncement {
    pub(crate) fn write(&self, w: &mut WireWriter) {
        w.write_string(&self.node_id);
        w.write_u8(self.gateway_type as u8);
        w.write_f32(self.upload_mbps);
        w.write_f32(self.download_mbps);
        w.write_i32(self.avg_latency_ms);
        w.write_i32(self.jitter_ms);
        w.write_bool(self.is_active);
        w.write_string(&self.protocols);
        w.write_i64(self.timestamp);
    }

    pub(crate) fn read(r: &mut WireReader<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            node_id: r.read_string()?,
            gateway_type: GatewayType::from_byte(r.read_u8()?)?,
            upload_mbps: r.read_f32()?,
            download_mbps: r.read_f32()?,
            avg_latency_ms: r.read_i32()?,
            jitter_ms: r.read_i32()?,
            is_active: r.read_bool()?,
            protocols: r.read_string()?,
            timestamp: r.read_i64()?,
        })
    }
}
