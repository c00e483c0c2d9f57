//! Capability port: the seam to platform probes (battery, thermal, network,
//! storage). Out-of-tree adapters implement [`CapabilityPort`]; the snapshot
//! builder clamps whatever they report into documented ranges.
//!
//! Implementations must not fail — when a probe is unavailable (sandbox,
//! tests, stripped-down hardware) they return the documented fallbacks
//! instead. Probes that can take longer than a few tens of milliseconds
//! should be prefetched and cached inside the adapter.

use async_trait::async_trait;

use meshwork_wire::types::{BatteryHealth, BatteryInfo, NodeResources, PowerState, ThermalState};

use crate::time::now_epoch_millis;

/// Fallbacks used when a platform probe has nothing better to report.
pub const FALLBACK_CPU_AVAILABLE: f32 = 0.5;
pub const FALLBACK_BATTERY_LEVEL: i32 = 50;
pub const FALLBACK_STABILITY: f32 = 0.8;
pub const FALLBACK_NETWORK_QUALITY: f32 = 0.5;

#[async_trait]
pub trait CapabilityPort: Send + Sync {
    /// Fraction of CPU currently available, 0..=1.
    async fn available_cpu(&self) -> f32 {
        FALLBACK_CPU_AVAILABLE
    }

    async fn available_memory_bytes(&self) -> i64 {
        0
    }

    async fn total_memory_bytes(&self) -> i64 {
        0
    }

    async fn battery(&self) -> BatteryInfo {
        BatteryInfo {
            level: FALLBACK_BATTERY_LEVEL,
            is_charging: false,
            temperature_celsius: 25,
            health: BatteryHealth::Good,
            charging_source: None,
        }
    }

    async fn thermal_state(&self) -> ThermalState {
        ThermalState::Cool
    }

    async fn estimated_bandwidth_bps(&self) -> i64 {
        0
    }

    async fn network_interfaces(&self) -> Vec<String> {
        Vec::new()
    }

    /// Bytes this node is willing to offer to distributed storage.
    async fn storage_offered_bytes(&self) -> i64 {
        0
    }

    /// Historic link stability, 0..=1.
    async fn stability_score(&self) -> f32 {
        FALLBACK_STABILITY
    }

    /// Current connection quality, 0..=1.
    async fn network_quality(&self) -> f32 {
        FALLBACK_NETWORK_QUALITY
    }
}

/// Pure-fallback port for sandboxes and tests.
#[derive(Debug, Default, Clone, Copy)]
pub struct FallbackCapabilities;

#[async_trait]
impl CapabilityPort for FallbackCapabilities {}

/// Immutable capability picture taken at one instant. Rebuilt for every
/// role pass, never stored.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeCapabilitySnapshot {
    pub node_id: String,
    pub resources: NodeResources,
    pub battery: BatteryInfo,
    pub thermal: ThermalState,
    pub network_quality: f32,
    pub stability: f32,
    pub timestamp: i64,
}

impl NodeCapabilitySnapshot {
    pub fn has_stable_connection(&self) -> bool {
        self.network_quality > 0.7 && self.stability > 0.6
    }
}

/// Query every probe once and clamp the answers into range.
pub async fn build_snapshot(port: &dyn CapabilityPort, node_id: &str) -> NodeCapabilitySnapshot {
    let available_cpu = port.available_cpu().await.clamp(0.0, 1.0);
    let battery = clamp_battery(port.battery().await);
    let thermal = port.thermal_state().await;
    let network_quality = port.network_quality().await.clamp(0.0, 1.0);
    let stability = port.stability_score().await.clamp(0.0, 1.0);

    let resources = NodeResources {
        available_cpu,
        available_ram_bytes: port.available_memory_bytes().await.max(0),
        available_bandwidth_bps: port.estimated_bandwidth_bps().await.max(0),
        storage_offered_bytes: port.storage_offered_bytes().await.max(0),
        battery_level: battery.level,
        thermal_throttling: thermal.is_constrained(),
        power_state: power_state_of(&battery),
        network_interfaces: port.network_interfaces().await,
    };

    NodeCapabilitySnapshot {
        node_id: node_id.to_string(),
        resources,
        battery,
        thermal,
        network_quality,
        stability,
        timestamp: now_epoch_millis(),
    }
}

fn clamp_battery(mut battery: BatteryInfo) -> BatteryInfo {
    battery.level = battery.level.clamp(0, 100);
    battery
}

fn power_state_of(battery: &BatteryInfo) -> PowerState {
    if battery.is_charging {
        PowerState::PluggedIn
    } else if battery.level > 70 {
        PowerState::BatteryHigh
    } else if battery.level > 40 {
        PowerState::BatteryMedium
    } else if battery.level > 15 {
        PowerState::BatteryLow
    } else {
        PowerState::BatteryCritical
    }
}
