//! Gossip intelligence: role populations and utilization, counted from what
//! the mesh actually announces. Local guesses never enter these figures.

use std::collections::{BTreeSet, HashMap};
use std::time::{Duration, Instant};

use meshwork_wire::message::{NetworkMetrics, NodeAnnouncement, StorageAdvertisement};
use meshwork_wire::types::MeshRole;

/// Aggregated mesh-wide picture at one instant.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MeshIntelligence {
    pub total_nodes: usize,
    pub active_gateways: usize,
    pub active_storage_nodes: usize,
    pub active_compute_nodes: usize,
    pub network_load: f32,
    pub storage_utilization: f32,
    pub compute_utilization: f32,
}

impl MeshIntelligence {
    pub fn needs_more_gateways(&self) -> bool {
        (self.active_gateways as f32) < self.total_nodes as f32 * 0.2 || self.network_load > 0.8
    }

    pub fn needs_more_storage(&self) -> bool {
        (self.active_storage_nodes as f32) < self.total_nodes as f32 * 0.3
            || self.storage_utilization > 0.8
    }

    pub fn needs_more_compute(&self) -> bool {
        (self.active_compute_nodes as f32) < self.total_nodes as f32 * 0.25
            || self.compute_utilization > 0.8
    }
}

struct PopulationEntry {
    roles: BTreeSet<MeshRole>,
    available_cpu: f32,
    sent_time: i64,
    seen_at: Instant,
}

struct StorageEntry {
    capacity_bytes: i64,
    used_bytes: i64,
    seen_at: Instant,
}

struct LoadEntry {
    load: f32,
    seen_at: Instant,
}

/// Counts one delta per distinct announcer, deduplicated by
/// `(node id, sent time)`. Announcers that go quiet decay out after the
/// configured horizon (twice the origination interval times the hop limit,
/// the longest a fresh announcement can take to reach us twice over).
pub struct IntelligenceAggregator {
    horizon: Duration,
    nodes: HashMap<String, PopulationEntry>,
    storage: HashMap<String, StorageEntry>,
    load: HashMap<String, LoadEntry>,
}

impl IntelligenceAggregator {
    pub fn new(origination_interval: Duration, max_hops: u8) -> Self {
        Self {
            horizon: origination_interval * 2 * u32::from(max_hops.max(1)),
            nodes: HashMap::new(),
            storage: HashMap::new(),
            load: HashMap::new(),
        }
    }

    pub fn with_horizon(horizon: Duration) -> Self {
        Self { horizon, nodes: HashMap::new(), storage: HashMap::new(), load: HashMap::new() }
    }

    pub fn horizon(&self) -> Duration {
        self.horizon
    }

    /// Fold in one node announcement. Repeats of the same
    /// `(node id, sent time)` are ignored.
    pub fn observe_announcement(&mut self, announcement: &NodeAnnouncement, now: Instant) {
        if let Some(existing) = self.nodes.get(&announcement.node_id) {
            if existing.sent_time == announcement.sent_time {
                return;
            }
        }

        self.nodes.insert(
            announcement.node_id.clone(),
            PopulationEntry {
                roles: announcement.roles.iter().copied().collect(),
                available_cpu: announcement.resources.available_cpu.clamp(0.0, 1.0),
                sent_time: announcement.sent_time,
                seen_at: now,
            },
        );
    }

    pub fn observe_storage(&mut self, advert: &StorageAdvertisement, now: Instant) {
        if !advert.is_active {
            self.storage.remove(&advert.node_id);
            return;
        }
        self.storage.insert(
            advert.node_id.clone(),
            StorageEntry {
                capacity_bytes: advert.capacity_bytes.max(0),
                used_bytes: advert.used_bytes.max(0),
                seen_at: now,
            },
        );
    }

    pub fn observe_metrics(&mut self, metrics: &NetworkMetrics, now: Instant) {
        // Congestion proxy from what peers measure on their own links.
        let latency_load = (metrics.avg_latency_ms / 500.0).clamp(0.0, 1.0);
        let loss_load = metrics.packet_loss_rate.clamp(0.0, 1.0);
        self.load.insert(
            metrics.node_id.clone(),
            LoadEntry { load: latency_load * 0.5 + loss_load * 0.5, seen_at: now },
        );
    }

    /// Drop everything not refreshed within the horizon and return the
    /// resulting picture.
    pub fn intelligence(&mut self, now: Instant) -> MeshIntelligence {
        let horizon = self.horizon;
        self.nodes.retain(|_, entry| now.duration_since(entry.seen_at) <= horizon);
        self.storage.retain(|_, entry| now.duration_since(entry.seen_at) <= horizon);
        self.load.retain(|_, entry| now.duration_since(entry.seen_at) <= horizon);

        let total_nodes = self.nodes.len();
        let mut active_gateways = 0;
        let mut active_storage_nodes = 0;
        let mut active_compute_nodes = 0;
        let mut busy_cpu_sum = 0.0f32;

        for entry in self.nodes.values() {
            if entry.roles.iter().any(|role| role.is_gateway()) {
                active_gateways += 1;
            }
            if entry.roles.contains(&MeshRole::StorageNode) {
                active_storage_nodes += 1;
            }
            if entry.roles.contains(&MeshRole::ComputeNode) {
                active_compute_nodes += 1;
            }
            busy_cpu_sum += 1.0 - entry.available_cpu;
        }

        let compute_utilization =
            if total_nodes > 0 { busy_cpu_sum / total_nodes as f32 } else { 0.0 };

        let (capacity, used) = self
            .storage
            .values()
            .fold((0i64, 0i64), |(c, u), entry| (c + entry.capacity_bytes, u + entry.used_bytes));
        let storage_utilization =
            if capacity > 0 { (used as f32 / capacity as f32).clamp(0.0, 1.0) } else { 0.0 };

        let network_load = if self.load.is_empty() {
            0.0
        } else {
            self.load.values().map(|entry| entry.load).sum::<f32>() / self.load.len() as f32
        };

        MeshIntelligence {
            total_nodes,
            active_gateways,
            active_storage_nodes,
            active_compute_nodes,
            network_load,
            storage_utilization,
            compute_utilization,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meshwork_wire::types::{
        BatteryHealth, BatteryInfo, NodeResources, NodeType, PowerState, ThermalState,
    };

    fn announcement(node_id: &str, roles: Vec<MeshRole>, sent_time: i64) -> NodeAnnouncement {
        NodeAnnouncement {
            node_id: node_id.into(),
            node_type: NodeType::Smartphone,
            fitness: 0.5,
            centrality: 0.0,
            roles,
            resources: NodeResources {
                available_cpu: 0.6,
                available_ram_bytes: 0,
                available_bandwidth_bps: 0,
                storage_offered_bytes: 0,
                battery_level: 80,
                thermal_throttling: false,
                power_state: PowerState::BatteryHigh,
                network_interfaces: Vec::new(),
            },
            battery: BatteryInfo {
                level: 80,
                is_charging: false,
                temperature_celsius: 25,
                health: BatteryHealth::Good,
                charging_source: None,
            },
            thermal: ThermalState::Cool,
            timestamp: sent_time,
            sent_time,
            neighbors: Vec::new(),
        }
    }

    #[test]
    fn populations_count_one_per_distinct_announcer() {
        let mut aggregator = IntelligenceAggregator::with_horizon(Duration::from_secs(42));
        let now = Instant::now();

        aggregator.observe_announcement(
            &announcement("a", vec![MeshRole::MeshParticipant, MeshRole::TorGateway], 100),
            now,
        );
        aggregator.observe_announcement(
            &announcement("b", vec![MeshRole::MeshParticipant, MeshRole::StorageNode], 100),
            now,
        );
        aggregator
            .observe_announcement(&announcement("c", vec![MeshRole::ComputeNode], 100), now);

        let intel = aggregator.intelligence(now);
        assert_eq!(intel.total_nodes, 3);
        assert_eq!(intel.active_gateways, 1);
        assert_eq!(intel.active_storage_nodes, 1);
        assert_eq!(intel.active_compute_nodes, 1);
    }

    #[test]
    fn duplicate_sent_time_is_ignored() {
        let mut aggregator = IntelligenceAggregator::with_horizon(Duration::from_secs(42));
        let now = Instant::now();

        aggregator.observe_announcement(&announcement("a", vec![MeshRole::TorGateway], 100), now);
        // Same (node, sent_time) arriving over a second path must not
        // refresh or double-count.
        aggregator.observe_announcement(
            &announcement("a", vec![MeshRole::TorGateway], 100),
            now + Duration::from_secs(10),
        );

        let intel = aggregator.intelligence(now + Duration::from_secs(10));
        assert_eq!(intel.total_nodes, 1);
        assert_eq!(intel.active_gateways, 1);
    }

    #[test]
    fn quiet_announcers_decay_out() {
        let mut aggregator = IntelligenceAggregator::with_horizon(Duration::from_secs(42));
        let start = Instant::now();

        aggregator.observe_announcement(&announcement("a", vec![MeshRole::TorGateway], 100), start);
        aggregator.observe_announcement(
            &announcement("b", vec![MeshRole::MeshParticipant], 100),
            start + Duration::from_secs(40),
        );

        let intel = aggregator.intelligence(start + Duration::from_secs(43));
        assert_eq!(intel.total_nodes, 1, "a is past the horizon, b is not");
        assert_eq!(intel.active_gateways, 0);
    }

    #[test]
    fn fresher_announcement_replaces_roles() {
        let mut aggregator = IntelligenceAggregator::with_horizon(Duration::from_secs(42));
        let now = Instant::now();

        aggregator.observe_announcement(&announcement("a", vec![MeshRole::TorGateway], 100), now);
        aggregator.observe_announcement(
            &announcement("a", vec![MeshRole::MeshParticipant], 200),
            now + Duration::from_secs(3),
        );

        let intel = aggregator.intelligence(now + Duration::from_secs(3));
        assert_eq!(intel.total_nodes, 1);
        assert_eq!(intel.active_gateways, 0, "a no longer claims a gateway role");
    }

    #[test]
    fn need_predicates_follow_population_ratios() {
        let intel = MeshIntelligence {
            total_nodes: 10,
            active_gateways: 1,
            active_storage_nodes: 3,
            active_compute_nodes: 3,
            network_load: 0.1,
            storage_utilization: 0.1,
            compute_utilization: 0.1,
        };
        assert!(intel.needs_more_gateways(), "1 < 10 * 0.2");
        assert!(!intel.needs_more_storage(), "3 == 10 * 0.3 exactly, not below");
        assert!(!intel.needs_more_compute(), "3 > 10 * 0.25");

        let loaded = MeshIntelligence { network_load: 0.9, ..intel };
        assert!(loaded.needs_more_gateways());

        let squeezed = MeshIntelligence {
            active_gateways: 5,
            storage_utilization: 0.9,
            compute_utilization: 0.9,
            ..intel
        };
        assert!(!squeezed.needs_more_gateways());
        assert!(squeezed.needs_more_storage());
        assert!(squeezed.needs_more_compute());
    }

    #[test]
    fn storage_and_load_scalars_aggregate() {
        let mut aggregator = IntelligenceAggregator::with_horizon(Duration::from_secs(42));
        let now = Instant::now();

        aggregator.observe_storage(
            &StorageAdvertisement {
                node_id: "a".into(),
                capacity_bytes: 100,
                used_bytes: 90,
                replication_factor: 1,
                is_active: true,
                timestamp: 0,
            },
            now,
        );
        aggregator.observe_storage(
            &StorageAdvertisement {
                node_id: "b".into(),
                capacity_bytes: 100,
                used_bytes: 10,
                replication_factor: 1,
                is_active: true,
                timestamp: 0,
            },
            now,
        );
        aggregator.observe_metrics(
            &NetworkMetrics {
                node_id: "a".into(),
                neighbor_count: 2,
                avg_latency_ms: 500.0,
                packet_loss_rate: 1.0,
                throughput_bps: 0,
                timestamp: 0,
            },
            now,
        );

        let intel = aggregator.intelligence(now);
        assert!((intel.storage_utilization - 0.5).abs() < f32::EPSILON);
        assert!((intel.network_load - 1.0).abs() < f32::EPSILON);
    }
}
