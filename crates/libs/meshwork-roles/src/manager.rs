//! Emergent role assignment.
//!
//! Each pass takes a fresh capability snapshot plus the aggregated mesh
//! intelligence, computes the target role set rule by rule, plans the
//! transition, and applies it atomically. Gateway roles get special care:
//! they are never dropped while they are the mesh's only gateway, and every
//! add/remove is announced through the gossip plane.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::watch;

use meshwork_wire::message::{GatewayAnnouncement, NodeAnnouncement};
use meshwork_wire::types::{BatteryInfo, GatewayType, MeshRole, NodeType, ThermalState};
use meshwork_wire::{MmcpBody, MmcpMessage};

use crate::capability::NodeCapabilitySnapshot;
use crate::intelligence::MeshIntelligence;
use crate::time::now_epoch_millis;

const GATEWAY_BANDWIDTH_FLOOR_MBPS: f32 = 10.0;
const STORAGE_OFFER_FLOOR_BYTES: i64 = 1024 * 1024;
const ANNOUNCE_ACK_TIMEOUT: Duration = Duration::from_secs(30);

const GATEWAY_REMOVAL_GRACE: Duration = Duration::from_secs(300);
const ROLE_REMOVAL_GRACE: Duration = Duration::from_secs(120);
const PLAIN_TRANSITION_GRACE: Duration = Duration::from_secs(30);

/// Hook into the platform's actual traffic routing, wired at construction
/// when the platform has one. Absent in sandboxes and tests.
pub trait GatewayPort: Send + Sync {
    fn enable_gateway_routing(&self, mode: GatewayType);
    fn disable_gateway_routing(&self);
}

/// What the user allows this node to become.
#[derive(Debug, Clone, Default)]
pub struct RolePreferences {
    /// `None` means every role is allowed.
    pub preferred_roles: Option<BTreeSet<MeshRole>>,
    /// A gateway flavor the user explicitly asked for.
    pub preferred_gateway: Option<MeshRole>,
    pub allows_tor_proxy: bool,
}

impl RolePreferences {
    pub fn permits(&self, role: MeshRole) -> bool {
        self.preferred_roles.as_ref().map(|roles| roles.contains(&role)).unwrap_or(true)
    }
}

pub fn battery_score(battery: &BatteryInfo) -> f32 {
    if battery.is_charging {
        1.0
    } else if battery.level > 70 {
        0.9
    } else if battery.level > 30 {
        0.6
    } else {
        0.3
    }
}

pub fn thermal_score(thermal: ThermalState) -> f32 {
    match thermal {
        ThermalState::Cool => 1.0,
        ThermalState::Warm => 0.8,
        ThermalState::Hot => 0.5,
        ThermalState::Throttling => 0.2,
        ThermalState::Critical => 0.1,
    }
}

/// Blended node fitness in [0, 1].
pub fn compute_fitness(snapshot: &NodeCapabilitySnapshot) -> f32 {
    battery_score(&snapshot.battery) * 0.3
        + thermal_score(snapshot.thermal) * 0.2
        + snapshot.network_quality * 0.3
        + snapshot.stability * 0.2
}

/// Evaluate every role rule independently against the snapshot and the
/// mesh-wide picture. `MESH_PARTICIPANT` is unconditional; at most one
/// gateway flavor is ever selected.
pub fn compute_target_roles(
    snapshot: &NodeCapabilitySnapshot,
    intel: &MeshIntelligence,
    prefs: &RolePreferences,
    neighbor_count: usize,
) -> BTreeSet<MeshRole> {
    let mut target = BTreeSet::new();
    target.insert(MeshRole::MeshParticipant);

    let fitness = compute_fitness(snapshot);
    let bandwidth_mbps = snapshot.resources.available_bandwidth_bps as f32 / 1_000_000.0;

    if snapshot.has_stable_connection() && fitness > 0.8 && intel.needs_more_gateways() {
        let gateway = if let Some(preferred) =
            prefs.preferred_gateway.filter(|role| role.is_gateway())
        {
            preferred
        } else if !prefs.allows_tor_proxy && bandwidth_mbps > GATEWAY_BANDWIDTH_FLOOR_MBPS {
            MeshRole::ClearnetGateway
        } else if prefs.allows_tor_proxy {
            MeshRole::TorGateway
        } else if bandwidth_mbps > GATEWAY_BANDWIDTH_FLOOR_MBPS {
            MeshRole::ClearnetGateway
        } else {
            MeshRole::TorGateway
        };
        target.insert(gateway);
    }

    if snapshot.resources.storage_offered_bytes > STORAGE_OFFER_FLOOR_BYTES
        && fitness > 0.4
        && intel.needs_more_storage()
        && !snapshot.thermal.is_constrained()
        && prefs.permits(MeshRole::StorageNode)
    {
        target.insert(MeshRole::StorageNode);
    }

    if snapshot.resources.available_cpu > 0.3
        && !snapshot.thermal.is_constrained()
        && (snapshot.battery.is_charging || snapshot.battery.level > 30)
        && intel.needs_more_compute()
        && prefs.permits(MeshRole::ComputeNode)
    {
        target.insert(MeshRole::ComputeNode);
    }

    if fitness > 0.6 && neighbor_count >= 2 {
        target.insert(MeshRole::MeshRouter);
    }

    if fitness > 0.85
        && snapshot.has_stable_connection()
        && neighbor_count >= 3
        && prefs.permits(MeshRole::Coordinator)
    {
        target.insert(MeshRole::Coordinator);
    }

    target
}

/// One planned transition: what to add, what may be removed, and by when.
#[derive(Debug, Clone)]
pub struct TransitionPlan {
    pub add_roles: BTreeSet<MeshRole>,
    pub remove_roles: BTreeSet<MeshRole>,
    pub deadline: Instant,
    /// Per-role handover candidates. Filling these takes mesh-wide
    /// negotiation, which lives above this core; the map stays empty here.
    pub fallbacks: HashMap<MeshRole, Vec<String>>,
}

/// Diff current against target, holding a gateway role back whenever it is
/// the last one the mesh knows about.
pub fn plan_transition(
    current: &BTreeSet<MeshRole>,
    target: &BTreeSet<MeshRole>,
    intel: &MeshIntelligence,
    now: Instant,
) -> TransitionPlan {
    let add_roles: BTreeSet<MeshRole> = target.difference(current).copied().collect();

    let remove_roles: BTreeSet<MeshRole> = current
        .difference(target)
        .copied()
        .filter(|role| !role.is_gateway() || intel.active_gateways > 1)
        .collect();

    let grace = if remove_roles.iter().any(|role| role.is_gateway()) {
        GATEWAY_REMOVAL_GRACE
    } else if !remove_roles.is_empty() {
        ROLE_REMOVAL_GRACE
    } else {
        PLAIN_TRANSITION_GRACE
    };

    TransitionPlan { add_roles, remove_roles, deadline: now + grace, fallbacks: HashMap::new() }
}

/// Lifecycle of one held role. Absent roles have no entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RolePhase {
    Announced { since: Instant },
    Active,
    Deactivating { deadline: Instant },
}

pub struct EmergentRoleManager {
    node_id: String,
    node_type: NodeType,
    prefs: RolePreferences,
    planning_interval: Duration,
    phases: HashMap<MeshRole, RolePhase>,
    roles_tx: watch::Sender<Arc<BTreeSet<MeshRole>>>,
    roles_rx: watch::Receiver<Arc<BTreeSet<MeshRole>>>,
    gateway_port: Option<Arc<dyn GatewayPort>>,
    outbox: Vec<MmcpMessage>,
    last_snapshot_bandwidth_bps: i64,
}

impl EmergentRoleManager {
    pub fn new(
        node_id: impl Into<String>,
        node_type: NodeType,
        prefs: RolePreferences,
        planning_interval: Duration,
    ) -> Self {
        let (roles_tx, roles_rx) = watch::channel(Arc::new(BTreeSet::new()));
        Self {
            node_id: node_id.into(),
            node_type,
            prefs,
            planning_interval,
            phases: HashMap::new(),
            roles_tx,
            roles_rx,
            gateway_port: None,
            outbox: Vec::new(),
            last_snapshot_bandwidth_bps: 0,
        }
    }

    pub fn set_gateway_port(&mut self, port: Arc<dyn GatewayPort>) {
        self.gateway_port = Some(port);
    }

    pub fn node_id(&self) -> &str {
        &self.node_id
    }

    /// Roles currently held (announced, active, or winding down).
    pub fn current_roles(&self) -> BTreeSet<MeshRole> {
        self.phases.keys().copied().collect()
    }

    /// Observable current role set.
    pub fn role_stream(&self) -> watch::Receiver<Arc<BTreeSet<MeshRole>>> {
        self.roles_rx.clone()
    }

    /// Announcements queued by the last pass, ready for the gossip plane.
    pub fn take_outbox(&mut self) -> Vec<MmcpMessage> {
        std::mem::take(&mut self.outbox)
    }

    /// A peer heartbeat acknowledges whatever we have announced.
    pub fn observe_heartbeat(&mut self) {
        for phase in self.phases.values_mut() {
            if matches!(phase, RolePhase::Announced { .. }) {
                *phase = RolePhase::Active;
            }
        }
    }

    /// One full pass: advance the state machine, recompute the target set,
    /// plan, and apply. Returns the plan for observability.
    pub fn evaluate(
        &mut self,
        snapshot: &NodeCapabilitySnapshot,
        intel: &MeshIntelligence,
        neighbor_count: usize,
        now: Instant,
    ) -> TransitionPlan {
        self.last_snapshot_bandwidth_bps = snapshot.resources.available_bandwidth_bps;
        self.tick(intel, now);

        let current = self.current_roles();
        let target = compute_target_roles(snapshot, intel, &self.prefs, neighbor_count);
        let plan = plan_transition(&current, &target, intel, now);
        self.apply(&plan, snapshot, now);
        plan
    }

    /// Advance per-role phases: announced roles activate on ack timeout,
    /// deactivating roles drop once their deadline passes — except a gateway
    /// that is still the only one the mesh knows, which slips one planning
    /// interval instead.
    fn tick(&mut self, intel: &MeshIntelligence, now: Instant) {
        let mut dropped = Vec::new();
        let planning_interval = self.planning_interval;

        for (role, phase) in self.phases.iter_mut() {
            match *phase {
                RolePhase::Announced { since } => {
                    if now.duration_since(since) >= ANNOUNCE_ACK_TIMEOUT {
                        *phase = RolePhase::Active;
                    }
                }
                RolePhase::Deactivating { deadline } => {
                    if now < deadline {
                        continue;
                    }
                    if role.is_gateway() && intel.active_gateways <= 1 {
                        log::info!(
                            "roles({}): holding {:?} past deadline, no replacement gateway yet",
                            self.node_id,
                            role,
                        );
                        *phase = RolePhase::Deactivating { deadline: deadline + planning_interval };
                    } else {
                        dropped.push(*role);
                    }
                }
                RolePhase::Active => {}
            }
        }

        for role in dropped {
            self.phases.remove(&role);
            log::info!("roles({}): released {:?}", self.node_id, role);
            if role.is_gateway() {
                self.queue_gateway_announcement(role, false);
                if let Some(port) = &self.gateway_port {
                    port.disable_gateway_routing();
                }
            }
        }
    }

    /// Atomic set update: additions are announced immediately, removals
    /// start their wind-down clock. No partial application.
    fn apply(&mut self, plan: &TransitionPlan, snapshot: &NodeCapabilitySnapshot, now: Instant) {
        for role in &plan.add_roles {
            self.phases.insert(*role, RolePhase::Announced { since: now });
            log::info!("roles({}): taking on {:?}", self.node_id, role);
            if role.is_gateway() {
                self.queue_gateway_announcement(*role, true);
                if let Some(port) = &self.gateway_port {
                    port.enable_gateway_routing(gateway_mode(*role));
                }
            }
        }

        for role in &plan.remove_roles {
            if let Some(phase) = self.phases.get_mut(role) {
                if !matches!(phase, RolePhase::Deactivating { .. }) {
                    log::info!("roles({}): winding down {:?}", self.node_id, role);
                    *phase = RolePhase::Deactivating { deadline: plan.deadline };
                }
            }
        }

        if !plan.add_roles.is_empty() || !plan.remove_roles.is_empty() {
            self.queue_node_announcement(snapshot);
        }

        self.roles_tx.send_replace(Arc::new(self.current_roles()));
    }

    fn queue_node_announcement(&mut self, snapshot: &NodeCapabilitySnapshot) {
        let sent_time = now_epoch_millis();
        let announcement = NodeAnnouncement {
            node_id: self.node_id.clone(),
            node_type: self.node_type,
            fitness: compute_fitness(snapshot),
            centrality: 0.0,
            roles: self.current_roles().into_iter().collect(),
            resources: snapshot.resources.clone(),
            battery: snapshot.battery.clone(),
            thermal: snapshot.thermal,
            timestamp: snapshot.timestamp,
            sent_time,
            neighbors: Vec::new(),
        };
        self.outbox.push(MmcpMessage::new(MmcpBody::NodeAnnouncement(announcement)));
    }

    fn queue_gateway_announcement(&mut self, role: MeshRole, is_active: bool) {
        let mbps = self.last_snapshot_bandwidth_bps as f32 / 1_000_000.0;
        let announcement = GatewayAnnouncement {
            node_id: self.node_id.clone(),
            gateway_type: gateway_mode(role),
            upload_mbps: mbps,
            download_mbps: mbps,
            avg_latency_ms: 0,
            jitter_ms: 0,
            is_active,
            protocols: "ipv4".into(),
            timestamp: now_epoch_millis(),
        };
        self.outbox.push(MmcpMessage::new(MmcpBody::GatewayAnnouncement(announcement)));
    }
}

fn gateway_mode(role: MeshRole) -> GatewayType {
    match role {
        MeshRole::ClearnetGateway => GatewayType::Clearnet,
        MeshRole::I2pGateway => GatewayType::I2p,
        _ => GatewayType::Tor,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meshwork_wire::types::{BatteryHealth, NodeResources, PowerState};

    fn snapshot() -> NodeCapabilitySnapshot {
        NodeCapabilitySnapshot {
            node_id: "node-x".into(),
            resources: NodeResources {
                available_cpu: 0.6,
                available_ram_bytes: 4 * 1024 * 1024 * 1024,
                available_bandwidth_bps: 50_000_000,
                storage_offered_bytes: 64 * 1024 * 1024,
                battery_level: 90,
                thermal_throttling: false,
                power_state: PowerState::PluggedIn,
                network_interfaces: vec!["wlan0".into()],
            },
            battery: BatteryInfo {
                level: 90,
                is_charging: true,
                temperature_celsius: 25,
                health: BatteryHealth::Good,
                charging_source: None,
            },
            thermal: ThermalState::Cool,
            network_quality: 0.9,
            stability: 0.9,
            timestamp: 0,
        }
    }

    fn hungry_mesh() -> MeshIntelligence {
        MeshIntelligence { total_nodes: 10, ..MeshIntelligence::default() }
    }

    #[test]
    fn fitness_blends_the_four_factors() {
        let strong = compute_fitness(&snapshot());
        // charging battery 1.0*0.3 + cool 1.0*0.2 + 0.9*0.3 + 0.9*0.2
        assert!((strong - 0.95).abs() < 1e-6);

        let mut weak = snapshot();
        weak.battery.is_charging = false;
        weak.battery.level = 20;
        weak.thermal = ThermalState::Hot;
        weak.network_quality = 0.2;
        weak.stability = 0.3;
        let weak_fitness = compute_fitness(&weak);
        assert!((weak_fitness - (0.3 * 0.3 + 0.5 * 0.2 + 0.2 * 0.3 + 0.3 * 0.2)).abs() < 1e-6);
    }

    #[test]
    fn participant_is_unconditional() {
        let mut broke = snapshot();
        broke.battery.is_charging = false;
        broke.battery.level = 1;
        broke.thermal = ThermalState::Critical;
        broke.network_quality = 0.0;
        broke.stability = 0.0;
        broke.resources.available_cpu = 0.0;
        broke.resources.storage_offered_bytes = 0;

        let target =
            compute_target_roles(&broke, &MeshIntelligence::default(), &RolePreferences::default(), 0);
        assert!(target.contains(&MeshRole::MeshParticipant));
        assert_eq!(target.len(), 1);
    }

    #[test]
    fn at_most_one_gateway_flavor() {
        let target = compute_target_roles(
            &snapshot(),
            &hungry_mesh(),
            &RolePreferences::default(),
            4,
        );
        let gateways =
            target.iter().filter(|role| role.is_gateway()).count();
        assert_eq!(gateways, 1);
        // High bandwidth, no tor preference: clearnet wins.
        assert!(target.contains(&MeshRole::ClearnetGateway));
    }

    #[test]
    fn gateway_selection_priority_order() {
        let mut prefs = RolePreferences::default();

        prefs.preferred_gateway = Some(MeshRole::I2pGateway);
        let target = compute_target_roles(&snapshot(), &hungry_mesh(), &prefs, 4);
        assert!(target.contains(&MeshRole::I2pGateway), "user preference first");

        prefs.preferred_gateway = None;
        prefs.allows_tor_proxy = true;
        let target = compute_target_roles(&snapshot(), &hungry_mesh(), &prefs, 4);
        assert!(target.contains(&MeshRole::TorGateway), "tor when the user allows it");

        prefs.allows_tor_proxy = false;
        let mut slow = snapshot();
        slow.resources.available_bandwidth_bps = 1_000_000;
        let target = compute_target_roles(&slow, &hungry_mesh(), &prefs, 4);
        assert!(target.contains(&MeshRole::TorGateway), "tor is the low-bandwidth fallback");
    }

    #[test]
    fn no_gateway_without_stability_fitness_and_demand() {
        let prefs = RolePreferences::default();

        let mut shaky = snapshot();
        shaky.stability = 0.5;
        let target = compute_target_roles(&shaky, &hungry_mesh(), &prefs, 4);
        assert!(!target.iter().any(|role| role.is_gateway()));

        let saturated = MeshIntelligence {
            total_nodes: 10,
            active_gateways: 5,
            ..MeshIntelligence::default()
        };
        let target = compute_target_roles(&snapshot(), &saturated, &prefs, 4);
        assert!(!target.iter().any(|role| role.is_gateway()));
    }

    #[test]
    fn storage_and_compute_respect_thermal_and_preferences() {
        let prefs = RolePreferences::default();

        let target = compute_target_roles(&snapshot(), &hungry_mesh(), &prefs, 1);
        assert!(target.contains(&MeshRole::StorageNode));
        assert!(target.contains(&MeshRole::ComputeNode));

        let mut throttled = snapshot();
        throttled.thermal = ThermalState::Throttling;
        let target = compute_target_roles(&throttled, &hungry_mesh(), &prefs, 1);
        assert!(!target.contains(&MeshRole::StorageNode));
        assert!(!target.contains(&MeshRole::ComputeNode));

        let narrow = RolePreferences {
            preferred_roles: Some([MeshRole::ComputeNode].into_iter().collect()),
            ..RolePreferences::default()
        };
        let target = compute_target_roles(&snapshot(), &hungry_mesh(), &narrow, 1);
        assert!(!target.contains(&MeshRole::StorageNode), "storage not whitelisted");
        assert!(target.contains(&MeshRole::ComputeNode));
    }

    #[test]
    fn router_and_coordinator_need_neighbors() {
        let prefs = RolePreferences::default();

        let lonely = compute_target_roles(&snapshot(), &hungry_mesh(), &prefs, 1);
        assert!(!lonely.contains(&MeshRole::MeshRouter));
        assert!(!lonely.contains(&MeshRole::Coordinator));

        let connected = compute_target_roles(&snapshot(), &hungry_mesh(), &prefs, 3);
        assert!(connected.contains(&MeshRole::MeshRouter));
        assert!(connected.contains(&MeshRole::Coordinator));
    }

    #[test]
    fn plan_diffs_current_against_target() {
        let now = Instant::now();
        let current: BTreeSet<MeshRole> =
            [MeshRole::MeshParticipant, MeshRole::StorageNode].into_iter().collect();
        let target: BTreeSet<MeshRole> =
            [MeshRole::MeshParticipant, MeshRole::ComputeNode].into_iter().collect();

        let plan = plan_transition(&current, &target, &hungry_mesh(), now);
        assert_eq!(
            plan.add_roles,
            [MeshRole::ComputeNode].into_iter().collect::<BTreeSet<_>>()
        );
        assert_eq!(
            plan.remove_roles,
            [MeshRole::StorageNode].into_iter().collect::<BTreeSet<_>>()
        );
        assert_eq!(plan.deadline, now + ROLE_REMOVAL_GRACE);
        assert!(plan.fallbacks.is_empty());
    }

    #[test]
    fn last_gateway_is_never_planned_out() {
        let now = Instant::now();
        let current: BTreeSet<MeshRole> =
            [MeshRole::MeshParticipant, MeshRole::TorGateway].into_iter().collect();
        let target: BTreeSet<MeshRole> = [MeshRole::MeshParticipant].into_iter().collect();

        let only_gateway = MeshIntelligence {
            total_nodes: 10,
            active_gateways: 1,
            ..MeshIntelligence::default()
        };
        let plan = plan_transition(&current, &target, &only_gateway, now);
        assert!(
            !plan.remove_roles.contains(&MeshRole::TorGateway),
            "the mesh's only gateway stays put even below threshold"
        );

        let covered = MeshIntelligence {
            total_nodes: 10,
            active_gateways: 2,
            ..MeshIntelligence::default()
        };
        let plan = plan_transition(&current, &target, &covered, now);
        assert!(plan.remove_roles.contains(&MeshRole::TorGateway));
        assert_eq!(plan.deadline, now + GATEWAY_REMOVAL_GRACE);
    }

    #[test]
    fn roles_announce_then_activate_then_wind_down() {
        let mut manager = EmergentRoleManager::new(
            "node-x",
            NodeType::Smartphone,
            RolePreferences::default(),
            Duration::from_secs(60),
        );
        let start = Instant::now();

        let plan = manager.evaluate(&snapshot(), &hungry_mesh(), 4, start);
        assert!(plan.add_roles.contains(&MeshRole::MeshParticipant));
        assert!(plan.add_roles.contains(&MeshRole::ClearnetGateway));
        assert!(manager.current_roles().contains(&MeshRole::ClearnetGateway));

        // An acknowledging heartbeat promotes announced roles.
        manager.observe_heartbeat();

        // Conditions collapse; another gateway exists, so ours winds down
        // but survives until the deadline.
        let mut weak = snapshot();
        weak.network_quality = 0.1;
        weak.stability = 0.1;
        let covered = MeshIntelligence {
            total_nodes: 10,
            active_gateways: 2,
            ..MeshIntelligence::default()
        };
        let plan = manager.evaluate(&weak, &covered, 4, start + Duration::from_secs(2));
        assert!(plan.remove_roles.contains(&MeshRole::ClearnetGateway));
        assert!(manager.current_roles().contains(&MeshRole::ClearnetGateway), "still deactivating");

        // Past the deadline the role is gone.
        manager.evaluate(&weak, &covered, 4, start + GATEWAY_REMOVAL_GRACE + Duration::from_secs(3));
        assert!(!manager.current_roles().contains(&MeshRole::ClearnetGateway));
    }

    #[test]
    fn sole_gateway_slips_its_deadline_instead_of_dropping() {
        let mut manager = EmergentRoleManager::new(
            "node-x",
            NodeType::Smartphone,
            RolePreferences::default(),
            Duration::from_secs(60),
        );
        let start = Instant::now();
        manager.evaluate(&snapshot(), &hungry_mesh(), 4, start);
        assert!(manager.current_roles().contains(&MeshRole::ClearnetGateway));

        let mut weak = snapshot();
        weak.network_quality = 0.1;

        // Two gateways exist at planning time, so the removal is planned...
        let covered = MeshIntelligence {
            total_nodes: 10,
            active_gateways: 2,
            ..MeshIntelligence::default()
        };
        manager.evaluate(&weak, &covered, 4, start + Duration::from_secs(1));

        // ...but by the deadline the other gateway vanished. The role holds
        // and slips until a replacement is confirmed.
        let alone = MeshIntelligence {
            total_nodes: 10,
            active_gateways: 1,
            ..MeshIntelligence::default()
        };
        manager.evaluate(&weak, &alone, 4, start + GATEWAY_REMOVAL_GRACE + Duration::from_secs(2));
        assert!(manager.current_roles().contains(&MeshRole::ClearnetGateway));

        let covered_again = MeshIntelligence {
            total_nodes: 10,
            active_gateways: 2,
            ..MeshIntelligence::default()
        };
        manager.evaluate(
            &weak,
            &covered_again,
            4,
            start + GATEWAY_REMOVAL_GRACE + Duration::from_secs(200),
        );
        assert!(!manager.current_roles().contains(&MeshRole::ClearnetGateway));
    }

    #[test]
    fn gateway_changes_are_announced_both_ways() {
        let mut manager = EmergentRoleManager::new(
            "node-x",
            NodeType::Smartphone,
            RolePreferences::default(),
            Duration::from_secs(60),
        );
        let start = Instant::now();

        manager.evaluate(&snapshot(), &hungry_mesh(), 4, start);
        let outbox = manager.take_outbox();
        let activation = outbox
            .iter()
            .find_map(|message| match &message.body {
                MmcpBody::GatewayAnnouncement(announce) => Some(announce),
                _ => None,
            })
            .expect("activation announcement");
        assert!(activation.is_active);
        assert_eq!(activation.gateway_type, GatewayType::Clearnet);

        let mut weak = snapshot();
        weak.network_quality = 0.1;
        let covered = MeshIntelligence {
            total_nodes: 10,
            active_gateways: 2,
            ..MeshIntelligence::default()
        };
        manager.evaluate(&weak, &covered, 4, start + Duration::from_secs(1));
        manager.evaluate(&weak, &covered, 4, start + GATEWAY_REMOVAL_GRACE + Duration::from_secs(2));

        let outbox = manager.take_outbox();
        let deactivation = outbox
            .iter()
            .find_map(|message| match &message.body {
                MmcpBody::GatewayAnnouncement(announce) if !announce.is_active => Some(announce),
                _ => None,
            })
            .expect("deactivation announcement");
        assert_eq!(deactivation.gateway_type, GatewayType::Clearnet);
    }

    #[test]
    fn announced_roles_activate_after_the_ack_timeout() {
        let mut manager = EmergentRoleManager::new(
            "node-x",
            NodeType::Smartphone,
            RolePreferences::default(),
            Duration::from_secs(60),
        );
        let start = Instant::now();
        manager.evaluate(&snapshot(), &hungry_mesh(), 4, start);
        assert!(matches!(
            manager.phases.get(&MeshRole::MeshParticipant),
            Some(RolePhase::Announced { .. })
        ));

        manager.evaluate(&snapshot(), &hungry_mesh(), 4, start + ANNOUNCE_ACK_TIMEOUT);
        assert_eq!(manager.phases.get(&MeshRole::MeshParticipant), Some(&RolePhase::Active));
    }
}
