//! The mesh node: owned state, public surface, and the lifecycle of the
//! routing core. Periodic work lives in [`crate::jobs`]; the per-packet
//! decision tree lives in [`crate::router`].

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::{broadcast, mpsc, watch, Mutex};
use tokio_util::sync::CancellationToken;

use meshwork_wire::{
    MmcpMessage, PacketHeader, VirtualAddress, VirtualPacket, CONTROL_PORT,
};

use crate::config::MeshConfig;
use crate::error::MeshError;
use crate::iface::{InterfaceChannel, InterfaceId, InterfaceManager};
use crate::jobs;
use crate::pings::PingTracker;
use crate::router;
use crate::table::{RoutesSnapshot, RoutingTable};

/// Caller-supplied identity figures stamped into every originator message.
/// Fitness and centrality are computed by higher layers; the core only
/// transports them.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct NodeProfile {
    pub fitness_score: i32,
    pub node_role: u8,
    pub centrality_score: f32,
}

/// Decoded inbound MMCP frame fanned out to subscribers, together with the
/// packet header it rode in on and the interface that accepted it.
#[derive(Debug, Clone)]
pub struct MmcpEvent {
    pub message: MmcpMessage,
    pub header: PacketHeader,
    pub iface: InterfaceId,
}

/// Forwarding-loop counters. Drops are expected mesh weather and never
/// fatal; the counters exist so operators can see the weather.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RouterStats {
    pub delivered_local: u64,
    pub forwarded: u64,
    pub ttl_dropped: u64,
    pub no_route_dropped: u64,
    pub malformed_dropped: u64,
    pub undeliverable_dropped: u64,
    pub send_failures: u64,
}

pub(crate) struct MeshState {
    pub(crate) config: MeshConfig,
    pub(crate) ifaces: InterfaceManager,
    pub(crate) table: RoutingTable,
    pub(crate) pings: PingTracker,
    pub(crate) profile: NodeProfile,
    pub(crate) listeners: HashMap<u16, mpsc::Sender<VirtualPacket>>,
    /// Rebroadcast suppression: `(originator, message id)` pairs already
    /// relayed, pruned alongside the lost-node sweep.
    pub(crate) rebroadcasts: HashMap<(VirtualAddress, u32), Instant>,
    pub(crate) stats: RouterStats,
    pub(crate) mmcp_tx: broadcast::Sender<MmcpEvent>,
    pub(crate) routes_tx: watch::Sender<RoutesSnapshot>,
    pub(crate) originate_kick: mpsc::Sender<()>,
    /// Last malformed-frame log per source, for the once-a-minute limit.
    pub(crate) decode_error_log: HashMap<VirtualAddress, Instant>,
}

impl MeshState {
    pub(crate) fn publish_routes(&self) {
        self.routes_tx.send_replace(self.table.snapshot());
    }
}

/// One mesh node: interfaces, routing table, gossip jobs, forwarding loop.
///
/// Dropping the node or calling [`MeshNode::close`] cancels every job and
/// interface cooperatively; in-flight sends race to completion and fresh
/// ones are rejected with [`MeshError::Closed`].
pub struct MeshNode {
    name: String,
    state: Arc<Mutex<MeshState>>,
    mmcp_tx: broadcast::Sender<MmcpEvent>,
    routes_rx: watch::Receiver<RoutesSnapshot>,
    cancel: CancellationToken,
}

impl MeshNode {
    pub fn new(config: MeshConfig) -> Self {
        let (mmcp_tx, _) = broadcast::channel(64);
        let (routes_tx, routes_rx) = watch::channel(Arc::new(HashMap::new()));
        let (kick_tx, kick_rx) = mpsc::channel(1);

        let ifaces = InterfaceManager::new(128);
        let rx_receiver = ifaces.receiver();

        let cancel = CancellationToken::new();
        let name = config.name.clone();

        let state = Arc::new(Mutex::new(MeshState {
            config,
            ifaces,
            table: RoutingTable::new(),
            pings: PingTracker::new(),
            profile: NodeProfile::default(),
            listeners: HashMap::new(),
            rebroadcasts: HashMap::new(),
            stats: RouterStats::default(),
            mmcp_tx: mmcp_tx.clone(),
            routes_tx,
            originate_kick: kick_tx,
            decode_error_log: HashMap::new(),
        }));

        tokio::spawn(jobs::manage_mesh(state.clone(), rx_receiver, kick_rx, cancel.clone()));

        Self { name, state, mmcp_tx, routes_rx, cancel }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Register a transport-owned interface. The returned channel carries
    /// the rx sender into the core, the tx queue out of it, and the shared
    /// neighbor set the transport keeps current.
    pub async fn attach_interface(
        &self,
        address: VirtualAddress,
    ) -> Result<InterfaceChannel, MeshError> {
        if self.cancel.is_cancelled() {
            return Err(MeshError::Closed);
        }
        Ok(self.state.lock().await.ifaces.attach(address))
    }

    /// Claim an application port and receive the packets delivered to it.
    /// Port 0 is the control plane and cannot be bound.
    pub async fn bind_port(&self, port: u16) -> Result<mpsc::Receiver<VirtualPacket>, MeshError> {
        if self.cancel.is_cancelled() {
            return Err(MeshError::Closed);
        }
        if port == CONTROL_PORT {
            return Err(MeshError::PortUnavailable(port));
        }

        let mut state = self.state.lock().await;
        if state.listeners.contains_key(&port) {
            return Err(MeshError::PortUnavailable(port));
        }
        let (tx, rx) = mpsc::channel(64);
        state.listeners.insert(port, tx);
        Ok(rx)
    }

    pub async fn release_port(&self, port: u16) {
        self.state.lock().await.listeners.remove(&port);
    }

    /// Route a fully-formed packet as locally-originated traffic.
    pub async fn send(&self, packet: VirtualPacket) -> Result<(), MeshError> {
        if self.cancel.is_cancelled() {
            return Err(MeshError::Closed);
        }
        let mut state = self.state.lock().await;
        router::route_packet(&mut state, packet, None);
        Ok(())
    }

    /// Convenience datagram path: resolves the outgoing interface from the
    /// routing table and stamps a fresh header.
    pub async fn send_datagram(
        &self,
        to: VirtualAddress,
        to_port: u16,
        from_port: u16,
        payload: Vec<u8>,
    ) -> Result<(), MeshError> {
        if self.cancel.is_cancelled() {
            return Err(MeshError::Closed);
        }
        if payload.len() > u16::MAX as usize {
            return Err(MeshError::PayloadTooLarge(payload.len()));
        }

        let mut state = self.state.lock().await;

        let from = if state.ifaces.is_local_address(to) {
            to
        } else {
            let record = state.table.get(&to).ok_or(MeshError::NoRoute(to))?;
            let iface = record.iface;
            state.ifaces.address_of(iface).ok_or(MeshError::InterfaceGone(iface))?
        };

        let header = PacketHeader {
            to_addr: to,
            from_addr: from,
            last_hop_addr: from,
            to_port,
            from_port,
            hop_count: 1,
            max_hops: state.config.max_hops,
            protocol: 0,
            payload_len: payload.len() as u16,
        };
        let packet = VirtualPacket::new(header, payload)
            .map_err(|_| MeshError::PayloadTooLarge(header.payload_len as usize))?;

        router::route_packet(&mut state, packet, None);
        Ok(())
    }

    /// Unicast a control frame to every direct neighbor, the same path the
    /// gossip jobs use. Role and service announcements ride this.
    pub async fn broadcast_control(&self, message: MmcpMessage) -> Result<(), MeshError> {
        if self.cancel.is_cancelled() {
            return Err(MeshError::Closed);
        }
        let mut state = self.state.lock().await;
        for neighbor in state.table.neighbors() {
            let Some(record) = state.table.get(&neighbor) else { continue };
            let iface = record.iface;
            router::send_control(&mut state, iface, neighbor, neighbor, message.clone());
        }
        Ok(())
    }

    /// Stream of decoded inbound MMCP frames not consumed by the core
    /// itself (announcements, advertisements, proposals, ...).
    pub fn mmcp_stream(&self) -> broadcast::Receiver<MmcpEvent> {
        self.mmcp_tx.subscribe()
    }

    /// Watch handle over published routing-table snapshots.
    pub fn routes(&self) -> watch::Receiver<RoutesSnapshot> {
        self.routes_rx.clone()
    }

    /// Reverse-path neighbor for a destination, as a value; `None` is the
    /// no-route case, not an error.
    pub async fn find_route(&self, destination: VirtualAddress) -> Option<VirtualAddress> {
        self.state.lock().await.table.next_hop(&destination)
    }

    pub async fn neighbors(&self) -> Vec<VirtualAddress> {
        self.state.lock().await.table.neighbors()
    }

    pub async fn neighbor_rtt_ms(&self, neighbor: VirtualAddress) -> Option<i64> {
        self.state.lock().await.pings.rtt_ms(neighbor)
    }

    pub async fn stats(&self) -> RouterStats {
        self.state.lock().await.stats
    }

    pub async fn set_profile(&self, profile: NodeProfile) {
        self.state.lock().await.profile = profile;
    }

    /// Run an origination pass immediately, out of cycle.
    pub async fn originate_now(&self) {
        if self.cancel.is_cancelled() {
            return;
        }
        let mut state = self.state.lock().await;
        jobs::originate(&mut state);
    }

    /// Run a ping pass immediately, out of cycle.
    pub async fn ping_now(&self) {
        if self.cancel.is_cancelled() {
            return;
        }
        let mut state = self.state.lock().await;
        jobs::ping_pass(&mut state);
    }

    /// Cancel all jobs and reject further sends. Idempotent.
    pub fn close(&self) {
        if !self.cancel.is_cancelled() {
            log::debug!("mesh({}): closing", self.name);
        }
        self.cancel.cancel();
    }

    pub fn is_closed(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

impl Drop for MeshNode {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
