//! Interface port: the seam between the routing core and the physical
//! transports (Wi-Fi Direct, hotspot, Bluetooth, local sockets).
//!
//! Transports attach through [`InterfaceManager::attach`] and speak packets
//! over a pair of bounded channels; their internal framing never reaches the
//! core. Sends are best-effort and non-blocking — a full or closed queue is
//! a dropped packet with a reason, not backpressure into the router.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use meshwork_wire::{VirtualAddress, VirtualPacket};

use crate::error::MeshError;

pub type InterfaceTxSender = mpsc::Sender<TxMessage>;
pub type InterfaceTxReceiver = mpsc::Receiver<TxMessage>;

pub type InterfaceRxSender = mpsc::Sender<RxMessage>;
pub type InterfaceRxReceiver = mpsc::Receiver<RxMessage>;

const DEFAULT_TX_QUEUE_CAPACITY: usize = 128;

/// Opaque handle identifying one attached interface.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Copy, Clone, Hash)]
pub struct InterfaceId(u32);

impl InterfaceId {
    pub(crate) const fn new(raw: u32) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl core::fmt::Display for InterfaceId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "if{}", self.0)
    }
}

/// Outbound packet plus the link-layer neighbor it should reach.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxMessage {
    pub next_hop: VirtualAddress,
    pub packet: VirtualPacket,
}

/// Inbound packet tagged with the interface that accepted it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RxMessage {
    pub iface: InterfaceId,
    pub packet: VirtualPacket,
}

/// Link-layer neighbor set an interface keeps current. Shared between the
/// transport (writer) and the origination pass (reader).
#[derive(Debug, Clone, Default)]
pub struct NeighborSet {
    inner: Arc<Mutex<HashSet<VirtualAddress>>>,
}

impl NeighborSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, addr: VirtualAddress) {
        if let Ok(mut set) = self.inner.lock() {
            set.insert(addr);
        }
    }

    pub fn remove(&self, addr: VirtualAddress) {
        if let Ok(mut set) = self.inner.lock() {
            set.remove(&addr);
        }
    }

    pub fn contains(&self, addr: VirtualAddress) -> bool {
        self.inner.lock().map(|set| set.contains(&addr)).unwrap_or(false)
    }

    pub fn snapshot(&self) -> Vec<VirtualAddress> {
        self.inner.lock().map(|set| set.iter().copied().collect()).unwrap_or_default()
    }
}

/// Everything a transport needs to participate: its id and address, the
/// shared rx sender into the core, its private tx queue out of the core, the
/// neighbor set it maintains, and a stop token it cancels on teardown.
pub struct InterfaceChannel {
    pub id: InterfaceId,
    pub address: VirtualAddress,
    pub rx_channel: InterfaceRxSender,
    pub tx_channel: InterfaceTxReceiver,
    pub neighbors: NeighborSet,
    pub stop: CancellationToken,
}

struct LocalInterface {
    id: InterfaceId,
    address: VirtualAddress,
    neighbors: NeighborSet,
    tx_send: InterfaceTxSender,
    stop: CancellationToken,
}

/// Per-interface view used by the origination pass.
#[derive(Debug, Clone)]
pub struct InterfaceView {
    pub id: InterfaceId,
    pub address: VirtualAddress,
    pub neighbors: Vec<VirtualAddress>,
}

pub struct InterfaceManager {
    counter: u32,
    rx_recv: Arc<tokio::sync::Mutex<InterfaceRxReceiver>>,
    rx_send: InterfaceRxSender,
    cancel: CancellationToken,
    ifaces: Vec<LocalInterface>,
}

impl InterfaceManager {
    pub fn new(rx_cap: usize) -> Self {
        let (rx_send, rx_recv) = mpsc::channel(rx_cap);
        Self {
            counter: 0,
            rx_recv: Arc::new(tokio::sync::Mutex::new(rx_recv)),
            rx_send,
            cancel: CancellationToken::new(),
            ifaces: Vec::new(),
        }
    }

    /// Register a transport-owned interface and hand back its channel pair.
    pub fn attach(&mut self, address: VirtualAddress) -> InterfaceChannel {
        self.counter += 1;
        let id = InterfaceId(self.counter);

        let (tx_send, tx_recv) = mpsc::channel(DEFAULT_TX_QUEUE_CAPACITY);
        let neighbors = NeighborSet::new();
        let stop = self.cancel.child_token();

        log::debug!("iface: attach {} as {}", address, id);

        self.ifaces.push(LocalInterface {
            id,
            address,
            neighbors: neighbors.clone(),
            tx_send,
            stop: stop.clone(),
        });

        InterfaceChannel { id, address, rx_channel: self.rx_send.clone(), tx_channel: tx_recv, neighbors, stop }
    }

    pub fn receiver(&self) -> Arc<tokio::sync::Mutex<InterfaceRxReceiver>> {
        self.rx_recv.clone()
    }

    pub fn local_addresses(&self) -> Vec<VirtualAddress> {
        self.ifaces.iter().map(|iface| iface.address).collect()
    }

    pub fn is_local_address(&self, addr: VirtualAddress) -> bool {
        self.ifaces.iter().any(|iface| iface.address == addr)
    }

    pub fn address_of(&self, id: InterfaceId) -> Option<VirtualAddress> {
        self.ifaces.iter().find(|iface| iface.id == id).map(|iface| iface.address)
    }

    pub fn views(&self) -> Vec<InterfaceView> {
        self.ifaces
            .iter()
            .map(|iface| InterfaceView {
                id: iface.id,
                address: iface.address,
                neighbors: iface.neighbors.snapshot(),
            })
            .collect()
    }

    /// Drop interfaces whose transport cancelled its stop token. Returns the
    /// dead ids so the routing table can evict everything learned through
    /// them.
    pub fn cleanup(&mut self) -> Vec<InterfaceId> {
        let mut gone = Vec::new();
        self.ifaces.retain(|iface| {
            if iface.stop.is_cancelled() {
                gone.push(iface.id);
                false
            } else {
                true
            }
        });
        gone
    }

    /// Best-effort enqueue toward one interface's transport.
    pub fn send_on(&self, id: InterfaceId, message: TxMessage) -> Result<(), MeshError> {
        let iface = self
            .ifaces
            .iter()
            .find(|iface| iface.id == id && !iface.stop.is_cancelled())
            .ok_or(MeshError::InterfaceGone(id))?;

        match iface.tx_send.try_send(message) {
            Ok(()) => Ok(()),
            Err(mpsc::error::TrySendError::Full(_)) => {
                log::warn!("iface: tx queue full on {}", id);
                Err(MeshError::SendFailed(id))
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                log::warn!("iface: tx queue closed on {}", id);
                Err(MeshError::SendFailed(id))
            }
        }
    }
}

impl Drop for InterfaceManager {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meshwork_wire::{PacketHeader, VirtualPacket};

    fn addr(last: u8) -> VirtualAddress {
        VirtualAddress::from_octets(169, 254, 0, last)
    }

    fn packet(to: VirtualAddress, from: VirtualAddress) -> VirtualPacket {
        let header = PacketHeader {
            to_addr: to,
            from_addr: from,
            last_hop_addr: from,
            to_port: 0,
            from_port: 0,
            hop_count: 1,
            max_hops: 7,
            protocol: 0,
            payload_len: 0,
        };
        VirtualPacket::new(header, Vec::new()).expect("packet")
    }

    #[tokio::test]
    async fn attach_assigns_distinct_ids_and_routes_tx() {
        let mut manager = InterfaceManager::new(8);
        let mut a = manager.attach(addr(1));
        let b = manager.attach(addr(2));
        assert_ne!(a.id, b.id);
        assert_eq!(manager.local_addresses(), vec![addr(1), addr(2)]);

        let message = TxMessage { next_hop: addr(9), packet: packet(addr(9), addr(1)) };
        manager.send_on(a.id, message.clone()).expect("send");
        assert_eq!(a.tx_channel.recv().await.expect("queued"), message);
    }

    #[tokio::test]
    async fn cleanup_reports_cancelled_interfaces() {
        let mut manager = InterfaceManager::new(8);
        let a = manager.attach(addr(1));
        let _b = manager.attach(addr(2));

        a.stop.cancel();
        assert_eq!(manager.cleanup(), vec![a.id]);
        assert_eq!(manager.local_addresses(), vec![addr(2)]);
        assert_eq!(
            manager.send_on(a.id, TxMessage { next_hop: addr(9), packet: packet(addr(9), addr(1)) }),
            Err(MeshError::InterfaceGone(a.id))
        );
    }

    #[tokio::test]
    async fn full_queue_surfaces_as_send_failure() {
        let mut manager = InterfaceManager::new(8);
        let channel = manager.attach(addr(1));
        let message = TxMessage { next_hop: addr(2), packet: packet(addr(2), addr(1)) };

        for _ in 0..DEFAULT_TX_QUEUE_CAPACITY {
            manager.send_on(channel.id, message.clone()).expect("enqueue");
        }
        assert_eq!(
            manager.send_on(channel.id, message),
            Err(MeshError::SendFailed(channel.id))
        );
    }

    #[test]
    fn neighbor_set_is_shared() {
        let mut manager = InterfaceManager::new(8);
        let channel = manager.attach(addr(1));
        channel.neighbors.insert(addr(2));
        let views = manager.views();
        assert_eq!(views.len(), 1);
        assert_eq!(views[0].neighbors, vec![addr(2)]);
    }
}
