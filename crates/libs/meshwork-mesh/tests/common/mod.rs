//! Shared test plumbing: env_logger setup, an in-memory pairwise link
//! transport, and deadline-polling helpers.

#![allow(dead_code)]

use std::future::Future;
use std::sync::Once;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::yield_now;
use tokio_util::sync::CancellationToken;

use meshwork_mesh::{InterfaceId, MeshConfig, MeshNode, NeighborSet, RxMessage, TxMessage};
use meshwork_wire::{VirtualAddress, VirtualPacket};

static INIT: Once = Once::new();

pub fn setup() {
    INIT.call_once(|| {
        let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
            .is_test(true)
            .try_init();
    });
}

pub fn addr(last: u8) -> VirtualAddress {
    VirtualAddress::from_octets(169, 254, 0, last)
}

/// Config with intervals shrunk so scenarios settle in well under a second.
pub fn fast_config(name: &str) -> MeshConfig {
    let mut config = MeshConfig::new(name);
    config.set_origination_interval(Duration::from_millis(50));
    config.set_origination_initial_delay(Duration::from_millis(10));
    config.set_ping_interval(Duration::from_millis(40));
    config.set_ping_timeout(Duration::from_millis(500));
    config.set_lost_node_threshold(Duration::from_millis(300));
    config.set_lost_node_sweep_interval(Duration::from_millis(25));
    config
}

/// One bidirectional point-to-point link between two nodes. Packets cross
/// the link as encoded bytes, so every hop exercises the wire format.
pub struct Link {
    stop: CancellationToken,
    a_neighbors: NeighborSet,
    b_neighbors: NeighborSet,
    addr_a: VirtualAddress,
    addr_b: VirtualAddress,
}

impl Link {
    /// Sever the link: pumps stop and both ends forget the peer, as when a
    /// node goes offline mid-air.
    pub fn cut(&self) {
        self.stop.cancel();
        self.a_neighbors.remove(self.addr_b);
        self.b_neighbors.remove(self.addr_a);
    }
}

pub async fn link(
    a: &MeshNode,
    addr_a: VirtualAddress,
    b: &MeshNode,
    addr_b: VirtualAddress,
) -> Link {
    let channel_a = a.attach_interface(addr_a).await.expect("attach a");
    let channel_b = b.attach_interface(addr_b).await.expect("attach b");

    channel_a.neighbors.insert(addr_b);
    channel_b.neighbors.insert(addr_a);

    let stop = CancellationToken::new();

    let link = Link {
        stop: stop.clone(),
        a_neighbors: channel_a.neighbors.clone(),
        b_neighbors: channel_b.neighbors.clone(),
        addr_a,
        addr_b,
    };

    spawn_pump(channel_a.tx_channel, channel_b.rx_channel.clone(), channel_b.id, stop.clone());
    spawn_pump(channel_b.tx_channel, channel_a.rx_channel.clone(), channel_a.id, stop);

    link
}

fn spawn_pump(
    mut tx: mpsc::Receiver<TxMessage>,
    rx: mpsc::Sender<RxMessage>,
    dest_iface: InterfaceId,
    stop: CancellationToken,
) {
    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = stop.cancelled() => break,
                queued = tx.recv() => {
                    let Some(message) = queued else { break };
                    let bytes = message.packet.encode();
                    let packet = VirtualPacket::decode(&bytes).expect("wire round trip");
                    if rx.send(RxMessage { iface: dest_iface, packet }).await.is_err() {
                        break;
                    }
                }
            }
        }
    });
}

/// Poll a condition until it holds or the deadline passes.
pub async fn wait_for<F, Fut>(timeout: Duration, mut condition: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = std::time::Instant::now() + timeout;
    while std::time::Instant::now() < deadline {
        if condition().await {
            return true;
        }
        yield_now().await;
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    false
}

pub async fn wait_for_route(node: &MeshNode, destination: VirtualAddress, timeout: Duration) -> bool {
    wait_for(timeout, || async move { node.find_route(destination).await.is_some() }).await
}

pub async fn wait_for_neighbor(node: &MeshNode, neighbor: VirtualAddress, timeout: Duration) -> bool {
    wait_for(timeout, || async move { node.neighbors().await.contains(&neighbor) }).await
}
