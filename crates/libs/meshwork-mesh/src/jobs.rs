//! Periodic work: origination, neighbor pings, lost-node sweep, and the
//! packet drain. One task per job, all hanging off a shared cancellation
//! token; each job is serialized with itself by construction.

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::{mpsc, Mutex};
use tokio::time;
use tokio_util::sync::CancellationToken;

use meshwork_wire::{MmcpBody, MmcpMessage, OriginatorMessage, PacketHeader, VirtualPacket, CONTROL_PORT};

use crate::iface::{InterfaceRxReceiver, TxMessage};
use crate::manager::MeshState;
use crate::router;
use crate::time::now_epoch_millis;

pub(crate) async fn manage_mesh(
    state: Arc<Mutex<MeshState>>,
    rx_receiver: Arc<Mutex<InterfaceRxReceiver>>,
    mut kick_rx: mpsc::Receiver<()>,
    cancel: CancellationToken,
) {
    let (origination_interval, origination_initial_delay, ping_interval, sweep_interval) = {
        let state = state.lock().await;
        (
            state.config.origination_interval,
            state.config.origination_initial_delay,
            state.config.ping_interval,
            state.config.lost_node_sweep_interval,
        )
    };

    // Packet drain: every frame the transports hand us goes through the
    // forwarding decision under the state lock.
    {
        let state = state.clone();
        let cancel = cancel.clone();

        tokio::spawn(async move {
            let mut rx = rx_receiver.lock().await;
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    received = rx.recv() => {
                        let Some(message) = received else { break };
                        let mut state = state.lock().await;
                        router::route_packet(&mut state, message.packet, Some(message.iface));
                    }
                }
            }
        });
    }

    // Origination: fixed period after an initial delay, plus out-of-cycle
    // kicks when a new direct neighbor appears.
    {
        let state = state.clone();
        let cancel = cancel.clone();

        tokio::spawn(async move {
            tokio::select! {
                _ = cancel.cancelled() => return,
                _ = time::sleep(origination_initial_delay) => {}
            }

            loop {
                {
                    let mut state = state.lock().await;
                    originate(&mut state);
                }

                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = time::sleep(origination_interval) => {}
                    kicked = kick_rx.recv() => {
                        if kicked.is_none() {
                            break;
                        }
                    }
                }
            }
        });
    }

    // Neighbor pings.
    {
        let state = state.clone();
        let cancel = cancel.clone();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = time::sleep(ping_interval) => {
                        let mut state = state.lock().await;
                        ping_pass(&mut state);
                    }
                }
            }
        });
    }

    // Lost-node sweep.
    {
        let state = state.clone();
        let cancel = cancel.clone();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = time::sleep(sweep_interval) => {
                        let mut state = state.lock().await;
                        sweep_pass(&mut state);
                    }
                }
            }
        });
    }
}

/// Build this node's originator and unicast it to every known link-layer
/// neighbor of every interface. Point-to-point per neighbor rather than
/// broadcast, so an interface never loops its own announcement back.
pub(crate) fn originate(state: &mut MeshState) {
    let profile = state.profile;
    let message = MmcpMessage::new(MmcpBody::Originator(OriginatorMessage {
        fitness_score: profile.fitness_score,
        node_role: profile.node_role,
        sent_time: now_epoch_millis(),
        neighbors: state.table.neighbors(),
        centrality_score: profile.centrality_score,
    }));
    let payload = message.encode();
    if payload.len() > u16::MAX as usize {
        log::warn!("mesh({}): originator frame too large, skipping pass", state.config.name);
        return;
    }

    let mut sent = 0usize;
    for view in state.ifaces.views() {
        for neighbor in view.neighbors {
            let header = PacketHeader {
                to_addr: neighbor,
                from_addr: view.address,
                last_hop_addr: view.address,
                to_port: CONTROL_PORT,
                from_port: CONTROL_PORT,
                hop_count: 1,
                max_hops: state.config.max_hops,
                protocol: 0,
                payload_len: payload.len() as u16,
            };
            if let Ok(packet) = VirtualPacket::new(header, payload.clone()) {
                match state.ifaces.send_on(view.id, TxMessage { next_hop: neighbor, packet }) {
                    Ok(()) => sent += 1,
                    Err(_) => state.stats.send_failures += 1,
                }
            }
        }
    }

    if sent > 0 {
        log::trace!("mesh({}): originated to {} neighbors", state.config.name, sent);
    }
}

/// Probe every direct neighbor with a fresh ping and evict probes that
/// outlived the timeout. Losing a probe raises no neighbor-lost signal;
/// the sweep owns that.
pub(crate) fn ping_pass(state: &mut MeshState) {
    let now = Instant::now();

    let evicted = state.pings.evict_stale(now, state.config.ping_timeout);
    if evicted > 0 {
        log::trace!("mesh({}): evicted {} stale pings", state.config.name, evicted);
    }

    for neighbor in state.table.neighbors() {
        let Some(record) = state.table.get(&neighbor) else { continue };
        let iface = record.iface;

        let ping = MmcpMessage::new(MmcpBody::Ping);
        state.pings.record_sent(neighbor, ping.message_id, now);
        router::send_control(state, iface, neighbor, neighbor, ping);
    }
}

/// Evict interfaces whose transport went away, then every routing record
/// past the lost-node threshold, and publish the new snapshot.
pub(crate) fn sweep_pass(state: &mut MeshState) {
    let now = Instant::now();
    let threshold = state.config.lost_node_threshold;

    let mut lost = Vec::new();

    for iface in state.ifaces.cleanup() {
        log::warn!("mesh({}): interface {} gone, evicting its routes", state.config.name, iface);
        lost.extend(state.table.evict_iface(iface));
    }

    lost.extend(state.table.sweep(now, threshold));

    state.rebroadcasts.retain(|_, relayed_at| now.duration_since(*relayed_at) <= threshold);

    if !lost.is_empty() {
        let lost: Vec<String> = lost.iter().map(ToString::to_string).collect();
        log::info!("mesh({}): lost {}", state.config.name, lost.join(", "));
        state.publish_routes();
    }
}
