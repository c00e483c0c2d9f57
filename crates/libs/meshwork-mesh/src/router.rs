//! Per-packet forwarding loop.
//!
//! The decision tree for every `(packet, received-on)` pair:
//!
//! 1. TTL spent → drop, count.
//! 2. Destination local, port 0, arrived from an interface → decode MMCP
//!    and dispatch: ping is answered with a pong, originators feed the
//!    routing table, pongs complete latency probes, everything else fans
//!    out to the inbound-MMCP stream.
//! 3. Destination local, any other port → hand to the bound listener.
//! 4. Otherwise → forward via the originator record's interface toward its
//!    reverse-path neighbor.
//!
//! The router is stateless beyond the routing table; no per-flow state.

use std::time::{Duration, Instant};

use meshwork_wire::message::Pong;
use meshwork_wire::{
    CodecError, MmcpBody, MmcpMessage, OriginatorMessage, PacketHeader, VirtualAddress,
    VirtualPacket, CONTROL_PORT,
};

use crate::iface::{InterfaceId, TxMessage};
use crate::manager::{MeshState, MmcpEvent};

const DECODE_ERROR_LOG_INTERVAL: Duration = Duration::from_secs(60);

pub(crate) fn route_packet(
    state: &mut MeshState,
    packet: VirtualPacket,
    received_on: Option<InterfaceId>,
) {
    let header = *packet.header();

    if header.hop_count >= header.max_hops {
        state.stats.ttl_dropped += 1;
        log::debug!("mesh({}): ttl drop {}", state.config.name, header);
        return;
    }

    if state.ifaces.is_local_address(header.to_addr) {
        match received_on {
            Some(iface) if header.is_control() => {
                handle_mmcp(state, &header, packet.payload(), iface);
            }
            _ => deliver_local(state, packet),
        }
        return;
    }

    forward_packet(state, packet, &header, received_on);
}

fn handle_mmcp(state: &mut MeshState, header: &PacketHeader, payload: &[u8], iface: InterfaceId) {
    let message = match MmcpMessage::decode(payload) {
        Ok(message) => message,
        Err(err) => {
            state.stats.malformed_dropped += 1;
            log_decode_error(state, header.from_addr, &err);
            return;
        }
    };

    let message_id = message.message_id;
    match message.body {
        MmcpBody::Ping => reply_pong(state, header, message_id, iface),
        MmcpBody::Pong(pong) => {
            if state.pings.complete(header.from_addr, pong.reply_to_message_id, Instant::now()).is_none()
            {
                log::trace!(
                    "mesh({}): unmatched pong {} from {}",
                    state.config.name,
                    pong.reply_to_message_id,
                    header.from_addr,
                );
            }
        }
        MmcpBody::Originator(originator) => {
            handle_originator(state, header, message_id, originator, iface);
        }
        body => {
            let event = MmcpEvent { message: MmcpMessage::with_id(message_id, body), header: *header, iface };
            let _ = state.mmcp_tx.send(event);
        }
    }
}

fn handle_originator(
    state: &mut MeshState,
    header: &PacketHeader,
    message_id: u32,
    originator: OriginatorMessage,
    iface: InterfaceId,
) {
    // Accrue the measured one-hop cost into sent_time before the message is
    // stored or relayed.
    let rtt = state.pings.rtt_ms(header.last_hop_addr).unwrap_or(0);
    let adjusted = if rtt > 0 { originator.with_ping_time(rtt) } else { originator };

    let outcome = state.table.accept(
        header.from_addr,
        adjusted.clone(),
        header.last_hop_addr,
        header.hop_count,
        iface,
        Instant::now(),
    );

    if outcome.new_neighbor {
        log::info!("mesh({}): new direct neighbor {}", state.config.name, header.from_addr);
        // Wake the origination job so the new neighbor learns us quickly.
        let _ = state.originate_kick.try_send(());
    }

    if outcome.accepted {
        state.publish_routes();
        rebroadcast(state, header, message_id, adjusted);
    }
}

/// Relay an accepted originator to our own neighbors, once per
/// `(originator, message id)` pair and never past the TTL.
fn rebroadcast(
    state: &mut MeshState,
    header: &PacketHeader,
    message_id: u32,
    adjusted: OriginatorMessage,
) {
    if header.hop_count.saturating_add(1) >= header.max_hops {
        return;
    }

    let key = (header.from_addr, message_id);
    if state.rebroadcasts.contains_key(&key) {
        return;
    }
    state.rebroadcasts.insert(key, Instant::now());

    let payload = MmcpMessage::with_id(message_id, MmcpBody::Originator(adjusted)).encode();
    if payload.len() > u16::MAX as usize {
        return;
    }

    let mut relayed = 0usize;
    for view in state.ifaces.views() {
        for neighbor in view.neighbors {
            // Split horizon: not back to the originator, not to whoever
            // relayed it to us.
            if neighbor == header.from_addr || neighbor == header.last_hop_addr {
                continue;
            }

            let relay_header = PacketHeader {
                to_addr: neighbor,
                from_addr: header.from_addr,
                last_hop_addr: view.address,
                to_port: CONTROL_PORT,
                from_port: CONTROL_PORT,
                hop_count: header.hop_count + 1,
                max_hops: header.max_hops,
                protocol: header.protocol,
                payload_len: payload.len() as u16,
            };
            if let Ok(packet) = VirtualPacket::new(relay_header, payload.clone()) {
                match state.ifaces.send_on(view.id, TxMessage { next_hop: neighbor, packet }) {
                    Ok(()) => relayed += 1,
                    Err(_) => state.stats.send_failures += 1,
                }
            }
        }
    }

    if relayed > 0 {
        log::trace!(
            "mesh({}): relayed originator of {} to {} neighbors",
            state.config.name,
            header.from_addr,
            relayed,
        );
    }
}

fn reply_pong(state: &mut MeshState, header: &PacketHeader, ping_id: u32, iface: InterfaceId) {
    let pong = MmcpMessage::new(MmcpBody::Pong(Pong { reply_to_message_id: ping_id }));
    send_control(state, iface, header.from_addr, header.last_hop_addr, pong);
}

/// One-hop control send out a specific interface.
pub(crate) fn send_control(
    state: &mut MeshState,
    iface: InterfaceId,
    to: VirtualAddress,
    next_hop: VirtualAddress,
    message: MmcpMessage,
) {
    let Some(from) = state.ifaces.address_of(iface) else {
        return;
    };

    let payload = message.encode();
    if payload.len() > u16::MAX as usize {
        log::warn!("mesh({}): oversized control frame for {}", state.config.name, to);
        return;
    }

    let header = PacketHeader {
        to_addr: to,
        from_addr: from,
        last_hop_addr: from,
        to_port: CONTROL_PORT,
        from_port: CONTROL_PORT,
        hop_count: 1,
        max_hops: state.config.max_hops,
        protocol: 0,
        payload_len: payload.len() as u16,
    };

    if let Ok(packet) = VirtualPacket::new(header, payload) {
        if state.ifaces.send_on(iface, TxMessage { next_hop, packet }).is_err() {
            state.stats.send_failures += 1;
        }
    }
}

fn deliver_local(state: &mut MeshState, packet: VirtualPacket) {
    let port = packet.header().to_port;
    match state.listeners.get(&port) {
        Some(listener) => match listener.try_send(packet) {
            Ok(()) => state.stats.delivered_local += 1,
            Err(_) => {
                state.stats.undeliverable_dropped += 1;
                log::debug!("mesh({}): listener on port {} unavailable", state.config.name, port);
            }
        },
        None => {
            state.stats.undeliverable_dropped += 1;
            log::debug!("mesh({}): no listener on port {}", state.config.name, port);
        }
    }
}

fn forward_packet(
    state: &mut MeshState,
    packet: VirtualPacket,
    header: &PacketHeader,
    received_on: Option<InterfaceId>,
) {
    let Some(record) = state.table.get(&header.to_addr) else {
        state.stats.no_route_dropped += 1;
        log::warn!("mesh({}): no route for {}", state.config.name, header.to_addr);
        return;
    };
    let iface = record.iface;
    let next_hop = record.last_hop;

    let Some(my_addr) = state.ifaces.address_of(iface) else {
        state.stats.no_route_dropped += 1;
        log::warn!("mesh({}): route for {} via missing {}", state.config.name, header.to_addr, iface);
        return;
    };

    // Relayed packets take a hop; locally-originated ones leave as built.
    let outgoing = if received_on.is_some() {
        match packet.forward(my_addr) {
            Ok(forwarded) => forwarded,
            Err(_) => {
                state.stats.ttl_dropped += 1;
                return;
            }
        }
    } else {
        packet
    };

    match state.ifaces.send_on(iface, TxMessage { next_hop, packet: outgoing }) {
        Ok(()) => state.stats.forwarded += 1,
        Err(err) => {
            state.stats.send_failures += 1;
            log::debug!("mesh({}): forward failed: {}", state.config.name, err);
        }
    }
}

fn log_decode_error(state: &mut MeshState, source: VirtualAddress, err: &CodecError) {
    let now = Instant::now();
    let due = state
        .decode_error_log
        .get(&source)
        .map(|last| now.duration_since(*last) > DECODE_ERROR_LOG_INTERVAL)
        .unwrap_or(true);
    if due {
        state.decode_error_log.insert(source, now);
        log::warn!("mesh({}): dropping malformed frame from {}: {}", state.config.name, source, err);
    }
}
