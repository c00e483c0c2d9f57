use meshwork_wire::{CodecError, VirtualAddress};

use crate::iface::InterfaceId;

/// Routing-core failures. Packet-level drops (TTL, no route, send errors)
/// are expected mesh weather: counted, logged, never fatal.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MeshError {
    #[error("no route to {0}")]
    NoRoute(VirtualAddress),

    #[error("interface {0} rejected the packet")]
    SendFailed(InterfaceId),

    #[error("interface {0} is gone")]
    InterfaceGone(InterfaceId),

    #[error("port {0} is reserved or already bound")]
    PortUnavailable(u16),

    #[error("payload of {0} bytes exceeds the datagram limit")]
    PayloadTooLarge(usize),

    #[error("node is closed")]
    Closed,

    #[error(transparent)]
    Codec(#[from] CodecError),
}
