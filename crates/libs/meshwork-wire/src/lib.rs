//! Wire formats for the meshwork control plane.
//!
//! Two layers live here: the fixed 22-byte virtual packet header every
//! datagram carries, and the MMCP control-message codec transported in the
//! port-0 payload slot. Both are byte-for-byte stable across nodes.

pub mod address;
pub mod error;
pub mod message;
pub mod packet;
pub mod types;
pub mod wire;

pub use address::VirtualAddress;
pub use error::{CodecError, PacketError};
pub use message::{MessageKind, MmcpBody, MmcpMessage, OriginatorMessage};
pub use packet::{PacketHeader, VirtualPacket, CONTROL_PORT, HEADER_SIZE};
