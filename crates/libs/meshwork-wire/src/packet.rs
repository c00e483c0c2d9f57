//! Virtual packet model.
//!
//! The header layout is byte-for-byte stable across nodes:
//!
//! ```text
//! toAddr:u32 | fromAddr:u32 | lastHopAddr:u32 | toPort:u16 | fromPort:u16 |
//! hopCount:u8 | maxHops:u8 | protocol:u8 | reserved:u8 | payloadLen:u16
//! ```
//!
//! All integers big-endian, 22 bytes total, payload follows immediately.

use core::fmt;

use crate::address::VirtualAddress;
use crate::error::{CodecError, PacketError};

pub const HEADER_SIZE: usize = 22;

/// Destination port reserved for MMCP control frames consumed by the node
/// itself rather than an application socket.
pub const CONTROL_PORT: u16 = 0;

#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub struct PacketHeader {
    pub to_addr: VirtualAddress,
    pub from_addr: VirtualAddress,
    pub last_hop_addr: VirtualAddress,
    pub to_port: u16,
    pub from_port: u16,
    pub hop_count: u8,
    pub max_hops: u8,
    pub protocol: u8,
    pub payload_len: u16,
}

impl PacketHeader {
    pub fn is_control(&self) -> bool {
        self.to_port == CONTROL_PORT
    }

    pub fn encode(&self) -> [u8; HEADER_SIZE] {
        let mut out = [0u8; HEADER_SIZE];
        out[0..4].copy_from_slice(&self.to_addr.to_u32().to_be_bytes());
        out[4..8].copy_from_slice(&self.from_addr.to_u32().to_be_bytes());
        out[8..12].copy_from_slice(&self.last_hop_addr.to_u32().to_be_bytes());
        out[12..14].copy_from_slice(&self.to_port.to_be_bytes());
        out[14..16].copy_from_slice(&self.from_port.to_be_bytes());
        out[16] = self.hop_count;
        out[17] = self.max_hops;
        out[18] = self.protocol;
        // out[19] reserved
        out[20..22].copy_from_slice(&self.payload_len.to_be_bytes());
        out
    }

    pub fn decode(data: &[u8]) -> Result<Self, CodecError> {
        if data.len() < HEADER_SIZE {
            return Err(CodecError::Truncated {
                needed: HEADER_SIZE - data.len(),
                remaining: data.len(),
            });
        }

        let word = |at: usize| u32::from_be_bytes([data[at], data[at + 1], data[at + 2], data[at + 3]]);

        Ok(Self {
            to_addr: VirtualAddress::new(word(0)),
            from_addr: VirtualAddress::new(word(4)),
            last_hop_addr: VirtualAddress::new(word(8)),
            to_port: u16::from_be_bytes([data[12], data[13]]),
            from_port: u16::from_be_bytes([data[14], data[15]]),
            hop_count: data[16],
            max_hops: data[17],
            protocol: data[18],
            payload_len: u16::from_be_bytes([data[20], data[21]]),
        })
    }
}

impl fmt::Display for PacketHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{} -> {}:{} via {} hops {}/{}",
            self.from_addr,
            self.from_port,
            self.to_addr,
            self.to_port,
            self.last_hop_addr,
            self.hop_count,
            self.max_hops,
        )
    }
}

/// One datagram travelling the mesh. Headers are immutable after
/// construction; the only mutation path is [`VirtualPacket::forward`], which
/// yields a fresh packet.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct VirtualPacket {
    header: PacketHeader,
    payload: Vec<u8>,
}

impl VirtualPacket {
    pub fn new(header: PacketHeader, payload: Vec<u8>) -> Result<Self, PacketError> {
        if payload.len() != header.payload_len as usize {
            return Err(PacketError::PayloadLength {
                declared: header.payload_len as usize,
                actual: payload.len(),
            });
        }
        Ok(Self { header, payload })
    }

    pub fn header(&self) -> &PacketHeader {
        &self.header
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn into_payload(self) -> Vec<u8> {
        self.payload
    }

    /// Next-hop copy: hop count bumped, this node recorded as the previous
    /// hop. Refused once `hop_count` has reached `max_hops`; the caller must
    /// drop the packet. A forwarded packet may arrive with
    /// `hop_count == max_hops` and still be delivered locally, it just cannot
    /// travel further.
    pub fn forward(&self, my_addr: VirtualAddress) -> Result<Self, PacketError> {
        if self.header.hop_count >= self.header.max_hops {
            return Err(PacketError::TtlExceeded {
                hop_count: self.header.hop_count,
                max_hops: self.header.max_hops,
            });
        }

        let mut header = self.header;
        header.hop_count += 1;
        header.last_hop_addr = my_addr;
        Ok(Self { header, payload: self.payload.clone() })
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(HEADER_SIZE + self.payload.len());
        out.extend_from_slice(&self.header.encode());
        out.extend_from_slice(&self.payload);
        out
    }

    pub fn decode(data: &[u8]) -> Result<Self, CodecError> {
        let header = PacketHeader::decode(data)?;
        let body = &data[HEADER_SIZE..];
        let payload_len = header.payload_len as usize;
        if body.len() < payload_len {
            return Err(CodecError::Truncated {
                needed: payload_len - body.len(),
                remaining: body.len(),
            });
        }
        Ok(Self { header, payload: body[..payload_len].to_vec() })
    }
}
