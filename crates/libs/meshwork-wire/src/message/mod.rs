//! MMCP message framing.
//!
//! Every control frame on the wire is `what:u8 | messageId:u32 | body…`,
//! carried as the payload of a virtual packet addressed to port 0. The
//! decoder dispatches on `what`; unknown tags surface as
//! [`CodecError::UnknownTag`] and the frame is dropped by the pipeline.

mod advert;
mod announce;
mod broadcast;
mod control;
mod originator;

pub use advert::{
    ComputeTaskRequest, I2pRouterAdvertisement, ServiceAdvertisement, StorageAdvertisement,
};
pub use announce::{GatewayAnnouncement, NodeAnnouncement};
pub use broadcast::{EmergencyBroadcast, NetworkMetrics, QuorumProposal};
pub use control::{Heartbeat, Pong};
pub use originator::OriginatorMessage;

use rand_core::{OsRng, RngCore};

use crate::error::CodecError;
use crate::wire::{WireReader, WireWriter};

/// Wire tags. Values are frozen; append, never renumber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum MessageKind {
    Originator = 1,
    Ping = 2,
    Pong = 3,
    Heartbeat = 4,
    NodeAnnouncement = 5,
    GatewayAnnouncement = 6,
    ServiceAdvertisement = 7,
    StorageAdvertisement = 8,
    ComputeTaskRequest = 9,
    I2pRouterAdvertisement = 10,
    QuorumProposal = 11,
    NetworkMetrics = 12,
    EmergencyBroadcast = 13,
}

impl MessageKind {
    pub fn from_byte(byte: u8) -> Result<Self, CodecError> {
        match byte {
            1 => Ok(Self::Originator),
            2 => Ok(Self::Ping),
            3 => Ok(Self::Pong),
            4 => Ok(Self::Heartbeat),
            5 => Ok(Self::NodeAnnouncement),
            6 => Ok(Self::GatewayAnnouncement),
            7 => Ok(Self::ServiceAdvertisement),
            8 => Ok(Self::StorageAdvertisement),
            9 => Ok(Self::ComputeTaskRequest),
            10 => Ok(Self::I2pRouterAdvertisement),
            11 => Ok(Self::QuorumProposal),
            12 => Ok(Self::NetworkMetrics),
            13 => Ok(Self::EmergencyBroadcast),
            _ => Err(CodecError::UnknownTag(byte)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum MmcpBody {
    Originator(OriginatorMessage),
    Ping,
    Pong(Pong),
    Heartbeat(Heartbeat),
    NodeAnnouncement(NodeAnnouncement),
    GatewayAnnouncement(GatewayAnnouncement),
    ServiceAdvertisement(ServiceAdvertisement),
    StorageAdvertisement(StorageAdvertisement),
    ComputeTaskRequest(ComputeTaskRequest),
    I2pRouterAdvertisement(I2pRouterAdvertisement),
    QuorumProposal(QuorumProposal),
    NetworkMetrics(NetworkMetrics),
    EmergencyBroadcast(EmergencyBroadcast),
}

impl MmcpBody {
    pub fn kind(&self) -> MessageKind {
        match self {
            Self::Originator(_) => MessageKind::Originator,
            Self::Ping => MessageKind::Ping,
            Self::Pong(_) => MessageKind::Pong,
            Self::Heartbeat(_) => MessageKind::Heartbeat,
            Self::NodeAnnouncement(_) => MessageKind::NodeAnnouncement,
            Self::GatewayAnnouncement(_) => MessageKind::GatewayAnnouncement,
            Self::ServiceAdvertisement(_) => MessageKind::ServiceAdvertisement,
            Self::StorageAdvertisement(_) => MessageKind::StorageAdvertisement,
            Self::ComputeTaskRequest(_) => MessageKind::ComputeTaskRequest,
            Self::I2pRouterAdvertisement(_) => MessageKind::I2pRouterAdvertisement,
            Self::QuorumProposal(_) => MessageKind::QuorumProposal,
            Self::NetworkMetrics(_) => MessageKind::NetworkMetrics,
            Self::EmergencyBroadcast(_) => MessageKind::EmergencyBroadcast,
        }
    }
}

/// A complete MMCP frame: tag, correlation id, body.
#[derive(Debug, Clone, PartialEq)]
pub struct MmcpMessage {
    pub message_id: u32,
    pub body: MmcpBody,
}

impl MmcpMessage {
    /// New frame with a fresh random message id.
    pub fn new(body: MmcpBody) -> Self {
        Self { message_id: OsRng.next_u32(), body }
    }

    pub fn with_id(message_id: u32, body: MmcpBody) -> Self {
        Self { message_id, body }
    }

    pub fn kind(&self) -> MessageKind {
        self.body.kind()
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut w = WireWriter::with_capacity(64);
        w.write_u8(self.kind() as u8);
        w.write_u32(self.message_id);
        match &self.body {
            MmcpBody::Originator(body) => body.write(&mut w),
            MmcpBody::Ping => {}
            MmcpBody::Pong(body) => body.write(&mut w),
            MmcpBody::Heartbeat(body) => body.write(&mut w),
            MmcpBody::NodeAnnouncement(body) => body.write(&mut w),
            MmcpBody::GatewayAnnouncement(body) => body.write(&mut w),
            MmcpBody::ServiceAdvertisement(body) => body.write(&mut w),
            MmcpBody::StorageAdvertisement(body) => body.write(&mut w),
            MmcpBody::ComputeTaskRequest(body) => body.write(&mut w),
            MmcpBody::I2pRouterAdvertisement(body) => body.write(&mut w),
            MmcpBody::QuorumProposal(body) => body.write(&mut w),
            MmcpBody::NetworkMetrics(body) => body.write(&mut w),
            MmcpBody::EmergencyBroadcast(body) => body.write(&mut w),
        }
        w.into_bytes()
    }

    pub fn decode(data: &[u8]) -> Result<Self, CodecError> {
        let mut r = WireReader::new(data);
        let kind = MessageKind::from_byte(r.read_u8()?)?;
        let message_id = r.read_u32()?;

        let body = match kind {
            MessageKind::Originator => MmcpBody::Originator(OriginatorMessage::read(&mut r)?),
            MessageKind::Ping => MmcpBody::Ping,
            MessageKind::Pong => MmcpBody::Pong(Pong::read(&mut r)?),
            MessageKind::Heartbeat => MmcpBody::Heartbeat(Heartbeat::read(&mut r)?),
            MessageKind::NodeAnnouncement => {
                MmcpBody::NodeAnnouncement(NodeAnnouncement::read(&mut r)?)
            }
            MessageKind::GatewayAnnouncement => {
                MmcpBody::GatewayAnnouncement(GatewayAnnouncement::read(&mut r)?)
            }
            MessageKind::ServiceAdvertisement => {
                MmcpBody::ServiceAdvertisement(ServiceAdvertisement::read(&mut r)?)
            }
            MessageKind::StorageAdvertisement => {
                MmcpBody::StorageAdvertisement(StorageAdvertisement::read(&mut r)?)
            }
            MessageKind::ComputeTaskRequest => {
                MmcpBody::ComputeTaskRequest(ComputeTaskRequest::read(&mut r)?)
            }
            MessageKind::I2pRouterAdvertisement => {
                MmcpBody::I2pRouterAdvertisement(I2pRouterAdvertisement::read(&mut r)?)
            }
            MessageKind::QuorumProposal => MmcpBody::QuorumProposal(QuorumProposal::read(&mut r)?),
            MessageKind::NetworkMetrics => MmcpBody::NetworkMetrics(NetworkMetrics::read(&mut r)?),
            MessageKind::EmergencyBroadcast => {
                MmcpBody::EmergencyBroadcast(EmergencyBroadcast::read(&mut r)?)
            }
        };

        Ok(Self { message_id, body })
    }
}
