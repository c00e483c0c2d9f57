//! One-hop control messages: ping/pong latency probes and liveness
//! heartbeats.

use crate::error::CodecError;
use crate::wire::{WireReader, WireWriter};

/// Reply to a PING. Carries the probe's message id so the sender can match
/// it against its pending list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pong {
    pub reply_to_message_id: u32,
}

impl Pong {
    pub(crate) fn write(&self, w: &mut WireWriter) {
        w.write_i32(self.reply_to_message_id as i32);
    }

    pub(crate) fn read(r: &mut WireReader<'_>) -> Result<Self, CodecError> {
        Ok(Self { reply_to_message_id: r.read_i32()? as u32 })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Heartbeat {
    pub node_id: String,
    pub timestamp: i64,
}

impl Heartbeat {
    pub(crate) fn write(&self, w: &mut WireWriter) {
        w.write_string(&self.node_id);
        w.write_i64(self.timestamp);
    }

    pub(crate) fn read(r: &mut WireReader<'_>) -> Result<Self, CodecError> {
        Ok(Self { node_id: r.read_string()?, timestamp: r.read_i64()? })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pong_round_trip() {
        let mut w = WireWriter::new();
        Pong { reply_to_message_id: 0xfeed_beef }.write(&mut w);
        let bytes = w.into_bytes();
        let decoded = Pong::read(&mut WireReader::new(&bytes)).expect("decode");
        assert_eq!(decoded.reply_to_message_id, 0xfeed_beef);
    }

    #[test]
    fn heartbeat_round_trip() {
        let beat = Heartbeat { node_id: "node-7".into(), timestamp: 1_722_000_400_000 };
        let mut w = WireWriter::new();
        beat.write(&mut w);
        let bytes = w.into_bytes();
        assert_eq!(Heartbeat::read(&mut WireReader::new(&bytes)).expect("decode"), beat);
    }
}
