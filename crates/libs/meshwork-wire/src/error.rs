/// Frame-level decode failures. The reception pipeline drops the offending
/// frame, counts it, and keeps running.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    #[error("unknown message tag: 0x{0:02x}")]
    UnknownTag(u8),

    #[error("truncated frame: needed {needed} more bytes, {remaining} left")]
    Truncated { needed: usize, remaining: usize },

    #[error("string field is not valid UTF-8")]
    BadUtf8,

    #[error("ordinal {ordinal} out of range for {name}")]
    EnumOutOfRange { name: &'static str, ordinal: i64 },
}

/// Packet construction and forwarding failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PacketError {
    #[error("hop count {hop_count} reached the TTL of {max_hops}")]
    TtlExceeded { hop_count: u8, max_hops: u8 },

    #[error("payload is {actual} bytes but the header declares {declared}")]
    PayloadLength { declared: usize, actual: usize },
}
