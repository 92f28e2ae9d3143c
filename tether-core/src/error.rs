//! Error types for the tether protocol and transport.
//!
//! Everything fallible returns `Result<T, TetherError>`; malformed
//! input from the wire is a typed error, never a panic.

use std::time::Duration;
use thiserror::Error;

/// The canonical error type for the tether protocol.
#[derive(Debug, Error)]
pub enum TetherError {
    // ── Protocol Errors ──────────────────────────────────────────
    /// Received bytes that do not start with the tether magic sequence.
    #[error("invalid magic bytes: expected TET1")]
    InvalidMagic,

    /// A field in the packet header could not be parsed.
    #[error("invalid header: {0}")]
    InvalidHeader(&'static str),

    /// The packet payload failed checksum verification.
    #[error("checksum mismatch")]
    ChecksumMismatch,

    /// A numeric value did not map to any known enum variant.
    #[error("unknown {type_name} discriminant: {value:#x}")]
    UnknownVariant { type_name: &'static str, value: u64 },

    /// A packet violated protocol rules.
    #[error("protocol violation: {0}")]
    ProtocolViolation(&'static str),

    // ── Packet Errors ────────────────────────────────────────────
    /// The payload exceeds the configured maximum size.
    #[error("payload too large: {size} bytes (max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// The received frame is shorter or longer than expected.
    #[error("invalid packet length: expected {expected}, got {actual}")]
    InvalidPacketLength { expected: usize, actual: usize },

    // ── Connection Errors ────────────────────────────────────────
    /// The TCP/IO layer reported an error.
    #[error("connection error: {0}")]
    Connection(#[from] std::io::Error),

    /// An mpsc channel was closed unexpectedly.
    #[error("channel closed")]
    ChannelClosed,

    /// An operation exceeded its deadline.
    #[error("timeout after {0:?}")]
    Timeout(Duration),

    // ── Serialization Errors ─────────────────────────────────────
    /// Encoding or decoding of a payload failed.
    #[error("encoding error: {0}")]
    Encoding(String),

    /// Catch-all for errors that do not fit another variant.
    #[error("{0}")]
    Other(String),
}

// ── Convenient From implementations ──────────────────────────────

impl From<String> for TetherError {
    fn from(s: String) -> Self {
        TetherError::Other(s)
    }
}

impl From<&str> for TetherError {
    fn from(s: &str) -> Self {
        TetherError::Other(s.to_string())
    }
}

impl<T> From<tokio::sync::mpsc::error::SendError<T>> for TetherError {
    fn from(_: tokio::sync::mpsc::error::SendError<T>) -> Self {
        TetherError::ChannelClosed
    }
}

impl From<Box<bincode::ErrorKind>> for TetherError {
    fn from(e: Box<bincode::ErrorKind>) -> Self {
        TetherError::Encoding(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_carries_the_relevant_numbers() {
        let e = TetherError::PayloadTooLarge {
            size: 300_000,
            max: 262_144,
        };
        assert!(e.to_string().contains("300000"));
        assert!(e.to_string().contains("262144"));

        let e = TetherError::UnknownVariant {
            type_name: "PacketKind",
            value: 0xEE,
        };
        assert!(e.to_string().contains("0xee"));
        assert!(e.to_string().contains("PacketKind"));
    }

    #[test]
    fn io_errors_convert_to_connection() {
        let io_err = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "peer reset");
        assert!(matches!(
            TetherError::from(io_err),
            TetherError::Connection(_)
        ));
    }

    #[test]
    fn dropped_channel_converts_to_channel_closed() {
        let e: TetherError = tokio::sync::mpsc::error::SendError(0u8).into();
        assert!(matches!(e, TetherError::ChannelClosed));
    }
}
