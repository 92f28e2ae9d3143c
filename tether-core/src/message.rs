//! Packet kind definitions.
//!
//! Uses a proper enum with `TryFrom` — no panics on unknown values.
//! An unknown discriminant is a typed error that callers are expected
//! to treat as "not for me": newer servers may speak kinds this build
//! has never heard of, and those packets must be droppable, not fatal.

use crate::error::TetherError;
use std::fmt;

/// All packet kinds understood by this client.
///
/// Organized by category:
/// - `0x0x` — Session control (handshake)
/// - `0x1x` — Terminal traffic
/// - `0x2x` — Auxiliary tunnels (recognized, ignored by the client engine)
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PacketKind {
    // ── Session control (0x0x) ───────────────────────────────────
    /// Initial payload sent by the client right after connecting.
    Hello = 0x01,
    /// The server's initial response; may carry a rejection.
    Welcome = 0x02,

    // ── Terminal (0x1x) ──────────────────────────────────────────
    /// Raw terminal bytes, in either direction.
    TerminalBuffer = 0x10,
    /// Liveness probe and its echo reply.
    Keepalive = 0x11,
    /// Terminal geometry update (client → server).
    TerminalInfo = 0x12,

    // ── Auxiliary tunnels (0x2x) ─────────────────────────────────
    /// Open a forwarded tunnel.
    TunnelOpen = 0x20,
    /// Tunnel payload bytes.
    TunnelData = 0x21,
    /// Close a forwarded tunnel.
    TunnelClose = 0x22,
}

impl TryFrom<u8> for PacketKind {
    type Error = TetherError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x01 => Ok(PacketKind::Hello),
            0x02 => Ok(PacketKind::Welcome),

            0x10 => Ok(PacketKind::TerminalBuffer),
            0x11 => Ok(PacketKind::Keepalive),
            0x12 => Ok(PacketKind::TerminalInfo),

            0x20 => Ok(PacketKind::TunnelOpen),
            0x21 => Ok(PacketKind::TunnelData),
            0x22 => Ok(PacketKind::TunnelClose),

            _ => Err(TetherError::UnknownVariant {
                type_name: "PacketKind",
                value: value as u64,
            }),
        }
    }
}

impl fmt::Display for PacketKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}
