//! Structured payloads carried inside session-control and terminal
//! packets, serialized with bincode.

use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::error::TetherError;

// ── Handshake payloads ───────────────────────────────────────────

/// Initial payload sent by the client immediately after connecting.
///
/// Declares which optional features this session wants. The engine
/// always sends `auxiliary_tunnels: false` — tunnel traffic is outside
/// its remit.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionHello {
    pub auxiliary_tunnels: bool,
}

/// The server's reply to a [`SessionHello`].
///
/// A populated `error` means the server refused the session (bad
/// credentials, unknown session id). That refusal is terminal: the
/// client must not retry it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionWelcome {
    pub error: Option<String>,
}

// ── Terminal geometry ────────────────────────────────────────────

/// Local terminal dimensions, compared by full field equality.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerminalSize {
    pub rows: u16,
    pub cols: u16,
    pub width_px: u16,
    pub height_px: u16,
}

impl TerminalSize {
    pub fn new(rows: u16, cols: u16, width_px: u16, height_px: u16) -> Self {
        Self {
            rows,
            cols,
            width_px,
            height_px,
        }
    }
}

// ── Encoding helpers ─────────────────────────────────────────────

pub fn encode_payload<T: Serialize>(value: &T) -> Result<Vec<u8>, TetherError> {
    Ok(bincode::serialize(value)?)
}

pub fn decode_payload<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, TetherError> {
    Ok(bincode::deserialize(bytes)?)
}
