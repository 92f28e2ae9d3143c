//! # tether-core
//!
//! Core protocol library for the tether remote-terminal client.
//!
//! This crate contains:
//! - **Protocol types**: `PacketHeader`, `Packet`, `PacketKind`
//! - **Protocol payloads**: `SessionHello`, `SessionWelcome`, `TerminalSize`
//! - **Codec**: `TetherCodec` for framed TCP I/O via `tokio_util`
//! - **Transport**: the `SessionTransport` collaborator trait and its
//!   TCP implementation with background reader/writer tasks
//! - **State**: the session lifecycle state machine
//! - **Error**: `TetherError` — typed, `thiserror`-based error hierarchy

pub mod codec;
pub mod error;
pub mod header;
pub mod message;
pub mod packet;
pub mod protocol;
pub mod state;
pub mod transport;

// ── Re-exports for ergonomic usage ───────────────────────────────

pub use codec::TetherCodec;
pub use error::TetherError;
pub use header::{HEADER_LENGTH, PacketHeader};
pub use message::PacketKind;
pub use packet::{MAX_FRAME_SIZE, MAX_PAYLOAD_SIZE, Packet};
pub use protocol::{SessionHello, SessionWelcome, TerminalSize, decode_payload, encode_payload};
pub use state::SessionPhase;
pub use transport::{Endpoint, Identity, SessionTransport, TcpTransport};
