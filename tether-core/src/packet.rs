//! The atomic message unit exchanged with the remote host: a typed
//! wire header plus an opaque payload.

use std::fmt::Debug;

use crate::PacketKind;
use crate::error::TetherError;
use crate::header::{self, HeaderBytes, PacketHeader};

/// Maximum payload size accepted in either direction.
pub const MAX_PAYLOAD_SIZE: usize = 256 * 1024;

/// Maximum on-the-wire frame size.
pub const MAX_FRAME_SIZE: usize = header::HEADER_LENGTH + MAX_PAYLOAD_SIZE;

/// Truncate a blake3 hash to the 32-bit wire checksum.
fn truncated_checksum(payload: &[u8]) -> u32 {
    let hash = blake3::hash(payload);
    let bytes = hash.as_bytes();
    u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}

/// A framed tether packet.
#[derive(Debug, Clone)]
pub struct Packet {
    header: PacketHeader,
    payload: Vec<u8>,
}

impl Packet {
    /// Build a packet of the given kind, checksumming the payload.
    pub fn new(kind: PacketKind, payload: Vec<u8>) -> Result<Self, TetherError> {
        if payload.len() > MAX_PAYLOAD_SIZE {
            return Err(TetherError::PayloadTooLarge {
                size: payload.len(),
                max: MAX_PAYLOAD_SIZE,
            });
        }

        let mut header = PacketHeader::new(kind as u8, 0, payload.len() as u32);
        if !payload.is_empty() {
            header.set_checksum(truncated_checksum(&payload));
        }
        Ok(Self { header, payload })
    }

    /// An empty-payload liveness probe.
    pub fn keepalive() -> Self {
        Self {
            header: PacketHeader::new(PacketKind::Keepalive as u8, 0, 0),
            payload: Vec::new(),
        }
    }

    pub fn header(&self) -> &PacketHeader {
        &self.header
    }

    /// The raw kind discriminant, which may be unknown to this build.
    pub fn kind_raw(&self) -> u8 {
        self.header.kind()
    }

    /// The typed kind; errors on discriminants this build does not know.
    pub fn kind(&self) -> Result<PacketKind, TetherError> {
        PacketKind::try_from(self.header.kind())
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut frame = self.header.to_bytes().to_vec();
        frame.extend_from_slice(&self.payload);
        frame
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, TetherError> {
        if bytes.len() < header::HEADER_LENGTH {
            return Err(TetherError::InvalidPacketLength {
                expected: header::HEADER_LENGTH,
                actual: bytes.len(),
            });
        }
        let header_bytes: HeaderBytes = bytes[0..header::HEADER_LENGTH]
            .try_into()
            .map_err(|_| TetherError::InvalidHeader("header slice"))?;
        let header = PacketHeader::from_bytes(header_bytes)?;

        let expected = header::HEADER_LENGTH + header.payload_length() as usize;
        if bytes.len() != expected {
            return Err(TetherError::InvalidPacketLength {
                expected,
                actual: bytes.len(),
            });
        }
        if header.payload_length() as usize > MAX_PAYLOAD_SIZE {
            return Err(TetherError::PayloadTooLarge {
                size: header.payload_length() as usize,
                max: MAX_PAYLOAD_SIZE,
            });
        }

        Ok(Self {
            header,
            payload: bytes[header::HEADER_LENGTH..].to_vec(),
        })
    }

    /// Verify the header checksum against the payload. Empty payloads
    /// carry no checksum and always verify.
    pub fn verify_checksum(&self) -> bool {
        if self.payload.is_empty() {
            return true;
        }
        self.header.checksum() == truncated_checksum(&self.payload)
    }
}
