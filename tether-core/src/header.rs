//! Fixed-size wire header prepended to every packet.
//!
//! Layout (little-endian):
//! ```text
//! magic:          [u8; 4]  "TET1"
//! kind:           u8       packet kind discriminant
//! checksum:       u32      truncated blake3 of the payload (0 if empty)
//! payload_length: u32
//! ```

use crate::error::TetherError;

/// Magic bytes that open every tether frame.
pub const MAGIC: [u8; 4] = *b"TET1";

/// Encoded header size on the wire.
pub const HEADER_LENGTH: usize = 13;

pub type HeaderBytes = [u8; HEADER_LENGTH];

/// The parsed wire header of a [`Packet`](crate::Packet).
///
/// The kind field is kept as a raw `u8` here so that packets with
/// discriminants this build does not know about can still be framed,
/// carried, and ultimately ignored — never rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacketHeader {
    kind: u8,
    checksum: u32,
    payload_length: u32,
}

impl PacketHeader {
    pub fn new(kind: u8, checksum: u32, payload_length: u32) -> Self {
        Self {
            kind,
            checksum,
            payload_length,
        }
    }

    pub fn to_bytes(&self) -> HeaderBytes {
        let mut buf: HeaderBytes = [0; HEADER_LENGTH];
        buf[0..4].copy_from_slice(&MAGIC);
        buf[4] = self.kind;
        buf[5..9].copy_from_slice(&self.checksum.to_le_bytes());
        buf[9..13].copy_from_slice(&self.payload_length.to_le_bytes());
        buf
    }

    pub fn from_bytes(bytes: HeaderBytes) -> Result<Self, TetherError> {
        if bytes[0..4] != MAGIC {
            return Err(TetherError::InvalidMagic);
        }
        Ok(Self {
            kind: bytes[4],
            checksum: u32::from_le_bytes([bytes[5], bytes[6], bytes[7], bytes[8]]),
            payload_length: u32::from_le_bytes([bytes[9], bytes[10], bytes[11], bytes[12]]),
        })
    }

    pub fn kind(&self) -> u8 {
        self.kind
    }

    pub fn checksum(&self) -> u32 {
        self.checksum
    }

    pub fn set_checksum(&mut self, checksum: u32) {
        self.checksum = checksum;
    }

    pub fn payload_length(&self) -> u32 {
        self.payload_length
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip() {
        let header = PacketHeader::new(0x10, 0xDEAD_BEEF, 42);
        let parsed = PacketHeader::from_bytes(header.to_bytes()).unwrap();
        assert_eq!(parsed, header);
    }

    #[test]
    fn rejects_bad_magic() {
        let mut bytes = PacketHeader::new(0x10, 0, 0).to_bytes();
        bytes[0] = b'X';
        assert!(matches!(
            PacketHeader::from_bytes(bytes),
            Err(TetherError::InvalidMagic)
        ));
    }

    #[test]
    fn unknown_kind_is_carried() {
        // A discriminant we have no enum variant for must still parse.
        let header = PacketHeader::new(0xEE, 0, 0);
        let parsed = PacketHeader::from_bytes(header.to_bytes()).unwrap();
        assert_eq!(parsed.kind(), 0xEE);
    }
}
