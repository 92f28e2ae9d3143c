//! `tokio_util` codec that frames [`Packet`]s on a byte stream.

use bytes::BytesMut;
use tokio_util::codec::{Decoder, Encoder};

use crate::error::TetherError;
use crate::header::{self, HeaderBytes, PacketHeader};
use crate::packet::{MAX_PAYLOAD_SIZE, Packet};

pub struct TetherCodec;

impl Decoder for TetherCodec {
    type Item = Packet;
    type Error = TetherError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.len() < header::HEADER_LENGTH {
            return Ok(None);
        }

        let header_bytes: HeaderBytes = src[..header::HEADER_LENGTH]
            .try_into()
            .map_err(|_| TetherError::InvalidHeader("header slice"))?;
        let header = PacketHeader::from_bytes(header_bytes)?;

        let payload_len = header.payload_length() as usize;
        if payload_len > MAX_PAYLOAD_SIZE {
            return Err(TetherError::PayloadTooLarge {
                size: payload_len,
                max: MAX_PAYLOAD_SIZE,
            });
        }

        let frame_len = header::HEADER_LENGTH + payload_len;
        if src.len() < frame_len {
            src.reserve(frame_len - src.len());
            return Ok(None);
        }

        let frame = src.split_to(frame_len);
        let packet = Packet::from_bytes(&frame)?;
        if !packet.verify_checksum() {
            return Err(TetherError::ChecksumMismatch);
        }
        Ok(Some(packet))
    }
}

impl Encoder<Packet> for TetherCodec {
    type Error = TetherError;

    fn encode(&mut self, item: Packet, dst: &mut BytesMut) -> Result<(), Self::Error> {
        dst.extend_from_slice(&item.to_bytes());
        Ok(())
    }
}
