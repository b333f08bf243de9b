//! Frame Codec: pure transformation between a byte stream and a
//! sequence of [`Message`]s. No I/O — all blocking is delegated to
//! [`crate::connection::Connection`], which drives this codec through
//! `tokio_util`'s `Framed`, the same pairing the reference stack uses for its
//! own packet decoder (`protocol::packet::PacketDecoder`).

use bytes::{Buf, BufMut, Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::constant::{Direction, DEFAULT_MAX_FRAME_SIZE};
use crate::error::Error;

use super::message::Message;

/// `encode`/`decode` as a free function pair; `max_frame_size` is the `MaxFrameSize`
/// constant (default 64 MiB) guarding against a runaway length header.
#[derive(Debug, Clone)]
pub struct FrameCodec {
    max_frame_size: u32,
}

impl FrameCodec {
    pub fn new() -> Self {
        Self {
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
        }
    }

    pub fn with_max_frame_size(max_frame_size: u32) -> Self {
        Self { max_frame_size }
    }
}

impl Default for FrameCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for FrameCodec {
    type Item = (u8, Bytes);
    type Error = Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Error> {
        if src.len() < 4 {
            return Ok(None);
        }

        let declared_len = u32::from_le_bytes([src[0], src[1], src[2], src[3]]);

        if declared_len == 0 {
            return Err(Error::MalformedFrame(
                "frame length header was 0 (must include at least the type byte)".to_string(),
            ));
        }
        if declared_len > self.max_frame_size {
            return Err(Error::FrameTooLarge {
                declared: declared_len,
                max: self.max_frame_size,
            });
        }

        let total = 4 + declared_len as usize;
        if src.len() < total {
            src.reserve(total - src.len());
            return Ok(None);
        }

        src.advance(4);
        let mut frame = src.split_to(declared_len as usize);
        if frame.is_empty() {
            // Unreachable given the `declared_len == 0` check above, but
            // `get_u8` below would panic on an empty buffer if that
            // invariant were ever violated by a future edit.
            return Err(Error::from_debug(declared_len));
        }
        let type_id = frame.get_u8();
        let payload = frame.freeze();

        Ok(Some((type_id, payload)))
    }
}

impl Encoder<Message> for FrameCodec {
    type Error = Error;

    fn encode(&mut self, msg: Message, dst: &mut BytesMut) -> Result<(), Error> {
        let len = 1usize
            .checked_add(msg.payload.len())
            .ok_or_else(|| Error::MalformedFrame("payload too large to frame".to_string()))?;
        if len as u64 > self.max_frame_size as u64 {
            return Err(Error::FrameTooLarge {
                declared: len as u32,
                max: self.max_frame_size,
            });
        }

        dst.reserve(4 + len);
        dst.put_u32_le(len as u32);
        dst.put_u8(msg.type_id);
        dst.put_slice(&msg.payload);
        Ok(())
    }
}

/// Encode a single message independent of any `Framed` transport; used by
/// unit tests exercising the round-trip property directly.
pub fn encode(type_id: u8, payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(4 + 1 + payload.len());
    out.extend_from_slice(&((1 + payload.len()) as u32).to_le_bytes());
    out.push(type_id);
    out.extend_from_slice(payload);
    out
}

/// Decode every complete frame out of `bytes`, returning the frames and any
/// leftover unconsumed bytes. Used by round-trip tests.
pub fn decode_all(bytes: &[u8]) -> Result<(Vec<(u8, Bytes)>, usize), Error> {
    let mut codec = FrameCodec::new();
    let mut buf = BytesMut::from(bytes);
    let mut out = Vec::new();
    while let Some((type_id, payload)) = codec.decode(&mut buf)? {
        out.push((type_id, payload));
    }
    Ok((out, buf.len()))
}

/// A `Message` carries a `Direction` purely as metadata for higher layers;
/// the wire format itself has no direction bit, so this helper is only used
/// by tests asserting the registry is consulted correctly end to end.
pub fn direction_of(type_id: u8) -> Option<Direction> {
    crate::constant::MessageType::from_type_id(type_id).map(|mt| mt.direction())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constant::MessageType;

    #[test]
    fn round_trips_a_single_frame() {
        let payload = b"hello world";
        let wire = encode(MessageType::Ok.type_id(), payload);
        let (frames, leftover) = decode_all(&wire).unwrap();
        assert_eq!(leftover, 0);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].0, MessageType::Ok.type_id());
        assert_eq!(&frames[0].1[..], payload);
    }

    #[test]
    fn round_trips_an_empty_payload() {
        let wire = encode(MessageType::AuthenticateOk.type_id(), &[]);
        let (frames, leftover) = decode_all(&wire).unwrap();
        assert_eq!(leftover, 0);
        assert_eq!(frames.len(), 1);
        assert!(frames[0].1.is_empty());
    }

    #[test]
    fn decodes_multiple_back_to_back_frames() {
        let mut wire = encode(MessageType::Capabilities.type_id(), b"abc");
        wire.extend(encode(MessageType::Ok.type_id(), b"xyz"));
        let (frames, leftover) = decode_all(&wire).unwrap();
        assert_eq!(leftover, 0);
        assert_eq!(frames.len(), 2);
        assert_eq!(&frames[0].1[..], b"abc");
        assert_eq!(&frames[1].1[..], b"xyz");
    }

    #[test]
    fn reports_consumed_bytes_as_4_plus_l_for_each_frame() {
        let wire = encode(MessageType::Row.type_id(), b"0123456789");
        assert_eq!(wire.len(), 4 + 1 + 10);
        let (frames, leftover) = decode_all(&wire).unwrap();
        assert_eq!(frames.len(), 1);
        assert_eq!(leftover, 0);
    }

    #[test]
    fn incomplete_frame_yields_none_not_error() {
        let wire = encode(MessageType::Ok.type_id(), b"hello");
        let mut codec = FrameCodec::new();
        let mut buf = BytesMut::from(&wire[..wire.len() - 1]);
        assert!(codec.decode(&mut buf).unwrap().is_none());
    }

    #[test]
    fn zero_length_header_is_malformed() {
        let mut buf = BytesMut::from(&0u32.to_le_bytes()[..]);
        let mut codec = FrameCodec::new();
        assert!(matches!(codec.decode(&mut buf), Err(Error::MalformedFrame(_))));
    }

    #[test]
    fn oversized_length_header_is_frame_too_large() {
        let mut codec = FrameCodec::with_max_frame_size(16);
        let mut buf = BytesMut::from(&100u32.to_le_bytes()[..]);
        assert!(matches!(
            codec.decode(&mut buf),
            Err(Error::FrameTooLarge { declared: 100, max: 16 })
        ));
    }

    #[test]
    fn direction_lookup_matches_registry() {
        assert_eq!(
            direction_of(MessageType::ConnectionCapabilitiesGet.type_id()),
            Some(Direction::ClientToServer)
        );
        assert_eq!(
            direction_of(MessageType::Row.type_id()),
            Some(Direction::ServerToClient)
        );
    }
}
