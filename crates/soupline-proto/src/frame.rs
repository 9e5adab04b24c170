//! Session-layer frame: `length:u16 | type:u8 | payload`.
//!
//! `length` counts the type byte plus the payload and excludes itself, so a
//! frame on the wire is always `2 + length` bytes and `length >= 1`.

use bytes::{BufMut, Bytes, BytesMut};

use crate::errors::{ProtocolError, Result};

/// One length-prefixed, type-tagged unit of the session protocol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Packet type byte
    pub packet_type: u8,
    /// Bytes after the type byte
    pub payload: Bytes,
}

impl Frame {
    /// Size of the length prefix in bytes.
    pub const LENGTH_PREFIX: usize = 2;

    /// Length prefix plus type byte.
    pub const HEADER_SIZE: usize = Self::LENGTH_PREFIX + 1;

    /// Largest payload the 16-bit length prefix can describe.
    pub const MAX_PAYLOAD: usize = u16::MAX as usize - 1;

    /// Create a frame.
    pub fn new(packet_type: u8, payload: impl Into<Bytes>) -> Self {
        Self { packet_type, payload: payload.into() }
    }

    /// Value of the length prefix for this frame.
    pub fn length(&self) -> Result<u16> {
        if self.payload.len() > Self::MAX_PAYLOAD {
            return Err(ProtocolError::PayloadTooLarge {
                size: self.payload.len(),
                max: Self::MAX_PAYLOAD,
            });
        }
        Ok(self.payload.len() as u16 + 1)
    }

    /// Total bytes this frame occupies on the wire.
    pub fn encoded_len(&self) -> usize {
        Self::HEADER_SIZE + self.payload.len()
    }

    /// Append the wire form of this frame to `dst`.
    pub fn encode(&self, dst: &mut BytesMut) -> Result<()> {
        let length = self.length()?;
        dst.reserve(self.encoded_len());
        dst.put_u16(length);
        dst.put_u8(self.packet_type);
        dst.put_slice(&self.payload);
        Ok(())
    }

    /// Wire form of this frame as a standalone buffer.
    pub fn to_bytes(&self) -> Result<Bytes> {
        let mut buf = BytesMut::with_capacity(self.encoded_len());
        self.encode(&mut buf)?;
        Ok(buf.freeze())
    }
}

#[cfg(test)]
mod tests {
    use hex_literal::hex;

    use super::*;

    #[test]
    fn heartbeat_is_three_bytes() {
        let frame = Frame::new(b'R', Bytes::new());
        assert_eq!(frame.to_bytes().unwrap().as_ref(), hex!("0001 52"));
    }

    #[test]
    fn length_covers_type_and_payload() {
        let frame = Frame::new(b'U', Bytes::from_static(b"XTOKEN"));
        assert_eq!(frame.length().unwrap(), 7);
        assert_eq!(frame.to_bytes().unwrap().as_ref(), b"\x00\x07UXTOKEN");
    }

    #[test]
    fn oversized_payload_is_rejected() {
        let frame = Frame::new(b'S', vec![0u8; Frame::MAX_PAYLOAD + 1]);
        let err = frame.to_bytes().unwrap_err();
        assert!(matches!(err, ProtocolError::PayloadTooLarge { .. }));
    }

    #[test]
    fn largest_payload_fits() {
        let frame = Frame::new(b'S', vec![0u8; Frame::MAX_PAYLOAD]);
        assert_eq!(frame.length().unwrap(), u16::MAX);
    }
}
