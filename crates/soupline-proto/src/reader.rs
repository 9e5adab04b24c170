//! Frame reassembly over an arbitrarily chunked byte stream.
//!
//! TCP delivers bytes, not frames: one read may hold half a frame or twenty.
//! [`FrameReader`] buffers whatever arrives and only hands out frames that are
//! fully present, keeping any partial tail for the next call.
//!
//! # Example
//!
//! ```
//! use soupline_proto::FrameReader;
//!
//! let mut reader = FrameReader::new();
//! assert!(reader.feed(&[0x00, 0x01]).unwrap().is_empty());
//! let frames = reader.feed(b"H").unwrap();
//! assert_eq!(frames[0].packet_type, b'H');
//! ```

use bytes::{Buf, BytesMut};

use crate::{
    errors::{ProtocolError, Result},
    frame::Frame,
};

/// Default buffer capacity; comfortably holds the largest OUCH record.
const DEFAULT_CAPACITY: usize = 4 * 1024;

/// Accumulates stream bytes and extracts complete frames.
#[derive(Debug)]
pub struct FrameReader {
    buffer: BytesMut,
}

impl FrameReader {
    /// Create an empty reader.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Create an empty reader with a preallocated buffer.
    pub fn with_capacity(capacity: usize) -> Self {
        Self { buffer: BytesMut::with_capacity(capacity) }
    }

    /// Append `chunk` and return every frame that is now complete, in order.
    ///
    /// Partial data stays buffered. A zero length prefix is fatal: the stream
    /// cannot be re-delimited, and the buffered bytes are left untouched.
    pub fn feed(&mut self, chunk: &[u8]) -> Result<Vec<Frame>> {
        self.buffer.extend_from_slice(chunk);

        let mut frames = Vec::new();
        while let Some(frame) = self.try_extract_one()? {
            frames.push(frame);
        }
        Ok(frames)
    }

    fn try_extract_one(&mut self) -> Result<Option<Frame>> {
        if self.buffer.len() < Frame::LENGTH_PREFIX {
            return Ok(None);
        }

        let length = u16::from_be_bytes([self.buffer[0], self.buffer[1]]);
        if length == 0 {
            return Err(ProtocolError::InvalidFrameLength { length });
        }

        let total = Frame::LENGTH_PREFIX + usize::from(length);
        if self.buffer.len() < total {
            return Ok(None);
        }

        let mut raw = self.buffer.split_to(total);
        raw.advance(Frame::LENGTH_PREFIX);
        let packet_type = raw.get_u8();
        Ok(Some(Frame::new(packet_type, raw.freeze())))
    }

    /// Bytes received but not yet returned as frames.
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Whether no partial frame is pending.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Drop any buffered partial frame.
    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}

impl Default for FrameReader {
    fn default() -> Self {
        Self::new()
    }
}
