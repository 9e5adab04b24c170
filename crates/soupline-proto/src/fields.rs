//! Fixed-width field primitives shared by every record.
//!
//! Encoding appends to a [`BytesMut`]; decoding walks a [`FieldCursor`] over a
//! borrowed slice. Every read is bounds-checked against the slice, so a
//! malformed record can never cause a read past the bytes the caller supplied.

use bytes::{BufMut, BytesMut};

use crate::errors::{ProtocolError, Result};

/// Pad byte for login credentials.
pub const SPACE: u8 = b' ';

/// Pad byte for every other ASCII field.
pub const NUL: u8 = 0;

/// Append `text` left-justified in a `width`-byte field.
///
/// Longer text is truncated to `width`; shorter text is right-padded with
/// `pad`.
pub fn put_ascii(buf: &mut BytesMut, text: &str, width: usize, pad: u8) {
    let bytes = text.as_bytes();
    let used = bytes.len().min(width);
    buf.put_slice(&bytes[..used]);
    buf.put_bytes(pad, width - used);
}

/// Append an unsigned integer as ASCII decimal in a `width`-byte field.
pub fn put_ascii_number(buf: &mut BytesMut, value: u64, width: usize, pad: u8) {
    put_ascii(buf, &value.to_string(), width, pad);
}

/// Reject a record whose length differs from its fixed width.
pub fn expect_len(tag: u8, body: &[u8], expected: usize) -> Result<()> {
    let actual = body.len();
    if actual < expected {
        return Err(ProtocolError::TruncatedMessage { tag, expected, actual });
    }
    if actual > expected {
        return Err(ProtocolError::TrailingBytes { tag, expected, actual });
    }
    Ok(())
}

/// Bounds-checked sequential reader over one record body.
#[derive(Debug, Clone)]
pub struct FieldCursor<'a> {
    tag: u8,
    buf: &'a [u8],
    pos: usize,
}

impl<'a> FieldCursor<'a> {
    /// Start reading `buf`, the body of a record tagged `tag`.
    pub fn new(tag: u8, buf: &'a [u8]) -> Self {
        Self { tag, buf, pos: 0 }
    }

    /// Bytes not yet consumed.
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    /// Take the next `n` bytes.
    pub fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        if self.remaining() < n {
            return Err(ProtocolError::TruncatedMessage {
                tag: self.tag,
                expected: self.pos + n,
                actual: self.buf.len(),
            });
        }
        let bytes = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(bytes)
    }

    /// Take the next `N` bytes as an array.
    pub fn array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    /// Read a `u8`.
    pub fn u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    /// Read an `i8`.
    pub fn i8(&mut self) -> Result<i8> {
        Ok(i8::from_be_bytes(self.array()?))
    }

    /// Read a big-endian `u16`.
    pub fn u16(&mut self) -> Result<u16> {
        Ok(u16::from_be_bytes(self.array()?))
    }

    /// Read a big-endian `u32`.
    pub fn u32(&mut self) -> Result<u32> {
        Ok(u32::from_be_bytes(self.array()?))
    }

    /// Read a big-endian `i32`.
    pub fn i32(&mut self) -> Result<i32> {
        Ok(i32::from_be_bytes(self.array()?))
    }

    /// Read a big-endian `u64`.
    pub fn u64(&mut self) -> Result<u64> {
        Ok(u64::from_be_bytes(self.array()?))
    }

    /// Read a `width`-byte ASCII field, stripping trailing `pad` bytes.
    pub fn ascii(&mut self, field: &'static str, width: usize, pad: u8) -> Result<String> {
        let raw = self.take(width)?;
        let end = raw.iter().rposition(|&b| b != pad).map_or(0, |i| i + 1);
        let text = &raw[..end];
        if !text.is_ascii() {
            return Err(ProtocolError::invalid_field(field, "contains non-ASCII bytes"));
        }
        Ok(text.iter().map(|&b| char::from(b)).collect())
    }

    /// Read a `width`-byte ASCII decimal field.
    ///
    /// Null and space padding are both tolerated on either side; an all-pad
    /// field reads as zero.
    pub fn ascii_number(&mut self, field: &'static str, width: usize) -> Result<u64> {
        let raw = self.take(width)?;
        let digits: &[u8] = trim_pad(raw);
        if digits.is_empty() {
            return Ok(0);
        }
        if !digits.iter().all(u8::is_ascii_digit) {
            return Err(ProtocolError::invalid_field(field, "expected ASCII digits"));
        }
        digits.iter().try_fold(0u64, |acc, &d| {
            acc.checked_mul(10)
                .and_then(|acc| acc.checked_add(u64::from(d - b'0')))
                .ok_or_else(|| ProtocolError::invalid_field(field, "overflows u64"))
        })
    }
}

fn trim_pad(raw: &[u8]) -> &[u8] {
    let is_pad = |b: &u8| *b == NUL || *b == SPACE;
    let start = raw.iter().position(|b| !is_pad(b)).unwrap_or(raw.len());
    let end = raw.iter().rposition(|b| !is_pad(b)).map_or(start, |i| i + 1);
    &raw[start..end]
}
