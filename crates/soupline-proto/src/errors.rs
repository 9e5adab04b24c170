//! Error types for framing and message codecs.

use thiserror::Error;

/// Result alias for codec operations.
pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Errors raised while framing, encoding or decoding wire messages.
///
/// Everything except [`ProtocolError::InvalidFrameLength`] is local to a single
/// message: the frame boundary around it is still trustworthy. A bad length
/// prefix means the stream itself can no longer be delimited.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    /// A frame declared a length that cannot hold its type byte.
    #[error("invalid frame length {length}: must cover at least the type byte")]
    InvalidFrameLength {
        /// Declared length prefix
        length: u16,
    },

    /// Payload does not fit the 16-bit length prefix.
    #[error("payload of {size} bytes exceeds frame maximum of {max}")]
    PayloadTooLarge {
        /// Payload size in bytes
        size: usize,
        /// Largest payload a frame can carry
        max: usize,
    },

    /// Type tag is not known for this layer and direction.
    #[error("unknown message type 0x{tag:02x}")]
    UnknownMessageType {
        /// Raw tag byte
        tag: u8,
    },

    /// Fewer bytes than the record's fixed width.
    #[error("truncated message 0x{tag:02x}: expected {expected} bytes, got {actual}")]
    TruncatedMessage {
        /// Message tag
        tag: u8,
        /// Bytes required
        expected: usize,
        /// Bytes supplied
        actual: usize,
    },

    /// More bytes than the record's fixed width.
    #[error("message 0x{tag:02x} has trailing bytes: expected {expected}, got {actual}")]
    TrailingBytes {
        /// Message tag
        tag: u8,
        /// Bytes required
        expected: usize,
        /// Bytes supplied
        actual: usize,
    },

    /// Repeating group count or size is inconsistent.
    #[error("malformed repeating block: {entries} entries in {actual} bytes (expected {expected})")]
    MalformedRepeatingBlock {
        /// Declared entry count
        entries: usize,
        /// Payload size implied by the count
        expected: usize,
        /// Payload size supplied
        actual: usize,
    },

    /// A field holds a value outside its domain.
    #[error("invalid {field}: {reason}")]
    InvalidField {
        /// Field name
        field: &'static str,
        /// What was wrong with it
        reason: String,
    },

    /// Price text could not be converted to minor units.
    #[error("invalid price {input:?}: {reason}")]
    InvalidPrice {
        /// Text as supplied
        input: String,
        /// What was wrong with it
        reason: &'static str,
    },
}

impl ProtocolError {
    /// Whether the error leaves the byte stream undelimitable.
    ///
    /// Fatal errors must tear down the connection; everything else only
    /// invalidates the message it was raised for.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::InvalidFrameLength { .. })
    }

    pub(crate) fn invalid_field(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidField { field, reason: reason.into() }
    }
}
