//! Session-layer packets.
//!
//! | tag | packet | direction |
//! |-----|--------|-----------|
//! | `L` | LoginRequest | client → server |
//! | `A` | LoginAccepted | server → client |
//! | `J` | LoginRejected | server → client |
//! | `S` | SequencedData | either |
//! | `U` | UnsequencedData | either |
//! | `R` | ClientHeartbeat | client → server |
//! | `H` | ServerHeartbeat | server → client |
//! | `O` | LogoutRequest | client → server |
//! | `Z` | EndOfSession | server → client |
//! | `+` | Debug | either |
//!
//! Login credentials are space-padded; every other text field is null-padded.
//! Sequence numbers travel as ASCII decimal.

use bytes::{Bytes, BytesMut};

use crate::{
    errors::{ProtocolError, Result},
    fields::{self, FieldCursor, NUL, SPACE},
    frame::Frame,
};

/// Session packet type tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum PacketType {
    /// `L`
    LoginRequest = b'L',
    /// `A`
    LoginAccepted = b'A',
    /// `J`
    LoginRejected = b'J',
    /// `S`
    SequencedData = b'S',
    /// `U`
    UnsequencedData = b'U',
    /// `R`
    ClientHeartbeat = b'R',
    /// `H`
    ServerHeartbeat = b'H',
    /// `O`
    LogoutRequest = b'O',
    /// `Z`
    EndOfSession = b'Z',
    /// `+`
    Debug = b'+',
}

impl PacketType {
    /// Parse a tag byte.
    pub fn from_u8(tag: u8) -> Option<Self> {
        Some(match tag {
            b'L' => Self::LoginRequest,
            b'A' => Self::LoginAccepted,
            b'J' => Self::LoginRejected,
            b'S' => Self::SequencedData,
            b'U' => Self::UnsequencedData,
            b'R' => Self::ClientHeartbeat,
            b'H' => Self::ServerHeartbeat,
            b'O' => Self::LogoutRequest,
            b'Z' => Self::EndOfSession,
            b'+' => Self::Debug,
            _ => return None,
        })
    }

    /// Tag byte on the wire.
    pub fn to_u8(self) -> u8 {
        self as u8
    }
}

/// Login request sent by the client once the stream is up.
#[derive(Clone, PartialEq, Eq)]
pub struct LoginRequest {
    /// Username, at most 6 bytes
    pub username: String,
    /// Password, at most 10 bytes
    pub password: String,
    /// Session to join; empty for the currently active one
    pub requested_session: String,
    /// Next sequence number wanted; 0 for the most recent
    pub requested_sequence: u64,
}

impl LoginRequest {
    /// Encoded payload size.
    pub const SIZE: usize = Self::USERNAME + Self::PASSWORD + SESSION_WIDTH + SEQUENCE_WIDTH;
    const USERNAME: usize = 6;
    const PASSWORD: usize = 10;

    fn encode(&self, buf: &mut BytesMut) {
        fields::put_ascii(buf, &self.username, Self::USERNAME, SPACE);
        fields::put_ascii(buf, &self.password, Self::PASSWORD, SPACE);
        fields::put_ascii(buf, &self.requested_session, SESSION_WIDTH, NUL);
        fields::put_ascii_number(buf, self.requested_sequence, SEQUENCE_WIDTH, NUL);
    }

    fn decode(body: &[u8]) -> Result<Self> {
        fields::expect_len(PacketType::LoginRequest.to_u8(), body, Self::SIZE)?;
        let mut c = FieldCursor::new(PacketType::LoginRequest.to_u8(), body);
        Ok(Self {
            username: c.ascii("username", Self::USERNAME, SPACE)?,
            password: c.ascii("password", Self::PASSWORD, SPACE)?,
            requested_session: c.ascii("requested_session", SESSION_WIDTH, NUL)?,
            requested_sequence: c.ascii_number("requested_sequence", SEQUENCE_WIDTH)?,
        })
    }
}

impl std::fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginRequest")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("requested_session", &self.requested_session)
            .field("requested_sequence", &self.requested_sequence)
            .finish()
    }
}

/// Positive login response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginAccepted {
    /// Session the client is now bound to
    pub session: String,
    /// Sequence number of the next sequenced message the server will send
    pub sequence: u64,
}

impl LoginAccepted {
    /// Encoded payload size.
    pub const SIZE: usize = SESSION_WIDTH + SEQUENCE_WIDTH;

    fn encode(&self, buf: &mut BytesMut) {
        fields::put_ascii(buf, &self.session, SESSION_WIDTH, NUL);
        fields::put_ascii_number(buf, self.sequence, SEQUENCE_WIDTH, NUL);
    }

    fn decode(body: &[u8]) -> Result<Self> {
        fields::expect_len(PacketType::LoginAccepted.to_u8(), body, Self::SIZE)?;
        let mut c = FieldCursor::new(PacketType::LoginAccepted.to_u8(), body);
        Ok(Self {
            session: c.ascii("session", SESSION_WIDTH, NUL)?,
            sequence: c.ascii_number("sequence", SEQUENCE_WIDTH)?,
        })
    }
}

const SESSION_WIDTH: usize = 10;
const SEQUENCE_WIDTH: usize = 20;
const REASON_WIDTH: usize = 1;

/// Reject reason: bad credentials.
pub const REJECT_NOT_AUTHORIZED: &str = "A";

/// Reject reason: requested session is not available.
pub const REJECT_SESSION_UNAVAILABLE: &str = "S";

/// A decoded session-layer packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionPacket {
    /// Client login
    LoginRequest(LoginRequest),
    /// Login succeeded
    LoginAccepted(LoginAccepted),
    /// Login failed
    LoginRejected {
        /// One-character reason code
        reason: String,
    },
    /// Application message counted toward the session sequence
    SequencedData {
        /// Raw application record, tag first
        message: Bytes,
    },
    /// Application message outside the session sequence
    UnsequencedData {
        /// Raw application record, tag first
        message: Bytes,
    },
    /// Client keep-alive
    ClientHeartbeat,
    /// Server keep-alive
    ServerHeartbeat,
    /// Client is ending the session
    LogoutRequest,
    /// Server has ended the session
    EndOfSession,
    /// Free-form diagnostic text
    Debug {
        /// Text as sent
        text: String,
    },
}

impl SessionPacket {
    /// Type tag for this packet.
    pub fn packet_type(&self) -> PacketType {
        match self {
            Self::LoginRequest(_) => PacketType::LoginRequest,
            Self::LoginAccepted(_) => PacketType::LoginAccepted,
            Self::LoginRejected { .. } => PacketType::LoginRejected,
            Self::SequencedData { .. } => PacketType::SequencedData,
            Self::UnsequencedData { .. } => PacketType::UnsequencedData,
            Self::ClientHeartbeat => PacketType::ClientHeartbeat,
            Self::ServerHeartbeat => PacketType::ServerHeartbeat,
            Self::LogoutRequest => PacketType::LogoutRequest,
            Self::EndOfSession => PacketType::EndOfSession,
            Self::Debug { .. } => PacketType::Debug,
        }
    }

    /// Whether this packet advances the sender's session sequence.
    pub fn is_sequenced(&self) -> bool {
        matches!(self, Self::SequencedData { .. })
    }

    /// Build the frame carrying this packet.
    pub fn to_frame(&self) -> Frame {
        let mut body = BytesMut::new();
        match self {
            Self::LoginRequest(login) => login.encode(&mut body),
            Self::LoginAccepted(accepted) => accepted.encode(&mut body),
            Self::LoginRejected { reason } => {
                fields::put_ascii(&mut body, reason, REASON_WIDTH, NUL);
            },
            Self::SequencedData { message } | Self::UnsequencedData { message } => {
                return Frame::new(self.packet_type().to_u8(), message.clone());
            },
            Self::Debug { text } => body.extend_from_slice(text.as_bytes()),
            Self::ClientHeartbeat
            | Self::ServerHeartbeat
            | Self::LogoutRequest
            | Self::EndOfSession => {},
        }
        Frame::new(self.packet_type().to_u8(), body.freeze())
    }

    /// Append the wire form of this packet to `dst`.
    pub fn encode(&self, dst: &mut BytesMut) -> Result<()> {
        self.to_frame().encode(dst)
    }

    /// Decode the packet carried by `frame`.
    pub fn from_frame(frame: &Frame) -> Result<Self> {
        Self::decode(frame.packet_type, &frame.payload)
    }

    /// Decode a packet from its type tag and payload.
    pub fn decode(tag: u8, payload: &Bytes) -> Result<Self> {
        let packet_type =
            PacketType::from_u8(tag).ok_or(ProtocolError::UnknownMessageType { tag })?;

        Ok(match packet_type {
            PacketType::LoginRequest => Self::LoginRequest(LoginRequest::decode(payload)?),
            PacketType::LoginAccepted => Self::LoginAccepted(LoginAccepted::decode(payload)?),
            PacketType::LoginRejected => {
                fields::expect_len(tag, payload, REASON_WIDTH)?;
                let reason = FieldCursor::new(tag, payload).ascii("reason", REASON_WIDTH, NUL)?;
                Self::LoginRejected { reason }
            },
            PacketType::SequencedData => Self::SequencedData { message: payload.clone() },
            PacketType::UnsequencedData => Self::UnsequencedData { message: payload.clone() },
            PacketType::Debug => {
                let text = FieldCursor::new(tag, payload).ascii("text", payload.len(), NUL)?;
                Self::Debug { text }
            },
            PacketType::ClientHeartbeat => empty(tag, payload, Self::ClientHeartbeat)?,
            PacketType::ServerHeartbeat => empty(tag, payload, Self::ServerHeartbeat)?,
            PacketType::LogoutRequest => empty(tag, payload, Self::LogoutRequest)?,
            PacketType::EndOfSession => empty(tag, payload, Self::EndOfSession)?,
        })
    }
}

fn empty(tag: u8, payload: &[u8], packet: SessionPacket) -> Result<SessionPacket> {
    fields::expect_len(tag, payload, 0)?;
    Ok(packet)
}
