//! Session error types.

use std::io;

use soupline_proto::{PacketType, ProtocolError};
use thiserror::Error;

use crate::session::SessionState;

/// Errors raised by the session layer and its runtime.
///
/// `Clone` so the same error can be returned to a caller and broadcast to every
/// event subscriber.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// A login is already outstanding or established on this connection.
    #[error("session already connected")]
    AlreadyConnected,

    /// Order flow attempted before login completed.
    #[error("not logged in (state: {state:?})")]
    NotLoggedIn {
        /// State at the time of the call
        state: SessionState,
    },

    /// Exchange refused the login.
    #[error("login rejected: {reason}")]
    LoginRejected {
        /// Reason code from the exchange
        reason: String,
    },

    /// Packet not valid in the current state.
    #[error("unexpected {packet_type:?} in state {state:?}")]
    UnexpectedPacket {
        /// State when the packet arrived
        state: SessionState,
        /// Packet that arrived
        packet_type: PacketType,
    },

    /// Framing or codec failure.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// Stream I/O failure.
    #[error("transport error ({kind}): {message}")]
    Transport {
        /// I/O error kind
        kind: io::ErrorKind,
        /// I/O error text
        message: String,
    },

    /// Writer task is gone; the connection is closing or closed.
    #[error("outbound queue closed")]
    QueueClosed,

    /// A task panicked while holding session state.
    #[error("session state poisoned")]
    StatePoisoned,
}

impl SessionError {
    /// Whether the connection cannot continue after this error.
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::Protocol(err) => err.is_fatal(),
            Self::Transport { .. } | Self::QueueClosed | Self::LoginRejected { .. } => true,
            Self::AlreadyConnected
            | Self::NotLoggedIn { .. }
            | Self::UnexpectedPacket { .. }
            | Self::StatePoisoned => false,
        }
    }
}

impl From<io::Error> for SessionError {
    fn from(err: io::Error) -> Self {
        Self::Transport { kind: err.kind(), message: err.to_string() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_errors_keep_kind() {
        let err = SessionError::from(io::Error::new(io::ErrorKind::ConnectionReset, "reset"));
        assert_eq!(
            err,
            SessionError::Transport { kind: io::ErrorKind::ConnectionReset, message: "reset".into() }
        );
        assert!(err.is_fatal());
    }

    #[test]
    fn only_framing_errors_are_fatal_protocol_errors() {
        assert!(SessionError::from(ProtocolError::InvalidFrameLength { length: 0 }).is_fatal());
        assert!(!SessionError::from(ProtocolError::UnknownMessageType { tag: 0xFF }).is_fatal());
    }
}
