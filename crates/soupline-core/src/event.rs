//! Events a session reports to its consumer.

use std::time::Duration;

use soupline_proto::{ExchangeMessage, ProtocolError};

use crate::error::SessionError;

/// Something the consumer of a session should know about.
///
/// Events are the only way a session talks back: login outcomes, every decoded
/// exchange message, per-message decode failures, liveness alarms and the end
/// of the connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// Login succeeded.
    LoginAccepted {
        /// Session the exchange bound us to
        session: String,
        /// Next sequence number the exchange will send
        sequence: u64,
    },

    /// Login refused; the connection closes.
    LoginRejected {
        /// Reason code from the exchange
        reason: String,
    },

    /// Decoded exchange message.
    Message {
        /// The message
        message: ExchangeMessage,
        /// Session sequence number for sequenced data, `None` for unsequenced
        sequence: Option<u64>,
    },

    /// Debug text from the exchange.
    Debug {
        /// Text as sent
        text: String,
    },

    /// A single packet or message failed to decode; the session continues.
    ProtocolError {
        /// What went wrong
        error: ProtocolError,
    },

    /// Nothing heard from the exchange for longer than the alarm window.
    ///
    /// Raised once per silence; the connection stays up.
    LivenessAlarm {
        /// Time since the last received frame
        silence: Duration,
    },

    /// Exchange ended the session.
    EndOfSession,

    /// Connection torn down. Always the last event.
    Disconnected {
        /// Cause, `None` for a clean close
        error: Option<SessionError>,
    },
}
