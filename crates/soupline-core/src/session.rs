//! Session state machine.
//!
//! Owns the login handshake, the inbound sequence counter and the logout path
//! for one connection. It never touches a stream: every method returns
//! [`SessionAction`]s for the runtime to execute.
//!
//! # State Machine
//!
//! ```text
//! ┌──────────────┐ connect ┌────────────┐ LoginRequest ┌───────────────────────┐
//! │ Disconnected │────────>│ Connecting │─────────────>│ AwaitingLoginResponse │
//! └──────────────┘         └────────────┘              └───────────────────────┘
//!        ^                                                 │              │
//!        │ LoginRejected / EndOfSession / disconnect       │ LoginAccepted│
//!        │ / transport closed                              ↓              │
//!        │                                           ┌──────────┐         │
//!        └───────────────────────────────────────────│ LoggedIn │<────────┘
//!                                                    └──────────┘
//! ```
//!
//! `Connecting` only lasts for the duration of [`Session::connect`]: the login
//! request is queued in the same call. Only one login may be outstanding, so a
//! second `connect` outside `Disconnected` is refused.

use soupline_proto::{
    ClientMessage, ExchangeMessage, SessionPacket,
    packet::{LoginAccepted, LoginRequest},
};
use tracing::{debug, info, warn};

use crate::{error::SessionError, event::SessionEvent};

/// Actions returned by the session state machine.
///
/// The runtime executes these in order:
/// - `Send`: queue the packet on the single outbound writer
/// - `Emit`: deliver the event to subscribers
/// - `Close`: stop all tasks and release the stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionAction {
    /// Queue this packet for the exchange
    Send(SessionPacket),

    /// Report this event
    Emit(SessionEvent),

    /// Tear the connection down
    Close {
        /// Cause, `None` for a clean close
        error: Option<SessionError>,
    },
}

/// Session state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    /// No login outstanding; initial and terminal
    Disconnected,
    /// Building the login request
    Connecting,
    /// Login sent, waiting for accept or reject
    AwaitingLoginResponse,
    /// Logged in; order flow allowed
    LoggedIn,
}

/// Login credentials.
///
/// `Debug` never prints the password.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    /// Username, at most 6 ASCII characters
    pub username: String,
    /// Password, at most 10 ASCII characters
    pub password: String,
    /// Session to rejoin; empty for the current one
    pub requested_session: String,
    /// Next sequence number wanted; 0 for the most recent
    pub requested_sequence: u64,
}

impl Credentials {
    /// Credentials joining the current session at its latest message.
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            requested_session: String::new(),
            requested_sequence: 0,
        }
    }

    /// Rejoin `session` starting from `sequence`.
    #[must_use]
    pub fn resume(mut self, session: impl Into<String>, sequence: u64) -> Self {
        self.requested_session = session.into();
        self.requested_sequence = sequence;
        self
    }

    fn login_request(&self) -> LoginRequest {
        LoginRequest {
            username: self.username.clone(),
            password: self.password.clone(),
            requested_session: self.requested_session.clone(),
            requested_sequence: self.requested_sequence,
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("requested_session", &self.requested_session)
            .field("requested_sequence", &self.requested_sequence)
            .finish()
    }
}

/// Session state machine
///
/// One instance per connection, created when the stream comes up and dropped
/// with it. Nothing carries over between connections.
#[derive(Debug, Clone)]
pub struct Session {
    /// Current state
    state: SessionState,
    /// Session bound at login
    session_id: Option<String>,
    /// Sequence number of the next sequenced message from the exchange
    expected_sequence: u64,
}

impl Session {
    /// Create a session in `Disconnected`
    pub fn new() -> Self {
        Self { state: SessionState::Disconnected, session_id: None, expected_sequence: 0 }
    }

    /// Get current state
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Session bound at login, if logged in
    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    /// Sequence number the next sequenced message will carry
    pub fn expected_sequence(&self) -> u64 {
        self.expected_sequence
    }

    /// Whether order flow is allowed
    pub fn is_logged_in(&self) -> bool {
        self.state == SessionState::LoggedIn
    }

    /// Start the login handshake.
    ///
    /// # Errors
    ///
    /// Returns `AlreadyConnected` unless the session is `Disconnected`.
    pub fn connect(&mut self, credentials: &Credentials) -> Result<Vec<SessionAction>, SessionError> {
        if self.state != SessionState::Disconnected {
            return Err(SessionError::AlreadyConnected);
        }

        self.state = SessionState::Connecting;
        self.session_id = None;
        self.expected_sequence = 0;

        let login = SessionPacket::LoginRequest(credentials.login_request());
        self.state = SessionState::AwaitingLoginResponse;
        debug!(username = %credentials.username, "login request queued");

        Ok(vec![SessionAction::Send(login)])
    }

    /// Handle a packet from the exchange.
    ///
    /// Liveness bookkeeping is not done here; the runtime feeds every frame to
    /// the heartbeat monitor separately.
    ///
    /// # Errors
    ///
    /// Returns `UnexpectedPacket` for packets the current state does not
    /// accept. The error is local to the packet; the session is unchanged.
    pub fn handle_packet(
        &mut self,
        packet: SessionPacket,
    ) -> Result<Vec<SessionAction>, SessionError> {
        match (self.state, packet) {
            (SessionState::AwaitingLoginResponse, SessionPacket::LoginAccepted(accepted)) => {
                Ok(self.login_accepted(accepted))
            },
            (SessionState::AwaitingLoginResponse, SessionPacket::LoginRejected { reason }) => {
                warn!(%reason, "login rejected");
                self.state = SessionState::Disconnected;
                Ok(vec![
                    SessionAction::Emit(SessionEvent::LoginRejected { reason: reason.clone() }),
                    SessionAction::Close { error: Some(SessionError::LoginRejected { reason }) },
                ])
            },
            (SessionState::LoggedIn, SessionPacket::SequencedData { message }) => {
                let sequence = self.expected_sequence;
                self.expected_sequence = self.expected_sequence.wrapping_add(1);
                Ok(vec![Self::surface(&message, Some(sequence))])
            },
            (SessionState::LoggedIn, SessionPacket::UnsequencedData { message }) => {
                Ok(vec![Self::surface(&message, None)])
            },
            (
                SessionState::AwaitingLoginResponse | SessionState::LoggedIn,
                SessionPacket::ServerHeartbeat,
            ) => Ok(Vec::new()),
            (_, SessionPacket::Debug { text }) => {
                debug!(%text, "exchange debug packet");
                Ok(vec![SessionAction::Emit(SessionEvent::Debug { text })])
            },
            (
                SessionState::AwaitingLoginResponse | SessionState::LoggedIn,
                SessionPacket::EndOfSession,
            ) => {
                info!(session = ?self.session_id, "exchange ended the session");
                self.state = SessionState::Disconnected;
                Ok(vec![
                    SessionAction::Emit(SessionEvent::EndOfSession),
                    SessionAction::Close { error: None },
                ])
            },
            (state, packet) => {
                Err(SessionError::UnexpectedPacket { state, packet_type: packet.packet_type() })
            },
        }
    }

    fn login_accepted(&mut self, accepted: LoginAccepted) -> Vec<SessionAction> {
        info!(session = %accepted.session, sequence = accepted.sequence, "logged in");
        self.state = SessionState::LoggedIn;
        self.expected_sequence = accepted.sequence;
        self.session_id = Some(accepted.session.clone());

        vec![SessionAction::Emit(SessionEvent::LoginAccepted {
            session: accepted.session,
            sequence: accepted.sequence,
        })]
    }

    fn surface(message: &[u8], sequence: Option<u64>) -> SessionAction {
        match ExchangeMessage::parse(message) {
            Ok(message) => SessionAction::Emit(SessionEvent::Message { message, sequence }),
            Err(error) => {
                warn!(%error, ?sequence, "dropping undecodable exchange message");
                SessionAction::Emit(SessionEvent::ProtocolError { error })
            },
        }
    }

    /// Wrap an order-flow message for the exchange.
    ///
    /// Order flow from the client is unsequenced.
    ///
    /// # Errors
    ///
    /// Returns `NotLoggedIn` before login completes, or `Protocol` if the
    /// message cannot be encoded.
    pub fn send_message(&self, message: &ClientMessage) -> Result<SessionPacket, SessionError> {
        self.require_logged_in()?;
        Ok(SessionPacket::UnsequencedData { message: message.encode()? })
    }

    /// Wrap a message as sequenced data.
    ///
    /// The runtime counts these as they reach the stream.
    ///
    /// # Errors
    ///
    /// Same as [`Session::send_message`].
    pub fn send_sequenced(&self, message: &ClientMessage) -> Result<SessionPacket, SessionError> {
        self.require_logged_in()?;
        Ok(SessionPacket::SequencedData { message: message.encode()? })
    }

    fn require_logged_in(&self) -> Result<(), SessionError> {
        if self.state != SessionState::LoggedIn {
            return Err(SessionError::NotLoggedIn { state: self.state });
        }
        Ok(())
    }

    /// Log out.
    ///
    /// The logout request is sent without waiting for an acknowledgment and
    /// the connection closes right after it. Calling this on a disconnected
    /// session does nothing.
    pub fn disconnect(&mut self) -> Vec<SessionAction> {
        if self.state == SessionState::Disconnected {
            return Vec::new();
        }

        info!(session = ?self.session_id, "logging out");
        self.state = SessionState::Disconnected;
        vec![SessionAction::Send(SessionPacket::LogoutRequest), SessionAction::Close { error: None }]
    }

    /// Record that the stream is gone.
    ///
    /// Returns the state the session was in.
    pub fn transport_closed(&mut self) -> SessionState {
        std::mem::replace(&mut self.state, SessionState::Disconnected)
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}
