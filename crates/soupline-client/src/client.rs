//! Session client: the collaborator-facing handle for one connection.
//!
//! # Architecture
//!
//! ```text
//!  send_order ─┐                       ┌──────────────┐
//!  disconnect ─┼──> outbound queue ───>│ writer task  │──> stream
//!  heartbeat ──┘    (unbounded, FIFO)  └──────────────┘
//!
//!  stream ──> reader task ──> Session ──> events (broadcast)
//!                  │
//!                  └──> HeartbeatMonitor <── heartbeat task (polls)
//! ```
//!
//! One writer drains one queue, so bytes reach the stream in the order
//! `send_*` was called. The writer is the only place that advances the
//! outbound sequence counter. [`Session`] and [`HeartbeatMonitor`] sit behind
//! separate short-lived locks that are never held together or across an
//! `.await`.
//!
//! All three tasks belong to the client's `JoinSet`: dropping the client
//! aborts them and releases the stream.

use std::sync::{
    Arc, Mutex, MutexGuard,
    atomic::{AtomicBool, AtomicU64, Ordering},
};

use soupline_core::{
    Credentials, Environment, HeartbeatMonitor, Session, SessionAction, SessionError,
    SessionEvent, SessionState, Transport,
};
use soupline_proto::{ClientMessage, Frame, SessionPacket};
use tokio::{
    io::{AsyncRead, AsyncWrite},
    sync::{broadcast, mpsc, watch},
    task::JoinSet,
};
use tracing::{debug, info, trace, warn};

use crate::{config::SessionConfig, tasks};

/// Work item for the writer task.
#[derive(Debug)]
pub(crate) enum Outbound {
    /// Encode and write this packet.
    Packet(SessionPacket),
    /// Flush, shut the stream down and tear the connection down.
    Close(Option<SessionError>),
}

/// State shared by the client handle and its tasks.
pub(crate) struct Shared<E> {
    pub(crate) env: E,
    pub(crate) config: SessionConfig,
    session: Mutex<Session>,
    heartbeat: Mutex<HeartbeatMonitor>,
    /// Sequenced packets written to the stream; advanced by the writer only.
    outbound_seq: AtomicU64,
    /// A close has been handed to the writer.
    closing: AtomicBool,
    outbound: mpsc::UnboundedSender<Outbound>,
    events: broadcast::Sender<SessionEvent>,
    shutdown: watch::Sender<bool>,
}

impl<E: Environment> Shared<E> {
    pub(crate) fn session(&self) -> Result<MutexGuard<'_, Session>, SessionError> {
        self.session.lock().map_err(|_| SessionError::StatePoisoned)
    }

    pub(crate) fn heartbeat(&self) -> Result<MutexGuard<'_, HeartbeatMonitor>, SessionError> {
        self.heartbeat.lock().map_err(|_| SessionError::StatePoisoned)
    }

    /// Make both locks usable again after a panic while one was held.
    ///
    /// Both hold plain values that every method leaves consistent, so the
    /// state behind a poisoned lock is still valid.
    pub(crate) fn clear_poison(&self) {
        self.session.clear_poison();
        self.heartbeat.clear_poison();
    }

    pub(crate) fn shutdown_signal(&self) -> watch::Receiver<bool> {
        self.shutdown.subscribe()
    }

    pub(crate) fn enqueue(&self, packet: SessionPacket) -> Result<(), SessionError> {
        self.outbound.send(Outbound::Packet(packet)).map_err(|_| SessionError::QueueClosed)
    }

    pub(crate) fn emit(&self, event: SessionEvent) {
        if self.events.send(event).is_err() {
            trace!("no event subscribers");
        }
    }

    pub(crate) fn sequenced_written(&self) {
        self.outbound_seq.fetch_add(1, Ordering::AcqRel);
    }

    pub(crate) fn is_closing(&self) -> bool {
        self.closing.load(Ordering::Acquire)
    }

    /// Route a close through the writer so queued packets go out first.
    fn close(&self, error: Option<SessionError>) {
        self.closing.store(true, Ordering::Release);
        if let Err(mpsc::error::SendError(Outbound::Close(error))) =
            self.outbound.send(Outbound::Close(error))
        {
            self.teardown(error);
        }
    }

    /// Mark the connection closed and report it. Only the first call has any
    /// effect; later callers find the flag already set.
    pub(crate) fn teardown(&self, error: Option<SessionError>) {
        if self.shutdown.send_replace(true) {
            return;
        }

        let previous = match self.session() {
            Ok(mut session) => Some(session.transport_closed()),
            Err(_) => None,
        };
        match &error {
            None => info!(?previous, "session closed"),
            Some(error) => warn!(%error, ?previous, "session closed with error"),
        }
        self.emit(SessionEvent::Disconnected { error });
    }

    pub(crate) fn execute(&self, actions: Vec<SessionAction>) -> Result<(), SessionError> {
        for action in actions {
            match action {
                SessionAction::Send(packet) => self.enqueue(packet)?,
                SessionAction::Emit(event) => self.emit(event),
                SessionAction::Close { error } => self.close(error),
            }
        }
        Ok(())
    }

    /// Process one inbound frame.
    ///
    /// Every frame counts as liveness, decodable or not.
    pub(crate) fn handle_frame(&self, frame: &Frame) -> Result<(), SessionError> {
        self.heartbeat()?.record_received(self.env.now());

        let packet = match SessionPacket::from_frame(frame) {
            Ok(packet) => packet,
            Err(error) => {
                warn!(%error, packet_type = frame.packet_type, "undecodable session packet");
                self.emit(SessionEvent::ProtocolError { error });
                return Ok(());
            },
        };
        debug!(packet_type = ?packet.packet_type(), "received");

        let result = self.session()?.handle_packet(packet);
        match result {
            Ok(actions) => self.execute(actions),
            Err(error) => {
                warn!(%error, "ignoring packet");
                Ok(())
            },
        }
    }
}

/// Handle to one live session.
///
/// Created by [`SessionClient::connect`] (or [`SessionClient::start`] over an
/// already open stream). The login request is queued before this returns;
/// the outcome arrives as an event.
///
/// Event subscribers use a bounded broadcast channel: a subscriber that falls
/// more than the configured capacity behind skips the oldest events and sees
/// `RecvError::Lagged`.
pub struct SessionClient<E: Environment> {
    shared: Arc<Shared<E>>,
    credentials: Credentials,
    tasks: JoinSet<()>,
}

impl<E: Environment> SessionClient<E> {
    /// Connect over `transport` and log in.
    ///
    /// Returns the client and an event receiver subscribed before the login
    /// request was queued, so no event can be missed.
    ///
    /// # Errors
    ///
    /// Returns `Transport` if the stream cannot be opened.
    pub async fn connect<T: Transport>(
        transport: &T,
        addr: &str,
        credentials: Credentials,
        env: E,
        config: SessionConfig,
    ) -> Result<(Self, broadcast::Receiver<SessionEvent>), SessionError> {
        info!(%addr, username = %credentials.username, "connecting");
        let stream = transport.connect(addr).await?;
        Self::start(stream, credentials, env, config)
    }

    /// Run a session over an open stream and log in.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns `StatePoisoned` only if session state is unusable.
    pub fn start<S>(
        stream: S,
        credentials: Credentials,
        env: E,
        config: SessionConfig,
    ) -> Result<(Self, broadcast::Receiver<SessionEvent>), SessionError>
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let (outbound, queue) = mpsc::unbounded_channel();
        let (events, receiver) = broadcast::channel(config.event_capacity.max(1));
        let (shutdown, _) = watch::channel(false);
        let now = env.now();

        let shared = Arc::new(Shared {
            session: Mutex::new(Session::new()),
            heartbeat: Mutex::new(HeartbeatMonitor::new(now, config.heartbeat)),
            outbound_seq: AtomicU64::new(0),
            closing: AtomicBool::new(false),
            outbound,
            events,
            shutdown,
            env,
            config,
        });

        let (reader, writer) = tokio::io::split(stream);
        let mut handles = JoinSet::new();
        handles.spawn(tasks::write_loop(Arc::clone(&shared), writer, queue));
        handles.spawn(tasks::read_loop(Arc::clone(&shared), reader));
        handles.spawn(tasks::heartbeat_loop(Arc::clone(&shared)));

        let client = Self { shared, credentials, tasks: handles };
        client.login()?;
        Ok((client, receiver))
    }

    /// Send the login request again.
    ///
    /// # Errors
    ///
    /// Returns `AlreadyConnected` while a login is outstanding or established;
    /// `QueueClosed` once the connection has been torn down.
    pub fn login(&self) -> Result<(), SessionError> {
        let actions = self.shared.session()?.connect(&self.credentials)?;
        self.shared.execute(actions)
    }

    /// Send an order-flow message as unsequenced data.
    ///
    /// # Errors
    ///
    /// Returns `NotLoggedIn` before login completes, `Protocol` if the message
    /// cannot be encoded, `QueueClosed` after teardown.
    pub fn send_order(&self, message: &ClientMessage) -> Result<(), SessionError> {
        let session = self.shared.session()?;
        let packet = session.send_message(message)?;
        self.shared.enqueue(packet)
    }

    /// Send a message as sequenced data.
    ///
    /// # Errors
    ///
    /// Same as [`SessionClient::send_order`].
    pub fn send_sequenced(&self, message: &ClientMessage) -> Result<(), SessionError> {
        let session = self.shared.session()?;
        let packet = session.send_sequenced(message)?;
        self.shared.enqueue(packet)
    }

    /// Log out and close.
    ///
    /// Does not wait for the exchange; use [`SessionClient::closed`] to wait for
    /// teardown. A no-op once disconnected.
    ///
    /// # Errors
    ///
    /// Returns `StatePoisoned` if session state is unusable.
    pub fn disconnect(&self) -> Result<(), SessionError> {
        let actions = self.shared.session()?.disconnect();
        if actions.is_empty() {
            return Ok(());
        }
        self.shared.execute(actions).or_else(|error| match error {
            SessionError::QueueClosed => Ok(()),
            other => Err(other),
        })
    }

    /// Resolves once the connection has been torn down.
    pub async fn closed(&self) {
        let mut shutdown = self.shared.shutdown_signal();
        tasks::stopped(&mut shutdown).await;
    }

    /// Whether teardown has happened.
    pub fn is_closed(&self) -> bool {
        *self.shared.shutdown.borrow()
    }

    /// New event subscriber.
    ///
    /// Sees only events emitted after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.shared.events.subscribe()
    }

    /// Current session state.
    pub fn state(&self) -> SessionState {
        self.read_session(Session::state)
    }

    /// Session bound at login.
    pub fn session_id(&self) -> Option<String> {
        self.read_session(|session| session.session_id().map(str::to_owned))
    }

    /// Sequence number the next sequenced exchange message will carry.
    pub fn expected_sequence(&self) -> u64 {
        self.read_session(Session::expected_sequence)
    }

    /// Sequenced packets written to the stream so far.
    pub fn outbound_sequence(&self) -> u64 {
        self.shared.outbound_seq.load(Ordering::Acquire)
    }

    fn read_session<T>(&self, read: impl FnOnce(&Session) -> T) -> T {
        match self.shared.session.lock() {
            Ok(session) => read(&session),
            Err(poisoned) => read(&poisoned.into_inner()),
        }
    }
}

impl<E: Environment> std::fmt::Debug for SessionClient<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionClient")
            .field("credentials", &self.credentials)
            .field("state", &self.state())
            .field("outbound_sequence", &self.outbound_sequence())
            .field("tasks", &self.tasks.len())
            .finish_non_exhaustive()
    }
}
