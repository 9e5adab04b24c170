//! Session core for SoupBinTCP order entry.
//!
//! Pure state machine logic, decoupled from I/O. Nothing in this crate reads a
//! socket, spawns a task or looks at a clock on its own.
//!
//! # Architecture
//!
//! [`Session`] and [`HeartbeatMonitor`] are deterministic state machines. Time
//! is passed in as an [`std::time::Instant`] and every transition returns
//! declarative actions (send this packet, emit this event, close the
//! connection) instead of performing them. A runtime interprets those actions
//! against a real stream; tests interpret them against a `Vec`.
//!
//! The same code therefore runs in production over TCP, in unit tests with
//! hand-picked instants, and in network simulation with virtual time.
//!
//! # Components
//!
//! - [`session`]: login, sequencing and logout state machine
//! - [`heartbeat`]: outbound keep-alive and inbound liveness tracking
//! - [`event`]: events surfaced to the session's consumer
//! - [`mod@env`]: environment abstraction (time)
//! - [`transport`]: transport abstraction (duplex byte streams)
//! - [`error`]: session error types

pub mod env;
pub mod error;
pub mod event;
pub mod heartbeat;
pub mod session;
pub mod transport;

pub use env::{Environment, SystemEnv};
pub use error::SessionError;
pub use event::SessionEvent;
pub use heartbeat::{HeartbeatAction, HeartbeatConfig, HeartbeatMonitor};
pub use session::{Credentials, Session, SessionAction, SessionState};
pub use transport::Transport;
