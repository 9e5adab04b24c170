//! Tokio runtime for SoupBinTCP/OUCH order-entry sessions.
//!
//! Interprets the actions of the `soupline-core` state machines against a real
//! duplex stream: one reader, one writer and one heartbeat task per
//! connection, all owned by a [`SessionClient`].
//!
//! ```no_run
//! use soupline_client::{ClientConfig, SessionClient, TcpTransport};
//! use soupline_core::{SessionEvent, SystemEnv};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ClientConfig::new("127.0.0.1", 9000, "alice", "secret");
//! config.validate()?;
//!
//! let (client, mut events) = SessionClient::connect(
//!     &TcpTransport,
//!     &config.addr(),
//!     config.credentials(),
//!     SystemEnv,
//!     config.session,
//! )
//! .await?;
//!
//! while let Ok(event) = events.recv().await {
//!     if let SessionEvent::Disconnected { .. } = event {
//!         break;
//!     }
//! }
//! client.closed().await;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod client;
pub mod config;
mod tasks;
pub mod tcp;

pub use client::SessionClient;
pub use config::{ClientConfig, ConfigError, SessionConfig};
pub use tcp::TcpTransport;
