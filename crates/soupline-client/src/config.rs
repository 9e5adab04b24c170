//! Client configuration.
//!
//! [`ClientConfig`] is everything needed to open one session: where the
//! exchange is, who we are, and how the heartbeat behaves. It is built by the
//! runner from command-line flags or environment variables and checked with
//! [`ClientConfig::validate`] before any connection is attempted.

use std::time::Duration;

use soupline_core::{Credentials, HeartbeatConfig};
use thiserror::Error;

/// Longest username the login packet can carry.
pub const MAX_USERNAME_LEN: usize = 6;

/// Longest password the login packet can carry.
pub const MAX_PASSWORD_LEN: usize = 10;

/// Default event channel capacity.
pub const DEFAULT_EVENT_CAPACITY: usize = 1024;

/// Configuration rejected at startup.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// Host is empty.
    #[error("host must not be empty")]
    MissingHost,

    /// Port is zero.
    #[error("port must be non-zero")]
    InvalidPort,

    /// Username empty, too long or not ASCII.
    #[error("username must be 1 to {MAX_USERNAME_LEN} ASCII characters")]
    InvalidUsername,

    /// Password empty, too long or not ASCII.
    #[error("password must be 1 to {MAX_PASSWORD_LEN} ASCII characters")]
    InvalidPassword,

    /// Heartbeat threshold or poll interval is zero.
    #[error("heartbeat {field} must be non-zero")]
    InvalidHeartbeat {
        /// Offending field
        field: &'static str,
    },

    /// Event channel capacity is zero.
    #[error("event capacity must be non-zero")]
    InvalidEventCapacity,
}

/// Per-connection runtime settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    /// Heartbeat timing
    pub heartbeat: HeartbeatConfig,
    /// Events buffered per subscriber before the slowest starts lagging
    pub event_capacity: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self { heartbeat: HeartbeatConfig::default(), event_capacity: DEFAULT_EVENT_CAPACITY }
    }
}

/// Everything needed to open a session.
#[derive(Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Exchange host name or address
    pub host: String,
    /// Exchange port
    pub port: u16,
    /// Login username
    pub username: String,
    /// Login password
    pub password: String,
    /// Runtime settings
    pub session: SessionConfig,
}

impl ClientConfig {
    /// Configuration with default runtime settings.
    pub fn new(
        host: impl Into<String>,
        port: u16,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            port,
            username: username.into(),
            password: password.into(),
            session: SessionConfig::default(),
        }
    }

    /// Override the heartbeat threshold `T`.
    #[must_use]
    pub fn with_heartbeat_threshold(mut self, threshold: Duration) -> Self {
        self.session.heartbeat.threshold = threshold;
        self
    }

    /// Check every field. Call before connecting.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.host.trim().is_empty() {
            return Err(ConfigError::MissingHost);
        }
        if self.port == 0 {
            return Err(ConfigError::InvalidPort);
        }
        if !ascii_within(&self.username, MAX_USERNAME_LEN) {
            return Err(ConfigError::InvalidUsername);
        }
        if !ascii_within(&self.password, MAX_PASSWORD_LEN) {
            return Err(ConfigError::InvalidPassword);
        }
        if self.session.heartbeat.threshold.is_zero() {
            return Err(ConfigError::InvalidHeartbeat { field: "threshold" });
        }
        if self.session.heartbeat.poll_interval.is_zero() {
            return Err(ConfigError::InvalidHeartbeat { field: "poll_interval" });
        }
        if self.session.event_capacity == 0 {
            return Err(ConfigError::InvalidEventCapacity);
        }
        Ok(())
    }

    /// `host:port` for the transport.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Login credentials for the current session.
    pub fn credentials(&self) -> Credentials {
        Credentials::new(self.username.clone(), self.password.clone())
    }
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("session", &self.session)
            .finish()
    }
}

fn ascii_within(text: &str, max: usize) -> bool {
    !text.is_empty() && text.len() <= max && text.is_ascii()
}
