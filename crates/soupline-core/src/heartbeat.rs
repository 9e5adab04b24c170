//! Heartbeat and liveness tracking.
//!
//! Two independent clocks per connection:
//!
//! - Outbound: if nothing has been sent for longer than the threshold `T`, a
//!   client heartbeat is due.
//! - Inbound: if nothing has been received for longer than `2T`, the exchange
//!   is presumed silent and a liveness alarm is raised. The alarm fires once
//!   per silence and re-arms when any frame arrives. It never closes the
//!   connection.
//!
//! Any frame counts in both directions; heartbeats are a floor, not the only
//! liveness signal.
//!
//! The monitor is polled by the runtime every [`HeartbeatConfig::poll_interval`]
//! and, like the session, returns actions rather than sending anything.

use std::time::{Duration, Instant};

use crate::session::SessionState;

/// Heartbeat configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeartbeatConfig {
    /// How often the monitor is polled
    pub poll_interval: Duration,
    /// Outbound silence before a heartbeat is sent (`T`)
    pub threshold: Duration,
    /// Pause after a failed poll before trying again
    pub error_backoff: Duration,
}

impl HeartbeatConfig {
    /// Inbound silence before the liveness alarm (`2T`).
    pub fn alarm_after(&self) -> Duration {
        self.threshold.saturating_mul(2)
    }
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
            threshold: Duration::from_secs(5),
            error_backoff: Duration::from_secs(5),
        }
    }
}

/// Actions returned by [`HeartbeatMonitor::tick`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeartbeatAction {
    /// Queue a client heartbeat
    SendHeartbeat,

    /// Report that the exchange has gone quiet
    LivenessAlarm {
        /// Time since the last received frame
        silence: Duration,
    },
}

/// Heartbeat monitor
///
/// Pure state machine: no timers, no I/O. The caller passes the current time
/// and the session state on every tick.
#[derive(Debug, Clone)]
pub struct HeartbeatMonitor {
    config: HeartbeatConfig,
    last_sent: Instant,
    last_received: Instant,
    /// Alarm already raised for the current silence
    alarmed: bool,
}

impl HeartbeatMonitor {
    /// Create a monitor treating `now` as the last traffic in both directions.
    pub fn new(now: Instant, config: HeartbeatConfig) -> Self {
        Self { config, last_sent: now, last_received: now, alarmed: false }
    }

    /// Configuration in use
    pub fn config(&self) -> &HeartbeatConfig {
        &self.config
    }

    /// Call whenever any frame reaches the stream.
    pub fn record_sent(&mut self, now: Instant) {
        self.last_sent = self.last_sent.max(now);
    }

    /// Call whenever any frame arrives.
    pub fn record_received(&mut self, now: Instant) {
        self.last_received = self.last_received.max(now);
        self.alarmed = false;
    }

    /// Time of the last outbound frame
    pub fn last_sent(&self) -> Instant {
        self.last_sent
    }

    /// Time of the last inbound frame
    pub fn last_received(&self) -> Instant {
        self.last_received
    }

    /// Check both clocks.
    ///
    /// Heartbeats are only due once logged in; the alarm watches any live
    /// session, including one still waiting for its login response. A due
    /// heartbeat resets the outbound clock immediately, so a slow writer does
    /// not cause one heartbeat per poll.
    pub fn tick(&mut self, now: Instant, state: SessionState) -> Vec<HeartbeatAction> {
        let mut actions = Vec::new();

        if state == SessionState::LoggedIn
            && now.saturating_duration_since(self.last_sent) > self.config.threshold
        {
            actions.push(HeartbeatAction::SendHeartbeat);
            self.last_sent = now;
        }

        if state != SessionState::Disconnected && !self.alarmed {
            let silence = now.saturating_duration_since(self.last_received);
            if silence > self.config.alarm_after() {
                actions.push(HeartbeatAction::LivenessAlarm { silence });
                self.alarmed = true;
            }
        }

        actions
    }
}
