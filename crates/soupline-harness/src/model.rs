//! Reference model of the session layer.
//!
//! A deliberately naive restatement of what a client session should do, used
//! by the model-based property tests: the same operation sequence is applied
//! to this model and to the real `Session` and `HeartbeatMonitor`, and their
//! observable state must agree after every step.
//!
//! Time is a plain `Duration` since the start of the run; the model never
//! looks at a clock.

use std::time::Duration;

use arbitrary::{Arbitrary, Unstructured};
use soupline_core::{HeartbeatConfig, SessionState};

/// One step of a generated run.
///
/// Inbound operations stand for one frame from the exchange; outbound ones
/// for a call on the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Arbitrary)]
pub enum Operation {
    /// Client starts the login handshake
    Connect,
    /// Exchange accepts the login
    AcceptLogin {
        /// Next sequence the exchange will send
        sequence: u16,
    },
    /// Exchange rejects the login
    RejectLogin,
    /// Exchange sends sequenced data
    DeliverSequenced {
        /// Whether the payload decodes
        valid: bool,
    },
    /// Exchange sends unsequenced data
    DeliverUnsequenced,
    /// Exchange heartbeat
    ServerHeartbeat,
    /// Exchange ends the session
    EndOfSession,
    /// Client sends an order as unsequenced data
    SendOrder,
    /// Client sends a message as sequenced data
    SendSequenced,
    /// Client logs out
    Disconnect,
    /// Stream drops underneath the session
    TransportClosed,
    /// Time passes, then the heartbeat monitor is polled
    AdvanceTime {
        /// How long
        millis: u16,
    },
}

impl Operation {
    /// Whether this stands for a frame arriving from the exchange.
    pub fn is_inbound(&self) -> bool {
        matches!(
            self,
            Self::AcceptLogin { .. }
                | Self::RejectLogin
                | Self::DeliverSequenced { .. }
                | Self::DeliverUnsequenced
                | Self::ServerHeartbeat
                | Self::EndOfSession
        )
    }
}

/// Decode an operation sequence from raw bytes.
///
/// Lets byte-oriented generators (fuzzers, `proptest` byte vectors) drive a
/// run. Bytes that do not form a whole operation are dropped.
pub fn operations(bytes: &[u8]) -> Vec<Operation> {
    Vec::<Operation>::arbitrary_take_rest(Unstructured::new(bytes)).unwrap_or_default()
}

/// Whether an operation was accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelOutcome {
    /// Applied
    Ok,
    /// Refused; state unchanged apart from liveness bookkeeping
    Refused,
}

impl ModelOutcome {
    /// Whether the operation was applied.
    pub fn is_ok(self) -> bool {
        self == Self::Ok
    }
}

/// Everything a run can be compared on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Observation {
    /// Session state
    pub state: SessionState,
    /// Next inbound sequence number
    pub expected_sequence: u64,
    /// Sequenced packets sent
    pub sequenced_sent: u64,
    /// Heartbeats sent
    pub heartbeats: usize,
    /// Liveness alarms raised
    pub alarms: usize,
}

/// Reference model.
#[derive(Debug, Clone)]
pub struct SessionModel {
    config: HeartbeatConfig,
    now: Duration,
    state: SessionState,
    expected_sequence: u64,
    sequenced_sent: u64,
    last_sent: Duration,
    last_received: Duration,
    alarmed: bool,
    heartbeats: usize,
    alarms: usize,
}

impl SessionModel {
    /// Fresh disconnected session at time zero.
    pub fn new(config: HeartbeatConfig) -> Self {
        Self {
            config,
            now: Duration::ZERO,
            state: SessionState::Disconnected,
            expected_sequence: 0,
            sequenced_sent: 0,
            last_sent: Duration::ZERO,
            last_received: Duration::ZERO,
            alarmed: false,
            heartbeats: 0,
            alarms: 0,
        }
    }

    /// Time since the run started.
    pub fn now(&self) -> Duration {
        self.now
    }

    /// Current observable state.
    pub fn observe(&self) -> Observation {
        Observation {
            state: self.state,
            expected_sequence: self.expected_sequence,
            sequenced_sent: self.sequenced_sent,
            heartbeats: self.heartbeats,
            alarms: self.alarms,
        }
    }

    /// Apply one operation.
    pub fn apply(&mut self, op: Operation) -> ModelOutcome {
        use SessionState::{AwaitingLoginResponse, Disconnected, LoggedIn};

        if op.is_inbound() {
            self.last_received = self.now;
            self.alarmed = false;
        }

        let live = matches!(self.state, AwaitingLoginResponse | LoggedIn);
        match op {
            Operation::Connect if self.state == Disconnected => {
                self.state = AwaitingLoginResponse;
                self.expected_sequence = 0;
                self.sent();
            },
            Operation::AcceptLogin { sequence } if self.state == AwaitingLoginResponse => {
                self.state = LoggedIn;
                self.expected_sequence = u64::from(sequence);
            },
            Operation::RejectLogin if self.state == AwaitingLoginResponse => {
                self.state = Disconnected;
            },
            Operation::DeliverSequenced { .. } if self.state == LoggedIn => {
                self.expected_sequence += 1;
            },
            Operation::DeliverUnsequenced | Operation::SendOrder if self.state == LoggedIn => {
                if op == Operation::SendOrder {
                    self.sent();
                }
            },
            Operation::SendSequenced if self.state == LoggedIn => {
                self.sequenced_sent += 1;
                self.sent();
            },
            Operation::ServerHeartbeat if live => {},
            Operation::EndOfSession if live => self.state = Disconnected,
            Operation::Disconnect => {
                if self.state != Disconnected {
                    self.state = Disconnected;
                    self.sent();
                }
            },
            Operation::TransportClosed => self.state = Disconnected,
            Operation::AdvanceTime { millis } => {
                self.now += Duration::from_millis(u64::from(millis));
                self.poll();
            },
            _ => return ModelOutcome::Refused,
        }
        ModelOutcome::Ok
    }

    fn sent(&mut self) {
        self.last_sent = self.now;
    }

    fn poll(&mut self) {
        if self.state == SessionState::LoggedIn
            && self.now.saturating_sub(self.last_sent) > self.config.threshold
        {
            self.heartbeats += 1;
            self.last_sent = self.now;
        }

        if self.state != SessionState::Disconnected
            && !self.alarmed
            && self.now.saturating_sub(self.last_received) > self.config.alarm_after()
        {
            self.alarms += 1;
            self.alarmed = true;
        }
    }
}
