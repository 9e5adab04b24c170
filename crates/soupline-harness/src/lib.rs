//! Deterministic simulation harness for Soupline session testing.
//!
//! Turmoil-based implementations of the Environment and Transport traits, a
//! scripted exchange to talk to, and a reference model of the session layer
//! for model-based property tests.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod exchange;
pub mod model;
pub mod sim_env;
pub mod sim_transport;

pub use exchange::{ExchangeConfig, ExchangeLog, SessionEnd, SimExchange};
pub use model::{ModelOutcome, Observation, Operation, SessionModel, operations};
pub use sim_env::SimEnv;
pub use sim_transport::SimTransport;
