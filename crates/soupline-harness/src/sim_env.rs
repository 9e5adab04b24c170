//! Simulated environment.
//!
//! Time is turmoil's simulated clock. Sleeping goes through tokio's timer,
//! which turmoil drives per host, so a session under simulation sees exactly
//! the instants the simulation steps through.

use std::{
    future::Future,
    time::{Duration, Instant},
};

use soupline_core::Environment;

/// Environment backed by turmoil's simulated clock.
///
/// Must be used inside a turmoil host or client.
#[derive(Debug, Clone, Copy)]
pub struct SimEnv {
    epoch: Instant,
}

impl SimEnv {
    /// Environment anchored at the current simulation step.
    pub fn new() -> Self {
        let now = Instant::now();
        Self { epoch: now.checked_sub(turmoil::elapsed()).unwrap_or(now) }
    }

    /// Simulated time since the simulation started.
    pub fn elapsed(&self) -> Duration {
        turmoil::elapsed()
    }
}

impl Default for SimEnv {
    fn default() -> Self {
        Self::new()
    }
}

impl Environment for SimEnv {
    fn now(&self) -> Instant {
        self.epoch + turmoil::elapsed()
    }

    fn sleep(&self, duration: Duration) -> impl Future<Output = ()> + Send {
        tokio::time::sleep(duration)
    }
}
