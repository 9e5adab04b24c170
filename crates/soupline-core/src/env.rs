//! Environment abstraction.
//!
//! Runtimes never call a clock or a timer directly; they go through an
//! [`Environment`]. Production uses [`SystemEnv`], simulation supplies virtual
//! time.

use std::{
    future::Future,
    time::{Duration, Instant},
};

/// Source of time for a session runtime.
pub trait Environment: Clone + Send + Sync + 'static {
    /// Current time.
    fn now(&self) -> Instant;

    /// Suspend the calling task for `duration`.
    fn sleep(&self, duration: Duration) -> impl Future<Output = ()> + Send;
}

/// Environment backed by the tokio timer.
///
/// Goes through `tokio::time` rather than `std::time`, so it follows a paused
/// test clock as well as the wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemEnv;

impl Environment for SystemEnv {
    fn now(&self) -> Instant {
        tokio::time::Instant::now().into_std()
    }

    fn sleep(&self, duration: Duration) -> impl Future<Output = ()> + Send {
        tokio::time::sleep(duration)
    }
}
