//! Transport abstraction for session streams.
//!
//! A session runs over one ordered duplex byte stream. Production uses TCP,
//! tests use in-memory pipes or Turmoil's simulated TCP.

use std::io;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncWrite};

/// Opens duplex byte streams to an exchange.
///
/// The stream is split into a read half and a write half by the runtime, so it
/// must be usable from two tasks at once once split.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Connected byte stream.
    type Stream: AsyncRead + AsyncWrite + Unpin + Send + 'static;

    /// Connect to `addr` (`host:port`).
    ///
    /// Resolves once the stream is established; no session traffic has been
    /// exchanged yet.
    async fn connect(&self, addr: &str) -> io::Result<Self::Stream>;
}
