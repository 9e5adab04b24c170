//! Simulated transport over turmoil's in-memory TCP.

use std::io;

use async_trait::async_trait;
use soupline_core::Transport;
use turmoil::net::{TcpListener, TcpStream};

/// Transport that dials hosts inside the turmoil simulation.
///
/// Addresses are `host:port` with turmoil host names, e.g. `"exchange:9000"`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimTransport;

impl SimTransport {
    /// Listen inside the current simulated host.
    pub async fn bind(addr: &str) -> io::Result<TcpListener> {
        TcpListener::bind(addr).await
    }
}

#[async_trait]
impl Transport for SimTransport {
    type Stream = TcpStream;

    async fn connect(&self, addr: &str) -> io::Result<TcpStream> {
        TcpStream::connect(addr).await
    }
}
