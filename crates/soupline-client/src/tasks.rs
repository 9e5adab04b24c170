//! The three per-connection tasks.
//!
//! - Reader: stream → [`FrameReader`] → session. Framing and I/O errors are
//!   fatal; a packet that fails to decode is reported and skipped. Stops
//!   reading once the session has asked to close.
//! - Writer: the only consumer of the outbound queue and the only code that
//!   writes to the stream. Packets still queued at teardown are dropped.
//! - Heartbeat: polls the heartbeat monitor. A failed iteration is logged,
//!   poisoned locks are cleared and the poll is retried after a backoff; the
//!   loop only ends with the connection.
//!
//! Every loop also watches the shutdown flag, so teardown from any one of them
//! stops the other two.

use std::sync::Arc;

use bytes::BytesMut;
use soupline_core::{Environment, HeartbeatAction, SessionError, SessionEvent};
use soupline_proto::{FrameReader, SessionPacket};
use tokio::{
    io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt},
    sync::{mpsc, watch},
};
use tracing::{debug, error, info, warn};

use crate::client::{Outbound, Shared};

const READ_CHUNK: usize = 8 * 1024;

/// Resolves once the shutdown flag is set (or its sender is gone).
pub(crate) async fn stopped(shutdown: &mut watch::Receiver<bool>) {
    loop {
        if *shutdown.borrow_and_update() {
            return;
        }
        if shutdown.changed().await.is_err() {
            return;
        }
    }
}

pub(crate) async fn read_loop<E, R>(shared: Arc<Shared<E>>, mut reader: R)
where
    E: Environment,
    R: AsyncRead + Unpin + Send,
{
    let mut shutdown = shared.shutdown_signal();
    let mut frames = FrameReader::new();
    let mut buf = vec![0u8; READ_CHUNK];

    loop {
        let read = tokio::select! {
            read = reader.read(&mut buf) => read,
            () = stopped(&mut shutdown) => return,
        };

        let chunk = match read {
            Ok(0) => {
                info!(buffered = frames.buffered(), "exchange closed the stream");
                shared.teardown(None);
                return;
            },
            Ok(n) => &buf[..n],
            Err(err) => {
                error!(error = %err, "stream read failed");
                shared.teardown(Some(err.into()));
                return;
            },
        };

        let decoded = match frames.feed(chunk) {
            Ok(decoded) => decoded,
            Err(err) => {
                error!(error = %err, "framing error, stream cannot be delimited");
                shared.teardown(Some(err.into()));
                return;
            },
        };

        for frame in &decoded {
            if let Err(err) = shared.handle_frame(frame) {
                error!(error = %err, "session state unusable");
                shared.teardown(Some(err));
                return;
            }
            // The writer owns teardown from here, with the close reason.
            if shared.is_closing() {
                debug!("close pending, reader stopping");
                return;
            }
        }
    }
}

pub(crate) async fn write_loop<E, W>(
    shared: Arc<Shared<E>>,
    mut writer: W,
    mut queue: mpsc::UnboundedReceiver<Outbound>,
) where
    E: Environment,
    W: AsyncWrite + Unpin + Send,
{
    let mut shutdown = shared.shutdown_signal();
    let mut buf = BytesMut::with_capacity(READ_CHUNK);

    loop {
        // Teardown wins over queued work: nothing reaches the stream once
        // `Disconnected` has been reported. A requested close is still queued
        // behind earlier packets, so it flushes them first.
        let next = tokio::select! {
            biased;
            () = stopped(&mut shutdown) => None,
            next = queue.recv() => next,
        };

        match next {
            Some(Outbound::Packet(packet)) => {
                buf.clear();
                if let Err(err) = packet.encode(&mut buf) {
                    warn!(error = %err, packet_type = ?packet.packet_type(), "dropping unencodable packet");
                    shared.emit(SessionEvent::ProtocolError { error: err });
                    continue;
                }

                if let Err(err) = write_frame(&mut writer, &buf).await {
                    error!(error = %err, "stream write failed");
                    shared.teardown(Some(err.into()));
                    return;
                }

                if packet.is_sequenced() {
                    shared.sequenced_written();
                }
                match shared.heartbeat() {
                    Ok(mut heartbeat) => heartbeat.record_sent(shared.env.now()),
                    Err(err) => warn!(error = %err, "could not record outbound traffic"),
                }
                debug!(packet_type = ?packet.packet_type(), "sent");
            },
            Some(Outbound::Close(reason)) => {
                if let Err(err) = writer.shutdown().await {
                    debug!(error = %err, "stream shutdown failed");
                }
                shared.teardown(reason);
                return;
            },
            None => {
                debug!(dropped = queue.len(), "writer stopping");
                return;
            },
        }
    }
}

async fn write_frame<W: AsyncWrite + Unpin>(writer: &mut W, bytes: &[u8]) -> std::io::Result<()> {
    writer.write_all(bytes).await?;
    writer.flush().await
}

pub(crate) async fn heartbeat_loop<E: Environment>(shared: Arc<Shared<E>>) {
    let mut shutdown = shared.shutdown_signal();
    let config = shared.config.heartbeat;
    let mut pause = config.poll_interval;

    loop {
        tokio::select! {
            () = shared.env.sleep(pause) => {},
            () = stopped(&mut shutdown) => return,
        }

        pause = match heartbeat_tick(&shared) {
            Ok(()) => config.poll_interval,
            Err(SessionError::QueueClosed) => {
                debug!("outbound queue closed, heartbeat stopping");
                return;
            },
            Err(err) => {
                error!(error = %err, backoff = ?config.error_backoff, "heartbeat iteration failed");
                shared.clear_poison();
                config.error_backoff
            },
        };
    }
}

fn heartbeat_tick<E: Environment>(shared: &Shared<E>) -> Result<(), SessionError> {
    let now = shared.env.now();
    let state = shared.session()?.state();
    let actions = shared.heartbeat()?.tick(now, state);

    for action in actions {
        match action {
            HeartbeatAction::SendHeartbeat => {
                debug!("client heartbeat due");
                shared.enqueue(SessionPacket::ClientHeartbeat)?;
            },
            HeartbeatAction::LivenessAlarm { silence } => {
                warn!(?silence, "no traffic from exchange");
                shared.emit(SessionEvent::LivenessAlarm { silence });
            },
        }
    }
    Ok(())
}
