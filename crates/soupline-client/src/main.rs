//! Soupline session runner.
//!
//! Opens one session, logs every event and logs out on Ctrl-C. Connection
//! details come from flags or `SOUPLINE_*` environment variables.

use std::{process::ExitCode, time::Duration};

use clap::Parser;
use soupline_client::{ClientConfig, SessionClient, TcpTransport};
use soupline_core::{SessionEvent, SystemEnv};
use tokio::sync::broadcast::error::RecvError;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "soupline-client", about = "Run a SoupBinTCP/OUCH order-entry session", version)]
struct Args {
    /// Exchange host
    #[arg(long, env = "SOUPLINE_HOST")]
    host: String,

    /// Exchange port
    #[arg(long, env = "SOUPLINE_PORT")]
    port: u16,

    /// Login username (at most 6 characters)
    #[arg(long, env = "SOUPLINE_USERNAME")]
    username: String,

    /// Login password (at most 10 characters)
    #[arg(long, env = "SOUPLINE_PASSWORD", hide_env_values = true)]
    password: String,

    /// Outbound silence in seconds before a heartbeat is sent
    #[arg(long, env = "SOUPLINE_HEARTBEAT_SECS", default_value_t = 5)]
    heartbeat_secs: u64,
}

impl From<Args> for ClientConfig {
    fn from(args: Args) -> Self {
        Self::new(args.host, args.port, args.username, args.password)
            .with_heartbeat_threshold(Duration::from_secs(args.heartbeat_secs))
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = ClientConfig::from(Args::parse());
    if let Err(err) = config.validate() {
        error!(error = %err, "invalid configuration");
        return ExitCode::FAILURE;
    }

    let connected = SessionClient::connect(
        &TcpTransport,
        &config.addr(),
        config.credentials(),
        SystemEnv,
        config.session,
    )
    .await;
    let (client, mut events) = match connected {
        Ok(connected) => connected,
        Err(err) => {
            error!(error = %err, addr = %config.addr(), "connect failed");
            return ExitCode::FAILURE;
        },
    };

    let mut interrupted = false;
    loop {
        tokio::select! {
            signal = tokio::signal::ctrl_c(), if !interrupted => {
                interrupted = true;
                if let Err(err) = signal {
                    warn!(error = %err, "ctrl-c handler failed, logging out");
                } else {
                    info!("interrupted, logging out");
                }
                if let Err(err) = client.disconnect() {
                    error!(error = %err, "logout failed");
                    return ExitCode::FAILURE;
                }
            },
            event = events.recv() => match event {
                Ok(SessionEvent::Disconnected { error: None }) => {
                    info!("disconnected");
                    return ExitCode::SUCCESS;
                },
                Ok(SessionEvent::Disconnected { error: Some(err) }) => {
                    error!(error = %err, "disconnected");
                    return ExitCode::FAILURE;
                },
                Ok(SessionEvent::LivenessAlarm { silence }) => {
                    warn!(?silence, "exchange is silent");
                },
                Ok(SessionEvent::ProtocolError { error: err }) => {
                    warn!(error = %err, "bad message from exchange");
                },
                Ok(event) => info!(?event, "session event"),
                Err(RecvError::Lagged(skipped)) => warn!(skipped, "event log fell behind"),
                Err(RecvError::Closed) => return ExitCode::SUCCESS,
            },
        }
    }
}
