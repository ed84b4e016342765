//! Socket session host binary.
//!
//! Opens one WebSocket session against the configured base address, relays
//! stdin lines as text messages and logs inbound JSON payloads.

use std::env;
use std::time::Duration;

use anyhow::Context;
use socket_session_sdk::{ReadyState, RuntimeConfig, SessionHandle};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// How long to wait for the closing handshake on shutdown.
const CLOSE_GRACE: Duration = Duration::from_secs(2);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "info,socket_session=debug,socket_session_sdk=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration from environment
    let runtime = RuntimeConfig::from_env();
    let path = env::var("SOCKET_PATH").unwrap_or_else(|_| "/".to_string());

    tracing::info!("Starting socket session");
    tracing::info!("WebSocket API URL: {}", runtime.websocket_api_url);
    tracing::info!("Path: {}", path);
    if runtime.websocket_api_url.is_empty() {
        tracing::warn!("WebSocket API URL is empty; the connection attempt will fail");
    }

    let mut session = SessionHandle::from_runtime(&runtime);
    session.connect(&path).await;
    session
        .on_message(|data| tracing::info!("Received: {}", data))
        .await;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    loop {
        tokio::select! {
            line = lines.next_line() => match line.context("failed to read stdin")? {
                Some(line) => session.send_message(&line),
                None => break,
            },
            signal = &mut ctrl_c => {
                signal.context("failed to listen for shutdown signal")?;
                break;
            }
        }
    }

    tracing::info!("Shutting down socket session");
    session.disconnect();

    let closed = tokio::time::timeout(CLOSE_GRACE, async {
        while session.ready_state() != Some(ReadyState::Closed) {
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    })
    .await;
    if closed.is_err() {
        tracing::warn!("Closing handshake did not finish within {:?}", CLOSE_GRACE);
    }

    Ok(())
}
