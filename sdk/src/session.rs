//! Socket session handle.
//!
//! A [`SessionHandle`] references at most one connection at a time and
//! exposes connect, disconnect, send and message-handler registration on
//! top of a [`Transport`].

use std::sync::Arc;

use serde::de::DeserializeOwned;
use tracing::{debug, error, info};

use crate::config::{RuntimeConfig, SessionConfig};
use crate::error::SessionError;
use crate::transport::{Connection, EventSlots, ReadyState, Transport, TungsteniteTransport};

/// Per-call-site handle over a single WebSocket connection.
///
/// Failures never reach the caller: transport errors are reported through
/// the connection's lifecycle observers and precondition violations are
/// logged and ignored.
#[derive(Debug)]
pub struct SessionHandle {
    config: SessionConfig,
    transport: Arc<dyn Transport>,
    connection: Option<Arc<dyn Connection>>,
}

impl SessionHandle {
    /// Creates a handle that opens connections through `transport`.
    #[must_use]
    pub fn new(config: SessionConfig, transport: Arc<dyn Transport>) -> Self {
        Self {
            config,
            transport,
            connection: None,
        }
    }

    /// Creates a handle backed by [`TungsteniteTransport`].
    #[must_use]
    pub fn with_tungstenite(config: SessionConfig) -> Self {
        Self::new(config, Arc::new(TungsteniteTransport::new()))
    }

    /// Creates a handle whose base address is the runtime configuration's
    /// WebSocket API URL.
    #[must_use]
    pub fn from_runtime(runtime: &RuntimeConfig) -> Self {
        Self::with_tungstenite(SessionConfig::from_runtime(runtime))
    }

    /// Returns the session configuration.
    #[must_use]
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Returns true if a connection is referenced, whatever its state.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.connection.is_some()
    }

    /// Returns the state of the referenced connection.
    #[must_use]
    pub fn ready_state(&self) -> Option<ReadyState> {
        self.connection.as_ref().map(|conn| conn.ready_state())
    }

    /// Returns the URL of the referenced connection.
    #[must_use]
    pub fn url(&self) -> Option<&str> {
        self.connection.as_ref().map(|conn| conn.url())
    }

    /// Opens a connection to the base address followed by `path`.
    ///
    /// Returns as soon as the transport has been asked to connect; the
    /// outcome is only reported through the lifecycle log lines. A
    /// previously referenced connection is detached from all observers and
    /// asked to close before it is replaced.
    pub async fn connect(&mut self, path: &str) {
        let url = self.config.connection_url(path);

        if let Some(previous) = self.connection.take() {
            previous.events().clear().await;
            if matches!(
                previous.ready_state(),
                ReadyState::Connecting | ReadyState::Open
            ) {
                debug!(url = previous.url(), "Closing replaced WebSocket connection");
                previous.close();
            }
        }

        let events = lifecycle_observers(&url);
        self.connection = Some(self.transport.open(&url, events));
    }

    /// Sends `message` verbatim if the connection is open.
    ///
    /// Otherwise logs and drops the message.
    pub fn send_message(&self, message: &str) {
        match &self.connection {
            Some(conn) if conn.is_open() => {
                if let Err(e) = conn.send(message) {
                    error!(url = conn.url(), "WebSocket send failed: {}", e);
                }
            }
            _ => error!("WebSocket is not open"),
        }
    }

    /// Registers the handler for inbound messages, parsed as JSON.
    ///
    /// Replaces any handler previously registered on the current
    /// connection. Does nothing if no connection is referenced. A payload
    /// that is not valid JSON fails delivery with
    /// [`SessionError::InvalidPayload`] and the handler is not called.
    pub async fn on_message<F>(&self, handler: F)
    where
        F: Fn(serde_json::Value) + Send + Sync + 'static,
    {
        self.on_message_as::<serde_json::Value, F>(handler).await;
    }

    /// Registers the handler for inbound messages decoded as `T`.
    ///
    /// Shares the single handler slot with [`Self::on_message`].
    pub async fn on_message_as<T, F>(&self, handler: F)
    where
        T: DeserializeOwned + 'static,
        F: Fn(T) + Send + Sync + 'static,
    {
        let Some(conn) = &self.connection else {
            return;
        };

        conn.events()
            .set_message_handler(Box::new(move |text: &str| -> Result<(), SessionError> {
                let payload = serde_json::from_str::<T>(text)?;
                handler(payload);
                Ok(())
            }))
            .await;
    }

    /// Asks the referenced connection to close.
    ///
    /// Does not wait for the closing handshake and keeps the reference and
    /// its observers. Does nothing if no connection is referenced.
    pub fn disconnect(&self) {
        if let Some(conn) = &self.connection {
            debug!(url = conn.url(), "Closing WebSocket connection");
            conn.close();
        }
    }
}

/// Builds the diagnostic lifecycle observers for a connection to `url`.
fn lifecycle_observers(url: &str) -> EventSlots {
    let (open_url, error_url, close_url) = (url.to_string(), url.to_string(), url.to_string());

    EventSlots::new()
        .with_open(move || {
            info!(url = %open_url, "WebSocket connected");
        })
        .with_error(move |err| {
            error!(url = %error_url, "WebSocket error: {}", err);
        })
        .with_close(move |close| {
            info!(url = %close_url, "WebSocket closed {}", close);
        })
}
