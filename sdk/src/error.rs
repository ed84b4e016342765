//! Session error types.
//!
//! Provides the errors surfaced by the transport layer and by inbound
//! message delivery.

/// Errors reported by a transport for a single connection.
///
/// These never reach the caller of `connect`; they are handed to the
/// connection's error observer.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// Connection could not be established.
    #[error("connection failed: {0}")]
    Connection(String),

    /// WebSocket protocol error on an established connection.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Outbound frame could not be handed to the connection.
    #[error("send failed: {0}")]
    SendFailed(String),

    /// Connection closed.
    #[error("connection closed")]
    Closed,
}

impl From<tokio_tungstenite::tungstenite::Error> for TransportError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        Self::Protocol(err.to_string())
    }
}

/// Errors raised while delivering an inbound message to a handler.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Inbound payload was not valid JSON for the handler's type.
    #[error("invalid message payload: {0}")]
    InvalidPayload(#[from] serde_json::Error),
}
