//! Socket Session SDK - a single-connection WebSocket session handle.
//!
//! This crate wraps a bidirectional text-message socket behind a small
//! handle that connects to a configured base address, sends text frames
//! while the connection is open and hands inbound JSON payloads to one
//! registered handler.
//!
//! # Components
//!
//! - [`SessionHandle`] — connect, disconnect, send, register message handler
//! - [`RuntimeConfig`], [`SessionConfig`] — base address configuration
//! - [`Transport`], [`Connection`] — the socket seam
//! - [`TungsteniteTransport`] — `tokio-tungstenite` implementation
//!
//! # Example
//!
//! ```rust,no_run
//! use socket_session_sdk::{RuntimeConfig, SessionHandle};
//!
//! #[tokio::main]
//! async fn main() {
//!     let runtime = RuntimeConfig::new("ws://localhost:4000");
//!     let mut session = SessionHandle::from_runtime(&runtime);
//!
//!     session.connect("/chat").await;
//!     session
//!         .on_message(|data| println!("received: {}", data))
//!         .await;
//!     session.send_message(r#"{"type":"hello"}"#);
//!     session.disconnect();
//! }
//! ```

pub mod config;
pub mod error;
pub mod session;
pub mod transport;

pub use config::{RuntimeConfig, SessionConfig};
pub use error::{SessionError, TransportError};
pub use session::SessionHandle;
pub use transport::{
    CloseEvent, Connection, ConnectionEvent, EventSlots, ReadyState, Transport,
    TungsteniteTransport,
};
