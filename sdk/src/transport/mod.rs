//! Transport abstraction.
//!
//! A transport opens bidirectional text-message connections. Each
//! connection owns its lifecycle state and four single-slot observers
//! (open, error, close, message) that the transport invokes in delivery
//! order.
//!
//! [`tungstenite::TungsteniteTransport`] is the production implementation.

pub mod tungstenite;

#[cfg(test)]
pub(crate) mod mock;

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::error::{SessionError, TransportError};

pub use self::tungstenite::TungsteniteTransport;

/// Close code reported when a connection ends without a close frame.
pub const ABNORMAL_CLOSURE: u16 = 1006;

/// Close code reported when no status was present in the close frame.
pub const NO_STATUS_RECEIVED: u16 = 1005;

/// Readiness state of a connection.
///
/// Transitions: `Connecting -> Open -> Closing -> Closed`, or
/// `Connecting -> Closed` when the connection fails before opening.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ReadyState {
    /// Connection attempt in progress.
    Connecting = 0,
    /// Connection established; frames may be sent.
    Open = 1,
    /// Close requested, handshake in progress.
    Closing = 2,
    /// Connection closed or never established.
    Closed = 3,
}

impl ReadyState {
    const fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Connecting,
            1 => Self::Open,
            2 => Self::Closing,
            _ => Self::Closed,
        }
    }
}

impl fmt::Display for ReadyState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connecting => write!(f, "connecting"),
            Self::Open => write!(f, "open"),
            Self::Closing => write!(f, "closing"),
            Self::Closed => write!(f, "closed"),
        }
    }
}

/// Shared, lock-free readiness state.
///
/// Cloning yields another view of the same state.
#[derive(Debug, Clone)]
pub struct ReadyStateCell(Arc<AtomicU8>);

impl ReadyStateCell {
    /// Creates a cell in the given state.
    #[must_use]
    pub fn new(state: ReadyState) -> Self {
        Self(Arc::new(AtomicU8::new(state as u8)))
    }

    /// Returns the current state.
    #[must_use]
    pub fn get(&self) -> ReadyState {
        ReadyState::from_u8(self.0.load(Ordering::Acquire))
    }

    /// Replaces the current state.
    pub fn set(&self, state: ReadyState) {
        self.0.store(state as u8, Ordering::Release);
    }

    /// Moves from `from` to `to` if the current state is `from`.
    ///
    /// Returns true if the transition happened.
    pub fn transition(&self, from: ReadyState, to: ReadyState) -> bool {
        self.0
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Moves from `Connecting` or `Open` to `Closing`.
    ///
    /// Returns false when the connection is already closing or closed.
    pub fn begin_closing(&self) -> bool {
        let mut current = self.0.load(Ordering::Acquire);
        loop {
            if current >= ReadyState::Closing as u8 {
                return false;
            }
            match self.0.compare_exchange(
                current,
                ReadyState::Closing as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return true,
                Err(actual) => current = actual,
            }
        }
    }
}

impl Default for ReadyStateCell {
    fn default() -> Self {
        Self::new(ReadyState::Connecting)
    }
}

/// Details of a connection closure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseEvent {
    /// WebSocket close code.
    pub code: u16,
    /// Close reason sent by the peer.
    pub reason: String,
    /// Whether the closing handshake completed.
    pub was_clean: bool,
}

impl CloseEvent {
    /// Creates a clean close event.
    #[must_use]
    pub fn clean(code: u16, reason: impl Into<String>) -> Self {
        Self {
            code,
            reason: reason.into(),
            was_clean: true,
        }
    }

    /// Creates an abnormal close event (no closing handshake).
    #[must_use]
    pub fn abnormal() -> Self {
        Self {
            code: ABNORMAL_CLOSURE,
            reason: String::new(),
            was_clean: false,
        }
    }
}

impl fmt::Display for CloseEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "code={} reason={:?} clean={}",
            self.code, self.reason, self.was_clean
        )
    }
}

/// An event delivered by a transport for one connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionEvent {
    /// Connection opened.
    Open,
    /// Transport-level error.
    Error(TransportError),
    /// Connection closed.
    Close(CloseEvent),
    /// Inbound text payload.
    Message(String),
}

/// Observer for the open event.
pub type OpenObserver = Box<dyn Fn() + Send + Sync>;

/// Observer for transport errors.
pub type ErrorObserver = Box<dyn Fn(&TransportError) + Send + Sync>;

/// Observer for the close event.
pub type CloseObserver = Box<dyn Fn(&CloseEvent) + Send + Sync>;

/// Handler for inbound text payloads.
///
/// An error returned here propagates out of [`EventSlots::dispatch`].
pub type MessageHandler = Box<dyn Fn(&str) -> Result<(), SessionError> + Send + Sync>;

/// The four observer slots of a connection.
///
/// Each slot holds at most one observer; setting a slot replaces its
/// previous occupant.
#[derive(Default)]
pub struct EventSlots {
    on_open: RwLock<Option<OpenObserver>>,
    on_error: RwLock<Option<ErrorObserver>>,
    on_close: RwLock<Option<CloseObserver>>,
    on_message: RwLock<Option<MessageHandler>>,
}

impl fmt::Debug for EventSlots {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventSlots").finish_non_exhaustive()
    }
}

impl EventSlots {
    /// Creates empty slots.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the open observer.
    #[must_use]
    pub fn with_open(mut self, observer: impl Fn() + Send + Sync + 'static) -> Self {
        *self.on_open.get_mut() = Some(Box::new(observer));
        self
    }

    /// Sets the error observer.
    #[must_use]
    pub fn with_error(
        mut self,
        observer: impl Fn(&TransportError) + Send + Sync + 'static,
    ) -> Self {
        *self.on_error.get_mut() = Some(Box::new(observer));
        self
    }

    /// Sets the close observer.
    #[must_use]
    pub fn with_close(mut self, observer: impl Fn(&CloseEvent) + Send + Sync + 'static) -> Self {
        *self.on_close.get_mut() = Some(Box::new(observer));
        self
    }

    /// Replaces the message handler.
    pub async fn set_message_handler(&self, handler: MessageHandler) {
        *self.on_message.write().await = Some(handler);
    }

    /// Returns true if a message handler is installed.
    pub async fn has_message_handler(&self) -> bool {
        self.on_message.read().await.is_some()
    }

    /// Detaches every observer.
    pub async fn clear(&self) {
        *self.on_open.write().await = None;
        *self.on_error.write().await = None;
        *self.on_close.write().await = None;
        *self.on_message.write().await = None;
    }

    /// Delivers an event to the matching slot.
    ///
    /// Events for empty slots are dropped.
    ///
    /// # Errors
    ///
    /// Returns the message handler's error for a `Message` event.
    pub async fn dispatch(&self, event: ConnectionEvent) -> Result<(), SessionError> {
        match event {
            ConnectionEvent::Open => {
                if let Some(observer) = self.on_open.read().await.as_ref() {
                    observer();
                }
            }
            ConnectionEvent::Error(err) => {
                if let Some(observer) = self.on_error.read().await.as_ref() {
                    observer(&err);
                }
            }
            ConnectionEvent::Close(close) => {
                if let Some(observer) = self.on_close.read().await.as_ref() {
                    observer(&close);
                }
            }
            ConnectionEvent::Message(text) => {
                if let Some(handler) = self.on_message.read().await.as_ref() {
                    handler(&text)?;
                }
            }
        }
        Ok(())
    }
}

/// One transport-level connection.
///
/// All methods return without waiting on the network.
pub trait Connection: Send + Sync + fmt::Debug {
    /// Returns the URL this connection was opened with.
    fn url(&self) -> &str;

    /// Returns the current readiness state.
    fn ready_state(&self) -> ReadyState;

    /// Queues a text frame for transmission.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection can no longer accept frames.
    fn send(&self, text: &str) -> Result<(), TransportError>;

    /// Requests closure of the connection.
    fn close(&self);

    /// Returns the observer slots of this connection.
    fn events(&self) -> &EventSlots;

    /// Returns true if the connection is open.
    fn is_open(&self) -> bool {
        self.ready_state() == ReadyState::Open
    }
}

/// Opens connections.
pub trait Transport: Send + Sync + fmt::Debug {
    /// Opens a connection to `url` with the given observers installed.
    ///
    /// Must return immediately; the outcome is reported through `events`.
    /// No event may be delivered before the observers are in place.
    fn open(&self, url: &str, events: EventSlots) -> Arc<dyn Connection>;
}
