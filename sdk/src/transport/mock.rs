//! In-memory transport for tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use super::{
    CloseEvent, Connection, ConnectionEvent, EventSlots, ReadyState, ReadyStateCell, Transport,
};
use crate::error::{SessionError, TransportError};

/// Transport that records every connection it opens.
#[derive(Debug, Default)]
pub(crate) struct MockTransport {
    opened: Mutex<Vec<Arc<MockConnection>>>,
}

impl MockTransport {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Returns every connection opened so far, oldest first.
    pub(crate) fn connections(&self) -> Vec<Arc<MockConnection>> {
        self.opened.lock().expect("mock lock").clone()
    }

    /// Returns the most recently opened connection.
    pub(crate) fn last(&self) -> Arc<MockConnection> {
        self.connections()
            .pop()
            .expect("at least one connection opened")
    }
}

impl Transport for MockTransport {
    fn open(&self, url: &str, events: EventSlots) -> Arc<dyn Connection> {
        let conn = Arc::new(MockConnection {
            url: url.to_string(),
            state: ReadyStateCell::new(ReadyState::Connecting),
            events,
            sent: Mutex::new(Vec::new()),
            close_requests: AtomicUsize::new(0),
        });
        self.opened.lock().expect("mock lock").push(Arc::clone(&conn));
        conn
    }
}

/// Connection whose lifecycle is driven by the test.
#[derive(Debug)]
pub(crate) struct MockConnection {
    url: String,
    state: ReadyStateCell,
    events: EventSlots,
    sent: Mutex<Vec<String>>,
    close_requests: AtomicUsize,
}

impl MockConnection {
    /// Frames transmitted so far.
    pub(crate) fn sent(&self) -> Vec<String> {
        self.sent.lock().expect("mock lock").clone()
    }

    /// Number of close requests received.
    pub(crate) fn close_requests(&self) -> usize {
        self.close_requests.load(Ordering::SeqCst)
    }

    /// Marks the connection open and reports it.
    pub(crate) async fn accept(&self) {
        self.state.set(ReadyState::Open);
        self.emit(ConnectionEvent::Open).await.expect("open dispatch");
    }

    /// Marks the connection closed and reports it.
    pub(crate) async fn finish(&self, close: CloseEvent) {
        self.state.set(ReadyState::Closed);
        self.emit(ConnectionEvent::Close(close))
            .await
            .expect("close dispatch");
    }

    /// Delivers an inbound text payload.
    pub(crate) async fn receive(&self, text: &str) -> Result<(), SessionError> {
        self.emit(ConnectionEvent::Message(text.to_string())).await
    }

    pub(crate) async fn emit(&self, event: ConnectionEvent) -> Result<(), SessionError> {
        self.events.dispatch(event).await
    }
}

impl Connection for MockConnection {
    fn url(&self) -> &str {
        &self.url
    }

    fn ready_state(&self) -> ReadyState {
        self.state.get()
    }

    fn send(&self, text: &str) -> Result<(), TransportError> {
        if self.state.get() != ReadyState::Open {
            return Err(TransportError::SendFailed("not open".to_string()));
        }
        self.sent.lock().expect("mock lock").push(text.to_string());
        Ok(())
    }

    fn close(&self) {
        self.close_requests.fetch_add(1, Ordering::SeqCst);
        self.state.begin_closing();
    }

    fn events(&self) -> &EventSlots {
        &self.events
    }
}
