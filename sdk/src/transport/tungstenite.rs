//! WebSocket transport over `tokio-tungstenite`.
//!
//! Each connection is driven by one spawned task that owns the socket,
//! forwards queued outbound frames and dispatches inbound events to the
//! connection's observer slots in arrival order.

use std::sync::Arc;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, warn};

use super::{
    CloseEvent, Connection, ConnectionEvent, EventSlots, ReadyState, ReadyStateCell, Transport,
    NO_STATUS_RECEIVED,
};
use crate::error::TransportError;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSink = SplitSink<WsStream, Message>;
type WsSource = SplitStream<WsStream>;

/// Outbound instruction for a connection's driver task.
#[derive(Debug)]
enum Command {
    Text(String),
    Close,
}

/// Transport backed by `tokio_tungstenite::connect_async`.
///
/// Opening a connection spawns its driver on the current Tokio runtime.
#[derive(Debug, Default, Clone, Copy)]
pub struct TungsteniteTransport;

impl TungsteniteTransport {
    /// Creates a new transport.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Transport for TungsteniteTransport {
    fn open(&self, url: &str, events: EventSlots) -> Arc<dyn Connection> {
        let events = Arc::new(events);
        let state = ReadyStateCell::new(ReadyState::Connecting);
        let (commands, command_rx) = mpsc::unbounded_channel();

        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                let driver = Driver {
                    url: url.to_string(),
                    state: state.clone(),
                    events: Arc::clone(&events),
                    commands: command_rx,
                };
                runtime.spawn(driver.run());
            }
            Err(e) => {
                error!(url = %url, "Cannot open WebSocket outside a Tokio runtime: {}", e);
                state.set(ReadyState::Closed);
            }
        }

        Arc::new(TungsteniteConnection {
            url: url.to_string(),
            state,
            events,
            commands,
        })
    }
}

/// A connection opened by [`TungsteniteTransport`].
///
/// Dropping the last reference asks the driver to close the socket.
#[derive(Debug)]
pub struct TungsteniteConnection {
    url: String,
    state: ReadyStateCell,
    events: Arc<EventSlots>,
    commands: mpsc::UnboundedSender<Command>,
}

impl Connection for TungsteniteConnection {
    fn url(&self) -> &str {
        &self.url
    }

    fn ready_state(&self) -> ReadyState {
        self.state.get()
    }

    fn send(&self, text: &str) -> Result<(), TransportError> {
        let state = self.state.get();
        if state != ReadyState::Open {
            return Err(TransportError::SendFailed(format!("connection is {}", state)));
        }

        self.commands
            .send(Command::Text(text.to_string()))
            .map_err(|_| TransportError::Closed)
    }

    fn close(&self) {
        if self.state.begin_closing() {
            let _ = self.commands.send(Command::Close);
        }
    }

    fn events(&self) -> &EventSlots {
        &self.events
    }
}

/// Socket owner for one connection.
struct Driver {
    url: String,
    state: ReadyStateCell,
    events: Arc<EventSlots>,
    commands: mpsc::UnboundedReceiver<Command>,
}

impl Driver {
    async fn run(mut self) {
        let stream = match tokio_tungstenite::connect_async(self.url.as_str()).await {
            Ok((stream, _response)) => stream,
            Err(e) => {
                self.fail(TransportError::Connection(e.to_string())).await;
                return;
            }
        };

        if !self.state.transition(ReadyState::Connecting, ReadyState::Open) {
            // Closed before the handshake finished.
            let mut stream = stream;
            let _ = stream.close(None).await;
            self.finish(CloseEvent::abnormal()).await;
            return;
        }

        debug!(url = %self.url, "WebSocket handshake complete");
        self.deliver(ConnectionEvent::Open).await;

        let (sink, source) = stream.split();
        self.pump(sink, source).await;
    }

    /// Multiplexes outbound commands and inbound frames until the socket ends.
    async fn pump(&mut self, mut sink: WsSink, mut source: WsSource) {
        let mut close_sent = false;
        let mut peer_close: Option<CloseEvent> = None;

        loop {
            tokio::select! {
                command = self.commands.recv(), if !close_sent => match command {
                    Some(Command::Text(text)) => {
                        if let Err(e) = sink.send(Message::Text(text.into())).await {
                            self.fail(e.into()).await;
                            return;
                        }
                    }
                    Some(Command::Close) | None => {
                        self.state.begin_closing();
                        close_sent = true;
                        if let Err(e) = sink.send(Message::Close(None)).await {
                            self.fail(e.into()).await;
                            return;
                        }
                    }
                },
                frame = source.next() => match frame {
                    Some(Ok(Message::Text(text))) => {
                        self.deliver(ConnectionEvent::Message(text.as_str().to_string()))
                            .await;
                    }
                    Some(Ok(Message::Binary(data))) => {
                        debug!(url = %self.url, len = data.len(), "Skipping binary frame");
                    }
                    Some(Ok(Message::Close(frame))) => {
                        self.state.set(ReadyState::Closing);
                        peer_close = Some(close_event(frame));
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        match peer_close.take() {
                            Some(close) => self.finish(close).await,
                            None => self.fail(e.into()).await,
                        }
                        return;
                    }
                    None => {
                        let close = peer_close
                            .take()
                            .unwrap_or_else(|| CloseEvent::clean(NO_STATUS_RECEIVED, ""));
                        self.finish(close).await;
                        return;
                    }
                },
            }
        }
    }

    /// Dispatches an event, logging delivery failures.
    async fn deliver(&self, event: ConnectionEvent) {
        if let Err(e) = self.events.dispatch(event).await {
            error!(url = %self.url, "Failed to deliver message: {}", e);
        }
    }

    /// Reports an error and the resulting abnormal closure.
    async fn fail(&self, err: TransportError) {
        warn!(url = %self.url, "WebSocket transport error: {}", err);
        self.state.set(ReadyState::Closed);
        self.deliver(ConnectionEvent::Error(err)).await;
        self.deliver(ConnectionEvent::Close(CloseEvent::abnormal()))
            .await;
    }

    async fn finish(&self, close: CloseEvent) {
        self.state.set(ReadyState::Closed);
        self.deliver(ConnectionEvent::Close(close)).await;
    }
}

fn close_event(frame: Option<CloseFrame>) -> CloseEvent {
    match frame {
        Some(frame) => CloseEvent::clean(frame.code.into(), frame.reason.as_str()),
        None => CloseEvent::clean(NO_STATUS_RECEIVED, ""),
    }
}
