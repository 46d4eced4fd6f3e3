//! Streaming connection to the generation backend.
//!
//! One connection per chat session. Inbound frames go to a single message
//! slot; close and error are reported once through the lifecycle sink given at
//! connect time. Frames that arrive before a message slot is installed are
//! held back and flushed, in order, when one is.

use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

use crate::core::events::{EventSink, TransportEvent};
use crate::utils::url::construct_socket_url;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    InvalidUrl(String),
    /// The socket handshake did not complete.
    Handshake(String),
    NotConnected,
    /// A connection for this session is already open.
    AlreadyConnected,
    Send(String),
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportError::InvalidUrl(msg) => write!(f, "{msg}"),
            TransportError::Handshake(msg) => write!(f, "Connection failed: {msg}"),
            TransportError::NotConnected => write!(f, "Socket is not connected"),
            TransportError::AlreadyConnected => {
                write!(f, "A connection is already open for this session")
            }
            TransportError::Send(msg) => write!(f, "Failed to send over socket: {msg}"),
        }
    }
}

impl std::error::Error for TransportError {}

#[async_trait]
pub trait Transport: Send {
    /// Open the connection for `chat_id`. Close and error are reported on
    /// `lifecycle`.
    async fn connect(&mut self, chat_id: &str, lifecycle: EventSink) -> Result<(), TransportError>;

    async fn send(&mut self, text: &str) -> Result<(), TransportError>;

    /// Install the handler for inbound text frames. The last one installed
    /// wins.
    fn set_on_message(&mut self, sink: EventSink) -> Result<(), TransportError>;

    async fn close(&mut self);

    fn is_connected(&self) -> bool;
}

/// Single message slot plus the frames that arrived before it was filled.
#[derive(Default)]
pub struct FrameSlot {
    sink: Option<EventSink>,
    backlog: VecDeque<String>,
}

impl FrameSlot {
    pub fn deliver(&mut self, frame: String) {
        match &self.sink {
            Some(sink) => {
                sink.emit(TransportEvent::Frame(frame));
            }
            None => self.backlog.push_back(frame),
        }
    }

    pub fn install(&mut self, sink: EventSink) {
        while let Some(frame) = self.backlog.pop_front() {
            sink.emit(TransportEvent::Frame(frame));
        }
        self.sink = Some(sink);
    }
}

pub type SharedFrameSlot = Arc<Mutex<FrameSlot>>;

pub fn deliver_frame(slot: &SharedFrameSlot, frame: String) {
    slot.lock()
        .unwrap_or_else(PoisonError::into_inner)
        .deliver(frame);
}

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

struct Connection {
    writer: SplitSink<WsStream, Message>,
    slot: SharedFrameSlot,
    reader: JoinHandle<()>,
}

pub struct WebSocketTransport {
    socket_url: String,
    api_token: Option<String>,
    connection: Option<Connection>,
}

impl WebSocketTransport {
    pub fn new(socket_url: &str, api_token: Option<String>) -> Self {
        Self {
            socket_url: socket_url.to_string(),
            api_token,
            connection: None,
        }
    }

    fn open_connection(&mut self) -> Result<&mut Connection, TransportError> {
        match self.connection.as_mut() {
            Some(connection) if !connection.reader.is_finished() => Ok(connection),
            _ => Err(TransportError::NotConnected),
        }
    }
}

async fn read_frames(mut stream: SplitStream<WsStream>, slot: SharedFrameSlot, lifecycle: EventSink) {
    loop {
        match stream.next().await {
            Some(Ok(Message::Text(text))) => {
                let text = text.to_string();
                if text.is_empty() {
                    debug!("ignoring empty text frame");
                    continue;
                }
                deliver_frame(&slot, text);
            }
            Some(Ok(Message::Binary(bytes))) => match String::from_utf8(bytes.to_vec()) {
                Ok(text) if !text.is_empty() => deliver_frame(&slot, text),
                Ok(_) => {}
                Err(err) => warn!("dropping non UTF-8 binary frame: {err}"),
            },
            Some(Ok(Message::Close(frame))) => {
                debug!(?frame, "socket closed by peer");
                lifecycle.emit(TransportEvent::Closed);
                return;
            }
            Some(Ok(_)) => {}
            Some(Err(err)) => {
                warn!("socket error: {err}");
                lifecycle.emit(TransportEvent::Errored(err.to_string()));
                return;
            }
            None => {
                lifecycle.emit(TransportEvent::Closed);
                return;
            }
        }
    }
}

#[async_trait]
impl Transport for WebSocketTransport {
    async fn connect(&mut self, chat_id: &str, lifecycle: EventSink) -> Result<(), TransportError> {
        if self.is_connected() {
            return Err(TransportError::AlreadyConnected);
        }
        self.connection = None;

        let url =
            construct_socket_url(&self.socket_url, chat_id).map_err(TransportError::InvalidUrl)?;
        let mut request = url
            .as_str()
            .into_client_request()
            .map_err(|err| TransportError::InvalidUrl(err.to_string()))?;
        if let Some(token) = &self.api_token {
            let value = HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|err| TransportError::Handshake(err.to_string()))?;
            request.headers_mut().insert("Authorization", value);
        }

        let (stream, _) = connect_async(request)
            .await
            .map_err(|err| TransportError::Handshake(err.to_string()))?;
        info!(chat_id, "socket connection established");

        let (writer, reader) = stream.split();
        let slot: SharedFrameSlot = Arc::new(Mutex::new(FrameSlot::default()));
        let reader = tokio::spawn(read_frames(reader, Arc::clone(&slot), lifecycle));
        self.connection = Some(Connection {
            writer,
            slot,
            reader,
        });
        Ok(())
    }

    async fn send(&mut self, text: &str) -> Result<(), TransportError> {
        let connection = self.open_connection()?;
        connection
            .writer
            .send(Message::text(text))
            .await
            .map_err(|err| TransportError::Send(err.to_string()))
    }

    fn set_on_message(&mut self, sink: EventSink) -> Result<(), TransportError> {
        let connection = self.open_connection()?;
        connection
            .slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .install(sink);
        Ok(())
    }

    async fn close(&mut self) {
        if let Some(mut connection) = self.connection.take() {
            connection.reader.abort();
            if let Err(err) = connection.writer.close().await {
                debug!("socket close: {err}");
            }
        }
    }

    fn is_connected(&self) -> bool {
        self.connection
            .as_ref()
            .is_some_and(|connection| !connection.reader.is_finished())
    }
}
