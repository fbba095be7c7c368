//! Transport abstraction
//!
//! The client never speaks the WebSocket protocol itself. It asks a
//! [`Transport`] to open a [`Connection`] and then only moves whole
//! [`Message`]s through it. Framing, masking, the HTTP upgrade and ping/pong
//! replies all belong to the transport.
//!
//! # Event Mapping
//!
//! The lifecycle events of a socket map onto the trait like this:
//!
//! - **opened**: `Transport::open` resolves to `Ok(connection)`
//! - **error** (while opening): `Transport::open` resolves to `Err(..)`
//! - **data-received**: `Connection::recv` yields `Some(Ok(message))`
//! - **closed**: `Connection::recv` yields `None` or `Some(Err(..))`
//!
//! `Connection::recv` is awaited inside `tokio::select!` next to the client's
//! command channel, so implementations must be cancel-safe: dropping the
//! future before it completes must not lose a message.
//!
//! [`TungsteniteTransport`] is the production implementation, built on
//! `tokio-tungstenite`.

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use hookup_core::{Error, Message, Result};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use url::Url;

/// An open, message-oriented connection
#[async_trait]
pub trait Connection: Send {
    /// Send one message
    ///
    /// Fails with [`Error::NotConnected`] once the connection is closed.
    async fn send(&mut self, message: Message) -> Result<()>;

    /// Wait for the next inbound message
    ///
    /// `None` means the peer closed the connection; `Some(Err(..))` means it
    /// failed. Either way the connection is finished.
    async fn recv(&mut self) -> Option<Result<Message>>;

    /// Close the connection and wait for the peer to acknowledge
    async fn close(&mut self) -> Result<()>;
}

/// Factory for connections
#[async_trait]
pub trait Transport: Send + Sync {
    /// Open a connection to `uri`
    async fn open(&self, uri: &Url) -> Result<Box<dyn Connection>>;
}

/// WebSocket transport backed by `tokio-tungstenite`
#[derive(Debug, Clone)]
pub struct TungsteniteTransport {
    connect_timeout: Duration,
}

impl TungsteniteTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Give up on an opening handshake after `timeout`
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }
}

impl Default for TungsteniteTransport {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
        }
    }
}

#[async_trait]
impl Transport for TungsteniteTransport {
    #[tracing::instrument(skip(self), fields(uri = %uri))]
    async fn open(&self, uri: &Url) -> Result<Box<dyn Connection>> {
        let (stream, _response) = tokio::time::timeout(self.connect_timeout, connect_async(uri.as_str()))
            .await
            .map_err(|_| Error::WebSocket(format!("connect timed out after {:?}", self.connect_timeout)))?
            .map_err(|e| Error::WebSocket(e.to_string()))?;

        tracing::debug!("WebSocket handshake complete");
        Ok(Box::new(TungsteniteConnection::new(stream)))
    }
}

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// A live `tokio-tungstenite` WebSocket stream
pub struct TungsteniteConnection {
    stream: WsStream,
    closed: bool,
}

impl TungsteniteConnection {
    fn new(stream: WsStream) -> Self {
        Self {
            stream,
            closed: false,
        }
    }
}

#[async_trait]
impl Connection for TungsteniteConnection {
    async fn send(&mut self, message: Message) -> Result<()> {
        if self.closed {
            return Err(Error::NotConnected);
        }

        let frame = match message {
            Message::Text(text) => WsMessage::Text(text),
            Message::Binary(data) => WsMessage::Binary(data),
        };

        self.stream.send(frame).await.map_err(|e| {
            self.closed = true;
            Error::WebSocket(e.to_string())
        })
    }

    async fn recv(&mut self) -> Option<Result<Message>> {
        if self.closed {
            return None;
        }

        // Control frames are answered by tungstenite itself; skip to data.
        while let Some(frame) = self.stream.next().await {
            match frame {
                Ok(WsMessage::Text(text)) => return Some(Ok(Message::Text(text))),
                Ok(WsMessage::Binary(data)) => return Some(Ok(Message::Binary(data))),
                Ok(WsMessage::Close(frame)) => {
                    tracing::debug!(frame = ?frame, "Close frame received");
                    self.closed = true;
                    return None;
                }
                Ok(WsMessage::Ping(_) | WsMessage::Pong(_) | WsMessage::Frame(_)) => continue,
                Err(e) => {
                    self.closed = true;
                    return Some(Err(Error::WebSocket(e.to_string())));
                }
            }
        }

        self.closed = true;
        None
    }

    async fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;

        self.stream
            .close(None)
            .await
            .map_err(|e| Error::WebSocket(e.to_string()))?;

        // Read until the peer echoes the close frame or drops the socket.
        let acknowledged = tokio::time::timeout(Duration::from_secs(5), async {
            while let Some(Ok(_)) = self.stream.next().await {}
        })
        .await;

        if acknowledged.is_err() {
            tracing::debug!("Close handshake not acknowledged in time");
        }

        Ok(())
    }
}
