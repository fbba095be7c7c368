//! Common test utilities for hookup-client integration tests
//!
//! This module provides a reusable mock WebSocket server and helpers for
//! testing client behavior against a real socket.

#![allow(dead_code)]

use futures_util::{SinkExt, StreamExt};
use hookup_client::{Client, ConnectionState, Event, EventKind};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;

/// Instructions for every open server-side connection
#[derive(Debug, Clone)]
enum Control {
    Push(String),
    Drop,
}

/// Mock WebSocket server for client testing
///
/// Echoes every message by default. It can push text to all clients, drop
/// their connections, and be restarted on the same address to simulate a
/// server bounce.
pub struct MockWsServer {
    addr: SocketAddr,
    shutdown_tx: mpsc::Sender<()>,
    control_tx: broadcast::Sender<Control>,
    message_rx: mpsc::Receiver<String>,
    accepted_rx: mpsc::UnboundedReceiver<SocketAddr>,
}

impl MockWsServer {
    /// Start an echo server on an ephemeral port
    pub async fn new() -> Self {
        Self::bind("127.0.0.1:0".parse().unwrap(), true).await
    }

    /// Start a server that records messages without answering
    pub async fn silent() -> Self {
        Self::bind("127.0.0.1:0".parse().unwrap(), false).await
    }

    /// Start an echo server on a specific address, e.g. a restart
    pub async fn restart(addr: SocketAddr) -> Self {
        Self::bind(addr, true).await
    }

    async fn bind(addr: SocketAddr, echo: bool) -> Self {
        let listener = TcpListener::bind(addr).await.unwrap();
        let addr = listener.local_addr().unwrap();

        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);
        let (msg_tx, message_rx) = mpsc::channel::<String>(100);
        let (accepted_tx, accepted_rx) = mpsc::unbounded_channel();
        let (control_tx, _) = broadcast::channel::<Control>(16);

        let control = control_tx.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = shutdown_rx.recv() => {
                        let _ = control.send(Control::Drop);
                        break;
                    }
                    accept_result = listener.accept() => {
                        if let Ok((stream, peer)) = accept_result {
                            let msg_tx = msg_tx.clone();
                            let mut control_rx = control.subscribe();
                            let _ = accepted_tx.send(peer);

                            tokio::spawn(async move {
                                let Ok(ws_stream) = accept_async(stream).await else {
                                    return;
                                };
                                let (mut write, mut read) = ws_stream.split();

                                loop {
                                    tokio::select! {
                                        incoming = read.next() => match incoming {
                                            Some(Ok(Message::Text(text))) => {
                                                let _ = msg_tx.send(text.clone()).await;
                                                if echo {
                                                    let _ = write.send(Message::Text(text)).await;
                                                }
                                            }
                                            Some(Ok(Message::Binary(data))) => {
                                                if echo {
                                                    let _ = write.send(Message::Binary(data)).await;
                                                }
                                            }
                                            Some(Ok(_)) => {}
                                            Some(Err(_)) | None => break,
                                        },
                                        control = control_rx.recv() => match control {
                                            Ok(Control::Push(text)) => {
                                                let _ = write.send(Message::Text(text)).await;
                                            }
                                            Ok(Control::Drop) | Err(_) => {
                                                let _ = write.send(Message::Close(None)).await;
                                                break;
                                            }
                                        },
                                    }
                                }
                            });
                        }
                    }
                }
            }
        });

        Self {
            addr,
            shutdown_tx,
            control_tx,
            message_rx,
            accepted_rx,
        }
    }

    /// Get the WebSocket URL for connecting to this server
    pub fn url(&self) -> String {
        format!("ws://{}/", self.addr)
    }

    /// Get the bound socket address
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Send a text message to every connected client
    pub fn push(&self, text: impl Into<String>) {
        let _ = self.control_tx.send(Control::Push(text.into()));
    }

    /// Close every open connection but keep accepting new ones
    pub fn drop_connections(&self) {
        let _ = self.control_tx.send(Control::Drop);
    }

    /// Wait for a text message to be received by the server
    ///
    /// Returns None if the server is shut down or the timeout expires.
    pub async fn wait_for_message(&mut self) -> Option<String> {
        tokio::time::timeout(Duration::from_secs(5), self.message_rx.recv())
            .await
            .ok()
            .flatten()
    }

    /// Wait for the next accepted TCP connection
    pub async fn wait_for_connection(&mut self) -> Option<SocketAddr> {
        self.wait_for_connection_within(Duration::from_secs(5)).await
    }

    /// Like [`wait_for_connection`](Self::wait_for_connection) with a custom timeout
    pub async fn wait_for_connection_within(&mut self, timeout: Duration) -> Option<SocketAddr> {
        tokio::time::timeout(timeout, self.accepted_rx.recv())
            .await
            .ok()
            .flatten()
    }

    /// Stop listening and close every connection
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(()).await;
        // Give server time to release the port
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
}

/// A local address nothing listens on
pub async fn closed_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}

/// Forward every event of the given kinds into a channel
pub async fn record_events(client: &Client, kinds: &[EventKind]) -> mpsc::UnboundedReceiver<Event> {
    let (event_tx, event_rx) = mpsc::unbounded_channel();
    for kind in kinds {
        let event_tx = event_tx.clone();
        client
            .on(*kind, move |event: &Event| {
                let _ = event_tx.send(event.clone());
            })
            .await;
    }
    event_rx
}

/// Receive the next recorded event, failing the test after five seconds
pub async fn next_event(events: &mut mpsc::UnboundedReceiver<Event>) -> Event {
    tokio::time::timeout(Duration::from_secs(5), events.recv())
        .await
        .expect("timed out waiting for event")
        .expect("event channel closed")
}

/// Wait until the client's state satisfies `predicate`
pub async fn wait_for_state<F>(client: &Client, predicate: F)
where
    F: FnMut(&ConnectionState) -> bool,
{
    let mut states = client.state_changes();
    tokio::time::timeout(Duration::from_secs(5), states.wait_for(predicate))
        .await
        .expect("timed out waiting for state")
        .expect("state channel closed");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_server_creation() {
        let server = MockWsServer::new().await;
        assert!(server.url().starts_with("ws://127.0.0.1:"));
        server.shutdown().await;
    }
}
