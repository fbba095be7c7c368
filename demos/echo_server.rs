//! Echo server for the reconnection demo
//!
//! Accepts WebSocket connections, echoes every message back and pushes a
//! heartbeat to each client every few seconds.
//!
//! Run this server first:
//! ```bash
//! cargo run --example echo_server
//! ```
//!
//! Then run the client:
//! ```bash
//! cargo run --example reconnecting_client
//! ```
//!
//! Stop and restart this server to watch the client reconnect.

use futures::{SinkExt, StreamExt};
use std::net::SocketAddr;
use tokio::net::{TcpListener, TcpStream};
use tokio::time::{interval, Duration};
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;

async fn handle_connection(stream: TcpStream, peer: SocketAddr) {
    let ws_stream = match accept_async(stream).await {
        Ok(ws_stream) => ws_stream,
        Err(e) => {
            tracing::warn!(%peer, error = %e, "Handshake failed");
            return;
        }
    };
    tracing::info!(%peer, "Client connected");

    let (mut write, mut read) = ws_stream.split();
    let mut heartbeat = interval(Duration::from_secs(5));
    let mut beats = 0u64;

    loop {
        tokio::select! {
            incoming = read.next() => match incoming {
                Some(Ok(message @ (Message::Text(_) | Message::Binary(_)))) => {
                    tracing::info!(%peer, bytes = message.len(), "Echoing message");
                    if write.send(message).await.is_err() {
                        break;
                    }
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    tracing::warn!(%peer, error = %e, "Read error");
                    break;
                }
            },
            _ = heartbeat.tick() => {
                beats += 1;
                let text = serde_json::json!({"heartbeat": beats}).to_string();
                if write.send(Message::Text(text)).await.is_err() {
                    break;
                }
            }
        }
    }

    tracing::info!(%peer, "Client disconnected");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    hookup::init_logging("info")?;

    let listener = TcpListener::bind("127.0.0.1:2948").await?;
    tracing::info!("Echo server listening on ws://127.0.0.1:2948/");

    loop {
        let (stream, peer) = listener.accept().await?;
        tokio::spawn(handle_connection(stream, peer));
    }
}
