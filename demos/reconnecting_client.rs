//! Demo of scheduled reconnection with send buffering
//!
//! Connects to the echo server, sends a numbered message every two seconds
//! and logs every lifecycle event. Messages sent while the server is down
//! are buffered and flushed, in order, once the client reconnects.
//!
//! Run the server first:
//! ```bash
//! cargo run --example echo_server
//! ```
//!
//! Then run this client:
//! ```bash
//! cargo run --example reconnecting_client
//! ```

use hookup::{Client, Event, EventKind};
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    hookup::init_logging("info,hookup_client=debug")?;

    let client = Client::builder()
        .uri("ws://127.0.0.1:2948/")
        .reconnect_schedule(1..=5)
        .buffered(true)
        .build()?;

    client
        .on(EventKind::Open, |_: &Event| tracing::info!("Connection open"))
        .await;
    client
        .on_disconnected(|event: &Event| {
            tracing::warn!(reason = event.reason().unwrap_or("unknown"), "Connection closed")
        })
        .await;
    client
        .on(EventKind::Reconnecting, |event: &Event| {
            if let Event::Reconnecting { attempt, delay } = event {
                tracing::info!(attempt, ?delay, "Reconnect scheduled");
            }
        })
        .await;
    client
        .on_receive(|message| tracing::info!(%message, "Received"))
        .await;

    client.connect()?;

    let mut counter = 0u64;
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            _ = tokio::time::sleep(Duration::from_secs(2)) => {
                counter += 1;
                client.send_json(&serde_json::json!({"seq": counter}))?;
                tracing::info!(seq = counter, state = %client.state(), "Sent");
            }
        }
    }

    client.disconnect().await;
    Ok(())
}
