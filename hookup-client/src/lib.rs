//! Resilient WebSocket client
//!
//! This crate provides a WebSocket client that keeps one logical connection
//! to a server alive. When the connection drops it reconnects on a
//! configurable schedule, optionally buffering outbound messages until the
//! link is back, and reports every transition through event handlers.
//!
//! # Core Features
//!
//! - **Validated configuration**: only absolute `ws://`/`wss://` URIs are accepted
//! - **Scheduled reconnection**: fixed delay lists, second ranges, or custom strategies
//! - **Send buffering**: queue messages while disconnected, flush in order on reconnect
//! - **Events**: `open`, `close`, `data` and `reconnecting` handlers
//! - **Pluggable transport**: `tokio-tungstenite` by default, any [`Transport`] in tests
//! - **Observability**: `tracing` spans and OpenTelemetry metrics
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use hookup_client::{Client, ClientConfig, EventKind, Event};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = Client::new(ClientConfig::new("ws://localhost:2948/"))?;
//!
//!     client.on_receive(|message| println!("Received: {}", message)).await;
//!     client
//!         .on(EventKind::Open, |_: &Event| println!("Connected"))
//!         .await;
//!
//!     client.connect()?;
//!     client.send("hello");
//!
//!     tokio::signal::ctrl_c().await?;
//!     client.disconnect().await;
//!     Ok(())
//! }
//! ```
//!
//! # With Buffering and a Custom Schedule
//!
//! ```rust,no_run
//! use hookup_client::{Client, ExponentialBackoff};
//! use std::time::Duration;
//!
//! # async fn example() -> hookup_core::Result<()> {
//! let client = Client::builder()
//!     .uri("wss://stream.example.com/quotes")
//!     .reconnect_schedule(
//!         ExponentialBackoff::new(Duration::from_millis(100), Duration::from_secs(30))
//!             .with_max_attempts(10)
//!             .with_jitter(),
//!     )
//!     .buffered(true)
//!     .build()?;
//!
//! client.connect()?;
//! # Ok(())
//! # }
//! ```

mod client;
mod client_builder;
mod config;
mod connection_state;
mod handler;
mod metrics;
mod queue;
mod reconnect;
mod transport;

pub use client::Client;
pub use client_builder::ClientBuilder;
pub use config::{parse_uri, ClientConfig};
pub use connection_state::ConnectionState;
pub use handler::{Event, EventHandler, EventKind, HandlerRegistry};
pub use metrics::ClientMetrics;
pub use queue::MessageQueue;
pub use reconnect::{
    ExponentialBackoff, FixedDelay, NoReconnect, ReconnectSchedule, ReconnectionStrategy,
    RetrySchedule, ScheduleExhausted, RECONNECT_SCHEDULE,
};
pub use transport::{Connection, Transport, TungsteniteConnection, TungsteniteTransport};

pub use hookup_core::{Error, Message, Result};
