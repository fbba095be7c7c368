//! hookup - resilient WebSocket client
//!
//! This is the main convenience crate that re-exports the hookup sub-crates.
//! Use it if you want a single dependency.
//!
//! # Architecture
//!
//! hookup is organized into modular crates:
//!
//! - **hookup-core**: errors, the `Message` type, logging and OpenTelemetry setup
//! - **hookup-client**: the reconnecting client, retry schedules, buffering and transports
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use hookup::{Client, ClientConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//!     hookup::init_logging("info")?;
//!
//!     let client = Client::new(ClientConfig::new("ws://localhost:2948/").with_buffered(true))?;
//!     client.on_receive(|message| println!("Received: {}", message)).await;
//!     client.connect()?;
//!
//!     client.send_json(&serde_json::json!({"action": "subscribe", "channel": "ticker"}))?;
//!
//!     tokio::signal::ctrl_c().await?;
//!     client.disconnect().await;
//!     Ok(())
//! }
//! ```

// Re-export the sub-crates
// This allows users to access everything through the `hookup::` prefix
pub use hookup_client as client;
pub use hookup_core as core;

// Convenience re-exports for common types
pub use hookup_client::{
    Client, ClientBuilder, ClientConfig, ConnectionState, Event, EventKind, ExponentialBackoff,
    FixedDelay, NoReconnect, ReconnectSchedule, Transport, RECONNECT_SCHEDULE,
};
pub use hookup_core::{
    init_logging, init_observability, shutdown_observability, Error, Message,
    ObservabilityConfig, Result,
};
