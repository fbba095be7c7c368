//! Core types for hookup
//!
//! This crate holds the pieces shared by every hookup crate:
//!
//! - **Error handling**: the `Error` enum and `Result` alias
//! - **Types**: the `Message` payload moved between application and transport
//! - **Observability**: `tracing` subscriber and OpenTelemetry setup
//!
//! The connection lifecycle itself lives in `hookup-client`.
//!
//! # Example
//!
//! ```rust
//! use hookup_core::{Error, Message};
//!
//! let message = Message::json(&serde_json::json!({"action": "ping"})).unwrap();
//! assert!(message.is_text());
//!
//! let error = Error::UriRequired;
//! assert!(error.is_configuration());
//! ```

pub mod error;
pub mod observability;
pub mod types;

pub use error::{Error, Result};
pub use observability::{
    init_logging, init_observability, shutdown_observability, ObservabilityConfig,
};
pub use types::Message;
