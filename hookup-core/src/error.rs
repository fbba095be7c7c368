//! Error types for hookup
//!
//! A single `Error` enum covers every failure the client can report. The
//! variants fall into two groups with very different propagation rules:
//!
//! - **Configuration errors** (`UriRequired`, `InvalidUri`): returned
//!   synchronously from client construction. They are the only errors an
//!   application has to handle in normal operation.
//! - **Runtime errors** (`WebSocket`, `NotConnected`, `ConnectionClosed`, ...):
//!   produced by the transport while the connection task runs. The
//!   connection task absorbs them (they advance the retry schedule or are
//!   logged) and reports connectivity changes through `close` events instead.
//!
//! # Examples
//!
//! ```rust
//! use hookup_core::Error;
//!
//! let error = Error::InvalidUri("http:".into());
//! assert!(error.is_configuration());
//! assert!(!Error::ConnectionClosed.is_configuration());
//! ```

use thiserror::Error;

/// Result type for hookup operations
pub type Result<T> = std::result::Result<T, Error>;

/// Application-level error type for hookup operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// No URI was supplied in the client configuration
    #[error("a uri is required to create a client")]
    UriRequired,

    /// The URI did not parse, or is not an absolute `ws://`/`wss://` URI
    #[error("invalid uri: {0}")]
    InvalidUri(String),

    /// A send was attempted on a connection that is not open
    ///
    /// Raised by transports. The connection task checks its state before
    /// sending, so this never reaches application code.
    #[error("not connected")]
    NotConnected,

    /// WebSocket transport layer error
    ///
    /// Covers handshake failures, refused connections and protocol
    /// violations reported by the underlying socket library.
    #[error("WebSocket error: {0}")]
    WebSocket(String),

    /// Serialization or deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// An event name did not match any known event kind
    #[error("unknown event: {0}")]
    UnknownEvent(String),

    /// Connection was closed
    #[error("Connection closed")]
    ConnectionClosed,

    /// `connect()` was called outside of a tokio runtime
    #[error("no tokio runtime available to drive the connection")]
    NoRuntime,

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Whether this error comes from validating client configuration
    pub fn is_configuration(&self) -> bool {
        matches!(self, Error::UriRequired | Error::InvalidUri(_))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_formatting() {
        assert_eq!(
            Error::UriRequired.to_string(),
            "a uri is required to create a client"
        );

        let error = Error::InvalidUri("http:".to_string());
        assert!(error.to_string().contains("http:"));

        let error = Error::WebSocket("Connection refused".to_string());
        assert_eq!(error.to_string(), "WebSocket error: Connection refused");
    }

    #[test]
    fn test_configuration_errors() {
        assert!(Error::UriRequired.is_configuration());
        assert!(Error::InvalidUri("x".into()).is_configuration());
        assert!(!Error::NotConnected.is_configuration());
        assert!(!Error::WebSocket("x".into()).is_configuration());
        assert!(!Error::NoRuntime.is_configuration());
    }

    #[test]
    fn test_error_from_serde() {
        let serde_error = serde_json::from_str::<serde_json::Value>(r#"{"invalid": json"#)
            .unwrap_err();
        let error: Error = serde_error.into();

        match error {
            Error::Serialization(msg) => assert!(!msg.is_empty()),
            e => panic!("Expected Serialization error, got: {:?}", e),
        }
    }

    #[test]
    fn test_unknown_event_error() {
        let error = Error::UnknownEvent("opened".into());
        assert_eq!(error.to_string(), "unknown event: opened");
        assert!(!error.is_configuration());
    }

    #[test]
    fn test_connection_closed_error() {
        let error = Error::ConnectionClosed;
        assert_eq!(error.to_string(), "Connection closed");
        assert_eq!(error.clone(), Error::ConnectionClosed);
    }
}
