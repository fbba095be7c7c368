//! Client configuration
//!
//! [`ClientConfig`] is the plain options record a client is created from.
//! Everything is optional at this level; validation happens once, when the
//! client is created, and produces the immutable settings the client keeps
//! for its whole life.
//!
//! | Option               | Default                                    |
//! |----------------------|--------------------------------------------|
//! | `uri`                | required; absolute `ws://` or `wss://` URI |
//! | `reconnect_schedule` | [`RECONNECT_SCHEDULE`]                     |
//! | `buffered`           | `false`                                    |
//!
//! [`RECONNECT_SCHEDULE`]: crate::RECONNECT_SCHEDULE

use crate::reconnect::ReconnectSchedule;
use hookup_core::{Error, Result};
use url::Url;

/// Options for creating a [`Client`](crate::Client)
///
/// ```rust
/// use hookup_client::{ClientConfig, ReconnectSchedule};
///
/// let config = ClientConfig::new("ws://localhost:2948/")
///     .with_reconnect_schedule(1..=5)
///     .with_buffered(true);
///
/// assert_eq!(config.reconnect_schedule, Some(ReconnectSchedule::range(1, 5)));
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClientConfig {
    pub uri: Option<String>,
    pub reconnect_schedule: Option<ReconnectSchedule>,
    pub buffered: Option<bool>,
}

impl ClientConfig {
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            uri: Some(uri.into()),
            ..Default::default()
        }
    }

    pub fn with_reconnect_schedule(mut self, schedule: impl Into<ReconnectSchedule>) -> Self {
        self.reconnect_schedule = Some(schedule.into());
        self
    }

    pub fn with_buffered(mut self, buffered: bool) -> Self {
        self.buffered = Some(buffered);
        self
    }

    /// Check the options and fill in defaults
    pub(crate) fn validate(self) -> Result<Settings> {
        let raw = match self.uri {
            Some(uri) if !uri.trim().is_empty() => uri,
            _ => return Err(Error::UriRequired),
        };
        let url = parse_uri(&raw)?;

        Ok(Settings {
            uri: raw,
            url,
            reconnect_schedule: self.reconnect_schedule.unwrap_or_default(),
            buffered: self.buffered.unwrap_or(false),
        })
    }
}

/// Validated, immutable client settings
#[derive(Debug, Clone)]
pub(crate) struct Settings {
    /// The URI exactly as supplied
    pub(crate) uri: String,
    pub(crate) url: Url,
    pub(crate) reconnect_schedule: ReconnectSchedule,
    pub(crate) buffered: bool,
}

/// Whether this build can open `wss://` connections
const TLS_ENABLED: bool = cfg!(any(feature = "native-tls", feature = "rustls-tls-webpki-roots"));

/// Parse `uri` as an absolute WebSocket URI
///
/// Only `ws` and `wss` schemes with a host are accepted; anything else is
/// [`Error::InvalidUri`]. `wss` also needs one of the TLS features, which
/// `rustls-tls-webpki-roots` provides by default.
pub fn parse_uri(uri: &str) -> Result<Url> {
    let url = Url::parse(uri).map_err(|e| Error::InvalidUri(format!("{}: {}", uri, e)))?;

    match url.scheme() {
        "ws" => {}
        "wss" if TLS_ENABLED => {}
        "wss" => {
            return Err(Error::InvalidUri(format!(
                "{}: wss requires the native-tls or rustls-tls-webpki-roots feature",
                uri
            )))
        }
        scheme => {
            return Err(Error::InvalidUri(format!(
                "{}: unsupported scheme '{}', expected ws or wss",
                uri, scheme
            )))
        }
    }

    if url.host_str().map_or(true, str::is_empty) {
        return Err(Error::InvalidUri(format!("{}: missing host", uri)));
    }

    Ok(url)
}
