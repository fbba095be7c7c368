//! Client builder
//!
//! The `ClientBuilder` provides a fluent API for configuring a client
//! before creating it. Beyond the options in [`ClientConfig`] it lets you:
//! - Swap the transport (for tests, or a custom socket stack)
//! - Configure observability (OpenTelemetry)
//! - Set the service name used for telemetry
//!
//! # Examples
//!
//! ```rust,no_run
//! use hookup_client::{ClientBuilder, ExponentialBackoff};
//! use std::time::Duration;
//!
//! # fn example() -> hookup_core::Result<()> {
//! // Seconds-range schedule with buffering
//! let client = ClientBuilder::new()
//!     .uri("ws://localhost:2948/")
//!     .reconnect_schedule(1..=5)
//!     .buffered(true)
//!     .build()?;
//!
//! // Unbounded backoff with metrics
//! let client2 = ClientBuilder::new()
//!     .uri("wss://stream.example.com/ticker")
//!     .reconnect_schedule(ExponentialBackoff::new(
//!         Duration::from_millis(500),
//!         Duration::from_secs(30),
//!     ))
//!     .with_default_observability()
//!     .service_name("ticker-client")
//!     .build()?;
//! # Ok(())
//! # }
//! ```

use crate::config::ClientConfig;
use crate::metrics::ClientMetrics;
use crate::reconnect::ReconnectSchedule;
use crate::transport::{Transport, TungsteniteTransport};
use crate::Client;
use hookup_core::{Error, ObservabilityConfig, Result};
use std::sync::Arc;

/// Builder for configuring and creating a [`Client`]
pub struct ClientBuilder {
    config: ClientConfig,
    transport: Option<Arc<dyn Transport>>,
    observability_config: Option<ObservabilityConfig>,
    enable_metrics: bool,
    service_name: Option<String>,
}

impl ClientBuilder {
    /// Create a new client builder with no options set
    pub fn new() -> Self {
        Self::from_config(ClientConfig::default())
    }

    /// Start from an existing options record
    pub fn from_config(config: ClientConfig) -> Self {
        Self {
            config,
            transport: None,
            observability_config: None,
            enable_metrics: false,
            service_name: None,
        }
    }

    /// Set the server URI (required)
    pub fn uri(mut self, uri: impl Into<String>) -> Self {
        self.config.uri = Some(uri.into());
        self
    }

    /// Set the delays between reconnection attempts
    ///
    /// Accepts a [`ReconnectSchedule`], a `Vec<Duration>`, an inclusive range
    /// of seconds such as `1..=5`, or any of the strategy types.
    pub fn reconnect_schedule(mut self, schedule: impl Into<ReconnectSchedule>) -> Self {
        self.config.reconnect_schedule = Some(schedule.into());
        self
    }

    /// Queue sends made while disconnected instead of dropping them
    pub fn buffered(mut self, buffered: bool) -> Self {
        self.config.buffered = Some(buffered);
        self
    }

    /// Use a custom transport instead of `tokio-tungstenite`
    pub fn transport(mut self, transport: impl Transport + 'static) -> Self {
        self.transport = Some(Arc::new(transport));
        self
    }

    /// Enable OpenTelemetry observability with custom configuration
    ///
    /// Installs the global subscriber and providers on `build()`.
    pub fn with_observability(mut self, config: ObservabilityConfig) -> Self {
        self.observability_config = Some(config);
        self
    }

    /// Enable OpenTelemetry observability with default configuration
    pub fn with_default_observability(mut self) -> Self {
        self.observability_config = Some(ObservabilityConfig::default());
        self
    }

    /// Record client metrics on the already-installed global meter provider
    pub fn with_metrics(mut self) -> Self {
        self.enable_metrics = true;
        self
    }

    /// Set service name for observability (used if observability is enabled)
    pub fn service_name(mut self, name: impl Into<String>) -> Self {
        self.service_name = Some(name.into());
        self
    }

    /// Validate the options and create the client
    ///
    /// No connection is opened; call [`Client::connect`] for that.
    ///
    /// # Errors
    ///
    /// [`Error::UriRequired`] without a URI, [`Error::InvalidUri`] when it is
    /// not an absolute `ws`/`wss` URI, [`Error::Internal`] when observability
    /// fails to initialize.
    pub fn build(self) -> Result<Client> {
        let settings = self.config.validate()?;

        let metrics = if let Some(mut config) = self.observability_config {
            if let Some(name) = self.service_name {
                config.service_name = name;
            }

            hookup_core::init_observability(config.clone())
                .map_err(|e| Error::Internal(format!("Failed to initialize observability: {}", e)))?;

            Some(Arc::new(ClientMetrics::new(config.service_name)))
        } else if self.enable_metrics {
            let name = self.service_name.unwrap_or_else(|| "hookup".to_string());
            Some(Arc::new(ClientMetrics::new(name)))
        } else {
            None
        };

        let transport = self
            .transport
            .unwrap_or_else(|| Arc::new(TungsteniteTransport::new()));

        tracing::debug!(
            uri = %settings.uri,
            buffered = settings.buffered,
            schedule = ?settings.reconnect_schedule,
            "Client created"
        );

        Ok(Client::from_parts(settings, transport, metrics))
    }
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}
