//! Client metrics definitions
//!
//! OpenTelemetry instruments describing connection health. They are exported
//! through whatever meter provider is installed globally, normally the one
//! set up by `hookup_core::init_observability`.
//!
//! # Metrics Collected
//!
//! - **connection.state**: current state code, see [`ConnectionState::code`] (gauge)
//! - **reconnection.attempts**: retries scheduled (counter)
//! - **reconnection.success**: retries that ended in an open connection (counter)
//! - **reconnection.exhausted**: outages that ran out of schedule (counter)
//! - **messages.sent** / **messages.received**: traffic on live connections (counters)
//! - **messages.buffered** / **messages.dropped**: sends made while disconnected (counters)
//! - **errors.total**: transport errors, by type (counter)
//!
//! # Examples
//!
//! ```rust,no_run
//! use hookup_client::ClientMetrics;
//!
//! let metrics = ClientMetrics::new("quotes-client");
//! metrics.record_error("handshake");
//! ```
//!
//! [`ConnectionState::code`]: crate::ConnectionState::code

use crate::connection_state::ConnectionState;
use opentelemetry::{
    global,
    metrics::{Counter, Gauge, Meter},
    KeyValue,
};

/// Client metrics for monitoring
pub struct ClientMetrics {
    /// Connection state code (0=idle, 1=connecting, 2=connected, 3=reconnecting, 4=disconnected)
    pub connection_state: Gauge<i64>,
    pub reconnection_attempts: Counter<u64>,
    pub reconnection_success: Counter<u64>,
    pub reconnection_exhausted: Counter<u64>,
    pub messages_sent: Counter<u64>,
    pub messages_received: Counter<u64>,
    pub messages_buffered: Counter<u64>,
    pub messages_dropped: Counter<u64>,
    pub errors_total: Counter<u64>,
}

impl ClientMetrics {
    /// Create a new ClientMetrics instance on the global meter provider
    pub fn new(service_name: impl Into<String>) -> Self {
        let name: &'static str = Box::leak(service_name.into().into_boxed_str());
        let meter = global::meter(name);
        Self::new_with_meter(&meter)
    }

    /// Create a new ClientMetrics instance with a custom meter
    pub fn new_with_meter(meter: &Meter) -> Self {
        Self {
            connection_state: meter
                .i64_gauge("hookup.client.connection.state")
                .with_description("Connection state (0=idle, 1=connecting, 2=connected, 3=reconnecting, 4=disconnected)")
                .build(),
            reconnection_attempts: meter
                .u64_counter("hookup.client.reconnection.attempts")
                .with_description("Total number of reconnection attempts scheduled")
                .build(),
            reconnection_success: meter
                .u64_counter("hookup.client.reconnection.success")
                .with_description("Total number of successful reconnections")
                .build(),
            reconnection_exhausted: meter
                .u64_counter("hookup.client.reconnection.exhausted")
                .with_description("Total number of outages that exhausted the reconnect schedule")
                .build(),
            messages_sent: meter
                .u64_counter("hookup.client.messages.sent")
                .with_description("Total number of messages written to a live connection")
                .build(),
            messages_received: meter
                .u64_counter("hookup.client.messages.received")
                .with_description("Total number of messages received")
                .build(),
            messages_buffered: meter
                .u64_counter("hookup.client.messages.buffered")
                .with_description("Total number of messages queued while disconnected")
                .build(),
            messages_dropped: meter
                .u64_counter("hookup.client.messages.dropped")
                .with_description("Total number of messages dropped while disconnected")
                .build(),
            errors_total: meter
                .u64_counter("hookup.client.errors.total")
                .with_description("Total number of transport errors")
                .build(),
        }
    }

    /// Update connection state
    pub fn update_connection_state(&self, state: &ConnectionState) {
        self.connection_state.record(state.code(), &[]);
    }

    /// Record an error
    pub fn record_error(&self, error_type: &str) {
        let attributes = &[KeyValue::new("error_type", error_type.to_string())];
        self.errors_total.add(1, attributes);
    }

    pub fn record_reconnection_attempt(&self) {
        self.reconnection_attempts.add(1, &[]);
    }

    pub fn record_reconnection_success(&self) {
        self.reconnection_success.add(1, &[]);
    }

    pub fn record_reconnection_exhausted(&self) {
        self.reconnection_exhausted.add(1, &[]);
    }

    /// Record messages written to the connection
    ///
    /// `source` is `"direct"` for live sends and `"buffer"` for drained ones.
    pub fn record_sent(&self, count: u64, source: &'static str) {
        self.messages_sent.add(count, &[KeyValue::new("source", source)]);
    }

    pub fn record_received(&self) {
        self.messages_received.add(1, &[]);
    }

    pub fn record_buffered(&self) {
        self.messages_buffered.add(1, &[]);
    }

    pub fn record_dropped(&self) {
        self.messages_dropped.add(1, &[]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_metrics_creation() {
        let metrics = ClientMetrics::new("test-client");

        // Just test that metrics can be recorded without panicking
        metrics.update_connection_state(&ConnectionState::Connected);
        metrics.record_error("handshake");
        metrics.record_reconnection_attempt();
        metrics.record_reconnection_success();
        metrics.record_reconnection_exhausted();
    }

    #[test]
    fn test_connection_state_metrics() {
        let metrics = ClientMetrics::new("test-client-state");

        metrics.update_connection_state(&ConnectionState::Idle);
        metrics.update_connection_state(&ConnectionState::Connecting);
        metrics.update_connection_state(&ConnectionState::Connected);
        metrics.update_connection_state(&ConnectionState::Reconnecting {
            attempt: 1,
            next_delay: Duration::from_secs(1),
        });
        metrics.update_connection_state(&ConnectionState::Disconnected);
    }

    #[test]
    fn test_message_metrics() {
        let meter = global::meter("test-client-messages");
        let metrics = ClientMetrics::new_with_meter(&meter);

        metrics.record_sent(1, "direct");
        metrics.record_sent(3, "buffer");
        metrics.record_received();
        metrics.record_buffered();
        metrics.record_dropped();
    }
}
