//! Connection state machine
//!
//! Every client owns one connection task. The task is the only place the
//! connection, the retry schedule and the outbound queue are touched; the
//! public [`Client`](crate::Client) talks to it through a command channel
//! and reads its progress from a lock-free flag and a `watch` channel.
//!
//! # Connection States
//!
//! - **Idle**: created, `connect()` not called yet
//! - **Connecting**: an open is in flight
//! - **Connected**: the connection is live
//! - **Reconnecting**: the connection was lost; waiting out the next delay
//! - **Disconnected**: closed by the client, or the schedule ran out
//!
//! # State Transitions
//!
//! ```text
//!  Idle ──connect──▶ Connecting ──opened──▶ Connected
//!                     │    ▲                    │
//!              failed │    │ delay elapsed      │ lost
//!                     ▼    │                    ▼
//!                    Reconnecting ◀─────────────┘
//!                          │
//!                exhausted │        disconnect (from any active state)
//!                          ▼                    │
//!                    Disconnected ◀─────────────┘
//! ```
//!
//! # Ordering Guarantees
//!
//! On open, `open` handlers run first, then buffered messages are written,
//! and only then does `is_connected()` report true. On loss, `is_connected()`
//! turns false before any `close` handler runs. A `disconnect()` wins over a
//! pending retry or an in-flight open: neither can complete afterwards.

use crate::handler::{Event, HandlerRegistry};
use crate::metrics::ClientMetrics;
use crate::queue::MessageQueue;
use crate::reconnect::{ReconnectSchedule, RetrySchedule};
use crate::transport::{Connection, Transport};
use hookup_core::{Message, Result};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use url::Url;

/// Connection state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Not started
    Idle,
    /// Attempting to connect
    Connecting,
    /// Successfully connected
    Connected,
    /// Waiting `next_delay` before reconnection attempt `attempt`
    Reconnecting { attempt: u32, next_delay: Duration },
    /// Stopped; only an explicit `connect()` leaves this state
    Disconnected,
}

impl ConnectionState {
    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionState::Connected)
    }

    /// Whether the client is connected or working towards a connection
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            ConnectionState::Connecting
                | ConnectionState::Connected
                | ConnectionState::Reconnecting { .. }
        )
    }

    /// Numeric code used by the connection state gauge
    pub fn code(&self) -> i64 {
        match self {
            ConnectionState::Idle => 0,
            ConnectionState::Connecting => 1,
            ConnectionState::Connected => 2,
            ConnectionState::Reconnecting { .. } => 3,
            ConnectionState::Disconnected => 4,
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionState::Idle => f.write_str("idle"),
            ConnectionState::Connecting => f.write_str("connecting"),
            ConnectionState::Connected => f.write_str("connected"),
            ConnectionState::Reconnecting { attempt, next_delay } => {
                write!(f, "reconnecting (attempt {} in {:?})", attempt, next_delay)
            }
            ConnectionState::Disconnected => f.write_str("disconnected"),
        }
    }
}

/// State readable from any thread without touching the connection task
#[derive(Debug)]
pub(crate) struct SharedState {
    connected: AtomicBool,
    state: watch::Sender<ConnectionState>,
}

impl SharedState {
    pub(crate) fn new() -> Self {
        let (state, _) = watch::channel(ConnectionState::Idle);
        Self {
            connected: AtomicBool::new(false),
            state,
        }
    }

    pub(crate) fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    pub(crate) fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }

    // The flag goes first so a watcher woken by the new state never reads a stale flag.
    fn publish(&self, state: ConnectionState) {
        self.connected.store(state.is_connected(), Ordering::Release);
        self.state.send_replace(state);
    }
}

/// Requests from client handles to the connection task
#[derive(Debug)]
pub(crate) enum Command {
    Connect,
    Disconnect(oneshot::Sender<()>),
    Send(Message),
}

enum Step {
    Continue,
    Stop,
}

/// Owns one connection and drives it through its lifecycle
pub(crate) struct ConnectionManager {
    uri: Url,
    transport: Arc<dyn Transport>,
    schedule: RetrySchedule,
    queue: MessageQueue,
    handlers: HandlerRegistry,
    shared: Arc<SharedState>,
    metrics: Option<Arc<ClientMetrics>>,
    state: ConnectionState,
    connection: Option<Box<dyn Connection>>,
}

impl ConnectionManager {
    pub(crate) fn new(
        uri: Url,
        transport: Arc<dyn Transport>,
        schedule: ReconnectSchedule,
        buffered: bool,
        handlers: HandlerRegistry,
        shared: Arc<SharedState>,
        metrics: Option<Arc<ClientMetrics>>,
    ) -> Self {
        Self {
            uri,
            transport,
            schedule: schedule.start(),
            queue: MessageQueue::new(buffered),
            handlers,
            shared,
            metrics,
            state: ConnectionState::Idle,
            connection: None,
        }
    }

    /// Process commands until every client handle is gone
    #[tracing::instrument(name = "connection", skip_all, fields(uri = %self.uri))]
    pub(crate) async fn run(mut self, mut commands: mpsc::UnboundedReceiver<Command>) {
        tracing::debug!("Connection task started");

        loop {
            let step = match self.state {
                ConnectionState::Idle | ConnectionState::Disconnected => {
                    self.idle(&mut commands).await
                }
                ConnectionState::Connecting => self.connecting(&mut commands).await,
                ConnectionState::Connected => self.connected(&mut commands).await,
                ConnectionState::Reconnecting { next_delay, .. } => {
                    self.waiting(next_delay, &mut commands).await
                }
            };

            if let Step::Stop = step {
                break;
            }
        }

        if let Some(mut connection) = self.connection.take() {
            if let Err(e) = connection.close().await {
                tracing::debug!(error = %e, "Error closing connection on shutdown");
            }
        }
        if self.state.is_active() {
            self.transition(ConnectionState::Disconnected);
        }

        tracing::debug!("Connection task stopped");
    }

    async fn idle(&mut self, commands: &mut mpsc::UnboundedReceiver<Command>) -> Step {
        match commands.recv().await {
            Some(Command::Connect) => {
                tracing::info!("Connecting");
                self.schedule.reset();
                self.transition(ConnectionState::Connecting);
            }
            Some(Command::Send(message)) => self.hold(message),
            Some(Command::Disconnect(done)) => {
                let _ = done.send(());
            }
            None => return Step::Stop,
        }
        Step::Continue
    }

    async fn connecting(&mut self, commands: &mut mpsc::UnboundedReceiver<Command>) -> Step {
        let transport = Arc::clone(&self.transport);
        let uri = self.uri.clone();
        let mut open = transport.open(&uri);

        loop {
            tokio::select! {
                result = &mut open => {
                    self.opened(result).await;
                    return Step::Continue;
                }
                command = commands.recv() => match command {
                    Some(Command::Send(message)) => self.hold(message),
                    Some(Command::Connect) => {}
                    Some(Command::Disconnect(done)) => {
                        // Dropping `open` abandons the handshake.
                        self.disconnect(done).await;
                        return Step::Continue;
                    }
                    None => return Step::Stop,
                },
            }
        }
    }

    async fn connected(&mut self, commands: &mut mpsc::UnboundedReceiver<Command>) -> Step {
        tokio::select! {
            inbound = next_inbound(&mut self.connection) => match inbound {
                Some(Ok(message)) => {
                    tracing::trace!(bytes = message.len(), "Message received");
                    if let Some(metrics) = &self.metrics {
                        metrics.record_received();
                    }
                    self.handlers.dispatch(&Event::Data(message)).await;
                }
                Some(Err(e)) => {
                    tracing::error!(error = %e, "WebSocket error");
                    self.record_error("receive");
                    self.connection_lost(e.to_string()).await;
                }
                None => {
                    tracing::info!("Connection closed by server");
                    self.connection_lost("connection closed by server".to_string()).await;
                }
            },
            command = commands.recv() => match command {
                Some(Command::Send(message)) => self.send_live(message).await,
                Some(Command::Connect) => {}
                Some(Command::Disconnect(done)) => self.disconnect(done).await,
                None => return Step::Stop,
            },
        }
        Step::Continue
    }

    async fn waiting(
        &mut self,
        delay: Duration,
        commands: &mut mpsc::UnboundedReceiver<Command>,
    ) -> Step {
        let sleep = tokio::time::sleep(delay);
        tokio::pin!(sleep);

        loop {
            tokio::select! {
                _ = &mut sleep => {
                    self.transition(ConnectionState::Connecting);
                    return Step::Continue;
                }
                command = commands.recv() => match command {
                    Some(Command::Send(message)) => self.hold(message),
                    Some(Command::Connect) => {}
                    Some(Command::Disconnect(done)) => {
                        self.disconnect(done).await;
                        return Step::Continue;
                    }
                    None => return Step::Stop,
                },
            }
        }
    }

    async fn opened(&mut self, result: Result<Box<dyn Connection>>) {
        let mut connection = match result {
            Ok(connection) => connection,
            Err(e) => {
                tracing::warn!(error = %e, attempt = self.schedule.attempt(), "Connection attempt failed");
                self.record_error("connect");
                // Retries already announced their outage; only a fresh attempt reports a close.
                let fresh = self.schedule.attempt() == 0;
                self.schedule_retry(e.to_string(), fresh).await;
                return;
            }
        };

        let reconnected = self.schedule.attempt() > 0;
        self.schedule.reset();

        self.handlers.dispatch(&Event::Open { connected: true }).await;

        match self.queue.drain_into(&mut *connection).await {
            Ok(0) => {}
            Ok(sent) => {
                if let Some(metrics) = &self.metrics {
                    metrics.record_sent(sent as u64, "buffer");
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, pending = self.queue.len(), "Connection lost while draining buffer");
                self.record_error("send");
                self.schedule_retry(e.to_string(), true).await;
                return;
            }
        }

        self.connection = Some(connection);
        self.transition(ConnectionState::Connected);

        if reconnected {
            tracing::info!("Reconnected successfully");
            if let Some(metrics) = &self.metrics {
                metrics.record_reconnection_success();
            }
        } else {
            tracing::info!("Connected");
        }
    }

    async fn send_live(&mut self, message: Message) {
        let Some(connection) = self.connection.as_mut() else {
            self.hold(message);
            return;
        };

        // Keep a copy for replay if the write fails on a buffered client.
        let retained = self.queue.is_buffered().then(|| message.clone());

        match connection.send(message).await {
            Ok(()) => {
                if let Some(metrics) = &self.metrics {
                    metrics.record_sent(1, "direct");
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "Send failed");
                self.record_error("send");
                if let Some(message) = retained {
                    self.queue.enqueue(message);
                }
                self.connection_lost(e.to_string()).await;
            }
        }
    }

    async fn connection_lost(&mut self, reason: String) {
        self.connection = None;
        self.schedule_retry(reason, true).await;
    }

    /// Move to `Reconnecting` with the next delay, or give up when the schedule is spent
    async fn schedule_retry(&mut self, reason: String, announce_close: bool) {
        match self.schedule.next_delay() {
            Ok(delay) => {
                let attempt = self.schedule.attempt();
                self.transition(ConnectionState::Reconnecting {
                    attempt,
                    next_delay: delay,
                });

                if announce_close {
                    self.handlers
                        .dispatch(&Event::Close {
                            connected: false,
                            reason: Some(reason),
                        })
                        .await;
                }

                tracing::info!(
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    "Attempting reconnection"
                );
                if let Some(metrics) = &self.metrics {
                    metrics.record_reconnection_attempt();
                }
                self.handlers
                    .dispatch(&Event::Reconnecting { attempt, delay })
                    .await;
            }
            Err(exhausted) => {
                tracing::error!(attempts = exhausted.attempts, "Reconnection abandoned");
                if let Some(metrics) = &self.metrics {
                    metrics.record_reconnection_exhausted();
                }
                self.schedule.reset();
                self.transition(ConnectionState::Disconnected);
                self.handlers
                    .dispatch(&Event::Close {
                        connected: false,
                        reason: Some(format!("{} ({})", reason, exhausted)),
                    })
                    .await;
            }
        }
    }

    async fn disconnect(&mut self, done: oneshot::Sender<()>) {
        let was_active = self.state.is_active();

        if was_active {
            self.transition(ConnectionState::Disconnected);
        }
        self.schedule.reset();

        if let Some(mut connection) = self.connection.take() {
            if let Err(e) = connection.close().await {
                tracing::debug!(error = %e, "Error while closing connection");
            }
        }

        if was_active {
            tracing::info!("Disconnected");
            self.handlers
                .dispatch(&Event::Close {
                    connected: false,
                    reason: Some("closed by client".to_string()),
                })
                .await;
        }

        let _ = done.send(());
    }

    /// Buffer or drop a message sent while not connected
    fn hold(&mut self, message: Message) {
        let buffered = self.queue.enqueue(message);
        if let Some(metrics) = &self.metrics {
            if buffered {
                metrics.record_buffered();
            } else {
                metrics.record_dropped();
            }
        }
    }

    fn transition(&mut self, state: ConnectionState) {
        tracing::debug!(from = %self.state, to = %state, "State transition");
        self.state = state;
        self.shared.publish(state);
        if let Some(metrics) = &self.metrics {
            metrics.update_connection_state(&state);
        }
    }

    fn record_error(&self, error_type: &str) {
        if let Some(metrics) = &self.metrics {
            metrics.record_error(error_type);
        }
    }
}

async fn next_inbound(connection: &mut Option<Box<dyn Connection>>) -> Option<Result<Message>> {
    match connection {
        Some(connection) => connection.recv().await,
        None => None,
    }
}
