//! Resilient WebSocket client
//!
//! This module provides the main `Client` type, the application-facing
//! handle for one logical connection to one server URI.
//!
//! # Client Lifecycle
//!
//! 1. **Create**: `Client::new` / `Client::builder()` validate the options;
//!    nothing touches the network yet
//! 2. **Register**: attach `open`, `close`, `data` and `reconnecting` handlers
//! 3. **Connect**: `connect()` starts the connection task; lost connections
//!    are re-established on the configured schedule
//! 4. **Disconnect**: `disconnect()` closes the connection and cancels any
//!    pending retry. Dropping the last handle does the same, silently.
//!
//! # Cloning
//!
//! `Client` is cheaply cloneable using `Arc` internally. All clones share
//! the same connection, handlers and state, so handlers may hold a clone
//! (for example to send a greeting on `open`).
//!
//! # Thread Safety
//!
//! `send`, `connect` and `is_connected` may be called from any thread.
//! Sends are handed to the connection task over a channel and written in
//! call order.

use crate::config::{ClientConfig, Settings};
use crate::connection_state::{Command, ConnectionManager, ConnectionState, SharedState};
use crate::handler::{Event, EventHandler, EventKind, HandlerRegistry};
use crate::metrics::ClientMetrics;
use crate::reconnect::ReconnectSchedule;
use crate::transport::Transport;
use crate::ClientBuilder;
use hookup_core::{Error, Message, Result};
use serde::Serialize;
use std::sync::{Arc, Mutex};
use tokio::sync::{mpsc, oneshot, watch};
use url::Url;

/// Connection task waiting for the first `connect()`
struct PendingTask {
    manager: ConnectionManager,
    commands: mpsc::UnboundedReceiver<Command>,
}

struct Inner {
    settings: Settings,
    shared: Arc<SharedState>,
    handlers: HandlerRegistry,
    commands: mpsc::UnboundedSender<Command>,
    pending: Mutex<Option<PendingTask>>,
    metrics: Option<Arc<ClientMetrics>>,
}

/// WebSocket client that reconnects on its own
#[derive(Clone)]
pub struct Client {
    inner: Arc<Inner>,
}

impl Client {
    /// Create a client from options, with the default transport
    ///
    /// ```rust
    /// use hookup_client::{Client, ClientConfig};
    /// use hookup_core::Error;
    ///
    /// let client = Client::new(ClientConfig::new("ws://localhost:2948/")).unwrap();
    /// assert_eq!(client.uri(), "ws://localhost:2948/");
    ///
    /// let missing = Client::new(ClientConfig::default());
    /// assert!(matches!(missing, Err(Error::UriRequired)));
    /// ```
    pub fn new(config: ClientConfig) -> Result<Self> {
        ClientBuilder::from_config(config).build()
    }

    /// Start building a client
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    pub(crate) fn from_parts(
        settings: Settings,
        transport: Arc<dyn Transport>,
        metrics: Option<Arc<ClientMetrics>>,
    ) -> Self {
        let shared = Arc::new(SharedState::new());
        let handlers = HandlerRegistry::new();
        let (commands, command_rx) = mpsc::unbounded_channel();

        let manager = ConnectionManager::new(
            settings.url.clone(),
            transport,
            settings.reconnect_schedule.clone(),
            settings.buffered,
            handlers.clone(),
            Arc::clone(&shared),
            metrics.clone(),
        );

        Self {
            inner: Arc::new(Inner {
                settings,
                shared,
                handlers,
                commands,
                pending: Mutex::new(Some(PendingTask {
                    manager,
                    commands: command_rx,
                })),
                metrics,
            }),
        }
    }

    /// Start connecting
    ///
    /// Returns immediately; progress is reported through `open`/`close`
    /// events and [`is_connected`](Self::is_connected). Calling it while
    /// already connected or connecting does nothing.
    ///
    /// # Errors
    ///
    /// [`Error::NoRuntime`] when called outside a tokio runtime.
    #[tracing::instrument(skip(self), fields(uri = %self.inner.settings.uri))]
    pub fn connect(&self) -> Result<()> {
        self.start_task()?;
        self.command(Command::Connect)
    }

    /// Close the connection and stop reconnecting
    ///
    /// Resolves once the connection task has closed the connection and fired
    /// the `close` handlers. A pending retry or in-flight open is cancelled.
    /// Safe to call repeatedly; a later [`connect`](Self::connect) starts over.
    pub async fn disconnect(&self) {
        if !self.task_started() {
            return;
        }

        let (done, wait) = oneshot::channel();
        if self.command(Command::Disconnect(done)).is_err() {
            return;
        }
        let _ = wait.await;
    }

    /// Send a message
    ///
    /// Never fails: when not connected the message is buffered (buffered
    /// clients) or dropped with a warning.
    pub fn send(&self, message: impl Into<Message>) {
        if self.command(Command::Send(message.into())).is_err() {
            tracing::warn!("Connection task stopped, dropping message");
        }
    }

    /// Serialize `value` as JSON and send it as a text message
    ///
    /// # Errors
    ///
    /// [`Error::Serialization`] when `value` cannot be serialized.
    pub fn send_json<T: Serialize + ?Sized>(&self, value: &T) -> Result<()> {
        self.send(Message::json(value)?);
        Ok(())
    }

    /// Register a handler for an event kind
    pub async fn on<H>(&self, kind: EventKind, handler: H)
    where
        H: EventHandler + 'static,
    {
        self.inner.handlers.register(kind, handler).await;
    }

    /// Register a handler for inbound messages
    pub async fn on_receive<F>(&self, handler: F)
    where
        F: Fn(&Message) + Send + Sync + 'static,
    {
        self.on(EventKind::Data, move |event: &Event| {
            if let Some(message) = event.message() {
                handler(message);
            }
        })
        .await;
    }

    /// Register a handler for close events
    pub async fn on_disconnected<F>(&self, handler: F)
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        self.on(EventKind::Close, handler).await;
    }

    /// Whether the connection is currently open
    ///
    /// Lock-free; safe to poll from any thread.
    pub fn is_connected(&self) -> bool {
        self.inner.shared.is_connected()
    }

    pub fn is_buffered(&self) -> bool {
        self.inner.settings.buffered
    }

    /// The URI exactly as configured
    pub fn uri(&self) -> &str {
        &self.inner.settings.uri
    }

    /// The parsed URI
    pub fn url(&self) -> &Url {
        &self.inner.settings.url
    }

    pub fn reconnect_schedule(&self) -> &ReconnectSchedule {
        &self.inner.settings.reconnect_schedule
    }

    /// Current lifecycle state
    pub fn state(&self) -> ConnectionState {
        self.inner.shared.state()
    }

    /// Receiver that observes every state transition
    ///
    /// ```rust,no_run
    /// # async fn example(client: hookup_client::Client) {
    /// let mut states = client.state_changes();
    /// states.wait_for(|state| state.is_connected()).await.unwrap();
    /// # }
    /// ```
    pub fn state_changes(&self) -> watch::Receiver<ConnectionState> {
        self.inner.shared.subscribe()
    }

    /// The handler registry shared with the connection task
    pub fn handlers(&self) -> &HandlerRegistry {
        &self.inner.handlers
    }

    /// Metrics recorded by this client, when enabled on the builder
    pub fn metrics(&self) -> Option<&ClientMetrics> {
        self.inner.metrics.as_deref()
    }

    fn command(&self, command: Command) -> Result<()> {
        self.inner
            .commands
            .send(command)
            .map_err(|_| Error::ConnectionClosed)
    }

    fn task_started(&self) -> bool {
        self.inner
            .pending
            .lock()
            .map(|pending| pending.is_none())
            .unwrap_or(true)
    }

    /// Spawn the connection task on first use
    fn start_task(&self) -> Result<()> {
        let mut pending = self
            .inner
            .pending
            .lock()
            .map_err(|_| Error::Internal("connection task lock poisoned".to_string()))?;

        if pending.is_none() {
            return Ok(());
        }

        let runtime = tokio::runtime::Handle::try_current().map_err(|_| Error::NoRuntime)?;
        if let Some(PendingTask { manager, commands }) = pending.take() {
            runtime.spawn(manager.run(commands));
            tracing::debug!("Connection task spawned");
        }

        Ok(())
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("uri", &self.inner.settings.uri)
            .field("buffered", &self.inner.settings.buffered)
            .field("state", &self.state())
            .finish()
    }
}
