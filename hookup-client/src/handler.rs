//! Event handler registry
//!
//! Applications observe the connection through events. Handlers are
//! registered per [`EventKind`] and invoked on the client's connection task,
//! in registration order, each time an event of that kind occurs.
//!
//! | Kind           | Fired when                                              |
//! |----------------|---------------------------------------------------------|
//! | `Open`         | a connection was established (first or after a retry)   |
//! | `Close`        | the connection was lost, refused, given up, or closed   |
//! | `Data`         | a message arrived from the server                       |
//! | `Reconnecting` | a retry was scheduled; carries the attempt and delay    |
//!
//! Handlers run on the connection task, so a slow handler delays the next
//! transition. Hand long work off to another task. A handler that panics is
//! logged and skipped; the remaining handlers and the connection carry on.
//!
//! # Examples
//!
//! ```rust
//! use hookup_client::{Event, EventKind, HandlerRegistry};
//! use hookup_core::Message;
//!
//! # #[tokio::main]
//! # async fn main() {
//! let registry = HandlerRegistry::new();
//! registry
//!     .register(EventKind::Data, |event: &Event| {
//!         if let Some(message) = event.message() {
//!             println!("received {}", message);
//!         }
//!     })
//!     .await;
//!
//! let called = registry.dispatch(&Event::Data(Message::text("hi"))).await;
//! assert_eq!(called, 1);
//! # }
//! ```

use hookup_core::{Error, Message};
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

/// Kinds of lifecycle events a handler can subscribe to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Open,
    Close,
    Data,
    Reconnecting,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Open => "open",
            EventKind::Close => "close",
            EventKind::Data => "data",
            EventKind::Reconnecting => "reconnecting",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "open" => Ok(EventKind::Open),
            "close" => Ok(EventKind::Close),
            "data" | "message" => Ok(EventKind::Data),
            "reconnecting" => Ok(EventKind::Reconnecting),
            other => Err(Error::UnknownEvent(other.to_string())),
        }
    }
}

/// A lifecycle event delivered to handlers
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// The connection opened
    Open {
        /// Always true; mirrors the connected flag at the moment of firing
        connected: bool,
    },
    /// The connection closed, failed to open, or was abandoned
    Close {
        /// Always false
        connected: bool,
        /// Human readable cause, when one is known
        reason: Option<String>,
    },
    /// A message arrived
    Data(Message),
    /// A reconnection attempt was scheduled
    Reconnecting {
        /// 1-based attempt number within the current outage
        attempt: u32,
        /// How long the client waits before the attempt
        delay: Duration,
    },
}

impl Event {
    pub fn kind(&self) -> EventKind {
        match self {
            Event::Open { .. } => EventKind::Open,
            Event::Close { .. } => EventKind::Close,
            Event::Data(_) => EventKind::Data,
            Event::Reconnecting { .. } => EventKind::Reconnecting,
        }
    }

    /// Connection flag carried by open and close events
    pub fn connected(&self) -> Option<bool> {
        match self {
            Event::Open { connected } | Event::Close { connected, .. } => Some(*connected),
            _ => None,
        }
    }

    /// Payload of a data event
    pub fn message(&self) -> Option<&Message> {
        match self {
            Event::Data(message) => Some(message),
            _ => None,
        }
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            Event::Close { reason, .. } => reason.as_deref(),
            _ => None,
        }
    }
}

/// Callback invoked for events
///
/// Implemented for every `Fn(&Event) + Send + Sync`, so closures can be
/// registered directly.
pub trait EventHandler: Send + Sync {
    fn handle(&self, event: &Event);
}

impl<F> EventHandler for F
where
    F: Fn(&Event) + Send + Sync,
{
    fn handle(&self, event: &Event) {
        self(event)
    }
}

type HandlerList = Vec<Arc<dyn EventHandler>>;

/// Handlers grouped by event kind
#[derive(Clone, Default)]
pub struct HandlerRegistry {
    handlers: Arc<RwLock<HashMap<EventKind, HandlerList>>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a handler for `kind`; earlier handlers for the kind are kept
    pub async fn register<H>(&self, kind: EventKind, handler: H)
    where
        H: EventHandler + 'static,
    {
        self.handlers
            .write()
            .await
            .entry(kind)
            .or_default()
            .push(Arc::new(handler));
    }

    /// Invoke every handler registered for the event's kind
    ///
    /// Returns the number of handlers called.
    pub async fn dispatch(&self, event: &Event) -> usize {
        let kind = event.kind();
        let handlers: HandlerList = match self.handlers.read().await.get(&kind) {
            Some(list) => list.clone(),
            None => {
                tracing::trace!(event = %kind, "No handlers registered");
                return 0;
            }
        };
        // Lock released; handlers may register more handlers.

        for handler in &handlers {
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| handler.handle(event)));
            if let Err(payload) = outcome {
                tracing::error!(
                    event = %kind,
                    panic = panic_message(payload.as_ref()),
                    "Event handler panicked"
                );
            }
        }

        handlers.len()
    }

    pub async fn has_handlers(&self, kind: EventKind) -> bool {
        self.count(kind).await > 0
    }

    pub async fn count(&self, kind: EventKind) -> usize {
        self.handlers
            .read()
            .await
            .get(&kind)
            .map_or(0, |list| list.len())
    }

    /// Remove all handlers for `kind`, returning how many were removed
    pub async fn unregister_all(&self, kind: EventKind) -> usize {
        self.handlers
            .write()
            .await
            .remove(&kind)
            .map_or(0, |list| list.len())
    }
}

impl fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerRegistry").finish_non_exhaustive()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "non-string panic payload"
    }
}
