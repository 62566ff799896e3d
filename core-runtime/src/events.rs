//! # Session Event Bus
//!
//! Broadcasts session lifecycle notifications to any number of listeners
//! using a `broadcast` channel. This is how host code learns that a session
//! was opened, an identity changed, or a link was created without wrapping
//! each call site.
//!
//! ## Usage
//!
//! ```rust
//! use core_runtime::events::{EventBus, SessionEvent};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let bus = EventBus::new(16);
//! let mut listener = bus.subscribe();
//!
//! bus.emit(SessionEvent::LoggedOut).ok();
//! assert_eq!(listener.recv().await.unwrap(), SessionEvent::LoggedOut);
//! # }
//! ```
//!
//! ## Error Handling
//!
//! - **`RecvError::Lagged(n)`**: the listener fell behind and missed `n`
//!   events. Non-fatal; keep receiving.
//! - **`RecvError::Closed`**: every sender is gone, i.e. the client was
//!   dropped. Listeners should exit.
//!
//! Emitting with no listeners is not an error for the session core; it
//! discards the `SendError`.

use core_async::sync::broadcast;
use serde::{Deserialize, Serialize};
use std::fmt;

pub use core_async::sync::broadcast::error::{RecvError, SendError};
pub use core_async::sync::broadcast::Receiver;

/// Default buffer size for the event bus channel.
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 64;

/// Notifications emitted by a session client.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum SessionEvent {
    /// A session became usable.
    Initialized {
        /// Restored from the short-lived store without a network call.
        resumed: bool,
        /// Server treated this as a first install rather than an open.
        install: bool,
    },
    /// `init` failed; the client must be initialised again.
    InitFailed {
        /// Human-readable failure reason.
        reason: String,
    },
    /// The developer identity was attached to the session.
    IdentitySet {
        identity: String,
    },
    /// The identity was detached and fresh ids issued.
    LoggedOut,
    /// The session was closed.
    Closed,
    /// A deep link was generated.
    LinkCreated {
        url: String,
    },
    /// An SMS with a link was dispatched.
    SmsSent,
    /// A custom event was recorded.
    EventTracked {
        event: String,
    },
    /// Credits were redeemed.
    CreditsRedeemed {
        amount: i64,
        bucket: String,
    },
}

impl SessionEvent {
    /// Returns a human-readable description of the event.
    pub fn description(&self) -> &str {
        match self {
            SessionEvent::Initialized { resumed: true, .. } => "Session resumed",
            SessionEvent::Initialized { install: true, .. } => "Session started (install)",
            SessionEvent::Initialized { .. } => "Session started (open)",
            SessionEvent::InitFailed { .. } => "Session initialisation failed",
            SessionEvent::IdentitySet { .. } => "Identity set",
            SessionEvent::LoggedOut => "Logged out",
            SessionEvent::Closed => "Session closed",
            SessionEvent::LinkCreated { .. } => "Link created",
            SessionEvent::SmsSent => "SMS sent",
            SessionEvent::EventTracked { .. } => "Event tracked",
            SessionEvent::CreditsRedeemed { .. } => "Credits redeemed",
        }
    }

    /// Whether this event reports a failure.
    pub fn is_error(&self) -> bool {
        matches!(self, SessionEvent::InitFailed { .. })
    }
}

/// Broadcast channel carrying [`SessionEvent`]s.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<SessionEvent>,
}

impl EventBus {
    /// Creates a new event bus with the specified buffer size.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Publishes an event to all subscribers.
    ///
    /// Returns the number of subscribers that received the event, or an
    /// error if there are none.
    pub fn emit(&self, event: SessionEvent) -> Result<usize, SendError<SessionEvent>> {
        self.sender.send(event)
    }

    /// Creates a new subscriber. Past events are not replayed.
    pub fn subscribe(&self) -> Receiver<SessionEvent> {
        self.sender.subscribe()
    }

    /// Returns the number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

type EventFilter = Box<dyn Fn(&SessionEvent) -> bool + Send + Sync>;

/// A `broadcast::Receiver` with an optional filter.
///
/// ```rust
/// use core_runtime::events::{EventBus, EventStream, SessionEvent};
///
/// let bus = EventBus::default();
/// let links_only = EventStream::new(bus.subscribe())
///     .filter(|event| matches!(event, SessionEvent::LinkCreated { .. }));
/// ```
pub struct EventStream {
    receiver: Receiver<SessionEvent>,
    filter: Option<EventFilter>,
}

impl EventStream {
    pub fn new(receiver: Receiver<SessionEvent>) -> Self {
        Self {
            receiver,
            filter: None,
        }
    }

    /// Only events matching `predicate` are returned by `recv()`.
    pub fn filter<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&SessionEvent) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Box::new(predicate));
        self
    }

    /// Receives the next event that passes the filter.
    pub async fn recv(&mut self) -> Result<SessionEvent, RecvError> {
        loop {
            let event = self.receiver.recv().await?;
            match &self.filter {
                Some(filter) if !filter(&event) => continue,
                _ => return Ok(event),
            }
        }
    }

    /// Attempts to receive a matching event without waiting.
    ///
    /// Returns `None` if no matching event is currently buffered.
    pub fn try_recv(&mut self) -> Option<Result<SessionEvent, RecvError>> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => match &self.filter {
                    Some(filter) if !filter(&event) => continue,
                    _ => return Some(Ok(event)),
                },
                Err(broadcast::error::TryRecvError::Empty) => return None,
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    return Some(Err(RecvError::Lagged(n)))
                }
                Err(broadcast::error::TryRecvError::Closed) => return Some(Err(RecvError::Closed)),
            }
        }
    }
}

impl fmt::Debug for EventStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventStream")
            .field("has_filter", &self.filter.is_some())
            .finish()
    }
}
