//! Sync notifications for the host application.
//!
//! A [`CoreEvent`] wraps either a [`SyncEvent`] (flow lifecycle) or a
//! [`LibraryEvent`] (local changes a UI may want to refresh on). They travel
//! over a `tokio::sync::broadcast` channel owned by [`EventBus`];
//! [`EventStream`] adds optional filtering on the receiving side.
//!
//! Emission is best-effort. A bus with no subscribers rejects the event and
//! the publisher carries on.
//!
//! ```rust
//! use core_runtime::events::{CoreEvent, EventBus, SyncEvent};
//!
//! let bus = EventBus::new(16);
//! let mut ui = bus.subscribe();
//!
//! bus.emit(CoreEvent::Sync(SyncEvent::Started {
//!     flow: "liked_songs".to_string(),
//! }))
//! .ok();
//!
//! assert!(ui.try_recv().is_ok());
//! ```
//!
//! A receiver that falls more than the buffer size behind gets
//! `RecvError::Lagged(n)` once and then resumes with newer events.
//! `RecvError::Closed` means the bus is gone.

use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast;

pub use tokio::sync::broadcast::error::{RecvError, SendError, TryRecvError};
pub use tokio::sync::broadcast::Receiver;

pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 100;

/// Everything published on an [`EventBus`]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "payload")]
pub enum CoreEvent {
    /// Reconciliation flow lifecycle
    Sync(SyncEvent),
    /// Local library changes worth surfacing
    Library(LibraryEvent),
}

impl CoreEvent {
    /// Short label for log lines
    pub fn description(&self) -> &str {
        match self {
            CoreEvent::Sync(e) => e.description(),
            CoreEvent::Library(e) => e.description(),
        }
    }

    pub fn severity(&self) -> EventSeverity {
        match self {
            CoreEvent::Sync(SyncEvent::Failed { .. }) => EventSeverity::Error,
            CoreEvent::Sync(SyncEvent::Completed { failed, .. }) if *failed > 0 => {
                EventSeverity::Warning
            }
            CoreEvent::Sync(SyncEvent::Completed { .. }) => EventSeverity::Info,
            _ => EventSeverity::Debug,
        }
    }
}

/// How loudly a host should surface an event
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventSeverity {
    Debug,
    Info,
    Warning,
    Error,
}

/// Events emitted by the reconciliation flows.
///
/// `flow` is the flow's stable name (`liked_songs`, `library_songs`,
/// `liked_albums`, `artist_subscriptions`, `saved_playlists`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum SyncEvent {
    /// The flow acquired its guard and started.
    Started { flow: String },
    /// The flow was already running; this invocation did nothing.
    Skipped { flow: String },
    /// The flow finished its removal and upsert passes.
    Completed {
        flow: String,
        inserted: u64,
        updated: u64,
        unbookmarked: u64,
        /// Items whose upsert failed in isolation.
        failed: u64,
    },
    /// The remote listing or the local store failed; nothing was reconciled.
    Failed { flow: String, message: String },
}

impl SyncEvent {
    fn description(&self) -> &str {
        match self {
            SyncEvent::Started { .. } => "Sync started",
            SyncEvent::Skipped { .. } => "Sync already running",
            SyncEvent::Completed { .. } => "Sync completed",
            SyncEvent::Failed { .. } => "Sync failed",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum LibraryEvent {
    /// A playlist's membership was rebuilt from its remote source.
    PlaylistContentReplaced { playlist_id: String, song_count: u64 },
}

impl LibraryEvent {
    fn description(&self) -> &str {
        match self {
            LibraryEvent::PlaylistContentReplaced { .. } => "Playlist content replaced",
        }
    }
}

/// Broadcast channel for [`CoreEvent`]s
///
/// Cheap to share behind an `Arc`; every subscriber gets its own receiver.
pub struct EventBus {
    sender: broadcast::Sender<CoreEvent>,
}

impl EventBus {
    /// `capacity` is how many events a slow subscriber may trail by
    /// before it starts losing them.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Send `event` to every current subscriber, returning how many there
    /// were. Fails only when nobody is listening.
    pub fn emit(&self, event: CoreEvent) -> Result<usize, SendError<CoreEvent>> {
        self.sender.send(event)
    }

    /// Creates a new subscriber. Past events are not replayed.
    pub fn subscribe(&self) -> Receiver<CoreEvent> {
        self.sender.subscribe()
    }

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

type EventFilter = Box<dyn Fn(&CoreEvent) -> bool + Send + Sync>;

/// Subscriber that can ignore events it does not care about
///
/// ```rust
/// use core_runtime::events::{CoreEvent, EventBus, EventStream};
///
/// let bus = EventBus::new(16);
/// let sync_only = EventStream::new(bus.subscribe())
///     .filter(|event| matches!(event, CoreEvent::Sync(_)));
/// ```
pub struct EventStream {
    receiver: Receiver<CoreEvent>,
    filter: Option<EventFilter>,
}

impl EventStream {
    pub fn new(receiver: Receiver<CoreEvent>) -> Self {
        Self {
            receiver,
            filter: None,
        }
    }

    /// Only events matching `predicate` will be returned by `recv()`.
    pub fn filter<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&CoreEvent) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Box::new(predicate));
        self
    }

    /// Wait for the next event that passes the filter; lag and close
    /// errors from the channel are passed through.
    pub async fn recv(&mut self) -> Result<CoreEvent, RecvError> {
        loop {
            let event = self.receiver.recv().await?;
            match &self.filter {
                Some(filter) if !filter(&event) => continue,
                _ => return Ok(event),
            }
        }
    }

    /// Non-blocking variant of [`recv`](Self::recv).
    pub fn try_recv(&mut self) -> Result<CoreEvent, TryRecvError> {
        loop {
            let event = self.receiver.try_recv()?;
            match &self.filter {
                Some(filter) if !filter(&event) => continue,
                _ => return Ok(event),
            }
        }
    }
}
