//! # Event Bus System
//!
//! Provides an event-driven architecture for the catalog core using `tokio::sync::broadcast`.
//! Library, sync and imaging modules publish typed events; hosts subscribe to
//! refresh views or show progress.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐    emit     ┌───────────┐
//! │ Library      ├────────────>│           │
//! └──────────────┘             │           │   subscribe   ┌────────────┐
//! ┌──────────────┐    emit     │ EventBus  ├──────────────>│ Subscriber │
//! │ Sync         ├────────────>│ (broadcast│               └────────────┘
//! └──────────────┘             │  channel) │   subscribe   ┌────────────┐
//! ┌──────────────┐    emit     │           ├──────────────>│ Subscriber │
//! │ Imaging      ├────────────>│           │               └────────────┘
//! └──────────────┘             └───────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use core_runtime::events::{CoreEvent, EventBus, SyncEvent};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let event_bus = EventBus::new(100);
//! let mut subscriber = event_bus.subscribe();
//!
//! event_bus.emit(CoreEvent::Sync(SyncEvent::SignedOut)).ok();
//!
//! let event = subscriber.recv().await.unwrap();
//! assert_eq!(event.description(), "Signed out of remote backup");
//! # }
//! ```
//!
//! ## Error Handling
//!
//! - **`RecvError::Lagged(n)`**: Subscriber was too slow and missed `n` events.
//!   This is non-fatal; the subscriber can continue receiving new events.
//! - **`RecvError::Closed`**: All senders have been dropped. This indicates shutdown.
//!
//! Emitting with no subscribers returns an error which publishers ignore.

use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast;

pub use tokio::sync::broadcast::error::{RecvError, SendError};
pub use tokio::sync::broadcast::Receiver;

/// Default buffer size for the event bus channel.
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 100;

// ============================================================================
// Core Event Types
// ============================================================================

/// Top-level event enum encompassing all event categories.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "payload")]
pub enum CoreEvent {
    /// Local catalog changes
    Library(LibraryEvent),
    /// Remote backup activity
    Sync(SyncEvent),
    /// Image compression activity
    Imaging(ImagingEvent),
}

impl CoreEvent {
    /// Returns a human-readable description of the event.
    pub fn description(&self) -> &str {
        match self {
            CoreEvent::Library(e) => e.description(),
            CoreEvent::Sync(e) => e.description(),
            CoreEvent::Imaging(e) => e.description(),
        }
    }

    /// Returns the severity level of the event.
    pub fn severity(&self) -> EventSeverity {
        match self {
            CoreEvent::Sync(SyncEvent::Failed { .. }) => EventSeverity::Error,
            CoreEvent::Sync(SyncEvent::SizeWarning { .. }) => EventSeverity::Warning,
            CoreEvent::Imaging(ImagingEvent::CompressionCompleted { failed, .. }) if *failed > 0 => {
                EventSeverity::Warning
            }
            CoreEvent::Sync(SyncEvent::UploadCompleted { .. })
            | CoreEvent::Sync(SyncEvent::DownloadCompleted { .. })
            | CoreEvent::Sync(SyncEvent::SignedIn { .. })
            | CoreEvent::Library(LibraryEvent::CatalogImported { .. }) => EventSeverity::Info,
            _ => EventSeverity::Debug,
        }
    }
}

/// Event severity levels for filtering and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventSeverity {
    Debug,
    Info,
    Warning,
    Error,
}

// ============================================================================
// Library Events
// ============================================================================

/// Events related to the local catalog.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum LibraryEvent {
    /// A collection was inserted at the top of the listing.
    CollectionCreated { collection_id: String, title: String },
    /// A collection was saved from its editor.
    CollectionSaved { collection_id: String },
    /// A collection was removed.
    CollectionDeleted { collection_id: String },
    /// Two collections exchanged their order values.
    CollectionsReordered { first_id: String, second_id: String },
    /// A catalog was written from an import or a remote backup.
    CatalogImported {
        count: usize,
        /// `"restore"` or `"merge"`
        policy: String,
    },
}

impl LibraryEvent {
    fn description(&self) -> &str {
        match self {
            LibraryEvent::CollectionCreated { .. } => "Collection created",
            LibraryEvent::CollectionSaved { .. } => "Collection saved",
            LibraryEvent::CollectionDeleted { .. } => "Collection deleted",
            LibraryEvent::CollectionsReordered { .. } => "Collections reordered",
            LibraryEvent::CatalogImported { .. } => "Catalog imported",
        }
    }
}

// ============================================================================
// Sync Events
// ============================================================================

/// Events related to the remote backup.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum SyncEvent {
    SignedIn { login: String },
    SignedOut,
    UploadStarted { bytes: u64 },
    /// Payload is above the soft threshold but still accepted.
    SizeWarning { bytes: u64, soft_limit: u64 },
    UploadCompleted {
        remote_id: String,
        bytes: u64,
        /// Whether a new remote blob was created rather than updated.
        created: bool,
    },
    DownloadCompleted {
        remote_id: Option<String>,
        collections: usize,
    },
    Failed { operation: String, message: String },
}

impl SyncEvent {
    fn description(&self) -> &str {
        match self {
            SyncEvent::SignedIn { .. } => "Signed in to remote backup",
            SyncEvent::SignedOut => "Signed out of remote backup",
            SyncEvent::UploadStarted { .. } => "Backup upload started",
            SyncEvent::SizeWarning { .. } => "Backup payload is large",
            SyncEvent::UploadCompleted { .. } => "Backup uploaded",
            SyncEvent::DownloadCompleted { .. } => "Backup downloaded",
            SyncEvent::Failed { .. } => "Sync operation failed",
        }
    }
}

// ============================================================================
// Imaging Events
// ============================================================================

/// Events emitted by bulk image compression.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum ImagingEvent {
    CompressionProgress { completed: usize, total: usize },
    CompressionCompleted {
        total: usize,
        succeeded: usize,
        failed: usize,
    },
}

impl ImagingEvent {
    fn description(&self) -> &str {
        match self {
            ImagingEvent::CompressionProgress { .. } => "Compressing images",
            ImagingEvent::CompressionCompleted { .. } => "Image compression finished",
        }
    }
}

// ============================================================================
// Event Bus
// ============================================================================

/// Central broadcast channel for [`CoreEvent`]s.
///
/// Cloning is cheap; all clones publish into the same channel.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<CoreEvent>,
}

impl EventBus {
    /// Creates a new event bus with the specified buffer size.
    ///
    /// Subscribers that fall behind by more than `capacity` events receive
    /// `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publishes an event to all subscribers.
    ///
    /// Returns the number of subscribers that received the event, or an
    /// error if there are none.
    pub fn emit(&self, event: CoreEvent) -> Result<usize, SendError<CoreEvent>> {
        self.sender.send(event)
    }

    /// Creates a new subscriber. Past events are not replayed.
    pub fn subscribe(&self) -> Receiver<CoreEvent> {
        self.sender.subscribe()
    }

    /// Returns the number of active subscribers.
    ///
    /// ```rust
    /// use core_runtime::events::EventBus;
    ///
    /// let event_bus = EventBus::new(100);
    /// assert_eq!(event_bus.subscriber_count(), 0);
    ///
    /// let _subscriber = event_bus.subscribe();
    /// assert_eq!(event_bus.subscriber_count(), 1);
    /// ```
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

// ============================================================================
// Event Stream Wrapper
// ============================================================================

type EventFilter = Box<dyn Fn(&CoreEvent) -> bool + Send + Sync>;

/// A wrapper around `broadcast::Receiver` with optional filtering.
///
/// ```rust
/// use core_runtime::events::{CoreEvent, EventBus, EventStream};
///
/// let event_bus = EventBus::new(100);
/// let sync_only = EventStream::new(event_bus.subscribe())
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

    fn matches(&self, event: &CoreEvent) -> bool {
        self.filter.as_ref().map_or(true, |filter| filter(event))
    }

    /// Receives the next event that passes the filter.
    pub async fn recv(&mut self) -> Result<CoreEvent, RecvError> {
        loop {
            let event = self.receiver.recv().await?;
            if self.matches(&event) {
                return Ok(event);
            }
        }
    }

    /// Attempts to receive an event without waiting.
    ///
    /// Returns `None` if no matching events are currently available.
    pub fn try_recv(&mut self) -> Option<Result<CoreEvent, RecvError>> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => {
                    if self.matches(&event) {
                        return Some(Ok(event));
                    }
                }
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

#[cfg(test)]
mod tests {
    use super::*;

    fn upload_completed() -> CoreEvent {
        CoreEvent::Sync(SyncEvent::UploadCompleted {
            remote_id: "gist-1".to_string(),
            bytes: 2048,
            created: true,
        })
    }

    #[tokio::test]
    async fn test_event_emission_no_subscribers() {
        let bus = EventBus::new(10);
        assert!(bus.emit(CoreEvent::Sync(SyncEvent::SignedOut)).is_err());
    }

    #[tokio::test]
    async fn test_multiple_subscribers_receive_same_event() {
        let bus = EventBus::new(10);
        let mut sub1 = bus.subscribe();
        let mut sub2 = bus.subscribe();

        let event = CoreEvent::Library(LibraryEvent::CollectionCreated {
            collection_id: "c-1".to_string(),
            title: "Sketches".to_string(),
        });
        assert_eq!(bus.emit(event.clone()).unwrap(), 2);

        assert_eq!(sub1.recv().await.unwrap(), event);
        assert_eq!(sub2.recv().await.unwrap(), event);
    }

    #[tokio::test]
    async fn test_event_stream_with_filter() {
        let bus = EventBus::new(10);
        let mut stream =
            EventStream::new(bus.subscribe()).filter(|event| matches!(event, CoreEvent::Sync(_)));

        bus.emit(CoreEvent::Imaging(ImagingEvent::CompressionProgress {
            completed: 1,
            total: 4,
        }))
        .ok();
        bus.emit(upload_completed()).ok();

        assert_eq!(stream.recv().await.unwrap(), upload_completed());
    }

    #[tokio::test]
    async fn test_lagged_subscriber() {
        let bus = EventBus::new(2);
        let mut sub = bus.subscribe();

        for completed in 0..5 {
            bus.emit(CoreEvent::Imaging(ImagingEvent::CompressionProgress {
                completed,
                total: 5,
            }))
            .ok();
        }

        assert!(matches!(sub.recv().await, Err(RecvError::Lagged(_))));
    }

    #[test]
    fn test_event_severity() {
        let failed = CoreEvent::Sync(SyncEvent::Failed {
            operation: "upload".to_string(),
            message: "network".to_string(),
        });
        assert_eq!(failed.severity(), EventSeverity::Error);

        let warning = CoreEvent::Sync(SyncEvent::SizeWarning {
            bytes: 6 * 1024 * 1024,
            soft_limit: 5 * 1024 * 1024,
        });
        assert_eq!(warning.severity(), EventSeverity::Warning);

        let partial = CoreEvent::Imaging(ImagingEvent::CompressionCompleted {
            total: 3,
            succeeded: 2,
            failed: 1,
        });
        assert_eq!(partial.severity(), EventSeverity::Warning);

        assert_eq!(upload_completed().severity(), EventSeverity::Info);

        let reorder = CoreEvent::Library(LibraryEvent::CollectionsReordered {
            first_id: "a".to_string(),
            second_id: "b".to_string(),
        });
        assert_eq!(reorder.severity(), EventSeverity::Debug);
    }

    #[test]
    fn test_event_serialization() {
        let event = upload_completed();
        let json = serde_json::to_value(&event).unwrap();

        assert_eq!(json["type"], "Sync");
        assert_eq!(json["payload"]["event"], "UploadCompleted");
        assert_eq!(json["payload"]["remote_id"], "gist-1");

        let back: CoreEvent = serde_json::from_value(json).unwrap();
        assert_eq!(back, event);
    }

    #[tokio::test]
    async fn test_try_recv() {
        let bus = EventBus::default();
        let mut stream = EventStream::new(bus.subscribe());
        assert!(stream.try_recv().is_none());

        bus.emit(CoreEvent::Sync(SyncEvent::SignedOut)).ok();
        let received = stream.try_recv().unwrap().unwrap();
        assert_eq!(received, CoreEvent::Sync(SyncEvent::SignedOut));
    }
}
