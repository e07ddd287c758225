//! Event Notifier
//!
//! Synchronous publish/subscribe for store state transitions. Subscribers are
//! invoked in subscription order after the operation has committed and the
//! store's totals are consistent. A [`BufferStore`](crate::store::BufferStore)
//! delivers on the thread that performed the operation. A shared store may
//! hand delivery to whichever thread is already delivering.
//!
//! The subscriber list is snapshotted before dispatch, so a callback may
//! subscribe or unsubscribe (itself included) without deadlocking; such
//! changes take effect from the next event.

use crate::entry::{BufferEntry, BufferId};
use crate::error::BufferError;
use core::fmt;
use core::time::Duration;
use parking_lot::Mutex;
use std::sync::{Arc, Weak};

/// Why an entry left the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemovalReason {
    /// Removed through `remove`.
    Explicit,
    /// Chosen as a victim by cleanup.
    Evicted,
}

impl fmt::Display for RemovalReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RemovalReason::Explicit => write!(f, "removed explicitly"),
            RemovalReason::Evicted => write!(f, "evicted by cleanup"),
        }
    }
}

/// Discriminant of a [`BufferEvent`], handy for filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferEventKind {
    /// See [`BufferEvent::Added`].
    Add,
    /// See [`BufferEvent::Removed`].
    Remove,
    /// See [`BufferEvent::Cleared`].
    Clear,
    /// See [`BufferEvent::Error`].
    Error,
    /// See [`BufferEvent::Threshold`].
    Threshold,
    /// See [`BufferEvent::Overflow`].
    Overflow,
}

/// A store state transition. `timestamp` is the store clock's reading.
#[derive(Debug, Clone, PartialEq)]
pub enum BufferEvent {
    /// An entry was admitted and recorded.
    Added {
        /// Snapshot of the new entry.
        entry: BufferEntry,
        /// Clock reading.
        timestamp: u64,
    },
    /// An entry left the store.
    Removed {
        /// Snapshot of the removed entry.
        entry: BufferEntry,
        /// Explicit removal or eviction.
        reason: RemovalReason,
        /// Clock reading.
        timestamp: u64,
    },
    /// Every entry was dropped by `clear`.
    Cleared {
        /// Bytes resident before the clear.
        cleared_size: u64,
        /// Duration resident before the clear.
        cleared_duration: Duration,
        /// Entries resident before the clear.
        cleared_count: usize,
        /// Clock reading.
        timestamp: u64,
    },
    /// A cleanup pass ran because a high-water mark was exceeded.
    Threshold {
        /// Bytes reclaimed.
        removed_size: u64,
        /// Duration reclaimed.
        removed_duration: Duration,
        /// Entries evicted.
        removed_count: usize,
        /// Clock reading.
        timestamp: u64,
    },
    /// An insertion left the store above its high-water mark while
    /// `auto_cleanup` is off.
    Overflow {
        /// Resident bytes after the insertion.
        current_size: u64,
        /// Resident duration after the insertion.
        current_duration: Duration,
        /// Resident entries after the insertion.
        count: usize,
        /// Clock reading.
        timestamp: u64,
    },
    /// An operation failed.
    Error {
        /// Id involved, when one had been generated.
        item_id: Option<BufferId>,
        /// The failure, as returned to the caller.
        error: BufferError,
        /// Clock reading.
        timestamp: u64,
    },
}

impl BufferEvent {
    /// The event's discriminant.
    pub fn kind(&self) -> BufferEventKind {
        match self {
            BufferEvent::Added { .. } => BufferEventKind::Add,
            BufferEvent::Removed { .. } => BufferEventKind::Remove,
            BufferEvent::Cleared { .. } => BufferEventKind::Clear,
            BufferEvent::Threshold { .. } => BufferEventKind::Threshold,
            BufferEvent::Overflow { .. } => BufferEventKind::Overflow,
            BufferEvent::Error { .. } => BufferEventKind::Error,
        }
    }

    /// Id of the entry the event is about, if any.
    pub fn item_id(&self) -> Option<&BufferId> {
        match self {
            BufferEvent::Added { entry, .. } | BufferEvent::Removed { entry, .. } => {
                Some(&entry.id)
            }
            BufferEvent::Error { item_id, .. } => item_id.as_ref(),
            BufferEvent::Cleared { .. }
            | BufferEvent::Threshold { .. }
            | BufferEvent::Overflow { .. } => None,
        }
    }

    /// Clock reading at which the event was produced.
    pub fn timestamp(&self) -> u64 {
        match self {
            BufferEvent::Added { timestamp, .. }
            | BufferEvent::Removed { timestamp, .. }
            | BufferEvent::Cleared { timestamp, .. }
            | BufferEvent::Threshold { timestamp, .. }
            | BufferEvent::Overflow { timestamp, .. }
            | BufferEvent::Error { timestamp, .. } => *timestamp,
        }
    }
}

type Callback = Arc<dyn Fn(&BufferEvent) + Send + Sync>;

#[derive(Default)]
struct Registry {
    next_token: u64,
    subscribers: Vec<(u64, Callback)>,
}

/// Ordered list of event subscribers.
///
/// Clones share the same subscriber list.
#[derive(Clone, Default)]
pub struct EventNotifier {
    registry: Arc<Mutex<Registry>>,
}

impl EventNotifier {
    /// Creates a notifier with no subscribers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `callback`; it runs after every subsequently published event.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&BufferEvent) + Send + Sync + 'static,
    {
        let mut registry = self.registry.lock();
        let token = registry.next_token;
        registry.next_token += 1;
        registry.subscribers.push((token, Arc::new(callback)));
        Subscription {
            registry: Arc::downgrade(&self.registry),
            token,
        }
    }

    /// Number of live subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.registry.lock().subscribers.len()
    }

    /// Invokes every subscriber with `event`, in subscription order.
    pub fn publish(&self, event: &BufferEvent) {
        let callbacks = self.snapshot();
        for callback in &callbacks {
            callback(event);
        }
    }

    /// Publishes a batch of events, each to every subscriber, in order.
    pub fn publish_all<I>(&self, events: I)
    where
        I: IntoIterator<Item = BufferEvent>,
    {
        let mut events = events.into_iter().peekable();
        if events.peek().is_none() {
            return;
        }
        let callbacks = self.snapshot();
        for event in events {
            for callback in &callbacks {
                callback(&event);
            }
        }
    }

    fn snapshot(&self) -> Vec<Callback> {
        self.registry
            .lock()
            .subscribers
            .iter()
            .map(|(_, callback)| Arc::clone(callback))
            .collect()
    }
}

impl fmt::Debug for EventNotifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventNotifier")
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

/// Handle returned by `on_buffer_event`.
///
/// Dropping the handle keeps the subscription alive; call
/// [`Subscription::unsubscribe`] to end it.
#[derive(Debug)]
pub struct Subscription {
    registry: Weak<Mutex<Registry>>,
    token: u64,
}

impl Subscription {
    /// Removes the subscriber. Returns false if it was already gone, for
    /// example because the notifier was dropped.
    pub fn unsubscribe(self) -> bool {
        let Some(registry) = self.registry.upgrade() else {
            return false;
        };
        let mut registry = registry.lock();
        let before = registry.subscribers.len();
        registry.subscribers.retain(|(token, _)| *token != self.token);
        registry.subscribers.len() != before
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("next_token", &self.next_token)
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}
