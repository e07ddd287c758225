//! Thread-safe Buffer Store
//!
//! [`SharedBufferStore`] wraps a [`BufferStore`] in a single
//! `parking_lot::Mutex`. Every operation, reads included, takes the lock for
//! its whole duration, so operations on one store are totally ordered and the
//! totals invariant holds at every point another thread can observe.
//!
//! ## Why one lock?
//!
//! Cleanup picks victims across the whole store, and `get()` mutates the
//! recency and frequency data the victim selection depends on. Sharding the
//! entries would make a cleanup pass lock every shard anyway, so there is
//! nothing to gain from segmentation.
//!
//! ## Events
//!
//! Events produced by an operation are queued under the store lock and
//! delivered after it is released, so subscribers may call back into the same
//! store without deadlocking. Only one thread delivers at a time and the queue
//! is drained in the order operations committed. When another thread is
//! already delivering, an operation returns as soon as its events are queued
//! and that thread delivers them. Operations issued from inside a subscriber
//! are delivered after the current event's subscribers have all run.
//!
//! A panicking subscriber does not roll the operation back.
//!
//! # Example
//!
//! ```rust
//! use media_buffer_cache::{CacheConfig, Metadata, SharedBufferStore};
//! use std::thread;
//! use std::time::Duration;
//!
//! let store = SharedBufferStore::new(CacheConfig::default());
//!
//! let handles: Vec<_> = (0..4)
//!     .map(|_| {
//!         let store = store.clone();
//!         thread::spawn(move || {
//!             for _ in 0..10 {
//!                 let id = store
//!                     .add(vec![0u8; 256], Duration::from_millis(500), Metadata::new())
//!                     .unwrap();
//!                 let _ = store.get(&id);
//!             }
//!         })
//!     })
//!     .collect();
//!
//! for handle in handles {
//!     handle.join().unwrap();
//! }
//! assert_eq!(store.buffer_count(), 40);
//! ```

use crate::config::{CacheConfig, ConfigUpdate};
use crate::entry::{BufferEntry, BufferId, Metadata};
use crate::error::BufferError;
use crate::event::{BufferEvent, EventNotifier, Subscription};
use crate::metrics::{BufferCacheMetrics, CacheMetrics};
use crate::store::{BufferStore, CleanupReport};
use bytes::Bytes;
use core::time::Duration;
use parking_lot::Mutex;
use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;

/// A [`BufferStore`] shareable across threads.
///
/// Clones are handles to the same store.
#[derive(Clone)]
pub struct SharedBufferStore {
    inner: Arc<Mutex<BufferStore>>,
    notifier: EventNotifier,
    dispatch: Arc<DispatchQueue>,
}

impl SharedBufferStore {
    /// Creates a shared store with the default clock and id generator.
    pub fn new(config: CacheConfig) -> Self {
        Self::from_store(BufferStore::new(config))
    }

    /// Shares an already built store, e.g. one from [`BufferStore::builder`].
    pub fn from_store(store: BufferStore) -> Self {
        let notifier = store.notifier().clone();
        Self {
            inner: Arc::new(Mutex::new(store)),
            notifier,
            dispatch: Arc::default(),
        }
    }

    /// See [`BufferStore::configure`].
    pub fn configure(&self, update: ConfigUpdate) {
        self.with_store(|store| store.apply_configure(update))
    }

    /// See [`BufferStore::add`].
    pub fn add(
        &self,
        payload: impl Into<Bytes>,
        duration: Duration,
        metadata: Metadata,
    ) -> Result<BufferId, BufferError> {
        let payload = payload.into();
        self.with_store(|store| store.apply_add(payload, duration, metadata))
    }

    /// See [`BufferStore::get`].
    pub fn get(&self, id: &BufferId) -> Option<Bytes> {
        self.inner.lock().get(id)
    }

    /// Runs `f` on the payload, recording the read.
    ///
    /// The lock is released before `f` runs.
    pub fn get_with<F, R>(&self, id: &BufferId, f: F) -> Option<R>
    where
        F: FnOnce(&[u8]) -> R,
    {
        let payload = self.inner.lock().get(id)?;
        Some(f(&payload))
    }

    /// See [`BufferStore::remove`].
    pub fn remove(&self, id: &BufferId) -> bool {
        self.with_store(|store| store.apply_remove(id))
    }

    /// See [`BufferStore::clear`].
    pub fn clear(&self) {
        self.with_store(BufferStore::apply_clear)
    }

    /// See [`BufferStore::cleanup`].
    pub fn cleanup(&self) -> CleanupReport {
        self.with_store(|store| store.apply_cleanup(0))
    }

    /// See [`BufferStore::item`].
    pub fn item(&self, id: &BufferId) -> Option<BufferEntry> {
        self.inner.lock().item(id)
    }

    /// See [`BufferStore::items`].
    pub fn items(&self) -> Vec<BufferEntry> {
        self.inner.lock().items()
    }

    /// See [`BufferStore::contains`].
    pub fn contains(&self, id: &BufferId) -> bool {
        self.inner.lock().contains(id)
    }

    /// See [`BufferStore::current_size`].
    pub fn current_size(&self) -> u64 {
        self.inner.lock().current_size()
    }

    /// See [`BufferStore::current_duration`].
    pub fn current_duration(&self) -> Duration {
        self.inner.lock().current_duration()
    }

    /// See [`BufferStore::buffer_count`].
    pub fn buffer_count(&self) -> usize {
        self.inner.lock().buffer_count()
    }

    /// See [`BufferStore::is_empty`].
    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    /// Snapshot of the live configuration.
    pub fn config(&self) -> CacheConfig {
        self.inner.lock().config().clone()
    }

    /// See [`BufferStore::target_fill`].
    pub fn target_fill(&self) -> f64 {
        self.inner.lock().target_fill()
    }

    /// See [`BufferStore::is_over_threshold`].
    pub fn is_over_threshold(&self) -> bool {
        self.inner.lock().is_over_threshold()
    }

    /// See [`BufferStore::metrics_snapshot`].
    pub fn metrics_snapshot(&self) -> BufferCacheMetrics {
        self.inner.lock().metrics_snapshot()
    }

    /// Subscribes to store events. Callbacks run without the store lock held.
    pub fn on_buffer_event<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&BufferEvent) + Send + Sync + 'static,
    {
        self.notifier.subscribe(callback)
    }

    fn with_store<R>(&self, op: impl FnOnce(&mut BufferStore) -> R) -> R {
        let result = {
            let mut store = self.inner.lock();
            let result = op(&mut store);
            // queued before the store unlocks so delivery follows commit order
            self.dispatch.push(store.take_events());
            result
        };
        self.dispatch.drain(&self.notifier);
        result
    }
}

/// Events waiting for delivery, shared by every handle to one store.
#[derive(Default)]
struct DispatchQueue {
    state: Mutex<DispatchState>,
}

#[derive(Default)]
struct DispatchState {
    pending: VecDeque<BufferEvent>,
    draining: bool,
}

impl DispatchQueue {
    fn push(&self, events: Vec<BufferEvent>) {
        if !events.is_empty() {
            self.state.lock().pending.extend(events);
        }
    }

    /// Delivers queued events unless another call is already doing so.
    fn drain(&self, notifier: &EventNotifier) {
        {
            let mut state = self.state.lock();
            if state.draining || state.pending.is_empty() {
                return;
            }
            state.draining = true;
        }
        let _guard = DrainGuard(self);
        loop {
            let batch: Vec<BufferEvent> = {
                let mut state = self.state.lock();
                if state.pending.is_empty() {
                    state.draining = false;
                    return;
                }
                state.pending.drain(..).collect()
            };
            notifier.publish_all(batch);
        }
    }
}

/// Releases the drainer role if a subscriber panics mid-delivery.
struct DrainGuard<'a>(&'a DispatchQueue);

impl Drop for DrainGuard<'_> {
    fn drop(&mut self) {
        if std::thread::panicking() {
            self.0.state.lock().draining = false;
        }
    }
}

impl CacheMetrics for SharedBufferStore {
    fn metrics(&self) -> BTreeMap<String, f64> {
        self.inner.lock().metrics()
    }

    fn algorithm_name(&self) -> &'static str {
        self.inner.lock().algorithm_name()
    }
}

impl core::fmt::Debug for SharedBufferStore {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let store = self.inner.lock();
        f.debug_struct("SharedBufferStore")
            .field("buffers", &store.buffer_count())
            .field("current_size", &store.current_size())
            .field("current_duration", &store.current_duration())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::event::BufferEventKind;
    use crate::id::SequentialIds;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    fn make_shared(config: CacheConfig) -> SharedBufferStore {
        SharedBufferStore::from_store(
            BufferStore::builder()
                .config(config)
                .clock(ManualClock::new(0))
                .id_generator(SequentialIds::new("s"))
                .build(),
        )
    }

    #[test]
    fn test_shared_store_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SharedBufferStore>();
    }

    #[test]
    fn test_clones_share_state() {
        let store = make_shared(CacheConfig::default());
        let other = store.clone();
        let id = store
            .add(vec![1u8, 2, 3], Duration::from_secs(1), Metadata::new())
            .unwrap();
        assert_eq!(other.get(&id).unwrap().as_ref(), &[1, 2, 3]);
        assert_eq!(other.item(&id).unwrap().access_count(), 1);
    }

    #[test]
    fn test_get_with_reads_payload() {
        let store = make_shared(CacheConfig::default());
        let id = store
            .add(vec![5u8; 8], Duration::from_secs(1), Metadata::new())
            .unwrap();
        assert_eq!(store.get_with(&id, |bytes| bytes.len()), Some(8));
        assert_eq!(store.get_with(&BufferId::from("nope"), |bytes| bytes.len()), None);
    }

    #[test]
    fn test_subscriber_may_reenter() {
        let store = make_shared(CacheConfig::default());
        let observer = store.clone();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let _ = store.on_buffer_event(move |event| {
            sink.lock().push(observer.buffer_count());
            if let Some(id) = event.item_id() {
                let _ = observer.item(id);
            }
        });
        store
            .add(vec![0u8; 4], Duration::from_secs(1), Metadata::new())
            .unwrap();
        assert_eq!(*seen.lock(), [1]);
    }

    #[test]
    fn test_reentrant_remove_is_delivered_after_add() {
        let store = make_shared(CacheConfig::default());
        let observer = store.clone();
        let kinds = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&kinds);
        let _ = store.on_buffer_event(move |event| {
            sink.lock().push(event.kind());
            if let BufferEvent::Added { entry, .. } = event {
                assert!(observer.remove(&entry.id));
            }
        });
        store
            .add(vec![0u8; 4], Duration::from_secs(1), Metadata::new())
            .unwrap();
        assert_eq!(
            *kinds.lock(),
            [BufferEventKind::Add, BufferEventKind::Remove]
        );
        assert_eq!(store.buffer_count(), 0);
    }

    #[test]
    fn test_dispatch_recovers_after_subscriber_panic() {
        let store = make_shared(CacheConfig::default());
        let seen = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&seen);
        let _ = store.on_buffer_event(move |_| {
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                panic!("first event");
            }
        });
        let panicking = store.clone();
        let outcome = thread::spawn(move || {
            panicking.add(vec![0u8; 4], Duration::from_secs(1), Metadata::new())
        })
        .join();
        assert!(outcome.is_err());
        assert_eq!(store.buffer_count(), 1);

        store.clear();
        assert_eq!(seen.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_parallel_adds_keep_totals() {
        let store = make_shared(CacheConfig {
            max_buffers: 1000,
            ..CacheConfig::default()
        });
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let store = store.clone();
                thread::spawn(move || {
                    for i in 0..50u64 {
                        let id = store
                            .add(vec![0u8; 16], Duration::from_millis(10), Metadata::new())
                            .unwrap();
                        if i % 2 == 0 {
                            assert!(store.remove(&id));
                        }
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(store.buffer_count(), 100);
        assert_eq!(store.current_size(), 1600);
        assert_eq!(store.current_duration(), Duration::from_millis(1000));
    }
}
