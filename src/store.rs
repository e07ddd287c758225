//! Buffer Store
//!
//! The store owns every resident payload together with its [`BufferEntry`],
//! keeps the running size and duration totals, and drives admission control
//! and eviction on behalf of its callers.
//!
//! # Operation
//!
//! ```text
//!  add(payload, duration, metadata)
//!    │
//!    ├─▶ admission ──✗──▶ Error event, Err(SizeExceeded | DurationExceeded)
//!    │
//!    ├─▶ above high-water (or no free slot) and auto_cleanup?
//!    │        └─▶ cleanup: evict in policy order down to the low-water marks
//!    │
//!    └─▶ generate id, record entry, update totals, Added event
//! ```
//!
//! Every operation leaves `current_size` equal to the sum of the resident
//! entry sizes and `current_duration` equal to the sum of their durations.
//! Events are delivered only after the operation that produced them has
//! finished, in the order they were produced.
//!
//! # Thread Safety
//!
//! `BufferStore` is not thread-safe; mutating operations take `&mut self`.
//! For shared access use [`SharedBufferStore`](crate::concurrent::SharedBufferStore),
//! which serializes every operation behind one lock.

use crate::admission::admit;
use crate::clock::{Clock, MonotonicClock};
use crate::config::{CacheConfig, ConfigUpdate};
use crate::entry::{BufferEntry, BufferId, Metadata};
use crate::error::BufferError;
use crate::event::{BufferEvent, EventNotifier, RemovalReason, Subscription};
use crate::id::{IdGenerator, UuidGenerator};
use crate::metrics::{BufferCacheMetrics, CacheMetrics};
use crate::policy::{eviction_order, EvictionStrategy};
use bytes::Bytes;
use core::fmt;
use core::mem;
use core::time::Duration;
use log::{debug, error, info, warn};
use std::collections::BTreeMap;
use std::sync::Arc;

#[cfg(feature = "hashbrown")]
use hashbrown::HashMap;

#[cfg(not(feature = "hashbrown"))]
use std::collections::HashMap;

/// A resident buffer: the payload and its metadata record.
struct Slot {
    payload: Bytes,
    entry: BufferEntry,
}

/// Outcome of a cleanup pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanupReport {
    /// False when the store was under its high-water marks and nothing ran.
    pub triggered: bool,
    /// Evicted ids, in eviction order.
    pub evicted: Vec<BufferId>,
    /// Bytes reclaimed.
    pub removed_size: u64,
    /// Duration reclaimed.
    pub removed_duration: Duration,
    /// True when every candidate was evicted before the low-water marks were
    /// reached.
    pub exhausted: bool,
}

/// Bounded store of media buffers with policy-driven eviction.
///
/// # Examples
///
/// ```
/// use media_buffer_cache::{BufferStore, CacheConfig, Metadata};
/// use std::time::Duration;
///
/// let mut store = BufferStore::new(CacheConfig::default());
/// let id = store.add(vec![0u8; 1024], Duration::from_secs(5), Metadata::new()).unwrap();
///
/// assert_eq!(store.current_size(), 1024);
/// assert_eq!(store.current_duration(), Duration::from_secs(5));
/// assert_eq!(store.get(&id).unwrap().len(), 1024);
/// assert_eq!(store.item(&id).unwrap().access_count(), 1);
///
/// assert!(store.remove(&id));
/// assert!(store.get(&id).is_none());
/// ```
pub struct BufferStore {
    config: CacheConfig,
    entries: HashMap<BufferId, Slot>,
    current_size: u64,
    current_duration: Duration,
    next_sequence: u64,
    clock: Arc<dyn Clock>,
    ids: Box<dyn IdGenerator>,
    notifier: EventNotifier,
    pending: Vec<BufferEvent>,
    metrics: BufferCacheMetrics,
}

impl BufferStore {
    /// Creates a store with the system monotonic clock and random UUID ids.
    pub fn new(config: CacheConfig) -> Self {
        Self::builder().config(config).build()
    }

    /// Starts a builder for injecting a clock or id generator.
    pub fn builder() -> BufferStoreBuilder {
        BufferStoreBuilder::default()
    }

    /// Creates a store from explicit parts.
    pub fn with_parts(
        config: CacheConfig,
        clock: Arc<dyn Clock>,
        ids: Box<dyn IdGenerator>,
    ) -> Self {
        for issue in config.validate() {
            warn!("buffer store configuration: {}", issue);
        }
        let metrics = BufferCacheMetrics::new(config.max_size);
        Self {
            config,
            entries: HashMap::new(),
            current_size: 0,
            current_duration: Duration::ZERO,
            next_sequence: 0,
            clock,
            ids,
            notifier: EventNotifier::new(),
            pending: Vec::new(),
            metrics,
        }
    }

    /// Merges `update` into the live configuration.
    ///
    /// If `auto_cleanup` is on and the store now sits above a high-water mark,
    /// a cleanup pass runs before this returns.
    pub fn configure(&mut self, update: ConfigUpdate) {
        self.dispatched(|store| store.apply_configure(update))
    }

    /// Admits and records a buffer, returning its new id.
    ///
    /// # Errors
    ///
    /// - [`BufferError::SizeExceeded`] / [`BufferError::DurationExceeded`]
    ///   when admission fails; nothing is mutated.
    /// - [`BufferError::IdSpaceExhausted`] / [`BufferError::IdCollision`]
    ///   when no fresh id can be generated.
    ///
    /// Every error is also published as a [`BufferEvent::Error`].
    pub fn add(
        &mut self,
        payload: impl Into<Bytes>,
        duration: Duration,
        metadata: Metadata,
    ) -> Result<BufferId, BufferError> {
        let payload = payload.into();
        self.dispatched(|store| store.apply_add(payload, duration, metadata))
    }

    /// Returns the payload and records the read, or `None` for an unknown id.
    ///
    /// The returned [`Bytes`] shares memory with the stored payload.
    pub fn get(&mut self, id: &BufferId) -> Option<Bytes> {
        let now = self.clock.now_nanos();
        match self.entries.get_mut(id) {
            Some(slot) => {
                slot.entry.touch(now);
                self.metrics.record_hit(slot.entry.size);
                Some(slot.payload.clone())
            }
            None => {
                self.metrics.record_miss();
                None
            }
        }
    }

    /// Removes a buffer. Returns false if the id was unknown.
    pub fn remove(&mut self, id: &BufferId) -> bool {
        self.dispatched(|store| store.apply_remove(id))
    }

    /// Drops every buffer and resets the totals.
    pub fn clear(&mut self) {
        self.dispatched(Self::apply_clear)
    }

    /// Evicts down to the low-water marks if a high-water mark is exceeded.
    ///
    /// A no-op, reporting `triggered: false`, when the store is within its
    /// high-water marks.
    pub fn cleanup(&mut self) -> CleanupReport {
        self.dispatched(|store| store.apply_cleanup(0))
    }

    /// Snapshot of a buffer's entry. Does not count as a read.
    pub fn item(&self, id: &BufferId) -> Option<BufferEntry> {
        self.entries.get(id).map(|slot| slot.entry.clone())
    }

    /// Snapshots of every resident entry, oldest insertion first.
    pub fn items(&self) -> Vec<BufferEntry> {
        let mut items: Vec<BufferEntry> =
            self.entries.values().map(|slot| slot.entry.clone()).collect();
        items.sort_unstable_by_key(BufferEntry::sequence);
        items
    }

    /// True if `id` is resident. Does not count as a read.
    pub fn contains(&self, id: &BufferId) -> bool {
        self.entries.contains_key(id)
    }

    /// Sum of resident payload sizes in bytes.
    #[inline]
    pub fn current_size(&self) -> u64 {
        self.current_size
    }

    /// Sum of resident durations.
    #[inline]
    pub fn current_duration(&self) -> Duration {
        self.current_duration
    }

    /// Number of resident buffers.
    #[inline]
    pub fn buffer_count(&self) -> usize {
        self.entries.len()
    }

    /// True when no buffer is resident.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The live configuration.
    #[inline]
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Resident duration relative to `target_duration`; 0.0 if the target is zero.
    pub fn target_fill(&self) -> f64 {
        let target = self.config.target_duration.as_secs_f64();
        if target > 0.0 {
            self.current_duration.as_secs_f64() / target
        } else {
            0.0
        }
    }

    /// True when any total is above its high-water mark.
    pub fn is_over_threshold(&self) -> bool {
        self.over_threshold(0)
    }

    /// Copy of the usage counters.
    pub fn metrics_snapshot(&self) -> BufferCacheMetrics {
        self.metrics.clone()
    }

    /// Subscribes to store events.
    pub fn on_buffer_event<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&BufferEvent) + Send + Sync + 'static,
    {
        self.notifier.subscribe(callback)
    }

    /// The notifier events are published through.
    pub fn notifier(&self) -> &EventNotifier {
        &self.notifier
    }

    /// Runs `op`, then publishes the events it queued.
    fn dispatched<R>(&mut self, op: impl FnOnce(&mut Self) -> R) -> R {
        let result = op(self);
        let events = self.take_events();
        self.notifier.publish_all(events);
        result
    }

    /// Drains the events queued by the `apply_*` operations.
    pub(crate) fn take_events(&mut self) -> Vec<BufferEvent> {
        mem::take(&mut self.pending)
    }

    pub(crate) fn apply_configure(&mut self, update: ConfigUpdate) {
        update.apply_to(&mut self.config);
        for issue in self.config.validate() {
            warn!("buffer store configuration: {}", issue);
        }
        self.metrics.max_cache_size_bytes = self.config.max_size;
        debug!("buffer store reconfigured: {:?}", self.config);

        if self.config.auto_cleanup && self.over_threshold(0) {
            self.apply_cleanup(0);
        }
    }

    pub(crate) fn apply_add(
        &mut self,
        payload: Bytes,
        duration: Duration,
        metadata: Metadata,
    ) -> Result<BufferId, BufferError> {
        let size = payload.len() as u64;
        if let Err(err) = admit(&self.config, size, duration) {
            warn!("buffer rejected ({}): {}", err.kind(), err);
            self.metrics.record_rejection();
            return Err(self.fail(None, err));
        }

        // Make room first; the incoming buffer needs a free slot under max_buffers.
        if self.config.auto_cleanup && self.over_threshold(1) {
            self.apply_cleanup(1);
        }

        let id = match self.ids.next_id() {
            Some(id) => id,
            None => return Err(self.fail(None, BufferError::IdSpaceExhausted)),
        };
        if self.entries.contains_key(&id) {
            return Err(self.fail(Some(id.clone()), BufferError::IdCollision(id)));
        }

        let now = self.clock.now_nanos();
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        let entry = BufferEntry::new(id.clone(), size, duration, now, sequence, metadata);

        self.current_size += size;
        self.current_duration += duration;
        self.entries.insert(
            id.clone(),
            Slot {
                payload,
                entry: entry.clone(),
            },
        );
        self.metrics.record_insertion(size);
        self.sync_totals();
        debug!(
            "buffer {} added: {} bytes, {:?}, {}",
            id, size, duration, entry.content_type
        );
        self.pending.push(BufferEvent::Added {
            entry,
            timestamp: now,
        });

        if !self.config.auto_cleanup && self.over_threshold(0) {
            self.pending.push(BufferEvent::Overflow {
                current_size: self.current_size,
                current_duration: self.current_duration,
                count: self.entries.len(),
                timestamp: now,
            });
        }

        Ok(id)
    }

    pub(crate) fn apply_remove(&mut self, id: &BufferId) -> bool {
        match self.remove_slot(id, RemovalReason::Explicit) {
            Some(_) => {
                self.metrics.record_removal();
                true
            }
            None => false,
        }
    }

    pub(crate) fn apply_clear(&mut self) {
        let cleared_size = self.current_size;
        let cleared_duration = self.current_duration;
        let cleared_count = self.entries.len();

        self.entries.clear();
        self.current_size = 0;
        self.current_duration = Duration::ZERO;
        self.metrics.clears += 1;
        self.sync_totals();

        info!(
            "buffer store cleared: {} buffers, {} bytes, {:?}",
            cleared_count, cleared_size, cleared_duration
        );
        self.pending.push(BufferEvent::Cleared {
            cleared_size,
            cleared_duration,
            cleared_count,
            timestamp: self.clock.now_nanos(),
        });
    }

    /// Evicts in policy order until the low-water marks are met with
    /// `reserve` slots left free under the buffer high-water mark.
    ///
    /// Walks the candidate list at most once, so it terminates even when the
    /// configured watermarks can never be met.
    pub(crate) fn apply_cleanup(&mut self, reserve: usize) -> CleanupReport {
        if !self.over_threshold(reserve) {
            return CleanupReport::default();
        }

        let victims: Vec<BufferId> = eviction_order(
            self.entries.values().map(|slot| &slot.entry),
            self.config.strategy,
        )
        .into_iter()
        .map(|entry| entry.id.clone())
        .collect();

        let mut report = CleanupReport {
            triggered: true,
            ..CleanupReport::default()
        };
        for id in victims {
            if self.targets_met(reserve) {
                break;
            }
            if let Some(entry) = self.remove_slot(&id, RemovalReason::Evicted) {
                self.metrics.record_eviction(entry.size);
                report.removed_size += entry.size;
                report.removed_duration += entry.duration;
                report.evicted.push(id);
            }
        }
        report.exhausted = !self.targets_met(reserve);
        self.metrics.cleanup_runs += 1;

        info!(
            "buffer cleanup ({}): evicted {} buffers, {} bytes, {:?}{}",
            self.config.strategy,
            report.evicted.len(),
            report.removed_size,
            report.removed_duration,
            if report.exhausted {
                ", candidates exhausted"
            } else {
                ""
            }
        );
        self.pending.push(BufferEvent::Threshold {
            removed_size: report.removed_size,
            removed_duration: report.removed_duration,
            removed_count: report.evicted.len(),
            timestamp: self.clock.now_nanos(),
        });
        report
    }

    fn over_threshold(&self, reserve: usize) -> bool {
        self.config.exceeds_high_water(
            self.current_size,
            self.current_duration,
            self.entries.len().saturating_add(reserve),
        )
    }

    fn targets_met(&self, reserve: usize) -> bool {
        self.config
            .within_low_water(self.current_size, self.current_duration)
            && self.entries.len().saturating_add(reserve) <= self.config.buffer_high_water()
    }

    fn remove_slot(&mut self, id: &BufferId, reason: RemovalReason) -> Option<BufferEntry> {
        let slot = self.entries.remove(id)?;
        let entry = slot.entry;
        debug_assert!(self.current_size >= entry.size);
        debug_assert!(self.current_duration >= entry.duration);
        self.current_size = self.current_size.saturating_sub(entry.size);
        self.current_duration = self.current_duration.saturating_sub(entry.duration);
        self.sync_totals();

        debug!("buffer {} {}: {} bytes", id, reason, entry.size);
        self.pending.push(BufferEvent::Removed {
            entry: entry.clone(),
            reason,
            timestamp: self.clock.now_nanos(),
        });
        Some(entry)
    }

    fn sync_totals(&mut self) {
        self.metrics
            .record_totals(self.current_size, self.current_duration, self.entries.len());
    }

    /// Reports a fatal or rejected operation through an `Error` event.
    fn fail(&mut self, item_id: Option<BufferId>, err: BufferError) -> BufferError {
        if !err.is_admission_rejection() {
            error!("buffer store failure ({}): {}", err.kind(), err);
        }
        self.pending.push(BufferEvent::Error {
            item_id,
            error: err.clone(),
            timestamp: self.clock.now_nanos(),
        });
        err
    }
}

impl Default for BufferStore {
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}

impl CacheMetrics for BufferStore {
    fn metrics(&self) -> BTreeMap<String, f64> {
        self.metrics.to_btreemap()
    }

    fn algorithm_name(&self) -> &'static str {
        match self.config.strategy {
            EvictionStrategy::Fifo => "FIFO",
            EvictionStrategy::Lru => "LRU",
            EvictionStrategy::Lfu => "LFU",
        }
    }
}

impl fmt::Debug for BufferStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BufferStore")
            .field("config", &self.config)
            .field("buffers", &self.entries.len())
            .field("current_size", &self.current_size)
            .field("current_duration", &self.current_duration)
            .field("notifier", &self.notifier)
            .finish()
    }
}

/// Builder for [`BufferStore`] with injectable collaborators.
///
/// # Examples
///
/// ```
/// use media_buffer_cache::clock::ManualClock;
/// use media_buffer_cache::id::SequentialIds;
/// use media_buffer_cache::{BufferStore, CacheConfig, Metadata};
/// use std::time::Duration;
///
/// let clock = ManualClock::new(0);
/// let mut store = BufferStore::builder()
///     .config(CacheConfig::default())
///     .clock(clock.clone())
///     .id_generator(SequentialIds::new("seg"))
///     .build();
///
/// let id = store.add(vec![1, 2, 3], Duration::from_secs(1), Metadata::new()).unwrap();
/// assert_eq!(id.as_str(), "seg-0");
/// ```
#[derive(Default)]
pub struct BufferStoreBuilder {
    config: Option<CacheConfig>,
    clock: Option<Arc<dyn Clock>>,
    ids: Option<Box<dyn IdGenerator>>,
}

impl BufferStoreBuilder {
    /// Sets the initial configuration (default: [`CacheConfig::default`]).
    pub fn config(mut self, config: CacheConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Sets the clock (default: [`MonotonicClock`]).
    pub fn clock<C: Clock + 'static>(mut self, clock: C) -> Self {
        self.clock = Some(Arc::new(clock));
        self
    }

    /// Sets the id generator (default: [`UuidGenerator`]).
    pub fn id_generator<G: IdGenerator + 'static>(mut self, ids: G) -> Self {
        self.ids = Some(Box::new(ids));
        self
    }

    /// Builds the store.
    pub fn build(self) -> BufferStore {
        let clock: Arc<dyn Clock> = match self.clock {
            Some(clock) => clock,
            None => Arc::new(MonotonicClock::new()),
        };
        let ids: Box<dyn IdGenerator> = match self.ids {
            Some(ids) => ids,
            None => Box::new(UuidGenerator),
        };
        BufferStore::with_parts(self.config.unwrap_or_default(), clock, ids)
    }
}

impl fmt::Debug for BufferStoreBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BufferStoreBuilder")
            .field("config", &self.config)
            .field("clock", &self.clock.is_some())
            .field("ids", &self.ids.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::event::BufferEventKind;
    use crate::id::SequentialIds;
    use parking_lot::Mutex;

    fn make_store(config: CacheConfig) -> (BufferStore, ManualClock) {
        let clock = ManualClock::new(1);
        let store = BufferStore::builder()
            .config(config)
            .clock(clock.clone())
            .id_generator(SequentialIds::new("b"))
            .build();
        (store, clock)
    }

    fn recorder(store: &BufferStore) -> Arc<Mutex<Vec<BufferEvent>>> {
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        let _ = store.on_buffer_event(move |event| sink.lock().push(event.clone()));
        events
    }

    fn kinds(events: &Mutex<Vec<BufferEvent>>) -> Vec<BufferEventKind> {
        events.lock().iter().map(BufferEvent::kind).collect()
    }

    fn secs(n: u64) -> Duration {
        Duration::from_secs(n)
    }

    fn assert_totals(store: &BufferStore) {
        let items = store.items();
        let size: u64 = items.iter().map(|e| e.size).sum();
        let duration: Duration = items.iter().map(|e| e.duration).sum();
        assert_eq!(store.current_size(), size);
        assert_eq!(store.current_duration(), duration);
        assert_eq!(store.buffer_count(), items.len());
    }

    #[test]
    fn test_add_records_entry() {
        let (mut store, clock) = make_store(CacheConfig::default());
        clock.set(50);
        let mut meta = Metadata::new();
        meta.insert("type".into(), "audio/aac".into());
        let id = store.add(vec![0u8; 10], secs(2), meta).unwrap();

        let entry = store.item(&id).unwrap();
        assert_eq!(entry.size, 10);
        assert_eq!(entry.duration, secs(2));
        assert_eq!(entry.created_at(), 50);
        assert_eq!(entry.last_accessed(), 50);
        assert_eq!(entry.access_count(), 0);
        assert_eq!(entry.content_type, "audio/aac");
        assert_totals(&store);
    }

    #[test]
    fn test_get_updates_access_but_item_does_not() {
        let (mut store, clock) = make_store(CacheConfig::default());
        let id = store.add(vec![7u8; 4], secs(1), Metadata::new()).unwrap();
        clock.set(99);
        let _ = store.item(&id);
        let _ = store.items();
        assert_eq!(store.item(&id).unwrap().access_count(), 0);

        let payload = store.get(&id).unwrap();
        assert_eq!(&payload[..], &[7u8; 4]);
        let entry = store.item(&id).unwrap();
        assert_eq!(entry.access_count(), 1);
        assert_eq!(entry.last_accessed(), 99);
    }

    #[test]
    fn test_get_unknown_is_none() {
        let (mut store, _) = make_store(CacheConfig::default());
        assert!(store.get(&BufferId::from("missing")).is_none());
        assert_eq!(store.metrics_snapshot().requests, 1);
        assert_eq!(store.metrics_snapshot().cache_hits, 0);
    }

    #[test]
    fn test_rejection_mutates_nothing() {
        let (mut store, _) = make_store(CacheConfig {
            max_size: 8,
            ..CacheConfig::default()
        });
        let events = recorder(&store);
        let err = store.add(vec![0u8; 9], secs(1), Metadata::new()).unwrap_err();
        assert_eq!(err, BufferError::SizeExceeded { size: 9, max: 8 });
        assert_eq!(store.buffer_count(), 0);
        assert_eq!(store.current_size(), 0);
        assert_eq!(kinds(&events), [BufferEventKind::Error]);
        assert_eq!(store.metrics_snapshot().rejections, 1);
    }

    #[test]
    fn test_duration_rejection() {
        let (mut store, _) = make_store(CacheConfig::default());
        let err = store.add(vec![0u8; 1], secs(61), Metadata::new()).unwrap_err();
        assert!(matches!(err, BufferError::DurationExceeded { .. }));
        assert!(store.is_empty());
    }

    #[test]
    fn test_id_exhaustion_is_reported() {
        let mut store = BufferStore::builder()
            .id_generator(SequentialIds::new("x").with_limit(1))
            .build();
        let events = recorder(&store);
        store.add(vec![1u8], secs(1), Metadata::new()).unwrap();
        let err = store.add(vec![2u8], secs(1), Metadata::new()).unwrap_err();
        assert_eq!(err, BufferError::IdSpaceExhausted);
        assert_eq!(store.buffer_count(), 1);
        assert_eq!(
            kinds(&events),
            [BufferEventKind::Add, BufferEventKind::Error]
        );
        assert_totals(&store);
    }

    #[test]
    fn test_id_collision_is_reported() {
        let mut store = BufferStore::builder()
            .id_generator(|| Some(BufferId::from("dup")))
            .build();
        store.add(vec![1u8], secs(1), Metadata::new()).unwrap();
        let err = store.add(vec![2u8; 2], secs(1), Metadata::new()).unwrap_err();
        assert_eq!(err, BufferError::IdCollision(BufferId::from("dup")));
        assert_eq!(store.current_size(), 1);
        assert_eq!(store.get(&BufferId::from("dup")).unwrap().len(), 1);
    }

    #[test]
    fn test_remove_is_idempotent() {
        let (mut store, _) = make_store(CacheConfig::default());
        let id = store.add(vec![0u8; 3], secs(1), Metadata::new()).unwrap();
        assert!(store.remove(&id));
        assert!(!store.remove(&id));
        assert!(store.get(&id).is_none());
        assert_totals(&store);
    }

    #[test]
    fn test_clear_reports_cleared_totals() {
        let (mut store, _) = make_store(CacheConfig::default());
        store.add(vec![0u8; 3], secs(1), Metadata::new()).unwrap();
        store.add(vec![0u8; 5], secs(2), Metadata::new()).unwrap();
        let events = recorder(&store);
        store.clear();

        assert_eq!(store.current_size(), 0);
        assert_eq!(store.current_duration(), Duration::ZERO);
        assert_eq!(store.buffer_count(), 0);
        match &events.lock()[..] {
            [BufferEvent::Cleared {
                cleared_size,
                cleared_duration,
                cleared_count,
                ..
            }] => {
                assert_eq!(*cleared_size, 8);
                assert_eq!(*cleared_duration, secs(3));
                assert_eq!(*cleared_count, 2);
            }
            other => panic!("unexpected events: {:?}", other),
        };
    }

    #[test]
    fn test_cleanup_noop_under_threshold() {
        let (mut store, _) = make_store(CacheConfig::default());
        store.add(vec![0u8; 3], secs(1), Metadata::new()).unwrap();
        let events = recorder(&store);
        let report = store.cleanup();
        assert!(!report.triggered);
        assert!(events.lock().is_empty());
    }

    #[test]
    fn test_cleanup_evicts_to_low_water() {
        let (mut store, clock) = make_store(CacheConfig {
            max_size: 100,
            min_size: 30,
            auto_cleanup: false,
            cleanup_threshold: 0.5,
            strategy: EvictionStrategy::Fifo,
            ..CacheConfig::default()
        });
        let mut ids = Vec::new();
        for _ in 0..6 {
            clock.advance(Duration::from_nanos(1));
            ids.push(store.add(vec![0u8; 10], secs(1), Metadata::new()).unwrap());
        }
        assert!(store.is_over_threshold());

        let report = store.cleanup();
        assert!(report.triggered);
        assert!(!report.exhausted);
        assert_eq!(report.evicted, ids[..3].to_vec());
        assert_eq!(report.removed_size, 30);
        assert_eq!(store.current_size(), 30);
        assert_totals(&store);

        // second pass has nothing to do
        assert!(!store.cleanup().triggered);
    }

    #[test]
    fn test_cleanup_can_empty_store() {
        let (mut store, _) = make_store(CacheConfig {
            max_size: 100,
            min_size: 0,
            min_duration: Duration::ZERO,
            auto_cleanup: false,
            cleanup_threshold: 0.1,
            ..CacheConfig::default()
        });
        for _ in 0..3 {
            store.add(vec![0u8; 10], secs(1), Metadata::new()).unwrap();
        }
        let report = store.cleanup();
        assert!(report.triggered);
        assert_eq!(report.evicted.len(), 3);
        assert!(!report.exhausted);
        assert!(store.is_empty());
    }

    #[test]
    fn test_cleanup_exhaustion_is_reported() {
        // with max_buffers = 0 a reserved slot can never fit
        let (mut store, _) = make_store(CacheConfig {
            max_buffers: 0,
            auto_cleanup: false,
            ..CacheConfig::default()
        });
        store.add(vec![0u8; 1], secs(1), Metadata::new()).unwrap();
        store.add(vec![0u8; 1], secs(1), Metadata::new()).unwrap();
        let report = store.apply_cleanup(1);
        assert!(report.triggered);
        assert!(report.exhausted);
        assert!(store.is_empty());
    }

    #[test]
    fn test_overflow_event_without_auto_cleanup() {
        let (mut store, _) = make_store(CacheConfig {
            max_buffers: 1,
            auto_cleanup: false,
            cleanup_threshold: 1.0,
            ..CacheConfig::default()
        });
        let events = recorder(&store);
        store.add(vec![0u8; 1], secs(1), Metadata::new()).unwrap();
        store.add(vec![0u8; 1], secs(1), Metadata::new()).unwrap();
        assert_eq!(store.buffer_count(), 2);
        assert_eq!(
            kinds(&events),
            [
                BufferEventKind::Add,
                BufferEventKind::Add,
                BufferEventKind::Overflow
            ]
        );
    }

    #[test]
    fn test_configure_triggers_cleanup() {
        let (mut store, _) = make_store(CacheConfig {
            min_size: 0,
            min_duration: Duration::ZERO,
            ..CacheConfig::default()
        });
        for _ in 0..4 {
            store.add(vec![0u8; 10], secs(1), Metadata::new()).unwrap();
        }
        let events = recorder(&store);
        store.configure(
            ConfigUpdate::new()
                .max_buffers(2)
                .cleanup_threshold(1.0)
                .min_size(u64::MAX)
                .min_duration(secs(600)),
        );
        assert_eq!(store.buffer_count(), 2);
        assert_eq!(
            kinds(&events),
            [
                BufferEventKind::Remove,
                BufferEventKind::Remove,
                BufferEventKind::Threshold
            ]
        );
        assert_totals(&store);
    }

    #[test]
    fn test_configure_without_auto_cleanup_keeps_entries() {
        let (mut store, _) = make_store(CacheConfig::default());
        for _ in 0..4 {
            store.add(vec![0u8; 10], secs(1), Metadata::new()).unwrap();
        }
        store.configure(ConfigUpdate::new().auto_cleanup(false).max_buffers(1));
        assert_eq!(store.buffer_count(), 4);
        assert!(store.is_over_threshold());
    }

    #[test]
    fn test_events_follow_commit() {
        let (mut store, _) = make_store(CacheConfig::default());
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let _ = store.on_buffer_event(move |event| {
            if let BufferEvent::Added { entry, .. } = event {
                sink.lock().push(entry.size);
            }
        });
        store.add(vec![0u8; 6], secs(1), Metadata::new()).unwrap();
        assert_eq!(*seen.lock(), [6]);
    }

    #[test]
    fn test_target_fill() {
        let (mut store, _) = make_store(CacheConfig {
            target_duration: secs(10),
            ..CacheConfig::default()
        });
        assert_eq!(store.target_fill(), 0.0);
        store.add(vec![0u8; 1], secs(5), Metadata::new()).unwrap();
        assert_eq!(store.target_fill(), 0.5);
    }

    #[test]
    fn test_algorithm_name_follows_strategy() {
        let (mut store, _) = make_store(CacheConfig::default());
        assert_eq!(store.algorithm_name(), "LRU");
        store.configure(ConfigUpdate::new().strategy(EvictionStrategy::Lfu));
        assert_eq!(store.algorithm_name(), "LFU");
        assert_eq!(store.metrics()["buffer_count"], 0.0);
    }
}
