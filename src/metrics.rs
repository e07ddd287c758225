//! Cache Metrics System
//!
//! Counters describing how a buffer store has been used, reported as a
//! `BTreeMap<String, f64>` so the keys always come out in the same order.
//! Deterministic ordering keeps logs and test snapshots stable.

use core::time::Duration;
use std::collections::BTreeMap;

/// Usage counters of one buffer store.
///
/// Counters only grow; the current totals (`cache_size_bytes`,
/// `cache_duration_secs`, `buffer_count`) mirror the store after every
/// operation.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct BufferCacheMetrics {
    /// Calls to `get`.
    pub requests: u64,

    /// Calls to `get` that found the buffer.
    pub cache_hits: u64,

    /// Payload bytes handed out by `get`.
    pub bytes_served_from_cache: u64,

    /// Accepted insertions.
    pub insertions: u64,

    /// Payload bytes accepted by `add`.
    pub bytes_written_to_cache: u64,

    /// Insertions refused by admission control.
    pub rejections: u64,

    /// Entries removed through `remove`.
    pub removals: u64,

    /// Entries removed by cleanup.
    pub evictions: u64,

    /// Bytes reclaimed by cleanup.
    pub bytes_evicted: u64,

    /// Cleanup passes that found the store above its high-water mark.
    pub cleanup_runs: u64,

    /// Calls to `clear`.
    pub clears: u64,

    /// Resident bytes.
    pub cache_size_bytes: u64,

    /// Resident playable duration.
    pub cache_duration: Duration,

    /// Resident entries.
    pub buffer_count: usize,

    /// Configured `max_size`.
    pub max_cache_size_bytes: u64,
}

impl BufferCacheMetrics {
    /// Creates metrics for a store whose admission ceiling is `max_cache_size_bytes`.
    pub fn new(max_cache_size_bytes: u64) -> Self {
        Self {
            max_cache_size_bytes,
            ..Default::default()
        }
    }

    /// Records a `get` that found a buffer of `object_size` bytes.
    pub fn record_hit(&mut self, object_size: u64) {
        self.requests += 1;
        self.cache_hits += 1;
        self.bytes_served_from_cache += object_size;
    }

    /// Records a `get` for an unknown id.
    pub fn record_miss(&mut self) {
        self.requests += 1;
    }

    /// Records an accepted insertion.
    pub fn record_insertion(&mut self, object_size: u64) {
        self.insertions += 1;
        self.bytes_written_to_cache += object_size;
    }

    /// Records an admission rejection.
    pub fn record_rejection(&mut self) {
        self.rejections += 1;
    }

    /// Records an explicit removal.
    pub fn record_removal(&mut self) {
        self.removals += 1;
    }

    /// Records an entry evicted by cleanup.
    pub fn record_eviction(&mut self, evicted_size: u64) {
        self.evictions += 1;
        self.bytes_evicted += evicted_size;
    }

    /// Copies the store's current totals.
    pub fn record_totals(&mut self, size: u64, duration: Duration, count: usize) {
        self.cache_size_bytes = size;
        self.cache_duration = duration;
        self.buffer_count = count;
    }

    /// Fraction of `get` calls that hit, or 0.0 before any request.
    pub fn hit_rate(&self) -> f64 {
        if self.requests > 0 {
            self.cache_hits as f64 / self.requests as f64
        } else {
            0.0
        }
    }

    /// Fraction of `get` calls that missed, or 0.0 before any request.
    pub fn miss_rate(&self) -> f64 {
        if self.requests > 0 {
            (self.requests - self.cache_hits) as f64 / self.requests as f64
        } else {
            0.0
        }
    }

    /// Resident bytes relative to `max_size`, or 0.0 if `max_size` is zero.
    pub fn cache_utilization(&self) -> f64 {
        if self.max_cache_size_bytes > 0 {
            self.cache_size_bytes as f64 / self.max_cache_size_bytes as f64
        } else {
            0.0
        }
    }

    /// All metrics keyed by name, in alphabetical order.
    pub fn to_btreemap(&self) -> BTreeMap<String, f64> {
        let mut metrics = BTreeMap::new();

        // Counters
        metrics.insert("cache_hits".to_string(), self.cache_hits as f64);
        metrics.insert(
            "cache_misses".to_string(),
            (self.requests - self.cache_hits) as f64,
        );
        metrics.insert("requests".to_string(), self.requests as f64);
        metrics.insert("insertions".to_string(), self.insertions as f64);
        metrics.insert("rejections".to_string(), self.rejections as f64);
        metrics.insert("removals".to_string(), self.removals as f64);
        metrics.insert("evictions".to_string(), self.evictions as f64);
        metrics.insert("cleanup_runs".to_string(), self.cleanup_runs as f64);
        metrics.insert("clears".to_string(), self.clears as f64);

        // Rates (0.0 to 1.0)
        metrics.insert("hit_rate".to_string(), self.hit_rate());
        metrics.insert("miss_rate".to_string(), self.miss_rate());

        // Bytes
        metrics.insert(
            "bytes_served_from_cache".to_string(),
            self.bytes_served_from_cache as f64,
        );
        metrics.insert(
            "bytes_written_to_cache".to_string(),
            self.bytes_written_to_cache as f64,
        );
        metrics.insert("bytes_evicted".to_string(), self.bytes_evicted as f64);

        // Current totals
        metrics.insert("cache_size_bytes".to_string(), self.cache_size_bytes as f64);
        metrics.insert(
            "cache_duration_secs".to_string(),
            self.cache_duration.as_secs_f64(),
        );
        metrics.insert("buffer_count".to_string(), self.buffer_count as f64);
        metrics.insert(
            "max_cache_size_bytes".to_string(),
            self.max_cache_size_bytes as f64,
        );
        metrics.insert("cache_utilization".to_string(), self.cache_utilization());

        metrics
    }
}

/// Uniform metrics reporting.
pub trait CacheMetrics {
    /// All metrics as name/value pairs in deterministic order.
    fn metrics(&self) -> BTreeMap<String, f64>;

    /// Name of the active eviction strategy, e.g. `"LRU"`.
    fn algorithm_name(&self) -> &'static str;
}
