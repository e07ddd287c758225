//! Eviction Policy
//!
//! Orders the resident entries from "most evictable" to "least evictable"
//! according to an [`EvictionStrategy`]. The policy is a pure function of the
//! entry snapshots; all state it needs (timestamps, access counts) lives on the
//! entries themselves.
//!
//! | Strategy | Primary key | Tie-breaker |
//! |----------|-------------|-------------|
//! | FIFO     | `created_at` ascending | `sequence` |
//! | LRU      | `last_accessed` ascending | `created_at`, then `sequence` |
//! | LFU      | `access_count` ascending | `last_accessed`, then `sequence` |
//!
//! The insertion `sequence` is the last tie-breaker of every ordering, so the
//! result is a total order even when the clock does not move between
//! operations.

use crate::entry::BufferEntry;
use core::cmp::Ordering;
use core::convert::Infallible;
use core::fmt;
use core::str::FromStr;
use log::warn;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Selects the victim ordering used by cleanup.
///
/// Parsing is lenient: an unrecognized tag falls back to [`EvictionStrategy::Lru`].
///
/// # Examples
///
/// ```
/// use media_buffer_cache::EvictionStrategy;
///
/// assert_eq!("fifo".parse::<EvictionStrategy>().unwrap(), EvictionStrategy::Fifo);
/// assert_eq!(EvictionStrategy::from_tag("LFU"), EvictionStrategy::Lfu);
/// assert_eq!(EvictionStrategy::from_tag("random"), EvictionStrategy::Lru);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum EvictionStrategy {
    /// Oldest insertion first.
    Fifo,
    /// Least recently read first.
    #[default]
    Lru,
    /// Least frequently read first.
    Lfu,
}

impl EvictionStrategy {
    /// Lowercase tag of the strategy.
    pub fn as_str(self) -> &'static str {
        match self {
            EvictionStrategy::Fifo => "fifo",
            EvictionStrategy::Lru => "lru",
            EvictionStrategy::Lfu => "lfu",
        }
    }

    /// Parses a strategy tag, case-insensitively, falling back to LRU.
    pub fn from_tag(tag: &str) -> Self {
        match tag.trim().to_ascii_lowercase().as_str() {
            "fifo" => EvictionStrategy::Fifo,
            "lru" => EvictionStrategy::Lru,
            "lfu" => EvictionStrategy::Lfu,
            other => {
                warn!("unknown eviction strategy {:?}, falling back to lru", other);
                EvictionStrategy::Lru
            }
        }
    }

    /// Compares two entries; `Less` means `a` is evicted before `b`.
    pub fn compare(self, a: &BufferEntry, b: &BufferEntry) -> Ordering {
        match self {
            EvictionStrategy::Fifo => fifo_order(a, b),
            EvictionStrategy::Lru => lru_order(a, b),
            EvictionStrategy::Lfu => lfu_order(a, b),
        }
    }
}

impl fmt::Display for EvictionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EvictionStrategy {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(EvictionStrategy::from_tag(s))
    }
}

impl Serialize for EvictionStrategy {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for EvictionStrategy {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let tag = String::deserialize(deserializer)?;
        Ok(EvictionStrategy::from_tag(&tag))
    }
}

/// Oldest insertion first.
pub fn fifo_order(a: &BufferEntry, b: &BufferEntry) -> Ordering {
    a.created_at()
        .cmp(&b.created_at())
        .then_with(|| a.sequence().cmp(&b.sequence()))
}

/// Least recently read first, older insertions first on ties.
pub fn lru_order(a: &BufferEntry, b: &BufferEntry) -> Ordering {
    a.last_accessed()
        .cmp(&b.last_accessed())
        .then_with(|| a.created_at().cmp(&b.created_at()))
        .then_with(|| a.sequence().cmp(&b.sequence()))
}

/// Fewest reads first, least recently read first on ties.
pub fn lfu_order(a: &BufferEntry, b: &BufferEntry) -> Ordering {
    a.access_count()
        .cmp(&b.access_count())
        .then_with(|| a.last_accessed().cmp(&b.last_accessed()))
        .then_with(|| a.sequence().cmp(&b.sequence()))
}

/// Returns the entries sorted most evictable first.
pub fn eviction_order<'a, I>(entries: I, strategy: EvictionStrategy) -> Vec<&'a BufferEntry>
where
    I: IntoIterator<Item = &'a BufferEntry>,
{
    let mut ordered: Vec<&BufferEntry> = entries.into_iter().collect();
    ordered.sort_unstable_by(|a, b| strategy.compare(a, b));
    ordered
}
