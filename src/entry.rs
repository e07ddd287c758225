//! Buffer Entry Type
//!
//! This module provides [`BufferEntry`], the metadata record kept for every
//! resident buffer, and [`BufferId`], the opaque identifier the store hands out
//! on insertion. The payload bytes are stored separately by the store; an entry
//! only describes them.
//!
//! # Layout
//!
//! Each entry carries:
//! - `id` - identifier generated by the store
//! - `content_type` - MIME type taken from the caller's metadata
//! - `size` - payload length in bytes
//! - `duration` - declared playable duration
//! - `created_at` / `last_accessed` - monotonic clock timestamps in nanoseconds
//! - `access_count` - successful reads through `get`
//! - `sequence` - store-local insertion counter
//! - `metadata` - opaque caller data
//!
//! Only `last_accessed` and `access_count` change after insertion, and only on
//! a successful read.

use core::fmt;
use core::time::Duration;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

/// Content type assumed when the caller's metadata does not name one.
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Metadata key consulted for the entry's content type.
pub const CONTENT_TYPE_KEY: &str = "type";

/// Opaque caller-supplied key/value data attached to a buffer.
pub type Metadata = serde_json::Map<String, Value>;

/// Opaque identifier of a resident buffer.
///
/// Ids are generated by the store's [`IdGenerator`](crate::id::IdGenerator)
/// and are never reused while the entry they name is alive. Cloning is cheap.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BufferId(Arc<str>);

impl BufferId {
    /// Returns the identifier as a string slice.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for BufferId {
    fn from(value: &str) -> Self {
        BufferId(Arc::from(value))
    }
}

impl From<String> for BufferId {
    fn from(value: String) -> Self {
        BufferId(Arc::from(value))
    }
}

impl AsRef<str> for BufferId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BufferId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for BufferId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("BufferId").field(&&*self.0).finish()
    }
}

/// Metadata record for one resident buffer.
///
/// Entries handed out by the store (`item`, `items`, events) are snapshots;
/// mutating a snapshot has no effect on the store.
///
/// # Examples
///
/// ```
/// use media_buffer_cache::entry::{BufferEntry, BufferId, Metadata};
/// use std::time::Duration;
///
/// let entry = BufferEntry::new(
///     BufferId::from("a"),
///     1024,
///     Duration::from_secs(2),
///     0,
///     7,
///     Metadata::new(),
/// );
/// assert_eq!(entry.size, 1024);
/// assert_eq!(entry.access_count(), 0);
/// assert_eq!(entry.last_accessed(), entry.created_at());
/// assert_eq!(entry.content_type, "application/octet-stream");
/// ```
#[derive(Clone, PartialEq, Serialize)]
pub struct BufferEntry {
    /// Identifier of the buffer.
    pub id: BufferId,

    /// Content type, from the metadata `"type"` key or the octet-stream default.
    pub content_type: String,

    /// Payload length in bytes.
    pub size: u64,

    /// Declared playable duration.
    pub duration: Duration,

    /// Opaque caller data, never interpreted by the store.
    pub metadata: Metadata,

    created_at: u64,
    last_accessed: u64,
    access_count: u64,
    sequence: u64,
}

impl BufferEntry {
    /// Creates a fresh entry stamped with `now`.
    ///
    /// `sequence` is the store-local insertion counter used as the final
    /// tie-breaker when ordering entries for eviction.
    pub fn new(
        id: BufferId,
        size: u64,
        duration: Duration,
        now: u64,
        sequence: u64,
        metadata: Metadata,
    ) -> Self {
        let content_type = metadata
            .get(CONTENT_TYPE_KEY)
            .and_then(Value::as_str)
            .unwrap_or(DEFAULT_CONTENT_TYPE)
            .to_owned();
        Self {
            id,
            content_type,
            size,
            duration,
            metadata,
            created_at: now,
            last_accessed: now,
            access_count: 0,
            sequence,
        }
    }

    /// Records a successful read at `now`.
    #[inline]
    pub(crate) fn touch(&mut self, now: u64) {
        self.last_accessed = now;
        self.access_count = self.access_count.saturating_add(1);
    }

    /// Insertion timestamp in monotonic nanoseconds.
    #[inline]
    pub fn created_at(&self) -> u64 {
        self.created_at
    }

    /// Timestamp of the last successful read, or `created_at` if never read.
    #[inline]
    pub fn last_accessed(&self) -> u64 {
        self.last_accessed
    }

    /// Number of successful reads through `get`.
    #[inline]
    pub fn access_count(&self) -> u64 {
        self.access_count
    }

    /// Store-local insertion counter.
    #[inline]
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Nanoseconds elapsed since insertion, measured against `now`.
    #[inline]
    pub fn age_nanos(&self, now: u64) -> u64 {
        now.saturating_sub(self.created_at)
    }

    /// Nanoseconds elapsed since the last read, measured against `now`.
    #[inline]
    pub fn idle_nanos(&self, now: u64) -> u64 {
        now.saturating_sub(self.last_accessed)
    }
}

impl fmt::Debug for BufferEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BufferEntry")
            .field("id", &self.id)
            .field("content_type", &self.content_type)
            .field("size", &self.size)
            .field("duration", &self.duration)
            .field("created_at", &self.created_at)
            .field("last_accessed", &self.last_accessed)
            .field("access_count", &self.access_count)
            .field("sequence", &self.sequence)
            .field("metadata", &self.metadata)
            .finish()
    }
}
