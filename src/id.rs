//! Identifier generation.
//!
//! The store asks an [`IdGenerator`] for a fresh [`BufferId`] on every
//! accepted insertion. Returning `None` means the id space is exhausted, which
//! the store treats as a fatal recording failure.

use crate::entry::BufferId;
use uuid::Uuid;

/// Source of buffer identifiers.
pub trait IdGenerator: Send {
    /// Produces the next identifier, or `None` when no more can be issued.
    fn next_id(&mut self) -> Option<BufferId>;
}

impl<F> IdGenerator for F
where
    F: FnMut() -> Option<BufferId> + Send,
{
    fn next_id(&mut self) -> Option<BufferId> {
        self()
    }
}

/// Random version 4 UUIDs. The default generator.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidGenerator;

impl IdGenerator for UuidGenerator {
    fn next_id(&mut self) -> Option<BufferId> {
        Some(BufferId::from(Uuid::new_v4().to_string()))
    }
}

/// Deterministic `prefix-N` identifiers, counting up from zero.
///
/// Issues at most `limit` ids (unbounded by default), which makes id space
/// exhaustion reproducible in tests.
///
/// # Examples
///
/// ```
/// use media_buffer_cache::id::{IdGenerator, SequentialIds};
///
/// let mut ids = SequentialIds::new("seg").with_limit(2);
/// assert_eq!(ids.next_id().unwrap().as_str(), "seg-0");
/// assert_eq!(ids.next_id().unwrap().as_str(), "seg-1");
/// assert!(ids.next_id().is_none());
/// ```
#[derive(Debug, Clone)]
pub struct SequentialIds {
    prefix: String,
    next: u64,
    limit: u64,
}

impl SequentialIds {
    /// Creates a generator producing `prefix-0`, `prefix-1`, ...
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            next: 0,
            limit: u64::MAX,
        }
    }

    /// Caps the number of ids this generator will issue.
    pub fn with_limit(mut self, limit: u64) -> Self {
        self.limit = limit;
        self
    }
}

impl IdGenerator for SequentialIds {
    fn next_id(&mut self) -> Option<BufferId> {
        if self.next >= self.limit {
            return None;
        }
        let id = BufferId::from(format!("{}-{}", self.prefix, self.next));
        self.next += 1;
        Some(id)
    }
}
