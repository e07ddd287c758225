#![doc = include_str!("../README.md")]
//!
//! ---
//!
//! # Code Reference
//!
//! ## Lifecycle of a Buffer
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────────────┐
//! │                                                                          │
//! │   add ──▶ admission ──▶ cleanup (if above high-water) ──▶ record entry   │
//! │              │                                                │          │
//! │           rejected                                        Added event    │
//! │              ▼                                                │          │
//! │         Error event                                           ▼          │
//! │                                  get (touch: last_accessed, access_count)│
//! │                                                               │          │
//! │                          ┌────────────────────────────────────┤          │
//! │                          ▼                                    ▼          │
//! │                   remove (Explicit)                 cleanup (Evicted)    │
//! │                          │                                    │          │
//! │                    Removed event                 Removed ... Threshold   │
//! │                                                                          │
//! └──────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Eviction Strategies
//!
//! | Strategy | Victim first | Tie-breaks |
//! |----------|--------------|------------|
//! | [`EvictionStrategy::Fifo`] | oldest `created_at` | insertion order |
//! | [`EvictionStrategy::Lru`] | oldest `last_accessed` | `created_at`, insertion order |
//! | [`EvictionStrategy::Lfu`] | lowest `access_count` | `last_accessed`, insertion order |
//!
//! ## Watermarks
//!
//! | Dimension | Admission ceiling | High-water (cleanup starts above) | Low-water (stops at) |
//! |-----------|-------------------|-----------------------------------|----------------------|
//! | size | `max_size` | `threshold × max_size` | `min_size` |
//! | duration | `max_duration` | `threshold × max_duration` | `min_duration` |
//! | count | | `⌊threshold × max_buffers⌋` | high-water count |
//!
//! ## Example
//!
//! ```rust
//! use media_buffer_cache::{BufferStore, CacheConfig, EvictionStrategy, Metadata};
//! use std::time::Duration;
//!
//! let config = CacheConfig {
//!     max_buffers: 2,
//!     cleanup_threshold: 1.0,
//!     strategy: EvictionStrategy::Fifo,
//!     ..CacheConfig::default()
//! };
//! let mut store = BufferStore::new(config);
//!
//! let a = store.add(vec![0u8; 10], Duration::from_secs(1), Metadata::new()).unwrap();
//! let b = store.add(vec![0u8; 10], Duration::from_secs(1), Metadata::new()).unwrap();
//! let c = store.add(vec![0u8; 10], Duration::from_secs(1), Metadata::new()).unwrap();
//!
//! // the oldest buffer made room for the third
//! assert!(!store.contains(&a));
//! assert!(store.contains(&b) && store.contains(&c));
//! ```

/// Admission control.
///
/// Decides whether a single buffer may enter the store based on the
/// per-buffer size and duration ceilings.
pub mod admission;

/// Time source used for entry timestamps.
pub mod clock;

/// Store configuration, partial updates and advisory validation.
pub mod config;

/// Buffer identifiers and per-buffer metadata records.
pub mod entry;

/// Error types.
pub mod error;

/// Store events and the subscriber registry.
pub mod event;

/// Identifier generation.
pub mod id;

/// Usage counters.
///
/// Provides the counters a store keeps and the [`CacheMetrics`](metrics::CacheMetrics)
/// reporting trait.
pub mod metrics;

/// Eviction ordering.
///
/// Ranks resident entries from most to least evictable for each
/// [`EvictionStrategy`].
pub mod policy;

/// The buffer store.
pub mod store;

/// Thread-safe store wrapper.
///
/// Available when the `concurrent` feature is enabled.
#[cfg(feature = "concurrent")]
pub mod concurrent;

pub use config::{CacheConfig, ConfigIssue, ConfigUpdate};
pub use entry::{BufferEntry, BufferId, Metadata};
pub use error::BufferError;
pub use event::{BufferEvent, BufferEventKind, RemovalReason, Subscription};
pub use metrics::CacheMetrics;
pub use policy::EvictionStrategy;
pub use store::{BufferStore, BufferStoreBuilder, CleanupReport};

#[cfg(feature = "concurrent")]
pub use concurrent::SharedBufferStore;
