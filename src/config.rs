//! Cache Configuration Module
//!
//! This module provides [`CacheConfig`], the live configuration of a buffer
//! store, and [`ConfigUpdate`], a partial configuration merged into it by
//! [`BufferStore::configure`](crate::BufferStore::configure).
//!
//! # Design Philosophy
//!
//! `CacheConfig` has all public fields and a `Default`:
//!
//! - **Simple**: override the fields you care about with struct update syntax
//! - **Serializable**: field names follow the camelCase keys used by media
//!   players (`maxSize`, `cleanupThreshold`, ...), durations are seconds
//! - **Unvalidated**: any combination is accepted; [`CacheConfig::validate`]
//!   reports the combinations that make cleanup ineffective
//!
//! # Watermarks
//!
//! ```text
//!   0 ──── min_size ──── threshold × max_size ──── max_size
//!          low-water        high-water               admission ceiling
//! ```
//!
//! Cleanup starts once a total crosses its high-water mark and evicts until
//! the totals are back at or below their low-water marks. The same scheme
//! applies to durations; for the entry count the high-water mark is also the
//! target.
//!
//! # Examples
//!
//! ```
//! use media_buffer_cache::config::CacheConfig;
//! use media_buffer_cache::EvictionStrategy;
//! use std::time::Duration;
//!
//! // 2GB of video segments, at most 90s resident
//! let config = CacheConfig {
//!     max_size: 2 * 1024 * 1024 * 1024,
//!     min_size: 128 * 1024 * 1024,
//!     max_duration: Duration::from_secs(90),
//!     min_duration: Duration::from_secs(15),
//!     max_buffers: 200,
//!     cleanup_threshold: 0.8,
//!     strategy: EvictionStrategy::Lru,
//!     ..CacheConfig::default()
//! };
//! assert!(config.validate().is_empty());
//! ```

use crate::policy::EvictionStrategy;
use core::fmt;
use core::time::Duration;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Live configuration of a [`BufferStore`](crate::BufferStore).
///
/// # Fields
///
/// - `max_size` / `min_size`: admission ceiling and eviction low-water mark,
///   in bytes.
/// - `target_duration`: informational playback target, reported through
///   [`BufferStore::target_fill`](crate::BufferStore::target_fill).
/// - `max_duration` / `min_duration`: duration ceiling and low-water mark.
/// - `max_buffers`: ceiling on resident entries.
/// - `auto_cleanup`: when false the store never evicts on its own.
/// - `cleanup_threshold`: high-water fraction of `max_size`, `max_duration`
///   and `max_buffers`, in `(0, 1]`.
/// - `strategy`: victim ordering used by cleanup.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CacheConfig {
    /// Largest admissible payload, and the base of the size high-water mark.
    pub max_size: u64,
    /// Size low-water mark cleanup evicts down to.
    pub min_size: u64,
    /// Desired amount of buffered media. Never enforced.
    #[serde(with = "secs")]
    pub target_duration: Duration,
    /// Longest admissible duration, and the base of the duration high-water mark.
    #[serde(with = "secs")]
    pub max_duration: Duration,
    /// Duration low-water mark cleanup evicts down to.
    #[serde(with = "secs")]
    pub min_duration: Duration,
    /// Ceiling on the number of resident entries.
    pub max_buffers: usize,
    /// Whether the store evicts on its own under pressure.
    pub auto_cleanup: bool,
    /// High-water fraction in `(0, 1]`.
    pub cleanup_threshold: f64,
    /// Victim ordering.
    pub strategy: EvictionStrategy,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_size: 1024 * 1024 * 1024,
            min_size: 64 * 1024 * 1024,
            target_duration: Duration::from_secs(30),
            max_duration: Duration::from_secs(60),
            min_duration: Duration::from_secs(10),
            max_buffers: 100,
            auto_cleanup: true,
            cleanup_threshold: 0.9,
            strategy: EvictionStrategy::Lru,
        }
    }
}

impl CacheConfig {
    /// Size high-water mark in bytes (`cleanup_threshold × max_size`).
    #[inline]
    pub fn size_high_water(&self) -> f64 {
        self.cleanup_threshold * self.max_size as f64
    }

    /// Duration high-water mark in seconds (`cleanup_threshold × max_duration`).
    #[inline]
    pub fn duration_high_water(&self) -> f64 {
        self.cleanup_threshold * self.max_duration.as_secs_f64()
    }

    /// Entry count high-water mark, `floor(cleanup_threshold × max_buffers)`,
    /// never above `max_buffers`.
    #[inline]
    pub fn buffer_high_water(&self) -> usize {
        let scaled = (self.cleanup_threshold * self.max_buffers as f64).floor();
        // `as` saturates and maps NaN to zero
        (scaled as usize).min(self.max_buffers)
    }

    /// True when the given totals sit above any of the high-water marks.
    pub fn exceeds_high_water(&self, size: u64, duration: Duration, count: usize) -> bool {
        size as f64 > self.size_high_water()
            || duration.as_secs_f64() > self.duration_high_water()
            || count > self.buffer_high_water()
    }

    /// True when the given totals sit at or below both low-water marks.
    #[inline]
    pub fn within_low_water(&self, size: u64, duration: Duration) -> bool {
        size <= self.min_size && duration <= self.min_duration
    }

    /// Reports combinations that make cleanup ineffective.
    ///
    /// The store accepts any configuration; this is advisory. An empty
    /// result means the watermarks are ordered as expected.
    pub fn validate(&self) -> Vec<ConfigIssue> {
        let mut issues = Vec::new();
        if !(self.cleanup_threshold > 0.0 && self.cleanup_threshold <= 1.0) {
            issues.push(ConfigIssue::ThresholdOutOfRange(self.cleanup_threshold));
        }
        if self.min_size as f64 > self.size_high_water() {
            issues.push(ConfigIssue::MinSizeAboveHighWater {
                min_size: self.min_size,
                high_water: self.size_high_water(),
            });
        }
        if self.min_duration.as_secs_f64() > self.duration_high_water() {
            issues.push(ConfigIssue::MinDurationAboveHighWater {
                min_duration: self.min_duration,
                high_water_secs: self.duration_high_water(),
            });
        }
        if self.max_buffers == 0 {
            issues.push(ConfigIssue::ZeroMaxBuffers);
        }
        issues
    }
}

impl fmt::Debug for CacheConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheConfig")
            .field("max_size", &self.max_size)
            .field("min_size", &self.min_size)
            .field("target_duration", &self.target_duration)
            .field("max_duration", &self.max_duration)
            .field("min_duration", &self.min_duration)
            .field("max_buffers", &self.max_buffers)
            .field("auto_cleanup", &self.auto_cleanup)
            .field("cleanup_threshold", &self.cleanup_threshold)
            .field("strategy", &self.strategy)
            .finish()
    }
}

/// A configuration combination reported by [`CacheConfig::validate`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigIssue {
    /// `cleanup_threshold` is not in `(0, 1]`.
    #[error("cleanup threshold {0} is outside (0, 1]")]
    ThresholdOutOfRange(f64),

    /// `min_size` sits above the size high-water mark.
    #[error("min size {min_size} is above the size high-water mark {high_water}")]
    MinSizeAboveHighWater {
        /// Configured low-water mark.
        min_size: u64,
        /// Computed high-water mark in bytes.
        high_water: f64,
    },

    /// `min_duration` sits above the duration high-water mark.
    #[error(
        "min duration {:.3}s is above the duration high-water mark {:.3}s",
        .min_duration.as_secs_f64(),
        .high_water_secs
    )]
    MinDurationAboveHighWater {
        /// Configured low-water mark.
        min_duration: Duration,
        /// Computed high-water mark in seconds.
        high_water_secs: f64,
    },

    /// `max_buffers` is zero, so every insertion overflows.
    #[error("max buffers is zero")]
    ZeroMaxBuffers,
}

/// Partial configuration merged into the live [`CacheConfig`].
///
/// Unset fields keep their current value.
///
/// # Examples
///
/// ```
/// use media_buffer_cache::config::{CacheConfig, ConfigUpdate};
/// use media_buffer_cache::EvictionStrategy;
///
/// let mut config = CacheConfig::default();
/// ConfigUpdate::new()
///     .max_buffers(3)
///     .strategy(EvictionStrategy::Fifo)
///     .apply_to(&mut config);
/// assert_eq!(config.max_buffers, 3);
/// assert_eq!(config.strategy, EvictionStrategy::Fifo);
/// assert_eq!(config.max_size, CacheConfig::default().max_size);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ConfigUpdate {
    /// New `max_size`.
    pub max_size: Option<u64>,
    /// New `min_size`.
    pub min_size: Option<u64>,
    /// New `target_duration`.
    #[serde(with = "secs::option")]
    pub target_duration: Option<Duration>,
    /// New `max_duration`.
    #[serde(with = "secs::option")]
    pub max_duration: Option<Duration>,
    /// New `min_duration`.
    #[serde(with = "secs::option")]
    pub min_duration: Option<Duration>,
    /// New `max_buffers`.
    pub max_buffers: Option<usize>,
    /// New `auto_cleanup`.
    pub auto_cleanup: Option<bool>,
    /// New `cleanup_threshold`.
    pub cleanup_threshold: Option<f64>,
    /// New `strategy`.
    pub strategy: Option<EvictionStrategy>,
}

impl ConfigUpdate {
    /// An update that changes nothing.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `max_size`.
    pub fn max_size(mut self, bytes: u64) -> Self {
        self.max_size = Some(bytes);
        self
    }

    /// Sets `min_size`.
    pub fn min_size(mut self, bytes: u64) -> Self {
        self.min_size = Some(bytes);
        self
    }

    /// Sets `target_duration`.
    pub fn target_duration(mut self, duration: Duration) -> Self {
        self.target_duration = Some(duration);
        self
    }

    /// Sets `max_duration`.
    pub fn max_duration(mut self, duration: Duration) -> Self {
        self.max_duration = Some(duration);
        self
    }

    /// Sets `min_duration`.
    pub fn min_duration(mut self, duration: Duration) -> Self {
        self.min_duration = Some(duration);
        self
    }

    /// Sets `max_buffers`.
    pub fn max_buffers(mut self, count: usize) -> Self {
        self.max_buffers = Some(count);
        self
    }

    /// Sets `auto_cleanup`.
    pub fn auto_cleanup(mut self, enabled: bool) -> Self {
        self.auto_cleanup = Some(enabled);
        self
    }

    /// Sets `cleanup_threshold`.
    pub fn cleanup_threshold(mut self, fraction: f64) -> Self {
        self.cleanup_threshold = Some(fraction);
        self
    }

    /// Sets `strategy`.
    pub fn strategy(mut self, strategy: EvictionStrategy) -> Self {
        self.strategy = Some(strategy);
        self
    }

    /// Merges the set fields into `config`.
    pub fn apply_to(self, config: &mut CacheConfig) {
        if let Some(v) = self.max_size {
            config.max_size = v;
        }
        if let Some(v) = self.min_size {
            config.min_size = v;
        }
        if let Some(v) = self.target_duration {
            config.target_duration = v;
        }
        if let Some(v) = self.max_duration {
            config.max_duration = v;
        }
        if let Some(v) = self.min_duration {
            config.min_duration = v;
        }
        if let Some(v) = self.max_buffers {
            config.max_buffers = v;
        }
        if let Some(v) = self.auto_cleanup {
            config.auto_cleanup = v;
        }
        if let Some(v) = self.cleanup_threshold {
            config.cleanup_threshold = v;
        }
        if let Some(v) = self.strategy {
            config.strategy = v;
        }
    }
}

impl From<CacheConfig> for ConfigUpdate {
    fn from(config: CacheConfig) -> Self {
        Self {
            max_size: Some(config.max_size),
            min_size: Some(config.min_size),
            target_duration: Some(config.target_duration),
            max_duration: Some(config.max_duration),
            min_duration: Some(config.min_duration),
            max_buffers: Some(config.max_buffers),
            auto_cleanup: Some(config.auto_cleanup),
            cleanup_threshold: Some(config.cleanup_threshold),
            strategy: Some(config.strategy),
        }
    }
}

/// Durations as fractional seconds.
mod secs {
    use core::time::Duration;
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serializer};

    pub(super) fn serialize<S: Serializer>(
        value: &Duration,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(value.as_secs_f64())
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(D::Error::custom)
    }

    pub(super) mod option {
        use core::time::Duration;
        use serde::de::Error;
        use serde::{Deserialize, Deserializer, Serializer};

        pub(in crate::config) fn serialize<S: Serializer>(
            value: &Option<Duration>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match value {
                Some(d) => serializer.serialize_some(&d.as_secs_f64()),
                None => serializer.serialize_none(),
            }
        }

        pub(in crate::config) fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<Duration>, D::Error> {
            Option::<f64>::deserialize(deserializer)?
                .map(|secs| Duration::try_from_secs_f64(secs).map_err(D::Error::custom))
                .transpose()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = CacheConfig::default();
        assert_eq!(config.max_size, 1024 * 1024 * 1024);
        assert_eq!(config.min_size, 64 * 1024 * 1024);
        assert_eq!(config.target_duration, Duration::from_secs(30));
        assert_eq!(config.max_duration, Duration::from_secs(60));
        assert_eq!(config.min_duration, Duration::from_secs(10));
        assert_eq!(config.max_buffers, 100);
        assert!(config.auto_cleanup);
        assert_eq!(config.cleanup_threshold, 0.9);
        assert_eq!(config.strategy, EvictionStrategy::Lru);
        assert!(config.validate().is_empty());
    }

    #[test]
    fn test_high_water_marks() {
        let config = CacheConfig {
            max_size: 1000,
            max_duration: Duration::from_secs(100),
            max_buffers: 10,
            cleanup_threshold: 0.5,
            ..CacheConfig::default()
        };
        assert_eq!(config.buffer_high_water(), 5);
        assert!(!config.exceeds_high_water(500, Duration::from_secs(50), 5));
        assert!(config.exceeds_high_water(501, Duration::ZERO, 0));
        assert!(config.exceeds_high_water(0, Duration::from_millis(50_001), 0));
        assert!(config.exceeds_high_water(0, Duration::ZERO, 6));
    }

    #[test]
    fn test_buffer_high_water_is_clamped() {
        let config = CacheConfig {
            max_buffers: 4,
            cleanup_threshold: 3.0,
            ..CacheConfig::default()
        };
        assert_eq!(config.buffer_high_water(), 4);
        let nan = CacheConfig {
            cleanup_threshold: f64::NAN,
            ..CacheConfig::default()
        };
        assert_eq!(nan.buffer_high_water(), 0);
    }

    #[test]
    fn test_validate_reports_inverted_watermarks() {
        let config = CacheConfig {
            max_size: 100,
            min_size: 200,
            max_duration: Duration::from_secs(10),
            min_duration: Duration::from_secs(20),
            max_buffers: 0,
            cleanup_threshold: 1.5,
            ..CacheConfig::default()
        };
        let issues = config.validate();
        assert_eq!(issues.len(), 4);
        assert!(matches!(issues[0], ConfigIssue::ThresholdOutOfRange(_)));
        assert!(matches!(issues[1], ConfigIssue::MinSizeAboveHighWater { .. }));
        assert!(matches!(
            issues[2],
            ConfigIssue::MinDurationAboveHighWater { .. }
        ));
        assert_eq!(issues[3], ConfigIssue::ZeroMaxBuffers);
    }

    #[test]
    fn test_update_leaves_unset_fields() {
        let mut config = CacheConfig::default();
        ConfigUpdate::new()
            .min_size(1)
            .auto_cleanup(false)
            .apply_to(&mut config);
        assert_eq!(config.min_size, 1);
        assert!(!config.auto_cleanup);
        assert_eq!(config.max_buffers, 100);
    }

    #[test]
    fn test_config_from_camel_case_json() {
        let json = r#"{
            "maxSize": 2048,
            "minSize": 512,
            "maxDuration": 90,
            "minDuration": 15.5,
            "cleanupThreshold": 0.8,
            "strategy": "lfu"
        }"#;
        let config: CacheConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.max_size, 2048);
        assert_eq!(config.min_size, 512);
        assert_eq!(config.max_duration, Duration::from_secs(90));
        assert_eq!(config.min_duration, Duration::from_millis(15_500));
        assert_eq!(config.cleanup_threshold, 0.8);
        assert_eq!(config.strategy, EvictionStrategy::Lfu);
        // omitted keys keep their defaults
        assert_eq!(config.max_buffers, 100);
        assert_eq!(config.target_duration, Duration::from_secs(30));
    }

    #[test]
    fn test_update_from_json() {
        let update: ConfigUpdate =
            serde_json::from_str(r#"{ "maxBuffers": 3, "targetDuration": 45 }"#).unwrap();
        assert_eq!(update.max_buffers, Some(3));
        assert_eq!(update.target_duration, Some(Duration::from_secs(45)));
        assert_eq!(update.max_size, None);
        assert_eq!(update.min_duration, None);
    }

    #[test]
    fn test_negative_duration_is_rejected() {
        let result: Result<CacheConfig, _> = serde_json::from_str(r#"{ "maxDuration": -1 }"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_config_round_trips_through_update() {
        let config = CacheConfig {
            max_buffers: 7,
            strategy: EvictionStrategy::Fifo,
            ..CacheConfig::default()
        };
        let mut target = CacheConfig::default();
        ConfigUpdate::from(config.clone()).apply_to(&mut target);
        assert_eq!(target, config);
    }
}
