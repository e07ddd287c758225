//! Admission Controller
//!
//! Checks a candidate buffer against the absolute per-item ceilings before the
//! store accepts it. Admission is pure: it never looks at occupancy. Pressure
//! from resident buffers is relieved by cleanup, not by refusing new ones.

use crate::config::CacheConfig;
use crate::error::BufferError;
use core::time::Duration;

/// Accepts or rejects a candidate of `payload_size` bytes lasting `duration`.
///
/// Size is checked before duration, so a candidate violating both reports
/// [`BufferError::SizeExceeded`]. Both limits are inclusive.
///
/// # Examples
///
/// ```
/// use media_buffer_cache::admission::admit;
/// use media_buffer_cache::config::CacheConfig;
/// use media_buffer_cache::BufferError;
/// use std::time::Duration;
///
/// let config = CacheConfig { max_size: 10, ..CacheConfig::default() };
/// assert!(admit(&config, 10, Duration::from_secs(1)).is_ok());
/// assert_eq!(
///     admit(&config, 11, Duration::from_secs(1)),
///     Err(BufferError::SizeExceeded { size: 11, max: 10 })
/// );
/// ```
pub fn admit(
    config: &CacheConfig,
    payload_size: u64,
    duration: Duration,
) -> Result<(), BufferError> {
    if payload_size > config.max_size {
        return Err(BufferError::SizeExceeded {
            size: payload_size,
            max: config.max_size,
        });
    }
    if duration > config.max_duration {
        return Err(BufferError::DurationExceeded {
            duration,
            max: config.max_duration,
        });
    }
    Ok(())
}
