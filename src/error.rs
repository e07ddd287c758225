//! Error taxonomy for the buffer store.
//!
//! Admission rejections ([`BufferError::SizeExceeded`] and
//! [`BufferError::DurationExceeded`]) are non-retryable: the caller must shrink
//! or drop the source data. Id generation failures are fatal recording errors.
//!
//! An unknown id on `get` or `remove` is never an error; those operations
//! report absence through `None` / `false`.

use crate::entry::BufferId;
use core::time::Duration;
use thiserror::Error;

/// Errors returned by [`BufferStore`](crate::BufferStore) operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BufferError {
    /// The candidate payload is larger than the configured `max_size`.
    #[error("buffer of {size} bytes exceeds the configured maximum of {max} bytes")]
    SizeExceeded {
        /// Byte length of the rejected payload.
        size: u64,
        /// Configured `max_size` at the time of the check.
        max: u64,
    },

    /// The candidate duration is longer than the configured `max_duration`.
    #[error(
        "buffer duration of {:.3}s exceeds the configured maximum of {:.3}s",
        .duration.as_secs_f64(),
        .max.as_secs_f64()
    )]
    DurationExceeded {
        /// Declared playable duration of the rejected payload.
        duration: Duration,
        /// Configured `max_duration` at the time of the check.
        max: Duration,
    },

    /// The id generator cannot produce any more identifiers.
    #[error("buffer id space exhausted")]
    IdSpaceExhausted,

    /// The id generator produced an identifier that is still in use.
    #[error("generated buffer id {0} collides with a resident buffer")]
    IdCollision(BufferId),
}

impl BufferError {
    /// Returns true for the admission rejections a caller can act on by
    /// shrinking or rejecting its source data.
    ///
    /// # Examples
    ///
    /// ```
    /// use media_buffer_cache::BufferError;
    ///
    /// let err = BufferError::SizeExceeded { size: 11, max: 10 };
    /// assert!(err.is_admission_rejection());
    /// assert!(!BufferError::IdSpaceExhausted.is_admission_rejection());
    /// ```
    pub fn is_admission_rejection(&self) -> bool {
        matches!(
            self,
            BufferError::SizeExceeded { .. } | BufferError::DurationExceeded { .. }
        )
    }

    /// Short machine-readable label. The store tags its rejection and failure
    /// log lines with it.
    pub fn kind(&self) -> &'static str {
        match self {
            BufferError::SizeExceeded { .. } => "size_exceeded",
            BufferError::DurationExceeded { .. } => "duration_exceeded",
            BufferError::IdSpaceExhausted => "id_space_exhausted",
            BufferError::IdCollision(_) => "id_collision",
        }
    }
}
