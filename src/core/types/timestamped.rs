//! Generic timestamp wrapper.

use serde::{Deserialize, Serialize};

/// Wraps a value with its acquisition time.
///
/// Timestamps are microseconds since epoch. Scans are stamped at the
/// sensor so the transform stack can be asked for the odometry pose that
/// matches the moment of capture, not the moment of processing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Timestamped<T> {
    /// The wrapped data
    pub data: T,
    /// Timestamp in microseconds since epoch
    pub timestamp_us: u64,
}

impl<T> Timestamped<T> {
    /// Create a new timestamped value.
    #[inline]
    pub fn new(data: T, timestamp_us: u64) -> Self {
        Self { data, timestamp_us }
    }

    /// Map the inner data while preserving timestamp.
    #[inline]
    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> Timestamped<U> {
        Timestamped {
            data: f(self.data),
            timestamp_us: self.timestamp_us,
        }
    }
}
