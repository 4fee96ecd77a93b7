//! Cache Entry Module
//!
//! Defines the timestamped slot held for every cached payload.

use std::time::Duration;

use serde::{Deserialize, Serialize};

// == Cache Entry ==
/// A cached payload plus the Unix millisecond time it was written.
///
/// A `timestamp` of zero marks a slot that has never been populated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry<T> {
    /// The stored payload
    pub data: Option<T>,
    /// Write time (Unix milliseconds), 0 = never populated
    pub timestamp: u64,
}

impl<T> Default for CacheEntry<T> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<T> CacheEntry<T> {
    // == Constructors ==
    /// Creates a never-populated entry.
    pub fn empty() -> Self {
        Self {
            data: None,
            timestamp: 0,
        }
    }

    /// Creates an entry holding `data` written at `timestamp`.
    pub fn new(data: T, timestamp: u64) -> Self {
        Self {
            data: Some(data),
            timestamp,
        }
    }

    // == Is Valid ==
    /// Checks whether the entry may be served without a refresh.
    ///
    /// Boundary condition: an entry whose age equals `max_age` is already
    /// invalid, so a slot is refreshed as soon as its lifetime has fully
    /// elapsed.
    pub fn is_valid(&self, max_age: Duration, now_ms: u64) -> bool {
        self.timestamp != 0 && now_ms.saturating_sub(self.timestamp) < max_age.as_millis() as u64
    }

    /// True once the entry has been written at least once.
    pub fn is_populated(&self) -> bool {
        self.timestamp != 0 && self.data.is_some()
    }
}
