//! Cache Statistics Module
//!
//! Tracks cache effectiveness: fresh hits, misses, stale fallbacks and
//! entries removed by the expiry sweep.

use serde::Serialize;

// == Cache Stats ==
/// Tracks cache performance metrics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Lookups answered by a valid entry
    pub hits: u64,
    /// Lookups that found nothing valid
    pub misses: u64,
    /// Failed fetches answered by an expired entry
    pub stale_fallbacks: u64,
    /// Entries removed by the expiry sweep
    pub swept: u64,
}

impl CacheStats {
    // == Hit Rate ==
    /// Calculates the cache hit rate.
    ///
    /// Returns hits / (hits + misses), or 0.0 if no lookups have been made.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    pub fn record_hit(&mut self) {
        self.hits += 1;
    }

    pub fn record_miss(&mut self) {
        self.misses += 1;
    }

    pub fn record_stale_fallback(&mut self) {
        self.stale_fallbacks += 1;
    }

    pub fn record_swept(&mut self, count: usize) {
        self.swept += count as u64;
    }
}
