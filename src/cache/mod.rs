//! Cache Module
//!
//! Provides the tiered (in-memory + persisted) cache with per-class expiry.

mod entry;
mod policy;
mod snapshot;
mod stats;
mod store;
mod tiered;

#[cfg(test)]
mod property_tests;

// Re-export public types
pub use entry::CacheEntry;
pub use policy::{CacheClass, CachePolicy};
pub use snapshot::CacheSnapshot;
pub use stats::CacheStats;
pub use store::{CacheStore, Lookup};
pub use tiered::TieredCache;
