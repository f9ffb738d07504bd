//! Cache Module
//!
//! Provides an in-memory LRU cache with sliding TTL expiration, byte budgets
//! and hash-flooding defenses.

mod clock;
mod entry;
mod expiry;
mod lru;
mod policy;
mod security;
mod sizing;
mod stats;
mod store;
mod telemetry;

#[cfg(test)]
mod property_tests;

// Re-export public types
pub use clock::{Clock, ManualClock, SystemClock};
pub use entry::CacheEntry;
pub use expiry::{
    cleanup_interval, ExpiryHeap, HeapEntry, DEFAULT_CLEANUP_FLOOR, MAX_CLEANUP_INTERVAL,
    MIN_CLEANUP_INTERVAL, SHORT_TTL_THRESHOLD,
};
pub use lru::LruTracker;
pub use policy::{
    validate, CacheConfig, SecurityPolicy, DEFAULT_MAX_COLLISION_CHAIN,
    DEFAULT_MAX_CONTENT_SIZE, DEFAULT_MAX_SIZE,
};
pub use security::{Rejection, SecurityGate};
pub use sizing::{json_estimator, json_size, SizeEstimator, FALLBACK_SIZE_BYTES};
pub use stats::{CacheStats, Counters};
pub use store::{Cache, CacheBuilder};
pub use telemetry::{MetricsSink, TracingSink};

// == Public Constants ==
/// Maximum allowed key length in bytes for the HTTP front-end
pub const MAX_KEY_LENGTH: usize = 256;
