//! Cache Statistics Module
//!
//! Tracks cache performance metrics including hits, misses, evictions and
//! security rejections.

use serde::Serialize;

// == Counters ==
/// Running counters kept inside the cache's critical section.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Counters {
    /// Number of successful cache retrievals
    pub hits: u64,
    /// Number of failed cache retrievals (key not found or expired)
    pub misses: u64,
    /// Number of live entries evicted under capacity or byte pressure
    pub evictions: u64,
    /// Number of inserts refused by the security gate
    pub rejections: u64,
}

impl Counters {
    // == Constructor ==
    /// Creates a new Counters with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    // == Hit Rate ==
    /// Calculates the cache hit rate.
    ///
    /// Returns hits / (hits + misses), or 0.0 if no requests have been made.
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

    pub fn record_eviction(&mut self) {
        self.evictions += 1;
    }

    pub fn record_rejection(&mut self) {
        self.rejections += 1;
    }

    /// Zeroes every counter.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

// == Cache Stats ==
/// Point-in-time statistics snapshot returned by `get_stats`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheStats {
    /// Current number of live entries
    pub cache_size: usize,
    /// hits / (hits + misses), 0.0 before any access
    pub hit_rate: f64,
    /// Entries evicted under capacity or byte pressure
    pub evictions: u64,
    /// Successful retrievals
    pub cache_hits: u64,
    /// Failed retrievals
    pub cache_misses: u64,
    /// Inserts refused by the security gate
    pub rejections: u64,
    /// Aggregate estimated size of live entries
    pub current_bytes: usize,
}

impl CacheStats {
    /// Builds a snapshot from running counters and current occupancy.
    pub fn from_counters(counters: &Counters, cache_size: usize, current_bytes: usize) -> Self {
        Self {
            cache_size,
            hit_rate: counters.hit_rate(),
            evictions: counters.evictions,
            cache_hits: counters.hits,
            cache_misses: counters.misses,
            rejections: counters.rejections,
            current_bytes,
        }
    }
}
