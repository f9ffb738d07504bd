//! Cache Entry Module
//!
//! Defines the structure for individual cache entries with TTL support.

use std::time::{Duration, Instant};

// == Cache Entry ==
/// Represents a single cache entry with value and metadata.
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    /// The stored value
    pub value: V,
    /// Estimated footprint charged against the byte budget
    pub size_bytes: usize,
    /// Expiration deadline, None = no expiration
    pub expires_at: Option<Instant>,
    /// Collision-accounting bucket derived from the key hash
    pub bucket: u64,
    /// Version matched against heap entries; bumped on every refresh
    pub heap_token: u64,
    /// Position in the recency list
    pub lru_slot: usize,
}

impl<V> CacheEntry<V> {
    // == Is Expired ==
    /// Checks if the entry has expired at `now`.
    ///
    /// An entry is expired once `now` reaches its deadline, so a TTL that
    /// has fully elapsed never yields one last read.
    pub fn is_expired(&self, now: Instant) -> bool {
        match self.expires_at {
            Some(expires) => now >= expires,
            None => false,
        }
    }

    // == Refresh ==
    /// Restarts the sliding window from `now` under a new token.
    ///
    /// A deadline past the representable range means the entry never expires.
    pub fn refresh(&mut self, now: Instant, ttl: Option<Duration>, token: u64) {
        self.expires_at = ttl.and_then(|ttl| now.checked_add(ttl));
        self.heap_token = token;
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    fn entry(now: Instant, ttl: Option<Duration>) -> CacheEntry<String> {
        CacheEntry {
            value: "test_value".to_string(),
            size_bytes: 12,
            expires_at: ttl.map(|ttl| now + ttl),
            bucket: 0,
            heap_token: 1,
            lru_slot: 0,
        }
    }

    #[test]
    fn test_entry_no_ttl_never_expires() {
        let now = Instant::now();
        let entry = entry(now, None);

        assert!(!entry.is_expired(now + Duration::from_secs(86_400)));
    }

    #[test]
    fn test_entry_expiration() {
        let now = Instant::now();
        let entry = entry(now, Some(Duration::from_secs(1)));

        assert!(!entry.is_expired(now + Duration::from_millis(999)));
        assert!(entry.is_expired(now + Duration::from_millis(1100)));
    }

    #[test]
    fn test_expiration_boundary_condition() {
        let now = Instant::now();
        let entry = entry(now, Some(Duration::from_secs(1)));

        assert!(
            entry.is_expired(now + Duration::from_secs(1)),
            "Entry should be expired at boundary"
        );
    }

    #[test]
    fn test_refresh_without_ttl_clears_deadline() {
        let now = Instant::now();
        let mut entry = entry(now, Some(Duration::from_secs(1)));

        entry.refresh(now, None, 2);

        assert_eq!(entry.expires_at, None);
        assert!(!entry.is_expired(now + Duration::from_secs(3600)));
    }

    #[test]
    fn test_refresh_slides_window() {
        let now = Instant::now();
        let mut entry = entry(now, Some(Duration::from_secs(1)));

        let later = now + Duration::from_millis(800);
        entry.refresh(later, Some(Duration::from_secs(1)), 2);

        assert_eq!(entry.heap_token, 2);
        assert!(!entry.is_expired(now + Duration::from_millis(1500)));
        assert!(entry.is_expired(later + Duration::from_secs(1)));
    }
}
