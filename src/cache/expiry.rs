//! Expiry Heap Module
//!
//! Min-heap of expiry deadlines with lazy invalidation.
//!
//! Refreshing an entry never touches the heap in place. The entry bumps its
//! token and a new [`HeapEntry`] is pushed; the old one stays behind as a
//! ghost and is recognized on pop because its token no longer matches.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use std::time::{Duration, Instant};

/// Lower bound on the cleanup interval
pub const MIN_CLEANUP_INTERVAL: Duration = Duration::from_millis(100);

/// Floor applied to the cleanup interval for long TTLs
pub const DEFAULT_CLEANUP_FLOOR: Duration = Duration::from_secs(5);

/// Upper bound on the cleanup interval
pub const MAX_CLEANUP_INTERVAL: Duration = Duration::from_secs(300);

/// TTLs at or below this use the short-TTL schedule
pub const SHORT_TTL_THRESHOLD: Duration = Duration::from_secs(4);

// == Cleanup Interval ==
/// Derives how often the heap sweep may run for a given TTL.
///
/// Returns None when expiry is disabled; lazy per-access checks are then the
/// only enforcement.
pub fn cleanup_interval(ttl: Option<Duration>) -> Option<Duration> {
    let ttl = ttl.filter(|ttl| !ttl.is_zero())?;
    let half = ttl / 2;

    if ttl <= SHORT_TTL_THRESHOLD {
        Some(half.max(MIN_CLEANUP_INTERVAL))
    } else {
        Some(half.clamp(DEFAULT_CLEANUP_FLOOR, MAX_CLEANUP_INTERVAL))
    }
}

// == Heap Entry ==
/// A scheduled expiry check. Never mutated once pushed.
#[derive(Debug, Clone)]
pub struct HeapEntry<K> {
    /// Absolute deadline
    pub expires_at: Instant,
    /// Entry version at push time
    pub token: u64,
    /// Key the deadline belongs to
    pub key: K,
}

// Ordering ignores the key so K only needs to be cloneable.
impl<K> PartialEq for HeapEntry<K> {
    fn eq(&self, other: &Self) -> bool {
        self.expires_at == other.expires_at && self.token == other.token
    }
}

impl<K> Eq for HeapEntry<K> {}

impl<K> PartialOrd for HeapEntry<K> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<K> Ord for HeapEntry<K> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.expires_at
            .cmp(&other.expires_at)
            .then(self.token.cmp(&other.token))
    }
}

// == Expiry Heap ==
/// Min-heap of [`HeapEntry`] ordered by deadline.
#[derive(Debug)]
pub struct ExpiryHeap<K> {
    heap: BinaryHeap<Reverse<HeapEntry<K>>>,
}

impl<K> Default for ExpiryHeap<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K> ExpiryHeap<K> {
    pub fn new() -> Self {
        Self {
            heap: BinaryHeap::new(),
        }
    }

    /// Schedules an expiry check.
    pub fn push(&mut self, expires_at: Instant, token: u64, key: K) {
        self.heap.push(Reverse(HeapEntry {
            expires_at,
            token,
            key,
        }));
    }

    /// Pops the earliest entry if its deadline is at or before `now`.
    ///
    /// Returns None as soon as the minimum lies in the future, so a sweep
    /// never looks past the first live deadline.
    pub fn pop_due(&mut self, now: Instant) -> Option<HeapEntry<K>> {
        match self.heap.peek() {
            Some(Reverse(entry)) if entry.expires_at <= now => {
                self.heap.pop().map(|Reverse(entry)| entry)
            }
            _ => None,
        }
    }

    /// Keeps only the entries for which `keep` returns true.
    pub fn retain<F>(&mut self, mut keep: F)
    where
        F: FnMut(&HeapEntry<K>) -> bool,
    {
        self.heap.retain(|Reverse(entry)| keep(entry));
    }

    /// Number of scheduled checks, ghosts included.
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn clear(&mut self) {
        self.heap.clear();
    }
}
