//! Cache Store Module
//!
//! Main cache engine combining HashMap storage with LRU tracking, heap-driven
//! TTL expiration and the security gate.
//!
//! All state sits behind one mutex. Every public call takes the lock once,
//! so no caller can observe a half-applied update. Maintenance (expiry
//! sweeps, eviction) runs inline in the call that triggers it.

use std::borrow::Borrow;
use std::collections::hash_map::RandomState;
use std::collections::HashMap;
use std::fmt;
use std::hash::{BuildHasher, Hash};
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::cache::expiry::{cleanup_interval, ExpiryHeap};
use crate::cache::policy::{self, CacheConfig, SecurityPolicy};
use crate::cache::security::{Rejection, SecurityGate};
use crate::cache::sizing::{json_estimator, SizeEstimator, FALLBACK_SIZE_BYTES};
use crate::cache::stats::{CacheStats, Counters};
use crate::cache::{CacheEntry, Clock, LruTracker, MetricsSink, SystemClock, TracingSink};
use crate::error::Result;

/// Ghost heap entries tolerated beyond the live entry count before the heap
/// is rebuilt.
const HEAP_COMPACTION_SLACK: usize = 1024;

// == Inner State ==
/// Everything guarded by the cache's critical section.
struct Inner<K, V, S> {
    entries: HashMap<K, CacheEntry<V>, S>,
    lru: LruTracker<K>,
    heap: ExpiryHeap<K>,
    gate: SecurityGate,
    counters: Counters,
    current_bytes: usize,
    next_token: u64,
    last_cleanup_at: Instant,
}

impl<K, V, S> Inner<K, V, S>
where
    K: Hash + Eq + Clone,
    S: BuildHasher,
{
    fn issue_token(&mut self) -> u64 {
        self.next_token += 1;
        self.next_token
    }

    fn bucket_of<Q>(&self, key: &Q) -> u64
    where
        Q: Hash + ?Sized,
    {
        self.entries.hasher().hash_one(key)
    }

    /// Drops an entry and releases its byte and bucket accounting.
    fn remove_entry<Q>(&mut self, key: &Q) -> Option<CacheEntry<V>>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let entry = self.entries.remove(key)?;
        self.lru.remove(entry.lru_slot);
        self.current_bytes -= entry.size_bytes;
        self.gate.release(entry.bucket);
        Some(entry)
    }

    /// Evicts the least recently used entry. Returns false when empty.
    fn evict_lru(&mut self) -> bool {
        let Some(key) = self.lru.evict_oldest() else {
            return false;
        };
        if let Some(entry) = self.entries.remove(&key) {
            self.current_bytes -= entry.size_bytes;
            self.gate.release(entry.bucket);
            debug!(size_bytes = entry.size_bytes, "evicted least recently used entry");
        }
        self.counters.record_eviction();
        true
    }

    /// Schedules an expiry check, rebuilding the heap once ghosts pile up.
    fn schedule(&mut self, expires_at: Instant, token: u64, key: K) {
        self.heap.push(expires_at, token, key);

        if self.heap.len() > self.entries.len() * 2 + HEAP_COMPACTION_SLACK {
            let entries = &self.entries;
            self.heap.retain(|scheduled| {
                entries
                    .get(&scheduled.key)
                    .is_some_and(|entry| entry.heap_token == scheduled.token)
            });
            debug!(remaining = self.heap.len(), "compacted expiry heap");
        }
    }

    /// Pops due heap entries and removes the live ones among them.
    ///
    /// Stale entries (token mismatch or key already gone) are discarded
    /// without touching the table.
    fn sweep(&mut self, now: Instant, interval: Option<Duration>, force: bool) -> usize {
        let Some(interval) = interval else {
            return 0;
        };
        if !force && now.saturating_duration_since(self.last_cleanup_at) < interval {
            return 0;
        }

        let mut removed = 0;
        while let Some(due) = self.heap.pop_due(now) {
            let live = self
                .entries
                .get(&due.key)
                .is_some_and(|entry| entry.heap_token == due.token);
            if live {
                self.remove_entry(&due.key);
                removed += 1;
            }
        }
        self.last_cleanup_at = now;

        if removed > 0 {
            debug!(removed, "expiry sweep removed entries");
        }
        removed
    }

    fn clear(&mut self, now: Instant) {
        self.entries.clear();
        self.lru.clear();
        self.heap.clear();
        self.gate.clear();
        self.counters.reset();
        self.current_bytes = 0;
        self.last_cleanup_at = now;
    }
}

// == Cache ==
/// Bounded, TTL-aware LRU cache with size budgets and collision limits.
///
/// `S` hashes keys for the table and also assigns the collision bucket
/// used by the chain limit.
pub struct Cache<K, V, S = RandomState> {
    inner: Mutex<Inner<K, V, S>>,
    name: String,
    max_size: usize,
    ttl: Option<Duration>,
    cleanup_interval: Option<Duration>,
    telemetry: Option<Arc<dyn MetricsSink>>,
    estimator: SizeEstimator<V>,
    clock: Arc<dyn Clock>,
}

impl<K, V> Cache<K, V, RandomState>
where
    K: Hash + Eq + Clone,
    V: Clone + Serialize + 'static,
{
    // == Constructor ==
    /// Creates a cache that sizes values by their JSON encoding.
    pub fn new(config: CacheConfig, policy: SecurityPolicy) -> Result<Self> {
        CacheBuilder::new().config(config).security(policy).build()
    }

    /// Starts a builder with the default estimator, clock and hasher.
    pub fn builder() -> CacheBuilder<K, V, RandomState> {
        CacheBuilder::new()
    }
}

impl<K, V, S> Cache<K, V, S>
where
    K: Hash + Eq + Clone,
    V: Clone,
    S: BuildHasher,
{
    // == Get ==
    /// Retrieves a value by key.
    ///
    /// A hit moves the entry to most-recently-used and restarts its TTL
    /// window. Expired entries are removed on the spot and count as misses.
    pub fn get<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let now = self.clock.now();
        let mut guard = self.inner.lock();
        let inner = &mut *guard;

        let Some(entry) = inner.entries.get_mut(key) else {
            inner.counters.record_miss();
            return None;
        };
        if entry.is_expired(now) {
            inner.remove_entry(key);
            inner.counters.record_miss();
            return None;
        }

        inner.next_token += 1;
        let token = inner.next_token;
        entry.refresh(now, self.ttl, token);
        let slot = entry.lru_slot;
        let expires_at = entry.expires_at;
        let value = entry.value.clone();

        inner.lru.touch(slot);
        if let (Some(expires_at), Some(owned_key)) = (expires_at, inner.lru.key(slot).cloned()) {
            inner.schedule(expires_at, token, owned_key);
        }
        inner.counters.record_hit();
        Some(value)
    }

    // == Set ==
    /// Stores a key-value pair.
    ///
    /// Updating an existing key replaces the value in place and re-touches
    /// it. A new key may evict least-recently-used entries to satisfy the
    /// entry cap and the byte budget. Inserts refused by the security gate
    /// are dropped silently: they bump `rejections` and log a warning.
    pub fn set(&self, key: K, value: V) {
        let size = self.measure(&value);
        let now = self.clock.now();
        let mut inner = self.inner.lock();

        inner.sweep(now, self.cleanup_interval, false);

        if let Err(reason) = inner.gate.check_size(size) {
            self.reject(&mut inner, reason);
            return;
        }

        let token = inner.issue_token();

        // == Update in place ==
        if let Some(entry) = inner.entries.get_mut(&key) {
            let old_size = entry.size_bytes;
            entry.value = value;
            entry.size_bytes = size;
            entry.refresh(now, self.ttl, token);
            let slot = entry.lru_slot;
            let expires_at = entry.expires_at;

            inner.current_bytes = inner.current_bytes - old_size + size;
            inner.lru.touch(slot);
            if let Some(expires_at) = expires_at {
                inner.schedule(expires_at, token, key);
            }

            if inner.gate.overflow(inner.current_bytes, 0) > 0 {
                inner.sweep(now, self.cleanup_interval, true);
            }
            // The updated entry sits at the head, so it is only reached once
            // it is alone, and by then it fits.
            while inner.gate.overflow(inner.current_bytes, 0) > 0 {
                if inner.lru.oldest_slot() == Some(slot) || !inner.evict_lru() {
                    break;
                }
            }
            return;
        }

        // == Insert ==
        let bucket = inner.bucket_of(&key);
        if inner.gate.check_bucket(bucket).is_err() {
            // Expired members hold their bucket slot until swept.
            inner.sweep(now, self.cleanup_interval, true);
        }
        if let Err(reason) = inner.gate.check_bucket(bucket) {
            self.reject(&mut inner, reason);
            return;
        }

        if self.needs_room(&inner, size) {
            inner.sweep(now, self.cleanup_interval, true);
        }
        while self.needs_room(&inner, size) {
            if !inner.evict_lru() {
                break;
            }
        }

        let lru_slot = inner.lru.push_front(key.clone());
        let expires_at = self.ttl.and_then(|ttl| now.checked_add(ttl));
        inner.entries.insert(
            key.clone(),
            CacheEntry {
                value,
                size_bytes: size,
                expires_at,
                bucket,
                heap_token: token,
                lru_slot,
            },
        );
        inner.current_bytes += size;
        inner.gate.occupy(bucket);
        if let Some(expires_at) = expires_at {
            inner.schedule(expires_at, token, key);
        }
    }

    // == Delete ==
    /// Removes an entry by key. Deleting an absent key is a no-op.
    pub fn delete<Q>(&self, key: &Q)
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.inner.lock().remove_entry(key);
    }

    // == Contains ==
    /// Checks for a live entry without touching recency, TTL or counters.
    ///
    /// An entry found expired is removed as a side effect.
    pub fn contains<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let now = self.clock.now();
        let mut inner = self.inner.lock();

        let expired = inner.entries.get(key).map(|entry| entry.is_expired(now));
        match expired {
            Some(false) => true,
            Some(true) => {
                inner.remove_entry(key);
                false
            }
            None => false,
        }
    }

    // == Clear ==
    /// Removes every entry and zeroes every counter.
    pub fn clear(&self) {
        let now = self.clock.now();
        self.inner.lock().clear(now);
        debug!(cache = %self.name, "cache cleared");
    }

    // == Cleanup Expired ==
    /// Sweeps every expired entry now, ignoring the cleanup interval.
    ///
    /// Returns the number of entries removed.
    pub fn cleanup_expired(&self) -> usize {
        self.cleanup_expired_at(self.clock.now(), true)
    }

    /// Sweeps expired entries as of `now`.
    ///
    /// Without `force` the sweep is skipped when the previous one ran less
    /// than [`cleanup_interval`](Self::cleanup_interval) ago.
    pub fn cleanup_expired_at(&self, now: Instant, force: bool) -> usize {
        self.inner.lock().sweep(now, self.cleanup_interval, force)
    }

    // == Stats ==
    /// Returns current cache statistics.
    pub fn get_stats(&self) -> CacheStats {
        let inner = self.inner.lock();
        CacheStats::from_counters(&inner.counters, inner.entries.len(), inner.current_bytes)
    }

    // == Flush Metrics ==
    /// Pushes the current counters to the telemetry sink.
    ///
    /// Does nothing when telemetry is disabled.
    pub fn flush_metrics(&self) {
        let Some(sink) = &self.telemetry else {
            return;
        };
        let stats = self.get_stats();

        let mut extras = Map::new();
        extras.insert("evictions".to_string(), Value::from(stats.evictions));
        extras.insert("rejections".to_string(), Value::from(stats.rejections));
        extras.insert("cache_size".to_string(), Value::from(stats.cache_size));
        extras.insert("current_bytes".to_string(), Value::from(stats.current_bytes));
        extras.insert("hit_rate".to_string(), Value::from(stats.hit_rate));

        sink.record_cache_metrics(&self.name, stats.cache_hits, stats.cache_misses, &extras);
    }

    // == Length ==
    /// Returns the number of entries held, including expired entries that
    /// have not been swept yet.
    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    // == Is Empty ==
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Name reported to the telemetry sink.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Minimum spacing between opportunistic sweeps, None when TTL is off.
    pub fn cleanup_interval(&self) -> Option<Duration> {
        self.cleanup_interval
    }

    fn measure(&self, value: &V) -> usize {
        match (self.estimator)(value) {
            Some(size) => size,
            None => {
                warn!(
                    cache = %self.name,
                    fallback_bytes = FALLBACK_SIZE_BYTES,
                    "size estimation failed, charging fallback size"
                );
                FALLBACK_SIZE_BYTES
            }
        }
    }

    /// Whether inserting `incoming` bytes as a new entry would breach the
    /// entry cap or the byte budget.
    fn needs_room(&self, inner: &Inner<K, V, S>, incoming: usize) -> bool {
        inner.entries.len() >= self.max_size || inner.gate.overflow(inner.current_bytes, incoming) > 0
    }

        fn reject(&self, inner: &mut Inner<K, V, S>, reason: Rejection) {
        inner.counters.record_rejection();
        warn!(cache = %self.name, %reason, "cache insert rejected");
    }
}

impl<K, V, S> fmt::Debug for Cache<K, V, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cache")
            .field("name", &self.name)
            .field("max_size", &self.max_size)
            .field("ttl", &self.ttl)
            .field("cleanup_interval", &self.cleanup_interval)
            .field("telemetry", &self.telemetry.is_some())
            .finish_non_exhaustive()
    }
}

// == Builder ==
/// Assembles a [`Cache`] from its configuration and injected collaborators.
pub struct CacheBuilder<K, V, S = RandomState> {
    config: CacheConfig,
    policy: SecurityPolicy,
    sink: Option<Arc<dyn MetricsSink>>,
    estimator: SizeEstimator<V>,
    clock: Arc<dyn Clock>,
    hasher: S,
    _key: PhantomData<fn() -> K>,
}

impl<K, V> CacheBuilder<K, V, RandomState>
where
    V: Serialize + 'static,
{
    /// Creates a builder that sizes values by their JSON encoding.
    pub fn new() -> Self {
        Self::from_estimator(json_estimator())
    }
}

impl<K, V> Default for CacheBuilder<K, V, RandomState>
where
    V: Serialize + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> CacheBuilder<K, V, RandomState> {
    /// Creates a builder with a custom size estimator.
    pub fn with_estimator<F>(estimator: F) -> Self
    where
        F: Fn(&V) -> Option<usize> + Send + Sync + 'static,
    {
        Self::from_estimator(Arc::new(estimator))
    }

    fn from_estimator(estimator: SizeEstimator<V>) -> Self {
        Self {
            config: CacheConfig::default(),
            policy: SecurityPolicy::default(),
            sink: None,
            estimator,
            clock: Arc::new(SystemClock),
            hasher: RandomState::new(),
            _key: PhantomData,
        }
    }
}

impl<K, V, S> CacheBuilder<K, V, S> {
    pub fn config(mut self, config: CacheConfig) -> Self {
        self.config = config;
        self
    }

    pub fn security(mut self, policy: SecurityPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Injects a telemetry sink. Only used when telemetry is enabled.
    pub fn telemetry(mut self, sink: Arc<dyn MetricsSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Replaces the size estimator.
    pub fn estimator<F>(mut self, estimator: F) -> Self
    where
        F: Fn(&V) -> Option<usize> + Send + Sync + 'static,
    {
        self.estimator = Arc::new(estimator);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Replaces the key hasher.
    pub fn hasher<S2>(self, hasher: S2) -> CacheBuilder<K, V, S2> {
        CacheBuilder {
            config: self.config,
            policy: self.policy,
            sink: self.sink,
            estimator: self.estimator,
            clock: self.clock,
            hasher,
            _key: PhantomData,
        }
    }

    /// Validates the configuration and builds the cache.
    ///
    /// With telemetry enabled and no sink injected, metrics go to
    /// [`TracingSink`].
    pub fn build(self) -> Result<Cache<K, V, S>>
    where
        K: Hash + Eq + Clone,
        S: BuildHasher,
    {
        policy::validate(&self.config, &self.policy)?;

        let ttl = self.config.ttl();
        let cleanup_interval = cleanup_interval(ttl);
        let telemetry = if self.config.enable_telemetry {
            Some(self.sink.unwrap_or_else(|| Arc::new(TracingSink)))
        } else {
            None
        };

        info!(
            cache = %self.config.name,
            max_size = self.config.max_size,
            ttl = ?ttl,
            cleanup_interval = ?cleanup_interval,
            max_total_bytes = ?self.config.max_content_size_bytes,
            max_entry_bytes = ?self.policy.max_content_size,
            max_collision_chain = ?self.policy.max_collision_chain,
            "cache initialized"
        );

        let inner = Inner {
            entries: HashMap::with_hasher(self.hasher),
            lru: LruTracker::new(),
            heap: ExpiryHeap::new(),
            gate: SecurityGate::new(&self.policy, self.config.max_content_size_bytes),
            counters: Counters::new(),
            current_bytes: 0,
            next_token: 0,
            last_cleanup_at: self.clock.now(),
        };

        Ok(Cache {
            inner: Mutex::new(inner),
            name: self.config.name,
            max_size: self.config.max_size,
            ttl,
            cleanup_interval,
            telemetry,
            estimator: self.estimator,
            clock: self.clock,
        })
    }
}
