//! Fingerprint-keyed result cache.
//!
//! Generic in-memory key to value store with per-entry time-to-live.
//! Repeated renders of the same case text must not re-invoke the
//! model, so the controller consults this cache before running any
//! strategy.
//!
//! Key properties:
//! - Entries expire after their TTL and read as misses
//! - Oldest entry is evicted when the cache is at capacity
//! - `sweep()` drops expired entries in bulk
//! - The cache owns stored values; callers receive clones

use std::collections::HashMap;
use std::hash::Hash;
use std::time::{Duration, Instant};

/// One cached value with its write time and time-to-live.
#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    written_at: Instant,
    ttl: Duration,
}

impl<V> CacheEntry<V> {
    fn expired(&self, now: Instant) -> bool {
        now.duration_since(self.written_at) >= self.ttl
    }
}

/// Generic TTL cache with bounded capacity.
pub struct TtlCache<K, V> {
    entries: HashMap<K, CacheEntry<V>>,
    capacity: usize,
}

impl<K: Eq + Hash + Clone, V: Clone> TtlCache<K, V> {
    /// Create an empty cache holding at most `capacity` entries.
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: HashMap::new(),
            capacity: capacity.max(1),
        }
    }

    /// Store a value under a key. Replaces any existing entry for the
    /// key; evicts the oldest entry when at capacity.
    pub fn insert(&mut self, key: K, value: V, ttl: Duration) {
        if !self.entries.contains_key(&key) && self.entries.len() >= self.capacity {
            self.evict_oldest();
        }
        self.entries.insert(
            key,
            CacheEntry {
                value,
                written_at: Instant::now(),
                ttl,
            },
        );
    }

    /// Look up an unexpired value. An expired entry reads as a miss
    /// and is removed.
    pub fn get(&mut self, key: &K) -> Option<V> {
        let now = Instant::now();
        match self.entries.get(key) {
            Some(entry) if !entry.expired(now) => Some(entry.value.clone()),
            Some(_) => {
                self.entries.remove(key);
                None
            }
            None => None,
        }
    }

    /// Whether an unexpired entry exists, without touching it.
    pub fn contains(&self, key: &K) -> bool {
        let now = Instant::now();
        self.entries
            .get(key)
            .is_some_and(|entry| !entry.expired(now))
    }

    /// Remove an entry outright.
    pub fn remove(&mut self, key: &K) -> bool {
        self.entries.remove(key).is_some()
    }

    /// Drop all expired entries. Returns how many were removed.
    pub fn sweep(&mut self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.expired(now));
        before - self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn evict_oldest(&mut self) {
        let oldest = self
            .entries
            .iter()
            .min_by_key(|(_, entry)| entry.written_at)
            .map(|(key, _)| key.clone());
        if let Some(key) = oldest {
            self.entries.remove(&key);
        }
    }
}

/// Derive the cache key for a case: stable patient identifier plus
/// case-text length, identifying "this case text, roughly, as of now".
pub fn fingerprint(patient_id: &str, case_text: &str) -> String {
    format!("{}:{}", patient_id, case_text.chars().count())
}

// ═══════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════
