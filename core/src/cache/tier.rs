//! One bytes-bounded LRU tier (hot or warm). Grounded on the teacher's
//! `Parser` cache (`parser/mod.rs`) generalized from a fixed-capacity LRU
//! keyed by path to a byte-budgeted LRU keyed by an opaque string, per spec
//! §4.2 ("hot: ... bytes-bounded. warm: symbol-scoped LRU ... bytes-bounded").

use std::collections::HashSet;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use lru::LruCache;
use parking_lot::ReentrantMutex;
use std::cell::RefCell;

use super::CacheValue;

#[derive(Clone)]
pub struct CacheEntry {
    pub value: CacheValue,
    pub created_at: Instant,
    pub last_access: Instant,
    pub access_count: u64,
    pub size_bytes: u64,
    pub dependencies: HashSet<String>,
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl CacheEntry {
    pub fn new(value: CacheValue, size_bytes: u64, dependencies: HashSet<String>) -> Self {
        let now = Instant::now();
        Self {
            value,
            created_at: now,
            last_access: now,
            access_count: 0,
            size_bytes,
            dependencies,
            metadata: serde_json::Map::new(),
        }
    }

    fn touch(&mut self) {
        self.last_access = Instant::now();
        self.access_count += 1;
    }
}

#[derive(Debug, Clone, Default)]
pub struct TierStats {
    pub entries: usize,
    pub total_bytes: u64,
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
}

struct TierState {
    entries: LruCache<String, CacheEntry>,
    total_bytes: u64,
    hits: u64,
    misses: u64,
    evictions: u64,
}

/// A single cache tier. Internally bounded by a (very large, effectively
/// unused) entry-count cap from the `lru` crate plus an explicit byte
/// budget this type enforces itself, since spec §4.2 bounds tiers in bytes
/// rather than entry count.
pub struct Tier {
    max_bytes: AtomicU64,
    state: ReentrantMutex<RefCell<TierState>>,
}

impl Tier {
    pub fn new(max_bytes: u64) -> Self {
        Self {
            max_bytes: AtomicU64::new(max_bytes),
            state: ReentrantMutex::new(RefCell::new(TierState {
                entries: LruCache::new(NonZeroUsize::new(1_000_000).unwrap()),
                total_bytes: 0,
                hits: 0,
                misses: 0,
                evictions: 0,
            })),
        }
    }

    pub fn max_bytes(&self) -> u64 {
        self.max_bytes.load(Ordering::Relaxed)
    }

    /// Grows or shrinks the tier's byte budget (spec §4.2 adaptive sizing).
    /// Evicts immediately if the new budget is smaller than current usage.
    pub fn set_max_bytes(&self, max_bytes: u64) -> Vec<(String, CacheEntry)> {
        self.max_bytes.store(max_bytes, Ordering::Relaxed);
        self.evict_to_budget(max_bytes)
    }

    /// Reads `key`, promoting its recency and bumping access stats. Returns
    /// a clone of the entry on hit.
    pub fn get(&self, key: &str) -> Option<CacheEntry> {
        let guard = self.state.lock();
        let mut state = guard.borrow_mut();
        match state.entries.get_mut(key) {
            Some(entry) => {
                entry.touch();
                state.hits += 1;
                Some(entry.clone())
            }
            None => {
                state.misses += 1;
                None
            }
        }
    }

    pub fn peek(&self, key: &str) -> Option<CacheEntry> {
        let guard = self.state.lock();
        let state = guard.borrow();
        state.entries.peek(key).cloned()
    }

    pub fn contains(&self, key: &str) -> bool {
        let guard = self.state.lock();
        let state = guard.borrow();
        state.entries.contains(key)
    }

    /// Inserts `entry`, evicting least-recently-used entries until back
    /// under the byte budget. Returns the evicted `(key, entry)` pairs so
    /// the caller (the [`super::CacheManager`]) can demote them into the
    /// next tier down (spec §4.2: "eviction -> demotion").
    pub fn set(&self, key: String, entry: CacheEntry) -> Vec<(String, CacheEntry)> {
        {
            let guard = self.state.lock();
            let mut state = guard.borrow_mut();
            if let Some(old) = state.entries.pop(&key) {
                state.total_bytes = state.total_bytes.saturating_sub(old.size_bytes);
            }
            state.total_bytes += entry.size_bytes;
            state.entries.put(key, entry);
        }
        self.evict_to_budget(self.max_bytes())
    }

    fn evict_to_budget(&self, budget: u64) -> Vec<(String, CacheEntry)> {
        let guard = self.state.lock();
        let mut state = guard.borrow_mut();
        let mut evicted = Vec::new();
        while state.total_bytes > budget {
            match state.entries.pop_lru() {
                Some((key, entry)) => {
                    state.total_bytes = state.total_bytes.saturating_sub(entry.size_bytes);
                    state.evictions += 1;
                    evicted.push((key, entry));
                }
                None => break,
            }
        }
        evicted
    }

    pub fn invalidate(&self, key: &str) -> bool {
        let guard = self.state.lock();
        let mut state = guard.borrow_mut();
        match state.entries.pop(key) {
            Some(entry) => {
                state.total_bytes = state.total_bytes.saturating_sub(entry.size_bytes);
                true
            }
            None => false,
        }
    }

    pub fn clear(&self) {
        let guard = self.state.lock();
        let mut state = guard.borrow_mut();
        state.entries.clear();
        state.total_bytes = 0;
    }

    pub fn keys(&self) -> Vec<String> {
        let guard = self.state.lock();
        let state = guard.borrow();
        state.entries.iter().map(|(k, _)| k.clone()).collect()
    }

    pub fn stats(&self) -> TierStats {
        let guard = self.state.lock();
        let state = guard.borrow();
        TierStats {
            entries: state.entries.len(),
            total_bytes: state.total_bytes,
            hits: state.hits,
            misses: state.misses,
            evictions: state.evictions,
        }
    }

    pub fn hit_rate(&self) -> f64 {
        let stats = self.stats();
        let total = stats.hits + stats.misses;
        if total == 0 {
            0.0
        } else {
            stats.hits as f64 / total as f64
        }
    }
}
