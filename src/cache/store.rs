use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::time::{Duration, Instant};

use log::{debug, trace};
use rustc_hash::FxHashMap;

use super::{CacheEntry, CachePriority, CacheStatistics};

/// Default maximum entry age before the cleanup age pass drops it.
const DEFAULT_MAX_AGE: Duration = Duration::from_secs(60 * 60);

/// LRU pass evicts down to this fraction of the pressure threshold.
const WATERMARK_NUM: usize = 3;
const WATERMARK_DEN: usize = 4;

/// Single-owner LRU store; callers serialize access through one lock.
///
/// Eviction order comes from a min-heap of `(access_stamp, key)` pairs
/// with lazy invalidation: stale heap items are skipped when popped, so
/// no pass ever re-sorts the whole map.
pub(crate) struct ResourceStore<T> {
    entries: FxHashMap<String, CacheEntry<T>>,
    lru: BinaryHeap<Reverse<(u64, String)>>,
    total_bytes: usize,
    threshold_bytes: usize,
    base_threshold_bytes: usize,
    max_entries: usize,
    max_age: Duration,
    access_counter: u64,
    hits: u64,
    misses: u64,
}

impl<T> ResourceStore<T> {
    pub fn new(threshold_bytes: usize, max_entries: usize) -> Self {
        Self {
            entries: FxHashMap::default(),
            lru: BinaryHeap::new(),
            total_bytes: 0,
            threshold_bytes,
            base_threshold_bytes: threshold_bytes,
            max_entries,
            max_age: DEFAULT_MAX_AGE,
            access_counter: 0,
            hits: 0,
            misses: 0,
        }
    }

    pub fn set_max_age(&mut self, max_age: Duration) {
        self.max_age = max_age;
    }

    /// Look up an entry, refresh its access stamp, and map it through `f`.
    pub fn get_with<R>(&mut self, key: &str, f: impl FnOnce(&CacheEntry<T>) -> R) -> Option<R> {
        self.access_counter += 1;
        let stamp = self.access_counter;

        match self.entries.get_mut(key) {
            Some(entry) => {
                entry.last_access = stamp;
                self.lru.push(Reverse((stamp, key.to_string())));
                self.hits += 1;
                let result = f(entry);
                self.maintain_heap();
                Some(result)
            }
            None => {
                self.misses += 1;
                None
            }
        }
    }

    /// Mutate an entry's value in place, refreshing its access stamp.
    pub fn update_value<R>(&mut self, key: &str, f: impl FnOnce(&mut T) -> R) -> Option<R> {
        self.access_counter += 1;
        let stamp = self.access_counter;

        let entry = self.entries.get_mut(key)?;
        entry.last_access = stamp;
        let result = f(&mut entry.value);
        self.lru.push(Reverse((stamp, key.to_string())));
        self.maintain_heap();
        Some(result)
    }

    /// Re-account an entry's byte footprint after its value changed.
    /// Returns any keys evicted by the pressure check this triggers.
    pub fn set_entry_size(&mut self, key: &str, new_size: usize) -> Vec<String> {
        if let Some(entry) = self.entries.get_mut(key) {
            self.total_bytes = self.total_bytes - entry.size_bytes + new_size;
            entry.size_bytes = new_size;
            if self.over_pressure() {
                return self.cleanup();
            }
        }
        Vec::new()
    }

    /// Insert or replace an entry. Returns keys evicted by the pressure
    /// check this insert triggered.
    pub fn insert(
        &mut self,
        key: String,
        value: T,
        size_bytes: usize,
        priority: CachePriority,
    ) -> Vec<String> {
        self.access_counter += 1;
        let stamp = self.access_counter;

        let entry = CacheEntry {
            value,
            size_bytes,
            created: Instant::now(),
            last_access: stamp,
            priority,
        };
        if let Some(old) = self.entries.insert(key.clone(), entry) {
            self.total_bytes -= old.size_bytes;
        }
        self.total_bytes += size_bytes;
        self.lru.push(Reverse((stamp, key)));
        self.maintain_heap();

        if self.over_pressure() {
            self.cleanup()
        } else {
            Vec::new()
        }
    }

    pub fn remove(&mut self, key: &str) -> Option<CacheEntry<T>> {
        let entry = self.entries.remove(key)?;
        self.total_bytes -= entry.size_bytes;
        Some(entry)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.lru.clear();
        self.total_bytes = 0;
    }

    /// Rescale the pressure threshold and re-run cleanup.
    pub fn set_threshold_scale(&mut self, scale: f32) -> Vec<String> {
        self.threshold_bytes = (self.base_threshold_bytes as f32 * scale) as usize;
        self.cleanup()
    }

    /// Cleanup passes: drop aged non-critical entries, then evict LRU
    /// entries down to the pressure watermark, then enforce the entry
    /// count bound.
    pub fn cleanup(&mut self) -> Vec<String> {
        let mut evicted = Vec::new();

        let expired: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, e)| {
                e.priority != CachePriority::Critical && e.created.elapsed() > self.max_age
            })
            .map(|(k, _)| k.clone())
            .collect();
        for key in expired {
            self.remove(&key);
            trace!("cache entry '{}' expired", key);
            evicted.push(key);
        }

        let watermark = self.threshold_bytes / WATERMARK_DEN * WATERMARK_NUM;
        while self.total_bytes > watermark {
            match self.pop_lru() {
                Some(key) => evicted.push(key),
                None => break,
            }
        }

        while self.entries.len() > self.max_entries {
            match self.pop_lru() {
                Some(key) => evicted.push(key),
                None => break,
            }
        }

        if !evicted.is_empty() {
            debug!(
                "cache cleanup evicted {} entries, {} bytes resident",
                evicted.len(),
                self.total_bytes
            );
        }
        evicted
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn total_bytes(&self) -> usize {
        self.total_bytes
    }

    pub fn counters(&self) -> (u64, u64) {
        (self.hits, self.misses)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &CacheEntry<T>)> {
        self.entries.iter()
    }

    pub fn statistics(&self, lod_entry_count: usize) -> CacheStatistics {
        let mut oldest: Option<Duration> = None;
        let mut newest: Option<Duration> = None;
        for entry in self.entries.values() {
            let age = entry.created.elapsed();
            oldest = Some(oldest.map_or(age, |o| o.max(age)));
            newest = Some(newest.map_or(age, |n| n.min(age)));
        }

        CacheStatistics {
            entry_count: self.entries.len(),
            memory_bytes: self.total_bytes,
            lod_entry_count,
            oldest_entry_age: oldest,
            newest_entry_age: newest,
        }
    }

    fn over_pressure(&self) -> bool {
        self.total_bytes > self.threshold_bytes || self.entries.len() > self.max_entries
    }

    /// Evict the least-recently-used non-critical entry, skipping stale
    /// heap items. Returns the evicted key, or None when only critical
    /// entries remain.
    fn pop_lru(&mut self) -> Option<String> {
        while let Some(Reverse((stamp, key))) = self.lru.pop() {
            let live = matches!(
                self.entries.get(&key),
                Some(e) if e.last_access == stamp && e.priority != CachePriority::Critical
            );
            if live {
                self.remove(&key);
                trace!("evicted LRU cache entry '{}'", key);
                return Some(key);
            }
        }
        None
    }

    /// Rebuild the heap when stale items dominate it.
    fn maintain_heap(&mut self) {
        if self.lru.len() > self.entries.len() * 2 + 64 {
            self.lru = self
                .entries
                .iter()
                .map(|(k, e)| Reverse((e.last_access, k.clone())))
                .collect();
        }
    }
}
