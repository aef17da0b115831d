//! Bounded, priority-tiered resource caches.
//!
//! Both caches share the same eviction machinery: entries carry a real
//! byte footprint and an access stamp; cleanup drops aged entries first,
//! then evicts least-recently-used entries down to a pressure watermark.
//! `Critical` entries are exempt from automatic cleanup and only leave
//! through explicit removal.

mod material_cache;
mod mesh_cache;
mod store;

pub use material_cache::MaterialCache;
pub use mesh_cache::MeshCache;

use std::time::{Duration, Instant};

/// Eviction eligibility tier for a cached entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CachePriority {
    Low,
    Normal,
    High,
    /// Never removed by automatic cleanup.
    Critical,
}

/// A cached value with bookkeeping for eviction decisions.
#[derive(Debug, Clone)]
pub struct CacheEntry<T> {
    pub value: T,
    pub size_bytes: usize,
    pub created: Instant,
    /// Monotonic access stamp; higher means more recently used.
    pub last_access: u64,
    pub priority: CachePriority,
}

/// Aggregate cache view for diagnostics and metrics.
#[derive(Debug, Clone, Default)]
pub struct CacheStatistics {
    pub entry_count: usize,
    pub memory_bytes: usize,
    pub lod_entry_count: usize,
    pub oldest_entry_age: Option<Duration>,
    pub newest_entry_age: Option<Duration>,
}
