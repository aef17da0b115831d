//! Pipeline performance tracking.
//!
//! Counters are atomics so any thread may read them; readers get an
//! eventually consistent view and never depend on it for correctness.
//! Latency samples go through a bounded window under a lock, which only
//! the load paths touch.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::cache::CacheStatistics;

/// Latency samples kept for percentile estimates.
const LATENCY_WINDOW: usize = 256;

struct MonitorData {
    cache_hits: AtomicU64,
    cache_misses: AtomicU64,
    loads_completed: AtomicU64,
    loads_failed: AtomicU64,
    fallbacks: AtomicU64,
    peak_memory_bytes: AtomicUsize,
    latencies_us: Mutex<Vec<u64>>,
}

/// Aggregate metrics snapshot republished at 1 Hz and after explicit
/// cache mutations.
#[derive(Debug, Clone, Default)]
pub struct PerformanceReport {
    pub cache_hits: u64,
    pub cache_misses: u64,
    /// Hits over total lookups, in `[0, 1]`.
    pub hit_rate: f64,
    pub loads_completed: u64,
    pub loads_failed: u64,
    pub fallbacks: u64,
    pub average_load_ms: f64,
    pub p50_load_ms: f64,
    pub p95_load_ms: f64,
    pub peak_memory_bytes: usize,
    pub resident_memory_bytes: usize,
    pub cached_meshes: usize,
    pub cached_materials: usize,
    pub uptime: Duration,
}

/// Tracks cache hit rate, load latency, and memory peaks for the mesh
/// pipeline.
#[derive(Clone)]
pub struct PerformanceMonitor {
    data: Arc<MonitorData>,
    latest: Arc<Mutex<PerformanceReport>>,
    start_time: Instant,
}

impl PerformanceMonitor {
    pub fn new() -> Self {
        Self {
            data: Arc::new(MonitorData {
                cache_hits: AtomicU64::new(0),
                cache_misses: AtomicU64::new(0),
                loads_completed: AtomicU64::new(0),
                loads_failed: AtomicU64::new(0),
                fallbacks: AtomicU64::new(0),
                peak_memory_bytes: AtomicUsize::new(0),
                latencies_us: Mutex::new(Vec::with_capacity(LATENCY_WINDOW)),
            }),
            latest: Arc::new(Mutex::new(PerformanceReport::default())),
            start_time: Instant::now(),
        }
    }

    pub fn record_cache_hit(&self) {
        self.data.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cache_miss(&self) {
        self.data.cache_misses.fetch_add(1, Ordering::Relaxed);
    }

    /// Record one finished load or generate operation.
    pub fn record_load(&self, elapsed: Duration, succeeded: bool) {
        if succeeded {
            self.data.loads_completed.fetch_add(1, Ordering::Relaxed);
        } else {
            self.data.loads_failed.fetch_add(1, Ordering::Relaxed);
        }

        let mut window = self.data.latencies_us.lock();
        if window.len() >= LATENCY_WINDOW {
            window.remove(0);
        }
        window.push(elapsed.as_micros() as u64);
    }

    /// Record a procedural substitution for a failed asset load.
    pub fn record_fallback(&self) {
        self.data.fallbacks.fetch_add(1, Ordering::Relaxed);
    }

    /// Track the high-water memory mark across both caches.
    pub fn observe_memory(&self, resident_bytes: usize) {
        self.data
            .peak_memory_bytes
            .fetch_max(resident_bytes, Ordering::Relaxed);
    }

    /// Recompute the published report from current counters and cache
    /// statistics.
    pub fn recompute(&self, meshes: &CacheStatistics, materials: &CacheStatistics) {
        let resident = meshes.memory_bytes + materials.memory_bytes;
        self.observe_memory(resident);

        let hits = self.data.cache_hits.load(Ordering::Relaxed);
        let misses = self.data.cache_misses.load(Ordering::Relaxed);
        let lookups = hits + misses;

        let (average_ms, p50_ms, p95_ms) = {
            let window = self.data.latencies_us.lock();
            if window.is_empty() {
                (0.0, 0.0, 0.0)
            } else {
                let mut sorted = window.clone();
                sorted.sort_unstable();
                let sum: u64 = sorted.iter().sum();
                (
                    sum as f64 / sorted.len() as f64 / 1000.0,
                    percentile(&sorted, 50) as f64 / 1000.0,
                    percentile(&sorted, 95) as f64 / 1000.0,
                )
            }
        };

        let report = PerformanceReport {
            cache_hits: hits,
            cache_misses: misses,
            hit_rate: if lookups > 0 {
                hits as f64 / lookups as f64
            } else {
                0.0
            },
            loads_completed: self.data.loads_completed.load(Ordering::Relaxed),
            loads_failed: self.data.loads_failed.load(Ordering::Relaxed),
            fallbacks: self.data.fallbacks.load(Ordering::Relaxed),
            average_load_ms: average_ms,
            p50_load_ms: p50_ms,
            p95_load_ms: p95_ms,
            peak_memory_bytes: self.data.peak_memory_bytes.load(Ordering::Relaxed),
            resident_memory_bytes: resident,
            cached_meshes: meshes.entry_count,
            cached_materials: materials.entry_count,
            uptime: self.start_time.elapsed(),
        };
        *self.latest.lock() = report;
    }

    /// The most recently published report.
    pub fn latest(&self) -> PerformanceReport {
        self.latest.lock().clone()
    }
}

impl Default for PerformanceMonitor {
    fn default() -> Self {
        Self::new()
    }
}

fn percentile(sorted: &[u64], pct: usize) -> u64 {
    let rank = (sorted.len() * pct).div_ceil(100);
    sorted[rank.saturating_sub(1).min(sorted.len() - 1)]
}
