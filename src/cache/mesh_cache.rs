use std::sync::Arc;
use std::time::Duration;

use log::{debug, info, warn};
use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use super::store::ResourceStore;
use super::{CachePriority, CacheStatistics};
use crate::config::{GraphicsConfig, QualityLevel};
use crate::mesh::MeshResource;

/// A cached base mesh together with its resolved LOD variants. The
/// variants live inside the entry so eviction clears them with the base.
#[derive(Clone)]
struct CachedMesh {
    base: Arc<MeshResource>,
    lods: FxHashMap<u32, Arc<MeshResource>>,
}

impl CachedMesh {
    fn size_bytes(&self) -> usize {
        self.base.size_bytes() + self.lods.values().map(|m| m.size_bytes()).sum::<usize>()
    }
}

/// Bounded mesh cache with priority-aware LRU eviction and a per-key LOD
/// variant store.
pub struct MeshCache {
    inner: RwLock<ResourceStore<CachedMesh>>,
}

impl MeshCache {
    pub fn new(config: &GraphicsConfig) -> Self {
        let cache = Self::with_limits(config.cache_memory_threshold, config.max_cache_entries);
        cache
            .inner
            .write()
            .set_threshold_scale(config.quality.cache_scale());
        cache
    }

    pub fn with_limits(threshold_bytes: usize, max_entries: usize) -> Self {
        Self {
            inner: RwLock::new(ResourceStore::new(threshold_bytes, max_entries)),
        }
    }

    /// Override the cleanup age bound (default one hour).
    pub fn set_max_age(&self, max_age: Duration) {
        self.inner.write().set_max_age(max_age);
    }

    /// Fetch a base mesh and refresh its recency.
    pub fn get(&self, key: &str) -> Option<Arc<MeshResource>> {
        self.inner.write().get_with(key, |e| Arc::clone(&e.value.base))
    }

    /// Insert or replace a base mesh. Replacing drops any LOD variants
    /// resolved against the previous mesh.
    pub fn store(&self, key: impl Into<String>, mesh: Arc<MeshResource>, priority: CachePriority) {
        let key = key.into();
        let cached = CachedMesh {
            base: mesh,
            lods: FxHashMap::default(),
        };
        let size = cached.size_bytes();
        let evicted = self.inner.write().insert(key, cached, size, priority);
        if !evicted.is_empty() {
            debug!("mesh store evicted {} entries", evicted.len());
        }
    }

    /// Fetch a resolved LOD variant for a cached base mesh.
    pub fn get_lod(&self, key: &str, level: u32) -> Option<Arc<MeshResource>> {
        self.inner
            .write()
            .get_with(key, |e| e.value.lods.get(&level).cloned())
            .flatten()
    }

    /// Attach a resolved LOD variant to an existing base entry. Requests
    /// for unknown base keys are dropped.
    pub fn store_lod(&self, key: &str, level: u32, mesh: Arc<MeshResource>) {
        let mut inner = self.inner.write();
        let new_size = inner.update_value(key, |cached| {
            cached.lods.insert(level, mesh);
            cached.size_bytes()
        });
        match new_size {
            Some(size) => {
                inner.set_entry_size(key, size);
            }
            None => warn!("LOD variant for unknown cache key '{}' dropped", key),
        }
    }

    /// Explicit removal; clears the entry regardless of priority,
    /// including its LOD variants.
    pub fn remove(&self, key: &str) -> bool {
        self.inner.write().remove(key).is_some()
    }

    pub fn clear(&self) {
        info!("mesh cache cleared");
        self.inner.write().clear();
    }

    /// Run the cleanup passes outside of an insert.
    pub fn cleanup(&self) {
        self.inner.write().cleanup();
    }

    /// Rescale the pressure threshold for a quality tier and re-run
    /// cleanup, instead of clearing outright.
    pub fn optimize_for_quality(&self, quality: QualityLevel) {
        info!(
            "mesh cache re-optimized for {} quality (scale {})",
            quality.name(),
            quality.cache_scale()
        );
        self.inner.write().set_threshold_scale(quality.cache_scale());
    }

    pub fn statistics(&self) -> CacheStatistics {
        let inner = self.inner.read();
        let lod_entries = inner.iter().map(|(_, e)| e.value.lods.len()).sum();
        inner.statistics(lod_entries)
    }

    /// Hit/miss counters since construction.
    pub fn counters(&self) -> (u64, u64) {
        self.inner.read().counters()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_mesh(vertices: usize) -> Arc<MeshResource> {
        let positions = vec![[0.0f32, 0.0, 0.0]; vertices.max(3)];
        let indices = vec![0u32, 1, 2];
        Arc::new(MeshResource::new(positions, None, None, indices))
    }

    #[test]
    fn get_refreshes_recency() {
        let cache = MeshCache::with_limits(usize::MAX, 2);
        cache.store("a", test_mesh(3), CachePriority::Normal);
        cache.store("b", test_mesh(3), CachePriority::Normal);

        // Touch "a" so "b" becomes the eviction candidate.
        assert!(cache.get("a").is_some());
        cache.store("c", test_mesh(3), CachePriority::Normal);

        assert!(cache.get("a").is_some());
        assert!(cache.get("b").is_none());
        assert!(cache.get("c").is_some());
    }

    #[test]
    fn entry_count_bound_holds_after_bulk_store() {
        let cache = MeshCache::with_limits(usize::MAX, 1000);
        for i in 0..1050 {
            cache.store(format!("mesh_{}", i), test_mesh(3), CachePriority::Normal);
        }
        assert!(cache.statistics().entry_count <= 1000);
    }

    #[test]
    fn critical_entries_survive_cleanup() {
        let cache = MeshCache::with_limits(usize::MAX, 4);
        cache.store("keep", test_mesh(3), CachePriority::Critical);
        for i in 0..16 {
            cache.store(format!("m{}", i), test_mesh(3), CachePriority::Low);
        }

        assert!(cache.get("keep").is_some());
        assert!(cache.statistics().entry_count <= 4);
    }

    #[test]
    fn explicit_remove_clears_critical_entries() {
        let cache = MeshCache::with_limits(usize::MAX, 10);
        cache.store("avatar", test_mesh(3), CachePriority::Critical);
        assert!(cache.remove("avatar"));
        assert!(cache.get("avatar").is_none());
    }

    #[test]
    fn byte_pressure_evicts_to_watermark() {
        let mesh = test_mesh(100);
        let unit = mesh.size_bytes();
        // Room for roughly four meshes before pressure.
        let cache = MeshCache::with_limits(unit * 4, 1000);

        for i in 0..8 {
            cache.store(format!("m{}", i), test_mesh(100), CachePriority::Normal);
        }

        let stats = cache.statistics();
        assert!(stats.memory_bytes <= unit * 4);
    }

    #[test]
    fn aged_entries_expire() {
        let cache = MeshCache::with_limits(usize::MAX, 10);
        cache.set_max_age(Duration::from_millis(1));
        cache.store("old", test_mesh(3), CachePriority::Normal);
        cache.store("old_critical", test_mesh(3), CachePriority::Critical);

        std::thread::sleep(Duration::from_millis(5));
        cache.cleanup();

        assert!(cache.get("old").is_none());
        assert!(cache.get("old_critical").is_some());
    }

    #[test]
    fn lod_variants_are_cleared_with_their_base() {
        let cache = MeshCache::with_limits(usize::MAX, 10);
        cache.store("tree", test_mesh(20), CachePriority::Normal);
        cache.store_lod("tree", 1, test_mesh(10));
        cache.store_lod("tree", 2, test_mesh(5));

        assert!(cache.get_lod("tree", 1).is_some());
        assert_eq!(cache.statistics().lod_entry_count, 2);

        cache.remove("tree");
        assert!(cache.get_lod("tree", 1).is_none());
        assert_eq!(cache.statistics().lod_entry_count, 0);
    }

    #[test]
    fn quality_rescale_keeps_entries_a_low_threshold_would_evict() {
        let mesh = test_mesh(100);
        let unit = mesh.size_bytes();
        let cache = MeshCache::with_limits(unit * 8, 1000);

        for i in 0..4 {
            cache.store(format!("m{}", i), test_mesh(100), CachePriority::Normal);
        }
        cache.optimize_for_quality(QualityLevel::Ultra);
        assert_eq!(cache.statistics().entry_count, 4);

        cache.optimize_for_quality(QualityLevel::Low);
        assert!(cache.statistics().memory_bytes <= unit * 4);
    }
}
