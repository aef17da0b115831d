use std::sync::Arc;
use std::time::Duration;

use log::{debug, info};
use parking_lot::RwLock;

use super::store::ResourceStore;
use super::{CachePriority, CacheStatistics};
use crate::config::{GraphicsConfig, QualityLevel};
use crate::material::MaterialResource;

/// Bounded material cache with the same priority-aware LRU policy as the
/// mesh cache. Materials are small; the entry-count bound usually governs.
pub struct MaterialCache {
    inner: RwLock<ResourceStore<Arc<MaterialResource>>>,
}

impl MaterialCache {
    pub fn new(config: &GraphicsConfig) -> Self {
        // Materials are a small fraction of mesh memory.
        Self::with_limits(
            config.cache_memory_threshold / 16,
            config.max_cache_entries,
        )
    }

    pub fn with_limits(threshold_bytes: usize, max_entries: usize) -> Self {
        Self {
            inner: RwLock::new(ResourceStore::new(threshold_bytes, max_entries)),
        }
    }

    pub fn set_max_age(&self, max_age: Duration) {
        self.inner.write().set_max_age(max_age);
    }

    pub fn get(&self, key: &str) -> Option<Arc<MaterialResource>> {
        self.inner.write().get_with(key, |e| Arc::clone(&e.value))
    }

    pub fn store(
        &self,
        key: impl Into<String>,
        material: Arc<MaterialResource>,
        priority: CachePriority,
    ) {
        let size = material.size_bytes();
        let evicted = self.inner.write().insert(key.into(), material, size, priority);
        if !evicted.is_empty() {
            debug!("material store evicted {} entries", evicted.len());
        }
    }

    pub fn remove(&self, key: &str) -> bool {
        self.inner.write().remove(key).is_some()
    }

    pub fn clear(&self) {
        info!("material cache cleared");
        self.inner.write().clear();
    }

    pub fn cleanup(&self) {
        self.inner.write().cleanup();
    }

    pub fn optimize_for_quality(&self, quality: QualityLevel) {
        self.inner.write().set_threshold_scale(quality.cache_scale());
    }

    pub fn statistics(&self) -> CacheStatistics {
        self.inner.read().statistics(0)
    }

    pub fn counters(&self) -> (u64, u64) {
        self.inner.read().counters()
    }
}
