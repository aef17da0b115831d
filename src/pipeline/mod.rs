//! Mesh pipeline orchestrator.
//!
//! `MeshSystem` is the public facade over the loader, caches, LOD
//! machinery, and procedural generators. Requests flow cache -> in-flight
//! table -> loader, and loader failures are replaced with procedural
//! fallbacks: a live scene must never show missing geometry, so asset
//! sourcing errors surface only through logs and metrics. The one error
//! callers can observe from a load is `Cancelled`, raised when an
//! explicit cache clear aborts the shared task mid-flight.

mod inflight;
mod monitor;

pub use monitor::{PerformanceMonitor, PerformanceReport};

use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{info, warn};
use parking_lot::{Mutex, RwLock};
use rustc_hash::FxHasher;
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;

use crate::cache::{CachePriority, CacheStatistics, MaterialCache, MeshCache};
use crate::config::{GraphicsConfig, QualityLevel};
use crate::error::MeshResult;
use crate::formats::AssetLoader;
use crate::lod::{LodLevel, LodManager};
use crate::material::MaterialResource;
use crate::mesh::{BoundingBox, MeshResource};
use crate::procedural::terrain::{self, Heightmap, TerrainFeatures};
use crate::procedural::{HumanoidParams, ProceduralMeshGenerator, ProceduralMeshType};

use inflight::InflightTable;

/// Metrics republish cadence.
const METRICS_INTERVAL: Duration = Duration::from_secs(1);

/// Geometric avatar description consumed by `create_avatar_mesh`. The
/// cosmetic half of an appearance (skin, outfit) belongs to the material
/// and rendering layers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AvatarAppearance {
    /// Standing height in world units.
    pub height: f32,

    /// Shoulder-width multiplier over the standard build.
    pub bulk: f32,
}

impl Default for AvatarAppearance {
    fn default() -> Self {
        Self {
            height: 1.8,
            bulk: 1.0,
        }
    }
}

/// Public facade of the mesh/asset pipeline.
///
/// Explicitly constructed and caller-owned; dropping the system stops its
/// background metrics task.
pub struct MeshSystem {
    config: RwLock<GraphicsConfig>,
    loader: AssetLoader,
    mesh_cache: Arc<MeshCache>,
    material_cache: Arc<MaterialCache>,
    lod_manager: RwLock<LodManager>,
    inflight: InflightTable,
    monitor: PerformanceMonitor,
    metrics_task: Mutex<Option<JoinHandle<()>>>,
}

impl MeshSystem {
    /// Build a system with the default asset loader. Must be called from
    /// within a tokio runtime; the metrics republish task starts here.
    pub fn new(config: GraphicsConfig) -> Arc<Self> {
        Self::with_loader(config, AssetLoader::new())
    }

    pub fn with_loader(config: GraphicsConfig, loader: AssetLoader) -> Arc<Self> {
        let system = Arc::new(Self {
            mesh_cache: Arc::new(MeshCache::new(&config)),
            material_cache: Arc::new(MaterialCache::new(&config)),
            lod_manager: RwLock::new(LodManager::new(config.lod.clone())),
            config: RwLock::new(config),
            loader,
            inflight: InflightTable::new(),
            monitor: PerformanceMonitor::new(),
            metrics_task: Mutex::new(None),
        });

        let weak = Arc::downgrade(&system);
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(METRICS_INTERVAL);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                match weak.upgrade() {
                    Some(system) => system.recompute_metrics(),
                    None => break,
                }
            }
        });
        *system.metrics_task.lock() = Some(handle);
        system
    }

    /// Load a named or URL-identified mesh at the given LOD level.
    ///
    /// Never fails over asset sourcing: a load that cannot be satisfied
    /// resolves to a procedural fallback inferred from the name. `Err` is
    /// only returned when `clear_caches` cancels the load mid-flight.
    pub async fn load_mesh(&self, source: &str, lod_level: u32) -> MeshResult<Arc<MeshResource>> {
        if lod_level == 0 {
            return self.load_base(source).await;
        }

        if let Some(mesh) = self.mesh_cache.get_lod(source, lod_level) {
            self.monitor.record_cache_hit();
            return Ok(mesh);
        }
        self.monitor.record_cache_miss();

        let base = self.load_base(source).await?;
        let generated = self.lod_manager.read().generate_lod(&base, lod_level);
        match generated {
            Ok(mesh) => {
                let mesh = Arc::new(mesh);
                self.mesh_cache.store_lod(source, lod_level, Arc::clone(&mesh));
                Ok(mesh)
            }
            Err(e) => {
                warn!(
                    "lod{} for '{}' unavailable ({}), serving full detail",
                    lod_level, source, e
                );
                Ok(base)
            }
        }
    }

    /// Generate (or fetch the cached) procedural mesh for a shape. The
    /// cache key combines the quality tier with the shape's parameter
    /// hash, so a quality change produces fresh tessellation.
    pub async fn generate_mesh(
        &self,
        mesh_type: &ProceduralMeshType,
    ) -> MeshResult<Arc<MeshResource>> {
        let quality = self.config.read().quality;
        let key = format!("proc:{}:{}", quality.name(), mesh_type.cache_key());

        if let Some(mesh) = self.mesh_cache.get(&key) {
            self.monitor.record_cache_hit();
            return Ok(mesh);
        }
        self.monitor.record_cache_miss();

        let mesh_type = mesh_type.clone();
        let cache = Arc::clone(&self.mesh_cache);
        let monitor = self.monitor.clone();
        let task_key = key.clone();
        self.inflight
            .run(&key, move || async move {
                let started = Instant::now();
                let mesh = Arc::new(ProceduralMeshGenerator::new(quality).generate(&mesh_type));
                monitor.record_load(started.elapsed(), true);
                cache.store(task_key, Arc::clone(&mesh), CachePriority::Normal);
                Ok(mesh)
            })
            .await
    }

    /// Load a mesh and resolve its full LOD chain, caching every level.
    /// A partial chain is a valid result.
    pub async fn load_mesh_with_lod(&self, source: &str) -> MeshResult<Vec<LodLevel>> {
        let base = self.load_base(source).await?;
        let chain = self.lod_manager.read().generate_lod_chain(Arc::clone(&base));
        for level in chain.iter().skip(1) {
            if let Some(mesh) = &level.mesh {
                self.mesh_cache.store_lod(source, level.level, Arc::clone(mesh));
            }
        }
        Ok(chain)
    }

    /// Mesh a heightmap into terrain geometry, cached by sample content.
    pub async fn create_terrain_mesh(
        &self,
        heightmap: &Heightmap,
        features: &TerrainFeatures,
    ) -> Arc<MeshResource> {
        let key = format!("terrain:{:016x}", terrain_content_key(heightmap, features));
        if let Some(mesh) = self.mesh_cache.get(&key) {
            self.monitor.record_cache_hit();
            return mesh;
        }
        self.monitor.record_cache_miss();

        let started = Instant::now();
        let mesh = Arc::new(terrain::mesh_heightmap(heightmap, features.cell_size));
        self.monitor.record_load(started.elapsed(), true);
        self.mesh_cache.store(key, Arc::clone(&mesh), CachePriority::Normal);
        mesh
    }

    /// Build an avatar body mesh. Avatars stay resident until explicitly
    /// removed, so they are stored at `Critical` priority.
    pub async fn create_avatar_mesh(&self, appearance: &AvatarAppearance) -> Arc<MeshResource> {
        let shape = ProceduralMeshType::Humanoid(HumanoidParams {
            height: appearance.height,
            width: 0.5 * appearance.bulk,
        });
        let key = format!("avatar:{}", shape.cache_key());

        if let Some(mesh) = self.mesh_cache.get(&key) {
            self.monitor.record_cache_hit();
            return mesh;
        }
        self.monitor.record_cache_miss();

        let quality = self.config.read().quality;
        let started = Instant::now();
        let mesh = Arc::new(ProceduralMeshGenerator::new(quality).generate(&shape));
        self.monitor.record_load(started.elapsed(), true);
        self.mesh_cache.store(key, Arc::clone(&mesh), CachePriority::Critical);
        mesh
    }

    /// Load a named material, falling back to a deterministic placeholder
    /// when the name resolves to nothing. Material requests never fail.
    pub async fn load_material(&self, name: &str) -> Arc<MaterialResource> {
        if let Some(material) = self.material_cache.get(name) {
            self.monitor.record_cache_hit();
            return material;
        }
        self.monitor.record_cache_miss();

        let material = match tokio::fs::read_to_string(name).await {
            Ok(text) => match serde_json::from_str::<MaterialResource>(&text) {
                Ok(material) => material,
                Err(e) => {
                    warn!("material '{}' is malformed ({}), using fallback", name, e);
                    self.monitor.record_fallback();
                    MaterialResource::fallback(name)
                }
            },
            Err(_) => {
                self.monitor.record_fallback();
                MaterialResource::fallback(name)
            }
        };

        let material = Arc::new(material);
        self.material_cache
            .store(name, Arc::clone(&material), CachePriority::Normal);
        material
    }

    /// Warm the cache for a set of asset names. Failures are absorbed by
    /// the fallback policy; cancellation mid-preload is ignored.
    pub async fn preload(&self, names: &[&str]) {
        info!("preloading {} assets", names.len());
        for name in names {
            let _ = self.load_mesh(name, 0).await;
        }
    }

    /// Pick a LOD index for a viewer distance and mesh bounds.
    pub fn select_lod_level(&self, distance: f32, bounds: &BoundingBox) -> u32 {
        self.lod_manager.read().select_lod_level(distance, bounds)
    }

    /// Switch quality tiers. Caches are re-optimized for the new pressure
    /// threshold rather than cleared, so the scene does not stall.
    pub fn set_quality(&self, quality: QualityLevel) {
        {
            let mut config = self.config.write();
            if config.quality == quality {
                return;
            }
            config.quality = quality;
        }
        info!("mesh pipeline quality set to {}", quality.name());
        self.mesh_cache.optimize_for_quality(quality);
        self.material_cache.optimize_for_quality(quality);
        self.recompute_metrics();
    }

    /// Replace the whole configuration: LOD settings take effect for new
    /// chains, caches re-optimize for the new quality.
    pub fn update_config(&self, config: GraphicsConfig) {
        let quality = config.quality;
        *self.lod_manager.write() = LodManager::new(config.lod.clone());
        *self.config.write() = config;
        self.mesh_cache.optimize_for_quality(quality);
        self.material_cache.optimize_for_quality(quality);
        self.recompute_metrics();
    }

    /// Drop every cached resource and abort in-flight loads. Waiters on
    /// aborted loads observe `Cancelled`.
    pub fn clear_caches(&self) {
        info!("clearing mesh pipeline caches");
        self.inflight.clear();
        self.mesh_cache.clear();
        self.material_cache.clear();
        self.recompute_metrics();
    }

    pub fn mesh_statistics(&self) -> CacheStatistics {
        self.mesh_cache.statistics()
    }

    pub fn material_statistics(&self) -> CacheStatistics {
        self.material_cache.statistics()
    }

    /// The most recently republished metrics snapshot.
    pub fn metrics(&self) -> PerformanceReport {
        self.monitor.latest()
    }

    pub fn quality(&self) -> QualityLevel {
        self.config.read().quality
    }

    fn recompute_metrics(&self) {
        self.monitor
            .recompute(&self.mesh_cache.statistics(), &self.material_cache.statistics());
    }

    /// Full-detail load with cache, dedup, and procedural fallback.
    async fn load_base(&self, source: &str) -> MeshResult<Arc<MeshResource>> {
        if let Some(mesh) = self.mesh_cache.get(source) {
            self.monitor.record_cache_hit();
            return Ok(mesh);
        }
        self.monitor.record_cache_miss();

        let loader = self.loader.clone();
        let quality = self.config.read().quality;
        let cache = Arc::clone(&self.mesh_cache);
        let monitor = self.monitor.clone();
        let source_owned = source.to_string();
        self.inflight
            .run(source, move || async move {
                let started = Instant::now();
                let mesh = match loader.load_mesh(&source_owned, None, 0).await {
                    Ok(mesh) => {
                        monitor.record_load(started.elapsed(), true);
                        Arc::new(mesh)
                    }
                    Err(e) => {
                        monitor.record_load(started.elapsed(), false);
                        let shape = ProceduralMeshType::infer_from_name(&source_owned);
                        warn!(
                            "loading '{}' failed ({}), substituting procedural {}",
                            source_owned,
                            e,
                            shape.name()
                        );
                        monitor.record_fallback();
                        Arc::new(ProceduralMeshGenerator::new(quality).generate(&shape))
                    }
                };
                cache.store(source_owned, Arc::clone(&mesh), CachePriority::Normal);
                Ok(mesh)
            })
            .await
    }
}

impl Drop for MeshSystem {
    fn drop(&mut self) {
        if let Some(handle) = self.metrics_task.lock().take() {
            handle.abort();
        }
    }
}

/// Hash of a heightmap's content plus the meshing parameters.
fn terrain_content_key(heightmap: &Heightmap, features: &TerrainFeatures) -> u64 {
    let mut hasher = FxHasher::default();
    heightmap.size().hash(&mut hasher);
    for z in 0..heightmap.size() {
        for x in 0..heightmap.size() {
            heightmap.sample(x, z).to_bits().hash(&mut hasher);
        }
    }
    features.cell_size.to_bits().hash(&mut hasher);
    hasher.finish()
}
