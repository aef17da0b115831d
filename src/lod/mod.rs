//! Level-of-detail generation and selection.

pub mod simplifier;

use std::sync::Arc;

use log::{debug, warn};

use crate::config::LodSettings;
use crate::error::{MeshError, MeshResult};
use crate::mesh::{BoundingBox, MeshResource};

/// One level in a resolved LOD chain.
#[derive(Debug, Clone)]
pub struct LodLevel {
    pub level: u32,
    pub vertex_count: usize,
    /// Viewer distance up to which this level applies.
    pub distance_threshold: f32,
    pub mesh: Option<Arc<MeshResource>>,
}

/// Builds LOD chains and picks a level from viewer distance.
pub struct LodManager {
    settings: LodSettings,
}

impl LodManager {
    pub fn new(settings: LodSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &LodSettings {
        &self.settings
    }

    /// Generate one reduced level from a base mesh. The triangle budget
    /// halves per level: `0.5^level` of the base count.
    pub fn generate_lod(&self, base: &MeshResource, level: u32) -> MeshResult<MeshResource> {
        if level == 0 || level >= self.settings.max_lod_level {
            return Err(MeshError::InvalidLodLevel {
                level,
                max: self.settings.max_lod_level,
            });
        }

        let factor = 0.5f32.powi(level as i32);
        let target = ((base.triangle_count() as f32 * factor).ceil() as usize).max(1);
        let simplified = simplifier::simplify(base, target);
        if simplified.is_empty() {
            return Err(MeshError::loading_failed(
                format!("lod{}", level),
                "simplification produced an empty mesh",
            ));
        }

        debug!(
            "generated lod{}: {} -> {} triangles",
            level,
            base.triangle_count(),
            simplified.triangle_count()
        );
        Ok(simplified)
    }

    /// Generate the full chain `[base, lod1, ..]`. A failing intermediate
    /// level truncates the chain rather than failing it; a partial chain
    /// is a valid result.
    pub fn generate_lod_chain(&self, base: Arc<MeshResource>) -> Vec<LodLevel> {
        let mut chain = vec![LodLevel {
            level: 0,
            vertex_count: base.vertex_count(),
            distance_threshold: self.threshold_for(0),
            mesh: Some(Arc::clone(&base)),
        }];

        for level in 1..self.settings.max_lod_level {
            match self.generate_lod(&base, level) {
                Ok(mesh) => {
                    let previous = chain[chain.len() - 1].vertex_count;
                    if mesh.vertex_count() > previous {
                        warn!("lod{} did not reduce vertex count, truncating chain", level);
                        break;
                    }
                    chain.push(LodLevel {
                        level,
                        vertex_count: mesh.vertex_count(),
                        distance_threshold: self.threshold_for(level as usize),
                        mesh: Some(Arc::new(mesh)),
                    });
                }
                Err(e) => {
                    warn!("lod{} generation failed, truncating chain: {}", level, e);
                    break;
                }
            }
        }
        chain
    }

    /// Pick a LOD index for a viewer distance. Returns 0 (full detail)
    /// when LOD is disabled; otherwise the smallest index whose threshold
    /// covers the bias-adjusted distance, or the coarsest configured
    /// level. Objects larger than one world unit hold detail longer.
    pub fn select_lod_level(&self, distance: f32, bounds: &BoundingBox) -> u32 {
        if !self.settings.enabled {
            return 0;
        }
        let level_count = self
            .settings
            .distance_thresholds
            .len()
            .min(self.settings.max_lod_level as usize);
        if level_count == 0 {
            return 0;
        }

        let size_factor = bounds.radius().max(1.0);
        let adjusted = distance * self.settings.bias / size_factor;

        for (i, threshold) in self.settings.distance_thresholds[..level_count]
            .iter()
            .enumerate()
        {
            if *threshold >= adjusted {
                return i as u32;
            }
        }
        (level_count - 1) as u32
    }

    fn threshold_for(&self, level: usize) -> f32 {
        self.settings
            .distance_thresholds
            .get(level)
            .copied()
            .unwrap_or(f32::MAX)
    }
}
