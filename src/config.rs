//! Graphics configuration consumed by the mesh pipeline.
//!
//! The quality tier drives procedural tessellation resolution and cache
//! pressure thresholds; the LOD settings drive chain length and distance
//! selection. Configuration is deserialized from TOML.

use serde::{Deserialize, Serialize};

use crate::error::{MeshError, MeshResult};

/// Rendering quality tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QualityLevel {
    Low,
    Medium,
    High,
    Ultra,
    /// Chooses a middle-ground resolution; external systems may retune it
    /// from frame timing.
    Adaptive,
}

impl QualityLevel {
    /// Segment count for curved procedural primitives at this tier.
    pub fn segment_count(&self) -> u32 {
        match self {
            QualityLevel::Low => 8,
            QualityLevel::Medium => 16,
            QualityLevel::High => 24,
            QualityLevel::Ultra => 32,
            QualityLevel::Adaptive => 20,
        }
    }

    /// Scale applied to the cache pressure threshold. Higher tiers keep
    /// more geometry resident before eviction kicks in.
    pub fn cache_scale(&self) -> f32 {
        match self {
            QualityLevel::Low => 0.5,
            QualityLevel::Medium => 1.0,
            QualityLevel::High => 1.5,
            QualityLevel::Ultra => 2.0,
            QualityLevel::Adaptive => 1.0,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            QualityLevel::Low => "low",
            QualityLevel::Medium => "medium",
            QualityLevel::High => "high",
            QualityLevel::Ultra => "ultra",
            QualityLevel::Adaptive => "adaptive",
        }
    }
}

/// Level-of-detail selection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LodSettings {
    /// When false, full detail is always selected.
    pub enabled: bool,

    /// Ascending viewer-distance thresholds, one per LOD index.
    pub distance_thresholds: Vec<f32>,

    /// Multiplier applied to viewer distance before threshold lookup.
    pub bias: f32,

    /// Number of LOD levels including the base mesh. Valid generated
    /// levels are `1..max_lod_level`.
    pub max_lod_level: u32,
}

impl Default for LodSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            distance_thresholds: vec![10.0, 25.0, 50.0, 100.0],
            bias: 1.0,
            max_lod_level: 4,
        }
    }
}

/// Top-level configuration for the mesh pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphicsConfig {
    pub quality: QualityLevel,

    pub lod: LodSettings,

    /// Cache memory pressure threshold in bytes, before quality scaling.
    pub cache_memory_threshold: usize,

    /// Maximum entry count per cache before cleanup triggers.
    pub max_cache_entries: usize,
}

impl Default for GraphicsConfig {
    fn default() -> Self {
        Self {
            quality: QualityLevel::Medium,
            lod: LodSettings::default(),
            cache_memory_threshold: 128 * 1024 * 1024,
            max_cache_entries: 1000,
        }
    }
}

impl GraphicsConfig {
    /// Parse a configuration from TOML text.
    pub fn from_toml_str(text: &str) -> MeshResult<Self> {
        toml::from_str(text).map_err(|e| MeshError::loading_failed("graphics config", e))
    }

    /// Load a configuration from a TOML file.
    pub fn from_toml_file(path: impl AsRef<std::path::Path>) -> MeshResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                MeshError::FileNotFound {
                    path: path.to_path_buf(),
                }
            } else {
                MeshError::loading_failed(path.display().to_string(), e)
            }
        })?;
        Self::from_toml_str(&text)
    }
}
