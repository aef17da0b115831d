//! Asset loading and format detection.
//!
//! The text polygon format is parsed in-crate; scene-graph formats are
//! delegated to an injected platform loader whose contract is simply
//! "path in, mesh or failure out".

pub mod obj;

use std::path::Path;
use std::sync::Arc;

use log::debug;

use crate::error::{MeshError, MeshResult};
use crate::mesh::MeshResource;

/// Mesh formats the loader recognizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MeshFormat {
    /// Line-oriented text polygon format (`v`/`vn`/`vt`/`f` directives).
    Obj,
    Gltf,
    Glb,
    Fbx,
    Usdz,
}

impl MeshFormat {
    /// Infer a format from the source's extension. Unrecognized sources
    /// default to the baseline text format.
    pub fn detect(source: &str) -> Self {
        // Strip URL query fragments before looking at the extension.
        let path = source.split(['?', '#']).next().unwrap_or(source);
        match Path::new(path)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .as_deref()
        {
            Some("gltf") => MeshFormat::Gltf,
            Some("glb") => MeshFormat::Glb,
            Some("fbx") => MeshFormat::Fbx,
            Some("usdz") | Some("usd") | Some("usdc") => MeshFormat::Usdz,
            _ => MeshFormat::Obj,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            MeshFormat::Obj => "obj",
            MeshFormat::Gltf => "gltf",
            MeshFormat::Glb => "glb",
            MeshFormat::Fbx => "fbx",
            MeshFormat::Usdz => "usdz",
        }
    }

    /// Feature set the format's loader can provide, so callers can
    /// degrade gracefully when a feature is missing.
    pub fn capabilities(&self) -> LoaderCapabilities {
        match self {
            MeshFormat::Obj => LoaderCapabilities {
                normals: true,
                uvs: true,
                ..LoaderCapabilities::NONE
            },
            MeshFormat::Gltf | MeshFormat::Glb => LoaderCapabilities {
                materials: true,
                animation: true,
                textures: true,
                normals: true,
                uvs: true,
                bones: true,
                physics: false,
            },
            MeshFormat::Fbx => LoaderCapabilities {
                materials: true,
                animation: true,
                textures: true,
                normals: true,
                uvs: true,
                bones: true,
                physics: true,
            },
            MeshFormat::Usdz => LoaderCapabilities {
                materials: true,
                animation: true,
                textures: true,
                normals: true,
                uvs: true,
                bones: false,
                physics: true,
            },
        }
    }

    fn is_scene_graph(&self) -> bool {
        !matches!(self, MeshFormat::Obj)
    }
}

/// Feature set a per-format loader advertises.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoaderCapabilities {
    pub materials: bool,
    pub animation: bool,
    pub physics: bool,
    pub textures: bool,
    pub normals: bool,
    pub uvs: bool,
    pub bones: bool,
}

impl LoaderCapabilities {
    pub const NONE: Self = Self {
        materials: false,
        animation: false,
        physics: false,
        textures: false,
        normals: false,
        uvs: false,
        bones: false,
    };
}

/// Opaque loader for scene-graph formats. Implementations wrap whatever
/// platform or third-party importer is available; the pipeline only sees
/// a mesh or a failure.
pub trait PlatformLoader: Send + Sync {
    fn load(&self, path: &Path) -> MeshResult<MeshResource>;
}

/// Platform loader used when no importer has been injected. Every scene
/// format request fails as unsupported, which sends the orchestrator down
/// the procedural fallback path.
pub struct NullPlatformLoader;

impl PlatformLoader for NullPlatformLoader {
    fn load(&self, path: &Path) -> MeshResult<MeshResource> {
        Err(MeshError::UnsupportedFormat {
            format: MeshFormat::detect(&path.to_string_lossy()).name().to_string(),
        })
    }
}

/// Format-detecting mesh loader.
#[derive(Clone)]
pub struct AssetLoader {
    platform: Arc<dyn PlatformLoader>,
}

impl AssetLoader {
    pub fn new() -> Self {
        Self {
            platform: Arc::new(NullPlatformLoader),
        }
    }

    pub fn with_platform_loader(platform: Arc<dyn PlatformLoader>) -> Self {
        Self { platform }
    }

    /// Load a mesh from a path or URL-style source identifier.
    ///
    /// `format` overrides extension detection when given. `lod_level` is
    /// recorded for diagnostics; format loaders always produce full
    /// detail and LOD variants are derived downstream.
    pub async fn load_mesh(
        &self,
        source: &str,
        format: Option<MeshFormat>,
        lod_level: u32,
    ) -> MeshResult<MeshResource> {
        let format = format.unwrap_or_else(|| MeshFormat::detect(source));
        debug!(
            "loading '{}' as {} (requested lod {})",
            source,
            format.name(),
            lod_level
        );

        if format.is_scene_graph() {
            let platform = Arc::clone(&self.platform);
            let path = std::path::PathBuf::from(source);
            let source_id = source.to_string();
            return tokio::task::spawn_blocking(move || platform.load(&path))
                .await
                .map_err(|e| MeshError::loading_failed(source_id, e))?;
        }

        let text = tokio::fs::read_to_string(source).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                MeshError::FileNotFound {
                    path: source.into(),
                }
            } else {
                MeshError::loading_failed(source, e)
            }
        })?;

        let mesh = obj::parse(&text)?;
        if mesh.is_empty() {
            return Err(MeshError::NoMeshFound {
                source_id: source.to_string(),
            });
        }
        Ok(mesh)
    }
}

impl Default for AssetLoader {
    fn default() -> Self {
        Self::new()
    }
}
