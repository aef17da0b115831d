//! worldmesh: the mesh/asset pipeline of a networked 3D world client.
//!
//! The crate produces, caches, and detail-selects mesh geometry handles;
//! rendering, physics, game logic, and networking consume those handles
//! through narrow interfaces and are not part of this crate.
//!
//! The public entry point is [`MeshSystem`]: an explicitly constructed,
//! caller-owned facade that deduplicates concurrent loads, falls back to
//! procedural generation when an asset cannot be sourced, and keeps cache
//! memory under a configured pressure threshold.
//!
//! ```no_run
//! use worldmesh::{GraphicsConfig, MeshSystem};
//!
//! # async fn demo() {
//! let system = MeshSystem::new(GraphicsConfig::default());
//! let mesh = system.load_mesh("models/oak_tree.obj", 0).await.unwrap();
//! println!("{} vertices", mesh.vertex_count());
//! # }
//! ```

pub mod cache;
pub mod config;
pub mod error;
pub mod formats;
pub mod lod;
pub mod material;
pub mod mesh;
pub mod pipeline;
pub mod procedural;

pub use cache::{CacheEntry, CachePriority, CacheStatistics, MaterialCache, MeshCache};
pub use config::{GraphicsConfig, LodSettings, QualityLevel};
pub use error::{MeshError, MeshResult};
pub use formats::{AssetLoader, LoaderCapabilities, MeshFormat, NullPlatformLoader, PlatformLoader};
pub use lod::{LodLevel, LodManager};
pub use material::MaterialResource;
pub use mesh::{BoundingBox, MeshBuilder, MeshResource};
pub use pipeline::{AvatarAppearance, MeshSystem, PerformanceMonitor, PerformanceReport};
pub use procedural::terrain::{Heightmap, TerrainFeatures};
pub use procedural::{ProceduralMeshGenerator, ProceduralMeshType};
