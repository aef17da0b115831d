//! Procedural mesh generation.
//!
//! Generators serve two roles: primary content (terrain, world props) and
//! the universal fallback for assets that fail to load. Because the
//! fallback path must never hard-fail, `generate` degrades to a unit box
//! on any internal construction problem instead of returning an error.
//!
//! Each shape carries its own parameter struct, so invalid parameter
//! combinations are unrepresentable and every request maps to a
//! deterministic cache key.

mod composite;
pub mod primitives;
pub mod terrain;

use std::hash::{Hash, Hasher};

use log::warn;
use rustc_hash::FxHasher;
use serde::{Deserialize, Serialize};

use crate::config::QualityLevel;
use crate::mesh::MeshResource;

/// Box dimensions in world units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoxParams {
    pub width: f32,
    pub height: f32,
    pub depth: f32,
}

impl Default for BoxParams {
    fn default() -> Self {
        Self {
            width: 1.0,
            height: 1.0,
            depth: 1.0,
        }
    }
}

/// UV-sphere parameters. `segments` overrides the quality-tier resolution
/// when set.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SphereParams {
    pub radius: f32,
    pub segments: Option<u32>,
}

impl Default for SphereParams {
    fn default() -> Self {
        Self {
            radius: 1.0,
            segments: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CylinderParams {
    pub radius: f32,
    pub height: f32,
    pub segments: Option<u32>,
}

impl Default for CylinderParams {
    fn default() -> Self {
        Self {
            radius: 0.5,
            height: 1.0,
            segments: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlaneParams {
    pub width: f32,
    pub depth: f32,
    pub subdivisions: u32,
}

impl Default for PlaneParams {
    fn default() -> Self {
        Self {
            width: 10.0,
            depth: 10.0,
            subdivisions: 1,
        }
    }
}

/// Blocky humanoid proportions. Part sizes derive from the overall height
/// and shoulder width: torso 0.6x height, head 0.15x height, legs 0.4x
/// height, arms flush with the outer width.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HumanoidParams {
    pub height: f32,
    pub width: f32,
}

impl Default for HumanoidParams {
    fn default() -> Self {
        Self {
            height: 1.8,
            width: 0.5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FlowerParams {
    pub petal_count: u32,
    pub petal_length: f32,
    pub center_radius: f32,
}

impl Default for FlowerParams {
    fn default() -> Self {
        Self {
            petal_count: 6,
            petal_length: 0.5,
            center_radius: 0.15,
        }
    }
}

/// Bipyramid gem: a ring of `sides` vertices with an apex above and below.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CrystalParams {
    pub sides: u32,
    pub radius: f32,
    pub height: f32,
}

impl Default for CrystalParams {
    fn default() -> Self {
        Self {
            sides: 6,
            radius: 0.3,
            height: 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TreeParams {
    pub trunk_height: f32,
    pub trunk_radius: f32,
    pub crown_radius: f32,
}

impl Default for TreeParams {
    fn default() -> Self {
        Self {
            trunk_height: 2.0,
            trunk_radius: 0.2,
            crown_radius: 1.0,
        }
    }
}

/// Jittered sphere. `irregularity` in `[0, 1]` bounds how far each vertex
/// pulls inward from the nominal radius; the jitter is seeded so identical
/// parameters always produce identical rocks.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RockParams {
    pub radius: f32,
    pub irregularity: f32,
    pub seed: u64,
}

impl Default for RockParams {
    fn default() -> Self {
        Self {
            radius: 0.5,
            irregularity: 0.3,
            seed: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BuildingParams {
    pub floors: u32,
    pub floor_height: f32,
    pub width: f32,
    pub depth: f32,
}

impl Default for BuildingParams {
    fn default() -> Self {
        Self {
            floors: 3,
            floor_height: 3.0,
            width: 4.0,
            depth: 4.0,
        }
    }
}

/// Synthesized heightmap terrain: an N x N sample grid meshed at
/// `cell_size` spacing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TerrainParams {
    pub size: u32,
    pub height_scale: f32,
    pub seed: u32,
    pub cell_size: f32,
}

impl Default for TerrainParams {
    fn default() -> Self {
        Self {
            size: 33,
            height_scale: 8.0,
            seed: 0,
            cell_size: 1.0,
        }
    }
}

/// The closed set of generator kinds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum ProceduralMeshType {
    Box(BoxParams),
    Sphere(SphereParams),
    Cylinder(CylinderParams),
    Plane(PlaneParams),
    Humanoid(HumanoidParams),
    Flower(FlowerParams),
    Crystal(CrystalParams),
    Tree(TreeParams),
    Rock(RockParams),
    Building(BuildingParams),
    Terrain(TerrainParams),
}

impl ProceduralMeshType {
    pub fn name(&self) -> &'static str {
        match self {
            ProceduralMeshType::Box(_) => "box",
            ProceduralMeshType::Sphere(_) => "sphere",
            ProceduralMeshType::Cylinder(_) => "cylinder",
            ProceduralMeshType::Plane(_) => "plane",
            ProceduralMeshType::Humanoid(_) => "humanoid",
            ProceduralMeshType::Flower(_) => "flower",
            ProceduralMeshType::Crystal(_) => "crystal",
            ProceduralMeshType::Tree(_) => "tree",
            ProceduralMeshType::Rock(_) => "rock",
            ProceduralMeshType::Building(_) => "building",
            ProceduralMeshType::Terrain(_) => "terrain",
        }
    }

    /// Deterministic cache-key fragment: shape name plus a hash of the
    /// parameter bits. Equivalent requests always resolve to the same key.
    pub fn cache_key(&self) -> String {
        let mut hasher = FxHasher::default();
        match self {
            ProceduralMeshType::Box(p) => {
                hash_f32s(&mut hasher, &[p.width, p.height, p.depth]);
            }
            ProceduralMeshType::Sphere(p) => {
                hash_f32s(&mut hasher, &[p.radius]);
                p.segments.hash(&mut hasher);
            }
            ProceduralMeshType::Cylinder(p) => {
                hash_f32s(&mut hasher, &[p.radius, p.height]);
                p.segments.hash(&mut hasher);
            }
            ProceduralMeshType::Plane(p) => {
                hash_f32s(&mut hasher, &[p.width, p.depth]);
                p.subdivisions.hash(&mut hasher);
            }
            ProceduralMeshType::Humanoid(p) => {
                hash_f32s(&mut hasher, &[p.height, p.width]);
            }
            ProceduralMeshType::Flower(p) => {
                p.petal_count.hash(&mut hasher);
                hash_f32s(&mut hasher, &[p.petal_length, p.center_radius]);
            }
            ProceduralMeshType::Crystal(p) => {
                p.sides.hash(&mut hasher);
                hash_f32s(&mut hasher, &[p.radius, p.height]);
            }
            ProceduralMeshType::Tree(p) => {
                hash_f32s(&mut hasher, &[p.trunk_height, p.trunk_radius, p.crown_radius]);
            }
            ProceduralMeshType::Rock(p) => {
                hash_f32s(&mut hasher, &[p.radius, p.irregularity]);
                p.seed.hash(&mut hasher);
            }
            ProceduralMeshType::Building(p) => {
                p.floors.hash(&mut hasher);
                hash_f32s(&mut hasher, &[p.floor_height, p.width, p.depth]);
            }
            ProceduralMeshType::Terrain(p) => {
                p.size.hash(&mut hasher);
                p.seed.hash(&mut hasher);
                hash_f32s(&mut hasher, &[p.height_scale, p.cell_size]);
            }
        }
        format!("{}:{:016x}", self.name(), hasher.finish())
    }

    /// Keyword heuristic mapping a requested asset name to a plausible
    /// fallback shape. Every name maps to something; unrecognized names
    /// get a box.
    pub fn infer_from_name(name: &str) -> Self {
        let lower = name.to_ascii_lowercase();
        let contains = |keys: &[&str]| keys.iter().any(|k| lower.contains(k));

        if contains(&["avatar", "player", "npc", "human", "character"]) {
            ProceduralMeshType::Humanoid(HumanoidParams::default())
        } else if contains(&["tree"]) {
            ProceduralMeshType::Tree(TreeParams::default())
        } else if contains(&["crystal", "gem", "shard"]) {
            ProceduralMeshType::Crystal(CrystalParams::default())
        } else if contains(&["flower", "plant", "blossom"]) {
            ProceduralMeshType::Flower(FlowerParams::default())
        } else if contains(&["rock", "stone", "boulder"]) {
            ProceduralMeshType::Rock(RockParams {
                seed: name_seed(&lower),
                ..RockParams::default()
            })
        } else if contains(&["building", "house", "tower", "hut"]) {
            ProceduralMeshType::Building(BuildingParams::default())
        } else if contains(&["terrain", "ground", "land"]) {
            ProceduralMeshType::Terrain(TerrainParams {
                seed: name_seed(&lower) as u32,
                ..TerrainParams::default()
            })
        } else if contains(&["plane", "floor", "platform"]) {
            ProceduralMeshType::Plane(PlaneParams::default())
        } else if contains(&["sphere", "orb", "ball"]) {
            ProceduralMeshType::Sphere(SphereParams::default())
        } else if contains(&["cylinder", "pillar", "column"]) {
            ProceduralMeshType::Cylinder(CylinderParams::default())
        } else {
            ProceduralMeshType::Box(BoxParams::default())
        }
    }
}

fn hash_f32s(hasher: &mut FxHasher, values: &[f32]) {
    for v in values {
        v.to_bits().hash(hasher);
    }
}

fn name_seed(name: &str) -> u64 {
    let mut hasher = FxHasher::default();
    name.hash(&mut hasher);
    hasher.finish()
}

/// Builds meshes for the shape set at a fixed quality tier.
pub struct ProceduralMeshGenerator {
    quality: QualityLevel,
}

impl ProceduralMeshGenerator {
    pub fn new(quality: QualityLevel) -> Self {
        Self { quality }
    }

    pub fn quality(&self) -> QualityLevel {
        self.quality
    }

    /// Generate a mesh for `mesh_type`. Construction problems degrade to a
    /// unit box: this path backs the fallback-on-failure policy, so it
    /// must always return renderable geometry.
    pub fn generate(&self, mesh_type: &ProceduralMeshType) -> MeshResource {
        let mesh = self.build(mesh_type);
        if mesh.is_empty() || !mesh.bounds().radius().is_finite() {
            warn!(
                "procedural {} construction degenerated, substituting unit box",
                mesh_type.name()
            );
            return primitives::unit_box();
        }
        mesh
    }

    fn build(&self, mesh_type: &ProceduralMeshType) -> MeshResource {
        let quality_segments = self.quality.segment_count();
        match mesh_type {
            ProceduralMeshType::Box(p) => primitives::box_mesh(p.width, p.height, p.depth),
            ProceduralMeshType::Sphere(p) => {
                primitives::sphere_mesh(p.radius, p.segments.unwrap_or(quality_segments))
            }
            ProceduralMeshType::Cylinder(p) => {
                primitives::cylinder_mesh(p.radius, p.height, p.segments.unwrap_or(quality_segments))
            }
            ProceduralMeshType::Plane(p) => primitives::plane_mesh(p.width, p.depth, p.subdivisions),
            ProceduralMeshType::Humanoid(p) => composite::humanoid_mesh(p),
            ProceduralMeshType::Flower(p) => composite::flower_mesh(p),
            ProceduralMeshType::Crystal(p) => composite::crystal_mesh(p),
            ProceduralMeshType::Tree(p) => composite::tree_mesh(p, quality_segments),
            ProceduralMeshType::Rock(p) => composite::rock_mesh(p, quality_segments),
            ProceduralMeshType::Building(p) => composite::building_mesh(p),
            ProceduralMeshType::Terrain(p) => {
                let features = terrain::TerrainFeatures {
                    amplitude: p.height_scale,
                    seed: p.seed,
                    cell_size: p.cell_size,
                    ..terrain::TerrainFeatures::default()
                };
                let map = terrain::Heightmap::from_noise(p.size.max(2) as usize, &features);
                terrain::mesh_heightmap(&map, p.cell_size)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sphere_at_low_quality_matches_documented_grid() {
        let generator = ProceduralMeshGenerator::new(QualityLevel::Low);
        let mesh = generator.generate(&ProceduralMeshType::Sphere(SphereParams {
            radius: 2.0,
            segments: None,
        }));

        assert_eq!(mesh.vertex_count(), 9 * 9);
        assert_eq!(mesh.triangle_count(), 8 * 8 * 2);
    }

    #[test]
    fn cache_keys_are_deterministic_and_distinct() {
        let a = ProceduralMeshType::Sphere(SphereParams {
            radius: 2.0,
            segments: None,
        });
        let b = ProceduralMeshType::Sphere(SphereParams {
            radius: 2.0,
            segments: None,
        });
        let c = ProceduralMeshType::Sphere(SphereParams {
            radius: 3.0,
            segments: None,
        });

        assert_eq!(a.cache_key(), b.cache_key());
        assert_ne!(a.cache_key(), c.cache_key());
        assert!(a.cache_key().starts_with("sphere:"));
    }

    #[test]
    fn name_inference_covers_the_documented_keywords() {
        let cases = [
            ("avatar_base", "humanoid"),
            ("old_npc_7", "humanoid"),
            ("oak_tree", "tree"),
            ("resonance_crystal", "crystal"),
            ("moon_flower", "flower"),
            ("mossy_rock", "rock"),
            ("guild_house", "building"),
            ("valley_terrain", "terrain"),
            ("dance_floor", "plane"),
            ("glowing_orb", "sphere"),
            ("stone_pillar", "rock"),
            ("mystery_widget", "box"),
        ];
        for (name, expected) in cases {
            assert_eq!(
                ProceduralMeshType::infer_from_name(name).name(),
                expected,
                "for '{}'",
                name
            );
        }
    }

    #[test]
    fn every_shape_generates_nonempty_geometry() {
        let generator = ProceduralMeshGenerator::new(QualityLevel::Medium);
        let shapes = [
            ProceduralMeshType::Box(BoxParams::default()),
            ProceduralMeshType::Sphere(SphereParams::default()),
            ProceduralMeshType::Cylinder(CylinderParams::default()),
            ProceduralMeshType::Plane(PlaneParams::default()),
            ProceduralMeshType::Humanoid(HumanoidParams::default()),
            ProceduralMeshType::Flower(FlowerParams::default()),
            ProceduralMeshType::Crystal(CrystalParams::default()),
            ProceduralMeshType::Tree(TreeParams::default()),
            ProceduralMeshType::Rock(RockParams::default()),
            ProceduralMeshType::Building(BuildingParams::default()),
            ProceduralMeshType::Terrain(TerrainParams {
                size: 9,
                ..TerrainParams::default()
            }),
        ];

        for shape in &shapes {
            let mesh = generator.generate(shape);
            assert!(mesh.vertex_count() > 0, "{} is empty", shape.name());
            assert!(mesh.triangle_count() > 0, "{} has no faces", shape.name());
        }
    }

    #[test]
    fn degenerate_parameters_fall_back_to_a_unit_box() {
        let generator = ProceduralMeshGenerator::new(QualityLevel::Low);
        let mesh = generator.generate(&ProceduralMeshType::Sphere(SphereParams {
            radius: f32::NAN,
            segments: None,
        }));

        assert_eq!(mesh.vertex_count(), 24);
        assert_eq!(mesh.triangle_count(), 12);
    }
}
