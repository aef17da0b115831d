//! Composite shape assembly.
//!
//! Each generator concatenates sub-shapes into one shared vertex/index
//! buffer through `MeshBuilder`, which rebases indices by the running
//! vertex count on every append.

use std::f32::consts::PI;

use cgmath::{Point3, Vector3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::primitives;
use super::{
    BuildingParams, CrystalParams, FlowerParams, HumanoidParams, RockParams, TreeParams,
};
use crate::mesh::{MeshBuilder, MeshResource};

/// Blocky humanoid: torso, head, two arms, two legs, each an independently
/// sized box. Feet rest on y = 0; the head top reaches `height`; the arms
/// are flush with the outer `width`.
pub fn humanoid_mesh(params: &HumanoidParams) -> MeshResource {
    let h = params.height.max(0.1);
    let w = params.width.max(0.05);
    let mut builder = MeshBuilder::with_capacity(24 * 6, 36 * 6);

    // Torso spans 0.25h..0.85h, overlapping the leg tops.
    builder.push_box(
        Point3::new(0.0, 0.55 * h, 0.0),
        Vector3::new(0.6 * w, 0.6 * h, 0.5 * w),
    );

    // Head cube sits on the torso, topping out at the full height.
    builder.push_box(
        Point3::new(0.0, 0.925 * h, 0.0),
        Vector3::new(0.15 * h, 0.15 * h, 0.15 * h),
    );

    // Arms hang from the shoulders, outer faces at +-width/2.
    for side in [-1.0f32, 1.0] {
        builder.push_box(
            Point3::new(side * 0.4 * w, 0.6 * h, 0.0),
            Vector3::new(0.2 * w, 0.5 * h, 0.2 * w),
        );
    }

    // Legs from the ground to 0.4h.
    for side in [-1.0f32, 1.0] {
        builder.push_box(
            Point3::new(side * 0.15 * w, 0.2 * h, 0.0),
            Vector3::new(0.2 * w, 0.4 * h, 0.2 * w),
        );
    }

    builder.build()
}

/// Flower head: petal triangles fanning base-to-tip around a shared
/// center vertex, plus interior center-to-base triangles filling the disc.
pub fn flower_mesh(params: &FlowerParams) -> MeshResource {
    let petals = params.petal_count.max(3);
    let base_radius = params.center_radius.max(0.01);
    let tip_radius = base_radius + params.petal_length.max(0.01);
    let up = [0.0, 1.0, 0.0];

    let mut builder = MeshBuilder::new();
    let center = builder.push_vertex([0.0, 0.0, 0.0], up, [0.5, 0.5]);

    for i in 0..petals {
        let phi = 2.0 * PI * i as f32 / petals as f32;
        let half_width = PI / petals as f32 * 0.8;

        let left = phi - half_width;
        let right = phi + half_width;
        let base_left = builder.push_vertex(
            [base_radius * left.cos(), 0.0, base_radius * left.sin()],
            up,
            [0.5 + 0.25 * left.cos(), 0.5 + 0.25 * left.sin()],
        );
        let base_right = builder.push_vertex(
            [base_radius * right.cos(), 0.0, base_radius * right.sin()],
            up,
            [0.5 + 0.25 * right.cos(), 0.5 + 0.25 * right.sin()],
        );
        // Tips curl slightly upward for silhouette.
        let tip = builder.push_vertex(
            [
                tip_radius * phi.cos(),
                0.1 * params.petal_length,
                tip_radius * phi.sin(),
            ],
            up,
            [0.5 + 0.5 * phi.cos(), 0.5 + 0.5 * phi.sin()],
        );

        builder.push_triangle(base_left, base_right, tip);
        builder.push_triangle(center, base_right, base_left);
    }

    builder.build()
}

/// Bipyramid gem: a ring of `sides` vertices at mid-height with an apex
/// above and below, both caps fan-triangulated.
pub fn crystal_mesh(params: &CrystalParams) -> MeshResource {
    let sides = params.sides.max(3);
    let radius = params.radius.max(0.01);
    let half = params.height.max(0.01) * 0.5;

    let mut builder = MeshBuilder::new();
    let top = builder.push_vertex([0.0, half, 0.0], [0.0, 1.0, 0.0], [0.5, 1.0]);
    let bottom = builder.push_vertex([0.0, -half, 0.0], [0.0, -1.0, 0.0], [0.5, 0.0]);

    let ring_base = builder.vertex_count() as u32;
    for i in 0..=sides {
        let phi = 2.0 * PI * i as f32 / sides as f32;
        let (sin_p, cos_p) = phi.sin_cos();
        builder.push_vertex(
            [radius * cos_p, 0.0, radius * sin_p],
            [cos_p, 0.0, sin_p],
            [i as f32 / sides as f32, 0.5],
        );
    }

    for i in 0..sides {
        let a = ring_base + i;
        let b = ring_base + i + 1;
        builder.push_triangle(a, top, b);
        builder.push_triangle(a, b, bottom);
    }

    builder.build()
}

/// Cylinder trunk with a spherical crown sunk slightly into its top.
pub fn tree_mesh(params: &TreeParams, segments: u32) -> MeshResource {
    let trunk_height = params.trunk_height.max(0.1);
    let trunk = primitives::cylinder_mesh(params.trunk_radius.max(0.01), trunk_height, segments);
    let crown = primitives::sphere_mesh(params.crown_radius.max(0.05), segments);

    let mut builder = MeshBuilder::with_capacity(
        trunk.vertex_count() + crown.vertex_count(),
        trunk.indices().len() + crown.indices().len(),
    );
    builder.append_translated(&trunk, Vector3::new(0.0, trunk_height * 0.5, 0.0));
    builder.append_translated(
        &crown,
        Vector3::new(0.0, trunk_height + params.crown_radius * 0.7, 0.0),
    );
    builder.build()
}

/// Spherical grid with bounded per-vertex radial jitter. The jitter grid
/// is drawn up front from a seeded generator, so the same parameters
/// always produce the same rock and the welded seam stays closed.
pub fn rock_mesh(params: &RockParams, segments: u32) -> MeshResource {
    let seg = segments.max(3);
    let radius = params.radius.max(0.01);
    let irregularity = params.irregularity.clamp(0.0, 1.0);

    let mut rng = StdRng::seed_from_u64(params.seed);
    let rows = (seg + 1) as usize;
    let mut radii = vec![radius; rows * rows];
    for r in radii.iter_mut() {
        *r = radius * (1.0 - irregularity * rng.gen::<f32>() * 0.5);
    }

    primitives::sphere_grid(seg, |ring, sector| {
        radii[ring as usize * rows + sector as usize]
    })
}

/// Stacked per-floor boxes with a slight inset per floor.
pub fn building_mesh(params: &BuildingParams) -> MeshResource {
    let floors = params.floors.max(1);
    let floor_height = params.floor_height.max(0.1);
    let mut builder = MeshBuilder::with_capacity(24 * floors as usize, 36 * floors as usize);

    for floor in 0..floors {
        let inset = (1.0 - 0.04 * floor as f32).max(0.6);
        builder.push_box(
            Point3::new(0.0, (floor as f32 + 0.5) * floor_height, 0.0),
            Vector3::new(params.width * inset, floor_height, params.depth * inset),
        );
    }

    builder.build()
}
