//! Heightmap terrain: grid meshing and noise synthesis.
//!
//! Meshing consumes any N x N grid of height samples; synthesis builds
//! such a grid from seeded Perlin octaves so terrain requests can be
//! served with no input data at all.

use cgmath::{InnerSpace, Vector3};
use noise::{NoiseFn, Perlin};
use serde::{Deserialize, Serialize};

use crate::mesh::{MeshBuilder, MeshResource};

/// Parameters steering both heightmap synthesis and meshing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TerrainFeatures {
    /// Peak-to-valley height scale in world units.
    pub amplitude: f32,

    /// Base noise frequency per sample.
    pub frequency: f64,

    /// Octave count; each octave doubles frequency and halves amplitude.
    pub octaves: u32,

    pub seed: u32,

    /// World-unit spacing between grid samples.
    pub cell_size: f32,
}

impl Default for TerrainFeatures {
    fn default() -> Self {
        Self {
            amplitude: 8.0,
            frequency: 0.05,
            octaves: 4,
            seed: 0,
            cell_size: 1.0,
        }
    }
}

/// Square grid of height samples, row-major by z.
#[derive(Debug, Clone, PartialEq)]
pub struct Heightmap {
    size: usize,
    samples: Vec<f32>,
}

impl Heightmap {
    /// Wrap an existing sample grid. The grid must be square and at least
    /// 2 x 2; anything else has no meshable surface.
    pub fn new(size: usize, samples: Vec<f32>) -> Option<Self> {
        if size < 2 || samples.len() != size * size {
            return None;
        }
        Some(Self { size, samples })
    }

    /// Fill a grid from a sampling function of `(x, z)`.
    pub fn from_fn(size: usize, sample: impl Fn(usize, usize) -> f32) -> Self {
        let size = size.max(2);
        let mut samples = Vec::with_capacity(size * size);
        for z in 0..size {
            for x in 0..size {
                samples.push(sample(x, z));
            }
        }
        Self { size, samples }
    }

    /// Synthesize a heightmap from seeded Perlin octaves. Deterministic
    /// for a fixed seed.
    pub fn from_noise(size: usize, features: &TerrainFeatures) -> Self {
        let perlin = Perlin::new(features.seed);
        let octaves = features.octaves.max(1);

        Self::from_fn(size, |x, z| {
            let mut height = 0.0f64;
            let mut frequency = features.frequency;
            let mut amplitude = 1.0f64;
            let mut range = 0.0f64;

            for _ in 0..octaves {
                height += perlin.get([x as f64 * frequency, z as f64 * frequency]) * amplitude;
                range += amplitude;
                frequency *= 2.0;
                amplitude *= 0.5;
            }

            (height / range * features.amplitude as f64) as f32
        })
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Height at `(x, z)`, with indices clamped into the grid.
    pub fn sample(&self, x: usize, z: usize) -> f32 {
        let x = x.min(self.size - 1);
        let z = z.min(self.size - 1);
        self.samples[z * self.size + x]
    }
}

/// Mesh a heightmap into a regular triangle grid.
///
/// Vertices land at `(x * cell, height[z][x], z * cell)` with UVs spanning
/// the unit square. Normals come from central differences of neighboring
/// heights; edge vertices clamp to their nearest interior neighbor rather
/// than wrapping.
pub fn mesh_heightmap(map: &Heightmap, cell_size: f32) -> MeshResource {
    let n = map.size();
    let cell = if cell_size.is_finite() && cell_size > 0.0 {
        cell_size
    } else {
        1.0
    };

    let mut builder = MeshBuilder::with_capacity(n * n, (n - 1) * (n - 1) * 6);
    let uv_step = 1.0 / (n - 1) as f32;

    for z in 0..n {
        for x in 0..n {
            let left = map.sample(x.saturating_sub(1), z);
            let right = map.sample(x + 1, z);
            let near = map.sample(x, z.saturating_sub(1));
            let far = map.sample(x, z + 1);

            // Clamped indices shorten the difference span at the edges.
            let dx = if x == 0 || x == n - 1 { cell } else { 2.0 * cell };
            let dz = if z == 0 || z == n - 1 { cell } else { 2.0 * cell };
            let normal = Vector3::new(-(right - left) / dx, 1.0, -(far - near) / dz).normalize();

            builder.push_vertex(
                [x as f32 * cell, map.sample(x, z), z as f32 * cell],
                normal.into(),
                [x as f32 * uv_step, z as f32 * uv_step],
            );
        }
    }

    for z in 0..n - 1 {
        for x in 0..n - 1 {
            let top_left = (z * n + x) as u32;
            let top_right = top_left + 1;
            let bottom_left = top_left + n as u32;
            let bottom_right = bottom_left + 1;

            builder.push_triangle(top_left, bottom_left, top_right);
            builder.push_triangle(top_right, bottom_left, bottom_right);
        }
    }

    builder.build()
}
