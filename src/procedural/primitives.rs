//! Parametric primitive construction.

use std::f32::consts::PI;

use cgmath::{Point3, Vector3};

use crate::mesh::{MeshBuilder, MeshResource};

/// Unit cube at the origin; the universal fallback shape.
pub fn unit_box() -> MeshResource {
    box_mesh(1.0, 1.0, 1.0)
}

pub fn box_mesh(width: f32, height: f32, depth: f32) -> MeshResource {
    let mut builder = MeshBuilder::with_capacity(24, 36);
    builder.push_box(
        Point3::new(0.0, 0.0, 0.0),
        Vector3::new(width, height, depth),
    );
    builder.build()
}

/// UV-sphere over a `segments × segments` grid: `(segments+1)^2` vertices
/// and `segments * segments * 2` triangles, poles included as degenerate
/// rows so the grid stays regular.
pub fn sphere_mesh(radius: f32, segments: u32) -> MeshResource {
    sphere_grid(segments, |_, _| radius)
}

/// Spherical grid with a caller-supplied per-vertex radius. The sector
/// seam and both pole rows reuse the first sector's radius so the
/// silhouette stays welded.
pub fn sphere_grid(segments: u32, radius_at: impl Fn(u32, u32) -> f32) -> MeshResource {
    let seg = segments.max(3);
    let ring_count = seg + 1;
    let mut builder =
        MeshBuilder::with_capacity((ring_count * ring_count) as usize, (seg * seg * 6) as usize);

    for ring in 0..=seg {
        let theta = PI * ring as f32 / seg as f32;
        let (sin_t, cos_t) = theta.sin_cos();
        for sector in 0..=seg {
            let phi = 2.0 * PI * sector as f32 / seg as f32;
            let (sin_p, cos_p) = phi.sin_cos();

            // Weld the seam column and pole rows.
            let sample_sector = if sector == seg || ring == 0 || ring == seg {
                0
            } else {
                sector
            };
            let radius = radius_at(ring, sample_sector);

            let dir = Vector3::new(sin_t * cos_p, cos_t, sin_t * sin_p);
            builder.push_vertex(
                [dir.x * radius, dir.y * radius, dir.z * radius],
                [dir.x, dir.y, dir.z],
                [
                    sector as f32 / seg as f32,
                    ring as f32 / seg as f32,
                ],
            );
        }
    }

    for ring in 0..seg {
        for sector in 0..seg {
            let a = ring * (seg + 1) + sector;
            let b = a + seg + 1;
            builder.push_triangle(a, b, a + 1);
            builder.push_triangle(a + 1, b, b + 1);
        }
    }

    builder.build()
}

/// Capped cylinder centered at the origin, axis along +Y.
pub fn cylinder_mesh(radius: f32, height: f32, segments: u32) -> MeshResource {
    let seg = segments.max(3);
    let half = height * 0.5;
    let mut builder = MeshBuilder::new();

    // Side wall: two welded rings with radial normals.
    let side_base = builder.vertex_count() as u32;
    for i in 0..=seg {
        let phi = 2.0 * PI * i as f32 / seg as f32;
        let (sin_p, cos_p) = phi.sin_cos();
        let u = i as f32 / seg as f32;
        builder.push_vertex(
            [radius * cos_p, half, radius * sin_p],
            [cos_p, 0.0, sin_p],
            [u, 0.0],
        );
        builder.push_vertex(
            [radius * cos_p, -half, radius * sin_p],
            [cos_p, 0.0, sin_p],
            [u, 1.0],
        );
    }
    for i in 0..seg {
        let top = side_base + i * 2;
        let bottom = top + 1;
        builder.push_triangle(top, bottom, top + 2);
        builder.push_triangle(top + 2, bottom, bottom + 2);
    }

    // Caps: center fan with flat normals.
    for (y, normal) in [(half, [0.0, 1.0, 0.0]), (-half, [0.0, -1.0, 0.0])] {
        let center = builder.push_vertex([0.0, y, 0.0], normal, [0.5, 0.5]);
        let ring_base = builder.vertex_count() as u32;
        for i in 0..=seg {
            let phi = 2.0 * PI * i as f32 / seg as f32;
            let (sin_p, cos_p) = phi.sin_cos();
            builder.push_vertex(
                [radius * cos_p, y, radius * sin_p],
                normal,
                [0.5 + 0.5 * cos_p, 0.5 + 0.5 * sin_p],
            );
        }
        for i in 0..seg {
            if y > 0.0 {
                builder.push_triangle(center, ring_base + i + 1, ring_base + i);
            } else {
                builder.push_triangle(center, ring_base + i, ring_base + i + 1);
            }
        }
    }

    builder.build()
}

/// Flat subdivided plane on XZ, facing +Y.
pub fn plane_mesh(width: f32, depth: f32, subdivisions: u32) -> MeshResource {
    let cells = subdivisions.max(1);
    let verts_per_side = cells + 1;
    let mut builder = MeshBuilder::with_capacity(
        (verts_per_side * verts_per_side) as usize,
        (cells * cells * 6) as usize,
    );

    for z in 0..verts_per_side {
        for x in 0..verts_per_side {
            let fx = x as f32 / cells as f32;
            let fz = z as f32 / cells as f32;
            builder.push_vertex(
                [(fx - 0.5) * width, 0.0, (fz - 0.5) * depth],
                [0.0, 1.0, 0.0],
                [fx, fz],
            );
        }
    }

    for z in 0..cells {
        for x in 0..cells {
            let top_left = z * verts_per_side + x;
            let top_right = top_left + 1;
            let bottom_left = top_left + verts_per_side;
            let bottom_right = bottom_left + 1;
            builder.push_triangle(top_left, bottom_left, top_right);
            builder.push_triangle(top_right, bottom_left, bottom_right);
        }
    }

    builder.build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sphere_grid_counts_match_segments() {
        let mesh = sphere_mesh(2.0, 8);
        assert_eq!(mesh.vertex_count(), 9 * 9);
        assert_eq!(mesh.triangle_count(), 8 * 8 * 2);
        assert!((mesh.bounds().radius() - 2.0).abs() < 0.1);
    }

    #[test]
    fn cylinder_is_capped() {
        let mesh = cylinder_mesh(0.5, 2.0, 8);
        // Side wall quads plus two cap fans.
        assert_eq!(mesh.triangle_count(), 8 * 2 + 8 * 2);
        let size = mesh.bounds().size();
        assert!((size.y - 2.0).abs() < 1e-5);
        assert!((size.x - 1.0).abs() < 1e-5);
    }

    #[test]
    fn plane_lies_flat() {
        let mesh = plane_mesh(4.0, 2.0, 3);
        assert_eq!(mesh.vertex_count(), 16);
        assert_eq!(mesh.triangle_count(), 18);
        assert_eq!(mesh.bounds().size().y, 0.0);
    }
}
