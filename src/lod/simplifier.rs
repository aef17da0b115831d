//! Quadric-error-metric mesh decimation.
//!
//! Repeatedly collapses the cheapest edge until the triangle budget is
//! met. Collapse targets are clamped into the base mesh bounds so the
//! bounding volume stays within tolerance of the original, and normals
//! are recomputed from the surviving faces.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashSet};

use cgmath::{InnerSpace, Matrix4, Vector3, Vector4, Zero};

use crate::mesh::{BoundingBox, MeshResource};

/// Quadric error matrix accumulated per vertex.
#[derive(Debug, Clone, Copy)]
struct Quadric {
    matrix: Matrix4<f32>,
}

impl Quadric {
    fn zero() -> Self {
        Self {
            matrix: Matrix4::zero(),
        }
    }

    /// Quadric of the plane `ax + by + cz + d = 0`.
    fn from_plane(a: f32, b: f32, c: f32, d: f32) -> Self {
        let matrix = Matrix4::new(
            a * a, a * b, a * c, a * d,
            a * b, b * b, b * c, b * d,
            a * c, b * c, c * c, c * d,
            a * d, b * d, c * d, d * d,
        );
        Self { matrix }
    }

    fn add(&self, other: &Quadric) -> Quadric {
        Quadric {
            matrix: self.matrix + other.matrix,
        }
    }

    fn error_at(&self, pos: Vector3<f32>) -> f32 {
        let v = Vector4::new(pos.x, pos.y, pos.z, 1.0);
        v.dot(self.matrix * v).abs()
    }
}

/// An edge collapse ordered by ascending error.
#[derive(Debug, Clone)]
struct Collapse {
    edge: (u32, u32),
    error: f32,
    target: Vector3<f32>,
}

impl PartialEq for Collapse {
    fn eq(&self, other: &Self) -> bool {
        self.error == other.error
    }
}

impl Eq for Collapse {}

impl PartialOrd for Collapse {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Collapse {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed so the BinaryHeap pops the cheapest collapse first.
        other
            .error
            .partial_cmp(&self.error)
            .unwrap_or(Ordering::Equal)
    }
}

/// Reduce `mesh` to at most `target_triangles` triangles.
///
/// Meshes already within budget are returned unchanged. UVs are carried
/// over for surviving vertices; normals are rebuilt from the simplified
/// topology.
pub fn simplify(mesh: &MeshResource, target_triangles: usize) -> MeshResource {
    if mesh.triangle_count() <= target_triangles || mesh.is_empty() {
        return mesh.clone();
    }
    Simplifier::new(mesh).run(target_triangles)
}

struct Simplifier {
    positions: Vec<Vector3<f32>>,
    uvs: Option<Vec<[f32; 2]>>,
    quadrics: Vec<Quadric>,
    faces: Vec<[u32; 3]>,
    face_alive: Vec<bool>,
    vertex_faces: Vec<Vec<usize>>,
    bounds: BoundingBox,
}

impl Simplifier {
    fn new(mesh: &MeshResource) -> Self {
        let positions: Vec<Vector3<f32>> =
            mesh.positions().iter().map(|p| Vector3::from(*p)).collect();
        let mut quadrics = vec![Quadric::zero(); positions.len()];
        let mut faces = Vec::with_capacity(mesh.triangle_count());
        let mut vertex_faces = vec![Vec::new(); positions.len()];

        for chunk in mesh.indices().chunks_exact(3) {
            let face = [chunk[0], chunk[1], chunk[2]];
            let face_idx = faces.len();
            faces.push(face);

            for &v in &face {
                vertex_faces[v as usize].push(face_idx);
            }

            let v0 = positions[face[0] as usize];
            let v1 = positions[face[1] as usize];
            let v2 = positions[face[2] as usize];
            let cross = (v1 - v0).cross(v2 - v0);
            if cross.magnitude2() > 0.0 {
                let normal = cross.normalize();
                let d = -normal.dot(v0);
                let plane = Quadric::from_plane(normal.x, normal.y, normal.z, d);
                for &v in &face {
                    quadrics[v as usize] = quadrics[v as usize].add(&plane);
                }
            }
        }

        let face_alive = vec![true; faces.len()];
        Self {
            positions,
            uvs: mesh.uvs().map(|u| u.to_vec()),
            quadrics,
            faces,
            face_alive,
            vertex_faces,
            bounds: *mesh.bounds(),
        }
    }

    fn run(mut self, target_triangles: usize) -> MeshResource {
        let mut queue = BinaryHeap::new();
        let mut removed = vec![false; self.positions.len()];

        let mut seeded = HashSet::new();
        for face in &self.faces {
            for edge in [(face[0], face[1]), (face[1], face[2]), (face[2], face[0])] {
                let edge = order_edge(edge.0, edge.1);
                if seeded.insert(edge) {
                    queue.push(self.candidate(edge));
                }
            }
        }

        let mut live_triangles = self.faces.len();
        while live_triangles > target_triangles {
            let collapse = match queue.pop() {
                Some(c) => c,
                None => break,
            };
            let (keep, drop) = collapse.edge;
            if removed[keep as usize] || removed[drop as usize] {
                continue;
            }

            removed[drop as usize] = true;
            self.positions[keep as usize] = collapse.target;
            self.quadrics[keep as usize] =
                self.quadrics[keep as usize].add(&self.quadrics[drop as usize]);

            // Rewrite faces that referenced the dropped vertex.
            let affected = std::mem::take(&mut self.vertex_faces[drop as usize]);
            for face_idx in affected {
                if !self.face_alive[face_idx] {
                    continue;
                }
                let face = &mut self.faces[face_idx];
                for v in face.iter_mut() {
                    if *v == drop {
                        *v = keep;
                    }
                }
                if face[0] == face[1] || face[1] == face[2] || face[2] == face[0] {
                    self.face_alive[face_idx] = false;
                    live_triangles -= 1;
                } else {
                    self.vertex_faces[keep as usize].push(face_idx);
                }
            }

            // Refresh candidates around the surviving vertex.
            for &other in self.connected_vertices(keep).iter() {
                if !removed[other as usize] {
                    queue.push(self.candidate(order_edge(keep, other)));
                }
            }
        }

        self.rebuild(&removed)
    }

    fn candidate(&self, edge: (u32, u32)) -> Collapse {
        let (a, b) = edge;
        let combined = self.quadrics[a as usize].add(&self.quadrics[b as usize]);

        // Midpoint placement, clamped into the base bounds so the
        // simplified silhouette cannot drift outside the original volume.
        let mid = (self.positions[a as usize] + self.positions[b as usize]) * 0.5;
        let target = Vector3::new(
            mid.x.clamp(self.bounds.min.x, self.bounds.max.x),
            mid.y.clamp(self.bounds.min.y, self.bounds.max.y),
            mid.z.clamp(self.bounds.min.z, self.bounds.max.z),
        );

        Collapse {
            edge,
            error: combined.error_at(target),
            target,
        }
    }

    fn connected_vertices(&self, vertex: u32) -> Vec<u32> {
        let mut connected = Vec::new();
        for &face_idx in &self.vertex_faces[vertex as usize] {
            if !self.face_alive[face_idx] {
                continue;
            }
            for &v in &self.faces[face_idx] {
                if v != vertex {
                    connected.push(v);
                }
            }
        }
        connected.sort_unstable();
        connected.dedup();
        connected
    }

    fn rebuild(self, removed: &[bool]) -> MeshResource {
        let mut remap = vec![u32::MAX; self.positions.len()];
        let mut positions = Vec::new();
        let mut uvs = self.uvs.as_ref().map(|_| Vec::new());

        for (old_idx, pos) in self.positions.iter().enumerate() {
            if removed[old_idx] {
                continue;
            }
            remap[old_idx] = positions.len() as u32;
            positions.push([pos.x, pos.y, pos.z]);
            if let (Some(out), Some(src)) = (uvs.as_mut(), self.uvs.as_ref()) {
                out.push(src[old_idx]);
            }
        }

        let mut indices = Vec::new();
        for (face_idx, face) in self.faces.iter().enumerate() {
            if !self.face_alive[face_idx] {
                continue;
            }
            let mapped = [
                remap[face[0] as usize],
                remap[face[1] as usize],
                remap[face[2] as usize],
            ];
            if mapped.contains(&u32::MAX) {
                continue;
            }
            if mapped[0] != mapped[1] && mapped[1] != mapped[2] && mapped[2] != mapped[0] {
                indices.extend_from_slice(&mapped);
            }
        }

        let normals = compute_normals(&positions, &indices);
        MeshResource::new(positions, Some(normals), uvs, indices)
    }
}

fn order_edge(a: u32, b: u32) -> (u32, u32) {
    if a < b {
        (a, b)
    } else {
        (b, a)
    }
}

/// Area-weighted vertex normals from face cross products.
fn compute_normals(positions: &[[f32; 3]], indices: &[u32]) -> Vec<[f32; 3]> {
    let mut accumulated = vec![Vector3::zero(); positions.len()];

    for chunk in indices.chunks_exact(3) {
        let v0 = Vector3::from(positions[chunk[0] as usize]);
        let v1 = Vector3::from(positions[chunk[1] as usize]);
        let v2 = Vector3::from(positions[chunk[2] as usize]);
        let face_normal = (v1 - v0).cross(v2 - v0);
        for &idx in chunk {
            accumulated[idx as usize] += face_normal;
        }
    }

    accumulated
        .into_iter()
        .map(|n| {
            if n.magnitude2() > 0.0 {
                n.normalize().into()
            } else {
                [0.0, 1.0, 0.0]
            }
        })
        .collect()
}
