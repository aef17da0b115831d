use cgmath::{Point3, Vector3};

use super::MeshResource;

/// Incremental mesh assembly with shared vertex/index buffers.
///
/// Composite generators append sub-shapes one after another; every append
/// rebases the incoming indices by the running vertex count so the final
/// buffers stay consistent.
#[derive(Debug, Default)]
pub struct MeshBuilder {
    positions: Vec<[f32; 3]>,
    normals: Vec<[f32; 3]>,
    uvs: Vec<[f32; 2]>,
    indices: Vec<u32>,
}

impl MeshBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(vertices: usize, indices: usize) -> Self {
        Self {
            positions: Vec::with_capacity(vertices),
            normals: Vec::with_capacity(vertices),
            uvs: Vec::with_capacity(vertices),
            indices: Vec::with_capacity(indices),
        }
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    /// Push a vertex and return its index.
    pub fn push_vertex(&mut self, position: [f32; 3], normal: [f32; 3], uv: [f32; 2]) -> u32 {
        let index = self.positions.len() as u32;
        self.positions.push(position);
        self.normals.push(normal);
        self.uvs.push(uv);
        index
    }

    pub fn push_triangle(&mut self, a: u32, b: u32, c: u32) {
        self.indices.extend_from_slice(&[a, b, c]);
    }

    /// Append four vertices as two triangles, (0,1,2) and (0,2,3).
    pub fn push_quad(&mut self, corners: [[f32; 3]; 4], normal: [f32; 3]) {
        let base = self.positions.len() as u32;
        let quad_uvs = [[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]];
        for (corner, uv) in corners.iter().zip(quad_uvs) {
            self.push_vertex(*corner, normal, uv);
        }
        self.indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
    }

    /// Append an axis-aligned box with per-face normals.
    pub fn push_box(&mut self, center: Point3<f32>, size: Vector3<f32>) {
        let h = size * 0.5;
        let (cx, cy, cz) = (center.x, center.y, center.z);

        // +X
        self.push_quad(
            [
                [cx + h.x, cy - h.y, cz + h.z],
                [cx + h.x, cy - h.y, cz - h.z],
                [cx + h.x, cy + h.y, cz - h.z],
                [cx + h.x, cy + h.y, cz + h.z],
            ],
            [1.0, 0.0, 0.0],
        );
        // -X
        self.push_quad(
            [
                [cx - h.x, cy - h.y, cz - h.z],
                [cx - h.x, cy - h.y, cz + h.z],
                [cx - h.x, cy + h.y, cz + h.z],
                [cx - h.x, cy + h.y, cz - h.z],
            ],
            [-1.0, 0.0, 0.0],
        );
        // +Y
        self.push_quad(
            [
                [cx - h.x, cy + h.y, cz + h.z],
                [cx + h.x, cy + h.y, cz + h.z],
                [cx + h.x, cy + h.y, cz - h.z],
                [cx - h.x, cy + h.y, cz - h.z],
            ],
            [0.0, 1.0, 0.0],
        );
        // -Y
        self.push_quad(
            [
                [cx - h.x, cy - h.y, cz - h.z],
                [cx + h.x, cy - h.y, cz - h.z],
                [cx + h.x, cy - h.y, cz + h.z],
                [cx - h.x, cy - h.y, cz + h.z],
            ],
            [0.0, -1.0, 0.0],
        );
        // +Z
        self.push_quad(
            [
                [cx - h.x, cy - h.y, cz + h.z],
                [cx + h.x, cy - h.y, cz + h.z],
                [cx + h.x, cy + h.y, cz + h.z],
                [cx - h.x, cy + h.y, cz + h.z],
            ],
            [0.0, 0.0, 1.0],
        );
        // -Z
        self.push_quad(
            [
                [cx + h.x, cy - h.y, cz - h.z],
                [cx - h.x, cy - h.y, cz - h.z],
                [cx - h.x, cy + h.y, cz - h.z],
                [cx + h.x, cy + h.y, cz - h.z],
            ],
            [0.0, 0.0, -1.0],
        );
    }

    /// Append another mesh's buffers, rebasing its indices by the current
    /// vertex count. Missing attributes fill with defaults so the shared
    /// buffers stay aligned.
    pub fn append(&mut self, mesh: &MeshResource) {
        self.append_translated(mesh, Vector3::new(0.0, 0.0, 0.0));
    }

    /// Append a mesh with its positions offset by `offset`.
    pub fn append_translated(&mut self, mesh: &MeshResource, offset: Vector3<f32>) {
        let base = self.positions.len() as u32;

        self.positions.extend(
            mesh.positions()
                .iter()
                .map(|p| [p[0] + offset.x, p[1] + offset.y, p[2] + offset.z]),
        );
        match mesh.normals() {
            Some(normals) => self.normals.extend_from_slice(normals),
            None => self
                .normals
                .extend(std::iter::repeat([0.0, 1.0, 0.0]).take(mesh.vertex_count())),
        }
        match mesh.uvs() {
            Some(uvs) => self.uvs.extend_from_slice(uvs),
            None => self
                .uvs
                .extend(std::iter::repeat([0.0, 0.0]).take(mesh.vertex_count())),
        }
        self.indices.extend(mesh.indices().iter().map(|i| i + base));
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty() || self.indices.is_empty()
    }

    pub fn build(self) -> MeshResource {
        MeshResource::new(
            self.positions,
            Some(self.normals),
            Some(self.uvs),
            self.indices,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn box_has_per_face_vertices() {
        let mut builder = MeshBuilder::new();
        builder.push_box(Point3::new(0.0, 0.0, 0.0), Vector3::new(1.0, 1.0, 1.0));
        let mesh = builder.build();

        assert_eq!(mesh.vertex_count(), 24);
        assert_eq!(mesh.triangle_count(), 12);
        assert_eq!(mesh.bounds().size(), Vector3::new(1.0, 1.0, 1.0));
    }

    #[test]
    fn append_rebases_indices() {
        let mut first = MeshBuilder::new();
        first.push_box(Point3::new(0.0, 0.0, 0.0), Vector3::new(1.0, 1.0, 1.0));
        let box_mesh = first.build();

        let mut builder = MeshBuilder::new();
        builder.append(&box_mesh);
        builder.append(&box_mesh);
        let combined = builder.build();

        assert_eq!(combined.vertex_count(), 48);
        assert_eq!(combined.triangle_count(), 24);
        // Second copy's smallest index starts past the first copy's vertices.
        let min_second = combined.indices()[36..].iter().min().copied().unwrap();
        assert_eq!(min_second, 24);
    }

    #[test]
    fn translated_append_shifts_bounds() {
        let mut first = MeshBuilder::new();
        first.push_box(Point3::new(0.0, 0.0, 0.0), Vector3::new(1.0, 1.0, 1.0));
        let box_mesh = first.build();

        let mut builder = MeshBuilder::new();
        builder.append_translated(&box_mesh, Vector3::new(0.0, 5.0, 0.0));
        let shifted = builder.build();

        assert_eq!(shifted.bounds().min.y, 4.5);
        assert_eq!(shifted.bounds().max.y, 5.5);
    }
}
