use cgmath::{EuclideanSpace, Point3, Vector3};

/// Axis-aligned bounding box over a mesh's vertex positions.
///
/// External renderers use this for culling and LOD/transform composition;
/// the LOD manager uses the radius for distance scaling.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min: Point3<f32>,
    pub max: Point3<f32>,
}

impl BoundingBox {
    /// Compute the bounds of a position buffer. An empty buffer yields a
    /// degenerate box at the origin.
    pub fn from_positions(positions: &[[f32; 3]]) -> Self {
        if positions.is_empty() {
            return Self {
                min: Point3::origin(),
                max: Point3::origin(),
            };
        }

        let mut min = Point3::new(f32::MAX, f32::MAX, f32::MAX);
        let mut max = Point3::new(f32::MIN, f32::MIN, f32::MIN);
        for p in positions {
            min.x = min.x.min(p[0]);
            min.y = min.y.min(p[1]);
            min.z = min.z.min(p[2]);
            max.x = max.x.max(p[0]);
            max.y = max.y.max(p[1]);
            max.z = max.z.max(p[2]);
        }

        Self { min, max }
    }

    pub fn center(&self) -> Point3<f32> {
        self.min.midpoint(self.max)
    }

    pub fn size(&self) -> Vector3<f32> {
        self.max - self.min
    }

    /// Half the diagonal length; the radius of the enclosing sphere.
    pub fn radius(&self) -> f32 {
        let size = self.size();
        0.5 * (size.x * size.x + size.y * size.y + size.z * size.z).sqrt()
    }
}

/// Immutable mesh handle: vertex positions, optional normals and UVs, and
/// a triangle index buffer. Once constructed a resource is never mutated,
/// only replaced.
#[derive(Debug, Clone)]
pub struct MeshResource {
    positions: Vec<[f32; 3]>,
    normals: Option<Vec<[f32; 3]>>,
    uvs: Option<Vec<[f32; 2]>>,
    indices: Vec<u32>,
    bounds: BoundingBox,
}

impl MeshResource {
    /// Build a resource from raw buffers. Normals and UVs are only kept
    /// when their counts match the vertex count.
    pub fn new(
        positions: Vec<[f32; 3]>,
        normals: Option<Vec<[f32; 3]>>,
        uvs: Option<Vec<[f32; 2]>>,
        indices: Vec<u32>,
    ) -> Self {
        let bounds = BoundingBox::from_positions(&positions);
        let normals = normals.filter(|n| n.len() == positions.len());
        let uvs = uvs.filter(|u| u.len() == positions.len());

        Self {
            positions,
            normals,
            uvs,
            indices,
            bounds,
        }
    }

    pub fn positions(&self) -> &[[f32; 3]] {
        &self.positions
    }

    pub fn normals(&self) -> Option<&[[f32; 3]]> {
        self.normals.as_deref()
    }

    pub fn uvs(&self) -> Option<&[[f32; 2]]> {
        self.uvs.as_deref()
    }

    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    pub fn bounds(&self) -> &BoundingBox {
        &self.bounds
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty() || self.indices.is_empty()
    }

    /// Actual buffer footprint in bytes. The cache memory bound is only
    /// meaningful if this reflects real sizes, not a per-entry constant.
    pub fn size_bytes(&self) -> usize {
        let mut bytes = std::mem::size_of::<Self>();
        bytes += self.positions.len() * std::mem::size_of::<[f32; 3]>();
        if let Some(normals) = &self.normals {
            bytes += normals.len() * std::mem::size_of::<[f32; 3]>();
        }
        if let Some(uvs) = &self.uvs {
            bytes += uvs.len() * std::mem::size_of::<[f32; 2]>();
        }
        bytes += self.indices.len() * std::mem::size_of::<u32>();
        bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounds_cover_all_positions() {
        let mesh = MeshResource::new(
            vec![[-1.0, 0.0, 2.0], [3.0, -2.0, 0.5], [0.0, 4.0, -1.0]],
            None,
            None,
            vec![0, 1, 2],
        );

        let bounds = mesh.bounds();
        assert_eq!(bounds.min, Point3::new(-1.0, -2.0, -1.0));
        assert_eq!(bounds.max, Point3::new(3.0, 4.0, 2.0));
        assert!(bounds.radius() > 0.0);
    }

    #[test]
    fn mismatched_attribute_counts_are_dropped() {
        let mesh = MeshResource::new(
            vec![[0.0; 3], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
            Some(vec![[0.0, 1.0, 0.0]]),
            Some(vec![[0.0, 0.0], [1.0, 0.0], [0.0, 1.0]]),
            vec![0, 1, 2],
        );

        assert!(mesh.normals().is_none());
        assert!(mesh.uvs().is_some());
    }

    #[test]
    fn size_accounts_for_every_buffer() {
        let mesh = MeshResource::new(
            vec![[0.0; 3]; 10],
            Some(vec![[0.0, 1.0, 0.0]; 10]),
            Some(vec![[0.0; 2]; 10]),
            vec![0; 12],
        );

        let expected =
            std::mem::size_of::<MeshResource>() + 10 * 12 + 10 * 12 + 10 * 8 + 12 * 4;
        assert_eq!(mesh.size_bytes(), expected);
    }

    #[test]
    fn empty_mesh_has_degenerate_bounds() {
        let bounds = BoundingBox::from_positions(&[]);
        assert_eq!(bounds.min, Point3::origin());
        assert_eq!(bounds.radius(), 0.0);
    }
}
