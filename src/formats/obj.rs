//! Text polygon format parser.
//!
//! Line-oriented directives: `v` position, `vn` normal (normalized on
//! read), `vt` UV, `f` face with 1-based indices. Polygonal faces are
//! fan-triangulated from their first vertex. Normals and UVs attach to
//! the mesh only when their counts match the vertex count; a mismatch
//! drops the attribute rather than failing the whole parse.

use cgmath::{InnerSpace, Vector3};

use crate::error::{MeshError, MeshResult};
use crate::mesh::MeshResource;

/// Parse text polygon data into a mesh.
pub fn parse(text: &str) -> MeshResult<MeshResource> {
    let mut positions: Vec<[f32; 3]> = Vec::new();
    let mut normals: Vec<[f32; 3]> = Vec::new();
    let mut uvs: Vec<[f32; 2]> = Vec::new();
    let mut indices: Vec<u32> = Vec::new();

    for (line_idx, raw_line) in text.lines().enumerate() {
        let line_no = line_idx + 1;
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let mut tokens = line.split_whitespace();
        let directive = match tokens.next() {
            Some(d) => d,
            None => continue,
        };
        let rest: Vec<&str> = tokens.collect();

        match directive {
            "v" => positions.push(parse_vec3(&rest, line_no)?),
            "vn" => {
                let n = parse_vec3(&rest, line_no)?;
                let v = Vector3::from(n);
                if v.magnitude2() > 0.0 {
                    normals.push(v.normalize().into());
                } else {
                    normals.push(n);
                }
            }
            "vt" => uvs.push(parse_vec2(&rest, line_no)?),
            "f" => {
                if rest.len() < 3 {
                    return Err(MeshError::invalid_format(
                        line_no,
                        format!("face references {} vertices, need at least 3", rest.len()),
                    ));
                }

                let refs: Vec<u32> = rest
                    .iter()
                    .map(|r| parse_face_ref(r, positions.len(), line_no))
                    .collect::<MeshResult<_>>()?;

                // Fan triangulation from the first referenced vertex.
                for i in 1..refs.len() - 1 {
                    indices.extend_from_slice(&[refs[0], refs[i], refs[i + 1]]);
                }
            }
            // Object/group/material/smoothing directives carry no geometry.
            _ => {}
        }
    }

    let vertex_count = positions.len();
    Ok(MeshResource::new(
        positions,
        (normals.len() == vertex_count && vertex_count > 0).then_some(normals),
        (uvs.len() == vertex_count && vertex_count > 0).then_some(uvs),
        indices,
    ))
}

fn parse_vec3(tokens: &[&str], line_no: usize) -> MeshResult<[f32; 3]> {
    if tokens.len() < 3 {
        return Err(MeshError::invalid_format(
            line_no,
            format!("expected 3 components, found {}", tokens.len()),
        ));
    }
    Ok([
        parse_float(tokens[0], line_no)?,
        parse_float(tokens[1], line_no)?,
        parse_float(tokens[2], line_no)?,
    ])
}

fn parse_vec2(tokens: &[&str], line_no: usize) -> MeshResult<[f32; 2]> {
    if tokens.len() < 2 {
        return Err(MeshError::invalid_format(
            line_no,
            format!("expected 2 components, found {}", tokens.len()),
        ));
    }
    Ok([parse_float(tokens[0], line_no)?, parse_float(tokens[1], line_no)?])
}

fn parse_float(token: &str, line_no: usize) -> MeshResult<f32> {
    token
        .parse::<f32>()
        .map_err(|_| MeshError::invalid_format(line_no, format!("invalid number '{}'", token)))
}

/// Resolve one face reference to a 0-based position index.
///
/// References may carry `/vt` and `/vn` parts; only the position index
/// selects geometry here, attributes are matched positionally at the mesh
/// level. Negative indices count back from the latest vertex.
fn parse_face_ref(token: &str, position_count: usize, line_no: usize) -> MeshResult<u32> {
    let index_part = token.split('/').next().unwrap_or(token);
    let raw: i64 = index_part
        .parse()
        .map_err(|_| MeshError::invalid_format(line_no, format!("invalid face index '{}'", token)))?;

    let resolved = if raw < 0 {
        position_count as i64 + raw
    } else if raw > 0 {
        raw - 1
    } else {
        return Err(MeshError::invalid_format(line_no, "face index 0 is not valid"));
    };

    if resolved < 0 || resolved >= position_count as i64 {
        return Err(MeshError::invalid_format(
            line_no,
            format!("face index {} is out of range ({} vertices)", raw, position_count),
        ));
    }
    Ok(resolved as u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    const QUAD: &str = "\
v 0 0 0
v 1 0 0
v 1 1 0
v 0 1 0
f 1 2 3 4
";

    #[test]
    fn quad_fan_triangulates_to_two_triangles() {
        let mesh = parse(QUAD).unwrap();
        assert_eq!(mesh.vertex_count(), 4);
        assert_eq!(mesh.indices(), &[0, 1, 2, 0, 2, 3]);
    }

    #[test]
    fn short_face_is_invalid() {
        let err = parse("v 0 0 0\nv 1 0 0\nf 1 2\n").unwrap_err();
        assert!(matches!(err, MeshError::InvalidFormat { line: 3, .. }));
    }

    #[test]
    fn triplet_references_select_positions() {
        let text = "\
v 0 0 0
v 1 0 0
v 0 1 0
vt 0 0
vt 1 0
vt 0 1
vn 0 0 1
vn 0 0 1
vn 0 0 1
f 1/1/1 2/2/2 3/3/3
";
        let mesh = parse(text).unwrap();
        assert_eq!(mesh.indices(), &[0, 1, 2]);
        assert!(mesh.normals().is_some());
        assert!(mesh.uvs().is_some());
    }

    #[test]
    fn negative_indices_count_backwards() {
        let mesh = parse("v 0 0 0\nv 1 0 0\nv 0 1 0\nf -3 -2 -1\n").unwrap();
        assert_eq!(mesh.indices(), &[0, 1, 2]);
    }

    #[test]
    fn mismatched_normal_count_drops_normals() {
        let text = "v 0 0 0\nv 1 0 0\nv 0 1 0\nvn 0 1 0\nf 1 2 3\n";
        let mesh = parse(text).unwrap();
        assert!(mesh.normals().is_none());
    }

    #[test]
    fn normals_are_normalized_on_read() {
        let text = "v 0 0 0\nv 1 0 0\nv 0 1 0\nvn 0 0 5\nvn 0 3 0\nvn 2 0 0\nf 1 2 3\n";
        let mesh = parse(text).unwrap();
        let normals = mesh.normals().unwrap();
        assert_eq!(normals[0], [0.0, 0.0, 1.0]);
        assert_eq!(normals[1], [0.0, 1.0, 0.0]);
        assert_eq!(normals[2], [1.0, 0.0, 0.0]);
    }

    #[test]
    fn out_of_range_face_index_is_invalid() {
        let err = parse("v 0 0 0\nf 1 2 3\n").unwrap_err();
        assert!(matches!(err, MeshError::InvalidFormat { .. }));
    }

    #[test]
    fn comments_and_unknown_directives_are_skipped() {
        let text = "# header\no cube\ns off\nusemtl stone\nv 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n";
        let mesh = parse(text).unwrap();
        assert_eq!(mesh.triangle_count(), 1);
    }
}
