//! On-disk text polygon loading through the asset loader and the system
//! facade.

use std::io::Write;
use std::sync::Arc;

use anyhow::Result;
use tempfile::TempDir;
use worldmesh::{AssetLoader, GraphicsConfig, MeshError, MeshFormat, MeshSystem};

fn write_asset(dir: &TempDir, name: &str, content: &str) -> Result<String> {
    let path = dir.path().join(name);
    let mut file = std::fs::File::create(&path)?;
    file.write_all(content.as_bytes())?;
    Ok(path.to_string_lossy().into_owned())
}

const CUBE: &str = "\
# unit cube
v -0.5 -0.5 -0.5
v  0.5 -0.5 -0.5
v  0.5  0.5 -0.5
v -0.5  0.5 -0.5
v -0.5 -0.5  0.5
v  0.5 -0.5  0.5
v  0.5  0.5  0.5
v -0.5  0.5  0.5
f 1 2 3 4
f 8 7 6 5
f 1 5 6 2
f 2 6 7 3
f 3 7 8 4
f 4 8 5 1
";

/// A flat dense grid, enough geometry for LOD decimation to bite.
fn grid_obj(side: usize) -> String {
    let mut text = String::new();
    for z in 0..side {
        for x in 0..side {
            text.push_str(&format!("v {} 0 {}\n", x, z));
        }
    }
    for z in 0..side - 1 {
        for x in 0..side - 1 {
            let a = z * side + x + 1;
            let b = a + 1;
            let c = a + side;
            let d = c + 1;
            text.push_str(&format!("f {} {} {}\n", a, c, b));
            text.push_str(&format!("f {} {} {}\n", b, c, d));
        }
    }
    text
}

#[tokio::test]
async fn cube_file_loads_with_fan_triangulated_quads() -> Result<()> {
    let dir = TempDir::new()?;
    let path = write_asset(&dir, "cube.obj", CUBE)?;

    let loader = AssetLoader::new();
    let mesh = loader.load_mesh(&path, None, 0).await?;

    assert_eq!(mesh.vertex_count(), 8);
    assert_eq!(mesh.triangle_count(), 12);
    let size = mesh.bounds().size();
    assert_eq!((size.x, size.y, size.z), (1.0, 1.0, 1.0));
    Ok(())
}

#[tokio::test]
async fn explicit_format_override_skips_detection() -> Result<()> {
    let dir = TempDir::new()?;
    let path = write_asset(&dir, "cube.mesh", CUBE)?;

    let loader = AssetLoader::new();
    let mesh = loader.load_mesh(&path, Some(MeshFormat::Obj), 0).await?;
    assert_eq!(mesh.triangle_count(), 12);
    Ok(())
}

#[tokio::test]
async fn malformed_faces_surface_invalid_format() -> Result<()> {
    let dir = TempDir::new()?;
    let path = write_asset(&dir, "broken.obj", "v 0 0 0\nv 1 0 0\nf 1 2\n")?;

    let loader = AssetLoader::new();
    let err = loader.load_mesh(&path, None, 0).await.unwrap_err();
    assert!(matches!(err, MeshError::InvalidFormat { line: 3, .. }));
    Ok(())
}

#[tokio::test]
async fn file_without_geometry_reports_no_mesh() -> Result<()> {
    let dir = TempDir::new()?;
    let path = write_asset(&dir, "empty.obj", "# nothing here\no empty\n")?;

    let loader = AssetLoader::new();
    let err = loader.load_mesh(&path, None, 0).await.unwrap_err();
    assert!(matches!(err, MeshError::NoMeshFound { .. }));
    Ok(())
}

#[tokio::test]
async fn system_caches_file_loads() -> Result<()> {
    let dir = TempDir::new()?;
    let path = write_asset(&dir, "cube.obj", CUBE)?;

    let system = MeshSystem::new(GraphicsConfig::default());
    let first = system.load_mesh(&path, 0).await?;
    let second = system.load_mesh(&path, 0).await?;

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(system.mesh_statistics().entry_count, 1);
    Ok(())
}

#[tokio::test]
async fn broken_files_still_resolve_through_the_system() -> Result<()> {
    let dir = TempDir::new()?;
    let path = write_asset(&dir, "broken.obj", "v 0 0 0\nf 1 1\n")?;

    let system = MeshSystem::new(GraphicsConfig::default());
    let mesh = system.load_mesh(&path, 0).await?;
    assert!(mesh.vertex_count() > 0);
    Ok(())
}

#[tokio::test]
async fn lod_chain_from_a_dense_file_decimates() -> Result<()> {
    let dir = TempDir::new()?;
    let path = write_asset(&dir, "terrain_patch.obj", &grid_obj(12))?;

    let system = MeshSystem::new(GraphicsConfig::default());
    let chain = system.load_mesh_with_lod(&path).await?;

    assert!(chain.len() >= 2, "expected at least one reduced level");
    assert_eq!(chain[0].vertex_count, 144);
    for pair in chain.windows(2) {
        assert!(pair[1].vertex_count <= pair[0].vertex_count);
    }

    // Reduced variants are resolvable straight from the cache afterwards.
    let lod1 = system.load_mesh(&path, 1).await?;
    assert!(lod1.vertex_count() <= 144);
    Ok(())
}
