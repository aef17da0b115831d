//! End-to-end tests for the mesh pipeline facade: load deduplication,
//! fallback policy, cache bounds, and cancellation.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use worldmesh::procedural::SphereParams;
use worldmesh::{
    AssetLoader, AvatarAppearance, GraphicsConfig, MeshError, MeshResource, MeshResult,
    MeshSystem, PlatformLoader, ProceduralMeshType, QualityLevel,
};

/// Platform loader that counts invocations and serves a fixed triangle
/// after a configurable delay.
struct CountingLoader {
    calls: Arc<AtomicUsize>,
    delay: Duration,
}

impl PlatformLoader for CountingLoader {
    fn load(&self, _path: &Path) -> MeshResult<MeshResource> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        std::thread::sleep(self.delay);
        Ok(MeshResource::new(
            vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
            None,
            None,
            vec![0, 1, 2],
        ))
    }
}

fn counting_system(delay: Duration) -> (Arc<MeshSystem>, Arc<AtomicUsize>) {
    let _ = env_logger::builder().is_test(true).try_init();
    let calls = Arc::new(AtomicUsize::new(0));
    let loader = AssetLoader::with_platform_loader(Arc::new(CountingLoader {
        calls: Arc::clone(&calls),
        delay,
    }));
    let system = MeshSystem::with_loader(GraphicsConfig::default(), loader);
    (system, calls)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_loads_for_one_key_issue_one_underlying_load() {
    let (system, calls) = counting_system(Duration::from_millis(50));

    let mut waiters = Vec::new();
    for _ in 0..12 {
        let system = Arc::clone(&system);
        waiters.push(tokio::spawn(async move {
            system.load_mesh("relic.glb", 0).await
        }));
    }

    let mut meshes = Vec::new();
    for waiter in waiters {
        meshes.push(waiter.await.unwrap().unwrap());
    }

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    for pair in meshes.windows(2) {
        assert!(Arc::ptr_eq(&pair[0], &pair[1]));
    }
}

#[tokio::test]
async fn distinct_keys_load_independently() {
    let (system, calls) = counting_system(Duration::from_millis(1));

    system.load_mesh("a.glb", 0).await.unwrap();
    system.load_mesh("b.glb", 0).await.unwrap();
    system.load_mesh("a.glb", 0).await.unwrap();

    // Third request hits the cache.
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn nonexistent_assets_resolve_to_renderable_fallbacks() {
    let system = MeshSystem::new(GraphicsConfig::default());

    for name in ["whispering_tree", "resonance_crystal", "no_such_thing_42"] {
        let mesh = system.load_mesh(name, 0).await.unwrap();
        assert!(mesh.vertex_count() > 0, "'{}' produced empty geometry", name);
        assert!(mesh.triangle_count() > 0);
    }

    let report = {
        system.clear_caches();
        system.metrics()
    };
    assert_eq!(report.fallbacks, 3);
}

#[tokio::test]
async fn avatar_fallback_matches_humanoid_proportions() {
    let system = MeshSystem::new(GraphicsConfig::default());
    let mesh = system.load_mesh("avatar_base", 0).await.unwrap();

    let size = mesh.bounds().size();
    assert!((size.y - 1.8).abs() < 1e-3);
    assert!((size.x - 0.5).abs() < 1e-3);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn clearing_caches_cancels_in_flight_waiters() {
    let (system, _calls) = counting_system(Duration::from_millis(500));

    let waiter = {
        let system = Arc::clone(&system);
        tokio::spawn(async move { system.load_mesh("slow.glb", 0).await })
    };

    // Let the load reach the platform loader, then pull the rug.
    tokio::time::sleep(Duration::from_millis(50)).await;
    system.clear_caches();

    let outcome = waiter.await.unwrap();
    assert!(matches!(outcome, Err(MeshError::Cancelled { .. })));
}

#[tokio::test]
async fn entry_bound_survives_a_generation_burst() {
    let config = GraphicsConfig {
        max_cache_entries: 100,
        ..GraphicsConfig::default()
    };
    let system = MeshSystem::new(config);

    for i in 0..150 {
        let shape = ProceduralMeshType::Sphere(SphereParams {
            radius: 1.0 + i as f32 * 0.01,
            segments: Some(4),
        });
        system.generate_mesh(&shape).await.unwrap();
    }

    assert!(system.mesh_statistics().entry_count <= 100);
}

#[tokio::test]
async fn avatars_survive_cache_pressure() {
    let config = GraphicsConfig {
        max_cache_entries: 50,
        ..GraphicsConfig::default()
    };
    let system = MeshSystem::new(config);

    let avatar = system.create_avatar_mesh(&AvatarAppearance::default()).await;
    for i in 0..80 {
        let shape = ProceduralMeshType::Sphere(SphereParams {
            radius: 1.0 + i as f32 * 0.01,
            segments: Some(4),
        });
        system.generate_mesh(&shape).await.unwrap();
    }

    let again = system.create_avatar_mesh(&AvatarAppearance::default()).await;
    assert!(Arc::ptr_eq(&avatar, &again));
}

#[tokio::test]
async fn preload_warms_the_cache() {
    let (system, calls) = counting_system(Duration::from_millis(1));

    system.preload(&["a.glb", "b.glb", "c.glb"]).await;
    assert_eq!(calls.load(Ordering::SeqCst), 3);

    system.load_mesh("b.glb", 0).await.unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn quality_switch_reoptimizes_without_clearing() {
    let system = MeshSystem::new(GraphicsConfig::default());

    system.load_mesh("mossy_rock", 0).await.unwrap();
    let before = system.mesh_statistics().entry_count;
    assert!(before > 0);

    system.set_quality(QualityLevel::Ultra);
    // Raising quality must not flush resident geometry.
    assert_eq!(system.mesh_statistics().entry_count, before);
}

#[tokio::test]
async fn lod_chain_counts_are_non_increasing() {
    let system = MeshSystem::new(GraphicsConfig::default());

    let chain = system.load_mesh_with_lod("glowing_orb").await.unwrap();
    assert!(!chain.is_empty());
    assert_eq!(chain[0].level, 0);
    for pair in chain.windows(2) {
        assert!(pair[1].vertex_count <= pair[0].vertex_count);
    }
}
