//! End-to-end query scenarios on the `Mesh` facade.

use std::collections::HashSet;

use raymesh::{BuildConfig, Mesh, MeshError, Point3, Quality, Ray, RayBatch, RayHit, Vec3};

const QUALITIES: [Quality; 3] = [Quality::Low, Quality::Medium, Quality::High];

fn configs() -> Vec<BuildConfig> {
    let mut out = Vec::new();
    for quality in QUALITIES {
        for robust in [false, true] {
            out.push(BuildConfig::default().with_quality(quality).with_robust(robust));
        }
    }
    out
}

fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn plane(z: f64) -> Mesh {
    Mesh::from_arrays(
        &[[0.0, 0.0, z], [1.0, 0.0, z], [1.0, 1.0, z], [0.0, 1.0, z]],
        &[[0, 1, 2], [2, 3, 0]],
    )
    .unwrap()
}

/// Two unit squares at z=0 and z=10.
fn two_planes() -> Mesh {
    Mesh::from_arrays(
        &[
            [0.0, 0.0, 0.0],
            [1.0, 0.0, 0.0],
            [1.0, 1.0, 0.0],
            [0.0, 1.0, 0.0],
            [0.0, 0.0, 10.0],
            [1.0, 0.0, 10.0],
            [1.0, 1.0, 10.0],
            [0.0, 1.0, 10.0],
        ],
        &[[0, 1, 2], [2, 3, 0], [4, 5, 6], [6, 7, 4]],
    )
    .unwrap()
}

/// `n` unit squares at z = 0, 1, ..., n-1, built by merging.
fn stacked_planes(n: usize) -> Mesh {
    let mut mesh = Mesh::empty();
    for z in 0..n {
        mesh.merge(&plane(z as f64)).unwrap();
    }
    mesh
}

fn ids(v: Vec<u32>) -> HashSet<u32> {
    v.into_iter().collect()
}

#[test]
fn merge_shifts_indices() {
    let mut mesh = plane(0.0);
    mesh.merge(&plane(1.0)).unwrap();
    assert_eq!(mesh.vertices().len(), 8);
    assert_eq!(mesh.triangles().len(), 4);
    assert_eq!(mesh.triangles()[2], [4, 5, 6]);
    assert_eq!(mesh.triangles()[3], [6, 7, 4]);
}

#[test]
fn merge_empty_is_noop() {
    let base = plane(0.0);
    let mut mesh = plane(0.0);
    mesh.merge(&Mesh::empty()).unwrap();
    assert_eq!(mesh.vertices(), base.vertices());
    assert_eq!(mesh.triangles(), base.triangles());
}

#[test]
fn two_planes_traverse() {
    init_logging();
    let mut mesh = two_planes();
    let config = BuildConfig::parse("medium", false).unwrap();
    mesh.build(config).unwrap();

    let down = Ray::new(Point3::new(0.5, 0.5, 0.5), Vec3::new(0.0, 0.0, -1.0));
    assert_eq!(ids(mesh.traverse_all(&down).unwrap()), HashSet::from([0, 1]));
    let lazy: HashSet<u32> = mesh.traverse(&down).unwrap().collect();
    assert_eq!(lazy, HashSet::from([0, 1]));

    let up = Ray::new(Point3::new(0.5, 0.5, 0.5), Vec3::new(0.0, 0.0, 1.0));
    assert_eq!(ids(mesh.traverse_all(&up).unwrap()), HashSet::from([2, 3]));
    let lazy: HashSet<u32> = mesh.traverse(&up).unwrap().collect();
    assert_eq!(lazy, HashSet::from([2, 3]));
}

#[test]
fn two_planes_all_configs() {
    let mut mesh = two_planes();
    for config in configs() {
        mesh.build(config.clone()).unwrap();

        let down = Ray::new(Point3::new(0.5, 0.5, 0.5), Vec3::new(0.0, 0.0, -1.0));
        let hit = mesh.intersect(&down).unwrap().unwrap();
        // the ray crosses the shared diagonal; the lower id wins the tie
        assert_eq!(hit.triangle_id, 0, "{config:?}");
        assert_eq!(hit.t, 0.5);

        let up = Ray::new(Point3::new(0.5, 0.5, 0.5), Vec3::new(0.0, 0.0, 1.0));
        let hit = mesh.intersect(&up).unwrap().unwrap();
        assert_eq!(hit.triangle_id, 2, "{config:?}");
        assert_eq!(hit.t, 9.5);
        assert_eq!(hit.point, Point3::new(0.5, 0.5, 10.0));
    }
}

#[test]
fn stacked_planes_downward() {
    init_logging();
    let mut mesh = stacked_planes(500);
    mesh.build(BuildConfig::default()).unwrap();

    let ray = Ray::new(Point3::new(0.5, 0.5, 249.5), Vec3::new(0.0, 0.0, -1.0));
    let found = mesh.traverse_all(&ray).unwrap();
    assert_eq!(found.len(), 500);
    assert_eq!(ids(found), (0..500).collect::<HashSet<u32>>());
}

#[test]
fn stacked_planes_upward() {
    let mut mesh = stacked_planes(500);
    mesh.build(BuildConfig::default()).unwrap();

    let ray = Ray::new(Point3::new(0.5, 0.5, 249.5), Vec3::new(0.0, 0.0, 1.0));
    let found: Vec<u32> = mesh.traverse(&ray).unwrap().collect();
    assert_eq!(found.len(), 500);
    assert_eq!(ids(found), (500..1000).collect::<HashSet<u32>>());
}

#[test]
fn stacked_planes_every_config() {
    let mut mesh = stacked_planes(64);
    let ray = Ray::new(Point3::new(0.5, 0.5, 31.5), Vec3::new(0.0, 0.0, -1.0));
    for config in configs() {
        mesh.build(config.clone()).unwrap();
        assert_eq!(
            ids(mesh.traverse_all(&ray).unwrap()),
            (0..64).collect::<HashSet<u32>>(),
            "{config:?}"
        );
        let hit = mesh.intersect(&ray).unwrap().unwrap();
        assert_eq!(hit.triangle_id, 62);
        assert_eq!(hit.t, 0.5);
    }
}

#[test]
fn closest_and_occlusion_agree() {
    let mut mesh = stacked_planes(8);
    mesh.merge(&two_planes()).unwrap();

    let mut rays = Vec::new();
    for i in 0..9 {
        for j in 0..9 {
            let x = -0.2 + i as f64 * 0.175;
            let y = -0.2 + j as f64 * 0.175;
            rays.push(Ray::new(Point3::new(x, y, 4.5), Vec3::new(0.1, -0.05, -1.0)));
            rays.push(Ray::new(Point3::new(x, y, 4.5), Vec3::new(0.0, 0.0, 1.0)));
            rays.push(Ray::new(Point3::new(x, y, 4.5), Vec3::new(1.0, 0.0, 0.0)));
        }
    }

    for config in configs() {
        mesh.build(config.clone()).unwrap();
        for ray in &rays {
            let closest = mesh.intersect(ray).unwrap();
            let occluded = mesh.occlusion(ray).unwrap();
            assert_eq!(closest.is_some(), occluded, "{config:?} {ray:?}");

            let lazy: HashSet<u32> = mesh.traverse(ray).unwrap().collect();
            let eager = ids(mesh.traverse_all(ray).unwrap());
            assert_eq!(lazy, eager);
            if let Some(hit) = closest {
                assert!(eager.contains(&hit.triangle_id));
            }
        }
    }
}

#[test]
fn rebuild_is_idempotent() {
    let mut mesh = stacked_planes(30);
    let rays: Vec<Ray> = (0..50)
        .map(|i| {
            let f = i as f64 / 50.0;
            Ray::new(
                Point3::new(f, 1.0 - f, 15.25),
                Vec3::new(0.3 - f * 0.6, f * 0.2 - 0.1, if i % 2 == 0 { -1.0 } else { 1.0 }),
            )
        })
        .collect();

    for config in configs() {
        mesh.build(config.clone()).unwrap();
        let first: Vec<Option<RayHit>> =
            rays.iter().map(|r| mesh.intersect(r).unwrap()).collect();
        mesh.build(config.clone()).unwrap();
        let second: Vec<Option<RayHit>> =
            rays.iter().map(|r| mesh.intersect(r).unwrap()).collect();
        assert_eq!(first, second, "{config:?}");
    }
}

#[test]
fn qualities_agree_on_closest_hit() {
    let mut mesh = stacked_planes(20);
    let rays: Vec<Ray> = (0..40)
        .map(|i| {
            let f = i as f64 / 40.0;
            Ray::new(Point3::new(f, 0.5, 10.3), Vec3::new(0.01, 0.02, -1.0))
        })
        .collect();

    for robust in [false, true] {
        let mut answers = Vec::new();
        for quality in QUALITIES {
            mesh.build(BuildConfig::default().with_quality(quality).with_robust(robust))
                .unwrap();
            let hits: Vec<Option<(u32, f64)>> = rays
                .iter()
                .map(|r| mesh.intersect(r).unwrap().map(|h| (h.triangle_id, h.t)))
                .collect();
            answers.push(hits);
        }
        assert_eq!(answers[0], answers[1]);
        assert_eq!(answers[1], answers[2]);
    }
}

#[test]
fn boundary_rays_are_deterministic() {
    let mut mesh = two_planes();
    let rays = [
        // in the plane of the lower square
        Ray::new(Point3::new(-1.0, 0.5, 0.0), Vec3::new(1.0, 0.0, 0.0)),
        // along the shared diagonal, in plane
        Ray::new(Point3::new(-1.0, -1.0, 0.0), Vec3::new(1.0, 1.0, 0.0)),
        // through the vertex shared by both triangles of each square
        Ray::new(Point3::new(0.0, 0.0, 5.0), Vec3::new(0.0, 0.0, -1.0)),
        Ray::new(Point3::new(1.0, 1.0, 5.0), Vec3::new(0.0, 0.0, 1.0)),
        // through an unshared corner
        Ray::new(Point3::new(1.0, 0.0, 5.0), Vec3::new(0.0, 0.0, -1.0)),
    ];

    for config in configs() {
        mesh.build(config.clone()).unwrap();
        let first: Vec<_> = rays
            .iter()
            .map(|r| (mesh.intersect(r).unwrap(), mesh.occlusion(r).unwrap()))
            .collect();
        for _ in 0..5 {
            mesh.build(config.clone()).unwrap();
            let again: Vec<_> = rays
                .iter()
                .map(|r| (mesh.intersect(r).unwrap(), mesh.occlusion(r).unwrap()))
                .collect();
            assert_eq!(first, again, "{config:?}");
        }

        // shared vertex (0,0,0): both triangles contain it, id 0 wins
        let hit = first[2].0.expect("shared vertex is inside both triangles");
        assert_eq!(hit.triangle_id, 0);
        assert_eq!(hit.t, 5.0);
    }
}

#[test]
fn batches_match_single_queries() {
    let mut mesh = stacked_planes(10);
    mesh.build(BuildConfig::default()).unwrap();

    let origins: Vec<Point3> = (0..200)
        .map(|i| Point3::new((i % 20) as f64 * 0.07 - 0.2, (i / 20) as f64 * 0.13, 4.7))
        .collect();
    let batch = RayBatch::shared_direction(origins.clone(), Vec3::new(0.0, 0.0, -1.0));

    let hits = mesh.intersect_batch(&batch).unwrap();
    let occluded = mesh.occlusion_batch(&batch).unwrap();
    assert_eq!(hits.len(), 200);
    for (i, origin) in origins.iter().enumerate() {
        let ray = Ray::new(*origin, Vec3::new(0.0, 0.0, -1.0));
        assert_eq!(hits[i], mesh.intersect(&ray).unwrap(), "ray {i}");
        assert_eq!(occluded[i], mesh.occlusion(&ray).unwrap(), "ray {i}");
    }
}

#[test]
fn batch_errors_surface_as_invalid_rays() {
    let mut mesh = plane(0.0);
    mesh.build_default().unwrap();
    let batch = RayBatch::per_ray(vec![Point3::origin(); 2], vec![Vec3::z(); 3]);
    assert!(matches!(
        mesh.intersect_batch(&batch),
        Err(MeshError::InvalidRays(_))
    ));
    assert!(matches!(
        mesh.occlusion_batch(&batch),
        Err(MeshError::InvalidRays(_))
    ));
}

#[test]
fn reflection_off_hit() {
    let mut mesh = plane(0.0);
    mesh.build_default().unwrap();
    let dir = Vec3::new(1.0, 0.0, -1.0);
    let ray = Ray::new(Point3::new(0.25, 0.5, 0.5), dir);
    let hit = mesh.intersect(&ray).unwrap().unwrap();
    let reflected = hit.reflect(&dir);
    approx::assert_relative_eq!(reflected, Vec3::new(1.0, 0.0, 1.0), epsilon = 1e-12);
}
