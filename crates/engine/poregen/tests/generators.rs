//! End-to-end checks of the generators on moderately sized grids
//!
//! Every test uses a seeded StdRng so failures reproduce.

use poregen::calibrate::{bisect, BisectParams, Response};
use poregen::{
    blobs, bundle_of_tubes, cylinders, lattice_spheres, overlapping_spheres, perlin_noise,
    pseudo_gravity_packing, rsa, voronoi_edges, BlobParams, CylinderParams, FiberTarget,
    GravityParams, Lattice, LatticeParams, NoiseField, NoiseParams, OverlappingParams, RsaMode,
    RsaParams, VoronoiParams,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use voxel::morphology::sphere_volume;
use voxel::Grid;

#[test]
fn test_rsa_reaches_volume_fraction_without_overlap() {
    let im = Grid::new(&[200, 200], false);
    let mut rng = StdRng::seed_from_u64(42);
    let mut params = RsaParams::new(5);
    params.volume_fraction = 0.3;
    let packing = rsa(&im, &params, &mut rng).unwrap();

    let per_sphere = sphere_volume(2, 5.0);
    let template_fraction = per_sphere as f64 / 40_000.0;
    assert!(packing.volume_fraction > 0.3);
    assert!(packing.volume_fraction <= 0.3 + template_fraction + 1e-12);

    // Disjoint, fully contained disks: every sphere adds its whole template
    assert_eq!(packing.image.count_true(), packing.inserted * per_sphere);
    assert!((packing.image.fraction_true() - packing.volume_fraction).abs() < 1e-9);
}

#[test]
fn test_rsa_extended_spheres_may_be_cut() {
    let im = Grid::new(&[40, 40], false);
    let mut rng = StdRng::seed_from_u64(7);
    let mut params = RsaParams::new(4);
    params.mode = RsaMode::Extended;
    let packing = rsa(&im, &params, &mut rng).unwrap();
    assert!(packing.inserted > 0);
    assert!(packing.image.count_true() <= packing.inserted * sphere_volume(2, 4.0));
    assert!(packing.volume_fraction >= packing.image.fraction_true());
}

#[test]
fn test_rsa_respects_existing_solid() {
    // Left half already occupied
    let im = Grid::from_fn(&[60, 60], |c| c[1] < 30);
    let mut rng = StdRng::seed_from_u64(3);
    let packing = rsa(&im, &RsaParams::new(3), &mut rng).unwrap();
    assert!(packing.inserted > 0);
    let added = packing.image.count_true() - im.count_true();
    assert_eq!(added, packing.inserted * sphere_volume(2, 3.0));
}

#[test]
fn test_overlapping_spheres_calibrate_within_tolerance() {
    let mut rng = StdRng::seed_from_u64(11);
    let mut params = OverlappingParams::new(4.0, 0.6);
    params.iter_max = 20;
    let out = overlapping_spheres(&[200, 200], &params, &mut rng).unwrap();
    assert!(out.calibration.converged);
    assert!(out.calibration.error() <= params.tol);
    assert!((out.image.fraction_true() - out.calibration.achieved).abs() < 1e-12);
}

#[test]
fn test_overlapping_error_shrinks_with_more_rounds() {
    let mut params = OverlappingParams::new(3.0, 0.5);
    let errors: Vec<f64> = (1..=10)
        .map(|iter_max| {
            params.iter_max = iter_max;
            let mut rng = StdRng::seed_from_u64(21);
            let out = overlapping_spheres(&[100, 100], &params, &mut rng).unwrap();
            assert_eq!(out.calibration.achieved, out.image.fraction_true());
            out.calibration.error()
        })
        .collect();
    for (k, pair) in errors.windows(2).enumerate() {
        assert!(
            pair[1] <= pair[0] + params.tol,
            "error grew from {:.4} to {:.4} at iter_max {}",
            pair[0],
            pair[1],
            k + 2
        );
        assert!(pair[1] <= pair[0]);
    }
}

#[test]
fn test_bisection_on_a_feasible_target() {
    let search = BisectParams {
        lower: 0u64,
        upper: 10_000,
        target: 0.25,
        tol: 0.005,
        max_iter: 40,
        response: Response::Decreasing,
    };
    let (_, cal) = bisect(&search, |n| Ok((1.0 / (1.0 + n as f64 / 100.0), ()))).unwrap();
    assert!(cal.converged);
    assert!(cal.error() <= 0.005);
}

#[test]
fn test_cylinder_batches_are_monotone() {
    let mut rng = StdRng::seed_from_u64(5);
    let target = FiberTarget::Porosity {
        porosity: 0.7,
        max_iter: 3,
    };
    let mat = cylinders(&[40, 40, 40], &target, &CylinderParams::new(2.0), &mut rng).unwrap();
    assert_eq!(mat.batches.len(), 3);
    assert!(mat.batches.windows(2).all(|w| w[0].fibers <= w[1].fibers));
    assert!(mat.batches.windows(2).all(|w| w[0].porosity >= w[1].porosity));
    assert_eq!(mat.batches.last().map(|b| b.fibers), Some(mat.fibers));
    assert!(mat.fibers > 0);
    assert!(mat.image.fraction_true() < 1.0);
}

#[test]
fn test_fiber_batches_that_add_nothing_still_terminate() {
    let mut rng = StdRng::seed_from_u64(6);
    let target = FiberTarget::Porosity {
        porosity: 1.0,
        max_iter: 3,
    };
    let mat = cylinders(&[20, 20, 20], &target, &CylinderParams::new(2.0), &mut rng).unwrap();
    assert_eq!(mat.fibers, 0);
    assert_eq!(mat.batches.len(), 3);
    assert!(mat.batches.iter().all(|b| b.fibers == 0 && b.porosity == 1.0));
    assert_eq!(mat.image.count_true(), 8000);
}

#[test]
fn test_flat_faces_put_edges_on_every_face() {
    let mut rng = StdRng::seed_from_u64(17);
    let params = VoronoiParams {
        radius: 1.0,
        ncells: 20,
        flat_faces: true,
    };
    let out = voronoi_edges(&[30, 30, 30], &params, &mut rng).unwrap();
    assert!(out.drawn > 0);
    let solid = !&out.image;
    for axis in 0..3 {
        for index in [0, 29] {
            let on_face = Grid::from_fn(&[30, 30, 30], |c| c[axis] == index && solid[c]);
            assert!(
                on_face.count_true() > 0,
                "no edges on face {} of axis {}",
                index,
                axis
            );
        }
    }
}

/// Fraction of the drawn edge endpoints that snap onto a face of the box.
fn boundary_vertex_rate(out: &poregen::VoronoiEdges, n: usize) -> f64 {
    let snap = |v: usize| -> [isize; 3] {
        let p = out.tessellation.vertices[v];
        [p.x, p.y, p.z].map(|c| (c.round_ties_even() * (n as f64 - 1.0) / n as f64) as isize)
    };
    let inside = |p: &[isize; 3]| p.iter().all(|&c| c >= 0 && c < n as isize);
    let mut endpoints: Vec<usize> = out
        .tessellation
        .edges()
        .into_iter()
        .filter(|&[a, b]| inside(&snap(a)) && inside(&snap(b)))
        .flat_map(|[a, b]| [a, b])
        .collect();
    endpoints.sort_unstable();
    endpoints.dedup();
    assert!(!endpoints.is_empty());
    let on_face = endpoints
        .iter()
        .filter(|&&v| snap(v).iter().any(|&c| c == 0 || c == n as isize - 1))
        .count();
    on_face as f64 / endpoints.len() as f64
}

#[test]
fn test_flat_faces_raise_boundary_vertex_rate() {
    for seed in [17, 18, 19] {
        let mut params = VoronoiParams {
            radius: 1.0,
            ncells: 20,
            flat_faces: true,
        };
        let flat = voronoi_edges(&[30, 30, 30], &params, &mut StdRng::seed_from_u64(seed)).unwrap();
        params.flat_faces = false;
        let curved = voronoi_edges(&[30, 30, 30], &params, &mut StdRng::seed_from_u64(seed)).unwrap();

        let flat_rate = boundary_vertex_rate(&flat, 30);
        let curved_rate = boundary_vertex_rate(&curved, 30);
        assert!(
            flat_rate > 2.0 * curved_rate && flat_rate > 0.25,
            "seed {}: flat {:.3} vs curved {:.3}",
            seed,
            flat_rate,
            curved_rate
        );
    }
}

#[test]
fn test_gravity_packing_fills_from_below() {
    let im = Grid::new(&[60, 40], true);
    let mut rng = StdRng::seed_from_u64(9);
    let mut params = GravityParams::new(5);
    params.max_iter = 8;
    let packing = pseudo_gravity_packing(&im, &params, &mut rng).unwrap();
    assert_eq!(packing.inserted, 8);
    let solid_rows: Vec<usize> = (0..60)
        .filter(|&x| (0..40).any(|y| !packing.image[[x, y]]))
        .collect();
    assert_eq!(solid_rows.first(), Some(&0));
    assert!(solid_rows.iter().all(|&x| x < 45));
}

#[test]
fn test_noise_shapes() {
    let mut rng = StdRng::seed_from_u64(1);
    let params = NoiseParams {
        frequency: vec![2],
        octaves: 3,
        ..NoiseParams::default()
    };
    let field = perlin_noise(&[64, 64], &params, &mut rng).unwrap();
    assert!(matches!(field, NoiseField::Raw(_)));
    assert_eq!(field.shape(), &[64, 64]);

    let bad = NoiseParams {
        frequency: vec![4],
        octaves: 1,
        ..NoiseParams::default()
    };
    let err = perlin_noise(&[10, 10], &bad, &mut rng).unwrap_err();
    assert!(err.is_invalid_argument());

    let volume = NoiseParams {
        porosity: Some(0.5),
        frequency: vec![2],
        octaves: 2,
        ..NoiseParams::default()
    };
    let field = perlin_noise(&[16, 16, 16], &volume, &mut rng).unwrap();
    let binary = field.as_binary().unwrap();
    assert!((binary.fraction_true() - 0.5).abs() < 1e-3);
}

#[test]
fn test_blobs_binary_porosity() {
    let mut rng = StdRng::seed_from_u64(4);
    let params = BlobParams {
        porosity: Some(0.3),
        blobiness: vec![2.0],
        chunks: None,
    };
    let field = blobs(&[30, 30, 30], &params, &mut rng).unwrap();
    let image = field.as_binary().unwrap();
    assert!((image.fraction_true() - 0.3).abs() < 1e-3);
}

#[test]
fn test_lattice_and_tubes() {
    let params = LatticeParams::new(5, Lattice::BodyCentered);
    let image = lattice_spheres(&[30, 30, 30], &params).unwrap();
    let porosity = image.fraction_true();
    assert!(porosity > 0.0 && porosity < 1.0);

    let mut rng = StdRng::seed_from_u64(0);
    let plate = bundle_of_tubes(&[50, 50, 5], 10, &mut rng).unwrap();
    assert_eq!(plate.shape(), &[50, 50, 5]);
    assert!(plate.fraction_true() > 0.0);
}
