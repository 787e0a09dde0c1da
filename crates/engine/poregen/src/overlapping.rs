//! Overlapping monodisperse spheres at a target porosity
//!
//! Seeds are the voxels of a fixed uniform random field that fall below
//! `N / total`; every voxel closer than the radius to a seed is solid. Because
//! spheres overlap, the porosity is a decreasing but unknown function of `N`.
//! The starting estimate ignores overlap and therefore undershoots, so the
//! search brackets `[N, 4N]` and bisects.

use rand::Rng;
use tracing::info;
use voxel::edt::distance_transform;
use voxel::morphology::sphere_volume;
use voxel::Grid;

use crate::calibrate::{bisect, BisectParams, Calibration, Response};
use crate::error::{check_fraction, check_shape, Error, Result};
use crate::progress::{Progress, Reporter, Silent};

#[derive(Debug, Clone, PartialEq)]
pub struct OverlappingParams {
    pub radius: f64,
    pub porosity: f64,
    /// Bisection rounds
    pub iter_max: usize,
    /// Accepted porosity error
    pub tol: f64,
}

impl OverlappingParams {
    pub fn new(radius: f64, porosity: f64) -> Self {
        Self {
            radius,
            porosity,
            iter_max: 10,
            tol: 0.01,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OverlappingSpheres {
    /// Pore space (`true`)
    pub image: Grid<bool>,
    /// Seed count search; `parameter` is the seed count used for `image`
    pub calibration: Calibration<u64>,
}

/// Pore image for the seeds below `threshold` in `field`.
fn pore_space(field: &Grid<f64>, threshold: f64, radius: f64) -> Grid<bool> {
    let not_seed = field.map(|&v| v > threshold);
    distance_transform(&not_seed).map(|&d| d >= radius)
}

pub fn overlapping_spheres<R: Rng + ?Sized>(
    shape: &[usize],
    params: &OverlappingParams,
    rng: &mut R,
) -> Result<OverlappingSpheres> {
    overlapping_spheres_with_progress(shape, params, rng, &mut Silent)
}

pub fn overlapping_spheres_with_progress<R: Rng + ?Sized>(
    shape: &[usize],
    params: &OverlappingParams,
    rng: &mut R,
    progress: &mut dyn Progress,
) -> Result<OverlappingSpheres> {
    check_shape(shape, &[2, 3])?;
    check_fraction("porosity", params.porosity)?;
    if !(params.radius.is_finite() && params.radius > 0.0) {
        return Err(Error::invalid(format!(
            "sphere radius must be positive, got {}",
            params.radius
        )));
    }

    let total = shape.iter().product::<usize>() as f64;
    let volume = sphere_volume(shape.len(), params.radius).max(1) as f64;
    let n0 = ((1.0 - params.porosity) * total / volume).ceil() as u64;

    let field = Grid::from_fn(shape, |_| rng.random::<f64>());
    let search = BisectParams {
        lower: n0,
        upper: 4 * n0,
        target: params.porosity,
        tol: params.tol,
        max_iter: params.iter_max,
        response: Response::Decreasing,
    };

    let mut reporter = Reporter::new(progress, "overlapping_spheres", params.iter_max as u64);
    let mut round = 0u64;
    let (image, calibration) = bisect(&search, |n| {
        let image = pore_space(&field, n as f64 / total, params.radius);
        let porosity = image.fraction_true();
        round += 1;
        reporter.update(round, Some(porosity));
        Ok((porosity, image))
    })?;
    reporter.finish(round, Some(calibration.achieved));

    info!(
        "overlapping_spheres: {} seeds of radius {}, porosity {:.4} (target {:.4}, {} rounds)",
        calibration.parameter,
        params.radius,
        calibration.achieved,
        params.porosity,
        calibration.iterations
    );
    Ok(OverlappingSpheres { image, calibration })
}
