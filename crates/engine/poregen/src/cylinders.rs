//! Fibrous mats of overlapping cylinders
//!
//! Fiber axes are straight segments through random points, oriented within
//! `phi_max` of the XY plane and `theta_max` of the X axis. Their centerlines
//! are rasterized onto the grid and dilated by the fiber radius.
//!
//! When a porosity is requested instead of a count, the number of fibers is
//! estimated from the random-overlap law `porosity = exp(-v_added / v_total)`
//! and inserted over several batches, re-measuring the mat in between to
//! correct the per-fiber volume estimate.

use std::f64::consts::{FRAC_PI_2, PI};

use glam::DVec3;
use rand::Rng;
use tracing::{debug, info};
use voxel::edt::distance_transform;
use voxel::{line_segment, Grid};

use crate::calibrate::FractionalSchedule;
use crate::error::{check_fraction, check_shape, Error, Result};
use crate::progress::{Progress, Reporter, Silent};

#[derive(Debug, Clone, PartialEq)]
pub struct CylinderParams {
    pub radius: f64,
    /// Maximum tilt out of the XY plane, degrees in `[0, 90]`
    pub phi_max: f64,
    /// Maximum rotation away from the X axis within the XY plane, degrees in
    /// `[0, 90]`
    pub theta_max: f64,
    /// Fiber length; `None` makes fibers span the whole domain
    pub length: Option<f64>,
}

impl CylinderParams {
    pub fn new(radius: f64) -> Self {
        Self {
            radius,
            phi_max: 0.0,
            theta_max: 90.0,
            length: None,
        }
    }

    fn validate(&self) -> Result<()> {
        if !(self.radius.is_finite() && self.radius > 0.0) {
            return Err(Error::invalid(format!(
                "fiber radius must be positive, got {}",
                self.radius
            )));
        }
        for (name, angle) in [("phi_max", self.phi_max), ("theta_max", self.theta_max)] {
            if !(0.0..=90.0).contains(&angle) {
                return Err(Error::invalid(format!(
                    "{} must be between 0 and 90, got {}",
                    name, angle
                )));
            }
        }
        if let Some(length) = self.length {
            if !(length.is_finite() && length >= 0.0) {
                return Err(Error::invalid(format!(
                    "fiber length must be non-negative, got {}",
                    length
                )));
            }
        }
        Ok(())
    }
}

/// What the fiber mat should satisfy.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FiberTarget {
    /// Insert exactly this many fibers
    Count(usize),
    /// Approach this porosity over `max_iter` batches (at least 3)
    Porosity { porosity: f64, max_iter: usize },
}

impl FiberTarget {
    /// Select a target from two optionals, exactly one of which must be set.
    pub fn from_options(count: Option<usize>, porosity: Option<f64>, max_iter: usize) -> Result<Self> {
        match (count, porosity) {
            (Some(count), None) => Ok(FiberTarget::Count(count)),
            (None, Some(porosity)) => Ok(FiberTarget::Porosity { porosity, max_iter }),
            (None, None) => Err(Error::invalid(
                "either a fiber count or a porosity must be given",
            )),
            (Some(_), Some(_)) => Err(Error::invalid(
                "a fiber count and a porosity cannot both be given",
            )),
        }
    }
}

/// One insertion batch of a porosity-targeted mat.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FiberBatch {
    /// Cumulative fraction of the estimated total that was aimed for
    pub fraction: f64,
    /// Fibers inserted so far, including this batch
    pub fibers: usize,
    /// Porosity measured after the batch
    pub porosity: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FiberMat {
    /// Pore space (`true`)
    pub image: Grid<bool>,
    pub fibers: usize,
    /// Empty for [`FiberTarget::Count`]
    pub batches: Vec<FiberBatch>,
}

/// Rasterize `count` fiber centerlines into a 3-D grid of `shape`.
fn place_centerlines<R: Rng + ?Sized>(
    shape: &[usize],
    count: usize,
    params: &CylinderParams,
    rng: &mut R,
) -> Grid<bool> {
    let dims = DVec3::new(shape[0] as f64, shape[1] as f64, shape[2] as f64);
    let hypotenuse = dims.length().floor();
    let length = params.length.unwrap_or(2.0 * hypotenuse);
    let half = (length / 2.0).floor().min(2.0 * hypotenuse);
    let margin = hypotenuse.min(half);
    let margin_i = margin as isize;

    let mut centerlines = Grid::new(shape, false);
    let mut placed = 0;
    while placed < count {
        let anchor = DVec3::new(
            rng.random::<f64>() * (dims.x + 2.0 * margin),
            rng.random::<f64>() * (dims.y + 2.0 * margin),
            rng.random::<f64>() * (dims.z + 2.0 * margin),
        );
        let phi = (FRAC_PI_2 - PI * rng.random::<f64>()) * params.phi_max / 90.0;
        let theta = (FRAC_PI_2 - PI * rng.random::<f64>()) * params.theta_max / 90.0;
        let axis = half
            * DVec3::new(
                phi.cos() * theta.cos(),
                phi.cos() * theta.sin(),
                phi.sin(),
            );

        let mut hit = false;
        for point in line_segment((anchor + axis).to_array(), (anchor - axis).to_array()) {
            let inside = point
                .iter()
                .zip(shape)
                .all(|(&c, &n)| c >= margin_i && c < n as isize + margin_i);
            if inside {
                let target = [
                    (point[0] - margin_i) as usize,
                    (point[1] - margin_i) as usize,
                    (point[2] - margin_i) as usize,
                ];
                centerlines[target] = true;
                hit = true;
            }
        }
        if hit {
            placed += 1;
        }
    }
    centerlines
}

/// Voxels at least `radius` from every centerline voxel.
fn dilate_fibers(centerlines: &Grid<bool>, radius: f64) -> Grid<bool> {
    distance_transform(&!centerlines).map(|&d| d >= radius)
}

/// Place exactly `count` fibers; returns the pore space.
///
/// Fibers that miss the domain are redrawn and do not count.
pub fn place_cylinders<R: Rng + ?Sized>(
    shape: &[usize],
    count: usize,
    params: &CylinderParams,
    rng: &mut R,
) -> Result<Grid<bool>> {
    check_shape(shape, &[3])?;
    params.validate()?;
    let centerlines = place_centerlines(shape, count, params, rng);
    Ok(dilate_fibers(&centerlines, params.radius))
}

pub fn cylinders<R: Rng + ?Sized>(
    shape: &[usize],
    target: &FiberTarget,
    params: &CylinderParams,
    rng: &mut R,
) -> Result<FiberMat> {
    cylinders_with_progress(shape, target, params, rng, &mut Silent)
}

pub fn cylinders_with_progress<R: Rng + ?Sized>(
    shape: &[usize],
    target: &FiberTarget,
    params: &CylinderParams,
    rng: &mut R,
    progress: &mut dyn Progress,
) -> Result<FiberMat> {
    check_shape(shape, &[3])?;
    params.validate()?;

    let (porosity, max_iter) = match *target {
        FiberTarget::Count(count) => {
            let image = place_cylinders(shape, count, params, rng)?;
            info!(
                "cylinders: {} fibers of radius {}, porosity {:.4}",
                count,
                params.radius,
                image.fraction_true()
            );
            return Ok(FiberMat {
                image,
                fibers: count,
                batches: Vec::new(),
            });
        }
        FiberTarget::Porosity { porosity, max_iter } => (porosity, max_iter),
    };

    check_fraction("porosity", porosity)?;
    if porosity == 0.0 {
        return Err(Error::invalid("a fiber mat cannot reach zero porosity"));
    }
    if max_iter < 3 {
        return Err(Error::invalid(format!(
            "max_iter must be at least 3, got {}",
            max_iter
        )));
    }

    let vol_total = shape.iter().product::<usize>() as f64;
    let pixels_for = |phi: f64| -phi.ln() * vol_total;
    let length_estimate = params.length.unwrap_or(vol_total.cbrt());
    let mut vol_fiber = length_estimate * PI * params.radius * params.radius;
    let pixels_to_add = pixels_for(porosity);

    let schedule = FractionalSchedule::new(max_iter)?;
    let mut reporter = Reporter::new(progress, "cylinders", schedule.len() as u64);
    let mut image = Grid::new(shape, true);
    let mut added = 0usize;
    let mut batches = Vec::with_capacity(schedule.len());

    for (i, &fraction) in schedule.fractions().iter().enumerate() {
        let fibers_total = if vol_fiber > 0.0 {
            pixels_to_add / vol_fiber
        } else {
            0.0
        };
        let wanted = (fraction * fibers_total).ceil();
        let batch = if wanted.is_finite() && wanted > added as f64 {
            wanted as usize - added
        } else {
            0
        };
        if batch > 0 {
            let layer = place_cylinders(shape, batch, params, rng)?;
            image = image.and(&layer)?;
        }
        added += batch;

        let measured = image.fraction_true();
        let vol_added = pixels_for(measured);
        if added > 0 && vol_added.is_finite() && vol_added > 0.0 {
            vol_fiber = vol_added / added as f64;
        }
        debug!(
            "cylinders: batch {} added {} fibers ({} total), porosity {:.4}",
            i, batch, added, measured
        );
        batches.push(FiberBatch {
            fraction,
            fibers: added,
            porosity: measured,
        });
        reporter.update(i as u64 + 1, Some(measured));
    }
    reporter.finish(batches.len() as u64, Some(image.fraction_true()));

    info!(
        "cylinders: {} fibers were added to reach porosity {:.4} (target {:.4})",
        added,
        image.fraction_true(),
        porosity
    );
    Ok(FiberMat {
        image,
        fibers: added,
        batches,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_target_selection() {
        assert_eq!(
            FiberTarget::from_options(Some(5), None, 3).unwrap(),
            FiberTarget::Count(5)
        );
        assert!(FiberTarget::from_options(None, None, 3).is_err());
        assert!(FiberTarget::from_options(Some(5), Some(0.5), 3).is_err());
    }

    #[test]
    fn test_rejects_2d_and_bad_angles() {
        let mut rng = StdRng::seed_from_u64(0);
        let params = CylinderParams::new(2.0);
        assert!(cylinders(&[20, 20], &FiberTarget::Count(1), &params, &mut rng).is_err());

        let mut tilted = CylinderParams::new(2.0);
        tilted.phi_max = 95.0;
        let err = cylinders(&[20, 20, 20], &FiberTarget::Count(1), &tilted, &mut rng).unwrap_err();
        assert!(err.is_invalid_argument());
    }

    #[test]
    fn test_max_iter_below_three_fails() {
        let mut rng = StdRng::seed_from_u64(0);
        let target = FiberTarget::Porosity {
            porosity: 0.8,
            max_iter: 2,
        };
        assert!(cylinders(&[20, 20, 20], &target, &CylinderParams::new(2.0), &mut rng).is_err());
    }

    #[test]
    fn test_in_plane_fibers_stay_flat() {
        // phi_max = 0 and theta_max = 0: every fiber runs along X
        let mut rng = StdRng::seed_from_u64(4);
        let mut params = CylinderParams::new(1.0);
        params.theta_max = 0.0;
        let centerlines = place_centerlines(&[30, 12, 12], 3, &params, &mut rng);
        let mut rows = Vec::new();
        for i in centerlines.true_offsets() {
            let c = centerlines.coords_of(i);
            rows.push((c[1], c[2]));
        }
        rows.sort();
        rows.dedup();
        assert!(!rows.is_empty() && rows.len() <= 3);
    }

    #[test]
    fn test_zero_fibers_is_all_pore() {
        let mut rng = StdRng::seed_from_u64(2);
        let mat = cylinders(&[10, 10, 10], &FiberTarget::Count(0), &CylinderParams::new(2.0), &mut rng)
            .unwrap();
        assert_eq!(mat.image.count_true(), 1000);
    }
}
