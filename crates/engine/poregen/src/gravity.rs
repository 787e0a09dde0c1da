//! Pseudo-gravity sphere packing
//!
//! Spheres are dropped one at a time into the free space of an image and come
//! to rest at the lowest reachable position along axis 0. "Reachable" means
//! the center can travel there from the far end of axis 0 without the sphere
//! intersecting solid, which is decided once up front by eroding the free
//! space and keeping the part connected to the inlet slab.

use rand::Rng;
use tracing::{debug, info};
use voxel::connectivity::trim_disconnected;
use voxel::morphology::{erode, minimum_filter, sphere_closed};
use voxel::{paint, Grid};

use crate::error::{check_shape, Error, Result};
use crate::progress::{Progress, Reporter, Silent};

#[derive(Debug, Clone, PartialEq)]
pub struct GravityParams {
    /// Sphere radius, at least 2
    pub radius: usize,
    /// Extra gap left around each sphere; negative values let spheres overlap
    pub clearance: isize,
    /// Maximum number of spheres
    pub max_iter: usize,
}

impl GravityParams {
    pub fn new(radius: usize) -> Self {
        Self {
            radius,
            clearance: 0,
            max_iter: 1000,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GravityPacking {
    /// Input free space with the spheres removed from it (`true` = free)
    pub image: Grid<bool>,
    pub inserted: usize,
}

/// Flat offsets of the valid sites in rows `[lower, upper)` of axis 0 that lie
/// in the lowest non-empty row.
fn lowest_sites(sites: &Grid<bool>, lower: usize, upper: usize) -> (usize, Vec<usize>) {
    let row = sites.strides()[0];
    let data = sites.as_slice();
    for x in lower..upper.min(sites.shape()[0]) {
        let options: Vec<usize> = (x * row..(x + 1) * row).filter(|&i| data[i]).collect();
        if !options.is_empty() {
            return (x, options);
        }
    }
    (upper, Vec::new())
}

pub fn pseudo_gravity_packing<R: Rng + ?Sized>(
    im: &Grid<bool>,
    params: &GravityParams,
    rng: &mut R,
) -> Result<GravityPacking> {
    pseudo_gravity_packing_with_progress(im, params, rng, &mut Silent)
}

pub fn pseudo_gravity_packing_with_progress<R: Rng + ?Sized>(
    im: &Grid<bool>,
    params: &GravityParams,
    rng: &mut R,
    progress: &mut dyn Progress,
) -> Result<GravityPacking> {
    check_shape(im.shape(), &[2, 3])?;
    if params.radius < 2 {
        return Err(Error::invalid(format!(
            "gravity packing needs a radius of at least 2, got {}",
            params.radius
        )));
    }
    let r = params.radius - 1;
    if params.clearance >= r as isize {
        return Err(Error::invalid(format!(
            "clearance {} leaves no sphere at radius {}",
            params.clearance, params.radius
        )));
    }

    let ndim = im.ndim();
    let n0 = im.shape()[0];
    let sphere = sphere_closed(ndim, (r as isize - params.clearance) as f64);
    let exclusion = sphere_closed(ndim, 2.0 * r as f64);

    let eroded = erode(im, r as f64);
    let inlet_row = n0.checked_sub(r + 1);
    let inlets = Grid::from_fn(im.shape(), |c| Some(c[0]) == inlet_row);
    let mut sites = trim_disconnected(&eroded, &inlets)?;

    let mut image = im.clone();
    let mut inserted = 0;
    let mut reporter = Reporter::new(progress, "gravity", params.max_iter as u64);
    let first = sites.true_offsets().first().map(|&i| i / sites.strides()[0]);
    debug!(
        "gravity: radius {}, {} reachable centers, lowest row {:?}",
        params.radius,
        sites.count_true(),
        first
    );

    if let Some(mut x_min) = first {
        let mut center = vec![0isize; ndim];
        for _ in 0..params.max_iter {
            let (row, options) = lowest_sites(&sites, x_min, x_min + 2 * r);
            if options.is_empty() {
                break;
            }
            let site = options[rng.random_range(0..options.len())];
            for (axis, c) in sites.coords_of(site).into_iter().enumerate() {
                center[axis] = c as isize;
            }
            paint(&mut image, &sphere, &center, false)?;
            paint(&mut sites, &exclusion, &center, false)?;
            x_min = row;
            inserted += 1;
            reporter.update(inserted as u64, None);
        }
    }
    reporter.finish(inserted as u64, None);

    let image = minimum_filter(&image, &sphere_closed(ndim, 1.0))?;
    info!(
        "gravity: a total of {} spheres of radius {} were added",
        inserted, params.radius
    );
    Ok(GravityPacking { image, inserted })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_lowest_sites() {
        let mut sites = Grid::new(&[6, 4], false);
        sites[[3, 1]] = true;
        sites[[3, 2]] = true;
        sites[[4, 0]] = true;
        let (row, options) = lowest_sites(&sites, 1, 5);
        assert_eq!(row, 3);
        assert_eq!(options, vec![13, 14]);
        let (_, none) = lowest_sites(&sites, 0, 3);
        assert!(none.is_empty());
    }

    #[test]
    fn test_spheres_settle_at_the_bottom() {
        let im = Grid::new(&[40, 30], true);
        let mut rng = StdRng::seed_from_u64(6);
        let packing = pseudo_gravity_packing(&im, &GravityParams::new(4), &mut rng).unwrap();
        assert!(packing.inserted > 0);
        // The lowest centers sit at row r' = 3, so the first layer touches row 0
        assert!((0..30).any(|y| !packing.image[[0, y]]));
        // Spheres never overlap: each added sphere removes the same volume
        let removed = 40 * 30 - packing.image.count_true();
        assert!(removed >= packing.inserted * sphere_closed(2, 3.0).count_true());
    }

    #[test]
    fn test_max_iter_caps_insertions() {
        let im = Grid::new(&[40, 40], true);
        let mut rng = StdRng::seed_from_u64(1);
        let mut params = GravityParams::new(3);
        params.max_iter = 2;
        let packing = pseudo_gravity_packing(&im, &params, &mut rng).unwrap();
        assert_eq!(packing.inserted, 2);
    }

    #[test]
    fn test_invalid_parameters() {
        let im = Grid::new(&[20, 20], true);
        let mut rng = StdRng::seed_from_u64(0);
        assert!(pseudo_gravity_packing(&im, &GravityParams::new(1), &mut rng).is_err());
        let mut params = GravityParams::new(3);
        params.clearance = 2;
        assert!(pseudo_gravity_packing(&im, &params, &mut rng).is_err());
    }

    #[test]
    fn test_closed_image_gets_nothing() {
        let im = Grid::new(&[20, 20], false);
        let mut rng = StdRng::seed_from_u64(0);
        let packing = pseudo_gravity_packing(&im, &GravityParams::new(3), &mut rng).unwrap();
        assert_eq!(packing.inserted, 0);
        assert_eq!(packing.image.count_true(), 0);
    }
}
