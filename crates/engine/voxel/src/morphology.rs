//! Structuring elements and binary morphology
//!
//! Two sphere footprints are used throughout:
//! - [`sphere`] is *open*: offsets strictly closer than the radius. This is the
//!   template used for packed and overlapping spheres, and two open spheres
//!   whose centers are at least `2r` apart never share a voxel.
//! - [`sphere_closed`] is *closed*: offsets at or within the radius. This is
//!   the usual morphology ball; at radius 1 it is the face-neighbor cross.

use crate::edt::distance_transform_with_border;
use crate::error::{Error, Result};
use crate::grid::Grid;

fn footprint(ndim: usize, radius: f64, include_boundary: bool) -> Grid<bool> {
    let half = radius.max(0.0).ceil() as usize;
    let extent = vec![2 * half + 1; ndim];
    let r2 = radius * radius;
    Grid::from_fn(&extent, |coords| {
        let d2: f64 = coords
            .iter()
            .map(|&c| {
                let d = c as f64 - half as f64;
                d * d
            })
            .sum();
        if include_boundary {
            d2 <= r2
        } else {
            d2 < r2
        }
    })
}

/// Disk (2-D) or ball (3-D) of voxels strictly within `radius` of the center.
///
/// The extent along every axis is `2 * ceil(radius) + 1`.
pub fn sphere(ndim: usize, radius: f64) -> Grid<bool> {
    footprint(ndim, radius, false)
}

/// Disk or ball of voxels at most `radius` from the center.
pub fn sphere_closed(ndim: usize, radius: f64) -> Grid<bool> {
    footprint(ndim, radius, true)
}

/// Voxel count of [`sphere`].
pub fn sphere_volume(ndim: usize, radius: f64) -> usize {
    sphere(ndim, radius).count_true()
}

/// Binary minimum filter: a voxel stays `true` only if every in-bounds voxel
/// under the centered footprint is `true`.
///
/// Neighbors outside the grid are ignored. For the radius-1 cross this is the
/// same as mirroring the grid at its faces.
pub fn minimum_filter(im: &Grid<bool>, footprint: &Grid<bool>) -> Result<Grid<bool>> {
    if im.ndim() != footprint.ndim() {
        return Err(Error::DimensionMismatch {
            expected: im.ndim(),
            actual: footprint.ndim(),
        });
    }
    if let Some(axis) = footprint.shape().iter().position(|n| n % 2 == 0) {
        return Err(Error::EvenExtent {
            axis,
            extent: footprint.shape()[axis],
        });
    }

    let offsets: Vec<Vec<isize>> = footprint
        .true_offsets()
        .into_iter()
        .map(|i| {
            footprint
                .coords_of(i)
                .iter()
                .zip(footprint.shape())
                .map(|(&c, &n)| c as isize - (n / 2) as isize)
                .collect()
        })
        .collect();

    let mut neighbor = vec![0usize; im.ndim()];
    Ok(Grid::from_fn(im.shape(), |coords| {
        if !im[coords] {
            return false;
        }
        offsets.iter().all(|offset| {
            for axis in 0..coords.len() {
                let c = coords[axis] as isize + offset[axis];
                if c < 0 || c as usize >= im.shape()[axis] {
                    return true;
                }
                neighbor[axis] = c as usize;
            }
            im[neighbor.as_slice()]
        })
    }))
}

/// Erode `im` by a closed ball of `radius`, treating everything outside the
/// grid as `false`.
///
/// A voxel survives iff every voxel within `radius` of it (inside or outside
/// the grid) is `true`, i.e. iff its distance to the nearest `false` voxel or
/// grid face exceeds `radius`.
pub fn erode(im: &Grid<bool>, radius: f64) -> Grid<bool> {
    distance_transform_with_border(im).map(|&d| d > radius)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_disk() {
        let disk = sphere(2, 2.0);
        assert_eq!(disk.shape(), &[5, 5]);
        // Offsets with d^2 < 4: 1 + 4 (d=1) + 4 (d^2=2) = 9
        assert_eq!(disk.count_true(), 9);
        assert!(!disk[[0, 2]]);
        assert!(disk[[1, 1]]);
    }

    #[test]
    fn test_closed_cross() {
        let cross = sphere_closed(3, 1.0);
        assert_eq!(cross.shape(), &[3, 3, 3]);
        assert_eq!(cross.count_true(), 7);
        assert!(!cross[[0, 0, 1]]);
    }

    #[test]
    fn test_fractional_radius_extent() {
        let ball = sphere(3, 2.5);
        assert_eq!(ball.shape(), &[7, 7, 7]);
        assert!(ball[[3, 3, 1]]);
        assert!(!ball[[3, 3, 0]]);
        assert_eq!(sphere_volume(3, 0.0), 0);
    }

    #[test]
    fn test_minimum_filter_removes_thin_features() {
        let mut im = Grid::new(&[5, 5], false);
        for c in 0..5 {
            im[[2, c]] = true;
        }
        im[[1, 2]] = true;
        let out = minimum_filter(&im, &sphere_closed(2, 1.0)).unwrap();
        assert_eq!(out.count_true(), 0);

        let full = Grid::new(&[4, 4], true);
        assert_eq!(minimum_filter(&full, &sphere_closed(2, 1.0)).unwrap(), full);
    }

    #[test]
    fn test_minimum_filter_rejects_even_footprint() {
        let im = Grid::new(&[4, 4], true);
        assert!(minimum_filter(&im, &Grid::new(&[2, 3], true)).is_err());
    }

    #[test]
    fn test_erode_against_faces() {
        let im = Grid::new(&[9, 9], true);
        let eroded = erode(&im, 2.0);
        // Survivors are at least 3 voxels from the outside
        assert!(eroded[[4, 4]]);
        assert!(eroded[[2, 2]]);
        assert!(!eroded[[1, 4]]);
        assert_eq!(eroded.count_true(), 25);
    }
}
