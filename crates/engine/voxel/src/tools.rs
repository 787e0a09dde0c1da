//! Small array utilities shared by the generators

use crate::error::{Error, Result};
use crate::grid::Grid;

/// Mask that is `true` within `thickness` voxels of any face of `shape`.
pub fn get_border(shape: &[usize], thickness: usize) -> Grid<bool> {
    Grid::from_fn(shape, |coords| {
        coords
            .iter()
            .zip(shape)
            .any(|(&c, &n)| c < thickness || c + thickness >= n)
    })
}

/// Rescale `im` so its values are uniformly distributed over `[lo, hi]`.
///
/// The mapping is rank based: the k-th smallest of `n` values becomes
/// `lo + (hi - lo) * k / (n - 1)`. Ties keep their storage order, so every
/// output value is distinct. A single-voxel grid maps to `lo`.
pub fn norm_to_uniform(im: &Grid<f64>, scale: (f64, f64)) -> Result<Grid<f64>> {
    let (lo, hi) = scale;
    if !(lo.is_finite() && hi.is_finite()) || hi < lo {
        return Err(Error::invalid(format!(
            "uniform scale must be a finite range with lo <= hi, got ({}, {})",
            lo, hi
        )));
    }

    let n = im.len();
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| im.as_slice()[a].total_cmp(&im.as_slice()[b]));

    let mut out = vec![lo; n];
    if n > 1 {
        let step = (hi - lo) / (n - 1) as f64;
        for (rank, &i) in order.iter().enumerate() {
            out[i] = lo + step * rank as f64;
        }
    }
    Grid::from_vec(im.shape(), out)
}
