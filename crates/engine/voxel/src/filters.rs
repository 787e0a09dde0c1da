//! Smoothing filters and chunked parallel execution
//!
//! [`gaussian_filter`] is separable and uses the half-sample symmetric
//! (`d c b a | a b c d | d c b a`) boundary. [`chunked_apply`] splits a grid
//! into overlapping blocks and runs any grid-to-grid function on them in
//! parallel, which is exact for local filters whose reach is below the halo.

use rayon::prelude::*;
use tracing::debug;

use crate::error::{Error, Result};
use crate::grid::{for_each_in_box, Grid};

/// Gaussian kernels are cut off at this many standard deviations.
pub const TRUNCATE: f64 = 4.0;

/// Map an out-of-range index back into `[0, n)` by mirroring at the edges,
/// repeating the edge sample.
fn reflect(i: isize, n: usize) -> usize {
    let n = n as isize;
    let period = 2 * n;
    let m = i.rem_euclid(period);
    (if m < n { m } else { period - 1 - m }) as usize
}

fn gaussian_kernel(sigma: f64) -> Vec<f64> {
    let radius = (TRUNCATE * sigma + 0.5) as isize;
    let mut weights: Vec<f64> = (-radius..=radius)
        .map(|x| (-0.5 * (x * x) as f64 / (sigma * sigma)).exp())
        .collect();
    let total: f64 = weights.iter().sum();
    for w in &mut weights {
        *w /= total;
    }
    weights
}

/// Per-axis values given either once for all axes or once per axis.
pub(crate) fn broadcast<T: Copy>(values: &[T], ndim: usize, what: &str) -> Result<Vec<T>> {
    match values.len() {
        1 => Ok(vec![values[0]; ndim]),
        n if n == ndim => Ok(values.to_vec()),
        n => Err(Error::invalid(format!(
            "{} needs 1 or {} values, got {}",
            what, ndim, n
        ))),
    }
}

/// Gaussian smoothing with per-axis standard deviations (in voxels).
///
/// `sigma` holds one value for all axes or one per axis. Axes with
/// `sigma == 0` are left untouched.
pub fn gaussian_filter(im: &Grid<f64>, sigma: &[f64]) -> Result<Grid<f64>> {
    let sigma = broadcast(sigma, im.ndim(), "sigma")?;
    if let Some(s) = sigma.iter().find(|s| !(s.is_finite() && **s >= 0.0)) {
        return Err(Error::invalid(format!(
            "sigma must be finite and non-negative, got {}",
            s
        )));
    }

    let mut field = im.clone();
    if field.is_empty() {
        return Ok(field);
    }
    let longest = im.shape().iter().copied().max().unwrap_or(0);
    let mut line = vec![0.0; longest];

    for (axis, &s) in sigma.iter().enumerate() {
        if s == 0.0 {
            continue;
        }
        let kernel = gaussian_kernel(s);
        let radius = (kernel.len() / 2) as isize;
        let n = im.shape()[axis];
        let stride = im.strides()[axis];
        let data = field.as_mut_slice();
        for start in 0..data.len() {
            if (start / stride) % n != 0 {
                continue;
            }
            for (i, slot) in line[..n].iter_mut().enumerate() {
                *slot = data[start + i * stride];
            }
            for i in 0..n {
                let mut acc = 0.0;
                for (k, w) in kernel.iter().enumerate() {
                    let j = reflect(i as isize + k as isize - radius, n);
                    acc += w * line[j];
                }
                data[start + i * stride] = acc;
            }
        }
    }
    Ok(field)
}

/// One block of a chunked decomposition: the halo-extended box that is
/// handed to the function and the interior it is responsible for.
#[derive(Debug, Clone)]
struct Chunk {
    outer_lower: Vec<usize>,
    outer_upper: Vec<usize>,
    inner_lower: Vec<usize>,
    inner_upper: Vec<usize>,
}

fn plan_chunks(shape: &[usize], divs: &[usize], overlap: usize) -> Vec<Chunk> {
    let ndim = shape.len();
    let counts = divs.to_vec();
    let mut chunks = Vec::new();
    for_each_in_box(&vec![0; ndim], &counts, |index| {
        let mut chunk = Chunk {
            outer_lower: vec![0; ndim],
            outer_upper: vec![0; ndim],
            inner_lower: vec![0; ndim],
            inner_upper: vec![0; ndim],
        };
        for axis in 0..ndim {
            let n = shape[axis];
            let lo = index[axis] * n / divs[axis];
            let hi = (index[axis] + 1) * n / divs[axis];
            chunk.inner_lower[axis] = lo;
            chunk.inner_upper[axis] = hi;
            chunk.outer_lower[axis] = lo.saturating_sub(overlap);
            chunk.outer_upper[axis] = (hi + overlap).min(n);
        }
        chunks.push(chunk);
    });
    chunks
}

/// Apply `func` to `im` in `divs` blocks per axis, in parallel.
///
/// Each block is extended by `overlap` voxels on every side (clamped to the
/// grid) before `func` sees it; only the block interior of the result is kept.
/// `func` must return a grid of the same shape as its input. `cores` limits
/// the worker count; `None` uses every available core.
pub fn chunked_apply<T, U, F>(
    func: F,
    im: &Grid<T>,
    divs: &[usize],
    cores: Option<usize>,
    overlap: usize,
) -> Result<Grid<U>>
where
    T: Clone + Send + Sync,
    U: Clone + Default + Send,
    F: Fn(&Grid<T>) -> Result<Grid<U>> + Sync,
{
    let divs = broadcast(divs, im.ndim(), "divs")?;
    for (axis, (&d, &n)) in divs.iter().zip(im.shape()).enumerate() {
        if d == 0 || d > n.max(1) {
            return Err(Error::invalid(format!(
                "cannot split axis {} of extent {} into {} chunks",
                axis, n, d
            )));
        }
    }
    if cores == Some(0) {
        return Err(Error::invalid("cores must be at least 1"));
    }

    let chunks = plan_chunks(im.shape(), &divs, overlap);
    let mut builder = rayon::ThreadPoolBuilder::new();
    if let Some(cores) = cores {
        builder = builder.num_threads(cores);
    }
    let pool = builder
        .build()
        .map_err(|e| Error::ThreadPool(e.to_string()))?;
    debug!(
        "chunked_apply: {} chunks on {} threads, overlap {}",
        chunks.len(),
        pool.current_num_threads(),
        overlap
    );

    let results: Vec<Grid<U>> = pool.install(|| {
        chunks
            .par_iter()
            .map(|chunk| {
                let block = im.crop(&chunk.outer_lower, &chunk.outer_upper)?;
                let out = func(&block)?;
                if out.shape() != block.shape() {
                    return Err(Error::ShapeMismatch {
                        left: block.shape().to_vec(),
                        right: out.shape().to_vec(),
                    });
                }
                Ok(out)
            })
            .collect::<Result<Vec<_>>>()
    })?;

    let mut assembled = Grid::new(im.shape(), U::default());
    let mut target = vec![0; im.ndim()];
    let mut source = vec![0; im.ndim()];
    for (chunk, block) in chunks.iter().zip(&results) {
        for_each_in_box(&chunk.inner_lower, &chunk.inner_upper, |coords| {
            for axis in 0..coords.len() {
                target[axis] = coords[axis];
                source[axis] = coords[axis] - chunk.outer_lower[axis];
            }
            assembled[target.as_slice()] = block[source.as_slice()].clone();
        });
    }
    Ok(assembled)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reflect_repeats_edge() {
        let mapped: Vec<usize> = (-3..7).map(|i| reflect(i, 4)).collect();
        assert_eq!(mapped, vec![2, 1, 0, 0, 1, 2, 3, 3, 2, 1]);
    }

    #[test]
    fn test_kernel_is_normalized() {
        let k = gaussian_kernel(1.5);
        assert_eq!(k.len(), 2 * 6 + 1);
        assert!((k.iter().sum::<f64>() - 1.0).abs() < 1e-12);
        assert!(k[6] > k[5] && (k[5] - k[7]).abs() < 1e-15);
    }

    #[test]
    fn test_gaussian_preserves_constant() {
        let im = Grid::new(&[7, 5, 6], 2.5);
        let out = gaussian_filter(&im, &[1.0, 2.0, 0.5]).unwrap();
        assert!(out.iter().all(|v| (v - 2.5).abs() < 1e-12));
    }

    #[test]
    fn test_gaussian_spreads_impulse() {
        let mut im = Grid::new(&[21], 0.0);
        im[[10]] = 1.0;
        let out = gaussian_filter(&im, &[2.0]).unwrap();
        assert!((out.iter().sum::<f64>() - 1.0).abs() < 1e-12);
        assert!(out[[10]] < 1.0);
        assert!((out[[8]] - out[[12]]).abs() < 1e-15);
    }

    #[test]
    fn test_gaussian_rejects_bad_sigma() {
        let im = Grid::new(&[4, 4], 0.0);
        assert!(gaussian_filter(&im, &[1.0, 2.0, 3.0]).is_err());
        assert!(gaussian_filter(&im, &[-1.0]).is_err());
    }

    #[test]
    fn test_chunked_matches_whole_filter() {
        let im = Grid::from_fn(&[24, 18], |c| ((c[0] * 7 + c[1] * 13) % 11) as f64);
        let whole = gaussian_filter(&im, &[1.0]).unwrap();
        let chunked =
            chunked_apply(|b: &Grid<f64>| gaussian_filter(b, &[1.0]), &im, &[3, 2], Some(2), 10)
                .unwrap();
        for (a, b) in whole.iter().zip(chunked.iter()) {
            assert!((a - b).abs() < 1e-12);
        }
    }

    #[test]
    fn test_chunked_rejects_too_many_divs() {
        let im = Grid::new(&[4, 4], false);
        let result = chunked_apply(|b: &Grid<bool>| Ok(b.clone()), &im, &[5], None, 1);
        assert!(result.is_err());
    }
}
