//! Exact Euclidean distance transform
//!
//! Separable lower-envelope algorithm (Felzenszwalb & Huttenlocher): the
//! squared transform is computed one axis at a time, each pass solving the 1-D
//! problem along every line of the grid. Cost is linear in the voxel count per
//! axis, independent of the distances involved.

use crate::grid::Grid;

/// Squared distance from every `true` voxel to the nearest `false` voxel.
///
/// `false` voxels map to 0. When the grid has no `false` voxel at all, every
/// entry is `+inf`.
pub fn squared_distance_transform(mask: &Grid<bool>) -> Grid<f64> {
    let mut field = mask.map(|&v| if v { f64::INFINITY } else { 0.0 });
    if field.is_empty() {
        return field;
    }

    let longest = mask.shape().iter().copied().max().unwrap_or(0);
    let mut line = vec![0.0; longest];
    let mut out = vec![0.0; longest];
    let mut sites = vec![0usize; longest];
    let mut bounds = vec![0.0; longest + 1];

    for axis in 0..mask.ndim() {
        let n = mask.shape()[axis];
        let stride = mask.strides()[axis];
        let data = field.as_mut_slice();
        for start in 0..data.len() {
            // Each line is visited once, from its first voxel along `axis`
            if (start / stride) % n != 0 {
                continue;
            }
            for (i, slot) in line[..n].iter_mut().enumerate() {
                *slot = data[start + i * stride];
            }
            lower_envelope(&line[..n], &mut out[..n], &mut sites, &mut bounds);
            for (i, value) in out[..n].iter().enumerate() {
                data[start + i * stride] = *value;
            }
        }
    }
    field
}

/// Euclidean distance from every `true` voxel to the nearest `false` voxel.
pub fn distance_transform(mask: &Grid<bool>) -> Grid<f64> {
    let mut field = squared_distance_transform(mask);
    for v in field.as_mut_slice() {
        *v = v.sqrt();
    }
    field
}

/// Like [`distance_transform`], but everything outside the grid counts as
/// `false`, so distances never exceed the distance to the nearest face.
pub fn distance_transform_with_border(mask: &Grid<bool>) -> Grid<f64> {
    let field = distance_transform(&mask.pad_constant(1, false));
    let mut shifted = vec![0; mask.ndim()];
    Grid::from_fn(mask.shape(), |coords| {
        for (s, &c) in shifted.iter_mut().zip(coords) {
            *s = c + 1;
        }
        field[shifted.as_slice()]
    })
}

/// 1-D squared distance transform of the sampled function `f`.
fn lower_envelope(f: &[f64], d: &mut [f64], v: &mut [usize], z: &mut [f64]) {
    let n = f.len();
    let mut k = 0usize;
    let mut started = false;

    let intersect = |p: usize, q: usize| -> f64 {
        let (pf, qf) = (p as f64, q as f64);
        ((f[q] + qf * qf) - (f[p] + pf * pf)) / (2.0 * (qf - pf))
    };

    for q in 0..n {
        if !f[q].is_finite() {
            continue;
        }
        if !started {
            v[0] = q;
            z[0] = f64::NEG_INFINITY;
            z[1] = f64::INFINITY;
            started = true;
            continue;
        }
        let mut s = intersect(v[k], q);
        while s <= z[k] {
            k -= 1;
            s = intersect(v[k], q);
        }
        k += 1;
        v[k] = q;
        z[k] = s;
        z[k + 1] = f64::INFINITY;
    }

    if !started {
        d.fill(f64::INFINITY);
        return;
    }

    k = 0;
    for (q, slot) in d.iter_mut().enumerate() {
        while z[k + 1] < q as f64 {
            k += 1;
        }
        let dq = q as f64 - v[k] as f64;
        *slot = dq * dq + f[v[k]];
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, Rng, SeedableRng};

    fn brute_force(mask: &Grid<bool>) -> Grid<f64> {
        let background: Vec<Vec<usize>> = mask
            .iter()
            .enumerate()
            .filter(|&(_, &v)| !v)
            .map(|(i, _)| mask.coords_of(i))
            .collect();
        Grid::from_fn(mask.shape(), |coords| {
            if !mask[coords] {
                return 0.0;
            }
            background
                .iter()
                .map(|b| {
                    b.iter()
                        .zip(coords)
                        .map(|(&x, &y)| (x as f64 - y as f64).powi(2))
                        .sum::<f64>()
                })
                .fold(f64::INFINITY, f64::min)
                .sqrt()
        })
    }

    #[test]
    fn test_single_background_voxel() {
        let mut mask = Grid::new(&[7, 7], true);
        mask[[3, 3]] = false;
        let dt = distance_transform(&mask);
        assert_eq!(dt[[3, 3]], 0.0);
        assert_eq!(dt[[3, 6]], 3.0);
        assert!((dt[[0, 0]] - 18f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_matches_brute_force_3d() {
        let mut rng = StdRng::seed_from_u64(7);
        let mask = Grid::from_fn(&[9, 8, 7], |_| rng.random::<f64>() > 0.05);
        let fast = distance_transform(&mask);
        let slow = brute_force(&mask);
        for (a, b) in fast.iter().zip(slow.iter()) {
            assert!((a - b).abs() < 1e-9, "{} != {}", a, b);
        }
    }

    #[test]
    fn test_no_background_is_infinite() {
        let mask = Grid::new(&[4, 4], true);
        assert!(distance_transform(&mask).iter().all(|v| v.is_infinite()));
    }

    #[test]
    fn test_border_counts_as_background() {
        let mask = Grid::new(&[5, 5], true);
        let dt = distance_transform_with_border(&mask);
        assert_eq!(dt[[0, 0]], 1.0);
        assert_eq!(dt[[2, 2]], 3.0);
        assert_eq!(dt[[1, 3]], 2.0);
    }
}
