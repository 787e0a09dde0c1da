//! Overlapping spheres with a distribution of radii
//!
//! The radius distribution is discretized into `nbins` sizes. Each size gets
//! its own overlapping-sphere field, and the fields are intersected. If every
//! field removed the same share of the remaining pore space, the final
//! porosity would hit the target; each layer's porosity is corrected for what
//! earlier layers already removed.

use rand::Rng;
use tracing::{debug, info};
use voxel::Grid;

use crate::error::{check_fraction, check_shape, Error, Result};
use crate::overlapping::{overlapping_spheres, OverlappingParams};

/// Source of sphere radii, described by its quantile function.
pub trait RadiusDistribution {
    /// Radius below which a fraction `q` of the spheres fall.
    fn ppf(&self, q: f64) -> f64;
}

impl<F: Fn(f64) -> f64> RadiusDistribution for F {
    fn ppf(&self, q: f64) -> f64 {
        self(q)
    }
}

/// Gaussian radii.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Normal {
    pub mean: f64,
    pub std_dev: f64,
}

impl RadiusDistribution for Normal {
    fn ppf(&self, q: f64) -> f64 {
        self.mean + self.std_dev * inverse_normal_cdf(q)
    }
}

/// Radii spread evenly over `[low, high]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Uniform {
    pub low: f64,
    pub high: f64,
}

impl RadiusDistribution for Uniform {
    fn ppf(&self, q: f64) -> f64 {
        self.low + q * (self.high - self.low)
    }
}

/// Standard normal quantile, Acklam's rational approximation
/// (relative error below 1.2e-9).
pub fn inverse_normal_cdf(p: f64) -> f64 {
    const A: [f64; 6] = [
        -3.969683028665376e1,
        2.209460984245205e2,
        -2.759285104469687e2,
        1.383577518672690e2,
        -3.066479806614716e1,
        2.506628277459239,
    ];
    const B: [f64; 5] = [
        -5.447609879822406e1,
        1.615858368580409e2,
        -1.556989798598866e2,
        6.680131188771972e1,
        -1.328068155288572e1,
    ];
    const C: [f64; 6] = [
        -7.784894002430293e-3,
        -3.223964580411365e-1,
        -2.400758277161838,
        -2.549732539343734,
        4.374664141464968,
        2.938163982698783,
    ];
    const D: [f64; 4] = [
        7.784695709041462e-3,
        3.224671290700398e-1,
        2.445134137142996,
        3.754408661907416,
    ];
    const P_LOW: f64 = 0.02425;

    if p.is_nan() || p < 0.0 || p > 1.0 {
        return f64::NAN;
    }
    if p == 0.0 {
        return f64::NEG_INFINITY;
    }
    if p == 1.0 {
        return f64::INFINITY;
    }

    let tail = |q: f64| {
        (((((C[0] * q + C[1]) * q + C[2]) * q + C[3]) * q + C[4]) * q + C[5])
            / ((((D[0] * q + D[1]) * q + D[2]) * q + D[3]) * q + 1.0)
    };

    if p < P_LOW {
        tail((-2.0 * p.ln()).sqrt())
    } else if p <= 1.0 - P_LOW {
        let q = p - 0.5;
        let r = q * q;
        (((((A[0] * r + A[1]) * r + A[2]) * r + A[3]) * r + A[4]) * r + A[5]) * q
            / (((((B[0] * r + B[1]) * r + B[2]) * r + B[3]) * r + B[4]) * r + 1.0)
    } else {
        -tail((-2.0 * (1.0 - p).ln()).sqrt())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PolydisperseParams {
    pub porosity: f64,
    /// Number of discrete radii
    pub nbins: usize,
    /// Smallest radius used; smaller quantiles are raised to it
    pub r_min: f64,
}

impl PolydisperseParams {
    pub fn new(porosity: f64) -> Self {
        Self {
            porosity,
            nbins: 5,
            r_min: 5.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PolydisperseSpheres {
    /// Pore space (`true`)
    pub image: Grid<bool>,
    /// Radius of each layer, in insertion order
    pub radii: Vec<f64>,
}

/// `n` evenly spaced values from `start` to `end` inclusive.
pub(crate) fn linspace(start: f64, end: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => (0..n)
            .map(|i| {
                if i + 1 == n {
                    end
                } else {
                    start + (end - start) * i as f64 / (n - 1) as f64
                }
            })
            .collect(),
    }
}

/// Quantile radii at `linspace(0.05, 0.95, nbins)`, clipped below at `r_min`.
pub fn bin_radii<D: RadiusDistribution + ?Sized>(dist: &D, nbins: usize, r_min: f64) -> Result<Vec<f64>> {
    linspace(0.05, 0.95, nbins)
        .into_iter()
        .map(|q| {
            let r = dist.ppf(q);
            if r.is_nan() || r == f64::INFINITY {
                return Err(Error::invalid(format!(
                    "radius distribution gave {} at quantile {}",
                    r, q
                )));
            }
            Ok(r.max(r_min))
        })
        .collect()
}

pub fn polydisperse_spheres<D, R>(
    shape: &[usize],
    dist: &D,
    params: &PolydisperseParams,
    rng: &mut R,
) -> Result<PolydisperseSpheres>
where
    D: RadiusDistribution + ?Sized,
    R: Rng + ?Sized,
{
    check_shape(shape, &[2, 3])?;
    check_fraction("porosity", params.porosity)?;
    if params.nbins == 0 {
        return Err(Error::invalid("nbins must be at least 1"));
    }
    if !(params.r_min.is_finite() && params.r_min > 0.0) {
        return Err(Error::invalid(format!(
            "r_min must be positive, got {}",
            params.r_min
        )));
    }

    let radii = bin_radii(dist, params.nbins, params.r_min)?;
    let phi_desired = 1.0 - (1.0 - params.porosity) / radii.len() as f64;

    let mut image = Grid::new(shape, true);
    for &r in &radii {
        let phi_im = image.fraction_true();
        if phi_im <= 0.0 {
            break;
        }
        let phi_corrected = (1.0 - (1.0 - phi_desired) / phi_im).clamp(0.0, 1.0);
        debug!(
            "polydisperse_spheres: radius {:.2}, layer porosity {:.4}",
            r, phi_corrected
        );
        let layer = overlapping_spheres(shape, &OverlappingParams::new(r, phi_corrected), rng)?;
        image = image.and(&layer.image)?;
    }

    info!(
        "polydisperse_spheres: {} radii, porosity {:.4} (target {:.4})",
        radii.len(),
        image.fraction_true(),
        params.porosity
    );
    Ok(PolydisperseSpheres { image, radii })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_inverse_normal() {
        assert!(inverse_normal_cdf(0.5).abs() < 1e-9);
        assert!((inverse_normal_cdf(0.975) - 1.959963985).abs() < 1e-6);
        assert!((inverse_normal_cdf(0.01) + 2.326347874).abs() < 1e-6);
        assert!((inverse_normal_cdf(0.2) + inverse_normal_cdf(0.8)).abs() < 1e-9);
        assert!(inverse_normal_cdf(1.5).is_nan());
    }

    #[test]
    fn test_linspace() {
        assert_eq!(linspace(0.0, 1.0, 5), vec![0.0, 0.25, 0.5, 0.75, 1.0]);
        assert_eq!(linspace(0.05, 0.95, 1), vec![0.05]);
    }

    #[test]
    fn test_bin_radii_clip_and_closures() {
        let radii = bin_radii(&Uniform { low: 0.0, high: 20.0 }, 3, 5.0).unwrap();
        for (r, expected) in radii.iter().zip([5.0, 10.0, 19.0]) {
            assert!((r - expected).abs() < 1e-9);
        }

        let constant = |_: f64| 7.0;
        assert_eq!(bin_radii(&constant, 2, 1.0).unwrap(), vec![7.0, 7.0]);

        let broken = |_: f64| f64::NAN;
        assert!(bin_radii(&broken, 2, 1.0).is_err());
    }

    #[test]
    fn test_porosity_is_approached() {
        let mut rng = StdRng::seed_from_u64(21);
        let dist = Normal { mean: 6.0, std_dev: 1.5 };
        let mut params = PolydisperseParams::new(0.5);
        params.nbins = 3;
        params.r_min = 3.0;
        let out = polydisperse_spheres(&[120, 120], &dist, &params, &mut rng).unwrap();
        assert_eq!(out.radii.len(), 3);
        assert!((out.image.fraction_true() - 0.5).abs() < 0.08);
    }
}
