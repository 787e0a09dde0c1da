//! Fractal Perlin noise on 2-D and 3-D grids
//!
//! Each octave places random unit gradients on a lattice of
//! `frequency * 2^k` cells per axis and interpolates the corner dot products
//! with the smootherstep fade `6t^5 - 15t^4 + 10t^3`. Octaves are summed with
//! amplitude `persistence^k`.

use std::f64::consts::{SQRT_2, TAU};

use rand::Rng;
use tracing::{debug, info};
use voxel::tools::norm_to_uniform;
use voxel::{for_each_in_box, Grid};

use crate::error::{check_fraction, Error, Result};
use crate::progress::{Progress, Reporter, Silent};

/// Output of the noise and blob generators.
#[derive(Debug, Clone, PartialEq)]
pub enum NoiseField {
    /// Greyscale field
    Raw(Grid<f64>),
    /// Thresholded field, `true` = pore
    Binary(Grid<bool>),
}

impl NoiseField {
    pub fn shape(&self) -> &[usize] {
        match self {
            NoiseField::Raw(grid) => grid.shape(),
            NoiseField::Binary(grid) => grid.shape(),
        }
    }

    pub fn as_binary(&self) -> Option<&Grid<bool>> {
        match self {
            NoiseField::Binary(grid) => Some(grid),
            NoiseField::Raw(_) => None,
        }
    }

    pub fn as_raw(&self) -> Option<&Grid<f64>> {
        match self {
            NoiseField::Raw(grid) => Some(grid),
            NoiseField::Binary(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NoiseParams {
    /// Threshold the field so this fraction of voxels is pore
    pub porosity: Option<f64>,
    pub octaves: u32,
    /// Lattice cells per axis in the first octave, once or per axis
    pub frequency: Vec<usize>,
    /// Amplitude ratio between successive octaves
    pub persistence: f64,
}

impl Default for NoiseParams {
    fn default() -> Self {
        Self {
            porosity: None,
            octaves: 3,
            frequency: vec![2],
            persistence: 0.5,
        }
    }
}

#[inline]
fn fade(t: f64) -> f64 {
    t * t * t * (t * (t * 6.0 - 15.0) + 10.0)
}

/// Per-axis frequencies after validating them against `shape`.
fn validate(shape: &[usize], params: &NoiseParams) -> Result<Vec<usize>> {
    let ndim = shape.len();
    if ndim != 2 && ndim != 3 {
        return Err(Error::invalid(format!(
            "noise needs a 2-D or 3-D shape, got {:?}",
            shape
        )));
    }
    let frequency = match params.frequency.len() {
        1 => vec![params.frequency[0]; ndim],
        n if n == ndim => params.frequency.clone(),
        n => {
            return Err(Error::invalid(format!(
                "frequency has {} entries for a {}-D shape",
                n, ndim
            )))
        }
    };
    if params.octaves == 0 {
        return Err(Error::invalid("at least one octave is required"));
    }
    if !params.persistence.is_finite() {
        return Err(Error::invalid("persistence must be finite"));
    }
    if let Some(porosity) = params.porosity {
        check_fraction("porosity", porosity)?;
    }

    for (&n, &f) in shape.iter().zip(&frequency) {
        if f == 0 || n % f != 0 {
            return Err(Error::invalid(format!(
                "shape {:?} must be a multiple of the frequency {:?} along each axis",
                shape, frequency
            )));
        }
        match f.checked_pow(params.octaves) {
            Some(top) if top <= n => {
                if n % top != 0 {
                    return Err(Error::invalid(format!(
                        "extent {} must be a multiple of frequency^octaves = {}",
                        n, top
                    )));
                }
            }
            _ => {
                return Err(Error::invalid(format!(
                    "frequency {}^{} exceeds the extent {}",
                    f, params.octaves, n
                )))
            }
        }
        // The last octave has `f * 2^(octaves - 1)` cells per axis
        let finest = 1usize
            .checked_shl(params.octaves - 1)
            .and_then(|scale| f.checked_mul(scale));
        match finest {
            Some(cells) if cells <= n => {}
            _ => {
                return Err(Error::invalid(format!(
                    "{} octaves from frequency {} need more cells than the extent {}",
                    params.octaves, f, n
                )))
            }
        }
    }
    Ok(frequency)
}

/// Random unit gradient in `ndim` dimensions.
fn gradient<R: Rng + ?Sized>(ndim: usize, rng: &mut R) -> [f64; 3] {
    if ndim == 2 {
        let angle = TAU * rng.random::<f64>();
        [angle.cos(), angle.sin(), 0.0]
    } else {
        let theta = TAU * rng.random::<f64>();
        let phi = TAU * rng.random::<f64>();
        [phi.sin() * theta.cos(), phi.sin() * theta.sin(), phi.cos()]
    }
}

/// One octave of gradient noise with `cells[axis]` lattice cells per axis.
fn octave<R: Rng + ?Sized>(shape: &[usize], cells: &[usize], rng: &mut R) -> Grid<f64> {
    let ndim = shape.len();
    let corners: Vec<usize> = cells.iter().map(|c| c + 1).collect();
    let gradients = Grid::from_fn(&corners, |_| gradient(ndim, rng));

    let mut cell = vec![0usize; ndim];
    let mut frac = vec![0.0f64; ndim];
    let mut corner = vec![0usize; ndim];
    let zero = vec![0usize; ndim];
    let two = vec![2usize; ndim];
    let noise = Grid::from_fn(shape, |coords| {
        for axis in 0..ndim {
            let p = coords[axis] as f64 * cells[axis] as f64 / shape[axis] as f64;
            let c = (p.floor() as usize).min(cells[axis] - 1);
            cell[axis] = c;
            frac[axis] = p - c as f64;
        }

        // Multilinear blend of the corner contributions
        let mut value = 0.0;
        for_each_in_box(&zero, &two, |offset| {
            let mut weight = 1.0;
            let mut dot = 0.0;
            for axis in 0..ndim {
                corner[axis] = cell[axis] + offset[axis];
                let t = fade(frac[axis]);
                weight *= if offset[axis] == 1 { t } else { 1.0 - t };
            }
            let g = gradients[corner.as_slice()];
            for axis in 0..ndim {
                dot += g[axis] * (frac[axis] - offset[axis] as f64);
            }
            value += weight * dot;
        });
        value
    });

    if ndim == 2 {
        noise.map(|v| v * SQRT_2)
    } else {
        noise
    }
}

pub fn perlin_noise<R: Rng + ?Sized>(
    shape: &[usize],
    params: &NoiseParams,
    rng: &mut R,
) -> Result<NoiseField> {
    perlin_noise_with_progress(shape, params, rng, &mut Silent)
}

pub fn perlin_noise_with_progress<R: Rng + ?Sized>(
    shape: &[usize],
    params: &NoiseParams,
    rng: &mut R,
    progress: &mut dyn Progress,
) -> Result<NoiseField> {
    let frequency = validate(shape, params)?;

    let mut reporter = Reporter::new(progress, "perlin_noise", params.octaves as u64);
    let mut noise = Grid::new(shape, 0.0);
    let mut amplitude = 1.0;
    for k in 0..params.octaves {
        let cells: Vec<usize> = frequency.iter().map(|f| f << k).collect();
        debug!("perlin_noise: octave {} with {:?} cells", k, cells);
        let layer = octave(shape, &cells, rng);
        for (v, l) in noise.as_mut_slice().iter_mut().zip(layer.iter()) {
            *v += amplitude * l;
        }
        amplitude *= params.persistence;
        reporter.update(k as u64 + 1, None);
    }
    reporter.finish(params.octaves as u64, None);

    match params.porosity {
        None => Ok(NoiseField::Raw(noise)),
        Some(porosity) => {
            let uniform = norm_to_uniform(&noise, (0.0, 1.0))?;
            let binary = uniform.map(|&u| u < porosity);
            info!(
                "perlin_noise: {} octaves, porosity {:.4} (target {:.4})",
                params.octaves,
                binary.fraction_true(),
                porosity
            );
            Ok(NoiseField::Binary(binary))
        }
    }
}
