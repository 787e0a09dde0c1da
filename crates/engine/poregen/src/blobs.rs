//! Blob fields: smoothed white noise
//!
//! A uniform random field is blurred with a Gaussian whose width follows the
//! domain size and the requested blobiness, then rank-rescaled to `[0, 1]`.
//! Larger blobiness gives smaller, more numerous blobs.

use rand::Rng;
use tracing::info;
use voxel::filters::{chunked_apply, gaussian_filter};
use voxel::tools::norm_to_uniform;
use voxel::Grid;

use crate::error::{check_fraction, check_shape, Error, Result};
use crate::noise::NoiseField;

/// Halo added around each chunk when smoothing in parallel.
pub const CHUNK_OVERLAP: usize = 10;

/// Split the smoothing step into blocks run on a thread pool.
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkOptions {
    /// Blocks per axis, once or per axis
    pub divs: Vec<usize>,
    /// Worker threads; `None` uses every core
    pub cores: Option<usize>,
}

impl Default for ChunkOptions {
    fn default() -> Self {
        Self {
            divs: vec![2],
            cores: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BlobParams {
    /// Threshold so this fraction is pore; `None` returns the greyscale field
    pub porosity: Option<f64>,
    /// Once or per axis
    pub blobiness: Vec<f64>,
    pub chunks: Option<ChunkOptions>,
}

impl Default for BlobParams {
    fn default() -> Self {
        Self {
            porosity: Some(0.5),
            blobiness: vec![1.0],
            chunks: None,
        }
    }
}

/// Per-axis smoothing widths, `mean(shape) / (40 * blobiness)`.
pub fn blob_sigma(shape: &[usize], blobiness: &[f64]) -> Result<Vec<f64>> {
    let ndim = shape.len();
    let blobiness = match blobiness.len() {
        1 => vec![blobiness[0]; ndim],
        n if n == ndim => blobiness.to_vec(),
        n => {
            return Err(Error::invalid(format!(
                "blobiness has {} entries for a {}-D shape",
                n, ndim
            )))
        }
    };
    if let Some(b) = blobiness.iter().find(|b| !(b.is_finite() && **b > 0.0)) {
        return Err(Error::invalid(format!("blobiness must be positive, got {}", b)));
    }
    let mean = shape.iter().sum::<usize>() as f64 / ndim as f64;
    Ok(blobiness.iter().map(|b| mean / (40.0 * b)).collect())
}

pub fn blobs<R: Rng + ?Sized>(shape: &[usize], params: &BlobParams, rng: &mut R) -> Result<NoiseField> {
    check_shape(shape, &[2, 3])?;
    if let Some(porosity) = params.porosity {
        check_fraction("porosity", porosity)?;
    }
    let sigma = blob_sigma(shape, &params.blobiness)?;

    let noise = Grid::from_fn(shape, |_| rng.random::<f64>());
    let smoothed = match &params.chunks {
        Some(chunks) => chunked_apply(
            |block: &Grid<f64>| gaussian_filter(block, &sigma),
            &noise,
            &chunks.divs,
            chunks.cores,
            CHUNK_OVERLAP,
        )?,
        None => gaussian_filter(&noise, &sigma)?,
    };
    let field = norm_to_uniform(&smoothed, (0.0, 1.0))?;

    match params.porosity {
        None => Ok(NoiseField::Raw(field)),
        Some(porosity) => {
            let image = field.map(|&v| v < porosity);
            info!(
                "blobs: sigma {:?}, porosity {:.4} (target {:.4})",
                sigma,
                image.fraction_true(),
                porosity
            );
            Ok(NoiseField::Binary(image))
        }
    }
}
