//! Random sequential addition of non-overlapping spheres
//!
//! Spheres of one radius are added to the empty (`false`) region of an
//! existing image. Valid centers are tracked in an exclusion mask: a voxel is
//! a legal center while its distance to every occupied voxel is at least `r`.
//! After each insertion the mask is cleared within `2r` of the new center, so
//! later spheres can touch but never overlap it.
//!
//! Candidate centers are drawn from a cached list of flat indices that goes
//! stale as the mask shrinks. Stale entries are simply rejected on draw; once
//! a draw needs more than [`REGENERATE_AFTER`] attempts the list is rebuilt.

use std::str::FromStr;

use rand::Rng;
use tracing::{debug, info};
use voxel::edt::distance_transform;
use voxel::morphology::sphere;
use voxel::tools::get_border;
use voxel::{paint, Grid};

use crate::error::{check_shape, Error, Result};
use crate::progress::{Progress, Reporter, Silent};

/// Draws per cached site allowed before [`pick_valid_site`] gives up.
pub const ATTEMPTS_PER_SITE: usize = 20;

/// Attempt count above which the cached site list is rebuilt.
pub const REGENERATE_AFTER: usize = 100;

/// How spheres may meet the image faces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RsaMode {
    /// Spheres lie entirely inside the image
    #[default]
    Contained,
    /// Spheres may be cut by the image faces
    Extended,
}

impl FromStr for RsaMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "contained" => Ok(RsaMode::Contained),
            "extended" => Ok(RsaMode::Extended),
            other => Err(Error::invalid(format!("unrecognized RSA mode '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RsaParams {
    pub radius: usize,
    /// Stop once the running solid fraction exceeds this value
    pub volume_fraction: f64,
    /// Maximum number of spheres to add
    pub n_max: usize,
    pub mode: RsaMode,
}

impl RsaParams {
    pub fn new(radius: usize) -> Self {
        Self {
            radius,
            volume_fraction: 1.0,
            n_max: 10_000,
            mode: RsaMode::Contained,
        }
    }
}

/// Result of a single [`pick_valid_site`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SiteChoice {
    /// Flat index into the mask, or `None` when every attempt failed
    pub site: Option<usize>,
    pub attempts: usize,
}

/// Draw cached sites uniformly until one is still valid in `mask`.
///
/// Gives up after `ATTEMPTS_PER_SITE * free_sites.len()` draws. An empty list
/// returns immediately with no site.
pub fn pick_valid_site<R: Rng + ?Sized>(
    mask: &Grid<bool>,
    free_sites: &[usize],
    rng: &mut R,
) -> SiteChoice {
    let limit = free_sites.len() * ATTEMPTS_PER_SITE;
    let valid = mask.as_slice();
    let mut attempts = 0;
    while attempts < limit {
        let site = free_sites[rng.random_range(0..free_sites.len())];
        attempts += 1;
        if valid[site] {
            return SiteChoice {
                site: Some(site),
                attempts,
            };
        }
    }
    SiteChoice {
        site: None,
        attempts,
    }
}

/// Packing returned by [`rsa`].
#[derive(Debug, Clone, PartialEq)]
pub struct RsaPacking {
    /// Input image with the new spheres set to `true`
    pub image: Grid<bool>,
    pub inserted: usize,
    /// Running solid fraction. Each sphere adds its full template volume, so
    /// in [`RsaMode::Extended`] this overestimates `image.fraction_true()`.
    pub volume_fraction: f64,
}

/// Add non-overlapping spheres of `params.radius` to the `false` region of
/// `im`.
pub fn rsa<R: Rng + ?Sized>(im: &Grid<bool>, params: &RsaParams, rng: &mut R) -> Result<RsaPacking> {
    rsa_with_progress(im, params, rng, &mut Silent)
}

pub fn rsa_with_progress<R: Rng + ?Sized>(
    im: &Grid<bool>,
    params: &RsaParams,
    rng: &mut R,
    progress: &mut dyn Progress,
) -> Result<RsaPacking> {
    check_shape(im.shape(), &[2, 3])?;
    if params.radius == 0 {
        return Err(Error::invalid("RSA radius must be at least 1"));
    }
    if !params.volume_fraction.is_finite() {
        return Err(Error::invalid(format!(
            "volume fraction must be finite, got {}",
            params.volume_fraction
        )));
    }

    let r = params.radius;
    let ndim = im.ndim();
    let small = sphere(ndim, r as f64);
    let large = sphere(ndim, 2.0 * r as f64);
    let template_fraction = small.count_true() as f64 / im.len() as f64;

    let mut padded = im.pad_edge(2 * r)?;
    let thickness = match params.mode {
        RsaMode::Contained => 2 * r,
        RsaMode::Extended => r + 1,
    };
    let border = get_border(padded.shape(), thickness);
    for (voxel, &edge) in padded.as_mut_slice().iter_mut().zip(border.iter()) {
        *voxel |= edge;
    }

    let mut mask = distance_transform(&!&padded).map(|&d| d >= r as f64);
    let mut free_sites = mask.true_offsets();
    let mut vf = im.fraction_true();
    let mut inserted = 0;
    debug!(
        "RSA: radius {}, {} candidate centers, initial volume fraction {:.4}",
        r,
        free_sites.len(),
        vf
    );

    let mut reporter = Reporter::new(progress, "rsa", params.n_max as u64);
    let mut center = vec![0isize; ndim];
    while vf <= params.volume_fraction && inserted < params.n_max && !free_sites.is_empty() {
        let choice = pick_valid_site(&mask, &free_sites, rng);
        if choice.attempts > REGENERATE_AFTER {
            free_sites = mask.true_offsets();
            debug!(
                "RSA: regenerated free sites after {} insertions ({} left)",
                inserted,
                free_sites.len()
            );
        }
        let Some(site) = choice.site else {
            break;
        };

        for (axis, c) in mask.coords_of(site).into_iter().enumerate() {
            center[axis] = c as isize;
        }
        paint(&mut padded, &small, &center, true)?;
        paint(&mut mask, &large, &center, false)?;
        vf += template_fraction;
        inserted += 1;
        reporter.update(inserted as u64, Some(vf));
    }
    reporter.finish(inserted as u64, Some(vf));

    let image = padded.unpad(2 * r)?;
    info!(
        "RSA: inserted {} spheres of radius {}, volume fraction {:.4}",
        inserted, r, vf
    );
    Ok(RsaPacking {
        image,
        inserted,
        volume_fraction: vf,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_mode_parsing() {
        assert_eq!("contained".parse::<RsaMode>().unwrap(), RsaMode::Contained);
        assert_eq!("extended".parse::<RsaMode>().unwrap(), RsaMode::Extended);
        assert!("Contained".parse::<RsaMode>().unwrap_err().is_invalid_argument());
    }

    #[test]
    fn test_pick_from_empty_list() {
        let mask = Grid::new(&[4, 4], true);
        let mut rng = StdRng::seed_from_u64(0);
        let choice = pick_valid_site(&mask, &[], &mut rng);
        assert_eq!(choice, SiteChoice { site: None, attempts: 0 });
    }

    #[test]
    fn test_pick_skips_stale_sites() {
        let mut mask = Grid::new(&[10], false);
        mask[[7]] = true;
        let mut rng = StdRng::seed_from_u64(3);
        let choice = pick_valid_site(&mask, &[1, 2, 7], &mut rng);
        assert_eq!(choice.site, Some(7));
        assert!(choice.attempts >= 1 && choice.attempts <= 60);

        mask[[7]] = false;
        let exhausted = pick_valid_site(&mask, &[1, 2, 7], &mut rng);
        assert_eq!(exhausted.site, None);
        assert_eq!(exhausted.attempts, 60);
    }

    #[test]
    fn test_full_image_accepts_nothing() {
        let im = Grid::new(&[20, 20], true);
        let mut rng = StdRng::seed_from_u64(1);
        let packing = rsa(&im, &RsaParams::new(2), &mut rng).unwrap();
        assert_eq!(packing.inserted, 0);
        assert_eq!(packing.image, im);
    }

    #[test]
    fn test_n_max_is_respected() {
        let im = Grid::new(&[60, 60], false);
        let mut rng = StdRng::seed_from_u64(5);
        let mut params = RsaParams::new(3);
        params.n_max = 4;
        let packing = rsa(&im, &params, &mut rng).unwrap();
        assert_eq!(packing.inserted, 4);
        assert_eq!(packing.image.count_true(), 4 * sphere(2, 3.0).count_true());
    }

    #[test]
    fn test_zero_radius_rejected() {
        let im = Grid::new(&[10, 10], false);
        let mut rng = StdRng::seed_from_u64(0);
        assert!(rsa(&im, &RsaParams::new(0), &mut rng).is_err());
    }

    #[test]
    fn test_progress_reports_running_fraction() {
        let im = Grid::new(&[40, 40], false);
        let mut rng = StdRng::seed_from_u64(9);
        let mut values = Vec::new();
        let mut sink = |e: &crate::ProgressEvent| values.push(e.value.unwrap_or(0.0));
        let packing = rsa_with_progress(&im, &RsaParams::new(3), &mut rng, &mut sink).unwrap();
        assert!(packing.inserted > 0);
        assert!(values.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(values.last().copied(), Some(packing.volume_fraction));
    }
}
