//! Plates perforated by a regular array of straight tubes

use rand::Rng;
use tracing::info;
use voxel::morphology::sphere;
use voxel::{insert_shape_mut, Anchor, Grid, InsertMode};

use crate::error::{check_shape, Error, Result};
use crate::polydisperse::linspace;

/// Hole centers along an axis of extent `n`.
fn hole_centers(n: usize, spacing: usize) -> Vec<usize> {
    let half = spacing as f64 / 2.0;
    linspace(half, n as f64 - half - 1.0, n / spacing)
        .into_iter()
        .map(|x| x.ceil().max(0.0) as usize)
        .collect()
}

/// Plate of `shape` with tubes running along axis 2 (`true` = pore).
///
/// A 2-D shape gets a third axis of extent 1. Tubes sit `spacing` apart on a
/// square grid and each gets a random radius in `[1, spacing / 2)`.
pub fn bundle_of_tubes<R: Rng + ?Sized>(shape: &[usize], spacing: usize, rng: &mut R) -> Result<Grid<bool>> {
    check_shape(shape, &[2, 3])?;
    if spacing < 3 {
        return Err(Error::invalid(format!(
            "tube spacing must be at least 3, got {}",
            spacing
        )));
    }
    let depth = shape.get(2).copied().unwrap_or(1);

    let mut plate = Grid::new(&shape[..2], false);
    let r_max = (spacing - 1) / 2;
    let xs = hole_centers(shape[0], spacing);
    let ys = hole_centers(shape[1], spacing);
    for &x in &xs {
        for &y in &ys {
            let r = rng.random_range(1..=r_max);
            let center = Anchor::Center(vec![x as isize, y as isize]);
            insert_shape_mut(&mut plate, &sphere(2, r as f64), &center, true, InsertMode::Overwrite)?;
        }
    }

    let image = Grid::from_fn(&[shape[0], shape[1], depth], |c| plate[[c[0], c[1]]]);
    info!(
        "bundle_of_tubes: {} tubes, porosity {:.4}",
        xs.len() * ys.len(),
        image.fraction_true()
    );
    Ok(image)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_hole_centers() {
        assert_eq!(hole_centers(20, 10), vec![5, 14]);
        assert_eq!(hole_centers(30, 6), vec![3, 9, 15, 21, 26]);
        assert!(hole_centers(5, 6).is_empty());
    }

    #[test]
    fn test_plate_gets_third_axis() {
        let mut rng = StdRng::seed_from_u64(0);
        let image = bundle_of_tubes(&[40, 40], 10, &mut rng).unwrap();
        assert_eq!(image.shape(), &[40, 40, 1]);
        for x in [5, 15, 25, 34] {
            assert!(image[[x, 5, 0]]);
        }
    }

    #[test]
    fn test_tubes_run_through() {
        let mut rng = StdRng::seed_from_u64(1);
        let image = bundle_of_tubes(&[30, 30, 8], 8, &mut rng).unwrap();
        for x in 0..30 {
            for y in 0..30 {
                let column: Vec<bool> = (0..8).map(|z| image[[x, y, z]]).collect();
                assert!(column.iter().all(|&v| v == column[0]));
            }
        }
        let porosity = image.fraction_true();
        assert!(porosity > 0.0 && porosity < 0.5);
    }

    #[test]
    fn test_small_spacing_rejected() {
        let mut rng = StdRng::seed_from_u64(0);
        let err = bundle_of_tubes(&[20, 20], 2, &mut rng).unwrap_err();
        assert!(err.is_invalid_argument());
    }

    #[test]
    fn test_narrowest_spacing_gives_single_voxel_tubes() {
        let mut rng = StdRng::seed_from_u64(4);
        let image = bundle_of_tubes(&[12, 12], 3, &mut rng).unwrap();
        // Four centers per axis; the open disk of radius 1 is a single voxel
        assert_eq!(hole_centers(12, 3), vec![2, 5, 7, 10]);
        assert_eq!(image.count_true(), 16);
        assert!(image[[5, 7, 0]]);
        assert!(!image[[5, 8, 0]]);
    }
}
