//! Reachability of the `true` phase from a set of inlet voxels

use std::collections::VecDeque;

use crate::error::Result;
use crate::grid::Grid;

/// Keep only the `true` voxels of `im` that are face-connected (4-connected in
/// 2-D, 6-connected in 3-D) to a voxel that is `true` in both `im` and
/// `inlets`.
pub fn trim_disconnected(im: &Grid<bool>, inlets: &Grid<bool>) -> Result<Grid<bool>> {
    im.check_same_shape(inlets.shape())?;

    let mut reached = Grid::new(im.shape(), false);
    let mut queue: VecDeque<usize> = VecDeque::new();
    for (i, (&open, &inlet)) in im.iter().zip(inlets.iter()).enumerate() {
        if open && inlet {
            reached.as_mut_slice()[i] = true;
            queue.push_back(i);
        }
    }

    let shape = im.shape().to_vec();
    let strides = im.strides().to_vec();
    let mut coords = vec![0usize; im.ndim()];
    while let Some(i) = queue.pop_front() {
        im.unravel(i, &mut coords);
        for axis in 0..shape.len() {
            let mut visit = |j: usize| {
                if im.as_slice()[j] && !reached.as_slice()[j] {
                    reached.as_mut_slice()[j] = true;
                    queue.push_back(j);
                }
            };
            if coords[axis] > 0 {
                visit(i - strides[axis]);
            }
            if coords[axis] + 1 < shape[axis] {
                visit(i + strides[axis]);
            }
        }
    }
    Ok(reached)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::get_border;

    #[test]
    fn test_isolated_pocket_removed() {
        let mut im = Grid::new(&[5, 5], false);
        // Channel from the top row down to row 2
        for r in 0..3 {
            im[[r, 1]] = true;
        }
        // Pocket not touching the channel
        im[[3, 3]] = true;
        im[[4, 4]] = true;

        let mut inlets = Grid::new(&[5, 5], false);
        for c in 0..5 {
            inlets[[0, c]] = true;
        }
        let out = trim_disconnected(&im, &inlets).unwrap();
        assert_eq!(out.count_true(), 3);
        assert!(out[[2, 1]]);
        assert!(!out[[3, 3]]);
    }

    #[test]
    fn test_diagonal_is_not_connected() {
        let mut im = Grid::new(&[3, 3, 3], false);
        im[[0, 0, 0]] = true;
        im[[1, 1, 0]] = true;
        let inlets = get_border(&[3, 3, 3], 1).and(&im).unwrap();
        let mut only_origin = Grid::new(&[3, 3, 3], false);
        only_origin[[0, 0, 0]] = true;
        let out = trim_disconnected(&im, &only_origin.and(&inlets).unwrap()).unwrap();
        assert_eq!(out.count_true(), 1);
    }

    #[test]
    fn test_shape_mismatch() {
        let im = Grid::new(&[3, 3], true);
        let inlets = Grid::new(&[3, 4], true);
        assert!(trim_disconnected(&im, &inlets).is_err());
    }
}
