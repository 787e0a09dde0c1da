//! Discrete line rasterization between two points

/// Round half to even, matching the rounding used for voxel snapping elsewhere.
#[inline]
fn rint(x: f64) -> f64 {
    x.round_ties_even()
}

/// Voxel coordinates of a straight line from `start` to `end`.
///
/// Both endpoints are snapped to the nearest voxel. The line gets one point
/// per voxel step along its dominant axis (`max |end - start| + 1` points),
/// each axis linearly interpolated and rounded independently, so consecutive
/// points are always 26-connected (8-connected in 2-D). Coordinates may be
/// negative or beyond any grid; clipping is the caller's job.
///
/// # Example
///
/// ```
/// use voxel::line_segment;
///
/// let pts = line_segment([0.0, 0.0], [4.0, 2.0]);
/// assert_eq!(pts, vec![[0, 0], [1, 0], [2, 1], [3, 2], [4, 2]]);
/// ```
pub fn line_segment<const N: usize>(start: [f64; N], end: [f64; N]) -> Vec<[isize; N]> {
    let x0 = start.map(rint);
    let x1 = end.map(rint);
    let steps = x0
        .iter()
        .zip(&x1)
        .map(|(a, b)| (b - a).abs() as usize)
        .max()
        .unwrap_or(0);
    let count = steps + 1;

    let mut points = Vec::with_capacity(count);
    for k in 0..count {
        let point = std::array::from_fn(|axis| {
            let value = if k + 1 == count {
                x1[axis]
            } else {
                x0[axis] + (x1[axis] - x0[axis]) * (k as f64 / steps as f64)
            };
            rint(value) as isize
        });
        points.push(point);
    }
    points
}
