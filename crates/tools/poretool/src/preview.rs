//! ASCII rendering of the middle slice of a generated image

use voxel::Grid;

/// Widest preview, in characters.
const MAX_COLUMNS: usize = 80;

/// Shades from low to high intensity.
const SHADES: &[u8] = b" .:-=+*#%@";

/// Middle slice along axis 2 of a 3-D grid, or the grid itself in 2-D.
fn middle_slice<T: Copy>(im: &Grid<T>) -> (usize, usize, Vec<T>) {
    let shape = im.shape();
    let (rows, cols) = (shape[0], shape[1]);
    let depth = shape.get(2).map_or(0, |&n| n / 2);
    let mut values = Vec::with_capacity(rows * cols);
    for x in 0..rows {
        for y in 0..cols {
            let value = if shape.len() == 3 {
                im[[x, y, depth]]
            } else {
                im[[x, y]]
            };
            values.push(value);
        }
    }
    (rows, cols, values)
}

/// Sample the slice down to at most [`MAX_COLUMNS`] columns, keeping the
/// aspect ratio with characters twice as tall as wide.
fn render<T: Copy>(rows: usize, cols: usize, values: &[T], glyph: impl Fn(T) -> char) -> String {
    let step = cols.div_ceil(MAX_COLUMNS).max(1);
    let row_step = 2 * step;
    let mut out = String::new();
    for x in (0..rows).step_by(row_step) {
        for y in (0..cols).step_by(step) {
            out.push(glyph(values[x * cols + y]));
        }
        out.push('\n');
    }
    out
}

/// Pore as blank, solid as `#`.
pub fn binary_preview(im: &Grid<bool>) -> String {
    let (rows, cols, values) = middle_slice(im);
    render(rows, cols, &values, |pore| if pore { ' ' } else { '#' })
}

/// Values shaded between the slice minimum and maximum.
pub fn field_preview(im: &Grid<f64>) -> String {
    let (rows, cols, values) = middle_slice(im);
    let lo = values.iter().copied().fold(f64::INFINITY, f64::min);
    let hi = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let span = if hi > lo { hi - lo } else { 1.0 };
    render(rows, cols, &values, |v| {
        let level = ((v - lo) / span * (SHADES.len() - 1) as f64).round() as usize;
        SHADES[level.min(SHADES.len() - 1)] as char
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_binary_preview_marks_solid() {
        let im = Grid::from_fn(&[4, 3], |c| c[1] != 1);
        let text = binary_preview(&im);
        // Rows are sampled every other line
        assert_eq!(text, " # \n # \n");
    }

    #[test]
    fn test_preview_uses_middle_slice() {
        let im = Grid::from_fn(&[2, 2, 5], |c| c[2] != 2);
        assert_eq!(binary_preview(&im), "##\n");
    }

    #[test]
    fn test_wide_images_are_downsampled() {
        let im = Grid::new(&[10, 400], true);
        let text = binary_preview(&im);
        let first = text.lines().next().unwrap_or("");
        assert_eq!(first.len(), 80);
    }

    #[test]
    fn test_field_preview_spans_shades() {
        let im = Grid::from_fn(&[1, 10], |c| c[1] as f64);
        let text = field_preview(&im);
        assert!(text.starts_with(' '));
        assert!(text.trim_end().ends_with('@'));
    }
}
