//! Grid - a fixed-shape N-dimensional array of voxels
//!
//! Voxels are stored contiguously in row-major (C) order: the last axis varies
//! fastest. The shape is fixed at construction; every operation that changes
//! the extent (padding, cropping) returns a new grid.

use std::ops::{Index, IndexMut, Not};

use crate::error::{Error, Result};

/// A fixed-shape N-dimensional array.
///
/// # Example
///
/// ```
/// use voxel::Grid;
///
/// let mut grid = Grid::new(&[4, 5], false);
/// grid[[1, 2]] = true;
///
/// assert_eq!(grid.shape(), &[4, 5]);
/// assert_eq!(grid.count_true(), 1);
/// assert_eq!(grid.offset(&[1, 2]), 7);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Grid<T> {
    shape: Vec<usize>,
    strides: Vec<usize>,
    data: Vec<T>,
}

fn row_major_strides(shape: &[usize]) -> Vec<usize> {
    let mut strides = vec![1; shape.len()];
    for axis in (0..shape.len().saturating_sub(1)).rev() {
        strides[axis] = strides[axis + 1] * shape[axis + 1];
    }
    strides
}

/// Visit every coordinate in the half-open box `[lower, upper)` in row-major
/// order. Nothing is visited when any axis is empty.
pub fn for_each_in_box(lower: &[usize], upper: &[usize], mut f: impl FnMut(&[usize])) {
    debug_assert_eq!(lower.len(), upper.len());
    if lower.iter().zip(upper).any(|(lo, hi)| lo >= hi) {
        return;
    }
    let ndim = lower.len();
    let mut coords = lower.to_vec();
    loop {
        f(&coords);
        // Odometer increment, last axis fastest
        let mut axis = ndim;
        loop {
            if axis == 0 {
                return;
            }
            axis -= 1;
            coords[axis] += 1;
            if coords[axis] < upper[axis] {
                break;
            }
            coords[axis] = lower[axis];
        }
    }
}

impl<T: Clone> Grid<T> {
    /// Create a grid of the given shape with every voxel set to `fill`.
    pub fn new(shape: &[usize], fill: T) -> Self {
        let len = shape.iter().product();
        Self {
            shape: shape.to_vec(),
            strides: row_major_strides(shape),
            data: vec![fill; len],
        }
    }

    /// Copy of this grid extended by `width` voxels on every side, the new
    /// voxels replicating the nearest edge voxel.
    pub fn pad_edge(&self, width: usize) -> Result<Self> {
        if self.is_empty() {
            return Err(Error::invalid("cannot edge-pad a grid with an empty axis"));
        }
        let padded: Vec<usize> = self.shape.iter().map(|n| n + 2 * width).collect();
        let mut source = vec![0; self.ndim()];
        Ok(Grid::from_fn(&padded, |coords| {
            for (axis, &c) in coords.iter().enumerate() {
                source[axis] = c.saturating_sub(width).min(self.shape[axis] - 1);
            }
            self.data[self.offset(&source)].clone()
        }))
    }

    /// Copy of this grid extended by `width` voxels of `value` on every side.
    pub fn pad_constant(&self, width: usize, value: T) -> Self {
        let padded: Vec<usize> = self.shape.iter().map(|n| n + 2 * width).collect();
        let mut out = Grid::new(&padded, value);
        let upper: Vec<usize> = self.shape.clone();
        let lower = vec![0; self.ndim()];
        let mut target = vec![0; self.ndim()];
        for_each_in_box(&lower, &upper, |coords| {
            for (axis, &c) in coords.iter().enumerate() {
                target[axis] = c + width;
            }
            let dst = out.offset(&target);
            out.data[dst] = self.data[self.offset(coords)].clone();
        });
        out
    }

    /// Copy of the box `[lower, upper)`.
    pub fn crop(&self, lower: &[usize], upper: &[usize]) -> Result<Self> {
        self.check_ndim(lower.len())?;
        self.check_ndim(upper.len())?;
        for axis in 0..self.ndim() {
            if lower[axis] > upper[axis] || upper[axis] > self.shape[axis] {
                return Err(Error::invalid(format!(
                    "crop box {:?}..{:?} exceeds shape {:?}",
                    lower, upper, self.shape
                )));
            }
        }
        let extent: Vec<usize> = lower.iter().zip(upper).map(|(lo, hi)| hi - lo).collect();
        let mut source = vec![0; self.ndim()];
        Ok(Grid::from_fn(&extent, |coords| {
            for (axis, &c) in coords.iter().enumerate() {
                source[axis] = c + lower[axis];
            }
            self.data[self.offset(&source)].clone()
        }))
    }

    /// Inverse of the padding methods: strip `width` voxels from every side.
    pub fn unpad(&self, width: usize) -> Result<Self> {
        if self.shape.iter().any(|&n| n < 2 * width) {
            return Err(Error::invalid(format!(
                "cannot strip {} voxels from each side of shape {:?}",
                width, self.shape
            )));
        }
        let lower = vec![width; self.ndim()];
        let upper: Vec<usize> = self.shape.iter().map(|n| n - width).collect();
        self.crop(&lower, &upper)
    }
}

impl<T> Grid<T> {
    /// Wrap existing row-major data.
    pub fn from_vec(shape: &[usize], data: Vec<T>) -> Result<Self> {
        let expected: usize = shape.iter().product();
        if data.len() != expected {
            return Err(Error::LengthMismatch {
                shape: shape.to_vec(),
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            shape: shape.to_vec(),
            strides: row_major_strides(shape),
            data,
        })
    }

    /// Build a grid by evaluating `f` at every coordinate in row-major order.
    pub fn from_fn(shape: &[usize], mut f: impl FnMut(&[usize]) -> T) -> Self {
        let len: usize = shape.iter().product();
        let mut data = Vec::with_capacity(len);
        let lower = vec![0; shape.len()];
        for_each_in_box(&lower, shape, |coords| data.push(f(coords)));
        Self {
            shape: shape.to_vec(),
            strides: row_major_strides(shape),
            data,
        }
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn strides(&self) -> &[usize] {
        &self.strides
    }

    pub fn ndim(&self) -> usize {
        self.shape.len()
    }

    /// Total number of voxels
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.data
    }

    pub fn into_vec(self) -> Vec<T> {
        self.data
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.data.iter()
    }

    /// Flat offset of an in-bounds coordinate.
    #[inline]
    pub fn offset(&self, coords: &[usize]) -> usize {
        debug_assert_eq!(coords.len(), self.ndim());
        coords
            .iter()
            .zip(&self.strides)
            .map(|(c, s)| c * s)
            .sum()
    }

    /// Write the coordinate of flat `offset` into `coords`.
    #[inline]
    pub fn unravel(&self, offset: usize, coords: &mut [usize]) {
        let mut rest = offset;
        for (axis, stride) in self.strides.iter().enumerate() {
            coords[axis] = rest / stride;
            rest %= stride;
        }
    }

    pub fn coords_of(&self, offset: usize) -> Vec<usize> {
        let mut coords = vec![0; self.ndim()];
        self.unravel(offset, &mut coords);
        coords
    }

    /// Whether a signed coordinate lies inside the grid.
    pub fn contains(&self, coords: &[isize]) -> bool {
        coords.len() == self.ndim()
            && coords
                .iter()
                .zip(&self.shape)
                .all(|(&c, &n)| c >= 0 && (c as usize) < n)
    }

    pub fn get(&self, coords: &[usize]) -> Option<&T> {
        if coords.len() != self.ndim() || coords.iter().zip(&self.shape).any(|(c, n)| c >= n) {
            return None;
        }
        self.data.get(self.offset(coords))
    }

    pub fn get_mut(&mut self, coords: &[usize]) -> Option<&mut T> {
        if coords.len() != self.ndim() || coords.iter().zip(&self.shape).any(|(c, n)| c >= n) {
            return None;
        }
        let offset = self.offset(coords);
        self.data.get_mut(offset)
    }

    pub fn map<U>(&self, f: impl FnMut(&T) -> U) -> Grid<U> {
        Grid {
            shape: self.shape.clone(),
            strides: self.strides.clone(),
            data: self.data.iter().map(f).collect(),
        }
    }

    /// Combine two grids of identical shape voxel by voxel.
    pub fn zip_map<U, V>(&self, other: &Grid<U>, mut f: impl FnMut(&T, &U) -> V) -> Result<Grid<V>> {
        self.check_same_shape(other.shape())?;
        Ok(Grid {
            shape: self.shape.clone(),
            strides: self.strides.clone(),
            data: self
                .data
                .iter()
                .zip(&other.data)
                .map(|(a, b)| f(a, b))
                .collect(),
        })
    }

    pub(crate) fn check_ndim(&self, ndim: usize) -> Result<()> {
        if ndim != self.ndim() {
            return Err(Error::DimensionMismatch {
                expected: self.ndim(),
                actual: ndim,
            });
        }
        Ok(())
    }

    pub(crate) fn check_same_shape(&self, shape: &[usize]) -> Result<()> {
        self.check_ndim(shape.len())?;
        if shape != self.shape.as_slice() {
            return Err(Error::ShapeMismatch {
                left: self.shape.clone(),
                right: shape.to_vec(),
            });
        }
        Ok(())
    }
}

impl Grid<bool> {
    pub fn count_true(&self) -> usize {
        self.data.iter().filter(|&&v| v).count()
    }

    /// Fraction of voxels that are `true` (0 for an empty grid).
    ///
    /// With the pore phase stored as `true` this is the porosity.
    pub fn fraction_true(&self) -> f64 {
        if self.data.is_empty() {
            return 0.0;
        }
        self.count_true() as f64 / self.data.len() as f64
    }

    /// Flat offsets of all `true` voxels, ascending.
    pub fn true_offsets(&self) -> Vec<usize> {
        self.data
            .iter()
            .enumerate()
            .filter_map(|(i, &v)| v.then_some(i))
            .collect()
    }

    /// Voxel-wise AND of two grids of identical shape.
    pub fn and(&self, other: &Grid<bool>) -> Result<Grid<bool>> {
        self.zip_map(other, |&a, &b| a && b)
    }
}

impl Not for &Grid<bool> {
    type Output = Grid<bool>;

    fn not(self) -> Grid<bool> {
        self.map(|&v| !v)
    }
}

impl Not for Grid<bool> {
    type Output = Grid<bool>;

    fn not(mut self) -> Grid<bool> {
        for v in &mut self.data {
            *v = !*v;
        }
        self
    }
}

impl<T> Index<&[usize]> for Grid<T> {
    type Output = T;

    fn index(&self, coords: &[usize]) -> &T {
        &self.data[self.offset(coords)]
    }
}

impl<T> IndexMut<&[usize]> for Grid<T> {
    fn index_mut(&mut self, coords: &[usize]) -> &mut T {
        let offset = self.offset(coords);
        &mut self.data[offset]
    }
}

impl<T, const N: usize> Index<[usize; N]> for Grid<T> {
    type Output = T;

    fn index(&self, coords: [usize; N]) -> &T {
        &self.data[self.offset(&coords)]
    }
}

impl<T, const N: usize> IndexMut<[usize; N]> for Grid<T> {
    fn index_mut(&mut self, coords: [usize; N]) -> &mut T {
        let offset = self.offset(&coords);
        &mut self.data[offset]
    }
}
