//! Shape insertion - bounds-clamped placement of a sub-array into a grid
//!
//! An element is anchored either by its center voxel or by its lower corner.
//! Whatever part of the element falls outside the target grid is dropped
//! silently, so partially (or entirely) out-of-bounds placements never fail.

use std::str::FromStr;

use crate::error::{Error, Result};
use crate::grid::{for_each_in_box, Grid};

/// Voxel types that can be scaled and accumulated during insertion.
///
/// For `bool` scaling is AND and accumulation is OR, which makes
/// `element * value` and `im + element * value` behave as masks.
pub trait VoxelValue: Copy {
    fn scale(self, by: Self) -> Self;
    fn accumulate(self, other: Self) -> Self;
}

impl VoxelValue for bool {
    #[inline]
    fn scale(self, by: Self) -> Self {
        self && by
    }

    #[inline]
    fn accumulate(self, other: Self) -> Self {
        self || other
    }
}

macro_rules! numeric_voxel_value {
    ($($t:ty),*) => {
        $(
            impl VoxelValue for $t {
                #[inline]
                fn scale(self, by: Self) -> Self {
                    self * by
                }

                #[inline]
                fn accumulate(self, other: Self) -> Self {
                    self + other
                }
            }
        )*
    };
}

numeric_voxel_value!(u8, u16, u32, u64, i32, i64, usize, f32, f64);

/// Where an element is placed in the target grid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Anchor {
    /// Position of the element's center voxel (all extents must be odd)
    Center(Vec<isize>),
    /// Position of the element's `[0, 0, ...]` voxel
    Corner(Vec<isize>),
}

impl Anchor {
    /// Build an anchor from two optional positions, exactly one of which must
    /// be present.
    pub fn from_options(center: Option<Vec<isize>>, corner: Option<Vec<isize>>) -> Result<Self> {
        match (center, corner) {
            (Some(center), None) => Ok(Anchor::Center(center)),
            (None, Some(corner)) => Ok(Anchor::Corner(corner)),
            _ => Err(Error::AnchorConflict),
        }
    }

    fn coords(&self) -> &[isize] {
        match self {
            Anchor::Center(c) | Anchor::Corner(c) => c,
        }
    }
}

/// How inserted values combine with the voxels already present.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InsertMode {
    /// Replace: `im = element * value`
    #[default]
    Overwrite,
    /// Add: `im = im + element * value`
    Overlay,
}

impl FromStr for InsertMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "overwrite" => Ok(InsertMode::Overwrite),
            "overlay" => Ok(InsertMode::Overlay),
            other => Err(Error::invalid(format!("unknown insert mode '{}'", other))),
        }
    }
}

/// Clipped overlap between a grid and an element placed with its origin at
/// `origin`: (grid lower corner, element lower corner, extent).
struct Overlap {
    grid_lower: Vec<usize>,
    element_lower: Vec<usize>,
    extent: Vec<usize>,
}

fn overlap(grid_shape: &[usize], element_shape: &[usize], origin: &[isize]) -> Option<Overlap> {
    let ndim = grid_shape.len();
    let mut grid_lower = Vec::with_capacity(ndim);
    let mut element_lower = Vec::with_capacity(ndim);
    let mut extent = Vec::with_capacity(ndim);
    for axis in 0..ndim {
        let lo = origin[axis].max(0);
        let hi = (origin[axis] + element_shape[axis] as isize).min(grid_shape[axis] as isize);
        if lo >= hi {
            return None;
        }
        grid_lower.push(lo as usize);
        element_lower.push((lo - origin[axis]) as usize);
        extent.push((hi - lo) as usize);
    }
    Some(Overlap {
        grid_lower,
        element_lower,
        extent,
    })
}

/// Resolve an anchor to the grid position of the element's origin voxel,
/// validating dimensionality and (for center anchors) odd extents.
fn element_origin<T, U>(im: &Grid<T>, element: &Grid<U>, anchor: &Anchor) -> Result<Vec<isize>> {
    im.check_ndim(element.ndim())?;
    im.check_ndim(anchor.coords().len())?;
    match anchor {
        Anchor::Corner(corner) => Ok(corner.clone()),
        Anchor::Center(center) => {
            let mut origin = Vec::with_capacity(center.len());
            for (axis, (&c, &extent)) in center.iter().zip(element.shape()).enumerate() {
                if extent % 2 == 0 {
                    return Err(Error::EvenExtent { axis, extent });
                }
                origin.push(c - (extent / 2) as isize);
            }
            Ok(origin)
        }
    }
}

/// Insert `element * value` into a copy of `im`.
///
/// # Example
///
/// ```
/// use voxel::{insert_shape, Anchor, Grid, InsertMode};
///
/// let im = Grid::new(&[5, 5], 0u8);
/// let element = Grid::new(&[3, 3], 1u8);
/// let out = insert_shape(&im, &element, &Anchor::Center(vec![0, 0]), 2, InsertMode::Overwrite)
///     .unwrap();
///
/// // Only the in-bounds quarter of the element was written
/// assert_eq!(out.iter().filter(|&&v| v == 2).count(), 4);
/// ```
pub fn insert_shape<T: VoxelValue>(
    im: &Grid<T>,
    element: &Grid<T>,
    anchor: &Anchor,
    value: T,
    mode: InsertMode,
) -> Result<Grid<T>> {
    let mut out = im.clone();
    insert_shape_mut(&mut out, element, anchor, value, mode)?;
    Ok(out)
}

/// In-place form of [`insert_shape`]. The grid is untouched on error.
pub fn insert_shape_mut<T: VoxelValue>(
    im: &mut Grid<T>,
    element: &Grid<T>,
    anchor: &Anchor,
    value: T,
    mode: InsertMode,
) -> Result<()> {
    let origin = element_origin(im, element, anchor)?;
    let Some(region) = overlap(im.shape(), element.shape(), &origin) else {
        return Ok(());
    };

    let zero = vec![0; im.ndim()];
    let mut grid_coords = vec![0; im.ndim()];
    let mut element_coords = vec![0; im.ndim()];
    for_each_in_box(&zero, &region.extent, |local| {
        for axis in 0..local.len() {
            grid_coords[axis] = region.grid_lower[axis] + local[axis];
            element_coords[axis] = region.element_lower[axis] + local[axis];
        }
        let scaled = element[element_coords.as_slice()].scale(value);
        let target = &mut im[grid_coords.as_slice()];
        *target = match mode {
            InsertMode::Overwrite => scaled,
            InsertMode::Overlay => target.accumulate(scaled),
        };
    });
    Ok(())
}

/// Write `value` into `im` wherever the odd-extent `footprint`, centered at
/// `center`, is `true`. Voxels outside the footprint or outside the grid are
/// left alone.
pub fn paint<T: Copy>(
    im: &mut Grid<T>,
    footprint: &Grid<bool>,
    center: &[isize],
    value: T,
) -> Result<()> {
    let origin = element_origin(im, footprint, &Anchor::Center(center.to_vec()))?;
    let Some(region) = overlap(im.shape(), footprint.shape(), &origin) else {
        return Ok(());
    };

    let zero = vec![0; im.ndim()];
    let mut grid_coords = vec![0; im.ndim()];
    let mut element_coords = vec![0; im.ndim()];
    for_each_in_box(&zero, &region.extent, |local| {
        for axis in 0..local.len() {
            grid_coords[axis] = region.grid_lower[axis] + local[axis];
            element_coords[axis] = region.element_lower[axis] + local[axis];
        }
        if footprint[element_coords.as_slice()] {
            im[grid_coords.as_slice()] = value;
        }
    });
    Ok(())
}
