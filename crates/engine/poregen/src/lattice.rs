//! Regular sphere packings
//!
//! Sphere centers sit on a square or triangular lattice in 2-D, or on a
//! simple, body-centered or face-centered cubic lattice in 3-D. Every
//! non-simple lattice is the simple one plus copies shifted by half a
//! spacing along some axes.

use std::fmt;

use tracing::info;
use voxel::edt::distance_transform;
use voxel::Grid;

use crate::error::{check_shape, Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lattice {
    Square,
    Triangular,
    SimpleCubic,
    BodyCentered,
    FaceCentered,
}

impl Lattice {
    /// Parse a lattice name for an `ndim`-dimensional image.
    ///
    /// `"sc"`, `"cubic"` and `"simple cubic"` mean the square lattice in 2-D.
    pub fn parse(name: &str, ndim: usize) -> Result<Self> {
        let lower = name.trim().to_lowercase();
        let parsed = match (ndim, lower.as_str()) {
            (2, "sc" | "square" | "cubic" | "simple cubic") => Some(Lattice::Square),
            (2, "tri" | "triangular") => Some(Lattice::Triangular),
            (3, "sc" | "cubic" | "simple cubic") => Some(Lattice::SimpleCubic),
            (3, "bcc" | "body centered cubic") => Some(Lattice::BodyCentered),
            (3, "fcc" | "face centered cubic") => Some(Lattice::FaceCentered),
            _ => None,
        };
        parsed.ok_or_else(|| {
            Error::invalid(format!("unrecognized {}-D lattice '{}'", ndim, name))
        })
    }

    pub fn ndim(&self) -> usize {
        match self {
            Lattice::Square | Lattice::Triangular => 2,
            _ => 3,
        }
    }

    /// Which axes each sublattice is shifted along by half a spacing.
    fn sublattices(&self) -> &'static [&'static [bool]] {
        match self {
            Lattice::Square => &[&[false, false]],
            Lattice::Triangular => &[&[false, false], &[true, true]],
            Lattice::SimpleCubic => &[&[false, false, false]],
            Lattice::BodyCentered => &[&[false, false, false], &[true, true, true]],
            Lattice::FaceCentered => &[
                &[false, false, false],
                &[true, true, false],
                &[true, false, true],
                &[false, true, true],
            ],
        }
    }
}

impl fmt::Display for Lattice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Lattice::Square => "square",
            Lattice::Triangular => "triangular",
            Lattice::SimpleCubic => "simple cubic",
            Lattice::BodyCentered => "body centered cubic",
            Lattice::FaceCentered => "face centered cubic",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LatticeParams {
    pub radius: usize,
    /// Unit cell size, once or per axis; defaults to `2 * radius`
    pub spacing: Option<Vec<usize>>,
    /// First center's distance from the low faces; defaults to `radius`
    pub offset: Option<Vec<usize>>,
    /// Keep the single-voxel bumps off the sphere faces
    pub smooth: bool,
    pub lattice: Lattice,
}

impl LatticeParams {
    pub fn new(radius: usize, lattice: Lattice) -> Self {
        Self {
            radius,
            spacing: None,
            offset: None,
            smooth: true,
            lattice,
        }
    }
}

fn per_axis(values: Option<&[usize]>, default: usize, ndim: usize, what: &str) -> Result<Vec<usize>> {
    match values {
        None => Ok(vec![default; ndim]),
        Some([v]) => Ok(vec![*v; ndim]),
        Some(v) if v.len() == ndim => Ok(v.to_vec()),
        Some(v) => Err(Error::invalid(format!(
            "{} has {} entries for a {}-D shape",
            what,
            v.len(),
            ndim
        ))),
    }
}

/// Lattice points (`true`) on a grid of `shape`.
pub fn lattice_points(
    shape: &[usize],
    lattice: Lattice,
    spacing: &[usize],
    offset: &[usize],
) -> Grid<bool> {
    let sublattices = lattice.sublattices();
    Grid::from_fn(shape, |coords| {
        sublattices.iter().any(|shifted| {
            coords.iter().enumerate().all(|(axis, &c)| {
                let start = offset[axis] + if shifted[axis] { spacing[axis] / 2 } else { 0 };
                c >= start && (c - start) % spacing[axis] == 0
            })
        })
    })
}

/// Pore space (`true`) around a regular packing of solid spheres.
pub fn lattice_spheres(shape: &[usize], params: &LatticeParams) -> Result<Grid<bool>> {
    check_shape(shape, &[2, 3])?;
    let ndim = shape.len();
    if params.lattice.ndim() != ndim {
        return Err(Error::invalid(format!(
            "the {} lattice needs a {}-D shape, got {:?}",
            params.lattice,
            params.lattice.ndim(),
            shape
        )));
    }
    let spacing = per_axis(params.spacing.as_deref(), 2 * params.radius, ndim, "spacing")?;
    if spacing.contains(&0) {
        return Err(Error::invalid("lattice spacing must be positive"));
    }
    let offset = per_axis(params.offset.as_deref(), params.radius, ndim, "offset")?;

    let points = lattice_points(shape, params.lattice, &spacing, &offset);
    let r = params.radius as f64;
    let dt = distance_transform(&!&points);
    let image = if params.smooth {
        dt.map(|&d| d >= r)
    } else {
        dt.map(|&d| d > r)
    };
    info!(
        "lattice_spheres: {} lattice, {} centers, porosity {:.4}",
        params.lattice,
        points.count_true(),
        image.fraction_true()
    );
    Ok(image)
}
