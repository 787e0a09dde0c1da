//! Voxel grid primitives for synthetic porous media
//!
//! This crate provides the array layer the generators are built on: a
//! fixed-shape N-dimensional grid and the collaborator services that operate
//! on it.
//!
//! # Modules
//!
//! - [`grid`]: Row-major N-D grid with padding, cropping and phase fractions
//! - [`insert`]: Bounds-clamped insertion of sub-arrays and masked painting
//! - [`line`]: Voxel rasterization of straight segments
//! - [`edt`]: Exact Euclidean distance transform
//! - [`morphology`]: Sphere footprints, minimum filter, erosion
//! - [`tools`]: Border masks and rank-based uniform rescaling
//! - [`filters`]: Gaussian smoothing and chunked parallel execution
//! - [`connectivity`]: Trimming of regions unreachable from an inlet

pub mod connectivity;
pub mod edt;
pub mod error;
pub mod filters;
pub mod grid;
pub mod insert;
pub mod line;
pub mod morphology;
pub mod tools;

pub use error::{Error, Result};
pub use grid::{for_each_in_box, Grid};
pub use insert::{insert_shape, insert_shape_mut, paint, Anchor, InsertMode, VoxelValue};
pub use line::line_segment;
