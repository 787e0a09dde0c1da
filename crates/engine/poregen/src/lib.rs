//! Synthetic porous-media generators
//!
//! Every generator produces a binary voxel image where `true` marks the pore
//! phase. Randomness always comes from a caller-supplied [`rand::Rng`], so a
//! seeded generator reproduces the same structure. Long-running generators
//! have a `*_with_progress` form that reports through a [`Progress`] sink.
//!
//! # Modules
//!
//! - [`rsa`]: Random sequential addition of non-overlapping spheres
//! - [`overlapping`]: Overlapping spheres calibrated to a porosity
//! - [`polydisperse`]: Overlapping spheres with a radius distribution
//! - [`cylinders`]: Fibrous mats of overlapping cylinders
//! - [`tessellation`]: Voronoi cell edges as a solid skeleton
//! - [`gravity`]: Sphere packing settled along axis 0
//! - [`noise`]: Fractal Perlin noise
//! - [`blobs`]: Smoothed white noise
//! - [`lattice`]: Regular sphere packings
//! - [`tubes`]: Plates perforated by straight tubes
//! - [`calibrate`]: Bisection and batch schedules for porosity targets
//! - [`progress`]: Progress events and sinks

pub mod blobs;
pub mod calibrate;
pub mod cylinders;
pub mod error;
pub mod gravity;
pub mod lattice;
pub mod noise;
pub mod overlapping;
pub mod polydisperse;
pub mod progress;
pub mod rsa;
pub mod tessellation;
pub mod tubes;

pub use blobs::{blobs, BlobParams, ChunkOptions};
pub use calibrate::{bisect, BisectParams, Calibration, Response};
pub use cylinders::{cylinders, cylinders_with_progress, CylinderParams, FiberMat, FiberTarget};
pub use error::{Error, Result};
pub use gravity::{pseudo_gravity_packing, pseudo_gravity_packing_with_progress, GravityPacking, GravityParams};
pub use lattice::{lattice_spheres, Lattice, LatticeParams};
pub use noise::{perlin_noise, perlin_noise_with_progress, NoiseField, NoiseParams};
pub use overlapping::{overlapping_spheres, overlapping_spheres_with_progress, OverlappingParams, OverlappingSpheres};
pub use polydisperse::{polydisperse_spheres, Normal, PolydisperseParams, PolydisperseSpheres, RadiusDistribution, Uniform};
pub use progress::{Progress, ProgressEvent, Silent};
pub use rsa::{rsa, rsa_with_progress, RsaMode, RsaPacking, RsaParams};
pub use tessellation::{voronoi_edges, voronoi_edges_with_progress, Tessellation, VoronoiEdges, VoronoiParams};
pub use tubes::bundle_of_tubes;
