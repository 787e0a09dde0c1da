//! Error types for voxel grid operations

use thiserror::Error;

/// Result type for voxel operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by grid construction, insertion and filtering.
///
/// Apart from [`Error::ThreadPool`] every variant is an invalid-argument
/// condition, detected before any voxel is written.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// Flat data does not match the requested shape
    #[error("data length {actual} does not match shape {shape:?} ({expected} voxels)")]
    LengthMismatch {
        shape: Vec<usize>,
        expected: usize,
        actual: usize,
    },

    /// Two arrays (or an array and a coordinate) disagree on dimensionality
    #[error("dimension mismatch: expected {expected} dimensions, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Two arrays of equal dimensionality disagree on shape
    #[error("shape mismatch: {left:?} vs {right:?}")]
    ShapeMismatch { left: Vec<usize>, right: Vec<usize> },

    /// Center anchoring needs odd extents so the centroid is a voxel
    #[error("element extent {extent} along axis {axis} is even; center anchoring needs odd extents")]
    EvenExtent { axis: usize, extent: usize },

    /// Both or neither of center and corner were supplied
    #[error("exactly one of center or corner must be given")]
    AnchorConflict,

    /// Any other rejected parameter
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The worker pool for chunked execution could not be started
    #[error("failed to build thread pool: {0}")]
    ThreadPool(String),
}

impl Error {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Error::InvalidArgument(message.into())
    }

    /// True for every precondition failure.
    pub fn is_invalid_argument(&self) -> bool {
        !matches!(self, Error::ThreadPool(_))
    }
}
