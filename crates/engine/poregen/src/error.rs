//! Error types for the generators

use thiserror::Error;

/// Result type for generator calls
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by the generators.
///
/// Running out of placement sites or missing a porosity target is reported
/// through the returned counters, never as an error.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// Failure inside a grid operation
    #[error(transparent)]
    Voxel(#[from] voxel::Error),

    /// A parameter was rejected before any work was done
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

impl Error {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Error::InvalidArgument(message.into())
    }

    /// True when the call was rejected because of its arguments.
    pub fn is_invalid_argument(&self) -> bool {
        match self {
            Error::Voxel(e) => e.is_invalid_argument(),
            Error::InvalidArgument(_) => true,
        }
    }
}

/// Reject shapes that are not 2-D or 3-D, or that have an empty axis.
pub(crate) fn check_shape(shape: &[usize], dims: &[usize]) -> Result<()> {
    if !dims.contains(&shape.len()) {
        return Err(Error::invalid(format!(
            "shape {:?} has {} dimensions, expected one of {:?}",
            shape,
            shape.len(),
            dims
        )));
    }
    if shape.contains(&0) {
        return Err(Error::invalid(format!("shape {:?} has an empty axis", shape)));
    }
    Ok(())
}

/// Reject a porosity outside `[0, 1]`.
pub(crate) fn check_fraction(name: &str, value: f64) -> Result<()> {
    if !(0.0..=1.0).contains(&value) {
        return Err(Error::invalid(format!(
            "{} must lie in [0, 1], got {}",
            name, value
        )));
    }
    Ok(())
}
