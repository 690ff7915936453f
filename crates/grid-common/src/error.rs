//! Error types for raster handling.

use thiserror::Error;

use crate::bbox::BboxError;

/// Result type alias using GridError.
pub type GridResult<T> = Result<T, GridError>;

/// Errors raised while reading or validating gridded data.
#[derive(Debug, Error)]
pub enum GridError {
    #[error("Invalid bounding box: {0}")]
    InvalidBbox(#[from] BboxError),

    #[error("Missing required data: {0}")]
    MissingData(String),

    #[error("Shape mismatch for {what}: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        what: String,
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    #[error("Coordinate '{0}' is not strictly monotonic")]
    NonMonotonic(String),

    #[error("Invalid time specification: {0}")]
    InvalidTime(String),

    #[error("Cannot determine data kind from variable '{0}'")]
    UnknownParameter(String),

    #[error("Failed to read raster: {0}")]
    RasterRead(String),
}
