//! Error types for the ingestion crate.

use std::path::PathBuf;

use grid_common::GridError;
use thiserror::Error;

/// Project registry lookup failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("No project configuration was supplied")]
    NoConfiguration,

    #[error("Project '{0}' is not in the project configuration")]
    UnknownProject(String),
}

/// Errors that can occur while running the pipeline.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Failed to acquire {what}: {reason}")]
    Acquisition { what: String, reason: String },

    #[error("Reprojection of {path} failed: {source}")]
    Reprojection {
        path: PathBuf,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error("Bounding box for project '{project}' does not overlap the grid: {reason}")]
    ClipRange { project: String, reason: String },

    #[error("ASCII grid precondition failed: {0}")]
    SerializationPrecondition(String),

    #[error("{program} failed for {path}: {reason}")]
    IngestionTool {
        program: String,
        path: String,
        reason: String,
    },

    #[error("No raster is open")]
    NoOpenRaster,

    #[error("Grid error: {0}")]
    Grid(#[from] GridError),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl PipelineError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        PipelineError::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn reprojection(
        path: impl Into<PathBuf>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        PipelineError::Reprojection {
            path: path.into(),
            source: source.into(),
        }
    }
}

/// Result type for pipeline operations.
pub type Result<T> = std::result::Result<T, PipelineError>;
