//! RFC forecast grid ingestion into HEC-DSS.
//!
//! Turns NWRFC NetCDF grids (QPE, QPF, QTE, QTF) into DSS grid records for
//! a set of watershed projects.
//!
//! # Architecture
//!
//! - [`acquire`]: download and gunzip archive files
//! - [`warp`]: reproject through an external warper and restack the bands
//! - [`clip`]: cut a raster to a project's bounding box
//! - [`ascii`]: ESRI ASCII grid serialization
//! - [`dss`]: DSS record paths and the `asc2dssGrid` importer
//! - [`pipeline`]: the orchestrator tying these together
//!
//! External collaborators sit behind traits ([`GridSource`],
//! [`grid_common::RasterStore`], [`Warper`], [`GridImporter`]) so the
//! pipeline can run against fakes.

pub mod acquire;
pub mod ascii;
pub mod clip;
pub mod config;
pub mod dss;
pub mod error;
pub mod pipeline;
pub mod warp;

// Re-exports
pub use acquire::{decompress, DataType, FetchSummary, GridSource, RfcSource};
pub use ascii::{write_ascii_grid, AsciiGridHeader};
pub use clip::{clip, ClipRangeError, ClippedGrid};
pub use config::{lookup_project, PipelineSettings, ProjectRegistry, ALBERS_CONUS_SRS};
pub use dss::{Asc2DssGrid, DssPath, GridImporter, ImportRequest};
pub use error::{ConfigurationError, PipelineError, Result};
pub use pipeline::{BatchSummary, Pipeline};
pub use warp::{reproject, GdalWarp, ReprojectTarget, WarpRequest, Warper};
