//! Common types shared across the RFC grid pipeline crates.

pub mod bbox;
pub mod error;
pub mod parameter;
pub mod raster;
pub mod time;

pub use bbox::{BboxError, BoundingBox};
pub use error::{GridError, GridResult};
pub use parameter::{DataKind, Parameter};
pub use raster::{Attribute, Raster, RasterDataset, RasterParts, RasterStore};
pub use time::{decode_cf_times, slice_labels, SliceLabels, DSS_TIME_FORMAT};
