//! NetCDF reader for NWRFC forecast grids.
//!
//! NWRFC publishes QPE/QPF/QTE/QTF grids as CF NetCDF files with a
//! (time, y, x) data variable, `x`/`y` projected coordinates, a CF `time`
//! variable and a grid-mapping variable carrying `proj4_params`. This crate
//! exposes those files through the [`grid_common::RasterStore`] interface; the
//! pipeline itself never touches libnetcdf directly.

pub mod error;
pub mod native;
mod store;

pub use error::{NetCdfError, NetCdfResult};
pub use native::silence_hdf5_errors;
pub use store::{NetCdfDataset, NetCdfStore};
