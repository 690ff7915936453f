//! [`RasterStore`] implementation backed by libnetcdf.

use std::path::{Path, PathBuf};

use grid_common::{Attribute, GridResult, RasterDataset, RasterStore};
use tracing::debug;

use crate::error::{NetCdfError, NetCdfResult};
use crate::native::{has_attr, silence_hdf5_errors, to_attribute};

/// Opens local NetCDF-3/4 files.
#[derive(Debug, Clone, Copy, Default)]
pub struct NetCdfStore;

impl NetCdfStore {
    pub fn new() -> Self {
        silence_hdf5_errors();
        Self
    }
}

impl RasterStore for NetCdfStore {
    fn open(&self, path: &Path) -> GridResult<Box<dyn RasterDataset>> {
        Ok(Box::new(NetCdfDataset::open(path)?))
    }
}

/// An open NetCDF file. The file is closed when this is dropped.
pub struct NetCdfDataset {
    file: netcdf::File,
    path: PathBuf,
}

impl NetCdfDataset {
    pub fn open(path: &Path) -> NetCdfResult<Self> {
        if !path.exists() {
            return Err(NetCdfError::IoError(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("{} does not exist", path.display()),
            )));
        }

        let file = netcdf::open(path).map_err(|e| NetCdfError::Library {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        debug!(path = %path.display(), "Opened NetCDF dataset");

        Ok(Self {
            file,
            path: path.to_path_buf(),
        })
    }

    fn variable(&self, name: &str) -> NetCdfResult<netcdf::Variable<'_>> {
        self.file.variable(name).ok_or_else(|| {
            NetCdfError::MissingData(format!("{} variable in {}", name, self.path.display()))
        })
    }

    fn library_error(&self, variable: &str, e: netcdf::Error) -> NetCdfError {
        NetCdfError::Library {
            path: self.path.display().to_string(),
            message: format!("{}: {}", variable, e),
        }
    }
}

impl RasterDataset for NetCdfDataset {
    fn path(&self) -> &Path {
        &self.path
    }

    fn has_variable(&self, name: &str) -> bool {
        self.file.variable(name).is_some()
    }

    fn dimensions(&self, variable: &str) -> GridResult<Vec<usize>> {
        let var = self.variable(variable)?;
        Ok(var.dimensions().iter().map(|d| d.len()).collect())
    }

    fn read_f32(&self, variable: &str) -> GridResult<Vec<f32>> {
        let var = self.variable(variable)?;
        let values: Vec<f32> = var
            .get_values(..)
            .map_err(|e| self.library_error(variable, e))?;
        Ok(values)
    }

    fn read_f64(&self, variable: &str) -> GridResult<Vec<f64>> {
        let var = self.variable(variable)?;
        let values: Vec<f64> = var
            .get_values(..)
            .map_err(|e| self.library_error(variable, e))?;
        Ok(values)
    }

    fn attribute(&self, variable: &str, name: &str) -> GridResult<Option<Attribute>> {
        let var = self.variable(variable)?;
        if !has_attr(&var, name) {
            return Ok(None);
        }

        match var.attribute_value(name) {
            Some(Ok(value)) => Ok(to_attribute(value)),
            Some(Err(e)) => Err(self.library_error(variable, e).into()),
            None => Ok(None),
        }
    }
}
