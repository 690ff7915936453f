//! Pipeline configuration.
//!
//! Two pieces:
//! - [`PipelineSettings`]: directories, target grid and external programs.
//! - [`ProjectRegistry`]: watershed name to bounding box, loaded from YAML.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::Duration;
use grid_common::time::DEFAULT_WINDOW_HOURS;
use grid_common::BoundingBox;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{ConfigurationError, PipelineError, Result};

/// USA Contiguous Albers Equal Area (SHG) as a PROJ string.
pub const ALBERS_CONUS_SRS: &str = "+proj=aea +lat_1=29.5 +lat_2=45.5 +lat_0=23 +lon_0=-96 +x_0=0 +y_0=0 +ellps=GRS80 datum=NAD83 +towgs84=1,1,-1,0,0,0,0 +units=m";

pub const DEFAULT_BASE_URL: &str = "https://www.nwrfc.noaa.gov/weather/netcdf";

/// Everything the pipeline needs besides the project boxes.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    /// Where downloaded `.nc.gz` files are kept.
    pub raw_dir: PathBuf,
    /// Unzipped NetCDF, warped NetCDF and the scratch ASCII grid.
    pub temp_dir: PathBuf,
    /// Default location of generated DSS files.
    pub data_dir: PathBuf,
    /// Write every record to this DSS file instead of the per-month default.
    pub dss_file: Option<PathBuf>,
    pub cell_size: f64,
    pub target_srs: String,
    /// Pass `-tap` to the warper.
    pub align_pixels: bool,
    pub window: Duration,
    pub warp_program: String,
    pub import_program: String,
    /// DSS A-part and `grid=` argument.
    pub grid_system: String,
    /// Prefix of the DSS F-part, e.g. `RFC` in `RFC-QPE`.
    pub source: String,
    pub base_url: String,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            raw_dir: PathBuf::from("raw"),
            temp_dir: PathBuf::from("temp"),
            data_dir: PathBuf::from("data"),
            dss_file: None,
            cell_size: 2000.0,
            target_srs: ALBERS_CONUS_SRS.to_string(),
            align_pixels: true,
            window: Duration::hours(DEFAULT_WINDOW_HOURS),
            warp_program: "gdalwarp".to_string(),
            import_program: "asc2dssGrid".to_string(),
            grid_system: "SHG".to_string(),
            source: "RFC".to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }
}

impl PipelineSettings {
    pub fn validate(&self) -> Result<()> {
        if !(self.cell_size.is_finite() && self.cell_size > 0.0) {
            return Err(PipelineError::Config(format!(
                "cell size must be positive, got {}",
                self.cell_size
            )));
        }
        if self.target_srs.trim().is_empty() {
            return Err(PipelineError::Config("target SRS is empty".to_string()));
        }
        if self.window <= Duration::zero() {
            return Err(PipelineError::Config(
                "accumulation window must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Scratch ASCII grid for one variable, overwritten per slice.
    pub fn ascii_path(&self, variable: &str) -> PathBuf {
        self.temp_dir.join(format!("{}_temp.asc", variable))
    }

    /// Output of the warper for one variable.
    pub fn warped_path(&self, variable: &str) -> PathBuf {
        self.temp_dir.join(format!("{}_warped.nc", variable))
    }
}

/// Watershed boxes keyed by project name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectRegistry {
    #[serde(default)]
    projects: BTreeMap<String, BoundingBox>,
}

impl ProjectRegistry {
    pub fn new(projects: impl IntoIterator<Item = (String, BoundingBox)>) -> Self {
        Self {
            projects: projects.into_iter().collect(),
        }
    }

    /// Load a registry from a YAML file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| PipelineError::io(path, e))?;
        let registry = Self::from_yaml(&text).map_err(|e| match e {
            PipelineError::Config(msg) => {
                PipelineError::Config(format!("{}: {}", path.display(), msg))
            }
            other => other,
        })?;
        info!(
            path = %path.display(),
            projects = registry.projects.len(),
            "Loaded project configuration"
        );
        Ok(registry)
    }

    pub fn from_yaml(text: &str) -> Result<Self> {
        serde_yaml::from_str(text).map_err(|e| PipelineError::Config(e.to_string()))
    }

    pub fn get(&self, project: &str) -> Option<&BoundingBox> {
        self.projects.get(project)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.projects.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &BoundingBox)> {
        self.projects.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.projects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.projects.is_empty()
    }
}

/// Resolve a project's box.
///
/// A missing registry and a registry without the project are different
/// failures.
pub fn lookup_project<'a>(
    registry: Option<&'a ProjectRegistry>,
    project: &str,
) -> std::result::Result<&'a BoundingBox, ConfigurationError> {
    let registry = registry.ok_or(ConfigurationError::NoConfiguration)?;
    registry
        .get(project)
        .ok_or_else(|| ConfigurationError::UnknownProject(project.to_string()))
}
