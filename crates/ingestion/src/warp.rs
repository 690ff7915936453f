//! Reprojection through an external warper.
//!
//! The warp itself is delegated (GDAL's `gdalwarp` by default). The warped
//! NetCDF holds one `BandN` variable per time step and no time axis, so the
//! result is restacked here against the source raster's times.

use std::path::{Path, PathBuf};
use std::process::Command;

use grid_common::raster::{fill_value, text_attribute, unpack};
use grid_common::{GridError, Raster, RasterDataset, RasterParts, RasterStore};
use tracing::{debug, error, info, instrument};

use crate::error::{PipelineError, Result};

/// Inputs of one warp call.
#[derive(Debug, Clone)]
pub struct WarpRequest {
    pub source_path: PathBuf,
    pub source_variable: String,
    pub target_path: PathBuf,
    pub source_srs: String,
    pub target_srs: String,
    pub cell_size: f64,
    /// Snap output extent to multiples of the cell size.
    pub align: bool,
    pub no_data: f64,
}

/// Writes a reprojected copy of a dataset at `request.target_path`.
pub trait Warper {
    fn warp(&self, request: &WarpRequest) -> Result<()>;
}

/// Runs the `gdalwarp` command line tool.
#[derive(Debug, Clone)]
pub struct GdalWarp {
    program: String,
}

impl GdalWarp {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn args(request: &WarpRequest) -> Vec<String> {
        let cell = request.cell_size.to_string();
        let mut args = vec![
            "-s_srs".to_string(),
            request.source_srs.clone(),
            "-t_srs".to_string(),
            request.target_srs.clone(),
            "-dstnodata".to_string(),
            request.no_data.to_string(),
            "-of".to_string(),
            "netCDF".to_string(),
            "-tr".to_string(),
            cell.clone(),
            cell,
        ];
        if request.align {
            args.push("-tap".to_string());
        }
        args.push("-overwrite".to_string());
        args.push(format!(
            "NETCDF:\"{}\":{}",
            request.source_path.display(),
            request.source_variable
        ));
        args.push(request.target_path.display().to_string());
        args
    }
}

impl Default for GdalWarp {
    fn default() -> Self {
        Self::new("gdalwarp")
    }
}

impl Warper for GdalWarp {
    fn warp(&self, request: &WarpRequest) -> Result<()> {
        let args = Self::args(request);
        debug!(program = %self.program, ?args, "Running warper");

        let output = Command::new(&self.program)
            .args(&args)
            .output()
            .map_err(|e| PipelineError::reprojection(&request.source_path, e))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(PipelineError::reprojection(
                &request.source_path,
                format!("{} exited with {}: {}", self.program, output.status, stderr.trim()),
            ));
        }
        Ok(())
    }
}

/// Target grid of a reprojection.
#[derive(Debug, Clone)]
pub struct ReprojectTarget<'a> {
    pub path: &'a Path,
    pub srs: &'a str,
    pub cell_size: f64,
    pub align: bool,
}

/// Warp `source` (read from `source_path`) and reassemble a (time, y, x)
/// raster in the target SRS.
///
/// The warp is run once for all time steps. Layer `k` of the result is
/// `Band{k+1}` of the warped file and carries the source's `k`-th time.
#[instrument(
    skip_all,
    fields(variable = %source.variable(), source = %source_path.display(), target = %target.path.display()),
    err
)]
pub fn reproject(
    store: &dyn RasterStore,
    warper: &dyn Warper,
    source: &Raster,
    source_path: &Path,
    target: &ReprojectTarget<'_>,
) -> Result<Raster> {
    if target.path == source_path {
        return Err(PipelineError::reprojection(
            source_path,
            "warp target is the source file",
        ));
    }
    let source_srs = source.srs().ok_or_else(|| {
        PipelineError::reprojection(source_path, "source has no proj4_params grid mapping")
    })?;

    let request = WarpRequest {
        source_path: source_path.to_path_buf(),
        source_variable: source.variable().to_string(),
        target_path: target.path.to_path_buf(),
        source_srs: source_srs.to_string(),
        target_srs: target.srs.to_string(),
        cell_size: target.cell_size,
        align: target.align,
        no_data: source.fill_value(),
    };

    if let Err(e) = warper.warp(&request) {
        error!(error = %e, "Warp failed");
        return Err(e);
    }

    let warped = restack(store, source, target).map_err(|e| {
        error!(error = %e, "Could not read warped dataset");
        PipelineError::reprojection(source_path, e)
    })?;

    let [nt, ny, nx] = warped.shape();
    info!(nt, ny, nx, "Reprojected");
    Ok(warped)
}

fn restack(
    store: &dyn RasterStore,
    source: &Raster,
    target: &ReprojectTarget<'_>,
) -> std::result::Result<Raster, GridError> {
    let dataset = store.open(target.path)?;
    let x = dataset.read_f64("x")?;
    let y = dataset.read_f64("y")?;
    let nt = source.times().len();

    let nodata = source.fill_value();
    let mut units = source.units().map(str::to_string);
    let mut data = Vec::with_capacity(nt * x.len() * y.len());
    for band in 1..=nt {
        let name = format!("Band{}", band);
        let dims = dataset.dimensions(&name)?;
        if dims != [y.len(), x.len()] {
            return Err(GridError::ShapeMismatch {
                what: name,
                expected: vec![y.len(), x.len()],
                actual: dims,
            });
        }

        let band_fill = match fill_value(&*dataset, &name) {
            Ok(v) => v,
            Err(GridError::MissingData(_)) => nodata,
            Err(e) => return Err(e),
        };
        let mut values = dataset.read_f32(&name)?;
        if band_fill != nodata {
            let (from, to) = (band_fill as f32, nodata as f32);
            values.iter_mut().filter(|v| **v == from).for_each(|v| *v = to);
        }
        unpack(&*dataset, &name, &mut values, nodata)?;
        data.extend(values);

        if band == 1 {
            if let Some(u) = text_attribute(&*dataset, &name, "units")? {
                units = Some(u);
            }
        }
    }

    Raster::new(RasterParts {
        variable: source.variable().to_string(),
        data,
        x,
        y,
        times: source.times().to_vec(),
        fill_value: nodata,
        srs: Some(target.srs.to_string()),
        units,
    })
}
