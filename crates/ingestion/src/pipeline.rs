//! Pipeline orchestration: fetch, open, reproject, then clip and import per
//! project and time step.
//!
//! A [`Pipeline`] holds at most one raster. Opening a new one releases the
//! previous raster first, and [`Pipeline::process_date`] releases it on every
//! exit path.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{NaiveDate, Utc};
use grid_common::{slice_labels, Parameter, Raster, RasterStore};
use netcdf_parser::NetCdfStore;
use tracing::{error, info, instrument, warn};

use crate::acquire::{self, days_inclusive, DataType, GridSource, RfcSource};
use crate::ascii::{write_ascii_grid, AsciiGridHeader};
use crate::clip::clip;
use crate::config::{lookup_project, PipelineSettings, ProjectRegistry};
use crate::dss::{default_dss_file, Asc2DssGrid, DssPath, GridImporter, ImportRequest};
use crate::error::{PipelineError, Result};
use crate::warp::{self, GdalWarp, ReprojectTarget, Warper};

struct OpenRaster {
    raster: Raster,
    path: PathBuf,
    date: NaiveDate,
}

/// Drives one raster at a time through the pipeline.
pub struct Pipeline {
    settings: PipelineSettings,
    registry: Option<ProjectRegistry>,
    source: Box<dyn GridSource>,
    store: Box<dyn RasterStore>,
    warper: Box<dyn Warper>,
    importer: Box<dyn GridImporter>,
    current: Option<OpenRaster>,
}

impl Pipeline {
    /// Pipeline backed by the NWRFC archive, libnetcdf, `gdalwarp` and
    /// `asc2dssGrid`.
    pub fn new(settings: PipelineSettings, registry: Option<ProjectRegistry>) -> Result<Self> {
        settings.validate()?;
        let source = RfcSource::new(settings.base_url.clone())?;
        let warper = GdalWarp::new(settings.warp_program.clone());
        let importer = Asc2DssGrid::new(settings.import_program.clone());
        Ok(Self::with_components(
            settings,
            registry,
            Box::new(source),
            Box::new(NetCdfStore::new()),
            Box::new(warper),
            Box::new(importer),
        ))
    }

    pub fn with_components(
        settings: PipelineSettings,
        registry: Option<ProjectRegistry>,
        source: Box<dyn GridSource>,
        store: Box<dyn RasterStore>,
        warper: Box<dyn Warper>,
        importer: Box<dyn GridImporter>,
    ) -> Self {
        Self {
            settings,
            registry,
            source,
            store,
            warper,
            importer,
            current: None,
        }
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    pub fn registry(&self) -> Option<&ProjectRegistry> {
        self.registry.as_ref()
    }

    /// The open raster, if any.
    pub fn raster(&self) -> Option<&Raster> {
        self.current.as_ref().map(|c| &c.raster)
    }

    /// Path the open raster was read from.
    pub fn raster_path(&self) -> Option<&Path> {
        self.current.as_ref().map(|c| c.path.as_path())
    }

    pub fn is_open(&self) -> bool {
        self.current.is_some()
    }

    /// Release the open raster.
    pub fn close(&mut self) {
        if let Some(open) = self.current.take() {
            info!(path = %open.path.display(), "Released raster");
        }
    }

    /// Open a raster from a `.nc` or `.nc.gz` file.
    ///
    /// The variable is the file stem up to the first dot (`QPE.2020042112.nc`
    /// reads `QPE`). `date` selects the monthly DSS file; when omitted it is
    /// taken from the file name, then from the first time step.
    #[instrument(skip(self), fields(path = %path.display()), err)]
    pub fn open(&mut self, path: &Path, date: Option<NaiveDate>) -> Result<&Raster> {
        self.close();

        let nc_path = if path.extension().map_or(false, |e| e == "gz") {
            acquire::decompress(path, &self.settings.temp_dir)?
        } else {
            path.to_path_buf()
        };
        let variable = variable_from_path(&nc_path)?;

        let raster = {
            let dataset = self.store.open(&nc_path)?;
            Raster::load(&*dataset, &variable)?
        };

        let date = date
            .or_else(|| date_from_path(&nc_path))
            .or_else(|| raster.times().first().map(|t| t.date_naive()))
            .unwrap_or_else(|| Utc::now().date_naive());

        let [nt, ny, nx] = raster.shape();
        info!(variable = %variable, nt, ny, nx, %date, "Opened raster");

        let this = self;
        let open = this.current.insert(OpenRaster {
            raster,
            path: nc_path,
            date,
        });
        Ok(&open.raster)
    }

    /// Replace the open raster with its reprojection onto the target grid.
    ///
    /// On failure the open raster is released.
    #[instrument(skip(self), err)]
    pub fn reproject(&mut self) -> Result<&Raster> {
        let open = self.current.take().ok_or(PipelineError::NoOpenRaster)?;
        let target_path = self.settings.warped_path(open.raster.variable());
        fs::create_dir_all(&self.settings.temp_dir)
            .map_err(|e| PipelineError::io(&self.settings.temp_dir, e))?;
        let target = ReprojectTarget {
            path: &target_path,
            srs: &self.settings.target_srs,
            cell_size: self.settings.cell_size,
            align: self.settings.align_pixels,
        };

        let warped = warp::reproject(
            self.store.as_ref(),
            self.warper.as_ref(),
            &open.raster,
            &open.path,
            &target,
        )?;

        let date = open.date;
        drop(open);
        let this = self;
        let open = this.current.insert(OpenRaster {
            raster: warped,
            path: target_path,
            date,
        });
        Ok(&open.raster)
    }

    /// Clip the open raster to `project` and import every time step into DSS.
    ///
    /// Returns the number of records written.
    #[instrument(skip(self), err)]
    pub fn clip_to_dss(&mut self, project: &str) -> Result<usize> {
        let bbox = *lookup_project(self.registry.as_ref(), project)?;
        let open = self.current.as_ref().ok_or(PipelineError::NoOpenRaster)?;
        let raster = &open.raster;
        let settings = &self.settings;

        let clipped = clip(&bbox, raster).map_err(|e| {
            error!(project, error = %e, "Clip failed");
            PipelineError::ClipRange {
                project: project.to_string(),
                reason: e.to_string(),
            }
        })?;

        let variable = raster.variable();
        let parameter = Parameter::from_variable(variable)?;
        let kind = parameter.data_kind();
        let units = parameter.dss_units(raster.units())?;

        let dss_file = settings
            .dss_file
            .clone()
            .unwrap_or_else(|| default_dss_file(&settings.data_dir, variable, open.date));
        if let Some(parent) = dss_file.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| PipelineError::io(parent, e))?;
        }
        fs::create_dir_all(&settings.temp_dir)
            .map_err(|e| PipelineError::io(&settings.temp_dir, e))?;
        let ascii_file = settings.ascii_path(variable);

        let header = AsciiGridHeader {
            ncols: clipped.cols(),
            nrows: clipped.rows(),
            xllcorner: clipped.xll(),
            yllcorner: clipped.yll(),
            cellsize: settings.cell_size,
            nodata: raster.fill_value(),
        };

        let mut written = 0;
        for (t, time) in raster.times().iter().enumerate() {
            let labels = slice_labels(*time, kind, settings.window);
            let path = DssPath::new(
                &settings.grid_system,
                project,
                parameter.dss_name(),
                &labels,
                &settings.source,
                variable,
            );
            let layer = clipped.layer(t).ok_or_else(|| {
                PipelineError::SerializationPrecondition(format!("missing time step {}", t))
            })?;

            write_ascii_grid(&ascii_file, &header, layer)?;
            self.importer.import(&ImportRequest {
                ascii_file: &ascii_file,
                dss_file: &dss_file,
                path: &path,
                grid_system: &settings.grid_system,
                units: &units,
                kind,
            })?;
            info!(dss_path = %path, "Stored grid");
            written += 1;
        }

        info!(
            project,
            records = written,
            dss_file = %dss_file.display(),
            "Project complete"
        );
        Ok(written)
    }

    /// Fetch, open and reproject one product for one day, then store it for
    /// each project. The first failing project aborts the date.
    #[instrument(skip(self, projects), err)]
    pub fn process_date(
        &mut self,
        data_type: DataType,
        date: NaiveDate,
        projects: &[String],
        force: bool,
    ) -> Result<usize> {
        let result = self.run_date(data_type, date, projects, force);
        self.close();
        result
    }

    fn run_date(
        &mut self,
        data_type: DataType,
        date: NaiveDate,
        projects: &[String],
        force: bool,
    ) -> Result<usize> {
        let raw = self
            .source
            .fetch(data_type, date, &self.settings.raw_dir, force)?;
        self.open(&raw, Some(date))?;
        self.reproject()?;

        let mut written = 0;
        for project in projects {
            written += self.clip_to_dss(project)?;
        }
        Ok(written)
    }

    /// Run [`Pipeline::process_date`] for every product and day in
    /// `start..=end` (`end` defaults to today), logging failures and moving
    /// on.
    pub fn process_range(
        &mut self,
        types: &[DataType],
        start: NaiveDate,
        end: Option<NaiveDate>,
        projects: &[String],
        force: bool,
    ) -> BatchSummary {
        let end = end.unwrap_or_else(acquire::today);
        let mut summary = BatchSummary::default();

        for &data_type in types {
            for date in days_inclusive(start, end) {
                match self.process_date(data_type, date, projects, force) {
                    Ok(records) => {
                        summary.records += records;
                        summary.completed += 1;
                    }
                    Err(e) => {
                        warn!(%data_type, %date, error = %e, "Processing failed, continuing");
                        summary.failures.push(BatchFailure {
                            data_type,
                            date,
                            reason: e.to_string(),
                        });
                    }
                }
            }
        }

        info!(
            completed = summary.completed,
            failed = summary.failures.len(),
            records = summary.records,
            "Batch complete"
        );
        summary
    }
}

/// A (type, date) pair that failed in a batch.
#[derive(Debug, Clone)]
pub struct BatchFailure {
    pub data_type: DataType,
    pub date: NaiveDate,
    pub reason: String,
}

/// Outcome of [`Pipeline::process_range`].
#[derive(Debug, Clone, Default)]
pub struct BatchSummary {
    pub completed: usize,
    pub records: usize,
    pub failures: Vec<BatchFailure>,
}

/// `QPE.2020042112.nc` -> `QPE`.
pub fn variable_from_path(path: &Path) -> Result<String> {
    path.file_name()
        .and_then(|n| n.to_str())
        .and_then(|n| n.split('.').next())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .ok_or_else(|| {
            PipelineError::Config(format!("cannot derive a variable from {}", path.display()))
        })
}

/// `QPE.2020042112.nc` -> 2020-04-21.
fn date_from_path(path: &Path) -> Option<NaiveDate> {
    let name = path.file_name()?.to_str()?;
    let stamp = name.split('.').nth(1)?;
    NaiveDate::parse_from_str(stamp.get(..8)?, "%Y%m%d").ok()
}
