//! In-memory fakes for the pipeline's external collaborators.
//!
//! - `FakeStore` serves datasets from a shared map keyed by path.
//! - `FakeWarper` "warps" by writing a band-per-timestep dataset into the map.
//! - `FakeImporter` records every import and the ASCII header it was given.
//! - `FakeSource` returns paths to datasets already in the map.

#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use chrono::NaiveDate;
use grid_common::{Attribute, GridError, GridResult, RasterDataset, RasterStore};
use ingestion::{
    AsciiGridHeader, DataType, GridImporter, GridSource, ImportRequest, PipelineError,
    PipelineSettings, ProjectRegistry, WarpRequest, Warper,
};
use test_utils::{create_test_cube, fixtures, regular_coords};

pub const FILL: f64 = -9999.0;

/// Target grid written by [`FakeWarper`]: 2 km cells, y descending.
pub const WARP_X0: f64 = -2_000_000.0;
pub const WARP_NX: usize = 400;
pub const WARP_Y0: f64 = 3_100_000.0;
pub const WARP_NY: usize = 200;

#[derive(Debug, Clone, Default)]
pub struct FakeDataset {
    pub path: PathBuf,
    pub vars: HashMap<String, (Vec<usize>, Vec<f64>)>,
    pub attrs: HashMap<(String, String), Attribute>,
}

impl FakeDataset {
    pub fn with_var(mut self, name: &str, dims: Vec<usize>, values: Vec<f64>) -> Self {
        self.vars.insert(name.to_string(), (dims, values));
        self
    }

    pub fn with_attr(mut self, var: &str, name: &str, value: Attribute) -> Self {
        self.attrs.insert((var.to_string(), name.to_string()), value);
        self
    }

    fn var(&self, name: &str) -> GridResult<&(Vec<usize>, Vec<f64>)> {
        self.vars
            .get(name)
            .ok_or_else(|| GridError::MissingData(format!("{} variable", name)))
    }
}

impl RasterDataset for FakeDataset {
    fn path(&self) -> &Path {
        &self.path
    }

    fn has_variable(&self, name: &str) -> bool {
        self.vars.contains_key(name)
    }

    fn dimensions(&self, variable: &str) -> GridResult<Vec<usize>> {
        Ok(self.var(variable)?.0.clone())
    }

    fn read_f32(&self, variable: &str) -> GridResult<Vec<f32>> {
        Ok(self.var(variable)?.1.iter().map(|v| *v as f32).collect())
    }

    fn read_f64(&self, variable: &str) -> GridResult<Vec<f64>> {
        Ok(self.var(variable)?.1.clone())
    }

    fn attribute(&self, variable: &str, name: &str) -> GridResult<Option<Attribute>> {
        self.var(variable)?;
        Ok(self
            .attrs
            .get(&(variable.to_string(), name.to_string()))
            .cloned())
    }
}

pub type Datasets = Rc<RefCell<HashMap<PathBuf, FakeDataset>>>;

#[derive(Clone, Default)]
pub struct FakeStore {
    pub datasets: Datasets,
}

impl RasterStore for FakeStore {
    fn open(&self, path: &Path) -> GridResult<Box<dyn RasterDataset>> {
        self.datasets
            .borrow()
            .get(path)
            .cloned()
            .map(|d| Box::new(d) as Box<dyn RasterDataset>)
            .ok_or_else(|| GridError::RasterRead(format!("no dataset at {}", path.display())))
    }
}

/// Scale and offset written on packed bands.
pub const PACK_SCALE: f64 = 0.5;
pub const PACK_OFFSET: f64 = 1.0;

#[derive(Clone, Default)]
pub struct FakeWarper {
    pub datasets: Datasets,
    pub requests: Rc<RefCell<Vec<WarpRequest>>>,
    pub fail: bool,
    /// Write bands with `scale_factor`/`add_offset` and a fill cell at (0, 0).
    pub packed: bool,
    /// Write only this many bands.
    pub band_limit: Option<usize>,
    /// Write the last band as (x, y) instead of (y, x).
    pub transpose_last: bool,
}

impl Warper for FakeWarper {
    fn warp(&self, request: &WarpRequest) -> ingestion::Result<()> {
        self.requests.borrow_mut().push(request.clone());
        if self.fail {
            return Err(PipelineError::Reprojection {
                path: request.source_path.clone(),
                source: "gdalwarp exited with 1".into(),
            });
        }

        let nt = {
            let datasets = self.datasets.borrow();
            let source = datasets.get(&request.source_path).ok_or_else(|| {
                PipelineError::Reprojection {
                    path: request.source_path.clone(),
                    source: "source not found".into(),
                }
            })?;
            source.vars[&request.source_variable].0[0]
        };

        let cube = create_test_cube(nt, WARP_NY, WARP_NX);
        let layer = WARP_NY * WARP_NX;
        let mut warped = FakeDataset {
            path: request.target_path.clone(),
            ..Default::default()
        }
        .with_var("x", vec![WARP_NX], regular_coords(WARP_X0, 2000.0, WARP_NX))
        .with_var("y", vec![WARP_NY], regular_coords(WARP_Y0, -2000.0, WARP_NY));
        let bands = self.band_limit.unwrap_or(nt).min(nt);
        for t in 0..bands {
            let mut band: Vec<f64> = cube[t * layer..(t + 1) * layer]
                .iter()
                .map(|v| *v as f64)
                .collect();
            let name = format!("Band{}", t + 1);
            let dims = if self.transpose_last && t + 1 == bands {
                vec![WARP_NX, WARP_NY]
            } else {
                vec![WARP_NY, WARP_NX]
            };
            if self.packed {
                band[0] = FILL;
            }
            warped = warped
                .with_var(&name, dims, band)
                .with_attr(&name, "_FillValue", Attribute::Number(FILL));
            if self.packed {
                warped = warped
                    .with_attr(&name, "scale_factor", Attribute::Number(PACK_SCALE))
                    .with_attr(&name, "add_offset", Attribute::Number(PACK_OFFSET));
            }
        }

        self.datasets
            .borrow_mut()
            .insert(request.target_path.clone(), warped);
        Ok(())
    }
}

/// What the importer saw for one record.
#[derive(Debug, Clone)]
pub struct ImportRecord {
    pub dss_file: PathBuf,
    pub path: String,
    pub units: String,
    pub dtype: String,
    pub header: AsciiGridHeader,
}

#[derive(Clone, Default)]
pub struct FakeImporter {
    pub records: Rc<RefCell<Vec<ImportRecord>>>,
    /// Fail the call with this index.
    pub fail_at: Option<usize>,
}

impl GridImporter for FakeImporter {
    fn import(&self, request: &ImportRequest<'_>) -> ingestion::Result<()> {
        if Some(self.records.borrow().len()) == self.fail_at {
            return Err(PipelineError::IngestionTool {
                program: "asc2dssGrid".to_string(),
                path: request.path.to_string(),
                reason: "exit status: 1".to_string(),
            });
        }

        let text = fs::read_to_string(request.ascii_file).map_err(|e| PipelineError::Io {
            path: request.ascii_file.to_path_buf(),
            source: e,
        })?;
        self.records.borrow_mut().push(ImportRecord {
            dss_file: request.dss_file.to_path_buf(),
            path: request.path.to_string(),
            units: request.units.to_string(),
            dtype: request.kind.dss_tag().to_string(),
            header: AsciiGridHeader::parse(&text)?,
        });
        Ok(())
    }
}

/// Serves `<dir>/<TYPE>.<YYYYMMDD>12.nc` for dates in `available`.
#[derive(Clone, Default)]
pub struct FakeSource {
    pub datasets: Datasets,
    pub available: HashSet<NaiveDate>,
}

impl GridSource for FakeSource {
    fn fetch(
        &self,
        data_type: DataType,
        date: NaiveDate,
        directory: &Path,
        _force: bool,
    ) -> ingestion::Result<PathBuf> {
        if !self.available.contains(&date) {
            return Err(PipelineError::Acquisition {
                what: format!("{} {}", data_type, date),
                reason: "404 Not Found".to_string(),
            });
        }
        let path = source_path(directory, data_type, date);
        let dataset = source_dataset(&path, data_type.as_str(), date);
        self.datasets.borrow_mut().insert(path.clone(), dataset);
        Ok(path)
    }
}

pub fn source_path(directory: &Path, data_type: DataType, date: NaiveDate) -> PathBuf {
    directory.join(format!("{}.{}12.nc", data_type, date.format("%Y%m%d")))
}

/// A 4-step source grid valid at 18, 00, 06 and 12 UTC starting on `date`.
pub fn source_dataset(path: &Path, variable: &str, date: NaiveDate) -> FakeDataset {
    let (nt, ny, nx) = (4, 6, 5);
    let data = create_test_cube(nt, ny, nx).into_iter().map(f64::from).collect();
    let units = if variable.chars().nth(1) == Some('T') { "K" } else { "in" };

    FakeDataset {
        path: path.to_path_buf(),
        ..Default::default()
    }
    .with_var(variable, vec![nt, ny, nx], data)
    .with_var("x", vec![nx], regular_coords(-1_000_000.0, 4000.0, nx))
    .with_var("y", vec![ny], regular_coords(1_000_000.0, -4000.0, ny))
    .with_var("time", vec![nt], vec![18.0, 24.0, 30.0, 36.0])
    .with_attr(
        "time",
        "units",
        Attribute::Text(format!("hours since {} 00:00:00", date.format("%Y-%m-%d"))),
    )
    .with_var("crs", vec![], vec![0.0])
    .with_attr("crs", "proj4_params", Attribute::Text(fixtures::srs::NWRFC_STEREO.to_string()))
    .with_attr(variable, "grid_mapping", Attribute::Text("crs".to_string()))
    .with_attr(variable, "_FillValue", Attribute::Number(FILL))
    .with_attr(variable, "units", Attribute::Text(units.to_string()))
}

pub fn registry() -> ProjectRegistry {
    let (xmin, ymin, xmax, ymax) = fixtures::bbox::YAKIMA;
    let (kxmin, kymin, kxmax, kymax) = fixtures::bbox::KOOTENAI;
    ProjectRegistry::new([
        (
            "yakima".to_string(),
            grid_common::BoundingBox::new(xmin, ymin, xmax, ymax).unwrap(),
        ),
        (
            "kootenai".to_string(),
            grid_common::BoundingBox::new(kxmin, kymin, kxmax, kymax).unwrap(),
        ),
        (
            "far_away".to_string(),
            grid_common::BoundingBox::new(5_000_000.0, 5_000_000.0, 5_100_000.0, 5_100_000.0)
                .unwrap(),
        ),
    ])
}

pub fn settings(root: &Path) -> PipelineSettings {
    PipelineSettings {
        raw_dir: root.join("raw"),
        temp_dir: root.join("temp"),
        data_dir: root.join("data"),
        ..Default::default()
    }
}

/// A pipeline wired to fakes, plus handles on their shared state.
pub struct Harness {
    pub pipeline: ingestion::Pipeline,
    pub datasets: Datasets,
    pub warps: Rc<RefCell<Vec<WarpRequest>>>,
    pub imports: Rc<RefCell<Vec<ImportRecord>>>,
    pub root: tempfile::TempDir,
}

pub struct HarnessOptions {
    pub registry: Option<ProjectRegistry>,
    pub available: Vec<NaiveDate>,
    pub warp_fails: bool,
    pub import_fail_at: Option<usize>,
}

impl Default for HarnessOptions {
    fn default() -> Self {
        Self {
            registry: Some(registry()),
            available: vec![date(2020, 4, 21)],
            warp_fails: false,
            import_fail_at: None,
        }
    }
}

pub fn harness(options: HarnessOptions) -> Harness {
    let root = tempfile::tempdir().unwrap();
    let datasets = Datasets::default();
    let store = FakeStore {
        datasets: datasets.clone(),
    };
    let warper = FakeWarper {
        datasets: datasets.clone(),
        fail: options.warp_fails,
        ..Default::default()
    };
    let importer = FakeImporter {
        fail_at: options.import_fail_at,
        ..Default::default()
    };
    let source = FakeSource {
        datasets: datasets.clone(),
        available: options.available.into_iter().collect(),
    };

    let warps = warper.requests.clone();
    let imports = importer.records.clone();
    let pipeline = ingestion::Pipeline::with_components(
        settings(root.path()),
        options.registry,
        Box::new(source),
        Box::new(store),
        Box::new(warper),
        Box::new(importer),
    );

    Harness {
        pipeline,
        datasets,
        warps,
        imports,
        root,
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}
