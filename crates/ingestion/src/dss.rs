//! HEC-DSS record paths and the external grid importer.

use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Command;

use chrono::{Datelike, NaiveDate};
use grid_common::{DataKind, SliceLabels};
use tracing::debug;

use crate::error::{PipelineError, Result};

/// `/<A>/<B>/<C>/<D>/<E>/<F>/` grid record path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DssPath {
    /// Grid coordinate system, e.g. `SHG`.
    pub grid_system: String,
    pub project: String,
    /// `PRECIP` or `TEMPERATURE`.
    pub parameter: String,
    pub start: String,
    /// Empty for instantaneous grids.
    pub end: String,
    /// e.g. `RFC-QPE`.
    pub version: String,
}

impl DssPath {
    pub fn new(
        grid_system: &str,
        project: &str,
        parameter: &str,
        labels: &SliceLabels,
        source: &str,
        variable: &str,
    ) -> Self {
        Self {
            grid_system: grid_system.to_string(),
            project: project.to_string(),
            parameter: parameter.to_string(),
            start: labels.start.clone(),
            end: labels.end.clone(),
            version: format!("{}-{}", source, variable),
        }
    }
}

impl fmt::Display for DssPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "/{}/{}/{}/{}/{}/{}/",
            self.grid_system, self.project, self.parameter, self.start, self.end, self.version
        )
    }
}

/// Default DSS file for one variable and month: `<dir>/NWD_<VAR>.<YYYY>.<MM>.dss`.
pub fn default_dss_file(data_dir: &Path, variable: &str, date: NaiveDate) -> PathBuf {
    data_dir.join(format!(
        "NWD_{}.{:04}.{:02}.dss",
        variable,
        date.year(),
        date.month()
    ))
}

/// One grid import.
#[derive(Debug, Clone)]
pub struct ImportRequest<'a> {
    pub ascii_file: &'a Path,
    pub dss_file: &'a Path,
    pub path: &'a DssPath,
    pub grid_system: &'a str,
    pub units: &'a str,
    pub kind: DataKind,
}

/// Stores an ASCII grid as a DSS record.
pub trait GridImporter {
    fn import(&self, request: &ImportRequest<'_>) -> Result<()>;
}

/// Runs HEC's `asc2dssGrid`.
#[derive(Debug, Clone)]
pub struct Asc2DssGrid {
    program: String,
}

impl Asc2DssGrid {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// `key=value` arguments. Each is a single argv entry, so units with
    /// spaces (`DEG F`) need no quoting.
    pub fn args(request: &ImportRequest<'_>) -> Vec<String> {
        vec![
            format!("in={}", request.ascii_file.display()),
            format!("dss={}", request.dss_file.display()),
            format!("path={}", request.path),
            format!("grid={}", request.grid_system),
            format!("dunits={}", request.units),
            format!("dtype={}", request.kind.dss_tag()),
        ]
    }
}

impl Default for Asc2DssGrid {
    fn default() -> Self {
        Self::new("asc2dssGrid")
    }
}

impl GridImporter for Asc2DssGrid {
    fn import(&self, request: &ImportRequest<'_>) -> Result<()> {
        let args = Self::args(request);
        debug!(program = %self.program, ?args, "Running grid importer");

        let tool_error = |reason: String| PipelineError::IngestionTool {
            program: self.program.clone(),
            path: request.path.to_string(),
            reason,
        };

        let output = Command::new(&self.program)
            .args(&args)
            .output()
            .map_err(|e| tool_error(e.to_string()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(tool_error(format!("{}: {}", output.status, stderr.trim())));
        }
        Ok(())
    }
}
