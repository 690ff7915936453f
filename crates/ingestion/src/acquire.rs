//! Raw grid acquisition from the NWRFC NetCDF archive.
//!
//! Files are published daily as `<TYPE>.<YYYYMMDD>12.nc.gz` under
//! `<base>/<YYYY>/<YYYYMMDD>/`. Downloads land in `<file>.partial` and are
//! renamed into place once complete, so a file present in the raw directory
//! is always whole.

use std::fmt;
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use chrono::{NaiveDate, Utc};
use flate2::read::GzDecoder;
use tracing::{debug, error, info, instrument, warn};

use crate::error::{PipelineError, Result};

/// RFC grid products.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DataType {
    /// Quantitative precipitation estimate
    Qpe,
    /// Quantitative precipitation forecast
    Qpf,
    /// Quantitative temperature estimate
    Qte,
    /// Quantitative temperature forecast
    Qtf,
}

impl DataType {
    pub const ALL: [DataType; 4] = [DataType::Qpe, DataType::Qpf, DataType::Qte, DataType::Qtf];

    pub fn as_str(&self) -> &'static str {
        match self {
            DataType::Qpe => "QPE",
            DataType::Qpf => "QPF",
            DataType::Qte => "QTE",
            DataType::Qtf => "QTF",
        }
    }

    /// Parse a comma separated list; `all` expands to every product.
    pub fn parse_list(s: &str) -> Result<Vec<DataType>> {
        let mut types = Vec::new();
        for item in s.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            if item.eq_ignore_ascii_case("all") {
                return Ok(Self::ALL.to_vec());
            }
            let dt = item.parse::<DataType>()?;
            if !types.contains(&dt) {
                types.push(dt);
            }
        }
        if types.is_empty() {
            return Err(PipelineError::Config("no data types given".to_string()));
        }
        Ok(types)
    }
}

impl FromStr for DataType {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "QPE" => Ok(DataType::Qpe),
            "QPF" => Ok(DataType::Qpf),
            "QTE" => Ok(DataType::Qte),
            "QTF" => Ok(DataType::Qtf),
            other => Err(PipelineError::Config(format!(
                "unknown data type '{}' (expected QPE, QPF, QTE, QTF or all)",
                other
            ))),
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Archive file name, e.g. `QPE.2020042112.nc.gz`.
pub fn file_name(data_type: DataType, date: NaiveDate) -> String {
    format!("{}.{}12.nc.gz", data_type, date.format("%Y%m%d"))
}

/// Every day from `start` through `end`, both included.
pub fn days_inclusive(start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
    start.iter_days().take_while(|d| *d <= end).collect()
}

/// Today's date in UTC, the default for omitted dates.
pub fn today() -> NaiveDate {
    Utc::now().date_naive()
}

/// Supplies compressed rasters keyed by (data type, date).
pub trait GridSource {
    /// Return a local path to the `.nc.gz` file, downloading it if needed.
    fn fetch(
        &self,
        data_type: DataType,
        date: NaiveDate,
        directory: &Path,
        force: bool,
    ) -> Result<PathBuf>;
}

/// Downloads grids from the NWRFC archive.
pub struct RfcSource {
    client: reqwest::blocking::Client,
    base_url: String,
}

impl RfcSource {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(300))
            .connect_timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| PipelineError::Acquisition {
                what: "HTTP client".to_string(),
                reason: e.to_string(),
            })?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn url(&self, data_type: DataType, date: NaiveDate) -> String {
        format!(
            "{}/{}/{}/{}",
            self.base_url,
            date.format("%Y"),
            date.format("%Y%m%d"),
            file_name(data_type, date)
        )
    }

    /// Fetch every (type, day) pair, logging and skipping failures.
    pub fn fetch_range(
        &self,
        types: &[DataType],
        start: NaiveDate,
        end: Option<NaiveDate>,
        directory: &Path,
        force: bool,
    ) -> FetchSummary {
        let end = end.unwrap_or_else(today);
        let mut summary = FetchSummary::default();

        for &data_type in types {
            for date in days_inclusive(start, end) {
                match self.fetch(data_type, date, directory, force) {
                    Ok(path) => summary.fetched.push(path),
                    Err(e) => {
                        warn!(%data_type, %date, error = %e, "Fetch failed, continuing");
                        summary.failures.push(FetchFailure {
                            data_type,
                            date,
                            reason: e.to_string(),
                        });
                    }
                }
            }
        }

        info!(
            fetched = summary.fetched.len(),
            failed = summary.failures.len(),
            "Fetch range complete"
        );
        summary
    }

    fn download(&self, url: &str, final_path: &Path) -> Result<()> {
        let partial = partial_path(final_path);
        let acquisition_error = |reason: String| PipelineError::Acquisition {
            what: url.to_string(),
            reason,
        };

        let mut response = self
            .client
            .get(url)
            .send()
            .and_then(|r| r.error_for_status())
            .map_err(|e| acquisition_error(e.to_string()))?;

        let file = File::create(&partial).map_err(|e| PipelineError::io(&partial, e))?;
        let mut writer = BufWriter::new(file);
        let written = response.copy_to(&mut writer).map_err(|e| {
            let _ = fs::remove_file(&partial);
            acquisition_error(e.to_string())
        })?;
        writer.flush().map_err(|e| PipelineError::io(&partial, e))?;
        drop(writer);

        fs::rename(&partial, final_path).map_err(|e| {
            acquisition_error(format!("rename of {} failed: {}", partial.display(), e))
        })?;
        debug!(url, bytes = written, "Download complete");
        Ok(())
    }
}

impl GridSource for RfcSource {
    #[instrument(skip(self, directory), fields(directory = %directory.display()), err)]
    fn fetch(
        &self,
        data_type: DataType,
        date: NaiveDate,
        directory: &Path,
        force: bool,
    ) -> Result<PathBuf> {
        fs::create_dir_all(directory).map_err(|e| PipelineError::io(directory, e))?;
        let path = directory.join(file_name(data_type, date));

        if path.exists() && !force {
            info!(path = %path.display(), "Found locally, skipping download");
            return Ok(path);
        }

        let url = self.url(data_type, date);
        info!(url = %url, "Downloading");
        if let Err(e) = self.download(&url, &path) {
            error!(url = %url, error = %e, "Download failed");
            return Err(e);
        }
        Ok(path)
    }
}

fn partial_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".partial");
    path.with_file_name(name)
}

/// A (type, date) pair that could not be fetched.
#[derive(Debug, Clone)]
pub struct FetchFailure {
    pub data_type: DataType,
    pub date: NaiveDate,
    pub reason: String,
}

/// Outcome of [`RfcSource::fetch_range`].
#[derive(Debug, Clone, Default)]
pub struct FetchSummary {
    pub fetched: Vec<PathBuf>,
    pub failures: Vec<FetchFailure>,
}

/// Gunzip `path` into `unzipped_dir`, dropping the `.gz` suffix.
///
/// Stale `*.nc` files in `unzipped_dir` are removed first.
#[instrument(fields(path = %path.display()), skip(path, unzipped_dir), err)]
pub fn decompress(path: &Path, unzipped_dir: &Path) -> Result<PathBuf> {
    fs::create_dir_all(unzipped_dir).map_err(|e| PipelineError::io(unzipped_dir, e))?;
    remove_stale_netcdf(unzipped_dir)?;

    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| PipelineError::Config(format!("bad file name: {}", path.display())))?;
    let out_name = name.strip_suffix(".gz").unwrap_or(name);
    let out_path = unzipped_dir.join(out_name);

    let input = File::open(path).map_err(|e| PipelineError::io(path, e))?;
    let mut decoder = GzDecoder::new(BufReader::new(input));
    let output = File::create(&out_path).map_err(|e| PipelineError::io(&out_path, e))?;
    let mut writer = BufWriter::new(output);
    let bytes = io::copy(&mut decoder, &mut writer).map_err(|e| PipelineError::io(path, e))?;
    writer.flush().map_err(|e| PipelineError::io(&out_path, e))?;

    debug!(out = %out_path.display(), bytes, "Decompressed");
    Ok(out_path)
}

fn remove_stale_netcdf(dir: &Path) -> Result<()> {
    let entries = fs::read_dir(dir).map_err(|e| PipelineError::io(dir, e))?;
    for entry in entries.flatten() {
        let path = entry.path();
        if path.extension().map_or(false, |ext| ext == "nc") {
            fs::remove_file(&path).map_err(|e| PipelineError::io(&path, e))?;
            debug!(path = %path.display(), "Removed stale file");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_file_name_and_url() {
        assert_eq!(file_name(DataType::Qpe, date(2020, 4, 21)), "QPE.2020042112.nc.gz");

        let source = RfcSource::new("https://example.org/netcdf/").unwrap();
        assert_eq!(
            source.url(DataType::Qtf, date(2021, 1, 5)),
            "https://example.org/netcdf/2021/20210105/QTF.2021010512.nc.gz"
        );
    }

    #[test]
    fn test_parse_list() {
        assert_eq!(
            DataType::parse_list("qpe, QTE").unwrap(),
            vec![DataType::Qpe, DataType::Qte]
        );
        assert_eq!(DataType::parse_list("all").unwrap().len(), 4);
        assert!(DataType::parse_list("QXX").is_err());
        assert!(DataType::parse_list("").is_err());
    }

    #[test]
    fn test_days_inclusive() {
        let days = days_inclusive(date(2020, 2, 28), date(2020, 3, 1));
        assert_eq!(days, vec![date(2020, 2, 28), date(2020, 2, 29), date(2020, 3, 1)]);
        assert!(days_inclusive(date(2020, 3, 2), date(2020, 3, 1)).is_empty());
    }

    #[test]
    fn test_fetch_uses_local_copy() {
        let dir = tempfile::tempdir().unwrap();
        let name = file_name(DataType::Qpe, date(2020, 4, 21));
        fs::write(dir.path().join(&name), b"cached").unwrap();

        // Unroutable base URL: the request must never be made.
        let source = RfcSource::new("http://127.0.0.1:9").unwrap();
        let path = source
            .fetch(DataType::Qpe, date(2020, 4, 21), dir.path(), false)
            .unwrap();
        assert_eq!(fs::read(path).unwrap(), b"cached");
    }

    #[test]
    fn test_fetch_range_records_failures() {
        let dir = tempfile::tempdir().unwrap();
        let source = RfcSource::new("http://127.0.0.1:9").unwrap();
        let summary = source.fetch_range(
            &[DataType::Qpe],
            date(2020, 4, 21),
            Some(date(2020, 4, 22)),
            dir.path(),
            false,
        );
        assert!(summary.fetched.is_empty());
        assert_eq!(summary.failures.len(), 2);
        assert!(!dir.path().join("QPE.2020042112.nc.gz.partial").exists());
    }

    #[test]
    fn test_decompress_replaces_stale_files() {
        let raw = tempfile::tempdir().unwrap();
        let temp = tempfile::tempdir().unwrap();
        fs::write(temp.path().join("QPE.2020042012.nc"), b"old").unwrap();

        let gz_path = raw.path().join("QPE.2020042112.nc.gz");
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(b"netcdf bytes").unwrap();
        fs::write(&gz_path, encoder.finish().unwrap()).unwrap();

        let out = decompress(&gz_path, temp.path()).unwrap();
        assert_eq!(out, temp.path().join("QPE.2020042112.nc"));
        assert_eq!(fs::read(&out).unwrap(), b"netcdf bytes");
        assert!(!temp.path().join("QPE.2020042012.nc").exists());
    }
}
