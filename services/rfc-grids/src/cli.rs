//! Command line arguments.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args as ClapArgs, Parser, Subcommand};
use ingestion::{acquire, DataType, PipelineSettings};

#[derive(Parser, Debug)]
#[command(name = "rfc-grids")]
#[command(about = "Fetch NWRFC forecast grids and store them in HEC-DSS")]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Project bounding boxes (YAML)
    #[arg(long, global = true, env = "GRIDS_CONFIG", default_value = "config/projects.yaml")]
    pub config: PathBuf,

    /// Directory for downloaded .nc.gz files
    #[arg(long, global = true, env = "GRIDS_RAW_DIR", default_value = "raw")]
    pub raw_dir: PathBuf,

    /// Directory for unzipped, warped and ASCII scratch files
    #[arg(long, global = true, env = "GRIDS_TEMP_DIR", default_value = "temp")]
    pub temp_dir: PathBuf,

    /// Directory for generated DSS files
    #[arg(long, global = true, env = "GRIDS_DATA_DIR", default_value = "data")]
    pub data_dir: PathBuf,

    /// NWRFC NetCDF archive root
    #[arg(long, global = true, env = "GRIDS_BASE_URL", default_value = ingestion::config::DEFAULT_BASE_URL)]
    pub base_url: String,

    /// Log level
    #[arg(long, global = true, default_value = "info")]
    pub log_level: String,

    /// Shorthand for --log-level debug
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

impl Args {
    pub fn settings(&self) -> PipelineSettings {
        PipelineSettings {
            raw_dir: self.raw_dir.clone(),
            temp_dir: self.temp_dir.clone(),
            data_dir: self.data_dir.clone(),
            base_url: self.base_url.clone(),
            ..Default::default()
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Download grids without processing them
    Fetch(FetchArgs),
    /// Download, reproject, clip and import grids into DSS
    Process(ProcessArgs),
    /// List configured projects
    Projects,
}

/// Data types and the inclusive date range to work on.
#[derive(ClapArgs, Debug)]
pub struct RangeArgs {
    /// Comma separated QPE, QPF, QTE, QTF, or all
    #[arg(long, default_value = "all")]
    pub types: String,

    /// First date (YYYYMMDD); defaults to today
    #[arg(long, value_parser = parse_date)]
    pub start: Option<NaiveDate>,

    /// Last date (YYYYMMDD); defaults to today
    #[arg(long, value_parser = parse_date)]
    pub end: Option<NaiveDate>,

    /// Download even when the file is already present
    #[arg(long)]
    pub force: bool,
}

impl RangeArgs {
    pub fn start_date(&self) -> NaiveDate {
        self.start.unwrap_or_else(acquire::today)
    }

    pub fn data_types(&self) -> ingestion::Result<Vec<DataType>> {
        DataType::parse_list(&self.types)
    }
}

#[derive(ClapArgs, Debug)]
pub struct FetchArgs {
    #[command(flatten)]
    pub range: RangeArgs,
}

#[derive(ClapArgs, Debug)]
pub struct ProcessArgs {
    #[command(flatten)]
    pub range: RangeArgs,

    /// Comma separated project names, or all
    #[arg(long, default_value = "all")]
    pub projects: String,

    /// Write every record to this DSS file
    #[arg(long, env = "GRIDS_DSS_FILE")]
    pub dss_file: Option<PathBuf>,

    /// Target cell size in target SRS units
    #[arg(long, env = "GRIDS_CELL_SIZE", default_value_t = 2000.0)]
    pub cell_size: f64,

    /// Target SRS as a PROJ string
    #[arg(long, env = "GRIDS_TARGET_SRS")]
    pub target_srs: Option<String>,

    /// Do not snap the output grid to multiples of the cell size
    #[arg(long)]
    pub no_align: bool,

    #[arg(long, env = "GRIDS_GDALWARP", default_value = "gdalwarp")]
    pub gdalwarp: String,

    #[arg(long, env = "GRIDS_ASC2DSSGRID", default_value = "asc2dssGrid")]
    pub asc2dssgrid: String,
}

impl ProcessArgs {
    pub fn apply(&self, settings: PipelineSettings) -> PipelineSettings {
        PipelineSettings {
            dss_file: self.dss_file.clone(),
            cell_size: self.cell_size,
            target_srs: self
                .target_srs
                .clone()
                .unwrap_or(settings.target_srs.clone()),
            align_pixels: !self.no_align,
            warp_program: self.gdalwarp.clone(),
            import_program: self.asc2dssgrid.clone(),
            ..settings
        }
    }
}

fn parse_date(s: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s, "%Y%m%d")
        .map_err(|e| format!("expected YYYYMMDD, got '{}': {}", s, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_process_args() {
        let args = Args::parse_from([
            "rfc-grids",
            "process",
            "--types",
            "QPE,QTE",
            "--start",
            "20200421",
            "--end",
            "20200423",
            "--projects",
            "yakima",
            "--no-align",
            "--raw-dir",
            "/tmp/raw",
        ]);
        let Command::Process(process) = &args.command else {
            panic!("expected process");
        };
        assert_eq!(process.range.start_date(), NaiveDate::from_ymd_opt(2020, 4, 21).unwrap());
        assert_eq!(process.range.end, NaiveDate::from_ymd_opt(2020, 4, 23));
        assert_eq!(
            process.range.data_types().unwrap(),
            vec![DataType::Qpe, DataType::Qte]
        );

        let settings = process.apply(args.settings());
        assert!(!settings.align_pixels);
        assert_eq!(settings.raw_dir, PathBuf::from("/tmp/raw"));
        assert_eq!(settings.cell_size, 2000.0);
        assert_eq!(settings.target_srs, ingestion::ALBERS_CONUS_SRS);
    }

    #[test]
    fn test_bad_date_rejected() {
        assert!(Args::try_parse_from(["rfc-grids", "fetch", "--start", "2020-04-21"]).is_err());
    }
}
