//! RFC forecast grid tool.
//!
//! Downloads NWRFC NetCDF grids and stores them, reprojected and clipped per
//! watershed, as HEC-DSS grid records:
//! - `fetch`: download archive files only
//! - `process`: fetch, reproject, clip and import into DSS
//! - `projects`: list configured watershed boxes

mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn, Level};
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::FmtSubscriber;

use cli::{Args, Command, FetchArgs, ProcessArgs};
use ingestion::{lookup_project, Pipeline, ProjectRegistry, RfcSource};

fn main() -> Result<()> {
    // Load environment from .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();
    init_tracing(&args)?;

    let registry = load_registry(&args)?;

    match &args.command {
        Command::Fetch(fetch) => run_fetch(&args, fetch),
        Command::Process(process) => run_process(&args, process, registry),
        Command::Projects => list_projects(registry.as_ref()),
    }
}

fn init_tracing(args: &Args) -> Result<()> {
    let level = if args.verbose {
        Level::DEBUG
    } else {
        match args.log_level.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "info" => Level::INFO,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::INFO,
        }
    };

    // Span open/close events give every instrumented step a start and end record.
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .with_thread_ids(true)
        .with_span_events(FmtSpan::NEW | FmtSpan::CLOSE)
        .json()
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

/// Missing default configuration is not fatal: commands that need a project
/// fail later with a configuration error.
fn load_registry(args: &Args) -> Result<Option<ProjectRegistry>> {
    if !args.config.exists() {
        warn!(path = %args.config.display(), "Project configuration not found");
        return Ok(None);
    }
    let registry = ProjectRegistry::from_file(&args.config)
        .with_context(|| format!("Failed to load {}", args.config.display()))?;
    Ok(Some(registry))
}

fn run_fetch(args: &Args, fetch: &FetchArgs) -> Result<()> {
    let settings = args.settings();
    let source = RfcSource::new(settings.base_url.clone())?;
    let types = fetch.range.data_types()?;

    info!(types = ?types, start = %fetch.range.start_date(), "Fetching grids");
    let summary = source.fetch_range(
        &types,
        fetch.range.start_date(),
        fetch.range.end,
        &settings.raw_dir,
        fetch.range.force,
    );

    for failure in &summary.failures {
        warn!(
            data_type = %failure.data_type,
            date = %failure.date,
            reason = %failure.reason,
            "Not fetched"
        );
    }
    info!(
        fetched = summary.fetched.len(),
        failed = summary.failures.len(),
        "Fetch finished"
    );
    Ok(())
}

fn run_process(
    args: &Args,
    process: &ProcessArgs,
    registry: Option<ProjectRegistry>,
) -> Result<()> {
    let settings = process.apply(args.settings());
    let types = process.range.data_types()?;
    let projects = resolve_projects(&process.projects, registry.as_ref())?;

    info!(
        types = ?types,
        projects = ?projects,
        start = %process.range.start_date(),
        "Processing grids"
    );

    let mut pipeline = Pipeline::new(settings, registry)?;
    let summary = pipeline.process_range(
        &types,
        process.range.start_date(),
        process.range.end,
        &projects,
        process.range.force,
    );

    info!(
        completed = summary.completed,
        records = summary.records,
        failed = summary.failures.len(),
        "Processing finished"
    );
    Ok(())
}

/// Expand `all` and check every named project exists before any work starts.
fn resolve_projects(list: &str, registry: Option<&ProjectRegistry>) -> Result<Vec<String>> {
    let names: Vec<String> = list
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();

    if names.iter().any(|n| n.eq_ignore_ascii_case("all")) {
        let registry = registry.ok_or(ingestion::ConfigurationError::NoConfiguration)?;
        return Ok(registry.names().map(str::to_string).collect());
    }
    for name in &names {
        lookup_project(registry, name)?;
    }
    anyhow::ensure!(!names.is_empty(), "no projects given");
    Ok(names)
}

fn list_projects(registry: Option<&ProjectRegistry>) -> Result<()> {
    let registry = registry.ok_or(ingestion::ConfigurationError::NoConfiguration)?;
    for (name, bbox) in registry.iter() {
        println!(
            "{:<20} xmin={:<10} ymin={:<10} xmax={:<10} ymax={}",
            name,
            bbox.min_x(),
            bbox.min_y(),
            bbox.max_x(),
            bbox.max_y()
        );
    }
    Ok(())
}
