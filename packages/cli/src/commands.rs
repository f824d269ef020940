//! Subcommand implementations.

use std::path::Path;
use std::process::ExitCode;

use geo_reverse_batch::pipeline::load_registry;
use geo_reverse_batch::record::GEOHASH_COLUMN;
use geo_reverse_batch::{Pipeline, RunError, RunSummary};
use geo_reverse_catalog::layers::discover_layers;
use geo_reverse_cli_utils::{MultiProgress, RunBars};
use geo_reverse_spatial::geohash;
use geo_reverse_spatial::Point;

use crate::ConfigOverrides;

type CommandResult = Result<(), Box<dyn std::error::Error>>;

/// Runs the full pipeline and reports its summary. Never returns an
/// error: failures are recorded in the summary and the exit code.
pub fn run(
    multi: &MultiProgress,
    overrides: &ConfigOverrides,
    summary_path: Option<&Path>,
) -> ExitCode {
    let mut summary = RunSummary::begin(env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));

    if let Err(e) = execute(multi, overrides, &mut summary) {
        log::error!("Run failed: {e}");
        summary.fail(&e);
    }
    summary.finish();

    log::info!(
        "Run finished with status {} ({}) in {:.1}s: {} file(s), {} resolved, {} failed, {} skipped",
        summary.status.code(),
        summary.status,
        summary.runtime_secs,
        summary.files_processed(),
        summary.accounting.resolved(),
        summary.accounting.failed(),
        summary.accounting.skipped()
    );

    match serde_json::to_string(&summary) {
        Ok(json) => log::info!("Run summary: {json}"),
        Err(e) => log::warn!("Failed to serialize run summary: {e}"),
    }

    if let Some(path) = summary_path {
        if let Err(e) = write_summary(path, &summary) {
            log::error!("Failed to write run summary to {}: {e}", path.display());
            return ExitCode::FAILURE;
        }
        log::info!("Run summary written to {}", path.display());
    }

    if summary.status.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn execute(
    multi: &MultiProgress,
    overrides: &ConfigOverrides,
    summary: &mut RunSummary,
) -> Result<(), RunError> {
    let config = overrides.load()?;
    let pipeline = Pipeline::load(config)?;

    let bars = RunBars::new(multi);
    pipeline.run(summary, bars.files.as_ref(), bars.records.as_ref())
}

fn write_summary(path: &Path, summary: &RunSummary) -> CommandResult {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, serde_json::to_string_pretty(summary)?)?;
    Ok(())
}

/// Lists the selected catalog layers without loading their geometry.
pub fn layers(overrides: &ConfigOverrides) -> CommandResult {
    let config = overrides.load()?;
    let configs = discover_layers(&config.geojson_dir, config.layers.as_deref())?;

    println!("{} layer(s) in {}", configs.len(), config.geojson_dir.display());
    for (position, layer) in configs.iter().enumerate() {
        println!(
            "  {:>2}. {}/{} -> [{}]",
            position + 1,
            layer.group,
            layer.name,
            layer
                .metadata
                .output_columns()
                .collect::<Vec<_>>()
                .join(", ")
        );
        if let Some(description) = &layer.metadata.description {
            println!("      {description}");
        }
    }

    Ok(())
}

/// Prints the geohash of one coordinate at the configured precision.
pub fn geohash(overrides: &ConfigOverrides, latitude: f64, longitude: f64) -> CommandResult {
    let precision = overrides.geohash_precision()?;
    println!("{}", geohash::encode(latitude, longitude, precision)?);
    Ok(())
}

/// Resolves one coordinate against every loaded layer and prints the
/// merged columns as JSON.
pub fn locate(overrides: &ConfigOverrides, latitude: f64, longitude: f64) -> CommandResult {
    let point = Point::new(latitude, longitude)?;
    let config = overrides.load()?;
    let registry = load_registry(&config)?;

    let mut columns = registry.resolve_all(point);
    columns.insert(
        GEOHASH_COLUMN,
        geohash::encode_point(point, config.geohash_precision),
    );

    println!("{}", serde_json::to_string_pretty(&columns)?);
    Ok(())
}
