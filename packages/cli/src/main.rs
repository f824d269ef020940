#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CLI entry point for the geo-reverse batch geocoder.
//!
//! `geo_reverse run` (the default) enriches every input file of the
//! configured data directory with the columns of every catalog layer plus
//! a geohash. `layers`, `geohash`, and `locate` inspect the catalog and
//! single points without touching any input.
//!
//! Uses `indicatif-log-bridge` (via [`geo_reverse_cli_utils::init_logger`])
//! to route `log` output through `indicatif::MultiProgress` so that log
//! lines and progress bars never fight for the terminal.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use geo_reverse_catalog::{ConfigLoadError, RunConfig, paths};
use geo_reverse_spatial::geohash::{DEFAULT_PRECISION, MAX_PRECISION};

mod commands;

/// Enrich coordinate records with the attributes of the polygons that
/// contain them.
#[derive(Parser)]
#[command(name = "geo_reverse", version)]
#[command(about = "Multi-layer point-in-polygon reverse geocoder")]
struct Cli {
    #[command(flatten)]
    overrides: ConfigOverrides,

    /// Subcommand to execute (default: `run`).
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Run configuration location and per-invocation overrides.
#[derive(Args)]
struct ConfigOverrides {
    /// Path to the run configuration TOML.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Only load these layers (comma-separated).
    #[arg(long, global = true, value_delimiter = ',')]
    layers: Option<Vec<String>>,

    /// Records per processing/flush chunk.
    #[arg(long, global = true)]
    chunk_size: Option<usize>,

    /// Worker threads.
    #[arg(long, global = true)]
    workers: Option<usize>,

    /// Geohash length.
    #[arg(long, global = true)]
    precision: Option<usize>,
}

impl ConfigOverrides {
    /// Loads the configuration file and applies the command-line
    /// overrides on top.
    fn load(&self) -> Result<RunConfig, ConfigLoadError> {
        let path = self
            .config
            .clone()
            .unwrap_or_else(paths::default_config_path);
        let mut config = RunConfig::load(&path)?;

        if let Some(layers) = &self.layers {
            config.layers = Some(layers.clone());
        }
        if let Some(chunk_size) = self.chunk_size {
            config.chunk_size = chunk_size;
        }
        if let Some(workers) = self.workers {
            config.workers = Some(workers);
        }
        if let Some(precision) = self.precision {
            config.geohash_precision = precision;
        }

        config.validate()?;
        Ok(config)
    }

    /// Geohash length for single-point commands: `--precision`, else the
    /// configured `geohash_precision`. When no configuration file can be
    /// read, falls back to the default length.
    fn geohash_precision(&self) -> Result<usize, ConfigLoadError> {
        match self.load() {
            Ok(config) => Ok(config.geohash_precision),
            Err(ConfigLoadError::Io { path, source }) => {
                log::debug!(
                    "No configuration at {} ({source}), using default precision",
                    path.display()
                );
                let precision = self.precision.unwrap_or(DEFAULT_PRECISION);
                if (1..=MAX_PRECISION).contains(&precision) {
                    Ok(precision)
                } else {
                    Err(ConfigLoadError::Invalid(format!(
                        "precision must be between 1 and {MAX_PRECISION}"
                    )))
                }
            }
            Err(e) => Err(e),
        }
    }
}

/// Top-level subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Enrich every input file (default).
    Run {
        /// Also write the run summary JSON to this path.
        #[arg(long)]
        summary: Option<PathBuf>,
    },

    /// List catalog layers and the columns they produce.
    Layers,

    /// Encode one coordinate as a geohash. The length comes from
    /// `--precision`, else the configuration, else the default.
    Geohash {
        /// Latitude in degrees.
        #[arg(allow_negative_numbers = true)]
        latitude: f64,

        /// Longitude in degrees.
        #[arg(allow_negative_numbers = true)]
        longitude: f64,
    },

    /// Resolve one coordinate against every loaded layer.
    Locate {
        /// Latitude in degrees.
        #[arg(allow_negative_numbers = true)]
        latitude: f64,

        /// Longitude in degrees.
        #[arg(allow_negative_numbers = true)]
        longitude: f64,
    },
}

fn main() -> ExitCode {
    let multi = geo_reverse_cli_utils::init_logger();
    let cli = Cli::parse();

    let result = match cli.command.unwrap_or(Commands::Run { summary: None }) {
        Commands::Run { summary } => {
            return commands::run(&multi, &cli.overrides, summary.as_deref());
        }
        Commands::Layers => commands::layers(&cli.overrides),
        Commands::Geohash {
            latitude,
            longitude,
        } => commands::geohash(&cli.overrides, latitude, longitude),
        Commands::Locate {
            latitude,
            longitude,
        } => commands::locate(&cli.overrides, latitude, longitude),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e}");
            ExitCode::FAILURE
        }
    }
}
