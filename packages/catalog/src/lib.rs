#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Configuration and catalog loading for the reverse geocoding pipeline.
//!
//! - [`config`]: the TOML run configuration ([`RunConfig`]).
//! - [`layers`]: discovery of layer directories under the `GeoJSON`
//!   catalog, producing ordered [`LayerConfig`]s.
//! - [`files`]: listing of input files to process.
//! - [`naming`]: unique, optionally date-partitioned output file names.
//! - [`paths`]: canonical file names and default locations.

pub mod config;
pub mod files;
pub mod layers;
pub mod naming;
pub mod paths;

use std::path::PathBuf;

pub use config::RunConfig;
pub use geo_reverse_layer_models::LayerConfig;

/// Errors raised while loading configuration or scanning the catalog.
///
/// All of these abort the run before any record is processed.
#[derive(Debug, thiserror::Error)]
pub enum ConfigLoadError {
    /// A file or directory could not be read.
    #[error("Failed to read {path}: {source}")]
    Io {
        /// Path that failed.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// A TOML file could not be parsed.
    #[error("Failed to parse {path}: {source}")]
    Parse {
        /// Path that failed.
        path: PathBuf,
        /// Underlying TOML error.
        source: Box<toml::de::Error>,
    },

    /// A configuration value is out of range or inconsistent.
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    /// The include list names layers that are not in the catalog.
    #[error("Unknown layer(s) requested: {}", .0.join(", "))]
    UnknownLayers(Vec<String>),
}
