//! Run configuration.
//!
//! Deserialized from a TOML file such as:
//!
//! ```toml
//! data_dir = "../model_data/data"
//! results_dir = "../model_data/results"
//! geojson_dir = "../geojson"
//! delimiter = "|"
//! key_column = "cod_dane"
//! chunk_size = 50000
//! layers = ["geo_world", "divipola_colombia"]
//! ```

use std::path::{Path, PathBuf};

use geo_reverse_spatial::geohash::{DEFAULT_PRECISION, MAX_PRECISION};
use serde::{Deserialize, Serialize};

use crate::{ConfigLoadError, paths};

/// Records flushed to the output sink per chunk when not configured.
pub const DEFAULT_CHUNK_SIZE: usize = 50_000;

/// Column used for resolved/failed accounting when not configured.
pub const DEFAULT_KEY_COLUMN: &str = "cod_dane";

/// Everything a run needs, passed explicitly to each component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunConfig {
    /// Directory holding the delimited input files.
    pub data_dir: PathBuf,
    /// Directory receiving the newline-delimited JSON output.
    pub results_dir: PathBuf,
    /// Root of the layer catalog (`<group>/<layer>/...`).
    pub geojson_dir: PathBuf,
    /// Field delimiter of the input files.
    #[serde(default = "default_delimiter")]
    pub delimiter: char,
    /// Only files ending with this suffix are processed. All files when
    /// unset.
    #[serde(default)]
    pub input_extension: Option<String>,
    /// Output column whose sentinel value marks a failed resolution.
    #[serde(default = "default_key_column")]
    pub key_column: String,
    /// Records per processing/flush chunk.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    /// Worker threads. Defaults to the available parallelism.
    #[serde(default)]
    pub workers: Option<usize>,
    /// Geohash length.
    #[serde(default = "default_precision")]
    pub geohash_precision: usize,
    /// Nest output files under `year=/month=/day=` directories.
    #[serde(default = "default_true")]
    pub partition_output: bool,
    /// Only load these layers. All catalog layers when unset.
    #[serde(default)]
    pub layers: Option<Vec<String>>,
}

const fn default_delimiter() -> char {
    '|'
}

fn default_key_column() -> String {
    DEFAULT_KEY_COLUMN.to_string()
}

const fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}

const fn default_precision() -> usize {
    DEFAULT_PRECISION
}

const fn default_true() -> bool {
    true
}

impl RunConfig {
    /// Reads and validates a configuration file. Relative directories are
    /// resolved against the file's parent directory.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigLoadError`] if the file is missing, is not valid
    /// TOML, or holds invalid values.
    pub fn load(path: &Path) -> Result<Self, ConfigLoadError> {
        log::info!("Loading run configuration from {}", path.display());

        let contents = std::fs::read_to_string(path).map_err(|source| ConfigLoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let mut config = Self::from_toml_str(&contents).map_err(|e| match e {
            ConfigLoadError::Parse { source, .. } => ConfigLoadError::Parse {
                path: path.to_path_buf(),
                source,
            },
            other => other,
        })?;

        let base = path.parent().unwrap_or_else(|| Path::new("."));
        config.data_dir = paths::resolve(base, &config.data_dir);
        config.results_dir = paths::resolve(base, &config.results_dir);
        config.geojson_dir = paths::resolve(base, &config.geojson_dir);

        Ok(config)
    }

    /// Parses and validates configuration from TOML text. Paths are left
    /// as written.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigLoadError`] if the text is not valid TOML or holds
    /// invalid values.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigLoadError> {
        let config: Self = toml::from_str(contents).map_err(|e| ConfigLoadError::Parse {
            path: PathBuf::from("<inline>"),
            source: Box::new(e),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Checks value ranges.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigLoadError::Invalid`] describing the first problem.
    pub fn validate(&self) -> Result<(), ConfigLoadError> {
        if !self.delimiter.is_ascii() {
            return Err(ConfigLoadError::Invalid(format!(
                "delimiter {:?} must be a single ASCII character",
                self.delimiter
            )));
        }
        if self.chunk_size == 0 {
            return Err(ConfigLoadError::Invalid(
                "chunk_size must be greater than zero".to_string(),
            ));
        }
        if self.workers == Some(0) {
            return Err(ConfigLoadError::Invalid(
                "workers must be greater than zero".to_string(),
            ));
        }
        if !(1..=MAX_PRECISION).contains(&self.geohash_precision) {
            return Err(ConfigLoadError::Invalid(format!(
                "geohash_precision must be between 1 and {MAX_PRECISION}"
            )));
        }
        if self.key_column.trim().is_empty() {
            return Err(ConfigLoadError::Invalid(
                "key_column must not be empty".to_string(),
            ));
        }
        if self.layers.as_ref().is_some_and(Vec::is_empty) {
            return Err(ConfigLoadError::Invalid(
                "layers, when given, must name at least one layer".to_string(),
            ));
        }
        Ok(())
    }

    /// The delimiter as a byte for the CSV reader.
    #[must_use]
    pub fn delimiter_byte(&self) -> u8 {
        u8::try_from(self.delimiter).unwrap_or(b'|')
    }

    /// Worker thread count, falling back to the available parallelism.
    #[must_use]
    pub fn worker_count(&self) -> usize {
        self.workers.unwrap_or_else(|| {
            std::thread::available_parallelism().map_or(1, std::num::NonZeroUsize::get)
        })
    }
}
