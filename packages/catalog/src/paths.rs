//! Canonical file names and default locations.
//!
//! Relative paths inside the run configuration are resolved against the
//! directory holding the configuration file.

use std::path::{Path, PathBuf};

/// Default run configuration path, relative to the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "catalog/config.toml";

/// Alias mapping file inside each layer directory.
pub const METADATA_FILE_NAME: &str = "metadata.toml";

/// Geometry file inside each layer directory.
pub const GEOMETRY_FILE_NAME: &str = "data.geo.json";

/// Returns the default configuration path.
#[must_use]
pub fn default_config_path() -> PathBuf {
    PathBuf::from(DEFAULT_CONFIG_PATH)
}

/// Resolves `path` against `base` unless it is already absolute.
#[must_use]
pub fn resolve(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

/// Returns the metadata file path for a layer directory.
#[must_use]
pub fn metadata_path(layer_dir: &Path) -> PathBuf {
    layer_dir.join(METADATA_FILE_NAME)
}

/// Returns the geometry file path for a layer directory.
#[must_use]
pub fn geometry_path(layer_dir: &Path) -> PathBuf {
    layer_dir.join(GEOMETRY_FILE_NAME)
}
