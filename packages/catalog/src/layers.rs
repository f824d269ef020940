//! Layer catalog discovery.
//!
//! The catalog is a two-level directory tree:
//!
//! ```text
//! geojson/
//!   world/
//!     geo_world/
//!       metadata.toml
//!       data.geo.json
//!   colombia/
//!     divipola_colombia/
//!       ...
//!     zona_urbana/
//!       ...
//! ```
//!
//! Groups and layers are visited in sorted order; that order is the layer
//! load order and therefore decides which layer wins on a shared column.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use geo_reverse_layer_models::{LayerConfig, LayerMetadata};

use crate::{ConfigLoadError, paths};

/// Scans `geojson_dir` for layers, keeping only those in `include` when
/// given.
///
/// Only metadata is read here; geometry is loaded later by the layer
/// registry.
///
/// # Errors
///
/// Returns [`ConfigLoadError`] if the catalog cannot be listed, a
/// selected layer's metadata is missing or malformed, or `include` names
/// a layer the catalog does not have.
pub fn discover_layers(
    geojson_dir: &Path,
    include: Option<&[String]>,
) -> Result<Vec<LayerConfig>, ConfigLoadError> {
    let mut configs = Vec::new();
    let mut found = BTreeSet::new();

    for group_dir in sorted_subdirectories(geojson_dir)? {
        let group = dir_name(&group_dir);

        for layer_dir in sorted_subdirectories(&group_dir)? {
            let name = dir_name(&layer_dir);
            found.insert(name.clone());

            if include.is_some_and(|names| !names.contains(&name)) {
                log::debug!("Catalog: skipping layer '{name}' (not selected)");
                continue;
            }

            let metadata = read_metadata(&paths::metadata_path(&layer_dir))?;
            log::debug!(
                "Catalog: layer '{name}' in group '{group}' with {} propert(ies)",
                metadata.properties.len()
            );

            configs.push(LayerConfig {
                name,
                group: group.clone(),
                metadata,
                geometry_path: paths::geometry_path(&layer_dir),
            });
        }
    }

    if let Some(names) = include {
        let unknown: Vec<String> = names
            .iter()
            .filter(|name| !found.contains(*name))
            .cloned()
            .collect();
        if !unknown.is_empty() {
            return Err(ConfigLoadError::UnknownLayers(unknown));
        }
    }

    if configs.is_empty() {
        return Err(ConfigLoadError::Invalid(format!(
            "no layers found under {}",
            geojson_dir.display()
        )));
    }

    log::info!(
        "Catalog: {} layer(s) selected from {}",
        configs.len(),
        geojson_dir.display()
    );

    Ok(configs)
}

/// Reads a layer's `metadata.toml`.
///
/// # Errors
///
/// Returns [`ConfigLoadError`] if the file is missing or malformed.
pub fn read_metadata(path: &Path) -> Result<LayerMetadata, ConfigLoadError> {
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigLoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    toml::from_str(&contents).map_err(|e| ConfigLoadError::Parse {
        path: path.to_path_buf(),
        source: Box::new(e),
    })
}

fn sorted_subdirectories(dir: &Path) -> Result<Vec<PathBuf>, ConfigLoadError> {
    let io_err = |source| ConfigLoadError::Io {
        path: dir.to_path_buf(),
        source,
    };

    let mut dirs = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(io_err)? {
        let path = entry.map_err(io_err)?.path();
        if path.is_dir() && !dir_name(&path).starts_with('.') {
            dirs.push(path);
        }
    }

    dirs.sort();
    Ok(dirs)
}

fn dir_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> PathBuf {
        let root =
            std::env::temp_dir().join(format!("geo_reverse_catalog_{}", uuid::Uuid::new_v4()));

        for (group, layer, alias) in [
            ("world", "geo_world", "pais"),
            ("colombia", "zona_urbana", "zona"),
            ("colombia", "divipola_colombia", "cod_dane"),
        ] {
            let dir = root.join(group).join(layer);
            std::fs::create_dir_all(&dir).unwrap();
            std::fs::write(
                dir.join(paths::METADATA_FILE_NAME),
                format!("[[properties]]\nsource = \"NAME\"\nalias = \"{alias}\"\n"),
            )
            .unwrap();
        }

        root
    }

    #[test]
    fn discovers_layers_in_sorted_order() {
        let root = catalog();
        let configs = discover_layers(&root, None).unwrap();

        let names: Vec<&str> = configs.iter().map(LayerConfig::name).collect();
        assert_eq!(names, vec!["divipola_colombia", "zona_urbana", "geo_world"]);
        assert_eq!(configs[0].group, "colombia");
        assert_eq!(configs[0].metadata.properties[0].alias, "cod_dane");
        assert!(configs[0].geometry_path.ends_with("data.geo.json"));

        std::fs::remove_dir_all(&root).ok();
    }

    #[test]
    fn include_list_filters_layers() {
        let root = catalog();
        let include = vec!["geo_world".to_string()];
        let configs = discover_layers(&root, Some(&include)).unwrap();

        assert_eq!(configs.len(), 1);
        assert_eq!(configs[0].name, "geo_world");

        std::fs::remove_dir_all(&root).ok();
    }

    #[test]
    fn unknown_included_layer_is_an_error() {
        let root = catalog();
        let include = vec!["geo_world".to_string(), "atlantis".to_string()];
        let err = discover_layers(&root, Some(&include)).unwrap_err();

        assert!(
            matches!(&err, ConfigLoadError::UnknownLayers(names) if names == &["atlantis".to_string()]),
            "{err}"
        );

        std::fs::remove_dir_all(&root).ok();
    }

    #[test]
    fn malformed_metadata_is_an_error() {
        let root = catalog();
        std::fs::write(
            root.join("world").join("geo_world").join(paths::METADATA_FILE_NAME),
            "[[properties]\nsource = ",
        )
        .unwrap();

        let err = discover_layers(&root, None).unwrap_err();
        assert!(matches!(err, ConfigLoadError::Parse { .. }), "{err}");

        std::fs::remove_dir_all(&root).ok();
    }

    #[test]
    fn missing_catalog_is_an_error() {
        let root = std::env::temp_dir().join(uuid::Uuid::new_v4().to_string());
        let err = discover_layers(&root, None).unwrap_err();
        assert!(matches!(err, ConfigLoadError::Io { .. }), "{err}");
    }
}
