//! A named polygon layer and the per-point resolution contract.

use std::collections::BTreeSet;

use geo_reverse_layer_models::{ColumnMap, LayerConfig, PropertyAlias, SENTINEL};

use crate::LayerConfigError;
use crate::index::{BoundaryIndex, PolygonIndex};
use crate::point::Point;

/// Output columns produced by resolving one point against one layer.
///
/// Always carries every alias configured for the layer, in configuration
/// order: either the matched polygon's value or [`SENTINEL`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolutionResult {
    columns: ColumnMap,
    matched: bool,
}

impl ResolutionResult {
    /// Whether a polygon contained the point.
    #[must_use]
    pub const fn is_match(&self) -> bool {
        self.matched
    }

    /// Value of an output column.
    #[must_use]
    pub fn get(&self, column: &str) -> Option<&str> {
        self.columns.get(column)
    }

    /// All output columns.
    #[must_use]
    pub const fn columns(&self) -> &ColumnMap {
        &self.columns
    }

    /// Consumes the result, returning its columns.
    #[must_use]
    pub fn into_columns(self) -> ColumnMap {
        self.columns
    }
}

/// An immutable polygon layer with its alias mapping.
pub struct Layer {
    name: String,
    aliases: Vec<PropertyAlias>,
    index: Box<dyn PolygonIndex>,
}

impl std::fmt::Debug for Layer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Layer")
            .field("name", &self.name)
            .field("aliases", &self.aliases)
            .field("polygons", &self.index.len())
            .finish()
    }
}

impl Layer {
    /// Creates a layer over an existing index.
    ///
    /// # Errors
    ///
    /// Returns [`LayerConfigError::Alias`] if the alias mapping is empty,
    /// has a blank entry, or maps two attributes to the same column.
    pub fn new(
        name: impl Into<String>,
        aliases: Vec<PropertyAlias>,
        index: Box<dyn PolygonIndex>,
    ) -> Result<Self, LayerConfigError> {
        let name = name.into();
        validate_aliases(&name, &aliases)?;

        Ok(Self {
            name,
            aliases,
            index,
        })
    }

    /// Loads the layer's geometry from disk and builds its R-tree.
    ///
    /// Aliases whose source attribute appears on no polygon are logged; they
    /// resolve to [`SENTINEL`] for every point.
    ///
    /// # Errors
    ///
    /// Returns an error if the geometry cannot be read or parsed, or the
    /// alias mapping is invalid.
    pub fn load(config: &LayerConfig) -> Result<Self, LayerConfigError> {
        validate_aliases(&config.name, &config.metadata.properties)?;

        let index = BoundaryIndex::load(&config.name, &config.geometry_path)?;
        for alias in &config.metadata.properties {
            if !index.attribute_keys().contains(&alias.source) {
                log::warn!(
                    "Layer '{}': attribute '{}' (-> '{}') is absent from every polygon",
                    config.name,
                    alias.source,
                    alias.alias
                );
            }
        }

        log::info!(
            "Loaded layer '{}' with {} polygons from {}",
            config.name,
            index.len(),
            config.geometry_path.display()
        );

        Self::new(
            config.name.clone(),
            config.metadata.properties.clone(),
            Box::new(index),
        )
    }

    /// Layer name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Alias mapping in configuration order.
    #[must_use]
    pub fn aliases(&self) -> &[PropertyAlias] {
        &self.aliases
    }

    /// Output column names in configuration order.
    pub fn output_columns(&self) -> impl Iterator<Item = &str> {
        self.aliases.iter().map(|a| a.alias.as_str())
    }

    /// Number of indexed polygons.
    #[must_use]
    pub fn polygon_count(&self) -> usize {
        self.index.len()
    }

    /// Resolves `point` against this layer.
    ///
    /// Never fails: a miss yields [`SENTINEL`] for every alias, and a
    /// matched polygon lacking one of the source attributes yields
    /// [`SENTINEL`] for that alias only.
    #[must_use]
    pub fn resolve(&self, point: Point) -> ResolutionResult {
        let hit = self.index.locate(point);
        let mut columns = ColumnMap::with_capacity(self.aliases.len());

        for alias in &self.aliases {
            let value = hit
                .and_then(|attributes| attributes.get(&alias.source))
                .map_or(SENTINEL, String::as_str);
            columns.insert(alias.alias.as_str(), value);
        }

        ResolutionResult {
            columns,
            matched: hit.is_some(),
        }
    }
}

fn validate_aliases(layer: &str, aliases: &[PropertyAlias]) -> Result<(), LayerConfigError> {
    let fail = |message: String| LayerConfigError::Alias {
        layer: layer.to_string(),
        message,
    };

    if aliases.is_empty() {
        return Err(fail("no properties configured".to_string()));
    }

    let mut seen = BTreeSet::new();
    for alias in aliases {
        if alias.source.trim().is_empty() || alias.alias.trim().is_empty() {
            return Err(fail(format!(
                "blank entry '{}' -> '{}'",
                alias.source, alias.alias
            )));
        }
        if !seen.insert(alias.alias.as_str()) {
            return Err(fail(format!("output column '{}' is mapped twice", alias.alias)));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::tests::{attrs, square};

    fn region_layer() -> Layer {
        let index = BoundaryIndex::from_polygons(vec![(
            square(-1.0, -1.0, 1.0, 1.0),
            attrs(&[("name", "A")]),
        )]);
        Layer::new(
            "region",
            vec![PropertyAlias::new("name", "region_name")],
            Box::new(index),
        )
        .unwrap()
    }

    #[test]
    fn resolves_matching_polygon_through_alias() {
        let result = region_layer().resolve(Point::new(0.0, 0.0).unwrap());
        assert!(result.is_match());
        assert_eq!(result.get("region_name"), Some("A"));
        assert_eq!(result.columns().len(), 1);
    }

    #[test]
    fn miss_yields_sentinel_for_every_alias() {
        let index = BoundaryIndex::from_polygons(vec![(
            square(-1.0, -1.0, 1.0, 1.0),
            attrs(&[("code", "11"), ("name", "Bogota")]),
        )]);
        let layer = Layer::new(
            "city",
            vec![
                PropertyAlias::new("code", "city_code"),
                PropertyAlias::new("name", "city_name"),
            ],
            Box::new(index),
        )
        .unwrap();

        let result = layer.resolve(Point::new(5.0, 5.0).unwrap());
        assert!(!result.is_match());
        assert_eq!(
            result.columns().iter().collect::<Vec<_>>(),
            vec![("city_code", SENTINEL), ("city_name", SENTINEL)]
        );
    }

    #[test]
    fn missing_attribute_defaults_to_sentinel() {
        let index = BoundaryIndex::from_polygons(vec![(
            square(-1.0, -1.0, 1.0, 1.0),
            attrs(&[("name", "A")]),
        )]);
        let layer = Layer::new(
            "partial",
            vec![
                PropertyAlias::new("name", "region_name"),
                PropertyAlias::new("population", "region_population"),
            ],
            Box::new(index),
        )
        .unwrap();

        let result = layer.resolve(Point::new(0.0, 0.0).unwrap());
        assert!(result.is_match());
        assert_eq!(result.get("region_name"), Some("A"));
        assert_eq!(result.get("region_population"), Some(SENTINEL));
    }

    #[test]
    fn result_always_has_exactly_the_configured_columns() {
        let layer = region_layer();
        for (lat, lon) in [(0.0, 0.0), (0.5, -0.5), (45.0, 90.0), (-89.0, 179.0)] {
            let result = layer.resolve(Point::new(lat, lon).unwrap());
            let columns: Vec<&str> = result.columns().keys().collect();
            assert_eq!(columns, vec!["region_name"], "at ({lat}, {lon})");
        }
    }

    #[test]
    fn rejects_empty_alias_mapping() {
        let index = BoundaryIndex::from_polygons(vec![]);
        let err = Layer::new("empty", vec![], Box::new(index)).unwrap_err();
        assert!(matches!(err, LayerConfigError::Alias { .. }));
    }

    #[test]
    fn rejects_duplicate_output_column() {
        let index = BoundaryIndex::from_polygons(vec![]);
        let err = Layer::new(
            "dupes",
            vec![
                PropertyAlias::new("a", "same"),
                PropertyAlias::new("b", "same"),
            ],
            Box::new(index),
        )
        .unwrap_err();
        assert!(err.to_string().contains("mapped twice"), "{err}");
    }
}
