//! Ordered set of loaded layers and the multi-layer merge.
//!
//! Layers are resolved in load order and their columns merged into one
//! [`ColumnMap`]. When two layers write the same output column, the layer
//! loaded later wins. Such collisions are reported at build time.

use std::collections::{BTreeMap, BTreeSet};

use geo_reverse_layer_models::{ColumnMap, LayerConfig};

use crate::LayerConfigError;
use crate::layer::Layer;
use crate::point::Point;

/// An output column written by more than one layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnCollision {
    /// The shared output column.
    pub column: String,
    /// Layers writing it, in load order. The last one wins.
    pub layers: Vec<String>,
}

/// All layers of a run, immutable after construction.
#[derive(Debug)]
pub struct LayerRegistry {
    layers: Vec<Layer>,
}

impl LayerRegistry {
    /// Loads every configured layer, in order, keeping only those named in
    /// `include` when it is given.
    ///
    /// # Errors
    ///
    /// Returns [`LayerConfigError::UnknownLayers`] if `include` names a
    /// layer missing from `configs`, before any geometry is read, and
    /// otherwise the first [`LayerConfigError`] encountered. No partial
    /// registry is ever returned.
    pub fn build(
        configs: &[LayerConfig],
        include: Option<&[String]>,
    ) -> Result<Self, LayerConfigError> {
        if let Some(names) = include {
            let unknown: Vec<String> = names
                .iter()
                .filter(|name| !configs.iter().any(|config| config.name == **name))
                .cloned()
                .collect();
            if !unknown.is_empty() {
                return Err(LayerConfigError::UnknownLayers(unknown));
            }
        }

        let mut layers = Vec::with_capacity(configs.len());

        for config in configs {
            if include.is_some_and(|names| !names.iter().any(|name| *name == config.name)) {
                log::debug!("Skipping layer '{}' (not in include list)", config.name);
                continue;
            }

            layers.push(Layer::load(config)?);
        }

        Self::from_layers(layers)
    }

    /// Wraps already-built layers, keeping their order.
    ///
    /// # Errors
    ///
    /// Returns [`LayerConfigError::DuplicateLayer`] if two layers share a
    /// name.
    pub fn from_layers(layers: Vec<Layer>) -> Result<Self, LayerConfigError> {
        let mut names = BTreeSet::new();
        for layer in &layers {
            if !names.insert(layer.name()) {
                return Err(LayerConfigError::DuplicateLayer(layer.name().to_string()));
            }
        }

        let registry = Self { layers };

        for collision in registry.collisions() {
            log::warn!(
                "Output column '{}' is written by layers [{}]; '{}' wins",
                collision.column,
                collision.layers.join(", "),
                collision.layers.last().map_or("", String::as_str)
            );
        }

        log::info!(
            "Layer registry ready: {} layer(s), {} output column(s)",
            registry.layers.len(),
            registry.output_columns().len()
        );

        Ok(registry)
    }

    /// Layers in load order.
    #[must_use]
    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    /// Looks up a layer by name.
    #[must_use]
    pub fn layer(&self, name: &str) -> Option<&Layer> {
        self.layers.iter().find(|l| l.name() == name)
    }

    /// Number of loaded layers.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.layers.len()
    }

    /// Whether no layer is loaded.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Distinct output columns in the order they first appear.
    #[must_use]
    pub fn output_columns(&self) -> Vec<&str> {
        let mut seen = BTreeSet::new();
        self.layers
            .iter()
            .flat_map(Layer::output_columns)
            .filter(|column| seen.insert(*column))
            .collect()
    }

    /// Whether any layer writes `column`.
    #[must_use]
    pub fn produces(&self, column: &str) -> bool {
        self.layers
            .iter()
            .any(|layer| layer.output_columns().any(|c| c == column))
    }

    /// Output columns written by more than one layer.
    #[must_use]
    pub fn collisions(&self) -> Vec<ColumnCollision> {
        let mut writers: BTreeMap<&str, Vec<String>> = BTreeMap::new();
        for layer in &self.layers {
            for column in layer.output_columns() {
                writers
                    .entry(column)
                    .or_default()
                    .push(layer.name().to_string());
            }
        }

        writers
            .into_iter()
            .filter(|(_, layers)| layers.len() > 1)
            .map(|(column, layers)| ColumnCollision {
                column: column.to_string(),
                layers,
            })
            .collect()
    }

    /// Resolves `point` against every layer and merges the results into
    /// `target`, later layers overwriting earlier ones.
    pub fn resolve_into(&self, point: Point, target: &mut ColumnMap) {
        for layer in &self.layers {
            target.merge(layer.resolve(point).columns());
        }
    }

    /// Resolves `point` against every layer into a fresh column map.
    #[must_use]
    pub fn resolve_all(&self, point: Point) -> ColumnMap {
        let mut columns = ColumnMap::new();
        self.resolve_into(point, &mut columns);
        columns
    }
}
