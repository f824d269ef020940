#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Layer definition types shared by the spatial engine, the catalog
//! loader, and the batch pipeline.
//!
//! A layer is described on disk by a `metadata.toml` file (the alias
//! mapping, deserialized into [`LayerMetadata`]) sitting next to a
//! `GeoJSON` feature collection. The catalog turns each such directory
//! into a [`LayerConfig`], which the spatial crate loads into a polygon
//! index.

mod columns;

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

pub use columns::ColumnMap;

/// Value written to every output column of a layer when no polygon of
/// that layer contains the queried point.
pub const SENTINEL: &str = "-1";

/// A single source attribute to output column renaming.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyAlias {
    /// Attribute key as it appears in the feature's `properties`.
    pub source: String,
    /// Column name written to the enriched record.
    pub alias: String,
}

impl PropertyAlias {
    /// Creates an alias entry.
    #[must_use]
    pub fn new(source: impl Into<String>, alias: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            alias: alias.into(),
        }
    }
}

/// Contents of a layer's `metadata.toml`.
///
/// Properties are kept in file order, which is also the order their
/// output columns appear in enriched records.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerMetadata {
    /// Optional human-readable description of the layer.
    #[serde(default)]
    pub description: Option<String>,
    /// Ordered alias mapping.
    #[serde(default)]
    pub properties: Vec<PropertyAlias>,
}

impl LayerMetadata {
    /// Output column names in configuration order.
    pub fn output_columns(&self) -> impl Iterator<Item = &str> {
        self.properties.iter().map(|p| p.alias.as_str())
    }
}

/// Everything needed to load one layer: its name, alias mapping, and
/// where its geometry lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerConfig {
    /// Unique layer name (e.g., `"divipola_colombia"`).
    pub name: String,
    /// Catalog group the layer was discovered under (e.g., `"colombia"`).
    pub group: String,
    /// Alias mapping parsed from `metadata.toml`.
    pub metadata: LayerMetadata,
    /// Path to the `GeoJSON` feature collection.
    pub geometry_path: PathBuf,
}

impl LayerConfig {
    /// Returns the layer name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}
