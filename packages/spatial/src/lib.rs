#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! In-memory spatial engine for multi-layer reverse geocoding.
//!
//! Loads polygon layers from `GeoJSON` feature collections at startup,
//! builds an R-tree per layer, and answers "which polygon of this layer
//! contains the point" queries. A [`LayerRegistry`] holds every loaded
//! layer in load order and merges their answers into one set of output
//! columns. The [`geohash`] module encodes points into base32 cell codes.
//!
//! Everything here is immutable after construction and safe to share
//! across threads.

pub mod geohash;
pub mod index;
pub mod layer;
pub mod point;
pub mod registry;

use std::path::PathBuf;

pub use geo_reverse_layer_models::{ColumnMap, LayerConfig, PropertyAlias, SENTINEL};
pub use index::{Attributes, BoundaryIndex, PolygonIndex};
pub use layer::{Layer, ResolutionResult};
pub use point::{CoordinateError, Point};
pub use registry::{ColumnCollision, LayerRegistry};

/// Errors raised while building a layer or the registry.
///
/// Any of these is fatal to the whole registry build: a partial layer set
/// would silently change the output columns.
#[derive(Debug, thiserror::Error)]
pub enum LayerConfigError {
    /// The geometry file could not be read.
    #[error("Layer '{layer}': failed to read {path}: {source}")]
    Io {
        /// Layer name.
        layer: String,
        /// Geometry file path.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The geometry source is not valid `GeoJSON`.
    #[error("Layer '{layer}': invalid GeoJSON: {source}")]
    GeoJson {
        /// Layer name.
        layer: String,
        /// Underlying parse error.
        source: Box<geojson::Error>,
    },

    /// The geometry source parsed but is not a usable polygon collection.
    #[error("Layer '{layer}': malformed geometry: {message}")]
    Geometry {
        /// Layer name.
        layer: String,
        /// Description of what went wrong.
        message: String,
    },

    /// The alias mapping cannot be used.
    #[error("Layer '{layer}': invalid alias mapping: {message}")]
    Alias {
        /// Layer name.
        layer: String,
        /// Description of what went wrong.
        message: String,
    },

    /// Two layers share a name.
    #[error("Duplicate layer name: {0}")]
    DuplicateLayer(String),

    /// The include list names layers that are not configured.
    #[error("Unknown layer(s) requested: {}", .0.join(", "))]
    UnknownLayers(Vec<String>),
}
