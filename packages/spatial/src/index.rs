//! Polygon containment indexes.
//!
//! [`PolygonIndex`] is the capability the rest of the engine depends on:
//! given a point, return the attributes of the first containing polygon.
//! [`BoundaryIndex`] implements it with an R-tree over polygon bounding
//! boxes, followed by an exact `geo::Contains` test on the candidates.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use geo::{BoundingRect, Contains, MultiPolygon};
use geojson::{Feature, GeoJson, JsonObject};
use rstar::{AABB, RTree, RTreeObject};

use crate::LayerConfigError;
use crate::point::Point;

/// Attribute map carried by a polygon (source attribute key -> value).
pub type Attributes = BTreeMap<String, String>;

/// Point containment over a fixed, ordered set of polygons.
pub trait PolygonIndex: Send + Sync {
    /// Returns the attributes of the first polygon, in load order, that
    /// contains `point`, or `None` on a miss.
    ///
    /// Points exactly on a polygon boundary are not contained. The answer
    /// for a given point is always the same.
    fn locate(&self, point: Point) -> Option<&Attributes>;

    /// Number of polygons in the index.
    fn len(&self) -> usize;
}

/// A boundary polygon stored in the R-tree with its attributes.
struct BoundaryEntry {
    /// Position in the source feature collection. Lower wins on overlap.
    position: usize,
    envelope: AABB<[f64; 2]>,
    polygon: MultiPolygon<f64>,
    attributes: Attributes,
}

impl RTreeObject for BoundaryEntry {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

/// R-tree backed [`PolygonIndex`].
///
/// Polygons are not assumed disjoint: among all candidates that contain
/// the point, the one loaded first is returned.
pub struct BoundaryIndex {
    tree: RTree<BoundaryEntry>,
    attribute_keys: BTreeSet<String>,
}

impl BoundaryIndex {
    /// Builds an index from polygons in load order.
    ///
    /// Polygons with no extent (no coordinates at all) are dropped with a
    /// warning; they can never contain a point.
    #[must_use]
    pub fn from_polygons(polygons: Vec<(MultiPolygon<f64>, Attributes)>) -> Self {
        let mut attribute_keys = BTreeSet::new();
        let mut entries = Vec::with_capacity(polygons.len());

        for (position, (polygon, attributes)) in polygons.into_iter().enumerate() {
            let Some(envelope) = compute_envelope(&polygon) else {
                log::warn!("Skipping empty polygon at position {position}");
                continue;
            };

            attribute_keys.extend(attributes.keys().cloned());
            entries.push(BoundaryEntry {
                position,
                envelope,
                polygon,
                attributes,
            });
        }

        Self {
            tree: RTree::bulk_load(entries),
            attribute_keys,
        }
    }

    /// Reads and indexes a `GeoJSON` file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not a polygon
    /// feature collection.
    pub fn load(layer: &str, path: &Path) -> Result<Self, LayerConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| LayerConfigError::Io {
            layer: layer.to_string(),
            path: path.to_path_buf(),
            source,
        })?;

        Self::from_geojson_str(layer, &contents)
    }

    /// Parses and indexes a `GeoJSON` document.
    ///
    /// Accepts a `FeatureCollection` or a single `Feature`. Features with a
    /// `null` geometry are skipped; any other non-polygonal geometry is an
    /// error.
    ///
    /// # Errors
    ///
    /// Returns an error if the document is not valid `GeoJSON` or contains
    /// a feature that is not a `Polygon`/`MultiPolygon`.
    pub fn from_geojson_str(layer: &str, geojson_str: &str) -> Result<Self, LayerConfigError> {
        let geojson: GeoJson = geojson_str
            .parse()
            .map_err(|e| LayerConfigError::GeoJson {
                layer: layer.to_string(),
                source: Box::new(e),
            })?;

        let features = match geojson {
            GeoJson::FeatureCollection(collection) => collection.features,
            GeoJson::Feature(feature) => vec![feature],
            GeoJson::Geometry(_) => {
                return Err(LayerConfigError::Geometry {
                    layer: layer.to_string(),
                    message: "expected a FeatureCollection, found a bare geometry".to_string(),
                });
            }
        };

        Self::from_features(layer, features)
    }

    /// Indexes already-parsed features in order.
    ///
    /// # Errors
    ///
    /// Returns an error if a feature carries a non-polygonal geometry.
    pub fn from_features(layer: &str, features: Vec<Feature>) -> Result<Self, LayerConfigError> {
        let mut polygons = Vec::with_capacity(features.len());

        for (i, feature) in features.into_iter().enumerate() {
            let Some(geometry) = feature.geometry else {
                log::debug!("Layer '{layer}': feature {i} has no geometry, skipping");
                continue;
            };

            let polygon = to_multipolygon(geometry).map_err(|message| {
                LayerConfigError::Geometry {
                    layer: layer.to_string(),
                    message: format!("feature {i}: {message}"),
                }
            })?;

            polygons.push((polygon, to_attributes(feature.properties)));
        }

        Ok(Self::from_polygons(polygons))
    }

    /// Union of attribute keys seen across all polygons.
    #[must_use]
    pub const fn attribute_keys(&self) -> &BTreeSet<String> {
        &self.attribute_keys
    }
}

impl PolygonIndex for BoundaryIndex {
    fn locate(&self, point: Point) -> Option<&Attributes> {
        let target: geo::Point<f64> = point.into();
        let query_env = AABB::from_point([point.longitude(), point.latitude()]);

        self.tree
            .locate_in_envelope_intersecting(&query_env)
            .filter(|entry| entry.polygon.contains(&target))
            .min_by_key(|entry| entry.position)
            .map(|entry| &entry.attributes)
    }

    fn len(&self) -> usize {
        self.tree.size()
    }
}

/// Converts a `GeoJSON` geometry into a [`MultiPolygon`].
/// Handles both `Polygon` and `MultiPolygon` geometry types.
fn to_multipolygon(geometry: geojson::Geometry) -> Result<MultiPolygon<f64>, String> {
    let geo_geom: geo::Geometry<f64> = geometry.try_into().map_err(|e| format!("{e}"))?;
    match geo_geom {
        geo::Geometry::MultiPolygon(mp) => Ok(mp),
        geo::Geometry::Polygon(p) => Ok(MultiPolygon(vec![p])),
        _ => Err("expected a Polygon or MultiPolygon geometry".to_string()),
    }
}

/// Flattens feature properties into string attributes.
///
/// Strings are kept verbatim, other scalars use their JSON text, and
/// `null` values are dropped so they resolve as missing.
fn to_attributes(properties: Option<JsonObject>) -> Attributes {
    properties
        .into_iter()
        .flatten()
        .filter_map(|(key, value)| match value {
            serde_json::Value::Null => None,
            serde_json::Value::String(s) => Some((key, s)),
            other => Some((key, other.to_string())),
        })
        .collect()
}

/// Compute the bounding box envelope for a [`MultiPolygon`].
fn compute_envelope(mp: &MultiPolygon<f64>) -> Option<AABB<[f64; 2]>> {
    mp.bounding_rect()
        .map(|rect| AABB::from_corners([rect.min().x, rect.min().y], [rect.max().x, rect.max().y]))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use geo::{LineString, Polygon};

    /// Axis-aligned square polygon from `(min_lon, min_lat)` to
    /// `(max_lon, max_lat)`.
    pub(crate) fn square(min_lon: f64, min_lat: f64, max_lon: f64, max_lat: f64) -> MultiPolygon<f64> {
        MultiPolygon(vec![Polygon::new(
            LineString::from(vec![
                (min_lon, min_lat),
                (max_lon, min_lat),
                (max_lon, max_lat),
                (min_lon, max_lat),
                (min_lon, min_lat),
            ]),
            vec![],
        )])
    }

    pub(crate) fn attrs(pairs: &[(&str, &str)]) -> Attributes {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    fn point(lat: f64, lon: f64) -> Point {
        Point::new(lat, lon).unwrap()
    }

    #[test]
    fn locates_containing_polygon() {
        let index = BoundaryIndex::from_polygons(vec![(
            square(-1.0, -1.0, 1.0, 1.0),
            attrs(&[("name", "A")]),
        )]);

        let hit = index.locate(point(0.0, 0.0)).unwrap();
        assert_eq!(hit.get("name").map(String::as_str), Some("A"));
        assert!(index.locate(point(5.0, 5.0)).is_none());
    }

    #[test]
    fn first_loaded_polygon_wins_on_overlap() {
        let index = BoundaryIndex::from_polygons(vec![
            (square(-10.0, -10.0, 10.0, 10.0), attrs(&[("name", "outer")])),
            (square(-1.0, -1.0, 1.0, 1.0), attrs(&[("name", "inner")])),
        ]);

        for _ in 0..10 {
            let hit = index.locate(point(0.0, 0.0)).unwrap();
            assert_eq!(hit.get("name").map(String::as_str), Some("outer"));
        }
    }

    #[test]
    fn holes_are_not_contained() {
        let exterior = LineString::from(vec![
            (0.0, 0.0),
            (10.0, 0.0),
            (10.0, 10.0),
            (0.0, 10.0),
            (0.0, 0.0),
        ]);
        let hole = LineString::from(vec![
            (4.0, 4.0),
            (6.0, 4.0),
            (6.0, 6.0),
            (4.0, 6.0),
            (4.0, 4.0),
        ]);
        let donut = MultiPolygon(vec![Polygon::new(exterior, vec![hole])]);
        let index = BoundaryIndex::from_polygons(vec![(donut, attrs(&[("name", "ring")]))]);

        assert!(index.locate(point(5.0, 5.0)).is_none());
        assert!(index.locate(point(2.0, 2.0)).is_some());
    }

    #[test]
    fn boundary_points_are_consistently_outside() {
        let index = BoundaryIndex::from_polygons(vec![(
            square(-1.0, -1.0, 1.0, 1.0),
            attrs(&[("name", "A")]),
        )]);

        for _ in 0..5 {
            assert!(index.locate(point(0.0, 1.0)).is_none());
            assert!(index.locate(point(1.0, 1.0)).is_none());
        }
    }

    #[test]
    fn parses_feature_collection() {
        let geojson = r#"{
            "type": "FeatureCollection",
            "features": [
                {
                    "type": "Feature",
                    "properties": {"name": "A", "code": 5, "empty": null},
                    "geometry": {
                        "type": "Polygon",
                        "coordinates": [[[-1,-1],[1,-1],[1,1],[-1,1],[-1,-1]]]
                    }
                },
                {
                    "type": "Feature",
                    "properties": {"name": "B"},
                    "geometry": {
                        "type": "MultiPolygon",
                        "coordinates": [[[[10,10],[12,10],[12,12],[10,12],[10,10]]]]
                    }
                },
                {
                    "type": "Feature",
                    "properties": {"name": "nowhere"},
                    "geometry": null
                }
            ]
        }"#;

        let index = BoundaryIndex::from_geojson_str("test", geojson).unwrap();
        assert_eq!(index.len(), 2);

        let a = index.locate(point(0.0, 0.0)).unwrap();
        assert_eq!(a.get("code").map(String::as_str), Some("5"));
        assert!(!a.contains_key("empty"));

        let b = index.locate(point(11.0, 11.0)).unwrap();
        assert_eq!(b.get("name").map(String::as_str), Some("B"));

        assert!(index.attribute_keys().contains("code"));
    }

    #[test]
    fn rejects_non_polygon_features() {
        let geojson = r#"{
            "type": "FeatureCollection",
            "features": [
                {
                    "type": "Feature",
                    "properties": {},
                    "geometry": {"type": "Point", "coordinates": [0, 0]}
                }
            ]
        }"#;

        let err = BoundaryIndex::from_geojson_str("points", geojson).err().unwrap();
        assert!(matches!(err, LayerConfigError::Geometry { .. }), "{err}");
    }

    #[test]
    fn rejects_invalid_json() {
        let err = BoundaryIndex::from_geojson_str("broken", "{ not json").err().unwrap();
        assert!(matches!(err, LayerConfigError::GeoJson { .. }), "{err}");
    }

    #[test]
    fn missing_file_is_io_error() {
        let path = std::env::temp_dir()
            .join(uuid::Uuid::new_v4().to_string())
            .join("data.geo.json");
        let err = BoundaryIndex::load("missing", &path).err().unwrap();
        assert!(matches!(err, LayerConfigError::Io { .. }), "{err}");
    }
}
