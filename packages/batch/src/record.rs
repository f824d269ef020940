//! Input and enriched record types.

use geo_reverse_layer_models::ColumnMap;
use geo_reverse_spatial::Point;
use serde::{Serialize, Serializer};

use crate::RecordError;

/// Input column holding the latitude.
pub const LATITUDE_COLUMN: &str = "latitude";

/// Input column holding the longitude.
pub const LONGITUDE_COLUMN: &str = "longitude";

/// Output column holding the geohash.
pub const GEOHASH_COLUMN: &str = "geohash";

/// One delimited input row, with every field kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputRecord {
    /// 1-based data row within its file.
    pub row: u64,
    /// Header -> value, in header order.
    pub fields: ColumnMap,
}

impl InputRecord {
    /// Creates a record.
    #[must_use]
    pub const fn new(row: u64, fields: ColumnMap) -> Self {
        Self { row, fields }
    }

    /// Parses the record's coordinates.
    ///
    /// # Errors
    ///
    /// Returns [`RecordError`] if a coordinate column is missing, is not a
    /// number, or is out of range.
    pub fn point(&self) -> Result<Point, RecordError> {
        let latitude = self.coordinate(LATITUDE_COLUMN)?;
        let longitude = self.coordinate(LONGITUDE_COLUMN)?;

        Point::new(latitude, longitude).map_err(|source| RecordError::OutOfRange {
            row: self.row,
            source,
        })
    }

    fn coordinate(&self, column: &'static str) -> Result<f64, RecordError> {
        let raw = self
            .fields
            .get(column)
            .ok_or(RecordError::MissingColumn {
                row: self.row,
                column,
            })?;

        raw.trim()
            .parse::<f64>()
            .map_err(|_| RecordError::NotANumber {
                row: self.row,
                column,
                value: raw.to_string(),
            })
    }
}

/// An input record merged with every layer's output columns and a
/// geohash. Serializes as a flat JSON object in column order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnrichedRecord {
    /// 1-based data row of the source record.
    pub row: u64,
    /// Original fields followed by layer columns and `geohash`.
    pub fields: ColumnMap,
}

impl EnrichedRecord {
    /// Value of a column.
    #[must_use]
    pub fn get(&self, column: &str) -> Option<&str> {
        self.fields.get(column)
    }
}

impl Serialize for EnrichedRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.fields.serialize(serializer)
    }
}
