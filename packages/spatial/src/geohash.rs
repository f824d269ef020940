//! Geohash encoding.
//!
//! Bisects the longitude interval `[-180, 180]` and the latitude interval
//! `[-90, 90]` alternately, starting with longitude. A coordinate strictly
//! greater than the midpoint emits a `1` bit and keeps the upper half;
//! otherwise a `0` bit and the lower half. Every five bits select one
//! character of the base32 alphabet.

use crate::point::{CoordinateError, Point};

/// Geohash base32 alphabet (no `a`, `i`, `l`, `o`).
pub const ALPHABET: &[u8; 32] = b"0123456789bcdefghjkmnpqrstuvwxyz";

/// Precision used when none is configured.
pub const DEFAULT_PRECISION: usize = 12;

/// Longest geohash worth computing; further characters are below `f64`
/// resolution.
pub const MAX_PRECISION: usize = 22;

/// Encodes a latitude/longitude pair into a geohash of `precision`
/// characters.
///
/// # Errors
///
/// Returns [`CoordinateError`] if either coordinate is out of range.
pub fn encode(latitude: f64, longitude: f64, precision: usize) -> Result<String, CoordinateError> {
    Ok(encode_point(Point::new(latitude, longitude)?, precision))
}

/// Encodes an already validated point.
#[must_use]
pub fn encode_point(point: Point, precision: usize) -> String {
    let mut lat = (-90.0_f64, 90.0_f64);
    let mut lon = (-180.0_f64, 180.0_f64);
    let mut hash = String::with_capacity(precision);

    let mut even = true;
    let mut bit = 0;
    let mut ch = 0_usize;

    while hash.len() < precision {
        let (interval, value) = if even {
            (&mut lon, point.longitude())
        } else {
            (&mut lat, point.latitude())
        };

        let mid = (interval.0 + interval.1) / 2.0;
        if value > mid {
            ch |= 1 << (4 - bit);
            interval.0 = mid;
        } else {
            interval.1 = mid;
        }
        even = !even;

        if bit < 4 {
            bit += 1;
        } else {
            hash.push(char::from(ALPHABET[ch]));
            bit = 0;
            ch = 0;
        }
    }

    hash
}

/// The cell covered by a geohash.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    /// Southern edge.
    pub min_lat: f64,
    /// Northern edge.
    pub max_lat: f64,
    /// Western edge.
    pub min_lon: f64,
    /// Eastern edge.
    pub max_lon: f64,
}

impl Bounds {
    /// Whether `point` lies in the cell (edges included).
    #[must_use]
    pub fn contains(&self, point: Point) -> bool {
        (self.min_lat..=self.max_lat).contains(&point.latitude())
            && (self.min_lon..=self.max_lon).contains(&point.longitude())
    }
}

/// Decodes a geohash back into the cell it denotes.
///
/// Returns `None` if `hash` contains a character outside [`ALPHABET`].
#[must_use]
pub fn decode_bounds(hash: &str) -> Option<Bounds> {
    let mut lat = (-90.0_f64, 90.0_f64);
    let mut lon = (-180.0_f64, 180.0_f64);
    let mut even = true;

    for c in hash.bytes() {
        let index = ALPHABET.iter().position(|&a| a == c)?;
        for shift in (0..5).rev() {
            let interval = if even { &mut lon } else { &mut lat };
            let mid = (interval.0 + interval.1) / 2.0;
            if index & (1 << shift) == 0 {
                interval.1 = mid;
            } else {
                interval.0 = mid;
            }
            even = !even;
        }
    }

    Some(Bounds {
        min_lat: lat.0,
        max_lat: lat.1,
        min_lon: lon.0,
        max_lon: lon.1,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn origin_encodes_deterministically() {
        let first = encode(0.0, 0.0, DEFAULT_PRECISION).unwrap();
        let second = encode(0.0, 0.0, DEFAULT_PRECISION).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.len(), 12);
        assert_eq!(first, "7zzzzzzzzzzz");
    }

    #[test]
    fn matches_reference_geohash() {
        assert_eq!(encode(57.64911, 10.40744, 11).unwrap(), "u4pruydqqvj");
        assert_eq!(encode(4.6097, -74.0817, 5).unwrap(), "d2g64");
    }

    #[test]
    fn output_length_equals_precision() {
        for precision in 0..=20 {
            let hash = encode(-33.45, -70.66, precision).unwrap();
            assert_eq!(hash.len(), precision);
        }
    }

    #[test]
    fn uses_only_alphabet_characters() {
        let samples = [
            (90.0, 180.0),
            (-90.0, -180.0),
            (45.5, -122.6),
            (-12.04, -77.03),
            (35.68, 139.69),
        ];
        for (lat, lon) in samples {
            let hash = encode(lat, lon, 12).unwrap();
            assert!(
                hash.bytes().all(|b| ALPHABET.contains(&b)),
                "{hash} for ({lat}, {lon})"
            );
        }
    }

    #[test]
    fn prefixes_are_hierarchical() {
        let long = encode(4.6097, -74.0817, 12).unwrap();
        let short = encode(4.6097, -74.0817, 6).unwrap();
        assert!(long.starts_with(&short));
    }

    #[test]
    fn decoded_cell_contains_the_point() {
        let point = Point::new(6.2442, -75.5812).unwrap();
        let hash = encode_point(point, 9);
        let bounds = decode_bounds(&hash).unwrap();
        assert!(bounds.contains(point), "{bounds:?} should contain {point:?}");
    }

    #[test]
    fn decode_rejects_foreign_characters() {
        assert!(decode_bounds("u4pa").is_none());
    }

    #[test]
    fn rejects_out_of_range_coordinates() {
        assert!(encode(91.0, 0.0, 12).is_err());
        assert!(encode(0.0, 181.0, 12).is_err());
    }
}
