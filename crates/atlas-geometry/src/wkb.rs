// SPDX-License-Identifier: MIT OR Apache-2.0

//! Canonical WKB encoding.
//!
//! The geometry hash is Poseidon2 over these bytes, so the encoding must be
//! bit-stable across machines and runs. Canonical form:
//!
//! - little-endian WKB, always a MultiPolygon (single polygons are wrapped);
//! - coordinates quantized to 1e-7 degrees before serialization;
//! - rings closed (first vertex repeated last), consecutive duplicate
//!   vertices dropped;
//! - exterior rings counter-clockwise, interior rings clockwise;
//! - each ring rotated to start at its lexicographically smallest vertex;
//! - polygons sorted by their encoded exterior ring.

use geo_types::{Coord, LineString, MultiPolygon, Polygon};

/// Quantization step, degrees. Normative: part of the wire contract.
pub const QUANTUM_DEGREES: f64 = 1e-7;

const WKB_LITTLE_ENDIAN: u8 = 0x01;
const WKB_POLYGON: u32 = 3;
const WKB_MULTI_POLYGON: u32 = 6;

/// Snap a coordinate to the 1e-7-degree grid.
///
/// Deterministic: every double that rounds to the same grid cell maps to
/// the identical f64.
#[must_use]
pub fn quantize(value: f64) -> f64 {
    (value / QUANTUM_DEGREES).round() * QUANTUM_DEGREES
}

/// A quantized vertex, ordered for canonical ring rotation.
#[derive(Debug, Clone, Copy, PartialEq)]
struct QCoord {
    x: f64,
    y: f64,
}

impl QCoord {
    fn from(c: Coord<f64>) -> Self {
        Self {
            x: quantize(c.x),
            y: quantize(c.y),
        }
    }

    /// Total order over quantized vertices. Quantized values are never NaN,
    /// so the bit-pattern comparison below is a plain numeric order.
    fn key(&self) -> (i64, i64) {
        (
            (self.x / QUANTUM_DEGREES).round() as i64,
            (self.y / QUANTUM_DEGREES).round() as i64,
        )
    }
}

/// One ring in canonical form: open (no closing vertex), deduplicated,
/// rotated to its smallest vertex, oriented.
fn canonical_ring(ring: &LineString<f64>, counter_clockwise: bool) -> Vec<QCoord> {
    let mut points: Vec<QCoord> = ring.coords().map(|c| QCoord::from(*c)).collect();

    // Drop the closing vertex if present; we re-close at serialization.
    if points.len() > 1 && points.first().map(QCoord::key) == points.last().map(QCoord::key) {
        points.pop();
    }

    // Quantization can collapse adjacent vertices.
    points.dedup_by_key(|p| p.key());
    if points.len() > 1 && points.first().map(QCoord::key) == points.last().map(QCoord::key) {
        points.pop();
    }
    if points.len() < 3 {
        return points;
    }

    // Shoelace sign decides current winding; positive is counter-clockwise.
    let doubled_area: f64 = points
        .iter()
        .zip(points.iter().cycle().skip(1))
        .map(|(a, b)| a.x * b.y - b.x * a.y)
        .take(points.len())
        .sum();
    if (doubled_area > 0.0) != counter_clockwise {
        points.reverse();
    }

    // Rotate so the smallest vertex leads.
    let start = points
        .iter()
        .enumerate()
        .min_by_key(|(_, p)| p.key())
        .map(|(i, _)| i)
        .unwrap_or(0);
    points.rotate_left(start);
    points
}

fn put_u32(out: &mut Vec<u8>, v: u32) {
    out.extend_from_slice(&v.to_le_bytes());
}

fn put_f64(out: &mut Vec<u8>, v: f64) {
    out.extend_from_slice(&v.to_le_bytes());
}

fn encode_ring(out: &mut Vec<u8>, ring: &[QCoord]) {
    // Closed at serialization: n open vertices become n+1 WKB points.
    put_u32(out, ring.len() as u32 + 1);
    for p in ring.iter().chain(ring.first().into_iter()) {
        put_f64(out, p.x);
        put_f64(out, p.y);
    }
}

fn encode_polygon(polygon: &Polygon<f64>) -> Vec<u8> {
    let exterior = canonical_ring(polygon.exterior(), true);
    let mut interiors: Vec<Vec<QCoord>> = polygon
        .interiors()
        .iter()
        .map(|r| canonical_ring(r, false))
        .filter(|r| r.len() >= 3)
        .collect();
    // Interior order must not depend on source order.
    interiors.sort_by_key(|r| r.first().map(QCoord::key));

    let mut out = Vec::new();
    out.push(WKB_LITTLE_ENDIAN);
    put_u32(&mut out, WKB_POLYGON);
    put_u32(&mut out, 1 + interiors.len() as u32);
    encode_ring(&mut out, &exterior);
    for ring in &interiors {
        encode_ring(&mut out, ring);
    }
    out
}

/// Serialize a multipolygon to canonical WKB.
#[must_use]
pub fn canonical_wkb(geometry: &MultiPolygon<f64>) -> Vec<u8> {
    let mut encoded: Vec<Vec<u8>> = geometry.iter().map(encode_polygon).collect();
    encoded.sort();

    let mut out = Vec::new();
    out.push(WKB_LITTLE_ENDIAN);
    put_u32(&mut out, WKB_MULTI_POLYGON);
    put_u32(&mut out, encoded.len() as u32);
    for polygon in encoded {
        out.extend_from_slice(&polygon);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo_types::polygon;

    fn unit_square() -> Polygon<f64> {
        polygon![
            (x: 0.0, y: 0.0),
            (x: 1.0, y: 0.0),
            (x: 1.0, y: 1.0),
            (x: 0.0, y: 1.0),
            (x: 0.0, y: 0.0),
        ]
    }

    #[test]
    fn quantize_snaps_noise() {
        assert_eq!(quantize(1.000000049), 1.0);
        assert_eq!(quantize(1.00000006), 1.0000001);
        assert_eq!(quantize(-122.41941550000001), quantize(-122.4194155));
    }

    #[test]
    fn identical_geometry_identical_bytes() {
        let a = MultiPolygon(vec![unit_square()]);
        let b = MultiPolygon(vec![unit_square()]);
        assert_eq!(canonical_wkb(&a), canonical_wkb(&b));
    }

    #[test]
    fn floating_point_noise_is_invisible() {
        let noisy = polygon![
            (x: 0.000000004, y: -0.000000003),
            (x: 1.000000002, y: 0.0),
            (x: 1.0, y: 0.999999998),
            (x: 0.0, y: 1.000000001),
        ];
        let clean = MultiPolygon(vec![unit_square()]);
        assert_eq!(canonical_wkb(&MultiPolygon(vec![noisy])), canonical_wkb(&clean));
    }

    #[test]
    fn ring_rotation_is_invisible() {
        let rotated = polygon![
            (x: 1.0, y: 1.0),
            (x: 0.0, y: 1.0),
            (x: 0.0, y: 0.0),
            (x: 1.0, y: 0.0),
        ];
        assert_eq!(
            canonical_wkb(&MultiPolygon(vec![rotated])),
            canonical_wkb(&MultiPolygon(vec![unit_square()]))
        );
    }

    #[test]
    fn winding_is_normalized() {
        let clockwise = polygon![
            (x: 0.0, y: 0.0),
            (x: 0.0, y: 1.0),
            (x: 1.0, y: 1.0),
            (x: 1.0, y: 0.0),
        ];
        assert_eq!(
            canonical_wkb(&MultiPolygon(vec![clockwise])),
            canonical_wkb(&MultiPolygon(vec![unit_square()]))
        );
    }

    #[test]
    fn polygon_order_is_normalized() {
        let far = polygon![
            (x: 10.0, y: 10.0),
            (x: 11.0, y: 10.0),
            (x: 11.0, y: 11.0),
            (x: 10.0, y: 11.0),
        ];
        let ab = MultiPolygon(vec![unit_square(), far.clone()]);
        let ba = MultiPolygon(vec![far, unit_square()]);
        assert_eq!(canonical_wkb(&ab), canonical_wkb(&ba));
    }

    #[test]
    fn different_geometry_different_bytes() {
        let bigger = polygon![
            (x: 0.0, y: 0.0),
            (x: 2.0, y: 0.0),
            (x: 2.0, y: 2.0),
            (x: 0.0, y: 2.0),
        ];
        assert_ne!(
            canonical_wkb(&MultiPolygon(vec![unit_square()])),
            canonical_wkb(&MultiPolygon(vec![bigger]))
        );
    }

    #[test]
    fn header_is_little_endian_multipolygon() {
        let bytes = canonical_wkb(&MultiPolygon(vec![unit_square()]));
        assert_eq!(bytes[0], 0x01);
        assert_eq!(u32::from_le_bytes([bytes[1], bytes[2], bytes[3], bytes[4]]), 6);
    }
}
