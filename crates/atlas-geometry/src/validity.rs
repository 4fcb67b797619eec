// SPDX-License-Identifier: MIT OR Apache-2.0

//! OGC simple-feature validity checks.
//!
//! Non-compliant inputs are rejected by the normalizer, never silently
//! repaired; the only mutation the pipeline performs is the canonical
//! re-orientation in the WKB encoder, which does not change the point set.

use geo_types::{Coord, LineString, MultiPolygon};
use serde::{Deserialize, Serialize};

/// WGS84 longitude/latitude domain.
const LON_RANGE: (f64, f64) = (-180.0, 180.0);
const LAT_RANGE: (f64, f64) = (-90.0, 90.0);

/// Findings from a validity check of one geometry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidityReport {
    /// Geometry has no polygons, or a ring with fewer than four points.
    pub degenerate: bool,
    /// A ring is not closed (first vertex != last vertex).
    pub unclosed_ring: bool,
    /// A ring crosses itself.
    pub self_intersection: bool,
    /// A vertex lies outside the WGS84 domain.
    pub out_of_range: bool,
}

impl ValidityReport {
    /// `true` when no defect was found.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        !self.degenerate && !self.unclosed_ring && !self.self_intersection && !self.out_of_range
    }
}

/// Run all validity checks against a multipolygon.
#[must_use]
pub fn check_validity(geometry: &MultiPolygon<f64>) -> ValidityReport {
    let mut report = ValidityReport::default();
    if geometry.0.is_empty() {
        report.degenerate = true;
        return report;
    }
    for polygon in geometry {
        check_ring(polygon.exterior(), &mut report);
        for interior in polygon.interiors() {
            check_ring(interior, &mut report);
        }
    }
    report
}

fn check_ring(ring: &LineString<f64>, report: &mut ValidityReport) {
    let coords: &[Coord<f64>] = &ring.0;
    if coords.len() < 4 {
        report.degenerate = true;
        return;
    }
    if coords.first() != coords.last() {
        report.unclosed_ring = true;
    }
    for c in coords {
        if !(LON_RANGE.0..=LON_RANGE.1).contains(&c.x)
            || !(LAT_RANGE.0..=LAT_RANGE.1).contains(&c.y)
            || !c.x.is_finite()
            || !c.y.is_finite()
        {
            report.out_of_range = true;
        }
    }
    if ring_self_intersects(coords) {
        report.self_intersection = true;
    }
}

/// Pairwise segment test, skipping adjacent segments. Quadratic, which is
/// fine at district vertex counts.
fn ring_self_intersects(coords: &[Coord<f64>]) -> bool {
    let n = coords.len().saturating_sub(1);
    if n < 3 {
        return false;
    }
    for i in 0..n {
        for j in (i + 2)..n {
            // The closing segment is adjacent to the first.
            if i == 0 && j == n - 1 {
                continue;
            }
            if segments_cross(
                coords[i],
                coords[i + 1],
                coords[j],
                coords[j + 1],
            ) {
                return true;
            }
        }
    }
    false
}

fn orientation(a: Coord<f64>, b: Coord<f64>, c: Coord<f64>) -> f64 {
    (b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x)
}

fn segments_cross(p1: Coord<f64>, p2: Coord<f64>, q1: Coord<f64>, q2: Coord<f64>) -> bool {
    let d1 = orientation(q1, q2, p1);
    let d2 = orientation(q1, q2, p2);
    let d3 = orientation(p1, p2, q1);
    let d4 = orientation(p1, p2, q2);
    (d1 * d2 < 0.0) && (d3 * d4 < 0.0)
}
