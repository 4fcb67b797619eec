// SPDX-License-Identifier: MIT OR Apache-2.0

//! Spherical-excess area and polygon boolean-op helpers.
//!
//! Areas are computed directly in WGS84 with the Chamberlain–Duquette
//! spherical-excess formula, so no equal-area reprojection happens anywhere
//! in the pipeline. The choice is stable across runs and platforms.

use geo::{BooleanOps, ChamberlainDuquetteArea};
use geo_types::MultiPolygon;

/// Unsigned area of a multipolygon, square meters on the WGS84 sphere.
#[must_use]
pub fn unsigned_area_m2(geometry: &MultiPolygon<f64>) -> f64 {
    geometry.chamberlain_duquette_unsigned_area()
}

/// Area of the intersection of two multipolygons, square meters.
#[must_use]
pub fn intersection_area_m2(a: &MultiPolygon<f64>, b: &MultiPolygon<f64>) -> f64 {
    unsigned_area_m2(&a.intersection(b))
}

/// Area of `a ∖ b`, square meters.
#[must_use]
pub fn outside_area_m2(a: &MultiPolygon<f64>, b: &MultiPolygon<f64>) -> f64 {
    unsigned_area_m2(&a.difference(b))
}

/// Union of a set of multipolygons.
///
/// Pairwise left fold; input order does not affect the resulting point set.
#[must_use]
pub fn union_all(geometries: &[MultiPolygon<f64>]) -> MultiPolygon<f64> {
    let mut iter = geometries.iter();
    let Some(first) = iter.next() else {
        return MultiPolygon(vec![]);
    };
    iter.fold(first.clone(), |acc, g| acc.union(g))
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo_types::polygon;

    fn square(x0: f64, y0: f64, size: f64) -> MultiPolygon<f64> {
        MultiPolygon(vec![polygon![
            (x: x0, y: y0),
            (x: x0 + size, y: y0),
            (x: x0 + size, y: y0 + size),
            (x: x0, y: y0 + size),
            (x: x0, y: y0),
        ]])
    }

    #[test]
    fn one_degree_square_near_equator_area() {
        // 1° × 1° at the equator is roughly 111 km × 111 km.
        let area = unsigned_area_m2(&square(0.0, 0.0, 1.0));
        assert!(area > 1.2e10 && area < 1.25e10, "area {area}");
    }

    #[test]
    fn disjoint_squares_do_not_intersect() {
        let a = square(0.0, 0.0, 1.0);
        let b = square(5.0, 5.0, 1.0);
        assert_eq!(intersection_area_m2(&a, &b), 0.0);
    }

    #[test]
    fn half_overlap_intersection() {
        let a = square(0.0, 0.0, 1.0);
        let b = square(0.5, 0.0, 1.0);
        let overlap = intersection_area_m2(&a, &b);
        let full = unsigned_area_m2(&a);
        let ratio = overlap / full;
        assert!((ratio - 0.5).abs() < 0.01, "ratio {ratio}");
    }

    #[test]
    fn outside_area_of_contained_is_zero() {
        let inner = square(0.25, 0.25, 0.5);
        let outer = square(0.0, 0.0, 1.0);
        let outside = outside_area_m2(&inner, &outer);
        let inner_area = unsigned_area_m2(&inner);
        assert!(outside / inner_area < 1e-6, "outside {outside}");
    }

    #[test]
    fn union_of_disjoint_sums_areas() {
        let a = square(0.0, 0.0, 1.0);
        let b = square(3.0, 0.0, 1.0);
        let union = union_all(&[a.clone(), b.clone()]);
        let sum = unsigned_area_m2(&a) + unsigned_area_m2(&b);
        let got = unsigned_area_m2(&union);
        assert!((got - sum).abs() / sum < 1e-6);
    }

    #[test]
    fn union_of_empty_slice_is_empty() {
        assert_eq!(union_all(&[]).0.len(), 0);
    }
}
