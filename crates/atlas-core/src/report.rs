// SPDX-License-Identifier: MIT OR Apache-2.0

//! Validation report types.
//!
//! One [`ValidationResult`] is produced per `(layer, state)` pair. The
//! sub-reports (completeness, topology, coordinates, tessellation) each
//! contribute a 0–100 sub-score; [`ValidationResult::quality_score`] is the
//! weighted composite.

use crate::BoundaryType;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Missing/extra GEOIDs relative to the canonical reference list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct CompletenessReport {
    /// Count the canonical list expects.
    pub expected: usize,
    /// Count actually present.
    pub actual: usize,
    /// Canonical GEOIDs with no matching record.
    pub missing: Vec<String>,
    /// Present GEOIDs the canonical list does not know (placeholders land here).
    pub extra: Vec<String>,
}

impl CompletenessReport {
    /// `true` iff nothing is missing and nothing is extra.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty() && self.extra.is_empty()
    }

    /// Sub-score: fraction of expected GEOIDs present, penalized for extras.
    #[must_use]
    pub fn score(&self) -> f64 {
        if self.expected == 0 {
            return if self.extra.is_empty() { 100.0 } else { 50.0 };
        }
        let present = self.expected.saturating_sub(self.missing.len()) as f64;
        let base = present / self.expected as f64 * 100.0;
        let penalty = (self.extra.len() as f64 * 2.0).min(20.0);
        (base - penalty).max(0.0)
    }
}

/// Geometry defects found in a layer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct TopologyReport {
    /// Records whose rings self-intersect.
    pub self_intersections: usize,
    /// Pairs of records whose interiors overlap beyond tolerance.
    pub overlaps: usize,
    /// Gaps between records that should tessellate.
    pub gaps: usize,
    /// Records rejected as OGC-invalid.
    pub invalid_geometries: usize,
    /// Records inspected.
    pub checked: usize,
}

impl TopologyReport {
    /// Sub-score: fraction of inspected records free of defects.
    #[must_use]
    pub fn score(&self) -> f64 {
        if self.checked == 0 {
            return 100.0;
        }
        let defects =
            self.self_intersections + self.overlaps + self.gaps + self.invalid_geometries;
        let clean = self.checked.saturating_sub(defects) as f64;
        (clean / self.checked as f64 * 100.0).max(0.0)
    }
}

/// Coordinate sanity findings for a layer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct CoordinateReport {
    /// Vertices outside the WGS84 domain.
    pub out_of_range: usize,
    /// Records whose centroid falls far outside the claimed jurisdiction.
    pub suspicious_centroids: usize,
    /// Records inspected.
    pub checked: usize,
}

impl CoordinateReport {
    /// Sub-score: fraction of inspected records with sane coordinates.
    #[must_use]
    pub fn score(&self) -> f64 {
        if self.checked == 0 {
            return 100.0;
        }
        let defects = self.out_of_range + self.suspicious_centroids;
        let clean = self.checked.saturating_sub(defects) as f64;
        (clean / self.checked as f64 * 100.0).max(0.0)
    }
}

/// Outcome of the four-axiom tessellation proof for one jurisdiction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct TessellationReport {
    /// Jurisdiction FIPS the proof ran against.
    pub jurisdiction: String,
    /// Districts expected vs found.
    pub cardinality_ok: bool,
    /// Largest pairwise overlap observed, m².
    pub max_overlap_m2: f64,
    /// Axiom 2: no pairwise overlap above tolerance.
    pub exclusivity_ok: bool,
    /// Union coverage of the jurisdiction, as a ratio of its land area.
    pub coverage_ratio: f64,
    /// Axiom 3: coverage within the (possibly overridden) band.
    pub exhaustivity_ok: bool,
    /// Share of the union lying outside the jurisdiction.
    pub outside_ratio: f64,
    /// Axiom 4: outside share within tolerance.
    pub containment_ok: bool,
    /// Placeholder GEOIDs removed before the proof ran.
    pub placeholders_excluded: Vec<String>,
}

impl TessellationReport {
    /// `true` iff all four axioms hold.
    #[must_use]
    pub fn all_axioms_hold(&self) -> bool {
        self.cardinality_ok && self.exclusivity_ok && self.exhaustivity_ok && self.containment_ok
    }

    /// Sub-score: 25 points per axiom.
    #[must_use]
    pub fn score(&self) -> f64 {
        [
            self.cardinality_ok,
            self.exclusivity_ok,
            self.exhaustivity_ok,
            self.containment_ok,
        ]
        .iter()
        .filter(|ok| **ok)
        .count() as f64
            * 25.0
    }
}

/// Advisory attached when a state's new maps are final but TIGER has not
/// yet published them. Never downgrades validity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct GapWarning {
    /// Always `"post-finalization-pre-tiger"`.
    pub gap_type: String,
    /// When the new maps took legal effect.
    pub finalization_date: NaiveDate,
    /// When the covering TIGER vintage lands.
    pub tiger_publication_date: NaiveDate,
    /// Whether the maps are under active court challenge.
    pub court_challenges: bool,
    /// Always `"use-primary"`.
    pub recommendation: String,
    /// Human-readable explanation naming both dates.
    pub reasoning: String,
}

/// The per-(layer, state) validation verdict.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct ValidationResult {
    /// Layer validated.
    pub layer: BoundaryType,
    /// State FIPS, or `None` for a nationwide run.
    pub state: Option<String>,
    /// Weighted composite in [0, 100].
    pub quality_score: f64,
    /// GEOID completeness against the canonical reference.
    pub completeness: CompletenessReport,
    /// Geometry defects.
    pub topology: TopologyReport,
    /// Coordinate sanity.
    pub coordinates: CoordinateReport,
    /// Tessellation proof, when a ground-truth jurisdiction was available.
    pub tessellation: Option<TessellationReport>,
    /// Redistricting gap advisory, when the state is in-gap for this layer.
    pub redistricting_gap_warning: Option<GapWarning>,
    /// Free-form warnings (placeholders, partial coverage, overrides applied).
    pub warnings: Vec<String>,
    /// `true` when completeness holds and no axiom failed.
    pub valid: bool,
}

impl ValidationResult {
    /// Composite weights: completeness 0.40, topology 0.30, coordinates
    /// 0.20, tessellation 0.10. When tessellation is not applicable its
    /// weight is redistributed pro-rata across the other three.
    #[must_use]
    pub fn composite_score(
        completeness: &CompletenessReport,
        topology: &TopologyReport,
        coordinates: &CoordinateReport,
        tessellation: Option<&TessellationReport>,
    ) -> f64 {
        match tessellation {
            Some(t) => {
                0.40 * completeness.score()
                    + 0.30 * topology.score()
                    + 0.20 * coordinates.score()
                    + 0.10 * t.score()
            }
            None => {
                let scale = 1.0 / 0.90;
                (0.40 * completeness.score()
                    + 0.30 * topology.score()
                    + 0.20 * coordinates.score())
                    * scale
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completeness_score_full_marks_when_complete() {
        let report = CompletenessReport {
            expected: 8,
            actual: 8,
            missing: vec![],
            extra: vec![],
        };
        assert!(report.is_complete());
        assert_eq!(report.score(), 100.0);
    }

    #[test]
    fn completeness_score_penalizes_missing_and_extra() {
        let report = CompletenessReport {
            expected: 10,
            actual: 10,
            missing: vec!["0107".into()],
            extra: vec!["01ZZ".into()],
        };
        assert!(!report.is_complete());
        assert!(report.score() < 90.0);
        assert!(report.score() > 0.0);
    }

    #[test]
    fn topology_score_empty_layer_is_clean() {
        assert_eq!(TopologyReport::default().score(), 100.0);
    }

    #[test]
    fn composite_redistributes_without_tessellation() {
        let completeness = CompletenessReport {
            expected: 8,
            actual: 8,
            missing: vec![],
            extra: vec![],
        };
        let topology = TopologyReport { checked: 8, ..Default::default() };
        let coordinates = CoordinateReport { checked: 8, ..Default::default() };
        let score =
            ValidationResult::composite_score(&completeness, &topology, &coordinates, None);
        assert!((score - 100.0).abs() < 1e-9);
    }

    #[test]
    fn tessellation_score_counts_axioms() {
        let report = TessellationReport {
            jurisdiction: "1150000".into(),
            cardinality_ok: true,
            max_overlap_m2: 0.0,
            exclusivity_ok: true,
            coverage_ratio: 0.98,
            exhaustivity_ok: true,
            outside_ratio: 0.01,
            containment_ok: false,
            placeholders_excluded: vec![],
        };
        assert_eq!(report.score(), 75.0);
        assert!(!report.all_axioms_hold());
    }
}
