// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-layer validation assembly and quality scoring.
//!
//! [`LayerValidator::validate`] runs every applicable check for one
//! `(layer, state)` pair and folds the sub-reports into a single
//! [`ValidationResult`] with the weighted composite score. Check failures
//! mark the result invalid; advisory findings (redistricting gaps,
//! placeholders, override substitutions) only attach warnings.

use crate::calendar::RedistrictingCalendar;
use crate::completeness::check_completeness;
use crate::resolver::{MunicipalBoundaryResolver, authoritative_override, tolerances_for};
use crate::tessellation::{TessellationInput, prove_tessellation};
use atlas_core::geoid::is_placeholder;
use atlas_core::report::{
    CompletenessReport, CoordinateReport, TopologyReport, ValidationResult,
};
use atlas_core::{Boundary, BoundaryType};
use atlas_geometry::check_validity;
use chrono::NaiveDate;
use geo::{BoundingRect, Centroid};
use std::collections::BTreeSet;
use tracing::info;

/// Pairwise overlap scans are quadratic in boolean ops; beyond this many
/// records the scan is skipped and a warning attached instead.
const OVERLAP_SCAN_LIMIT: usize = 128;

/// Overlap between siblings that counts as a topology defect, m².
const SIBLING_OVERLAP_M2: f64 = 150_000.0;

/// Tessellation scope for a validation run: which jurisdiction to prove
/// against and how many districts it should contain.
#[derive(Debug, Clone)]
pub struct TessellationScope {
    /// Jurisdiction FIPS (place or county).
    pub jurisdiction_fips: String,
    /// Expected district count.
    pub expected_count: usize,
}

/// Everything a validation run needs besides the records themselves.
pub struct ValidationContext<'a> {
    /// "Today" for gap detection; injected so runs are reproducible.
    pub today: NaiveDate,
    /// Ground-truth resolver, when cross-validation is on.
    pub resolver: Option<&'a MunicipalBoundaryResolver>,
    /// Tessellation scope, when the layer tessellates a jurisdiction.
    pub tessellation: Option<TessellationScope>,
}

/// The per-layer validator.
#[derive(Debug, Clone, Copy, Default)]
pub struct LayerValidator;

impl LayerValidator {
    /// Validate one `(layer, state)` slice of a build.
    #[must_use]
    pub fn validate(
        layer: BoundaryType,
        state: Option<&str>,
        boundaries: &[Boundary],
        ctx: &ValidationContext<'_>,
    ) -> ValidationResult {
        let mut warnings = Vec::new();

        let actual: BTreeSet<String> =
            boundaries.iter().map(|b| b.id.clone()).collect();
        let completeness = match state {
            Some(state) => check_completeness(layer, state, &actual),
            None => nationwide_completeness(layer, &actual),
        };

        let placeholders: Vec<&String> = actual
            .iter()
            .filter(|id| is_placeholder(layer, id))
            .collect();
        if !placeholders.is_empty() {
            warnings.push(format!(
                "{} placeholder GEOID(s) present: {}",
                placeholders.len(),
                placeholders
                    .iter()
                    .map(|id| id.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            ));
        }

        let topology = check_topology(boundaries, &mut warnings);
        let coordinates = check_coordinates(boundaries);

        let tessellation = ctx.tessellation.as_ref().and_then(|scope| {
            let resolver = ctx.resolver?;
            let resolved = resolver.resolve(&scope.jurisdiction_fips)?;
            if let Some(entry) = authoritative_override(&scope.jurisdiction_fips) {
                if resolved.from_override {
                    warnings.push(format!(
                        "authoritative boundary substituted for {} ({}): {}",
                        entry.name, entry.place_fips, entry.reason
                    ));
                }
            }
            let tolerances = tolerances_for(&scope.jurisdiction_fips);
            if tolerances.coverage_min < 0.85 {
                warnings.push(format!(
                    "exhaustivity floor lowered to {:.2} for jurisdiction {}",
                    tolerances.coverage_min, scope.jurisdiction_fips
                ));
            }
            let districts: Vec<(String, geo_types::MultiPolygon<f64>)> = boundaries
                .iter()
                .map(|b| (b.id.clone(), b.geometry.clone()))
                .collect();
            let report = prove_tessellation(
                &TessellationInput {
                    jurisdiction: &scope.jurisdiction_fips,
                    boundary: &resolved.geometry,
                    districts: &districts,
                    layer,
                    expected_count: scope.expected_count,
                    land_area_m2: resolved.land_area_m2,
                },
                &tolerances,
            );
            Some(report)
        });

        let redistricting_gap_warning = state
            .and_then(|state| RedistrictingCalendar::gap_warning(layer, state, ctx.today));

        let quality_score = ValidationResult::composite_score(
            &completeness,
            &topology,
            &coordinates,
            tessellation.as_ref(),
        );

        let valid = completeness.is_complete()
            && topology.invalid_geometries == 0
            && tessellation
                .as_ref()
                .is_none_or(|t| t.all_axioms_hold());

        info!(
            target: "atlas.validate",
            layer = %layer,
            state = state.unwrap_or("*"),
            quality = quality_score,
            valid,
            "layer validated"
        );

        ValidationResult {
            layer,
            state: state.map(str::to_owned),
            quality_score,
            completeness,
            topology,
            coordinates,
            tessellation,
            redistricting_gap_warning,
            warnings,
            valid,
        }
    }
}

fn nationwide_completeness(
    layer: BoundaryType,
    actual: &BTreeSet<String>,
) -> CompletenessReport {
    let canonical = crate::reference::CanonicalReference::nationwide(layer);
    if canonical.is_empty() {
        return CompletenessReport {
            expected: actual.len(),
            actual: actual.len(),
            missing: Vec::new(),
            extra: Vec::new(),
        };
    }
    let canonical: BTreeSet<String> = canonical.into_iter().collect();
    CompletenessReport {
        expected: canonical.len(),
        actual: actual.len(),
        missing: canonical.difference(actual).cloned().collect(),
        extra: actual.difference(&canonical).cloned().collect(),
    }
}

fn check_topology(boundaries: &[Boundary], warnings: &mut Vec<String>) -> TopologyReport {
    let mut report = TopologyReport {
        checked: boundaries.len(),
        ..Default::default()
    };
    for boundary in boundaries {
        let validity = check_validity(&boundary.geometry);
        if validity.self_intersection {
            report.self_intersections += 1;
        }
        if !validity.is_valid() {
            let repaired = boundary
                .source
                .as_ref()
                .is_some_and(|s| s.geometry_repaired);
            if !repaired {
                report.invalid_geometries += 1;
            }
        }
    }

    if boundaries.len() <= OVERLAP_SCAN_LIMIT {
        for (index, a) in boundaries.iter().enumerate() {
            for b in boundaries.iter().skip(index + 1) {
                if atlas_geometry::intersection_area_m2(&a.geometry, &b.geometry)
                    > SIBLING_OVERLAP_M2
                {
                    report.overlaps += 1;
                }
            }
        }
    } else {
        warnings.push(format!(
            "pairwise overlap scan skipped for {} records (limit {OVERLAP_SCAN_LIMIT})",
            boundaries.len()
        ));
    }
    report
}

fn check_coordinates(boundaries: &[Boundary]) -> CoordinateReport {
    let mut report = CoordinateReport {
        checked: boundaries.len(),
        ..Default::default()
    };
    for boundary in boundaries {
        let validity = check_validity(&boundary.geometry);
        if validity.out_of_range {
            report.out_of_range += 1;
            continue;
        }
        // A centroid far outside the geometry's own bounding box signals
        // broken ring arithmetic upstream.
        let suspicious = match (boundary.geometry.centroid(), boundary.geometry.bounding_rect()) {
            (Some(centroid), Some(rect)) => {
                centroid.x() < rect.min().x
                    || centroid.x() > rect.max().x
                    || centroid.y() < rect.min().y
                    || centroid.y() > rect.max().y
            }
            _ => true,
        };
        if suspicious {
            report.suspicious_centroids += 1;
        }
    }
    report
}
