// SPDX-License-Identifier: MIT OR Apache-2.0

//! GEOID completeness against the canonical reference.
//!
//! `missing` is canonical minus actual, `extra` is actual minus canonical.
//! Upstream placeholder GEOIDs (`01ZZ`, water-only `..99` codes) always
//! land in `extra` even if a canonical list is absent, so they surface as
//! warnings and are excluded from the tessellation proof.

use crate::reference::CanonicalReference;
use atlas_core::geoid::is_placeholder;
use atlas_core::report::CompletenessReport;
use atlas_core::BoundaryType;
use std::collections::BTreeSet;

/// Compare the present GEOIDs for `(layer, state)` against the canonical
/// list.
///
/// When the reference has no list for the combination, `expected` mirrors
/// the non-placeholder actual count and only placeholders are flagged.
#[must_use]
pub fn check_completeness(
    layer: BoundaryType,
    state_fips: &str,
    actual: &BTreeSet<String>,
) -> CompletenessReport {
    let placeholders: BTreeSet<&String> = actual
        .iter()
        .filter(|id| is_placeholder(layer, id))
        .collect();

    match CanonicalReference::geoids(layer, state_fips) {
        Some(canonical) => {
            let canonical: BTreeSet<String> = canonical.into_iter().collect();
            let missing: Vec<String> = canonical
                .iter()
                .filter(|id| !actual.contains(*id))
                .cloned()
                .collect();
            let extra: Vec<String> = actual
                .iter()
                .filter(|id| !canonical.contains(*id))
                .cloned()
                .collect();
            CompletenessReport {
                expected: canonical.len(),
                actual: actual.len(),
                missing,
                extra,
            }
        }
        None => CompletenessReport {
            expected: actual.len() - placeholders.len(),
            actual: actual.len(),
            missing: Vec::new(),
            extra: placeholders.into_iter().cloned().collect(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(ids: &[&str]) -> BTreeSet<String> {
        ids.iter().map(|s| (*s).to_owned()).collect()
    }

    #[test]
    fn complete_alabama_cds_are_valid() {
        let actual = set(&["0101", "0102", "0103", "0104", "0105", "0106", "0107"]);
        let report =
            check_completeness(BoundaryType::CongressionalDistrict, "01", &actual);
        assert!(report.is_complete());
        assert_eq!(report.expected, 7);
    }

    #[test]
    fn missing_district_reported() {
        // Alabama with 0107 absent.
        let actual = set(&["0101", "0102", "0103", "0104", "0105", "0106"]);
        let report =
            check_completeness(BoundaryType::CongressionalDistrict, "01", &actual);
        assert_eq!(report.missing, vec!["0107".to_owned()]);
        assert!(report.extra.is_empty());
        assert!(!report.is_complete());
    }

    #[test]
    fn placeholder_is_extra() {
        let actual = set(&[
            "0101", "0102", "0103", "0104", "0105", "0106", "0107", "01ZZ",
        ]);
        let report =
            check_completeness(BoundaryType::CongressionalDistrict, "01", &actual);
        assert!(report.missing.is_empty());
        assert_eq!(report.extra, vec!["01ZZ".to_owned()]);
        assert!(!report.is_complete());
    }

    #[test]
    fn foreign_district_is_extra() {
        let actual = set(&["0101", "0102", "0103", "0104", "0105", "0106", "0107", "1305"]);
        let report =
            check_completeness(BoundaryType::CongressionalDistrict, "01", &actual);
        assert_eq!(report.extra, vec!["1305".to_owned()]);
    }

    #[test]
    fn unlisted_layer_flags_only_placeholders() {
        let actual = set(&["0655000", "0653000"]);
        let report = check_completeness(BoundaryType::Place, "06", &actual);
        assert!(report.is_complete());
        assert_eq!(report.expected, 2);

        let with_placeholder = set(&["0655000", "06555ZZ"]);
        let report = check_completeness(BoundaryType::Place, "06", &with_placeholder);
        assert_eq!(report.extra, vec!["06555ZZ".to_owned()]);
        assert_eq!(report.expected, 1);
    }
}
