// SPDX-License-Identifier: MIT OR Apache-2.0
//! Record normalization and precedence merging.
//!
//! Every boundary a provider emits passes through [`normalize`] before it
//! can reach a validator or the tree builder: the GEOID must match its
//! layer's layout, the geometry must be non-empty and OGC-valid (unless
//! `geometry_repaired` is stamped), and the coordinate system must already
//! be WGS84 — providers reproject before emitting, the normalizer never
//! does.
//!
//! When several providers emit the same `(boundary_type, id)`,
//! [`merge_by_precedence`] keeps exactly one record per key: highest
//! authority wins, ties go to the newer `retrieved_at`, and remaining ties
//! to the lexicographically first provider name.

use atlas_core::{AtlasError, AtlasResult, Boundary, geoid};
use atlas_geometry::check_validity;
use std::collections::BTreeMap;
use tracing::debug;

/// WGS84 spelling the pipeline accepts.
const WGS84: &str = "EPSG:4326";

/// Gate one boundary record.
///
/// # Errors
///
/// - [`AtlasError::Schema`] for a GEOID/layout mismatch or a non-WGS84
///   coordinate system;
/// - [`AtlasError::Schema`] for an empty or OGC-invalid geometry that has
///   not been stamped `geometry_repaired`.
pub fn normalize(boundary: &Boundary) -> AtlasResult<()> {
    let provider = boundary
        .source
        .as_ref()
        .map(|s| s.provider_name.clone())
        .unwrap_or_default();

    geoid::validate_geoid(boundary.boundary_type, &boundary.id).map_err(|_| {
        AtlasError::Schema {
            provider: provider.clone(),
            reason: format!(
                "GEOID `{}` does not match the {} layout",
                boundary.id, boundary.boundary_type
            ),
        }
    })?;

    if let Some(source) = &boundary.source {
        if source.coordinate_system != WGS84 {
            return Err(AtlasError::Schema {
                provider: provider.clone(),
                reason: format!(
                    "coordinate system `{}` is not {WGS84}; providers must reproject before emitting",
                    source.coordinate_system
                ),
            });
        }
    }

    if boundary.geometry.0.is_empty() {
        return Err(AtlasError::Schema {
            provider: provider.clone(),
            reason: format!("boundary `{}` has an empty geometry", boundary.id),
        });
    }

    let validity = check_validity(&boundary.geometry);
    let repaired = boundary
        .source
        .as_ref()
        .is_some_and(|s| s.geometry_repaired);
    if !validity.is_valid() && !repaired {
        return Err(AtlasError::Schema {
            provider,
            reason: format!(
                "boundary `{}` geometry is not OGC-valid ({validity:?}) and was not stamped repaired",
                boundary.id
            ),
        });
    }

    Ok(())
}

/// Gate a batch, partitioning into accepted records and rejections.
#[must_use]
pub fn normalize_batch(boundaries: Vec<Boundary>) -> (Vec<Boundary>, Vec<AtlasError>) {
    let mut accepted = Vec::with_capacity(boundaries.len());
    let mut rejected = Vec::new();
    for boundary in boundaries {
        match normalize(&boundary) {
            Ok(()) => accepted.push(boundary),
            Err(err) => rejected.push(err),
        }
    }
    (accepted, rejected)
}

/// Collapse duplicate `(boundary_type, id)` records to one winner each.
///
/// Output is sorted by `(boundary_type, id)`; the merge is deterministic
/// regardless of input order.
#[must_use]
pub fn merge_by_precedence(boundaries: Vec<Boundary>) -> Vec<Boundary> {
    let mut winners: BTreeMap<(atlas_core::BoundaryType, String), Boundary> = BTreeMap::new();
    for candidate in boundaries {
        let key = (candidate.boundary_type, candidate.id.clone());
        match winners.get(&key) {
            None => {
                winners.insert(key, candidate);
            }
            Some(current) => {
                if supersedes(&candidate, current) {
                    debug!(
                        target: "atlas.provider",
                        id = %key.1,
                        layer = %key.0,
                        "precedence override"
                    );
                    winners.insert(key, candidate);
                }
            }
        }
    }
    winners.into_values().collect()
}

/// Precedence order: authority desc, `retrieved_at` desc, provider name asc.
fn supersedes(candidate: &Boundary, current: &Boundary) -> bool {
    if candidate.authority != current.authority {
        return candidate.authority > current.authority;
    }
    let candidate_time = candidate.source.as_ref().map(|s| s.retrieved_at);
    let current_time = current.source.as_ref().map(|s| s.retrieved_at);
    if candidate_time != current_time {
        return candidate_time > current_time;
    }
    let candidate_name = candidate.source.as_ref().map(|s| s.provider_name.as_str());
    let current_name = current.source.as_ref().map(|s| s.provider_name.as_str());
    candidate_name < current_name
}

#[cfg(test)]
mod tests {
    use super::*;
    use atlas_core::{
        AdministrativeLevel, Authority, BoundaryType, LegalStatus, Provenance,
    };
    use chrono::{TimeZone, Utc};
    use geo_types::{MultiPolygon, polygon};

    fn geometry() -> MultiPolygon<f64> {
        MultiPolygon(vec![polygon![
            (x: -77.1, y: 38.8),
            (x: -77.0, y: 38.8),
            (x: -77.0, y: 38.9),
            (x: -77.1, y: 38.9),
            (x: -77.1, y: 38.8),
        ]])
    }

    fn provenance(provider: &str, crs: &str, hour: u32) -> Provenance {
        Provenance {
            provider_name: provider.into(),
            url: format!("https://{provider}.example.gov/data"),
            version: "2024".into(),
            license: "public-domain".into(),
            retrieved_at: Utc.with_ymd_and_hms(2024, 6, 15, hour, 0, 0).unwrap(),
            checksum: "abc".into(),
            authority_level: AdministrativeLevel::State,
            legal_status: LegalStatus::Official,
            coordinate_system: crs.into(),
            geometry_repaired: false,
        }
    }

    fn boundary(id: &str, authority: Authority, source: Option<Provenance>) -> Boundary {
        Boundary {
            id: id.into(),
            boundary_type: BoundaryType::CongressionalDistrict,
            level: AdministrativeLevel::Federal,
            geometry: geometry(),
            authority,
            source,
        }
    }

    #[test]
    fn valid_record_passes() {
        let b = boundary(
            "1101",
            Authority::FederalMandate,
            Some(provenance("tiger", "EPSG:4326", 12)),
        );
        assert!(normalize(&b).is_ok());
    }

    #[test]
    fn bad_geoid_layout_rejected() {
        let b = boundary("110", Authority::FederalMandate, None);
        let err = normalize(&b).unwrap_err();
        assert_eq!(err.class(), atlas_core::ErrorClass::SchemaError);
    }

    #[test]
    fn non_wgs84_rejected() {
        let b = boundary(
            "1101",
            Authority::FederalMandate,
            Some(provenance("state-gis", "EPSG:3857", 12)),
        );
        let err = normalize(&b).unwrap_err();
        assert_eq!(err.class(), atlas_core::ErrorClass::SchemaError);
    }

    #[test]
    fn empty_geometry_rejected() {
        let mut b = boundary("1101", Authority::FederalMandate, None);
        b.geometry = MultiPolygon(vec![]);
        assert!(normalize(&b).is_err());
    }

    #[test]
    fn invalid_geometry_rejected_unless_stamped_repaired() {
        let bowtie = MultiPolygon(vec![polygon![
            (x: 0.0, y: 0.0),
            (x: 1.0, y: 1.0),
            (x: 1.0, y: 0.0),
            (x: 0.0, y: 1.0),
            (x: 0.0, y: 0.0),
        ]]);

        let mut rejected = boundary(
            "1101",
            Authority::FederalMandate,
            Some(provenance("tiger", "EPSG:4326", 12)),
        );
        rejected.geometry = bowtie.clone();
        assert!(normalize(&rejected).is_err());

        let mut stamped = rejected.clone();
        stamped.source.as_mut().unwrap().geometry_repaired = true;
        stamped.geometry = bowtie;
        assert!(normalize(&stamped).is_ok());
    }

    #[test]
    fn batch_partitions() {
        let good = boundary("1101", Authority::FederalMandate, None);
        let bad = boundary("bad!", Authority::FederalMandate, None);
        let (accepted, rejected) = normalize_batch(vec![good, bad]);
        assert_eq!(accepted.len(), 1);
        assert_eq!(rejected.len(), 1);
    }

    #[test]
    fn higher_authority_wins() {
        let state = boundary(
            "1101",
            Authority::StateOfficial,
            Some(provenance("state-gis", "EPSG:4326", 18)),
        );
        let federal = boundary(
            "1101",
            Authority::FederalMandate,
            Some(provenance("tiger", "EPSG:4326", 6)),
        );
        let merged = merge_by_precedence(vec![state, federal]);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].authority, Authority::FederalMandate);
    }

    #[test]
    fn newer_retrieval_breaks_authority_tie() {
        let older = boundary(
            "1101",
            Authority::StateOfficial,
            Some(provenance("a-portal", "EPSG:4326", 6)),
        );
        let newer = boundary(
            "1101",
            Authority::StateOfficial,
            Some(provenance("z-portal", "EPSG:4326", 18)),
        );
        let merged = merge_by_precedence(vec![older, newer]);
        assert_eq!(merged[0].source.as_ref().unwrap().provider_name, "z-portal");
    }

    #[test]
    fn provider_name_breaks_final_tie() {
        let zeta = boundary(
            "1101",
            Authority::StateOfficial,
            Some(provenance("zeta", "EPSG:4326", 12)),
        );
        let alpha = boundary(
            "1101",
            Authority::StateOfficial,
            Some(provenance("alpha", "EPSG:4326", 12)),
        );
        let merged = merge_by_precedence(vec![zeta, alpha]);
        assert_eq!(merged[0].source.as_ref().unwrap().provider_name, "alpha");
    }

    #[test]
    fn merge_is_input_order_invariant() {
        let a = boundary(
            "1101",
            Authority::StateOfficial,
            Some(provenance("alpha", "EPSG:4326", 12)),
        );
        let b = boundary(
            "1101",
            Authority::FederalMandate,
            Some(provenance("tiger", "EPSG:4326", 12)),
        );
        let ab = merge_by_precedence(vec![a.clone(), b.clone()]);
        let ba = merge_by_precedence(vec![b, a]);
        assert_eq!(ab, ba);
    }

    #[test]
    fn distinct_ids_all_survive() {
        let one = boundary("1101", Authority::FederalMandate, None);
        let two = boundary("1102", Authority::FederalMandate, None);
        assert_eq!(merge_by_precedence(vec![one, two]).len(), 2);
    }
}
