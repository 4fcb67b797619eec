// SPDX-License-Identifier: MIT OR Apache-2.0

//! Leaf hashing.
//!
//! A leaf commits four domains:
//!
//! ```text
//! leaf = H( H(type_tag, id_bytes),
//!           geometry_hash,
//!           authority_enum,
//!           provenance_hash )
//! ```
//!
//! The `provenance_hash = 0` branch is load-bearing: leaves computed
//! before provenance tracking existed must hash identically afterwards,
//! provided `source` is absent or its checksum is empty. `retrieved_at`
//! enters the hash only through the provenance triple; no other hashed
//! field sees a timestamp.

use crate::field::pack_bytes;
use crate::poseidon::hasher;
use crate::F;
use ark_ff::Zero;
use atlas_core::{Boundary, BoundaryType, Provenance};
use atlas_geometry::canonical_wkb;
use chrono::SecondsFormat;
use rayon::prelude::*;

/// A committed leaf: the hash plus the lookup keys retained for proofs.
#[derive(Debug, Clone, PartialEq)]
pub struct MerkleLeaf {
    /// The leaf hash, a BN254 field element.
    pub leaf_hash: F,
    /// Boundary GEOID, retained for proof lookup.
    pub boundary_id: String,
    /// Layer, retained for proof lookup.
    pub boundary_type: BoundaryType,
    /// Geometry commitment, also published in the artifact.
    pub geometry_hash: F,
}

/// Hash the identity domain: `H(type_tag, id_bytes)`.
#[must_use]
pub fn identity_hash(boundary_type: BoundaryType, id: &str) -> F {
    let mut inputs = vec![F::from(boundary_type.type_tag())];
    inputs.extend(pack_bytes(id.as_bytes()));
    hasher().hash_fields(&inputs)
}

/// Hash the geometry domain: Poseidon2 over the canonical WKB bytes.
#[must_use]
pub fn geometry_hash(geometry: &geo_types::MultiPolygon<f64>) -> F {
    let wkb = canonical_wkb(geometry);
    hasher().hash_fields(&pack_bytes(&wkb))
}

/// Hash the provenance triple, or `0` when there is none.
///
/// The triple serializes as `url|checksum|timestamp` with the timestamp in
/// RFC 3339 UTC at second precision, matching what the normalizer stamps.
#[must_use]
pub fn provenance_hash(source: Option<&Provenance>) -> F {
    match source {
        Some(p) if p.has_checksum() => {
            let timestamp = p.retrieved_at.to_rfc3339_opts(SecondsFormat::Secs, true);
            let triple = format!("{}|{}|{}", p.url, p.checksum, timestamp);
            hasher().hash_fields(&pack_bytes(triple.as_bytes()))
        }
        _ => F::zero(),
    }
}

/// Compute the full leaf for a boundary.
#[must_use]
pub fn compute_leaf_hash(boundary: &Boundary) -> MerkleLeaf {
    let geometry = geometry_hash(&boundary.geometry);
    let identity = identity_hash(boundary.boundary_type, &boundary.id);
    let provenance = provenance_hash(boundary.source.as_ref());
    let leaf_hash = hasher().hash_fields(&[
        identity,
        geometry,
        F::from(boundary.authority.encoding()),
        provenance,
    ]);
    MerkleLeaf {
        leaf_hash,
        boundary_id: boundary.id.clone(),
        boundary_type: boundary.boundary_type,
        geometry_hash: geometry,
    }
}

/// Parallel form of [`compute_leaf_hash`].
///
/// Returns hashes in input order, element-wise identical to the sequential
/// map: the fan-out only parallelizes independent leaf computations.
#[must_use]
pub fn compute_leaf_hashes_batch(boundaries: &[Boundary]) -> Vec<MerkleLeaf> {
    // Force singleton init on this thread before fanning out.
    let _ = hasher();
    boundaries.par_iter().map(compute_leaf_hash).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use atlas_core::{AdministrativeLevel, Authority, LegalStatus};
    use chrono::{TimeZone, Utc};
    use geo_types::{MultiPolygon, polygon};

    fn test_geometry() -> MultiPolygon<f64> {
        MultiPolygon(vec![polygon![
            (x: -87.6, y: 41.8),
            (x: -87.5, y: 41.8),
            (x: -87.5, y: 41.9),
            (x: -87.6, y: 41.9),
            (x: -87.6, y: 41.8),
        ]])
    }

    fn provenance(checksum: &str) -> Provenance {
        Provenance {
            provider_name: "tiger".into(),
            url: "https://www2.census.gov/geo/tiger/a.zip".into(),
            version: "2024".into(),
            license: "public-domain".into(),
            retrieved_at: Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap(),
            checksum: checksum.into(),
            authority_level: AdministrativeLevel::Federal,
            legal_status: LegalStatus::Official,
            coordinate_system: "EPSG:4326".into(),
            geometry_repaired: false,
        }
    }

    fn boundary(id: &str, boundary_type: BoundaryType, source: Option<Provenance>) -> Boundary {
        Boundary {
            id: id.into(),
            boundary_type,
            level: AdministrativeLevel::Federal,
            geometry: test_geometry(),
            authority: Authority::FederalMandate,
            source,
        }
    }

    #[test]
    fn leaf_hash_is_deterministic() {
        let b = boundary("0612", BoundaryType::CongressionalDistrict, None);
        assert_eq!(compute_leaf_hash(&b), compute_leaf_hash(&b));
    }

    #[test]
    fn type_separation() {
        // Same id, same geometry, same authority: different layer, different leaf.
        let a = boundary("0101", BoundaryType::CongressionalDistrict, None);
        let b = boundary("0101", BoundaryType::Ward, None);
        assert_eq!(
            compute_leaf_hash(&a).geometry_hash,
            compute_leaf_hash(&b).geometry_hash
        );
        assert_ne!(compute_leaf_hash(&a).leaf_hash, compute_leaf_hash(&b).leaf_hash);
    }

    #[test]
    fn empty_checksum_selects_backward_compat_branch() {
        let without_source = boundary("0612", BoundaryType::CongressionalDistrict, None);
        let empty_checksum =
            boundary("0612", BoundaryType::CongressionalDistrict, Some(provenance("")));
        assert_eq!(
            compute_leaf_hash(&without_source).leaf_hash,
            compute_leaf_hash(&empty_checksum).leaf_hash
        );
    }

    #[test]
    fn provenance_changes_leaf() {
        let bare = boundary("0612", BoundaryType::CongressionalDistrict, None);
        let with_provenance =
            boundary("0612", BoundaryType::CongressionalDistrict, Some(provenance("abc123")));
        assert_ne!(
            compute_leaf_hash(&bare).leaf_hash,
            compute_leaf_hash(&with_provenance).leaf_hash
        );
    }

    #[test]
    fn each_triple_component_is_committed() {
        let base = provenance("abc123");

        let mut url_changed = base.clone();
        url_changed.url = "https://example.gov/other.zip".into();

        let mut checksum_changed = base.clone();
        checksum_changed.checksum = "def456".into();

        let mut time_changed = base.clone();
        time_changed.retrieved_at = Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 1).unwrap();

        let reference = provenance_hash(Some(&base));
        assert_ne!(reference, provenance_hash(Some(&url_changed)));
        assert_ne!(reference, provenance_hash(Some(&checksum_changed)));
        assert_ne!(reference, provenance_hash(Some(&time_changed)));
    }

    #[test]
    fn non_hashed_provenance_fields_do_not_move_the_leaf() {
        let mut other = provenance("abc123");
        other.provider_name = "mirror".into();
        other.license = "CC0".into();
        other.version = "2023".into();
        assert_eq!(
            provenance_hash(Some(&provenance("abc123"))),
            provenance_hash(Some(&other))
        );
    }

    #[test]
    fn batch_matches_sequential() {
        let boundaries: Vec<Boundary> = (1..=7)
            .map(|d| {
                boundary(
                    &format!("01{d:02}"),
                    BoundaryType::CongressionalDistrict,
                    Some(provenance("abc123")),
                )
            })
            .collect();
        let sequential: Vec<MerkleLeaf> =
            boundaries.iter().map(compute_leaf_hash).collect();
        let batch = compute_leaf_hashes_batch(&boundaries);
        assert_eq!(sequential, batch);
    }

    #[test]
    fn geometry_noise_does_not_move_the_leaf() {
        let mut noisy = boundary("0612", BoundaryType::CongressionalDistrict, None);
        noisy.geometry = MultiPolygon(vec![polygon![
            (x: -87.60000000400, y: 41.8),
            (x: -87.5, y: 41.79999999997),
            (x: -87.5, y: 41.9),
            (x: -87.6, y: 41.90000000002),
            (x: -87.6, y: 41.8),
        ]]);
        let clean = boundary("0612", BoundaryType::CongressionalDistrict, None);
        assert_eq!(
            compute_leaf_hash(&noisy).leaf_hash,
            compute_leaf_hash(&clean).leaf_hash
        );
    }
}
