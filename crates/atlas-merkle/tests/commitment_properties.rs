// SPDX-License-Identifier: MIT OR Apache-2.0
//! Property tests over the commitment layer: determinism, provenance
//! sensitivity, backward compatibility, proof soundness, and field
//! bounds.

use atlas_core::{
    AdministrativeLevel, Authority, Boundary, BoundaryType, LegalStatus, Provenance,
};
use atlas_merkle::{
    MerkleTree, compute_leaf_hash, compute_leaf_hashes_batch, field_from_hex, field_to_hex,
    generate_proof, verify_proof,
};
use chrono::{TimeZone, Utc};
use geo_types::{MultiPolygon, polygon};
use proptest::prelude::*;

fn geometry(offset: f64) -> MultiPolygon<f64> {
    MultiPolygon(vec![polygon![
        (x: offset, y: 40.0),
        (x: offset + 0.4, y: 40.0),
        (x: offset + 0.4, y: 40.4),
        (x: offset, y: 40.4),
        (x: offset, y: 40.0),
    ]])
}

fn provenance(checksum: &str) -> Provenance {
    Provenance {
        provider_name: "tiger".into(),
        url: "https://www2.census.gov/geo/tiger/cd.zip".into(),
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

fn cd(district: u8, with_provenance: bool) -> Boundary {
    Boundary {
        id: format!("55{district:02}"),
        boundary_type: BoundaryType::CongressionalDistrict,
        level: AdministrativeLevel::Federal,
        geometry: geometry(f64::from(district)),
        authority: Authority::FederalMandate,
        source: with_provenance.then(|| provenance("deadbeef")),
    }
}

/// Strategy: a set of 1..=24 distinct districts, some with provenance.
fn boundary_set() -> impl Strategy<Value = Vec<Boundary>> {
    proptest::collection::btree_set(1u8..=24, 1..24).prop_flat_map(|districts| {
        let districts: Vec<u8> = districts.into_iter().collect();
        let len = districts.len();
        (
            Just(districts),
            proptest::collection::vec(proptest::bool::ANY, len),
        )
            .prop_map(|(districts, flags)| {
                districts
                    .into_iter()
                    .zip(flags)
                    .map(|(d, with_provenance)| cd(d, with_provenance))
                    .collect()
            })
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn root_is_invariant_under_input_order(boundaries in boundary_set(), seed in any::<u64>()) {
        let reference = MerkleTree::build(&boundaries).unwrap().root();

        // Deterministic shuffle driven by the seed.
        let mut shuffled = boundaries;
        let mut state = seed | 1;
        for index in (1..shuffled.len()).rev() {
            state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            let swap_with = (state >> 33) as usize % (index + 1);
            shuffled.swap(index, swap_with);
        }

        prop_assert_eq!(MerkleTree::build(&shuffled).unwrap().root(), reference);
    }

    #[test]
    fn batch_hashing_matches_sequential(boundaries in boundary_set()) {
        let sequential: Vec<_> = boundaries.iter().map(compute_leaf_hash).collect();
        let batch = compute_leaf_hashes_batch(&boundaries);
        prop_assert_eq!(sequential, batch);
    }

    #[test]
    fn every_hash_is_a_canonical_field_element(boundaries in boundary_set()) {
        let tree = MerkleTree::build(&boundaries).unwrap();
        // field_from_hex rejects anything at or above the modulus, so a
        // successful round-trip is a bound check.
        let root_hex = field_to_hex(&tree.root());
        prop_assert_eq!(field_from_hex(&root_hex).unwrap(), tree.root());
        for leaf in tree.leaves() {
            let leaf_hex = field_to_hex(&leaf.leaf_hash);
            prop_assert_eq!(field_from_hex(&leaf_hex).unwrap(), leaf.leaf_hash);
        }
    }

    #[test]
    fn every_committed_leaf_proves_and_forgeries_fail(boundaries in boundary_set()) {
        let tree = MerkleTree::build(&boundaries).unwrap();
        for boundary in &boundaries {
            let proof =
                generate_proof(&tree, boundary.boundary_type, &boundary.id).unwrap();
            prop_assert!(verify_proof(&proof));

            let mut forged = proof;
            forged.leaf += atlas_merkle::F::from(1u64);
            prop_assert!(!verify_proof(&forged));
        }
    }

    #[test]
    fn tree_depth_is_ceil_log2(boundaries in boundary_set()) {
        let tree = MerkleTree::build(&boundaries).unwrap();
        let n = tree.leaf_count();
        let expected = if n <= 1 { 0 } else { (n as f64).log2().ceil() as u32 };
        prop_assert_eq!(tree.depth(), expected);
    }
}

#[test]
fn provenance_triple_moves_the_leaf() {
    let bare = cd(1, false);
    let committed = cd(1, true);
    assert_ne!(
        compute_leaf_hash(&bare).leaf_hash,
        compute_leaf_hash(&committed).leaf_hash
    );

    // Empty checksum is the backward-compatible path: identical to no
    // provenance at all.
    let mut empty_checksum = cd(1, false);
    empty_checksum.source = Some(provenance(""));
    assert_eq!(
        compute_leaf_hash(&bare).leaf_hash,
        compute_leaf_hash(&empty_checksum).leaf_hash
    );
}

#[test]
fn type_separation_holds_for_identical_payloads() {
    let as_cd = Boundary {
        id: "0101".into(),
        boundary_type: BoundaryType::CongressionalDistrict,
        level: AdministrativeLevel::Federal,
        geometry: geometry(0.0),
        authority: Authority::FederalMandate,
        source: None,
    };
    let as_ward = Boundary {
        boundary_type: BoundaryType::Ward,
        ..as_cd.clone()
    };
    let cd_leaf = compute_leaf_hash(&as_cd);
    let ward_leaf = compute_leaf_hash(&as_ward);
    assert_eq!(cd_leaf.geometry_hash, ward_leaf.geometry_hash);
    assert_ne!(cd_leaf.leaf_hash, ward_leaf.leaf_hash);
}

#[test]
fn two_builds_are_bit_identical() {
    let boundaries: Vec<Boundary> = (1..=8).map(|d| cd(d, true)).collect();
    let first = MerkleTree::build(&boundaries).unwrap();
    let second = MerkleTree::build(&boundaries).unwrap();
    assert_eq!(first.root(), second.root());
    assert_eq!(first.depth(), second.depth());
    assert_eq!(
        field_to_hex(&first.root()),
        field_to_hex(&second.root())
    );
}
