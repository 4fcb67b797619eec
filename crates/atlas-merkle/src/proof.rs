// SPDX-License-Identifier: MIT OR Apache-2.0

//! Membership proofs.
//!
//! A proof carries the co-path from a leaf to the root. Where the tree
//! promoted an odd node, the proof records a sentinel sibling of `0`;
//! verification skips that level, carrying the running hash up unchanged,
//! which replays the builder's promotion rule exactly.

use crate::field::{field_from_hex, field_to_hex};
use crate::poseidon::hasher;
use crate::tree::MerkleTree;
use crate::F;
use ark_ff::Zero;
use atlas_core::artifact::MerkleProofDoc;
use atlas_core::{AtlasError, BoundaryType};

/// A typed membership proof.
#[derive(Debug, Clone, PartialEq)]
pub struct MerkleProof {
    /// Root the proof verifies against.
    pub root: F,
    /// The committed leaf.
    pub leaf: F,
    /// Co-path from leaf to root; `0` marks a promoted level.
    pub siblings: Vec<F>,
    /// `0` when the leaf-side node was the left child at that level.
    pub path_indices: Vec<u8>,
    /// Target boundary GEOID.
    pub boundary_id: String,
    /// Target layer.
    pub boundary_type: BoundaryType,
}

/// Generate a proof for one boundary in a built tree.
///
/// # Errors
///
/// Returns [`AtlasError::InvalidArgument`] when the boundary is not in the
/// tree.
pub fn generate_proof(
    tree: &MerkleTree,
    boundary_type: BoundaryType,
    id: &str,
) -> Result<MerkleProof, AtlasError> {
    let mut index = tree
        .position_of(boundary_type, id)
        .ok_or_else(|| AtlasError::InvalidArgument {
            reason: format!("boundary {boundary_type}/{id} is not committed in this tree"),
        })?;

    let levels = tree.levels();
    let leaf = levels[0][index];
    let mut siblings = Vec::with_capacity(levels.len().saturating_sub(1));
    let mut path_indices = Vec::with_capacity(levels.len().saturating_sub(1));

    for level in &levels[..levels.len().saturating_sub(1)] {
        let sibling_index = index ^ 1;
        if sibling_index < level.len() {
            siblings.push(level[sibling_index]);
        } else {
            // Promoted this level: no sibling was hashed in.
            siblings.push(F::zero());
        }
        path_indices.push((index & 1) as u8);
        index /= 2;
    }

    Ok(MerkleProof {
        root: tree.root(),
        leaf,
        siblings,
        path_indices,
        boundary_id: id.to_owned(),
        boundary_type,
    })
}

/// Recompute the root from a proof and compare.
#[must_use]
pub fn verify_proof(proof: &MerkleProof) -> bool {
    if proof.siblings.len() != proof.path_indices.len() {
        return false;
    }
    let h = hasher();
    let mut current = proof.leaf;
    for (sibling, side) in proof.siblings.iter().zip(&proof.path_indices) {
        if sibling.is_zero() {
            // Promoted level: the node carried up unchanged.
            continue;
        }
        current = match side {
            0 => h.hash_two(current, *sibling),
            _ => h.hash_two(*sibling, current),
        };
    }
    current == proof.root
}

impl MerkleProof {
    /// Serialize to the wire document.
    #[must_use]
    pub fn to_doc(&self) -> MerkleProofDoc {
        MerkleProofDoc {
            root: field_to_hex(&self.root),
            leaf: field_to_hex(&self.leaf),
            siblings: self.siblings.iter().map(field_to_hex).collect(),
            path_indices: self.path_indices.clone(),
            boundary_id: self.boundary_id.clone(),
            boundary_type: self.boundary_type,
        }
    }

    /// Parse a wire document back into a typed proof.
    ///
    /// # Errors
    ///
    /// Returns [`AtlasError::Format`] when any hex field is not a
    /// canonical field element.
    pub fn from_doc(doc: &MerkleProofDoc) -> Result<Self, AtlasError> {
        let decode = |hex_str: &str| {
            field_from_hex(hex_str).map_err(|e| AtlasError::Format {
                provider: "proof".into(),
                reason: e.to_string(),
            })
        };
        Ok(Self {
            root: decode(&doc.root)?,
            leaf: decode(&doc.leaf)?,
            siblings: doc
                .siblings
                .iter()
                .map(|s| decode(s))
                .collect::<Result<Vec<_>, _>>()?,
            path_indices: doc.path_indices.clone(),
            boundary_id: doc.boundary_id.clone(),
            boundary_type: doc.boundary_type,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use atlas_core::{AdministrativeLevel, Authority, Boundary};
    use geo_types::{MultiPolygon, polygon};

    fn boundary(id: &str, offset: f64) -> Boundary {
        Boundary {
            id: id.into(),
            boundary_type: BoundaryType::CongressionalDistrict,
            level: AdministrativeLevel::Federal,
            geometry: MultiPolygon(vec![polygon![
                (x: offset, y: 0.0),
                (x: offset + 1.0, y: 0.0),
                (x: offset + 1.0, y: 1.0),
                (x: offset, y: 1.0),
                (x: offset, y: 0.0),
            ]]),
            authority: Authority::FederalMandate,
            source: None,
        }
    }

    fn tree_of(n: usize) -> MerkleTree {
        let boundaries: Vec<Boundary> = (1..=n)
            .map(|d| boundary(&format!("55{d:02}"), d as f64))
            .collect();
        MerkleTree::build(&boundaries).unwrap()
    }

    #[test]
    fn every_leaf_proves_in_a_power_of_two_tree() {
        let tree = tree_of(8);
        for d in 1..=8 {
            let id = format!("55{d:02}");
            let proof =
                generate_proof(&tree, BoundaryType::CongressionalDistrict, &id).unwrap();
            assert!(verify_proof(&proof), "leaf {id} failed");
        }
    }

    #[test]
    fn every_leaf_proves_with_promotions() {
        // 5 leaves exercise promotion at two levels.
        let tree = tree_of(5);
        for d in 1..=5 {
            let id = format!("55{d:02}");
            let proof =
                generate_proof(&tree, BoundaryType::CongressionalDistrict, &id).unwrap();
            assert!(verify_proof(&proof), "leaf {id} failed");
        }
    }

    #[test]
    fn promoted_leaf_records_sentinel_siblings() {
        let tree = tree_of(5);
        let proof = generate_proof(&tree, BoundaryType::CongressionalDistrict, "5505").unwrap();
        assert!(proof.siblings.iter().any(ark_ff::Zero::is_zero));
        assert!(verify_proof(&proof));
    }

    #[test]
    fn wrong_leaf_fails() {
        let tree = tree_of(8);
        let mut proof =
            generate_proof(&tree, BoundaryType::CongressionalDistrict, "5503").unwrap();
        proof.leaf = F::from(42u64);
        assert!(!verify_proof(&proof));
    }

    #[test]
    fn tampered_sibling_fails() {
        let tree = tree_of(8);
        let mut proof =
            generate_proof(&tree, BoundaryType::CongressionalDistrict, "5503").unwrap();
        proof.siblings[1] += F::from(1u64);
        assert!(!verify_proof(&proof));
    }

    #[test]
    fn mismatched_lengths_fail_closed() {
        let tree = tree_of(8);
        let mut proof =
            generate_proof(&tree, BoundaryType::CongressionalDistrict, "5503").unwrap();
        proof.path_indices.pop();
        assert!(!verify_proof(&proof));
    }

    #[test]
    fn unknown_boundary_is_an_argument_error() {
        let tree = tree_of(4);
        assert!(generate_proof(&tree, BoundaryType::CongressionalDistrict, "0612").is_err());
    }

    #[test]
    fn doc_round_trip_preserves_verification() {
        let tree = tree_of(5);
        let proof = generate_proof(&tree, BoundaryType::CongressionalDistrict, "5502").unwrap();
        let doc = proof.to_doc();
        let back = MerkleProof::from_doc(&doc).unwrap();
        assert_eq!(back, proof);
        assert!(verify_proof(&back));
    }

    #[test]
    fn proof_depth_matches_tree_depth() {
        let tree = tree_of(8);
        let proof = generate_proof(&tree, BoundaryType::CongressionalDistrict, "5501").unwrap();
        assert_eq!(proof.siblings.len() as u32, tree.depth());
    }
}
