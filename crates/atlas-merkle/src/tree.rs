// SPDX-License-Identifier: MIT OR Apache-2.0

//! Deterministic tree construction.
//!
//! Leaves are sorted by `(boundary_type, id)` and combined level by level
//! with `H(left, right)`. An odd trailing node is promoted to the next
//! level unchanged — the verifier replays the same rule, so duplication
//! would change every root above it.

use crate::leaf::{MerkleLeaf, compute_leaf_hashes_batch};
use crate::poseidon::hasher;
use crate::F;
use atlas_core::{AtlasError, Boundary, BoundaryType};
use std::collections::BTreeMap;

/// A built Merkle tree: every level of node hashes plus the sorted leaves.
#[derive(Debug, Clone)]
pub struct MerkleTree {
    /// `levels[0]` are the leaf hashes in sorted order; the last level has
    /// exactly one element, the root.
    levels: Vec<Vec<F>>,
    /// The committed leaves, sorted by `(boundary_type, id)`.
    leaves: Vec<MerkleLeaf>,
}

impl MerkleTree {
    /// Hash and commit a set of boundaries.
    ///
    /// One-shot and pure: the root depends only on the input multiset,
    /// never on input order or worker scheduling.
    ///
    /// # Errors
    ///
    /// Returns [`AtlasError::InvalidArgument`] for an empty input and
    /// [`AtlasError::Internal`] when two boundaries collide on
    /// `(boundary_type, id)` — precedence resolution is the normalizer's
    /// job and must have happened already.
    pub fn build(boundaries: &[Boundary]) -> Result<Self, AtlasError> {
        if boundaries.is_empty() {
            return Err(AtlasError::InvalidArgument {
                reason: "cannot build a tree over zero boundaries".into(),
            });
        }
        let mut leaves = compute_leaf_hashes_batch(boundaries);
        leaves.sort_by(|a, b| {
            (a.boundary_type, a.boundary_id.as_str())
                .cmp(&(b.boundary_type, b.boundary_id.as_str()))
        });
        for pair in leaves.windows(2) {
            if pair[0].boundary_type == pair[1].boundary_type
                && pair[0].boundary_id == pair[1].boundary_id
            {
                return Err(AtlasError::Internal {
                    reason: format!(
                        "duplicate leaf {}/{} reached the tree builder",
                        pair[0].boundary_type, pair[0].boundary_id
                    ),
                });
            }
        }
        Ok(Self::from_sorted_leaves(leaves))
    }

    /// Build from leaves that are already hashed and sorted.
    #[must_use]
    pub fn from_sorted_leaves(leaves: Vec<MerkleLeaf>) -> Self {
        let h = hasher();
        let mut levels = vec![leaves.iter().map(|l| l.leaf_hash).collect::<Vec<F>>()];
        while levels.last().map(Vec::len).unwrap_or(0) > 1 {
            let current = levels.last().expect("at least one level");
            let mut next = Vec::with_capacity(current.len().div_ceil(2));
            for pair in current.chunks(2) {
                match pair {
                    [left, right] => next.push(h.hash_two(*left, *right)),
                    // Odd node: promoted, not duplicated.
                    [odd] => next.push(*odd),
                    _ => unreachable!("chunks(2) yields 1- or 2-element slices"),
                }
            }
            levels.push(next);
        }
        Self { levels, leaves }
    }

    /// The committed root.
    #[must_use]
    pub fn root(&self) -> F {
        self.levels
            .last()
            .and_then(|level| level.first())
            .copied()
            .expect("a built tree always has a root")
    }

    /// Tree depth, `⌈log2(n)⌉`.
    #[must_use]
    pub fn depth(&self) -> u32 {
        self.levels.len() as u32 - 1
    }

    /// Number of committed leaves.
    #[must_use]
    pub fn leaf_count(&self) -> usize {
        self.leaves.len()
    }

    /// The committed leaves in hash order.
    #[must_use]
    pub fn leaves(&self) -> &[MerkleLeaf] {
        &self.leaves
    }

    /// All levels, leaf level first. Exposed for proof generation.
    pub(crate) fn levels(&self) -> &[Vec<F>] {
        &self.levels
    }

    /// Position of a boundary's leaf in the sorted leaf space.
    #[must_use]
    pub fn position_of(&self, boundary_type: BoundaryType, id: &str) -> Option<usize> {
        self.leaves
            .binary_search_by(|l| {
                (l.boundary_type, l.boundary_id.as_str()).cmp(&(boundary_type, id))
            })
            .ok()
    }

    /// Leaf counts per layer, deterministically ordered.
    #[must_use]
    pub fn layer_counts(&self) -> BTreeMap<BoundaryType, u64> {
        let mut counts = BTreeMap::new();
        for leaf in &self.leaves {
            *counts.entry(leaf.boundary_type).or_insert(0u64) += 1;
        }
        counts
    }
}
