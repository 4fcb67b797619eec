// SPDX-License-Identifier: MIT OR Apache-2.0
//! atlas-merkle
#![deny(unsafe_code)]
#![warn(missing_docs)]
//!
//! The Merkle commitment layer: Poseidon2 over the BN254 scalar field,
//! deterministic leaf hashing that commits boundary identity, geometry,
//! authority, and provenance, and proof generation/verification with the
//! odd-leaf promotion rule.
//!
//! ## Invariants
//!
//! - Every hash input and output is a field element `< p` where `p` is the
//!   BN254 scalar modulus. Strings are UTF-8 bytes packed 31 at a time.
//! - The tree is a complete binary tree over leaves sorted by
//!   `(boundary_type, id)`; an odd trailing node is **promoted** to the
//!   next level unchanged, never duplicated. Verifiers replay the same
//!   rule, encoded in proofs as a sentinel `0` sibling.
//! - Given the same multiset of boundaries, the root is bit-identical
//!   across machines, thread counts, and runs.

/// Field-element packing and hex codecs.
pub mod field;
/// Leaf hashing: identity, geometry, authority, provenance domains.
pub mod leaf;
/// Poseidon2 permutation and sponge.
pub mod poseidon;
/// Membership proofs.
pub mod proof;
/// Deterministic tree construction.
pub mod tree;

/// Scalar field used across the crate (BN254).
pub type F = ark_bn254::Fr;

pub use field::{field_from_hex, field_to_hex, pack_bytes};
pub use leaf::{MerkleLeaf, compute_leaf_hash, compute_leaf_hashes_batch};
pub use poseidon::{Poseidon2, hasher};
pub use proof::{MerkleProof, generate_proof, verify_proof};
pub use tree::MerkleTree;
