// SPDX-License-Identifier: MIT OR Apache-2.0

//! Artifact and proof wire formats.
//!
//! The artifact is the pipeline's one deliverable: the Merkle root plus the
//! ordered leaves it commits to. Leaves appear exactly as hashed — sorted
//! by `(type, id)` — so a consumer can rebuild the tree and re-derive the
//! root without any out-of-band information.

use crate::{ARTIFACT_VERSION, BoundaryType};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Shape of the committed tree.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum TreeType {
    /// One tree over every leaf across layers.
    Flat,
    /// Per-layer subtrees combined under a top tree.
    Layered,
}

/// One committed leaf as it appears in the artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactLeaf {
    /// Boundary GEOID.
    pub id: String,
    /// Layer, kebab-case wire name.
    #[serde(rename = "type")]
    pub boundary_type: BoundaryType,
    /// Leaf hash, hex-encoded BN254 field element.
    pub hash: String,
    /// Authority numeric encoding.
    pub authority: u64,
    /// Geometry hash, hex-encoded BN254 field element.
    pub geometry_hash: String,
}

/// Build metadata carried in the artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactMetadata {
    /// When the artifact was generated.
    pub generated_at: DateTime<Utc>,
    /// TIGER vintage the build drew from (e.g. `"2024"`).
    pub tiger_version: String,
    /// Leaf count per layer, deterministically ordered.
    pub layer_counts: BTreeMap<BoundaryType, u64>,
}

/// The content-addressed atlas document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AtlasArtifact {
    /// Artifact format version.
    pub version: String,
    /// Merkle root, hex-encoded BN254 field element.
    pub root: String,
    /// Total number of leaves.
    pub boundary_count: u64,
    /// Shape of the tree.
    pub tree_type: TreeType,
    /// `⌈log2(n)⌉` for `n` leaves.
    pub tree_depth: u32,
    /// Leaves, ordered exactly as hashed: by `(type, id)`.
    pub leaves: Vec<ArtifactLeaf>,
    /// Build metadata.
    pub metadata: ArtifactMetadata,
}

impl AtlasArtifact {
    /// Start an artifact with the current format version.
    #[must_use]
    pub fn new(
        root: String,
        tree_type: TreeType,
        tree_depth: u32,
        leaves: Vec<ArtifactLeaf>,
        metadata: ArtifactMetadata,
    ) -> Self {
        Self {
            version: ARTIFACT_VERSION.to_owned(),
            root,
            boundary_count: leaves.len() as u64,
            tree_type,
            tree_depth,
            leaves,
            metadata,
        }
    }
}

/// A membership proof for one boundary against a published root.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct MerkleProofDoc {
    /// Root the proof verifies against, hex.
    pub root: String,
    /// The committed leaf, hex.
    pub leaf: String,
    /// Co-path from leaf to root, hex. A promoted odd node contributes
    /// the zero field element as a sentinel.
    pub siblings: Vec<String>,
    /// `0` when the leaf-side node is the left child at that level, else `1`.
    pub path_indices: Vec<u8>,
    /// Boundary GEOID the proof targets.
    pub boundary_id: String,
    /// Layer of the target boundary.
    pub boundary_type: BoundaryType,
}
