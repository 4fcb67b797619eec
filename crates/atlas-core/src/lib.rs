// SPDX-License-Identifier: MIT OR Apache-2.0
//! atlas-core
#![deny(unsafe_code)]
#![warn(missing_docs)]
//!
//! The stable contract for Shadow Atlas.
//!
//! Every other crate in the workspace speaks these types. If you only take
//! one dependency, take this one.

/// Artifact and proof wire formats.
pub mod artifact;
/// Error catalog for the Shadow Atlas pipeline.
pub mod error;
/// GEOID layout rules and the state FIPS table.
pub mod geoid;
/// Job and snapshot lifecycle types.
pub mod job;
/// Validation report types.
pub mod report;

use chrono::{DateTime, Utc};
use geo_types::MultiPolygon;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

pub use error::{AtlasError, AtlasResult, ErrorClass};

/// Artifact format version embedded in every emitted atlas document.
///
/// # Examples
///
/// ```
/// assert_eq!(atlas_core::ARTIFACT_VERSION, "2.0.0");
/// ```
pub const ARTIFACT_VERSION: &str = "2.0.0";

/// The boundary layers the pipeline knows how to acquire and commit.
///
/// Declaration order is the canonical sort order of the Merkle leaf space:
/// leaves sort by `(boundary_type, id)`, so congressional districts always
/// precede counties, which precede places, and so on.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
    schemars::JsonSchema,
)]
#[serde(rename_all = "kebab-case")]
pub enum BoundaryType {
    /// US congressional district (GEOID `SSDD`).
    CongressionalDistrict,
    /// State legislative upper chamber (GEOID `SSDDD`).
    StateLegislativeUpper,
    /// State legislative lower chamber (GEOID `SSDDD`).
    StateLegislativeLower,
    /// County or county-equivalent (GEOID `SSCCC`).
    County,
    /// Census place (GEOID `SSPPPPP`).
    Place,
    /// Voting tabulation district (GEOID 11 chars).
    VotingPrecinct,
    /// Unified school district (GEOID `SSLLLLL`).
    SchoolUnified,
    /// Elementary school district (GEOID `SSLLLLL`).
    SchoolElementary,
    /// Secondary school district (GEOID `SSLLLLL`).
    SchoolSecondary,
    /// Municipal ward (GEOID `SSWW`, DC).
    Ward,
    /// Municipal council district.
    MunicipalCouncilDistrict,
    /// Special-purpose district (water, fire, transit, ...).
    SpecialDistrict,
}

impl BoundaryType {
    /// Every layer, in canonical sort order.
    pub const ALL: &'static [BoundaryType] = &[
        BoundaryType::CongressionalDistrict,
        BoundaryType::StateLegislativeUpper,
        BoundaryType::StateLegislativeLower,
        BoundaryType::County,
        BoundaryType::Place,
        BoundaryType::VotingPrecinct,
        BoundaryType::SchoolUnified,
        BoundaryType::SchoolElementary,
        BoundaryType::SchoolSecondary,
        BoundaryType::Ward,
        BoundaryType::MunicipalCouncilDistrict,
        BoundaryType::SpecialDistrict,
    ];

    /// Stable numeric tag committed into the leaf hash.
    ///
    /// These values are part of the wire contract: changing one changes
    /// every leaf of that layer.
    #[must_use]
    pub fn type_tag(&self) -> u64 {
        match self {
            Self::CongressionalDistrict => 1,
            Self::StateLegislativeUpper => 2,
            Self::StateLegislativeLower => 3,
            Self::County => 4,
            Self::Place => 5,
            Self::VotingPrecinct => 6,
            Self::SchoolUnified => 7,
            Self::SchoolElementary => 8,
            Self::SchoolSecondary => 9,
            Self::Ward => 10,
            Self::MunicipalCouncilDistrict => 11,
            Self::SpecialDistrict => 12,
        }
    }

    /// Wire name used in artifacts and CLI arguments (kebab-case).
    #[must_use]
    pub fn wire_name(&self) -> &'static str {
        match self {
            Self::CongressionalDistrict => "congressional-district",
            Self::StateLegislativeUpper => "state-legislative-upper",
            Self::StateLegislativeLower => "state-legislative-lower",
            Self::County => "county",
            Self::Place => "place",
            Self::VotingPrecinct => "voting-precinct",
            Self::SchoolUnified => "school-unified",
            Self::SchoolElementary => "school-elementary",
            Self::SchoolSecondary => "school-secondary",
            Self::Ward => "ward",
            Self::MunicipalCouncilDistrict => "municipal-council-district",
            Self::SpecialDistrict => "special-district",
        }
    }

    /// Parse a wire name or common CLI alias.
    pub fn parse(name: &str) -> Result<Self, AtlasError> {
        let layer = match name {
            "congressional-district" | "cd" => Self::CongressionalDistrict,
            "state-legislative-upper" | "sldu" => Self::StateLegislativeUpper,
            "state-legislative-lower" | "sldl" => Self::StateLegislativeLower,
            "county" => Self::County,
            "place" => Self::Place,
            "voting-precinct" | "vtd" => Self::VotingPrecinct,
            "school-unified" => Self::SchoolUnified,
            "school-elementary" => Self::SchoolElementary,
            "school-secondary" => Self::SchoolSecondary,
            "ward" => Self::Ward,
            "municipal-council-district" => Self::MunicipalCouncilDistrict,
            "special-district" => Self::SpecialDistrict,
            other => {
                return Err(AtlasError::InvalidArgument {
                    reason: format!("unknown layer `{other}`"),
                });
            }
        };
        Ok(layer)
    }

    /// `true` for the layers subject to decennial redistricting (CD, SLDU, SLDL).
    #[must_use]
    pub fn is_legislative(&self) -> bool {
        matches!(
            self,
            Self::CongressionalDistrict | Self::StateLegislativeUpper | Self::StateLegislativeLower
        )
    }
}

impl fmt::Display for BoundaryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_name())
    }
}

/// Administrative level of the governing body behind a boundary.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, schemars::JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum AdministrativeLevel {
    /// Federal government.
    Federal,
    /// State government.
    State,
    /// County government.
    County,
    /// Municipal government.
    Municipal,
    /// Special-purpose authority.
    Special,
}

/// Authority that published a boundary, with the fixed numeric encoding
/// committed into the leaf hash.
///
/// Higher values take precedence when two providers disagree about the same
/// `(boundary_type, id)`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
    schemars::JsonSchema,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Authority {
    /// Special-district self-published data.
    SpecialDistrict,
    /// A municipal agency (not the council itself).
    MunicipalAgency,
    /// The municipal government's official publication.
    MunicipalOfficial,
    /// The state's official GIS publication.
    StateOfficial,
    /// Federally mandated data (TIGER/Line).
    FederalMandate,
}

impl Authority {
    /// Numeric encoding committed into the leaf hash.
    #[must_use]
    pub fn encoding(&self) -> u64 {
        match self {
            Self::SpecialDistrict => 0,
            Self::MunicipalAgency => 1,
            Self::MunicipalOfficial => 2,
            Self::StateOfficial => 3,
            Self::FederalMandate => 4,
        }
    }
}

/// Legal standing of a published dataset.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, schemars::JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum LegalStatus {
    /// The authoritative legal record of the boundary.
    Official,
    /// Published ahead of formal adoption.
    Provisional,
    /// Informational extract; not the legal record.
    Informational,
}

/// Where a boundary record came from, committed into the leaf hash as the
/// provenance triple `(url, checksum, retrieved_at)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Provenance {
    /// Registered provider name (e.g. `"tiger"`).
    pub provider_name: String,

    /// Source URL the raw payload was downloaded from.
    pub url: String,

    /// Upstream dataset version or vintage (e.g. `"2024"`).
    pub version: String,

    /// License the upstream declares for the data.
    pub license: String,

    /// Wall-clock of the HTTP response, UTC, rounded to the second.
    pub retrieved_at: DateTime<Utc>,

    /// SHA-256 of the raw bytes as downloaded, before any decoding.
    /// Empty means "no provenance" and selects the backward-compatible
    /// leaf hash.
    pub checksum: String,

    /// Administrative level of the publishing authority.
    pub authority_level: AdministrativeLevel,

    /// Legal standing of the dataset.
    pub legal_status: LegalStatus,

    /// Coordinate system of the payload as emitted by the provider.
    /// Must be `"EPSG:4326"` once a record reaches the normalizer.
    pub coordinate_system: String,

    /// Set when a non-OGC-valid input geometry was mechanically repaired
    /// instead of rejected.
    pub geometry_repaired: bool,
}

impl Provenance {
    /// `true` when the record carries a usable provenance triple.
    #[must_use]
    pub fn has_checksum(&self) -> bool {
        !self.checksum.is_empty()
    }
}

/// The normalized unit of the pipeline: one district polygon with its
/// identity, governing authority, and provenance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Boundary {
    /// GEOID, layout per [`BoundaryType`].
    pub id: String,

    /// Which layer this boundary belongs to.
    pub boundary_type: BoundaryType,

    /// Administrative level of the boundary itself.
    pub level: AdministrativeLevel,

    /// Geometry in WGS84, normalized to a multipolygon.
    pub geometry: MultiPolygon<f64>,

    /// Publishing authority, used for precedence and committed into the leaf.
    pub authority: Authority,

    /// Provenance of the record. `None` selects the backward-compatible
    /// leaf hash, exactly like an empty checksum.
    pub source: Option<Provenance>,
}

impl Boundary {
    /// Composite sort key ordering leaves across layers.
    #[must_use]
    pub fn sort_key(&self) -> (BoundaryType, &str) {
        (self.boundary_type, self.id.as_str())
    }
}

/// A fully-specified build request, validated before any work is scheduled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildRequest {
    /// Layers to acquire and commit.
    pub layers: Vec<BoundaryType>,

    /// Two-digit state FIPS codes scoping the build.
    pub regions: Vec<String>,

    /// TIGER vintage year.
    pub vintage: u16,

    /// Minimum acceptable per-layer quality score, 0–100.
    pub quality_threshold: u8,

    /// Where to write the artifact; defaults to the job directory.
    pub output: Option<PathBuf>,

    /// Cross-validate layers against ground-truth municipal polygons.
    pub cross_validate: bool,
}

impl BuildRequest {
    /// Earliest vintage the pipeline accepts; TIGER's web-published
    /// archive era.
    pub const MIN_VINTAGE: u16 = 2000;
    /// Latest vintage the pipeline accepts.
    pub const MAX_VINTAGE: u16 = 2100;

    /// Validate the request against the input contract.
    ///
    /// # Errors
    ///
    /// Returns [`AtlasError::InvalidArgument`] for an empty layer list, a
    /// malformed or unknown state FIPS, an out-of-range quality
    /// threshold, or an out-of-range vintage.
    pub fn validate(&self) -> Result<(), AtlasError> {
        if self.layers.is_empty() {
            return Err(AtlasError::InvalidArgument {
                reason: "at least one layer is required".into(),
            });
        }
        for fips in &self.regions {
            geoid::validate_state_fips(fips)?;
        }
        if self.quality_threshold > 100 {
            return Err(AtlasError::InvalidArgument {
                reason: format!("quality threshold {} out of range 0-100", self.quality_threshold),
            });
        }
        if !(Self::MIN_VINTAGE..=Self::MAX_VINTAGE).contains(&self.vintage) {
            return Err(AtlasError::InvalidArgument {
                reason: format!(
                    "vintage {} out of range {}-{}",
                    self.vintage,
                    Self::MIN_VINTAGE,
                    Self::MAX_VINTAGE
                ),
            });
        }
        Ok(())
    }
}
