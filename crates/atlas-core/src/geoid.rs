// SPDX-License-Identifier: MIT OR Apache-2.0

//! GEOID layout rules and the state FIPS table.
//!
//! GEOID layouts are layer-specific and part of the commitment invariant:
//! a congressional district is always `SSDD`, a county always `SSCCC`, a
//! place always `SSPPPPP`, and so on. The normalizer rejects any record
//! whose id does not match its layer's layout.

use crate::{AtlasError, BoundaryType};
use regex_lite::Regex;
use std::sync::LazyLock;

/// One row of the jurisdiction table: FIPS, USPS abbreviation, name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Jurisdiction {
    /// Two-digit state FIPS code.
    pub fips: &'static str,
    /// USPS abbreviation.
    pub usps: &'static str,
    /// Full name.
    pub name: &'static str,
}

/// All 56 jurisdictions: 50 states, DC, and 5 territories, in FIPS order.
pub const JURISDICTIONS: &[Jurisdiction] = &[
    Jurisdiction { fips: "01", usps: "AL", name: "Alabama" },
    Jurisdiction { fips: "02", usps: "AK", name: "Alaska" },
    Jurisdiction { fips: "04", usps: "AZ", name: "Arizona" },
    Jurisdiction { fips: "05", usps: "AR", name: "Arkansas" },
    Jurisdiction { fips: "06", usps: "CA", name: "California" },
    Jurisdiction { fips: "08", usps: "CO", name: "Colorado" },
    Jurisdiction { fips: "09", usps: "CT", name: "Connecticut" },
    Jurisdiction { fips: "10", usps: "DE", name: "Delaware" },
    Jurisdiction { fips: "11", usps: "DC", name: "District of Columbia" },
    Jurisdiction { fips: "12", usps: "FL", name: "Florida" },
    Jurisdiction { fips: "13", usps: "GA", name: "Georgia" },
    Jurisdiction { fips: "15", usps: "HI", name: "Hawaii" },
    Jurisdiction { fips: "16", usps: "ID", name: "Idaho" },
    Jurisdiction { fips: "17", usps: "IL", name: "Illinois" },
    Jurisdiction { fips: "18", usps: "IN", name: "Indiana" },
    Jurisdiction { fips: "19", usps: "IA", name: "Iowa" },
    Jurisdiction { fips: "20", usps: "KS", name: "Kansas" },
    Jurisdiction { fips: "21", usps: "KY", name: "Kentucky" },
    Jurisdiction { fips: "22", usps: "LA", name: "Louisiana" },
    Jurisdiction { fips: "23", usps: "ME", name: "Maine" },
    Jurisdiction { fips: "24", usps: "MD", name: "Maryland" },
    Jurisdiction { fips: "25", usps: "MA", name: "Massachusetts" },
    Jurisdiction { fips: "26", usps: "MI", name: "Michigan" },
    Jurisdiction { fips: "27", usps: "MN", name: "Minnesota" },
    Jurisdiction { fips: "28", usps: "MS", name: "Mississippi" },
    Jurisdiction { fips: "29", usps: "MO", name: "Missouri" },
    Jurisdiction { fips: "30", usps: "MT", name: "Montana" },
    Jurisdiction { fips: "31", usps: "NE", name: "Nebraska" },
    Jurisdiction { fips: "32", usps: "NV", name: "Nevada" },
    Jurisdiction { fips: "33", usps: "NH", name: "New Hampshire" },
    Jurisdiction { fips: "34", usps: "NJ", name: "New Jersey" },
    Jurisdiction { fips: "35", usps: "NM", name: "New Mexico" },
    Jurisdiction { fips: "36", usps: "NY", name: "New York" },
    Jurisdiction { fips: "37", usps: "NC", name: "North Carolina" },
    Jurisdiction { fips: "38", usps: "ND", name: "North Dakota" },
    Jurisdiction { fips: "39", usps: "OH", name: "Ohio" },
    Jurisdiction { fips: "40", usps: "OK", name: "Oklahoma" },
    Jurisdiction { fips: "41", usps: "OR", name: "Oregon" },
    Jurisdiction { fips: "42", usps: "PA", name: "Pennsylvania" },
    Jurisdiction { fips: "44", usps: "RI", name: "Rhode Island" },
    Jurisdiction { fips: "45", usps: "SC", name: "South Carolina" },
    Jurisdiction { fips: "46", usps: "SD", name: "South Dakota" },
    Jurisdiction { fips: "47", usps: "TN", name: "Tennessee" },
    Jurisdiction { fips: "48", usps: "TX", name: "Texas" },
    Jurisdiction { fips: "49", usps: "UT", name: "Utah" },
    Jurisdiction { fips: "50", usps: "VT", name: "Vermont" },
    Jurisdiction { fips: "51", usps: "VA", name: "Virginia" },
    Jurisdiction { fips: "53", usps: "WA", name: "Washington" },
    Jurisdiction { fips: "54", usps: "WV", name: "West Virginia" },
    Jurisdiction { fips: "55", usps: "WI", name: "Wisconsin" },
    Jurisdiction { fips: "56", usps: "WY", name: "Wyoming" },
    Jurisdiction { fips: "60", usps: "AS", name: "American Samoa" },
    Jurisdiction { fips: "66", usps: "GU", name: "Guam" },
    Jurisdiction { fips: "69", usps: "MP", name: "Northern Mariana Islands" },
    Jurisdiction { fips: "72", usps: "PR", name: "Puerto Rico" },
    Jurisdiction { fips: "78", usps: "VI", name: "U.S. Virgin Islands" },
];

static FIPS_SHAPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{2}$").expect("fips regex"));

static CD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{2}(\d{2}|ZZ)$").expect("cd regex"));
static SLD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{2}[0-9A-Z]{3}$").expect("sld regex"));
static COUNTY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{5}$").expect("county regex"));
static PLACE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{7}$").expect("place regex"));
static VTD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{5}[0-9A-Z-]{6}$").expect("vtd regex"));
static SCHOOL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{7}$").expect("school regex"));
static WARD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{4}$").expect("ward regex"));
static LOCAL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9A-Z-]{4,11}$").expect("local regex"));

/// Expected GEOID length for a layer.
#[must_use]
pub fn expected_len(layer: BoundaryType) -> usize {
    match layer {
        BoundaryType::CongressionalDistrict | BoundaryType::Ward => 4,
        BoundaryType::StateLegislativeUpper
        | BoundaryType::StateLegislativeLower
        | BoundaryType::County => 5,
        BoundaryType::Place
        | BoundaryType::SchoolUnified
        | BoundaryType::SchoolElementary
        | BoundaryType::SchoolSecondary => 7,
        BoundaryType::VotingPrecinct => 11,
        // Local layers have no Census-fixed width; bounds enforced by regex.
        BoundaryType::MunicipalCouncilDistrict | BoundaryType::SpecialDistrict => 0,
    }
}

fn layout(layer: BoundaryType) -> &'static Regex {
    match layer {
        BoundaryType::CongressionalDistrict => &CD_RE,
        BoundaryType::StateLegislativeUpper | BoundaryType::StateLegislativeLower => &SLD_RE,
        BoundaryType::County => &COUNTY_RE,
        BoundaryType::Place => &PLACE_RE,
        BoundaryType::VotingPrecinct => &VTD_RE,
        BoundaryType::SchoolUnified
        | BoundaryType::SchoolElementary
        | BoundaryType::SchoolSecondary => &SCHOOL_RE,
        BoundaryType::Ward => &WARD_RE,
        BoundaryType::MunicipalCouncilDistrict | BoundaryType::SpecialDistrict => &LOCAL_RE,
    }
}

/// Check a GEOID against its layer's layout.
///
/// # Errors
///
/// Returns [`AtlasError::Schema`] naming the offending id when the layout
/// does not match.
pub fn validate_geoid(layer: BoundaryType, id: &str) -> Result<(), AtlasError> {
    if layout(layer).is_match(id) {
        Ok(())
    } else {
        Err(AtlasError::Schema {
            provider: String::new(),
            reason: format!("GEOID `{id}` does not match the {layer} layout"),
        })
    }
}

/// Validate a two-digit state FIPS code against the jurisdiction table.
///
/// # Errors
///
/// Returns [`AtlasError::InvalidArgument`] when the code is malformed or
/// names no known jurisdiction.
pub fn validate_state_fips(fips: &str) -> Result<(), AtlasError> {
    if !FIPS_SHAPE.is_match(fips) {
        return Err(AtlasError::InvalidArgument {
            reason: format!("state FIPS `{fips}` is not two digits"),
        });
    }
    if jurisdiction(fips).is_none() {
        return Err(AtlasError::InvalidArgument {
            reason: format!("state FIPS `{fips}` names no jurisdiction"),
        });
    }
    Ok(())
}

/// Look up a jurisdiction by FIPS code.
#[must_use]
pub fn jurisdiction(fips: &str) -> Option<&'static Jurisdiction> {
    JURISDICTIONS.iter().find(|j| j.fips == fips)
}

/// The state FIPS prefix of a GEOID.
#[must_use]
pub fn state_prefix(id: &str) -> &str {
    if id.len() >= 2 { &id[..2] } else { id }
}

/// `true` when the GEOID is an upstream placeholder, not a real district.
///
/// Placeholders (`01ZZ`, `..ZZZ`, water-only `..99` legislative codes) are
/// carried through acquisition so completeness can flag them as `extra`,
/// but they are excluded from the tessellation proof.
#[must_use]
pub fn is_placeholder(layer: BoundaryType, id: &str) -> bool {
    if id.ends_with("ZZ") {
        return true;
    }
    if layer.is_legislative() {
        let district = &id[state_prefix(id).len().min(id.len())..];
        return !district.is_empty() && district.chars().all(|c| c == '9');
    }
    false
}
