// SPDX-License-Identifier: MIT OR Apache-2.0

//! Embedded canonical GEOID reference data.
//!
//! The reference answers one question per `(layer, state)`: which GEOIDs
//! must exist. Congressional seats follow the 2020 apportionment (441
//! total: 435 voting seats, the DC delegate, and five territorial
//! delegates). County-equivalents total 3235 and reflect the 2022
//! Connecticut transition from eight counties to nine planning regions.
//! Legislative chamber sizes follow the post-2020 maps.
//!
//! Tables are data snapshots, regenerated when a new apportionment or
//! chamber change lands; [`REFERENCE_VINTAGE`] names the snapshot year.

use atlas_core::BoundaryType;
use atlas_core::geoid::JURISDICTIONS;

/// Vintage year of the embedded tables.
pub const REFERENCE_VINTAGE: u16 = 2024;

/// Congressional seats per state, 2020 apportionment. At-large states
/// carry one seat and use the `00` district code.
const CD_SEATS: &[(&str, u16)] = &[
    ("01", 7),  // AL
    ("02", 1),  // AK
    ("04", 9),  // AZ
    ("05", 4),  // AR
    ("06", 52), // CA
    ("08", 8),  // CO
    ("09", 5),  // CT
    ("10", 1),  // DE
    ("12", 28), // FL
    ("13", 14), // GA
    ("15", 2),  // HI
    ("16", 2),  // ID
    ("17", 17), // IL
    ("18", 9),  // IN
    ("19", 4),  // IA
    ("20", 4),  // KS
    ("21", 6),  // KY
    ("22", 6),  // LA
    ("23", 2),  // ME
    ("24", 8),  // MD
    ("25", 9),  // MA
    ("26", 13), // MI
    ("27", 8),  // MN
    ("28", 4),  // MS
    ("29", 8),  // MO
    ("30", 2),  // MT
    ("31", 3),  // NE
    ("32", 4),  // NV
    ("33", 2),  // NH
    ("34", 12), // NJ
    ("35", 3),  // NM
    ("36", 26), // NY
    ("37", 14), // NC
    ("38", 1),  // ND
    ("39", 15), // OH
    ("40", 5),  // OK
    ("41", 6),  // OR
    ("42", 17), // PA
    ("44", 2),  // RI
    ("45", 7),  // SC
    ("46", 1),  // SD
    ("47", 9),  // TN
    ("48", 38), // TX
    ("49", 4),  // UT
    ("50", 1),  // VT
    ("51", 11), // VA
    ("53", 10), // WA
    ("54", 2),  // WV
    ("55", 8),  // WI
    ("56", 1),  // WY
];

/// The DC delegate's CD GEOID.
const DC_DELEGATE: &str = "1198";

/// Territorial delegates use the `00` district code.
const TERRITORY_FIPS: &[&str] = &["60", "66", "69", "72", "78"];

/// County-equivalent counts per jurisdiction, and the independent-city
/// codes that sit outside the odd-numbered county sequence.
///
/// Independent cities are the `5XX` codes; the count column includes
/// them. Connecticut and DC are generated specially below.
const COUNTY_COUNTS: &[(&str, u16, &[&str])] = &[
    ("01", 67, &[]),
    ("02", 30, &[]),
    ("04", 15, &[]),
    ("05", 75, &[]),
    ("06", 58, &[]),
    ("08", 64, &[]),
    // 09 (CT) generated from the planning-region codes.
    ("10", 3, &[]),
    // 11 (DC) generated below.
    ("12", 67, &[]),
    ("13", 159, &[]),
    ("15", 5, &[]),
    ("16", 44, &[]),
    ("17", 102, &[]),
    ("18", 92, &[]),
    ("19", 99, &[]),
    ("20", 105, &[]),
    ("21", 120, &[]),
    ("22", 64, &[]),
    ("23", 16, &[]),
    ("24", 24, &["510"]), // Baltimore city
    ("25", 14, &[]),
    ("26", 83, &[]),
    ("27", 87, &[]),
    ("28", 82, &[]),
    ("29", 115, &["510"]), // St. Louis city
    ("30", 56, &[]),
    ("31", 93, &[]),
    ("32", 17, &["510"]), // Carson City
    ("33", 10, &[]),
    ("34", 21, &[]),
    ("35", 33, &[]),
    ("36", 62, &[]),
    ("37", 100, &[]),
    ("38", 53, &[]),
    ("39", 88, &[]),
    ("40", 77, &[]),
    ("41", 36, &[]),
    ("42", 67, &[]),
    ("44", 5, &[]),
    ("45", 46, &[]),
    ("46", 66, &[]),
    ("47", 95, &[]),
    ("48", 254, &[]),
    ("49", 29, &[]),
    ("50", 14, &[]),
    (
        "51",
        133,
        // Virginia's 38 independent cities.
        &[
            "510", "520", "530", "540", "550", "560", "570", "580", "590", "600", "610", "620",
            "630", "640", "650", "660", "670", "678", "680", "683", "685", "690", "700", "710",
            "720", "730", "735", "740", "750", "760", "770", "775", "790", "800", "810", "820",
            "830", "840",
        ],
    ),
    ("53", 39, &[]),
    ("54", 55, &[]),
    ("55", 72, &[]),
    ("56", 23, &[]),
    ("60", 5, &[]),
    ("66", 1, &[]),
    ("69", 4, &[]),
    ("72", 78, &[]),
    ("78", 3, &[]),
];

/// Connecticut planning-region county-equivalents (2022 transition).
const CT_PLANNING_REGIONS: &[&str] = &[
    "09110", "09120", "09130", "09140", "09150", "09160", "09170", "09180", "09190",
];

/// Legislative chamber sizes per state (SLDU, SLDL), post-2020 maps.
/// Nebraska's legislature is unicameral; DC and the territories have no
/// SLD layers in this reference.
const SLD_SEATS: &[(&str, u16, u16)] = &[
    ("01", 35, 105),
    ("02", 20, 40),
    ("04", 30, 30),
    ("05", 35, 100),
    ("06", 40, 80),
    ("08", 35, 65),
    ("09", 36, 151),
    ("10", 21, 41),
    ("12", 40, 120),
    ("13", 56, 180),
    ("15", 25, 51),
    ("16", 35, 35),
    ("17", 59, 118),
    ("18", 50, 100),
    ("19", 50, 100),
    ("20", 40, 125),
    ("21", 38, 100),
    ("22", 39, 105),
    ("23", 35, 151),
    ("24", 47, 141),
    ("25", 40, 160),
    ("26", 38, 110),
    ("27", 67, 134),
    ("28", 52, 122),
    ("29", 34, 163),
    ("30", 50, 100),
    ("31", 49, 0),
    ("32", 21, 42),
    ("33", 24, 400),
    ("34", 40, 40),
    ("35", 42, 70),
    ("36", 63, 150),
    ("37", 50, 120),
    ("38", 47, 47),
    ("39", 33, 99),
    ("40", 48, 101),
    ("41", 30, 60),
    ("42", 50, 203),
    ("44", 38, 75),
    ("45", 46, 124),
    ("46", 35, 35),
    ("47", 33, 99),
    ("48", 31, 150),
    ("49", 29, 75),
    ("50", 30, 150),
    ("51", 40, 100),
    ("53", 49, 98),
    ("54", 17, 100),
    ("55", 33, 99),
    ("56", 31, 62),
];

/// DC ward GEOIDs.
const DC_WARDS: &[&str] = &["1101", "1102", "1103", "1104", "1105", "1106", "1107", "1108"];

/// Lookup interface over the embedded tables.
#[derive(Debug, Clone, Copy, Default)]
pub struct CanonicalReference;

impl CanonicalReference {
    /// The canonical GEOID set for `(layer, state)`, or `None` when the
    /// reference has no list for that combination (places, precincts,
    /// school districts vary too much to embed).
    #[must_use]
    pub fn geoids(layer: BoundaryType, state_fips: &str) -> Option<Vec<String>> {
        match layer {
            BoundaryType::CongressionalDistrict => cd_geoids(state_fips),
            BoundaryType::County => county_geoids(state_fips),
            BoundaryType::StateLegislativeUpper => sld_geoids(state_fips, true),
            BoundaryType::StateLegislativeLower => sld_geoids(state_fips, false),
            BoundaryType::Ward if state_fips == "11" => {
                Some(DC_WARDS.iter().map(|w| (*w).to_owned()).collect())
            }
            _ => None,
        }
    }

    /// Union of the canonical sets for a layer across every jurisdiction.
    #[must_use]
    pub fn nationwide(layer: BoundaryType) -> Vec<String> {
        let mut all = Vec::new();
        for jurisdiction in JURISDICTIONS {
            if let Some(mut geoids) = Self::geoids(layer, jurisdiction.fips) {
                all.append(&mut geoids);
            }
        }
        all.sort();
        all
    }
}

fn cd_geoids(state_fips: &str) -> Option<Vec<String>> {
    if state_fips == "11" {
        return Some(vec![DC_DELEGATE.to_owned()]);
    }
    if TERRITORY_FIPS.contains(&state_fips) {
        return Some(vec![format!("{state_fips}00")]);
    }
    let (_, seats) = CD_SEATS.iter().find(|(fips, _)| *fips == state_fips)?;
    if *seats == 1 {
        Some(vec![format!("{state_fips}00")])
    } else {
        Some(
            (1..=*seats)
                .map(|district| format!("{state_fips}{district:02}"))
                .collect(),
        )
    }
}

fn county_geoids(state_fips: &str) -> Option<Vec<String>> {
    if state_fips == "09" {
        return Some(CT_PLANNING_REGIONS.iter().map(|c| (*c).to_owned()).collect());
    }
    if state_fips == "11" {
        return Some(vec!["11001".to_owned()]);
    }
    let (_, count, cities) = COUNTY_COUNTS
        .iter()
        .find(|(fips, _, _)| *fips == state_fips)?;
    let regular = count - cities.len() as u16;
    let mut geoids: Vec<String> = (0..regular)
        .map(|index| format!("{state_fips}{:03}", 2 * index + 1))
        .collect();
    geoids.extend(cities.iter().map(|code| format!("{state_fips}{code}")));
    geoids.sort();
    Some(geoids)
}

fn sld_geoids(state_fips: &str, upper: bool) -> Option<Vec<String>> {
    let (_, sldu, sldl) = SLD_SEATS.iter().find(|(fips, _, _)| *fips == state_fips)?;
    let seats = if upper { *sldu } else { *sldl };
    if seats == 0 {
        return None;
    }
    Some(
        (1..=seats)
            .map(|district| format!("{state_fips}{district:03}"))
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cd_total_is_441() {
        let all = CanonicalReference::nationwide(BoundaryType::CongressionalDistrict);
        assert_eq!(all.len(), 441);
    }

    #[test]
    fn county_total_is_3235() {
        let all = CanonicalReference::nationwide(BoundaryType::County);
        assert_eq!(all.len(), 3235);
    }

    #[test]
    fn voting_seats_total_435() {
        let seats: u16 = CD_SEATS.iter().map(|(_, n)| n).sum();
        assert_eq!(seats, 435);
    }

    #[test]
    fn wisconsin_has_eight_districts() {
        let wi = CanonicalReference::geoids(BoundaryType::CongressionalDistrict, "55").unwrap();
        assert_eq!(wi.len(), 8);
        assert_eq!(wi.first().unwrap(), "5501");
        assert_eq!(wi.last().unwrap(), "5508");
    }

    #[test]
    fn alabama_runs_0101_through_0107() {
        let al = CanonicalReference::geoids(BoundaryType::CongressionalDistrict, "01").unwrap();
        assert_eq!(
            al,
            vec!["0101", "0102", "0103", "0104", "0105", "0106", "0107"]
        );
    }

    #[test]
    fn at_large_states_use_00() {
        for fips in ["02", "10", "38", "46", "50", "56"] {
            let cds = CanonicalReference::geoids(BoundaryType::CongressionalDistrict, fips)
                .unwrap();
            assert_eq!(cds, vec![format!("{fips}00")]);
        }
    }

    #[test]
    fn dc_delegate_is_1198() {
        let dc = CanonicalReference::geoids(BoundaryType::CongressionalDistrict, "11").unwrap();
        assert_eq!(dc, vec!["1198"]);
    }

    #[test]
    fn territorial_delegates_use_00() {
        for fips in ["60", "66", "69", "72", "78"] {
            let cds = CanonicalReference::geoids(BoundaryType::CongressionalDistrict, fips)
                .unwrap();
            assert_eq!(cds, vec![format!("{fips}00")]);
        }
    }

    #[test]
    fn connecticut_counties_are_planning_regions() {
        let ct = CanonicalReference::geoids(BoundaryType::County, "09").unwrap();
        assert_eq!(ct.len(), 9);
        assert!(ct.contains(&"09110".to_owned()));
        assert!(ct.contains(&"09190".to_owned()));
        assert!(!ct.contains(&"09001".to_owned()));
    }

    #[test]
    fn virginia_includes_independent_cities() {
        let va = CanonicalReference::geoids(BoundaryType::County, "51").unwrap();
        assert_eq!(va.len(), 133);
        assert!(va.contains(&"51510".to_owned()));
        assert!(va.contains(&"51840".to_owned()));
    }

    #[test]
    fn california_has_58_counties() {
        let ca = CanonicalReference::geoids(BoundaryType::County, "06").unwrap();
        assert_eq!(ca.len(), 58);
        assert!(ca.contains(&"06037".to_owned()));
    }

    #[test]
    fn nebraska_has_no_lower_chamber() {
        assert!(CanonicalReference::geoids(BoundaryType::StateLegislativeUpper, "31").is_some());
        assert!(CanonicalReference::geoids(BoundaryType::StateLegislativeLower, "31").is_none());
    }

    #[test]
    fn dc_wards_enumerate() {
        let wards = CanonicalReference::geoids(BoundaryType::Ward, "11").unwrap();
        assert_eq!(wards.len(), 8);
        assert!(CanonicalReference::geoids(BoundaryType::Ward, "06").is_none());
    }

    #[test]
    fn unlisted_layers_have_no_reference() {
        assert!(CanonicalReference::geoids(BoundaryType::Place, "06").is_none());
        assert!(CanonicalReference::geoids(BoundaryType::VotingPrecinct, "55").is_none());
    }

    #[test]
    fn all_geoids_pass_their_layout() {
        use atlas_core::geoid::validate_geoid;
        for layer in [
            BoundaryType::CongressionalDistrict,
            BoundaryType::County,
            BoundaryType::StateLegislativeUpper,
            BoundaryType::StateLegislativeLower,
        ] {
            for geoid_value in CanonicalReference::nationwide(layer) {
                assert!(
                    validate_geoid(layer, &geoid_value).is_ok(),
                    "{layer}: {geoid_value}"
                );
            }
        }
    }
}
