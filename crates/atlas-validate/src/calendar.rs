// SPDX-License-Identifier: MIT OR Apache-2.0

//! Redistricting calendar and gap detection.
//!
//! After a redistricting cycle every state goes through a window where
//! its new maps are legally in effect but the covering TIGER vintage has
//! not shipped yet. Committing TIGER data inside that window would commit
//! the *old* districts, so the validator attaches a `use-primary`
//! advisory naming both dates. The advisory never downgrades validity.
//!
//! Dates are the 2020-cycle snapshot: when each state's congressional and
//! legislative maps took effect, and when the first TIGER vintage
//! carrying them was published.

use atlas_core::report::GapWarning;
use atlas_core::BoundaryType;
use chrono::NaiveDate;

/// One state's calendar row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateCalendarEntry {
    /// State FIPS.
    pub state_fips: &'static str,
    /// When the post-census maps took legal effect.
    pub finalization: NaiveDate,
    /// When the TIGER vintage carrying them was published.
    pub tiger_publication: NaiveDate,
    /// Maps under active court challenge at snapshot time.
    pub court_challenges: bool,
}

const fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    match NaiveDate::from_ymd_opt(year, month, day) {
        Some(d) => d,
        None => panic!("invalid calendar date"),
    }
}

/// TIGER2022 (the first vintage with 118th-Congress districts) landed in
/// late summer 2022; states that finalized after its cutoff waited for
/// TIGER2023.
const TIGER_2022: NaiveDate = date(2022, 8, 1);
const TIGER_2023: NaiveDate = date(2023, 9, 15);

/// 2020-cycle finalization snapshot.
///
/// States missing from this table finalized before TIGER2022's cutoff
/// and were never in-gap for that vintage.
const CALENDAR: &[StateCalendarEntry] = &[
    StateCalendarEntry {
        state_fips: "01",
        finalization: date(2021, 11, 4),
        tiger_publication: TIGER_2022,
        court_challenges: true, // Allen v. Milligan
    },
    StateCalendarEntry {
        state_fips: "06",
        finalization: date(2021, 12, 27),
        tiger_publication: TIGER_2022,
        court_challenges: false,
    },
    StateCalendarEntry {
        state_fips: "12",
        finalization: date(2022, 4, 22),
        tiger_publication: TIGER_2022,
        court_challenges: true,
    },
    StateCalendarEntry {
        state_fips: "13",
        finalization: date(2021, 12, 30),
        tiger_publication: TIGER_2022,
        court_challenges: true,
    },
    StateCalendarEntry {
        state_fips: "17",
        finalization: date(2021, 11, 23),
        tiger_publication: TIGER_2022,
        court_challenges: false,
    },
    StateCalendarEntry {
        state_fips: "22",
        finalization: date(2022, 3, 30),
        tiger_publication: TIGER_2022,
        court_challenges: true,
    },
    StateCalendarEntry {
        state_fips: "24",
        finalization: date(2022, 4, 4),
        tiger_publication: TIGER_2022,
        court_challenges: false,
    },
    StateCalendarEntry {
        state_fips: "34",
        finalization: date(2021, 12, 22),
        tiger_publication: TIGER_2022,
        court_challenges: false,
    },
    StateCalendarEntry {
        state_fips: "36",
        finalization: date(2022, 5, 21),
        tiger_publication: TIGER_2022,
        court_challenges: true,
    },
    StateCalendarEntry {
        state_fips: "37",
        // The remedial 2022 map; redrawn again for 2024.
        finalization: date(2022, 2, 23),
        tiger_publication: TIGER_2022,
        court_challenges: true,
    },
    StateCalendarEntry {
        state_fips: "39",
        finalization: date(2022, 3, 2),
        tiger_publication: TIGER_2022,
        court_challenges: true,
    },
    StateCalendarEntry {
        state_fips: "42",
        finalization: date(2022, 2, 23),
        tiger_publication: TIGER_2022,
        court_challenges: false,
    },
    StateCalendarEntry {
        state_fips: "45",
        finalization: date(2022, 1, 26),
        tiger_publication: TIGER_2023,
        court_challenges: true,
    },
    StateCalendarEntry {
        state_fips: "48",
        finalization: date(2021, 10, 25),
        tiger_publication: TIGER_2022,
        court_challenges: true,
    },
    StateCalendarEntry {
        state_fips: "55",
        finalization: date(2022, 4, 15),
        tiger_publication: TIGER_2022,
        court_challenges: true,
    },
];

/// Lookup interface over the embedded calendar.
#[derive(Debug, Clone, Copy, Default)]
pub struct RedistrictingCalendar;

impl RedistrictingCalendar {
    /// The calendar row for a state, if it had a tracked gap window.
    #[must_use]
    pub fn entry(state_fips: &str) -> Option<&'static StateCalendarEntry> {
        CALENDAR.iter().find(|e| e.state_fips == state_fips)
    }

    /// `true` iff `(layer, state)` is inside its gap window on `today`.
    ///
    /// Only legislative layers are ever gap-checked.
    #[must_use]
    pub fn is_in_gap(layer: BoundaryType, state_fips: &str, today: NaiveDate) -> bool {
        if !layer.is_legislative() {
            return false;
        }
        Self::entry(state_fips)
            .is_some_and(|e| e.finalization <= today && today < e.tiger_publication)
    }

    /// The advisory for `(layer, state)` on `today`, when in-gap.
    #[must_use]
    pub fn gap_warning(
        layer: BoundaryType,
        state_fips: &str,
        today: NaiveDate,
    ) -> Option<GapWarning> {
        if !Self::is_in_gap(layer, state_fips, today) {
            return None;
        }
        let entry = Self::entry(state_fips)?;
        let mut reasoning = format!(
            "maps for {layer} in state {state_fips} took effect {} but the covering TIGER vintage \
             does not publish until {}; TIGER currently carries the pre-redistricting boundaries",
            entry.finalization, entry.tiger_publication
        );
        if entry.court_challenges {
            reasoning.push_str("; the maps are also under active court challenge");
        }
        Some(GapWarning {
            gap_type: "post-finalization-pre-tiger".to_owned(),
            finalization_date: entry.finalization,
            tiger_publication_date: entry.tiger_publication,
            court_challenges: entry.court_challenges,
            recommendation: "use-primary".to_owned(),
            reasoning,
        })
    }
}
