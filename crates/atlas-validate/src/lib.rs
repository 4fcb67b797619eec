// SPDX-License-Identifier: MIT OR Apache-2.0
//! atlas-validate
#![deny(unsafe_code)]
#![warn(missing_docs)]
//!
//! The multi-layer validator: GEOID completeness against embedded
//! canonical reference lists, the four-axiom tessellation proof against
//! ground-truth jurisdiction polygons, redistricting-gap detection against
//! the state finalization calendar, and the composite quality score.

/// Redistricting calendar and gap detection.
pub mod calendar;
/// GEOID completeness against the canonical reference.
pub mod completeness;
/// Per-layer validation assembly and quality scoring.
pub mod quality;
/// Embedded canonical GEOID reference data.
pub mod reference;
/// Municipal ground-truth resolver and authoritative overrides.
pub mod resolver;
/// The four-axiom tessellation proof.
pub mod tessellation;

pub use calendar::{RedistrictingCalendar, StateCalendarEntry};
pub use completeness::check_completeness;
pub use quality::{LayerValidator, TessellationScope, ValidationContext};
pub use reference::{CanonicalReference, REFERENCE_VINTAGE};
pub use resolver::{AuthoritativeBoundary, MunicipalBoundaryResolver};
pub use tessellation::{TessellationInput, TessellationTolerances, prove_tessellation};
