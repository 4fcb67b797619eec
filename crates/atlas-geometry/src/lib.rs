// SPDX-License-Identifier: MIT OR Apache-2.0
//! atlas-geometry
#![deny(unsafe_code)]
#![warn(missing_docs)]
//!
//! Geometry plumbing for Shadow Atlas: the canonical WKB form every
//! geometry hash is computed over, OGC simple-feature validity checks, and
//! spherical-excess areas for the tessellation proof.
//!
//! The canonical WKB form is normative. Two geometrically identical
//! polygons that differ only in floating-point noise, ring orientation,
//! ring starting vertex, or polygon order must serialize to the same
//! bytes.

/// Spherical-excess area and polygon boolean-op helpers.
pub mod area;
/// OGC simple-feature validity checks.
pub mod validity;
/// Canonical WKB encoding.
pub mod wkb;

pub use area::{intersection_area_m2, outside_area_m2, union_all, unsigned_area_m2};
pub use validity::{ValidityReport, check_validity};
pub use wkb::{QUANTUM_DEGREES, canonical_wkb, quantize};
