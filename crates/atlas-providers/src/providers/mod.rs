// SPDX-License-Identifier: MIT OR Apache-2.0
//! Provider implementations.
//!
//! Each provider speaks for one class of upstream: TIGER/Line for the
//! federally mandated layers, the DC open-data portal for wards, generic
//! ArcGIS and Socrata portals for municipal layers, a local shapefile
//! directory for offline fixtures, and the Connecticut ESA feed for the
//! 2022 planning-region county-equivalents.

/// Generic municipal ArcGIS REST provider.
pub mod arcgis;
/// Shared decoding helpers.
pub(crate) mod common;
/// Connecticut planning-region county-equivalents.
pub mod ct_esa;
/// District of Columbia wards.
pub mod dc_wards;
/// Local shapefile directories (offline fixtures, agency drops).
pub mod shapefile_dir;
/// Generic Socrata portal provider.
pub mod socrata;
/// Census TIGER/Line.
pub mod tiger;

pub use arcgis::MunicipalArcGisProvider;
pub use ct_esa::ConnecticutEsaProvider;
pub use dc_wards::DcWardsProvider;
pub use shapefile_dir::ShapefileProvider;
pub use socrata::SocrataProvider;
pub use tiger::TigerProvider;
