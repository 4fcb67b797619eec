// SPDX-License-Identifier: MIT OR Apache-2.0
//! Census TIGER/Line.
//!
//! The federally mandated baseline for every legislative and statistical
//! layer. Archives are zipped shapefiles laid out per vintage under
//! `TIGER{year}/{LAYER}/tl_{year}_{scope}_{suffix}.zip`; counties ship as
//! one national file, everything else per state.

use crate::cancel::CancellationToken;
use crate::cache::CacheKey;
use crate::fetch::{FetchOptions, Fetcher, RawAsset};
use crate::provider::{
    BoundaryProvider, ProviderMetadata, UpdateSchedule, UpdateStatus,
};
use crate::providers::common::provenance_for;
use async_trait::async_trait;
use atlas_core::{
    AdministrativeLevel, AtlasError, AtlasResult, Authority, Boundary, BoundaryType,
    LegalStatus, geoid,
};
use geo_types::MultiPolygon;
use std::io::{Cursor, Read};
use tracing::debug;

const DEFAULT_BASE: &str = "https://www2.census.gov/geo/tiger";

const LAYERS: &[BoundaryType] = &[
    BoundaryType::CongressionalDistrict,
    BoundaryType::StateLegislativeUpper,
    BoundaryType::StateLegislativeLower,
    BoundaryType::County,
    BoundaryType::Place,
    BoundaryType::VotingPrecinct,
    BoundaryType::SchoolUnified,
    BoundaryType::SchoolElementary,
    BoundaryType::SchoolSecondary,
];

/// Provider for TIGER/Line archives.
pub struct TigerProvider {
    fetcher: Fetcher,
    base_url: String,
}

impl TigerProvider {
    /// Create a provider against the production Census host.
    #[must_use]
    pub fn new(fetcher: Fetcher) -> Self {
        Self::with_base_url(fetcher, DEFAULT_BASE)
    }

    /// Create a provider against an alternate host (tests, mirrors).
    #[must_use]
    pub fn with_base_url(fetcher: Fetcher, base_url: impl Into<String>) -> Self {
        Self {
            fetcher,
            base_url: base_url.into().trim_end_matches('/').to_owned(),
        }
    }

    /// Congress number covered by a TIGER vintage.
    ///
    /// Vintages are bounded upstream by the build-request contract; the
    /// saturating arithmetic keeps a stray small year from wrapping.
    #[must_use]
    pub fn congress_for_vintage(vintage: u16) -> u16 {
        vintage.saturating_sub(1787) / 2
    }

    /// Archive path under the TIGER root for `(layer, region, vintage)`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` for a layer that needs a region when none
    /// was given.
    pub fn archive_path(
        layer: BoundaryType,
        region: Option<&str>,
        vintage: u16,
    ) -> AtlasResult<String> {
        let state = || {
            region.ok_or_else(|| AtlasError::InvalidArgument {
                reason: format!("TIGER {layer} archives are per-state; a region is required"),
            })
        };
        let path = match layer {
            BoundaryType::CongressionalDistrict => {
                let congress = Self::congress_for_vintage(vintage);
                format!("TIGER{vintage}/CD/tl_{vintage}_{}_cd{congress}.zip", state()?)
            }
            BoundaryType::StateLegislativeUpper => {
                format!("TIGER{vintage}/SLDU/tl_{vintage}_{}_sldu.zip", state()?)
            }
            BoundaryType::StateLegislativeLower => {
                format!("TIGER{vintage}/SLDL/tl_{vintage}_{}_sldl.zip", state()?)
            }
            BoundaryType::County => format!("TIGER{vintage}/COUNTY/tl_{vintage}_us_county.zip"),
            BoundaryType::Place => {
                format!("TIGER{vintage}/PLACE/tl_{vintage}_{}_place.zip", state()?)
            }
            BoundaryType::VotingPrecinct => {
                format!("TIGER{vintage}/VTD/tl_{vintage}_{}_vtd20.zip", state()?)
            }
            BoundaryType::SchoolUnified => {
                format!("TIGER{vintage}/UNSD/tl_{vintage}_{}_unsd.zip", state()?)
            }
            BoundaryType::SchoolElementary => {
                format!("TIGER{vintage}/ELSD/tl_{vintage}_{}_elsd.zip", state()?)
            }
            BoundaryType::SchoolSecondary => {
                format!("TIGER{vintage}/SCSD/tl_{vintage}_{}_scsd.zip", state()?)
            }
            other => {
                return Err(AtlasError::InvalidArgument {
                    reason: format!("TIGER does not publish {other}"),
                });
            }
        };
        Ok(path)
    }

    fn level_for(layer: BoundaryType) -> AdministrativeLevel {
        match layer {
            BoundaryType::CongressionalDistrict => AdministrativeLevel::Federal,
            BoundaryType::StateLegislativeUpper | BoundaryType::StateLegislativeLower => {
                AdministrativeLevel::State
            }
            BoundaryType::County | BoundaryType::VotingPrecinct => AdministrativeLevel::County,
            BoundaryType::Place => AdministrativeLevel::Municipal,
            _ => AdministrativeLevel::Special,
        }
    }
}

#[async_trait]
impl BoundaryProvider for TigerProvider {
    fn name(&self) -> &str {
        "tiger"
    }

    fn supported_layers(&self) -> &[BoundaryType] {
        LAYERS
    }

    fn metadata(&self) -> ProviderMetadata {
        ProviderMetadata {
            name: "tiger".into(),
            source: self.base_url.clone(),
            license: "public-domain".into(),
            update_schedule: UpdateSchedule::Annual,
            administrative_levels: vec![
                AdministrativeLevel::Federal,
                AdministrativeLevel::State,
                AdministrativeLevel::County,
                AdministrativeLevel::Municipal,
            ],
        }
    }

    async fn download(
        &self,
        layer: BoundaryType,
        region: Option<&str>,
        opts: &FetchOptions,
        cancel: &CancellationToken,
    ) -> AtlasResult<Vec<RawAsset>> {
        let path = Self::archive_path(layer, region, opts.vintage)?;
        let url = format!("{}/{path}", self.base_url);
        let key = CacheKey {
            provider: "tiger".into(),
            layer,
            region: region.map(str::to_owned),
            vintage: opts.vintage,
        };
        let asset = self.fetcher.fetch(&key, &url, opts, cancel).await?;
        Ok(vec![asset])
    }

    fn transform(&self, layer: BoundaryType, assets: &[RawAsset]) -> AtlasResult<Vec<Boundary>> {
        let metadata = self.metadata();
        let mut boundaries = Vec::new();
        for asset in assets {
            let records = read_zipped_shapefile("tiger", &asset.bytes)?;
            debug!(
                target: "atlas.provider",
                layer = %layer,
                records = records.len(),
                "decoded TIGER archive"
            );
            for (geoid_value, geometry) in records {
                // TIGER never omits GEOIDs; an id that fails its layout is
                // a schema problem worth failing loudly on.
                geoid::validate_geoid(layer, &geoid_value).map_err(|_| AtlasError::Schema {
                    provider: "tiger".into(),
                    reason: format!("GEOID `{geoid_value}` does not match the {layer} layout"),
                })?;
                boundaries.push(Boundary {
                    id: geoid_value,
                    boundary_type: layer,
                    level: Self::level_for(layer),
                    geometry,
                    authority: Authority::FederalMandate,
                    source: Some(provenance_for(
                        &metadata,
                        asset,
                        vintage_from_url(&asset.url),
                        AdministrativeLevel::Federal,
                        LegalStatus::Official,
                    )),
                });
            }
        }
        Ok(boundaries)
    }

    async fn check_for_updates(
        &self,
        opts: &FetchOptions,
        cancel: &CancellationToken,
    ) -> AtlasResult<UpdateStatus> {
        let next = opts.vintage + 1;
        let url = format!("{}/TIGER{next}/", self.base_url);
        match self.fetcher.probe(&url, cancel).await? {
            200 => Ok(UpdateStatus::UpdateAvailable(format!("TIGER{next}"))),
            404 => Ok(UpdateStatus::Current),
            _ => Ok(UpdateStatus::Unknown),
        }
    }
}

/// Extract `(GEOID, geometry)` pairs from a zipped shapefile archive.
pub(crate) fn read_zipped_shapefile(
    provider: &str,
    bytes: &[u8],
) -> AtlasResult<Vec<(String, MultiPolygon<f64>)>> {
    let mut archive =
        zip::ZipArchive::new(Cursor::new(bytes)).map_err(|e| AtlasError::Format {
            provider: provider.to_owned(),
            reason: format!("not a zip archive: {e}"),
        })?;

    let mut shp_bytes: Option<Vec<u8>> = None;
    let mut dbf_bytes: Option<Vec<u8>> = None;
    for index in 0..archive.len() {
        let mut entry = archive.by_index(index).map_err(|e| AtlasError::Format {
            provider: provider.to_owned(),
            reason: format!("unreadable zip entry: {e}"),
        })?;
        let name = entry.name().to_ascii_lowercase();
        let mut buffer = Vec::with_capacity(entry.size() as usize);
        entry
            .read_to_end(&mut buffer)
            .map_err(|e| AtlasError::Format {
                provider: provider.to_owned(),
                reason: format!("truncated zip entry: {e}"),
            })?;
        if name.ends_with(".shp") {
            shp_bytes = Some(buffer);
        } else if name.ends_with(".dbf") {
            dbf_bytes = Some(buffer);
        }
    }

    let shp = shp_bytes.ok_or_else(|| AtlasError::Schema {
        provider: provider.to_owned(),
        reason: "archive has no .shp member".into(),
    })?;
    let dbf = dbf_bytes.ok_or_else(|| AtlasError::Schema {
        provider: provider.to_owned(),
        reason: "archive has no .dbf member".into(),
    })?;

    read_shapefile_pair(provider, &shp, &dbf)
}

/// Decode a `.shp` + `.dbf` pair into `(GEOID, geometry)` records.
pub(crate) fn read_shapefile_pair(
    provider: &str,
    shp: &[u8],
    dbf: &[u8],
) -> AtlasResult<Vec<(String, MultiPolygon<f64>)>> {
    let shape_reader =
        shapefile::ShapeReader::new(Cursor::new(shp)).map_err(|e| AtlasError::Format {
            provider: provider.to_owned(),
            reason: format!("bad .shp: {e}"),
        })?;
    let dbase_reader =
        shapefile::dbase::Reader::new(Cursor::new(dbf)).map_err(|e| AtlasError::Format {
            provider: provider.to_owned(),
            reason: format!("bad .dbf: {e}"),
        })?;
    let mut reader = shapefile::Reader::new(shape_reader, dbase_reader);

    let mut records = Vec::new();
    for pair in reader.iter_shapes_and_records() {
        let (shape, record) = pair.map_err(|e| AtlasError::Format {
            provider: provider.to_owned(),
            reason: format!("unreadable shapefile record: {e}"),
        })?;
        let polygon = match shape {
            shapefile::Shape::Polygon(p) => p,
            shapefile::Shape::NullShape => continue,
            other => {
                return Err(AtlasError::Schema {
                    provider: provider.to_owned(),
                    reason: format!("expected polygons, found {}", other.shapetype()),
                });
            }
        };
        let geometry: MultiPolygon<f64> = polygon.into();
        let geoid_value =
            dbf_string(&record, &["GEOID", "GEOID20", "GEOID10"]).ok_or_else(|| {
                AtlasError::Schema {
                    provider: provider.to_owned(),
                    reason: "record has no GEOID attribute".into(),
                }
            })?;
        records.push((geoid_value, geometry));
    }
    Ok(records)
}

/// Recover the vintage year from a TIGER archive URL.
fn vintage_from_url(url: &str) -> u16 {
    url.split("TIGER")
        .nth(1)
        .and_then(|rest| rest.get(..4))
        .and_then(|year| year.parse().ok())
        .unwrap_or(0)
}

fn dbf_string(record: &shapefile::dbase::Record, names: &[&str]) -> Option<String> {
    for name in names {
        if let Some(shapefile::dbase::FieldValue::Character(Some(value))) = record.get(name) {
            let trimmed = value.trim();
            if !trimmed.is_empty() {
                return Some(trimmed.to_owned());
            }
        }
    }
    None
}
