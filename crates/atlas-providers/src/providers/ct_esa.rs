// SPDX-License-Identifier: MIT OR Apache-2.0
//! Connecticut planning-region county-equivalents.
//!
//! Connecticut retired its eight counties as governmental units in 2022;
//! the Census now recognizes nine Councils of Governments planning
//! regions as county-equivalents with new `091xx` FIPS codes. The state's
//! open-data portal publishes the region polygons ahead of TIGER, so this
//! provider fills the window where TIGER still ships the old counties.

use crate::cancel::CancellationToken;
use crate::cache::CacheKey;
use crate::fetch::{FetchOptions, Fetcher, RawAsset};
use crate::provider::{
    BoundaryProvider, ProviderMetadata, UpdateSchedule, UpdateStatus,
};
use crate::providers::common::{parse_feature_collection, provenance_for, string_property};
use async_trait::async_trait;
use atlas_core::{
    AdministrativeLevel, AtlasError, AtlasResult, Authority, Boundary, BoundaryType,
    LegalStatus,
};
use chrono::Datelike;

const DEFAULT_ENDPOINT: &str = "https://data.ct.gov/resource/planning-regions.geojson?$limit=50";

const LAYERS: &[BoundaryType] = &[BoundaryType::County];

/// The nine planning regions and their 2022 county-equivalent FIPS codes.
const PLANNING_REGIONS: &[(&str, &str)] = &[
    ("Capitol", "09110"),
    ("Greater Bridgeport", "09120"),
    ("Lower Connecticut River Valley", "09130"),
    ("Naugatuck Valley", "09140"),
    ("Northeastern Connecticut", "09150"),
    ("Northwest Hills", "09160"),
    ("South Central Connecticut", "09170"),
    ("Southeastern Connecticut", "09180"),
    ("Western Connecticut", "09190"),
];

/// Provider for the Connecticut planning-region feed.
pub struct ConnecticutEsaProvider {
    fetcher: Fetcher,
    endpoint: String,
}

impl ConnecticutEsaProvider {
    /// Create a provider against the production state portal.
    #[must_use]
    pub fn new(fetcher: Fetcher) -> Self {
        Self::with_endpoint(fetcher, DEFAULT_ENDPOINT)
    }

    /// Create a provider against an alternate endpoint (tests).
    #[must_use]
    pub fn with_endpoint(fetcher: Fetcher, endpoint: impl Into<String>) -> Self {
        Self {
            fetcher,
            endpoint: endpoint.into(),
        }
    }

    /// FIPS code for a planning-region name, tolerant of case and the
    /// optional "Planning Region" suffix.
    #[must_use]
    pub fn region_fips(name: &str) -> Option<&'static str> {
        let cleaned = name
            .trim()
            .trim_end_matches("Planning Region")
            .trim_end_matches("COG")
            .trim();
        PLANNING_REGIONS
            .iter()
            .find(|(region, _)| region.eq_ignore_ascii_case(cleaned))
            .map(|(_, fips)| *fips)
    }
}

#[async_trait]
impl BoundaryProvider for ConnecticutEsaProvider {
    fn name(&self) -> &str {
        "ct-esa"
    }

    fn supported_layers(&self) -> &[BoundaryType] {
        LAYERS
    }

    fn metadata(&self) -> ProviderMetadata {
        ProviderMetadata {
            name: "ct-esa".into(),
            source: self.endpoint.clone(),
            license: "public-domain".into(),
            update_schedule: UpdateSchedule::AdHoc,
            administrative_levels: vec![AdministrativeLevel::State],
        }
    }

    async fn download(
        &self,
        layer: BoundaryType,
        region: Option<&str>,
        opts: &FetchOptions,
        cancel: &CancellationToken,
    ) -> AtlasResult<Vec<RawAsset>> {
        if layer != BoundaryType::County {
            return Err(AtlasError::InvalidArgument {
                reason: format!("ct-esa serves county-equivalents, not {layer}"),
            });
        }
        if let Some(region) = region {
            if region != "09" {
                return Err(AtlasError::InvalidArgument {
                    reason: format!("ct-esa covers Connecticut (09), not {region}"),
                });
            }
        }
        let key = CacheKey {
            provider: "ct-esa".into(),
            layer,
            region: Some("09".into()),
            vintage: opts.vintage,
        };
        let asset = self.fetcher.fetch(&key, &self.endpoint, opts, cancel).await?;
        Ok(vec![asset])
    }

    fn transform(&self, layer: BoundaryType, assets: &[RawAsset]) -> AtlasResult<Vec<Boundary>> {
        if layer != BoundaryType::County {
            return Err(AtlasError::InvalidArgument {
                reason: format!("ct-esa serves county-equivalents, not {layer}"),
            });
        }
        let metadata = self.metadata();
        let mut boundaries = Vec::new();
        for asset in assets {
            for (properties, geometry) in parse_feature_collection("ct-esa", &asset.bytes)? {
                let name = string_property(
                    "ct-esa",
                    &properties,
                    &["PlanningRegion", "planning_region", "NAME", "name"],
                )?;
                let fips = Self::region_fips(&name).ok_or_else(|| AtlasError::Schema {
                    provider: "ct-esa".into(),
                    reason: format!("`{name}` is not a Connecticut planning region"),
                })?;
                boundaries.push(Boundary {
                    id: fips.to_owned(),
                    boundary_type: BoundaryType::County,
                    level: AdministrativeLevel::County,
                    geometry,
                    authority: Authority::StateOfficial,
                    source: Some(provenance_for(
                        &metadata,
                        asset,
                        asset.retrieved_at.year() as u16,
                        AdministrativeLevel::State,
                        LegalStatus::Official,
                    )),
                });
            }
        }
        Ok(boundaries)
    }

    async fn check_for_updates(
        &self,
        _opts: &FetchOptions,
        cancel: &CancellationToken,
    ) -> AtlasResult<UpdateStatus> {
        match self.fetcher.probe(&self.endpoint, cancel).await? {
            200 => Ok(UpdateStatus::Unknown),
            status => Err(AtlasError::from_http_status(&self.endpoint, status)),
        }
    }
}
