// SPDX-License-Identifier: MIT OR Apache-2.0
//! Generic municipal ArcGIS REST provider.
//!
//! Most city open-data portals sit on ArcGIS feature services that can
//! emit GeoJSON directly (`f=geojson&outSR=4326`). One provider instance
//! is configured per portal dataset; the declarative field mapper turns
//! that portal's attribute schema into the canonical `GEOID` property.

use crate::cancel::CancellationToken;
use crate::cache::CacheKey;
use crate::fetch::{FetchOptions, Fetcher, RawAsset};
use crate::mapper::FieldMapper;
use crate::provider::{
    BoundaryProvider, ProviderMetadata, UpdateSchedule, UpdateStatus,
};
use crate::providers::common::{parse_feature_collection, provenance_for, string_property};
use async_trait::async_trait;
use atlas_core::{
    AdministrativeLevel, AtlasError, AtlasResult, Authority, Boundary, BoundaryType,
    LegalStatus, geoid,
};
use chrono::Datelike;
use tracing::debug;

/// One portal dataset this provider serves.
pub struct PortalTarget {
    /// Registry name, e.g. `"chicago-wards"`.
    pub name: String,
    /// Full query URL returning a GeoJSON FeatureCollection in WGS84.
    pub query_url: String,
    /// Layer the dataset represents.
    pub layer: BoundaryType,
    /// Authority of the publisher.
    pub authority: Authority,
    /// Administrative level of the boundaries.
    pub level: AdministrativeLevel,
    /// Declared license.
    pub license: String,
    /// Region (state FIPS) the dataset belongs to.
    pub region: String,
    /// Property mapper; must yield a `GEOID` property.
    pub mapper: FieldMapper,
}

/// Provider for one municipal ArcGIS dataset.
pub struct MunicipalArcGisProvider {
    fetcher: Fetcher,
    target: PortalTarget,
    layers: [BoundaryType; 1],
}

impl MunicipalArcGisProvider {
    /// Create a provider for a configured portal dataset.
    #[must_use]
    pub fn new(fetcher: Fetcher, target: PortalTarget) -> Self {
        let layers = [target.layer];
        Self {
            fetcher,
            target,
            layers,
        }
    }

    fn check_layer(&self, layer: BoundaryType) -> AtlasResult<()> {
        if layer != self.target.layer {
            return Err(AtlasError::InvalidArgument {
                reason: format!("{} serves {}, not {layer}", self.target.name, self.target.layer),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl BoundaryProvider for MunicipalArcGisProvider {
    fn name(&self) -> &str {
        &self.target.name
    }

    fn supported_layers(&self) -> &[BoundaryType] {
        &self.layers
    }

    fn metadata(&self) -> ProviderMetadata {
        ProviderMetadata {
            name: self.target.name.clone(),
            source: self.target.query_url.clone(),
            license: self.target.license.clone(),
            update_schedule: UpdateSchedule::AdHoc,
            administrative_levels: vec![self.target.level],
        }
    }

    async fn download(
        &self,
        layer: BoundaryType,
        region: Option<&str>,
        opts: &FetchOptions,
        cancel: &CancellationToken,
    ) -> AtlasResult<Vec<RawAsset>> {
        self.check_layer(layer)?;
        if let Some(region) = region {
            if region != self.target.region {
                return Err(AtlasError::InvalidArgument {
                    reason: format!(
                        "{} covers state {}, not {region}",
                        self.target.name, self.target.region
                    ),
                });
            }
        }
        let key = CacheKey {
            provider: self.target.name.clone(),
            layer,
            region: Some(self.target.region.clone()),
            vintage: opts.vintage,
        };
        let asset = self
            .fetcher
            .fetch(&key, &self.target.query_url, opts, cancel)
            .await?;
        Ok(vec![asset])
    }

    fn transform(&self, layer: BoundaryType, assets: &[RawAsset]) -> AtlasResult<Vec<Boundary>> {
        self.check_layer(layer)?;
        let metadata = self.metadata();
        let mut boundaries = Vec::new();
        let mut skipped = 0usize;
        for asset in assets {
            for (properties, geometry) in
                parse_feature_collection(&self.target.name, &asset.bytes)?
            {
                let Some(mapped) = self.target.mapper.apply(&properties)? else {
                    skipped += 1;
                    continue;
                };
                let id = string_property(&self.target.name, &mapped, &["GEOID"])?;
                geoid::validate_geoid(layer, &id).map_err(|_| AtlasError::Schema {
                    provider: self.target.name.clone(),
                    reason: format!("mapped GEOID `{id}` does not match the {layer} layout"),
                })?;
                boundaries.push(Boundary {
                    id,
                    boundary_type: layer,
                    level: self.target.level,
                    geometry,
                    authority: self.target.authority,
                    source: Some(provenance_for(
                        &metadata,
                        asset,
                        asset.retrieved_at.year() as u16,
                        self.target.level,
                        LegalStatus::Official,
                    )),
                });
            }
        }
        if skipped > 0 {
            debug!(
                target: "atlas.provider",
                provider = %self.target.name,
                skipped,
                "soft-skipped unmappable records"
            );
        }
        Ok(boundaries)
    }

    async fn check_for_updates(
        &self,
        _opts: &FetchOptions,
        cancel: &CancellationToken,
    ) -> AtlasResult<UpdateStatus> {
        match self.fetcher.probe(&self.target.query_url, cancel).await? {
            200 => Ok(UpdateStatus::Unknown),
            status => Err(AtlasError::from_http_status(&self.target.query_url, status)),
        }
    }
}
