// SPDX-License-Identifier: MIT OR Apache-2.0
//! Generic Socrata portal provider.
//!
//! Socrata portals expose datasets as `/resource/{id}.geojson`. Like the
//! ArcGIS provider, one instance serves one configured dataset and runs
//! the portal's schema through a field mapper.

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

/// Rows requested per page; municipal district tables fit in one.
const PAGE_LIMIT: u32 = 50_000;

/// Configuration for one Socrata dataset.
pub struct SocrataDataset {
    /// Registry name, e.g. `"chicago-wards"`.
    pub name: String,
    /// Portal domain, e.g. `"data.cityofchicago.org"`.
    pub domain: String,
    /// Four-by-four dataset id, e.g. `"p293-wvbd"`.
    pub dataset_id: String,
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

/// Provider for one Socrata dataset.
pub struct SocrataProvider {
    fetcher: Fetcher,
    dataset: SocrataDataset,
    layers: [BoundaryType; 1],
    base_url: String,
}

impl SocrataProvider {
    /// Create a provider for a configured dataset.
    #[must_use]
    pub fn new(fetcher: Fetcher, dataset: SocrataDataset) -> Self {
        let base_url = format!("https://{}", dataset.domain);
        Self::with_base_url(fetcher, dataset, base_url)
    }

    /// Create a provider against an alternate base URL (tests).
    #[must_use]
    pub fn with_base_url(
        fetcher: Fetcher,
        dataset: SocrataDataset,
        base_url: impl Into<String>,
    ) -> Self {
        let layers = [dataset.layer];
        Self {
            fetcher,
            dataset,
            layers,
            base_url: base_url.into().trim_end_matches('/').to_owned(),
        }
    }

    fn resource_url(&self) -> String {
        format!(
            "{}/resource/{}.geojson?$limit={PAGE_LIMIT}",
            self.base_url, self.dataset.dataset_id
        )
    }

    fn check_layer(&self, layer: BoundaryType) -> AtlasResult<()> {
        if layer != self.dataset.layer {
            return Err(AtlasError::InvalidArgument {
                reason: format!(
                    "{} serves {}, not {layer}",
                    self.dataset.name, self.dataset.layer
                ),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl BoundaryProvider for SocrataProvider {
    fn name(&self) -> &str {
        &self.dataset.name
    }

    fn supported_layers(&self) -> &[BoundaryType] {
        &self.layers
    }

    fn metadata(&self) -> ProviderMetadata {
        ProviderMetadata {
            name: self.dataset.name.clone(),
            source: self.resource_url(),
            license: self.dataset.license.clone(),
            update_schedule: UpdateSchedule::AdHoc,
            administrative_levels: vec![self.dataset.level],
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
            if region != self.dataset.region {
                return Err(AtlasError::InvalidArgument {
                    reason: format!(
                        "{} covers state {}, not {region}",
                        self.dataset.name, self.dataset.region
                    ),
                });
            }
        }
        let key = CacheKey {
            provider: self.dataset.name.clone(),
            layer,
            region: Some(self.dataset.region.clone()),
            vintage: opts.vintage,
        };
        let asset = self
            .fetcher
            .fetch(&key, &self.resource_url(), opts, cancel)
            .await?;
        Ok(vec![asset])
    }

    fn transform(&self, layer: BoundaryType, assets: &[RawAsset]) -> AtlasResult<Vec<Boundary>> {
        self.check_layer(layer)?;
        let metadata = self.metadata();
        let mut boundaries = Vec::new();
        for asset in assets {
            for (properties, geometry) in
                parse_feature_collection(&self.dataset.name, &asset.bytes)?
            {
                let Some(mapped) = self.dataset.mapper.apply(&properties)? else {
                    continue;
                };
                let id = string_property(&self.dataset.name, &mapped, &["GEOID"])?;
                geoid::validate_geoid(layer, &id).map_err(|_| AtlasError::Schema {
                    provider: self.dataset.name.clone(),
                    reason: format!("mapped GEOID `{id}` does not match the {layer} layout"),
                })?;
                boundaries.push(Boundary {
                    id,
                    boundary_type: layer,
                    level: self.dataset.level,
                    geometry,
                    authority: self.dataset.authority,
                    source: Some(provenance_for(
                        &metadata,
                        asset,
                        asset.retrieved_at.year() as u16,
                        self.dataset.level,
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
        match self.fetcher.probe(&self.resource_url(), cancel).await? {
            200 => Ok(UpdateStatus::Unknown),
            status => Err(AtlasError::from_http_status(&self.resource_url(), status)),
        }
    }
}
