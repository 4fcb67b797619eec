// SPDX-License-Identifier: MIT OR Apache-2.0
//! District of Columbia wards.
//!
//! DC is the one jurisdiction whose ward layer the pipeline commits at
//! the municipal-official authority: the council publishes its own
//! polygons through the city GIS portal, GeoJSON out of the box in WGS84.
//! Ward GEOIDs are `11WW` — the DC state FIPS plus the zero-padded ward
//! number.

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

const DEFAULT_ENDPOINT: &str = "https://maps2.dcgis.dc.gov/dcgis/rest/services/DCGIS_DATA/Administrative_Other_Boundaries_WebMercator/MapServer/31/query?where=1%3D1&outFields=*&outSR=4326&f=geojson";

const LAYERS: &[BoundaryType] = &[BoundaryType::Ward];

/// Provider for the DC council ward polygons.
pub struct DcWardsProvider {
    fetcher: Fetcher,
    endpoint: String,
}

impl DcWardsProvider {
    /// Create a provider against the production DC GIS portal.
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
}

#[async_trait]
impl BoundaryProvider for DcWardsProvider {
    fn name(&self) -> &str {
        "dc-wards"
    }

    fn supported_layers(&self) -> &[BoundaryType] {
        LAYERS
    }

    fn metadata(&self) -> ProviderMetadata {
        ProviderMetadata {
            name: "dc-wards".into(),
            source: self.endpoint.clone(),
            license: "CC0".into(),
            update_schedule: UpdateSchedule::AdHoc,
            administrative_levels: vec![AdministrativeLevel::Municipal],
        }
    }

    async fn download(
        &self,
        layer: BoundaryType,
        region: Option<&str>,
        opts: &FetchOptions,
        cancel: &CancellationToken,
    ) -> AtlasResult<Vec<RawAsset>> {
        if layer != BoundaryType::Ward {
            return Err(AtlasError::InvalidArgument {
                reason: format!("dc-wards serves only wards, not {layer}"),
            });
        }
        if let Some(region) = region {
            if region != "11" {
                return Err(AtlasError::InvalidArgument {
                    reason: format!("dc-wards covers DC (11), not {region}"),
                });
            }
        }
        let key = CacheKey {
            provider: "dc-wards".into(),
            layer,
            region: Some("11".into()),
            vintage: opts.vintage,
        };
        let asset = self.fetcher.fetch(&key, &self.endpoint, opts, cancel).await?;
        Ok(vec![asset])
    }

    fn transform(&self, layer: BoundaryType, assets: &[RawAsset]) -> AtlasResult<Vec<Boundary>> {
        if layer != BoundaryType::Ward {
            return Err(AtlasError::InvalidArgument {
                reason: format!("dc-wards serves only wards, not {layer}"),
            });
        }
        let metadata = self.metadata();
        let mut boundaries = Vec::new();
        for asset in assets {
            for (properties, geometry) in parse_feature_collection("dc-wards", &asset.bytes)? {
                let ward = string_property("dc-wards", &properties, &["WARD", "WARD_ID"])?;
                let number: u8 = ward.parse().map_err(|_| AtlasError::Schema {
                    provider: "dc-wards".into(),
                    reason: format!("ward `{ward}` is not a number"),
                })?;
                boundaries.push(Boundary {
                    id: format!("11{number:02}"),
                    boundary_type: BoundaryType::Ward,
                    level: AdministrativeLevel::Municipal,
                    geometry,
                    authority: Authority::MunicipalOfficial,
                    source: Some(provenance_for(
                        &metadata,
                        asset,
                        opts_vintage(asset),
                        AdministrativeLevel::Municipal,
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
        // The portal exposes no vintage metadata; a reachable endpoint is
        // all we can establish.
        match self.fetcher.probe(&self.endpoint, cancel).await? {
            200 => Ok(UpdateStatus::Unknown),
            status => Err(AtlasError::from_http_status(&self.endpoint, status)),
        }
    }
}

fn opts_vintage(asset: &RawAsset) -> u16 {
    use chrono::Datelike;
    asset.retrieved_at.year() as u16
}
