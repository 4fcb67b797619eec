// SPDX-License-Identifier: MIT OR Apache-2.0
//! Local shapefile directories (offline fixtures, agency drops).
//!
//! Some authorities deliver data as shapefile archives on disk rather
//! than over HTTP — agency FTP drops, DVDs from county clerks, test
//! fixtures. This provider serves registered archives through the same
//! contract, stamping `file://` provenance so downstream code never
//! special-cases the transport.

use crate::cancel::CancellationToken;
use crate::fetch::{FetchOptions, RawAsset};
use crate::provider::{
    BoundaryProvider, ProviderMetadata, UpdateSchedule, UpdateStatus,
};
use crate::providers::common::provenance_for;
use crate::providers::tiger::read_zipped_shapefile;
use async_trait::async_trait;
use atlas_core::{
    AdministrativeLevel, AtlasError, AtlasResult, Authority, Boundary, BoundaryType,
    LegalStatus, geoid,
};
use chrono::{Timelike, Utc};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// A registered archive: the zip path plus the facts its records carry.
#[derive(Debug, Clone)]
pub struct RegisteredArchive {
    /// Path to the `.zip` holding `.shp`/`.dbf` members.
    pub path: PathBuf,
    /// Authority of the delivering body.
    pub authority: Authority,
    /// Administrative level of the boundaries.
    pub level: AdministrativeLevel,
}

/// Provider over local shapefile archives.
pub struct ShapefileProvider {
    name: String,
    archives: BTreeMap<(BoundaryType, Option<String>), RegisteredArchive>,
    layers: Vec<BoundaryType>,
    vintage_hint: u16,
}

impl ShapefileProvider {
    /// Create an empty provider with a registry name.
    #[must_use]
    pub fn new(name: impl Into<String>, vintage_hint: u16) -> Self {
        Self {
            name: name.into(),
            archives: BTreeMap::new(),
            layers: Vec::new(),
            vintage_hint,
        }
    }

    /// Register an archive for `(layer, region)`.
    pub fn register(
        &mut self,
        layer: BoundaryType,
        region: Option<&str>,
        archive: RegisteredArchive,
    ) {
        if !self.layers.contains(&layer) {
            self.layers.push(layer);
            self.layers.sort();
        }
        self.archives
            .insert((layer, region.map(str::to_owned)), archive);
    }

    fn lookup(
        &self,
        layer: BoundaryType,
        region: Option<&str>,
    ) -> AtlasResult<&RegisteredArchive> {
        self.archives
            .get(&(layer, region.map(str::to_owned)))
            .or_else(|| self.archives.get(&(layer, None)))
            .ok_or_else(|| AtlasError::InvalidArgument {
                reason: format!(
                    "{} has no archive registered for {layer} region {region:?}",
                    self.name
                ),
            })
    }
}

#[async_trait]
impl BoundaryProvider for ShapefileProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn supported_layers(&self) -> &[BoundaryType] {
        &self.layers
    }

    fn metadata(&self) -> ProviderMetadata {
        ProviderMetadata {
            name: self.name.clone(),
            source: "file://local".into(),
            license: "varies".into(),
            update_schedule: UpdateSchedule::AdHoc,
            administrative_levels: vec![
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
        _opts: &FetchOptions,
        cancel: &CancellationToken,
    ) -> AtlasResult<Vec<RawAsset>> {
        cancel.check("read archive")?;
        let archive = self.lookup(layer, region)?;
        let bytes = std::fs::read(&archive.path).map_err(|e| AtlasError::Network {
            url: format!("file://{}", archive.path.display()),
            reason: e.to_string(),
        })?;
        let checksum = hex::encode(Sha256::digest(&bytes));
        Ok(vec![RawAsset {
            url: format!("file://{}", archive.path.display()),
            checksum,
            bytes,
            retrieved_at: Utc::now().with_nanosecond(0).unwrap_or_else(Utc::now),
            from_cache: false,
        }])
    }

    fn transform(&self, layer: BoundaryType, assets: &[RawAsset]) -> AtlasResult<Vec<Boundary>> {
        let metadata = self.metadata();
        // Every registered archive for this layer shares authority/level;
        // take them from any matching registration.
        let archive = self
            .archives
            .iter()
            .find(|((l, _), _)| *l == layer)
            .map(|(_, a)| a)
            .ok_or_else(|| AtlasError::InvalidArgument {
                reason: format!("{} has no archive registered for {layer}", self.name),
            })?;

        let mut boundaries = Vec::new();
        for asset in assets {
            for (id, geometry) in read_zipped_shapefile(&self.name, &asset.bytes)? {
                geoid::validate_geoid(layer, &id).map_err(|_| AtlasError::Schema {
                    provider: self.name.clone(),
                    reason: format!("GEOID `{id}` does not match the {layer} layout"),
                })?;
                boundaries.push(Boundary {
                    id,
                    boundary_type: layer,
                    level: archive.level,
                    geometry,
                    authority: archive.authority,
                    source: Some(provenance_for(
                        &metadata,
                        asset,
                        self.vintage_hint,
                        archive.level,
                        LegalStatus::Informational,
                    )),
                });
            }
        }
        Ok(boundaries)
    }

    async fn check_for_updates(
        &self,
        _opts: &FetchOptions,
        _cancel: &CancellationToken,
    ) -> AtlasResult<UpdateStatus> {
        // Local drops have no upstream to probe.
        Ok(UpdateStatus::Unknown)
    }
}
