// SPDX-License-Identifier: MIT OR Apache-2.0
//! The provider contract and registry.
//!
//! A provider turns `(layer, region)` into normalizable boundary records:
//! `download` produces raw assets with provenance attached, `transform`
//! decodes them. The two phases are split so the cache can serve
//! `transform` without touching the network, and so transforms can run on
//! the worker pool without holding connections.

use crate::cancel::CancellationToken;
use crate::fetch::{FetchOptions, RawAsset};
use async_trait::async_trait;
use atlas_core::{AdministrativeLevel, AtlasResult, Boundary, BoundaryType};
use std::collections::BTreeMap;
use std::sync::Arc;

/// How often an upstream refreshes its data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateSchedule {
    /// Annual vintages (TIGER).
    Annual,
    /// Quarterly or similar fixed cadence.
    Quarterly,
    /// Published when the authority feels like it.
    AdHoc,
}

/// Result of an update probe against the upstream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateStatus {
    /// The cached vintage is still what the upstream serves.
    Current,
    /// The upstream has newer data; the value names it.
    UpdateAvailable(String),
    /// The upstream does not expose enough metadata to tell.
    Unknown,
}

/// Static facts about a provider, used as the provenance stub.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ProviderMetadata {
    /// Registered name.
    pub name: String,
    /// Base URL of the upstream.
    pub source: String,
    /// License the upstream declares.
    pub license: String,
    /// Refresh cadence.
    pub update_schedule: UpdateSchedule,
    /// Administrative levels this provider can speak for.
    pub administrative_levels: Vec<AdministrativeLevel>,
}

/// The uniform boundary-provider contract.
///
/// Implementations own their download path end to end (cache, retry,
/// rate limiting via the shared [`crate::Fetcher`]) and must emit
/// geometries already reprojected to WGS84 — the normalizer rejects
/// anything else.
#[async_trait]
pub trait BoundaryProvider: Send + Sync {
    /// Registered name, unique within a registry.
    fn name(&self) -> &str;

    /// Layers this provider can serve.
    fn supported_layers(&self) -> &[BoundaryType];

    /// Static provenance facts.
    fn metadata(&self) -> ProviderMetadata;

    /// Fetch the raw payloads for a layer, optionally scoped to a region.
    ///
    /// # Errors
    ///
    /// Transport failures carry their catalog class; unsupported
    /// layer/region combinations fail with `InvalidArgument`.
    async fn download(
        &self,
        layer: BoundaryType,
        region: Option<&str>,
        opts: &FetchOptions,
        cancel: &CancellationToken,
    ) -> AtlasResult<Vec<RawAsset>>;

    /// Decode raw payloads into boundary records with provenance attached.
    ///
    /// # Errors
    ///
    /// Returns `FormatError` when a payload cannot be parsed and
    /// `SchemaError` when required fields are missing.
    fn transform(&self, layer: BoundaryType, assets: &[RawAsset]) -> AtlasResult<Vec<Boundary>>;

    /// Probe the upstream for newer data than the given vintage.
    ///
    /// # Errors
    ///
    /// Transport failures carry their catalog class.
    async fn check_for_updates(
        &self,
        opts: &FetchOptions,
        cancel: &CancellationToken,
    ) -> AtlasResult<UpdateStatus>;
}

/// A typed registry of named providers, populated at startup.
#[derive(Default)]
pub struct ProviderRegistry {
    providers: BTreeMap<String, Arc<dyn BoundaryProvider>>,
}

impl ProviderRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a provider under its own name, replacing any previous entry.
    pub fn register(&mut self, provider: impl BoundaryProvider + 'static) {
        self.providers
            .insert(provider.name().to_owned(), Arc::new(provider));
    }

    /// Look up a provider by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<dyn BoundaryProvider>> {
        self.providers.get(name).cloned()
    }

    /// All registered names, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.providers.keys().map(String::as_str).collect()
    }

    /// Providers that can serve a layer, in name order.
    ///
    /// Name order makes acquisition deterministic when several providers
    /// cover the same layer; precedence between their records is resolved
    /// later by the normalizer.
    #[must_use]
    pub fn for_layer(&self, layer: BoundaryType) -> Vec<Arc<dyn BoundaryProvider>> {
        self.providers
            .values()
            .filter(|p| p.supported_layers().contains(&layer))
            .cloned()
            .collect()
    }

    /// Number of registered providers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.providers.len()
    }

    /// `true` when no provider is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StubProvider {
        name: String,
        layers: Vec<BoundaryType>,
    }

    #[async_trait]
    impl BoundaryProvider for StubProvider {
        fn name(&self) -> &str {
            &self.name
        }

        fn supported_layers(&self) -> &[BoundaryType] {
            &self.layers
        }

        fn metadata(&self) -> ProviderMetadata {
            ProviderMetadata {
                name: self.name.clone(),
                source: "https://example.gov".into(),
                license: "public-domain".into(),
                update_schedule: UpdateSchedule::AdHoc,
                administrative_levels: vec![AdministrativeLevel::State],
            }
        }

        async fn download(
            &self,
            _layer: BoundaryType,
            _region: Option<&str>,
            _opts: &FetchOptions,
            _cancel: &CancellationToken,
        ) -> AtlasResult<Vec<RawAsset>> {
            Ok(vec![])
        }

        fn transform(
            &self,
            _layer: BoundaryType,
            _assets: &[RawAsset],
        ) -> AtlasResult<Vec<Boundary>> {
            Ok(vec![])
        }

        async fn check_for_updates(
            &self,
            _opts: &FetchOptions,
            _cancel: &CancellationToken,
        ) -> AtlasResult<UpdateStatus> {
            Ok(UpdateStatus::Unknown)
        }
    }

    fn stub(name: &str, layers: &[BoundaryType]) -> StubProvider {
        StubProvider {
            name: name.into(),
            layers: layers.to_vec(),
        }
    }

    #[test]
    fn register_and_lookup() {
        let mut registry = ProviderRegistry::new();
        registry.register(stub("tiger", &[BoundaryType::CongressionalDistrict]));
        assert!(registry.get("tiger").is_some());
        assert!(registry.get("socrata").is_none());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn names_are_sorted() {
        let mut registry = ProviderRegistry::new();
        registry.register(stub("socrata", &[]));
        registry.register(stub("arcgis", &[]));
        registry.register(stub("tiger", &[]));
        assert_eq!(registry.names(), vec!["arcgis", "socrata", "tiger"]);
    }

    #[test]
    fn for_layer_filters_and_orders() {
        let mut registry = ProviderRegistry::new();
        registry.register(stub("tiger", &[BoundaryType::CongressionalDistrict, BoundaryType::County]));
        registry.register(stub("dc-wards", &[BoundaryType::Ward]));
        registry.register(stub("arcgis", &[BoundaryType::Ward]));
        let ward_providers = registry.for_layer(BoundaryType::Ward);
        let names: Vec<&str> = ward_providers.iter().map(|p| p.name()).collect();
        assert_eq!(names, vec!["arcgis", "dc-wards"]);
    }

    #[test]
    fn re_registration_replaces() {
        let mut registry = ProviderRegistry::new();
        registry.register(stub("tiger", &[]));
        registry.register(stub("tiger", &[BoundaryType::County]));
        assert_eq!(registry.len(), 1);
        let p = registry.get("tiger").unwrap();
        assert_eq!(p.supported_layers(), &[BoundaryType::County]);
    }
}
