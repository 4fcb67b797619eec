// SPDX-License-Identifier: MIT OR Apache-2.0
//! HTTP fetch plumbing: timeouts, retry, rate limiting, checksums.
//!
//! One [`Fetcher`] is shared by every provider in a build. It owns the
//! HTTP client, the backoff policy, the per-host gate, and the download
//! cache, and it stamps each asset with the provenance the normalizer
//! later commits: the exact URL, the SHA-256 of the raw bytes, and the
//! response wall-clock rounded to the second.

use crate::cache::{CacheKey, DownloadCache};
use crate::cancel::CancellationToken;
use crate::ratelimit::HostGate;
use crate::retry::RetryPolicy;
use atlas_core::{AtlasError, AtlasResult};
use chrono::{DateTime, Timelike, Utc};
use sha2::{Digest, Sha256};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// A raw payload as downloaded, before any decoding.
#[derive(Debug, Clone, PartialEq)]
pub struct RawAsset {
    /// Exact URL the bytes came from.
    pub url: String,
    /// The raw bytes.
    pub bytes: Vec<u8>,
    /// SHA-256 of `bytes`, hex. Fixed once written.
    pub checksum: String,
    /// Response wall-clock, UTC, rounded to the second.
    pub retrieved_at: DateTime<Utc>,
    /// `true` when served from the download cache.
    pub from_cache: bool,
}

/// Per-fetch options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchOptions {
    /// Bypass the cache and re-download.
    pub force_refresh: bool,
    /// Dataset vintage, part of the cache key.
    pub vintage: u16,
}

impl FetchOptions {
    /// Cache-friendly options for a vintage.
    #[must_use]
    pub fn for_vintage(vintage: u16) -> Self {
        Self {
            force_refresh: false,
            vintage,
        }
    }
}

/// Shared download engine.
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: reqwest::Client,
    policy: RetryPolicy,
    gate: HostGate,
    cache: Arc<DownloadCache>,
}

impl Fetcher {
    /// Build a fetcher with the default 30 s request timeout.
    ///
    /// # Errors
    ///
    /// Returns [`AtlasError::Internal`] when the HTTP client cannot be
    /// constructed.
    pub fn new(cache_dir: impl AsRef<Path>) -> AtlasResult<Self> {
        Self::with_timeout(cache_dir, Duration::from_secs(30))
    }

    /// Build a fetcher with an explicit request timeout.
    ///
    /// # Errors
    ///
    /// Returns [`AtlasError::Internal`] when the HTTP client cannot be
    /// constructed.
    pub fn with_timeout(cache_dir: impl AsRef<Path>, timeout: Duration) -> AtlasResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("shadow-atlas/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| AtlasError::Internal {
                reason: format!("build http client: {e}"),
            })?;
        Ok(Self {
            client,
            policy: RetryPolicy::default(),
            gate: HostGate::default(),
            cache: Arc::new(DownloadCache::new(cache_dir.as_ref())),
        })
    }

    /// Override the retry policy (tests use a fast one).
    #[must_use]
    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Override the host gate (tests use zero spacing).
    #[must_use]
    pub fn with_gate(mut self, gate: HostGate) -> Self {
        self.gate = gate;
        self
    }

    /// The download cache this fetcher writes through.
    #[must_use]
    pub fn cache(&self) -> &DownloadCache {
        &self.cache
    }

    /// Fetch a URL through the cache, gate, and retry policy.
    ///
    /// # Errors
    ///
    /// Transport failures surface with their catalog class after the
    /// retry budget is exhausted; cancellation surfaces as
    /// [`AtlasError::Cancelled`].
    pub async fn fetch(
        &self,
        key: &CacheKey,
        url: &str,
        opts: &FetchOptions,
        cancel: &CancellationToken,
    ) -> AtlasResult<RawAsset> {
        cancel.check("download")?;

        if !opts.force_refresh {
            if let Some(asset) = self.cache.read(key) {
                debug!(
                    target: "atlas.provider",
                    provider = %key.provider,
                    layer = %key.layer,
                    "cache hit"
                );
                return Ok(asset);
            }
        }

        self.gate.acquire(&host_of(url)).await;
        cancel.check("download")?;

        let asset = self
            .policy
            .run(url, || self.fetch_once(url, cancel))
            .await?;

        self.cache.write(key, &asset)?;
        info!(
            target: "atlas.provider",
            provider = %key.provider,
            layer = %key.layer,
            bytes = asset.bytes.len(),
            "downloaded"
        );
        Ok(asset)
    }

    /// Probe a URL and return its HTTP status, bypassing cache and retry.
    ///
    /// Used by `check_for_updates` implementations; the per-host gate
    /// still applies.
    ///
    /// # Errors
    ///
    /// Returns a transport-class error when the request cannot be sent.
    pub async fn probe(&self, url: &str, cancel: &CancellationToken) -> AtlasResult<u16> {
        cancel.check("probe")?;
        self.gate.acquire(&host_of(url)).await;
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| classify_reqwest(url, &e))?;
        Ok(response.status().as_u16())
    }

    async fn fetch_once(&self, url: &str, cancel: &CancellationToken) -> AtlasResult<RawAsset> {
        let request = self.client.get(url).send();
        let response = tokio::select! {
            () = cancel.cancelled() => {
                return Err(AtlasError::Cancelled { operation: "download".into() });
            }
            result = request => result.map_err(|e| classify_reqwest(url, &e))?,
        };

        let status = response.status().as_u16();
        if status != 200 {
            return Err(AtlasError::from_http_status(url, status));
        }

        // Wall-clock of the response, rounded to the second; this value
        // enters the provenance triple and therefore the leaf hash.
        let retrieved_at = Utc::now().with_nanosecond(0).unwrap_or_else(Utc::now);

        let bytes = tokio::select! {
            () = cancel.cancelled() => {
                return Err(AtlasError::Cancelled { operation: "download".into() });
            }
            result = response.bytes() => result
                .map_err(|e| classify_reqwest(url, &e))?
                .to_vec(),
        };

        let checksum = hex::encode(Sha256::digest(&bytes));
        Ok(RawAsset {
            url: url.to_owned(),
            bytes,
            checksum,
            retrieved_at,
            from_cache: false,
        })
    }
}

fn classify_reqwest(url: &str, err: &reqwest::Error) -> AtlasError {
    if err.is_timeout() {
        AtlasError::Timeout {
            operation: format!("GET {url}"),
            elapsed_secs: 0,
        }
    } else {
        AtlasError::Network {
            url: url.to_owned(),
            reason: err.to_string(),
        }
    }
}

fn host_of(url: &str) -> String {
    url.split("://")
        .nth(1)
        .unwrap_or(url)
        .split('/')
        .next()
        .unwrap_or(url)
        .to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use atlas_core::BoundaryType;
    use std::time::Duration;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_key() -> CacheKey {
        CacheKey {
            provider: "test".into(),
            layer: BoundaryType::CongressionalDistrict,
            region: Some("55".into()),
            vintage: 2024,
        }
    }

    fn fast_fetcher(dir: &Path) -> Fetcher {
        Fetcher::with_timeout(dir, Duration::from_secs(5))
            .unwrap()
            .with_policy(RetryPolicy {
                base_delay: Duration::from_millis(1),
                max_delay: Duration::from_millis(5),
                max_attempts: 3,
                jitter_fraction: 0.0,
            })
            .with_gate(HostGate::new(Duration::ZERO))
    }

    #[tokio::test]
    async fn fetch_stamps_checksum_and_caches() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/cd.zip"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"payload".to_vec()))
            .expect(1)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let fetcher = fast_fetcher(dir.path());
        let url = format!("{}/cd.zip", server.uri());
        let opts = FetchOptions::for_vintage(2024);
        let cancel = CancellationToken::new();

        let first = fetcher.fetch(&test_key(), &url, &opts, &cancel).await.unwrap();
        assert!(!first.from_cache);
        assert_eq!(
            first.checksum,
            hex::encode(Sha256::digest(b"payload"))
        );
        assert_eq!(first.retrieved_at.nanosecond(), 0);

        // Second fetch must not hit the server (expect(1) above).
        let second = fetcher.fetch(&test_key(), &url, &opts, &cancel).await.unwrap();
        assert!(second.from_cache);
        assert_eq!(second.bytes, first.bytes);
    }

    #[tokio::test]
    async fn force_refresh_bypasses_cache() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/cd.zip"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"payload".to_vec()))
            .expect(2)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let fetcher = fast_fetcher(dir.path());
        let url = format!("{}/cd.zip", server.uri());
        let cancel = CancellationToken::new();

        let opts = FetchOptions::for_vintage(2024);
        fetcher.fetch(&test_key(), &url, &opts, &cancel).await.unwrap();

        let refresh = FetchOptions {
            force_refresh: true,
            vintage: 2024,
        };
        let again = fetcher.fetch(&test_key(), &url, &refresh, &cancel).await.unwrap();
        assert!(!again.from_cache);
    }

    #[tokio::test]
    async fn server_errors_are_retried_then_succeed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/flaky.zip"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(2)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/flaky.zip"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"ok".to_vec()))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let fetcher = fast_fetcher(dir.path());
        let url = format!("{}/flaky.zip", server.uri());
        let asset = fetcher
            .fetch(&test_key(), &url, &FetchOptions::for_vintage(2024), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(asset.bytes, b"ok");
    }

    #[tokio::test]
    async fn not_found_is_permanent() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/gone.zip"))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let fetcher = fast_fetcher(dir.path());
        let url = format!("{}/gone.zip", server.uri());
        let err = fetcher
            .fetch(&test_key(), &url, &FetchOptions::for_vintage(2024), &CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(err.class(), atlas_core::ErrorClass::UpstreamError);
    }

    #[tokio::test]
    async fn rate_limited_is_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/busy.zip"))
            .respond_with(ResponseTemplate::new(429))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/busy.zip"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"ok".to_vec()))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let fetcher = fast_fetcher(dir.path());
        let url = format!("{}/busy.zip", server.uri());
        let asset = fetcher
            .fetch(&test_key(), &url, &FetchOptions::for_vintage(2024), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(asset.bytes, b"ok");
    }

    #[tokio::test]
    async fn cancelled_before_fetch_returns_cancelled() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = fast_fetcher(dir.path());
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = fetcher
            .fetch(
                &test_key(),
                "http://127.0.0.1:1/never.zip",
                &FetchOptions::for_vintage(2024),
                &cancel,
            )
            .await
            .unwrap_err();
        assert_eq!(err.class(), atlas_core::ErrorClass::Cancelled);
    }
}
