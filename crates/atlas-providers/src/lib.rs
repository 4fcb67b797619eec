// SPDX-License-Identifier: MIT OR Apache-2.0
//! atlas-providers
#![deny(unsafe_code)]
#![warn(missing_docs)]
//!
//! The acquisition layer: heterogeneous boundary authorities (federal
//! TIGER, state GIS portals, municipal open-data endpoints) behind one
//! [`BoundaryProvider`] contract, with retry, rate-limit, and cache
//! discipline, a declarative field-mapper for portal schemas, and the
//! normalizer that gates records before validation.

/// Download cache keyed by `(provider, layer, region, vintage)`.
pub mod cache;
/// Cooperative cancellation primitives.
pub mod cancel;
/// HTTP fetch plumbing: timeouts, retry, rate limiting, checksums.
pub mod fetch;
/// Declarative property mapping for portal schemas.
pub mod mapper;
/// Record normalization and precedence merging.
pub mod normalize;
/// The provider contract and registry.
pub mod provider;
/// Per-host request spacing.
pub mod ratelimit;
/// Backoff policy for transient transport failures.
pub mod retry;

/// Provider implementations.
pub mod providers;

pub use cancel::CancellationToken;
pub use cache::DownloadCache;
pub use fetch::{FetchOptions, Fetcher, RawAsset};
pub use mapper::{FieldMapper, MapRule, MapperMode};
pub use normalize::{merge_by_precedence, normalize};
pub use provider::{BoundaryProvider, ProviderMetadata, ProviderRegistry, UpdateSchedule, UpdateStatus};
pub use ratelimit::HostGate;
pub use retry::RetryPolicy;
