// SPDX-License-Identifier: MIT OR Apache-2.0

//! Municipal ground-truth resolver and authoritative overrides.
//!
//! The tessellation proof needs the jurisdiction polygon for each city it
//! checks. Those polygons come from the place layer — except where the
//! Census place is known not to match governance, in which case a
//! registered *authoritative* boundary is preferred:
//!
//! - Portland (4159000) ships its own polygon because the TIGER place
//!   includes annexed areas outside any council district.
//! - Honolulu (1517000) is a Census CDP that does not match the
//!   city-county's governance boundary.
//! - NYC (3651000) is deliberately **not** substituted; its structural
//!   ~55 % coverage is accepted through an exhaustivity-floor override
//!   and flagged in warnings.
//!
//! Resolved polygons sit in a process-wide LRU keyed by FIPS: initialized
//! on first use, shared read-only by every validator worker, dropped at
//! process exit.

use crate::tessellation::TessellationTolerances;
use geo_types::MultiPolygon;
use lru::LruCache;
use parking_lot::Mutex;
use std::num::NonZeroUsize;
use std::sync::Arc;

/// Cities whose Census place polygon must not be used as ground truth.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthoritativeBoundary {
    /// Place FIPS.
    pub place_fips: &'static str,
    /// City name, for warnings.
    pub name: &'static str,
    /// Why the Census place is wrong for governance.
    pub reason: &'static str,
}

/// The fixed substitution registry, keyed by place FIPS.
const AUTHORITATIVE: &[AuthoritativeBoundary] = &[
    AuthoritativeBoundary {
        place_fips: "4159000",
        name: "Portland",
        reason: "TIGER place includes annexed areas outside any council district",
    },
    AuthoritativeBoundary {
        place_fips: "1517000",
        name: "Honolulu",
        reason: "Census CDP does not match city-county governance",
    },
];

/// Per-jurisdiction exhaustivity floors for structurally partial coverage.
const EXHAUSTIVITY_FLOORS: &[(&str, f64)] = &[
    // NYC council districts cover roughly 55% of the Census place.
    ("3651000", 0.50),
];

/// Coastal jurisdictions that get the wider coverage band.
const COASTAL: &[&str] = &[
    "1517000", // Honolulu
    "3651000", // NYC
    "0667000", // San Francisco
    "2507000", // Boston
    "5363000", // Seattle
];

/// Look up the authoritative-substitution entry for a place.
#[must_use]
pub fn authoritative_override(place_fips: &str) -> Option<&'static AuthoritativeBoundary> {
    AUTHORITATIVE.iter().find(|a| a.place_fips == place_fips)
}

/// The tessellation tolerances for a jurisdiction, with coastal band and
/// per-jurisdiction exhaustivity floor applied.
#[must_use]
pub fn tolerances_for(place_fips: &str) -> TessellationTolerances {
    let mut tolerances = if COASTAL.contains(&place_fips) {
        TessellationTolerances::coastal()
    } else {
        TessellationTolerances::default()
    };
    if let Some((_, floor)) = EXHAUSTIVITY_FLOORS.iter().find(|(f, _)| *f == place_fips) {
        tolerances = tolerances.with_coverage_min(*floor);
    }
    tolerances
}

/// A resolved jurisdiction polygon plus its known land area.
#[derive(Debug, Clone)]
pub struct ResolvedBoundary {
    /// The ground-truth polygon.
    pub geometry: Arc<MultiPolygon<f64>>,
    /// TIGER `ALAND` when known.
    pub land_area_m2: Option<f64>,
    /// `true` when an authoritative override supplied the polygon.
    pub from_override: bool,
}

/// Process-wide LRU of municipal ground-truth polygons keyed by FIPS.
pub struct MunicipalBoundaryResolver {
    cache: Mutex<LruCache<String, ResolvedBoundary>>,
}

impl MunicipalBoundaryResolver {
    /// Default cache capacity; a build touches at most a few hundred
    /// jurisdictions.
    const DEFAULT_CAPACITY: usize = 512;

    /// Create a resolver with the default capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(Self::DEFAULT_CAPACITY)
    }

    /// Create a resolver with an explicit capacity.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            cache: Mutex::new(LruCache::new(
                NonZeroUsize::new(capacity).expect("capacity must be nonzero"),
            )),
        }
    }

    /// Store a resolved polygon for a jurisdiction.
    ///
    /// Registration happens as place/override data flows in from
    /// providers; later registrations replace earlier ones only when the
    /// newcomer is authoritative and the incumbent is not.
    pub fn register(
        &self,
        fips: impl Into<String>,
        geometry: MultiPolygon<f64>,
        land_area_m2: Option<f64>,
        from_override: bool,
    ) {
        let fips = fips.into();
        let mut cache = self.cache.lock();
        if let Some(existing) = cache.peek(&fips) {
            if existing.from_override && !from_override {
                return;
            }
        }
        cache.put(
            fips,
            ResolvedBoundary {
                geometry: Arc::new(geometry),
                land_area_m2,
                from_override,
            },
        );
    }

    /// Resolve a jurisdiction's ground truth, if registered.
    #[must_use]
    pub fn resolve(&self, fips: &str) -> Option<ResolvedBoundary> {
        self.cache.lock().get(fips).cloned()
    }

    /// Number of cached entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cache.lock().len()
    }

    /// `true` when nothing is cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cache.lock().is_empty()
    }
}

impl Default for MunicipalBoundaryResolver {
    fn default() -> Self {
        Self::new()
    }
}
