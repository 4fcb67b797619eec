// SPDX-License-Identifier: MIT OR Apache-2.0
//! Run metrics shared across workers.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering::Relaxed};

/// Atomic build-level metrics, shared read/write across the worker pool.
#[derive(Debug, Default)]
pub struct BuildMetrics {
    layers_completed: AtomicU64,
    layers_failed: AtomicU64,
    boundaries_accepted: AtomicU64,
    records_rejected: AtomicU64,
    cache_hits: AtomicU64,
    downloads: AtomicU64,
}

impl BuildMetrics {
    /// Create a zeroed collector.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one finished layer task.
    pub fn record_layer(&self, success: bool, accepted: u64, rejected: u64) {
        if success {
            self.layers_completed.fetch_add(1, Relaxed);
        } else {
            self.layers_failed.fetch_add(1, Relaxed);
        }
        self.boundaries_accepted.fetch_add(accepted, Relaxed);
        self.records_rejected.fetch_add(rejected, Relaxed);
    }

    /// Record one download, cached or live.
    pub fn record_download(&self, from_cache: bool) {
        if from_cache {
            self.cache_hits.fetch_add(1, Relaxed);
        } else {
            self.downloads.fetch_add(1, Relaxed);
        }
    }

    /// Point-in-time snapshot of the counters.
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            layers_completed: self.layers_completed.load(Relaxed),
            layers_failed: self.layers_failed.load(Relaxed),
            boundaries_accepted: self.boundaries_accepted.load(Relaxed),
            records_rejected: self.records_rejected.load(Relaxed),
            cache_hits: self.cache_hits.load(Relaxed),
            downloads: self.downloads.load(Relaxed),
        }
    }
}

/// A copied-out view of [`BuildMetrics`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    /// Layer tasks that completed.
    pub layers_completed: u64,
    /// Layer tasks that failed.
    pub layers_failed: u64,
    /// Boundaries accepted by the normalizer.
    pub boundaries_accepted: u64,
    /// Records the normalizer rejected.
    pub records_rejected: u64,
    /// Downloads served from cache.
    pub cache_hits: u64,
    /// Downloads that hit the network.
    pub downloads: u64,
}
