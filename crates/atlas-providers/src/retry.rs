// SPDX-License-Identifier: MIT OR Apache-2.0
//! Backoff policy for transient transport failures.
//!
//! Exponential backoff with jitter, applied only to error classes the
//! catalog marks retryable (`NetworkError`, `TimeoutError`, `RateLimited`).
//! Everything else — schema errors, permanent upstream verdicts, caller
//! mistakes — fails on the first attempt.

use atlas_core::AtlasError;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tracing::debug;

/// Retry configuration. The defaults are the provider contract: base
/// 500 ms, cap 30 s, jitter ±25 %, at most 3 attempts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// First backoff delay.
    pub base_delay: Duration,
    /// Upper bound for any single delay.
    pub max_delay: Duration,
    /// Total attempts, including the first.
    pub max_attempts: u32,
    /// Jitter amplitude as a fraction of the computed delay.
    pub jitter_fraction: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
            max_attempts: 3,
            jitter_fraction: 0.25,
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries; used by tests and forced-refresh paths.
    #[must_use]
    pub fn no_retries() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Backoff before `attempt` (1-based; attempt 1 has no delay).
    ///
    /// Jitter is drawn from a deterministic per-attempt hash rather than a
    /// thread RNG so that test runs and replays see the same schedule.
    #[must_use]
    pub fn delay_before(&self, attempt: u32, seed: &str) -> Duration {
        if attempt <= 1 {
            return Duration::ZERO;
        }
        let exponent = attempt.saturating_sub(2).min(16);
        let raw = (self.base_delay.as_millis() as u64)
            .checked_shl(exponent)
            .unwrap_or(u64::MAX);
        let capped = raw.min(self.max_delay.as_millis() as u64);

        // Map a hash of (seed, attempt) onto [-jitter, +jitter].
        let mut hasher = blake3::Hasher::new();
        hasher.update(seed.as_bytes());
        hasher.update(&attempt.to_le_bytes());
        let digest = hasher.finalize();
        let unit = u64::from_le_bytes(digest.as_bytes()[..8].try_into().expect("8 bytes"))
            as f64
            / u64::MAX as f64;
        let spread = (unit * 2.0 - 1.0) * self.jitter_fraction;
        let jittered = (capped as f64 * (1.0 + spread)).max(0.0) as u64;
        Duration::from_millis(jittered)
    }

    /// Run `op`, retrying retryable failures with backoff.
    ///
    /// `seed` keys the jitter schedule; callers pass the request URL.
    ///
    /// # Errors
    ///
    /// Returns the final error once attempts are exhausted, or the first
    /// non-retryable error immediately.
    pub async fn run<T, Fut, Op>(&self, seed: &str, mut op: Op) -> Result<T, AtlasError>
    where
        Op: FnMut() -> Fut,
        Fut: Future<Output = Result<T, AtlasError>>,
    {
        let mut attempt = 0;
        loop {
            attempt += 1;
            let delay = self.delay_before(attempt, seed);
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            match op().await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_retryable() && attempt < self.max_attempts => {
                    debug!(
                        target: "atlas.provider",
                        attempt,
                        error = %err,
                        "transient failure, will retry"
                    );
                }
                Err(err) => return Err(err),
            }
        }
    }
}
