// SPDX-License-Identifier: MIT OR Apache-2.0
//! Per-host request spacing.
//!
//! All outbound requests to a single host pass through one [`HostGate`],
//! which enforces a minimum spacing between requests (default 500 ms).
//! Public portals rate-limit aggressively; the gate keeps the provider
//! layer under their thresholds regardless of worker-pool width.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Token-bucket-of-one per host: a request may proceed once the previous
/// request to the same host is at least `min_spacing` old.
#[derive(Debug, Clone)]
pub struct HostGate {
    min_spacing: Duration,
    last_request: Arc<Mutex<HashMap<String, Instant>>>,
}

impl HostGate {
    /// Create a gate with the given minimum spacing.
    #[must_use]
    pub fn new(min_spacing: Duration) -> Self {
        Self {
            min_spacing,
            last_request: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// The configured minimum spacing.
    #[must_use]
    pub fn min_spacing(&self) -> Duration {
        self.min_spacing
    }

    /// Wait until a request to `host` is allowed, then claim the slot.
    pub async fn acquire(&self, host: &str) {
        loop {
            let wait = {
                let mut table = self.last_request.lock().await;
                let now = Instant::now();
                match table.get(host) {
                    Some(last) => {
                        let elapsed = now.duration_since(*last);
                        if elapsed >= self.min_spacing {
                            table.insert(host.to_owned(), now);
                            None
                        } else {
                            Some(self.min_spacing - elapsed)
                        }
                    }
                    None => {
                        table.insert(host.to_owned(), now);
                        None
                    }
                }
            };
            match wait {
                None => return,
                Some(delay) => tokio::time::sleep(delay).await,
            }
        }
    }
}

impl Default for HostGate {
    fn default() -> Self {
        Self::new(Duration::from_millis(500))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn first_request_passes_immediately() {
        let gate = HostGate::new(Duration::from_millis(500));
        let before = Instant::now();
        gate.acquire("www2.census.gov").await;
        assert_eq!(Instant::now(), before);
    }

    #[tokio::test(start_paused = true)]
    async fn second_request_waits_out_the_spacing() {
        let gate = HostGate::new(Duration::from_millis(500));
        gate.acquire("www2.census.gov").await;
        let before = Instant::now();
        gate.acquire("www2.census.gov").await;
        let waited = Instant::now().duration_since(before);
        assert!(waited >= Duration::from_millis(500), "waited {waited:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn distinct_hosts_do_not_contend() {
        let gate = HostGate::new(Duration::from_millis(500));
        gate.acquire("www2.census.gov").await;
        let before = Instant::now();
        gate.acquire("data.cityofchicago.org").await;
        assert_eq!(Instant::now(), before);
    }

    #[tokio::test(start_paused = true)]
    async fn clones_share_the_table() {
        let gate = HostGate::new(Duration::from_millis(500));
        let clone = gate.clone();
        gate.acquire("www2.census.gov").await;
        let before = Instant::now();
        clone.acquire("www2.census.gov").await;
        assert!(Instant::now().duration_since(before) >= Duration::from_millis(500));
    }
}
