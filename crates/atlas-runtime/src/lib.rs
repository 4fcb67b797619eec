// SPDX-License-Identifier: MIT OR Apache-2.0
//! atlas-runtime
#![deny(unsafe_code)]
#![warn(missing_docs)]
//!
//! Build orchestration: a single-threaded coordinator sequences
//! per-(layer, state) tasks onto a bounded worker pool, captures failures
//! per task, validates what survives, and commits the result into one
//! Merkle artifact and snapshot. The root a build produces depends only
//! on the input set, never on task completion order.

/// Run metrics shared across workers.
pub mod metrics;
/// The build orchestrator.
pub mod orchestrator;
/// Bounded task pool.
pub mod pool;

pub use atlas_providers::cancel::{CancellationReason, CancellationToken};
pub use metrics::{BuildMetrics, MetricsSnapshot};
pub use orchestrator::{BuildOutcome, Orchestrator, OrchestratorConfig};
pub use pool::run_on_pool;
