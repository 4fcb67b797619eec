// SPDX-License-Identifier: MIT OR Apache-2.0
//! atlas-store
#![deny(unsafe_code)]
#![warn(missing_docs)]
//!
//! SQLite persistence for the pipeline: jobs, per-(state, layer)
//! extractions, captured failures, validation results, and snapshots.
//!
//! The schema is append-only except for job status, counters, and the
//! soft `archived_at`/`deprecated_at` stamps. A single writer holds the
//! connection behind a mutex; the database runs in WAL mode so external
//! readers see consistent snapshots. Counter increments are single
//! `UPDATE ... SET x = x + ?` statements and therefore atomic.

mod schema;
mod store;

pub use store::{AtlasStore, ExtractionRow, FailureRow};
