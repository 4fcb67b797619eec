// SPDX-License-Identifier: MIT OR Apache-2.0

//! Job and snapshot lifecycle types.
//!
//! A [`Job`] is one atlas build: a scope (states × layers), live counters,
//! and — on success — a produced [`Snapshot`]. Snapshots are immutable; a
//! rebuild creates a new snapshot and deprecates the old one.

use crate::BuildRequest;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Where a job is in its lifecycle.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Created, not yet scheduled.
    Pending,
    /// Providers and validators are running.
    Running,
    /// Artifact written.
    Completed,
    /// Terminal failure; see `failure_reason`.
    Failed,
    /// Soft-archived; kept for audit.
    Archived,
}

impl JobStatus {
    /// Storage string used by the persistence layer.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Archived => "archived",
        }
    }

    /// Parse a storage string.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            "archived" => Some(Self::Archived),
            _ => None,
        }
    }
}

/// Progress counters updated atomically as layer tasks finish.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobCounters {
    /// Layer-state extractions that completed.
    pub extractions_completed: u64,
    /// Layer-state extractions that failed.
    pub extractions_failed: u64,
    /// Boundaries accepted by the normalizer.
    pub boundaries_accepted: u64,
    /// Records rejected before normalization.
    pub records_rejected: u64,
}

/// One atlas build.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    /// Opaque job id.
    pub id: Uuid,
    /// The validated request that scoped this build.
    pub request: BuildRequest,
    /// Lifecycle state.
    pub status: JobStatus,
    /// Live progress counters.
    pub counters: JobCounters,
    /// When the job row was created.
    pub created_at: DateTime<Utc>,
    /// When the orchestrator picked the job up.
    pub started_at: Option<DateTime<Utc>>,
    /// When the job reached a terminal state.
    pub finished_at: Option<DateTime<Utc>>,
    /// Set when `status == Failed`.
    pub failure_reason: Option<String>,
    /// Soft-archive timestamp.
    pub archived_at: Option<DateTime<Utc>>,
}

impl Job {
    /// Create a pending job for a validated request.
    #[must_use]
    pub fn new(request: BuildRequest, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            request,
            status: JobStatus::Pending,
            counters: JobCounters::default(),
            created_at: now,
            started_at: None,
            finished_at: None,
            failure_reason: None,
            archived_at: None,
        }
    }
}

/// The immutable artifact record a completed job produces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Opaque snapshot id.
    pub id: Uuid,
    /// Producing job.
    pub job_id: Uuid,
    /// Merkle root, hex-encoded BN254 field element.
    pub merkle_root: String,
    /// State FIPS codes covered.
    pub regions: Vec<String>,
    /// IPFS CID or local filesystem path of the artifact document.
    pub artifact_location: String,
    /// Total committed boundaries.
    pub boundary_count: u64,
    /// When the snapshot was written.
    pub created_at: DateTime<Utc>,
    /// Set by governance when a newer snapshot supersedes this one.
    pub deprecated_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::BoundaryType;

    fn request() -> BuildRequest {
        BuildRequest {
            layers: vec![BoundaryType::CongressionalDistrict],
            regions: vec!["55".into()],
            vintage: 2024,
            quality_threshold: 80,
            output: None,
            cross_validate: false,
        }
    }

    #[test]
    fn status_strings_round_trip() {
        for status in [
            JobStatus::Pending,
            JobStatus::Running,
            JobStatus::Completed,
            JobStatus::Failed,
            JobStatus::Archived,
        ] {
            assert_eq!(JobStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(JobStatus::parse("paused"), None);
    }

    #[test]
    fn new_job_is_pending_with_zero_counters() {
        let job = Job::new(request(), Utc::now());
        assert_eq!(job.status, JobStatus::Pending);
        assert_eq!(job.counters, JobCounters::default());
        assert!(job.started_at.is_none());
        assert!(job.archived_at.is_none());
    }
}
