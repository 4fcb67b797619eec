// SPDX-License-Identifier: MIT OR Apache-2.0

//! The store facade over one SQLite connection.

use crate::schema::SCHEMA;
use atlas_core::job::{Job, JobCounters, JobStatus, Snapshot};
use atlas_core::report::ValidationResult;
use atlas_core::{AtlasError, AtlasResult, BoundaryType, BuildRequest};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::{Connection, OptionalExtension, params};
use std::path::Path;
use tracing::info;
use uuid::Uuid;

/// One extraction row.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionRow {
    /// Row id.
    pub id: Uuid,
    /// Owning job.
    pub job_id: Uuid,
    /// State FIPS.
    pub state_code: String,
    /// Layer wire name.
    pub layer_type: BoundaryType,
    /// Boundaries accepted for the pair.
    pub boundary_count: u64,
    /// Composite quality score.
    pub quality_score: f64,
}

/// One captured failure row.
#[derive(Debug, Clone, PartialEq)]
pub struct FailureRow {
    /// Row id.
    pub id: Uuid,
    /// Owning job.
    pub job_id: Uuid,
    /// State FIPS, when the failure was state-scoped.
    pub state_code: Option<String>,
    /// Layer wire name.
    pub layer_type: BoundaryType,
    /// Catalog code of the error class.
    pub error_class: String,
    /// Human-readable message.
    pub message: String,
}

/// SQLite-backed repository for jobs, extractions, failures, validation
/// results, and snapshots.
pub struct AtlasStore {
    conn: Mutex<Connection>,
}

impl AtlasStore {
    /// Open (or create) a store at the given path, in WAL mode.
    ///
    /// # Errors
    ///
    /// Returns [`AtlasError::Internal`] when the database cannot be
    /// opened or migrated.
    pub fn open(path: impl AsRef<Path>) -> AtlasResult<Self> {
        let conn = Connection::open(path.as_ref()).map_err(db_err)?;
        conn.pragma_update(None, "journal_mode", "WAL").map_err(db_err)?;
        Self::init(conn)
    }

    /// Open an in-memory store (tests, dry runs).
    ///
    /// # Errors
    ///
    /// Returns [`AtlasError::Internal`] when the schema cannot be applied.
    pub fn open_in_memory() -> AtlasResult<Self> {
        let conn = Connection::open_in_memory().map_err(db_err)?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> AtlasResult<Self> {
        conn.pragma_update(None, "foreign_keys", "ON").map_err(db_err)?;
        conn.execute_batch(SCHEMA).map_err(db_err)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    // ── Jobs ────────────────────────────────────────────────────────

    /// Insert a new job row.
    ///
    /// # Errors
    ///
    /// Returns [`AtlasError::Internal`] on serialization or database
    /// failure.
    pub fn create_job(&self, job: &Job) -> AtlasResult<()> {
        let request_json = serde_json::to_string(&job.request).map_err(json_err)?;
        self.conn
            .lock()
            .execute(
                "INSERT INTO jobs (id, request_json, status, created_at) VALUES (?1, ?2, ?3, ?4)",
                params![
                    job.id.to_string(),
                    request_json,
                    job.status.as_str(),
                    job.created_at.to_rfc3339(),
                ],
            )
            .map_err(db_err)?;
        info!(target: "atlas.store", job = %job.id, "job created");
        Ok(())
    }

    /// Load a job by id.
    ///
    /// # Errors
    ///
    /// Returns [`AtlasError::Internal`] on database failure or a corrupt
    /// row.
    pub fn get_job(&self, id: Uuid) -> AtlasResult<Option<Job>> {
        self.conn
            .lock()
            .query_row(
                "SELECT id, request_json, status, extractions_completed, extractions_failed,
                        boundaries_accepted, records_rejected, created_at, started_at,
                        finished_at, failure_reason, archived_at
                 FROM jobs WHERE id = ?1",
                params![id.to_string()],
                |row| {
                    Ok(RawJob {
                        id: row.get(0)?,
                        request_json: row.get(1)?,
                        status: row.get(2)?,
                        extractions_completed: row.get(3)?,
                        extractions_failed: row.get(4)?,
                        boundaries_accepted: row.get(5)?,
                        records_rejected: row.get(6)?,
                        created_at: row.get(7)?,
                        started_at: row.get(8)?,
                        finished_at: row.get(9)?,
                        failure_reason: row.get(10)?,
                        archived_at: row.get(11)?,
                    })
                },
            )
            .optional()
            .map_err(db_err)?
            .map(RawJob::into_job)
            .transpose()
    }

    /// Move a job through its lifecycle, stamping the transition time.
    ///
    /// # Errors
    ///
    /// Returns [`AtlasError::Internal`] on database failure.
    pub fn update_job_status(
        &self,
        id: Uuid,
        status: JobStatus,
        failure_reason: Option<&str>,
        at: DateTime<Utc>,
    ) -> AtlasResult<()> {
        let stamp = at.to_rfc3339();
        let sql = match status {
            JobStatus::Running => {
                "UPDATE jobs SET status = ?2, started_at = ?3 WHERE id = ?1"
            }
            JobStatus::Completed | JobStatus::Failed => {
                "UPDATE jobs SET status = ?2, finished_at = ?3, failure_reason = ?4 WHERE id = ?1"
            }
            JobStatus::Archived => {
                "UPDATE jobs SET status = ?2, archived_at = ?3 WHERE id = ?1"
            }
            JobStatus::Pending => "UPDATE jobs SET status = ?2 WHERE id = ?1",
        };
        let conn = self.conn.lock();
        match status {
            JobStatus::Completed | JobStatus::Failed => {
                conn.execute(
                    sql,
                    params![id.to_string(), status.as_str(), stamp, failure_reason],
                )
                .map_err(db_err)?;
            }
            JobStatus::Pending => {
                conn.execute(sql, params![id.to_string(), status.as_str()])
                    .map_err(db_err)?;
            }
            _ => {
                conn.execute(sql, params![id.to_string(), status.as_str(), stamp])
                    .map_err(db_err)?;
            }
        }
        Ok(())
    }

    /// Atomically add deltas to a job's progress counters.
    ///
    /// # Errors
    ///
    /// Returns [`AtlasError::Internal`] on database failure.
    pub fn increment_counters(&self, id: Uuid, delta: &JobCounters) -> AtlasResult<()> {
        self.conn
            .lock()
            .execute(
                "UPDATE jobs SET
                    extractions_completed = extractions_completed + ?2,
                    extractions_failed = extractions_failed + ?3,
                    boundaries_accepted = boundaries_accepted + ?4,
                    records_rejected = records_rejected + ?5
                 WHERE id = ?1",
                params![
                    id.to_string(),
                    delta.extractions_completed,
                    delta.extractions_failed,
                    delta.boundaries_accepted,
                    delta.records_rejected,
                ],
            )
            .map_err(db_err)?;
        Ok(())
    }

    /// All jobs, newest first. Archived jobs are included; callers
    /// filter.
    ///
    /// # Errors
    ///
    /// Returns [`AtlasError::Internal`] on database failure or a corrupt
    /// row.
    pub fn list_jobs(&self) -> AtlasResult<Vec<Job>> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare(
                "SELECT id, request_json, status, extractions_completed, extractions_failed,
                        boundaries_accepted, records_rejected, created_at, started_at,
                        finished_at, failure_reason, archived_at
                 FROM jobs ORDER BY created_at DESC",
            )
            .map_err(db_err)?;
        let rows = stmt
            .query_map([], |row| {
                Ok(RawJob {
                    id: row.get(0)?,
                    request_json: row.get(1)?,
                    status: row.get(2)?,
                    extractions_completed: row.get(3)?,
                    extractions_failed: row.get(4)?,
                    boundaries_accepted: row.get(5)?,
                    records_rejected: row.get(6)?,
                    created_at: row.get(7)?,
                    started_at: row.get(8)?,
                    finished_at: row.get(9)?,
                    failure_reason: row.get(10)?,
                    archived_at: row.get(11)?,
                })
            })
            .map_err(db_err)?;
        let mut jobs = Vec::new();
        for row in rows {
            jobs.push(row.map_err(db_err)?.into_job()?);
        }
        Ok(jobs)
    }

    // ── Extractions & validation results ────────────────────────────

    /// Record a validated extraction and its validation result in one
    /// transaction, and bump the job's completed counter.
    ///
    /// # Errors
    ///
    /// Returns [`AtlasError::Internal`] on database failure, including a
    /// duplicate `(job, state, layer)` extraction.
    pub fn create_validated_extraction(
        &self,
        job_id: Uuid,
        state_code: &str,
        layer: BoundaryType,
        boundary_count: u64,
        result: &ValidationResult,
        at: DateTime<Utc>,
    ) -> AtlasResult<Uuid> {
        let extraction_id = Uuid::new_v4();
        let result_json = serde_json::to_string(result).map_err(json_err)?;
        let mut conn = self.conn.lock();
        let tx = conn.transaction().map_err(db_err)?;
        tx.execute(
            "INSERT INTO extractions
                (id, job_id, state_code, layer_type, boundary_count, quality_score, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                extraction_id.to_string(),
                job_id.to_string(),
                state_code,
                layer.wire_name(),
                boundary_count,
                result.quality_score,
                at.to_rfc3339(),
            ],
        )
        .map_err(db_err)?;
        tx.execute(
            "INSERT INTO validation_results
                (id, job_id, state_code, layer_type, result_json, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                Uuid::new_v4().to_string(),
                job_id.to_string(),
                state_code,
                layer.wire_name(),
                result_json,
                at.to_rfc3339(),
            ],
        )
        .map_err(db_err)?;
        tx.execute(
            "UPDATE jobs SET extractions_completed = extractions_completed + 1 WHERE id = ?1",
            params![job_id.to_string()],
        )
        .map_err(db_err)?;
        tx.commit().map_err(db_err)?;
        Ok(extraction_id)
    }

    /// Extractions for a job, ordered by `(state, layer)`.
    ///
    /// # Errors
    ///
    /// Returns [`AtlasError::Internal`] on database failure.
    pub fn extractions_for_job(&self, job_id: Uuid) -> AtlasResult<Vec<ExtractionRow>> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare(
                "SELECT id, job_id, state_code, layer_type, boundary_count, quality_score
                 FROM extractions WHERE job_id = ?1 ORDER BY state_code, layer_type",
            )
            .map_err(db_err)?;
        let rows = stmt
            .query_map(params![job_id.to_string()], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, u64>(4)?,
                    row.get::<_, f64>(5)?,
                ))
            })
            .map_err(db_err)?;

        let mut extractions = Vec::new();
        for row in rows {
            let (id, job, state_code, layer, boundary_count, quality_score) =
                row.map_err(db_err)?;
            extractions.push(ExtractionRow {
                id: parse_uuid(&id)?,
                job_id: parse_uuid(&job)?,
                state_code,
                layer_type: parse_layer(&layer)?,
                boundary_count,
                quality_score,
            });
        }
        Ok(extractions)
    }

    /// Stored validation results for a job.
    ///
    /// # Errors
    ///
    /// Returns [`AtlasError::Internal`] on database failure or a corrupt
    /// row.
    pub fn validation_results_for_job(&self, job_id: Uuid) -> AtlasResult<Vec<ValidationResult>> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare(
                "SELECT result_json FROM validation_results
                 WHERE job_id = ?1 ORDER BY state_code, layer_type",
            )
            .map_err(db_err)?;
        let rows = stmt
            .query_map(params![job_id.to_string()], |row| row.get::<_, String>(0))
            .map_err(db_err)?;
        let mut results = Vec::new();
        for row in rows {
            let json = row.map_err(db_err)?;
            results.push(serde_json::from_str(&json).map_err(json_err)?);
        }
        Ok(results)
    }

    // ── Failures ────────────────────────────────────────────────────

    /// Capture a per-(layer, state) failure.
    ///
    /// # Errors
    ///
    /// Returns [`AtlasError::Internal`] on database failure.
    pub fn record_failure(
        &self,
        job_id: Uuid,
        state_code: Option<&str>,
        layer: BoundaryType,
        error: &AtlasError,
        at: DateTime<Utc>,
    ) -> AtlasResult<()> {
        self.conn
            .lock()
            .execute(
                "INSERT INTO failures
                    (id, job_id, state_code, layer_type, error_class, message, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    Uuid::new_v4().to_string(),
                    job_id.to_string(),
                    state_code,
                    layer.wire_name(),
                    error.class().code(),
                    error.to_string(),
                    at.to_rfc3339(),
                ],
            )
            .map_err(db_err)?;
        self.increment_counters(
            job_id,
            &JobCounters {
                extractions_failed: 1,
                ..Default::default()
            },
        )
    }

    /// Failures captured for a job.
    ///
    /// # Errors
    ///
    /// Returns [`AtlasError::Internal`] on database failure.
    pub fn failures_for_job(&self, job_id: Uuid) -> AtlasResult<Vec<FailureRow>> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare(
                "SELECT id, job_id, state_code, layer_type, error_class, message
                 FROM failures WHERE job_id = ?1 ORDER BY created_at",
            )
            .map_err(db_err)?;
        let rows = stmt
            .query_map(params![job_id.to_string()], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, Option<String>>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, String>(5)?,
                ))
            })
            .map_err(db_err)?;
        let mut failures = Vec::new();
        for row in rows {
            let (id, job, state_code, layer, error_class, message) = row.map_err(db_err)?;
            failures.push(FailureRow {
                id: parse_uuid(&id)?,
                job_id: parse_uuid(&job)?,
                state_code,
                layer_type: parse_layer(&layer)?,
                error_class,
                message,
            });
        }
        Ok(failures)
    }

    // ── Snapshots ───────────────────────────────────────────────────

    /// Insert a snapshot row. Snapshot writes are serialized by the
    /// connection mutex.
    ///
    /// # Errors
    ///
    /// Returns [`AtlasError::Internal`] on database failure.
    pub fn create_snapshot(&self, snapshot: &Snapshot) -> AtlasResult<()> {
        let regions_json = serde_json::to_string(&snapshot.regions).map_err(json_err)?;
        self.conn
            .lock()
            .execute(
                "INSERT INTO snapshots
                    (id, job_id, merkle_root, regions_json, artifact_location,
                     boundary_count, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    snapshot.id.to_string(),
                    snapshot.job_id.to_string(),
                    snapshot.merkle_root,
                    regions_json,
                    snapshot.artifact_location,
                    snapshot.boundary_count,
                    snapshot.created_at.to_rfc3339(),
                ],
            )
            .map_err(db_err)?;
        info!(
            target: "atlas.store",
            snapshot = %snapshot.id,
            root = %snapshot.merkle_root,
            "snapshot written"
        );
        Ok(())
    }

    /// Soft-deprecate a snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`AtlasError::Internal`] on database failure.
    pub fn deprecate_snapshot(&self, id: Uuid, at: DateTime<Utc>) -> AtlasResult<()> {
        self.conn
            .lock()
            .execute(
                "UPDATE snapshots SET deprecated_at = ?2 WHERE id = ?1",
                params![id.to_string(), at.to_rfc3339()],
            )
            .map_err(db_err)?;
        Ok(())
    }

    /// The newest non-deprecated snapshot, if any.
    ///
    /// # Errors
    ///
    /// Returns [`AtlasError::Internal`] on database failure or a corrupt
    /// row.
    pub fn latest_snapshot(&self) -> AtlasResult<Option<Snapshot>> {
        self.conn
            .lock()
            .query_row(
                "SELECT id, job_id, merkle_root, regions_json, artifact_location,
                        boundary_count, created_at, deprecated_at
                 FROM snapshots WHERE deprecated_at IS NULL
                 ORDER BY created_at DESC LIMIT 1",
                [],
                |row| {
                    Ok(RawSnapshot {
                        id: row.get(0)?,
                        job_id: row.get(1)?,
                        merkle_root: row.get(2)?,
                        regions_json: row.get(3)?,
                        artifact_location: row.get(4)?,
                        boundary_count: row.get(5)?,
                        created_at: row.get(6)?,
                        deprecated_at: row.get(7)?,
                    })
                },
            )
            .optional()
            .map_err(db_err)?
            .map(RawSnapshot::into_snapshot)
            .transpose()
    }
}

// ── Row conversion plumbing ─────────────────────────────────────────

struct RawJob {
    id: String,
    request_json: String,
    status: String,
    extractions_completed: u64,
    extractions_failed: u64,
    boundaries_accepted: u64,
    records_rejected: u64,
    created_at: String,
    started_at: Option<String>,
    finished_at: Option<String>,
    failure_reason: Option<String>,
    archived_at: Option<String>,
}

impl RawJob {
    fn into_job(self) -> AtlasResult<Job> {
        let request: BuildRequest =
            serde_json::from_str(&self.request_json).map_err(json_err)?;
        Ok(Job {
            id: parse_uuid(&self.id)?,
            request,
            status: JobStatus::parse(&self.status).ok_or_else(|| AtlasError::Internal {
                reason: format!("unknown job status `{}`", self.status),
            })?,
            counters: JobCounters {
                extractions_completed: self.extractions_completed,
                extractions_failed: self.extractions_failed,
                boundaries_accepted: self.boundaries_accepted,
                records_rejected: self.records_rejected,
            },
            created_at: parse_time(&self.created_at)?,
            started_at: self.started_at.as_deref().map(parse_time).transpose()?,
            finished_at: self.finished_at.as_deref().map(parse_time).transpose()?,
            failure_reason: self.failure_reason,
            archived_at: self.archived_at.as_deref().map(parse_time).transpose()?,
        })
    }
}

struct RawSnapshot {
    id: String,
    job_id: String,
    merkle_root: String,
    regions_json: String,
    artifact_location: String,
    boundary_count: u64,
    created_at: String,
    deprecated_at: Option<String>,
}

impl RawSnapshot {
    fn into_snapshot(self) -> AtlasResult<Snapshot> {
        Ok(Snapshot {
            id: parse_uuid(&self.id)?,
            job_id: parse_uuid(&self.job_id)?,
            merkle_root: self.merkle_root,
            regions: serde_json::from_str(&self.regions_json).map_err(json_err)?,
            artifact_location: self.artifact_location,
            boundary_count: self.boundary_count,
            created_at: parse_time(&self.created_at)?,
            deprecated_at: self.deprecated_at.as_deref().map(parse_time).transpose()?,
        })
    }
}

fn db_err(err: rusqlite::Error) -> AtlasError {
    AtlasError::Internal {
        reason: format!("sqlite: {err}"),
    }
}

fn json_err(err: serde_json::Error) -> AtlasError {
    AtlasError::Internal {
        reason: format!("serialize: {err}"),
    }
}

fn parse_uuid(s: &str) -> AtlasResult<Uuid> {
    Uuid::parse_str(s).map_err(|_| AtlasError::Internal {
        reason: format!("corrupt uuid `{s}`"),
    })
}

fn parse_time(s: &str) -> AtlasResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|_| AtlasError::Internal {
            reason: format!("corrupt timestamp `{s}`"),
        })
}

fn parse_layer(s: &str) -> AtlasResult<BoundaryType> {
    BoundaryType::parse(s).map_err(|_| AtlasError::Internal {
        reason: format!("corrupt layer `{s}`"),
    })
}
