// SPDX-License-Identifier: MIT OR Apache-2.0

//! Schema DDL, applied idempotently on open.

pub(crate) const SCHEMA: &str = r"
CREATE TABLE IF NOT EXISTS jobs (
    id                    TEXT PRIMARY KEY,
    request_json          TEXT NOT NULL,
    status                TEXT NOT NULL,
    extractions_completed INTEGER NOT NULL DEFAULT 0,
    extractions_failed    INTEGER NOT NULL DEFAULT 0,
    boundaries_accepted   INTEGER NOT NULL DEFAULT 0,
    records_rejected      INTEGER NOT NULL DEFAULT 0,
    created_at            TEXT NOT NULL,
    started_at            TEXT,
    finished_at           TEXT,
    failure_reason        TEXT,
    archived_at           TEXT
);

CREATE TABLE IF NOT EXISTS extractions (
    id             TEXT PRIMARY KEY,
    job_id         TEXT NOT NULL REFERENCES jobs(id),
    state_code     TEXT NOT NULL,
    layer_type     TEXT NOT NULL,
    boundary_count INTEGER NOT NULL,
    quality_score  REAL NOT NULL,
    created_at     TEXT NOT NULL,
    UNIQUE (job_id, state_code, layer_type)
);

CREATE TABLE IF NOT EXISTS validation_results (
    id          TEXT PRIMARY KEY,
    job_id      TEXT NOT NULL REFERENCES jobs(id),
    state_code  TEXT NOT NULL,
    layer_type  TEXT NOT NULL,
    result_json TEXT NOT NULL,
    created_at  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS failures (
    id          TEXT PRIMARY KEY,
    job_id      TEXT NOT NULL REFERENCES jobs(id),
    state_code  TEXT,
    layer_type  TEXT NOT NULL,
    error_class TEXT NOT NULL,
    message     TEXT NOT NULL,
    created_at  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS snapshots (
    id                TEXT PRIMARY KEY,
    job_id            TEXT NOT NULL REFERENCES jobs(id),
    merkle_root       TEXT NOT NULL,
    regions_json      TEXT NOT NULL,
    artifact_location TEXT NOT NULL,
    boundary_count    INTEGER NOT NULL,
    created_at        TEXT NOT NULL,
    deprecated_at     TEXT
);

CREATE INDEX IF NOT EXISTS idx_extractions_job ON extractions(job_id);
CREATE INDEX IF NOT EXISTS idx_failures_job ON failures(job_id);
CREATE INDEX IF NOT EXISTS idx_snapshots_job ON snapshots(job_id);
";
