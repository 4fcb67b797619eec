// SPDX-License-Identifier: MIT OR Apache-2.0

//! The build orchestrator.
//!
//! One [`Orchestrator::run`] call is one job: validate the request,
//! acquire every `(layer, state)` slice on the worker pool, normalize and
//! merge what the providers emit, validate each slice, and — when at
//! least one slice survives — hash everything into a Merkle artifact and
//! persist a snapshot. Per-slice failures are captured in the store and
//! fail the build only when *every* slice fails.

use crate::metrics::BuildMetrics;
use crate::pool::{default_pool_size, run_on_pool};
use atlas_core::artifact::{ArtifactLeaf, ArtifactMetadata, AtlasArtifact, TreeType};
use atlas_core::job::{Job, JobCounters, JobStatus, Snapshot};
use atlas_core::report::ValidationResult;
use atlas_core::{AtlasError, AtlasResult, Boundary, BoundaryType, BuildRequest, geoid};
use atlas_merkle::{MerkleTree, field_to_hex};
use atlas_providers::cancel::{CancellationReason, CancellationToken};
use atlas_providers::fetch::FetchOptions;
use atlas_providers::normalize::{merge_by_precedence, normalize_batch};
use atlas_providers::provider::ProviderRegistry;
use atlas_validate::{LayerValidator, MunicipalBoundaryResolver, ValidationContext};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Orchestrator knobs; defaults match the pipeline contract.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Worker pool width. Default: cores, minimum 2.
    pub pool_size: usize,
    /// Overall job deadline. Default: 6 hours.
    pub job_timeout: Duration,
    /// Bypass download caches.
    pub force_refresh: bool,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            pool_size: default_pool_size(),
            job_timeout: Duration::from_secs(6 * 60 * 60),
            force_refresh: false,
        }
    }
}

/// What a completed build hands back.
#[derive(Debug)]
pub struct BuildOutcome {
    /// The job row as finished.
    pub job: Job,
    /// The artifact document.
    pub artifact: AtlasArtifact,
    /// The persisted snapshot.
    pub snapshot: Snapshot,
    /// Per-(layer, state) validation results.
    pub validation_results: Vec<ValidationResult>,
    /// Aggregated warnings across slices.
    pub warnings: Vec<String>,
    /// Where the artifact document was written.
    pub artifact_path: PathBuf,
}

/// The build coordinator.
pub struct Orchestrator {
    registry: Arc<ProviderRegistry>,
    store: Arc<atlas_store::AtlasStore>,
    resolver: Arc<MunicipalBoundaryResolver>,
    config: OrchestratorConfig,
    metrics: Arc<BuildMetrics>,
}

/// One slice of work: a layer in a region.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Slice {
    layer: BoundaryType,
    region: Option<String>,
}

/// What one slice task produces.
struct SliceOutcome {
    slice: Slice,
    result: AtlasResult<(Vec<Boundary>, ValidationResult, u64)>,
}

impl Orchestrator {
    /// Create an orchestrator over a provider registry and store.
    #[must_use]
    pub fn new(
        registry: ProviderRegistry,
        store: Arc<atlas_store::AtlasStore>,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            registry: Arc::new(registry),
            store,
            resolver: Arc::new(MunicipalBoundaryResolver::new()),
            config,
            metrics: Arc::new(BuildMetrics::new()),
        }
    }

    /// The municipal ground-truth resolver, for override registration.
    #[must_use]
    pub fn resolver(&self) -> &Arc<MunicipalBoundaryResolver> {
        &self.resolver
    }

    /// Build metrics, live during a run.
    #[must_use]
    pub fn metrics(&self) -> &Arc<BuildMetrics> {
        &self.metrics
    }

    /// Run one build end to end.
    ///
    /// # Errors
    ///
    /// - [`AtlasError::InvalidArgument`] before any work is scheduled (no
    ///   job row, no snapshot);
    /// - [`AtlasError::Timeout`] when the job deadline expires;
    /// - [`AtlasError::ValidationFailed`] when every slice fails.
    pub async fn run(
        &self,
        request: BuildRequest,
        cancel: CancellationToken,
    ) -> AtlasResult<BuildOutcome> {
        request.validate()?;

        let job = Job::new(request.clone(), Utc::now());
        self.store.create_job(&job)?;
        self.store
            .update_job_status(job.id, JobStatus::Running, None, Utc::now())?;

        let deadline = self.config.job_timeout;
        let run = self.run_inner(&job, &request, &cancel);
        let outcome = match tokio::time::timeout(deadline, run).await {
            Ok(result) => result,
            Err(_) => {
                cancel.cancel_with(CancellationReason::JobTimeout);
                Err(AtlasError::Timeout {
                    operation: format!("job {}", job.id),
                    elapsed_secs: deadline.as_secs(),
                })
            }
        };

        match outcome {
            Ok(outcome) => {
                self.store
                    .update_job_status(job.id, JobStatus::Completed, None, Utc::now())?;
                Ok(outcome)
            }
            Err(err) => {
                // A reason present here was stamped by the deadline path
                // or an external canceller; preserve it in the job record
                // before winding down whatever is still in flight.
                let cancelled_because = cancel.reason();
                cancel.cancel_with(CancellationReason::JobFailed);
                let failure = match cancelled_because {
                    Some(reason) => format!("{err}; {}", reason.description()),
                    None => err.to_string(),
                };
                error!(target: "atlas.runtime", job = %job.id, error = %err, "build failed");
                self.store.update_job_status(
                    job.id,
                    JobStatus::Failed,
                    Some(&failure),
                    Utc::now(),
                )?;
                Err(err)
            }
        }
    }

    async fn run_inner(
        &self,
        job: &Job,
        request: &BuildRequest,
        cancel: &CancellationToken,
    ) -> AtlasResult<BuildOutcome> {
        let slices = plan_slices(request);
        info!(
            target: "atlas.runtime",
            job = %job.id,
            slices = slices.len(),
            pool = self.config.pool_size,
            "build scheduled"
        );

        let opts = FetchOptions {
            force_refresh: self.config.force_refresh,
            vintage: request.vintage,
        };

        let registry = self.registry.clone();
        let resolver = self.resolver.clone();
        let cross_validate = request.cross_validate;
        let outcomes: Vec<SliceOutcome> = run_on_pool(
            slices.clone(),
            self.config.pool_size,
            cancel,
            move |slice| {
                let registry = registry.clone();
                let resolver = resolver.clone();
                let cancel = cancel.clone();
                async move {
                    let result =
                        acquire_slice(&registry, &resolver, &slice, &opts, cross_validate, &cancel)
                            .await;
                    SliceOutcome { slice, result }
                }
            },
        )
        .await
        .into_iter()
        .flatten()
        .collect();

        cancel.check("build")?;

        // Fold slice outcomes in plan order.
        let mut all_boundaries: Vec<Boundary> = Vec::new();
        let mut validation_results = Vec::new();
        let mut warnings = Vec::new();
        let threshold = f64::from(request.quality_threshold);
        for outcome in outcomes {
            let state = outcome.slice.region.as_deref().unwrap_or("*");
            let result = outcome.result.and_then(|(boundaries, validation, rejected)| {
                if validation.quality_score < threshold {
                    Err(AtlasError::ValidationFailed {
                        layer: outcome.slice.layer.to_string(),
                        scope: state.to_owned(),
                        reason: format!(
                            "quality score {:.1} below threshold {threshold}",
                            validation.quality_score
                        ),
                    })
                } else {
                    Ok((boundaries, validation, rejected))
                }
            });
            match result {
                Ok((boundaries, validation, rejected)) => {
                    self.metrics
                        .record_layer(true, boundaries.len() as u64, rejected);
                    self.store.create_validated_extraction(
                        job.id,
                        state,
                        outcome.slice.layer,
                        boundaries.len() as u64,
                        &validation,
                        Utc::now(),
                    )?;
                    self.store.increment_counters(
                        job.id,
                        &JobCounters {
                            boundaries_accepted: boundaries.len() as u64,
                            records_rejected: rejected,
                            ..Default::default()
                        },
                    )?;
                    warnings.extend(
                        validation
                            .warnings
                            .iter()
                            .map(|w| format!("{}/{state}: {w}", outcome.slice.layer)),
                    );
                    if let Some(gap) = &validation.redistricting_gap_warning {
                        warnings.push(format!(
                            "{}/{state}: redistricting gap ({}): {}",
                            outcome.slice.layer, gap.gap_type, gap.reasoning
                        ));
                    }
                    validation_results.push(validation);
                    all_boundaries.extend(boundaries);
                }
                Err(err) => {
                    warn!(
                        target: "atlas.runtime",
                        layer = %outcome.slice.layer,
                        state,
                        error = %err,
                        "slice failed"
                    );
                    self.metrics.record_layer(false, 0, 0);
                    self.store.record_failure(
                        job.id,
                        outcome.slice.region.as_deref(),
                        outcome.slice.layer,
                        &err,
                        Utc::now(),
                    )?;
                    warnings.push(format!(
                        "{}/{state}: failed with {}: {err}",
                        outcome.slice.layer,
                        err.class()
                    ));
                }
            }
        }

        // Cross-layer precedence: the same boundary acquired through two
        // layers' providers collapses to one record per (type, id).
        let merged = merge_by_precedence(all_boundaries);
        if merged.is_empty() {
            return Err(AtlasError::ValidationFailed {
                layer: "*".into(),
                scope: request.regions.join(","),
                reason: "all requested layers failed; nothing to commit".into(),
            });
        }

        // Leaf hashing is CPU-bound; keep it off the async workers.
        let tree = {
            let boundaries = merged.clone();
            tokio::task::spawn_blocking(move || MerkleTree::build(&boundaries))
                .await
                .map_err(|e| AtlasError::Internal {
                    reason: format!("hashing task panicked: {e}"),
                })??
        };

        let artifact = assemble_artifact(&tree, &merged, request.vintage, Utc::now());
        let artifact_path = request
            .output
            .clone()
            .unwrap_or_else(|| PathBuf::from(format!("atlas-{}.json", job.id)));
        let document = serde_json::to_vec_pretty(&artifact).map_err(|e| AtlasError::Internal {
            reason: format!("serialize artifact: {e}"),
        })?;
        std::fs::write(&artifact_path, document).map_err(|e| AtlasError::Internal {
            reason: format!("write artifact {}: {e}", artifact_path.display()),
        })?;

        // A new snapshot deprecates its predecessor.
        let previous = self.store.latest_snapshot()?;
        let snapshot = Snapshot {
            id: Uuid::new_v4(),
            job_id: job.id,
            merkle_root: artifact.root.clone(),
            regions: request.regions.clone(),
            artifact_location: artifact_path.display().to_string(),
            boundary_count: artifact.boundary_count,
            created_at: Utc::now(),
            deprecated_at: None,
        };
        self.store.create_snapshot(&snapshot)?;
        if let Some(previous) = previous {
            self.store.deprecate_snapshot(previous.id, Utc::now())?;
        }

        let mut job = job.clone();
        job.status = JobStatus::Completed;

        info!(
            target: "atlas.runtime",
            job = %job.id,
            root = %artifact.root,
            boundaries = artifact.boundary_count,
            "build complete"
        );

        Ok(BuildOutcome {
            job,
            artifact,
            snapshot,
            validation_results,
            warnings,
            artifact_path,
        })
    }
}

/// Expand a request into its `(layer, state)` slices, in deterministic
/// plan order.
fn plan_slices(request: &BuildRequest) -> Vec<Slice> {
    let mut slices = Vec::new();
    for layer in &request.layers {
        if request.regions.is_empty() {
            slices.push(Slice {
                layer: *layer,
                region: None,
            });
        } else {
            for region in &request.regions {
                slices.push(Slice {
                    layer: *layer,
                    region: Some(region.clone()),
                });
            }
        }
    }
    slices
}

/// Acquire, normalize, and validate one slice.
async fn acquire_slice(
    registry: &ProviderRegistry,
    resolver: &MunicipalBoundaryResolver,
    slice: &Slice,
    opts: &FetchOptions,
    cross_validate: bool,
    cancel: &CancellationToken,
) -> AtlasResult<(Vec<Boundary>, ValidationResult, u64)> {
    cancel.check("acquire slice")?;

    let providers = registry.for_layer(slice.layer);
    if providers.is_empty() {
        return Err(AtlasError::InvalidArgument {
            reason: format!("no provider registered for {}", slice.layer),
        });
    }

    let mut raw: Vec<Boundary> = Vec::new();
    let mut last_error: Option<AtlasError> = None;
    for provider in providers {
        match provider
            .download(slice.layer, slice.region.as_deref(), opts, cancel)
            .await
            .and_then(|assets| provider.transform(slice.layer, &assets))
        {
            Ok(mut boundaries) => raw.append(&mut boundaries),
            Err(err @ AtlasError::InvalidArgument { .. }) => {
                // This provider simply does not cover the slice.
                tracing::debug!(
                    target: "atlas.runtime",
                    provider = provider.name(),
                    layer = %slice.layer,
                    error = %err,
                    "provider skipped slice"
                );
            }
            Err(err) => {
                last_error = Some(err);
            }
        }
    }
    if raw.is_empty() {
        return Err(last_error.unwrap_or_else(|| AtlasError::ValidationFailed {
            layer: slice.layer.to_string(),
            scope: slice.region.clone().unwrap_or_else(|| "*".into()),
            reason: "no provider produced records for this slice".into(),
        }));
    }

    // Scope national payloads (counties) down to the requested state.
    if let Some(region) = &slice.region {
        raw.retain(|b| geoid::state_prefix(&b.id) == region);
    }

    let total = raw.len() as u64;
    let (accepted, rejections) = normalize_batch(raw);
    let rejected = total - accepted.len() as u64;
    for rejection in &rejections {
        tracing::debug!(
            target: "atlas.runtime",
            layer = %slice.layer,
            error = %rejection,
            "record rejected"
        );
    }
    let merged = merge_by_precedence(accepted);

    // Place polygons double as tessellation ground truth.
    if cross_validate && slice.layer == BoundaryType::Place {
        for place in &merged {
            resolver.register(place.id.clone(), place.geometry.clone(), None, false);
        }
    }

    let ctx = ValidationContext {
        today: Utc::now().date_naive(),
        resolver: cross_validate.then_some(resolver),
        tessellation: None,
    };
    let validation =
        LayerValidator::validate(slice.layer, slice.region.as_deref(), &merged, &ctx);

    Ok((merged, validation, rejected))
}

/// Assemble the artifact document from a built tree.
fn assemble_artifact(
    tree: &MerkleTree,
    boundaries: &[Boundary],
    vintage: u16,
    generated_at: DateTime<Utc>,
) -> AtlasArtifact {
    let authorities: BTreeMap<(BoundaryType, &str), u64> = boundaries
        .iter()
        .map(|b| ((b.boundary_type, b.id.as_str()), b.authority.encoding()))
        .collect();

    let leaves: Vec<ArtifactLeaf> = tree
        .leaves()
        .iter()
        .map(|leaf| ArtifactLeaf {
            id: leaf.boundary_id.clone(),
            boundary_type: leaf.boundary_type,
            hash: field_to_hex(&leaf.leaf_hash),
            authority: authorities
                .get(&(leaf.boundary_type, leaf.boundary_id.as_str()))
                .copied()
                .unwrap_or(0),
            geometry_hash: field_to_hex(&leaf.geometry_hash),
        })
        .collect();

    AtlasArtifact::new(
        field_to_hex(&tree.root()),
        TreeType::Flat,
        tree.depth(),
        leaves,
        ArtifactMetadata {
            generated_at,
            tiger_version: vintage.to_string(),
            layer_counts: tree.layer_counts(),
        },
    )
}
