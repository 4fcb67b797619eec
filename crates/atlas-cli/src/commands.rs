// SPDX-License-Identifier: MIT OR Apache-2.0
//! Subcommand implementations.
//!
//! Every command returns a process exit code from the fixed contract:
//! `0` success, `1` completed with warnings, `2` validation failed,
//! `3` invalid arguments, `4` fatal internal error.

use crate::config::AtlasConfig;
use atlas_core::artifact::{AtlasArtifact, MerkleProofDoc};
use atlas_core::{AtlasError, BoundaryType, BuildRequest, ErrorClass};
use atlas_merkle::{MerkleLeaf, MerkleProof, MerkleTree, field_from_hex, verify_proof};
use atlas_providers::fetch::Fetcher;
use atlas_providers::provider::ProviderRegistry;
use atlas_providers::providers::{ConnecticutEsaProvider, DcWardsProvider, TigerProvider};
use atlas_providers::ratelimit::HostGate;
use atlas_runtime::{CancellationReason, CancellationToken, Orchestrator, OrchestratorConfig};
use atlas_store::AtlasStore;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::error;

/// Success.
pub const EXIT_OK: i32 = 0;
/// Completed, but warnings were emitted.
pub const EXIT_WARNINGS: i32 = 1;
/// A quality gate or proof check failed.
pub const EXIT_VALIDATION_FAILED: i32 = 2;
/// The request itself was invalid.
pub const EXIT_INVALID_ARGS: i32 = 3;
/// Internal fault.
pub const EXIT_INTERNAL: i32 = 4;
/// Unknown subcommand.
pub const EXIT_UNKNOWN_SUBCOMMAND: i32 = 127;

fn exit_code_for(error: &AtlasError) -> i32 {
    match error.class() {
        ErrorClass::InvalidArgument => EXIT_INVALID_ARGS,
        ErrorClass::ValidationFailed => EXIT_VALIDATION_FAILED,
        _ => EXIT_INTERNAL,
    }
}

/// `atlas build`
pub async fn build(request: BuildRequest, force_refresh: bool, config: &AtlasConfig) -> i32 {
    let registry = match default_registry(config) {
        Ok(registry) => registry,
        Err(err) => {
            error!(target: "atlas.cli", error = %err, "provider setup failed");
            return exit_code_for(&err);
        }
    };

    if let Some(parent) = config.db_path.parent() {
        if !parent.as_os_str().is_empty() {
            if let Err(err) = std::fs::create_dir_all(parent) {
                eprintln!("cannot create {}: {err}", parent.display());
                return EXIT_INTERNAL;
            }
        }
    }
    let store = match AtlasStore::open(&config.db_path) {
        Ok(store) => Arc::new(store),
        Err(err) => {
            eprintln!("cannot open store: {err}");
            return EXIT_INTERNAL;
        }
    };

    let orchestrator = Orchestrator::new(
        registry,
        store,
        OrchestratorConfig {
            pool_size: config.effective_pool_size(),
            job_timeout: Duration::from_secs(config.job_timeout_secs),
            force_refresh,
        },
    );

    // Ctrl-c winds the build down cooperatively; workers observe the
    // token at their next suspension point.
    let cancel = CancellationToken::new();
    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            interrupt.cancel_with(CancellationReason::UserRequested);
        }
    });

    match orchestrator.run(request, cancel).await {
        Ok(outcome) => {
            println!("root: {}", outcome.artifact.root);
            println!("boundaries: {}", outcome.artifact.boundary_count);
            println!("artifact: {}", outcome.artifact_path.display());
            if outcome.warnings.is_empty() {
                EXIT_OK
            } else {
                for warning in &outcome.warnings {
                    eprintln!("warning: {warning}");
                }
                EXIT_WARNINGS
            }
        }
        Err(err) => {
            eprintln!("build failed: {err}");
            exit_code_for(&err)
        }
    }
}

/// `atlas validate` — recompute the root of an artifact document and
/// check leaf ordering.
pub fn validate_artifact(path: &Path) -> i32 {
    let artifact = match read_artifact(path) {
        Ok(artifact) => artifact,
        Err(code) => return code,
    };

    let leaves = match decode_leaves(&artifact) {
        Ok(leaves) => leaves,
        Err(code) => return code,
    };

    let ordered = artifact
        .leaves
        .windows(2)
        .all(|pair| {
            (pair[0].boundary_type, pair[0].id.as_str())
                < (pair[1].boundary_type, pair[1].id.as_str())
        });
    if !ordered {
        eprintln!("leaves are not sorted by (type, id)");
        return EXIT_VALIDATION_FAILED;
    }

    let tree = MerkleTree::from_sorted_leaves(leaves);
    let root = atlas_merkle::field_to_hex(&tree.root());
    if root != artifact.root {
        eprintln!("root mismatch: document {} recomputed {root}", artifact.root);
        return EXIT_VALIDATION_FAILED;
    }
    if tree.depth() != artifact.tree_depth {
        eprintln!(
            "depth mismatch: document {} recomputed {}",
            artifact.tree_depth,
            tree.depth()
        );
        return EXIT_VALIDATION_FAILED;
    }
    println!("ok: {} leaves, root {root}", artifact.boundary_count);
    EXIT_OK
}

/// `atlas prove` — emit a membership proof for one boundary.
pub fn prove(
    artifact_path: &Path,
    layer: BoundaryType,
    id: &str,
    output: Option<&Path>,
) -> i32 {
    let artifact = match read_artifact(artifact_path) {
        Ok(artifact) => artifact,
        Err(code) => return code,
    };
    let leaves = match decode_leaves(&artifact) {
        Ok(leaves) => leaves,
        Err(code) => return code,
    };
    let tree = MerkleTree::from_sorted_leaves(leaves);

    let proof = match atlas_merkle::generate_proof(&tree, layer, id) {
        Ok(proof) => proof,
        Err(err) => {
            eprintln!("{err}");
            return exit_code_for(&err);
        }
    };
    let doc = proof.to_doc();
    let json = match serde_json::to_string_pretty(&doc) {
        Ok(json) => json,
        Err(err) => {
            eprintln!("serialize proof: {err}");
            return EXIT_INTERNAL;
        }
    };
    match output {
        Some(path) => {
            if let Err(err) = std::fs::write(path, json) {
                eprintln!("write proof {}: {err}", path.display());
                return EXIT_INTERNAL;
            }
            println!("proof written to {}", path.display());
        }
        None => println!("{json}"),
    }
    EXIT_OK
}

/// `atlas verify` — check a proof document.
pub fn verify(proof_path: &Path) -> i32 {
    let text = match std::fs::read_to_string(proof_path) {
        Ok(text) => text,
        Err(err) => {
            eprintln!("read {}: {err}", proof_path.display());
            return EXIT_INVALID_ARGS;
        }
    };
    let doc: MerkleProofDoc = match serde_json::from_str(&text) {
        Ok(doc) => doc,
        Err(err) => {
            eprintln!("parse proof: {err}");
            return EXIT_INVALID_ARGS;
        }
    };
    let proof = match MerkleProof::from_doc(&doc) {
        Ok(proof) => proof,
        Err(err) => {
            eprintln!("{err}");
            return exit_code_for(&err);
        }
    };
    if verify_proof(&proof) {
        println!(
            "ok: {}/{} is committed under root {}",
            doc.boundary_type, doc.boundary_id, doc.root
        );
        EXIT_OK
    } else {
        eprintln!("proof does not verify against root {}", doc.root);
        EXIT_VALIDATION_FAILED
    }
}

/// `atlas providers` — list the registered providers.
pub fn providers(config: &AtlasConfig) -> i32 {
    match default_registry(config) {
        Ok(registry) => {
            for name in registry.names() {
                let provider = registry.get(name).expect("listed name resolves");
                let metadata = provider.metadata();
                let layers: Vec<&str> = provider
                    .supported_layers()
                    .iter()
                    .map(BoundaryType::wire_name)
                    .collect();
                println!(
                    "{name}\t{:?}\t{}\t{}",
                    metadata.update_schedule,
                    metadata.license,
                    layers.join(",")
                );
            }
            EXIT_OK
        }
        Err(err) => {
            eprintln!("{err}");
            EXIT_INTERNAL
        }
    }
}

/// `atlas jobs` — list persisted jobs.
pub fn jobs(config: &AtlasConfig) -> i32 {
    let store = match AtlasStore::open(&config.db_path) {
        Ok(store) => store,
        Err(err) => {
            eprintln!("cannot open store: {err}");
            return EXIT_INTERNAL;
        }
    };
    match store.list_jobs() {
        Ok(jobs) => {
            for job in jobs {
                println!(
                    "{}\t{}\t{}\t{} ok / {} failed",
                    job.id,
                    job.status.as_str(),
                    job.created_at.to_rfc3339(),
                    job.counters.extractions_completed,
                    job.counters.extractions_failed,
                );
            }
            EXIT_OK
        }
        Err(err) => {
            eprintln!("{err}");
            EXIT_INTERNAL
        }
    }
}

fn default_registry(config: &AtlasConfig) -> Result<ProviderRegistry, AtlasError> {
    let fetcher = Fetcher::with_timeout(
        &config.cache_dir,
        Duration::from_secs(config.http_timeout_secs),
    )?
    .with_gate(HostGate::new(Duration::from_millis(config.host_spacing_ms)));

    let mut registry = ProviderRegistry::new();
    registry.register(TigerProvider::new(fetcher.clone()));
    registry.register(DcWardsProvider::new(fetcher.clone()));
    registry.register(ConnecticutEsaProvider::new(fetcher));
    Ok(registry)
}

fn read_artifact(path: &Path) -> Result<AtlasArtifact, i32> {
    let text = std::fs::read_to_string(path).map_err(|err| {
        eprintln!("read {}: {err}", path.display());
        EXIT_INVALID_ARGS
    })?;
    serde_json::from_str(&text).map_err(|err| {
        eprintln!("parse artifact: {err}");
        EXIT_INVALID_ARGS
    })
}

fn decode_leaves(artifact: &AtlasArtifact) -> Result<Vec<MerkleLeaf>, i32> {
    artifact
        .leaves
        .iter()
        .map(|leaf| {
            Ok(MerkleLeaf {
                leaf_hash: field_from_hex(&leaf.hash).map_err(|err| {
                    eprintln!("leaf {}/{}: {err}", leaf.boundary_type, leaf.id);
                    EXIT_VALIDATION_FAILED
                })?,
                boundary_id: leaf.id.clone(),
                boundary_type: leaf.boundary_type,
                geometry_hash: field_from_hex(&leaf.geometry_hash).map_err(|err| {
                    eprintln!("leaf {}/{}: {err}", leaf.boundary_type, leaf.id);
                    EXIT_VALIDATION_FAILED
                })?,
            })
        })
        .collect()
}
