// SPDX-License-Identifier: MIT OR Apache-2.0
#![deny(unsafe_code)]
//! The `atlas` command.

mod commands;
mod config;

use clap::error::ErrorKind;
use clap::{Parser, Subcommand};
use commands::{EXIT_INVALID_ARGS, EXIT_UNKNOWN_SUBCOMMAND};
use config::AtlasConfig;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "atlas", version, about = "Shadow Atlas boundary pipeline")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to an atlas.toml config file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging.
    #[arg(long, global = true)]
    debug: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Build an atlas artifact for a set of layers and states.
    Build {
        /// Layer to acquire (repeatable): cd, sldu, sldl, county, place,
        /// vtd, school-unified, ward, ...
        #[arg(long = "layer", required = true)]
        layers: Vec<String>,

        /// Two-digit state FIPS (repeatable).
        #[arg(long = "state")]
        states: Vec<String>,

        /// TIGER vintage year.
        #[arg(long, default_value_t = 2024)]
        vintage: u16,

        /// Minimum acceptable per-layer quality score.
        #[arg(long, default_value_t = 80)]
        quality_threshold: u8,

        /// Artifact output path.
        #[arg(long)]
        output: Option<PathBuf>,

        /// Cross-validate against municipal ground-truth polygons.
        #[arg(long)]
        cross_validate: bool,

        /// Bypass download caches.
        #[arg(long)]
        force_refresh: bool,
    },

    /// Recompute and check the root of an artifact document.
    Validate {
        /// Artifact JSON path.
        #[arg()]
        artifact: PathBuf,
    },

    /// Generate a membership proof for one boundary.
    Prove {
        /// Artifact JSON path.
        #[arg(long)]
        artifact: PathBuf,

        /// Boundary layer.
        #[arg(long)]
        layer: String,

        /// Boundary GEOID.
        #[arg(long)]
        id: String,

        /// Proof output path (defaults to stdout).
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Verify a membership proof document.
    Verify {
        /// Proof JSON path.
        #[arg()]
        proof: PathBuf,
    },

    /// List registered providers.
    Providers,

    /// List persisted jobs.
    Jobs,
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let code = match err.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
                    let _ = err.print();
                    return;
                }
                ErrorKind::InvalidSubcommand => EXIT_UNKNOWN_SUBCOMMAND,
                _ => EXIT_INVALID_ARGS,
            };
            let _ = err.print();
            std::process::exit(code);
        }
    };

    let filter = if cli.debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config = match AtlasConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(EXIT_INVALID_ARGS);
        }
    };
    for warning in config.warnings() {
        eprintln!("config warning: {warning:?}");
    }

    let code = match cli.command {
        Commands::Build {
            layers,
            states,
            vintage,
            quality_threshold,
            output,
            cross_validate,
            force_refresh,
        } => {
            let parsed_layers: Result<Vec<_>, _> = layers
                .iter()
                .map(|l| atlas_core::BoundaryType::parse(l))
                .collect();
            match parsed_layers {
                Ok(parsed_layers) => {
                    let request = atlas_core::BuildRequest {
                        layers: parsed_layers,
                        regions: states,
                        vintage,
                        quality_threshold,
                        output,
                        cross_validate,
                    };
                    let runtime = tokio::runtime::Runtime::new().expect("tokio runtime");
                    runtime.block_on(commands::build(request, force_refresh, &config))
                }
                Err(err) => {
                    eprintln!("{err}");
                    EXIT_INVALID_ARGS
                }
            }
        }
        Commands::Validate { artifact } => commands::validate_artifact(&artifact),
        Commands::Prove {
            artifact,
            layer,
            id,
            output,
        } => match atlas_core::BoundaryType::parse(&layer) {
            Ok(layer) => commands::prove(&artifact, layer, &id, output.as_deref()),
            Err(err) => {
                eprintln!("{err}");
                EXIT_INVALID_ARGS
            }
        },
        Commands::Verify { proof } => commands::verify(&proof),
        Commands::Providers => commands::providers(&config),
        Commands::Jobs => commands::jobs(&config),
    };
    std::process::exit(code);
}
