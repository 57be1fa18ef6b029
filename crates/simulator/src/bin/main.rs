//! QSN Simulator CLI
//!
//! Run a hub/sensor coordination scenario and print the per-hub outcome.
//!
//! # Example
//!
//! ```bash
//! # Built-in three-hub scenario with a fixed seed
//! qsn-sim --seed 42
//!
//! # Custom scenario, lossier links, longer window
//! qsn-sim --config scenario.toml --success-probability 0.3 --duration-ms 5000
//! ```

use anyhow::Context;
use clap::Parser;
use qsn_simulator::{ScenarioConfig, Simulator};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// QSN Simulator
///
/// Runs deterministic coordination scenarios. Single-threaded, reproducible
/// when the same seed is used.
#[derive(Parser, Debug)]
#[command(name = "qsn-sim")]
#[command(version, about, long_about = None)]
struct Args {
    /// Scenario file (TOML). When omitted, the built-in three-hub scenario is used.
    #[arg(short = 'c', long)]
    config: Option<PathBuf>,

    /// Random seed, overriding the scenario's.
    #[arg(long)]
    seed: Option<u64>,

    /// Per-request entanglement success probability (0.0-1.0).
    #[arg(short = 'p', long)]
    success_probability: Option<f64>,

    /// Session window length in milliseconds, measured from the start deadline.
    #[arg(short = 'd', long)]
    duration_ms: Option<u64>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("warn,qsn_simulator=info")),
        )
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => ScenarioConfig::load(path)
            .with_context(|| format!("loading scenario {}", path.display()))?,
        None => ScenarioConfig::builtin(),
    };
    if let Some(seed) = args.seed {
        config = config.with_seed(seed);
    }
    if let Some(probability) = args.success_probability {
        config = config.with_success_probability(probability);
    }
    if let Some(duration) = args.duration_ms {
        config = config.with_duration_ms(duration);
    }

    info!(
        seed = config.simulation.seed,
        hubs = config.hubs.len(),
        start_ms = config.simulation.start_ms,
        end_ms = config.simulation.end_ms,
        "Starting simulation"
    );

    let mut simulator = Simulator::new(config).context("building scenario")?;
    let report = simulator.run();
    report.print_summary();

    Ok(())
}
