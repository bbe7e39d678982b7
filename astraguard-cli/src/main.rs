// AstraGuard CLI - Mission comparison driver
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! # AstraGuard CLI
//!
//! Runs mission experiments and writes their results.
//!
//! ## Usage
//!
//! ```bash
//! # Reference mission, results into ./results
//! astraguard compare --out results
//!
//! # 100 noise seeds of a power drain
//! astraguard monte-carlo --trials 100 --failure-type power_drain
//!
//! # Faulted telemetry as CSV
//! astraguard generate --output telemetry.csv
//! ```

mod report;

use astraguard::{
    run_monte_carlo, run_simulation, AstraError, FailureArchetype, MonteCarloConfig,
    SimulationConfig,
};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info, Level};
use tracing_subscriber::EnvFilter;

/// AstraGuard mission simulator
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", global = true)]
    log_level: String,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run one mission with both responders and compare them
    Compare {
        #[command(flatten)]
        mission: MissionArgs,

        /// Directory for comparison.json and trace CSVs
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// Repeat the mission over many noise seeds
    MonteCarlo {
        #[command(flatten)]
        mission: MissionArgs,

        /// Number of trials
        #[arg(short, long, default_value = "20")]
        trials: usize,

        /// Directory for monte_carlo.json
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// Write a generated telemetry series to CSV
    Generate {
        #[command(flatten)]
        mission: MissionArgs,

        /// Skip failure injection
        #[arg(long)]
        clean: bool,

        /// Output CSV path
        #[arg(short, long, default_value = "telemetry.csv")]
        output: PathBuf,
    },
}

/// Experiment parameters shared by every subcommand.
#[derive(Args, Debug, Default)]
struct MissionArgs {
    /// JSON config file; flags below override its fields
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Failure archetype (thermal_runaway, power_drain, comm_drop)
    #[arg(long)]
    failure_type: Option<FailureArchetype>,

    /// Step at which the failure begins
    #[arg(long)]
    failure_start: Option<usize>,

    /// Failure severity multiplier
    #[arg(long)]
    severity: Option<f64>,

    /// Human response delay in steps
    #[arg(long)]
    human_delay: Option<usize>,

    /// Mission noise seed
    #[arg(long)]
    seed: Option<u64>,

    /// Mission length in steps
    #[arg(long)]
    n_steps: Option<usize>,

    /// Mission noise multiplier
    #[arg(long)]
    noise_scale: Option<f64>,

    /// Expected anomaly fraction in training data
    #[arg(long, visible_alias = "detector-sensitivity")]
    contamination: Option<f64>,

    /// Number of isolation trees
    #[arg(long)]
    n_estimators: Option<usize>,

    /// Training series length
    #[arg(long)]
    train_steps: Option<usize>,

    /// Training series noise seed
    #[arg(long)]
    train_seed: Option<u64>,

    /// Fixed anomaly threshold instead of the per-series default
    #[arg(long, allow_hyphen_values = true)]
    anomaly_threshold: Option<f64>,
}

impl MissionArgs {
    /// Config file (or defaults) with command-line overrides applied.
    fn build(&self) -> Result<SimulationConfig, CliError> {
        let mut config = match &self.config {
            Some(path) => {
                info!("Loading config from {}", path.display());
                SimulationConfig::from_json_file(path)?
            }
            None => SimulationConfig::default(),
        };

        if let Some(v) = self.failure_type {
            config.failure_type = v;
        }
        if let Some(v) = self.failure_start {
            config.failure_start = v;
        }
        if let Some(v) = self.severity {
            config.severity = v;
        }
        if let Some(v) = self.human_delay {
            config.human_delay = v;
        }
        if let Some(v) = self.seed {
            config.seed = v;
        }
        if let Some(v) = self.n_steps {
            config.n_steps = v;
        }
        if let Some(v) = self.noise_scale {
            config.noise_scale = v;
        }
        if let Some(v) = self.contamination {
            config.detector.contamination = v;
        }
        if let Some(v) = self.n_estimators {
            config.detector.n_estimators = v;
        }
        if let Some(v) = self.train_steps {
            config.train_steps = v;
        }
        if let Some(v) = self.train_seed {
            config.train_seed = v;
        }
        if self.anomaly_threshold.is_some() {
            config.anomaly_threshold = self.anomaly_threshold;
        }

        config.validate()?;
        Ok(config)
    }
}

/// CLI failure.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error(transparent)]
    Simulation(#[from] AstraError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

fn init_tracing(log_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = match log_level.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "info" => Level::INFO,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::INFO,
        };
        EnvFilter::from_default_env().add_directive(level.into())
    });

    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn run(command: Command) -> Result<(), CliError> {
    match command {
        Command::Compare { mission, out } => {
            let config = mission.build()?;
            let outcome = run_simulation(&config)?;
            println!("{}", report::summary(&outcome.comparison.metrics()));
            if let Some(dir) = out {
                report::write_comparison(&dir, &outcome)?;
                println!("Saved results to: {}/", dir.display());
            }
        }
        Command::MonteCarlo {
            mission,
            trials,
            out,
        } => {
            let config = MonteCarloConfig::new(mission.build()?, trials);
            info!("Running {} trials", trials);
            let result = run_monte_carlo(&config)?;
            println!("{}", report::monte_carlo_summary(&result));
            if let Some(dir) = out {
                let path = report::write_monte_carlo(&dir, &result)?;
                println!("Saved results to: {}", path.display());
            }
        }
        Command::Generate {
            mission,
            clean,
            output,
        } => {
            let config = mission.build()?;
            let mut series = config.mission().generate()?;
            if !clean {
                series = config.failure().apply(&series)?;
            }
            series.to_csv(&output)?;
            println!("Wrote {} steps to {}", series.len(), output.display());
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    info!("AstraGuard v{}", env!("CARGO_PKG_VERSION"));

    match run(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
