// AstraGuard - Monte-Carlo trials
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Monte-Carlo trials of one experiment.
//!
//! Trials differ only in the mission noise seed. The detector is fit once on
//! the base config's training series and shared read-only by every trial, so
//! trials are independent and may run in any order. Results are always
//! reported in trial order.

use crate::comparison::{fit_detector, run_with_detector, ComparisonMetrics};
use crate::config::MonteCarloConfig;
use crate::detector::AnomalyDetector;
use crate::error::Result;
use serde::{Deserialize, Serialize};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Outcome of one trial.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrialOutcome {
    pub trial: usize,
    pub seed: u64,
    #[serde(flatten)]
    pub metrics: ComparisonMetrics,
}

/// Mean of every trial metric.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct MeanMetrics {
    pub automated_damage: f64,
    pub human_damage: f64,
    pub automated_survival: f64,
    pub human_survival: f64,
    pub damage_reduced: f64,
    /// Mean over the trials where it is defined.
    pub relative_reduction: Option<f64>,
    pub survival_gain: f64,
    /// Fraction of trials where the automated responder triggered.
    pub automated_trigger_rate: f64,
    /// Fraction of trials where the human responder triggered.
    pub human_trigger_rate: f64,
}

impl MeanMetrics {
    /// Average a set of trials. Empty input yields all zeros.
    pub fn from_trials(trials: &[TrialOutcome]) -> Self {
        if trials.is_empty() {
            return Self::default();
        }
        let n = trials.len() as f64;
        let mean = |f: fn(&ComparisonMetrics) -> f64| -> f64 {
            trials.iter().map(|t| f(&t.metrics)).sum::<f64>() / n
        };

        let relative: Vec<f64> = trials
            .iter()
            .filter_map(|t| t.metrics.relative_reduction)
            .collect();
        let relative_reduction =
            (!relative.is_empty()).then(|| relative.iter().sum::<f64>() / relative.len() as f64);

        Self {
            automated_damage: mean(|m| m.automated_damage),
            human_damage: mean(|m| m.human_damage),
            automated_survival: mean(|m| m.automated_survival),
            human_survival: mean(|m| m.human_survival),
            damage_reduced: mean(|m| m.damage_reduced),
            relative_reduction,
            survival_gain: mean(|m| m.survival_gain),
            automated_trigger_rate: mean(|m| f64::from(u8::from(m.automated_trigger.is_some()))),
            human_trigger_rate: mean(|m| f64::from(u8::from(m.human_trigger.is_some()))),
        }
    }
}

/// Per-trial table plus means.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonteCarloReport {
    pub config: MonteCarloConfig,
    pub trials: Vec<TrialOutcome>,
    pub mean: MeanMetrics,
}

fn run_trial(
    config: &MonteCarloConfig,
    detector: &AnomalyDetector,
    trial: usize,
) -> Result<TrialOutcome> {
    let trial_config = config.trial(trial);
    let outcome = run_with_detector(&trial_config, detector)?;
    log::debug!("trial {trial} (seed {}) done", trial_config.seed);
    Ok(TrialOutcome {
        trial,
        seed: trial_config.seed,
        metrics: outcome.comparison.metrics(),
    })
}

fn report(config: &MonteCarloConfig, trials: Vec<TrialOutcome>) -> MonteCarloReport {
    let mean = MeanMetrics::from_trials(&trials);
    log::info!(
        "monte carlo: {} trials, mean damage reduced {:.2}",
        trials.len(),
        mean.damage_reduced
    );
    MonteCarloReport {
        config: config.clone(),
        trials,
        mean,
    }
}

/// Run every trial with a detector fit once from the base config.
///
/// Trials run on the rayon pool when the `parallel` feature is enabled and
/// on the calling thread otherwise; the report is identical either way.
#[cfg(feature = "parallel")]
pub fn run_monte_carlo(config: &MonteCarloConfig) -> Result<MonteCarloReport> {
    config.validate()?;
    let detector = fit_detector(&config.base)?;

    let results: Vec<Result<TrialOutcome>> = (0..config.trials)
        .into_par_iter()
        .map(|i| run_trial(config, &detector, i))
        .collect();

    let trials = results.into_iter().collect::<Result<Vec<_>>>()?;
    Ok(report(config, trials))
}

/// Run every trial with a detector fit once from the base config.
#[cfg(not(feature = "parallel"))]
pub fn run_monte_carlo(config: &MonteCarloConfig) -> Result<MonteCarloReport> {
    run_monte_carlo_sequential(config)
}

/// Run every trial on the calling thread, in trial order.
pub fn run_monte_carlo_sequential(config: &MonteCarloConfig) -> Result<MonteCarloReport> {
    config.validate()?;
    let detector = fit_detector(&config.base)?;
    let trials = (0..config.trials)
        .map(|i| run_trial(config, &detector, i))
        .collect::<Result<Vec<_>>>()?;
    Ok(report(config, trials))
}
