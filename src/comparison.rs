// AstraGuard - Responder comparison
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Automated vs delayed-human comparison.
//!
//! Both responders see the same faulted trace and the same anomaly flags; the
//! only difference between the two runs is when mitigation begins.

use crate::config::SimulationConfig;
use crate::detector::AnomalyDetector;
use crate::error::Result;
use crate::scenario::{Responder, ScenarioResult, ScenarioRunner};
use crate::telemetry::TelemetrySeries;
use serde::{Deserialize, Serialize};

/// Side-by-side outcome of the two responders on one trace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonResult {
    pub automated: ScenarioResult,
    pub human: ScenarioResult,
    /// `human.total_damage - automated.total_damage`.
    pub damage_reduced: f64,
    /// `damage_reduced / human.total_damage`; absent when the human run took no damage.
    pub relative_reduction: Option<f64>,
    /// `automated.survival_score - human.survival_score`.
    pub survival_gain: f64,
}

impl ComparisonResult {
    /// Combine two finished runs.
    pub fn from_runs(automated: ScenarioResult, human: ScenarioResult) -> Self {
        let damage_reduced = human.total_damage - automated.total_damage;
        let relative_reduction =
            (human.total_damage != 0.0).then(|| damage_reduced / human.total_damage);
        let survival_gain = automated.survival_score - human.survival_score;
        Self {
            automated,
            human,
            damage_reduced,
            relative_reduction,
            survival_gain,
        }
    }

    /// Headline numbers without the traces.
    pub fn metrics(&self) -> ComparisonMetrics {
        ComparisonMetrics {
            automated_trigger: self.automated.trigger_step,
            human_trigger: self.human.trigger_step,
            automated_damage: self.automated.total_damage,
            human_damage: self.human.total_damage,
            automated_survival: self.automated.survival_score,
            human_survival: self.human.survival_score,
            damage_reduced: self.damage_reduced,
            relative_reduction: self.relative_reduction,
            survival_gain: self.survival_gain,
        }
    }
}

/// Scalar summary of a comparison.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ComparisonMetrics {
    pub automated_trigger: Option<usize>,
    pub human_trigger: Option<usize>,
    pub automated_damage: f64,
    pub human_damage: f64,
    pub automated_survival: f64,
    pub human_survival: f64,
    pub damage_reduced: f64,
    pub relative_reduction: Option<f64>,
    pub survival_gain: f64,
}

/// Run the automated and human-delayed responders on the same faulted trace.
///
/// The trace is scored once; both runs share the scores, flags and threshold.
pub fn compare(
    trace: &TelemetrySeries,
    detector: &AnomalyDetector,
    human_delay: usize,
    threshold: Option<f64>,
) -> Result<ComparisonResult> {
    let runner = ScenarioRunner::new(detector).with_threshold(threshold);
    let (scores, flags, threshold) = runner.detect(trace)?;

    let automated = runner.run_with_flags(
        trace,
        Responder::Automated,
        scores.clone(),
        flags.clone(),
        threshold,
    );
    let human = runner.run_with_flags(
        trace,
        Responder::HumanDelayed {
            delay_steps: human_delay,
        },
        scores,
        flags,
        threshold,
    );

    let result = ComparisonResult::from_runs(automated, human);
    log::info!(
        "comparison: automated damage {:.2}, human damage {:.2}, reduced {:.2}",
        result.automated.total_damage,
        result.human.total_damage,
        result.damage_reduced
    );
    Ok(result)
}

/// Everything produced by one configured experiment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationOutcome {
    pub config: SimulationConfig,
    /// Clean mission series.
    pub mission: TelemetrySeries,
    /// Mission series with the failure injected.
    pub faulted: TelemetrySeries,
    pub comparison: ComparisonResult,
}

/// Fit a detector on the config's clean training series.
pub fn fit_detector(config: &SimulationConfig) -> Result<AnomalyDetector> {
    let training = config.training().generate()?;
    let mut detector = AnomalyDetector::new(config.detector.clone())?;
    detector.fit(&training)?;
    Ok(detector)
}

/// Generate, inject and compare using an already fitted detector.
pub fn run_with_detector(
    config: &SimulationConfig,
    detector: &AnomalyDetector,
) -> Result<SimulationOutcome> {
    config.validate()?;
    let mission = config.mission().generate()?;
    let faulted = config.failure().apply(&mission)?;
    let comparison = compare(
        &faulted,
        detector,
        config.human_delay,
        config.anomaly_threshold,
    )?;
    Ok(SimulationOutcome {
        config: config.clone(),
        mission,
        faulted,
        comparison,
    })
}

/// Run one full experiment: train, generate, inject, compare.
pub fn run_simulation(config: &SimulationConfig) -> Result<SimulationOutcome> {
    config.validate()?;
    let detector = fit_detector(config)?;
    run_with_detector(config, &detector)
}
