// AstraGuard - Mission scenario runner
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Mission scenario runner.
//!
//! A run scores the faulted trace once, decides a trigger step from the first
//! flagged anomaly, then walks the trace step by step. Each step is a small
//! state machine:
//!
//! ```text
//!   Dormant ──(t == trigger)──▶ Mitigating
//! ```
//!
//! While mitigating, every step is diagnosed and recovered on its own working
//! copy of the sample. Damage is assessed on that (possibly mitigated) copy.
//! Scores are always computed on the unmodified faulted trace.

use crate::detector::{default_threshold, flag, validate_threshold, AnomalyDetector};
use crate::diagnosis::{diagnose, mission_damage, recover, survival_score, FailureMode};
use crate::error::Result;
use crate::telemetry::{TelemetrySample, TelemetrySeries};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Who reacts to the first flagged anomaly, and how fast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum Responder {
    /// Onboard automation: mitigates at the first flagged step.
    Automated,
    /// Ground operator: mitigates `delay_steps` after the first flagged step.
    HumanDelayed { delay_steps: usize },
}

impl Responder {
    /// Trigger step for a series of `n_steps`, given the first flagged step.
    ///
    /// Never flagged means never triggered. A delayed trigger is clamped to
    /// the last step.
    pub fn trigger_step(&self, first_flagged: Option<usize>, n_steps: usize) -> Option<usize> {
        let first = first_flagged?;
        match self {
            Responder::Automated => Some(first),
            Responder::HumanDelayed { delay_steps } => Some(
                first
                    .saturating_add(*delay_steps)
                    .min(n_steps.saturating_sub(1)),
            ),
        }
    }

    /// Short label.
    pub fn label(&self) -> &'static str {
        match self {
            Responder::Automated => "automated",
            Responder::HumanDelayed { .. } => "human",
        }
    }
}

impl fmt::Display for Responder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Responder::Automated => write!(f, "automated"),
            Responder::HumanDelayed { delay_steps } => write!(f, "human (+{delay_steps} steps)"),
        }
    }
}

/// Runner state at a given step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MitigationState {
    /// No recovery applied.
    Dormant,
    /// Recovery applied every step.
    Mitigating,
}

impl MitigationState {
    /// State at step `t` for the given trigger.
    pub fn at(t: usize, trigger: Option<usize>) -> Self {
        match trigger {
            Some(trigger) if t >= trigger => MitigationState::Mitigating,
            _ => MitigationState::Dormant,
        }
    }
}

/// Action taken at a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepAction {
    /// Dormant step.
    None,
    /// Diagnosed and mitigated as the given mode.
    Mitigate(FailureMode),
}

impl StepAction {
    /// Mode name, or `"none"`.
    pub fn label(&self) -> &'static str {
        match self {
            StepAction::None => "none",
            StepAction::Mitigate(mode) => mode.as_str(),
        }
    }
}

impl fmt::Display for StepAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Outcome of one step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepOutcome {
    pub state: MitigationState,
    pub sample: TelemetrySample,
    pub action: StepAction,
    pub damage: f64,
}

/// Advance one step: mitigate if the runner is mitigating, then assess damage.
pub fn step(sample: &TelemetrySample, state: MitigationState) -> StepOutcome {
    let (sample, action) = match state {
        MitigationState::Dormant => (*sample, StepAction::None),
        MitigationState::Mitigating => {
            let mode = diagnose(sample);
            (recover(sample, mode), StepAction::Mitigate(mode))
        }
    };
    StepOutcome {
        state,
        sample,
        action,
        damage: mission_damage(&sample),
    }
}

/// Result of one scenario run. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioResult {
    /// Responder used for this run.
    pub responder: Responder,
    /// Trace after per-step mitigation.
    pub trace: TelemetrySeries,
    /// Anomaly score per step (on the faulted trace).
    pub anomaly_scores: Vec<f64>,
    /// Anomaly flag per step.
    pub anomaly_flags: Vec<bool>,
    /// Threshold the flags were computed with.
    pub threshold: f64,
    /// First flagged step.
    pub first_flagged: Option<usize>,
    /// Step at which mitigation began.
    pub trigger_step: Option<usize>,
    /// Action per step.
    pub actions: Vec<StepAction>,
    /// Damage per step.
    pub damage: Vec<f64>,
    /// Sum of per-step damage.
    pub total_damage: f64,
    /// `max(0, 1000 - total_damage)`.
    pub survival_score: f64,
}

impl ScenarioResult {
    /// Whether the responder ever acted.
    pub fn triggered(&self) -> bool {
        self.trigger_step.is_some()
    }

    /// Action labels per step (`"none"` or the failure mode name).
    pub fn action_labels(&self) -> Vec<&'static str> {
        self.actions.iter().map(StepAction::label).collect()
    }

    /// Running damage total per step.
    pub fn cumulative_damage(&self) -> Vec<f64> {
        self.damage
            .iter()
            .scan(0.0, |acc, d| {
                *acc += d;
                Some(*acc)
            })
            .collect()
    }

    /// Number of mitigated steps.
    pub fn mitigated_steps(&self) -> usize {
        self.actions
            .iter()
            .filter(|a| matches!(a, StepAction::Mitigate(_)))
            .count()
    }
}

/// Runs missions against a fitted detector.
#[derive(Debug, Clone, Copy)]
pub struct ScenarioRunner<'a> {
    detector: &'a AnomalyDetector,
    threshold: Option<f64>,
}

impl<'a> ScenarioRunner<'a> {
    /// Runner using the per-series default threshold.
    pub fn new(detector: &'a AnomalyDetector) -> Self {
        Self {
            detector,
            threshold: None,
        }
    }

    /// Use a fixed flag threshold instead of the per-series default.
    pub fn with_threshold(mut self, threshold: Option<f64>) -> Self {
        self.threshold = threshold;
        self
    }

    /// Score and flag a trace; returns `(scores, flags, threshold)`.
    pub fn detect(&self, trace: &TelemetrySeries) -> Result<(Vec<f64>, Vec<bool>, f64)> {
        let threshold = self.threshold.map(validate_threshold).transpose()?;
        let scores = self.detector.score(trace)?;
        let threshold = match threshold {
            Some(t) => t,
            None => default_threshold(&scores)?,
        };
        let flags = flag(&scores, threshold);
        Ok((scores, flags, threshold))
    }

    /// Run one mission.
    pub fn run(&self, trace: &TelemetrySeries, responder: Responder) -> Result<ScenarioResult> {
        let (scores, flags, threshold) = self.detect(trace)?;
        Ok(self.run_with_flags(trace, responder, scores, flags, threshold))
    }

    /// Run one mission from precomputed detection output.
    pub(crate) fn run_with_flags(
        &self,
        trace: &TelemetrySeries,
        responder: Responder,
        anomaly_scores: Vec<f64>,
        anomaly_flags: Vec<bool>,
        threshold: f64,
    ) -> ScenarioResult {
        let n = trace.len();
        let first_flagged = anomaly_flags.iter().position(|f| *f);
        let trigger_step = responder.trigger_step(first_flagged, n);

        match trigger_step {
            Some(t) => log::debug!(
                "{responder} responder: first flag at {:?}, mitigating from step {t}",
                first_flagged
            ),
            None => log::warn!("{responder} responder: no anomaly flagged, staying dormant"),
        }

        let mut samples = Vec::with_capacity(n);
        let mut actions = Vec::with_capacity(n);
        let mut damage = Vec::with_capacity(n);

        for (t, sample) in trace.iter().enumerate() {
            let outcome = step(sample, MitigationState::at(t, trigger_step));
            samples.push(outcome.sample);
            actions.push(outcome.action);
            damage.push(outcome.damage);
        }

        let total_damage: f64 = damage.iter().sum();

        ScenarioResult {
            responder,
            trace: TelemetrySeries::from_valid(samples),
            anomaly_scores,
            anomaly_flags,
            threshold,
            first_flagged,
            trigger_step,
            actions,
            damage,
            total_damage,
            survival_score: survival_score(total_damage),
        }
    }
}

/// Run one mission with the given responder.
pub fn run_scenario(
    trace: &TelemetrySeries,
    detector: &AnomalyDetector,
    responder: Responder,
    threshold: Option<f64>,
) -> Result<ScenarioResult> {
    ScenarioRunner::new(detector)
        .with_threshold(threshold)
        .run(trace, responder)
}
