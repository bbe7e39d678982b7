// AstraGuard CLI - Report writers
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! JSON and CSV output for mission runs.

use crate::CliError;
use astraguard::{ComparisonMetrics, MonteCarloReport, SimulationConfig, SimulationOutcome};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// Wrapper adding run metadata around a deterministic payload.
#[derive(Debug, Serialize)]
pub struct Report<'a, T: Serialize> {
    pub generated_at: String,
    pub version: &'static str,
    #[serde(flatten)]
    pub payload: &'a T,
}

impl<'a, T: Serialize> Report<'a, T> {
    pub fn new(payload: &'a T) -> Self {
        Self {
            generated_at: chrono::Utc::now().to_rfc3339(),
            version: astraguard::VERSION,
            payload,
        }
    }
}

/// `comparison.json` body.
#[derive(Debug, Serialize)]
pub struct ComparisonPayload<'a> {
    pub config: &'a SimulationConfig,
    pub metrics: ComparisonMetrics,
    pub automated_actions: Vec<&'static str>,
    pub human_actions: Vec<&'static str>,
    pub anomaly_scores: &'a [f64],
    pub anomaly_flags: &'a [bool],
    pub threshold: f64,
    pub automated_cumulative_damage: Vec<f64>,
    pub human_cumulative_damage: Vec<f64>,
}

impl<'a> ComparisonPayload<'a> {
    pub fn new(outcome: &'a SimulationOutcome) -> Self {
        let c = &outcome.comparison;
        Self {
            config: &outcome.config,
            metrics: c.metrics(),
            automated_actions: c.automated.action_labels(),
            human_actions: c.human.action_labels(),
            anomaly_scores: &c.automated.anomaly_scores,
            anomaly_flags: &c.automated.anomaly_flags,
            threshold: c.automated.threshold,
            automated_cumulative_damage: c.automated.cumulative_damage(),
            human_cumulative_damage: c.human.cumulative_damage(),
        }
    }
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), CliError> {
    let content = serde_json::to_string_pretty(value)?;
    fs::write(path, content)?;
    info!("Wrote {}", path.display());
    Ok(())
}

/// Write `comparison.json` and the three trace CSVs into `dir`.
pub fn write_comparison(dir: &Path, outcome: &SimulationOutcome) -> Result<Vec<PathBuf>, CliError> {
    fs::create_dir_all(dir)?;

    let json = dir.join("comparison.json");
    write_json(&json, &Report::new(&ComparisonPayload::new(outcome)))?;

    let traces = [
        ("telemetry.csv", &outcome.faulted),
        ("automated_trace.csv", &outcome.comparison.automated.trace),
        ("human_trace.csv", &outcome.comparison.human.trace),
    ];
    let mut written = vec![json];
    for (name, series) in traces {
        let path = dir.join(name);
        series.to_csv(&path)?;
        info!("Wrote {}", path.display());
        written.push(path);
    }
    Ok(written)
}

/// Write `monte_carlo.json` into `dir`.
pub fn write_monte_carlo(dir: &Path, report: &MonteCarloReport) -> Result<PathBuf, CliError> {
    fs::create_dir_all(dir)?;
    let path = dir.join("monte_carlo.json");
    write_json(&path, &Report::new(report))?;
    Ok(path)
}

fn trigger(step: Option<usize>) -> String {
    step.map_or_else(|| "never".to_string(), |s| s.to_string())
}

/// Human-readable single mission summary.
pub fn summary(metrics: &ComparisonMetrics) -> String {
    let relative = metrics
        .relative_reduction
        .map_or_else(|| "n/a".to_string(), |r| format!("{:.1}%", r * 100.0));
    format!(
        "=== AstraGuard Summary ===\n\
         Automated trigger step: {}\n\
         Human trigger step:     {}\n\
         Automated damage: {:.2} | survival score: {:.2}\n\
         Human damage:     {:.2} | survival score: {:.2}\n\
         Damage reduced: {:.2} ({}) | survival gain: {:.2}",
        trigger(metrics.automated_trigger),
        trigger(metrics.human_trigger),
        metrics.automated_damage,
        metrics.automated_survival,
        metrics.human_damage,
        metrics.human_survival,
        metrics.damage_reduced,
        relative,
        metrics.survival_gain,
    )
}

/// Human-readable Monte-Carlo summary.
pub fn monte_carlo_summary(report: &MonteCarloReport) -> String {
    let m = &report.mean;
    let relative = m
        .relative_reduction
        .map_or_else(|| "n/a".to_string(), |r| format!("{:.1}%", r * 100.0));
    format!(
        "=== AstraGuard Monte Carlo ({} trials) ===\n\
         Mean automated damage: {:.2} | survival score: {:.2}\n\
         Mean human damage:     {:.2} | survival score: {:.2}\n\
         Mean damage reduced: {:.2} ({}) | survival gain: {:.2}\n\
         Trigger rate: automated {:.0}%, human {:.0}%",
        report.trials.len(),
        m.automated_damage,
        m.automated_survival,
        m.human_damage,
        m.human_survival,
        m.damage_reduced,
        relative,
        m.survival_gain,
        m.automated_trigger_rate * 100.0,
        m.human_trigger_rate * 100.0,
    )
}
