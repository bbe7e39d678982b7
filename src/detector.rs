// AstraGuard - Anomaly scoring
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Anomaly scoring.
//!
//! The detector is fit on nominal telemetry and then scores arbitrary series,
//! one score per step, higher meaning more anomalous.
//!
//! ## Flag threshold
//!
//! [`AnomalyDetector::classify`] without an explicit threshold flags every step
//! whose score reaches the 96th percentile of *that series'* scores. The
//! threshold is recomputed for each classified series rather than learned at
//! fit time, so roughly the top 4% of steps of any series are flagged. Trigger
//! timing downstream depends on this behaviour; a stationary decision boundary
//! is available by passing a threshold explicitly.

pub mod forest;

use crate::error::{AstraError, Result};
use crate::limits::DEFAULT_FLAG_QUANTILE;
use crate::telemetry::{Channel, TelemetrySeries, CHANNEL_COUNT};
use forest::IsolationForest;
use serde::{Deserialize, Serialize};

/// Detector configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Assumed fraction of anomalous samples in the training data, in (0, 1].
    #[serde(alias = "detector_sensitivity")]
    pub contamination: f64,
    /// Number of isolation trees.
    pub n_estimators: usize,
    /// Sub-sample size per tree (capped by the training length).
    pub max_samples: usize,
    /// Seed of the forest's own pseudorandom stream.
    pub random_state: u64,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            contamination: 0.04,
            n_estimators: 300,
            max_samples: 256,
            random_state: 42,
        }
    }
}

impl DetectorConfig {
    /// Create a new detector config.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set contamination.
    pub fn with_contamination(mut self, contamination: f64) -> Self {
        self.contamination = contamination;
        self
    }

    /// Set number of trees.
    pub fn with_estimators(mut self, n: usize) -> Self {
        self.n_estimators = n;
        self
    }

    /// Set the forest seed.
    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = seed;
        self
    }

    /// Validate parameter domains.
    pub fn validate(&self) -> Result<()> {
        if !(self.contamination > 0.0 && self.contamination <= 1.0) {
            return Err(AstraError::invalid(format!(
                "contamination must be in (0, 1], got {}",
                self.contamination
            )));
        }
        if self.n_estimators == 0 {
            return Err(AstraError::invalid("n_estimators must be positive"));
        }
        if self.max_samples < 2 {
            return Err(AstraError::invalid("max_samples must be at least 2"));
        }
        Ok(())
    }
}

/// Per-channel zero-mean / unit-variance scaling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    pub mean: [f64; CHANNEL_COUNT],
    pub scale: [f64; CHANNEL_COUNT],
}

impl StandardScaler {
    /// Fit on feature rows (population standard deviation; constant
    /// channels keep a unit scale).
    pub fn fit(rows: &[[f64; CHANNEL_COUNT]]) -> Self {
        let n = rows.len().max(1) as f64;
        let mut mean = [0.0; CHANNEL_COUNT];
        let mut scale = [1.0; CHANNEL_COUNT];

        for f in 0..CHANNEL_COUNT {
            mean[f] = rows.iter().map(|r| r[f]).sum::<f64>() / n;
            let var = rows.iter().map(|r| (r[f] - mean[f]).powi(2)).sum::<f64>() / n;
            let std = var.sqrt();
            if std > f64::EPSILON {
                scale[f] = std;
            }
        }

        Self { mean, scale }
    }

    /// Scale one feature row.
    pub fn transform(&self, row: &[f64; CHANNEL_COUNT]) -> [f64; CHANNEL_COUNT] {
        let mut out = [0.0; CHANNEL_COUNT];
        for f in 0..CHANNEL_COUNT {
            out[f] = (row[f] - self.mean[f]) / self.scale[f];
        }
        out
    }
}

/// Fitted detector state. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyModel {
    /// Feature scaling learned from the training series.
    pub scaler: StandardScaler,
    /// Novelty model over scaled features.
    pub forest: IsolationForest,
    /// Training normality at the contamination quantile.
    pub offset: f64,
    /// Number of training steps.
    pub trained_on: usize,
}

impl AnomalyModel {
    /// Anomaly score of one feature row: positive above the training offset.
    pub fn score_row(&self, row: &[f64; CHANNEL_COUNT]) -> f64 {
        self.offset - self.forest.normality(&self.scaler.transform(row))
    }
}

/// Isolation-forest based novelty detector over
/// `{battery, temperature, signal, cpu_load}`.
#[derive(Debug, Clone, Default)]
pub struct AnomalyDetector {
    config: DetectorConfig,
    model: Option<AnomalyModel>,
}

impl AnomalyDetector {
    /// Create an unfitted detector.
    pub fn new(config: DetectorConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            model: None,
        })
    }

    /// Feature set, in column order.
    pub fn features() -> [Channel; CHANNEL_COUNT] {
        Channel::ALL
    }

    /// Detector configuration.
    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    /// Fitted state, if any.
    pub fn model(&self) -> Option<&AnomalyModel> {
        self.model.as_ref()
    }

    /// True once [`fit`](Self::fit) has succeeded.
    pub fn is_fitted(&self) -> bool {
        self.model.is_some()
    }

    /// Train scaling and the novelty model on a nominal series.
    ///
    /// Re-fitting replaces any previous state.
    pub fn fit(&mut self, normal: &TelemetrySeries) -> Result<()> {
        if normal.len() < 2 {
            return Err(AstraError::invalid(format!(
                "training series needs at least 2 steps, got {}",
                normal.len()
            )));
        }

        let rows = normal.feature_rows();
        let scaler = StandardScaler::fit(&rows);
        let scaled: Vec<[f64; CHANNEL_COUNT]> = rows.iter().map(|r| scaler.transform(r)).collect();

        let forest = IsolationForest::fit(
            &scaled,
            self.config.n_estimators,
            self.config.max_samples,
            self.config.random_state,
        );

        let training: Vec<f64> = scaled.iter().map(|r| forest.normality(r)).collect();
        let offset = quantile(&training, self.config.contamination)?;

        log::debug!(
            "detector fit on {} steps: {} trees, sub-sample {}, offset {:.5}",
            normal.len(),
            forest.len(),
            forest.sample_size(),
            offset
        );

        self.model = Some(AnomalyModel {
            scaler,
            forest,
            offset,
            trained_on: normal.len(),
        });
        Ok(())
    }

    /// One anomaly score per step; higher is more anomalous.
    pub fn score(&self, series: &TelemetrySeries) -> Result<Vec<f64>> {
        let model = self.model.as_ref().ok_or(AstraError::NotFitted)?;
        Ok(series.iter().map(|s| model.score_row(&s.features())).collect())
    }

    /// Flag anomalous steps.
    ///
    /// Without `threshold`, the 96th percentile of this series' own scores is
    /// used (see the module docs).
    pub fn classify(&self, series: &TelemetrySeries, threshold: Option<f64>) -> Result<Vec<bool>> {
        let scores = self.score(series)?;
        let threshold = match threshold {
            Some(t) => validate_threshold(t)?,
            None => default_threshold(&scores)?,
        };
        Ok(flag(&scores, threshold))
    }
}

/// Reject thresholds that cannot be compared against scores.
pub fn validate_threshold(threshold: f64) -> Result<f64> {
    if threshold.is_finite() {
        Ok(threshold)
    } else {
        Err(AstraError::invalid(format!(
            "anomaly threshold must be finite, got {threshold}"
        )))
    }
}

/// Per-series default threshold: the 96th percentile of `scores`.
pub fn default_threshold(scores: &[f64]) -> Result<f64> {
    quantile(scores, DEFAULT_FLAG_QUANTILE)
}

/// `score >= threshold` for every step.
pub fn flag(scores: &[f64], threshold: f64) -> Vec<bool> {
    scores.iter().map(|s| *s >= threshold).collect()
}

/// Quantile with linear interpolation between closest ranks.
pub fn quantile(values: &[f64], q: f64) -> Result<f64> {
    if values.is_empty() {
        return Err(AstraError::invalid("quantile of an empty sequence"));
    }
    if !(0.0..=1.0).contains(&q) {
        return Err(AstraError::invalid(format!(
            "quantile must be in [0, 1], got {q}"
        )));
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    Ok(sorted[lo] + (sorted[hi] - sorted[lo]) * frac)
}
