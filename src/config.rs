// AstraGuard - Simulation configuration
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Simulation configuration.
//!
//! A [`SimulationConfig`] describes one full mission experiment: the clean
//! training series, the detector, the mission series, the injected failure and
//! the human response delay. Configs round-trip through JSON; every field has
//! a default so partial files are accepted.

use crate::detector::{validate_threshold, DetectorConfig};
use crate::error::{AstraError, Result};
use crate::failure::{FailureArchetype, FailureSpec};
use crate::generator::GeneratorConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// One mission experiment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Failure archetype injected into the mission series.
    pub failure_type: FailureArchetype,
    /// Step at which the failure begins.
    pub failure_start: usize,
    /// Failure severity multiplier.
    pub severity: f64,
    /// Steps between the first flag and the human response.
    pub human_delay: usize,
    /// Noise seed of the mission series.
    pub seed: u64,
    /// Mission length.
    pub n_steps: usize,
    /// Noise multiplier of the mission series.
    pub noise_scale: f64,
    /// Length of the clean training series.
    pub train_steps: usize,
    /// Noise seed of the training series.
    pub train_seed: u64,
    /// Noise multiplier of the training series.
    pub train_noise_scale: f64,
    /// Detector parameters (`contamination`, `n_estimators`, ...).
    #[serde(flatten)]
    pub detector: DetectorConfig,
    /// Fixed flag threshold; the per-series default is used when absent.
    pub anomaly_threshold: Option<f64>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            failure_type: FailureArchetype::ThermalRunaway,
            failure_start: 160,
            severity: 1.2,
            human_delay: 12,
            seed: 7,
            n_steps: 300,
            noise_scale: 1.1,
            train_steps: 400,
            train_seed: 1,
            train_noise_scale: 1.0,
            detector: DetectorConfig::default(),
            anomaly_threshold: None,
        }
    }
}

impl SimulationConfig {
    /// Create a config with mission defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set failure archetype.
    pub fn with_failure(mut self, archetype: FailureArchetype) -> Self {
        self.failure_type = archetype;
        self
    }

    /// Set failure start step.
    pub fn with_failure_start(mut self, start: usize) -> Self {
        self.failure_start = start;
        self
    }

    /// Set failure severity.
    pub fn with_severity(mut self, severity: f64) -> Self {
        self.severity = severity;
        self
    }

    /// Set human response delay in steps.
    pub fn with_human_delay(mut self, delay: usize) -> Self {
        self.human_delay = delay;
        self
    }

    /// Set mission noise seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Set mission length.
    pub fn with_num_steps(mut self, n: usize) -> Self {
        self.n_steps = n;
        self
    }

    /// Set mission noise scale.
    pub fn with_noise_scale(mut self, scale: f64) -> Self {
        self.noise_scale = scale;
        self
    }

    /// Set training series length.
    pub fn with_train_steps(mut self, n: usize) -> Self {
        self.train_steps = n;
        self
    }

    /// Set detector contamination.
    pub fn with_contamination(mut self, contamination: f64) -> Self {
        self.detector.contamination = contamination;
        self
    }

    /// Replace the detector parameters.
    pub fn with_detector(mut self, detector: DetectorConfig) -> Self {
        self.detector = detector;
        self
    }

    /// Set a fixed anomaly threshold.
    pub fn with_threshold(mut self, threshold: Option<f64>) -> Self {
        self.anomaly_threshold = threshold;
        self
    }

    /// Generator settings for the mission series.
    pub fn mission(&self) -> GeneratorConfig {
        GeneratorConfig::new()
            .with_num_steps(self.n_steps)
            .with_seed(self.seed)
            .with_noise_scale(self.noise_scale)
    }

    /// Generator settings for the training series.
    pub fn training(&self) -> GeneratorConfig {
        GeneratorConfig::new()
            .with_num_steps(self.train_steps)
            .with_seed(self.train_seed)
            .with_noise_scale(self.train_noise_scale)
    }

    /// Failure injected into the mission series.
    pub fn failure(&self) -> FailureSpec {
        FailureSpec::new(self.failure_type, self.failure_start, self.severity)
    }

    /// Check every parameter before anything runs.
    pub fn validate(&self) -> Result<()> {
        self.mission().validate()?;
        self.training().validate()?;
        if self.train_steps < 2 {
            return Err(AstraError::invalid(format!(
                "train_steps must be at least 2, got {}",
                self.train_steps
            )));
        }
        self.failure().validate()?;
        self.detector.validate()?;
        if let Some(threshold) = self.anomaly_threshold {
            validate_threshold(threshold)?;
        }
        Ok(())
    }

    /// Load a config from a JSON file. Missing fields take their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save this config as pretty-printed JSON.
    pub fn to_json_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }
}

/// Repeated trials of one experiment that differ only in the mission seed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonteCarloConfig {
    /// Experiment every trial is derived from.
    pub base: SimulationConfig,
    /// Number of trials.
    pub trials: usize,
}

impl Default for MonteCarloConfig {
    fn default() -> Self {
        Self {
            base: SimulationConfig::default(),
            trials: 20,
        }
    }
}

impl MonteCarloConfig {
    /// Create a Monte-Carlo config around `base`.
    pub fn new(base: SimulationConfig, trials: usize) -> Self {
        Self { base, trials }
    }

    /// Mission seed of trial `index`.
    ///
    /// Trial 0 reproduces the base experiment; later trials step the seed
    /// with a large odd stride so neighbouring bases do not share trials.
    pub fn trial_seed(&self, index: usize) -> u64 {
        self.base
            .seed
            .wrapping_add((index as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15))
    }

    /// Config of trial `index`.
    pub fn trial(&self, index: usize) -> SimulationConfig {
        self.base.clone().with_seed(self.trial_seed(index))
    }

    /// Check the base experiment and the trial count.
    pub fn validate(&self) -> Result<()> {
        if self.trials == 0 {
            return Err(AstraError::invalid("trials must be positive"));
        }
        self.base.validate()
    }
}
