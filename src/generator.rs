// AstraGuard - Synthetic telemetry generation
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Synthetic telemetry generation.
//!
//! Each channel is a deterministic trend plus a periodic component plus
//! Gaussian noise drawn from a stream seeded solely by the caller's seed.
//! Identical `(n_steps, seed, noise_scale)` always yield an identical series.

use crate::error::{AstraError, Result};
use crate::telemetry::{TelemetrySample, TelemetrySeries, CHANNEL_COUNT};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};

/// Per-channel noise standard deviation at `noise_scale = 1.0`,
/// in [`Channel::ALL`](crate::telemetry::Channel::ALL) order.
pub const NOISE_STD: [f64; CHANNEL_COUNT] = [0.25, 0.35, 0.9, 1.2];

/// Generator configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratorConfig {
    /// Number of steps to generate.
    pub n_steps: usize,
    /// Random seed for the noise stream.
    pub seed: u64,
    /// Multiplier applied to every channel's noise.
    pub noise_scale: f64,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            n_steps: 300,
            seed: 42,
            noise_scale: 1.0,
        }
    }
}

impl GeneratorConfig {
    /// Create a new generator config.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set number of steps.
    pub fn with_num_steps(mut self, n: usize) -> Self {
        self.n_steps = n;
        self
    }

    /// Set random seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Set noise scale.
    pub fn with_noise_scale(mut self, scale: f64) -> Self {
        self.noise_scale = scale;
        self
    }

    /// Reject configurations that cannot produce a series.
    pub fn validate(&self) -> Result<()> {
        if self.n_steps == 0 {
            return Err(AstraError::invalid("n_steps must be positive"));
        }
        if !self.noise_scale.is_finite() || self.noise_scale < 0.0 {
            return Err(AstraError::invalid(format!(
                "noise_scale must be finite and non-negative, got {}",
                self.noise_scale
            )));
        }
        Ok(())
    }

    /// Generate the series described by this config.
    pub fn generate(&self) -> Result<TelemetrySeries> {
        generate(self.n_steps, self.seed, self.noise_scale)
    }
}

/// Noise-free telemetry at step `t` (trend + periodic component), unclamped.
pub fn nominal(t: usize) -> [f64; CHANNEL_COUNT] {
    let t = t as f64;
    let battery = 100.0 - 0.02 * t + 0.6 * (t / 30.0).sin();
    let temperature = 35.0 + 0.8 * (t / 18.0).sin() + 0.5 * (t / 50.0).cos();
    let signal = 85.0 + 3.0 * (t / 40.0).sin() - 0.02 * (t / 10.0);
    let cpu_load = 35.0 + 8.0 * (t / 10.0).sin() + 5.0 * (t / 17.0).cos();
    [battery, temperature, signal, cpu_load]
}

/// Generate a synthetic telemetry series.
///
/// Noise is drawn channel by channel (every battery draw first, then
/// temperature, signal and CPU load) from a single stream seeded by `seed`.
pub fn generate(n_steps: usize, seed: u64, noise_scale: f64) -> Result<TelemetrySeries> {
    GeneratorConfig {
        n_steps,
        seed,
        noise_scale,
    }
    .validate()?;

    let mut rng = StdRng::seed_from_u64(seed);
    let mut channels: [Vec<f64>; CHANNEL_COUNT] = Default::default();

    for (idx, values) in channels.iter_mut().enumerate() {
        let noise = Normal::new(0.0, NOISE_STD[idx] * noise_scale)
            .map_err(|e| AstraError::invalid(format!("noise distribution: {e}")))?;
        *values = (0..n_steps)
            .map(|t| nominal(t)[idx] + noise.sample(&mut rng))
            .collect();
    }

    let [battery, temperature, signal, cpu_load] = &channels;
    let samples = (0..n_steps)
        .map(|t| TelemetrySample::new(t, battery[t], temperature[t], signal[t], cpu_load[t]))
        .collect();

    log::debug!(
        "generated {} telemetry steps (seed={}, noise_scale={})",
        n_steps,
        seed,
        noise_scale
    );

    Ok(TelemetrySeries::from_valid(samples))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telemetry::Channel;

    #[test]
    fn test_generator_config_default() {
        let config = GeneratorConfig::default();
        assert_eq!(config.n_steps, 300);
        assert_eq!(config.noise_scale, 1.0);
    }

    #[test]
    fn test_rejects_zero_steps() {
        let err = generate(0, 1, 1.0).unwrap_err();
        assert!(matches!(err, AstraError::InvalidArgument(_)));
    }

    #[test]
    fn test_rejects_negative_noise() {
        assert!(generate(10, 1, -0.5).is_err());
        assert!(generate(10, 1, f64::NAN).is_err());
    }

    #[test]
    fn test_reproducibility() {
        let a = generate(200, 12345, 1.3).unwrap();
        let b = generate(200, 12345, 1.3).unwrap();
        for (x, y) in a.iter().zip(b.iter()) {
            assert_eq!(x.battery.to_bits(), y.battery.to_bits());
            assert_eq!(x.temperature.to_bits(), y.temperature.to_bits());
            assert_eq!(x.signal.to_bits(), y.signal.to_bits());
            assert_eq!(x.cpu_load.to_bits(), y.cpu_load.to_bits());
        }
    }

    #[test]
    fn test_seed_changes_noise_only() {
        let a = generate(100, 1, 1.0).unwrap();
        let b = generate(100, 2, 1.0).unwrap();
        assert_ne!(a, b);

        // Without noise, the seed has no effect.
        let quiet_a = generate(100, 1, 0.0).unwrap();
        let quiet_b = generate(100, 2, 0.0).unwrap();
        assert_eq!(quiet_a, quiet_b);

        let base = nominal(37);
        let s = quiet_a.get(37).unwrap();
        assert!((s.battery - base[0]).abs() < 1e-12);
        assert!((s.temperature - base[1]).abs() < 1e-12);
    }

    #[test]
    fn test_steps_are_contiguous() {
        let series = generate(50, 3, 1.0).unwrap();
        assert_eq!(series.len(), 50);
        assert_eq!(series.steps(), (0..50).collect::<Vec<_>>());
    }

    #[test]
    fn test_large_noise_stays_clamped() {
        let series = generate(500, 9, 60.0).unwrap();
        for s in &series {
            assert!(s.is_within_domain(), "sample out of domain: {:?}", s);
        }
        let cpu = series.channel(Channel::CpuLoad);
        assert!(cpu.iter().any(|v| *v == 100.0 || *v == 0.0));
    }
}
