// AstraGuard - Failure injection
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Failure injection.
//!
//! A [`FailureSpec`] perturbs a telemetry series deterministically from its
//! start step onward. Injection never mutates the input series.

use crate::error::{AstraError, Result};
use crate::telemetry::{Channel, TelemetrySeries};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Closed set of failure archetypes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureArchetype {
    /// Temperature climbs with an oscillating overshoot; CPU load creeps up.
    ThermalRunaway,
    /// Battery drains faster than nominal; CPU load dips.
    PowerDrain,
    /// Link signal collapses; CPU load rises from retransmissions.
    CommDrop,
}

impl FailureArchetype {
    /// All archetypes.
    pub const ALL: [FailureArchetype; 3] = [
        FailureArchetype::ThermalRunaway,
        FailureArchetype::PowerDrain,
        FailureArchetype::CommDrop,
    ];

    /// Canonical name.
    pub fn name(&self) -> &'static str {
        match self {
            FailureArchetype::ThermalRunaway => "thermal_runaway",
            FailureArchetype::PowerDrain => "power_drain",
            FailureArchetype::CommDrop => "comm_drop",
        }
    }

    /// Channel deltas `k` steps after the failure start, at the given severity.
    ///
    /// Returned deltas are unclamped; [`inject`] clamps the perturbed sample.
    pub fn perturbation(&self, k: usize, severity: f64) -> [(Channel, f64); 2] {
        let k = k as f64;
        match self {
            FailureArchetype::ThermalRunaway => [
                (
                    Channel::Temperature,
                    severity * (0.05 * k + 0.8 * (k / 7.0).sin()),
                ),
                (Channel::CpuLoad, severity * 0.03 * k),
            ],
            FailureArchetype::PowerDrain => [
                (
                    Channel::Battery,
                    -severity * (0.06 * k + 0.4 * (k / 10.0).sin().abs()),
                ),
                (Channel::CpuLoad, -severity * 0.01 * k),
            ],
            FailureArchetype::CommDrop => [
                (
                    Channel::Signal,
                    -severity * (0.18 * k + 3.0 * (k / 6.0).sin().abs()),
                ),
                (Channel::CpuLoad, severity * 0.02 * k),
            ],
        }
    }
}

impl fmt::Display for FailureArchetype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for FailureArchetype {
    type Err = AstraError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "thermal_runaway" => Ok(FailureArchetype::ThermalRunaway),
            "power_drain" => Ok(FailureArchetype::PowerDrain),
            "comm_drop" => Ok(FailureArchetype::CommDrop),
            other => Err(AstraError::invalid(format!(
                "unknown failure archetype: {other}"
            ))),
        }
    }
}

/// Failure injection configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FailureSpec {
    /// Failure pattern.
    pub archetype: FailureArchetype,
    /// Step at which the failure begins (clamped into the series on injection).
    pub start: usize,
    /// Positive multiplier on the perturbation magnitude.
    pub severity: f64,
}

impl FailureSpec {
    /// Create a new failure spec.
    pub fn new(archetype: FailureArchetype, start: usize, severity: f64) -> Self {
        Self {
            archetype,
            start,
            severity,
        }
    }

    /// Severity must be a positive finite multiplier.
    pub fn validate(&self) -> Result<()> {
        if !self.severity.is_finite() || self.severity <= 0.0 {
            return Err(AstraError::invalid(format!(
                "severity must be positive, got {}",
                self.severity
            )));
        }
        Ok(())
    }

    /// Apply this failure to a series.
    pub fn apply(&self, series: &TelemetrySeries) -> Result<TelemetrySeries> {
        self.validate()?;

        let n = series.len();
        let start = self.start.min(n.saturating_sub(1));

        let samples = series
            .iter()
            .map(|sample| {
                if sample.t < start {
                    return *sample;
                }
                self.archetype
                    .perturbation(sample.t - start, self.severity)
                    .into_iter()
                    .fold(*sample, |s, (channel, delta)| s.shifted(channel, delta))
            })
            .collect();

        log::debug!(
            "injected {} at step {} (severity {})",
            self.archetype,
            start,
            self.severity
        );

        Ok(TelemetrySeries::from_valid(samples))
    }
}

/// Inject a named failure into a copy of `series`.
///
/// `archetype` is parsed from its canonical name (`thermal_runaway`,
/// `power_drain`, `comm_drop`); `start` is clamped into `[0, n-1]`.
pub fn inject(
    series: &TelemetrySeries,
    archetype: &str,
    start: usize,
    severity: f64,
) -> Result<TelemetrySeries> {
    let archetype: FailureArchetype = archetype.parse()?;
    FailureSpec::new(archetype, start, severity).apply(series)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::generate;

    fn base() -> TelemetrySeries {
        generate(300, 7, 1.1).unwrap()
    }

    #[test]
    fn test_parse_archetype() {
        assert_eq!(
            "thermal_runaway".parse::<FailureArchetype>().unwrap(),
            FailureArchetype::ThermalRunaway
        );
        assert_eq!(
            "Comm_Drop".parse::<FailureArchetype>().unwrap(),
            FailureArchetype::CommDrop
        );
        let err = "meteor_strike".parse::<FailureArchetype>().unwrap_err();
        assert!(matches!(err, AstraError::InvalidArgument(_)));
    }

    #[test]
    fn test_unknown_archetype_fails() {
        let err = inject(&base(), "solar_flare", 100, 1.0).unwrap_err();
        assert!(matches!(err, AstraError::InvalidArgument(_)));
    }

    #[test]
    fn test_rejects_non_positive_severity() {
        assert!(inject(&base(), "power_drain", 100, 0.0).is_err());
        assert!(inject(&base(), "power_drain", 100, -1.0).is_err());
    }

    #[test]
    fn test_no_change_before_start() {
        let series = base();
        for archetype in FailureArchetype::ALL {
            let faulted = FailureSpec::new(archetype, 160, 1.5).apply(&series).unwrap();
            for t in 0..160 {
                assert_eq!(faulted.get(t), series.get(t));
            }
        }
    }

    #[test]
    fn test_input_is_not_modified() {
        let series = base();
        let copy = series.clone();
        let _ = inject(&series, "comm_drop", 10, 2.0).unwrap();
        assert_eq!(series, copy);
    }

    #[test]
    fn test_start_is_clamped() {
        let series = base();
        let faulted = inject(&series, "thermal_runaway", 10_000, 1.0).unwrap();
        // k = 0 at the last step, so nothing changes anywhere.
        assert_eq!(faulted, series);
    }

    #[test]
    fn test_thermal_runaway_heats() {
        let series = base();
        let faulted = inject(&series, "thermal_runaway", 100, 1.2).unwrap();
        let before = series.get(250).unwrap();
        let after = faulted.get(250).unwrap();
        assert!(after.temperature > before.temperature + 5.0);
        assert!(after.cpu_load >= before.cpu_load);
    }

    #[test]
    fn test_injected_series_stays_clamped() {
        let series = base();
        for archetype in FailureArchetype::ALL {
            let faulted = FailureSpec::new(archetype, 0, 2.0).apply(&series).unwrap();
            for s in &faulted {
                assert!(s.is_within_domain());
            }
        }
        let drained = inject(&series, "power_drain", 0, 6.0).unwrap();
        assert_eq!(drained.get(299).unwrap().battery, 0.0);
    }

    #[test]
    fn test_perturbation_channels() {
        use Channel::*;
        let channels = |a: FailureArchetype| a.perturbation(3, 1.0).map(|(c, _)| c);
        assert_eq!(channels(FailureArchetype::ThermalRunaway), [Temperature, CpuLoad]);
        assert_eq!(channels(FailureArchetype::PowerDrain), [Battery, CpuLoad]);
        assert_eq!(channels(FailureArchetype::CommDrop), [Signal, CpuLoad]);
        for archetype in FailureArchetype::ALL {
            assert!(archetype.perturbation(0, 1.0).iter().all(|(_, d)| *d == 0.0));
        }
    }

    #[test]
    fn test_severity_is_monotonic() {
        for archetype in FailureArchetype::ALL {
            for k in [1usize, 5, 20, 33, 80] {
                let low = archetype.perturbation(k, 0.5);
                let high = archetype.perturbation(k, 1.5);
                for ((_, a), (_, b)) in low.iter().zip(high.iter()) {
                    assert!(b.abs() > a.abs(), "{archetype} k={k}: {a} vs {b}");
                }
            }
        }
    }
}
