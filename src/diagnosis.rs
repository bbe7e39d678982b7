// AstraGuard - Diagnosis and recovery
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Diagnosis, recovery and damage assessment.
//!
//! All three are stateless functions of a single telemetry sample.

use crate::limits::*;
use crate::telemetry::{Channel, TelemetrySample};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Dominant failure mode of a telemetry snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureMode {
    Thermal,
    Power,
    Comm,
    Cpu,
    Unknown,
}

impl FailureMode {
    /// Label used in action logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureMode::Thermal => "thermal",
            FailureMode::Power => "power",
            FailureMode::Comm => "comm",
            FailureMode::Cpu => "cpu",
            FailureMode::Unknown => "unknown",
        }
    }

    /// Additive mitigation applied for this mode, per channel.
    pub fn mitigation(&self) -> &'static [(Channel, f64)] {
        match self {
            FailureMode::Thermal => &[
                (Channel::Temperature, THERMAL_TEMPERATURE_DELTA),
                (Channel::CpuLoad, THERMAL_CPU_DELTA),
                (Channel::Battery, THERMAL_BATTERY_DELTA),
            ],
            FailureMode::Power => &[
                (Channel::CpuLoad, POWER_CPU_DELTA),
                (Channel::Battery, POWER_BATTERY_DELTA),
            ],
            FailureMode::Comm => &[
                (Channel::Signal, COMM_SIGNAL_DELTA),
                (Channel::CpuLoad, COMM_CPU_DELTA),
                (Channel::Battery, COMM_BATTERY_DELTA),
            ],
            FailureMode::Cpu => &[
                (Channel::CpuLoad, CPU_CPU_DELTA),
                (Channel::Battery, CPU_BATTERY_DELTA),
            ],
            FailureMode::Unknown => &[],
        }
    }
}

impl fmt::Display for FailureMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classify the dominant failure mode.
///
/// Checks run in a fixed order and the first match wins:
/// thermal, power, comm, cpu.
pub fn diagnose(sample: &TelemetrySample) -> FailureMode {
    if sample.temperature > THERMAL_TEMPERATURE_C {
        FailureMode::Thermal
    } else if sample.battery < POWER_BATTERY_PCT {
        FailureMode::Power
    } else if sample.signal < COMM_SIGNAL_PCT {
        FailureMode::Comm
    } else if sample.cpu_load > CPU_OVERLOAD_PCT {
        FailureMode::Cpu
    } else {
        FailureMode::Unknown
    }
}

/// Apply one step of mitigation for `mode`, clamped to channel domains.
pub fn recover(sample: &TelemetrySample, mode: FailureMode) -> TelemetrySample {
    let mut out = mode
        .mitigation()
        .iter()
        .fold(*sample, |s, (channel, delta)| s.shifted(*channel, *delta));

    // Cooling cannot push below the floor, but never heats a cold vehicle.
    if mode == FailureMode::Thermal && sample.temperature > COOLING_FLOOR_C {
        out.temperature = out.temperature.max(COOLING_FLOOR_C);
    }
    out
}

/// Per-step damage of a telemetry state. Zero inside the safe envelope.
pub fn mission_damage(sample: &TelemetrySample) -> f64 {
    DAMAGE_BATTERY_WEIGHT * (DAMAGE_BATTERY_FLOOR - sample.battery).max(0.0)
        + DAMAGE_TEMPERATURE_WEIGHT * (sample.temperature - DAMAGE_TEMPERATURE_CEILING).max(0.0)
        + DAMAGE_SIGNAL_WEIGHT * (DAMAGE_SIGNAL_FLOOR - sample.signal).max(0.0)
        + DAMAGE_CPU_WEIGHT * (sample.cpu_load - DAMAGE_CPU_CEILING).max(0.0)
}

/// Survival score for an accumulated damage total.
pub fn survival_score(total_damage: f64) -> f64 {
    (SURVIVAL_BUDGET - total_damage).max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn nominal() -> TelemetrySample {
        TelemetrySample::new(0, 90.0, 35.0, 85.0, 40.0)
    }

    #[test]
    fn test_diagnose_priority() {
        let s = TelemetrySample::new(0, 10.0, 60.0, 85.0, 40.0);
        assert_eq!(diagnose(&s), FailureMode::Thermal);

        let s = TelemetrySample::new(0, 10.0, 35.0, 10.0, 99.0);
        assert_eq!(diagnose(&s), FailureMode::Power);

        let s = TelemetrySample::new(0, 90.0, 35.0, 10.0, 99.0);
        assert_eq!(diagnose(&s), FailureMode::Comm);

        let s = TelemetrySample::new(0, 90.0, 35.0, 85.0, 99.0);
        assert_eq!(diagnose(&s), FailureMode::Cpu);

        assert_eq!(diagnose(&nominal()), FailureMode::Unknown);
    }

    #[test]
    fn test_diagnose_thresholds_are_strict() {
        let s = TelemetrySample::new(0, 35.0, 50.0, 40.0, 85.0);
        assert_eq!(diagnose(&s), FailureMode::Unknown);
    }

    #[test]
    fn test_recover_thermal() {
        let s = TelemetrySample::new(0, 90.0, 55.0, 85.0, 50.0);
        let r = recover(&s, FailureMode::Thermal);
        assert_relative_eq!(r.temperature, 52.0, epsilon = 1e-9);
        assert_relative_eq!(r.cpu_load, 42.0, epsilon = 1e-9);
        assert_relative_eq!(r.battery, 89.7, epsilon = 1e-9);
        assert_relative_eq!(r.signal, 85.0, epsilon = 1e-9);
    }

    #[test]
    fn test_recover_thermal_floor() {
        let s = TelemetrySample::new(0, 90.0, 21.0, 85.0, 5.0);
        let r = recover(&s, FailureMode::Thermal);
        assert_eq!(r.temperature, COOLING_FLOOR_C);
        assert_eq!(r.cpu_load, 0.0);
    }

    #[test]
    fn test_recover_power_comm_cpu() {
        let s = TelemetrySample::new(0, 99.8, 35.0, 95.0, 99.0);

        let p = recover(&s, FailureMode::Power);
        assert_eq!(p.battery, 100.0);
        assert_relative_eq!(p.cpu_load, 89.0, epsilon = 1e-9);

        let c = recover(&s, FailureMode::Comm);
        assert_eq!(c.signal, 100.0);
        assert_eq!(c.cpu_load, 100.0);
        assert_relative_eq!(c.battery, 99.6, epsilon = 1e-9);

        let u = recover(&s, FailureMode::Cpu);
        assert_relative_eq!(u.cpu_load, 84.0, epsilon = 1e-9);
        assert_relative_eq!(u.battery, 99.6, epsilon = 1e-9);
    }

    #[test]
    fn test_recover_unknown_is_noop() {
        let s = nominal();
        assert_eq!(recover(&s, FailureMode::Unknown), s);
    }

    #[test]
    fn test_recover_stays_clamped() {
        let s = TelemetrySample::new(0, 0.1, 35.0, 5.0, 1.0);
        for mode in [
            FailureMode::Thermal,
            FailureMode::Power,
            FailureMode::Comm,
            FailureMode::Cpu,
        ] {
            assert!(recover(&s, mode).is_within_domain());
        }
    }

    #[test]
    fn test_damage_formula() {
        assert_eq!(mission_damage(&nominal()), 0.0);

        let s = TelemetrySample::new(0, 30.0, 55.0, 40.0, 90.0);
        // 0.6*10 + 1.2*10 + 0.7*10 + 0.4*10
        assert_relative_eq!(mission_damage(&s), 29.0, epsilon = 1e-9);
    }

    #[test]
    fn test_survival_score() {
        assert_eq!(survival_score(250.0), 750.0);
        assert_eq!(survival_score(1500.0), 0.0);
    }

    #[test]
    fn test_mode_labels() {
        assert_eq!(FailureMode::Comm.to_string(), "comm");
        assert_eq!(
            serde_json::to_string(&FailureMode::Thermal).unwrap(),
            "\"thermal\""
        );
    }
}
