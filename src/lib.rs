//! # AstraGuard - Autonomous Onboard Protection Simulator
//!
//! A deterministic testbed for asking one question: how much mission damage
//! does an onboard anomaly responder save compared to a ground operator who
//! reacts a few steps later?
//!
//! ## Key Features
//!
//! - **Synthetic Telemetry**: Seeded battery, temperature, signal and CPU load channels
//! - **Failure Injection**: Thermal runaway, power drain and comm drop archetypes
//! - **Anomaly Scoring**: Isolation forest fit on nominal telemetry
//! - **Rule-Based Recovery**: Priority diagnosis and per-step mitigation
//! - **Comparison Harness**: Automated vs delayed-human runs, Monte-Carlo trials
//!
//! ## Quick Start
//!
//! ```rust
//! use astraguard::{compare, inject, generate, AnomalyDetector, DetectorConfig};
//!
//! // Fit the detector on clean telemetry
//! let training = generate(400, 1, 1.0).unwrap();
//! let mut detector = AnomalyDetector::new(DetectorConfig::default().with_estimators(50)).unwrap();
//! detector.fit(&training).unwrap();
//!
//! // Fly a mission with an injected failure
//! let mission = generate(300, 7, 1.1).unwrap();
//! let faulted = inject(&mission, "thermal_runaway", 160, 1.2).unwrap();
//!
//! // Compare responders
//! let result = compare(&faulted, &detector, 12, None).unwrap();
//! assert!(result.automated.total_damage <= result.human.total_damage);
//! ```
//!
//! ## Modules
//!
//! - [`telemetry`]: Samples, series, channel domains and CSV I/O
//! - [`generator`]: Synthetic telemetry
//! - [`failure`]: Failure archetypes and injection
//! - [`detector`]: Scaling, isolation forest and flagging
//! - [`diagnosis`]: Diagnosis, recovery and damage model
//! - [`scenario`]: Per-step mission runner
//! - [`comparison`]: Automated vs human comparison
//! - [`monte_carlo`]: Repeated trials
//! - [`config`]: Experiment configuration
//! - [`limits`]: Domain constants

// Modules
pub mod comparison;
pub mod config;
pub mod detector;
pub mod diagnosis;
pub mod error;
pub mod failure;
pub mod generator;
pub mod limits;
pub mod monte_carlo;
pub mod scenario;
pub mod telemetry;

// Re-exports for convenient access
pub use comparison::{
    compare, fit_detector, run_simulation, run_with_detector, ComparisonMetrics,
    ComparisonResult, SimulationOutcome,
};
pub use config::{MonteCarloConfig, SimulationConfig};
pub use detector::{AnomalyDetector, DetectorConfig};
pub use diagnosis::{diagnose, mission_damage, recover, survival_score, FailureMode};
pub use error::{AstraError, Result};
pub use failure::{inject, FailureArchetype, FailureSpec};
pub use generator::{generate, GeneratorConfig};
pub use monte_carlo::{
    run_monte_carlo, run_monte_carlo_sequential, MeanMetrics, MonteCarloReport, TrialOutcome,
};
pub use scenario::{
    run_scenario, MitigationState, Responder, ScenarioResult, ScenarioRunner, StepAction,
};
pub use telemetry::{Channel, TelemetrySample, TelemetrySeries, CHANNEL_COUNT};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_basic_pipeline() {
        let mut detector =
            AnomalyDetector::new(DetectorConfig::default().with_estimators(50)).unwrap();
        detector.fit(&generate(400, 1, 1.0).unwrap()).unwrap();

        let faulted = inject(&generate(300, 7, 1.1).unwrap(), "comm_drop", 150, 1.0).unwrap();
        let result = compare(&faulted, &detector, 12, None).unwrap();

        assert_eq!(result.automated.trace.len(), 300);
        assert!(result.automated.trigger_step.is_some());
        assert!(result.automated.trigger_step <= result.human.trigger_step);
    }
}
