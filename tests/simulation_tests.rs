//! Integration tests for the AstraGuard mission pipeline.

use astraguard::detector::{default_threshold, quantile};
use astraguard::*;
use tempfile::tempdir;

// ============================================================================
// Helper Functions
// ============================================================================

fn fitted_detector(train_steps: usize) -> AnomalyDetector {
    let training = generate(train_steps, 1, 1.0).unwrap();
    let mut detector =
        AnomalyDetector::new(DetectorConfig::default().with_contamination(0.04)).unwrap();
    detector.fit(&training).unwrap();
    detector
}

fn reference_mission() -> TelemetrySeries {
    let mission = generate(300, 7, 1.1).unwrap();
    inject(&mission, "thermal_runaway", 160, 1.2).unwrap()
}

// ============================================================================
// Section 1: Telemetry and Injection
// ============================================================================

#[test]
fn test_generation_is_deterministic() {
    assert_eq!(generate(300, 7, 1.1).unwrap(), generate(300, 7, 1.1).unwrap());
    assert_ne!(generate(300, 7, 1.1).unwrap(), generate(300, 8, 1.1).unwrap());
}

#[test]
fn test_zero_steps_rejected() {
    let err = generate(0, 7, 1.0).unwrap_err();
    assert!(matches!(err, AstraError::InvalidArgument(_)));
}

#[test]
fn test_every_series_is_clamped() {
    let mission = generate(300, 3, 25.0).unwrap();
    for archetype in FailureArchetype::ALL {
        let faulted = FailureSpec::new(archetype, 50, 2.0).apply(&mission).unwrap();
        for sample in &faulted {
            assert!(sample.is_within_domain(), "{archetype}: {sample:?}");
        }
    }
}

#[test]
fn test_injection_leaves_prefix_untouched() {
    let mission = generate(300, 7, 1.1).unwrap();
    let faulted = reference_mission();
    assert_eq!(&faulted.samples()[..160], &mission.samples()[..160]);
    assert_ne!(faulted.samples()[200], mission.samples()[200]);
}

#[test]
fn test_csv_roundtrip_on_disk() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("telemetry.csv");
    let series = reference_mission();
    series.to_csv(&path).unwrap();

    let loaded = TelemetrySeries::from_csv(&path).unwrap();
    assert_eq!(loaded.len(), series.len());
    for (a, b) in loaded.iter().zip(series.iter()) {
        assert_eq!(a.t, b.t);
        assert!((a.temperature - b.temperature).abs() < 1e-9);
    }
}

#[test]
fn test_csv_missing_channel() {
    let data = "t,battery,temperature,signal\n0,90,35,85\n";
    let err = TelemetrySeries::read_csv(data.as_bytes()).unwrap_err();
    assert!(matches!(err, AstraError::DimensionMismatch { .. }));
}

#[test]
fn test_csv_non_finite_rejected() {
    let data = "t,battery,temperature,signal,cpu_load\n0,90,35,85,40\n1,NaN,35,85,40\n";
    let err = TelemetrySeries::read_csv(data.as_bytes()).unwrap_err();
    assert!(matches!(err, AstraError::Format { line: 3, .. }));
}

#[test]
fn test_decoded_series_keeps_invariants() {
    let gap = r#"{"samples":[
        {"t":3,"battery":90.0,"temperature":35.0,"signal":85.0,"cpu_load":40.0},
        {"t":9,"battery":90.0,"temperature":35.0,"signal":85.0,"cpu_load":40.0}]}"#;
    assert!(serde_json::from_str::<TelemetrySeries>(gap).is_err());

    let wild = r#"{"samples":[
        {"t":0,"battery":500.0,"temperature":35.0,"signal":85.0,"cpu_load":40.0}]}"#;
    let series: TelemetrySeries = serde_json::from_str(wild).unwrap();
    assert!(series.iter().all(TelemetrySample::is_within_domain));
}

// ============================================================================
// Section 2: Detector
// ============================================================================

#[test]
fn test_detector_must_fit() {
    let detector = AnomalyDetector::new(DetectorConfig::default()).unwrap();
    assert_eq!(
        detector.score(&reference_mission()).unwrap_err(),
        AstraError::NotFitted
    );
}

#[test]
fn test_detector_rejects_bad_contamination() {
    for c in [0.0, -0.1, 1.5, f64::NAN] {
        let err = AnomalyDetector::new(DetectorConfig::default().with_contamination(c)).unwrap_err();
        assert!(matches!(err, AstraError::InvalidArgument(_)));
    }
}

#[test]
fn test_failure_scores_higher_than_nominal() {
    let detector = fitted_detector(450);
    let scores = detector.score(&reference_mission()).unwrap();

    let before = quantile(&scores[..150], 0.5).unwrap();
    let late = quantile(&scores[250..], 0.5).unwrap();
    assert!(late > before, "late {late} vs before {before}");
}

#[test]
fn test_default_threshold_flags_top_tail() {
    let detector = fitted_detector(450);
    let trace = reference_mission();
    let scores = detector.score(&trace).unwrap();
    let flags = detector.classify(&trace, None).unwrap();
    let threshold = default_threshold(&scores).unwrap();

    for (s, f) in scores.iter().zip(&flags) {
        assert_eq!(*f, *s >= threshold);
    }
    assert!(flags.iter().any(|f| *f));
}

// ============================================================================
// Section 3: Diagnosis and Recovery
// ============================================================================

#[test]
fn test_diagnosis_priority() {
    let s = TelemetrySample::new(0, 10.0, 60.0, 85.0, 40.0);
    assert_eq!(diagnose(&s), FailureMode::Thermal);
}

#[test]
fn test_recovery_never_increases_damage() {
    let trace = reference_mission();
    for sample in &trace {
        let mode = diagnose(sample);
        assert!(mission_damage(&recover(sample, mode)) <= mission_damage(sample) + 1e-12);
    }
}

// ============================================================================
// Section 4: Scenario Runner
// ============================================================================

#[test]
fn test_human_delay_bound() {
    let human = Responder::HumanDelayed { delay_steps: 40 };
    assert_eq!(human.trigger_step(Some(280), 300), Some(299));
}

#[test]
fn test_dormant_when_nothing_flagged() {
    let detector = fitted_detector(400);
    let result = run_scenario(&reference_mission(), &detector, Responder::Automated, Some(1e6))
        .unwrap();
    assert_eq!(result.trigger_step, None);
    assert!(result.action_labels().iter().all(|a| *a == "none"));
    assert_eq!(result.mitigated_steps(), 0);
}

#[test]
fn test_rejected_threshold_runs_nothing() {
    let detector = fitted_detector(400);
    let err = run_scenario(
        &reference_mission(),
        &detector,
        Responder::Automated,
        Some(f64::INFINITY),
    )
    .unwrap_err();
    assert!(matches!(err, AstraError::InvalidArgument(_)));
}

// ============================================================================
// Section 5: End-to-End Comparison
// ============================================================================

#[test]
fn test_reference_mission_end_to_end() {
    let detector = fitted_detector(450);
    let result = compare(&reference_mission(), &detector, 12, None).unwrap();

    let automated = result.automated.trigger_step.unwrap();
    let human = result.human.trigger_step.unwrap();
    assert!(automated <= human);
    assert_eq!(human, (automated + 12).min(299));
    assert!(result.automated.total_damage <= result.human.total_damage);
    assert!(result.damage_reduced >= 0.0);
    assert!(result.survival_gain >= 0.0);

    let cumulative = result.human.cumulative_damage();
    assert!(cumulative.windows(2).all(|w| w[1] >= w[0]));
}

#[test]
fn test_comparison_replay_is_idempotent() {
    let detector = fitted_detector(400);
    let trace = reference_mission();
    let a = compare(&trace, &detector, 12, None).unwrap();
    let b = compare(&trace, &detector, 12, None).unwrap();
    assert_eq!(a, b);
}

#[test]
fn test_simulation_from_config_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("mission.json");
    std::fs::write(
        &path,
        r#"{ "failure_type": "power_drain", "failure_start": 120, "severity": 1.5,
             "detector_sensitivity": 0.05, "n_estimators": 80 }"#,
    )
    .unwrap();

    let config = SimulationConfig::from_json_file(&path).unwrap();
    assert_eq!(config.failure_type, FailureArchetype::PowerDrain);
    assert_eq!(config.detector.n_estimators, 80);

    let outcome = run_simulation(&config).unwrap();
    assert_eq!(outcome.faulted.len(), 300);
    assert!(outcome.comparison.automated.total_damage <= outcome.comparison.human.total_damage);

    let json = serde_json::to_string(&outcome.comparison).unwrap();
    assert!(json.contains("\"relative_reduction\""));
}

// ============================================================================
// Section 6: Monte Carlo
// ============================================================================

#[test]
fn test_monte_carlo_is_deterministic() {
    let base = SimulationConfig::new()
        .with_num_steps(200)
        .with_failure_start(90)
        .with_detector(DetectorConfig::default().with_estimators(50));
    let config = MonteCarloConfig::new(base, 4);

    let a = run_monte_carlo(&config).unwrap();
    let b = run_monte_carlo(&config).unwrap();
    assert_eq!(a, b);
    assert_eq!(a.trials.len(), 4);

    // Trial 0 reproduces the single-run experiment.
    let single = run_simulation(&config.base).unwrap();
    assert_eq!(a.trials[0].metrics, single.comparison.metrics());
}

#[test]
fn test_monte_carlo_automated_never_worse() {
    let base = SimulationConfig::new()
        .with_num_steps(200)
        .with_failure_start(90)
        .with_detector(DetectorConfig::default().with_estimators(50));
    let report = run_monte_carlo(&MonteCarloConfig::new(base, 5)).unwrap();
    for trial in &report.trials {
        assert!(trial.metrics.automated_damage <= trial.metrics.human_damage + 1e-9);
    }
    assert!(report.mean.damage_reduced >= -1e-9);
}
