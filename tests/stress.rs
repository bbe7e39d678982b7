//! Stress tests for AstraGuard
//!
//! Run with: cargo test --release stress -- --ignored

use astraguard::*;
use std::time::Instant;

#[test]
#[ignore] // Run manually with --ignored
fn stress_test_monte_carlo() {
    let config = MonteCarloConfig::new(SimulationConfig::default(), 200);

    let start = Instant::now();
    let report = run_monte_carlo(&config).unwrap();
    let elapsed = start.elapsed();

    println!("Ran {} trials in {:?}", report.trials.len(), elapsed);
    println!(
        "Mean damage: automated {:.2}, human {:.2}",
        report.mean.automated_damage, report.mean.human_damage
    );

    assert_eq!(report.trials.len(), 200);
    for trial in &report.trials {
        assert!(trial.metrics.automated_damage <= trial.metrics.human_damage + 1e-9);
    }
}

#[test]
#[ignore]
fn stress_test_long_mission() {
    let mut detector = AnomalyDetector::new(DetectorConfig::default()).unwrap();
    detector.fit(&generate(5_000, 1, 1.0).unwrap()).unwrap();

    let steps = 100_000;
    let start = Instant::now();
    let faulted = inject(&generate(steps, 7, 1.1).unwrap(), "comm_drop", 50_000, 1.0).unwrap();
    let result = compare(&faulted, &detector, 12, None).unwrap();
    let elapsed = start.elapsed();

    let rate = steps as f64 / elapsed.as_secs_f64();
    println!("Compared {} steps in {:?}", steps, elapsed);
    println!("Rate: {:.0} steps/second", rate);

    assert_eq!(result.automated.trace.len(), steps);
    for sample in &result.automated.trace {
        assert!(sample.is_within_domain());
    }
}
