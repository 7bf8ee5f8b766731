use assert_fs::prelude::*;
use plan_forecasts::services::output_formatter::OutputFormatter;
use plan_forecasts::services::run_config::{RecommendationThresholds, RunConfiguration};
use plan_forecasts::services::sensitivity::{OutputMetric, SensitivityAnalyzer};
use plan_forecasts::services::simulation::simulate_plan_from_yaml_file;
use plan_forecasts::services::simulation_types::Recommendation;

const PLAN_YAML: &str = r#"
name: Warehouse move
deadline: 90
budget: 250000
tasks:
  - id: T1
    duration: { min: 15, likely: 20, max: 30 }
    cost: { min: 40000, likely: 50000, max: 70000 }
  - id: T2
    duration: { min: 30, likely: 45, max: 65 }
    cost: { min: 80000, likely: 120000, max: 160000 }
risks:
  - id: R1
    probability: 0.4
    impact_duration: 15
    impact_cost: 20000
    severity: medium
"#;

fn write_plan(temp: &assert_fs::TempDir) -> assert_fs::fixture::ChildPath {
    let plan_file = temp.child("plan.yaml");
    plan_file.write_str(PLAN_YAML).unwrap();
    plan_file
}

#[test]
fn seeded_runs_from_file_are_reproducible() {
    let temp = assert_fs::TempDir::new().unwrap();
    let plan_file = write_plan(&temp);
    let config = RunConfiguration::with_runs(5_000).seeded(42);

    let first = simulate_plan_from_yaml_file(plan_file.path(), &config).unwrap();
    let second = simulate_plan_from_yaml_file(plan_file.path(), &config).unwrap();

    assert_eq!(first.plan_name, "Warehouse move");
    assert_eq!(first.durations, second.durations);
    assert_eq!(first.costs, second.costs);
    assert_eq!(first.success_count, second.success_count);
    assert_ne!(first.run_id, second.run_id);
}

#[test]
fn reference_plan_lands_in_expected_ranges() {
    let temp = assert_fs::TempDir::new().unwrap();
    let plan_file = write_plan(&temp);
    let config = RunConfiguration::with_runs(10_000).seeded(42);

    let result = simulate_plan_from_yaml_file(plan_file.path(), &config).unwrap();

    assert_eq!(result.num_runs, 10_000);
    assert!(!result.partial);
    assert!((result.success_probability + result.failure_probability - 1.0).abs() < 1e-12);
    assert!(result.duration_percentiles.p50 > 60.0 && result.duration_percentiles.p50 < 75.0);
    assert!(result.duration_percentiles.p10 <= result.duration_percentiles.p50);
    assert!(result.duration_percentiles.p50 <= result.duration_percentiles.p90);
    assert!(result.cost_percentiles.p10 <= result.cost_percentiles.p90);

    let r1 = &result.risk_frequencies[0];
    assert_eq!(r1.id, "R1");
    assert!((r1.frequency - 0.4).abs() < 0.03);

    for (&duration, &cost) in result.durations.iter().zip(&result.costs) {
        assert!((45.0..=110.0).contains(&duration));
        assert!((120_000.0..=250_000.0).contains(&cost));
    }
}

#[test]
fn parallel_and_sequential_runs_agree() {
    let temp = assert_fs::TempDir::new().unwrap();
    let plan_file = write_plan(&temp);
    let parallel = RunConfiguration {
        batch_size: 64,
        worker_threads: Some(3),
        ..RunConfiguration::with_runs(2_000).seeded(9)
    };
    let sequential = RunConfiguration {
        parallel: false,
        ..parallel.clone()
    };

    let a = simulate_plan_from_yaml_file(plan_file.path(), &parallel).unwrap();
    let b = simulate_plan_from_yaml_file(plan_file.path(), &sequential).unwrap();

    assert_eq!(a.durations, b.durations);
    assert_eq!(a.costs, b.costs);
    assert_eq!(a.drivers, b.drivers);
}

#[test]
fn iteration_budget_produces_partial_result() {
    let temp = assert_fs::TempDir::new().unwrap();
    let plan_file = write_plan(&temp);
    let config = RunConfiguration {
        iteration_budget: Some(300),
        ..RunConfiguration::with_runs(1_000).seeded(5)
    };

    let result = simulate_plan_from_yaml_file(plan_file.path(), &config).unwrap();
    let formatted = OutputFormatter::new(RecommendationThresholds::default())
        .unwrap()
        .format_simulation_result(&result)
        .unwrap();

    assert!(result.partial);
    assert_eq!(result.requested_runs, 1_000);
    assert_eq!(result.num_runs, 300);
    assert_eq!(formatted.num_runs, 300);
    assert!(formatted.partial);
    assert!(formatted.narrative.ends_with("Based on a partial run of 300 iterations."));
}

#[test]
fn generous_limits_recommend_go_and_name_the_risk_driver() {
    let temp = assert_fs::TempDir::new().unwrap();
    let plan_file = write_plan(&temp);
    let config = RunConfiguration {
        deadline_buffer: 60.0,
        budget_tolerance: 2.0,
        ..RunConfiguration::with_runs(4_000).seeded(21)
    };

    let result = simulate_plan_from_yaml_file(plan_file.path(), &config).unwrap();
    let drivers = SensitivityAnalyzer::new(OutputMetric::TotalDuration)
        .with_top_k(2)
        .analyze(&result)
        .unwrap();

    assert_eq!(result.recommendation, Recommendation::Go);
    assert_eq!(drivers.len(), 2);
    assert_eq!(drivers[0].name, "R1 risk");
    assert_eq!(drivers[0].rank, 1);
    assert_eq!(drivers[1].rank, 2);
    assert!(drivers[0].sensitivity_score >= drivers[1].sensitivity_score);
}

#[test]
fn missing_plan_file_is_reported() {
    let temp = assert_fs::TempDir::new().unwrap();
    let missing = temp.child("missing.yaml");

    let error = simulate_plan_from_yaml_file(missing.path(), &RunConfiguration::with_runs(10))
        .unwrap_err();

    assert!(error.to_string().starts_with("failed to load plan"));
}
