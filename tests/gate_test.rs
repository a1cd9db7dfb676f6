use std::fs;

use rstest::rstest;
use serde_json::json;

use fake_news_detector::evaluation::gate::{
    GateError, GateThresholds, QualityGate, load_metrics,
};

fn write_metrics(dir: &tempfile::TempDir, payload: &serde_json::Value) -> std::path::PathBuf {
    let path = dir.path().join("metrics_baseline.json");
    fs::write(&path, payload.to_string()).expect("write metrics");
    path
}

#[rstest]
#[case(0.75, 0.75, true, &[])]
#[case(0.7499, 0.9, false, &["f1_macro"])]
#[case(0.9, 0.7, false, &["accuracy"])]
#[case(0.5, 0.5, false, &["f1_macro", "accuracy"])]
fn test_gate_reports_each_failing_criterion(
    #[case] f1_macro: f64,
    #[case] accuracy: f64,
    #[case] passed: bool,
    #[case] failing: &[&str],
) {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = write_metrics(
        &dir,
        &json!({
            "accuracy": accuracy,
            "precision_macro": 0.8,
            "recall_macro": 0.8,
            "f1_macro": f1_macro,
            "confusion_matrix": [[10, 2], [3, 9]],
            "n_test": 24
        }),
    );

    let record = load_metrics(&path).expect("metrics load");
    let report = QualityGate::default().evaluate(&record);

    assert_eq!(report.passed(), passed);
    let names = report.failures().map(|c| c.name).collect::<Vec<_>>();
    assert_eq!(names, failing);
    let rendered = report.to_string();
    for name in failing {
        assert!(rendered.contains(&format!("FAIL: {name}")), "{rendered}");
    }
    if passed {
        assert!(rendered.ends_with("Metric gate passed."));
    }
}

#[test]
fn test_custom_thresholds_apply() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = write_metrics(&dir, &json!({"accuracy": 0.8, "f1_macro": 0.8}));
    let record = load_metrics(&path).expect("metrics load");

    let strict = QualityGate::new(GateThresholds {
        min_f1_macro: 0.85,
        min_accuracy: 0.85,
    });
    assert!(!strict.evaluate(&record).passed());
    assert!(QualityGate::default().evaluate(&record).passed());
}

#[test]
fn test_missing_metrics_is_distinct_from_gate_failure() {
    let dir = tempfile::tempdir().expect("tempdir");
    let error = load_metrics(&dir.path().join("absent.json")).unwrap_err();
    assert!(matches!(error, GateError::MetricsMissing { .. }));
}

fn run_metric_gate(metrics: &std::path::Path) -> Option<i32> {
    std::process::Command::new(env!("CARGO_BIN_EXE_metric-gate"))
        .arg("--metrics")
        .arg(metrics)
        .output()
        .expect("run metric-gate")
        .status
        .code()
}

#[rstest]
#[case(0.9, 0.9, 0)]
#[case(0.6, 0.9, 1)]
fn test_metric_gate_exit_status_reflects_verdict(
    #[case] f1_macro: f64,
    #[case] accuracy: f64,
    #[case] expected: i32,
) {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = write_metrics(&dir, &json!({ "f1_macro": f1_macro, "accuracy": accuracy }));
    assert_eq!(run_metric_gate(&path), Some(expected));
}

#[test]
fn test_metric_gate_signals_missing_metrics_separately() {
    let dir = tempfile::tempdir().expect("tempdir");
    assert_eq!(run_metric_gate(&dir.path().join("absent.json")), Some(2));

    let garbled = dir.path().join("garbled.json");
    fs::write(&garbled, "{not json").expect("write");
    assert_eq!(run_metric_gate(&garbled), Some(2));
}
