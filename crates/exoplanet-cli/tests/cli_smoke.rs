//! CLI binary smoke tests using assert_cmd.
//!
//! These tests exercise the compiled `exoplanet` binary end-to-end:
//! argument parsing, training into a model directory, and the commands
//! that read the saved artifacts back.

use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;

fn cmd() -> Command {
    Command::cargo_bin("exoplanet").unwrap()
}

const QUICK_CONFIG: &str = r#"{
    "model_type": "ensemble",
    "hyperparameters": {
        "rf_n_estimators": 20,
        "rf_max_depth": 6,
        "xgb_n_estimators": 20,
        "xgb_max_depth": 3
    },
    "options": { "cv_folds": 3 },
    "report": true
}"#;

/// Train the quick config on synthetic data into `<dir>/models`.
fn train_into(dir: &Path) -> std::path::PathBuf {
    let config = dir.join("train.json");
    fs::write(&config, QUICK_CONFIG).unwrap();
    let model_dir = dir.join("models");
    cmd()
        .arg("train")
        .arg(&config)
        .arg("--synthetic")
        .arg("--model-dir")
        .arg(&model_dir)
        .assert()
        .success()
        .stdout(predicate::str::contains("\"accuracy\""));
    model_dir
}

// ---------------------------------------------------------------------------
// Top-level
// ---------------------------------------------------------------------------

#[test]
fn no_args_shows_help() {
    cmd()
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
}

#[test]
fn help_flag() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("train"))
        .stdout(predicate::str::contains("predict"))
        .stdout(predicate::str::contains("hyperparams"));
}

#[test]
fn version_flag() {
    cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("exoplanet"));
}

#[test]
fn unknown_subcommand_errors() {
    cmd().arg("classify").assert().failure();
}

// ---------------------------------------------------------------------------
// Model-free commands
// ---------------------------------------------------------------------------

#[test]
fn features_lists_schema() {
    let output = cmd().arg("features").output().unwrap();
    assert!(output.status.success());
    let features: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let features = features.as_array().unwrap();
    assert_eq!(features.len(), 12);
    assert_eq!(features[0]["name"], "koi_period");
    assert!(features.iter().all(|f| f["description"].is_string()));
}

#[test]
fn sample_prints_requested_records() {
    let output = cmd().args(["sample", "-n", "3"]).output().unwrap();
    assert!(output.status.success());
    let records: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let records = records.as_array().unwrap();
    assert_eq!(records.len(), 3);
    assert!(records.iter().all(|r| r.as_object().unwrap().len() == 12));
}

#[test]
fn sample_rejects_non_numeric_count() {
    cmd().args(["sample", "-n", "three"]).assert().failure();
}

// ---------------------------------------------------------------------------
// Train
// ---------------------------------------------------------------------------

#[test]
fn train_writes_artifacts_and_report() {
    let dir = tempfile::tempdir().unwrap();
    let model_dir = train_into(dir.path());

    assert!(model_dir.join("exoplanet_model.json").exists());
    assert!(model_dir.join("data_processor.json").exists());
    let report = fs::read_to_string(model_dir.join("exoplanet_trainer_report.html")).unwrap();
    assert!(report.contains("Feature Importance"));
    assert!(model_dir.join("exoplanet_trainer_config.json").exists());
}

#[test]
fn train_rejects_invalid_override() {
    let dir = tempfile::tempdir().unwrap();
    cmd()
        .args(["train", "--synthetic", "--no-report", "--set", "xgb_subsample=1.5", "--model-dir"])
        .arg(dir.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("xgb_subsample"));
    assert!(!dir.path().join("exoplanet_model.json").exists());
}

#[test]
fn train_rejects_missing_data_file() {
    let dir = tempfile::tempdir().unwrap();
    cmd()
        .args(["train", "-d", "/nonexistent/koi.csv", "--model-dir"])
        .arg(dir.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("File does not exist"));
}

#[test]
fn synthetic_flag_ignores_configured_data_file() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("train.json");
    let with_missing_data = QUICK_CONFIG.replacen('{', r#"{ "train_data": "/nonexistent/koi.csv","#, 1);
    fs::write(&config, with_missing_data).unwrap();
    let model_dir = dir.path().join("models");
    cmd()
        .arg("train")
        .arg(&config)
        .args(["--synthetic", "--no-report", "--model-dir"])
        .arg(&model_dir)
        .assert()
        .success()
        .stdout(predicate::str::contains("\"accuracy\""));
    assert!(model_dir.join("exoplanet_model.json").exists());
}

#[test]
fn train_rejects_unknown_model_type() {
    cmd()
        .args(["train", "--synthetic", "-m", "svm"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("svm"));
}

// ---------------------------------------------------------------------------
// Commands over a trained model
// ---------------------------------------------------------------------------

#[test]
fn trained_model_serves_metrics_hyperparams_and_predictions() {
    let dir = tempfile::tempdir().unwrap();
    let model_dir = train_into(dir.path());

    let output = cmd().arg("metrics").arg("--model-dir").arg(&model_dir).output().unwrap();
    assert!(output.status.success());
    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["metrics"]["cv_scores"].as_array().unwrap().len(), 3);
    assert_eq!(report["feature_importance"].as_array().unwrap().len(), 12);

    let output = cmd().arg("hyperparams").arg("--model-dir").arg(&model_dir).output().unwrap();
    assert!(output.status.success());
    let params: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(params["rf_n_estimators"], 20.0);
    assert_eq!(params["xgb_max_depth"], 3.0);

    let sample = cmd().args(["sample", "-n", "4"]).output().unwrap().stdout;
    let input = dir.path().join("records.json");
    fs::write(&input, sample).unwrap();

    let output = cmd()
        .arg("predict")
        .arg(&input)
        .arg("--model-dir")
        .arg(&model_dir)
        .output()
        .unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines.len(), 5);
    assert_eq!(
        lines[0],
        "row,prediction,confidence,probability_confirmed,probability_not_confirmed"
    );
    assert!(lines[1..]
        .iter()
        .all(|l| l.contains("CONFIRMED") || l.contains("NOT_CONFIRMED")));

    let out_file = dir.path().join("predictions.tsv");
    cmd()
        .arg("predict")
        .arg(&input)
        .arg("-o")
        .arg(&out_file)
        .arg("--model-dir")
        .arg(&model_dir)
        .assert()
        .success();
    let written = fs::read_to_string(&out_file).unwrap();
    assert!(written.starts_with("row\tprediction\t"));
    assert_eq!(written.lines().count(), 5);
}

#[test]
fn predict_reports_missing_columns() {
    let dir = tempfile::tempdir().unwrap();
    let model_dir = train_into(dir.path());
    let input = dir.path().join("partial.json");
    fs::write(&input, r#"{"koi_period": 3.5}"#).unwrap();

    cmd()
        .arg("predict")
        .arg(&input)
        .arg("--model-dir")
        .arg(&model_dir)
        .assert()
        .failure()
        .stderr(predicate::str::contains("koi_model_snr"));
}
