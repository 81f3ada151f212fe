//! Integration tests for CLI config parsing, input loading and util helpers.

use std::fs;

use exoplanet_classifiers::{Hyperparameters, ModelType, TrainingOptions};
use exoplanet_cli::predict::load_input;
use exoplanet_cli::train::input::TrainConfig;
use exoplanet_cli::util::validate_tsv_or_csv_file;

// ---------------------------------------------------------------------------
// validate_tsv_or_csv_file
// ---------------------------------------------------------------------------

#[test]
fn validate_tsv_file_exists() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("data.tsv");
    fs::File::create(&path).unwrap();
    assert!(validate_tsv_or_csv_file(path.to_str().unwrap()).is_ok());
}

#[test]
fn validate_csv_file_exists() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("data.csv");
    fs::File::create(&path).unwrap();
    assert!(validate_tsv_or_csv_file(path.to_str().unwrap()).is_ok());
}

#[test]
fn validate_wrong_extension_errors() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("data.txt");
    fs::File::create(&path).unwrap();
    assert!(validate_tsv_or_csv_file(path.to_str().unwrap()).is_err());
}

#[test]
fn validate_nonexistent_file_errors() {
    assert!(validate_tsv_or_csv_file("/nonexistent/path/data.csv").is_err());
}

// ---------------------------------------------------------------------------
// TrainConfig
// ---------------------------------------------------------------------------

#[test]
fn train_config_default_values() {
    let cfg = TrainConfig::default();
    assert_eq!(cfg.model_type, ModelType::Ensemble);
    assert!(cfg.train_data.is_none());
    assert_eq!(cfg.model_dir, "models");
    assert_eq!(cfg.hyperparameters, Hyperparameters::default());
    assert_eq!(cfg.options, TrainingOptions::default());
    assert!(cfg.report);
}

#[test]
fn train_config_missing_fields_keep_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("train.json");
    fs::write(&path, r#"{"model_type": "random_forest", "options": {"cv_folds": 3}}"#).unwrap();

    let cfg = TrainConfig::load(&path).unwrap();
    assert_eq!(cfg.model_type, ModelType::RandomForest);
    assert_eq!(cfg.options.cv_folds, 3);
    assert_eq!(cfg.options.test_fraction, 0.2);
    assert_eq!(cfg.model_dir, "models");
    assert!(cfg.report);
}

#[test]
fn train_config_invalid_field_falls_back() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("train.json");
    fs::write(&path, r#"{"model_type": "svm", "report": "yes", "model_dir": "out"}"#).unwrap();

    let cfg = TrainConfig::load(&path).unwrap();
    assert_eq!(cfg.model_type, ModelType::Ensemble);
    assert!(cfg.report);
    assert_eq!(cfg.model_dir, "out");
}

#[test]
fn train_config_rejects_malformed_json() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("train.json");
    fs::write(&path, "{ not json").unwrap();
    assert!(TrainConfig::load(&path).is_err());
    assert!(TrainConfig::load(dir.path().join("missing.json")).is_err());
}

#[test]
fn train_config_serializes_to_json() {
    let json = serde_json::to_string_pretty(&TrainConfig::default()).unwrap();
    assert!(json.contains("\"model_type\": \"ensemble\""));
    assert!(json.contains("rf_n_estimators"));
    assert!(json.contains("cv_folds"));
}

// ---------------------------------------------------------------------------
// Prediction input
// ---------------------------------------------------------------------------

#[test]
fn load_input_reads_json_and_csv() {
    let dir = tempfile::tempdir().unwrap();

    let json = dir.path().join("records.json");
    fs::write(&json, r#"[{"koi_period": 3.5, "koi_depth": null}, {"koi_period": 9.1}]"#).unwrap();
    let dataset = load_input(&json).unwrap();
    assert_eq!(dataset.n_rows(), 2);
    assert_eq!(dataset.column("koi_period").unwrap().to_vec(), vec![Some(3.5), Some(9.1)]);
    assert!(dataset.column("koi_depth").unwrap().iter().all(Option::is_none));

    let csv = dir.path().join("records.csv");
    fs::write(&csv, "# archive header\nkoi_period,koi_depth\n3.5,120\n9.1,\n").unwrap();
    let dataset = load_input(&csv).unwrap();
    assert_eq!(dataset.n_rows(), 2);
    assert_eq!(dataset.column("koi_depth").unwrap().to_vec(), vec![Some(120.0), None]);
}
