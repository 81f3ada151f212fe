//! Integration tests for the DataProcessor on the synthetic KOI sample.

use exoplanet_classifiers::schema::feature_names;
use exoplanet_classifiers::{ClassifierError, DataProcessor, DataSource};

#[test]
fn fit_standardizes_every_feature() {
    let dataset = DataSource::synthetic().load().unwrap();
    assert!(feature_names().iter().any(|name| dataset.missing_count(name) > 0));

    let mut processor = DataProcessor::new();
    let x = processor.preprocess(&dataset, true).unwrap();
    assert_eq!(x.dim(), (1000, 12));
    assert!(x.iter().all(|v| v.is_finite()));

    let n = x.nrows() as f64;
    for c in 0..x.ncols() {
        let column = x.column(c);
        let mean = column.sum() / n;
        let var = column.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
        assert!(mean.abs() < 1e-9, "column {} mean = {}", c, mean);
        assert!((var - 1.0).abs() < 1e-9, "column {} variance = {}", c, var);
    }
}

#[test]
fn transform_reuses_training_statistics() {
    let dataset = DataSource::synthetic().load().unwrap();
    let mut processor = DataProcessor::new();
    let fitted = processor.preprocess(&dataset, true).unwrap();

    let head = dataset.head(10);
    let transformed = processor.preprocess(&head, false).unwrap();
    for r in 0..10 {
        assert_eq!(transformed.row(r), fitted.row(r));
    }
}

#[test]
fn imputer_fills_with_observed_medians() {
    let dataset = DataSource::synthetic().load().unwrap();
    let mut processor = DataProcessor::new();
    processor.preprocess(&dataset, true).unwrap();

    for (name, &fill) in processor.feature_names().iter().zip(&processor.imputer().fill_values) {
        let mut observed: Vec<f64> = dataset.column(name).unwrap().iter().flatten().copied().collect();
        observed.sort_by(|a, b| a.partial_cmp(b).unwrap());
        assert!(fill >= observed[0] && fill <= observed[observed.len() - 1], "{} fill {}", name, fill);
    }
}

#[test]
fn unfitted_processor_rejects_transform() {
    let dataset = DataSource::synthetic().load().unwrap().head(3);
    let processor = DataProcessor::new();
    assert!(matches!(processor.transform(&dataset), Err(ClassifierError::NotFitted)));
}

#[test]
fn restored_processor_matches_saved_one() {
    let dataset = DataSource::synthetic().load().unwrap();
    let mut processor = DataProcessor::new();
    processor.preprocess(&dataset, true).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("data_processor.json");
    processor.save(&path).unwrap();
    let restored = DataProcessor::load_from(&path).unwrap();

    assert!(restored.is_fitted());
    assert_eq!(restored.scaler(), processor.scaler());
    assert_eq!(
        restored.transform(&dataset).unwrap(),
        processor.transform(&dataset).unwrap()
    );
}
