use std::fs;
use std::path::Path;

use exoplanet_classifiers::schema::{feature_names, DISPOSITION_COLUMN};
use exoplanet_classifiers::service::ClassifierService;
use exoplanet_classifiers::{
    ArtifactPaths, ClassifierError, ClassifierState, DataSource, Dataset, ExoplanetClassifier,
    Hyperparameters, ModelType, TrainingOptions,
};

fn quick_classifier() -> ExoplanetClassifier {
    let mut classifier = ExoplanetClassifier::new(ModelType::Ensemble).with_options(TrainingOptions {
        cv_folds: 3,
        ..Default::default()
    });
    classifier
        .build(Some(&Hyperparameters::from_pairs([
            ("rf_n_estimators", 20.0),
            ("rf_max_depth", 6.0),
            ("xgb_n_estimators", 20.0),
            ("xgb_max_depth", 3.0),
        ])))
        .unwrap();
    classifier
}

fn trained_service(dir: &Path) -> ClassifierService {
    let mut classifier = quick_classifier();
    classifier.train(&DataSource::synthetic()).unwrap();
    let paths = ArtifactPaths::in_dir(dir.join("models"));
    classifier.save_artifacts(&paths).unwrap();
    ClassifierService::with_classifier(classifier, paths)
}

/// Render a dataset as KOI CSV text, optionally without the label column.
fn to_csv(dataset: &Dataset, with_labels: bool) -> Vec<u8> {
    let names = feature_names();
    let mut writer = csv::Writer::from_writer(Vec::new());
    let mut header = names.clone();
    if with_labels {
        header.push(DISPOSITION_COLUMN.to_string());
    }
    writer.write_record(&header).unwrap();
    for row in 0..dataset.n_rows() {
        let mut fields = names
            .iter()
            .map(|name| match dataset.column(name).unwrap()[row] {
                Some(v) => v.to_string(),
                None => String::new(),
            })
            .collect::<Vec<_>>();
        if with_labels {
            fields.push(dataset.dispositions().unwrap()[row].clone());
        }
        writer.write_record(&fields).unwrap();
    }
    writer.into_inner().unwrap()
}

fn dir_is_empty(dir: &Path) -> bool {
    fs::read_dir(dir).unwrap().next().is_none()
}

#[test]
fn start_restores_saved_artifacts() {
    let dir = tempfile::tempdir().unwrap();
    let service = trained_service(dir.path());
    let expected = service.hyperparameters();

    let restarted =
        ClassifierService::start(service.paths().clone(), ModelType::Ensemble, TrainingOptions::default())
            .unwrap();
    let health = restarted.health();
    assert!(health.model_loaded);
    assert_eq!(health.state, ClassifierState::Trained);
    // restored rather than retrained with the default hyperparameters
    assert_eq!(restarted.hyperparameters(), expected);
}

#[test]
fn read_endpoints() {
    let dir = tempfile::tempdir().unwrap();
    let service = trained_service(dir.path());

    let report = service.metrics().unwrap();
    assert!(report.metrics.accuracy > 0.0);
    assert_eq!(report.feature_importance.len(), 12);
    assert_eq!(service.feature_importance().unwrap(), report.feature_importance);
    assert_eq!(service.features().len(), 12);

    let samples = service.sample_data(5).unwrap();
    assert_eq!(samples.len(), 5);
    assert!(samples.iter().all(|r| r.len() == 12));
    let predictions = service.predict(&samples).unwrap();
    assert_eq!(predictions.len(), 5);

    let dataset = DataSource::synthetic().load().unwrap().head(8);
    let predictions = service.predict_csv(&to_csv(&dataset, false)).unwrap();
    assert_eq!(predictions.len(), 8);
}

#[test]
fn untrained_service_reports_not_trained() {
    let dir = tempfile::tempdir().unwrap();
    let service = ClassifierService::with_classifier(quick_classifier(), ArtifactPaths::in_dir(dir.path()));
    assert!(!service.health().model_loaded);
    assert!(matches!(service.metrics(), Err(ClassifierError::NotTrained)));
    assert!(matches!(service.feature_importance(), Err(ClassifierError::NotTrained)));
    assert!(matches!(service.predict(&[]), Err(ClassifierError::NotTrained)));
}

#[test]
fn update_then_retrain() {
    let dir = tempfile::tempdir().unwrap();
    let service = trained_service(dir.path());

    let updated = service
        .update_hyperparameters(&Hyperparameters::from_pairs([("xgb_learning_rate", 0.2)]))
        .unwrap();
    assert_eq!(updated.get("xgb_learning_rate"), Some(0.2));
    assert!(!service.health().model_loaded);

    let metrics = service.retrain(None).unwrap();
    assert_eq!(metrics.n_train + metrics.n_test, 1000);
    assert!(service.health().model_loaded);
}

#[test]
fn upload_is_removed_after_successful_retrain() {
    let dir = tempfile::tempdir().unwrap();
    let uploads = tempfile::tempdir().unwrap();
    let service = trained_service(dir.path()).with_upload_dir(uploads.path());

    let dataset = DataSource::synthetic().load().unwrap();
    let metrics = service.retrain_from_upload(&to_csv(&dataset, true)).unwrap();
    assert_eq!(metrics.n_train + metrics.n_test, dataset.n_rows());
    assert!(dir_is_empty(uploads.path()));
}

#[test]
fn upload_is_removed_after_failed_retrain() {
    let dir = tempfile::tempdir().unwrap();
    let uploads = tempfile::tempdir().unwrap();
    let service = trained_service(dir.path()).with_upload_dir(uploads.path());
    let before = service.metrics().unwrap().metrics;

    let err = service
        .retrain_from_upload(b"koi_period,koi_disposition\n1.0,CONFIRMED\n")
        .unwrap_err();
    assert!(matches!(err, ClassifierError::Schema(_)));
    assert!(dir_is_empty(uploads.path()));

    // the previous model is still serving
    assert!(service.health().model_loaded);
    assert_eq!(service.metrics().unwrap().metrics, before);
}

#[test]
fn failed_save_keeps_previous_model_in_memory() {
    let dir = tempfile::tempdir().unwrap();
    // a regular file where the model directory should be
    let blocker = dir.path().join("blocker");
    fs::write(&blocker, "").unwrap();
    let paths = ArtifactPaths::in_dir(blocker.join("models"));
    let service = ClassifierService::with_classifier(quick_classifier(), paths);

    service
        .update_hyperparameters(&Hyperparameters::from_pairs([("rf_n_estimators", 10.0)]))
        .unwrap();
    assert!(service.retrain(None).is_err());

    // training succeeded but the unsaved model was not swapped in
    let health = service.health();
    assert!(!health.model_loaded);
    assert_eq!(health.state, ClassifierState::Built);
    assert!(matches!(service.metrics(), Err(ClassifierError::NotTrained)));
    assert_eq!(service.hyperparameters().get("rf_n_estimators"), Some(10.0));
}
