//! Process-wide classifier service.
//!
//! Holds one classifier behind a `RwLock`: predictions and read-only
//! queries share the lock, retraining and hyperparameter updates take it
//! exclusively. This is the request-handling layer the CLI (or any other
//! front end) drives.
use std::io::Write;
use std::path::PathBuf;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::Serialize;

use crate::classifier::{
    ArtifactPaths, ClassifierState, ExoplanetClassifier, FeatureImportance, Prediction,
};
use crate::config::{Hyperparameters, ModelType, TrainingOptions};
use crate::data_handling::{DataSource, Dataset, Record};
use crate::error::{ClassifierError, Result};
use crate::io::read_koi_csv_from_reader;
use crate::schema::{feature_info, feature_names, FeatureInfo};
use crate::stats::TrainingMetrics;

#[derive(Debug, Clone, Serialize)]
pub struct HealthStatus {
    pub status: String,
    pub model_loaded: bool,
    pub state: ClassifierState,
    pub model_type: ModelType,
}

/// Everything the metrics endpoint reports.
#[derive(Debug, Clone, Serialize)]
pub struct ModelReport {
    pub metrics: TrainingMetrics,
    pub feature_importance: Vec<FeatureImportance>,
    pub hyperparameters: Hyperparameters,
}

pub struct ClassifierService {
    classifier: RwLock<ExoplanetClassifier>,
    paths: ArtifactPaths,
    /// Where uploads are staged; the system temp dir when `None`.
    upload_dir: Option<PathBuf>,
}

impl ClassifierService {
    /// Restore the persisted model, or train one on synthetic data and
    /// persist it when no artifacts exist yet.
    pub fn start(paths: ArtifactPaths, model_type: ModelType, options: TrainingOptions) -> Result<Self> {
        let mut classifier = ExoplanetClassifier::new(model_type).with_options(options);
        match classifier.load_artifacts(&paths) {
            Ok(()) => log::info!("Loaded existing model from {}", paths.model.display()),
            Err(ClassifierError::NotFound(missing)) => {
                log::info!(
                    "No saved model ({} missing), training on synthetic data",
                    missing.display()
                );
                classifier.train(&DataSource::synthetic())?;
                classifier.save_artifacts(&paths)?;
            }
            Err(e) => return Err(e),
        }
        Ok(Self::with_classifier(classifier, paths))
    }

    pub fn with_classifier(classifier: ExoplanetClassifier, paths: ArtifactPaths) -> Self {
        ClassifierService {
            classifier: RwLock::new(classifier),
            paths,
            upload_dir: None,
        }
    }

    pub fn with_upload_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.upload_dir = Some(dir.into());
        self
    }

    pub fn paths(&self) -> &ArtifactPaths {
        &self.paths
    }

    // Training commits in one step, so a poisoned lock still guards a
    // consistent classifier.
    fn read(&self) -> RwLockReadGuard<'_, ExoplanetClassifier> {
        self.classifier.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, ExoplanetClassifier> {
        self.classifier.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn health(&self) -> HealthStatus {
        let classifier = self.read();
        let state = classifier.state();
        HealthStatus {
            status: "healthy".to_string(),
            model_loaded: state == ClassifierState::Trained,
            state,
            model_type: classifier.model_type(),
        }
    }

    pub fn predict(&self, records: &[Record]) -> Result<Vec<Prediction>> {
        self.read().predict_records(records)
    }

    pub fn predict_dataset(&self, dataset: &Dataset) -> Result<Vec<Prediction>> {
        self.read().predict(dataset)
    }

    /// Predict every row of an uploaded CSV.
    pub fn predict_csv(&self, bytes: &[u8]) -> Result<Vec<Prediction>> {
        let dataset = read_koi_csv_from_reader(bytes)?;
        self.predict_dataset(&dataset)
    }

    pub fn metrics(&self) -> Result<ModelReport> {
        let classifier = self.read();
        let metrics = classifier.metrics().cloned().ok_or(ClassifierError::NotTrained)?;
        Ok(ModelReport {
            metrics,
            feature_importance: classifier.feature_importance().to_vec(),
            hyperparameters: classifier.hyperparameters().clone(),
        })
    }

    pub fn feature_importance(&self) -> Result<Vec<FeatureImportance>> {
        let classifier = self.read();
        if classifier.feature_importance().is_empty() {
            return Err(ClassifierError::NotTrained);
        }
        Ok(classifier.feature_importance().to_vec())
    }

    pub fn hyperparameters(&self) -> Hyperparameters {
        self.read().hyperparameters().clone()
    }

    /// Merge the update; the model must be retrained before it predicts again.
    pub fn update_hyperparameters(&self, partial: &Hyperparameters) -> Result<Hyperparameters> {
        let mut classifier = self.write();
        classifier.update_hyperparameters(partial)?;
        Ok(classifier.hyperparameters().clone())
    }

    /// Retrain on `source` (synthetic data when `None`) and persist.
    ///
    /// The new model replaces the served one only after its artifacts are
    /// saved, so a failed run leaves memory and disk on the previous model.
    pub fn retrain(&self, source: Option<DataSource>) -> Result<TrainingMetrics> {
        let source = source.unwrap_or_else(DataSource::synthetic);
        let mut classifier = self.write();
        let mut candidate = classifier.clone();
        let metrics = candidate.train(&source)?.clone();
        candidate.save_artifacts(&self.paths)?;
        *classifier = candidate;
        Ok(metrics)
    }

    /// Retrain on uploaded CSV bytes. The upload is staged in a temporary
    /// file that is removed whether or not training succeeds.
    pub fn retrain_from_upload(&self, bytes: &[u8]) -> Result<TrainingMetrics> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("koi-upload-").suffix(".csv");
        let mut upload = match &self.upload_dir {
            Some(dir) => builder.tempfile_in(dir)?,
            None => builder.tempfile()?,
        };
        upload.write_all(bytes)?;
        upload.flush()?;
        log::debug!("Staged {} uploaded bytes at {}", bytes.len(), upload.path().display());

        let result = self.retrain(Some(DataSource::file(upload.path())));
        if let Err(e) = upload.close() {
            log::warn!("Failed to remove uploaded file: {}", e);
        }
        result
    }

    pub fn features(&self) -> Vec<FeatureInfo> {
        feature_info()
    }

    pub fn sample_data(&self, n: usize) -> Result<Vec<Record>> {
        sample_records(n)
    }
}

/// First `n` synthetic rows, feature columns only.
pub fn sample_records(n: usize) -> Result<Vec<Record>> {
    let dataset = DataSource::synthetic().load()?;
    let names = feature_names();
    Ok(dataset
        .head(n)
        .to_records()
        .into_iter()
        .map(|record| {
            record
                .into_iter()
                .filter(|(name, _)| names.contains(name))
                .collect()
        })
        .collect())
}
