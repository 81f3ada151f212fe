//! The exoplanet disposition classifier: model lifecycle, training,
//! prediction and persistence.
//!
//! A classifier moves through `Unbuilt -> Built -> Trained`. Training always
//! works on fresh copies of the processor and the model and swaps them in
//! only once every step succeeded, so a failed run leaves the previous
//! trained state usable.
use std::fs;
use std::path::{Path, PathBuf};

use ndarray::{Array2, Axis};
use serde::{Deserialize, Serialize};

use crate::config::{Hyperparameters, ModelType, TrainingOptions};
use crate::data_handling::{stratified_k_fold, stratified_split, DataSource, Dataset, Record};
use crate::error::{ClassifierError, Result};
use crate::models::{build_model, ClassifierModel, EnsembleModel};
use crate::preprocessing::DataProcessor;
use crate::schema::BinaryDisposition;
use crate::stats::{accuracy, TrainingMetrics};

/// Version of the persisted model document.
pub const MODEL_FORMAT_VERSION: u32 = 1;
pub const MODEL_FILE_NAME: &str = "exoplanet_model.json";
pub const PROCESSOR_FILE_NAME: &str = "data_processor.json";

/// Where a trained classifier is persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    pub model: PathBuf,
    pub processor: PathBuf,
}

impl ArtifactPaths {
    /// `<dir>/exoplanet_model.json` and `<dir>/data_processor.json`.
    pub fn in_dir<P: AsRef<Path>>(dir: P) -> Self {
        ArtifactPaths {
            model: dir.as_ref().join(MODEL_FILE_NAME),
            processor: dir.as_ref().join(PROCESSOR_FILE_NAME),
        }
    }

    pub fn exist(&self) -> bool {
        self.model.exists() && self.processor.exists()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClassifierState {
    Unbuilt,
    Built,
    Trained,
}

/// Classification of one input record.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub prediction: BinaryDisposition,
    /// Probability of the predicted class.
    pub confidence: f64,
    pub probability_confirmed: f64,
    pub probability_not_confirmed: f64,
}

impl Prediction {
    fn from_proba(p_not_confirmed: f64, p_confirmed: f64) -> Self {
        let class = if p_confirmed > p_not_confirmed { 1 } else { 0 };
        Prediction {
            prediction: BinaryDisposition::from_class(class),
            confidence: p_confirmed.max(p_not_confirmed),
            probability_confirmed: p_confirmed,
            probability_not_confirmed: p_not_confirmed,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureImportance {
    pub feature: String,
    pub importance: f64,
}

/// Pair feature names with importances, highest first. Ties keep input order.
pub fn rank_features(names: &[String], importances: &[f64]) -> Vec<FeatureImportance> {
    let mut ranking = names
        .iter()
        .zip(importances)
        .map(|(feature, &importance)| FeatureImportance {
            feature: feature.clone(),
            importance,
        })
        .collect::<Vec<_>>();
    ranking.sort_by(|a, b| b.importance.total_cmp(&a.importance));
    ranking
}

#[derive(Serialize)]
struct ModelDocumentRef<'a> {
    format_version: u32,
    model_type: ModelType,
    hyperparameters: &'a Hyperparameters,
    model: &'a EnsembleModel,
    metrics: Option<&'a TrainingMetrics>,
    feature_importance: &'a [FeatureImportance],
}

#[derive(Deserialize)]
struct ModelDocument {
    format_version: u32,
    model_type: ModelType,
    hyperparameters: Hyperparameters,
    model: EnsembleModel,
    metrics: Option<TrainingMetrics>,
    feature_importance: Vec<FeatureImportance>,
}

/// Result of a full training run, committed in one step.
struct TrainedParts {
    processor: DataProcessor,
    model: EnsembleModel,
    metrics: TrainingMetrics,
    feature_importance: Vec<FeatureImportance>,
}

#[derive(Debug, Clone)]
pub struct ExoplanetClassifier {
    model_type: ModelType,
    hyperparameters: Hyperparameters,
    options: TrainingOptions,
    processor: DataProcessor,
    model: Option<EnsembleModel>,
    /// Metrics and ranking of the last completed training run.
    metrics: Option<TrainingMetrics>,
    feature_importance: Vec<FeatureImportance>,
}

impl Default for ExoplanetClassifier {
    fn default() -> Self {
        Self::new(ModelType::default())
    }
}

impl ExoplanetClassifier {
    pub fn new(model_type: ModelType) -> Self {
        ExoplanetClassifier {
            model_type,
            hyperparameters: Hyperparameters::default(),
            options: TrainingOptions::default(),
            processor: DataProcessor::new(),
            model: None,
            metrics: None,
            feature_importance: Vec::new(),
        }
    }

    pub fn with_options(mut self, options: TrainingOptions) -> Self {
        self.options = options;
        self
    }

    /// Restore a trained classifier from its two artifacts.
    pub fn from_files<P: AsRef<Path>, Q: AsRef<Path>>(model_path: P, processor_path: Q) -> Result<Self> {
        let mut classifier = ExoplanetClassifier::default();
        classifier.load(model_path, processor_path)?;
        Ok(classifier)
    }

    pub fn state(&self) -> ClassifierState {
        match &self.model {
            None => ClassifierState::Unbuilt,
            Some(model) if model.is_fitted() => ClassifierState::Trained,
            Some(_) => ClassifierState::Built,
        }
    }

    /// Build a fresh, unfitted model from the current hyperparameters merged
    /// with `overrides`. On failure nothing changes.
    pub fn build(&mut self, overrides: Option<&Hyperparameters>) -> Result<()> {
        let merged = match overrides {
            Some(partial) => self.hyperparameters.merged(partial),
            None => self.hyperparameters.clone(),
        };
        let model = build_model(self.model_type, &merged, self.options.random_seed)?;
        self.hyperparameters = merged;
        self.model = Some(model);
        Ok(())
    }

    /// Load `source` and train on it.
    pub fn train(&mut self, source: &DataSource) -> Result<&TrainingMetrics> {
        let dataset = self.processor.load(source)?;
        self.train_on(&dataset)
    }

    /// Fit preprocessing and the model on `dataset`, evaluate on a stratified
    /// hold-out split and cross-validate on the training partition.
    pub fn train_on(&mut self, dataset: &Dataset) -> Result<&TrainingMetrics> {
        let parts = self.fit_parts(dataset)?;
        log::info!(
            "Trained {} model: accuracy {:.4}, f1 {:.4}, cv {:.4} +/- {:.4}",
            self.model_type,
            parts.metrics.accuracy,
            parts.metrics.f1_score,
            parts.metrics.cv_mean,
            parts.metrics.cv_std
        );

        self.processor = parts.processor;
        self.model = Some(parts.model);
        self.feature_importance = parts.feature_importance;
        Ok(self.metrics.insert(parts.metrics))
    }

    fn fit_parts(&self, dataset: &Dataset) -> Result<TrainedParts> {
        self.options.validate()?;
        let seed = self.options.random_seed;

        let mut processor = DataProcessor::new();
        processor.validate(dataset)?;
        let labels = processor.prepare_binary_labels(dataset)?;
        let positives = labels.iter().filter(|&&l| l == 1).count();
        if positives == 0 || positives == labels.len() {
            return Err(ClassifierError::InvalidData(format!(
                "Training data needs both CONFIRMED and non-CONFIRMED rows ({} of {} confirmed)",
                positives,
                labels.len()
            )));
        }
        log::debug!(
            "Class balance: {} confirmed / {} not confirmed",
            positives,
            labels.len() - positives
        );

        let x = processor.preprocess(dataset, true)?;
        let (train_idx, test_idx) = stratified_split(&labels, self.options.test_fraction, seed)?;
        let x_train = x.select(Axis(0), &train_idx);
        let x_test = x.select(Axis(0), &test_idx);
        let y_train = train_idx.iter().map(|&i| labels[i]).collect::<Vec<_>>();
        let y_test = test_idx.iter().map(|&i| labels[i]).collect::<Vec<_>>();
        log::debug!("Split: {} train / {} test rows", y_train.len(), y_test.len());

        let mut model = build_model(self.model_type, &self.hyperparameters, seed)?;
        model.fit(&x_train, &y_train)?;
        let y_pred = model.predict(&x_test)?;

        let cv_scores = self.cross_validate(&x_train, &y_train)?;
        let metrics = TrainingMetrics::evaluate(&y_test, &y_pred, cv_scores, y_train.len());

        let importances = model
            .feature_importances()
            .map(|v| v.to_vec())
            .unwrap_or_else(|| vec![0.0; processor.feature_names().len()]);
        let feature_importance = rank_features(processor.feature_names(), &importances);

        Ok(TrainedParts {
            processor,
            model,
            metrics,
            feature_importance,
        })
    }

    /// Accuracy of a freshly built model on each stratified fold.
    fn cross_validate(&self, x: &Array2<f64>, y: &[usize]) -> Result<Vec<f64>> {
        let seed = self.options.random_seed;
        let folds = stratified_k_fold(y, self.options.cv_folds, seed)?;
        let mut scores = Vec::with_capacity(folds.len());
        for (fold, (train, validation)) in folds.iter().enumerate() {
            let y_fold = train.iter().map(|&i| y[i]).collect::<Vec<_>>();
            let y_val = validation.iter().map(|&i| y[i]).collect::<Vec<_>>();
            let mut model = build_model(self.model_type, &self.hyperparameters, seed)?;
            model.fit(&x.select(Axis(0), train), &y_fold)?;
            let predicted = model.predict(&x.select(Axis(0), validation))?;
            let score = accuracy(&y_val, &predicted);
            log::trace!("CV fold {}: accuracy {:.4}", fold, score);
            scores.push(score);
        }
        Ok(scores)
    }

    fn trained_model(&self) -> Result<&EnsembleModel> {
        match &self.model {
            Some(model) if model.is_fitted() && self.processor.is_fitted() => Ok(model),
            _ => Err(ClassifierError::NotTrained),
        }
    }

    /// One prediction per row, in row order.
    pub fn predict(&self, dataset: &Dataset) -> Result<Vec<Prediction>> {
        let model = self.trained_model()?;
        let x = self.processor.transform(dataset)?;
        let proba = model.predict_proba(&x)?;
        Ok(proba
            .rows()
            .into_iter()
            .map(|row| Prediction::from_proba(row[0], row[1]))
            .collect())
    }

    pub fn predict_records(&self, records: &[Record]) -> Result<Vec<Prediction>> {
        self.predict(&Dataset::from_records(records))
    }

    /// Merge `partial` into the hyperparameters and rebuild the model.
    ///
    /// The classifier drops back to `Built` and must be retrained. Unknown
    /// names or invalid values leave everything unchanged.
    pub fn update_hyperparameters(&mut self, partial: &Hyperparameters) -> Result<()> {
        self.build(Some(partial))?;
        log::info!("Updated hyperparameters: {:?}", partial);
        Ok(())
    }

    /// Persist the trained model and its processor.
    pub fn save<P: AsRef<Path>, Q: AsRef<Path>>(&self, model_path: P, processor_path: Q) -> Result<()> {
        let model = self.trained_model()?;
        let model_path = model_path.as_ref();
        let document = ModelDocumentRef {
            format_version: MODEL_FORMAT_VERSION,
            model_type: self.model_type,
            hyperparameters: &self.hyperparameters,
            model,
            metrics: self.metrics.as_ref(),
            feature_importance: &self.feature_importance,
        };
        if let Some(parent) = model_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(model_path, serde_json::to_string(&document)?)?;
        self.processor.save(processor_path)?;
        log::info!("Saved {} model to {}", self.model_type, model_path.display());
        Ok(())
    }

    pub fn save_artifacts(&self, paths: &ArtifactPaths) -> Result<()> {
        self.save(&paths.model, &paths.processor)
    }

    /// Restore a model written by [`ExoplanetClassifier::save`]. Both files
    /// are read and checked before any state changes.
    pub fn load<P: AsRef<Path>, Q: AsRef<Path>>(&mut self, model_path: P, processor_path: Q) -> Result<()> {
        let (model_path, processor_path) = (model_path.as_ref(), processor_path.as_ref());
        for path in [model_path, processor_path] {
            if !path.exists() {
                return Err(ClassifierError::NotFound(path.to_path_buf()));
            }
        }

        let document: ModelDocument = serde_json::from_str(&fs::read_to_string(model_path)?)?;
        let processor = DataProcessor::load_from(processor_path)?;
        if document.format_version != MODEL_FORMAT_VERSION {
            return Err(ClassifierError::InvalidData(format!(
                "Unsupported model format version {} (expected {})",
                document.format_version, MODEL_FORMAT_VERSION
            )));
        }
        if !document.model.is_fitted() || !processor.is_fitted() {
            return Err(ClassifierError::InvalidData(format!(
                "{} does not hold a trained model",
                model_path.display()
            )));
        }
        if document.model.model_type() != document.model_type {
            return Err(ClassifierError::InvalidData(format!(
                "Model document declares {} but holds a {} model",
                document.model_type,
                document.model.model_type()
            )));
        }

        self.model_type = document.model_type;
        self.hyperparameters = document.hyperparameters;
        self.model = Some(document.model);
        self.metrics = document.metrics;
        self.feature_importance = document.feature_importance;
        self.processor = processor;
        log::info!("Loaded {} model from {}", self.model_type, model_path.display());
        Ok(())
    }

    pub fn load_artifacts(&mut self, paths: &ArtifactPaths) -> Result<()> {
        self.load(&paths.model, &paths.processor)
    }

    pub fn metrics(&self) -> Option<&TrainingMetrics> {
        self.metrics.as_ref()
    }

    pub fn feature_importance(&self) -> &[FeatureImportance] {
        &self.feature_importance
    }

    pub fn hyperparameters(&self) -> &Hyperparameters {
        &self.hyperparameters
    }

    pub fn model_type(&self) -> ModelType {
        self.model_type
    }

    pub fn options(&self) -> &TrainingOptions {
        &self.options
    }

    pub fn processor(&self) -> &DataProcessor {
        &self.processor
    }

    pub fn model(&self) -> Option<&EnsembleModel> {
        self.model.as_ref()
    }
}
