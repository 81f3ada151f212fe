use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

use crate::config::{Hyperparameters, ModelType};
use crate::error::Result;
use crate::models::classifier_trait::ClassifierModel;
use crate::models::gradient_boosting::GradientBoosting;
use crate::models::random_forest::RandomForest;
use crate::models::voting::SoftVotingClassifier;

/// Every estimator the classifier can hold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EnsembleModel {
    Forest(RandomForest),
    Boosted(GradientBoosting),
    Voting(SoftVotingClassifier),
}

impl EnsembleModel {
    fn inner(&self) -> &dyn ClassifierModel {
        match self {
            EnsembleModel::Forest(m) => m,
            EnsembleModel::Boosted(m) => m,
            EnsembleModel::Voting(m) => m,
        }
    }

    fn inner_mut(&mut self) -> &mut dyn ClassifierModel {
        match self {
            EnsembleModel::Forest(m) => m,
            EnsembleModel::Boosted(m) => m,
            EnsembleModel::Voting(m) => m,
        }
    }

    pub fn model_type(&self) -> ModelType {
        match self {
            EnsembleModel::Forest(_) => ModelType::RandomForest,
            EnsembleModel::Boosted(_) => ModelType::GradientBoosting,
            EnsembleModel::Voting(_) => ModelType::Ensemble,
        }
    }
}

impl ClassifierModel for EnsembleModel {
    fn fit(&mut self, x: &Array2<f64>, y: &[usize]) -> Result<()> {
        self.inner_mut().fit(x, y)
    }

    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        self.inner().predict_proba(x)
    }

    fn feature_importances(&self) -> Option<Array1<f64>> {
        self.inner().feature_importances()
    }

    fn is_fitted(&self) -> bool {
        self.inner().is_fitted()
    }

    fn name(&self) -> &str {
        self.inner().name()
    }
}

/// Build an unfitted model of `model_type` from a validated hyperparameter set.
pub fn build_model(model_type: ModelType, params: &Hyperparameters, seed: u64) -> Result<EnsembleModel> {
    params.validate()?;
    let model = match model_type {
        ModelType::RandomForest => EnsembleModel::Forest(RandomForest::new(params.forest_params()?, seed)),
        ModelType::GradientBoosting => {
            EnsembleModel::Boosted(GradientBoosting::new(params.boosting_params()?, seed))
        }
        ModelType::Ensemble => EnsembleModel::Voting(SoftVotingClassifier::new(
            RandomForest::new(params.forest_params()?, seed),
            GradientBoosting::new(params.boosting_params()?, seed),
        )),
    };
    log::debug!("Built {} model", model.name());
    Ok(model)
}
