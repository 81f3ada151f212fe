use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{ClassifierError, Result};

/// Which estimator the classifier builds.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ModelType {
    RandomForest,
    GradientBoosting,
    /// Soft-voting combination of the forest and the boosted model.
    #[default]
    Ensemble,
}

impl ModelType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelType::RandomForest => "random_forest",
            ModelType::GradientBoosting => "gradient_boosting",
            ModelType::Ensemble => "ensemble",
        }
    }
}

impl FromStr for ModelType {
    type Err = ClassifierError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ensemble" | "voting" => Ok(ModelType::Ensemble),
            "random_forest" | "forest" | "rf" => Ok(ModelType::RandomForest),
            "gradient_boosting" | "boosted" | "xgboost" | "gb" => Ok(ModelType::GradientBoosting),
            _ => Err(ClassifierError::UnknownModelType(s.to_string())),
        }
    }
}

impl fmt::Display for ModelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Names of every hyperparameter the builders understand.
pub const HYPERPARAMETER_KEYS: [&str; 9] = [
    "rf_n_estimators",
    "rf_max_depth",
    "rf_min_samples_split",
    "xgb_n_estimators",
    "xgb_max_depth",
    "xgb_learning_rate",
    "xgb_subsample",
    "xgb_min_child_weight",
    "xgb_reg_lambda",
];

/// Flat name -> value mapping covering both sub-models.
///
/// Partial updates are merged into the existing set; typed parameter
/// structs are derived (and validated) on every build.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(transparent)]
pub struct Hyperparameters(BTreeMap<String, f64>);

impl Default for Hyperparameters {
    fn default() -> Self {
        let mut params = BTreeMap::new();
        params.insert("rf_n_estimators".to_string(), 200.0);
        params.insert("rf_max_depth".to_string(), 20.0);
        params.insert("rf_min_samples_split".to_string(), 5.0);
        params.insert("xgb_n_estimators".to_string(), 200.0);
        params.insert("xgb_max_depth".to_string(), 10.0);
        params.insert("xgb_learning_rate".to_string(), 0.1);
        params.insert("xgb_subsample".to_string(), 1.0);
        params.insert("xgb_min_child_weight".to_string(), 1.0);
        params.insert("xgb_reg_lambda".to_string(), 1.0);
        Hyperparameters(params)
    }
}

impl Hyperparameters {
    /// An empty set, used to express partial updates.
    pub fn empty() -> Self {
        Hyperparameters(BTreeMap::new())
    }

    pub fn from_pairs<I, K>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, f64)>,
        K: Into<String>,
    {
        Hyperparameters(pairs.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.0.get(name).copied()
    }

    pub fn set(&mut self, name: impl Into<String>, value: f64) {
        self.0.insert(name.into(), value);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &f64)> {
        self.0.iter()
    }

    /// Return a copy of `self` with `partial` merged on top.
    pub fn merged(&self, partial: &Hyperparameters) -> Hyperparameters {
        let mut merged = self.0.clone();
        for (k, v) in partial.0.iter() {
            merged.insert(k.clone(), *v);
        }
        Hyperparameters(merged)
    }

    /// Reject unknown names and non-finite values.
    pub fn validate(&self) -> Result<()> {
        for (name, value) in self.0.iter() {
            if !HYPERPARAMETER_KEYS.contains(&name.as_str()) {
                return Err(ClassifierError::InvalidHyperparameter {
                    name: name.clone(),
                    value: *value,
                    reason: format!("unknown parameter, expected one of {:?}", HYPERPARAMETER_KEYS),
                });
            }
            if !value.is_finite() {
                return Err(invalid(name, *value, "value must be finite"));
            }
        }
        self.forest_params()?;
        self.boosting_params()?;
        Ok(())
    }

    pub fn forest_params(&self) -> Result<ForestParams> {
        let max_depth = self.count("rf_max_depth", 0)?;
        Ok(ForestParams {
            n_estimators: self.count("rf_n_estimators", 1)?,
            max_depth: if max_depth == 0 { None } else { Some(max_depth) },
            min_samples_split: self.count("rf_min_samples_split", 2)?,
        })
    }

    pub fn boosting_params(&self) -> Result<BoostingParams> {
        let learning_rate = self.required("xgb_learning_rate")?;
        if learning_rate <= 0.0 || learning_rate > 1.0 {
            return Err(invalid("xgb_learning_rate", learning_rate, "must be in (0, 1]"));
        }
        let subsample = self.required("xgb_subsample")?;
        if subsample <= 0.0 || subsample > 1.0 {
            return Err(invalid("xgb_subsample", subsample, "must be in (0, 1]"));
        }
        let min_child_weight = self.required("xgb_min_child_weight")?;
        if min_child_weight < 0.0 {
            return Err(invalid("xgb_min_child_weight", min_child_weight, "must be >= 0"));
        }
        let reg_lambda = self.required("xgb_reg_lambda")?;
        if reg_lambda < 0.0 {
            return Err(invalid("xgb_reg_lambda", reg_lambda, "must be >= 0"));
        }
        Ok(BoostingParams {
            n_estimators: self.count("xgb_n_estimators", 1)?,
            max_depth: self.count("xgb_max_depth", 1)?,
            learning_rate,
            subsample,
            min_child_weight,
            reg_lambda,
        })
    }

    fn required(&self, name: &str) -> Result<f64> {
        self.get(name).ok_or_else(|| ClassifierError::InvalidHyperparameter {
            name: name.to_string(),
            value: f64::NAN,
            reason: "parameter is missing".to_string(),
        })
    }

    fn count(&self, name: &str, min: usize) -> Result<usize> {
        let value = self.required(name)?;
        if value.fract() != 0.0 || value < min as f64 {
            return Err(invalid(
                name,
                value,
                &format!("must be a whole number >= {}", min),
            ));
        }
        Ok(value as usize)
    }
}

fn invalid(name: &str, value: f64, reason: &str) -> ClassifierError {
    ClassifierError::InvalidHyperparameter {
        name: name.to_string(),
        value,
        reason: reason.to_string(),
    }
}

/// Random forest settings derived from [`Hyperparameters`].
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct ForestParams {
    pub n_estimators: usize,
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
}

/// Gradient boosting settings derived from [`Hyperparameters`].
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct BoostingParams {
    pub n_estimators: usize,
    pub max_depth: usize,
    pub learning_rate: f64,
    pub subsample: f64,
    pub min_child_weight: f64,
    pub reg_lambda: f64,
}

/// Split, cross-validation and seeding options for a training run.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct TrainingOptions {
    pub test_fraction: f64,
    pub cv_folds: usize,
    pub random_seed: u64,
}

impl Default for TrainingOptions {
    fn default() -> Self {
        Self {
            test_fraction: 0.2,
            cv_folds: 5,
            random_seed: 42,
        }
    }
}

impl TrainingOptions {
    pub fn validate(&self) -> Result<()> {
        if !(self.test_fraction > 0.0 && self.test_fraction < 1.0) {
            return Err(ClassifierError::InvalidData(format!(
                "test_fraction must be in (0, 1), got {}",
                self.test_fraction
            )));
        }
        if self.cv_folds < 2 {
            return Err(ClassifierError::InvalidData(format!(
                "cv_folds must be at least 2, got {}",
                self.cv_folds
            )));
        }
        Ok(())
    }
}
