use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

use crate::error::{ClassifierError, Result};
use crate::models::classifier_trait::ClassifierModel;
use crate::models::gradient_boosting::GradientBoosting;
use crate::models::random_forest::RandomForest;

/// Soft voting over a random forest and a gradient boosted model: the two
/// probability matrices are averaged with equal weight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SoftVotingClassifier {
    forest: RandomForest,
    boosted: GradientBoosting,
}

impl SoftVotingClassifier {
    pub fn new(forest: RandomForest, boosted: GradientBoosting) -> Self {
        SoftVotingClassifier { forest, boosted }
    }

    pub fn forest(&self) -> &RandomForest {
        &self.forest
    }

    pub fn boosted(&self) -> &GradientBoosting {
        &self.boosted
    }
}

impl ClassifierModel for SoftVotingClassifier {
    fn fit(&mut self, x: &Array2<f64>, y: &[usize]) -> Result<()> {
        let (forest, boosted) = (&mut self.forest, &mut self.boosted);
        let (forest_result, boosted_result) = rayon::join(|| forest.fit(x, y), || boosted.fit(x, y));
        forest_result?;
        boosted_result?;
        Ok(())
    }

    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        if !self.is_fitted() {
            return Err(ClassifierError::NotTrained);
        }
        let forest = self.forest.predict_proba(x)?;
        let boosted = self.boosted.predict_proba(x)?;
        Ok((forest + boosted) / 2.0)
    }

    fn feature_importances(&self) -> Option<Array1<f64>> {
        let forest = self.forest.feature_importances()?;
        let boosted = self.boosted.feature_importances()?;
        Some((forest + boosted) / 2.0)
    }

    fn is_fitted(&self) -> bool {
        self.forest.is_fitted() && self.boosted.is_fitted()
    }

    fn name(&self) -> &str {
        "soft_voting"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Hyperparameters;
    use ndarray::array;

    fn small_ensemble() -> SoftVotingClassifier {
        let params = Hyperparameters::default().merged(&Hyperparameters::from_pairs([
            ("rf_n_estimators", 10.0),
            ("rf_min_samples_split", 2.0),
            ("xgb_n_estimators", 10.0),
            ("xgb_max_depth", 2.0),
            ("xgb_min_child_weight", 0.0),
        ]));
        SoftVotingClassifier::new(
            RandomForest::new(params.forest_params().unwrap(), 42),
            GradientBoosting::new(params.boosting_params().unwrap(), 42),
        )
    }

    #[test]
    fn voting_averages_member_probabilities() {
        let x = array![[0.0, 1.0], [0.2, 0.8], [0.1, 1.1], [3.0, -1.0], [3.2, -0.9], [2.9, -1.2]];
        let y = vec![0, 0, 0, 1, 1, 1];
        let mut model = small_ensemble();
        model.fit(&x, &y).unwrap();

        let proba = model.predict_proba(&x).unwrap();
        let forest = model.forest().predict_proba(&x).unwrap();
        let boosted = model.boosted().predict_proba(&x).unwrap();
        for r in 0..x.nrows() {
            let expected = (forest[(r, 1)] + boosted[(r, 1)]) / 2.0;
            assert!((proba[(r, 1)] - expected).abs() < 1e-12);
            assert!((proba.row(r).sum() - 1.0).abs() < 1e-12);
        }
        assert_eq!(model.predict(&x).unwrap(), y);

        let importances = model.feature_importances().unwrap();
        assert_eq!(importances.len(), 2);
        assert!((importances.sum() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn unfitted_ensemble_has_no_importances() {
        let model = small_ensemble();
        assert!(!model.is_fitted());
        assert!(model.feature_importances().is_none());
    }
}
