use ndarray::{Array1, Array2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::config::ForestParams;
use crate::error::{ClassifierError, Result};
use crate::models::classifier_trait::ClassifierModel;
use crate::models::decision_tree::{fit_classification_tree, ClassificationTreeParams, Tree};
use crate::models::utils::{binary_proba, check_fit_inputs, check_predict_inputs, normalize, to_array};

/// Bagged Gini trees with `sqrt(n_features)` candidate features per node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForest {
    params: ForestParams,
    seed: u64,
    n_features: usize,
    trees: Vec<Tree>,
    feature_importances: Vec<f64>,
}

impl RandomForest {
    pub fn new(params: ForestParams, seed: u64) -> Self {
        RandomForest {
            params,
            seed,
            n_features: 0,
            trees: Vec::new(),
            feature_importances: Vec::new(),
        }
    }

    pub fn params(&self) -> &ForestParams {
        &self.params
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    fn max_features(n_features: usize) -> usize {
        ((n_features as f64).sqrt().floor() as usize).max(1)
    }
}

impl ClassifierModel for RandomForest {
    fn fit(&mut self, x: &Array2<f64>, y: &[usize]) -> Result<()> {
        check_fit_inputs(x, y)?;
        let n_samples = x.nrows();
        let n_features = x.ncols();
        let tree_params = ClassificationTreeParams {
            max_depth: self.params.max_depth,
            min_samples_split: self.params.min_samples_split,
            max_features: Self::max_features(n_features),
        };
        let base_seed = self.seed;

        let fitted: Vec<(Tree, Vec<f64>)> = (0..self.params.n_estimators)
            .into_par_iter()
            .map(|tree_idx| {
                let mut rng = StdRng::seed_from_u64(base_seed.wrapping_add(tree_idx as u64));
                let bootstrap = (0..n_samples)
                    .map(|_| rng.gen_range(0..n_samples))
                    .collect::<Vec<_>>();
                let (tree, mut importances) =
                    fit_classification_tree(x, y, &bootstrap, &tree_params, &mut rng);
                normalize(&mut importances);
                (tree, importances)
            })
            .collect();

        let mut importances = vec![0.0; n_features];
        for (_, tree_importances) in &fitted {
            for (total, v) in importances.iter_mut().zip(tree_importances) {
                *total += v;
            }
        }
        let n_trees = fitted.len() as f64;
        for v in importances.iter_mut() {
            *v /= n_trees;
        }

        self.trees = fitted.into_iter().map(|(tree, _)| tree).collect();
        self.n_features = n_features;
        self.feature_importances = importances;
        log::debug!(
            "Fitted random forest: {} trees on {} x {}",
            self.trees.len(),
            n_samples,
            n_features
        );
        Ok(())
    }

    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        if !self.is_fitted() {
            return Err(ClassifierError::NotTrained);
        }
        check_predict_inputs(x, self.n_features)?;
        let n_trees = self.trees.len() as f64;
        let p_confirmed = x
            .rows()
            .into_iter()
            .map(|row| self.trees.iter().map(|t| t.predict_row(row)).sum::<f64>() / n_trees)
            .collect::<Vec<_>>();
        Ok(binary_proba(&p_confirmed))
    }

    fn feature_importances(&self) -> Option<Array1<f64>> {
        self.is_fitted().then(|| to_array(&self.feature_importances))
    }

    fn is_fitted(&self) -> bool {
        !self.trees.is_empty()
    }

    fn name(&self) -> &str {
        "random_forest"
    }
}
