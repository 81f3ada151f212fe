use ndarray::{Array1, Array2};

use crate::error::Result;

/// Contract shared by every binary classifier in the ensemble.
///
/// Labels use the crate convention: 1 for CONFIRMED, 0 for everything else.
/// Probability matrices have one row per sample and two columns
/// (`[p_not_confirmed, p_confirmed]`).
pub trait ClassifierModel {
    /// Fit the model on a preprocessed feature matrix.
    fn fit(&mut self, x: &Array2<f64>, y: &[usize]) -> Result<()>;

    /// Class probabilities, `n_samples x 2`.
    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array2<f64>>;

    /// Arg-max class per sample. Ties go to class 0.
    fn predict(&self, x: &Array2<f64>) -> Result<Vec<usize>> {
        let proba = self.predict_proba(x)?;
        Ok(proba
            .rows()
            .into_iter()
            .map(|row| if row[1] > row[0] { 1 } else { 0 })
            .collect())
    }

    /// Normalised per-feature importances, if the model is fitted.
    fn feature_importances(&self) -> Option<Array1<f64>>;

    fn is_fitted(&self) -> bool;

    /// Optional human readable name for the model
    fn name(&self) -> &str {
        "classifier"
    }
}
