use ndarray::{Array1, Array2};

use crate::error::{ClassifierError, Result};

/// Check that a training matrix and its labels line up and hold both classes.
pub fn check_fit_inputs(x: &Array2<f64>, y: &[usize]) -> Result<()> {
    if x.nrows() == 0 || x.ncols() == 0 {
        return Err(ClassifierError::InvalidData(
            "Cannot fit on an empty feature matrix".to_string(),
        ));
    }
    if x.nrows() != y.len() {
        return Err(ClassifierError::InvalidData(format!(
            "Feature matrix has {} rows but {} labels were given",
            x.nrows(),
            y.len()
        )));
    }
    if let Some(bad) = y.iter().find(|&&label| label > 1) {
        return Err(ClassifierError::InvalidData(format!(
            "Binary classifier got label {}",
            bad
        )));
    }
    Ok(())
}

/// Check that a prediction matrix has the width the model was fitted on.
pub fn check_predict_inputs(x: &Array2<f64>, n_features: usize) -> Result<()> {
    if x.ncols() != n_features {
        return Err(ClassifierError::InvalidData(format!(
            "Expected {} features, got {}",
            n_features,
            x.ncols()
        )));
    }
    Ok(())
}

/// Scale non-negative weights to sum to one; an all-zero vector stays zero.
pub fn normalize(values: &mut [f64]) {
    let total: f64 = values.iter().sum();
    if total > 0.0 {
        for v in values.iter_mut() {
            *v /= total;
        }
    }
}

pub fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}

/// `n x 2` probability matrix from `P(class 1)` per row.
pub fn binary_proba(p_positive: &[f64]) -> Array2<f64> {
    Array2::from_shape_fn((p_positive.len(), 2), |(r, c)| {
        if c == 1 {
            p_positive[r]
        } else {
            1.0 - p_positive[r]
        }
    })
}

pub fn to_array(values: &[f64]) -> Array1<f64> {
    Array1::from_vec(values.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_sums_to_one_or_stays_zero() {
        let mut v = vec![1.0, 3.0];
        normalize(&mut v);
        assert_eq!(v, vec![0.25, 0.75]);
        let mut zeros = vec![0.0, 0.0];
        normalize(&mut zeros);
        assert_eq!(zeros, vec![0.0, 0.0]);
    }

    #[test]
    fn binary_proba_rows_sum_to_one() {
        let proba = binary_proba(&[0.2, 0.9]);
        assert_eq!(proba.dim(), (2, 2));
        for row in proba.rows() {
            assert!((row.sum() - 1.0).abs() < 1e-12);
        }
        assert_eq!(proba[(1, 1)], 0.9);
    }

    #[test]
    fn fit_inputs_must_align() {
        let x = Array2::<f64>::zeros((3, 2));
        assert!(check_fit_inputs(&x, &[0, 1, 0]).is_ok());
        assert!(check_fit_inputs(&x, &[0, 1]).is_err());
        assert!(check_fit_inputs(&x, &[0, 2, 1]).is_err());
    }
}
