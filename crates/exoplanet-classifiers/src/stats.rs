use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::schema::BinaryDisposition;

/// Build the 2x2 confusion matrix for binary labels.
///
/// Rows index the true class and columns the predicted class, with class 0
/// (NOT_CONFIRMED) first.
///
/// # Arguments
///
/// * `y_true` - Ground-truth labels (0 or 1).
/// * `y_pred` - Predicted labels, aligned with `y_true`.
///
/// # Returns
///
/// `[[tn, fp], [fn, tp]]` as nested vectors.
pub fn confusion_matrix(y_true: &[usize], y_pred: &[usize]) -> Vec<Vec<usize>> {
    let mut matrix = vec![vec![0usize; 2]; 2];
    for (&t, &p) in y_true.iter().zip(y_pred) {
        matrix[t.min(1)][p.min(1)] += 1;
    }
    matrix
}

pub fn accuracy(y_true: &[usize], y_pred: &[usize]) -> f64 {
    if y_true.is_empty() {
        return 0.0;
    }
    let correct = y_true.iter().zip(y_pred).filter(|(t, p)| t == p).count();
    correct as f64 / y_true.len() as f64
}

/// Mean and population standard deviation. Both are 0.0 for an empty slice.
pub fn mean_std(values: &[f64]) -> (f64, f64) {
    if values.is_empty() {
        return (0.0, 0.0);
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    (mean, var.sqrt())
}

fn safe_div(num: f64, den: f64) -> f64 {
    if den > 0.0 {
        num / den
    } else {
        0.0
    }
}

/// Precision, recall, F1 and support of one class.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct ClassMetrics {
    pub precision: f64,
    pub recall: f64,
    pub f1_score: f64,
    pub support: usize,
}

impl ClassMetrics {
    fn for_class(matrix: &[Vec<usize>], class: usize) -> Self {
        let other = 1 - class;
        let tp = matrix[class][class] as f64;
        let fp = matrix[other][class] as f64;
        let fn_ = matrix[class][other] as f64;
        let precision = safe_div(tp, tp + fp);
        let recall = safe_div(tp, tp + fn_);
        ClassMetrics {
            precision,
            recall,
            f1_score: safe_div(2.0 * precision * recall, precision + recall),
            support: matrix[class][0] + matrix[class][1],
        }
    }
}

fn weighted_average(per_class: &[ClassMetrics; 2], weights: [f64; 2]) -> ClassMetrics {
    let norm = weights[0] + weights[1];
    let combine = |f: fn(&ClassMetrics) -> f64| {
        safe_div(weights[0] * f(&per_class[0]) + weights[1] * f(&per_class[1]), norm)
    };
    ClassMetrics {
        precision: combine(|m| m.precision),
        recall: combine(|m| m.recall),
        f1_score: combine(|m| m.f1_score),
        support: per_class[0].support + per_class[1].support,
    }
}

/// Per-class metrics plus accuracy and macro / support-weighted averages.
/// Zero divisions yield 0.0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationReport {
    pub classes: BTreeMap<String, ClassMetrics>,
    pub accuracy: f64,
    #[serde(rename = "macro avg")]
    pub macro_avg: ClassMetrics,
    #[serde(rename = "weighted avg")]
    pub weighted_avg: ClassMetrics,
}

impl ClassificationReport {
    pub fn new(y_true: &[usize], y_pred: &[usize]) -> Self {
        let matrix = confusion_matrix(y_true, y_pred);
        let per_class = [
            ClassMetrics::for_class(&matrix, 0),
            ClassMetrics::for_class(&matrix, 1),
        ];
        let macro_avg = weighted_average(&per_class, [1.0, 1.0]);
        let weighted_avg = weighted_average(
            &per_class,
            [per_class[0].support as f64, per_class[1].support as f64],
        );

        let classes = per_class
            .iter()
            .enumerate()
            .map(|(class, m)| (BinaryDisposition::from_class(class).as_str().to_string(), *m))
            .collect();

        ClassificationReport {
            classes,
            accuracy: accuracy(y_true, y_pred),
            macro_avg,
            weighted_avg,
        }
    }

    pub fn class(&self, label: BinaryDisposition) -> Option<&ClassMetrics> {
        self.classes.get(label.as_str())
    }
}

/// Evaluation snapshot of a training run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingMetrics {
    pub accuracy: f64,
    /// Positive class is CONFIRMED.
    pub precision: f64,
    pub recall: f64,
    pub f1_score: f64,
    pub confusion_matrix: Vec<Vec<usize>>,
    pub classification_report: ClassificationReport,
    pub cv_mean: f64,
    pub cv_std: f64,
    pub cv_scores: Vec<f64>,
    pub n_train: usize,
    pub n_test: usize,
    pub trained_at: DateTime<Utc>,
}

impl TrainingMetrics {
    /// Held-out metrics from test predictions plus the cross-validation scores.
    pub fn evaluate(y_true: &[usize], y_pred: &[usize], cv_scores: Vec<f64>, n_train: usize) -> Self {
        let report = ClassificationReport::new(y_true, y_pred);
        let positive = report.classes[BinaryDisposition::Confirmed.as_str()];
        let (cv_mean, cv_std) = mean_std(&cv_scores);
        TrainingMetrics {
            accuracy: report.accuracy,
            precision: positive.precision,
            recall: positive.recall,
            f1_score: positive.f1_score,
            confusion_matrix: confusion_matrix(y_true, y_pred),
            classification_report: report,
            cv_mean,
            cv_std,
            cv_scores,
            n_train,
            n_test: y_true.len(),
            trained_at: Utc::now(),
        }
    }
}
