use plotly::common::{ColorScale, ColorScalePalette, Orientation};
use plotly::layout::{Axis, Layout};
use plotly::{Bar, HeatMap, Plot};

use crate::classifier::FeatureImportance;
use crate::schema::BinaryDisposition;

/// Horizontal bar chart of the feature ranking, most important on top.
pub fn plot_feature_importance(ranking: &[FeatureImportance], title: &str) -> Plot {
    let features: Vec<String> = ranking.iter().rev().map(|f| f.feature.clone()).collect();
    let importances: Vec<f64> = ranking.iter().rev().map(|f| f.importance).collect();

    let mut plot = Plot::new();
    plot.add_trace(
        Bar::new(importances, features)
            .orientation(Orientation::Horizontal)
            .name("Importance"),
    );
    plot.set_layout(
        Layout::new()
            .title(title)
            .x_axis(Axis::new().title("Importance"))
            .y_axis(Axis::new().title("Feature")),
    );
    plot
}

/// Heatmap of a 2x2 confusion matrix (rows = truth, columns = prediction).
pub fn plot_confusion_matrix(matrix: &[Vec<usize>], title: &str) -> Plot {
    let labels: Vec<String> = (0..matrix.len())
        .map(|class| BinaryDisposition::from_class(class).to_string())
        .collect();
    let z: Vec<Vec<f64>> = matrix
        .iter()
        .map(|row| row.iter().map(|&v| v as f64).collect())
        .collect();

    let mut plot = Plot::new();
    plot.add_trace(
        HeatMap::new(labels.clone(), labels, z)
            .color_scale(ColorScale::Palette(ColorScalePalette::Blues))
            .name("Count"),
    );
    plot.set_layout(
        Layout::new()
            .title(title)
            .x_axis(Axis::new().title("Predicted"))
            .y_axis(Axis::new().title("True")),
    );
    plot
}

/// Accuracy of each cross-validation fold.
pub fn plot_cv_scores(scores: &[f64], title: &str) -> Plot {
    let folds: Vec<String> = (1..=scores.len()).map(|i| format!("Fold {}", i)).collect();

    let mut plot = Plot::new();
    plot.add_trace(Bar::new(folds, scores.to_vec()).name("Accuracy"));
    plot.set_layout(
        Layout::new()
            .title(title)
            .x_axis(Axis::new().title("Fold"))
            .y_axis(Axis::new().title("Accuracy").range(vec![0.0, 1.0])),
    );
    plot
}
