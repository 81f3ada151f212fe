use anyhow::{Context, Result};
use maud::{html, Markup, PreEscaped};
use std::path::{Path, PathBuf};

use exoplanet_classifiers::report::plots::{
    plot_confusion_matrix, plot_cv_scores, plot_feature_importance,
};
use exoplanet_classifiers::report::{Report, ReportSection};
use exoplanet_classifiers::stats::{ClassMetrics, TrainingMetrics};
use exoplanet_classifiers::ExoplanetClassifier;

use crate::util::write_bytes_to_file;

use super::input::TrainConfig;

pub const REPORT_FILE_NAME: &str = "exoplanet_trainer_report.html";
pub const CONFIG_FILE_NAME: &str = "exoplanet_trainer_config.json";

/// Train, persist both artifacts into `config.model_dir` and, unless
/// disabled, write the HTML report and the effective config next to them.
pub fn run_training(config: &TrainConfig) -> Result<TrainingMetrics> {
    let mut classifier =
        ExoplanetClassifier::new(config.model_type).with_options(config.options.clone());
    classifier
        .build(Some(&config.hyperparameters))
        .context("Failed to build the model")?;

    let source = config.data_source();
    let start_time = std::time::Instant::now();
    log::trace!("Training started on {:?}", source);
    let metrics = classifier
        .train(&source)
        .with_context(|| "Training failed: an error occurred during the model training process")?
        .clone();
    log::info!("Training completed in {:?}", start_time.elapsed());

    let paths = config.artifact_paths();
    classifier.save_artifacts(&paths)?;
    log::info!(
        "Model saved to: {} (processor: {})",
        paths.model.display(),
        paths.processor.display()
    );

    if config.report {
        let report_path = Path::new(&config.model_dir).join(REPORT_FILE_NAME);
        build_report(config, &classifier, &metrics)?.save_to_file(&report_path)?;

        let config_path: PathBuf = Path::new(&config.model_dir).join(CONFIG_FILE_NAME);
        let bytes = serde_json::to_vec_pretty(config)?;
        write_bytes_to_file(&config_path, &bytes)?;
    }

    Ok(metrics)
}

pub fn build_report(
    config: &TrainConfig,
    classifier: &ExoplanetClassifier,
    metrics: &TrainingMetrics,
) -> Result<Report> {
    let mut report = Report::new(
        "Exoplanet",
        &config.version,
        None,
        &format!("Exoplanet {} Trainer Report", config.model_type),
    );

    /* Section 1: Overview */
    {
        let mut overview_section = ReportSection::new("Overview");
        let data = config.train_data.as_deref().unwrap_or("synthetic KOI sample");
        overview_section.add_content(html! {
            p {
                "Disposition classifier trained on " (data) " with "
                (metrics.n_train) " training and " (metrics.n_test) " held-out rows, "
                "at " (metrics.trained_at.format("%Y-%m-%d %H:%M:%S UTC").to_string()) "."
            }
            (metrics_table(metrics))
        });
        report.add_section(overview_section);
    }

    /* Section 2: Held-out evaluation */
    {
        let mut eval_section = ReportSection::new("Held-out Evaluation");
        let class_report = &metrics.classification_report;
        let mut rows: Vec<(&str, &ClassMetrics)> = class_report
            .classes
            .iter()
            .map(|(label, m)| (label.as_str(), m))
            .collect();
        rows.push(("macro avg", &class_report.macro_avg));
        rows.push(("weighted avg", &class_report.weighted_avg));
        eval_section.add_content(html! {
            table {
                tr { th { "class" } th { "precision" } th { "recall" } th { "f1-score" } th { "support" } }
                @for (label, m) in &rows {
                    tr {
                        th { (label) }
                        td { (format!("{:.3}", m.precision)) }
                        td { (format!("{:.3}", m.recall)) }
                        td { (format!("{:.3}", m.f1_score)) }
                        td { (m.support) }
                    }
                }
            }
        });
        eval_section.add_plot(plot_confusion_matrix(&metrics.confusion_matrix, "Confusion Matrix"));
        eval_section.add_plot(plot_cv_scores(&metrics.cv_scores, "Cross-validation Accuracy"));
        report.add_section(eval_section);
    }

    /* Section 3: Feature importance */
    {
        let mut importance_section = ReportSection::new("Feature Importance");
        importance_section.add_plot(plot_feature_importance(
            classifier.feature_importance(),
            "Feature Importance",
        ));
        report.add_section(importance_section);
    }

    /* Section 4: Configuration */
    {
        let mut config_section = ReportSection::new("Configuration");
        config_section.add_content(html! {
            style {
                ".code-container {
                    background-color: #f5f5f5;
                    padding: 10px;
                    border-radius: 5px;
                    overflow-x: auto;
                    font-family: monospace;
                    white-space: pre-wrap;
                }"
            }
            div class="code-container" {
                pre {
                    code { (PreEscaped(serde_json::to_string_pretty(&config)?)) }
                }
            }
        });
        report.add_section(config_section);
    }

    Ok(report)
}

fn metrics_table(metrics: &TrainingMetrics) -> Markup {
    html! {
        table {
            tr { th { "accuracy" } td { (format!("{:.4}", metrics.accuracy)) } }
            tr { th { "precision" } td { (format!("{:.4}", metrics.precision)) } }
            tr { th { "recall" } td { (format!("{:.4}", metrics.recall)) } }
            tr { th { "f1-score" } td { (format!("{:.4}", metrics.f1_score)) } }
            tr {
                th { "cv accuracy" }
                td { (format!("{:.4} \u{00b1} {:.4}", metrics.cv_mean, metrics.cv_std)) }
            }
        }
    }
}
