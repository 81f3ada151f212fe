pub mod output;

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

use exoplanet_classifiers::io::read_koi_csv;
use exoplanet_classifiers::service::ClassifierService;
use exoplanet_classifiers::{BinaryDisposition, Dataset, Prediction};

/// Read prediction input: a JSON record (or array of records), or a KOI
/// CSV/TSV table.
pub fn load_input<P: AsRef<Path>>(path: P) -> Result<Dataset> {
    let path = path.as_ref();
    let is_json = path
        .extension()
        .and_then(|s| s.to_str())
        .map(|s| s.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let dataset = if is_json {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read input file: {:?}", path))?;
        let value: serde_json::Value = serde_json::from_str(&text)
            .with_context(|| format!("Input is not valid JSON: {:?}", path))?;
        Dataset::from_json(&value)?
    } else {
        read_koi_csv(path).with_context(|| format!("Failed to read input table: {:?}", path))?
    };
    log::info!("Loaded {} records from {}", dataset.n_rows(), path.display());
    Ok(dataset)
}

/// Classify every row of `input`. Predictions go to `output_file` when
/// given, otherwise to stdout as CSV.
pub fn run_prediction(
    service: &ClassifierService,
    input: &Path,
    output_file: Option<&Path>,
) -> Result<Vec<Prediction>> {
    let dataset = load_input(input)?;
    let predictions = service
        .predict_dataset(&dataset)
        .with_context(|| format!("Prediction failed for {:?}", input))?;

    match output_file {
        Some(path) => {
            output::write_predictions(&predictions, path)?;
            log::info!("Predictions written to: {}", path.display());
        }
        None => output::write_delimited(&predictions, std::io::stdout().lock(), b',')?,
    }

    let confirmed = predictions
        .iter()
        .filter(|p| p.prediction == BinaryDisposition::Confirmed)
        .count();
    log::info!("{} of {} records classified as CONFIRMED", confirmed, predictions.len());
    Ok(predictions)
}
