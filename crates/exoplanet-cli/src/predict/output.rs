use anyhow::{Context, Result};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use exoplanet_classifiers::Prediction;

/// Write predictions as CSV or TSV, picked from the file extension.
pub fn write_predictions<P: AsRef<Path>>(predictions: &[Prediction], output_path: P) -> Result<()> {
    let path = output_path.as_ref();
    let extension = path.extension().and_then(|ext| ext.to_str()).unwrap_or("csv");
    let delimiter = match extension {
        "tsv" => b'\t',
        _ => b',',
    };

    let file = File::create(path).with_context(|| format!("Failed to create output file: {:?}", path))?;
    write_delimited(predictions, BufWriter::new(file), delimiter)
}

pub fn write_delimited<W: Write>(predictions: &[Prediction], out: W, delimiter: u8) -> Result<()> {
    let mut writer = csv::WriterBuilder::new().delimiter(delimiter).from_writer(out);

    writer.write_record([
        "row",
        "prediction",
        "confidence",
        "probability_confirmed",
        "probability_not_confirmed",
    ])?;

    for (row, p) in predictions.iter().enumerate() {
        writer.write_record(&[
            row.to_string(),
            p.prediction.to_string(),
            format!("{:.6}", p.confidence),
            format!("{:.6}", p.probability_confirmed),
            format!("{:.6}", p.probability_not_confirmed),
        ])?;
    }

    writer.flush()?;
    Ok(())
}
