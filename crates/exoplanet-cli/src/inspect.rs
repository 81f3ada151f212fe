//! Read-only commands that print JSON to stdout.
use anyhow::Result;
use serde::Serialize;
use std::io::Write;

use exoplanet_classifiers::schema::feature_info;
use exoplanet_classifiers::service::{sample_records, ClassifierService};

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    let mut out = std::io::stdout().lock();
    serde_json::to_writer_pretty(&mut out, value)?;
    writeln!(out)?;
    Ok(())
}

/// Held-out metrics, feature ranking and hyperparameters of the saved model.
pub fn print_metrics(service: &ClassifierService) -> Result<()> {
    print_json(&service.metrics()?)
}

pub fn print_hyperparameters(service: &ClassifierService) -> Result<()> {
    print_json(&service.hyperparameters())
}

pub fn print_features() -> Result<()> {
    print_json(&feature_info())
}

pub fn print_sample(n: usize) -> Result<()> {
    print_json(&sample_records(n)?)
}
