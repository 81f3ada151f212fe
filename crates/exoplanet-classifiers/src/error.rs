use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ClassifierError>;

/// Errors raised by the preprocessing and classifier pipeline.
///
/// Every variant is a local, synchronous failure; nothing in this crate
/// retries.
#[derive(Error, Debug)]
pub enum ClassifierError {
    /// Required columns are missing or hold unusable values.
    #[error("Schema error: {0}")]
    Schema(String),

    #[error("Data processor must be fitted before transforming data")]
    NotFitted,

    #[error("Model not trained. Call train() first or load a trained model")]
    NotTrained,

    #[error("File not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Unknown model type: {0}. Expected one of: ensemble, random_forest, gradient_boosting")]
    UnknownModelType(String),

    #[error("Invalid hyperparameter: {name} = {value}, {reason}")]
    InvalidHyperparameter {
        name: String,
        value: f64,
        reason: String,
    },

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ClassifierError {
    pub fn missing_columns<S: AsRef<str>>(columns: &[S]) -> Self {
        let names = columns
            .iter()
            .map(|c| c.as_ref())
            .collect::<Vec<_>>()
            .join(", ");
        ClassifierError::Schema(format!("Missing required columns: {}", names))
    }
}
