//! exoplanet-classifiers: disposition classification for Kepler Objects of
//! Interest.
//!
//! The crate covers the whole pipeline: the KOI feature schema, CSV and
//! synthetic data sources, median imputation and z-score scaling, tree
//! ensembles (random forest, gradient boosting, soft voting), evaluation,
//! persistence, HTML reporting and a lock-guarded service layer.
pub mod classifier;
pub mod config;
pub mod data_handling;
pub mod error;
pub mod io;
pub mod models;
pub mod preprocessing;
pub mod report;
pub mod schema;
pub mod service;
pub mod stats;
pub mod synthetic;

pub use classifier::{
    ArtifactPaths, ClassifierState, ExoplanetClassifier, FeatureImportance, Prediction,
};
pub use config::{Hyperparameters, ModelType, TrainingOptions};
pub use data_handling::{DataSource, Dataset, Record};
pub use error::{ClassifierError, Result};
pub use preprocessing::DataProcessor;
pub use schema::{BinaryDisposition, Disposition};
