use anyhow::{Context, Result};
use clap::ArgMatches;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use exoplanet_classifiers::{ArtifactPaths, DataSource, Hyperparameters, ModelType, TrainingOptions};

use crate::util::{parse_hyperparameter_overrides, validate_tsv_or_csv_file};

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct TrainConfig {
    pub version: String,
    /// KOI table to train on; the synthetic dataset when `None`.
    pub train_data: Option<String>,
    pub model_type: ModelType,
    pub model_dir: String,
    /// Merged over the built-in defaults.
    pub hyperparameters: Hyperparameters,
    pub options: TrainingOptions,
    pub report: bool,
}

impl Default for TrainConfig {
    fn default() -> Self {
        TrainConfig {
            version: clap::crate_version!().to_string(),
            train_data: None,
            model_type: ModelType::Ensemble,
            model_dir: String::from("models"),
            hyperparameters: Hyperparameters::default(),
            options: TrainingOptions::default(),
            report: true,
        }
    }
}

impl TrainConfig {
    /// Read a JSON config field by field; missing or invalid fields keep
    /// their defaults.
    pub fn load<P: AsRef<Path>>(config_path: P) -> Result<Self> {
        let config_path = config_path.as_ref();
        let config_json = fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config file: {:?}", config_path))?;

        let partial: serde_json::Value = serde_json::from_str(&config_json)
            .with_context(|| format!("Config is not valid JSON: {:?}", config_path))?;
        let mut config = TrainConfig::default();

        macro_rules! load_or_default {
            ($field:ident) => {
                if let Some(val) = partial.get(stringify!($field)) {
                    if let Ok(parsed) = serde_json::from_value(val.clone()) {
                        config.$field = parsed;
                    } else {
                        log::warn!(
                            "Config Invalid value for '{}', using default: {:?}",
                            stringify!($field), config.$field
                        );
                    }
                } else {
                    log::warn!(
                        "Config Missing field '{}', using default: {:?}",
                        stringify!($field), config.$field
                    );
                }
            };
        }

        load_or_default!(train_data);
        load_or_default!(model_type);
        load_or_default!(model_dir);
        load_or_default!(hyperparameters);
        load_or_default!(options);
        load_or_default!(report);

        Ok(config)
    }

    pub fn from_arguments(config_path: Option<&PathBuf>, matches: &ArgMatches) -> Result<Self> {
        let mut config = match config_path {
            Some(path) => TrainConfig::load(path)?,
            None => TrainConfig::default(),
        };

        // Apply CLI overrides
        if matches.get_flag("synthetic") {
            config.train_data = None;
        } else if let Some(train_data) = matches.get_one::<String>("train_data") {
            validate_tsv_or_csv_file(train_data)?;
            config.train_data = Some(train_data.clone());
        } else if let Some(train_data) = &config.train_data {
            validate_tsv_or_csv_file(train_data)?;
        }

        if let Some(model_type) = matches.get_one::<String>("model_type") {
            config.model_type = ModelType::from_str(model_type)?;
        }
        if let Some(model_dir) = matches.get_one::<String>("model_dir") {
            config.model_dir = model_dir.clone();
        }
        if let Some(pairs) = matches.get_many::<String>("set") {
            let pairs: Vec<&String> = pairs.collect();
            let overrides = parse_hyperparameter_overrides(&pairs)?;
            config.hyperparameters = config.hyperparameters.merged(&overrides);
        }
        if matches.get_flag("no_report") {
            config.report = false;
        }

        Ok(config)
    }

    pub fn data_source(&self) -> DataSource {
        match &self.train_data {
            Some(path) => DataSource::file(path),
            None => DataSource::synthetic(),
        }
    }

    pub fn artifact_paths(&self) -> ArtifactPaths {
        ArtifactPaths::in_dir(&self.model_dir)
    }
}
