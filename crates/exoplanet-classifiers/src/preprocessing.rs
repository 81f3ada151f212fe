//! Feature preprocessing: schema enforcement, median imputation, z-score
//! scaling and label preparation.
//!
//! The imputer and the scaler are always fitted together, on the same
//! matrix, so a fitted `DataProcessor` reproduces the exact transform that
//! was applied to its training data.
use std::fs;
use std::path::Path;

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::data_handling::{DataSource, Dataset};
use crate::error::{ClassifierError, Result};
use crate::schema::{feature_names, Disposition, DISPOSITION_COLUMN};

/// Per-column median fill values.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Default)]
pub struct MedianImputer {
    pub fill_values: Vec<f64>,
}

impl MedianImputer {
    /// Fit on a column-major view of the raw feature values.
    pub fn fit(columns: &[Vec<Option<f64>>], names: &[String]) -> Self {
        let fill_values = columns
            .iter()
            .zip(names)
            .map(|(column, name)| {
                let mut observed = column.iter().flatten().copied().collect::<Vec<f64>>();
                match median(&mut observed) {
                    Some(m) => m,
                    None => {
                        log::warn!("Column '{}' has no observed values; imputing 0.0", name);
                        0.0
                    }
                }
            })
            .collect();
        MedianImputer { fill_values }
    }

    /// Row-major matrix with every missing value replaced by its column median.
    pub fn transform(&self, columns: &[Vec<Option<f64>>], n_rows: usize) -> Array2<f64> {
        Array2::from_shape_fn((n_rows, columns.len()), |(r, c)| {
            columns[c][r].unwrap_or(self.fill_values[c])
        })
    }
}

fn median(values: &mut [f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(|a, b| a.total_cmp(b));
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        Some((values[mid - 1] + values[mid]) / 2.0)
    } else {
        Some(values[mid])
    }
}

/// Standard scaler (per-column mean and population std).
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Default)]
pub struct StandardScaler {
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
}

impl StandardScaler {
    /// Fit a scaler on an `Array2<f64>` where rows are samples and columns
    /// are features. Zero-variance columns get scale 1.0.
    pub fn fit(x: &Array2<f64>) -> Self {
        let (nrows, ncols) = x.dim();
        let nrows_f = nrows.max(1) as f64;

        let mut mean = vec![0.0f64; ncols];
        for r in 0..nrows {
            for c in 0..ncols {
                mean[c] += x[(r, c)];
            }
        }
        for v in mean.iter_mut() {
            *v /= nrows_f;
        }

        let mut var = vec![0.0f64; ncols];
        for r in 0..nrows {
            for c in 0..ncols {
                let d = x[(r, c)] - mean[c];
                var[c] += d * d;
            }
        }
        let scale = var
            .into_iter()
            .map(|v| {
                let std = (v / nrows_f).sqrt();
                if std > 0.0 {
                    std
                } else {
                    1.0
                }
            })
            .collect();

        StandardScaler { mean, scale }
    }

    /// Transform all rows and return a new matrix.
    pub fn transform(&self, x: &Array2<f64>) -> Array2<f64> {
        let mut out = x.clone();
        for ((_, c), v) in out.indexed_iter_mut() {
            *v = (*v - self.mean[c]) / self.scale[c];
        }
        out
    }
}

/// Schema enforcement plus the fitted imputer and scaler.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct DataProcessor {
    feature_columns: Vec<String>,
    imputer: MedianImputer,
    scaler: StandardScaler,
    is_fitted: bool,
}

impl Default for DataProcessor {
    fn default() -> Self {
        Self::new()
    }
}

impl DataProcessor {
    pub fn new() -> Self {
        DataProcessor {
            feature_columns: feature_names(),
            imputer: MedianImputer::default(),
            scaler: StandardScaler::default(),
            is_fitted: false,
        }
    }

    /// Load a dataset from an explicit source.
    pub fn load(&self, source: &DataSource) -> Result<Dataset> {
        let dataset = source.load()?;
        log::info!("Loaded {} KOI rows", dataset.n_rows());
        Ok(dataset)
    }

    /// Fail with a schema error listing every missing feature column.
    pub fn validate(&self, dataset: &Dataset) -> Result<()> {
        let missing = self
            .feature_columns
            .iter()
            .filter(|name| !dataset.has_column(name))
            .collect::<Vec<_>>();
        if !missing.is_empty() {
            return Err(ClassifierError::missing_columns(&missing));
        }
        Ok(())
    }

    /// Impute and scale the schema columns of `dataset`.
    ///
    /// With `fit = true` the imputer and scaler are (re)fitted on this data
    /// first; otherwise the stored statistics are applied.
    pub fn preprocess(&mut self, dataset: &Dataset, fit: bool) -> Result<Array2<f64>> {
        if !fit {
            return self.transform(dataset);
        }
        let columns = self.schema_columns(dataset)?;
        if dataset.is_empty() {
            return Err(ClassifierError::InvalidData(
                "Cannot fit preprocessing on an empty dataset".to_string(),
            ));
        }
        self.imputer = MedianImputer::fit(&columns, &self.feature_columns);
        let imputed = self.imputer.transform(&columns, dataset.n_rows());
        self.scaler = StandardScaler::fit(&imputed);
        self.is_fitted = true;
        log::debug!(
            "Fitted imputer and scaler on {} rows x {} features",
            imputed.nrows(),
            imputed.ncols()
        );
        Ok(self.scaler.transform(&imputed))
    }

    /// Apply the fitted imputer and scaler without refitting.
    pub fn transform(&self, dataset: &Dataset) -> Result<Array2<f64>> {
        let columns = self.schema_columns(dataset)?;
        if !self.is_fitted {
            return Err(ClassifierError::NotFitted);
        }
        let imputed = self.imputer.transform(&columns, dataset.n_rows());
        Ok(self.scaler.transform(&imputed))
    }

    /// Schema columns of `dataset` in matrix order, after validation.
    fn schema_columns(&self, dataset: &Dataset) -> Result<Vec<Vec<Option<f64>>>> {
        self.validate(dataset)?;
        self.feature_columns
            .iter()
            .map(|name| {
                dataset
                    .column(name)
                    .map(|c| c.to_vec())
                    .ok_or_else(|| ClassifierError::missing_columns(&[name]))
            })
            .collect()
    }

    /// `CONFIRMED -> 1`, anything else `-> 0`.
    pub fn prepare_binary_labels(&self, dataset: &Dataset) -> Result<Vec<usize>> {
        let dispositions = require_dispositions(dataset)?;
        Ok(dispositions
            .iter()
            .map(|label| match label.parse::<Disposition>() {
                Ok(Disposition::Confirmed) => 1,
                _ => 0,
            })
            .collect())
    }

    /// `FALSE POSITIVE -> 0`, `CANDIDATE -> 1`, `CONFIRMED -> 2`. An unknown
    /// disposition is a schema error.
    pub fn prepare_multiclass_labels(&self, dataset: &Dataset) -> Result<Vec<usize>> {
        let dispositions = require_dispositions(dataset)?;
        dispositions
            .iter()
            .enumerate()
            .map(|(row, label)| {
                label
                    .parse::<Disposition>()
                    .map(|d| d.class_index())
                    .map_err(|_| {
                        ClassifierError::Schema(format!(
                            "Unrecognized disposition value '{}' at row {}",
                            label, row
                        ))
                    })
            })
            .collect()
    }

    /// Write the processor state as JSON, creating parent directories.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        log::debug!("Saved data processor to {}", path.display());
        Ok(())
    }

    /// Restore a processor written by [`DataProcessor::save`].
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ClassifierError::NotFound(path.to_path_buf()));
        }
        let processor: DataProcessor = serde_json::from_str(&fs::read_to_string(path)?)?;
        if processor.feature_columns != feature_names() {
            return Err(ClassifierError::Schema(format!(
                "Persisted processor columns {:?} do not match the feature schema",
                processor.feature_columns
            )));
        }
        let n = processor.feature_columns.len();
        if processor.is_fitted
            && (processor.imputer.fill_values.len() != n
                || processor.scaler.mean.len() != n
                || processor.scaler.scale.len() != n)
        {
            return Err(ClassifierError::InvalidData(format!(
                "Persisted processor statistics do not cover {} features",
                n
            )));
        }
        Ok(processor)
    }

    pub fn feature_names(&self) -> &[String] {
        &self.feature_columns
    }

    pub fn is_fitted(&self) -> bool {
        self.is_fitted
    }

    pub fn imputer(&self) -> &MedianImputer {
        &self.imputer
    }

    pub fn scaler(&self) -> &StandardScaler {
        &self.scaler
    }
}

fn require_dispositions(dataset: &Dataset) -> Result<&[String]> {
    dataset
        .dispositions()
        .ok_or_else(|| ClassifierError::missing_columns(&[DISPOSITION_COLUMN]))
}
