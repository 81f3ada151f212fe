//! Tabular KOI datasets, data sources, and train/test partitioning.
//!
//! `Dataset` is a small column store: numeric columns keyed by name with
//! `None` marking a missing value, plus the optional disposition column.
//! Partitioning helpers work on label vectors and return row indices so the
//! same split can be applied to any row-aligned structure.
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde_json::Value;

use crate::error::{ClassifierError, Result};
use crate::schema::DISPOSITION_COLUMN;

/// One feature record keyed by column name. `None` is a missing value.
pub type Record = BTreeMap<String, Option<f64>>;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    columns: Vec<String>,
    values: HashMap<String, Vec<Option<f64>>>,
    dispositions: Option<Vec<String>>,
    n_rows: usize,
}

impl Dataset {
    pub fn new(n_rows: usize) -> Self {
        Dataset {
            n_rows,
            ..Default::default()
        }
    }

    /// Add (or replace) a numeric column. NaN is stored as missing.
    pub fn push_column(&mut self, name: impl Into<String>, values: Vec<Option<f64>>) -> Result<()> {
        let name = name.into();
        if values.len() != self.n_rows {
            return Err(ClassifierError::InvalidData(format!(
                "Column '{}' has {} values, expected {}",
                name,
                values.len(),
                self.n_rows
            )));
        }
        let values = values
            .into_iter()
            .map(|v| v.filter(|x| !x.is_nan()))
            .collect();
        if !self.values.contains_key(&name) {
            self.columns.push(name.clone());
        }
        self.values.insert(name, values);
        Ok(())
    }

    pub fn set_dispositions(&mut self, dispositions: Vec<String>) -> Result<()> {
        if dispositions.len() != self.n_rows {
            return Err(ClassifierError::InvalidData(format!(
                "Disposition column has {} values, expected {}",
                dispositions.len(),
                self.n_rows
            )));
        }
        self.dispositions = Some(dispositions);
        Ok(())
    }

    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    pub fn is_empty(&self) -> bool {
        self.n_rows == 0
    }

    /// Numeric column names in insertion order.
    pub fn column_names(&self) -> &[String] {
        &self.columns
    }

    pub fn has_column(&self, name: &str) -> bool {
        if name == DISPOSITION_COLUMN {
            return self.dispositions.is_some();
        }
        self.values.contains_key(name)
    }

    pub fn column(&self, name: &str) -> Option<&[Option<f64>]> {
        self.values.get(name).map(|v| v.as_slice())
    }

    pub fn dispositions(&self) -> Option<&[String]> {
        self.dispositions.as_deref()
    }

    /// Count of missing values in a numeric column.
    pub fn missing_count(&self, name: &str) -> usize {
        self.column(name)
            .map(|values| values.iter().filter(|v| v.is_none()).count())
            .unwrap_or(0)
    }

    /// Rows at `indices`, in the given order.
    pub fn select_rows(&self, indices: &[usize]) -> Dataset {
        let values = self
            .values
            .iter()
            .map(|(name, column)| {
                let selected = indices.iter().map(|&i| column[i]).collect::<Vec<_>>();
                (name.clone(), selected)
            })
            .collect();
        let dispositions = self
            .dispositions
            .as_ref()
            .map(|d| indices.iter().map(|&i| d[i].clone()).collect());
        Dataset {
            columns: self.columns.clone(),
            values,
            dispositions,
            n_rows: indices.len(),
        }
    }

    /// First `n` rows.
    pub fn head(&self, n: usize) -> Dataset {
        let indices = (0..n.min(self.n_rows)).collect::<Vec<_>>();
        self.select_rows(&indices)
    }

    /// Build a dataset from records. A column absent from some records is
    /// missing for those rows.
    pub fn from_records(records: &[Record]) -> Dataset {
        let mut columns: Vec<String> = Vec::new();
        for record in records {
            for name in record.keys() {
                if !columns.contains(name) {
                    columns.push(name.clone());
                }
            }
        }

        let mut dataset = Dataset::new(records.len());
        for name in columns {
            let values = records
                .iter()
                .map(|r| r.get(&name).copied().flatten())
                .collect();
            // lengths match by construction
            let _ = dataset.push_column(name, values);
        }
        dataset
    }

    /// Build a dataset from a JSON object or an array of objects.
    ///
    /// Numbers become feature values, `null` is missing, and the
    /// disposition column is kept as text when every record carries it.
    /// Other non-numeric fields are ignored.
    pub fn from_json(value: &Value) -> Result<Dataset> {
        let objects = match value {
            Value::Object(map) => vec![map],
            Value::Array(items) => items
                .iter()
                .enumerate()
                .map(|(i, item)| {
                    item.as_object().ok_or_else(|| {
                        ClassifierError::InvalidData(format!("Record {} is not a JSON object", i))
                    })
                })
                .collect::<Result<Vec<_>>>()?,
            _ => {
                return Err(ClassifierError::InvalidData(
                    "Expected a JSON object or an array of objects".to_string(),
                ))
            }
        };

        let mut records = Vec::with_capacity(objects.len());
        let mut dispositions = Vec::with_capacity(objects.len());
        for object in &objects {
            let mut record = Record::new();
            for (key, field) in object.iter() {
                if key == DISPOSITION_COLUMN {
                    if let Some(label) = field.as_str() {
                        dispositions.push(label.to_string());
                    }
                    continue;
                }
                match field {
                    Value::Number(n) => {
                        record.insert(key.clone(), n.as_f64());
                    }
                    Value::Null => {
                        record.insert(key.clone(), None);
                    }
                    _ => {}
                }
            }
            records.push(record);
        }

        let mut dataset = Dataset::from_records(&records);
        if !dispositions.is_empty() && dispositions.len() == records.len() {
            dataset.set_dispositions(dispositions)?;
        }
        Ok(dataset)
    }

    /// Numeric columns of every row, in row order.
    pub fn to_records(&self) -> Vec<Record> {
        (0..self.n_rows)
            .map(|row| {
                self.columns
                    .iter()
                    .map(|name| (name.clone(), self.values[name][row]))
                    .collect()
            })
            .collect()
    }
}

/// Where a training dataset comes from. The caller picks the variant;
/// loading never swaps one for the other.
#[derive(Debug, Clone, PartialEq)]
pub enum DataSource {
    File(PathBuf),
    Synthetic { n_samples: usize, seed: u64 },
}

impl DataSource {
    pub const DEFAULT_SYNTHETIC_SAMPLES: usize = 1000;
    pub const DEFAULT_SYNTHETIC_SEED: u64 = 42;

    pub fn file<P: AsRef<Path>>(path: P) -> Self {
        DataSource::File(path.as_ref().to_path_buf())
    }

    /// The 1000-row synthetic dataset with seed 42.
    pub fn synthetic() -> Self {
        DataSource::Synthetic {
            n_samples: Self::DEFAULT_SYNTHETIC_SAMPLES,
            seed: Self::DEFAULT_SYNTHETIC_SEED,
        }
    }

    pub fn load(&self) -> Result<Dataset> {
        match self {
            DataSource::File(path) => {
                if !path.exists() {
                    return Err(ClassifierError::NotFound(path.clone()));
                }
                crate::io::read_koi_csv(path)
            }
            DataSource::Synthetic { n_samples, seed } => {
                crate::synthetic::generate_koi_dataset(*n_samples, *seed)
            }
        }
    }
}

fn indices_by_class(labels: &[usize]) -> BTreeMap<usize, Vec<usize>> {
    let mut by_class: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
    for (i, &label) in labels.iter().enumerate() {
        by_class.entry(label).or_default().push(i);
    }
    by_class
}

/// Split row indices into `(train, test)` keeping each class's share.
///
/// Every class contributes `round(n_class * test_fraction)` rows to the test
/// partition (at least one, and never all of them).
pub fn stratified_split(
    labels: &[usize],
    test_fraction: f64,
    seed: u64,
) -> Result<(Vec<usize>, Vec<usize>)> {
    if !(test_fraction > 0.0 && test_fraction < 1.0) {
        return Err(ClassifierError::InvalidData(format!(
            "test_fraction must be in (0, 1), got {}",
            test_fraction
        )));
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let mut train = Vec::with_capacity(labels.len());
    let mut test = Vec::new();

    for (class, mut members) in indices_by_class(labels) {
        if members.len() < 2 {
            return Err(ClassifierError::InvalidData(format!(
                "Class {} has {} member(s); stratified split needs at least 2",
                class,
                members.len()
            )));
        }
        members.shuffle(&mut rng);
        let n_test = ((members.len() as f64 * test_fraction).round() as usize)
            .clamp(1, members.len() - 1);
        test.extend_from_slice(&members[..n_test]);
        train.extend_from_slice(&members[n_test..]);
    }

    train.shuffle(&mut rng);
    test.shuffle(&mut rng);
    Ok((train, test))
}

/// Stratified k-fold partitions as `(train, validation)` index pairs.
///
/// Members of each class are shuffled and dealt round-robin across folds,
/// continuing from where the previous class stopped so fold sizes differ by
/// at most one.
pub fn stratified_k_fold(
    labels: &[usize],
    n_folds: usize,
    seed: u64,
) -> Result<Vec<(Vec<usize>, Vec<usize>)>> {
    if n_folds < 2 {
        return Err(ClassifierError::InvalidData(
            "n_folds must be at least 2".to_string(),
        ));
    }
    if labels.len() < n_folds {
        return Err(ClassifierError::InvalidData(format!(
            "n_samples ({}) must be >= n_folds ({})",
            labels.len(),
            n_folds
        )));
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let mut fold_of = vec![0usize; labels.len()];
    let mut next_fold = 0usize;
    for (_, mut members) in indices_by_class(labels) {
        members.shuffle(&mut rng);
        for idx in members {
            fold_of[idx] = next_fold;
            next_fold = (next_fold + 1) % n_folds;
        }
    }

    Ok((0..n_folds)
        .map(|fold| {
            let (validation, train): (Vec<usize>, Vec<usize>) =
                (0..labels.len()).partition(|&i| fold_of[i] == fold);
            (train, validation)
        })
        .collect())
}
