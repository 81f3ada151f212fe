//! KOI table reader (CSV/TSV, NASA archive exports included).
use std::io::Read;
use std::path::Path;

use csv::StringRecord;

use crate::data_handling::Dataset;
use crate::error::{ClassifierError, Result};
use crate::schema::DISPOSITION_COLUMN;

/// Configuration for reading KOI tables.
#[derive(Debug, Clone)]
pub struct KoiReaderConfig {
    /// Field delimiter. `None` picks tab for `.tsv` files and comma otherwise.
    pub delimiter: Option<u8>,
    /// Lines starting with this byte are skipped (archive exports prefix
    /// their metadata block with `#`).
    pub comment: Option<u8>,
    /// Column name holding the disposition label.
    pub disposition_column: String,
}

impl Default for KoiReaderConfig {
    fn default() -> Self {
        Self {
            delimiter: None,
            comment: Some(b'#'),
            disposition_column: DISPOSITION_COLUMN.to_string(),
        }
    }
}

/// Read a KOI CSV/TSV file into a [`Dataset`].
pub fn read_koi_csv<P: AsRef<Path>>(path: P) -> Result<Dataset> {
    read_koi_csv_with_config(path, &KoiReaderConfig::default())
}

/// Read a KOI table using a custom configuration.
pub fn read_koi_csv_with_config<P: AsRef<Path>>(path: P, config: &KoiReaderConfig) -> Result<Dataset> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(ClassifierError::NotFound(path.to_path_buf()));
    }
    let delimiter = config.delimiter.unwrap_or_else(|| delimiter_for(path));
    let file = std::fs::File::open(path)?;
    let config = KoiReaderConfig {
        delimiter: Some(delimiter),
        ..config.clone()
    };
    let dataset = read_with_config(file, &config)?;
    log::debug!(
        "Read {} rows and {} numeric columns from {}",
        dataset.n_rows(),
        dataset.column_names().len(),
        path.display()
    );
    Ok(dataset)
}

/// Read a comma separated KOI table from any reader (e.g. uploaded bytes).
pub fn read_koi_csv_from_reader<R: Read>(reader: R) -> Result<Dataset> {
    read_with_config(
        reader,
        &KoiReaderConfig {
            delimiter: Some(b','),
            ..Default::default()
        },
    )
}

fn read_with_config<R: Read>(reader: R, config: &KoiReaderConfig) -> Result<Dataset> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(config.delimiter.unwrap_or(b','))
        .comment(config.comment)
        .has_headers(true)
        .flexible(false)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = reader.headers()?.clone();
    let disposition_idx = find_column(&headers, &config.disposition_column);

    let mut raw: Vec<Vec<String>> = vec![Vec::new(); headers.len()];
    let mut n_rows = 0usize;
    for result in reader.records() {
        let record = result?;
        for (idx, value) in record.iter().enumerate() {
            raw[idx].push(value.to_string());
        }
        n_rows += 1;
    }

    let mut dataset = Dataset::new(n_rows);
    for (idx, header) in headers.iter().enumerate() {
        let cells = std::mem::take(&mut raw[idx]);
        if Some(idx) == disposition_idx {
            dataset.set_dispositions(cells)?;
            continue;
        }
        match parse_numeric_column(&cells) {
            Some(values) => dataset.push_column(header.to_string(), values)?,
            None => log::trace!("Skipping non-numeric column '{}'", header),
        }
    }

    Ok(dataset)
}

fn delimiter_for(path: &Path) -> u8 {
    match path
        .extension()
        .and_then(|s| s.to_str())
        .map(|s| s.to_lowercase())
        .as_deref()
    {
        Some("tsv") => b'\t',
        _ => b',',
    }
}

fn find_column(headers: &StringRecord, name: &str) -> Option<usize> {
    headers
        .iter()
        .position(|header| header.eq_ignore_ascii_case(name))
}

fn is_missing_token(value: &str) -> bool {
    matches!(
        value.to_ascii_lowercase().as_str(),
        "" | "nan" | "na" | "n/a" | "null" | "none"
    )
}

/// `None` when any non-missing cell fails to parse as a number.
fn parse_numeric_column(cells: &[String]) -> Option<Vec<Option<f64>>> {
    cells
        .iter()
        .map(|cell| {
            if is_missing_token(cell) {
                Some(None)
            } else {
                cell.parse::<f64>().ok().map(Some)
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const ARCHIVE_EXPORT: &str = "\
# This file was produced by the NASA Exoplanet Archive
# COLUMN koi_period: Orbital Period [days]
kepoi_name,koi_disposition,koi_period,koi_depth
K00752.01,CONFIRMED,9.488,615.8
K00752.02,FALSE POSITIVE,54.418,
K00753.01,CANDIDATE,NaN,10829.0
";

    #[test]
    fn reads_archive_export_with_comments_and_missing_values() {
        let ds = read_koi_csv_from_reader(ARCHIVE_EXPORT.as_bytes()).unwrap();
        assert_eq!(ds.n_rows(), 3);
        assert_eq!(ds.column("koi_period").unwrap(), &[Some(9.488), Some(54.418), None]);
        assert_eq!(ds.column("koi_depth").unwrap()[1], None);
        assert!(!ds.has_column("kepoi_name"));
        assert_eq!(ds.dispositions().unwrap()[1], "FALSE POSITIVE");
    }

    #[test]
    fn reads_tsv_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("koi.tsv");
        std::fs::write(&path, "koi_period\tkoi_depth\n1.5\t20\n2.5\t30\n").unwrap();
        let ds = read_koi_csv(&path).unwrap();
        assert_eq!(ds.column("koi_depth").unwrap(), &[Some(20.0), Some(30.0)]);
        assert!(ds.dispositions().is_none());
    }

    #[test]
    fn missing_path_is_not_found() {
        let err = read_koi_csv("/nonexistent/koi.csv").unwrap_err();
        assert!(matches!(err, ClassifierError::NotFound(_)));
    }
}
