use anyhow::Result;
use std::{
    fs::{self, File},
    io::Write,
    path::{Path, PathBuf},
};

use exoplanet_classifiers::Hyperparameters;

pub fn validate_tsv_or_csv_file(path: &str) -> Result<()> {
    let pb = PathBuf::from(path);

    let ext = pb
        .extension()
        .and_then(|s| s.to_str())
        .map(|s| s.to_lowercase());
    match ext.as_deref() {
        Some("tsv") | Some("csv") => {}
        _ => anyhow::bail!("File must have a .tsv or .csv extension: {}", path),
    }

    if !pb.exists() {
        anyhow::bail!("File does not exist: {}", path);
    }

    Ok(())
}

/// Write `bytes` to `path`, creating missing parent directories.
pub fn write_bytes_to_file<P: AsRef<Path>>(path: P, bytes: &[u8]) -> std::io::Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let mut file = File::create(path)?;
    file.write_all(bytes)?;
    Ok(())
}

/// Parse `--set name=value` pairs into a partial hyperparameter set.
pub fn parse_hyperparameter_overrides<S: AsRef<str>>(pairs: &[S]) -> Result<Hyperparameters> {
    let mut overrides = Hyperparameters::empty();
    for pair in pairs {
        let pair = pair.as_ref();
        let Some((name, value)) = pair.split_once('=') else {
            anyhow::bail!("Expected name=value, got '{}'", pair);
        };
        let value: f64 = value
            .trim()
            .parse()
            .map_err(|_| anyhow::anyhow!("Hyperparameter '{}' needs a numeric value, got '{}'", name, value))?;
        overrides.set(name.trim(), value);
    }
    Ok(overrides)
}
