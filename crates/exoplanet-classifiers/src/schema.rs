//! The fixed KOI feature schema and disposition labels.
//!
//! The column order defined here is the column order of every feature
//! matrix produced by the crate.
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ClassifierError;

/// Name of the ground-truth label column.
pub const DISPOSITION_COLUMN: &str = "koi_disposition";

/// Feature columns with their human readable descriptions, in matrix order.
pub const FEATURES: [(&str, &str); 12] = [
    ("koi_period", "Orbital period (days)"),
    ("koi_time0bk", "Transit epoch (BJD - 2454833)"),
    ("koi_impact", "Impact parameter"),
    ("koi_duration", "Transit duration (hours)"),
    ("koi_depth", "Transit depth (ppm)"),
    ("koi_prad", "Planetary radius (Earth radii)"),
    ("koi_teq", "Equilibrium temperature (K)"),
    ("koi_insol", "Insolation flux (Earth flux)"),
    ("koi_model_snr", "Transit signal-to-noise ratio"),
    ("koi_steff", "Stellar effective temperature (K)"),
    ("koi_slogg", "Stellar surface gravity (log10(cm/s^2))"),
    ("koi_srad", "Stellar radius (Solar radii)"),
];

/// Feature column names in matrix order.
pub fn feature_names() -> Vec<String> {
    FEATURES.iter().map(|(name, _)| name.to_string()).collect()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FeatureInfo {
    pub name: String,
    pub description: String,
}

/// Schema listing used by the CLI and the service layer.
pub fn feature_info() -> Vec<FeatureInfo> {
    FEATURES
        .iter()
        .map(|(name, description)| FeatureInfo {
            name: name.to_string(),
            description: description.to_string(),
        })
        .collect()
}

/// Ground-truth disposition of a KOI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Disposition {
    FalsePositive,
    Candidate,
    Confirmed,
}

impl Disposition {
    /// Integer code used by the three-class label path.
    pub fn class_index(&self) -> usize {
        match self {
            Disposition::FalsePositive => 0,
            Disposition::Candidate => 1,
            Disposition::Confirmed => 2,
        }
    }

    /// Spelling used by the NASA exoplanet archive.
    pub fn archive_label(&self) -> &'static str {
        match self {
            Disposition::FalsePositive => "FALSE POSITIVE",
            Disposition::Candidate => "CANDIDATE",
            Disposition::Confirmed => "CONFIRMED",
        }
    }
}

impl FromStr for Disposition {
    type Err = ClassifierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_uppercase().replace('_', " ");
        match normalized.as_str() {
            "FALSE POSITIVE" => Ok(Disposition::FalsePositive),
            "CANDIDATE" => Ok(Disposition::Candidate),
            "CONFIRMED" => Ok(Disposition::Confirmed),
            _ => Err(ClassifierError::Schema(format!(
                "Unrecognized disposition value '{}'",
                s
            ))),
        }
    }
}

impl fmt::Display for Disposition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.archive_label())
    }
}

/// Binary prediction label: confirmed planet or not.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BinaryDisposition {
    NotConfirmed,
    Confirmed,
}

impl BinaryDisposition {
    pub fn from_class(class: usize) -> Self {
        if class == 1 {
            BinaryDisposition::Confirmed
        } else {
            BinaryDisposition::NotConfirmed
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BinaryDisposition::NotConfirmed => "NOT_CONFIRMED",
            BinaryDisposition::Confirmed => "CONFIRMED",
        }
    }
}

impl fmt::Display for BinaryDisposition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
