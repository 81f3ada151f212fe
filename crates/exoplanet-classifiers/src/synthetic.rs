//! Synthetic KOI dataset for development and tests.
//!
//! Only the shape of this data matters: the full feature schema, roughly 5%
//! missing values per column, and a three-way disposition split driven by
//! signal-to-noise, depth and radius thresholds.
use rand::distributions::Distribution;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use statrs::distribution::{LogNormal, Normal, Uniform};

use crate::data_handling::Dataset;
use crate::error::{ClassifierError, Result};
use crate::schema::{Disposition, FEATURES};

/// Probability that any single feature value is blanked out.
pub const MISSING_RATE: f64 = 0.05;

#[derive(Debug, Clone, Copy)]
enum FeatureDistribution {
    LogNormal { location: f64, scale: f64 },
    Uniform { min: f64, max: f64 },
    Normal { mean: f64, std_dev: f64 },
}

impl FeatureDistribution {
    fn sample_n(&self, n: usize, rng: &mut StdRng) -> Result<Vec<f64>> {
        let stats_err = |e: statrs::StatsError| ClassifierError::InvalidData(e.to_string());
        let values = match *self {
            FeatureDistribution::LogNormal { location, scale } => {
                let dist = LogNormal::new(location, scale).map_err(stats_err)?;
                (0..n).map(|_| dist.sample(rng)).collect()
            }
            FeatureDistribution::Uniform { min, max } => {
                let dist = Uniform::new(min, max).map_err(stats_err)?;
                (0..n).map(|_| dist.sample(rng)).collect()
            }
            FeatureDistribution::Normal { mean, std_dev } => {
                let dist = Normal::new(mean, std_dev).map_err(stats_err)?;
                (0..n).map(|_| dist.sample(rng)).collect()
            }
        };
        Ok(values)
    }
}

/// Per-feature distributions, aligned with `schema::FEATURES`.
const DISTRIBUTIONS: [FeatureDistribution; 12] = [
    FeatureDistribution::LogNormal { location: 2.0, scale: 1.5 },   // koi_period
    FeatureDistribution::Uniform { min: 130.0, max: 1600.0 },       // koi_time0bk
    FeatureDistribution::Uniform { min: 0.0, max: 1.0 },            // koi_impact
    FeatureDistribution::LogNormal { location: 1.0, scale: 0.8 },   // koi_duration
    FeatureDistribution::LogNormal { location: 3.0, scale: 1.2 },   // koi_depth
    FeatureDistribution::LogNormal { location: 0.5, scale: 0.8 },   // koi_prad
    FeatureDistribution::Normal { mean: 800.0, std_dev: 400.0 },    // koi_teq
    FeatureDistribution::LogNormal { location: 1.0, scale: 2.0 },   // koi_insol
    FeatureDistribution::LogNormal { location: 2.0, scale: 1.0 },   // koi_model_snr
    FeatureDistribution::Normal { mean: 5500.0, std_dev: 800.0 },   // koi_steff
    FeatureDistribution::Normal { mean: 4.4, std_dev: 0.3 },        // koi_slogg
    FeatureDistribution::LogNormal { location: 0.0, scale: 0.3 },   // koi_srad
];

const SNR_IDX: usize = 8;
const DEPTH_IDX: usize = 4;
const PRAD_IDX: usize = 5;

fn assign_disposition(snr: f64, depth: f64, prad: f64) -> Disposition {
    if snr > 15.0 && depth > 50.0 && prad < 20.0 {
        Disposition::Confirmed
    } else if snr > 8.0 && depth > 20.0 {
        Disposition::Candidate
    } else {
        Disposition::FalsePositive
    }
}

/// Generate `n_samples` labelled KOI rows. Identical seeds give identical data.
pub fn generate_koi_dataset(n_samples: usize, seed: u64) -> Result<Dataset> {
    let mut rng = StdRng::seed_from_u64(seed);

    let mut columns = Vec::with_capacity(FEATURES.len());
    for dist in DISTRIBUTIONS.iter() {
        columns.push(dist.sample_n(n_samples, &mut rng)?);
    }

    // Labels come from the complete values, before any are blanked out.
    let dispositions = (0..n_samples)
        .map(|i| {
            assign_disposition(columns[SNR_IDX][i], columns[DEPTH_IDX][i], columns[PRAD_IDX][i])
                .archive_label()
                .to_string()
        })
        .collect::<Vec<_>>();

    let mut dataset = Dataset::new(n_samples);
    for ((name, _), values) in FEATURES.iter().zip(columns) {
        let with_missing = values
            .into_iter()
            .map(|v| if rng.gen::<f64>() < MISSING_RATE { None } else { Some(v) })
            .collect();
        dataset.push_column(*name, with_missing)?;
    }
    dataset.set_dispositions(dispositions)?;

    log::debug!("Generated {} synthetic KOI rows (seed {})", n_samples, seed);
    Ok(dataset)
}
