//! Command implementations behind the `exoplanet` binary.
pub mod inspect;
pub mod predict;
pub mod train;
pub mod util;

use anyhow::{Context, Result};
use std::path::Path;

use exoplanet_classifiers::service::ClassifierService;
use exoplanet_classifiers::{ArtifactPaths, ModelType, TrainingOptions};

/// Open the service over `model_dir`, training a default model there when
/// nothing has been saved yet.
pub fn open_service<P: AsRef<Path>>(model_dir: P) -> Result<ClassifierService> {
    let model_dir = model_dir.as_ref();
    ClassifierService::start(
        ArtifactPaths::in_dir(model_dir),
        ModelType::default(),
        TrainingOptions::default(),
    )
    .with_context(|| format!("Failed to open model directory {:?}", model_dir))
}
