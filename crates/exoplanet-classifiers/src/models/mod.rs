pub mod classifier_trait;
pub mod decision_tree;
pub mod factory;
pub mod gradient_boosting;
pub mod random_forest;
pub mod utils;
pub mod voting;

pub use classifier_trait::ClassifierModel;
pub use factory::{build_model, EnsembleModel};
