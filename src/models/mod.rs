//! Model metadata and the classifier capability

pub mod classifier;
pub mod metadata;

pub use classifier::{Classifier, DisabledClassifier};
pub use metadata::ModelMetadata;
