//! Classifier capability consumed by the scoring engine

use crate::error::{DetectorError, Result};

/// Probability source backing the scoring engine.
///
/// Implementations wrap a trained model whose positive class was fixed at
/// training time to mean "human". Implementations are shared across request
/// tasks, so they must be `Send + Sync` and internally immutable.
pub trait Classifier: Send + Sync {
    /// Probability of the positive (human) class for one feature vector,
    /// assembled in the schema's declared order.
    fn predict_probability(&self, features: &[f64]) -> Result<f64>;

    /// Format tag for logs.
    fn model_format(&self) -> &str;

    /// Whether the model can currently serve predictions. Health reporting
    /// only; the scoring path never pre-checks this.
    fn is_available(&self) -> bool {
        true
    }
}

/// Stand-in installed when the browser model is disabled by configuration.
///
/// Every prediction fails with the model-unavailable fault so a missing
/// model is never mistaken for a verdict.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledClassifier;

impl DisabledClassifier {
    pub fn new() -> Self {
        Self
    }
}

impl Classifier for DisabledClassifier {
    fn predict_probability(&self, _features: &[f64]) -> Result<f64> {
        Err(DetectorError::ModelUnavailable(
            "browser model is disabled via configuration".to_string(),
        ))
    }

    fn model_format(&self) -> &str {
        "disabled"
    }

    fn is_available(&self) -> bool {
        false
    }
}
