//! Error taxonomy for the detection core

use thiserror::Error;

/// Faults produced by the detection core.
#[derive(Debug, Error)]
pub enum DetectorError {
    /// Request rejected before feature extraction ran. Client-facing.
    #[error("invalid request: {0}")]
    Validation(String),

    /// Feature computation failed for schema-valid input. Unreachable by
    /// construction; any occurrence is a defect in the extractor.
    #[error("feature extraction failed: {0}")]
    Extraction(String),

    /// Classifier or cluster model disabled or not loaded. Never coerced
    /// into a default verdict.
    #[error("model unavailable: {0}")]
    ModelUnavailable(String),

    /// Audit side-channel failure. Swallowed at the logging boundary,
    /// never surfaced to scoring callers.
    #[error("audit log write failed: {0}")]
    Audit(#[from] std::io::Error),
}

impl DetectorError {
    /// Stable label for metrics and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            DetectorError::Validation(_) => "validation",
            DetectorError::Extraction(_) => "extraction",
            DetectorError::ModelUnavailable(_) => "model_unavailable",
            DetectorError::Audit(_) => "audit",
        }
    }
}

/// Convenience alias used throughout the core.
pub type Result<T> = std::result::Result<T, DetectorError>;
