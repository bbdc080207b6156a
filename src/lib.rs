//! Behavioral Agent Detection Core
//!
//! Deterministic feature extraction from web-session telemetry, classifier
//! scoring with an explicit verdict policy, and cluster-based transaction
//! anomaly detection.

pub mod audit;
pub mod cluster;
pub mod config;
pub mod detection;
pub mod error;
pub mod feature_extractor;
pub mod health;
pub mod metrics;
pub mod models;
pub mod types;

pub use audit::AuditLogger;
pub use cluster::{ClusterDetectionService, ClusterModel, ClusterScore};
pub use config::AppConfig;
pub use detection::DetectionService;
pub use error::{DetectorError, Result};
pub use feature_extractor::FeatureExtractor;
pub use health::HealthStatus;
pub use models::{Classifier, ModelMetadata};
pub use types::{DetectionResult, FeatureVector, TransactionRecord, UnifiedDetectionRequest};
