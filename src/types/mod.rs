//! Type definitions for the agent detection core

pub mod record;
pub mod request;
pub mod result;

pub use record::TransactionRecord;
pub use request::{
    BehaviorEvent, BehavioralData, DeviceFingerprint, MouseMovement, UnifiedDetectionRequest,
};
pub use result::{ClusterAnomalyResult, DetectionResult, FeatureVector};
