//! Service health reporting.

use crate::cluster::ClusterDetectionService;
use crate::detection::DetectionService;
use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Overall service state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceStatus {
    Healthy,
    Degraded,
}

/// Point-in-time health snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: ServiceStatus,
    pub browser_model_loaded: bool,
    pub cluster_model_loaded: bool,
    /// Snapshot time in epoch milliseconds
    pub timestamp: i64,
}

impl HealthStatus {
    /// Healthy only when both models can score.
    pub fn from_availability(browser_loaded: bool, cluster_loaded: bool) -> Self {
        let status = if browser_loaded && cluster_loaded {
            ServiceStatus::Healthy
        } else {
            ServiceStatus::Degraded
        };
        Self {
            status,
            browser_model_loaded: browser_loaded,
            cluster_model_loaded: cluster_loaded,
            timestamp: Utc::now().timestamp_millis(),
        }
    }

    /// Snapshot the two scoring services.
    pub fn check(detection: &DetectionService, cluster: &ClusterDetectionService) -> Self {
        Self::from_availability(detection.is_available(), cluster.is_available())
    }
}
