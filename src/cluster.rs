//! Cluster-based transaction anomaly detection.
//!
//! Records are assigned to a behavioral cluster, scored against that
//! cluster's outlier model, and flagged only when the outlier prediction and
//! the cluster's own threshold both agree.

use crate::error::{DetectorError, Result};
use crate::types::{ClusterAnomalyResult, TransactionRecord};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

/// Raw output of a cluster's outlier model for one record.
#[derive(Debug, Clone, Copy)]
pub struct ClusterScore {
    /// Outlier prediction (1 = inlier, -1 = outlier)
    pub prediction: i32,
    /// Anomaly score for the record
    pub anomaly_score: f64,
    /// Decision threshold of the scored cluster
    pub threshold: f64,
}

/// Cluster assignment and per-cluster outlier scoring.
pub trait ClusterModel: Send + Sync {
    /// Assign the record to a cluster.
    fn assign(&self, record: &TransactionRecord) -> Result<i32>;

    /// Score the record against the given cluster's outlier model.
    fn score(&self, cluster_id: i32, record: &TransactionRecord) -> Result<ClusterScore>;

    /// Whether the model is loaded and able to score.
    fn is_available(&self) -> bool {
        true
    }
}

/// Placeholder used when no cluster model artifacts are configured.
pub struct DisabledClusterModel;

impl ClusterModel for DisabledClusterModel {
    fn assign(&self, _record: &TransactionRecord) -> Result<i32> {
        Err(DetectorError::ModelUnavailable(
            "cluster model is disabled via configuration".to_string(),
        ))
    }

    fn score(&self, _cluster_id: i32, _record: &TransactionRecord) -> Result<ClusterScore> {
        Err(DetectorError::ModelUnavailable(
            "cluster model is disabled via configuration".to_string(),
        ))
    }

    fn is_available(&self) -> bool {
        false
    }
}

/// Validates, assigns and scores transaction records.
pub struct ClusterDetectionService {
    model: Arc<dyn ClusterModel>,
}

impl ClusterDetectionService {
    pub fn new(model: Arc<dyn ClusterModel>) -> Self {
        Self { model }
    }

    /// Whether the underlying cluster model can produce scores.
    pub fn is_available(&self) -> bool {
        self.model.is_available()
    }

    /// Score one transaction record against its cluster baseline.
    pub fn detect(&self, record: &TransactionRecord) -> Result<ClusterAnomalyResult> {
        record.validate()?;

        let cluster_id = self.model.assign(record)?;
        let score = self.model.score(cluster_id, record)?;

        // Outlier prediction alone is not enough; the score must also clear
        // the assigned cluster's own threshold.
        let is_anomaly = score.prediction == -1 && score.anomaly_score > score.threshold;

        debug!(
            cluster_id,
            prediction = score.prediction,
            anomaly_score = score.anomaly_score,
            threshold = score.threshold,
            is_anomaly,
            "Scored transaction"
        );

        Ok(ClusterAnomalyResult {
            cluster_id,
            prediction: score.prediction,
            anomaly_score: score.anomaly_score,
            threshold: score.threshold,
            is_anomaly,
            request_id: Uuid::new_v4().to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Two-cluster stub: under-50s land in cluster 0 (threshold 0.9), the
    /// rest in cluster 1 (threshold 0.6). Scores are fixed per test.
    struct StubModel {
        prediction: i32,
        anomaly_score: f64,
    }

    impl ClusterModel for StubModel {
        fn assign(&self, record: &TransactionRecord) -> Result<i32> {
            Ok(if record.age < 50 { 0 } else { 1 })
        }

        fn score(&self, cluster_id: i32, _record: &TransactionRecord) -> Result<ClusterScore> {
            let threshold = if cluster_id == 0 { 0.9 } else { 0.6 };
            Ok(ClusterScore {
                prediction: self.prediction,
                anomaly_score: self.anomaly_score,
                threshold,
            })
        }
    }

    fn record_with_age(age: i64) -> TransactionRecord {
        TransactionRecord {
            age,
            gender: 1,
            region: 13,
            product_category: 4,
            quantity: 1,
            price: 2400,
            total_amount: 2400,
            purchase_hour: 14,
            limited_flag: 0,
            payment_method: 2,
            manufacturer: 5,
        }
    }

    #[test]
    fn test_threshold_is_per_cluster() {
        // 0.7 clears cluster 1's threshold (0.6) but not cluster 0's (0.9).
        let service = ClusterDetectionService::new(Arc::new(StubModel {
            prediction: -1,
            anomaly_score: 0.7,
        }));

        let young = service.detect(&record_with_age(30)).unwrap();
        assert_eq!(young.cluster_id, 0);
        assert_eq!(young.threshold, 0.9);
        assert!(!young.is_anomaly);

        let old = service.detect(&record_with_age(60)).unwrap();
        assert_eq!(old.cluster_id, 1);
        assert_eq!(old.threshold, 0.6);
        assert!(old.is_anomaly);
    }

    #[test]
    fn test_inlier_prediction_is_never_anomalous() {
        let service = ClusterDetectionService::new(Arc::new(StubModel {
            prediction: 1,
            anomaly_score: 0.99,
        }));

        let result = service.detect(&record_with_age(60)).unwrap();
        assert_eq!(result.prediction, 1);
        assert!(!result.is_anomaly);
    }

    #[test]
    fn test_score_at_threshold_is_not_anomalous() {
        let service = ClusterDetectionService::new(Arc::new(StubModel {
            prediction: -1,
            anomaly_score: 0.6,
        }));

        let result = service.detect(&record_with_age(60)).unwrap();
        assert_eq!(result.anomaly_score, result.threshold);
        assert!(!result.is_anomaly);
    }

    #[test]
    fn test_invalid_record_is_rejected_before_scoring() {
        let service = ClusterDetectionService::new(Arc::new(StubModel {
            prediction: -1,
            anomaly_score: 0.7,
        }));

        let err = service.detect(&record_with_age(130)).unwrap_err();
        assert!(matches!(err, DetectorError::Validation(_)));
    }

    #[test]
    fn test_disabled_model_is_an_error() {
        let service = ClusterDetectionService::new(Arc::new(DisabledClusterModel));

        assert!(!service.is_available());
        let err = service.detect(&record_with_age(40)).unwrap_err();
        assert!(matches!(err, DetectorError::ModelUnavailable(_)));
    }

    #[test]
    fn test_result_has_fresh_request_id() {
        let service = ClusterDetectionService::new(Arc::new(StubModel {
            prediction: 1,
            anomaly_score: 0.1,
        }));

        let first = service.detect(&record_with_age(40)).unwrap();
        let second = service.detect(&record_with_age(40)).unwrap();
        assert!(!first.request_id.is_empty());
        assert_ne!(first.request_id, second.request_id);
    }
}
