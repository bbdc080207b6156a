//! Detection and anomaly result types

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Complete feature map for one session, keyed by schema feature name.
///
/// Ordered map so equal inputs serialize byte-identically.
pub type FeatureVector = BTreeMap<String, f64>;

/// Outcome of scoring one behavioral session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionResult {
    /// Session identifier, echoed from the request or freshly generated
    pub session_id: String,

    /// Humanness score in [0, 1] (0 = bot, 1 = human)
    pub score: f64,

    /// Verdict: true when the score falls below the decision pivot
    pub is_bot: bool,

    /// Distance from the score midpoint, scaled to [0, 1]
    pub confidence: f64,

    /// Request identifier, echoed or freshly generated
    pub request_id: String,

    /// Complete extracted feature map, for observability and retraining
    pub features_extracted: FeatureVector,

    /// Raw classifier output (equal to `score`)
    pub raw_prediction: f64,
}

/// Outcome of scoring one transaction record against its cluster baseline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterAnomalyResult {
    /// Assigned cluster
    pub cluster_id: i32,

    /// Outlier prediction (1 = inlier, -1 = outlier)
    pub prediction: i32,

    /// Model anomaly score for this record
    pub anomaly_score: f64,

    /// Decision threshold of the assigned cluster
    pub threshold: f64,

    /// True when the record is an outlier past its own cluster's threshold
    pub is_anomaly: bool,

    /// Freshly generated request identifier
    pub request_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detection_result_serialization() {
        let mut features = FeatureVector::new();
        features.insert("mouse_movements_count".to_string(), 42.0);
        features.insert("click_precision".to_string(), 0.82);

        let result = DetectionResult {
            session_id: "sess_1".to_string(),
            score: 0.91,
            is_bot: false,
            confidence: 0.82,
            request_id: "req_1".to_string(),
            features_extracted: features,
            raw_prediction: 0.91,
        };

        let json = serde_json::to_string(&result).unwrap();
        let back: DetectionResult = serde_json::from_str(&json).unwrap();

        assert_eq!(back.session_id, result.session_id);
        assert_eq!(back.score, result.score);
        assert_eq!(back.features_extracted.len(), 2);
    }

    #[test]
    fn test_feature_vector_serializes_in_key_order() {
        let mut features = FeatureVector::new();
        features.insert("zeta".to_string(), 1.0);
        features.insert("alpha".to_string(), 2.0);

        let json = serde_json::to_string(&features).unwrap();
        assert!(json.find("alpha").unwrap() < json.find("zeta").unwrap());
    }

    #[test]
    fn test_cluster_result_serialization() {
        let result = ClusterAnomalyResult {
            cluster_id: 3,
            prediction: -1,
            anomaly_score: 0.71,
            threshold: 0.65,
            is_anomaly: true,
            request_id: "req_2".to_string(),
        };

        let json = serde_json::to_string(&result).unwrap();
        let back: ClusterAnomalyResult = serde_json::from_str(&json).unwrap();
        assert_eq!(back.cluster_id, 3);
        assert_eq!(back.prediction, -1);
        assert!(back.is_anomaly);
    }
}
