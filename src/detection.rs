//! Browser-behavior detection service: extraction, scoring and the verdict
//! policy applied on top of the classifier's humanness score.

use crate::audit::AuditLogger;
use crate::config::AppConfig;
use crate::error::{DetectorError, Result};
use crate::feature_extractor::FeatureExtractor;
use crate::models::{Classifier, DisabledClassifier, ModelMetadata};
use crate::types::{DetectionResult, FeatureVector, UnifiedDetectionRequest};
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;
use uuid::Uuid;

/// Humanness score below which a session is ruled an agent.
pub const DEFAULT_BOT_SCORE_PIVOT: f64 = 0.5;

/// Scores sessions and applies the verdict policy.
///
/// The classifier outputs P(human); the service turns that into a verdict
/// (`score < pivot` means agent, equality rules human) and a confidence
/// (distance from the 0.5 midpoint, scaled to [0, 1]).
pub struct DetectionService {
    metadata: Arc<ModelMetadata>,
    classifier: Arc<dyn Classifier>,
    extractor: FeatureExtractor,
    bot_score_pivot: f64,
    audit: Option<Arc<AuditLogger>>,
}

impl DetectionService {
    /// Create a service over the given schema and classifier.
    pub fn new(metadata: Arc<ModelMetadata>, classifier: Arc<dyn Classifier>) -> Self {
        let extractor = FeatureExtractor::new(metadata.clone());
        Self {
            metadata,
            classifier,
            extractor,
            bot_score_pivot: DEFAULT_BOT_SCORE_PIVOT,
            audit: None,
        }
    }

    /// Wire a service from application configuration. The disabled-model
    /// flag swaps in `DisabledClassifier`; the audit channel is attached
    /// only when enabled.
    pub fn from_config(
        config: &AppConfig,
        metadata: Arc<ModelMetadata>,
        classifier: Arc<dyn Classifier>,
    ) -> Self {
        let classifier: Arc<dyn Classifier> = if config.models.browser_model_disabled {
            Arc::new(DisabledClassifier::new())
        } else {
            classifier
        };
        let extractor = FeatureExtractor::new(metadata.clone())
            .with_stationary_threshold(config.detection.stationary_velocity_threshold);
        let mut service = Self::new(metadata, classifier)
            .with_pivot(config.detection.bot_score_pivot)
            .with_extractor(extractor);
        if config.audit.enabled {
            service = service.with_audit(Arc::new(AuditLogger::new(&config.audit.dir)));
        }
        service
    }

    /// Override the decision pivot.
    pub fn with_pivot(mut self, pivot: f64) -> Self {
        self.bot_score_pivot = pivot;
        self
    }

    /// Replace the default extractor, e.g. to tune its thresholds.
    pub fn with_extractor(mut self, extractor: FeatureExtractor) -> Self {
        self.extractor = extractor;
        self
    }

    /// Attach an audit logger that records each scored request.
    pub fn with_audit(mut self, audit: Arc<AuditLogger>) -> Self {
        self.audit = Some(audit);
        self
    }

    /// Whether the underlying classifier can produce scores.
    pub fn is_available(&self) -> bool {
        self.classifier.is_available()
    }

    /// Schema the service scores against.
    pub fn metadata(&self) -> &ModelMetadata {
        &self.metadata
    }

    /// Score one session and apply the verdict policy.
    pub fn predict(&self, request: &UnifiedDetectionRequest) -> Result<DetectionResult> {
        let started = Instant::now();

        let features = self.extractor.extract(request);
        let row = self.feature_row(&features)?;
        let score = self.classifier.predict_probability(&row)?;

        debug!(
            human_probability = score,
            model_format = %self.classifier.model_format(),
            latency_us = started.elapsed().as_micros() as u64,
            "Scored session"
        );

        let is_bot = score < self.bot_score_pivot;
        // Confidence is anchored at the score midpoint, not the decision pivot.
        let confidence = (score - 0.5).abs() * 2.0;

        let result = DetectionResult {
            session_id: fresh_or(request.session_id.as_deref()),
            score,
            is_bot,
            confidence,
            request_id: fresh_or(request.request_id.as_deref()),
            features_extracted: features,
            raw_prediction: score,
        };

        if let Some(audit) = &self.audit {
            audit.record_detection(request, &result);
        }

        Ok(result)
    }

    /// Assemble the model input row in declared schema order.
    fn feature_row(&self, features: &FeatureVector) -> Result<Vec<f64>> {
        self.metadata
            .feature_names()
            .iter()
            .map(|name| {
                features.get(name).copied().ok_or_else(|| {
                    DetectorError::Extraction(format!(
                        "feature '{}' missing from extracted map",
                        name
                    ))
                })
            })
            .collect()
    }
}

/// Echo a non-empty id, otherwise mint a fresh one.
fn fresh_or(id: Option<&str>) -> String {
    match id {
        Some(value) if !value.is_empty() => value.to_string(),
        _ => Uuid::new_v4().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::request::{BehavioralData, ClickPatterns, MouseMovement};
    use std::sync::Mutex;

    struct FixedClassifier(f64);

    impl Classifier for FixedClassifier {
        fn predict_probability(&self, _features: &[f64]) -> Result<f64> {
            Ok(self.0)
        }

        fn model_format(&self) -> &str {
            "fixed"
        }
    }

    struct CapturingClassifier {
        last_row: Mutex<Vec<f64>>,
    }

    impl Classifier for CapturingClassifier {
        fn predict_probability(&self, features: &[f64]) -> Result<f64> {
            *self.last_row.lock().unwrap() = features.to_vec();
            Ok(0.5)
        }

        fn model_format(&self) -> &str {
            "capturing"
        }
    }

    fn service_with_score(score: f64) -> DetectionService {
        DetectionService::new(
            Arc::new(ModelMetadata::default_schema()),
            Arc::new(FixedClassifier(score)),
        )
    }

    #[test]
    fn test_midpoint_score_rules_human() {
        let result = service_with_score(0.5)
            .predict(&UnifiedDetectionRequest::default())
            .unwrap();

        assert!(!result.is_bot);
        assert_eq!(result.confidence, 0.0);
        assert_eq!(result.score, 0.5);
        assert_eq!(result.raw_prediction, 0.5);
    }

    #[test]
    fn test_confidence_is_symmetric_around_midpoint() {
        let low = service_with_score(0.2)
            .predict(&UnifiedDetectionRequest::default())
            .unwrap();
        let high = service_with_score(0.8)
            .predict(&UnifiedDetectionRequest::default())
            .unwrap();

        assert!(low.is_bot);
        assert!(!high.is_bot);
        assert!((low.confidence - 0.6).abs() < 1e-12);
        assert!((high.confidence - 0.6).abs() < 1e-12);
    }

    #[test]
    fn test_custom_pivot_moves_verdict_not_confidence() {
        let result = service_with_score(0.4)
            .with_pivot(0.3)
            .predict(&UnifiedDetectionRequest::default())
            .unwrap();

        // 0.4 clears a 0.3 pivot, but confidence still measures from 0.5.
        assert!(!result.is_bot);
        assert!((result.confidence - 0.2).abs() < 1e-12);

        let result = service_with_score(0.4)
            .with_pivot(0.45)
            .predict(&UnifiedDetectionRequest::default())
            .unwrap();
        assert!(result.is_bot);
    }

    #[test]
    fn test_ids_echoed_when_present() {
        let request = UnifiedDetectionRequest {
            session_id: Some("sess_9".to_string()),
            request_id: Some("req_9".to_string()),
            ..Default::default()
        };
        let result = service_with_score(0.7).predict(&request).unwrap();

        assert_eq!(result.session_id, "sess_9");
        assert_eq!(result.request_id, "req_9");
    }

    #[test]
    fn test_ids_generated_when_absent_or_empty() {
        let result = service_with_score(0.7)
            .predict(&UnifiedDetectionRequest::default())
            .unwrap();
        assert!(!result.session_id.is_empty());
        assert!(!result.request_id.is_empty());

        let request = UnifiedDetectionRequest {
            session_id: Some(String::new()),
            ..Default::default()
        };
        let result = service_with_score(0.7).predict(&request).unwrap();
        assert!(!result.session_id.is_empty());
    }

    #[test]
    fn test_result_carries_complete_feature_map() {
        let result = service_with_score(0.9)
            .predict(&UnifiedDetectionRequest::default())
            .unwrap();

        assert_eq!(result.features_extracted.len(), 28);
        assert!(result.features_extracted.contains_key("mouse_movements_count"));
    }

    #[test]
    fn test_disabled_classifier_is_an_error() {
        let service = DetectionService::new(
            Arc::new(ModelMetadata::default_schema()),
            Arc::new(DisabledClassifier),
        );

        assert!(!service.is_available());
        let err = service
            .predict(&UnifiedDetectionRequest::default())
            .unwrap_err();
        assert!(matches!(err, DetectorError::ModelUnavailable(_)));
    }

    #[test]
    fn test_from_config_wires_pivot_and_disabled_flag() {
        let mut config = AppConfig::default();
        config.detection.bot_score_pivot = 0.3;

        let service = DetectionService::from_config(
            &config,
            Arc::new(ModelMetadata::default_schema()),
            Arc::new(FixedClassifier(0.4)),
        );
        // 0.4 clears the configured 0.3 pivot.
        let result = service.predict(&UnifiedDetectionRequest::default()).unwrap();
        assert!(!result.is_bot);

        config.models.browser_model_disabled = true;
        let service = DetectionService::from_config(
            &config,
            Arc::new(ModelMetadata::default_schema()),
            Arc::new(FixedClassifier(0.9)),
        );
        assert!(!service.is_available());
        let err = service
            .predict(&UnifiedDetectionRequest::default())
            .unwrap_err();
        assert!(matches!(err, DetectorError::ModelUnavailable(_)));
    }

    #[test]
    fn test_feature_row_follows_schema_order() {
        // Alphabetical map order would be the reverse of this schema order.
        let metadata = Arc::new(ModelMetadata::new(
            vec![
                "mouse_movements_count".to_string(),
                "click_avg_interval".to_string(),
            ],
            None,
            "lightgbm_booster",
        ));
        let classifier = Arc::new(CapturingClassifier {
            last_row: Mutex::new(Vec::new()),
        });
        let service = DetectionService::new(metadata, classifier.clone());

        let request = UnifiedDetectionRequest {
            behavioral_data: BehavioralData {
                mouse_movements: vec![
                    MouseMovement { x: 0.0, y: 0.0, timestamp: 0, velocity: None },
                    MouseMovement { x: 1.0, y: 1.0, timestamp: 10, velocity: None },
                    MouseMovement { x: 2.0, y: 2.0, timestamp: 20, velocity: None },
                ],
                click_patterns: ClickPatterns {
                    avg_click_interval: 0.9,
                    ..Default::default()
                },
                ..Default::default()
            },
            ..Default::default()
        };
        service.predict(&request).unwrap();

        let row = classifier.last_row.lock().unwrap().clone();
        assert_eq!(row, vec![3.0, 0.9]);
    }
}
