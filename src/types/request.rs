//! Detection request types: behavioral telemetry for a single web session
//!
//! Field names match the wire format produced by the in-page behavior
//! tracker, which is also the format the training data was captured in.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Single raw event from the behavior tracker.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct BehaviorEvent {
    /// Action label, e.g. "mouse_move", "click", "TIMED_SHORT"
    pub action: String,
    /// Event timestamp in milliseconds
    pub timestamp: i64,
}

/// Sampled mouse position.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct MouseMovement {
    pub x: f64,
    pub y: f64,
    /// Sample timestamp in milliseconds
    pub timestamp: i64,
    /// Instantaneous velocity; absent when the tracker could not compute it
    pub velocity: Option<f64>,
}

/// Click aggregates pre-computed by the tracker.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ClickPatterns {
    pub avg_click_interval: f64,
    pub click_precision: f64,
    pub double_click_rate: f64,
}

/// Keystroke aggregates pre-computed by the tracker.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct KeystrokeDynamics {
    pub typing_speed_cpm: f64,
    pub key_hold_time_ms: f64,
    pub key_interval_variance: f64,
}

/// Scroll aggregates pre-computed by the tracker.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ScrollBehavior {
    pub scroll_speed: f64,
    pub scroll_acceleration: f64,
    pub pause_frequency: f64,
}

/// Page-level timing aggregates.
///
/// The optional fields are genuinely absent on sessions that never reach the
/// corresponding interaction; the extractor turns each into a default value
/// plus a "_missing" indicator feature.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct PageInteraction {
    pub session_duration_ms: f64,
    pub page_dwell_time_ms: f64,
    pub first_interaction_delay_ms: Option<f64>,
    pub form_fill_speed_cpm: Option<f64>,
    pub paste_ratio: Option<f64>,
}

/// Device and network fingerprint signals.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct DeviceFingerprint {
    pub user_agent: String,
    /// HTTP signature classification from the edge ("present", "missing", ...)
    pub http_signature_state: Option<String>,
    /// TLS JA4 fingerprint; "unknown" is a sentinel for an unclassified hello
    pub tls_ja4: Option<String>,
    /// Anti-fingerprinting signals reported by the client probe
    pub anti_fingerprint_signals: Vec<String>,
}

/// Grouped behavioral aggregates for one session.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct BehavioralData {
    pub mouse_movements: Vec<MouseMovement>,
    pub click_patterns: ClickPatterns,
    pub keystroke_dynamics: KeystrokeDynamics,
    pub scroll_behavior: ScrollBehavior,
    pub page_interaction: PageInteraction,
}

/// Unified detection request: everything the extractor consumes for one
/// session. Validation of the outer request shape happens upstream; the
/// core only assumes the types here.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct UnifiedDetectionRequest {
    pub session_id: Option<String>,
    pub request_id: Option<String>,
    pub behavioral_data: BehavioralData,
    /// Raw ordered event sequence; optional and frequently absent
    pub behavior_sequence: Option<Vec<BehaviorEvent>>,
    pub device_fingerprint: DeviceFingerprint,
    /// Free-form context map; the extractor consumes the "action_type" key
    pub context: Option<HashMap<String, serde_json::Value>>,
    /// Opaque persona-pipeline features, passed through untouched
    pub persona_features: Option<serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_deserializes_from_partial_json() {
        // Sessions without a raw sequence or fingerprint details are common.
        let json = r#"{
            "session_id": "sess_42",
            "behavioral_data": {
                "mouse_movements": [
                    {"x": 10.0, "y": 20.0, "timestamp": 1000, "velocity": 1.5},
                    {"x": 12.0, "y": 25.0, "timestamp": 1050}
                ],
                "page_interaction": {"session_duration_ms": 5000.0}
            },
            "device_fingerprint": {"user_agent": "Mozilla/5.0"}
        }"#;

        let request: UnifiedDetectionRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.session_id.as_deref(), Some("sess_42"));
        assert_eq!(request.behavioral_data.mouse_movements.len(), 2);
        assert_eq!(request.behavioral_data.mouse_movements[0].velocity, Some(1.5));
        assert_eq!(request.behavioral_data.mouse_movements[1].velocity, None);
        assert_eq!(
            request.behavioral_data.page_interaction.session_duration_ms,
            5000.0
        );
        assert!(request.behavior_sequence.is_none());
        assert_eq!(request.behavioral_data.click_patterns.click_precision, 0.0);
    }

    #[test]
    fn test_request_roundtrip() {
        let request = UnifiedDetectionRequest {
            session_id: Some("sess_1".to_string()),
            behavior_sequence: Some(vec![BehaviorEvent {
                action: "click".to_string(),
                timestamp: 123,
            }]),
            ..Default::default()
        };

        let json = serde_json::to_string(&request).unwrap();
        let back: UnifiedDetectionRequest = serde_json::from_str(&json).unwrap();
        assert_eq!(back.session_id, request.session_id);
        assert_eq!(back.behavior_sequence.unwrap().len(), 1);
    }

    #[test]
    fn test_empty_object_deserializes() {
        let request: UnifiedDetectionRequest = serde_json::from_str("{}").unwrap();
        assert!(request.session_id.is_none());
        assert!(request.behavioral_data.mouse_movements.is_empty());
        assert!(request.device_fingerprint.anti_fingerprint_signals.is_empty());
    }
}
