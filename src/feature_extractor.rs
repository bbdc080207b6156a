//! Feature extraction for browser-behavior agent detection.
//!
//! Transforms the telemetry of one web session into the numeric features the
//! trained classifier expects. The computation mirrors the training pipeline
//! exactly: same formulas, same defaults for absent data, same feature names.

use crate::models::ModelMetadata;
use crate::types::request::{BehaviorEvent, BehavioralData, DeviceFingerprint, MouseMovement, UnifiedDetectionRequest};
use crate::types::FeatureVector;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

/// Velocity magnitude at or below which a mouse sample counts as stationary.
pub const DEFAULT_STATIONARY_VELOCITY_THRESHOLD: f64 = 0.05;

/// Action labels counted individually, exactly as labeled in training data.
const SEQUENCE_COUNT_WHITELIST: [&str; 6] = [
    "mouse_move",
    "click",
    "keystroke",
    "scroll",
    "TIMED_SHORT",
    "TIMED_LONG",
];

/// Anti-fingerprinting signals that mark a session suspicious on their own.
const SUSPICIOUS_SIGNALS: [&str; 8] = [
    "navigator_webdriver_true",
    "headless_user_agent",
    "plugins_empty",
    "mobile_ua_no_touch",
    "languages_mismatch",
    "chrome_runtime_missing",
    "canvas_error",
    "webgl_error",
];

/// Descriptive feature names and their legacy schema twins.
///
/// An older feature schema, still used by deployed models, names several
/// features differently. Both sides of each pair always carry the same value;
/// the whole compatibility contract lives in this table.
const FEATURE_ALIASES: [(&str, &str); 15] = [
    ("velocity_mean", "mouse_velocity_mean"),
    ("velocity_max", "mouse_velocity_max"),
    ("velocity_std", "mouse_velocity_std"),
    ("click_avg_click_interval", "click_avg_interval"),
    ("click_click_precision", "click_precision"),
    ("click_double_click_rate", "click_double_rate"),
    ("keystroke_typing_speed_cpm", "keystroke_speed"),
    ("keystroke_key_hold_time_ms", "keystroke_hold"),
    ("keystroke_key_interval_variance", "keystroke_interval_var"),
    ("scroll_acceleration", "scroll_acc"),
    ("pause_frequency", "scroll_pause"),
    ("page_page_dwell_time_ms", "page_dwell_time_ms"),
    ("page_form_fill_speed_cpm", "page_form_fill_speed"),
    ("page_first_interaction_delay_ms", "first_interaction_delay_ms"),
    ("page_first_interaction_missing", "first_interaction_delay_missing"),
];

/// Stateless extractor that turns a detection request into a feature map.
///
/// The produced map's key set equals exactly the declared schema: every
/// schema name is present (0.0 when its source data is absent), and nothing
/// else is. Equal inputs produce byte-identical maps.
pub struct FeatureExtractor {
    metadata: Arc<ModelMetadata>,
    stationary_velocity_threshold: f64,
}

impl FeatureExtractor {
    /// Create an extractor for the given classifier schema.
    pub fn new(metadata: Arc<ModelMetadata>) -> Self {
        Self {
            metadata,
            stationary_velocity_threshold: DEFAULT_STATIONARY_VELOCITY_THRESHOLD,
        }
    }

    /// Override the stationary-velocity threshold.
    pub fn with_stationary_threshold(mut self, threshold: f64) -> Self {
        self.stationary_velocity_threshold = threshold;
        self
    }

    /// Schema this extractor produces.
    pub fn metadata(&self) -> &ModelMetadata {
        &self.metadata
    }

    /// Number of features produced.
    pub fn feature_count(&self) -> usize {
        self.metadata.feature_count()
    }

    /// Extract the feature map for one session.
    pub fn extract(&self, request: &UnifiedDetectionRequest) -> FeatureVector {
        let mut features = self.initialize_features();

        let sequence: &[BehaviorEvent] = request.behavior_sequence.as_deref().unwrap_or(&[]);
        let data = &request.behavioral_data;

        debug!(
            sequence_events = sequence.len(),
            persona_provided = request.persona_features.is_some(),
            "Extracting features"
        );

        self.fill_temporal(&mut features, sequence, data.page_interaction.session_duration_ms);
        self.fill_counts_and_velocity(&mut features, sequence, data);
        self.fill_mouse_statistics(&mut features, &data.mouse_movements);
        self.fill_sequence_statistics(&mut features, sequence);
        self.fill_aggregated_metrics(&mut features, request);
        self.fill_optional_flags(&mut features, data);
        self.fill_action_type(&mut features, request);
        self.fill_rates(&mut features, data);
        self.apply_aliases(&mut features);

        self.project_onto_schema(features)
    }

    /// Seed every declared feature name, plus one slot per known action-type
    /// category, to 0.0.
    fn initialize_features(&self) -> FeatureVector {
        let mut features = BTreeMap::new();
        for name in self.metadata.feature_names() {
            features.insert(name.clone(), 0.0);
        }
        for category in self.metadata.action_type_categories() {
            features.entry(format!("action_type_{}", category)).or_insert(0.0);
        }
        features
    }

    fn fill_temporal(
        &self,
        features: &mut FeatureVector,
        sequence: &[BehaviorEvent],
        session_duration_ms: f64,
    ) {
        if !sequence.is_empty() {
            let timestamps: Vec<i64> = sequence.iter().map(|event| event.timestamp).collect();
            let max_ts = timestamps.iter().copied().max().unwrap_or(0);
            let min_ts = timestamps.iter().copied().min().unwrap_or(0);
            set(features, "total_duration_ms", (max_ts - min_ts) as f64);

            // Drop deltas where the later event precedes the earlier one:
            // out-of-order telemetry must not produce negative gaps.
            let time_diffs: Vec<f64> = timestamps
                .windows(2)
                .filter(|pair| pair[1] >= pair[0])
                .map(|pair| (pair[1] - pair[0]) as f64)
                .collect();

            if !time_diffs.is_empty() {
                let diff_mean = mean(&time_diffs);
                let diff_std = population_std(&time_diffs);
                set(features, "avg_time_between_actions", diff_mean);
                set(features, "time_between_actions_std", diff_std);
                set(
                    features,
                    "time_between_actions_max",
                    time_diffs.iter().copied().fold(f64::NEG_INFINITY, f64::max),
                );
                set(
                    features,
                    "time_between_actions_min",
                    time_diffs.iter().copied().fold(f64::INFINITY, f64::min),
                );
                let cv = if diff_mean != 0.0 { diff_std / diff_mean } else { 0.0 };
                set(features, "time_between_actions_cv", cv);
            }
        } else {
            set(features, "total_duration_ms", session_duration_ms);
            set(features, "time_between_actions_std", 0.0);
            set(features, "time_between_actions_max", 0.0);
            set(features, "time_between_actions_min", 0.0);
            set(features, "time_between_actions_cv", 0.0);
        }
    }

    fn fill_counts_and_velocity(
        &self,
        features: &mut FeatureVector,
        sequence: &[BehaviorEvent],
        data: &BehavioralData,
    ) {
        let movements = &data.mouse_movements;
        set(features, "mouse_movements_count", movements.len() as f64);

        let mut mouse_move = 0u64;
        let mut click = 0u64;
        let mut keystroke = 0u64;
        let mut scroll = 0u64;
        let mut idle = 0u64;

        for event in sequence {
            if event.action.is_empty() {
                continue;
            }
            // First substring match wins; ambiguous labels resolve deterministically.
            let action = event.action.to_lowercase();
            if action.contains("mouse") {
                mouse_move += 1;
            } else if action.contains("click") {
                click += 1;
            } else if action.contains("key") {
                keystroke += 1;
            } else if action.contains("scroll") {
                scroll += 1;
            } else if action.contains("idle") {
                idle += 1;
            }
        }

        // Agents sometimes omit move events from the sequence while still
        // reporting raw samples; mouse engagement must not be undercounted.
        if mouse_move == 0 && !movements.is_empty() {
            mouse_move = movements.len() as u64;
        }

        set(features, "action_count_mouse_move", mouse_move as f64);
        set(features, "action_count_click", click as f64);
        set(features, "action_count_keystroke", keystroke as f64);
        set(features, "action_count_scroll", scroll as f64);
        set(features, "action_count_idle", idle as f64);

        let velocities: Vec<f64> = movements.iter().filter_map(|m| m.velocity).collect();
        let (vel_mean, vel_max, vel_std) = if velocities.is_empty() {
            (0.0, 0.0, 0.0)
        } else {
            (
                mean(&velocities),
                velocities.iter().copied().fold(f64::NEG_INFINITY, f64::max),
                population_std(&velocities),
            )
        };

        set(features, "velocity_mean", vel_mean);
        set(features, "velocity_max", vel_max);
        set(features, "velocity_std", vel_std);
    }

    fn fill_mouse_statistics(&self, features: &mut FeatureVector, movements: &[MouseMovement]) {
        let count = movements.len();
        set(features, "mouse_event_count", count as f64);
        set(features, "mouse_activity_flag", flag(count > 0));
        features
            .entry("mouse_movements_count".to_string())
            .or_insert(count as f64);

        if count >= 2 {
            let mut path_length = 0.0;
            for pair in movements.windows(2) {
                path_length += (pair[1].x - pair[0].x).hypot(pair[1].y - pair[0].y);
            }
            set(features, "mouse_path_length", path_length);
            set(
                features,
                "mouse_duration_ms",
                (movements[count - 1].timestamp - movements[0].timestamp) as f64,
            );
        } else {
            set(features, "mouse_path_length", 0.0);
            set(features, "mouse_duration_ms", 0.0);
        }

        let velocities: Vec<f64> = movements.iter().filter_map(|m| m.velocity).collect();
        if velocities.is_empty() {
            set(features, "mouse_velocity_median", 0.0);
            set(features, "mouse_stationary_ratio", 0.0);
        } else {
            set(features, "mouse_velocity_median", median(&velocities));
            let stationary = velocities
                .iter()
                .filter(|v| v.abs() <= self.stationary_velocity_threshold)
                .count();
            set(
                features,
                "mouse_stationary_ratio",
                stationary as f64 / velocities.len() as f64,
            );
        }
    }

    fn fill_sequence_statistics(&self, features: &mut FeatureVector, sequence: &[BehaviorEvent]) {
        let count = sequence.len();
        set(features, "sequence_event_count", count as f64);

        // Ordered map so the entropy summation below is deterministic.
        let mut action_counter: BTreeMap<&str, u64> = BTreeMap::new();
        for event in sequence {
            if !event.action.is_empty() {
                *action_counter.entry(event.action.as_str()).or_insert(0) += 1;
            }
        }
        let total_actions: u64 = action_counter.values().sum();
        set(features, "seq_total_actions", total_actions as f64);
        for name in SEQUENCE_COUNT_WHITELIST {
            set(
                features,
                &format!("seq_count_{}", name),
                action_counter.get(name).copied().unwrap_or(0) as f64,
            );
        }

        if count > 0 {
            set(features, "sequence_unique_actions", action_counter.len() as f64);
            if total_actions > 0 {
                let total = total_actions as f64;
                let mut entropy = 0.0;
                for &value in action_counter.values() {
                    let p = value as f64 / total;
                    entropy -= p * p.ln();
                }
                set(features, "action_entropy", entropy);
            }
            let timed = sequence
                .iter()
                .filter(|event| {
                    !event.action.is_empty() && event.action.to_lowercase().contains("timed")
                })
                .count();
            set(features, "timed_action_ratio", timed as f64 / count as f64);
        } else {
            set(features, "sequence_unique_actions", 0.0);
            set(features, "action_entropy", 0.0);
            set(features, "timed_action_ratio", 0.0);
        }

        // A toggle is a visibility event that differs from the previous
        // visibility state; the first visibility event never counts.
        let mut toggles = 0u64;
        let mut previous: Option<String> = None;
        for event in sequence {
            let action = event.action.to_lowercase();
            if action == "visible" || action == "hidden" {
                if let Some(prev) = &previous {
                    if *prev != action {
                        toggles += 1;
                    }
                }
                previous = Some(action);
            }
        }
        set(features, "visibility_toggle_count", toggles as f64);
    }

    fn fill_aggregated_metrics(
        &self,
        features: &mut FeatureVector,
        request: &UnifiedDetectionRequest,
    ) {
        let data = &request.behavioral_data;
        let click = &data.click_patterns;
        let keystroke = &data.keystroke_dynamics;
        let scroll = &data.scroll_behavior;
        let page = &data.page_interaction;

        set(features, "click_avg_click_interval", click.avg_click_interval);
        set(features, "click_click_precision", click.click_precision);
        set(features, "click_double_click_rate", click.double_click_rate);

        set(features, "keystroke_typing_speed_cpm", keystroke.typing_speed_cpm);
        set(features, "keystroke_key_hold_time_ms", keystroke.key_hold_time_ms);
        set(features, "keystroke_key_interval_variance", keystroke.key_interval_variance);

        set(features, "scroll_speed", scroll.scroll_speed);
        set(features, "scroll_acceleration", scroll.scroll_acceleration);
        set(features, "pause_frequency", scroll.pause_frequency);

        set(features, "page_session_duration_ms", page.session_duration_ms);
        set(features, "page_page_dwell_time_ms", page.page_dwell_time_ms);
        set(
            features,
            "page_first_interaction_delay_ms",
            page.first_interaction_delay_ms.unwrap_or(0.0),
        );
        set(
            features,
            "page_form_fill_speed_cpm",
            page.form_fill_speed_cpm.unwrap_or(0.0),
        );
        set(features, "page_paste_ratio", page.paste_ratio.unwrap_or(0.0));

        let user_agent = request.device_fingerprint.user_agent.to_lowercase();
        set(features, "is_mobile", flag(user_agent.contains("mobile")));

        set(features, "scroll_activity_flag", flag(scroll.scroll_speed > 0.0));
        set(features, "click_activity_flag", flag(click.click_precision > 0.0));

        self.fill_device_fingerprint(features, &request.device_fingerprint);
    }

    fn fill_device_fingerprint(
        &self,
        features: &mut FeatureVector,
        fingerprint: &DeviceFingerprint,
    ) {
        // Empty and absent both mean the edge never classified the signature.
        let http_state = match fingerprint.http_signature_state.as_deref() {
            Some(state) if !state.is_empty() => state.to_lowercase(),
            _ => "missing".to_string(),
        };
        set(
            features,
            "fingerprint_http_signature_missing",
            flag(http_state == "missing" || http_state == "unknown"),
        );

        // The TLS sentinel is matched case-sensitively, as written by the edge.
        let tls_missing = match fingerprint.tls_ja4.as_deref() {
            Some(tls) if !tls.is_empty() => tls == "unknown",
            _ => true,
        };
        set(features, "fingerprint_tls_ja4_missing", flag(tls_missing));

        let signals = &fingerprint.anti_fingerprint_signals;
        set(features, "fingerprint_anti_fp_count", signals.len() as f64);
        let suspicious = signals
            .iter()
            .any(|signal| SUSPICIOUS_SIGNALS.contains(&signal.as_str()));
        set(features, "fingerprint_anti_fp_suspicious", flag(suspicious));
    }

    fn fill_optional_flags(&self, features: &mut FeatureVector, data: &BehavioralData) {
        let page = &data.page_interaction;
        set(
            features,
            "page_first_interaction_missing",
            flag(page.first_interaction_delay_ms.is_none()),
        );
        set(
            features,
            "page_form_fill_missing",
            flag(page.form_fill_speed_cpm.is_none()),
        );
        set(
            features,
            "page_paste_ratio_missing",
            flag(page.paste_ratio.is_none()),
        );
    }

    fn fill_action_type(&self, features: &mut FeatureVector, request: &UnifiedDetectionRequest) {
        let action_type = request
            .context
            .as_ref()
            .and_then(|ctx| ctx.get("action_type"))
            .and_then(|value| value.as_str())
            .filter(|value| !value.is_empty())
            .unwrap_or("UNKNOWN");

        // One-hot slots mirror training-time category enumeration; an unseen
        // value selects nothing and is never added as a new feature.
        for category in self.metadata.action_type_categories() {
            set(
                features,
                &format!("action_type_{}", category),
                flag(action_type == category.as_str()),
            );
        }
    }

    fn fill_rates(&self, features: &mut FeatureVector, data: &BehavioralData) {
        let session_duration_ms = data.page_interaction.session_duration_ms;
        let duration_seconds = if session_duration_ms > 0.0 {
            session_duration_ms / 1000.0
        } else {
            0.0
        };
        let per_second = |value: f64| {
            if duration_seconds > 0.0 {
                value / duration_seconds
            } else {
                0.0
            }
        };

        let mouse_event_count = get(features, "mouse_event_count");
        let click_count = get(features, "action_count_click");
        let keystroke_count = get(features, "action_count_keystroke");
        let scroll_count = get(features, "action_count_scroll");
        let idle_count = get(features, "action_count_idle");
        let mouse_actions = get(features, "action_count_mouse_move");
        let path_length = get(features, "mouse_path_length");
        let mouse_duration_ms = get(features, "mouse_duration_ms");

        set(features, "mouse_event_rate", per_second(mouse_event_count));
        set(features, "click_rate", per_second(click_count));
        set(features, "keystroke_rate", per_second(keystroke_count));
        set(features, "scroll_rate", per_second(scroll_count));
        set(features, "idle_rate", per_second(idle_count));

        set(features, "click_to_mouse_ratio", safe_ratio(click_count, mouse_actions));
        set(features, "scroll_to_mouse_ratio", safe_ratio(scroll_count, mouse_actions));
        set(
            features,
            "keystroke_to_mouse_ratio",
            safe_ratio(keystroke_count, mouse_actions),
        );

        // Path speed stays per-millisecond, as in the training features.
        let mouse_avg_speed = if mouse_duration_ms > 0.0 {
            path_length / mouse_duration_ms
        } else {
            0.0
        };
        set(features, "mouse_avg_speed", mouse_avg_speed);
        set(features, "mouse_path_rate", per_second(path_length));
    }

    /// Copy each aliased value to its twin name.
    fn apply_aliases(&self, features: &mut FeatureVector) {
        for (source, alias) in FEATURE_ALIASES {
            if let Some(value) = features.get(source).copied() {
                features.insert(alias.to_string(), value);
            }
        }
    }

    /// Keep exactly the declared schema names, in case the computation above
    /// produced working values the schema does not declare.
    fn project_onto_schema(&self, computed: FeatureVector) -> FeatureVector {
        let mut projected = BTreeMap::new();
        for name in self.metadata.feature_names() {
            projected.insert(name.clone(), computed.get(name).copied().unwrap_or(0.0));
        }
        projected
    }
}

impl Default for FeatureExtractor {
    fn default() -> Self {
        Self::new(Arc::new(ModelMetadata::default_schema()))
    }
}

fn set(features: &mut FeatureVector, name: &str, value: f64) {
    features.insert(name.to_string(), value);
}

fn get(features: &FeatureVector, name: &str) -> f64 {
    features.get(name).copied().unwrap_or(0.0)
}

fn flag(condition: bool) -> f64 {
    if condition {
        1.0
    } else {
        0.0
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation (divisor = N), matching training-time numpy.
fn population_std(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values);
    let variance = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

/// Median with even-count interpolation, matching training-time numpy.
fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

fn safe_ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator != 0.0 {
        numerator / denominator
    } else {
        0.0
    }
}
