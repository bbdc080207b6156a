//! Classifier schema metadata: ordered feature names and one-hot categories

use serde::Deserialize;
use std::path::Path;
use tracing::{info, warn};

/// Feature schema used when no metadata file is present, matching the
/// training-pipeline defaults. Order is load-bearing.
pub const DEFAULT_FEATURE_NAMES: [&str; 28] = [
    "mouse_movements_count",
    "mouse_velocity_mean",
    "mouse_velocity_std",
    "mouse_velocity_max",
    "click_avg_interval",
    "click_precision",
    "click_double_rate",
    "keystroke_speed",
    "keystroke_hold",
    "keystroke_interval_var",
    "scroll_speed",
    "scroll_acc",
    "scroll_pause",
    "page_session_duration_ms",
    "page_dwell_time_ms",
    "page_first_interaction_delay_ms",
    "page_form_fill_speed",
    "page_paste_ratio",
    "seq_total_actions",
    "seq_count_mouse_move",
    "seq_count_click",
    "seq_count_keystroke",
    "seq_count_scroll",
    "seq_count_TIMED_SHORT",
    "seq_count_TIMED_LONG",
    "action_type_PAGE_BEFORE_UNLOAD",
    "action_type_PERIODIC_SNAPSHOT",
    "action_type_TIMED_SHORT",
];

const ACTION_TYPE_PREFIX: &str = "action_type_";

/// Feature schema of the trained browser-behavior classifier.
///
/// The scoring vector is assembled in exactly `feature_names` order.
/// Constructed once at startup and shared immutably across request tasks.
#[derive(Debug, Clone)]
pub struct ModelMetadata {
    feature_names: Vec<String>,
    action_type_categories: Vec<String>,
    model_format: String,
}

/// Sidecar JSON layout written by the training pipeline next to the model.
#[derive(Debug, Deserialize, Default)]
struct MetadataFile {
    #[serde(default)]
    feature_names: Vec<String>,
    #[serde(default)]
    action_type_categories: Vec<String>,
    #[serde(default)]
    model_format: String,
}

impl ModelMetadata {
    /// Build metadata from an explicit name list. One-hot categories default
    /// to the `action_type_`-prefixed schema names unless overridden.
    pub fn new(
        feature_names: Vec<String>,
        action_type_categories: Option<Vec<String>>,
        model_format: &str,
    ) -> Self {
        let action_type_categories =
            action_type_categories.unwrap_or_else(|| derive_categories(&feature_names));
        Self {
            feature_names,
            action_type_categories,
            model_format: model_format.to_string(),
        }
    }

    /// The hardcoded 28-feature schema from training.
    pub fn default_schema() -> Self {
        let names = DEFAULT_FEATURE_NAMES.iter().map(|s| s.to_string()).collect();
        Self::new(names, None, "lightgbm_booster")
    }

    /// Load the sidecar metadata JSON written beside the serialized model.
    ///
    /// A missing file falls back to the default schema; a corrupt file is
    /// logged and also falls back, so startup never hinges on the sidecar.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        if !path.exists() {
            info!(path = %path.display(), "No model metadata file, using default schema");
            return Self::default_schema();
        }

        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to read model metadata, using default schema");
                return Self::default_schema();
            }
        };

        let parsed: MetadataFile = match serde_json::from_str(&raw) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to parse model metadata, using default schema");
                return Self::default_schema();
            }
        };

        let feature_names = if parsed.feature_names.is_empty() {
            DEFAULT_FEATURE_NAMES.iter().map(|s| s.to_string()).collect()
        } else {
            parsed.feature_names
        };
        let categories = if parsed.action_type_categories.is_empty() {
            None
        } else {
            Some(parsed.action_type_categories)
        };
        let model_format = if parsed.model_format.is_empty() {
            "lightgbm_booster".to_string()
        } else {
            parsed.model_format
        };

        info!(
            path = %path.display(),
            features = feature_names.len(),
            format = %model_format,
            "Model metadata loaded"
        );

        Self::new(feature_names, categories, &model_format)
    }

    /// Ordered feature names the classifier expects.
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    /// Known action-type categories for one-hot encoding.
    pub fn action_type_categories(&self) -> &[String] {
        &self.action_type_categories
    }

    /// Format tag from training, used in logs.
    pub fn model_format(&self) -> &str {
        &self.model_format
    }

    /// Number of features in the schema.
    pub fn feature_count(&self) -> usize {
        self.feature_names.len()
    }
}

fn derive_categories(feature_names: &[String]) -> Vec<String> {
    feature_names
        .iter()
        .filter(|name| {
            name.starts_with(ACTION_TYPE_PREFIX) && name.len() > ACTION_TYPE_PREFIX.len()
        })
        .map(|name| name[ACTION_TYPE_PREFIX.len()..].to_string())
        .collect()
}
