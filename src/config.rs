//! Configuration management for the detection pipeline

use crate::detection::DEFAULT_BOT_SCORE_PIVOT;
use crate::feature_extractor::DEFAULT_STATIONARY_VELOCITY_THRESHOLD;
use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::Path;

/// Main application configuration
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub models: ModelsConfig,
    pub detection: DetectionConfig,
    pub pipeline: PipelineConfig,
    pub audit: AuditConfig,
    pub logging: LoggingConfig,
}

/// Model artifact configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ModelsConfig {
    /// Sidecar metadata JSON describing the browser model's feature schema
    pub metadata_path: String,
    /// Run without a browser classifier; predictions return an explicit error
    pub browser_model_disabled: bool,
}

/// Detection configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// Humanness score below which a session is ruled an agent
    pub bot_score_pivot: f64,
    /// Velocity magnitude at or below which a mouse sample is stationary
    pub stationary_velocity_threshold: f64,
}

/// Pipeline configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Number of concurrent workers
    pub workers: usize,
    /// Seconds between periodic metrics summaries
    pub report_interval_secs: u64,
}

/// Audit log configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AuditConfig {
    /// Capture scored requests for retraining
    pub enabled: bool,
    /// Directory for dated JSONL capture files
    pub dir: String,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Log format (json, pretty)
    pub format: String,
}

fn default_metadata_path() -> String {
    "models/browser/metadata.json".to_string()
}

fn default_audit_dir() -> String {
    "logs/training".to_string()
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            metadata_path: default_metadata_path(),
            browser_model_disabled: false,
        }
    }
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            bot_score_pivot: DEFAULT_BOT_SCORE_PIVOT,
            stationary_velocity_threshold: DEFAULT_STATIONARY_VELOCITY_THRESHOLD,
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            report_interval_secs: 30,
        }
    }
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            dir: default_audit_dir(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "json".to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default path.
    pub fn load() -> Result<Self> {
        Self::load_from_path("config/config.toml")
    }

    /// Load configuration from a specific path. The file is optional: every
    /// value has a default, and `AGENT_DETECTOR_*` environment variables
    /// (section and key joined by `__`) override both.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::from(path.as_ref()).required(false))
            .add_source(
                Environment::with_prefix("AGENT_DETECTOR")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::Builder;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.models.metadata_path, "models/browser/metadata.json");
        assert!(!config.models.browser_model_disabled);
        assert_eq!(config.detection.bot_score_pivot, 0.5);
        assert_eq!(config.detection.stationary_velocity_threshold, 0.05);
        assert_eq!(config.pipeline.workers, 4);
        assert!(!config.audit.enabled);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let config = AppConfig::load_from_path("does/not/exist.toml").unwrap();
        assert_eq!(config.detection.bot_score_pivot, 0.5);
        assert_eq!(config.pipeline.report_interval_secs, 30);
    }

    #[test]
    fn test_partial_file_overrides_only_named_keys() {
        let mut file = Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "[detection]\nbot_score_pivot = 0.35\n\n[audit]\nenabled = true\n"
        )
        .unwrap();

        let config = AppConfig::load_from_path(file.path()).unwrap();
        assert_eq!(config.detection.bot_score_pivot, 0.35);
        assert!(config.audit.enabled);
        // Untouched keys keep their defaults.
        assert_eq!(config.detection.stationary_velocity_threshold, 0.05);
        assert_eq!(config.audit.dir, "logs/training");
        assert_eq!(config.pipeline.workers, 4);
    }
}
