//! Append-only JSONL audit log of scored requests.
//!
//! Each scored request is written together with its result to a dated file,
//! giving retraining a labeled capture of live traffic. Auditing is best
//! effort: a failed write is logged and dropped, never surfaced to callers.

use crate::error::{DetectorError, Result};
use crate::types::{ClusterAnomalyResult, DetectionResult, TransactionRecord, UnifiedDetectionRequest};
use chrono::Utc;
use serde::Serialize;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing::warn;

/// Writes one JSON line per scored request into `<dir>/behavioral_YYYYMMDD.jsonl`.
pub struct AuditLogger {
    enabled: bool,
    dir: PathBuf,
    lock: Mutex<()>,
}

#[derive(Serialize)]
struct DetectionSample<'a> {
    timestamp: i64,
    session_id: &'a str,
    request: &'a UnifiedDetectionRequest,
    browser_result: &'a DetectionResult,
}

#[derive(Serialize)]
struct ClusterSample<'a> {
    timestamp: i64,
    request_id: &'a str,
    record: &'a TransactionRecord,
    cluster_result: &'a ClusterAnomalyResult,
}

impl AuditLogger {
    /// Logger that appends under the given directory, creating it on first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            enabled: true,
            dir: dir.into(),
            lock: Mutex::new(()),
        }
    }

    /// Logger that drops every sample.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            dir: PathBuf::new(),
            lock: Mutex::new(()),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Record one scored browser session.
    pub fn record_detection(&self, request: &UnifiedDetectionRequest, result: &DetectionResult) {
        if !self.enabled {
            return;
        }
        let sample = DetectionSample {
            timestamp: Utc::now().timestamp_millis(),
            session_id: &result.session_id,
            request,
            browser_result: result,
        };
        if let Err(error) = self.append(&sample) {
            warn!(error = %error, "Audit log write failed, dropping sample");
        }
    }

    /// Record one scored transaction.
    pub fn record_cluster(&self, record: &TransactionRecord, result: &ClusterAnomalyResult) {
        if !self.enabled {
            return;
        }
        let sample = ClusterSample {
            timestamp: Utc::now().timestamp_millis(),
            request_id: &result.request_id,
            record,
            cluster_result: result,
        };
        if let Err(error) = self.append(&sample) {
            warn!(error = %error, "Audit log write failed, dropping sample");
        }
    }

    fn append<T: Serialize>(&self, sample: &T) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        let path = self
            .dir
            .join(format!("behavioral_{}.jsonl", Utc::now().format("%Y%m%d")));

        let line = serde_json::to_string(sample).map_err(|e| {
            DetectorError::Audit(std::io::Error::new(std::io::ErrorKind::InvalidData, e))
        })?;

        // One lock around the whole append so concurrent samples never interleave.
        let _guard = self
            .lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let mut file = OpenOptions::new().create(true).append(true).open(&path)?;
        writeln!(file, "{}", line)?;
        Ok(())
    }
}
