//! Agent Detection Pipeline - Feature Replay Runner
//!
//! Reads captured detection requests as JSON lines (from a file argument or
//! stdin), runs feature extraction in parallel, and writes one feature map
//! per line. Used to rebuild feature matrices for retraining and to debug
//! schema changes against recorded traffic.

use agent_detector::{
    config::AppConfig,
    feature_extractor::FeatureExtractor,
    metrics::{MetricsReporter, PipelineMetrics},
    models::ModelMetadata,
    types::{FeatureVector, UnifiedDetectionRequest},
};
use anyhow::Result;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::sync::Semaphore;
use tracing::{info, warn};
use uuid::Uuid;

/// One output line: the session and its complete feature map.
#[derive(Serialize)]
struct FeatureLine {
    session_id: String,
    features: FeatureVector,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config = AppConfig::load()?;

    // Initialize logging; feature lines go to stdout, logs to stderr
    init_logging(&config);

    info!("Starting Agent Detection Feature Replay");

    // Load the feature schema sidecar
    let metadata = Arc::new(ModelMetadata::load_from_path(&config.models.metadata_path));
    info!(
        features = metadata.feature_count(),
        model_format = %metadata.model_format(),
        "Feature schema loaded"
    );

    let extractor = Arc::new(
        FeatureExtractor::new(metadata.clone())
            .with_stationary_threshold(config.detection.stationary_velocity_threshold),
    );

    // Initialize metrics
    let metrics = Arc::new(PipelineMetrics::new());

    // Start metrics reporter
    let metrics_clone = metrics.clone();
    let report_interval = config.pipeline.report_interval_secs;
    tokio::spawn(async move {
        let reporter = MetricsReporter::new(metrics_clone, report_interval);
        reporter.start().await;
    });

    // Input: file argument, or stdin when absent
    let input = std::env::args().nth(1);
    let reader: Box<dyn AsyncBufRead + Unpin> = match &input {
        Some(path) => {
            info!(path = %path, "Replaying captured requests from file");
            Box::new(BufReader::new(tokio::fs::File::open(path).await?))
        }
        None => {
            info!("Replaying captured requests from stdin");
            Box::new(BufReader::new(tokio::io::stdin()))
        }
    };

    let num_workers = config.pipeline.workers;
    info!(workers = num_workers, "Starting replay loop");

    // Semaphore to limit concurrent processing
    let semaphore = Arc::new(Semaphore::new(num_workers));
    let processed_count = Arc::new(AtomicU64::new(0));
    let mut handles = Vec::new();

    let mut lines = reader.lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }

        // Acquire permit (limits concurrent tasks)
        let permit = semaphore.clone().acquire_owned().await?;

        // Clone shared resources for the spawned task
        let extractor = extractor.clone();
        let metrics = metrics.clone();
        let processed_count = processed_count.clone();

        handles.push(tokio::spawn(async move {
            let start_time = Instant::now();

            match serde_json::from_str::<UnifiedDetectionRequest>(&line) {
                Ok(request) => {
                    let features = extractor.extract(&request);
                    let session_id = request
                        .session_id
                        .clone()
                        .filter(|id| !id.is_empty())
                        .unwrap_or_else(|| Uuid::new_v4().to_string());

                    let output = FeatureLine {
                        session_id,
                        features,
                    };
                    match serde_json::to_string(&output) {
                        Ok(json) => println!("{}", json),
                        Err(e) => warn!(error = %e, "Failed to serialize feature line"),
                    }

                    metrics.record_session(start_time.elapsed());

                    let count = processed_count.fetch_add(1, Ordering::Relaxed) + 1;

                    // Log progress every 100 sessions
                    if count % 100 == 0 {
                        let throughput = metrics.get_throughput();
                        let processing_stats = metrics.get_processing_stats();
                        info!(
                            processed = count,
                            throughput = format!("{:.1} /s", throughput),
                            avg_latency_us = processing_stats.mean_us,
                            "Replay milestone"
                        );
                    }
                }
                Err(e) => {
                    warn!(error = %e, "Failed to deserialize request");
                    metrics.record_fault("validation");
                }
            }

            // Release permit when done
            drop(permit);
        }));
    }

    // Drain in-flight tasks before the final summary
    for handle in handles {
        let _ = handle.await;
    }

    info!("Replay complete");
    metrics.print_summary();

    Ok(())
}

fn init_logging(config: &AppConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.level));

    if config.logging.format == "json" {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }
}
