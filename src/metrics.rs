//! Performance metrics and statistics tracking for the detection pipeline.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;
use std::time::{Duration, Instant};
use tracing::info;

/// Metrics collector for pipeline performance
pub struct PipelineMetrics {
    /// Total sessions processed
    pub sessions_processed: AtomicU64,
    /// Total agent verdicts returned
    pub agent_verdicts: AtomicU64,
    /// Total transaction records checked against cluster baselines
    pub cluster_checks: AtomicU64,
    /// Total records flagged anomalous
    pub anomalies_flagged: AtomicU64,
    /// Faults by error kind
    faults_by_kind: RwLock<HashMap<String, u64>>,
    /// Processing times (in microseconds)
    processing_times: RwLock<Vec<u64>>,
    /// Humanness score distribution buckets
    score_buckets: RwLock<[u64; 10]>,
    /// Start time for rate calculation
    start_time: Instant,
}

impl PipelineMetrics {
    /// Create a new metrics collector
    pub fn new() -> Self {
        Self {
            sessions_processed: AtomicU64::new(0),
            agent_verdicts: AtomicU64::new(0),
            cluster_checks: AtomicU64::new(0),
            anomalies_flagged: AtomicU64::new(0),
            faults_by_kind: RwLock::new(HashMap::new()),
            processing_times: RwLock::new(Vec::with_capacity(1000)),
            score_buckets: RwLock::new([0; 10]),
            start_time: Instant::now(),
        }
    }

    /// Record a processed session
    pub fn record_session(&self, processing_time: Duration) {
        self.sessions_processed.fetch_add(1, Ordering::Relaxed);

        if let Ok(mut times) = self.processing_times.write() {
            times.push(processing_time.as_micros() as u64);
            // Keep only last 10000 for memory efficiency
            if times.len() > 10000 {
                times.drain(0..5000);
            }
        }
    }

    /// Record a verdict and its humanness score
    pub fn record_verdict(&self, score: f64, is_bot: bool) {
        if is_bot {
            self.agent_verdicts.fetch_add(1, Ordering::Relaxed);
        }

        let bucket = (score * 10.0).min(9.0) as usize;
        if let Ok(mut buckets) = self.score_buckets.write() {
            buckets[bucket] += 1;
        }
    }

    /// Record a cluster anomaly check
    pub fn record_cluster_check(&self, is_anomaly: bool) {
        self.cluster_checks.fetch_add(1, Ordering::Relaxed);
        if is_anomaly {
            self.anomalies_flagged.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Record a fault by error kind
    pub fn record_fault(&self, kind: &str) {
        if let Ok(mut by_kind) = self.faults_by_kind.write() {
            *by_kind.entry(kind.to_string()).or_insert(0) += 1;
        }
    }

    /// Get processing time statistics
    pub fn get_processing_stats(&self) -> ProcessingStats {
        let times = self.processing_times.read().unwrap();
        if times.is_empty() {
            return ProcessingStats::default();
        }

        let mut sorted: Vec<u64> = times.clone();
        sorted.sort();

        let sum: u64 = sorted.iter().sum();
        let count = sorted.len();

        ProcessingStats {
            count: count as u64,
            mean_us: sum / count as u64,
            p50_us: sorted[count / 2],
            p95_us: sorted[(count as f64 * 0.95) as usize],
            p99_us: sorted[(count as f64 * 0.99) as usize],
            max_us: *sorted.last().unwrap_or(&0),
        }
    }

    /// Get current throughput (sessions per second)
    pub fn get_throughput(&self) -> f64 {
        let elapsed = self.start_time.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            self.sessions_processed.load(Ordering::Relaxed) as f64 / elapsed
        } else {
            0.0
        }
    }

    /// Get score distribution
    pub fn get_score_distribution(&self) -> [u64; 10] {
        *self.score_buckets.read().unwrap()
    }

    /// Get faults by error kind
    pub fn get_faults_by_kind(&self) -> HashMap<String, u64> {
        self.faults_by_kind.read().unwrap().clone()
    }

    /// Print summary statistics
    pub fn print_summary(&self) {
        let session_count = self.sessions_processed.load(Ordering::Relaxed);
        let agent_count = self.agent_verdicts.load(Ordering::Relaxed);
        let agent_rate = if session_count > 0 {
            (agent_count as f64 / session_count as f64) * 100.0
        } else {
            0.0
        };
        let cluster_count = self.cluster_checks.load(Ordering::Relaxed);
        let anomaly_count = self.anomalies_flagged.load(Ordering::Relaxed);

        let processing = self.get_processing_stats();
        let throughput = self.get_throughput();
        let faults = self.get_faults_by_kind();
        let score_dist = self.get_score_distribution();

        info!("╔══════════════════════════════════════════════════════════════╗");
        info!("║          AGENT DETECTION PIPELINE - METRICS SUMMARY          ║");
        info!("╠══════════════════════════════════════════════════════════════╣");
        info!(
            "║ Sessions Processed:     {:>8}  │  Throughput: {:>6.1} /s   ║",
            session_count, throughput
        );
        info!(
            "║ Agent Verdicts:         {:>8}  │  Agent Rate: {:>6.1}%     ║",
            agent_count, agent_rate
        );
        info!(
            "║ Cluster Checks:         {:>8}  │  Anomalies:  {:>8}   ║",
            cluster_count, anomaly_count
        );
        info!("╠══════════════════════════════════════════════════════════════╣");
        info!(
            "║ Processing Time (μs): mean={:>5} p50={:>5} p95={:>5} p99={:>5} ║",
            processing.mean_us, processing.p50_us, processing.p95_us, processing.p99_us
        );
        info!("╠══════════════════════════════════════════════════════════════╣");
        info!("║ Faults by Kind:                                              ║");
        for (kind, count) in &faults {
            info!("║   {:17}: {:>6}                                    ║", kind, count);
        }
        info!("╠══════════════════════════════════════════════════════════════╣");
        info!("║ Humanness Score Distribution:                                ║");
        let total: u64 = score_dist.iter().sum();
        for (i, &count) in score_dist.iter().enumerate() {
            let pct = if total > 0 { (count as f64 / total as f64) * 100.0 } else { 0.0 };
            let bar_len = (pct / 2.0) as usize;
            let bar: String = "█".repeat(bar_len.min(20));
            info!(
                "║   {:.1}-{:.1}: {:>6} ({:>5.1}%) {}",
                i as f64 / 10.0,
                (i + 1) as f64 / 10.0,
                count,
                pct,
                bar
            );
        }
        info!("╚══════════════════════════════════════════════════════════════╝");
    }
}

impl Default for PipelineMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Processing time statistics
#[derive(Debug, Default)]
pub struct ProcessingStats {
    pub count: u64,
    pub mean_us: u64,
    pub p50_us: u64,
    pub p95_us: u64,
    pub p99_us: u64,
    pub max_us: u64,
}

/// Real-time metrics reporter that prints periodic summaries
pub struct MetricsReporter {
    metrics: std::sync::Arc<PipelineMetrics>,
    interval_secs: u64,
}

impl MetricsReporter {
    pub fn new(metrics: std::sync::Arc<PipelineMetrics>, interval_secs: u64) -> Self {
        Self {
            metrics,
            interval_secs,
        }
    }

    /// Start the periodic reporting task
    pub async fn start(self) {
        let mut interval = tokio::time::interval(Duration::from_secs(self.interval_secs));
        loop {
            interval.tick().await;
            self.metrics.print_summary();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_recording() {
        let metrics = PipelineMetrics::new();

        metrics.record_session(Duration::from_micros(100));
        metrics.record_session(Duration::from_micros(200));
        metrics.record_verdict(0.2, true);
        metrics.record_verdict(0.8, false);

        assert_eq!(metrics.sessions_processed.load(Ordering::Relaxed), 2);
        assert_eq!(metrics.agent_verdicts.load(Ordering::Relaxed), 1);

        let stats = metrics.get_processing_stats();
        assert_eq!(stats.count, 2);
        assert_eq!(stats.mean_us, 150);
        assert_eq!(stats.max_us, 200);
    }

    #[test]
    fn test_score_buckets_clamp_at_one() {
        let metrics = PipelineMetrics::new();

        metrics.record_verdict(0.05, true);
        metrics.record_verdict(0.95, false);
        metrics.record_verdict(1.0, false); // lands in the last bucket

        let dist = metrics.get_score_distribution();
        assert_eq!(dist[0], 1);
        assert_eq!(dist[9], 2);
    }

    #[test]
    fn test_fault_and_cluster_counters() {
        let metrics = PipelineMetrics::new();

        metrics.record_fault("validation");
        metrics.record_fault("validation");
        metrics.record_fault("model_unavailable");
        metrics.record_cluster_check(true);
        metrics.record_cluster_check(false);

        let faults = metrics.get_faults_by_kind();
        assert_eq!(faults["validation"], 2);
        assert_eq!(faults["model_unavailable"], 1);
        assert_eq!(metrics.cluster_checks.load(Ordering::Relaxed), 2);
        assert_eq!(metrics.anomalies_flagged.load(Ordering::Relaxed), 1);
    }
}
