//! Performance and decision statistics for the pipeline service.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;
use std::time::{Duration, Instant};
use tracing::info;

/// Metrics collector for the decision loop.
pub struct PipelineMetrics {
    /// Total requests decided
    pub decisions_made: AtomicU64,
    /// Requests that ended in an error event
    pub errors: AtomicU64,
    /// Structural override firings
    pub overrides_applied: AtomicU64,
    /// Decisions by tier name
    decisions_by_tier: RwLock<HashMap<String, u64>>,
    /// Errors by kind
    errors_by_kind: RwLock<HashMap<String, u64>>,
    /// Per-request processing times (microseconds)
    processing_times: RwLock<Vec<u64>>,
    /// Final-probability distribution buckets
    score_buckets: RwLock<[u64; 10]>,
    start_time: Instant,
}

impl PipelineMetrics {
    pub fn new() -> Self {
        Self {
            decisions_made: AtomicU64::new(0),
            errors: AtomicU64::new(0),
            overrides_applied: AtomicU64::new(0),
            decisions_by_tier: RwLock::new(HashMap::new()),
            errors_by_kind: RwLock::new(HashMap::new()),
            processing_times: RwLock::new(Vec::with_capacity(1000)),
            score_buckets: RwLock::new([0; 10]),
            start_time: Instant::now(),
        }
    }

    /// Record one completed decision.
    pub fn record_decision(
        &self,
        processing_time: Duration,
        probability: f64,
        tier: &str,
        override_applied: bool,
    ) {
        self.decisions_made.fetch_add(1, Ordering::Relaxed);
        if override_applied {
            self.overrides_applied.fetch_add(1, Ordering::Relaxed);
        }

        if let Ok(mut times) = self.processing_times.write() {
            times.push(processing_time.as_micros() as u64);
            // bound memory; keep the recent half
            if times.len() > 10000 {
                times.drain(0..5000);
            }
        }

        let bucket = (probability * 10.0).min(9.0) as usize;
        if let Ok(mut buckets) = self.score_buckets.write() {
            buckets[bucket] += 1;
        }

        if let Ok(mut by_tier) = self.decisions_by_tier.write() {
            *by_tier.entry(tier.to_string()).or_insert(0) += 1;
        }
    }

    /// Record a failed request.
    pub fn record_error(&self, kind: &str) {
        self.errors.fetch_add(1, Ordering::Relaxed);
        if let Ok(mut by_kind) = self.errors_by_kind.write() {
            *by_kind.entry(kind.to_string()).or_insert(0) += 1;
        }
    }

    /// Processing time percentiles.
    pub fn get_processing_stats(&self) -> ProcessingStats {
        let times = match self.processing_times.read() {
            Ok(t) => t,
            Err(_) => return ProcessingStats::default(),
        };
        if times.is_empty() {
            return ProcessingStats::default();
        }

        let mut sorted: Vec<u64> = times.clone();
        sorted.sort_unstable();

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

    /// Requests decided per second since startup.
    pub fn get_throughput(&self) -> f64 {
        let elapsed = self.start_time.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            self.decisions_made.load(Ordering::Relaxed) as f64 / elapsed
        } else {
            0.0
        }
    }

    pub fn get_decisions_by_tier(&self) -> HashMap<String, u64> {
        self.decisions_by_tier
            .read()
            .map(|m| m.clone())
            .unwrap_or_default()
    }

    pub fn get_errors_by_kind(&self) -> HashMap<String, u64> {
        self.errors_by_kind
            .read()
            .map(|m| m.clone())
            .unwrap_or_default()
    }

    pub fn get_score_distribution(&self) -> [u64; 10] {
        self.score_buckets.read().map(|b| *b).unwrap_or([0; 10])
    }

    /// Log a summary of everything collected so far.
    pub fn print_summary(&self) {
        let decided = self.decisions_made.load(Ordering::Relaxed);
        let errors = self.errors.load(Ordering::Relaxed);
        let overrides = self.overrides_applied.load(Ordering::Relaxed);
        let processing = self.get_processing_stats();

        info!(
            decisions = decided,
            errors,
            overrides_applied = overrides,
            throughput = format!("{:.1} req/s", self.get_throughput()),
            "Pipeline metrics summary"
        );
        info!(
            mean_us = processing.mean_us,
            p50_us = processing.p50_us,
            p95_us = processing.p95_us,
            p99_us = processing.p99_us,
            "Processing time"
        );

        for (tier, count) in self.get_decisions_by_tier() {
            let pct = if decided > 0 {
                (count as f64 / decided as f64) * 100.0
            } else {
                0.0
            };
            info!(tier = %tier, count, pct = format!("{pct:.1}%"), "Decisions by tier");
        }
        for (kind, count) in self.get_errors_by_kind() {
            info!(kind = %kind, count, "Errors by kind");
        }

        let dist = self.get_score_distribution();
        let total: u64 = dist.iter().sum();
        if total > 0 {
            for (i, &count) in dist.iter().enumerate() {
                info!(
                    bucket = format!("{:.1}-{:.1}", i as f64 / 10.0, (i + 1) as f64 / 10.0),
                    count,
                    "Score distribution"
                );
            }
        }
    }
}

impl Default for PipelineMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Processing time statistics.
#[derive(Debug, Default)]
pub struct ProcessingStats {
    pub count: u64,
    pub mean_us: u64,
    pub p50_us: u64,
    pub p95_us: u64,
    pub p99_us: u64,
    pub max_us: u64,
}

/// Periodic metrics reporter task.
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

    /// Run the periodic summary loop.
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
    fn test_decision_recording() {
        let metrics = PipelineMetrics::new();

        metrics.record_decision(Duration::from_micros(120), 0.2, "LOW", false);
        metrics.record_decision(Duration::from_micros(250), 0.85, "HIGH", true);
        metrics.record_error("domain_error");

        assert_eq!(metrics.decisions_made.load(Ordering::Relaxed), 2);
        assert_eq!(metrics.overrides_applied.load(Ordering::Relaxed), 1);
        assert_eq!(metrics.errors.load(Ordering::Relaxed), 1);
        assert_eq!(metrics.get_decisions_by_tier().get("HIGH"), Some(&1));
        assert_eq!(metrics.get_errors_by_kind().get("domain_error"), Some(&1));
    }

    #[test]
    fn test_score_buckets() {
        let metrics = PipelineMetrics::new();
        metrics.record_decision(Duration::from_micros(100), 0.05, "LOW", false);
        metrics.record_decision(Duration::from_micros(100), 0.95, "HIGH", false);
        metrics.record_decision(Duration::from_micros(100), 1.0, "HIGH", false);

        let dist = metrics.get_score_distribution();
        assert_eq!(dist[0], 1);
        assert_eq!(dist[9], 2); // 1.0 clamps into the top bucket
    }

    #[test]
    fn test_processing_stats() {
        let metrics = PipelineMetrics::new();
        for us in [100u64, 200, 300, 400] {
            metrics.record_decision(Duration::from_micros(us), 0.5, "MEDIUM", false);
        }
        let stats = metrics.get_processing_stats();
        assert_eq!(stats.count, 4);
        assert_eq!(stats.mean_us, 250);
        assert_eq!(stats.max_us, 400);
    }
}
