//! Performance metrics and statistics tracking for the risk fusion pipeline.

use crate::types::{ModelKey, RiskTier};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};
use tracing::info;

/// Metrics collector for pipeline performance
pub struct PipelineMetrics {
    /// Total assessment requests handled
    pub assessments: AtomicU64,
    /// Assessments that ended without a verdict
    pub no_verdicts: AtomicU64,
    /// Requests rejected before assessment (bad payload, input shape)
    pub failures: AtomicU64,
    verdicts_by_tier: RwLock<HashMap<RiskTier, u64>>,
    /// Skipped components per model key
    degraded_components: RwLock<HashMap<ModelKey, u64>>,
    /// Processing times (in microseconds)
    processing_times: RwLock<Vec<u64>>,
    /// Composite score distribution, ten buckets over 0-100
    score_buckets: RwLock<[u64; 10]>,
    start_time: Instant,
}

impl PipelineMetrics {
    /// Create a new metrics collector
    pub fn new() -> Self {
        Self {
            assessments: AtomicU64::new(0),
            no_verdicts: AtomicU64::new(0),
            failures: AtomicU64::new(0),
            verdicts_by_tier: RwLock::new(HashMap::new()),
            degraded_components: RwLock::new(HashMap::new()),
            processing_times: RwLock::new(Vec::with_capacity(1000)),
            score_buckets: RwLock::new([0; 10]),
            start_time: Instant::now(),
        }
    }

    fn record_time(&self, processing_time: Duration) {
        self.assessments.fetch_add(1, Ordering::Relaxed);

        if let Ok(mut times) = self.processing_times.write() {
            times.push(processing_time.as_micros() as u64);
            // Keep only last 10000 for memory efficiency
            if times.len() > 10000 {
                times.drain(0..5000);
            }
        }
    }

    /// Record an assessment that produced a verdict
    pub fn record_verdict(&self, processing_time: Duration, composite_score: f64, tier: RiskTier) {
        self.record_time(processing_time);

        let bucket = (composite_score / 10.0).clamp(0.0, 9.0) as usize;
        if let Ok(mut buckets) = self.score_buckets.write() {
            buckets[bucket] += 1;
        }
        if let Ok(mut by_tier) = self.verdicts_by_tier.write() {
            *by_tier.entry(tier).or_insert(0) += 1;
        }
    }

    /// Record an assessment where no model produced a score
    pub fn record_no_verdict(&self, processing_time: Duration) {
        self.record_time(processing_time);
        self.no_verdicts.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a request that failed before producing an outcome
    pub fn record_failure(&self) {
        self.failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Record components missing from a verdict
    pub fn record_degraded<'a>(&self, missing: impl IntoIterator<Item = &'a ModelKey>) {
        if let Ok(mut degraded) = self.degraded_components.write() {
            for key in missing {
                *degraded.entry(*key).or_insert(0) += 1;
            }
        }
    }

    /// Get processing time statistics
    pub fn get_processing_stats(&self) -> ProcessingStats {
        let Ok(times) = self.processing_times.read() else {
            return ProcessingStats::default();
        };
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

    /// Get current throughput (assessments per second)
    pub fn get_throughput(&self) -> f64 {
        let elapsed = self.start_time.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            self.assessments.load(Ordering::Relaxed) as f64 / elapsed
        } else {
            0.0
        }
    }

    /// Get score distribution
    pub fn get_score_distribution(&self) -> [u64; 10] {
        self.score_buckets.read().map(|b| *b).unwrap_or_default()
    }

    pub fn get_verdicts_by_tier(&self) -> HashMap<RiskTier, u64> {
        self.verdicts_by_tier
            .read()
            .map(|m| m.clone())
            .unwrap_or_default()
    }

    pub fn get_degraded_components(&self) -> HashMap<ModelKey, u64> {
        self.degraded_components
            .read()
            .map(|m| m.clone())
            .unwrap_or_default()
    }

    /// Log summary statistics
    pub fn print_summary(&self) {
        let assessments = self.assessments.load(Ordering::Relaxed);
        let no_verdicts = self.no_verdicts.load(Ordering::Relaxed);
        let failures = self.failures.load(Ordering::Relaxed);

        let processing = self.get_processing_stats();
        let throughput = self.get_throughput();
        let by_tier = self.get_verdicts_by_tier();
        let score_dist = self.get_score_distribution();

        info!("╔══════════════════════════════════════════════════════════════╗");
        info!("║             RISK FUSION PIPELINE - METRICS SUMMARY           ║");
        info!("╠══════════════════════════════════════════════════════════════╣");
        info!(
            "║ Assessments: {:>8}  │  Throughput: {:>6.1} req/s            ║",
            assessments, throughput
        );
        info!(
            "║ No verdict:  {:>8}  │  Failed:     {:>8}                 ║",
            no_verdicts, failures
        );
        info!("╠══════════════════════════════════════════════════════════════╣");
        info!(
            "║ Processing Time (μs): mean={:>5} p50={:>5} p95={:>5} p99={:>5} ║",
            processing.mean_us, processing.p50_us, processing.p95_us, processing.p99_us
        );
        info!("╠══════════════════════════════════════════════════════════════╣");
        info!("║ Verdicts by Tier:                                            ║");
        let verdicts: u64 = by_tier.values().sum();
        for tier in [RiskTier::Critical, RiskTier::High, RiskTier::Medium, RiskTier::Low] {
            let count = by_tier.get(&tier).copied().unwrap_or(0);
            let pct = if verdicts > 0 {
                (count as f64 / verdicts as f64) * 100.0
            } else {
                0.0
            };
            info!("║   {:10}: {:>6} ({:>5.1}%)                                ║", tier.as_str(), count, pct);
        }
        info!("╠══════════════════════════════════════════════════════════════╣");
        info!("║ Composite Score Distribution:                                ║");
        let total: u64 = score_dist.iter().sum();
        for (i, &count) in score_dist.iter().enumerate() {
            let pct = if total > 0 { (count as f64 / total as f64) * 100.0 } else { 0.0 };
            let bar_len = (pct / 2.0) as usize;
            let bar: String = "█".repeat(bar_len.min(20));
            info!(
                "║   {:>3}-{:<3}: {:>6} ({:>5.1}%) {}",
                i * 10,
                (i + 1) * 10,
                count,
                pct,
                bar
            );
        }
        info!("╚══════════════════════════════════════════════════════════════╝");

        let degraded = self.get_degraded_components();
        if !degraded.is_empty() {
            info!("Degraded components:");
            for (key, count) in &degraded {
                info!("  {}: {}", key, count);
            }
        }
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

/// Real-time metrics reporter that logs periodic summaries
pub struct MetricsReporter {
    metrics: Arc<PipelineMetrics>,
    interval_secs: u64,
}

impl MetricsReporter {
    pub fn new(metrics: Arc<PipelineMetrics>, interval_secs: u64) -> Self {
        Self {
            metrics,
            interval_secs: interval_secs.max(1),
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

        metrics.record_verdict(Duration::from_micros(100), 88.0, RiskTier::Critical);
        metrics.record_verdict(Duration::from_micros(200), 11.5, RiskTier::Low);
        metrics.record_no_verdict(Duration::from_micros(50));
        metrics.record_failure();

        assert_eq!(metrics.assessments.load(Ordering::Relaxed), 3);
        assert_eq!(metrics.no_verdicts.load(Ordering::Relaxed), 1);
        assert_eq!(metrics.failures.load(Ordering::Relaxed), 1);
        assert_eq!(metrics.get_verdicts_by_tier()[&RiskTier::Critical], 1);
        assert_eq!(metrics.get_processing_stats().count, 3);
    }

    #[test]
    fn test_score_buckets() {
        let metrics = PipelineMetrics::new();

        metrics.record_verdict(Duration::ZERO, 0.0, RiskTier::Low);
        metrics.record_verdict(Duration::ZERO, 55.0, RiskTier::High);
        metrics.record_verdict(Duration::ZERO, 100.0, RiskTier::Critical);

        let dist = metrics.get_score_distribution();
        assert_eq!(dist[0], 1);
        assert_eq!(dist[5], 1);
        assert_eq!(dist[9], 1);
    }

    #[test]
    fn test_degraded_components() {
        let metrics = PipelineMetrics::new();

        metrics.record_degraded(&[ModelKey::Fraud]);
        metrics.record_degraded(&[ModelKey::Fraud, ModelKey::Acceptance]);

        let degraded = metrics.get_degraded_components();
        assert_eq!(degraded[&ModelKey::Fraud], 2);
        assert_eq!(degraded[&ModelKey::Acceptance], 1);
    }
}
