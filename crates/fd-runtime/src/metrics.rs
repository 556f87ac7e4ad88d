use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use fd_config::MetricsConfig;
use fd_core::engine::EvaluatorStats;
use tokio_util::sync::CancellationToken;

// ---------------------------------------------------------------------------
// PartitionGauges
// ---------------------------------------------------------------------------

/// Latest evaluator counters published by one partition worker.
#[derive(Default)]
struct PartitionGauges {
    envelopes: AtomicU64,
    stale_rule_drops: AtomicU64,
    inactive_skips: AtomicU64,
    alerts_fired: AtomicU64,
    timers_fired: AtomicU64,
    buckets_evicted: AtomicU64,
    transactions_evicted: AtomicU64,
    live_keys: AtomicU64,
    live_transactions: AtomicU64,
}

impl PartitionGauges {
    fn store(&self, stats: &EvaluatorStats, keys: usize, transactions: usize) {
        self.envelopes.store(stats.envelopes, Ordering::Relaxed);
        self.stale_rule_drops
            .store(stats.stale_rule_drops, Ordering::Relaxed);
        self.inactive_skips.store(stats.inactive_skips, Ordering::Relaxed);
        self.alerts_fired.store(stats.alerts_fired, Ordering::Relaxed);
        self.timers_fired.store(stats.timers_fired, Ordering::Relaxed);
        self.buckets_evicted
            .store(stats.buckets_evicted, Ordering::Relaxed);
        self.transactions_evicted
            .store(stats.transactions_evicted, Ordering::Relaxed);
        self.live_keys.store(keys as u64, Ordering::Relaxed);
        self.live_transactions
            .store(transactions as u64, Ordering::Relaxed);
    }
}

// ---------------------------------------------------------------------------
// RuntimeMetrics
// ---------------------------------------------------------------------------

/// Shared runtime counters. All updates are lock-free.
pub struct RuntimeMetrics {
    input_lines_total: AtomicU64,
    input_malformed_total: AtomicU64,
    routed_rules_total: AtomicU64,
    routed_envelopes_total: AtomicU64,
    watermarks_total: AtomicU64,
    alerts_written_total: AtomicU64,
    current_rules_written_total: AtomicU64,
    latency_reports_total: AtomicU64,
    sink_errors_total: AtomicU64,
    partitions: Vec<PartitionGauges>,
}

/// Point-in-time totals across the whole engine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub input_lines: u64,
    pub input_malformed: u64,
    pub routed_rules: u64,
    pub routed_envelopes: u64,
    pub watermarks: u64,
    pub envelopes_evaluated: u64,
    pub stale_rule_drops: u64,
    pub inactive_skips: u64,
    pub alerts_fired: u64,
    pub alerts_written: u64,
    pub current_rules_written: u64,
    pub latency_reports: u64,
    pub timers_fired: u64,
    pub buckets_evicted: u64,
    pub transactions_evicted: u64,
    pub live_keys: u64,
    pub live_transactions: u64,
    pub sink_errors: u64,
}

impl RuntimeMetrics {
    pub fn new(partitions: usize) -> Self {
        Self {
            input_lines_total: AtomicU64::new(0),
            input_malformed_total: AtomicU64::new(0),
            routed_rules_total: AtomicU64::new(0),
            routed_envelopes_total: AtomicU64::new(0),
            watermarks_total: AtomicU64::new(0),
            alerts_written_total: AtomicU64::new(0),
            current_rules_written_total: AtomicU64::new(0),
            latency_reports_total: AtomicU64::new(0),
            sink_errors_total: AtomicU64::new(0),
            partitions: (0..partitions).map(|_| PartitionGauges::default()).collect(),
        }
    }

    pub fn inc_input_line(&self) {
        self.input_lines_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_input_malformed(&self) {
        self.input_malformed_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_routed_rule(&self) {
        self.routed_rules_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_routed_envelope(&self) {
        self.routed_envelopes_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_watermark(&self) {
        self.watermarks_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_alert_written(&self) {
        self.alerts_written_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_current_rule_written(&self) {
        self.current_rules_written_total
            .fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_latency_report(&self) {
        self.latency_reports_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_sink_error(&self) {
        self.sink_errors_total.fetch_add(1, Ordering::Relaxed);
    }

    /// Publish the latest evaluator counters for `partition`.
    pub fn publish_partition(
        &self,
        partition: usize,
        stats: &EvaluatorStats,
        keys: usize,
        transactions: usize,
    ) {
        if let Some(gauges) = self.partitions.get(partition) {
            gauges.store(stats, keys, transactions);
        }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let load = |v: &AtomicU64| v.load(Ordering::Relaxed);
        let mut snap = MetricsSnapshot {
            input_lines: load(&self.input_lines_total),
            input_malformed: load(&self.input_malformed_total),
            routed_rules: load(&self.routed_rules_total),
            routed_envelopes: load(&self.routed_envelopes_total),
            watermarks: load(&self.watermarks_total),
            alerts_written: load(&self.alerts_written_total),
            current_rules_written: load(&self.current_rules_written_total),
            latency_reports: load(&self.latency_reports_total),
            sink_errors: load(&self.sink_errors_total),
            ..MetricsSnapshot::default()
        };
        for p in &self.partitions {
            snap.envelopes_evaluated += load(&p.envelopes);
            snap.stale_rule_drops += load(&p.stale_rule_drops);
            snap.inactive_skips += load(&p.inactive_skips);
            snap.alerts_fired += load(&p.alerts_fired);
            snap.timers_fired += load(&p.timers_fired);
            snap.buckets_evicted += load(&p.buckets_evicted);
            snap.transactions_evicted += load(&p.transactions_evicted);
            snap.live_keys += load(&p.live_keys);
            snap.live_transactions += load(&p.live_transactions);
        }
        snap
    }

    /// One-line human-readable summary for periodic log output.
    pub fn summary_line(&self) -> String {
        let s = self.snapshot();
        format!(
            "input={} malformed={} rules={} envelopes={} evaluated={} stale={} inactive={} \
             alerts={}/{} exports={} latency_reports={} timers={} evicted_buckets={} \
             evicted_txns={} keys={} txns={} sink_errors={}",
            s.input_lines,
            s.input_malformed,
            s.routed_rules,
            s.routed_envelopes,
            s.envelopes_evaluated,
            s.stale_rule_drops,
            s.inactive_skips,
            s.alerts_written,
            s.alerts_fired,
            s.current_rules_written,
            s.latency_reports,
            s.timers_fired,
            s.buckets_evicted,
            s.transactions_evicted,
            s.live_keys,
            s.live_transactions,
            s.sink_errors,
        )
    }
}

// ---------------------------------------------------------------------------
// Reporter task
// ---------------------------------------------------------------------------

/// Log a metrics snapshot every `report_interval` until cancelled, then log a
/// final one.
pub async fn run_metrics_task(
    metrics: Arc<RuntimeMetrics>,
    config: MetricsConfig,
    cancel: CancellationToken,
) -> anyhow::Result<()> {
    fd_info!(res, interval = %config.report_interval, "metrics reporter started");
    let mut tick = tokio::time::interval(config.report_interval.as_duration());
    // the first tick completes immediately
    tick.tick().await;
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tick.tick() => {
                fd_info!(res, summary = %metrics.summary_line(), "metrics snapshot");
            }
        }
    }
    fd_info!(res, summary = %metrics.summary_line(), "final metrics snapshot");
    Ok(())
}

pub fn maybe_build_metrics(config: &MetricsConfig, partitions: usize) -> Option<Arc<RuntimeMetrics>> {
    if !config.enabled {
        return None;
    }
    Some(Arc::new(RuntimeMetrics::new(partitions)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_sums_partitions() {
        let metrics = RuntimeMetrics::new(2);
        metrics.inc_input_line();
        metrics.inc_input_line();
        metrics.inc_input_malformed();
        let stats = EvaluatorStats {
            envelopes: 5,
            alerts_fired: 1,
            ..EvaluatorStats::default()
        };
        metrics.publish_partition(0, &stats, 2, 4);
        metrics.publish_partition(1, &stats, 1, 1);
        // out-of-range partitions are ignored
        metrics.publish_partition(9, &stats, 1, 1);

        let snap = metrics.snapshot();
        assert_eq!(snap.input_lines, 2);
        assert_eq!(snap.input_malformed, 1);
        assert_eq!(snap.envelopes_evaluated, 10);
        assert_eq!(snap.alerts_fired, 2);
        assert_eq!(snap.live_keys, 3);
        assert_eq!(snap.live_transactions, 5);
        assert!(metrics.summary_line().contains("evaluated=10"));
    }

    #[test]
    fn disabled_config_builds_nothing() {
        assert!(maybe_build_metrics(&MetricsConfig::default(), 4).is_none());
    }
}
