use std::sync::Arc;

use fd_config::{EngineConfig, InputSource, MetricsConfig};
use fd_core::alert::RecordSink;
use fd_core::engine::RuleEvaluator;
use orion_error::ErrorOweBase;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::error::RuntimeReason;
use crate::latency_task::run_latency_averager;
use crate::metrics::{RuntimeMetrics, run_metrics_task};
use crate::output_task::{OUTPUT_CHANNEL_CAPACITY, OutputStream, run_record_writer};
use crate::partition::{PartitionOutputs, run_partition};
use crate::router::{PartitionInput, Router};
use crate::source::run_replay;

use super::types::TaskGroup;

/// Spawn the periodic metrics reporter.
pub(super) fn spawn_metrics_task(
    metrics: Arc<RuntimeMetrics>,
    config: &MetricsConfig,
    cancel: CancellationToken,
) -> TaskGroup {
    let config = config.clone();
    let mut group = TaskGroup::new("metrics");
    group.push(tokio::spawn(async move {
        run_metrics_task(metrics, config, cancel)
            .await
            .owe(RuntimeReason::Shutdown)
    }));
    group
}

/// Spawn one writer per output stream. Each writer exits once every
/// partition has dropped its sender.
pub(super) fn spawn_output_tasks(
    alert_sink: Box<dyn RecordSink>,
    current_rule_sink: Box<dyn RecordSink>,
    latency_sink: Box<dyn RecordSink>,
    engine: &EngineConfig,
    metrics: Option<Arc<RuntimeMetrics>>,
) -> (PartitionOutputs, TaskGroup) {
    let (alert_tx, alert_rx) = mpsc::channel(OUTPUT_CHANNEL_CAPACITY);
    let (rule_tx, rule_rx) = mpsc::channel(OUTPUT_CHANNEL_CAPACITY);
    let (latency_tx, latency_rx) = mpsc::channel(OUTPUT_CHANNEL_CAPACITY);
    let interval = engine.latency_report_interval.as_duration();

    let mut group = TaskGroup::new("outputs");
    let m = metrics.clone();
    group.push(tokio::spawn(async move {
        run_record_writer(OutputStream::Alerts, alert_rx, alert_sink, m).await;
        Ok(())
    }));
    let m = metrics.clone();
    group.push(tokio::spawn(async move {
        run_record_writer(OutputStream::CurrentRules, rule_rx, current_rule_sink, m).await;
        Ok(())
    }));
    group.push(tokio::spawn(async move {
        run_latency_averager(latency_rx, interval, latency_sink, metrics).await;
        Ok(())
    }));

    let outputs = PartitionOutputs {
        alerts: alert_tx,
        current_rules: rule_tx,
        latency: latency_tx,
    };
    (outputs, group)
}

/// Spawn `engine.partitions` evaluator workers, each owning its own rule
/// table and window state. Returns the input senders in partition order.
pub(super) fn spawn_partitions(
    engine: &EngineConfig,
    outputs: PartitionOutputs,
    metrics: Option<Arc<RuntimeMetrics>>,
) -> (Vec<mpsc::Sender<PartitionInput>>, TaskGroup) {
    let resolution = engine.timer_resolution.as_millis_i64();
    let mut senders = Vec::with_capacity(engine.partitions);
    let mut group = TaskGroup::new("partitions");

    for id in 0..engine.partitions {
        let (tx, rx) = mpsc::channel(engine.channel_capacity);
        senders.push(tx);
        group.push(tokio::spawn(run_partition(
            id,
            RuleEvaluator::new(resolution),
            rx,
            outputs.clone(),
            metrics.clone(),
        )));
    }

    // Drop our copy so the output channels close when the last partition
    // finishes.
    drop(outputs);

    (senders, group)
}

/// Spawn the replay source. `input_done` is cancelled once the input is
/// exhausted (or failed) and the router has been flushed.
pub(super) fn spawn_source_task(
    input: InputSource,
    router: Router,
    metrics: Option<Arc<RuntimeMetrics>>,
    cancel: CancellationToken,
    input_done: CancellationToken,
) -> TaskGroup {
    let mut group = TaskGroup::new("source");
    group.push(tokio::spawn(async move {
        let result = run_replay(input, router, metrics, cancel)
            .await
            .owe(RuntimeReason::Shutdown);
        input_done.cancel();
        result
    }));
    group
}
