mod bootstrap;
mod signal;
mod spawn;
mod types;

use std::path::Path;
use std::sync::Arc;

use orion_error::op_context;
use orion_error::prelude::*;
use tokio_util::sync::CancellationToken;

use fd_config::FraudConfig;

use crate::error::RuntimeResult;
use crate::metrics::{RuntimeMetrics, maybe_build_metrics};
use crate::router::Router;

pub use signal::wait_for_signal;

use bootstrap::load_resources;
use spawn::{spawn_metrics_task, spawn_output_tasks, spawn_partitions, spawn_source_task};
use types::TaskGroup;

// ---------------------------------------------------------------------------
// FraudEngine: the top-level lifecycle handle
// ---------------------------------------------------------------------------

/// Runs the replay pipeline: source → router → partition workers → output
/// writers.
///
/// Task groups are stored in start order and joined in reverse during
/// [`wait`](Self::wait). The source stops first and flushes the router with a
/// final watermark, partitions drain their queues, writers drain the output
/// channels, and the metrics reporter logs a last snapshot.
pub struct FraudEngine {
    cancel: CancellationToken,
    input_done: CancellationToken,
    /// Stops the metrics reporter, only after the output writers are joined.
    metrics_cancel: CancellationToken,
    groups: Vec<TaskGroup>,
    metrics: Option<Arc<RuntimeMetrics>>,
}

impl FraudEngine {
    /// Bootstrap the engine from a [`FraudConfig`] and the directory that
    /// relative input and sink paths resolve against.
    #[tracing::instrument(name = "engine.start", skip_all, fields(partitions = config.engine.partitions))]
    pub async fn start(config: FraudConfig, base_dir: &Path) -> RuntimeResult<Self> {
        let mut op = op_context!("engine-bootstrap").with_auto_log();
        op.record("base_dir", base_dir.display().to_string().as_str());
        op.record("input", config.input.path.as_str());

        let cancel = CancellationToken::new();
        let input_done = CancellationToken::new();
        let metrics_cancel = CancellationToken::new();

        let data = load_resources(&config, base_dir)?;
        let metrics = maybe_build_metrics(&config.metrics, config.engine.partitions);

        let mut groups: Vec<TaskGroup> = Vec::with_capacity(4);
        if let Some(m) = &metrics {
            groups.push(spawn_metrics_task(
                Arc::clone(m),
                &config.metrics,
                metrics_cancel.clone(),
            ));
        }

        let (outputs, output_group) = spawn_output_tasks(
            data.alert_sink,
            data.current_rule_sink,
            data.latency_sink,
            &config.engine,
            metrics.clone(),
        );
        groups.push(output_group);

        let (senders, partition_group) =
            spawn_partitions(&config.engine, outputs, metrics.clone());
        let partitions = partition_group.len();
        groups.push(partition_group);

        let router = Router::new(
            senders,
            config.engine.out_of_orderness.as_millis_i64(),
            metrics.clone(),
        );
        groups.push(spawn_source_task(
            data.input,
            router,
            metrics.clone(),
            cancel.child_token(),
            input_done.clone(),
        ));

        fd_info!(
            sys,
            partitions,
            timer_resolution = %config.engine.timer_resolution,
            out_of_orderness = %config.engine.out_of_orderness,
            metrics = metrics.is_some(),
            "engine started"
        );
        op.mark_suc();
        Ok(Self {
            cancel,
            input_done,
            metrics_cancel,
            groups,
            metrics,
        })
    }

    /// Stop reading input. Everything already read is still evaluated and
    /// written out.
    pub fn shutdown(&self) {
        fd_info!(sys, "initiating graceful shutdown");
        self.cancel.cancel();
    }

    /// Join every task group in LIFO order: source → partitions → outputs →
    /// metrics.
    ///
    /// All groups are joined even when one fails so that outputs still
    /// drain; the first error is returned.
    pub async fn wait(mut self) -> RuntimeResult<()> {
        let mut first_err = None;
        while let Some(group) = self.groups.pop() {
            let name = group.name;
            fd_debug!(sys, task_group = name, "waiting for task group to finish");
            match group.wait().await {
                Ok(()) => fd_debug!(sys, task_group = name, "task group finished"),
                Err(e) => {
                    fd_error!(sys, task_group = name, error = %e, "task group failed");
                    first_err.get_or_insert(e);
                }
            }
            if name == "outputs" {
                self.metrics_cancel.cancel();
            }
        }
        fd_info!(sys, "engine stopped");
        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Root cancellation token, for signal integration.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Cancelled once the replay input is exhausted and flushed.
    pub fn input_done_token(&self) -> CancellationToken {
        self.input_done.clone()
    }

    pub fn metrics(&self) -> Option<Arc<RuntimeMetrics>> {
        self.metrics.clone()
    }
}
