use std::sync::Arc;

use fd_core::alert::Alert;
use fd_core::engine::{EngineOutput, RuleEvaluator};
use fd_core::model::Rule;
use orion_error::prelude::*;
use tokio::sync::mpsc;

use crate::error::{RuntimeReason, RuntimeResult};
use crate::metrics::RuntimeMetrics;
use crate::router::PartitionInput;

/// Senders for the three output streams, shared by every partition.
#[derive(Clone)]
pub(crate) struct PartitionOutputs {
    pub alerts: mpsc::Sender<Alert>,
    pub current_rules: mpsc::Sender<Rule>,
    pub latency: mpsc::Sender<i64>,
}

impl PartitionOutputs {
    async fn forward(&self, id: usize, buf: &mut Vec<EngineOutput>) {
        for output in buf.drain(..) {
            let (stream, sent) = match output {
                EngineOutput::Alert(alert) => ("alerts", self.alerts.send(alert).await.is_ok()),
                EngineOutput::CurrentRule(rule) => {
                    ("current_rules", self.current_rules.send(rule).await.is_ok())
                }
                EngineOutput::Latency(ms) => ("latency", self.latency.send(ms).await.is_ok()),
            };
            if !sent {
                fd_warn!(pipe, partition = id, stream, "output channel closed; record dropped");
            }
        }
    }
}

fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Drive one partition's evaluator until its input queue closes.
///
/// An eviction fault stops this partition only; it is reported as a
/// [`RuntimeReason::Partition`] error when the task is joined.
pub(crate) async fn run_partition(
    id: usize,
    mut evaluator: RuleEvaluator,
    mut rx: mpsc::Receiver<PartitionInput>,
    outputs: PartitionOutputs,
    metrics: Option<Arc<RuntimeMetrics>>,
) -> RuntimeResult<()> {
    fd_debug!(sys, partition = id, "partition worker started");
    let mut buf: Vec<EngineOutput> = Vec::new();

    while let Some(input) = rx.recv().await {
        let mut publish = false;
        match input {
            PartitionInput::Envelope(envelope) => {
                if let Err(e) = evaluator.process_element(envelope, now_millis(), &mut buf) {
                    fd_warn!(pipe, partition = id, error = %e, "envelope evaluation failed; skipped");
                }
            }
            PartitionInput::Rule(rule) => {
                let rule_id = rule.id;
                let update = evaluator.process_broadcast(rule, &mut buf);
                fd_debug!(pipe, partition = id, rule_id, update = ?update, "rule update applied");
                publish = true;
            }
            PartitionInput::Watermark(wm) => {
                if let Err(e) = evaluator.advance_watermark(wm) {
                    fd_error!(res, partition = id, watermark = wm, error = %e, "eviction failed; stopping partition");
                    publish_stats(id, &evaluator, &metrics);
                    return StructError::from(RuntimeReason::Partition)
                        .with_detail(format!("partition {id}: {e}"))
                        .err();
                }
                publish = true;
            }
        }
        outputs.forward(id, &mut buf).await;
        if publish {
            publish_stats(id, &evaluator, &metrics);
        }
    }

    publish_stats(id, &evaluator, &metrics);
    let stats = evaluator.stats();
    fd_debug!(
        sys,
        partition = id,
        envelopes = stats.envelopes,
        alerts = stats.alerts_fired,
        pending_timers = evaluator.timers().pending(),
        "partition worker drained"
    );
    Ok(())
}

fn publish_stats(id: usize, evaluator: &RuleEvaluator, metrics: &Option<Arc<RuntimeMetrics>>) {
    if let Some(m) = metrics {
        let store = evaluator.store();
        m.publish_partition(
            id,
            &evaluator.stats(),
            store.key_count(),
            store.transaction_count(),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fd_core::model::{Envelope, decode_rule};

    struct Harness {
        tx: mpsc::Sender<PartitionInput>,
        alerts: mpsc::Receiver<Alert>,
        rules: mpsc::Receiver<Rule>,
        latency: mpsc::Receiver<i64>,
        handle: tokio::task::JoinHandle<RuntimeResult<()>>,
    }

    fn spawn_partition() -> Harness {
        let (tx, rx) = mpsc::channel(64);
        let (alert_tx, alerts) = mpsc::channel(64);
        let (rule_tx, rules) = mpsc::channel(64);
        let (lat_tx, latency) = mpsc::channel(64);
        let outputs = PartitionOutputs {
            alerts: alert_tx,
            current_rules: rule_tx,
            latency: lat_tx,
        };
        let handle = tokio::spawn(run_partition(0, RuleEvaluator::new(1000), rx, outputs, None));
        Harness {
            tx,
            alerts,
            rules,
            latency,
            handle,
        }
    }

    fn envelope(id: u64, t: i64) -> PartitionInput {
        let json = format!(
            r#"{{"groupingKey":"A","ruleId":1,"transaction":{{"transactionId":{id},
                "eventTime":{t},"payeeId":1,"beneficiaryId":2,"paymentAmount":1,
                "paymentType":"CRD","ingestionTimestamp":{t}}}}}"#
        );
        PartitionInput::Envelope(serde_json::from_str::<Envelope>(&json).unwrap())
    }

    fn rule(json: &str) -> PartitionInput {
        PartitionInput::Rule(decode_rule(json).unwrap())
    }

    #[tokio::test]
    async fn forwards_alerts_exports_and_latency() {
        let mut h = spawn_partition();
        h.tx.send(rule(
            r#"{"ruleId":1,"ruleState":"ACTIVE","aggregateFieldName":"COUNT",
                "limitOperatorType":">=","limit":2,"windowMinutes":1}"#,
        ))
        .await
        .unwrap();
        h.tx.send(envelope(1, 1000)).await.unwrap();
        h.tx.send(envelope(2, 2000)).await.unwrap();
        h.tx.send(rule(r#"{"ruleId":0,"ruleState":"CONTROL","controlType":"EXPORT_RULES_CURRENT"}"#))
            .await
            .unwrap();
        h.tx.send(PartitionInput::Watermark(i64::MAX)).await.unwrap();
        drop(h.tx);

        h.handle.await.unwrap().unwrap();

        let alert = h.alerts.recv().await.unwrap();
        assert_eq!(alert.transaction.transaction_id, 2);
        assert!(h.alerts.recv().await.is_none());

        assert_eq!(h.rules.recv().await.unwrap().id, 1);
        assert!(h.rules.recv().await.is_none());

        let mut latencies = 0;
        while h.latency.recv().await.is_some() {
            latencies += 1;
        }
        assert_eq!(latencies, 2);
    }

    #[tokio::test]
    async fn pre_epoch_timer_does_not_stop_partition() {
        let mut h = spawn_partition();
        let minutes = i64::MAX / 60_000;
        h.tx.send(rule(&format!(
            r#"{{"ruleId":1,"ruleState":"ACTIVE","aggregateFieldName":"COUNT",
                "limitOperatorType":">=","limit":2,"windowMinutes":{minutes}}}"#
        )))
        .await
        .unwrap();
        h.tx.send(envelope(1, -100_000)).await.unwrap();
        h.tx.send(PartitionInput::Watermark(0)).await.unwrap();
        h.tx.send(envelope(2, 1_000)).await.unwrap();
        drop(h.tx);

        h.handle.await.unwrap().unwrap();
        let alert = h.alerts.recv().await.unwrap();
        assert_eq!(alert.transaction.transaction_id, 2);
    }
}
