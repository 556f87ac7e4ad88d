use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use fd_core::model::{Envelope, Rule};
use fd_core::window::WatermarkGenerator;
use tokio::sync::mpsc;

use crate::metrics::RuntimeMetrics;
use crate::source::InputRecord;

/// One message on a partition worker's input queue.
#[derive(Debug, Clone, PartialEq)]
pub enum PartitionInput {
    Envelope(Envelope),
    Rule(Rule),
    Watermark(i64),
}

/// Stable partition index for a grouping key.
pub fn partition_for(key: &str, partitions: usize) -> usize {
    let mut hasher = DefaultHasher::new();
    key.hash(&mut hasher);
    (hasher.finish() % partitions.max(1) as u64) as usize
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

/// Single dispatch point in front of the partition workers.
///
/// Envelopes go to the partition owning their grouping key; rule updates and
/// watermarks go to every partition. Because one loop does all sends, each
/// partition sees broadcasts at a consistent position relative to its own
/// envelopes.
pub struct Router {
    partitions: Vec<Option<mpsc::Sender<PartitionInput>>>,
    watermarks: WatermarkGenerator,
    metrics: Option<Arc<RuntimeMetrics>>,
}

impl Router {
    pub fn new(
        senders: Vec<mpsc::Sender<PartitionInput>>,
        out_of_orderness_millis: i64,
        metrics: Option<Arc<RuntimeMetrics>>,
    ) -> Self {
        Self {
            partitions: senders.into_iter().map(Some).collect(),
            watermarks: WatermarkGenerator::new(out_of_orderness_millis),
            metrics,
        }
    }

    pub async fn dispatch(&mut self, record: InputRecord) {
        match record {
            InputRecord::Rule(rule) => {
                if let Some(m) = &self.metrics {
                    m.inc_routed_rule();
                }
                self.broadcast(PartitionInput::Rule(rule)).await;
            }
            InputRecord::Envelope(envelope) => {
                if let Some(m) = &self.metrics {
                    m.inc_routed_envelope();
                }
                let event_time = envelope.transaction.event_time;
                let idx = partition_for(&envelope.grouping_key, self.partitions.len());
                self.send(idx, PartitionInput::Envelope(envelope)).await;
                if let Some(wm) = self.watermarks.observe(event_time) {
                    self.broadcast_watermark(wm).await;
                }
            }
        }
    }

    /// Emit the final watermark and close every partition queue.
    pub async fn finish(mut self) {
        let wm = self.watermarks.finish();
        self.broadcast_watermark(wm).await;
        self.partitions.clear();
    }

    async fn broadcast_watermark(&mut self, wm: i64) {
        if let Some(m) = &self.metrics {
            m.inc_watermark();
        }
        self.broadcast(PartitionInput::Watermark(wm)).await;
    }

    async fn broadcast(&mut self, input: PartitionInput) {
        for idx in 0..self.partitions.len() {
            self.send(idx, input.clone()).await;
        }
    }

    async fn send(&mut self, idx: usize, input: PartitionInput) {
        let Some(slot) = self.partitions.get_mut(idx) else {
            return;
        };
        let Some(tx) = slot else {
            return;
        };
        if tx.send(input).await.is_err() {
            fd_warn!(pipe, partition = idx, "partition worker stopped; dropping its input from now on");
            *slot = None;
        }
    }
}
