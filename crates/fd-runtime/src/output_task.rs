use std::sync::Arc;

use fd_core::alert::{RecordSink, encode_record};
use serde::Serialize;
use tokio::sync::mpsc;

use crate::metrics::RuntimeMetrics;

/// Bounded channel capacity for each output stream.
pub const OUTPUT_CHANNEL_CAPACITY: usize = 256;

/// Which output stream a writer serves; selects the metrics counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum OutputStream {
    Alerts,
    CurrentRules,
    Latency,
}

impl OutputStream {
    pub(crate) fn name(&self) -> &'static str {
        match self {
            Self::Alerts => "alerts",
            Self::CurrentRules => "current_rules",
            Self::Latency => "latency",
        }
    }

    fn count(&self, metrics: &RuntimeMetrics) {
        match self {
            Self::Alerts => metrics.inc_alert_written(),
            Self::CurrentRules => metrics.inc_current_rule_written(),
            Self::Latency => metrics.inc_latency_report(),
        }
    }
}

/// Write one record to `sink`. Failures are logged and counted, never
/// propagated.
pub(crate) fn write_record<T: Serialize>(
    stream: OutputStream,
    sink: &dyn RecordSink,
    record: &T,
    metrics: Option<&RuntimeMetrics>,
) {
    let result = encode_record(record).and_then(|line| sink.send(&line));
    match (result, metrics) {
        (Ok(()), Some(m)) => stream.count(m),
        (Ok(()), None) => {}
        (Err(e), m) => {
            if let Some(m) = m {
                m.inc_sink_error();
            }
            fd_warn!(pipe, stream = stream.name(), error = %e, "sink write failed");
        }
    }
}

/// Consume records until every sender is dropped, writing each to `sink`.
pub(crate) async fn run_record_writer<T: Serialize>(
    stream: OutputStream,
    mut rx: mpsc::Receiver<T>,
    sink: Box<dyn RecordSink>,
    metrics: Option<Arc<RuntimeMetrics>>,
) {
    let mut written = 0u64;
    while let Some(record) = rx.recv().await {
        write_record(stream, sink.as_ref(), &record, metrics.as_deref());
        written += 1;
    }
    fd_debug!(pipe, stream = stream.name(), records = written, "output writer drained");
}
