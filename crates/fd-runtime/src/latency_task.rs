use std::sync::Arc;
use std::time::Duration;

use fd_core::alert::{RecordSink, format_millis_utc};
use serde::Serialize;
use tokio::sync::mpsc;

use crate::metrics::RuntimeMetrics;
use crate::output_task::{OutputStream, write_record};

/// Average of the latency side channel over one tumbling window.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LatencyReport {
    pub window_end: String,
    pub count: u64,
    pub avg_millis: f64,
}

/// Running sum for the current window.
#[derive(Debug, Default)]
struct LatencyWindow {
    count: u64,
    sum: i128,
}

impl LatencyWindow {
    fn observe(&mut self, millis: i64) {
        self.count += 1;
        self.sum += i128::from(millis);
    }

    /// Close the window. Empty windows produce nothing.
    fn take(&mut self, window_end_millis: i64) -> Option<LatencyReport> {
        let window = std::mem::take(self);
        if window.count == 0 {
            return None;
        }
        Some(LatencyReport {
            window_end: format_millis_utc(window_end_millis),
            count: window.count,
            avg_millis: window.sum as f64 / window.count as f64,
        })
    }
}

/// Average latency measurements over wall-clock tumbling windows of
/// `interval` and write one report per non-empty window. The open window is
/// flushed when the channel closes.
pub(crate) async fn run_latency_averager(
    mut rx: mpsc::Receiver<i64>,
    interval: Duration,
    sink: Box<dyn RecordSink>,
    metrics: Option<Arc<RuntimeMetrics>>,
) {
    let mut window = LatencyWindow::default();
    let mut tick = tokio::time::interval(interval);
    tick.tick().await;
    loop {
        tokio::select! {
            next = rx.recv() => match next {
                Some(ms) => window.observe(ms),
                None => break,
            },
            _ = tick.tick() => {
                if let Some(report) = window.take(chrono::Utc::now().timestamp_millis()) {
                    write_record(OutputStream::Latency, sink.as_ref(), &report, metrics.as_deref());
                }
            }
        }
    }
    if let Some(report) = window.take(chrono::Utc::now().timestamp_millis()) {
        write_record(OutputStream::Latency, sink.as_ref(), &report, metrics.as_deref());
    }
    fd_debug!(pipe, stream = "latency", "latency averager drained");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_averages_and_resets() {
        let mut w = LatencyWindow::default();
        assert!(w.take(0).is_none());
        w.observe(10);
        w.observe(20);
        w.observe(33);
        let report = w.take(1_000).unwrap();
        assert_eq!(report.count, 3);
        assert_eq!(report.avg_millis, 21.0);
        assert_eq!(report.window_end, "1970-01-01T00:00:01.000Z");
        assert!(w.take(2_000).is_none());
    }

    #[test]
    fn report_serializes_camel_case() {
        let report = LatencyReport {
            window_end: "1970-01-01T00:00:01.000Z".into(),
            count: 2,
            avg_millis: 1.5,
        };
        let v = serde_json::to_value(&report).unwrap();
        assert_eq!(v["windowEnd"], "1970-01-01T00:00:01.000Z");
        assert_eq!(v["avgMillis"], 1.5);
    }
}
