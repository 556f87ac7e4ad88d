use serde::{Deserialize, Serialize};

use crate::types::HumanDuration;

/// Evaluation engine settings from the `[engine]` section.
///
/// Every field has a default so a minimal config may omit the section.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Number of partition workers; grouping keys are hashed across them.
    pub partitions: usize,
    /// Bounded queue length in front of each partition worker.
    pub channel_capacity: usize,
    /// Resolution eviction timers are coarsened to.
    pub timer_resolution: HumanDuration,
    /// Watermark delay behind the largest event time seen.
    pub out_of_orderness: HumanDuration,
    /// Tumbling window for the latency side-channel average.
    pub latency_report_interval: HumanDuration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            partitions: 4,
            channel_capacity: 1024,
            timer_resolution: hd("1s"),
            out_of_orderness: hd("500ms"),
            latency_report_interval: hd("10s"),
        }
    }
}

fn hd(s: &str) -> HumanDuration {
    s.parse().expect("hardcoded duration must parse")
}
