use std::collections::BTreeSet;

// ---------------------------------------------------------------------------
// TimerService
// ---------------------------------------------------------------------------

/// Per-partition event-time timers keyed by `(timestamp, partition key)`.
///
/// Registering the same pair twice keeps a single timer. Timers fire when the
/// watermark reaches their timestamp; the watermark never moves backwards.
#[derive(Debug)]
pub struct TimerService {
    resolution_millis: i64,
    pending: BTreeSet<(i64, String)>,
    watermark: i64,
}

impl TimerService {
    /// `resolution_millis` is clamped to at least one millisecond.
    pub fn new(resolution_millis: i64) -> Self {
        Self {
            resolution_millis: resolution_millis.max(1),
            pending: BTreeSet::new(),
            watermark: i64::MIN,
        }
    }

    /// Round `event_time` down to the timer resolution.
    pub fn coarsen(&self, event_time: i64) -> i64 {
        event_time
            .div_euclid(self.resolution_millis)
            .saturating_mul(self.resolution_millis)
    }

    /// Register a timer for `key` at the coarsened `event_time`. Returns the
    /// timer timestamp.
    pub fn register(&mut self, key: &str, event_time: i64) -> i64 {
        let ts = self.coarsen(event_time);
        self.pending.insert((ts, key.to_string()));
        ts
    }

    /// Move the watermark forward and return every timer now due, oldest
    /// first. A watermark at or behind the current one fires nothing.
    pub fn advance(&mut self, watermark: i64) -> Vec<(i64, String)> {
        if watermark <= self.watermark {
            return Vec::new();
        }
        self.watermark = watermark;
        let later = match watermark.checked_add(1) {
            Some(bound) => self.pending.split_off(&(bound, String::new())),
            None => BTreeSet::new(),
        };
        std::mem::replace(&mut self.pending, later).into_iter().collect()
    }

    pub fn watermark(&self) -> i64 {
        self.watermark
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }
}
