use std::ops::AddAssign;

use orion_error::prelude::*;

use crate::error::{CoreReason, CoreResult};

// ---------------------------------------------------------------------------
// EvictReport
// ---------------------------------------------------------------------------

/// Summary of one eviction pass over a keyed window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EvictReport {
    pub buckets_evicted: usize,
    pub transactions_evicted: usize,
}

impl EvictReport {
    pub fn is_empty(&self) -> bool {
        self.buckets_evicted == 0
    }
}

impl AddAssign for EvictReport {
    fn add_assign(&mut self, rhs: Self) {
        self.buckets_evicted += rhs.buckets_evicted;
        self.transactions_evicted += rhs.transactions_evicted;
    }
}

// ---------------------------------------------------------------------------
// Threshold
// ---------------------------------------------------------------------------

/// Oldest bucket key a timer firing at `timer_ts` must keep, given the widest
/// active window.
///
/// A threshold below `i64::MIN` keeps every bucket, so the subtraction
/// saturates. A negative window cannot come from a decoded rule and is
/// reported as an eviction fault.
pub fn eviction_threshold(timer_ts: i64, widest_window_millis: i64) -> CoreResult<i64> {
    if widest_window_millis < 0 {
        return StructError::from(CoreReason::Eviction)
            .with_detail(format!(
                "negative widest window {widest_window_millis}ms at timer {timer_ts}"
            ))
            .err();
    }
    Ok(timer_ts.saturating_sub(widest_window_millis))
}
