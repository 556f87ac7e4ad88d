/// Bounded-out-of-orderness watermark generator.
///
/// The watermark trails the largest event time seen by a fixed delay and only
/// ever moves forward.
#[derive(Debug)]
pub struct WatermarkGenerator {
    out_of_orderness: i64,
    max_event_time: Option<i64>,
    emitted: i64,
}

impl WatermarkGenerator {
    pub fn new(out_of_orderness_millis: i64) -> Self {
        Self {
            out_of_orderness: out_of_orderness_millis.max(0),
            max_event_time: None,
            emitted: i64::MIN,
        }
    }

    /// Observe an event time. Returns the new watermark if it advanced.
    pub fn observe(&mut self, event_time: i64) -> Option<i64> {
        let max = self.max_event_time.map_or(event_time, |m| m.max(event_time));
        self.max_event_time = Some(max);
        let candidate = max.saturating_sub(self.out_of_orderness);
        if candidate > self.emitted {
            self.emitted = candidate;
            Some(candidate)
        } else {
            None
        }
    }

    /// Final watermark at end of input; flushes every pending timer.
    pub fn finish(&mut self) -> i64 {
        self.emitted = i64::MAX;
        i64::MAX
    }

    pub fn current(&self) -> i64 {
        self.emitted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trails_max_event_time() {
        let mut wm = WatermarkGenerator::new(500);
        assert_eq!(wm.observe(1000), Some(500));
        assert_eq!(wm.observe(800), None);
        assert_eq!(wm.observe(2000), Some(1500));
        assert_eq!(wm.current(), 1500);
    }

    #[test]
    fn finish_emits_max() {
        let mut wm = WatermarkGenerator::new(0);
        wm.observe(10);
        assert_eq!(wm.finish(), i64::MAX);
        assert_eq!(wm.observe(20), None);
    }
}
