use crate::alert::Alert;
use crate::error::CoreResult;
use crate::model::{Envelope, Rule};
use crate::rules::{RuleTable, RuleUpdate};
use crate::window::{EvictReport, TimerService, WindowStore, eviction_threshold};

use super::aggregator::Aggregator;
use super::control::{ControlOutcome, handle_control};
use super::output::{EngineOutput, OutputCollector};

// ---------------------------------------------------------------------------
// EvaluatorStats
// ---------------------------------------------------------------------------

/// Monotonic counters for one evaluator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EvaluatorStats {
    pub envelopes: u64,
    pub stale_rule_drops: u64,
    pub inactive_skips: u64,
    pub alerts_fired: u64,
    pub timers_fired: u64,
    pub buckets_evicted: u64,
    pub transactions_evicted: u64,
}

impl EvaluatorStats {
    fn record_eviction(&mut self, report: EvictReport) {
        self.buckets_evicted += report.buckets_evicted as u64;
        self.transactions_evicted += report.transactions_evicted as u64;
    }
}

// ---------------------------------------------------------------------------
// RuleEvaluator
// ---------------------------------------------------------------------------

/// Stateful rule evaluation for one partition.
///
/// Owns the partition's rule replica, the keyed windows of every grouping
/// key routed to it, and their eviction timers. All three are mutated only
/// through `&mut self`, so envelopes, rule updates and timer callbacks are
/// serialized by construction.
pub struct RuleEvaluator {
    rules: RuleTable,
    store: WindowStore,
    timers: TimerService,
    stats: EvaluatorStats,
}

impl RuleEvaluator {
    pub fn new(timer_resolution_millis: i64) -> Self {
        Self {
            rules: RuleTable::new(),
            store: WindowStore::new(),
            timers: TimerService::new(timer_resolution_millis),
            stats: EvaluatorStats::default(),
        }
    }

    pub fn rules(&self) -> &RuleTable {
        &self.rules
    }

    pub fn store(&self) -> &WindowStore {
        &self.store
    }

    pub fn timers(&self) -> &TimerService {
        &self.timers
    }

    pub fn stats(&self) -> EvaluatorStats {
        self.stats
    }

    /// Evaluate one keyed transaction against the rule it was routed for.
    ///
    /// The transaction is always stored, even when its rule is missing or
    /// paused, so it can count toward later evaluations.
    pub fn process_element(
        &mut self,
        envelope: Envelope,
        processing_time_ms: i64,
        out: &mut impl OutputCollector,
    ) -> CoreResult<()> {
        let Envelope {
            transaction,
            grouping_key,
            rule_id,
        } = envelope;
        let event_time = transaction.event_time;
        self.stats.envelopes += 1;

        self.store
            .window_mut(&grouping_key)
            .add(event_time, transaction.clone());

        out.collect(EngineOutput::Latency(
            processing_time_ms.saturating_sub(transaction.ingestion_timestamp),
        ));

        let Some(rule) = self.rules.get(rule_id) else {
            self.stats.stale_rule_drops += 1;
            log::trace!("rule {rule_id} not present, dropping envelope for key {grouping_key}");
            return Ok(());
        };
        let Some((spec, window_start)) = rule
            .aggregate()
            .filter(|_| rule.is_active())
            .zip(rule.window_start_for(event_time))
        else {
            self.stats.inactive_skips += 1;
            return Ok(());
        };

        self.timers.register(&grouping_key, event_time);

        let mut aggregator = Aggregator::new(spec.function, spec.field);
        if let Some(window) = self.store.window(&grouping_key) {
            for (_, bucket) in window.range(window_start, event_time) {
                for txn in bucket {
                    aggregator.add(spec.field.extract(txn));
                }
            }
        }
        let result = aggregator.result()?;
        let fired = spec.operator.apply(result, spec.limit);
        log::trace!(
            "rule {rule_id} key {grouping_key}: {:?}({}) over {} values = {result}, {} {} -> {fired}",
            spec.function,
            spec.field,
            aggregator.count(),
            spec.operator,
            spec.limit,
        );
        if !fired {
            return Ok(());
        }

        let rule: Rule = rule.clone();
        if spec.field.resets_on_fire() {
            let report = self.store.clear_key(&grouping_key);
            self.stats.record_eviction(report);
        }
        self.stats.alerts_fired += 1;
        out.collect(EngineOutput::Alert(Alert::new(
            rule,
            grouping_key,
            transaction,
            result,
        )));
        Ok(())
    }

    /// Apply a broadcast rule update, running it as a command if it is a
    /// CONTROL rule.
    pub fn process_broadcast(&mut self, rule: Rule, out: &mut impl OutputCollector) -> RuleUpdate {
        let rule_id = rule.id;
        let update = self.rules.apply_update(rule);
        log::trace!("rule {rule_id} update: {update:?}");
        if let RuleUpdate::Control(command) = update {
            let outcome = handle_control(command, &mut self.rules, &mut self.store, out);
            if let ControlOutcome::StateCleared(report) = outcome {
                self.stats.record_eviction(report);
            }
            log::debug!("control {command}: {outcome:?}");
        }
        update
    }

    /// Advance event time and run every eviction timer that became due.
    ///
    /// Stops at the first eviction fault; the remaining due timers are
    /// dropped with it since the partition cannot continue.
    pub fn advance_watermark(&mut self, watermark: i64) -> CoreResult<EvictReport> {
        let mut total = EvictReport::default();
        for (ts, key) in self.timers.advance(watermark) {
            total += self.on_timer(&key, ts)?;
        }
        Ok(total)
    }

    /// Evict buckets of `key` older than `ts` minus the widest active window.
    pub fn on_timer(&mut self, key: &str, ts: i64) -> CoreResult<EvictReport> {
        self.stats.timers_fired += 1;
        let Some(widest) = self.rules.widest_window_rule().and_then(Rule::window_millis) else {
            return Ok(EvictReport::default());
        };
        let threshold = eviction_threshold(ts, widest)?;
        let report = self.store.evict_before(key, threshold);
        if !report.is_empty() {
            log::trace!(
                "timer {ts} key {key}: evicted {} buckets below {threshold}",
                report.buckets_evicted
            );
        }
        self.stats.record_eviction(report);
        Ok(report)
    }
}
