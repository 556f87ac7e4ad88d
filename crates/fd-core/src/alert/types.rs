use chrono::DateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::model::{Rule, RuleId, Transaction};

/// Emitted once per rule firing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Alert {
    pub rule_id: RuleId,
    pub rule: Rule,
    pub grouping_key: String,
    pub transaction: Transaction,
    /// Scale 2 for money, scale 0 for counts.
    pub aggregate_result: Decimal,
    /// Event time of the triggering transaction, RFC 3339 UTC.
    pub fired_at: String,
}

impl Alert {
    pub fn new(rule: Rule, grouping_key: String, transaction: Transaction, result: Decimal) -> Self {
        Self {
            rule_id: rule.id,
            fired_at: format_millis_utc(transaction.event_time),
            rule,
            grouping_key,
            transaction,
            aggregate_result: result,
        }
    }
}

/// Render epoch milliseconds as `YYYY-MM-DDTHH:MM:SS.mmmZ`.
///
/// Falls back to the raw number for values outside chrono's range.
pub fn format_millis_utc(millis: i64) -> String {
    match DateTime::from_timestamp_millis(millis) {
        Some(dt) => dt.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string(),
        None => millis.to_string(),
    }
}
