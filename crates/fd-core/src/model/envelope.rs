use serde::{Deserialize, Serialize};

use super::rule::RuleId;
use super::transaction::Transaction;

/// A transaction routed to one partition key and tagged with the rule it is
/// evaluated against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    pub transaction: Transaction,
    pub grouping_key: String,
    pub rule_id: RuleId,
}
