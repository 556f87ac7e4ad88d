use std::fmt;

use serde::{Deserialize, Serialize};

use super::money::Money;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PaymentType {
    #[serde(rename = "CSH")]
    Cash,
    #[serde(rename = "CRD")]
    Card,
}

impl fmt::Display for PaymentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cash => f.write_str("CSH"),
            Self::Card => f.write_str("CRD"),
        }
    }
}

/// A single payment event.
///
/// `event_time` is the logical time the payment happened and drives every
/// window computation; `ingestion_timestamp` is wall-clock arrival time and
/// only feeds the latency side channel.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub transaction_id: u64,
    pub event_time: i64,
    pub payee_id: u64,
    pub beneficiary_id: u64,
    pub payment_amount: Money,
    pub payment_type: PaymentType,
    pub ingestion_timestamp: i64,
}
