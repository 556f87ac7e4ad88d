use std::fmt;
use std::str::FromStr;

use orion_error::prelude::*;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{CoreReason, CoreResult};

use super::money::MONEY_SCALE;
use super::transaction::Transaction;

pub type RuleId = i32;

const MILLIS_PER_MINUTE: u64 = 60_000;

// ---------------------------------------------------------------------------
// Enumerations
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RuleState {
    Active,
    Paused,
    Delete,
    Control,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ControlType {
    ExportRulesCurrent,
    ClearStateAll,
    DeleteRulesAll,
}

impl fmt::Display for ControlType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::ExportRulesCurrent => "EXPORT_RULES_CURRENT",
            Self::ClearStateAll => "CLEAR_STATE_ALL",
            Self::DeleteRulesAll => "DELETE_RULES_ALL",
        })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AggregatorFunction {
    #[default]
    Sum,
    Avg,
    Min,
    Max,
}

// ---------------------------------------------------------------------------
// AggregateField
// ---------------------------------------------------------------------------

/// The transaction quantity a rule aggregates over.
///
/// Resolved from `aggregateFieldName` when the rule is decoded so the hot
/// path never looks fields up by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AggregateField {
    /// One unit per transaction.
    Count,
    /// One unit per transaction; a firing rule clears all state for the key.
    CountWithReset,
    PaymentAmount,
}

impl AggregateField {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "COUNT_FLINK" | "COUNT" => Some(Self::Count),
            "COUNT_WITH_RESET_FLINK" | "COUNT_WITH_RESET" => Some(Self::CountWithReset),
            "paymentAmount" => Some(Self::PaymentAmount),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Count => "COUNT_FLINK",
            Self::CountWithReset => "COUNT_WITH_RESET_FLINK",
            Self::PaymentAmount => "paymentAmount",
        }
    }

    pub fn is_count(&self) -> bool {
        matches!(self, Self::Count | Self::CountWithReset)
    }

    pub fn resets_on_fire(&self) -> bool {
        matches!(self, Self::CountWithReset)
    }

    /// Integer value contributed by `txn`: `1` for the count fields, minor
    /// units for money.
    pub fn extract(&self, txn: &Transaction) -> i64 {
        match self {
            Self::Count | Self::CountWithReset => 1,
            Self::PaymentAmount => txn.payment_amount.minor_units(),
        }
    }

    /// Decimal scale of the extracted integers.
    pub fn scale(&self) -> u32 {
        if self.is_count() { 0 } else { MONEY_SCALE }
    }
}

impl fmt::Display for AggregateField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// LimitOperator
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LimitOperator {
    Equal,
    NotEqual,
    GreaterEqual,
    LessEqual,
    Greater,
    Less,
}

impl LimitOperator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Equal => "EQUAL",
            Self::NotEqual => "NOT_EQUAL",
            Self::GreaterEqual => "GREATER_EQUAL",
            Self::LessEqual => "LESS_EQUAL",
            Self::Greater => "GREATER",
            Self::Less => "LESS",
        }
    }

    /// Evaluate `value <op> limit`.
    pub fn apply(&self, value: Decimal, limit: Decimal) -> bool {
        match self {
            Self::Equal => value == limit,
            Self::NotEqual => value != limit,
            Self::GreaterEqual => value >= limit,
            Self::LessEqual => value <= limit,
            Self::Greater => value > limit,
            Self::Less => value < limit,
        }
    }
}

impl FromStr for LimitOperator {
    type Err = RuleDecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "EQUAL" | "=" | "==" => Ok(Self::Equal),
            "NOT_EQUAL" | "!=" => Ok(Self::NotEqual),
            "GREATER_EQUAL" | ">=" => Ok(Self::GreaterEqual),
            "LESS_EQUAL" | "<=" => Ok(Self::LessEqual),
            "GREATER" | ">" => Ok(Self::Greater),
            "LESS" | "<" => Ok(Self::Less),
            other => Err(RuleDecodeError::UnknownOperator(other.to_string())),
        }
    }
}

impl fmt::Display for LimitOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for LimitOperator {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for LimitOperator {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// Rule
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RuleDecodeError {
    #[error("rule {rule_id}: missing required field `{field}`")]
    MissingField { rule_id: RuleId, field: &'static str },
    #[error("rule {rule_id}: unknown aggregate field `{name}`")]
    UnknownAggregateField { rule_id: RuleId, name: String },
    #[error("unknown limit operator `{0}`")]
    UnknownOperator(String),
    #[error("rule {rule_id}: window of {minutes} minutes does not fit in i64 milliseconds")]
    WindowTooLarge { rule_id: RuleId, minutes: u64 },
}

/// The evaluable part of an ACTIVE or PAUSED rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregateSpec {
    pub field: AggregateField,
    pub function: AggregatorFunction,
    pub operator: LimitOperator,
    pub limit: Decimal,
    pub window_minutes: u64,
    window_millis: i64,
}

impl AggregateSpec {
    pub fn window_millis(&self) -> i64 {
        self.window_millis
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleKind {
    Aggregate(AggregateSpec),
    Control(ControlType),
    /// A DELETE request; carries nothing beyond the id.
    Tombstone,
}

/// A decoded, validated detection rule.
///
/// Construction goes through [`RuleRecord`] so every `Rule` in memory has
/// already passed validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RuleRecord", into = "RuleRecord")]
pub struct Rule {
    pub id: RuleId,
    pub state: RuleState,
    pub grouping_key_names: Vec<String>,
    pub kind: RuleKind,
}

impl Rule {
    pub fn is_active(&self) -> bool {
        self.state == RuleState::Active
    }

    pub fn aggregate(&self) -> Option<&AggregateSpec> {
        match &self.kind {
            RuleKind::Aggregate(spec) => Some(spec),
            _ => None,
        }
    }

    pub fn control_type(&self) -> Option<ControlType> {
        match self.kind {
            RuleKind::Control(ct) => Some(ct),
            _ => None,
        }
    }

    pub fn window_millis(&self) -> Option<i64> {
        self.aggregate().map(AggregateSpec::window_millis)
    }

    /// Start of this rule's window for an event at `event_time`.
    pub fn window_start_for(&self, event_time: i64) -> Option<i64> {
        self.window_millis().map(|w| event_time.saturating_sub(w))
    }
}

/// Decode a rule from its JSON form.
pub fn decode_rule(json: &str) -> CoreResult<Rule> {
    serde_json::from_str(json).map_err(|e| {
        StructError::from(CoreReason::RuleDecode).with_detail(e.to_string())
    })
}

// ---------------------------------------------------------------------------
// RuleRecord: wire form
// ---------------------------------------------------------------------------

/// Flat wire representation of a rule, as carried on the control plane and
/// emitted by rule export.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleRecord {
    pub rule_id: RuleId,
    pub rule_state: RuleState,
    #[serde(default)]
    pub grouping_key_names: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aggregate_field_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aggregator_function_type: Option<AggregatorFunction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit_operator_type: Option<LimitOperator>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub window_minutes: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub control_type: Option<ControlType>,
}

impl TryFrom<RuleRecord> for Rule {
    type Error = RuleDecodeError;

    fn try_from(rec: RuleRecord) -> Result<Self, Self::Error> {
        let rule_id = rec.rule_id;
        let missing = |field| RuleDecodeError::MissingField { rule_id, field };

        let kind = match rec.rule_state {
            RuleState::Control => {
                RuleKind::Control(rec.control_type.ok_or_else(|| missing("controlType"))?)
            }
            RuleState::Delete => RuleKind::Tombstone,
            RuleState::Active | RuleState::Paused => {
                let name = rec
                    .aggregate_field_name
                    .ok_or_else(|| missing("aggregateFieldName"))?;
                let field = AggregateField::from_name(&name)
                    .ok_or(RuleDecodeError::UnknownAggregateField { rule_id, name })?;
                let operator = rec
                    .limit_operator_type
                    .ok_or_else(|| missing("limitOperatorType"))?;
                let limit = rec.limit.ok_or_else(|| missing("limit"))?;
                let window_minutes = rec.window_minutes.ok_or_else(|| missing("windowMinutes"))?;
                let window_millis = window_minutes
                    .checked_mul(MILLIS_PER_MINUTE)
                    .and_then(|ms| i64::try_from(ms).ok())
                    .ok_or(RuleDecodeError::WindowTooLarge {
                        rule_id,
                        minutes: window_minutes,
                    })?;
                RuleKind::Aggregate(AggregateSpec {
                    field,
                    function: rec.aggregator_function_type.unwrap_or_default(),
                    operator,
                    limit,
                    window_minutes,
                    window_millis,
                })
            }
        };

        Ok(Rule {
            id: rule_id,
            state: rec.rule_state,
            grouping_key_names: rec.grouping_key_names,
            kind,
        })
    }
}

impl From<Rule> for RuleRecord {
    fn from(rule: Rule) -> Self {
        let mut rec = RuleRecord {
            rule_id: rule.id,
            rule_state: rule.state,
            grouping_key_names: rule.grouping_key_names,
            aggregate_field_name: None,
            aggregator_function_type: None,
            limit_operator_type: None,
            limit: None,
            window_minutes: None,
            control_type: None,
        };
        match rule.kind {
            RuleKind::Aggregate(spec) => {
                rec.aggregate_field_name = Some(spec.field.name().to_string());
                rec.aggregator_function_type = Some(spec.function);
                rec.limit_operator_type = Some(spec.operator);
                rec.limit = Some(spec.limit);
                rec.window_minutes = Some(spec.window_minutes);
            }
            RuleKind::Control(ct) => rec.control_type = Some(ct),
            RuleKind::Tombstone => {}
        }
        rec
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
