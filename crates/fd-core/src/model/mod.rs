mod envelope;
mod money;
mod rule;
mod transaction;

pub use envelope::Envelope;
pub use money::{MONEY_SCALE, Money, minor_units_to_money};
pub use rule::{
    AggregateField, AggregateSpec, AggregatorFunction, ControlType, LimitOperator, Rule,
    RuleDecodeError, RuleId, RuleKind, RuleRecord, RuleState, decode_rule,
};
pub use transaction::{PaymentType, Transaction};
