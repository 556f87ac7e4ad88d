use std::fmt;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Number of fractional digits in a monetary minor unit (cents).
pub const MONEY_SCALE: u32 = 2;

/// A monetary amount held as integer minor units.
///
/// Aggregation sums minor units so repeated additions never drift; the
/// decimal form only appears when a value is rendered or compared against a
/// rule limit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Money(i64);

impl Money {
    pub const ZERO: Money = Money(0);

    pub fn from_minor_units(units: i64) -> Self {
        Self(units)
    }

    pub fn minor_units(&self) -> i64 {
        self.0
    }

    /// Convert a decimal amount, rounding half away from zero to cents.
    ///
    /// Returns `None` when the amount does not fit in `i64` minor units.
    pub fn from_decimal(amount: Decimal) -> Option<Self> {
        let mut cents = amount.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero);
        cents.rescale(MONEY_SCALE);
        i64::try_from(cents.mantissa()).ok().map(Self)
    }

    pub fn to_decimal(&self) -> Decimal {
        minor_units_to_money(self.0)
    }
}

/// Render accumulated minor units as a fixed-point monetary value.
pub fn minor_units_to_money(units: i64) -> Decimal {
    Decimal::new(units, MONEY_SCALE)
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_decimal())
    }
}

impl Serialize for Money {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        Serialize::serialize(&self.to_decimal(), serializer)
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let amount = <Decimal as Deserialize>::deserialize(deserializer)?;
        Money::from_decimal(amount).ok_or_else(|| {
            serde::de::Error::custom(format!("monetary amount out of range: {amount}"))
        })
    }
}
