use orion_error::prelude::*;
use rust_decimal::Decimal;

use crate::error::{CoreReason, CoreResult};
use crate::model::{AggregateField, AggregatorFunction};

/// Folds integer field values into one aggregate.
///
/// Values are minor units (money) or `1` (counts); the decimal scale of the
/// field is applied only when the result is produced.
#[derive(Debug)]
pub struct Aggregator {
    function: AggregatorFunction,
    scale: u32,
    count: u64,
    sum: i128,
    min: Option<i64>,
    max: Option<i64>,
}

impl Aggregator {
    pub fn new(function: AggregatorFunction, field: AggregateField) -> Self {
        Self {
            function,
            scale: field.scale(),
            count: 0,
            sum: 0,
            min: None,
            max: None,
        }
    }

    pub fn add(&mut self, value: i64) {
        self.count += 1;
        self.sum += i128::from(value);
        self.min = Some(self.min.map_or(value, |m| m.min(value)));
        self.max = Some(self.max.map_or(value, |m| m.max(value)));
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn result(&self) -> CoreResult<Decimal> {
        let units = match self.function {
            AggregatorFunction::Sum => self.sum,
            AggregatorFunction::Avg => avg_rounded(self.sum, self.count),
            AggregatorFunction::Min => i128::from(self.min.unwrap_or(0)),
            AggregatorFunction::Max => i128::from(self.max.unwrap_or(0)),
        };
        Decimal::try_from_i128_with_scale(units, self.scale).map_err(|e| {
            StructError::from(CoreReason::DataFormat)
                .with_detail(format!("aggregate {units} out of decimal range: {e}"))
        })
    }
}

/// `sum / n` in integer units, midpoint rounded away from zero.
fn avg_rounded(sum: i128, n: u64) -> i128 {
    if n == 0 {
        return 0;
    }
    let n = i128::from(n);
    let quotient = sum / n;
    let remainder = sum % n;
    if remainder.abs() * 2 >= n {
        quotient + sum.signum()
    } else {
        quotient
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(function: AggregatorFunction, field: AggregateField, values: &[i64]) -> String {
        let mut agg = Aggregator::new(function, field);
        for v in values {
            agg.add(*v);
        }
        agg.result().unwrap().to_string()
    }

    #[test]
    fn sum_of_money_keeps_two_decimals() {
        assert_eq!(
            run(AggregatorFunction::Sum, AggregateField::PaymentAmount, &[1010, 2020]),
            "30.30"
        );
    }

    #[test]
    fn count_sums_units() {
        assert_eq!(run(AggregatorFunction::Sum, AggregateField::Count, &[1, 1, 1]), "3");
    }

    #[test]
    fn avg_rounds_half_away_from_zero() {
        assert_eq!(
            run(AggregatorFunction::Avg, AggregateField::PaymentAmount, &[1, 2]),
            "0.02"
        );
        assert_eq!(
            run(AggregatorFunction::Avg, AggregateField::PaymentAmount, &[-1, -2]),
            "-0.02"
        );
        assert_eq!(
            run(AggregatorFunction::Avg, AggregateField::PaymentAmount, &[100, 100, 101]),
            "1.00"
        );
    }

    #[test]
    fn empty_aggregates_are_zero() {
        for f in [
            AggregatorFunction::Sum,
            AggregatorFunction::Avg,
            AggregatorFunction::Min,
            AggregatorFunction::Max,
        ] {
            assert!(run(f, AggregateField::PaymentAmount, &[]).parse::<f64>().unwrap() == 0.0);
        }
    }

    #[test]
    fn min_and_max() {
        let vals = [500, -300, 1200];
        assert_eq!(run(AggregatorFunction::Min, AggregateField::PaymentAmount, &vals), "-3.00");
        assert_eq!(run(AggregatorFunction::Max, AggregateField::PaymentAmount, &vals), "12.00");
    }

    #[test]
    fn sum_does_not_overflow_i64() {
        let mut agg = Aggregator::new(AggregatorFunction::Sum, AggregateField::PaymentAmount);
        agg.add(i64::MAX);
        agg.add(i64::MAX);
        assert_eq!(agg.count(), 2);
        let expected = Decimal::from_i128_with_scale(i128::from(i64::MAX) * 2, 2);
        assert_eq!(agg.result().unwrap(), expected);
    }
}
