//! Math functions
//!
//! Results outside the domain of a function (`(-1).sqrt()`, `0.ln()`) are
//! empty. Integer results that do not fit are overflow errors.

use super::{DECIMAL, INTEGER, LONG, QUANTITY, empty, optional, single};
use crate::error::{EvalError, EvalResult};
use crate::registry::{Arg, Propagation, SymbolTable};
use octofhir_fhirpath_model::Collection;
use octofhir_fhirpath_types::{Decimal, Value};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{MathematicalOps, RoundingStrategy};

pub(super) fn register(table: &mut SymbolTable) {
    for param in [INTEGER, LONG, DECIMAL, QUANTITY] {
        table.add_native("abs", &[param], Propagation::Focus, |_, args| abs(&args[0]));
    }
    table
        .add_native("ceiling", &[DECIMAL], Propagation::Focus, |_, args| {
            to_integer(decimal(&args[0]).ceil(), "ceiling")
        })
        .add_native("floor", &[DECIMAL], Propagation::Focus, |_, args| {
            to_integer(decimal(&args[0]).floor(), "floor")
        })
        .add_native("truncate", &[DECIMAL], Propagation::Focus, |_, args| {
            to_integer(decimal(&args[0]).trunc(), "truncate")
        })
        .add_native("round", &[DECIMAL], Propagation::Focus, |_, args| {
            round(decimal(&args[0]), 0)
        })
        .add_native("round", &[DECIMAL, INTEGER], Propagation::All, |_, args| {
            let precision = args[1].as_integer().unwrap_or_default();
            let precision = u32::try_from(precision).map_err(|_| {
                EvalError::invalid_argument(format!("round precision {precision} is negative"))
            })?;
            round(decimal(&args[0]), precision)
        })
        .add_native("sqrt", &[DECIMAL], Propagation::Focus, |_, args| {
            optional(decimal(&args[0]).sqrt().map(Value::Decimal))
        })
        .add_native("exp", &[DECIMAL], Propagation::Focus, |_, args| {
            optional(decimal(&args[0]).checked_exp().map(Value::Decimal))
        })
        .add_native("ln", &[DECIMAL], Propagation::Focus, |_, args| {
            optional(ln(decimal(&args[0])).map(Value::Decimal))
        })
        .add_native("log", &[DECIMAL, DECIMAL], Propagation::All, |_, args| {
            let (value, base) = (decimal(&args[0]), decimal(&args[1]));
            let log = ln(value)
                .zip(ln(base))
                .and_then(|(value, base)| value.checked_div(base));
            optional(log.map(Value::Decimal))
        })
        .add_native("power", &[INTEGER, INTEGER], Propagation::All, |_, args| {
            let (base, exponent) = (
                args[0].as_integer().unwrap_or_default(),
                args[1].as_integer().unwrap_or_default(),
            );
            match u32::try_from(exponent) {
                Ok(exponent) => base
                    .checked_pow(exponent)
                    .map(|v| Collection::single(Value::Integer(v)))
                    .ok_or_else(|| EvalError::overflow(format!("{base}.power({exponent})"))),
                Err(_) => power(Decimal::from(base), Decimal::from(exponent)),
            }
        })
        .add_native("power", &[DECIMAL, DECIMAL], Propagation::All, |_, args| {
            power(decimal(&args[0]), decimal(&args[1]))
        });
}

fn decimal(arg: &Arg) -> Decimal {
    arg.value()
        .and_then(Value::as_decimal)
        .unwrap_or_default()
}

fn abs(arg: &Arg) -> EvalResult<Collection> {
    let value = match arg.value() {
        Some(Value::Integer(i)) => Value::Integer(
            i.checked_abs()
                .ok_or_else(|| EvalError::overflow(format!("{i}.abs()")))?,
        ),
        Some(Value::Long(l)) => Value::Long(
            l.checked_abs()
                .ok_or_else(|| EvalError::overflow(format!("{l}.abs()")))?,
        ),
        Some(Value::Decimal(d)) => Value::Decimal(d.abs()),
        Some(Value::Quantity(q)) => Value::Quantity(q.with_value(q.value.abs())),
        _ => return empty(),
    };
    single(value)
}

fn to_integer(value: Decimal, function: &str) -> EvalResult<Collection> {
    value
        .to_i32()
        .map(|i| Collection::single(Value::Integer(i)))
        .ok_or_else(|| EvalError::overflow(format!("{function}({value})")))
}

/// Half away from zero: `2.5` rounds to `3`, `-2.5` to `-3`
fn round(value: Decimal, precision: u32) -> EvalResult<Collection> {
    single(value.round_dp_with_strategy(precision, RoundingStrategy::MidpointAwayFromZero))
}

fn ln(value: Decimal) -> Option<Decimal> {
    if value <= Decimal::ZERO {
        return None;
    }
    value.checked_ln()
}

/// A negative base only takes integral exponents
fn power(base: Decimal, exponent: Decimal) -> EvalResult<Collection> {
    if base.is_sign_negative() && !exponent.fract().is_zero() {
        return empty();
    }
    let result = match exponent.to_i64() {
        Some(integral) if exponent.fract().is_zero() => base.checked_powi(integral),
        _ => base.checked_powd(exponent),
    };
    optional(result.map(Value::Decimal))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn dec(text: &str) -> Decimal {
        text.parse().unwrap()
    }

    fn first(items: EvalResult<Collection>) -> Option<Value> {
        items.unwrap().first().and_then(|n| n.value().cloned())
    }

    #[rstest]
    #[case("2.5", "3")]
    #[case("-2.5", "-3")]
    #[case("2.4", "2")]
    fn test_round_half_away_from_zero(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(first(round(dec(input), 0)), Some(Value::Decimal(dec(expected))));
    }

    #[test]
    fn test_integer_results_overflow() {
        assert!(matches!(
            to_integer(dec("3000000000.5").floor(), "floor"),
            Err(EvalError::Overflow { .. })
        ));
        assert_eq!(first(to_integer(dec("-1.5").ceil(), "ceiling")), Some(Value::Integer(-1)));
    }

    #[test]
    fn test_domain_errors_are_empty() {
        assert_eq!(ln(Decimal::ZERO), None);
        assert_eq!(ln(dec("-1")), None);
        assert!(power(dec("-8"), dec("0.5")).unwrap().is_empty());
        assert_eq!(first(power(dec("2"), dec("-1"))), Some(Value::Decimal(dec("0.5"))));
    }

    #[test]
    fn test_abs_keeps_the_type() {
        assert_eq!(first(abs(&Arg::Value(Value::Integer(-3)))), Some(Value::Integer(3)));
        assert!(abs(&Arg::Value(Value::Integer(i32::MIN))).is_err());
    }
}
