//! FHIRPath primitive values
//!
//! This module defines the `Value` enum and the three comparison relations
//! that FHIRPath keeps apart:
//! - equality (`=`): tri-state, representation-sensitive
//! - equivalence (`~`): always decidable, forgiving about case, scale and precision
//! - ordering (`<` and friends): tri-state, fails for unordered types

use crate::{
    Code, Concept, Date, DateTime, Quantity, Ratio, SystemType, Time, TypeError, TypeResult,
};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::cmp::Ordering;
use std::fmt;
use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

/// Fractional digits that take part in decimal equality
const DECIMAL_EQUALITY_SCALE: u32 = 8;

/// An immutable primitive value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum Value {
    Boolean(bool),
    String(String),
    Integer(i32),
    Long(i64),
    Decimal(Decimal),
    Date(Date),
    DateTime(DateTime),
    Time(Time),
    Quantity(Quantity),
    Ratio(Ratio),
    Code(Code),
    Concept(Concept),
}

impl Value {
    pub fn system_type(&self) -> SystemType {
        match self {
            Self::Boolean(_) => SystemType::Boolean,
            Self::String(_) => SystemType::String,
            Self::Integer(_) => SystemType::Integer,
            Self::Long(_) => SystemType::Long,
            Self::Decimal(_) => SystemType::Decimal,
            Self::Date(_) => SystemType::Date,
            Self::DateTime(_) => SystemType::DateTime,
            Self::Time(_) => SystemType::Time,
            Self::Quantity(_) => SystemType::Quantity,
            Self::Ratio(_) => SystemType::Ratio,
            Self::Code(_) => SystemType::Code,
            Self::Concept(_) => SystemType::Concept,
        }
    }

    pub fn string(value: impl Into<String>) -> Self {
        Self::String(value.into())
    }

    pub fn as_boolean(&self) -> Option<bool> {
        match self {
            Self::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i32> {
        match self {
            Self::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Long, or an Integer promoted to Long
    pub fn as_long(&self) -> Option<i64> {
        match self {
            Self::Long(l) => Some(*l),
            Self::Integer(i) => Some(i64::from(*i)),
            _ => None,
        }
    }

    /// Decimal, or an Integer/Long promoted to Decimal
    pub fn as_decimal(&self) -> Option<Decimal> {
        match self {
            Self::Decimal(d) => Some(*d),
            Self::Integer(i) => Some(Decimal::from(*i)),
            Self::Long(l) => Some(Decimal::from(*l)),
            _ => None,
        }
    }

    pub fn as_quantity(&self) -> Option<&Quantity> {
        match self {
            Self::Quantity(q) => Some(q),
            _ => None,
        }
    }

    /// Parse `text` with the literal grammar of `target`
    pub fn parse(target: SystemType, text: &str) -> TypeResult<Self> {
        let err = || TypeError::parse(target, text);
        let value = match target {
            SystemType::Boolean => match text {
                "true" => Self::Boolean(true),
                "false" => Self::Boolean(false),
                _ => return Err(err()),
            },
            SystemType::String => Self::String(text.to_string()),
            SystemType::Integer => Self::Integer(
                integer_text(text)
                    .and_then(|t| t.parse().ok())
                    .ok_or_else(err)?,
            ),
            SystemType::Long => Self::Long(
                integer_text(text.strip_suffix('L').unwrap_or(text))
                    .and_then(|t| t.parse().ok())
                    .ok_or_else(err)?,
            ),
            SystemType::Decimal => Self::Decimal(parse_decimal(text).ok_or_else(err)?),
            SystemType::Date => Self::Date(Date::parse(text)?),
            SystemType::DateTime => Self::DateTime(DateTime::parse(text)?),
            SystemType::Time => Self::Time(Time::parse(text)?),
            SystemType::Quantity => Self::Quantity(Quantity::parse(text)?),
            SystemType::Ratio => Self::Ratio(Ratio::parse(text)?),
            SystemType::Code | SystemType::Concept => return Err(err()),
        };
        Ok(value)
    }

    pub fn try_parse(target: SystemType, text: &str) -> Option<Self> {
        Self::parse(target, text).ok()
    }

    /// Tri-state equality used by `=` and `!=`. `None` means indeterminate.
    ///
    /// Values of unrelated types are simply not equal.
    pub fn is_equal_to(&self, other: &Self) -> Option<bool> {
        let Some((left, right)) = promote(self, other) else {
            return Some(false);
        };
        match (left.as_ref(), right.as_ref()) {
            (Self::Decimal(a), Self::Decimal(b)) => Some(decimal_is_equal(*a, *b)),
            (Self::Date(a), Self::Date(b)) => a.is_equal_to(b),
            (Self::DateTime(a), Self::DateTime(b)) => a.is_equal_to(b),
            (Self::Time(a), Self::Time(b)) => a.is_equal_to(b),
            (Self::Quantity(a), Self::Quantity(b)) => a.is_equal_to(b),
            (Self::Ratio(a), Self::Ratio(b)) => a.is_equal_to(b),
            (Self::Code(a), Self::Code(b)) => Some(a.is_equal_to(b)),
            (Self::Concept(a), Self::Concept(b)) => Some(a.is_equal_to(b)),
            (left, right) => Some(left == right),
        }
    }

    /// Equivalence used by `~` and `!~`; never indeterminate
    pub fn is_equivalent_to(&self, other: &Self) -> bool {
        let Some((left, right)) = promote(self, other) else {
            return false;
        };
        match (left.as_ref(), right.as_ref()) {
            (Self::String(a), Self::String(b)) => {
                normalize_for_equivalence(a) == normalize_for_equivalence(b)
            }
            (Self::Decimal(a), Self::Decimal(b)) => decimal_is_equivalent(*a, *b),
            (Self::Date(a), Self::Date(b)) => a.is_equivalent_to(b),
            (Self::DateTime(a), Self::DateTime(b)) => a.is_equivalent_to(b),
            (Self::Time(a), Self::Time(b)) => a.is_equivalent_to(b),
            (Self::Quantity(a), Self::Quantity(b)) => a.is_equivalent_to(b),
            (Self::Ratio(a), Self::Ratio(b)) => a.is_equivalent_to(b),
            (Self::Code(a), Self::Code(b)) => a.is_equivalent_to(b),
            (Self::Concept(a), Self::Concept(b)) => a.is_equivalent_to(b),
            (left, right) => left == right,
        }
    }

    /// Ordering. `Ok(None)` is indeterminate (partial precision, unrelated
    /// units); unordered or unrelated types are an error.
    pub fn compare_to(&self, other: &Self) -> TypeResult<Option<Ordering>> {
        let incomparable = || TypeError::Incomparable {
            left: self.system_type(),
            right: other.system_type(),
        };
        let (left, right) = promote(self, other).ok_or_else(incomparable)?;
        let ordering = match (left.as_ref(), right.as_ref()) {
            (Self::String(a), Self::String(b)) => Some(a.cmp(b)),
            (Self::Integer(a), Self::Integer(b)) => Some(a.cmp(b)),
            (Self::Long(a), Self::Long(b)) => Some(a.cmp(b)),
            (Self::Decimal(a), Self::Decimal(b)) => Some(a.cmp(b)),
            (Self::Date(a), Self::Date(b)) => a.compare_to(b),
            (Self::DateTime(a), Self::DateTime(b)) => a.compare_to(b),
            (Self::Time(a), Self::Time(b)) => a.compare_to(b),
            (Self::Quantity(a), Self::Quantity(b)) => a.compare_to(b),
            _ => return Err(incomparable()),
        };
        Ok(ordering)
    }

    /// Total order used by `sort`. Agrees with [`Value::compare_to`]
    /// wherever that is determinate; partial temporal values sort before
    /// more precise values sharing their components. Pairs with no order
    /// at all (different kinds, unrelated units) are an error.
    pub fn collate(&self, other: &Self) -> TypeResult<Ordering> {
        let incomparable = || TypeError::Incomparable {
            left: self.system_type(),
            right: other.system_type(),
        };
        let (left, right) = promote(self, other).ok_or_else(incomparable)?;
        match (left.as_ref(), right.as_ref()) {
            (Self::Date(a), Self::Date(b)) => Ok(a.collate(b)),
            (Self::DateTime(a), Self::DateTime(b)) => Ok(a.collate(b)),
            (Self::Time(a), Self::Time(b)) => Ok(a.collate(b)),
            _ => self.compare_to(other)?.ok_or_else(incomparable),
        }
    }

    /// Representation-sensitive identity: same variant and same written
    /// form, so `1.10` and `1.1` differ.
    pub fn strict_equals(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Decimal(a), Self::Decimal(b)) => a == b && a.scale() == b.scale(),
            (Self::Quantity(a), Self::Quantity(b)) => {
                a == b && a.value.scale() == b.value.scale()
            }
            _ => self == other,
        }
    }
}

/// Bring two values to a common type using implicit promotions
fn promote<'a>(left: &'a Value, right: &'a Value) -> Option<(Cow<'a, Value>, Cow<'a, Value>)> {
    let (lt, rt) = (left.system_type(), right.system_type());
    if lt == rt {
        return Some((Cow::Borrowed(left), Cow::Borrowed(right)));
    }
    if lt.can_implicitly_convert_to(rt) {
        return Some((Cow::Owned(left.implicit_convert(rt)?), Cow::Borrowed(right)));
    }
    if rt.can_implicitly_convert_to(lt) {
        return Some((Cow::Borrowed(left), Cow::Owned(right.implicit_convert(lt)?)));
    }
    None
}

/// `[+-]?digits`
fn integer_text(text: &str) -> Option<&str> {
    let digits = text.strip_prefix(['+', '-']).unwrap_or(text);
    (!digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())).then_some(text)
}

/// Parse the decimal literal grammar `-?digits(.digits)?`, keeping the
/// written scale
pub(crate) fn parse_decimal(text: &str) -> Option<Decimal> {
    let unsigned = text.strip_prefix('-').unwrap_or(text);
    let (whole, fraction) = match unsigned.split_once('.') {
        Some((whole, fraction)) => (whole, Some(fraction)),
        None => (unsigned, None),
    };
    let all_digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
    if !all_digits(whole) || !fraction.is_none_or(all_digits) {
        return None;
    }
    Decimal::from_str_exact(text).ok()
}

/// Decimal equality: trailing zeros are irrelevant and only the first eight
/// fractional digits count
pub fn decimal_is_equal(left: Decimal, right: Decimal) -> bool {
    let round = |d: Decimal| {
        d.round_dp_with_strategy(DECIMAL_EQUALITY_SCALE, RoundingStrategy::MidpointAwayFromZero)
    };
    round(left) == round(right)
}

/// Decimal equivalence: both sides rounded to the lesser scale
pub fn decimal_is_equivalent(left: Decimal, right: Decimal) -> bool {
    let scale = left.scale().min(right.scale());
    let round = |d: Decimal| d.round_dp_with_strategy(scale, RoundingStrategy::MidpointAwayFromZero);
    round(left) == round(right)
}

/// Lower-cased, diacritics stripped, whitespace runs collapsed to one space
pub fn normalize_for_equivalence(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_space = false;
    for ch in text.nfd().filter(|c| !is_combining_mark(*c)) {
        if ch.is_whitespace() {
            if !in_space {
                out.push(' ');
            }
            in_space = true;
        } else {
            out.extend(ch.to_lowercase());
            in_space = false;
        }
    }
    out
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Boolean(b) => write!(f, "{b}"),
            Self::String(s) => f.write_str(s),
            Self::Integer(i) => write!(f, "{i}"),
            Self::Long(l) => write!(f, "{l}"),
            Self::Decimal(d) => write!(f, "{d}"),
            Self::Date(d) => write!(f, "{d}"),
            Self::DateTime(dt) => write!(f, "{dt}"),
            Self::Time(t) => write!(f, "{t}"),
            Self::Quantity(q) => write!(f, "{q}"),
            Self::Ratio(r) => write!(f, "{r}"),
            Self::Code(c) => write!(f, "{c}"),
            Self::Concept(c) => write!(f, "{c}"),
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Self::Integer(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Long(value)
    }
}

impl From<Decimal> for Value {
    fn from(value: Decimal) -> Self {
        Self::Decimal(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<Date> for Value {
    fn from(value: Date) -> Self {
        Self::Date(value)
    }
}

impl From<DateTime> for Value {
    fn from(value: DateTime) -> Self {
        Self::DateTime(value)
    }
}

impl From<Time> for Value {
    fn from(value: Time) -> Self {
        Self::Time(value)
    }
}

impl From<Quantity> for Value {
    fn from(value: Quantity) -> Self {
        Self::Quantity(value)
    }
}

impl From<Code> for Value {
    fn from(value: Code) -> Self {
        Self::Code(value)
    }
}

impl From<Concept> for Value {
    fn from(value: Concept) -> Self {
        Self::Concept(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::str::FromStr;

    fn dec(text: &str) -> Value {
        Value::Decimal(Decimal::from_str(text).unwrap())
    }

    #[test]
    fn test_decimal_equality_ignores_trailing_zeros() {
        assert_eq!(dec("1.10").is_equal_to(&dec("1.1")), Some(true));
        assert!(!dec("1.10").strict_equals(&dec("1.1")));
        assert!(dec("1.10").strict_equals(&dec("1.10")));
    }

    #[test]
    fn test_decimal_equality_is_exact_to_eight_digits() {
        assert_eq!(dec("1.000000001").is_equal_to(&dec("1")), Some(true));
        assert_eq!(dec("1.00000001").is_equal_to(&dec("1")), Some(false));
    }

    #[test]
    fn test_decimal_equivalence_rounds_to_lesser_scale() {
        assert!(dec("1.15").is_equivalent_to(&dec("1.2")));
        assert!(!dec("1.14").is_equivalent_to(&dec("1.2")));
    }

    #[test]
    fn test_string_relations() {
        let cafe = Value::from("café");
        let upper = Value::from("CAFE");
        assert_eq!(cafe.is_equal_to(&upper), Some(false));
        assert!(cafe.is_equivalent_to(&upper));
        assert!(Value::from("a \t\n b").is_equivalent_to(&Value::from("A B")));
    }

    #[test]
    fn test_numeric_promotion() {
        assert_eq!(Value::Integer(1).is_equal_to(&dec("1.0")), Some(true));
        assert_eq!(Value::Integer(2).is_equal_to(&Value::Long(2)), Some(true));
        assert_eq!(
            Value::Long(3).compare_to(&dec("2.5")).unwrap(),
            Some(Ordering::Greater)
        );
    }

    #[test]
    fn test_unrelated_types() {
        assert_eq!(Value::Integer(1).is_equal_to(&Value::from("1")), Some(false));
        assert!(!Value::Integer(1).is_equivalent_to(&Value::from("1")));
        assert!(matches!(
            Value::Integer(1).compare_to(&Value::from("1")),
            Err(TypeError::Incomparable { .. })
        ));
        assert!(Value::Boolean(true).compare_to(&Value::Boolean(false)).is_err());
    }

    #[test]
    fn test_date_promotes_to_datetime() {
        let date = Value::parse(SystemType::Date, "2020-05-01").unwrap();
        let same = Value::parse(SystemType::DateTime, "2020-05-01").unwrap();
        let longer = Value::parse(SystemType::DateTime, "2020-05-01T10:00").unwrap();
        assert_eq!(date.is_equal_to(&same), Some(true));
        assert_eq!(date.is_equal_to(&longer), None);
    }

    #[test]
    fn test_collate_is_total_over_partial_dates() {
        let dt = |text: &str| Value::parse(SystemType::DateTime, text).unwrap();
        assert_eq!(dt("2020").collate(&dt("2020-05")).unwrap(), Ordering::Less);
        assert_eq!(dt("2020-05").collate(&dt("2020-01")).unwrap(), Ordering::Greater);
        assert_eq!(dt("2019-12").collate(&dt("2020")).unwrap(), Ordering::Less);
        let date = Value::parse(SystemType::Date, "2020-05-01").unwrap();
        assert_eq!(date.collate(&dt("2020-05-01T00:00")).unwrap(), Ordering::Less);
    }

    #[test]
    fn test_collate_rejects_unordered_pairs() {
        assert!(Value::Integer(1).collate(&Value::from("1")).is_err());
        let cm = Value::parse(SystemType::Quantity, "1 'cm'").unwrap();
        let kg = Value::parse(SystemType::Quantity, "1 'kg'").unwrap();
        assert!(cm.collate(&kg).is_err());
        assert_eq!(Value::Integer(2).collate(&dec("1.5")).unwrap(), Ordering::Greater);
    }

    #[test]
    fn test_parse_grammars() {
        assert_eq!(Value::parse(SystemType::Boolean, "true").unwrap(), Value::Boolean(true));
        assert!(Value::parse(SystemType::Boolean, "True").is_err());
        assert_eq!(Value::parse(SystemType::Integer, "-12").unwrap(), Value::Integer(-12));
        assert!(Value::parse(SystemType::Integer, "3000000000").is_err());
        assert_eq!(Value::parse(SystemType::Long, "3000000000L").unwrap(), Value::Long(3_000_000_000));
        assert!(Value::parse(SystemType::Decimal, "+1.5").is_err());
        assert!(Value::parse(SystemType::Decimal, ".5").is_err());
        assert!(Value::parse(SystemType::Decimal, "5.").is_err());
        assert!(Value::parse(SystemType::Code, "abc").is_err());
        assert_eq!(Value::try_parse(SystemType::Integer, "x"), None);
    }

    #[test]
    fn test_serde_shape() {
        let json = serde_json::to_value(Value::Integer(5)).unwrap();
        assert_eq!(json, serde_json::json!({"type": "Integer", "value": 5}));
    }
}
