//! Quantities, calendar durations and ratios

use crate::value::{decimal_is_equal, decimal_is_equivalent, parse_decimal};
use crate::{SystemType, TypeError, TypeResult};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// The system a quantity's unit belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnitSystem {
    /// Unified Code for Units of Measure; written quoted (`5 'mg'`)
    Ucum,
    /// Calendar words (`4 days`)
    CalendarDuration,
    Unknown,
}

/// Time units usable in date/time arithmetic, coarsest first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CalendarUnit {
    Year,
    Month,
    Week,
    Day,
    Hour,
    Minute,
    Second,
    Millisecond,
}

impl CalendarUnit {
    /// Singular or plural calendar word
    pub fn from_word(word: &str) -> Option<Self> {
        let unit = match word.strip_suffix('s').unwrap_or(word) {
            "year" => Self::Year,
            "month" => Self::Month,
            "week" => Self::Week,
            "day" => Self::Day,
            "hour" => Self::Hour,
            "minute" => Self::Minute,
            "second" => Self::Second,
            "millisecond" => Self::Millisecond,
            _ => return None,
        };
        Some(unit)
    }

    /// UCUM definite-duration codes with a calendar counterpart. `a` and `mo`
    /// are mean lengths and are excluded.
    pub fn from_ucum(code: &str) -> Option<Self> {
        let unit = match code {
            "wk" => Self::Week,
            "d" => Self::Day,
            "h" => Self::Hour,
            "min" => Self::Minute,
            "s" => Self::Second,
            "ms" => Self::Millisecond,
            _ => return None,
        };
        Some(unit)
    }

    pub const fn word(&self) -> &'static str {
        match self {
            Self::Year => "year",
            Self::Month => "month",
            Self::Week => "week",
            Self::Day => "day",
            Self::Hour => "hour",
            Self::Minute => "minute",
            Self::Second => "second",
            Self::Millisecond => "millisecond",
        }
    }

    /// Unit and whole amount for date/time arithmetic. Fractional seconds
    /// become milliseconds; any other fraction is truncated toward zero.
    pub fn from_quantity(quantity: &Quantity) -> TypeResult<(Self, i64)> {
        let unit = match quantity.system {
            UnitSystem::CalendarDuration => Self::from_word(&quantity.unit),
            _ => Self::from_ucum(&quantity.unit),
        }
        .ok_or_else(|| TypeError::InvalidDuration {
            unit: quantity.unit.clone(),
        })?;
        let overflow = || TypeError::overflow(format!("duration {quantity}"));
        let (unit, amount) = if unit == Self::Second && !quantity.value.fract().is_zero() {
            let millis = quantity
                .value
                .checked_mul(Decimal::ONE_THOUSAND)
                .ok_or_else(overflow)?;
            (Self::Millisecond, millis)
        } else {
            (unit, quantity.value)
        };
        let amount = amount.trunc().to_i64().ok_or_else(overflow)?;
        Ok((unit, amount))
    }

    /// Length in seconds for fixed-length units; years and months count in
    /// months instead
    fn base(&self) -> (DurationBase, Decimal) {
        match self {
            Self::Year => (DurationBase::Months, Decimal::from(12)),
            Self::Month => (DurationBase::Months, Decimal::ONE),
            Self::Week => (DurationBase::Seconds, Decimal::from(604_800)),
            Self::Day => (DurationBase::Seconds, Decimal::from(86_400)),
            Self::Hour => (DurationBase::Seconds, Decimal::from(3_600)),
            Self::Minute => (DurationBase::Seconds, Decimal::from(60)),
            Self::Second => (DurationBase::Seconds, Decimal::ONE),
            Self::Millisecond => (DurationBase::Seconds, Decimal::new(1, 3)),
        }
    }
}

impl fmt::Display for CalendarUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.word())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DurationBase {
    Months,
    Seconds,
}

/// Seconds in a UCUM mean Julian year (`a`) and month (`mo`)
const SECONDS_PER_YEAR: i64 = 31_557_600;
const SECONDS_PER_MONTH: i64 = 2_629_800;

/// A decimal value with a unit
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Quantity {
    pub value: Decimal,
    pub unit: String,
    pub system: UnitSystem,
}

impl Quantity {
    /// Calendar words get the calendar system, anything else is UCUM
    pub fn new(value: Decimal, unit: impl Into<String>) -> Self {
        let unit = unit.into();
        let system = if CalendarUnit::from_word(&unit).is_some() {
            UnitSystem::CalendarDuration
        } else {
            UnitSystem::Ucum
        };
        Self {
            value,
            unit,
            system,
        }
    }

    pub fn ucum(value: Decimal, unit: impl Into<String>) -> Self {
        Self {
            value,
            unit: unit.into(),
            system: UnitSystem::Ucum,
        }
    }

    pub fn calendar(value: Decimal, word: impl Into<String>) -> Self {
        Self {
            value,
            unit: word.into(),
            system: UnitSystem::CalendarDuration,
        }
    }

    /// Dimensionless quantity with unit `1`
    pub fn unitless(value: Decimal) -> Self {
        Self::ucum(value, "1")
    }

    /// Parse `<decimal>`, `<decimal> '<ucum>'` or `<decimal> <calendar word>`
    pub fn parse(text: &str) -> TypeResult<Self> {
        let err = || TypeError::parse(SystemType::Quantity, text);
        let (number, rest) = match text.find([' ', '\'']) {
            Some(split) => (&text[..split], text[split..].trim_start()),
            None => (text, ""),
        };
        let value = parse_decimal(number).ok_or_else(err)?;
        if rest.is_empty() {
            return Ok(Self::unitless(value));
        }
        if let Some(unit) = rest.strip_prefix('\'').and_then(|r| r.strip_suffix('\'')) {
            if unit.is_empty() || unit.contains('\'') {
                return Err(err());
            }
            return Ok(Self::ucum(value, unit));
        }
        match CalendarUnit::from_word(rest) {
            Some(_) => Ok(Self::calendar(value, rest)),
            None => Err(err()),
        }
    }

    /// A UCUM definite-duration code or any calendar word
    pub fn is_duration(&self) -> bool {
        match self.system {
            UnitSystem::CalendarDuration => true,
            UnitSystem::Ucum => {
                matches!(self.unit.as_str(), "a" | "mo" | "wk" | "d" | "h" | "min" | "s" | "ms")
            }
            UnitSystem::Unknown => false,
        }
    }

    pub fn negated(&self) -> Self {
        Self {
            value: -self.value,
            ..self.clone()
        }
    }

    pub fn with_value(&self, value: Decimal) -> Self {
        Self {
            value,
            ..self.clone()
        }
    }

    /// Unit comparison key: calendar words lose their plural
    fn unit_key(&self) -> (UnitSystem, &str) {
        match self.system {
            UnitSystem::CalendarDuration => (
                self.system,
                CalendarUnit::from_word(&self.unit).map_or(self.unit.as_str(), |u| u.word()),
            ),
            _ => (self.system, self.unit.as_str()),
        }
    }

    fn same_unit(&self, other: &Self) -> bool {
        self.unit_key() == other.unit_key()
    }

    /// Base and factor used by equality and ordering. Calendar years and
    /// months are only comparable with each other.
    fn duration_base(&self) -> Option<(DurationBase, Decimal)> {
        match self.system {
            UnitSystem::CalendarDuration => CalendarUnit::from_word(&self.unit).map(|u| u.base()),
            UnitSystem::Ucum => match self.unit.as_str() {
                "a" => Some((DurationBase::Seconds, Decimal::from(SECONDS_PER_YEAR))),
                "mo" => Some((DurationBase::Seconds, Decimal::from(SECONDS_PER_MONTH))),
                code => CalendarUnit::from_ucum(code).map(|u| u.base()),
            },
            UnitSystem::Unknown => None,
        }
    }

    /// Length in seconds, treating calendar years and months as their UCUM
    /// mean lengths
    fn definite_seconds(&self) -> Option<Decimal> {
        let factor = match (self.system, CalendarUnit::from_word(&self.unit)) {
            (UnitSystem::CalendarDuration, Some(CalendarUnit::Year)) => {
                Decimal::from(SECONDS_PER_YEAR)
            }
            (UnitSystem::CalendarDuration, Some(CalendarUnit::Month)) => {
                Decimal::from(SECONDS_PER_MONTH)
            }
            _ => self.duration_base()?.1,
        };
        self.value.checked_mul(factor)
    }

    /// Both values in a common base, if the units are comparable durations
    fn normalized_pair(&self, other: &Self) -> Option<(Decimal, Decimal)> {
        if !(self.is_duration() && other.is_duration()) {
            return None;
        }
        let (left_base, left_factor) = self.duration_base()?;
        let (right_base, right_factor) = other.duration_base()?;
        if left_base != right_base {
            return None;
        }
        Some((
            self.value.checked_mul(left_factor)?,
            other.value.checked_mul(right_factor)?,
        ))
    }

    /// Tri-state equality. Different units are indeterminate unless both
    /// sides are durations of a common base.
    pub fn is_equal_to(&self, other: &Self) -> Option<bool> {
        if self.same_unit(other) {
            return Some(decimal_is_equal(self.value, other.value));
        }
        self.normalized_pair(other)
            .map(|(left, right)| decimal_is_equal(left, right))
    }

    /// Duration units are interchangeable: `60 'min'` ~ `1 hour`
    pub fn is_equivalent_to(&self, other: &Self) -> bool {
        if self.same_unit(other) {
            return decimal_is_equivalent(self.value, other.value);
        }
        if !(self.is_duration() && other.is_duration()) {
            return false;
        }
        match (self.definite_seconds(), other.definite_seconds()) {
            (Some(left), Some(right)) => decimal_is_equivalent(left, right),
            _ => false,
        }
    }

    pub fn compare_to(&self, other: &Self) -> Option<Ordering> {
        if self.same_unit(other) {
            return Some(self.value.cmp(&other.value));
        }
        self.normalized_pair(other)
            .map(|(left, right)| left.cmp(&right))
    }

    /// `other` expressed in this quantity's unit
    fn aligned(&self, other: &Self) -> TypeResult<Decimal> {
        if self.same_unit(other) {
            return Ok(other.value);
        }
        let incompatible = || TypeError::IncompatibleUnits {
            left: self.unit.clone(),
            right: other.unit.clone(),
        };
        let (_, right) = self.normalized_pair(other).ok_or_else(incompatible)?;
        let (_, factor) = self.duration_base().ok_or_else(incompatible)?;
        // converted values carry no representation scale of their own
        right
            .checked_div(factor)
            .map(|value| value.normalize())
            .ok_or_else(|| TypeError::overflow("unit conversion"))
    }

    /// This quantity expressed in `unit`, for interchangeable duration units
    pub fn convert_to(&self, unit: &str) -> TypeResult<Self> {
        let target = Self::new(Decimal::ONE, unit);
        let value = target.aligned(self)?;
        Ok(target.with_value(value))
    }

    pub fn add(&self, other: &Self) -> TypeResult<Self> {
        let right = self.aligned(other)?;
        self.value
            .checked_add(right)
            .map(|value| self.with_value(value))
            .ok_or_else(|| TypeError::overflow(format!("{self} + {other}")))
    }

    pub fn subtract(&self, other: &Self) -> TypeResult<Self> {
        self.add(&other.negated())
    }

    pub fn multiply(&self, other: &Self) -> TypeResult<Self> {
        let value = self
            .value
            .checked_mul(other.value)
            .ok_or_else(|| TypeError::overflow(format!("{self} * {other}")))?;
        let unit = match (self.unit.as_str(), other.unit.as_str()) {
            ("1", unit) | (unit, "1") => unit.to_string(),
            (left, right) => format!("{left}.{right}"),
        };
        Ok(Self::ucum(value, unit))
    }

    /// `None` on division by zero
    pub fn divide(&self, other: &Self) -> TypeResult<Option<Self>> {
        if other.value.is_zero() {
            return Ok(None);
        }
        let (left, right, unit) = if self.same_unit(other) {
            (self.value, other.value, "1".to_string())
        } else if let Some((left, right)) = self.normalized_pair(other) {
            (left, right, "1".to_string())
        } else if other.unit == "1" {
            (self.value, other.value, self.unit.clone())
        } else {
            (self.value, other.value, format!("{}/{}", self.unit, other.unit))
        };
        let value = left
            .checked_div(right)
            .ok_or_else(|| TypeError::overflow(format!("{self} / {other}")))?;
        Ok(Some(Self {
            value,
            unit,
            system: if self.system == UnitSystem::CalendarDuration && other.unit == "1" {
                UnitSystem::CalendarDuration
            } else {
                UnitSystem::Ucum
            },
        }))
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.system {
            UnitSystem::CalendarDuration => write!(f, "{} {}", self.value, self.unit),
            _ => write!(f, "{} '{}'", self.value, self.unit),
        }
    }
}

/// A ratio of two quantities, written `<quantity>:<quantity>`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Ratio {
    pub numerator: Quantity,
    pub denominator: Quantity,
}

impl Ratio {
    pub fn new(numerator: Quantity, denominator: Quantity) -> Self {
        Self {
            numerator,
            denominator,
        }
    }

    pub fn parse(text: &str) -> TypeResult<Self> {
        let (numerator, denominator) = text
            .split_once(':')
            .ok_or_else(|| TypeError::parse(SystemType::Ratio, text))?;
        let part = |p: &str| Quantity::parse(p).map_err(|_| TypeError::parse(SystemType::Ratio, text));
        Ok(Self::new(part(numerator)?, part(denominator)?))
    }

    pub fn is_equal_to(&self, other: &Self) -> Option<bool> {
        match (
            self.numerator.is_equal_to(&other.numerator),
            self.denominator.is_equal_to(&other.denominator),
        ) {
            (Some(false), _) | (_, Some(false)) => Some(false),
            (Some(true), Some(true)) => Some(true),
            _ => None,
        }
    }

    pub fn is_equivalent_to(&self, other: &Self) -> bool {
        self.numerator.is_equivalent_to(&other.numerator)
            && self.denominator.is_equivalent_to(&other.denominator)
    }
}

impl fmt::Display for Ratio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.numerator, self.denominator)
    }
}
