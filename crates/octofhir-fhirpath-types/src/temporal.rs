//! Partial dates, date-times and times
//!
//! Every temporal value remembers the precision it was written with. Components
//! finer than that precision are unknown: they are never compared, never
//! printed, and arithmetic never invents them.
//!
//! Seconds and fractional seconds form a single precision level for
//! comparison purposes, so `10:00:00` and `10:00:00.000` compare equal.

use crate::quantity::{CalendarUnit, Quantity};
use crate::{SystemType, TypeError, TypeResult};
use chrono::{Datelike, Months, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta, Timelike};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::cmp::Ordering;
use std::fmt;

/// Precision for temporal values
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DateTimePrecision {
    Year,
    Month,
    Day,
    Hour,
    Minute,
    Second,
    Fraction,
}

impl fmt::Display for DateTimePrecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Year => "year",
            Self::Month => "month",
            Self::Day => "day",
            Self::Hour => "hour",
            Self::Minute => "minute",
            Self::Second => "second",
            Self::Fraction => "fraction",
        };
        f.write_str(name)
    }
}

/// Fractional seconds exactly as written: the value in nanoseconds plus the
/// number of digits that appeared after the decimal point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Fraction {
    pub nanos: u32,
    pub digits: u8,
}

impl Fraction {
    /// Keep only the written digits of `nanos`
    fn truncate(nanos: u32, digits: u8) -> Self {
        let scale = 10u32.pow(9 - u32::from(digits));
        Self {
            nanos: nanos / scale * scale,
            digits,
        }
    }
}

impl fmt::Display for Fraction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let padded = format!("{:09}", self.nanos);
        f.write_str(&padded[..usize::from(self.digits)])
    }
}

/// Known components, most significant first. Seconds and fraction share one slot.
type Components = SmallVec<[i64; 6]>;

fn compare_known(left: &[i64], right: &[i64]) -> Option<Ordering> {
    for (l, r) in left.iter().zip(right) {
        match l.cmp(r) {
            Ordering::Equal => continue,
            ord => return Some(ord),
        }
    }
    (left.len() == right.len()).then_some(Ordering::Equal)
}

fn equivalent_known(left: &[i64], right: &[i64]) -> bool {
    left.iter().zip(right).all(|(l, r)| l == r)
}

fn second_slot(second: u8, fraction: Option<Fraction>) -> i64 {
    i64::from(second) * 1_000_000_000 + i64::from(fraction.map_or(0, |f| f.nanos))
}

fn write_offset(f: &mut fmt::Formatter<'_>, offset: Option<i16>) -> fmt::Result {
    match offset {
        None => Ok(()),
        Some(0) => f.write_str("Z"),
        Some(minutes) => {
            let sign = if minutes < 0 { '-' } else { '+' };
            let abs = minutes.unsigned_abs();
            write!(f, "{sign}{:02}:{:02}", abs / 60, abs % 60)
        }
    }
}

fn write_time(
    f: &mut fmt::Formatter<'_>,
    hour: u8,
    minute: Option<u8>,
    second: Option<u8>,
    fraction: Option<Fraction>,
) -> fmt::Result {
    write!(f, "{hour:02}")?;
    if let Some(minute) = minute {
        write!(f, ":{minute:02}")?;
        if let Some(second) = second {
            write!(f, ":{second:02}")?;
            if let Some(fraction) = fraction {
                write!(f, ".{fraction}")?;
            }
        }
    }
    Ok(())
}

// ============================================================================
// Literal scanning
// ============================================================================

struct Scanner<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Scanner<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            bytes: text.as_bytes(),
            pos: 0,
        }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn eat(&mut self, byte: u8) -> bool {
        if self.peek() == Some(byte) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    /// Exactly `count` ASCII digits
    fn digits(&mut self, count: usize) -> Option<u32> {
        let slice = self.bytes.get(self.pos..self.pos + count)?;
        if !slice.iter().all(u8::is_ascii_digit) {
            return None;
        }
        self.pos += count;
        Some(slice.iter().fold(0, |acc, b| acc * 10 + u32::from(b - b'0')))
    }

    fn bounded(&mut self, count: usize, max: u32) -> Option<u8> {
        self.digits(count)
            .filter(|v| *v <= max)
            .and_then(|v| u8::try_from(v).ok())
    }

    fn fraction(&mut self) -> Option<Fraction> {
        let start = self.pos;
        while self.peek().is_some_and(|b| b.is_ascii_digit()) {
            self.pos += 1;
        }
        let written = &self.bytes[start..self.pos];
        if written.is_empty() || written.len() > 9 {
            return None;
        }
        let mut nanos = written.iter().fold(0u32, |acc, b| acc * 10 + u32::from(b - b'0'));
        for _ in written.len()..9 {
            nanos *= 10;
        }
        Some(Fraction {
            nanos,
            digits: u8::try_from(written.len()).ok()?,
        })
    }

    /// `Z` or `+hh:mm` / `-hh:mm`, in minutes
    fn offset(&mut self) -> Option<Option<i16>> {
        if self.eat(b'Z') {
            return Some(Some(0));
        }
        let sign = match self.peek() {
            Some(b'+') => 1,
            Some(b'-') => -1,
            _ => return Some(None),
        };
        self.pos += 1;
        let hours = self.bounded(2, 14)?;
        if !self.eat(b':') {
            return None;
        }
        let minutes = self.bounded(2, 59)?;
        Some(Some(sign * (i16::from(hours) * 60 + i16::from(minutes))))
    }

    /// `hh(:mm(:ss(.fff)?)?)?`
    #[allow(clippy::type_complexity)]
    fn time(&mut self) -> Option<(u8, Option<u8>, Option<u8>, Option<Fraction>)> {
        let hour = self.bounded(2, 23)?;
        let mut minute = None;
        let mut second = None;
        let mut fraction = None;
        if self.eat(b':') {
            minute = Some(self.bounded(2, 59)?);
            if self.eat(b':') {
                second = Some(self.bounded(2, 59)?);
                if self.eat(b'.') {
                    fraction = Some(self.fraction()?);
                }
            }
        }
        Some((hour, minute, second, fraction))
    }

    /// `YYYY(-MM(-DD)?)?` with calendar validation
    fn date(&mut self) -> Option<(i32, Option<u8>, Option<u8>)> {
        let year = i32::try_from(self.digits(4)?).ok()?;
        let mut month = None;
        let mut day = None;
        // '-hh:mm' after the year or month is an offset, not a component
        if self.peek() == Some(b'-') && self.bytes.get(self.pos + 3) != Some(&b':') {
            self.pos += 1;
            let m = self.bounded(2, 12).filter(|m| *m >= 1)?;
            month = Some(m);
            if self.peek() == Some(b'-') && self.bytes.get(self.pos + 3) != Some(&b':') {
                self.pos += 1;
                let d = self.bounded(2, 31).filter(|d| *d >= 1)?;
                NaiveDate::from_ymd_opt(year, u32::from(m), u32::from(d))?;
                day = Some(d);
            }
        }
        Some((year, month, day))
    }
}

fn naive_date(year: i32, month: Option<u8>, day: Option<u8>) -> TypeResult<NaiveDate> {
    NaiveDate::from_ymd_opt(
        year,
        u32::from(month.unwrap_or(1)),
        u32::from(day.unwrap_or(1)),
    )
    .ok_or_else(|| TypeError::overflow("date construction"))
}

fn naive_time(
    hour: u8,
    minute: Option<u8>,
    second: Option<u8>,
    fraction: Option<Fraction>,
) -> TypeResult<NaiveTime> {
    NaiveTime::from_hms_nano_opt(
        u32::from(hour),
        u32::from(minute.unwrap_or(0)),
        u32::from(second.unwrap_or(0)),
        fraction.map_or(0, |f| f.nanos),
    )
    .ok_or_else(|| TypeError::overflow("time construction"))
}

/// Shift an instant by a calendar quantity. Years and months follow the
/// calendar (clamping to the end of shorter months); everything else is a
/// fixed-length step.
fn shift(instant: NaiveDateTime, unit: CalendarUnit, amount: i64) -> TypeResult<NaiveDateTime> {
    let overflow = || TypeError::overflow(format!("adding {amount} {unit}"));
    let months = match unit {
        CalendarUnit::Year => Some(amount.checked_mul(12).ok_or_else(overflow)?),
        CalendarUnit::Month => Some(amount),
        _ => None,
    };
    if let Some(months) = months {
        let step = Months::new(u32::try_from(months.unsigned_abs()).map_err(|_| overflow())?);
        let shifted = if months >= 0 {
            instant.checked_add_months(step)
        } else {
            instant.checked_sub_months(step)
        };
        return shifted.ok_or_else(overflow);
    }
    let delta = match unit {
        CalendarUnit::Week => amount.checked_mul(7).and_then(TimeDelta::try_days),
        CalendarUnit::Day => TimeDelta::try_days(amount),
        CalendarUnit::Hour => TimeDelta::try_hours(amount),
        CalendarUnit::Minute => TimeDelta::try_minutes(amount),
        CalendarUnit::Second => TimeDelta::try_seconds(amount),
        CalendarUnit::Millisecond => TimeDelta::try_milliseconds(amount),
        CalendarUnit::Year | CalendarUnit::Month => None,
    }
    .ok_or_else(overflow)?;
    instant.checked_add_signed(delta).ok_or_else(overflow)
}

fn narrow(value: u32) -> u8 {
    u8::try_from(value).unwrap_or(u8::MAX)
}

// ============================================================================
// Date
// ============================================================================

/// A calendar date with year, month or day precision
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Date {
    pub year: i32,
    pub month: Option<u8>,
    pub day: Option<u8>,
    /// UTC offset in minutes
    pub offset: Option<i16>,
}

impl Date {
    pub fn new(year: i32, month: u8, day: u8) -> Self {
        Self {
            year,
            month: Some(month),
            day: Some(day),
            offset: None,
        }
    }

    pub fn year_only(year: i32) -> Self {
        Self {
            year,
            month: None,
            day: None,
            offset: None,
        }
    }

    pub fn year_month(year: i32, month: u8) -> Self {
        Self {
            year,
            month: Some(month),
            day: None,
            offset: None,
        }
    }

    pub fn from_naive(date: NaiveDate) -> Self {
        Self::new(date.year(), narrow(date.month()), narrow(date.day()))
    }

    pub fn precision(&self) -> DateTimePrecision {
        match (self.month, self.day) {
            (None, _) => DateTimePrecision::Year,
            (Some(_), None) => DateTimePrecision::Month,
            (Some(_), Some(_)) => DateTimePrecision::Day,
        }
    }

    /// Parse `YYYY(-MM(-DD)?)?` with an optional trailing offset
    pub fn parse(text: &str) -> TypeResult<Self> {
        Self::scan(text).ok_or_else(|| TypeError::parse(SystemType::Date, text))
    }

    fn scan(text: &str) -> Option<Self> {
        let mut scanner = Scanner::new(text);
        let (year, month, day) = scanner.date()?;
        let offset = scanner.offset()?;
        scanner.at_end().then_some(Self {
            year,
            month,
            day,
            offset,
        })
    }

    fn components(&self) -> Components {
        [Some(self.year), self.month.map(i32::from), self.day.map(i32::from)]
            .into_iter()
            .map_while(|c| c.map(i64::from))
            .collect()
    }

    /// Tri-state equality; `None` when precision or offset presence differ
    /// and the known components agree
    pub fn is_equal_to(&self, other: &Self) -> Option<bool> {
        self.compare_to(other).map(|ord| ord == Ordering::Equal)
    }

    /// Equal on every component both sides know
    pub fn is_equivalent_to(&self, other: &Self) -> bool {
        equivalent_known(&self.components(), &other.components())
    }

    pub fn compare_to(&self, other: &Self) -> Option<Ordering> {
        if self.offset.is_some() != other.offset.is_some() {
            return None;
        }
        compare_known(&self.components(), &other.components())
    }

    /// Total order over known components; a value sorts before every more
    /// precise value that shares its components
    pub fn collate(&self, other: &Self) -> Ordering {
        self.components().cmp(&other.components())
    }

    pub fn to_date_time(&self) -> DateTime {
        DateTime {
            year: self.year,
            month: self.month,
            day: self.day,
            hour: None,
            minute: None,
            second: None,
            fraction: None,
            offset: self.offset,
        }
    }

    pub fn add_quantity(&self, quantity: &Quantity) -> TypeResult<Self> {
        Ok(self.to_date_time().add_quantity(quantity)?.date())
    }

    pub fn subtract_quantity(&self, quantity: &Quantity) -> TypeResult<Self> {
        self.add_quantity(&quantity.negated())
    }
}

impl fmt::Display for Date {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}", self.year)?;
        if let Some(month) = self.month {
            write!(f, "-{month:02}")?;
            if let Some(day) = self.day {
                write!(f, "-{day:02}")?;
            }
        }
        write_offset(f, self.offset)
    }
}

// ============================================================================
// DateTime
// ============================================================================

/// A point in time with any precision from year to fractional seconds
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateTime {
    pub year: i32,
    pub month: Option<u8>,
    pub day: Option<u8>,
    pub hour: Option<u8>,
    pub minute: Option<u8>,
    pub second: Option<u8>,
    pub fraction: Option<Fraction>,
    /// UTC offset in minutes
    pub offset: Option<i16>,
}

impl DateTime {
    /// Full-precision value with millisecond fraction, as produced by `now()`
    pub fn from_chrono(instant: &chrono::DateTime<chrono::FixedOffset>) -> Self {
        let offset_minutes = instant.offset().local_minus_utc() / 60;
        Self {
            year: instant.year(),
            month: Some(narrow(instant.month())),
            day: Some(narrow(instant.day())),
            hour: Some(narrow(instant.hour())),
            minute: Some(narrow(instant.minute())),
            second: Some(narrow(instant.second())),
            fraction: Some(Fraction::truncate(instant.nanosecond() % 1_000_000_000, 3)),
            offset: i16::try_from(offset_minutes).ok(),
        }
    }

    pub fn precision(&self) -> DateTimePrecision {
        if self.fraction.is_some() {
            DateTimePrecision::Fraction
        } else if self.second.is_some() {
            DateTimePrecision::Second
        } else if self.minute.is_some() {
            DateTimePrecision::Minute
        } else if self.hour.is_some() {
            DateTimePrecision::Hour
        } else {
            self.date().precision()
        }
    }

    /// Parse a partial date-time:
    /// `YYYY(-MM(-DD(Thh(:mm(:ss(.fff)?)?)?)?)?)?` plus an optional offset.
    /// A trailing `T` after the date part is accepted.
    pub fn parse(text: &str) -> TypeResult<Self> {
        Self::scan(text).ok_or_else(|| TypeError::parse(SystemType::DateTime, text))
    }

    fn scan(text: &str) -> Option<Self> {
        let mut scanner = Scanner::new(text);
        let (year, month, day) = scanner.date()?;
        let mut value = Self {
            year,
            month,
            day,
            hour: None,
            minute: None,
            second: None,
            fraction: None,
            offset: None,
        };
        if scanner.eat(b'T') && day.is_some() && scanner.peek().is_some_and(|b| b.is_ascii_digit()) {
            let (hour, minute, second, fraction) = scanner.time()?;
            value.hour = Some(hour);
            value.minute = minute;
            value.second = second;
            value.fraction = fraction;
        }
        value.offset = scanner.offset()?;
        scanner.at_end().then_some(value)
    }

    /// The date part, keeping the offset
    pub fn date(&self) -> Date {
        Date {
            year: self.year,
            month: self.month,
            day: self.day,
            offset: self.offset,
        }
    }

    pub fn time(&self) -> Option<Time> {
        self.hour.map(|hour| Time {
            hour,
            minute: self.minute,
            second: self.second,
            fraction: self.fraction,
            offset: self.offset,
        })
    }

    fn to_naive(&self) -> TypeResult<NaiveDateTime> {
        let date = naive_date(self.year, self.month, self.day)?;
        let time = naive_time(self.hour.unwrap_or(0), self.minute, self.second, self.fraction)?;
        Ok(date.and_time(time))
    }

    /// Rebuild from an instant, keeping only the components `template` knows
    fn at_precision_of(template: &Self, instant: NaiveDateTime) -> Self {
        let known = |present: bool, value: u32| present.then(|| narrow(value));
        Self {
            year: instant.year(),
            month: known(template.month.is_some(), instant.month()),
            day: known(template.day.is_some(), instant.day()),
            hour: known(template.hour.is_some(), instant.hour()),
            minute: known(template.minute.is_some(), instant.minute()),
            second: known(template.second.is_some(), instant.second()),
            fraction: template
                .fraction
                .map(|f| Fraction::truncate(instant.nanosecond() % 1_000_000_000, f.digits)),
            offset: template.offset,
        }
    }

    /// Components in UTC when an offset and a time of day are known
    fn components(&self) -> Components {
        let source = match (self.offset, self.hour) {
            (Some(offset), Some(_)) if offset != 0 => self
                .to_naive()
                .ok()
                .and_then(|local| {
                    local.checked_sub_signed(TimeDelta::try_minutes(i64::from(offset))?)
                })
                .map(|utc| Self::at_precision_of(self, utc)),
            _ => None,
        };
        let value = source.as_ref().unwrap_or(self);
        let mut out: Components = [
            Some(value.year),
            value.month.map(i32::from),
            value.day.map(i32::from),
            value.hour.map(i32::from),
            value.minute.map(i32::from),
        ]
        .into_iter()
        .map_while(|c| c.map(i64::from))
        .collect();
        if out.len() == 5 {
            if let Some(second) = value.second {
                out.push(second_slot(second, value.fraction));
            }
        }
        out
    }

    /// Tri-state equality; `None` when precision or offset presence differ
    /// and the known components agree
    pub fn is_equal_to(&self, other: &Self) -> Option<bool> {
        self.compare_to(other).map(|ord| ord == Ordering::Equal)
    }

    /// Equal on every component both sides know
    pub fn is_equivalent_to(&self, other: &Self) -> bool {
        if self.offset.is_some() == other.offset.is_some() {
            equivalent_known(&self.components(), &other.components())
        } else {
            let strip = |v: &Self| Self { offset: None, ..v.clone() }.components();
            equivalent_known(&strip(self), &strip(other))
        }
    }

    pub fn compare_to(&self, other: &Self) -> Option<Ordering> {
        if self.offset.is_some() != other.offset.is_some() {
            return None;
        }
        compare_known(&self.components(), &other.components())
    }

    /// Total order over known components; a value sorts before every more
    /// precise value that shares its components
    pub fn collate(&self, other: &Self) -> Ordering {
        self.components().cmp(&other.components())
    }

    /// Calendar arithmetic. The result is rendered at the operand's precision
    /// and parsed back, so no precision is invented.
    pub fn add_quantity(&self, quantity: &Quantity) -> TypeResult<Self> {
        let (unit, amount) = CalendarUnit::from_quantity(quantity)?;
        let shifted = shift(self.to_naive()?, unit, amount)?;
        let rendered = Self::at_precision_of(self, shifted).to_string();
        Self::parse(&rendered).map_err(|_| TypeError::overflow(format!("{self} + {quantity}")))
    }

    pub fn subtract_quantity(&self, quantity: &Quantity) -> TypeResult<Self> {
        self.add_quantity(&quantity.negated())
    }
}

impl From<Date> for DateTime {
    fn from(date: Date) -> Self {
        date.to_date_time()
    }
}

impl fmt::Display for DateTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}", self.year)?;
        if let Some(month) = self.month {
            write!(f, "-{month:02}")?;
            if let Some(day) = self.day {
                write!(f, "-{day:02}")?;
                if let Some(hour) = self.hour {
                    f.write_str("T")?;
                    write_time(f, hour, self.minute, self.second, self.fraction)?;
                }
            }
        }
        write_offset(f, self.offset)
    }
}

// ============================================================================
// Time
// ============================================================================

/// A time of day with hour to fractional-second precision
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Time {
    pub hour: u8,
    pub minute: Option<u8>,
    pub second: Option<u8>,
    pub fraction: Option<Fraction>,
    /// UTC offset in minutes
    pub offset: Option<i16>,
}

impl Time {
    pub fn new(hour: u8, minute: u8, second: u8) -> Self {
        Self {
            hour,
            minute: Some(minute),
            second: Some(second),
            fraction: None,
            offset: None,
        }
    }

    pub fn hour_minute(hour: u8, minute: u8) -> Self {
        Self {
            hour,
            minute: Some(minute),
            second: None,
            fraction: None,
            offset: None,
        }
    }

    pub fn precision(&self) -> DateTimePrecision {
        if self.fraction.is_some() {
            DateTimePrecision::Fraction
        } else if self.second.is_some() {
            DateTimePrecision::Second
        } else if self.minute.is_some() {
            DateTimePrecision::Minute
        } else {
            DateTimePrecision::Hour
        }
    }

    /// Parse `hh(:mm(:ss(.fff)?)?)?` with an optional offset. A leading `T`
    /// is accepted.
    pub fn parse(text: &str) -> TypeResult<Self> {
        Self::scan(text).ok_or_else(|| TypeError::parse(SystemType::Time, text))
    }

    fn scan(text: &str) -> Option<Self> {
        let mut scanner = Scanner::new(text);
        scanner.eat(b'T');
        let (hour, minute, second, fraction) = scanner.time()?;
        let offset = scanner.offset()?;
        scanner.at_end().then_some(Self {
            hour,
            minute,
            second,
            fraction,
            offset,
        })
    }

    fn components(&self) -> Components {
        let mut out = Components::new();
        let (hour, minute) = match (self.offset, self.minute) {
            (Some(offset), Some(minute)) if offset != 0 => {
                let total = (i64::from(self.hour) * 60 + i64::from(minute) - i64::from(offset))
                    .rem_euclid(24 * 60);
                (total / 60, Some(total % 60))
            }
            _ => (i64::from(self.hour), self.minute.map(i64::from)),
        };
        out.push(hour);
        if let Some(minute) = minute {
            out.push(minute);
            if let Some(second) = self.second {
                out.push(second_slot(second, self.fraction));
            }
        }
        out
    }

    pub fn is_equal_to(&self, other: &Self) -> Option<bool> {
        self.compare_to(other).map(|ord| ord == Ordering::Equal)
    }

    pub fn is_equivalent_to(&self, other: &Self) -> bool {
        equivalent_known(&self.components(), &other.components())
    }

    pub fn compare_to(&self, other: &Self) -> Option<Ordering> {
        if self.offset.is_some() != other.offset.is_some() {
            return None;
        }
        compare_known(&self.components(), &other.components())
    }

    /// Total order over known components; a value sorts before every more
    /// precise value that shares its components
    pub fn collate(&self, other: &Self) -> Ordering {
        self.components().cmp(&other.components())
    }

    /// Time arithmetic wraps around midnight; only hour and finer units apply
    pub fn add_quantity(&self, quantity: &Quantity) -> TypeResult<Self> {
        let (unit, amount) = CalendarUnit::from_quantity(quantity)?;
        if unit < CalendarUnit::Hour {
            return Err(TypeError::InvalidDuration {
                unit: quantity.unit.clone(),
            });
        }
        let anchor = naive_date(2000, None, None)?
            .and_time(naive_time(self.hour, self.minute, self.second, self.fraction)?);
        let shifted = shift(anchor, unit, amount)?.time();
        let known = |present: bool, value: u32| present.then(|| narrow(value));
        let value = Self {
            hour: narrow(shifted.hour()),
            minute: known(self.minute.is_some(), shifted.minute()),
            second: known(self.second.is_some(), shifted.second()),
            fraction: self
                .fraction
                .map(|f| Fraction::truncate(shifted.nanosecond() % 1_000_000_000, f.digits)),
            offset: self.offset,
        };
        Self::parse(&value.to_string()).map_err(|_| TypeError::overflow(format!("{self} + {quantity}")))
    }

    pub fn subtract_quantity(&self, quantity: &Quantity) -> TypeResult<Self> {
        self.add_quantity(&quantity.negated())
    }
}

impl fmt::Display for Time {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_time(f, self.hour, self.minute, self.second, self.fraction)?;
        write_offset(f, self.offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rust_decimal::Decimal;

    fn dt(text: &str) -> DateTime {
        DateTime::parse(text).unwrap()
    }

    #[test]
    fn test_date_parse_and_display() {
        assert_eq!(Date::parse("2024").unwrap().precision(), DateTimePrecision::Year);
        assert_eq!(Date::parse("2024-02").unwrap(), Date::year_month(2024, 2));
        assert_eq!(Date::parse("2024-02-29").unwrap().to_string(), "2024-02-29");
        assert!(Date::parse("2023-02-29").is_err());
        assert!(Date::parse("2024-13").is_err());
        assert!(Date::parse("24-01-01").is_err());
        assert!(Date::parse("2024-1-01").is_err());
    }

    #[test]
    fn test_datetime_parse_precisions() {
        assert_eq!(dt("2020").precision(), DateTimePrecision::Year);
        assert_eq!(dt("2020-05-01T10").precision(), DateTimePrecision::Hour);
        assert_eq!(dt("2020-05-01T10:30:15").precision(), DateTimePrecision::Second);
        assert_eq!(dt("2020-05-01T10:30:15.25").precision(), DateTimePrecision::Fraction);
        assert_eq!(dt("2020-05-01T").to_string(), "2020-05-01");
        assert!(DateTime::parse("2020-05-01T25:00").is_err());
        assert!(DateTime::parse("2020-05-01T10:00+5").is_err());
    }

    #[test]
    fn test_datetime_offsets_round_trip() {
        for text in [
            "2020-05-01T10:30:15.250Z",
            "2020-05-01T10:30+05:30",
            "2020-05-01T10:30-08:00",
            "2020-05-01T10:30:15.1",
        ] {
            assert_eq!(dt(text).to_string(), text);
        }
    }

    #[test]
    fn test_partial_compare_is_indeterminate() {
        assert_eq!(dt("2020").compare_to(&dt("2020-05")), None);
        assert_eq!(dt("2020").compare_to(&dt("2021-05")), Some(Ordering::Less));
        assert_eq!(dt("2020-06").is_equal_to(&dt("2020-05-01")), Some(false));
        assert_eq!(dt("2020-05").is_equal_to(&dt("2020-05-01")), None);
    }

    #[test]
    fn test_seconds_and_fraction_share_precision() {
        assert_eq!(
            dt("2020-05-01T10:00:00").is_equal_to(&dt("2020-05-01T10:00:00.000")),
            Some(true)
        );
    }

    #[test]
    fn test_offset_normalization() {
        assert_eq!(
            dt("2020-05-01T10:00+02:00").is_equal_to(&dt("2020-05-01T08:00Z")),
            Some(true)
        );
        assert_eq!(dt("2020-05-01T10:00Z").is_equal_to(&dt("2020-05-01T10:00")), None);
        assert!(dt("2020-05-01T10:00Z").is_equivalent_to(&dt("2020-05-01T10:00")));
    }

    #[test]
    fn test_equivalence_uses_shared_precision() {
        assert!(dt("2020").is_equivalent_to(&dt("2020-05")));
        assert!(!dt("2020-04").is_equivalent_to(&dt("2020-05-01")));
    }

    #[test]
    fn test_month_arithmetic_clamps() {
        let q = Quantity::calendar(Decimal::ONE, "month");
        assert_eq!(dt("2020-01-31").add_quantity(&q).unwrap().to_string(), "2020-02-29");
    }

    #[test]
    fn test_arithmetic_keeps_precision() {
        let days = Quantity::calendar(Decimal::from(400), "days");
        assert_eq!(dt("2020").add_quantity(&days).unwrap().to_string(), "2021");
        let hours = Quantity::calendar(Decimal::from(25), "hours");
        assert_eq!(
            dt("2020-05-01T10:00+02:00").add_quantity(&hours).unwrap().to_string(),
            "2020-05-02T11:00+02:00"
        );
    }

    #[test]
    fn test_arithmetic_overflow_fails() {
        let years = Quantity::calendar(Decimal::from(9000), "years");
        assert!(matches!(
            dt("2020").add_quantity(&years),
            Err(TypeError::Overflow { .. })
        ));
    }

    #[test]
    fn test_time_wraps_midnight() {
        let t = Time::parse("23:30").unwrap();
        let q = Quantity::ucum(Decimal::from(45), "min");
        assert_eq!(t.add_quantity(&q).unwrap().to_string(), "00:15");
        let days = Quantity::calendar(Decimal::ONE, "day");
        assert!(t.add_quantity(&days).is_err());
    }

    #[test]
    fn test_date_subtract() {
        let date = Date::parse("2024-03-01").unwrap();
        let q = Quantity::calendar(Decimal::ONE, "day");
        assert_eq!(date.subtract_quantity(&q).unwrap().to_string(), "2024-02-29");
    }
}
