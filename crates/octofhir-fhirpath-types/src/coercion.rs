//! Type conversion rules
//!
//! Two layers:
//! - implicit promotions, applied silently by operators and overload
//!   resolution (Integer -> Long -> Decimal -> Quantity, Date -> DateTime,
//!   Code -> Concept)
//! - the explicit conversion matrix behind `toX()` / `convertsToX()`. It
//!   never clamps or rounds; anything outside the table fails.

use crate::{Concept, Quantity, SystemType, TypeError, TypeResult, Value};
use rust_decimal::Decimal;

impl Value {
    /// Apply an implicit promotion, `None` if `target` is not reachable
    pub fn implicit_convert(&self, target: SystemType) -> Option<Value> {
        if self.system_type() == target {
            return Some(self.clone());
        }
        if !self.system_type().can_implicitly_convert_to(target) {
            return None;
        }
        let promoted = match (self, target) {
            (Self::Integer(i), SystemType::Long) => Self::Long(i64::from(*i)),
            (Self::Integer(_) | Self::Long(_), SystemType::Decimal) => {
                Self::Decimal(self.as_decimal()?)
            }
            (Self::Integer(_) | Self::Long(_) | Self::Decimal(_), SystemType::Quantity) => {
                Self::Quantity(Quantity::unitless(self.as_decimal()?))
            }
            (Self::Date(d), SystemType::DateTime) => Self::DateTime(d.to_date_time()),
            (Self::Code(c), SystemType::Concept) => Self::Concept(Concept::from_code(c.clone())),
            _ => return None,
        };
        Some(promoted)
    }

    /// Explicit conversion through the fixed matrix
    pub fn try_convert_to(&self, target: SystemType) -> TypeResult<Value> {
        let from = self.system_type();
        if from == target {
            return Ok(self.clone());
        }
        let fail = || TypeError::CannotConvert {
            from,
            to: target,
            value: self.to_string(),
        };
        if let Self::String(text) = self {
            return Value::parse(target, text).map_err(|_| fail());
        }
        if target == SystemType::String {
            return match self {
                Self::Code(_) | Self::Concept(_) => Err(fail()),
                other => Ok(Self::String(other.to_string())),
            };
        }
        let converted = match (self, target) {
            (Self::Boolean(b), _) => bool_to(*b, target),
            (Self::Integer(i), SystemType::Boolean) => int_to_bool(i64::from(*i)),
            (Self::Long(l), SystemType::Boolean) => int_to_bool(*l),
            (Self::Long(l), SystemType::Integer) => i32::try_from(*l).ok().map(Self::Integer),
            (Self::Decimal(d), SystemType::Boolean) => {
                if *d == Decimal::ONE {
                    Some(Self::Boolean(true))
                } else if d.is_zero() {
                    Some(Self::Boolean(false))
                } else {
                    None
                }
            }
            (Self::DateTime(dt), SystemType::Date) => Some(Self::Date(dt.date())),
            _ => self.implicit_convert(target),
        };
        converted.ok_or_else(fail)
    }

    pub fn can_convert_to(&self, target: SystemType) -> bool {
        self.try_convert_to(target).is_ok()
    }
}

fn bool_to(value: bool, target: SystemType) -> Option<Value> {
    let number = i32::from(value);
    let converted = match target {
        SystemType::Integer => Value::Integer(number),
        SystemType::Long => Value::Long(i64::from(number)),
        SystemType::Decimal => Value::Decimal(Decimal::from(number)),
        SystemType::Quantity => Value::Quantity(Quantity::unitless(Decimal::from(number))),
        _ => return None,
    };
    Some(converted)
}

fn int_to_bool(value: i64) -> Option<Value> {
    match value {
        0 => Some(Value::Boolean(false)),
        1 => Some(Value::Boolean(true)),
        _ => None,
    }
}
