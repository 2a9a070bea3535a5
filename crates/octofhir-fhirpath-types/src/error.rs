//! Value library errors

use crate::SystemType;
use thiserror::Error;

/// Failures raised by parsing, conversion and arithmetic on values.
///
/// Indeterminate comparisons are not errors; they are reported as `None`
/// by the comparison relations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TypeError {
    #[error("'{input}' is not a valid {target} literal")]
    Parse { target: SystemType, input: String },

    #[error("cannot convert {from} '{value}' to {to}")]
    CannotConvert {
        from: SystemType,
        to: SystemType,
        value: String,
    },

    #[error("incompatible units '{left}' and '{right}'")]
    IncompatibleUnits { left: String, right: String },

    #[error("cannot compare {left} with {right}")]
    Incomparable { left: SystemType, right: SystemType },

    #[error("arithmetic overflow in {operation}")]
    Overflow { operation: String },

    #[error("'{unit}' cannot be used for calendar arithmetic")]
    InvalidDuration { unit: String },
}

impl TypeError {
    pub fn parse(target: SystemType, input: impl Into<String>) -> Self {
        Self::Parse {
            target,
            input: input.into(),
        }
    }

    pub fn overflow(operation: impl Into<String>) -> Self {
        Self::Overflow {
            operation: operation.into(),
        }
    }
}

pub type TypeResult<T> = Result<T, TypeError>;
