//! Evaluation errors for the FHIRPath engine

use octofhir_fhirpath_diagnostics::{
    Diagnostic, ErrorCode, FP0101, FP0102, FP0103, FP0104, FP0201, FP0202, FP0203, FP0204,
    FP0205, FP0206, FP0400, FP0401, Span,
};
use octofhir_fhirpath_types::TypeError;
use thiserror::Error;

/// Result type for evaluation operations
pub type EvalResult<T> = Result<T, EvalError>;

/// Errors that can occur while binding or evaluating an expression
///
/// Indeterminate comparisons are not errors; they evaluate to an empty
/// collection.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum EvalError {
    /// No function or operator with this name and arity
    #[error("Unknown function or operator: {name}/{arity}")]
    UnknownSymbol { name: String, arity: usize },

    /// Overloads exist but none accepts the runtime argument types
    #[error("No overload of {name} accepts ({types})")]
    NoMatchingOverload { name: String, types: String },

    #[error("Unknown variable: {name}")]
    UnknownVariable { name: String },

    #[error("Variable '{name}' is already defined")]
    VariableRedefined { name: String },

    /// An argument could not be converted to the declared parameter type
    #[error("Cannot convert {value} to {target}")]
    Conversion { value: String, target: String },

    /// More items than the operation allows
    #[error("Expected at most one item in {context}, found {count}")]
    Cardinality { context: String, count: usize },

    #[error("Invalid arithmetic: {message}")]
    InvalidArithmetic { message: String },

    #[error("Cannot compare {left} with {right}")]
    Incomparable { left: String, right: String },

    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },

    #[error("Arithmetic overflow in {operation}")]
    Overflow { operation: String },

    /// A tracer or debug hook failed
    #[error("Callback failed: {message}")]
    Callback { message: String },

    /// A failure raised inside a named function or operator
    #[error("{name}: {source}")]
    InFunction {
        name: String,
        #[source]
        source: Box<EvalError>,
    },

    /// Internal error (should not happen)
    #[error("Internal evaluation error: {message}")]
    Internal { message: String },
}

impl EvalError {
    pub fn unknown_symbol(name: impl Into<String>, arity: usize) -> Self {
        Self::UnknownSymbol {
            name: name.into(),
            arity,
        }
    }

    pub fn unknown_variable(name: impl Into<String>) -> Self {
        Self::UnknownVariable { name: name.into() }
    }

    pub fn conversion(value: impl ToString, target: impl ToString) -> Self {
        Self::Conversion {
            value: value.to_string(),
            target: target.to_string(),
        }
    }

    pub fn cardinality(context: impl Into<String>, count: usize) -> Self {
        Self::Cardinality {
            context: context.into(),
            count,
        }
    }

    pub fn invalid_arithmetic(message: impl Into<String>) -> Self {
        Self::InvalidArithmetic {
            message: message.into(),
        }
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    pub fn overflow(operation: impl Into<String>) -> Self {
        Self::Overflow {
            operation: operation.into(),
        }
    }

    /// Create a host callback error
    pub fn callback(message: impl Into<String>) -> Self {
        Self::Callback {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Tag with the originating function; an existing tag is kept
    pub fn in_function(self, name: &str) -> Self {
        match self {
            tagged @ Self::InFunction { .. } => tagged,
            other => Self::InFunction {
                name: name.to_string(),
                source: Box::new(other),
            },
        }
    }

    /// The error with any function tags removed
    pub fn root_cause(&self) -> &EvalError {
        match self {
            Self::InFunction { source, .. } => source.root_cause(),
            other => other,
        }
    }

    /// Name of the function or operator the failure came from
    pub fn function_name(&self) -> Option<&str> {
        match self {
            Self::InFunction { name, .. } => Some(name),
            _ => None,
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self.root_cause() {
            Self::UnknownSymbol { .. } => FP0101,
            Self::NoMatchingOverload { .. } => FP0102,
            Self::UnknownVariable { .. } => FP0103,
            Self::VariableRedefined { .. } => FP0104,
            Self::Conversion { .. } => FP0201,
            Self::Cardinality { .. } => FP0202,
            Self::InvalidArithmetic { .. } => FP0203,
            Self::Incomparable { .. } => FP0204,
            Self::InvalidArgument { .. } => FP0205,
            Self::Overflow { .. } => FP0206,
            Self::Callback { .. } => FP0401,
            Self::Internal { .. } | Self::InFunction { .. } => FP0400,
        }
    }

    /// Unknown-symbol class: failed name binding or overload selection
    pub fn is_bind_error(&self) -> bool {
        self.code().is_bind_error()
    }

    pub fn to_diagnostic(&self, span: Option<Span>) -> Diagnostic {
        let diagnostic = Diagnostic::error(self.code(), self.to_string());
        match span {
            Some(span) => diagnostic.with_span(span),
            None => diagnostic,
        }
    }
}

impl From<TypeError> for EvalError {
    fn from(err: TypeError) -> Self {
        match err {
            TypeError::Parse { target, input } => Self::conversion(format!("'{input}'"), target),
            TypeError::CannotConvert { to, value, .. } => Self::conversion(format!("'{value}'"), to),
            TypeError::IncompatibleUnits { left, right } => {
                Self::invalid_arithmetic(format!("incompatible units '{left}' and '{right}'"))
            }
            TypeError::Incomparable { left, right } => Self::Incomparable {
                left: left.to_string(),
                right: right.to_string(),
            },
            TypeError::Overflow { operation } => Self::overflow(operation),
            TypeError::InvalidDuration { unit } => {
                Self::invalid_arithmetic(format!("'{unit}' is not a calendar duration"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tagging_keeps_innermost_function() {
        let err = EvalError::cardinality("single", 3)
            .in_function("single")
            .in_function("where");
        assert_eq!(err.function_name(), Some("single"));
        assert_eq!(err.code(), FP0202);
        assert_eq!(err.to_string(), "single: Expected at most one item in single, found 3");
    }

    #[test]
    fn test_bind_class() {
        assert!(EvalError::unknown_symbol("foo", 1).is_bind_error());
        assert!(
            EvalError::NoMatchingOverload {
                name: "binary.+".into(),
                types: "Boolean, Boolean".into()
            }
            .in_function("binary.+")
            .is_bind_error()
        );
        assert!(!EvalError::overflow("+").is_bind_error());
    }

    #[test]
    fn test_type_errors_map_to_codes() {
        let err: EvalError = TypeError::IncompatibleUnits {
            left: "cm".into(),
            right: "kg".into(),
        }
        .into();
        assert_eq!(err.code(), FP0203);
        let diagnostic = err.to_diagnostic(Some(Span::new(0, 4)));
        assert!(diagnostic.is_error());
    }
}
