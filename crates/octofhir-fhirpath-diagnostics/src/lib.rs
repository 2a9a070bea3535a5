//! FHIRPath diagnostics
//!
//! Structured error codes, severities and source spans shared by the
//! value library and the evaluator.

mod diagnostic;
mod error_code;
mod span;

pub use diagnostic::*;
pub use error_code::*;
pub use span::*;
