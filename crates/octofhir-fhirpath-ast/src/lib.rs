//! FHIRPath Abstract Syntax Tree definitions
//!
//! The evaluator does not parse source text. An external parser produces
//! these nodes; the builders here let hosts and tests assemble trees directly.

mod expression;
mod operator;
mod visitor;

pub use expression::*;
pub use operator::*;
pub use visitor::*;

pub use octofhir_fhirpath_diagnostics::Span;

/// Type alias for boxed expressions
pub type BoxExpr = Box<Expression>;
