//! FHIRPath evaluation
//!
//! Expressions are compiled once into a tree of [`Invokee`]s, bound against
//! a [`SymbolTable`], and then evaluated any number of times:
//!
//! ```ignore
//! use octofhir_fhirpath_eval::{EvaluationContext, FhirPathEngine};
//! use octofhir_fhirpath_ast::Expression;
//!
//! let engine = FhirPathEngine::new();
//! let expr = Expression::path("Patient.name.given").method("first", vec![]);
//! let compiled = engine.compile(&expr)?;
//! let given = engine.evaluate(&compiled, Some(patient), &EvaluationContext::new())?;
//! ```
//!
//! # Architecture
//!
//! - `registry`: functions and operators keyed by name and arity, with
//!   static binding or per-call overload dispatch
//! - `closure`: the scope arena of one evaluation session
//! - `compiler`: AST to invokee translation
//! - `functions`: the standard library
//! - `debug`: the optional per-step diagnostic hook
//!
//! # Three-valued logic
//!
//! An empty collection stands for "unknown". `and`, `or`, `xor` and
//! `implies` follow the usual truth tables, equality on incomparable
//! operands yields empty rather than `false`.

pub mod closure;
pub mod compiler;
pub mod context;
pub mod debug;
pub mod engine;
pub mod error;
pub mod functions;
pub mod invokee;
pub mod registry;

pub use closure::{Nested, Scope, Session};
pub use compiler::{CompiledExpression, CompilerOptions};
pub use context::{EvaluationContext, EvaluationContextBuilder, Tracer};
pub use debug::{DebugHook, DebugStep, RecordingHook};
pub use engine::FhirPathEngine;
pub use error::{EvalError, EvalResult};
pub use functions::{standard_symbols, standard_table};
pub use invokee::Invokee;
pub use registry::{Arg, Arity, ParamType, Propagation, SymbolTable};
