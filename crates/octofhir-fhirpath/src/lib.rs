//! FHIRPath evaluation engine for Rust
//!
//! This crate bundles the pieces needed to run FHIRPath expressions:
//! - Primitive value types with equality, equivalence and ordering
//! - A data-tree abstraction and an in-memory JSON-backed tree
//! - A compiler from AST to closures and the standard function library
//! - Structured diagnostics and a step-by-step debug hook
//!
//! Expressions arrive as an AST; parsing source text is out of scope.
//!
//! # Example
//!
//! ```ignore
//! use octofhir_fhirpath::{Expression, evaluate_json};
//!
//! let patient = serde_json::json!({
//!     "resourceType": "Patient",
//!     "name": [{ "given": ["Peter", "James"] }]
//! });
//! let given = evaluate_json(&Expression::path("name.given"), &patient)?;
//! ```

// Re-export all public APIs from internal crates
pub use octofhir_fhirpath_ast as ast;
pub use octofhir_fhirpath_diagnostics as diagnostics;
pub use octofhir_fhirpath_eval as eval;
pub use octofhir_fhirpath_model as model;
pub use octofhir_fhirpath_types as types;

// Convenience re-exports
pub use octofhir_fhirpath_ast::{BinaryOp, Expression, UnaryOp};
pub use octofhir_fhirpath_diagnostics::{Diagnostic, ErrorCode, Severity};
pub use octofhir_fhirpath_eval::{
    CompiledExpression, CompilerOptions, DebugHook, DebugStep, EvalError, EvalResult,
    EvaluationContext, FhirPathEngine, RecordingHook, SymbolTable, Tracer,
};
pub use octofhir_fhirpath_model::{Collection, MemoryNode, Node, NodeBuilder};
pub use octofhir_fhirpath_types::{SystemType, Value};

/// Load a FHIR JSON resource as a root node
pub fn json_resource(resource: &serde_json::Value) -> EvalResult<Node> {
    let tree = MemoryNode::from_json(resource)
        .map_err(|err| EvalError::invalid_argument(err.to_string()))?;
    Ok(Node::element(tree))
}

/// Evaluate `expression` against a FHIR JSON resource with the standard
/// library and an empty context
pub fn evaluate_json(
    expression: &Expression,
    resource: &serde_json::Value,
) -> EvalResult<Collection> {
    let root = json_resource(resource)?;
    FhirPathEngine::new().evaluate_expression(expression, Some(root), &EvaluationContext::new())
}
