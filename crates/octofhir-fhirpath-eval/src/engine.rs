//! FHIRPath evaluation engine
//!
//! The engine owns a symbol table and compiler options. Compiled
//! expressions are independent of the engine that produced them and can be
//! evaluated any number of times, each evaluation getting its own session.

use crate::closure::Session;
use crate::compiler::{CompiledExpression, CompilerOptions, compile};
use crate::context::EvaluationContext;
use crate::error::{EvalError, EvalResult};
use crate::functions::{standard_symbols, to_boolean};
use crate::registry::SymbolTable;
use log::debug;
use octofhir_fhirpath_ast::Expression;
use octofhir_fhirpath_model::{Collection, Node};
use octofhir_fhirpath_types::Value;
use std::sync::Arc;

/// Compiles and evaluates FHIRPath expressions
#[derive(Clone)]
pub struct FhirPathEngine {
    symbols: Arc<SymbolTable>,
    options: CompilerOptions,
}

impl Default for FhirPathEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl FhirPathEngine {
    /// Engine over the shared standard library
    pub fn new() -> Self {
        Self::with_symbols(standard_symbols())
    }

    /// Engine over a caller-built table, e.g. the standard one plus extras
    pub fn with_symbols(symbols: Arc<SymbolTable>) -> Self {
        Self {
            symbols,
            options: CompilerOptions::default(),
        }
    }

    pub fn with_options(mut self, options: CompilerOptions) -> Self {
        self.options = options;
        self
    }

    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    pub fn options(&self) -> CompilerOptions {
        self.options
    }

    /// Bind every function and operator in `expression`
    pub fn compile(&self, expression: &Expression) -> EvalResult<CompiledExpression> {
        compile(&self.symbols, expression, self.options)
    }

    /// Evaluate against `root`, which becomes `$this`, `%context` and the
    /// starting point for `%resource` inference
    pub fn evaluate(
        &self,
        compiled: &CompiledExpression,
        root: Option<Node>,
        context: &EvaluationContext,
    ) -> EvalResult<Collection> {
        let session = Session::new(context);
        let scope = session.root(root);
        compiled.invokee().invoke(&scope).inspect_err(|err| {
            debug!("evaluation of `{}` failed: {err}", compiled.expression());
        })
    }

    /// Compile and evaluate in one step
    pub fn evaluate_expression(
        &self,
        expression: &Expression,
        root: Option<Node>,
        context: &EvaluationContext,
    ) -> EvalResult<Collection> {
        let compiled = self.compile(expression)?;
        self.evaluate(&compiled, root, context)
    }

    /// Boolean reading of the result; empty counts as `false`
    pub fn predicate(
        &self,
        compiled: &CompiledExpression,
        root: Option<Node>,
        context: &EvaluationContext,
    ) -> EvalResult<bool> {
        let result = self.evaluate(compiled, root, context)?;
        Ok(to_boolean(&result)?.unwrap_or(false))
    }

    /// The single value of the result, `None` when empty
    pub fn scalar(
        &self,
        compiled: &CompiledExpression,
        root: Option<Node>,
        context: &EvaluationContext,
    ) -> EvalResult<Option<Value>> {
        let result = self.evaluate(compiled, root, context)?;
        match result.as_slice() {
            [] => Ok(None),
            [node] => match node.value() {
                Some(value) => Ok(Some(value.clone())),
                None if node.is_null() => Ok(None),
                None => Err(EvalError::conversion(node, "a primitive value")),
            },
            many => Err(EvalError::cardinality("scalar result", many.len())),
        }
    }
}

impl std::fmt::Debug for FhirPathEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FhirPathEngine")
            .field("symbols", &self.symbols.len())
            .field("options", &self.options)
            .finish()
    }
}
