//! AST to invokee compilation
//!
//! Each AST node becomes one [`Invokee`]. Functions and operators are bound
//! through the [`SymbolTable`] once, here; evaluation never looks a name up
//! again. Unknown names therefore fail at compile time.

use crate::closure::{CONTEXT, INDEX, RESOURCE, ROOT_RESOURCE, THAT, THIS, TOTAL};
use crate::debug::{capture_focus, instrument};
use crate::error::{EvalError, EvalResult};
use crate::functions::index_into;
use crate::invokee::Invokee;
use crate::registry::SymbolTable;
use log::debug;
use octofhir_fhirpath_ast::{
    BinaryOpExpr, ChildAccess, Expression, FunctionCall, IndexerExpr, UnaryOpExpr, VariableRef,
    Visitor, walk_expression,
};
use octofhir_fhirpath_model::Collection;
use octofhir_fhirpath_types::Value;
use std::sync::Arc;

/// Compilation settings
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CompilerOptions {
    /// Wrap every node so the context's debug hook sees each step
    pub diagnostics: bool,
}

impl CompilerOptions {
    pub fn with_diagnostics() -> Self {
        Self { diagnostics: true }
    }
}

/// A bound expression, reusable across evaluations and threads
#[derive(Debug, Clone)]
pub struct CompiledExpression {
    expression: Arc<Expression>,
    invokee: Invokee,
    options: CompilerOptions,
}

impl CompiledExpression {
    pub fn expression(&self) -> &Expression {
        &self.expression
    }

    pub fn options(&self) -> CompilerOptions {
        self.options
    }

    pub(crate) fn invokee(&self) -> &Invokee {
        &self.invokee
    }
}

/// Compile `expression` against `symbols`
pub fn compile(
    symbols: &SymbolTable,
    expression: &Expression,
    options: CompilerOptions,
) -> EvalResult<CompiledExpression> {
    debug!("compiling `{expression}` (diagnostics: {})", options.diagnostics);
    let mut compiler = Compiler { symbols, options };
    let invokee = compiler.visit_expression(expression).inspect_err(|err| {
        debug!("compilation of `{expression}` failed: {err}");
    })?;
    Ok(CompiledExpression {
        expression: Arc::new(expression.clone()),
        invokee,
        options,
    })
}

struct Compiler<'t> {
    symbols: &'t SymbolTable,
    options: CompilerOptions,
}

impl Compiler<'_> {
    fn bind(&self, name: &str, args: Vec<Invokee>) -> EvalResult<Invokee> {
        self.symbols.bind(name, args)
    }

    fn focus_or_this(&mut self, focus: Option<&Expression>) -> EvalResult<Invokee> {
        match focus {
            Some(expr) => self.visit_expression(expr),
            None => Ok(this_invokee()),
        }
    }

    /// A type-name argument: a string literal or a bare dotted identifier
    fn type_argument(&mut self, expr: &Expression) -> EvalResult<Invokee> {
        match type_name_of(expr) {
            Some(name) => Ok(Invokee::constant(Collection::single(Value::String(name)))),
            None => self.visit_expression(expr),
        }
    }
}

impl Visitor for Compiler<'_> {
    type Result = EvalResult<Invokee>;

    fn visit_expression(&mut self, expr: &Expression) -> Self::Result {
        let invokee = walk_expression(self, expr)?;
        if self.options.diagnostics {
            return Ok(instrument(Arc::new(expr.clone()), invokee));
        }
        Ok(invokee)
    }

    fn visit_constant(&mut self, value: &Value) -> Self::Result {
        Ok(Invokee::constant(Collection::single(value.clone())))
    }

    fn visit_variable(&mut self, var: &VariableRef) -> Self::Result {
        let name = var.name.as_str();
        match name {
            THIS | THAT | INDEX | TOTAL | RESOURCE | ROOT_RESOURCE | CONTEXT => {
                let key = name.to_string();
                Ok(Invokee::new(move |scope| {
                    scope
                        .resolve(&key)
                        .ok_or_else(|| EvalError::unknown_variable(key.as_str()))
                }))
            }
            _ if var.is_iteration() => Err(EvalError::unknown_variable(name)),
            _ => {
                let key = var.bare_name().to_string();
                let fallback = self.symbols.constant(&key).cloned();
                let display = name.to_string();
                Ok(Invokee::new(move |scope| {
                    scope
                        .resolve(&key)
                        .or_else(|| fallback.clone())
                        .ok_or_else(|| EvalError::unknown_variable(display.as_str()))
                }))
            }
        }
    }

    fn visit_child(&mut self, access: &ChildAccess) -> Self::Result {
        let implicit = access.focus.is_none();
        let focus = self.focus_or_this(access.focus.as_deref())?;
        let name = access.name.clone();
        let type_prefix = implicit && name.starts_with(|c: char| c.is_ascii_uppercase());
        Ok(Invokee::new(move |scope| {
            let items = focus.invoke(scope)?;
            let mut found = Vec::new();
            for node in items.iter() {
                if type_prefix && node.type_name() == Some(name.as_str()) {
                    found.push(node.clone());
                } else {
                    found.extend(node.children(Some(&name)));
                }
            }
            Ok(found.into())
        }))
    }

    fn visit_indexer(&mut self, indexer: &IndexerExpr) -> Self::Result {
        let focus = self.visit_expression(&indexer.focus)?;
        let index = self.visit_expression(&indexer.index)?;
        Ok(Invokee::new(move |scope| {
            let items = focus.invoke(scope)?;
            let position = index.invoke(scope)?;
            index_into(&items, &position)
        }))
    }

    fn visit_unary(&mut self, unary: &UnaryOpExpr) -> Self::Result {
        let operand = self.visit_expression(&unary.operand)?;
        self.bind(&format!("unary.{}", unary.op.symbol()), vec![operand])
    }

    fn visit_binary(&mut self, binary: &BinaryOpExpr) -> Self::Result {
        let left = self.visit_expression(&binary.left)?;
        let right = if binary.op.is_type_operator() {
            self.type_argument(&binary.right)?
        } else {
            self.visit_expression(&binary.right)?
        };
        self.bind(&format!("binary.{}", binary.op.symbol()), vec![left, right])
    }

    fn visit_function(&mut self, call: &FunctionCall) -> Self::Result {
        let mut focus = self.focus_or_this(call.focus.as_deref())?;
        if self.options.diagnostics {
            focus = capture_focus(focus);
        }
        let takes_type = matches!(call.name.as_str(), "ofType" | "is" | "as");
        let mut args = Vec::with_capacity(call.arguments.len() + 1);
        args.push(focus);
        for argument in &call.arguments {
            let compiled = if takes_type {
                self.type_argument(argument)?
            } else {
                self.visit_expression(argument)?
            };
            args.push(compiled);
        }
        self.bind(&call.name, args)
    }

    fn visit_empty(&mut self) -> Self::Result {
        Ok(Invokee::constant(Collection::empty()))
    }
}

fn this_invokee() -> Invokee {
    Invokee::new(|scope| Ok(scope.this()))
}

/// `FHIR.Patient` written as a path, or a string literal
fn type_name_of(expr: &Expression) -> Option<String> {
    match expr {
        Expression::Constant(Value::String(name)) => Some(name.clone()),
        Expression::Child(ChildAccess { focus: None, name }) => Some(name.clone()),
        Expression::Child(ChildAccess {
            focus: Some(focus),
            name,
        }) => type_name_of(focus).map(|prefix| format!("{prefix}.{name}")),
        _ => None,
    }
}
