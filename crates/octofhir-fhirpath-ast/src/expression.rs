//! Expression AST nodes for FHIRPath
//!
//! Eight node kinds: constants, variable references, child access, indexers,
//! unary and binary operators, function calls and the empty literal `{}`.

use crate::{BinaryOp, BoxExpr, Span, UnaryOp};
use octofhir_fhirpath_types::Value;
use std::fmt;

/// All FHIRPath expression types
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    /// Literal value
    Constant(Value),
    /// `$this`, `%resource`, `%name` and friends; the sigil is part of the name
    Variable(VariableRef),
    /// Member access (`focus.name`, or a bare identifier)
    Child(ChildAccess),
    /// Indexer access (`focus[index]`)
    Indexer(IndexerExpr),
    /// Prefix operation
    Unary(UnaryOpExpr),
    /// Infix operation
    Binary(BinaryOpExpr),
    /// Function invocation, with or without an explicit focus
    Function(FunctionCall),
    /// The empty collection literal `{}`
    Empty,
}

/// Variable reference
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariableRef {
    pub name: String,
}

impl VariableRef {
    /// `$this`, `$index` and `$total` style iteration variables
    pub fn is_iteration(&self) -> bool {
        self.name.starts_with('$')
    }

    /// Name without the leading `%` or `$`
    pub fn bare_name(&self) -> &str {
        self.name.trim_start_matches(['%', '$'])
    }
}

/// Child navigation
#[derive(Debug, Clone, PartialEq)]
pub struct ChildAccess {
    /// `None` navigates from the implicit focus (`$this`)
    pub focus: Option<BoxExpr>,
    pub name: String,
}

/// Indexer access
#[derive(Debug, Clone, PartialEq)]
pub struct IndexerExpr {
    pub focus: BoxExpr,
    pub index: BoxExpr,
}

/// Unary operation
#[derive(Debug, Clone, PartialEq)]
pub struct UnaryOpExpr {
    pub op: UnaryOp,
    pub operand: BoxExpr,
    pub span: Option<Span>,
}

/// Binary operation
#[derive(Debug, Clone, PartialEq)]
pub struct BinaryOpExpr {
    /// Left operand
    pub left: BoxExpr,
    /// Operator
    pub op: BinaryOp,
    /// Right operand; a type name constant for `is` and `as`
    pub right: BoxExpr,
    pub span: Option<Span>,
}

/// Function call
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionCall {
    /// `None` for calls on the implicit focus (`where(...)` rather than `x.where(...)`)
    pub focus: Option<BoxExpr>,
    pub name: String,
    pub arguments: Vec<Expression>,
    pub span: Option<Span>,
}

impl Expression {
    pub fn constant(value: impl Into<Value>) -> Self {
        Self::Constant(value.into())
    }

    pub fn variable(name: impl Into<String>) -> Self {
        Self::Variable(VariableRef { name: name.into() })
    }

    /// `$this`
    pub fn this() -> Self {
        Self::variable("$this")
    }

    /// Bare identifier navigated from the implicit focus
    pub fn identifier(name: impl Into<String>) -> Self {
        Self::Child(ChildAccess {
            focus: None,
            name: name.into(),
        })
    }

    /// Path built from dotted segments: `path("Patient.name.given")`
    pub fn path(dotted: &str) -> Self {
        let mut segments = dotted.split('.');
        let first = Self::identifier(segments.next().unwrap_or_default());
        segments.fold(first, |focus, name| focus.child(name))
    }

    pub fn empty() -> Self {
        Self::Empty
    }

    /// `self.name`
    pub fn child(self, name: impl Into<String>) -> Self {
        Self::Child(ChildAccess {
            focus: Some(Box::new(self)),
            name: name.into(),
        })
    }

    /// `self[index]`
    pub fn index(self, index: Expression) -> Self {
        Self::Indexer(IndexerExpr {
            focus: Box::new(self),
            index: Box::new(index),
        })
    }

    /// `self.name(arguments)`
    pub fn method(self, name: impl Into<String>, arguments: Vec<Expression>) -> Self {
        Self::Function(FunctionCall {
            focus: Some(Box::new(self)),
            name: name.into(),
            arguments,
            span: None,
        })
    }

    /// `name(arguments)` on the implicit focus
    pub fn call(name: impl Into<String>, arguments: Vec<Expression>) -> Self {
        Self::Function(FunctionCall {
            focus: None,
            name: name.into(),
            arguments,
            span: None,
        })
    }

    pub fn unary(op: UnaryOp, operand: Expression) -> Self {
        Self::Unary(UnaryOpExpr {
            op,
            operand: Box::new(operand),
            span: None,
        })
    }

    pub fn binary(left: Expression, op: BinaryOp, right: Expression) -> Self {
        Self::Binary(BinaryOpExpr {
            left: Box::new(left),
            op,
            right: Box::new(right),
            span: None,
        })
    }

    /// `self is TypeName`
    pub fn is_type(self, type_name: &str) -> Self {
        Self::binary(self, BinaryOp::Is, Self::constant(type_name))
    }

    /// `self as TypeName`
    pub fn as_type(self, type_name: &str) -> Self {
        Self::binary(self, BinaryOp::As, Self::constant(type_name))
    }

    /// Attach a source span to operator and function nodes
    pub fn with_span(mut self, span: impl Into<Span>) -> Self {
        let span = Some(span.into());
        match &mut self {
            Self::Unary(unary) => unary.span = span,
            Self::Binary(binary) => binary.span = span,
            Self::Function(call) => call.span = span,
            _ => {}
        }
        self
    }

    pub fn span(&self) -> Option<Span> {
        match self {
            Self::Unary(unary) => unary.span,
            Self::Binary(binary) => binary.span,
            Self::Function(call) => call.span,
            _ => None,
        }
    }

    /// Short node kind name used in diagnostics
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Constant(_) => "constant",
            Self::Variable(_) => "variable",
            Self::Child(_) => "child",
            Self::Indexer(_) => "indexer",
            Self::Unary(_) => "unary",
            Self::Binary(_) => "binary",
            Self::Function(_) => "function",
            Self::Empty => "empty",
        }
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Constant(value) => write_constant(f, value),
            Self::Variable(var) => f.write_str(&var.name),
            Self::Child(access) => match &access.focus {
                Some(focus) => write!(f, "{focus}.{}", access.name),
                None => f.write_str(&access.name),
            },
            Self::Indexer(indexer) => write!(f, "{}[{}]", indexer.focus, indexer.index),
            Self::Unary(unary) => write!(f, "{}{}", unary.op.symbol(), unary.operand),
            Self::Binary(binary) if binary.op.is_type_operator() => {
                let type_name = match binary.right.as_ref() {
                    Self::Constant(Value::String(name)) => name.clone(),
                    other => other.to_string(),
                };
                write!(f, "({} {} {type_name})", binary.left, binary.op.symbol())
            }
            Self::Binary(binary) => {
                write!(f, "({} {} {})", binary.left, binary.op.symbol(), binary.right)
            }
            Self::Function(call) => {
                if let Some(focus) = &call.focus {
                    write!(f, "{focus}.")?;
                }
                write!(f, "{}(", call.name)?;
                for (i, arg) in call.arguments.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                f.write_str(")")
            }
            Self::Empty => f.write_str("{}"),
        }
    }
}

fn write_constant(f: &mut fmt::Formatter<'_>, value: &Value) -> fmt::Result {
    match value {
        Value::String(s) => write!(f, "'{}'", s.replace('\'', "\\'")),
        Value::Date(_) | Value::DateTime(_) => write!(f, "@{value}"),
        Value::Time(_) => write!(f, "@T{value}"),
        Value::Long(l) => write!(f, "{l}L"),
        other => write!(f, "{other}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_path_builder() {
        let expr = Expression::path("Patient.name.given");
        assert_eq!(expr.to_string(), "Patient.name.given");
        match expr {
            Expression::Child(access) => assert_eq!(access.name, "given"),
            other => panic!("expected child access, got {other:?}"),
        }
    }

    #[test]
    fn test_display_renders_source_like_text() {
        let expr = Expression::path("name")
            .method(
                "where",
                vec![Expression::binary(
                    Expression::identifier("use"),
                    BinaryOp::Equal,
                    Expression::constant("official"),
                )],
            )
            .child("given")
            .index(Expression::constant(0));
        assert_eq!(expr.to_string(), "name.where((use = 'official')).given[0]");
    }

    #[test]
    fn test_type_operator_display() {
        let expr = Expression::identifier("value").is_type("Quantity");
        assert_eq!(expr.to_string(), "(value is Quantity)");
    }

    #[test]
    fn test_span_attaches_to_calls_only() {
        let call = Expression::call("today", vec![]).with_span(3..10);
        assert_eq!(call.span(), Some(Span::new(3, 10)));
        let constant = Expression::constant(true).with_span(0..4);
        assert_eq!(constant.span(), None);
    }

    #[test]
    fn test_variable_names() {
        let Expression::Variable(var) = Expression::variable("%resource") else {
            unreachable!()
        };
        assert!(!var.is_iteration());
        assert_eq!(var.bare_name(), "resource");
    }
}
