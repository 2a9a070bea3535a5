//! Shared fixtures for evaluator integration tests

#![allow(dead_code)]

use octofhir_fhirpath_ast::{BinaryOp, Expression};
use octofhir_fhirpath_eval::{EvalResult, EvaluationContext, FhirPathEngine};
use octofhir_fhirpath_model::{Collection, ElementNode, ElementRef, Node, NodeBuilder};
use octofhir_fhirpath_types::{Date, Value};
use std::sync::Arc;

pub fn patient() -> Node {
    let tree = NodeBuilder::resource("Patient")
        .with("id", "example")
        .with("active", true)
        .child(
            NodeBuilder::element("name", Some("HumanName"))
                .with("use", "official")
                .with("family", "Chalmers")
                .with("given", "Peter")
                .with("given", "James"),
        )
        .child(
            NodeBuilder::element("name", Some("HumanName"))
                .with("use", "usual")
                .with("given", "Jim"),
        )
        .with("gender", "male")
        .with("birthDate", Date::new(1974, 12, 25))
        .child(NodeBuilder::null_primitive("deceasedBoolean", "boolean"))
        .child(
            NodeBuilder::element("contained", None)
                .as_resource("Organization")
                .with("name", "Acme"),
        )
        .build();
    Node::element(tree)
}

pub fn engine() -> FhirPathEngine {
    FhirPathEngine::new()
}

pub fn eval_with(
    engine: &FhirPathEngine,
    expr: &Expression,
    root: Option<Node>,
    context: &EvaluationContext,
) -> EvalResult<Collection> {
    let compiled = engine.compile(expr)?;
    engine.evaluate(&compiled, root, context)
}

/// Evaluate with the standard engine and an empty context
pub fn eval(expr: &Expression, root: Option<Node>) -> EvalResult<Collection> {
    eval_with(&engine(), expr, root, &EvaluationContext::new())
}

pub fn values(expr: &Expression, root: Option<Node>) -> Vec<Value> {
    match eval(expr, root) {
        Ok(items) => items.values(),
        Err(err) => panic!("`{expr}` failed: {err}"),
    }
}

pub fn int(value: i32) -> Expression {
    Expression::constant(value)
}

pub fn string(value: &str) -> Expression {
    Expression::constant(value)
}

pub fn bin(left: Expression, op: BinaryOp, right: Expression) -> Expression {
    Expression::binary(left, op, right)
}

/// `a | b | c ...` over integer literals
pub fn ints(items: &[i32]) -> Expression {
    let mut iter = items.iter().map(|i| int(*i));
    let first = iter.next().unwrap_or_else(Expression::empty);
    iter.fold(first, |acc, item| bin(acc, BinaryOp::Union, item))
}

/// A directed graph exposed as a data tree: each vertex's `next` children
/// are its successors, so cycles make the tree infinitely deep
#[derive(Debug)]
pub struct Graph {
    edges: Vec<Vec<usize>>,
}

#[derive(Debug)]
pub struct GraphNode {
    graph: Arc<Graph>,
    vertex: usize,
    location: String,
}

impl Graph {
    pub fn new(edges: Vec<Vec<usize>>) -> Arc<Self> {
        Arc::new(Self { edges })
    }

    pub fn root(self: &Arc<Self>, vertex: usize) -> Node {
        Node::element(Arc::new(GraphNode::new(Arc::clone(self), vertex)))
    }
}

impl GraphNode {
    fn new(graph: Arc<Graph>, vertex: usize) -> Self {
        Self {
            graph,
            vertex,
            location: format!("vertex{vertex}"),
        }
    }
}

impl ElementNode for GraphNode {
    fn name(&self) -> &str {
        "next"
    }

    fn type_name(&self) -> Option<&str> {
        Some("Vertex")
    }

    fn value(&self) -> Option<&Value> {
        None
    }

    fn children(&self, name: Option<&str>) -> Vec<ElementRef> {
        if name.is_some_and(|n| n != "next") {
            return Vec::new();
        }
        self.graph.edges[self.vertex]
            .iter()
            .map(|target| Arc::new(GraphNode::new(Arc::clone(&self.graph), *target)) as ElementRef)
            .collect()
    }

    fn location(&self) -> &str {
        &self.location
    }
}
