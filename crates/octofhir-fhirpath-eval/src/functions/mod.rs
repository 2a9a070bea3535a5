//! Standard function and operator library
//!
//! [`standard_table`] builds a fresh table; [`standard_symbols`] returns the
//! shared instance built on first use.

mod control;
mod conversion;
mod existence;
mod math;
mod operators;
mod strings;
mod subsetting;
mod utility;

pub(crate) use subsetting::index_into;

use crate::error::{EvalError, EvalResult};
use crate::registry::{ParamType, SymbolTable};
use once_cell::sync::Lazy;
use octofhir_fhirpath_model::{Collection, Node};
use octofhir_fhirpath_types::{SystemType, Value};
use std::sync::Arc;

static STANDARD: Lazy<Arc<SymbolTable>> = Lazy::new(|| Arc::new(standard_table()));

/// Build a table holding the complete standard library
pub fn standard_table() -> SymbolTable {
    let mut table = SymbolTable::new();
    control::register(&mut table);
    existence::register(&mut table);
    subsetting::register(&mut table);
    operators::register(&mut table);
    conversion::register(&mut table);
    strings::register(&mut table);
    math::register(&mut table);
    utility::register(&mut table);
    table
}

/// The shared standard table
pub fn standard_symbols() -> Arc<SymbolTable> {
    Arc::clone(&STANDARD)
}

const COLL: ParamType = ParamType::Collection;
const ANY: ParamType = ParamType::Any;
const STRING: ParamType = ParamType::Of(SystemType::String);
const INTEGER: ParamType = ParamType::Of(SystemType::Integer);
const LONG: ParamType = ParamType::Of(SystemType::Long);
const DECIMAL: ParamType = ParamType::Of(SystemType::Decimal);
const QUANTITY: ParamType = ParamType::Of(SystemType::Quantity);
const DATE: ParamType = ParamType::Of(SystemType::Date);
const DATETIME: ParamType = ParamType::Of(SystemType::DateTime);
const TIME: ParamType = ParamType::Of(SystemType::Time);

fn single(value: impl Into<Value>) -> EvalResult<Collection> {
    Ok(Collection::single(value.into()))
}

fn empty() -> EvalResult<Collection> {
    Ok(Collection::empty())
}

fn optional(value: Option<Value>) -> EvalResult<Collection> {
    Ok(Collection::from(value))
}

/// Boolean reading of a collection: empty is indeterminate, a single
/// non-boolean item counts as true, more than one item is an error
pub(crate) fn to_boolean(items: &Collection) -> EvalResult<Option<bool>> {
    match items.as_slice() {
        [] => Ok(None),
        [node] => Ok(Some(node.value().and_then(Value::as_boolean).unwrap_or(true))),
        many => Err(EvalError::cardinality("boolean expression", many.len())),
    }
}

/// Exactly one `true`
fn is_true(items: &Collection) -> bool {
    matches!(
        items.singleton().and_then(Node::value),
        Some(Value::Boolean(true))
    )
}

/// Tri-state equality of two nodes; elements compare structurally
pub(crate) fn nodes_equal(left: &Node, right: &Node) -> Option<bool> {
    if let (Some(l), Some(r)) = (left.as_scoped(), right.as_scoped()) {
        if l.same_element(r) {
            return Some(true);
        }
    }
    match (left.value(), right.value()) {
        (Some(l), Some(r)) => l.is_equal_to(r),
        (None, None) if !left.is_primitive() && !right.is_primitive() => {
            if left.type_name() != right.type_name() {
                return Some(false);
            }
            collections_equal_by(&left.children(None), &right.children(None), true)
        }
        (None, None) => None,
        _ => Some(false),
    }
}

pub(crate) fn nodes_equivalent(left: &Node, right: &Node) -> bool {
    match (left.value(), right.value()) {
        (Some(l), Some(r)) => l.is_equivalent_to(r),
        (None, None) => {
            left.is_primitive() == right.is_primitive()
                && children_equivalent(&left.children(None), &right.children(None))
        }
        _ => false,
    }
}

fn children_equivalent(left: &[Node], right: &[Node]) -> bool {
    left.len() == right.len()
        && left
            .iter()
            .zip(right)
            .all(|(l, r)| l.name() == r.name() && nodes_equivalent(l, r))
}

/// `=` on collections: empty operands are indeterminate, counts must match,
/// items compare pairwise in order
pub(crate) fn collections_equal(left: &Collection, right: &Collection) -> Option<bool> {
    if left.is_empty() || right.is_empty() {
        return None;
    }
    collections_equal_by(left, right, false)
}

fn collections_equal_by(left: &[Node], right: &[Node], match_names: bool) -> Option<bool> {
    if left.len() != right.len() {
        return Some(false);
    }
    let mut unknown = false;
    for (l, r) in left.iter().zip(right) {
        if match_names && l.name() != r.name() {
            return Some(false);
        }
        match nodes_equal(l, r) {
            Some(false) => return Some(false),
            None => unknown = true,
            Some(true) => {}
        }
    }
    (!unknown).then_some(true)
}

/// `~` on collections: order-independent, never indeterminate
pub(crate) fn collections_equivalent(left: &Collection, right: &Collection) -> bool {
    if left.len() != right.len() {
        return false;
    }
    let mut used = vec![false; right.len()];
    left.iter().all(|l| {
        let found = right
            .iter()
            .enumerate()
            .find(|(i, r)| !used[*i] && nodes_equivalent(l, r))
            .map(|(i, _)| i);
        match found {
            Some(i) => {
                used[i] = true;
                true
            }
            None => false,
        }
    })
}

fn contains_node(items: &[Node], node: &Node) -> bool {
    items.iter().any(|item| nodes_equal(item, node) == Some(true))
}

fn distinct_nodes<'a>(items: impl IntoIterator<Item = &'a Node>) -> Vec<Node> {
    let mut out: Vec<Node> = Vec::new();
    for node in items {
        if !contains_node(&out, node) {
            out.push(node.clone());
        }
    }
    out
}

/// Type test used by `is`, `as` and `ofType`
///
/// `System.`-qualified names only match computed values, `FHIR.`-qualified
/// names only match data-tree elements.
pub(crate) fn matches_type(node: &Node, type_name: &str) -> bool {
    let (namespace, name) = match type_name.split_once('.') {
        Some((namespace, name)) => (Some(namespace), name),
        None => (None, type_name),
    };
    match node {
        Node::Value(value) => {
            namespace != Some("FHIR") && SystemType::from_name(name) == Some(value.system_type())
        }
        Node::Element(_) => namespace != Some("System") && node.type_name() == Some(name),
    }
}
