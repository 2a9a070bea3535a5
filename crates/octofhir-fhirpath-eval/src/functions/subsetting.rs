//! Subsetting and combining collections

use super::{COLL, INTEGER, contains_node, distinct_nodes, empty};
use crate::error::{EvalError, EvalResult};
use crate::registry::{Propagation, SymbolTable};
use octofhir_fhirpath_model::Collection;
use octofhir_fhirpath_types::Value;

pub(super) fn register(table: &mut SymbolTable) {
    table
        .add_native("single", &[COLL], Propagation::None, |_, args| {
            let items = args[0].collection();
            match items.len() {
                0 | 1 => Ok(items),
                count => Err(EvalError::cardinality("single", count)),
            }
        })
        .add_native("first", &[COLL], Propagation::None, |_, args| {
            Ok(args[0].collection().first().cloned().into_iter().collect())
        })
        .add_native("last", &[COLL], Propagation::None, |_, args| {
            Ok(args[0].collection().last().cloned().into_iter().collect())
        })
        .add_native("tail", &[COLL], Propagation::None, |_, args| {
            Ok(args[0].collection().iter().skip(1).cloned().collect())
        })
        .add_native("skip", &[COLL, INTEGER], Propagation::All, |_, args| {
            let count = usize::try_from(args[1].as_integer().unwrap_or(0)).unwrap_or(0);
            Ok(args[0].collection().iter().skip(count).cloned().collect())
        })
        .add_native("take", &[COLL, INTEGER], Propagation::All, |_, args| {
            let count = usize::try_from(args[1].as_integer().unwrap_or(0)).unwrap_or(0);
            Ok(args[0].collection().iter().take(count).cloned().collect())
        })
        .add_native("intersect", &[COLL, COLL], Propagation::None, |_, args| {
            let other = args[1].collection();
            let items = args[0].collection();
            let shared = items.iter().filter(|node| contains_node(&other, node));
            Ok(distinct_nodes(shared).into())
        })
        .add_native("exclude", &[COLL, COLL], Propagation::None, |_, args| {
            let other = args[1].collection();
            Ok(args[0]
                .collection()
                .iter()
                .filter(|node| !contains_node(&other, node))
                .cloned()
                .collect())
        })
        .add_native("union", &[COLL, COLL], Propagation::None, |_, args| {
            union(&args[0].collection(), &args[1].collection())
        })
        .add_native("binary.|", &[COLL, COLL], Propagation::None, |_, args| {
            union(&args[0].collection(), &args[1].collection())
        })
        .add_native("combine", &[COLL, COLL], Propagation::None, |_, args| {
            Ok(args[0].collection().concat(&args[1].collection()))
        })
        .add_native("binary.in", &[COLL, COLL], Propagation::None, |_, args| {
            membership(&args[0].collection(), &args[1].collection())
        })
        .add_native("binary.contains", &[COLL, COLL], Propagation::None, |_, args| {
            membership(&args[1].collection(), &args[0].collection())
        });
}

fn union(left: &Collection, right: &Collection) -> EvalResult<Collection> {
    Ok(distinct_nodes(left.iter().chain(right.iter())).into())
}

/// `item in items`: empty item is empty, empty items is false
fn membership(item: &Collection, items: &Collection) -> EvalResult<Collection> {
    match item.as_slice() {
        [] => empty(),
        [node] => Ok(Collection::single(Value::Boolean(contains_node(items, node)))),
        many => Err(EvalError::cardinality("membership operand", many.len())),
    }
}

/// `focus[index]`, zero-based; out-of-range indexes yield empty
pub(crate) fn index_into(focus: &Collection, index: &Collection) -> EvalResult<Collection> {
    let position = match index.as_slice() {
        [] => return empty(),
        [node] => node
            .value()
            .and_then(Value::as_integer)
            .ok_or_else(|| EvalError::conversion(node, "Integer"))?,
        many => return Err(EvalError::cardinality("indexer", many.len())),
    };
    Ok(usize::try_from(position)
        .ok()
        .and_then(|i| focus.get(i))
        .cloned()
        .into_iter()
        .collect())
}
