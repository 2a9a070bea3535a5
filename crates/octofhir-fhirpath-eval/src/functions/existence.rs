//! Existence, filtering by type and boolean aggregates

use super::{COLL, STRING, contains_node, distinct_nodes, empty, matches_type, single, to_boolean};
use crate::closure::Scope;
use crate::error::{EvalError, EvalResult};
use crate::registry::{Arg, Propagation, SymbolTable};
use octofhir_fhirpath_model::Collection;
use octofhir_fhirpath_types::Value;

pub(super) fn register(table: &mut SymbolTable) {
    table
        .add_native("empty", &[COLL], Propagation::None, |_, args| {
            single(args[0].collection().is_empty())
        })
        .add_native("exists", &[COLL], Propagation::None, |_, args| {
            single(!args[0].collection().is_empty())
        })
        .add_native("count", &[COLL], Propagation::None, |_, args| {
            let count = i32::try_from(args[0].collection().len())
                .map_err(|_| EvalError::overflow("count"))?;
            single(count)
        })
        .add_native("allTrue", &[COLL], Propagation::None, |_, args| {
            boolean_aggregate(&args[0], |bools| bools.iter().all(|b| *b))
        })
        .add_native("anyTrue", &[COLL], Propagation::None, |_, args| {
            boolean_aggregate(&args[0], |bools| bools.iter().any(|b| *b))
        })
        .add_native("allFalse", &[COLL], Propagation::None, |_, args| {
            boolean_aggregate(&args[0], |bools| bools.iter().all(|b| !*b))
        })
        .add_native("anyFalse", &[COLL], Propagation::None, |_, args| {
            boolean_aggregate(&args[0], |bools| bools.iter().any(|b| !*b))
        })
        .add_native("distinct", &[COLL], Propagation::None, |_, args| {
            Ok(distinct_nodes(args[0].collection().iter()).into())
        })
        .add_native("isDistinct", &[COLL], Propagation::None, |_, args| {
            let items = args[0].collection();
            single(distinct_nodes(items.iter()).len() == items.len())
        })
        .add_native("subsetOf", &[COLL, COLL], Propagation::None, |_, args| {
            single(is_subset(&args[0].collection(), &args[1].collection()))
        })
        .add_native("supersetOf", &[COLL, COLL], Propagation::None, |_, args| {
            single(is_subset(&args[1].collection(), &args[0].collection()))
        })
        .add_native("ofType", &[COLL, STRING], Propagation::All, of_type)
        // only a single primitive carrying a value counts
        .add_native("hasValue", &[COLL], Propagation::None, |_, args| {
            let items = args[0].collection();
            single(items.singleton().is_some_and(|node| node.value().is_some()))
        })
        .add_native("not", &[COLL], Propagation::None, |_, args| {
            match to_boolean(&args[0].collection())? {
                Some(b) => single(!b),
                None => empty(),
            }
        });
}

fn boolean_aggregate(arg: &Arg, verdict: impl Fn(&[bool]) -> bool) -> EvalResult<Collection> {
    let bools = arg
        .collection()
        .iter()
        .map(|node| {
            node.value()
                .and_then(Value::as_boolean)
                .ok_or_else(|| EvalError::conversion(node, "Boolean"))
        })
        .collect::<EvalResult<Vec<bool>>>()?;
    single(verdict(&bools))
}

fn is_subset(items: &Collection, of: &Collection) -> bool {
    items.iter().all(|node| contains_node(of, node))
}

fn of_type(_: &Scope<'_>, args: &[Arg]) -> EvalResult<Collection> {
    let type_name = args[1].as_str().unwrap_or_default();
    Ok(args[0]
        .collection()
        .iter()
        .filter(|node| matches_type(node, type_name))
        .cloned()
        .collect())
}
