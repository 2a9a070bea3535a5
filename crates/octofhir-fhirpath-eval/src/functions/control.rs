//! Iterator and control constructs
//!
//! These receive their arguments unevaluated. `args[0]` is always the focus.

use super::{is_true, to_boolean};
use crate::closure::{Scope, THIS, TOTAL};
use crate::error::{EvalError, EvalResult};
use crate::invokee::Invokee;
use crate::registry::{Arity, SymbolTable};
use octofhir_fhirpath_model::{Collection, Node};
use octofhir_fhirpath_types::Value;
use std::cmp::Ordering;
use std::collections::HashSet;

pub(super) fn register(table: &mut SymbolTable) {
    table
        .add_control("where", Arity::Fixed(1), filter)
        .add_control("select", Arity::Fixed(1), select)
        .add_control("all", Arity::Fixed(1), all)
        .add_control("any", Arity::Fixed(1), any)
        .add_control("exists", Arity::Fixed(1), any)
        .add_control("repeat", Arity::Fixed(1), repeat)
        .add_control("aggregate", Arity::Fixed(1), aggregate)
        .add_control("aggregate", Arity::Fixed(2), aggregate)
        .add_control("coalesce", Arity::Variadic { min: 1 }, coalesce)
        .add_control("sort", Arity::Variadic { min: 0 }, sort)
        .add_control("iif", Arity::Fixed(2), iif)
        .add_control("iif", Arity::Fixed(3), iif)
        .add_control("defineVariable", Arity::Fixed(1), define_variable)
        .add_control("defineVariable", Arity::Fixed(2), define_variable)
        .add_control("binary.and", Arity::Fixed(1), and)
        .add_control("binary.or", Arity::Fixed(1), or)
        .add_control("binary.xor", Arity::Fixed(1), xor)
        .add_control("binary.implies", Arity::Fixed(1), implies);
}

/// Evaluate `body` once per focus item in a scope binding `$this` and `$index`
pub(super) fn for_each_item(
    scope: &Scope<'_>,
    focus: &Collection,
    body: &Invokee,
    mut visit: impl FnMut(&Node, Collection) -> EvalResult<bool>,
) -> EvalResult<()> {
    for (index, item) in focus.iter().enumerate() {
        let result = body.invoke(&scope.iteration(item, index))?;
        if !visit(item, result)? {
            break;
        }
    }
    Ok(())
}

fn filter(scope: &Scope<'_>, args: &[Invokee]) -> EvalResult<Collection> {
    let focus = args[0].invoke(scope)?;
    let mut kept = Vec::new();
    for_each_item(scope, &focus, &args[1], |item, result| {
        if is_true(&result) {
            kept.push(item.clone());
        }
        Ok(true)
    })?;
    Ok(kept.into())
}

fn select(scope: &Scope<'_>, args: &[Invokee]) -> EvalResult<Collection> {
    let focus = args[0].invoke(scope)?;
    let mut projected = Vec::new();
    for_each_item(scope, &focus, &args[1], |_, result| {
        projected.extend(result.iter().cloned());
        Ok(true)
    })?;
    Ok(projected.into())
}

fn all(scope: &Scope<'_>, args: &[Invokee]) -> EvalResult<Collection> {
    let focus = args[0].invoke(scope)?;
    let mut verdict = Some(true);
    for_each_item(scope, &focus, &args[1], |_, result| {
        match to_boolean(&result)? {
            Some(false) => {
                verdict = Some(false);
                return Ok(false);
            }
            None => verdict = None,
            Some(true) => {}
        }
        Ok(true)
    })?;
    Ok(verdict.map(Value::Boolean).into())
}

fn any(scope: &Scope<'_>, args: &[Invokee]) -> EvalResult<Collection> {
    let focus = args[0].invoke(scope)?;
    let mut found = false;
    for_each_item(scope, &focus, &args[1], |_, result| {
        found = to_boolean(&result)? == Some(true);
        Ok(!found)
    })?;
    Ok(Collection::single(Value::Boolean(found)))
}

/// Apply the step to the newest nodes until nothing unseen comes back
fn repeat(scope: &Scope<'_>, args: &[Invokee]) -> EvalResult<Collection> {
    let mut frontier = args[0].invoke(scope)?;
    let mut seen = HashSet::new();
    let mut result = Vec::new();
    while !frontier.is_empty() {
        let mut fresh = Vec::new();
        for_each_item(scope, &frontier, &args[1], |_, produced| {
            for node in produced.iter() {
                if seen.insert(node.identity_key()) {
                    result.push(node.clone());
                    fresh.push(node.clone());
                }
            }
            Ok(true)
        })?;
        frontier = fresh.into();
    }
    Ok(result.into())
}

fn aggregate(scope: &Scope<'_>, args: &[Invokee]) -> EvalResult<Collection> {
    let focus = args[0].invoke(scope)?;
    let mut total = match args.get(2) {
        Some(seed) => seed.invoke(scope)?,
        None => Collection::empty(),
    };
    for (index, item) in focus.iter().enumerate() {
        let step = scope.iteration(item, index);
        step.set(TOTAL, total);
        total = args[1].invoke(&step)?;
    }
    Ok(total)
}

fn coalesce(scope: &Scope<'_>, args: &[Invokee]) -> EvalResult<Collection> {
    for candidate in &args[1..] {
        let result = candidate.invoke(scope)?;
        if !result.is_empty() {
            return Ok(result);
        }
    }
    Ok(Collection::empty())
}

/// Stable ascending sort; without selectors the items themselves are the key
fn sort(scope: &Scope<'_>, args: &[Invokee]) -> EvalResult<Collection> {
    let focus = args[0].invoke(scope)?;
    let selectors = &args[1..];
    let mut keyed = Vec::with_capacity(focus.len());
    for (index, item) in focus.iter().enumerate() {
        let keys = if selectors.is_empty() {
            vec![item.value().cloned()]
        } else {
            let item_scope = scope.iteration(item, index);
            selectors
                .iter()
                .map(|selector| sort_key(&selector.invoke(&item_scope)?))
                .collect::<EvalResult<Vec<_>>>()?
        };
        keyed.push((keys, item.clone()));
    }
    check_collatable(&keyed)?;

    keyed.sort_by(|(left, _), (right, _)| {
        left.iter()
            .zip(right)
            .map(|(l, r)| compare_keys(l.as_ref(), r.as_ref()))
            .find(|ordering| ordering.is_ne())
            .unwrap_or(Ordering::Equal)
    });
    Ok(keyed.into_iter().map(|(_, item)| item).collect())
}

fn sort_key(items: &Collection) -> EvalResult<Option<Value>> {
    match items.as_slice() {
        [] => Ok(None),
        [node] => Ok(node.value().cloned()),
        many => Err(EvalError::cardinality("sort key", many.len())),
    }
}

/// Every key in a column must be ordered against the others. Orderable
/// kinds form classes, so checking against one representative suffices.
fn check_collatable(keyed: &[(Vec<Option<Value>>, Node)]) -> EvalResult<()> {
    let columns = keyed.first().map_or(0, |(keys, _)| keys.len());
    for column in 0..columns {
        let mut present = keyed.iter().filter_map(|(keys, _)| keys[column].as_ref());
        if let Some(first) = present.next() {
            for key in present {
                first.collate(key)?;
            }
        }
    }
    Ok(())
}

/// Empty keys sort first
fn compare_keys(left: Option<&Value>, right: Option<&Value>) -> Ordering {
    match (left, right) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(l), Some(r)) => l.collate(r).unwrap_or(Ordering::Equal),
    }
}

/// Only the taken branch is evaluated
fn iif(scope: &Scope<'_>, args: &[Invokee]) -> EvalResult<Collection> {
    let condition = args[1].invoke(scope)?;
    if condition.len() > 1 {
        return Err(EvalError::cardinality("iif condition", condition.len()));
    }
    if is_true(&condition) {
        args[2].invoke(scope)
    } else {
        match args.get(3) {
            Some(otherwise) => otherwise.invoke(scope),
            None => Ok(Collection::empty()),
        }
    }
}

/// Bind a variable in the calling scope and pass the focus through
fn define_variable(scope: &Scope<'_>, args: &[Invokee]) -> EvalResult<Collection> {
    let focus = args[0].invoke(scope)?;
    let name = args[1].invoke(scope)?;
    let name = name
        .singleton()
        .and_then(Node::value)
        .and_then(Value::as_str)
        .ok_or_else(|| EvalError::invalid_argument("variable name must be a single string"))?
        .to_string();
    let value = match args.get(2) {
        Some(expr) => {
            let inner = scope.nest();
            inner.set(THIS, focus.clone());
            expr.invoke(&inner)?
        }
        None => focus.clone(),
    };
    scope.define(&name, value)?;
    Ok(focus)
}

fn and(scope: &Scope<'_>, args: &[Invokee]) -> EvalResult<Collection> {
    let left = to_boolean(&args[0].invoke(scope)?)?;
    if left == Some(false) {
        return Ok(Collection::single(Value::Boolean(false)));
    }
    let right = to_boolean(&args[1].invoke(scope)?)?;
    let verdict = match (left, right) {
        (_, Some(false)) => Some(false),
        (Some(true), Some(true)) => Some(true),
        _ => None,
    };
    Ok(verdict.map(Value::Boolean).into())
}

fn or(scope: &Scope<'_>, args: &[Invokee]) -> EvalResult<Collection> {
    let left = to_boolean(&args[0].invoke(scope)?)?;
    if left == Some(true) {
        return Ok(Collection::single(Value::Boolean(true)));
    }
    let right = to_boolean(&args[1].invoke(scope)?)?;
    let verdict = match (left, right) {
        (_, Some(true)) => Some(true),
        (Some(false), Some(false)) => Some(false),
        _ => None,
    };
    Ok(verdict.map(Value::Boolean).into())
}

fn xor(scope: &Scope<'_>, args: &[Invokee]) -> EvalResult<Collection> {
    let left = to_boolean(&args[0].invoke(scope)?)?;
    let right = to_boolean(&args[1].invoke(scope)?)?;
    let verdict = left.zip(right).map(|(l, r)| Value::Boolean(l != r));
    Ok(verdict.into())
}

fn implies(scope: &Scope<'_>, args: &[Invokee]) -> EvalResult<Collection> {
    let left = to_boolean(&args[0].invoke(scope)?)?;
    if left == Some(false) {
        return Ok(Collection::single(Value::Boolean(true)));
    }
    let right = to_boolean(&args[1].invoke(scope)?)?;
    let verdict = match (left, right) {
        (_, Some(true)) => Some(true),
        (Some(true), Some(false)) => Some(false),
        _ => None,
    };
    Ok(verdict.map(Value::Boolean).into())
}
