//! Tree navigation, tracing, clock functions and environment constants

use super::COLL;
use super::control::for_each_item;
use crate::closure::Scope;
use crate::error::{EvalError, EvalResult};
use crate::invokee::Invokee;
use crate::registry::{Arity, Propagation, SymbolTable};
use log::debug;
use octofhir_fhirpath_model::{Collection, Node};
use octofhir_fhirpath_types::{Date, DateTime, Time, Value};
use std::collections::{HashSet, VecDeque};

pub(super) fn register(table: &mut SymbolTable) {
    table
        .add_native("children", &[COLL], Propagation::None, |_, args| {
            let items = args[0].collection();
            Ok(items.iter().flat_map(|node| node.children(None)).collect())
        })
        .add_native("descendants", &[COLL], Propagation::None, |_, args| {
            Ok(descendants(&args[0].collection()))
        })
        .add_control("trace", Arity::Fixed(1), trace)
        .add_control("trace", Arity::Fixed(2), trace)
        .add_native("now", &[COLL], Propagation::None, |scope, _| {
            Ok(Value::DateTime(DateTime::from_chrono(&scope.session().now())).into())
        })
        .add_native("today", &[COLL], Propagation::None, |scope, _| {
            Ok(Value::Date(Date::from_naive(scope.session().now().date_naive())).into())
        })
        .add_native("timeOfDay", &[COLL], Propagation::None, |scope, _| {
            let time = DateTime::from_chrono(&scope.session().now())
                .time()
                .map(|time| Time {
                    offset: None,
                    ..time
                })
                .ok_or_else(|| EvalError::internal("clock reading without a time part"))?;
            Ok(Value::Time(time).into())
        })
        .add_constant("ucum", Value::from("http://unitsofmeasure.org"))
        .add_constant("sct", Value::from("http://snomed.info/sct"))
        .add_constant("loinc", Value::from("http://loinc.org"));
}

/// Breadth-first; each element is reported once even if reachable twice
fn descendants(roots: &Collection) -> Collection {
    let mut seen = HashSet::new();
    let mut queue: VecDeque<Node> = roots.iter().cloned().collect();
    let mut found = Vec::new();
    while let Some(node) = queue.pop_front() {
        for child in node.children(None) {
            if seen.insert(child.identity_key()) {
                found.push(child.clone());
                queue.push_back(child);
            }
        }
    }
    found.into()
}

/// Report the focus (or a projection of it) and pass the focus through
fn trace(scope: &Scope<'_>, args: &[Invokee]) -> EvalResult<Collection> {
    let focus = args[0].invoke(scope)?;
    let name = args[1].invoke(scope)?;
    let name = name
        .singleton()
        .and_then(Node::value)
        .and_then(Value::as_str)
        .ok_or_else(|| EvalError::invalid_argument("trace name must be a single string"))?
        .to_string();
    let reported = match args.get(2) {
        Some(projection) => {
            let mut projected = Vec::new();
            for_each_item(scope, &focus, projection, |_, result| {
                projected.extend(result.iter().cloned());
                Ok(true)
            })?;
            projected.into()
        }
        None => focus.clone(),
    };
    debug!("trace({name}): {} item(s)", reported.len());
    if let Some(tracer) = &scope.session().context().tracer {
        tracer.trace(&name, &reported)?;
    }
    Ok(focus)
}
