//! `toX()` and `convertsToX()`
//!
//! Conversions follow the value library's fixed matrix. A value outside the
//! matrix converts to empty; it is not an error.

use super::{ANY, STRING, empty, optional, single};
use crate::error::EvalResult;
use crate::registry::{Arg, Propagation, SymbolTable};
use octofhir_fhirpath_model::Collection;
use octofhir_fhirpath_types::{SystemType, Value};

const TARGETS: [(&str, SystemType); 9] = [
    ("Boolean", SystemType::Boolean),
    ("Integer", SystemType::Integer),
    ("Long", SystemType::Long),
    ("Decimal", SystemType::Decimal),
    ("String", SystemType::String),
    ("Date", SystemType::Date),
    ("DateTime", SystemType::DateTime),
    ("Time", SystemType::Time),
    ("Quantity", SystemType::Quantity),
];

pub(super) fn register(table: &mut SymbolTable) {
    for (suffix, target) in TARGETS {
        table
            .add_native(&format!("to{suffix}"), &[ANY], Propagation::Focus, move |_, args| {
                optional(convert(&args[0], target))
            })
            .add_native(
                &format!("convertsTo{suffix}"),
                &[ANY],
                Propagation::Focus,
                move |_, args| single(convert(&args[0], target).is_some()),
            );
    }
    table
        .add_native("toQuantity", &[ANY, STRING], Propagation::Focus, |_, args| {
            to_quantity_in(&args[0], &args[1])
        })
        .add_native("convertsToQuantity", &[ANY, STRING], Propagation::Focus, |_, args| {
            Ok(Collection::single(Value::Boolean(
                !to_quantity_in(&args[0], &args[1])?.is_empty(),
            )))
        });
}

fn convert(arg: &Arg, target: SystemType) -> Option<Value> {
    arg.value()?.try_convert_to(target).ok()
}

/// Convert, then express in `unit` when the units are interchangeable
fn to_quantity_in(arg: &Arg, unit: &Arg) -> EvalResult<Collection> {
    let Some(Value::Quantity(quantity)) = convert(arg, SystemType::Quantity) else {
        return empty();
    };
    match unit.as_str() {
        None => single(quantity),
        Some(unit) if quantity.unit == unit => single(quantity),
        Some(unit) => optional(quantity.convert_to(unit).ok().map(Value::Quantity)),
    }
}
