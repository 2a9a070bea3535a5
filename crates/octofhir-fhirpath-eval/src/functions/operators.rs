//! Comparison, arithmetic and type operators

use super::{
    ANY, COLL, DATE, DATETIME, DECIMAL, INTEGER, LONG, QUANTITY, STRING, TIME,
    collections_equal, collections_equivalent, empty, matches_type, optional, single,
};
use crate::error::{EvalError, EvalResult};
use crate::registry::{Arg, ParamType, Propagation, SymbolTable};
use octofhir_fhirpath_model::Collection;
use octofhir_fhirpath_types::{Decimal, Quantity, TypeResult, Value};
use std::cmp::Ordering;

pub(super) fn register(table: &mut SymbolTable) {
    register_equality(table);
    register_ordering(table);
    register_arithmetic(table);
    register_types(table);
}

fn register_equality(table: &mut SymbolTable) {
    table
        .add_native("binary.=", &[COLL, COLL], Propagation::None, |_, args| {
            optional(
                collections_equal(&args[0].collection(), &args[1].collection())
                    .map(Value::Boolean),
            )
        })
        .add_native("binary.!=", &[COLL, COLL], Propagation::None, |_, args| {
            optional(
                collections_equal(&args[0].collection(), &args[1].collection())
                    .map(|equal| Value::Boolean(!equal)),
            )
        })
        .add_native("binary.~", &[COLL, COLL], Propagation::None, |_, args| {
            single(collections_equivalent(&args[0].collection(), &args[1].collection()))
        })
        .add_native("binary.!~", &[COLL, COLL], Propagation::None, |_, args| {
            single(!collections_equivalent(&args[0].collection(), &args[1].collection()))
        });
}

fn register_ordering(table: &mut SymbolTable) {
    let operators: [(&str, fn(Ordering) -> bool); 4] = [
        ("binary.<", Ordering::is_lt),
        ("binary.<=", Ordering::is_le),
        ("binary.>", Ordering::is_gt),
        ("binary.>=", Ordering::is_ge),
    ];
    for (name, accept) in operators {
        table.add_native(name, &[ANY, ANY], Propagation::All, move |_, args| {
            let (left, right) = operand_values(args)?;
            optional(left.compare_to(right)?.map(|o| Value::Boolean(accept(o))))
        });
    }
}

fn operand_values(args: &[Arg]) -> EvalResult<(&Value, &Value)> {
    Ok((operand_value(&args[0])?, operand_value(&args[1])?))
}

fn operand_value(arg: &Arg) -> EvalResult<&Value> {
    arg.value().ok_or_else(|| EvalError::Incomparable {
        left: arg
            .node()
            .and_then(|n| n.type_name())
            .unwrap_or("element")
            .to_string(),
        right: "a value".to_string(),
    })
}

/// Register a binary operator overload on two values of known type
fn binary<F>(table: &mut SymbolTable, name: &str, left: ParamType, right: ParamType, op: F)
where
    F: Fn(&Value, &Value) -> EvalResult<Option<Value>> + Send + Sync + 'static,
{
    table.add_native(name, &[left, right], Propagation::All, move |_, args| {
        match (args[0].value(), args[1].value()) {
            (Some(l), Some(r)) => optional(op(l, r)?),
            _ => empty(),
        }
    });
}

fn register_arithmetic(table: &mut SymbolTable) {
    binary(table, "binary.+", INTEGER, INTEGER, |l, r| {
        int_op(l, r, "+", i32::checked_add)
    });
    binary(table, "binary.+", LONG, LONG, |l, r| long_op(l, r, "+", i64::checked_add));
    binary(table, "binary.+", DECIMAL, DECIMAL, |l, r| {
        decimal_op(l, r, "+", Decimal::checked_add)
    });
    binary(table, "binary.+", QUANTITY, QUANTITY, |l, r| {
        quantity_op(l, r, Quantity::add)
    });
    binary(table, "binary.+", STRING, STRING, |l, r| {
        Ok(Some(Value::String(format!("{l}{r}"))))
    });
    binary(table, "binary.+", DATE, QUANTITY, |l, r| temporal_shift(l, r, false));
    binary(table, "binary.+", DATETIME, QUANTITY, |l, r| temporal_shift(l, r, false));
    binary(table, "binary.+", TIME, QUANTITY, |l, r| temporal_shift(l, r, false));

    binary(table, "binary.-", INTEGER, INTEGER, |l, r| {
        int_op(l, r, "-", i32::checked_sub)
    });
    binary(table, "binary.-", LONG, LONG, |l, r| long_op(l, r, "-", i64::checked_sub));
    binary(table, "binary.-", DECIMAL, DECIMAL, |l, r| {
        decimal_op(l, r, "-", Decimal::checked_sub)
    });
    binary(table, "binary.-", QUANTITY, QUANTITY, |l, r| {
        quantity_op(l, r, Quantity::subtract)
    });
    binary(table, "binary.-", DATE, QUANTITY, |l, r| temporal_shift(l, r, true));
    binary(table, "binary.-", DATETIME, QUANTITY, |l, r| temporal_shift(l, r, true));
    binary(table, "binary.-", TIME, QUANTITY, |l, r| temporal_shift(l, r, true));

    binary(table, "binary.*", INTEGER, INTEGER, |l, r| {
        int_op(l, r, "*", i32::checked_mul)
    });
    binary(table, "binary.*", LONG, LONG, |l, r| long_op(l, r, "*", i64::checked_mul));
    binary(table, "binary.*", DECIMAL, DECIMAL, |l, r| {
        decimal_op(l, r, "*", Decimal::checked_mul)
    });
    binary(table, "binary.*", QUANTITY, QUANTITY, |l, r| {
        quantity_op(l, r, Quantity::multiply)
    });

    binary(table, "binary./", DECIMAL, DECIMAL, |l, r| {
        if r.as_decimal().is_some_and(|d| d.is_zero()) {
            return Ok(None);
        }
        decimal_op(l, r, "/", Decimal::checked_div)
    });
    binary(table, "binary./", QUANTITY, QUANTITY, |l, r| {
        match (l.as_quantity(), r.as_quantity()) {
            (Some(a), Some(b)) => Ok(a.divide(b)?.map(Value::Quantity)),
            _ => Ok(None),
        }
    });

    binary(table, "binary.div", INTEGER, INTEGER, |l, r| {
        if r.as_integer() == Some(0) {
            return Ok(None);
        }
        int_op(l, r, "div", i32::checked_div)
    });
    binary(table, "binary.div", LONG, LONG, |l, r| {
        if r.as_long() == Some(0) {
            return Ok(None);
        }
        long_op(l, r, "div", i64::checked_div)
    });
    binary(table, "binary.div", DECIMAL, DECIMAL, |l, r| {
        if r.as_decimal().is_some_and(|d| d.is_zero()) {
            return Ok(None);
        }
        decimal_op(l, r, "div", |a, b| a.checked_div(b).map(|q| q.trunc()))
    });

    binary(table, "binary.mod", INTEGER, INTEGER, |l, r| {
        if r.as_integer() == Some(0) {
            return Ok(None);
        }
        int_op(l, r, "mod", i32::checked_rem)
    });
    binary(table, "binary.mod", LONG, LONG, |l, r| {
        if r.as_long() == Some(0) {
            return Ok(None);
        }
        long_op(l, r, "mod", i64::checked_rem)
    });
    binary(table, "binary.mod", DECIMAL, DECIMAL, |l, r| {
        if r.as_decimal().is_some_and(|d| d.is_zero()) {
            return Ok(None);
        }
        decimal_op(l, r, "mod", Decimal::checked_rem)
    });

    table.add_native("binary.&", &[STRING, STRING], Propagation::None, |_, args| {
        let text = |arg: &Arg| arg.as_str().unwrap_or_default().to_string();
        single(text(&args[0]) + &text(&args[1]))
    });

    table
        .add_native("unary.-", &[INTEGER], Propagation::All, |_, args| {
            negate(&args[0], "-")
        })
        .add_native("unary.-", &[LONG], Propagation::All, |_, args| negate(&args[0], "-"))
        .add_native("unary.-", &[DECIMAL], Propagation::All, |_, args| {
            negate(&args[0], "-")
        })
        .add_native("unary.-", &[QUANTITY], Propagation::All, |_, args| {
            negate(&args[0], "-")
        });
    for param in [INTEGER, LONG, DECIMAL, QUANTITY] {
        table.add_native("unary.+", &[param], Propagation::All, |_, args| {
            optional(args[0].value().cloned())
        });
    }
}

fn int_op(
    l: &Value,
    r: &Value,
    symbol: &str,
    op: impl Fn(i32, i32) -> Option<i32>,
) -> EvalResult<Option<Value>> {
    let (Some(a), Some(b)) = (l.as_integer(), r.as_integer()) else {
        return Ok(None);
    };
    op(a, b)
        .map(|v| Some(Value::Integer(v)))
        .ok_or_else(|| EvalError::overflow(format!("{a} {symbol} {b}")))
}

fn long_op(
    l: &Value,
    r: &Value,
    symbol: &str,
    op: impl Fn(i64, i64) -> Option<i64>,
) -> EvalResult<Option<Value>> {
    let (Some(a), Some(b)) = (l.as_long(), r.as_long()) else {
        return Ok(None);
    };
    op(a, b)
        .map(|v| Some(Value::Long(v)))
        .ok_or_else(|| EvalError::overflow(format!("{a} {symbol} {b}")))
}

fn decimal_op(
    l: &Value,
    r: &Value,
    symbol: &str,
    op: impl Fn(Decimal, Decimal) -> Option<Decimal>,
) -> EvalResult<Option<Value>> {
    let (Some(a), Some(b)) = (l.as_decimal(), r.as_decimal()) else {
        return Ok(None);
    };
    op(a, b)
        .map(|v| Some(Value::Decimal(v)))
        .ok_or_else(|| EvalError::overflow(format!("{a} {symbol} {b}")))
}

fn quantity_op(
    l: &Value,
    r: &Value,
    op: impl Fn(&Quantity, &Quantity) -> TypeResult<Quantity>,
) -> EvalResult<Option<Value>> {
    match (l.as_quantity(), r.as_quantity()) {
        (Some(a), Some(b)) => Ok(Some(Value::Quantity(op(a, b)?))),
        _ => Ok(None),
    }
}

/// Date, DateTime or Time shifted by a time-valued quantity
fn temporal_shift(l: &Value, r: &Value, backwards: bool) -> EvalResult<Option<Value>> {
    let Some(quantity) = r.as_quantity() else {
        return Ok(None);
    };
    let shifted = match (l, backwards) {
        (Value::Date(d), false) => Value::Date(d.add_quantity(quantity)?),
        (Value::Date(d), true) => Value::Date(d.subtract_quantity(quantity)?),
        (Value::DateTime(dt), false) => Value::DateTime(dt.add_quantity(quantity)?),
        (Value::DateTime(dt), true) => Value::DateTime(dt.subtract_quantity(quantity)?),
        (Value::Time(t), false) => Value::Time(t.add_quantity(quantity)?),
        (Value::Time(t), true) => Value::Time(t.subtract_quantity(quantity)?),
        _ => return Ok(None),
    };
    Ok(Some(shifted))
}

fn negate(arg: &Arg, symbol: &str) -> EvalResult<Collection> {
    let negated = match arg.value() {
        Some(Value::Integer(i)) => Value::Integer(
            i.checked_neg()
                .ok_or_else(|| EvalError::overflow(format!("{symbol}{i}")))?,
        ),
        Some(Value::Long(l)) => Value::Long(
            l.checked_neg()
                .ok_or_else(|| EvalError::overflow(format!("{symbol}{l}")))?,
        ),
        Some(Value::Decimal(d)) => Value::Decimal(-*d),
        Some(Value::Quantity(q)) => Value::Quantity(q.negated()),
        _ => return empty(),
    };
    single(negated)
}

fn register_types(table: &mut SymbolTable) {
    for name in ["binary.is", "is"] {
        table.add_native(name, &[COLL, STRING], Propagation::None, |_, args| {
            type_test(args, false)
        });
    }
    for name in ["binary.as", "as"] {
        table.add_native(name, &[COLL, STRING], Propagation::None, |_, args| {
            type_test(args, true)
        });
    }
}

/// `is` yields a boolean, `as` the item itself when it has the type
fn type_test(args: &[Arg], cast: bool) -> EvalResult<Collection> {
    let items = args[0].collection();
    let node = match items.as_slice() {
        [] => return empty(),
        [node] => node,
        many => return Err(EvalError::cardinality("type operand", many.len())),
    };
    let type_name = args[1]
        .as_str()
        .ok_or_else(|| EvalError::invalid_argument("type name expected"))?;
    let matched = matches_type(node, type_name);
    match (cast, matched) {
        (false, matched) => single(matched),
        (true, true) => Ok(Collection::single(node.clone())),
        (true, false) => empty(),
    }
}
