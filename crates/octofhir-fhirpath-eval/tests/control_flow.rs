mod common;

use common::{Graph, bin, eval, eval_with, int, ints, patient, string, values};
use octofhir_fhirpath_ast::{BinaryOp, Expression};
use octofhir_fhirpath_eval::{
    EvalError, EvaluationContext, FhirPathEngine, ParamType, Propagation, standard_table,
};
use octofhir_fhirpath_model::Collection;
use octofhir_fhirpath_types::{SystemType, Value};
use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// The standard library plus `boom()`, which always fails, and `tick()`,
/// which counts its calls
fn instrumented() -> (FhirPathEngine, Arc<AtomicUsize>) {
    let ticks = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&ticks);
    let mut table = standard_table();
    table
        .add_native("boom", &[ParamType::Collection], Propagation::None, |_, _| {
            Err(EvalError::internal("boom"))
        })
        .add_native("tick", &[ParamType::Collection], Propagation::None, move |_, _| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(Collection::single(Value::Boolean(true)))
        });
    (FhirPathEngine::with_symbols(Arc::new(table)), ticks)
}

fn run(engine: &FhirPathEngine, expr: &Expression) -> Result<Vec<Value>, EvalError> {
    eval_with(engine, expr, None, &EvaluationContext::new()).map(|c| c.values())
}

fn boom() -> Expression {
    Expression::call("boom", vec![])
}

fn tick() -> Expression {
    Expression::call("tick", vec![])
}

#[test]
fn test_iif_evaluates_only_the_taken_branch() {
    let (engine, ticks) = instrumented();
    let expr = Expression::call("iif", vec![Expression::constant(true), int(1), boom()]);
    assert_eq!(run(&engine, &expr).unwrap(), vec![Value::Integer(1)]);

    let expr = Expression::call("iif", vec![Expression::constant(false), tick(), int(2)]);
    assert_eq!(run(&engine, &expr).unwrap(), vec![Value::Integer(2)]);
    assert_eq!(ticks.load(Ordering::SeqCst), 0);
}

#[test]
fn test_iif_condition_must_be_single() {
    let expr = Expression::call("iif", vec![ints(&[1, 2]), int(1), int(2)]);
    let err = eval(&expr, None).unwrap_err();
    assert!(matches!(err.root_cause(), EvalError::Cardinality { .. }));
    assert_eq!(err.function_name(), Some("iif"));
}

#[test]
fn test_boolean_operators_short_circuit() {
    let (engine, _) = instrumented();
    let f = || Expression::constant(false);
    let t = || Expression::constant(true);

    let expr = bin(f(), BinaryOp::And, boom());
    assert_eq!(run(&engine, &expr).unwrap(), vec![Value::Boolean(false)]);
    let expr = bin(t(), BinaryOp::Or, boom());
    assert_eq!(run(&engine, &expr).unwrap(), vec![Value::Boolean(true)]);
    let expr = bin(f(), BinaryOp::Implies, boom());
    assert_eq!(run(&engine, &expr).unwrap(), vec![Value::Boolean(true)]);

    let expr = bin(t(), BinaryOp::And, boom());
    assert!(run(&engine, &expr).is_err());
}

#[test]
fn test_three_valued_logic() {
    let unknown = Expression::empty;
    let cases = [
        (bin(unknown(), BinaryOp::And, Expression::constant(false)), vec![Value::Boolean(false)]),
        (bin(unknown(), BinaryOp::And, Expression::constant(true)), vec![]),
        (bin(unknown(), BinaryOp::Or, Expression::constant(true)), vec![Value::Boolean(true)]),
        (bin(unknown(), BinaryOp::Xor, Expression::constant(true)), vec![]),
        (bin(Expression::constant(true), BinaryOp::Implies, unknown()), vec![]),
    ];
    for (expr, expected) in cases {
        assert_eq!(values(&expr, None), expected, "{expr}");
    }
}

#[test]
fn test_repeat_terminates_on_cycles() {
    let graph = Graph::new(vec![vec![1], vec![2], vec![0]]);
    let expr = Expression::call("repeat", vec![Expression::identifier("next")])
        .method("count", vec![]);
    assert_eq!(values(&expr, Some(graph.root(0))), vec![Value::Integer(3)]);
}

#[test]
fn test_descendants_terminates_on_cycles() {
    let graph = Graph::new(vec![vec![1, 2], vec![0], vec![2]]);
    let expr = Expression::call("descendants", vec![]).method("count", vec![]);
    assert_eq!(values(&expr, Some(graph.root(0))), vec![Value::Integer(3)]);
}

#[test]
fn test_descendants_keeps_elements_of_separate_trees() {
    let mut table = standard_table();
    table.add_native("twins", &[ParamType::Collection], Propagation::None, |_, _| {
        Ok(Collection::from(vec![patient(), patient()]))
    });
    let engine = FhirPathEngine::with_symbols(Arc::new(table));
    let count = |expr: Expression| run(&engine, &expr.method("count", vec![])).unwrap();

    let single = values(
        &Expression::call("descendants", vec![]).method("count", vec![]),
        Some(patient()),
    );
    let Some(Value::Integer(per_tree)) = single.first().cloned() else {
        panic!("descendants count is not an integer: {single:?}");
    };
    assert_eq!(
        count(Expression::call("twins", vec![]).method("descendants", vec![])),
        vec![Value::Integer(per_tree * 2)]
    );
    let names = Expression::call("twins", vec![])
        .method("repeat", vec![Expression::identifier("name")]);
    assert_eq!(count(names), vec![Value::Integer(4)]);
}

#[test]
fn test_aggregate_folds_with_total() {
    let body = bin(Expression::this(), BinaryOp::Add, Expression::variable("$total"));
    let expr = ints(&[1, 2, 3, 4]).method("aggregate", vec![body, int(0)]);
    assert_eq!(values(&expr, None), vec![Value::Integer(10)]);
}

#[test]
fn test_total_outside_aggregate_is_unbound() {
    let err = eval(&Expression::variable("$total"), None).unwrap_err();
    assert!(matches!(err, EvalError::UnknownVariable { .. }));
}

#[test]
fn test_coalesce_stops_at_first_non_empty() {
    let (engine, _) = instrumented();
    let expr = Expression::call("coalesce", vec![Expression::empty(), int(1), boom()]);
    assert_eq!(run(&engine, &expr).unwrap(), vec![Value::Integer(1)]);
}

#[test]
fn test_sort_ascending_and_by_key() {
    let expr = ints(&[3, 1, 2]).method("sort", vec![]);
    assert_eq!(
        values(&expr, None),
        vec![Value::Integer(1), Value::Integer(2), Value::Integer(3)]
    );

    let expr = Expression::identifier("name")
        .method("sort", vec![Expression::path("given").method("first", vec![])])
        .method("select", vec![Expression::identifier("use")]);
    assert_eq!(
        values(&expr, Some(patient())),
        vec![Value::from("usual"), Value::from("official")]
    );
}

fn parity() -> Expression {
    bin(Expression::this(), BinaryOp::Mod, int(2))
}

#[test]
fn test_sort_is_stable_across_ties() {
    let expr = ints(&[3, 1, 2, 4]).method("sort", vec![parity()]);
    assert_eq!(values(&expr, None), ints_of(&[2, 4, 3, 1]));

    let expr = Expression::identifier("name")
        .method("sort", vec![int(1)])
        .method("select", vec![Expression::identifier("use")]);
    assert_eq!(
        values(&expr, Some(patient())),
        vec![Value::from("official"), Value::from("usual")]
    );
}

#[test]
fn test_sort_by_several_keys() {
    let expr = ints(&[3, 1, 2, 4]).method("sort", vec![parity(), Expression::this()]);
    assert_eq!(values(&expr, None), ints_of(&[2, 4, 1, 3]));
}

#[test]
fn test_sort_puts_empty_keys_first() {
    let expr = Expression::identifier("name")
        .method("sort", vec![Expression::identifier("family")])
        .method("select", vec![Expression::identifier("use")]);
    assert_eq!(
        values(&expr, Some(patient())),
        vec![Value::from("usual"), Value::from("official")]
    );
}

#[test]
fn test_sort_key_must_be_single() {
    let expr = Expression::identifier("name").method("sort", vec![Expression::identifier("given")]);
    let err = eval(&expr, Some(patient())).unwrap_err();
    assert!(matches!(err.root_cause(), EvalError::Cardinality { .. }));
    assert_eq!(err.function_name(), Some("sort"));
}

#[test]
fn test_sort_rejects_unordered_keys() {
    let expr = bin(int(1), BinaryOp::Union, string("a")).method("sort", vec![]);
    let err = eval(&expr, None).unwrap_err();
    assert!(matches!(err.root_cause(), EvalError::Incomparable { .. }));
}

fn ints_of(items: &[i32]) -> Vec<Value> {
    items.iter().map(|i| Value::Integer(*i)).collect()
}

/// Years, year-months and full dates interleaved so that many pairs are
/// only partially comparable
fn partial_dates(count: usize) -> Vec<Value> {
    let mut seed: u64 = 0x2545_f491_4f6c_dd1d;
    let mut next = move |bound: u64| {
        seed ^= seed << 13;
        seed ^= seed >> 7;
        seed ^= seed << 17;
        seed % bound
    };
    (0..count)
        .map(|_| {
            let year = 2018 + next(4);
            let text = match next(3) {
                0 => format!("{year}"),
                1 => format!("{year}-{:02}", 1 + next(12)),
                _ => format!("{year}-{:02}-{:02}", 1 + next(12), 1 + next(28)),
            };
            Value::parse(SystemType::DateTime, &text).unwrap()
        })
        .collect()
}

#[test]
fn test_sort_orders_partial_dates_totally() {
    let dates = partial_dates(64);
    let source = dates.clone();
    let mut table = standard_table();
    table.add_native("dates", &[ParamType::Collection], Propagation::None, move |_, _| {
        Ok(Collection::from_values(source.clone()))
    });
    let engine = FhirPathEngine::with_symbols(Arc::new(table));

    let sorted = run(&engine, &Expression::call("dates", vec![]).method("sort", vec![])).unwrap();
    assert_eq!(sorted.len(), dates.len());
    for pair in sorted.windows(2) {
        assert_ne!(pair[0].collate(&pair[1]).unwrap(), std::cmp::Ordering::Greater);
    }
}

#[test]
fn test_sort_places_partial_dates_before_precise_ones() {
    let dt = |text: &str| Value::parse(SystemType::DateTime, text).unwrap();
    let expr = Expression::constant(dt("2020-05"))
        .method("combine", vec![Expression::constant(dt("2020"))])
        .method("combine", vec![Expression::constant(dt("2020-01"))])
        .method("sort", vec![]);
    assert_eq!(values(&expr, None), vec![dt("2020"), dt("2020-01"), dt("2020-05")]);
}

/// `many()` yields 1..=2000 and `liveScopes()` reports the session's frame count
fn scope_counting() -> FhirPathEngine {
    let mut table = standard_table();
    table
        .add_native("many", &[ParamType::Collection], Propagation::None, |_, _| {
            Ok(Collection::from_values((1..=2000).map(Value::Integer).collect::<Vec<_>>()))
        })
        .add_native("liveScopes", &[ParamType::Collection], Propagation::None, |scope, _| {
            let live = i32::try_from(scope.session().scope_count()).unwrap_or(i32::MAX);
            Ok(Collection::single(Value::Integer(live)))
        });
    FhirPathEngine::with_symbols(Arc::new(table))
}

#[test]
fn test_iteration_scopes_are_discarded_after_each_item() {
    let engine = scope_counting();
    let positive = bin(Expression::this(), BinaryOp::Greater, int(0));
    let expr = Expression::call("many", vec![])
        .method("where", vec![positive])
        .method("select", vec![Expression::call("liveScopes", vec![])]);
    // the root scope plus the current select step
    assert_eq!(run(&engine, &expr).unwrap(), vec![Value::Integer(2); 2000]);

    let expr = Expression::call("many", vec![])
        .method("where", vec![bin(Expression::this(), BinaryOp::Greater, int(1990))])
        .method("count", vec![])
        .method("select", vec![Expression::call("liveScopes", vec![])]);
    assert_eq!(run(&engine, &expr).unwrap(), vec![Value::Integer(2)]);
}

#[test]
fn test_all_and_any() {
    let positive = || bin(Expression::this(), BinaryOp::Greater, int(0));
    let expr = ints(&[1, 2]).method("all", vec![positive()]);
    assert_eq!(values(&expr, None), vec![Value::Boolean(true)]);
    let expr = Expression::empty().method("all", vec![positive()]);
    assert_eq!(values(&expr, None), vec![Value::Boolean(true)]);
    let expr = ints(&[-1, 2]).method("exists", vec![positive()]);
    assert_eq!(values(&expr, None), vec![Value::Boolean(true)]);
}

#[test]
fn test_define_variable() {
    let expr = Expression::call(
        "defineVariable",
        vec![string("n"), Expression::identifier("name").method("count", vec![])],
    )
    .method("select", vec![Expression::variable("%n")]);
    assert_eq!(values(&expr, Some(patient())), vec![Value::Integer(2)]);

    let expr = Expression::call("defineVariable", vec![string("a"), int(1)])
        .method("defineVariable", vec![string("a"), int(2)]);
    let err = eval(&expr, Some(patient())).unwrap_err();
    assert!(matches!(err.root_cause(), EvalError::VariableRedefined { .. }));

    let expr = Expression::call("defineVariable", vec![string("resource")]);
    assert!(eval(&expr, Some(patient())).is_err());
}

#[test]
fn test_defined_variable_is_not_visible_to_siblings() {
    let define = Expression::call("defineVariable", vec![string("v"), int(1)]);
    let inner = define.method("select", vec![Expression::variable("%v")]);
    let expr = bin(
        Expression::identifier("name").method("select", vec![inner]),
        BinaryOp::Union,
        Expression::variable("%v"),
    );
    let err = eval(&expr, Some(patient())).unwrap_err();
    assert!(matches!(err.root_cause(), EvalError::UnknownVariable { .. }));
}

#[test]
fn test_trace_reports_and_passes_through() {
    let seen: Arc<Mutex<Vec<(String, usize)>>> = Arc::default();
    let sink = Arc::clone(&seen);
    let context = EvaluationContext::builder()
        .tracer(move |name: &str, items: &Collection| -> Result<(), EvalError> {
            sink.lock().push((name.to_string(), items.len()));
            Ok(())
        })
        .build();
    let engine = FhirPathEngine::new();

    let expr = Expression::identifier("name")
        .method("trace", vec![string("names")])
        .method("trace", vec![string("given"), Expression::identifier("given")])
        .method("count", vec![]);
    let result = eval_with(&engine, &expr, Some(patient()), &context).unwrap();
    assert_eq!(result.values(), vec![Value::Integer(2)]);
    assert_eq!(
        *seen.lock(),
        vec![("names".to_string(), 2), ("given".to_string(), 3)]
    );
}

#[test]
fn test_tracer_failure_aborts_evaluation() {
    let context = EvaluationContext::builder()
        .tracer(|_: &str, _: &Collection| -> Result<(), EvalError> {
            Err(EvalError::callback("rejected"))
        })
        .build();
    let expr = int(1).method("trace", vec![string("x")]);
    let err = eval_with(&FhirPathEngine::new(), &expr, None, &context).unwrap_err();
    assert!(matches!(err.root_cause(), EvalError::Callback { .. }));
}
