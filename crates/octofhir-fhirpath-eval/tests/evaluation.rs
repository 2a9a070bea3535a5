mod common;

use chrono::{FixedOffset, TimeZone};
use common::{bin, eval, eval_with, engine, int, ints, patient, string, values};
use octofhir_fhirpath_ast::{BinaryOp, Expression, UnaryOp};
use octofhir_fhirpath_eval::{EvalError, EvaluationContext};
use octofhir_fhirpath_types::{Date, Decimal, Quantity, Time, Value};
use pretty_assertions::assert_eq;
use rstest::rstest;

fn text(items: &[&str]) -> Vec<Value> {
    items.iter().map(|s| Value::from(*s)).collect()
}

fn dec(text: &str) -> Value {
    Value::Decimal(text.parse::<Decimal>().unwrap())
}

#[test]
fn test_path_navigation_flattens() {
    let expr = Expression::path("Patient.name.given");
    assert_eq!(values(&expr, Some(patient())), text(&["Peter", "James", "Jim"]));
}

#[test]
fn test_type_prefix_only_matches_the_root_type() {
    let expr = Expression::path("Observation.id");
    assert!(eval(&expr, Some(patient())).unwrap().is_empty());
    let expr = Expression::path("Patient.id");
    assert_eq!(values(&expr, Some(patient())), text(&["example"]));
}

#[test]
fn test_where_keeps_items_matching_the_criteria() {
    let expr = ints(&[1, 2, 3, 4]).method(
        "where",
        vec![bin(Expression::this(), BinaryOp::Greater, int(2))],
    );
    assert_eq!(values(&expr, None), vec![Value::Integer(3), Value::Integer(4)]);
}

#[test]
fn test_where_on_elements() {
    let expr = Expression::identifier("name")
        .method(
            "where",
            vec![bin(Expression::identifier("use"), BinaryOp::Equal, string("official"))],
        )
        .child("family");
    assert_eq!(values(&expr, Some(patient())), text(&["Chalmers"]));
}

#[test]
fn test_select_and_indexer() {
    let expr = Expression::identifier("name")
        .method("select", vec![Expression::identifier("given").method("first", vec![])]);
    assert_eq!(values(&expr, Some(patient())), text(&["Peter", "Jim"]));

    let expr = Expression::identifier("name").index(int(1)).child("given");
    assert_eq!(values(&expr, Some(patient())), text(&["Jim"]));

    let expr = Expression::identifier("name").index(int(5));
    assert!(eval(&expr, Some(patient())).unwrap().is_empty());
}

#[test]
fn test_index_variable_in_iteration() {
    let expr = ints(&[10, 20, 30]).method("select", vec![Expression::variable("$index")]);
    assert_eq!(
        values(&expr, None),
        vec![Value::Integer(0), Value::Integer(1), Value::Integer(2)]
    );
}

#[test]
fn test_resource_variables() {
    let expr = Expression::variable("%resource").child("id");
    assert_eq!(values(&expr, Some(patient())), text(&["example"]));

    let expr = Expression::variable("%context").method("count", vec![]);
    assert_eq!(values(&expr, Some(patient())), vec![Value::Integer(1)]);
}

#[rstest]
#[case(bin(int(1), BinaryOp::Add, int(2)), vec![Value::Integer(3)])]
#[case(bin(int(1), BinaryOp::Add, Expression::constant(dec("2.5"))), vec![dec("3.5")])]
#[case(bin(string("a"), BinaryOp::Add, string("b")), vec![Value::from("ab")])]
#[case(bin(int(7), BinaryOp::Div, int(2)), vec![Value::Integer(3)])]
#[case(bin(int(7), BinaryOp::Mod, int(2)), vec![Value::Integer(1)])]
#[case(bin(int(5), BinaryOp::Div, int(0)), vec![])]
#[case(bin(int(1), BinaryOp::Divide, int(4)), vec![dec("0.25")])]
#[case(bin(string("a"), BinaryOp::Concatenate, Expression::empty()), vec![Value::from("a")])]
#[case(Expression::unary(UnaryOp::Negate, int(4)), vec![Value::Integer(-4)])]
#[case(bin(Expression::constant(Value::Long(5)), BinaryOp::Multiply, int(2)), vec![Value::Long(10)])]
fn test_arithmetic(#[case] expr: Expression, #[case] expected: Vec<Value>) {
    assert_eq!(values(&expr, None), expected);
}

#[test]
fn test_integer_overflow_is_an_error() {
    let expr = bin(int(i32::MAX), BinaryOp::Add, int(1));
    let err = eval(&expr, None).unwrap_err();
    assert!(matches!(err.root_cause(), EvalError::Overflow { .. }));
}

#[test]
fn test_date_arithmetic() {
    let expr = bin(
        Expression::constant(Date::new(2020, 1, 15)),
        BinaryOp::Add,
        Expression::constant(Quantity::calendar(Decimal::ONE, "day")),
    );
    assert_eq!(values(&expr, None), vec![Value::Date(Date::new(2020, 1, 16))]);
}

#[rstest]
#[case(bin(int(1), BinaryOp::Equal, int(1)), vec![Value::Boolean(true)])]
#[case(bin(ints(&[1, 2]), BinaryOp::Equal, ints(&[2, 1])), vec![Value::Boolean(false)])]
#[case(bin(ints(&[1, 2]), BinaryOp::Equivalent, ints(&[2, 1])), vec![Value::Boolean(true)])]
#[case(bin(int(1), BinaryOp::Equal, Expression::empty()), vec![])]
#[case(bin(string("café"), BinaryOp::Equal, string("CAFE")), vec![Value::Boolean(false)])]
#[case(bin(string("café"), BinaryOp::Equivalent, string("CAFE")), vec![Value::Boolean(true)])]
#[case(
    bin(
        Expression::constant(Date::year_month(2020, 1)),
        BinaryOp::Equal,
        Expression::constant(Date::new(2020, 1, 15)),
    ),
    vec![]
)]
#[case(bin(int(2), BinaryOp::Less, Expression::constant(dec("2.5"))), vec![Value::Boolean(true)])]
fn test_equality_and_ordering(#[case] expr: Expression, #[case] expected: Vec<Value>) {
    assert_eq!(values(&expr, None), expected);
}

#[test]
fn test_ordering_incompatible_types_fails() {
    let expr = bin(int(1), BinaryOp::Less, string("a"));
    assert!(eval(&expr, None).is_err());
}

#[test]
fn test_element_comparison_uses_the_value() {
    let expr = bin(
        Expression::identifier("birthDate"),
        BinaryOp::Less,
        Expression::constant(Date::new(2000, 1, 1)),
    );
    assert_eq!(values(&expr, Some(patient())), vec![Value::Boolean(true)]);
}

#[rstest]
#[case("substring", vec![int(1), int(3)], text(&["bcd"]))]
#[case("indexOf", vec![string("cd")], vec![Value::Integer(2)])]
#[case("startsWith", vec![string("abc")], vec![Value::Boolean(true)])]
#[case("upper", vec![], text(&["ABCDEF"]))]
#[case("length", vec![], vec![Value::Integer(6)])]
#[case("replace", vec![string("cd"), string("-")], text(&["ab-ef"]))]
#[case("matches", vec![string("^a.c")], vec![Value::Boolean(true)])]
#[case("replaceMatches", vec![string("[aeiou]"), string("*")], text(&["*bcd*f"]))]
#[case("toChars", vec![], text(&["a", "b", "c", "d", "e", "f"]))]
fn test_string_functions(
    #[case] name: &str,
    #[case] args: Vec<Expression>,
    #[case] expected: Vec<Value>,
) {
    let expr = string("abcdef").method(name, args);
    assert_eq!(values(&expr, None), expected);
}

#[test]
fn test_split_and_join() {
    let expr = string("a,b,c")
        .method("split", vec![string(",")])
        .method("join", vec![string("|")]);
    assert_eq!(values(&expr, None), text(&["a|b|c"]));
}

#[rstest]
#[case("abs", Expression::constant(dec("-1.5")), vec![dec("1.5")])]
#[case("ceiling", Expression::constant(dec("1.1")), vec![Value::Integer(2)])]
#[case("floor", Expression::constant(dec("-1.1")), vec![Value::Integer(-2)])]
#[case("truncate", Expression::constant(dec("-1.9")), vec![Value::Integer(-1)])]
#[case("sqrt", int(-1), vec![])]
#[case("ln", int(0), vec![])]
fn test_math_functions(#[case] name: &str, #[case] focus: Expression, #[case] expected: Vec<Value>) {
    assert_eq!(values(&focus.method(name, vec![]), None), expected);
}

#[test]
fn test_round_and_power() {
    let expr = Expression::constant(dec("3.14159")).method("round", vec![int(2)]);
    assert_eq!(values(&expr, None), vec![dec("3.14")]);
    let expr = int(2).method("power", vec![int(10)]);
    assert_eq!(values(&expr, None), vec![Value::Integer(1024)]);
}

fn hours(count: i64) -> Expression {
    Expression::constant(Quantity::calendar(Decimal::from(count), "hours"))
}

#[rstest]
#[case(string("12").method("toInteger", vec![]), vec![Value::Integer(12)])]
#[case(string("1.5").method("toInteger", vec![]), vec![])]
#[case(string("1.5").method("convertsToDecimal", vec![]), vec![Value::Boolean(true)])]
#[case(int(1).method("toBoolean", vec![]), vec![Value::Boolean(true)])]
#[case(int(7).method("toString", vec![]), vec![Value::from("7")])]
#[case(string("2020-02").method("toDate", vec![]), vec![Value::Date(Date::year_month(2020, 2))])]
#[case(
    hours(2).method("toQuantity", vec![string("min")]),
    vec![Value::Quantity(Quantity::new(Decimal::from(120), "min"))]
)]
#[case(hours(2).method("toQuantity", vec![string("mg")]), vec![])]
#[case(
    hours(2).method("convertsToQuantity", vec![string("s")]),
    vec![Value::Boolean(true)]
)]
fn test_conversions(#[case] expr: Expression, #[case] expected: Vec<Value>) {
    assert_eq!(values(&expr, None), expected);
}

#[test]
fn test_type_tests() {
    assert_eq!(values(&int(1).is_type("Integer"), None), vec![Value::Boolean(true)]);
    assert_eq!(values(&int(1).is_type("String"), None), vec![Value::Boolean(false)]);
    let expr = Expression::call("ofType", vec![Expression::identifier("Patient")]);
    assert_eq!(eval(&expr, Some(patient())).unwrap().len(), 1);
    let expr = Expression::identifier("contained")
        .method("ofType", vec![Expression::path("FHIR.Organization")])
        .child("name");
    assert_eq!(values(&expr, Some(patient())), text(&["Acme"]));
}

#[test]
fn test_existence_and_null_primitives() {
    let patient = Some(patient());
    let expr = Expression::identifier("deceasedBoolean").method("hasValue", vec![]);
    assert_eq!(values(&expr, patient.clone()), vec![Value::Boolean(false)]);
    let expr = Expression::identifier("birthDate").method("hasValue", vec![]);
    assert_eq!(values(&expr, patient.clone()), vec![Value::Boolean(true)]);
    let expr = Expression::path("name.given").method("hasValue", vec![]);
    assert_eq!(values(&expr, patient.clone()), vec![Value::Boolean(false)]);
    let expr = Expression::identifier("name").method("hasValue", vec![]);
    assert_eq!(values(&expr, patient.clone()), vec![Value::Boolean(false)]);
    let expr = Expression::empty().method("hasValue", vec![]);
    assert_eq!(values(&expr, None), vec![Value::Boolean(false)]);
    let expr = Expression::path("name.given").method("count", vec![]);
    assert_eq!(values(&expr, patient.clone()), vec![Value::Integer(3)]);
    let expr = Expression::path("name.given").method("distinct", vec![]).method("count", vec![]);
    assert_eq!(values(&expr, patient.clone()), vec![Value::Integer(3)]);
    let expr = Expression::identifier("telecom").method("empty", vec![]);
    assert_eq!(values(&expr, patient), vec![Value::Boolean(true)]);
}

#[test]
fn test_subsetting() {
    assert_eq!(values(&ints(&[1, 2, 3]).method("tail", vec![]), None).len(), 2);
    assert_eq!(
        values(&ints(&[1, 2, 3]).method("skip", vec![int(1)]).method("take", vec![int(1)]), None),
        vec![Value::Integer(2)]
    );
    assert_eq!(
        values(&ints(&[1, 2, 3]).method("exclude", vec![ints(&[2])]), None),
        vec![Value::Integer(1), Value::Integer(3)]
    );
    assert!(eval(&ints(&[1, 2]).method("single", vec![]), None).is_err());
}

#[test]
fn test_tree_navigation() {
    let expr = Expression::identifier("name").index(int(0)).method("children", vec![]);
    assert_eq!(eval(&expr, Some(patient())).unwrap().len(), 4);
    let expr = Expression::call("descendants", vec![])
        .method("ofType", vec![Expression::identifier("HumanName")])
        .method("count", vec![]);
    assert_eq!(values(&expr, Some(patient())), vec![Value::Integer(2)]);
}

#[test]
fn test_variables_and_constants() {
    let context = EvaluationContext::builder()
        .variable("%limit", Value::Integer(2))
        .build();
    let expr = bin(
        Expression::path("name.given").method("count", vec![]),
        BinaryOp::Greater,
        Expression::variable("%limit"),
    );
    let result = eval_with(&engine(), &expr, Some(patient()), &context).unwrap();
    assert_eq!(result.values(), vec![Value::Boolean(true)]);

    assert_eq!(
        values(&Expression::variable("%ucum"), None),
        text(&["http://unitsofmeasure.org"])
    );
    let err = eval(&Expression::variable("%missing"), None).unwrap_err();
    assert!(matches!(err, EvalError::UnknownVariable { .. }));
}

#[test]
fn test_clock_functions_use_the_session_clock() {
    let offset = FixedOffset::east_opt(3600).unwrap();
    let now = offset.with_ymd_and_hms(2024, 3, 1, 10, 30, 15).unwrap();
    let context = EvaluationContext::builder().now(now).build();
    let engine = engine();

    let today = eval_with(&engine, &Expression::call("today", vec![]), None, &context).unwrap();
    assert_eq!(today.values(), vec![Value::Date(Date::new(2024, 3, 1))]);

    let time = eval_with(&engine, &Expression::call("timeOfDay", vec![]), None, &context).unwrap();
    match time.values().as_slice() {
        [Value::Time(Time { hour: 10, minute: Some(30), second: Some(15), offset: None, .. })] => {}
        other => panic!("unexpected timeOfDay result {other:?}"),
    }

    let same = bin(
        Expression::call("now", vec![]),
        BinaryOp::Equal,
        Expression::call("now", vec![]),
    );
    let result = eval_with(&engine, &same, None, &context).unwrap();
    assert_eq!(result.values(), vec![Value::Boolean(true)]);
}

#[test]
fn test_predicate_and_scalar() {
    let engine = engine();
    let context = EvaluationContext::new();
    let compiled = engine.compile(&Expression::identifier("active")).unwrap();
    assert!(engine.predicate(&compiled, Some(patient()), &context).unwrap());

    let compiled = engine.compile(&Expression::identifier("missing")).unwrap();
    assert!(!engine.predicate(&compiled, Some(patient()), &context).unwrap());
    assert_eq!(engine.scalar(&compiled, Some(patient()), &context).unwrap(), None);

    let compiled = engine.compile(&Expression::path("name.given")).unwrap();
    assert!(engine.scalar(&compiled, Some(patient()), &context).is_err());
}
