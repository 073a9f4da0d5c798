use super::*;
use crate::{
    expr::MethodInfo,
    library::{datetime, enumerable, string},
    test_fixtures::{self as fx, Scope},
    types::TypeRef,
};

fn row(fields: Vec<(&str, Value)>) -> Value {
    fx::customer_row(fields)
}

#[test]
fn predicates_evaluate_against_a_bound_parameter() {
    let mut s = Scope::new();
    let age = s.get(&fx::age());
    let thirty = s.arena.literal(30);
    let older = s.arena.gt(age, thirty);
    let name = s.get(&fx::name());
    let bob = s.arena.literal("Bob");
    let is_bob = s.arena.eq(name, bob);
    let both = s.arena.and(older, is_bob);

    let bob_row = row(vec![("Age", Value::Int32(31)), ("Name", Value::text("Bob"))]);
    let ann_row = row(vec![("Age", Value::Int32(31)), ("Name", Value::text("Ann"))]);

    assert_eq!(evaluate(&s.arena, both, &[(s.x, bob_row)]), Ok(Value::Bool(true)));
    assert_eq!(evaluate(&s.arena, both, &[(s.x, ann_row)]), Ok(Value::Bool(false)));
}

#[test]
fn logical_operators_short_circuit() {
    let mut s = Scope::new();
    let no = s.arena.literal(false);
    let yes = s.arena.literal(true);
    // reading Age off an unbound parameter would fail
    let age = s.get(&fx::age());
    let zero = s.arena.literal(0);
    let risky = s.arena.gt(age, zero);

    let and = s.arena.and(no, risky);
    let or = s.arena.or(yes, risky);

    assert_eq!(evaluate(&s.arena, and, &[]), Ok(Value::Bool(false)));
    assert_eq!(evaluate(&s.arena, or, &[]), Ok(Value::Bool(true)));
    assert_eq!(
        evaluate(&s.arena, risky, &[]),
        Err(EvalError::UnboundParameter { name: "x".into() })
    );
}

#[test]
fn coalesce_only_evaluates_the_fallback_for_null() {
    let mut s = Scope::new();
    let name = s.get(&fx::name());
    let fallback = s.arena.literal("n/a");
    let coalesce = s.arena.binary(crate::expr::BinaryOp::Coalesce, name, fallback);

    let named = row(vec![("Name", Value::text("Zed"))]);
    let unnamed = row(vec![("Name", Value::Null)]);

    assert_eq!(evaluate(&s.arena, coalesce, &[(s.x, named)]), Ok(Value::text("Zed")));
    assert_eq!(evaluate(&s.arena, coalesce, &[(s.x, unnamed)]), Ok(Value::text("n/a")));
}

#[test]
fn member_reads_fail_on_null_receivers_and_missing_fields() {
    let mut s = Scope::new();
    let friend = s.get(&fx::friend());
    let friends_name = s.arena.field(friend, &fx::name());

    let lonely = row(vec![("Friend", Value::Null)]);
    assert_eq!(
        evaluate(&s.arena, friends_name, &[(s.x, lonely)]),
        Err(EvalError::NullReceiver { member: "Name".into() })
    );

    let age = s.get(&fx::age());
    assert!(matches!(
        evaluate(&s.arena, age, &[(s.x, row(vec![]))]),
        Err(EvalError::MissingMember { .. })
    ));
}

#[test]
fn computed_members_use_their_getter() {
    let mut s = Scope::new();
    let count = s.get(&fx::count());
    let fetched = row(vec![("Lines", Value::List(vec![Value::Null, Value::Null]))]);

    assert_eq!(evaluate(&s.arena, count, &[(s.x, fetched)]), Ok(Value::Int32(2)));
}

#[test]
fn calls_and_constructors_run_their_host_functions() {
    let mut s = Scope::new();
    let name = s.get(&fx::name());
    let upper = s.arena.call(Some(name), &string::to_upper(), vec![]);
    let args = [1999, 12, 31].map(|v| s.arena.literal(v));
    let date = s.arena.new_with(datetime::constructor(), args.to_vec());
    let year = s.arena.field(date, &datetime::year());

    let bound = [(s.x, row(vec![("Name", Value::text("ann"))]))];

    assert_eq!(evaluate(&s.arena, upper, &bound), Ok(Value::text("ANN")));
    assert_eq!(evaluate(&s.arena, year, &[]), Ok(Value::Int32(1999)));
}

#[test]
fn calls_without_an_implementation_fail() {
    let mut s = Scope::new();
    let opaque = MethodInfo::new_static("Remote", "Score", vec![], TypeRef::INT32).into_ref();
    let call = s.arena.call(None, &opaque, vec![]);

    assert_eq!(
        evaluate(&s.arena, call, &[]),
        Err(EvalError::NoImplementation {
            method: opaque.key().to_string()
        })
    );
}

#[test]
fn failing_host_functions_are_reported() {
    let mut s = Scope::new();
    let bad_date = [2023, 2, 30].map(|v| s.arena.literal(v));
    let date = s.arena.new_with(datetime::constructor(), bad_date.to_vec());

    assert!(matches!(
        evaluate(&s.arena, date, &[]),
        Err(EvalError::MethodFailed { .. })
    ));
}

#[test]
fn construction_builds_records_and_lists() {
    let mut s = Scope::new();
    let one = s.arena.literal(1);
    let two = s.arena.literal("two");
    let object = s.arena.new_object(vec![("One", one), ("Two", two)]);
    let tuple = s.arena.new_tuple(vec![one, two]);
    let list = s.arena.list_init(TypeRef::INT32, vec![one, one]);

    let object = evaluate(&s.arena, object, &[]).expect("object");
    assert_eq!(object.field("Two"), Some(&Value::text("two")));

    let tuple = evaluate(&s.arena, tuple, &[]).expect("tuple");
    assert_eq!(tuple.field("Item1"), Some(&Value::Int32(1)));

    assert_eq!(
        evaluate(&s.arena, list, &[]),
        Ok(Value::List(vec![Value::Int32(1), Value::Int32(1)]))
    );
}

#[test]
fn array_access_checks_bounds() {
    let mut s = Scope::new();
    let items = s.arena.constant(
        Value::List(vec![Value::Int32(4), Value::Int32(5)]),
        TypeRef::array(TypeRef::INT32),
    );
    let one = s.arena.literal(1);
    let five = s.arena.literal(5);
    let second = s.arena.array_index(items, one);
    let missing = s.arena.array_index(items, five);
    let length = s.arena.array_length(items);

    assert_eq!(evaluate(&s.arena, second, &[]), Ok(Value::Int32(5)));
    assert_eq!(
        evaluate(&s.arena, missing, &[]),
        Err(EvalError::IndexOutOfRange { index: 5, len: 2 })
    );
    assert_eq!(evaluate(&s.arena, length, &[]), Ok(Value::Int32(2)));
}

#[test]
fn type_tests_and_safe_casts() {
    let mut s = Scope::new();
    let other = TypeRef::Resource(crate::types::ResourceType::new("Vip"));
    let is_customer = s.arena.type_is(s.x, fx::customer_ty());
    let as_vip = s.arena.type_as(s.x, other);
    let bound = [(s.x, row(vec![]))];

    assert_eq!(evaluate(&s.arena, is_customer, &bound), Ok(Value::Bool(true)));
    assert_eq!(evaluate(&s.arena, as_vip, &bound), Ok(Value::Null));
}

#[test]
fn conditionals_require_a_boolean_test() {
    let mut s = Scope::new();
    let test = s.arena.literal(1);
    let a = s.arena.literal("a");
    let b = s.arena.literal("b");
    let choice = s.arena.conditional(test, a, b);

    assert!(matches!(
        evaluate(&s.arena, choice, &[]),
        Err(EvalError::Mismatch { expected: "boolean", .. })
    ));
}

#[test]
fn non_value_nodes_cannot_be_evaluated() {
    let mut s = Scope::new();
    let name = s.get(&fx::name());
    let lambda = s.lambda(name);
    let source = s.arena.source(&fx::customer());
    let compiled = s
        .arena
        .compiled(crate::node::ExtendedNode::terminal("name", TypeRef::STRING));

    assert_eq!(evaluate(&s.arena, lambda, &[]), Err(EvalError::Lambda));
    assert_eq!(
        evaluate(&s.arena, source, &[]),
        Err(EvalError::Source {
            name: fx::CUSTOMER.into()
        })
    );
    assert_eq!(evaluate(&s.arena, compiled, &[]), Err(EvalError::Compiled));
}

#[test]
fn operator_errors_convert_and_classify() {
    let mut s = Scope::new();
    let big = s.arena.literal(i32::MAX);
    let one = s.arena.literal(1);
    let overflow = s.arena.binary(crate::expr::BinaryOp::Add, big, one);

    let err = evaluate(&s.arena, overflow, &[]).expect_err("overflows");
    assert!(matches!(err, EvalError::Operator(_)));

    let internal = InternalError::from(err);
    assert_eq!(internal.class, ErrorClass::Internal);
    assert_eq!(internal.origin, ErrorOrigin::Eval);
    assert!(InternalError::from(EvalError::Compiled).is_invariant_violation());
}

#[test]
fn higher_order_calls_bind_the_lambda_parameter_per_item() {
    let mut s = Scope::new();
    let tags = s.get(&fx::tags());
    let t = s.arena.parameter("t", TypeRef::STRING);
    let vip = s.arena.literal("vip");
    let is_vip = s.arena.eq(t, vip);
    let inner = s.arena.lambda1(t, is_vip);
    let quoted = s.arena.quote(inner);
    let any = s
        .arena
        .call(None, &enumerable::any_predicate(), vec![tags, quoted]);
    let all = s.arena.call(None, &enumerable::all(), vec![tags, inner]);

    let mixed = row(vec![(
        "Tags",
        Value::List(vec![Value::text("new"), Value::text("vip")]),
    )]);
    let vips = row(vec![("Tags", Value::List(vec![Value::text("vip")]))]);
    let empty = row(vec![("Tags", Value::List(vec![]))]);

    assert_eq!(evaluate(&s.arena, any, &[(s.x, mixed.clone())]), Ok(Value::Bool(true)));
    assert_eq!(evaluate(&s.arena, all, &[(s.x, mixed)]), Ok(Value::Bool(false)));
    assert_eq!(evaluate(&s.arena, all, &[(s.x, vips)]), Ok(Value::Bool(true)));
    assert_eq!(evaluate(&s.arena, any, &[(s.x, empty.clone())]), Ok(Value::Bool(false)));
    assert_eq!(evaluate(&s.arena, all, &[(s.x, empty)]), Ok(Value::Bool(true)));
}

#[test]
fn errors_inside_a_lambda_argument_are_reported_as_is() {
    let mut s = Scope::new();
    let tags = s.get(&fx::tags());
    let t = s.arena.parameter("t", TypeRef::STRING);
    let age = s.get(&fx::age());
    let zero = s.arena.literal(0);
    let adult = s.arena.gt(age, zero);
    let inner = s.arena.lambda1(t, adult);
    let any = s
        .arena
        .call(None, &enumerable::any_predicate(), vec![tags, inner]);

    let no_age = row(vec![("Tags", Value::List(vec![Value::text("vip")]))]);

    assert_eq!(
        evaluate(&s.arena, any, &[(s.x, no_age)]),
        Err(EvalError::MissingMember {
            member: fx::age().key().to_string()
        })
    );
}

#[test]
fn integer_conversions_produce_enum_values() {
    let mut s = Scope::new();
    let one = s.arena.literal(1);
    let status = s.arena.convert(one, TypeRef::Enum(fx::status()));
    let member = s.get(&fx::status_member());

    assert_eq!(evaluate(&s.arena, status, &[]), Ok(fx::status_value(1)));

    let active = row(vec![("Status", fx::status_value(1))]);
    assert_eq!(
        evaluate(&s.arena, member, &[(s.x, active)]),
        Ok(fx::status_value(1))
    );
}
