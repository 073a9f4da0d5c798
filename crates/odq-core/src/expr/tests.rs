use super::{builder::binary_result_type, *};
use crate::{
    library::string,
    types::{Primitive, ResourceType},
};

fn customer() -> TypeRef {
    TypeRef::Resource(ResourceType::new("Customer"))
}

fn age() -> MemberRef {
    MemberInfo::new("Customer", "Age", TypeRef::INT32).into_ref()
}

#[test]
fn builders_compute_result_types() {
    let mut arena = ExprArena::new();
    let x = arena.parameter("x", customer());
    let age = arena.field(x, &age());
    let one = arena.literal(1_i64);
    let sum = arena.binary(BinaryOp::Add, age, one);
    let gt = arena.gt(sum, one);

    assert_eq!(arena.ty(age), &TypeRef::INT32);
    assert_eq!(arena.ty(sum), &TypeRef::INT64);
    assert_eq!(arena.ty(gt), &TypeRef::BOOL);
    assert_eq!(arena.len(), 5);
}

#[test]
fn nullable_operands_lift_arithmetic() {
    assert_eq!(
        binary_result_type(
            BinaryOp::Mul,
            &TypeRef::nullable(TypeRef::INT32),
            &TypeRef::DOUBLE
        ),
        TypeRef::nullable(TypeRef::DOUBLE)
    );
    assert_eq!(
        binary_result_type(BinaryOp::Add, &TypeRef::Primitive(Primitive::Int16), &TypeRef::BYTE),
        TypeRef::INT32
    );
    assert_eq!(
        binary_result_type(BinaryOp::Add, &TypeRef::STRING, &TypeRef::INT32),
        TypeRef::STRING
    );
}

#[test]
fn as_lambda_sees_through_quotes() {
    let mut arena = ExprArena::new();
    let x = arena.parameter("x", customer());
    let body = arena.literal(true);
    let lambda = arena.lambda1(x, body);
    let quoted = arena.quote(lambda);

    let (params, found) = arena.as_lambda(quoted).expect("quoted lambda");
    assert_eq!(params, &[x]);
    assert_eq!(found, body);
    assert!(arena.as_lambda(body).is_none());
}

#[test]
fn with_children_returns_the_same_id_when_unchanged() {
    let mut arena = ExprArena::new();
    let a = arena.literal(1);
    let b = arena.literal(2);
    let sum = arena.binary(BinaryOp::Add, a, b);
    let before = arena.len();

    assert_eq!(with_children(&mut arena, sum, &[a, b]), sum);
    assert_eq!(arena.len(), before);
}

#[test]
fn with_children_appends_a_rebuilt_node() {
    let mut arena = ExprArena::new();
    let a = arena.literal(1);
    let b = arena.literal(2);
    let c = arena.literal(3);
    let sum = arena.binary(BinaryOp::Add, a, b);

    let rebuilt = with_children(&mut arena, sum, &[a, c]);

    assert_ne!(rebuilt, sum);
    assert!(matches!(
        arena.get(rebuilt),
        Expr::Binary { op: BinaryOp::Add, left, right } if *left == a && *right == c
    ));
    // the original is untouched
    assert!(matches!(arena.get(sum), Expr::Binary { right, .. } if *right == b));
}

#[test]
fn children_follow_evaluation_order() {
    let mut arena = ExprArena::new();
    let s = arena.parameter("s", TypeRef::STRING);
    let prefix = arena.literal("a");
    let call = arena.call(Some(s), &string::starts_with(), vec![prefix]);

    assert_eq!(children(&arena, call), vec![s, prefix]);
    assert!(children(&arena, prefix).is_empty());
}

#[test]
fn replace_parameter_rewrites_every_occurrence() {
    let mut arena = ExprArena::new();
    let x = arena.parameter("x", customer());
    let y = arena.parameter("y", customer());
    let left = arena.field(x, &age());
    let right = arena.field(x, &age());
    let sum = arena.binary(BinaryOp::Add, left, right);

    let replaced = replace_parameter(&mut arena, sum, x, y);

    let Expr::Binary { left, right, .. } = arena.get(replaced) else {
        panic!("expected a binary node");
    };
    for side in [*left, *right] {
        assert!(matches!(arena.get(side), Expr::Member { receiver: Some(r), .. } if *r == y));
    }
}

#[test]
fn new_object_records_its_shape() {
    let mut arena = ExprArena::new();
    let name = arena.literal("Ann");
    let age = arena.literal(30);
    let object = arena.new_object(vec![("Name", name), ("Age", age)]);
    let tuple = arena.new_tuple(vec![name, age]);

    let TypeRef::Record(shape) = arena.ty(object) else {
        panic!("expected a record type");
    };
    assert_eq!(shape.field("Age"), Some(&TypeRef::INT32));

    let TypeRef::Record(shape) = arena.ty(tuple) else {
        panic!("expected a record type");
    };
    assert_eq!(shape.field("Item1"), Some(&TypeRef::STRING));
}

#[test]
fn binary_precedence_orders_loosest_first() {
    assert!(BinaryOp::Or.precedence() < BinaryOp::And.precedence());
    assert!(BinaryOp::And.precedence() < BinaryOp::Eq.precedence());
    assert!(BinaryOp::Eq.precedence() < BinaryOp::Add.precedence());
    assert!(BinaryOp::Add.precedence() < BinaryOp::Mul.precedence());
    assert_eq!(BinaryOp::Coalesce.keyword(), None);
    assert_eq!(BinaryOp::Mod.keyword(), Some("mod"));
}
