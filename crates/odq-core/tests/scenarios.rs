//! End-to-end scenarios over the public API: build a host query tree, parse
//! the chain, inspect the rendered parameters.

use odq_core::{
    chain::QueryError,
    compile::PredicateCompiler,
    expr::{MemberRef, MethodInfo, ParamShape},
    library::{self, queryable},
    node::{NodeKind, strip_scope},
    partition::Partitioner,
    prelude::*,
    types::{EnumType, ResourceType},
    value::RecordValue,
};
use rust_decimal::Decimal;
use std::sync::Arc;

struct Model {
    customer: Arc<ResourceType>,
    id: MemberRef,
    name: MemberRef,
    age: MemberRef,
    price: MemberRef,
    status: MemberRef,
    count: MemberRef,
}

impl Model {
    fn new() -> Self {
        let status = EnumType::new("Status", Primitive::Int32, [("Inactive", 0), ("Active", 1)]);
        let id = MemberInfo::new("Customer", "Id", TypeRef::INT32).into_ref();

        Self {
            customer: ResourceType::with_identity("Customer", id.clone()),
            id,
            name: MemberInfo::new("Customer", "Name", TypeRef::STRING).into_ref(),
            age: MemberInfo::new("Customer", "Age", TypeRef::INT32).into_ref(),
            price: MemberInfo::new("Customer", "Price", TypeRef::DECIMAL).into_ref(),
            status: MemberInfo::new("Customer", "Status", TypeRef::Enum(status)).into_ref(),
            count: MemberInfo::new("Customer", "Count", TypeRef::INT32)
                .with_getter(|row| match row.field("Lines")? {
                    Value::List(lines) => i32::try_from(lines.len()).ok().map(Value::Int32),
                    _ => None,
                })
                .local_only()
                .into_ref(),
        }
    }

    fn ty(&self) -> TypeRef {
        TypeRef::Resource(self.customer.clone())
    }
}

fn filter(arena: &mut ExprArena, model: &Model, predicate: ExprId) -> Result<QueryPlan, QueryError> {
    let source = arena.source(&model.customer);
    let root = queryable::apply(arena, QueryOperator::Where, source, vec![predicate]).expect("Where applies");

    ChainParser::default().parse(arena, root)
}

#[test]
fn filter_with_two_comparisons() {
    let model = Model::new();
    let mut arena = ExprArena::new();
    let x = arena.parameter("x", model.ty());
    let age = arena.field(x, &model.age);
    let thirty = arena.literal(30);
    let older = arena.gt(age, thirty);
    let name = arena.field(x, &model.name);
    let bob = arena.literal("Bob");
    let is_bob = arena.eq(name, bob);
    let both = arena.and(older, is_bob);
    let predicate = arena.lambda1(x, both);

    let plan = filter(&mut arena, &model, predicate).expect("valid query");

    assert_eq!(
        plan.parameters().to_string(),
        "$filter=age gt 30 and name eq 'Bob'"
    );
}

#[test]
fn filter_on_an_integer_cast_enum() {
    let model = Model::new();
    let mut arena = ExprArena::new();
    let x = arena.parameter("x", model.ty());
    let status = arena.field(x, &model.status);
    let cast = arena.convert(status, TypeRef::INT32);
    let active = arena.literal(1);
    let eq = arena.eq(cast, active);
    let predicate = arena.lambda1(x, eq);

    let plan = filter(&mut arena, &model, predicate).expect("valid query");

    assert_eq!(plan.parameters().get("$filter"), Some("status eq 'Active'"));
}

#[test]
fn order_by_then_by_descending() {
    let model = Model::new();
    let mut arena = ExprArena::new();
    let x = arena.parameter("x", model.ty());
    let name = arena.field(x, &model.name);
    let by_name = arena.lambda1(x, name);
    let age = arena.field(x, &model.age);
    let by_age = arena.lambda1(x, age);

    let source = arena.source(&model.customer);
    let ordered = queryable::apply(&mut arena, QueryOperator::OrderBy, source, vec![by_name]).expect("OrderBy applies");
    let root = queryable::apply(&mut arena, QueryOperator::ThenByDescending, ordered, vec![by_age])
        .expect("ThenByDescending applies");

    let plan = ChainParser::default().parse(&mut arena, root).expect("valid query");

    assert_eq!(plan.parameters().get("$orderby"), Some("name,age desc"));
}

#[test]
fn projection_with_a_local_only_member_is_split() {
    let model = Model::new();
    let mut arena = ExprArena::new();
    let x = arena.parameter("x", model.ty());
    let name = arena.field(x, &model.name);
    let price = arena.field(x, &model.price);
    let count = arena.field(x, &model.count);
    let total = arena.binary(BinaryOp::Mul, price, count);
    let shape = arena.new_object(vec![("Name", name), ("Total", total)]);
    let selector = arena.lambda1(x, shape);

    let source = arena.source(&model.customer);
    let root = queryable::apply(&mut arena, QueryOperator::Select, source, vec![selector]).expect("Select applies");
    let plan = ChainParser::default().parse(&mut arena, root).expect("valid query");

    let select = plan.parameters().get("$select").map(str::to_string);
    assert_eq!(select.as_deref(), Some("[name,price,this]"));

    let local = plan.local_projection().expect("projection is split");
    let row = vec![
        Value::text("Ann"),
        Value::Decimal(Decimal::new(400, 2)),
        Value::Record(RecordValue::typed(
            "Customer",
            vec![(
                "Lines".to_string(),
                Value::List(vec![Value::Null, Value::Null]),
            )],
        )),
    ];
    let projected = local.evaluate(&row).expect("local half evaluates");

    assert_eq!(projected.field("Name"), Some(&Value::text("Ann")));
    assert_eq!(projected.field("Total"), Some(&Value::Decimal(Decimal::new(8, 0))));
}

#[test]
fn repeated_boxed_identity_reads_share_a_slot() {
    let model = Model::new();
    let mut arena = ExprArena::new();
    let x = arena.parameter("x", model.ty());
    let first = arena.field(x, &model.id);
    let first = arena.convert(first, TypeRef::OBJECT);
    let second = arena.field(x, &model.id);
    let second = arena.convert(second, TypeRef::OBJECT);
    let count = arena.field(x, &model.count);
    let shape = arena.new_object(vec![("A", first), ("B", second), ("Lines", count)]);
    let selector = arena.lambda1(x, shape);
    let ctx = CompileContext::standard();

    let split = Partitioner::partition(&arena, &ctx, selector).expect("partitioned");

    let NodeKind::ClientServerSplit { server, local } = split.kind() else {
        panic!("expected a client/server split");
    };
    assert_eq!(strip_scope(server), "[id,this]");
    assert_eq!(local.slot_count(), 2);
}

#[test]
fn unregistered_method_is_reported_by_name() {
    let model = Model::new();
    let mut arena = ExprArena::new();
    let x = arena.parameter("x", model.ty());
    let name = arena.field(x, &model.name);
    let pad_left = MethodInfo::new_instance(library::STRING, "PadLeft", vec![ParamShape::Value], TypeRef::STRING)
        .into_ref();
    let width = arena.literal(10);
    let padded = arena.call(Some(name), &pad_left, vec![width]);
    let bob = arena.literal("       Bob");
    let eq = arena.eq(padded, bob);
    let predicate = arena.lambda1(x, eq);
    let ctx = CompileContext::standard();

    let node = PredicateCompiler::new(&arena, &ctx).compile(predicate);
    assert!(!node.is_supported_on_server());
    let cause = node.first_unsupported().and_then(ExtendedNode::cause);
    assert_eq!(cause, Some("method 'PadLeft' declared on 'String' is not supported"));

    match filter(&mut arena, &model, predicate) {
        Err(QueryError::NotSupported { construct }) => assert!(construct.contains("PadLeft")),
        other => panic!("expected an unsupported filter, got {other:?}"),
    }
}
