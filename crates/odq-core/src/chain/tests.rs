use super::*;
use crate::{
    config::{NamingConfig, PagingConfig},
    expr::{BinaryOp, MemberRef, MethodInfo, ParamShape},
    library::queryable,
    test_fixtures::{self as fx, Scope},
    types::ResourceType,
};

///
/// Query
///
/// Test-side chain builder over the `Customer` fixture source.
///

struct Query {
    s: Scope,
    current: ExprId,
}

impl Query {
    fn new() -> Self {
        let mut s = Scope::new();
        let current = s.arena.source(&fx::customer());

        Self { s, current }
    }

    fn then(mut self, op: QueryOperator, args: impl FnOnce(&mut Scope) -> Vec<ExprId>) -> Self {
        let args = args(&mut self.s);
        self.current = queryable::apply(&mut self.s.arena, op, self.current, args)
            .expect("operator overload exists");

        self
    }

    fn parse(self) -> Result<QueryPlan, QueryError> {
        self.parse_with(&ChainParser::default())
    }

    fn parse_with(mut self, parser: &ChainParser) -> Result<QueryPlan, QueryError> {
        parser.parse(&mut self.s.arena, self.current)
    }
}

fn older_than(s: &mut Scope, years: i32) -> Vec<ExprId> {
    let age = s.get(&fx::age());
    let limit = s.arena.literal(years);
    let gt = s.arena.gt(age, limit);

    vec![s.lambda(gt)]
}

fn by(member: MemberRef) -> impl FnOnce(&mut Scope) -> Vec<ExprId> {
    move |s| {
        let value = s.get(&member);
        vec![s.lambda(value)]
    }
}

fn count(n: i32) -> impl FnOnce(&mut Scope) -> Vec<ExprId> {
    move |s| vec![s.arena.literal(n)]
}

fn none(_: &mut Scope) -> Vec<ExprId> {
    Vec::new()
}

fn chain_error(result: Result<QueryPlan, QueryError>) -> ChainError {
    match result {
        Err(QueryError::Chain(err)) => err,
        other => panic!("expected a chain error, got {other:?}"),
    }
}

//
// Plans
//

#[test]
fn full_chain_renders_parameters_in_wire_order() {
    let plan = Query::new()
        .then(QueryOperator::Where, |s| older_than(s, 30))
        .then(QueryOperator::OrderBy, by(fx::name()))
        .then(QueryOperator::ThenByDescending, by(fx::age()))
        .then(QueryOperator::Skip, count(10))
        .then(QueryOperator::Take, count(5))
        .parse()
        .expect("valid chain");

    assert_eq!(plan.source, fx::CUSTOMER);
    assert_eq!(plan.element_type, fx::customer_ty());
    assert_eq!(
        plan.parameters().to_string(),
        "$filter=age gt 30&$orderby=name,age desc&$skip=10&$top=5"
    );
}

#[test]
fn successive_filters_are_conjoined_on_one_parameter() {
    let plan = Query::new()
        .then(QueryOperator::Where, |s| older_than(s, 30))
        .then(QueryOperator::Where, |s| {
            let y = s.arena.parameter("y", fx::customer_ty());
            let name = s.arena.field(y, &fx::name());
            let bob = s.arena.literal("Bob");
            let eq = s.arena.eq(name, bob);
            vec![s.arena.lambda1(y, eq)]
        })
        .parse()
        .expect("valid chain");

    assert_eq!(
        plan.parameters().get("$filter"),
        Some("age gt 30 and name eq 'Bob'")
    );
}

#[test]
fn filters_are_folded_before_compiling() {
    let plan = Query::new()
        .then(QueryOperator::Where, |s| {
            let age = s.get(&fx::age());
            let ten = s.arena.literal(10);
            let three = s.arena.literal(3);
            let limit = s.arena.binary(BinaryOp::Mul, ten, three);
            let gt = s.arena.gt(age, limit);
            vec![s.lambda(gt)]
        })
        .parse()
        .expect("valid chain");

    assert_eq!(plan.parameters().get("$filter"), Some("age gt 30"));
}

#[test]
fn skip_accumulates_and_take_keeps_the_minimum() {
    let plan = Query::new()
        .then(QueryOperator::Skip, count(5))
        .then(QueryOperator::Skip, count(3))
        .then(QueryOperator::Take, count(10))
        .then(QueryOperator::Take, count(4))
        .then(QueryOperator::Take, count(7))
        .parse()
        .expect("valid chain");

    assert_eq!(plan.skip, Some(8));
    assert_eq!(plan.take, Some(4));
}

#[test]
fn first_with_a_predicate_filters_and_limits() {
    let plan = Query::new()
        .then(QueryOperator::Take, count(20))
        .then(QueryOperator::First, none)
        .parse()
        .expect("valid chain");

    assert_eq!(plan.mode, ProjectionMode::First);
    assert_eq!(plan.take, Some(1));

    let plan = Query::new()
        .then(QueryOperator::FirstOrDefault, |s| older_than(s, 65))
        .parse()
        .expect("valid chain");

    assert_eq!(
        plan.parameters().to_string(),
        "$projection=firstOrDefault&$filter=age gt 65&$top=1"
    );
}

#[test]
fn any_and_to_uri_set_the_projection_mode() {
    let any = Query::new()
        .then(QueryOperator::Any, |s| older_than(s, 18))
        .parse()
        .expect("valid chain");
    let uri = Query::new()
        .then(QueryOperator::ToUri, none)
        .parse()
        .expect("valid chain");

    assert_eq!(any.mode, ProjectionMode::Any);
    assert_eq!(any.parameters().get("$projection"), Some("any"));
    assert_eq!(uri.mode, ProjectionMode::Uri);
    assert_eq!(uri.parameters().names(), vec!["$projection"]);
}

#[test]
fn default_top_applies_to_unbounded_streams_only() {
    let config = CompilerConfig {
        naming: NamingConfig::default(),
        paging: PagingConfig {
            default_top: Some(100),
        },
    };
    let parser = ChainParser::new(CompileContext::standard(), config);

    let stream = Query::new().parse_with(&parser).expect("valid chain");
    let limited = Query::new()
        .then(QueryOperator::Take, count(5))
        .parse_with(&parser)
        .expect("valid chain");
    let uri = Query::new()
        .then(QueryOperator::ToUri, none)
        .parse_with(&parser)
        .expect("valid chain");

    assert_eq!(stream.take, Some(100));
    assert_eq!(limited.take, Some(5));
    assert_eq!(uri.take, None);
}

#[test]
fn naming_config_reaches_the_compilers() {
    let config = CompilerConfig::from_toml_str("[naming]\nmembers = \"preserve\"\n").expect("valid config");
    let parser = ChainParser::new(CompileContext::standard(), config);

    let plan = Query::new()
        .then(QueryOperator::Where, |s| older_than(s, 30))
        .then(QueryOperator::Expand, |s| {
            let friend = s.get(&fx::friend());
            vec![s.lambda(friend)]
        })
        .parse_with(&parser)
        .expect("valid chain");

    assert_eq!(plan.parameters().get("$filter"), Some("Age gt 30"));
    assert_eq!(plan.expand, vec!["Friend".to_string()]);
}

#[test]
fn expand_accepts_paths_and_member_chains() {
    let plan = Query::new()
        .then(QueryOperator::Expand, |s| vec![s.arena.literal("Orders/Lines")])
        .then(QueryOperator::Expand, |s| {
            let friend = s.get(&fx::friend());
            let tags = s.arena.field(friend, &fx::tags());
            vec![s.lambda(tags)]
        })
        .parse()
        .expect("valid chain");

    assert_eq!(plan.parameters().get("$expand"), Some("Orders/Lines,friend/tags"));
}

#[test]
fn expand_rejects_anything_but_a_member_chain() {
    let err = chain_error(
        Query::new()
            .then(QueryOperator::Expand, |s| {
                let five = s.arena.literal(5);
                vec![s.lambda(five)]
            })
            .parse(),
    );

    assert!(matches!(
        err,
        ChainError::InvalidArgument {
            op: QueryOperator::Expand,
            ..
        }
    ));
}

#[test]
fn of_type_narrows_the_element_type() {
    let vip = TypeRef::Resource(ResourceType::new("Vip"));
    let plan = Query::new()
        .then(QueryOperator::OfType, |s| {
            vec![s.arena.constant(Value::Type(vip.clone()), TypeRef::TYPE)]
        })
        .then(QueryOperator::WithTotalCount, none)
        .parse()
        .expect("valid chain");

    assert_eq!(plan.element_type, vip);
    assert_eq!(plan.parameters().to_string(), "$oftype=Vip&$totalcount=true");
}

#[test]
fn group_by_compiles_its_key() {
    let plan = Query::new()
        .then(QueryOperator::GroupBy, by(fx::status_member()))
        .parse()
        .expect("valid chain");

    assert_eq!(plan.parameters().get("$groupby"), Some("status"));
}

#[test]
fn group_by_accepts_a_composite_key() {
    let plan = Query::new()
        .then(QueryOperator::GroupBy, |s| {
            let status = s.get(&fx::status_member());
            let age = s.get(&fx::age());
            let key = s.arena.new_object(vec![("Status", status), ("Age", age)]);
            vec![s.lambda(key)]
        })
        .parse()
        .expect("valid chain");

    assert_eq!(
        plan.parameters().get("$groupby"),
        Some("status as Status,age as Age")
    );
}

#[test]
fn server_projection_is_a_select() {
    let plan = Query::new()
        .then(QueryOperator::Select, |s| {
            let name = s.get(&fx::name());
            let age = s.get(&fx::age());
            let shape = s.arena.new_object(vec![("Name", name), ("Age", age)]);
            vec![s.lambda(shape)]
        })
        .parse()
        .expect("valid chain");

    assert_eq!(plan.parameters().get("$select"), Some("name as Name,age as Age"));
    assert!(plan.local_projection().is_none());
}

#[test]
fn partially_local_projection_is_partitioned() {
    let plan = Query::new()
        .then(QueryOperator::Select, |s| {
            let name = s.get(&fx::name());
            let count = s.get(&fx::count());
            let shape = s.arena.new_object(vec![("Name", name), ("Count", count)]);
            vec![s.lambda(shape)]
        })
        .parse()
        .expect("valid chain");

    assert_eq!(plan.parameters().get("$select"), Some("[name,this]"));

    let local = plan.local_projection().expect("split projection");
    let row = [
        Value::text("Ann"),
        fx::customer_row(vec![("Lines", Value::List(vec![Value::Null]))]),
    ];
    let projected = local.evaluate(&row).expect("evaluates");
    assert_eq!(projected.field("Count"), Some(&Value::Int32(1)));
}

#[test]
fn unsupported_filter_names_the_construct() {
    let result = Query::new()
        .then(QueryOperator::Where, |s| {
            let count = s.get(&fx::count());
            let zero = s.arena.literal(0);
            let gt = s.arena.gt(count, zero);
            vec![s.lambda(gt)]
        })
        .parse();

    match result {
        Err(QueryError::NotSupported { construct }) => {
            assert_eq!(construct, "member 'Count' of 'Customer' is only available locally");
        }
        other => panic!("expected NotSupported, got {other:?}"),
    }
}

//
// Ordering rules
//

#[test]
fn filters_cannot_follow_paging_or_projection() {
    let err = chain_error(
        Query::new()
            .then(QueryOperator::Take, count(3))
            .then(QueryOperator::Where, |s| older_than(s, 30))
            .parse(),
    );
    assert_eq!(
        err,
        ChainError::Misplaced {
            op: QueryOperator::Where,
            after: QueryOperator::Take
        }
    );

    let err = chain_error(
        Query::new()
            .then(QueryOperator::Select, by(fx::name()))
            .then(QueryOperator::First, |s| older_than(s, 30))
            .parse(),
    );
    assert_eq!(
        err,
        ChainError::Misplaced {
            op: QueryOperator::First,
            after: QueryOperator::Select
        }
    );
}

#[test]
fn ordering_rules() {
    let twice = chain_error(
        Query::new()
            .then(QueryOperator::OrderBy, by(fx::name()))
            .then(QueryOperator::OrderByDescending, by(fx::age()))
            .parse(),
    );
    assert_eq!(
        twice,
        ChainError::Repeated {
            op: QueryOperator::OrderByDescending
        }
    );

    let orphan = chain_error(
        Query::new()
            .then(QueryOperator::ThenBy, by(fx::name()))
            .parse(),
    );
    assert_eq!(
        orphan,
        ChainError::ThenWithoutOrder {
            op: QueryOperator::ThenBy
        }
    );

    let after_skip = chain_error(
        Query::new()
            .then(QueryOperator::Skip, count(1))
            .then(QueryOperator::OrderBy, by(fx::name()))
            .parse(),
    );
    assert_eq!(
        after_skip,
        ChainError::Misplaced {
            op: QueryOperator::OrderBy,
            after: QueryOperator::Skip
        }
    );
}

#[test]
fn paging_and_projection_rules() {
    let skip_after_take = chain_error(
        Query::new()
            .then(QueryOperator::Take, count(1))
            .then(QueryOperator::Skip, count(1))
            .parse(),
    );
    assert_eq!(
        skip_after_take,
        ChainError::Misplaced {
            op: QueryOperator::Skip,
            after: QueryOperator::Take
        }
    );

    let select_twice = chain_error(
        Query::new()
            .then(QueryOperator::Select, by(fx::name()))
            .then(QueryOperator::Select, by(fx::age()))
            .parse(),
    );
    assert_eq!(
        select_twice,
        ChainError::Repeated {
            op: QueryOperator::Select
        }
    );

    let of_type_after_select = chain_error(
        Query::new()
            .then(QueryOperator::Select, by(fx::name()))
            .then(QueryOperator::OfType, |s| {
                vec![s.arena.constant(Value::Type(TypeRef::STRING), TypeRef::TYPE)]
            })
            .parse(),
    );
    assert!(matches!(
        of_type_after_select,
        ChainError::Misplaced {
            op: QueryOperator::OfType,
            ..
        }
    ));
}

#[test]
fn nothing_follows_a_terminal_operator() {
    let err = chain_error(
        Query::new()
            .then(QueryOperator::First, none)
            .then(QueryOperator::Take, count(2))
            .parse(),
    );

    assert_eq!(
        err,
        ChainError::AfterTerminal {
            op: QueryOperator::Take,
            terminal: QueryOperator::First
        }
    );
}

#[test]
fn counts_must_be_non_negative_integer_constants() {
    let negative = chain_error(Query::new().then(QueryOperator::Take, count(-1)).parse());
    let text = chain_error(
        Query::new()
            .then(QueryOperator::Skip, |s| vec![s.arena.literal("ten")])
            .parse(),
    );

    assert_eq!(negative, ChainError::InvalidCount { op: QueryOperator::Take });
    assert_eq!(text, ChainError::InvalidCount { op: QueryOperator::Skip });
}

#[test]
fn predicates_must_be_one_parameter_lambdas() {
    let err = chain_error(
        Query::new()
            .then(QueryOperator::Where, |s| vec![s.arena.literal(true)])
            .parse(),
    );

    assert!(matches!(
        err,
        ChainError::InvalidArgument {
            op: QueryOperator::Where,
            ..
        }
    ));
}

//
// Chain shape
//

#[test]
fn unknown_queryable_methods_are_reported() {
    let mut s = Scope::new();
    let source = s.arena.source(&fx::customer());
    let reverse = MethodInfo::new_static(
        crate::library::QUERYABLE,
        "Reverse",
        vec![ParamShape::Queryable],
        TypeRef::OBJECT,
    )
    .into_ref();
    let root = s.arena.call(None, &reverse, vec![source]);

    let result = ChainParser::default().parse(&mut s.arena, root);

    assert!(matches!(
        result,
        Err(QueryError::UnknownOperator { ref name, arity: 1 }) if name == "Reverse"
    ));
}

#[test]
fn chains_must_start_at_a_source() {
    let mut s = Scope::new();
    let name = s.get(&fx::name());

    let result = ChainParser::default().parse(&mut s.arena, name);

    assert!(matches!(result, Err(QueryError::NotSupported { .. })));
}

//
// Parameters
//

#[test]
fn parameters_serialize_as_a_map() {
    let plan = Query::new()
        .then(QueryOperator::Where, |s| older_than(s, 30))
        .then(QueryOperator::Take, count(5))
        .parse()
        .expect("valid chain");
    let params = plan.parameters();

    assert_eq!(params.len(), 2);
    assert!(!params.is_empty());
    assert_eq!(
        params.iter().collect::<Vec<_>>(),
        vec![("$filter", "age gt 30"), ("$top", "5")]
    );
    assert_eq!(
        serde_json::to_value(&params).expect("serializes"),
        serde_json::json!({ "$filter": "age gt 30", "$top": "5" })
    );
}

#[test]
fn empty_plan_has_no_parameters() {
    let plan = Query::new().parse().expect("valid chain");

    assert!(plan.parameters().is_empty());
    assert_eq!(plan.parameters().to_string(), "");
    assert_eq!(ProjectionMode::Stream.token(), None);
}
