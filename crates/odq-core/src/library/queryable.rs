//! Queryable chain operators.

use crate::{
    chain::QueryOperator,
    expr::{ExprArena, ExprId, MethodInfo, MethodRef, ParamShape, SpecialMethod},
    library::QUERYABLE,
    types::TypeRef,
};
use std::sync::LazyLock;

static OPERATORS: LazyLock<Vec<MethodRef>> = LazyLock::new(|| {
    use ParamShape::{Expression, Queryable, Value};

    let overloads: &[(QueryOperator, &[ParamShape])] = &[
        (QueryOperator::Where, &[Queryable, Expression]),
        (QueryOperator::OrderBy, &[Queryable, Expression]),
        (QueryOperator::OrderByDescending, &[Queryable, Expression]),
        (QueryOperator::ThenBy, &[Queryable, Expression]),
        (QueryOperator::ThenByDescending, &[Queryable, Expression]),
        (QueryOperator::Select, &[Queryable, Expression]),
        (QueryOperator::GroupBy, &[Queryable, Expression]),
        (QueryOperator::Skip, &[Queryable, Value]),
        (QueryOperator::Take, &[Queryable, Value]),
        (QueryOperator::First, &[Queryable]),
        (QueryOperator::First, &[Queryable, Expression]),
        (QueryOperator::FirstOrDefault, &[Queryable]),
        (QueryOperator::FirstOrDefault, &[Queryable, Expression]),
        (QueryOperator::FirstLazy, &[Queryable]),
        (QueryOperator::Any, &[Queryable]),
        (QueryOperator::Any, &[Queryable, Expression]),
        (QueryOperator::Expand, &[Queryable, Expression]),
        (QueryOperator::Expand, &[Queryable, Value]),
        (QueryOperator::OfType, &[Queryable, Value]),
        (QueryOperator::WithTotalCount, &[Queryable]),
        (QueryOperator::ToUri, &[Queryable]),
    ];

    overloads
        .iter()
        .map(|(op, params)| {
            MethodInfo::new_static(QUERYABLE, op.to_string(), params.to_vec(), TypeRef::OBJECT)
                .with_special(SpecialMethod::Query(*op))
                .into_ref()
        })
        .collect()
});

/// Overload of `op` taking `arity` arguments (source included).
#[must_use]
pub fn method(op: QueryOperator, arity: usize) -> Option<MethodRef> {
    OPERATORS
        .iter()
        .find(|m| m.special == Some(SpecialMethod::Query(op)) && m.params.len() == arity)
        .cloned()
}

/// Apply `op` to `source`, typing the call from its arguments.
/// `None` when no overload takes these arguments.
pub fn apply(
    arena: &mut ExprArena,
    op: QueryOperator,
    source: ExprId,
    args: Vec<ExprId>,
) -> Option<ExprId> {
    let method = method(op, args.len() + 1)?;
    let source_ty = arena.ty(source).clone();
    let element = source_ty.element_type().cloned().unwrap_or(TypeRef::OBJECT);

    let ty = match op {
        QueryOperator::Select => {
            let (_, body) = arena.as_lambda(*args.first()?)?;
            TypeRef::queryable(arena.ty(body).clone())
        }
        QueryOperator::GroupBy => TypeRef::queryable(TypeRef::sequence(element)),
        QueryOperator::OfType => match arena.as_constant(*args.first()?)? {
            crate::value::Value::Type(ty) => TypeRef::queryable(ty.clone()),
            _ => return None,
        },
        QueryOperator::First | QueryOperator::FirstOrDefault | QueryOperator::FirstLazy => element,
        QueryOperator::Any => TypeRef::BOOL,
        QueryOperator::ToUri => TypeRef::STRING,
        _ => source_ty,
    };

    let mut call_args = Vec::with_capacity(args.len() + 1);
    call_args.push(source);
    call_args.extend(args);

    Some(arena.call_typed(None, &method, call_args, ty))
}
