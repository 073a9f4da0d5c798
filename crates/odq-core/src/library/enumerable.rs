//! Plain-enumerable extension methods.

use crate::{
    expr::{BinaryOp, HostArg, MethodInfo, MethodRef, ParamShape, SpecialMethod},
    library::ENUMERABLE,
    types::TypeRef,
    value::{self, Value},
};
use std::sync::LazyLock;

static ANY: LazyLock<MethodRef> = LazyLock::new(|| {
    MethodInfo::new_static(ENUMERABLE, "Any", vec![ParamShape::Sequence], TypeRef::BOOL)
        .with_implementation(|args| match args {
            [Value::List(items)] => Some(Value::Bool(!items.is_empty())),
            _ => None,
        })
        .into_ref()
});

static ANY_PREDICATE: LazyLock<MethodRef> = LazyLock::new(|| {
    MethodInfo::new_static(
        ENUMERABLE,
        "Any",
        vec![ParamShape::Sequence, ParamShape::Function],
        TypeRef::BOOL,
    )
    .with_higher_order(|args| first_match(args, true))
    .into_ref()
});

static ALL: LazyLock<MethodRef> = LazyLock::new(|| {
    MethodInfo::new_static(
        ENUMERABLE,
        "All",
        vec![ParamShape::Sequence, ParamShape::Function],
        TypeRef::BOOL,
    )
    .with_higher_order(|args| first_match(args, false))
    .into_ref()
});

static COUNT: LazyLock<MethodRef> = LazyLock::new(|| {
    MethodInfo::new_static(ENUMERABLE, "Count", vec![ParamShape::Sequence], TypeRef::INT32)
        .with_implementation(|args| match args {
            [Value::List(items)] => i32::try_from(items.len()).ok().map(Value::Int32),
            _ => None,
        })
        .into_ref()
});

static CONTAINS: LazyLock<MethodRef> = LazyLock::new(|| {
    MethodInfo::new_static(
        ENUMERABLE,
        "Contains",
        vec![ParamShape::Sequence, ParamShape::Value],
        TypeRef::BOOL,
    )
    .with_implementation(|args| match args {
        [Value::List(items), item] => Some(Value::Bool(contains(items, item))),
        _ => None,
    })
    .with_special(SpecialMethod::SequenceContains)
    .into_ref()
});

/// Run a one-parameter predicate over the sequence and stop at the first
/// item whose result is `stop`. `Any` stops on `true`, `All` on `false`.
fn first_match(args: &[HostArg<'_>], stop: bool) -> Option<Value> {
    let [HostArg::Value(Value::List(items)), HostArg::Function(predicate)] = args else {
        return None;
    };

    for item in items {
        if predicate(std::slice::from_ref(item))?.as_bool()? == stop {
            return Some(Value::Bool(stop));
        }
    }

    Some(Value::Bool(!stop))
}

pub(crate) fn contains(items: &[Value], item: &Value) -> bool {
    items.iter().any(|candidate| {
        value::binary(BinaryOp::Eq, candidate, item).is_ok_and(|v| v == Value::Bool(true))
    })
}

#[must_use]
pub fn any() -> MethodRef {
    ANY.clone()
}

#[must_use]
pub fn any_predicate() -> MethodRef {
    ANY_PREDICATE.clone()
}

#[must_use]
pub fn all() -> MethodRef {
    ALL.clone()
}

#[must_use]
pub fn count() -> MethodRef {
    COUNT.clone()
}

#[must_use]
pub fn contains_method() -> MethodRef {
    CONTAINS.clone()
}

/// Every plain-enumerable overload, for queryable substitution.
#[must_use]
pub fn overloads() -> Vec<MethodRef> {
    vec![any(), any_predicate(), all(), count(), contains_method()]
}
