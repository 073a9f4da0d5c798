//! Rounding functions.

use crate::{
    expr::{MethodInfo, MethodRef, ParamShape},
    library::MATH,
    types::TypeRef,
    value::Value,
};
use rust_decimal::{Decimal, RoundingStrategy};
use std::sync::LazyLock;

fn rounding(name: &str, ty: TypeRef, f: fn(f64) -> f64, d: fn(Decimal) -> Decimal) -> MethodRef {
    MethodInfo::new_static(MATH, name, vec![ParamShape::Value], ty)
        .with_implementation(move |args| match args {
            [Value::Double(v)] => Some(Value::Double(f(*v))),
            [Value::Decimal(v)] => Some(Value::Decimal(d(*v))),
            _ => None,
        })
        .into_ref()
}

// Host rounding is banker's rounding.
static ROUND: LazyLock<MethodRef> = LazyLock::new(|| {
    rounding("Round", TypeRef::DOUBLE, f64::round_ties_even, |d| {
        d.round_dp_with_strategy(0, RoundingStrategy::MidpointNearestEven)
    })
});

static ROUND_DECIMAL: LazyLock<MethodRef> = LazyLock::new(|| {
    rounding("Round", TypeRef::DECIMAL, f64::round_ties_even, |d| {
        d.round_dp_with_strategy(0, RoundingStrategy::MidpointNearestEven)
    })
});

static FLOOR: LazyLock<MethodRef> =
    LazyLock::new(|| rounding("Floor", TypeRef::DOUBLE, f64::floor, |d| d.floor()));

static CEILING: LazyLock<MethodRef> =
    LazyLock::new(|| rounding("Ceiling", TypeRef::DOUBLE, f64::ceil, |d| d.ceil()));

#[must_use]
pub fn round() -> MethodRef {
    ROUND.clone()
}

#[must_use]
pub fn round_decimal() -> MethodRef {
    ROUND_DECIMAL.clone()
}

#[must_use]
pub fn floor() -> MethodRef {
    FLOOR.clone()
}

#[must_use]
pub fn ceiling() -> MethodRef {
    CEILING.clone()
}
