//! Host operator semantics over `Value`.
//!
//! One implementation serves both constant folding and local evaluation, so
//! a folded literal always equals what the local side would have computed.

use crate::{
    expr::BinaryOp,
    types::{Primitive, TypeRef},
    value::{EnumValue, Value},
};
use rust_decimal::{
    Decimal,
    prelude::{FromPrimitive, ToPrimitive},
};
use std::cmp::Ordering;
use thiserror::Error as ThisError;

///
/// OpError
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum OpError {
    #[error("operator '{op}' is not defined for {left} and {right}")]
    Undefined {
        op: BinaryOp,
        left: String,
        right: String,
    },

    #[error("operator '{op}' is not defined for {operand}")]
    UndefinedUnary { op: &'static str, operand: String },

    #[error("division by zero")]
    DivideByZero,

    #[error("arithmetic overflow in '{op}'")]
    Overflow { op: BinaryOp },

    #[error("cannot convert {value} to {target}")]
    Conversion { value: String, target: String },
}

///
/// Numeric
///
/// Common representation after binary numeric promotion.
///

#[derive(Clone, Copy, Debug)]
enum Numeric {
    Int32(i32),
    Int64(i64),
    Single(f32),
    Double(f64),
    Decimal(Decimal),
}

// Promotion rank, lowest first.
const fn rank(value: &Value) -> Option<u8> {
    match value {
        Value::Byte(_) | Value::Int16(_) | Value::Int32(_) => Some(0),
        Value::Int64(_) => Some(1),
        Value::Single(_) => Some(2),
        Value::Double(_) => Some(3),
        Value::Decimal(_) => Some(4),
        _ => None,
    }
}

#[allow(clippy::cast_precision_loss)]
fn promote(value: &Value, to: u8) -> Option<Numeric> {
    let numeric = match (value, to) {
        (v, 0) => Numeric::Int32(i32::try_from(v.as_i64()?).ok()?),
        (v, 1) => Numeric::Int64(v.as_i64()?),
        (Value::Single(f), 2) => Numeric::Single(*f),
        (v, 2) => Numeric::Single(v.as_i64()? as f32),
        (Value::Single(f), 3) => Numeric::Double(f64::from(*f)),
        (Value::Double(f), 3) => Numeric::Double(*f),
        (v, 3) => Numeric::Double(v.as_i64()? as f64),
        (Value::Decimal(d), 4) => Numeric::Decimal(*d),
        (Value::Single(f), 4) => Numeric::Decimal(Decimal::from_f32(*f)?),
        (Value::Double(f), 4) => Numeric::Decimal(Decimal::from_f64(*f)?),
        (v, 4) => Numeric::Decimal(Decimal::from(v.as_i64()?)),
        _ => return None,
    };

    Some(numeric)
}

fn promote_pair(left: &Value, right: &Value) -> Option<(Numeric, Numeric)> {
    let to = rank(left)?.max(rank(right)?);

    Some((promote(left, to)?, promote(right, to)?))
}

fn undefined(op: BinaryOp, left: &Value, right: &Value) -> OpError {
    OpError::Undefined {
        op,
        left: format!("{left:?}"),
        right: format!("{right:?}"),
    }
}

/// Apply a binary host operator.
pub fn binary(op: BinaryOp, left: &Value, right: &Value) -> Result<Value, OpError> {
    match op {
        BinaryOp::And | BinaryOp::Or => logical(op, left, right),
        BinaryOp::Coalesce => Ok(if left.is_null() {
            right.clone()
        } else {
            left.clone()
        }),
        BinaryOp::Eq => Ok(Value::Bool(values_equal(left, right))),
        BinaryOp::Ne => Ok(Value::Bool(!values_equal(left, right))),
        BinaryOp::Gt | BinaryOp::Ge | BinaryOp::Lt | BinaryOp::Le => {
            if left.is_null() || right.is_null() {
                return Ok(Value::Bool(false));
            }
            let ordering = compare(left, right).ok_or_else(|| undefined(op, left, right))?;
            let result = match op {
                BinaryOp::Gt => ordering == Ordering::Greater,
                BinaryOp::Ge => ordering != Ordering::Less,
                BinaryOp::Lt => ordering == Ordering::Less,
                _ => ordering != Ordering::Greater,
            };

            Ok(Value::Bool(result))
        }
        BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod => {
            arithmetic(op, left, right)
        }
    }
}

fn logical(op: BinaryOp, left: &Value, right: &Value) -> Result<Value, OpError> {
    let (Some(l), Some(r)) = (left.as_bool(), right.as_bool()) else {
        return Err(undefined(op, left, right));
    };

    Ok(Value::Bool(match op {
        BinaryOp::And => l && r,
        _ => l || r,
    }))
}

fn values_equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Enum(l), Value::Enum(r)) => l.ty == r.ty && l.discriminant == r.discriminant,
        (Value::Enum(e), other) | (other, Value::Enum(e)) => {
            other.as_i64() == Some(e.discriminant)
        }
        (l, r) => match promote_pair(l, r) {
            Some(_) => compare(l, r) == Some(Ordering::Equal),
            None => l == r,
        },
    }
}

fn compare(left: &Value, right: &Value) -> Option<Ordering> {
    if let Some(pair) = promote_pair(left, right) {
        return match pair {
            (Numeric::Int32(l), Numeric::Int32(r)) => Some(l.cmp(&r)),
            (Numeric::Int64(l), Numeric::Int64(r)) => Some(l.cmp(&r)),
            (Numeric::Single(l), Numeric::Single(r)) => l.partial_cmp(&r),
            (Numeric::Double(l), Numeric::Double(r)) => l.partial_cmp(&r),
            (Numeric::Decimal(l), Numeric::Decimal(r)) => Some(l.cmp(&r)),
            _ => None,
        };
    }

    match (left, right) {
        (Value::Text(l), Value::Text(r)) | (Value::StringEnum(l), Value::StringEnum(r)) => {
            Some(l.cmp(r))
        }
        (Value::Char(l), Value::Char(r)) => Some(l.cmp(r)),
        (Value::Bool(l), Value::Bool(r)) => Some(l.cmp(r)),
        (Value::DateTime(l), Value::DateTime(r)) => Some(l.naive.cmp(&r.naive)),
        (Value::Guid(l), Value::Guid(r)) => Some(l.cmp(r)),
        (Value::Enum(l), Value::Enum(r)) if l.ty == r.ty => Some(l.discriminant.cmp(&r.discriminant)),
        _ => None,
    }
}

fn arithmetic(op: BinaryOp, left: &Value, right: &Value) -> Result<Value, OpError> {
    if left.is_null() || right.is_null() {
        return Ok(Value::Null);
    }

    if op == BinaryOp::Add
        && let (Value::Text(l), Value::Text(r)) = (left, right)
    {
        return Ok(Value::Text(format!("{l}{r}")));
    }

    let (l, r) = promote_pair(left, right).ok_or_else(|| undefined(op, left, right))?;
    let overflow = || OpError::Overflow { op };

    let value = match (l, r) {
        (Numeric::Int32(l), Numeric::Int32(r)) => {
            Value::Int32(checked_int(op, l, r).ok_or_else(|| int_failure(op, r == 0))?)
        }
        (Numeric::Int64(l), Numeric::Int64(r)) => {
            Value::Int64(checked_int(op, l, r).ok_or_else(|| int_failure(op, r == 0))?)
        }
        (Numeric::Single(l), Numeric::Single(r)) => Value::Single(float_op(op, l, r)),
        (Numeric::Double(l), Numeric::Double(r)) => Value::Double(float_op(op, l, r)),
        (Numeric::Decimal(l), Numeric::Decimal(r)) => {
            if matches!(op, BinaryOp::Div | BinaryOp::Mod) && r.is_zero() {
                return Err(OpError::DivideByZero);
            }
            let result = match op {
                BinaryOp::Add => l.checked_add(r),
                BinaryOp::Sub => l.checked_sub(r),
                BinaryOp::Mul => l.checked_mul(r),
                BinaryOp::Div => l.checked_div(r),
                _ => l.checked_rem(r),
            };
            Value::Decimal(result.ok_or_else(overflow)?)
        }
        _ => return Err(undefined(op, left, right)),
    };

    Ok(value)
}

const fn int_failure(op: BinaryOp, zero_divisor: bool) -> OpError {
    if zero_divisor && matches!(op, BinaryOp::Div | BinaryOp::Mod) {
        OpError::DivideByZero
    } else {
        OpError::Overflow { op }
    }
}

trait CheckedInt: Sized {
    fn add(self, rhs: Self) -> Option<Self>;
    fn sub(self, rhs: Self) -> Option<Self>;
    fn mul(self, rhs: Self) -> Option<Self>;
    fn div(self, rhs: Self) -> Option<Self>;
    fn rem(self, rhs: Self) -> Option<Self>;
}

macro_rules! checked_int_impl {
    ($($ty:ty),*) => {
        $(
            impl CheckedInt for $ty {
                fn add(self, rhs: Self) -> Option<Self> { self.checked_add(rhs) }
                fn sub(self, rhs: Self) -> Option<Self> { self.checked_sub(rhs) }
                fn mul(self, rhs: Self) -> Option<Self> { self.checked_mul(rhs) }
                fn div(self, rhs: Self) -> Option<Self> { self.checked_div(rhs) }
                fn rem(self, rhs: Self) -> Option<Self> { self.checked_rem(rhs) }
            }
        )*
    };
}

checked_int_impl!(i32, i64);

fn checked_int<T: CheckedInt>(op: BinaryOp, l: T, r: T) -> Option<T> {
    match op {
        BinaryOp::Add => l.add(r),
        BinaryOp::Sub => l.sub(r),
        BinaryOp::Mul => l.mul(r),
        BinaryOp::Div => l.div(r),
        _ => l.rem(r),
    }
}

fn float_op<T>(op: BinaryOp, l: T, r: T) -> T
where
    T: std::ops::Add<Output = T>
        + std::ops::Sub<Output = T>
        + std::ops::Mul<Output = T>
        + std::ops::Div<Output = T>
        + std::ops::Rem<Output = T>,
{
    match op {
        BinaryOp::Add => l + r,
        BinaryOp::Sub => l - r,
        BinaryOp::Mul => l * r,
        BinaryOp::Div => l / r,
        _ => l % r,
    }
}

/// Logical negation; null stays null.
pub fn logical_not(value: &Value) -> Result<Value, OpError> {
    match value {
        Value::Null => Ok(Value::Null),
        Value::Bool(b) => Ok(Value::Bool(!b)),
        other => Err(OpError::UndefinedUnary {
            op: "not",
            operand: format!("{other:?}"),
        }),
    }
}

/// Arithmetic negation; null stays null.
pub fn negate(value: &Value) -> Result<Value, OpError> {
    let negated = match value {
        Value::Null => Value::Null,
        Value::Byte(_) | Value::Int16(_) | Value::Int32(_) => {
            let v = i32::try_from(value.as_i64().unwrap_or_default())
                .map_err(|_| OpError::Overflow { op: BinaryOp::Sub })?;
            Value::Int32(v.checked_neg().ok_or(OpError::Overflow { op: BinaryOp::Sub })?)
        }
        Value::Int64(v) => {
            Value::Int64(v.checked_neg().ok_or(OpError::Overflow { op: BinaryOp::Sub })?)
        }
        Value::Single(v) => Value::Single(-v),
        Value::Double(v) => Value::Double(-v),
        Value::Decimal(v) => Value::Decimal(-*v),
        other => {
            return Err(OpError::UndefinedUnary {
                op: "negate",
                operand: format!("{other:?}"),
            });
        }
    };

    Ok(negated)
}

/// Value conversion with host cast semantics (unchecked integral narrowing).
pub fn convert(value: &Value, target: &TypeRef) -> Result<Value, OpError> {
    let fail = || OpError::Conversion {
        value: format!("{value:?}"),
        target: target.to_string(),
    };

    match target {
        TypeRef::Nullable(inner) => {
            if value.is_null() {
                Ok(Value::Null)
            } else {
                convert(value, inner)
            }
        }
        _ if value.is_null() => {
            if target.is_value_type() {
                Err(fail())
            } else {
                Ok(Value::Null)
            }
        }
        TypeRef::Primitive(Primitive::Object) => Ok(value.clone()),
        TypeRef::Primitive(p) if p.is_numeric() => {
            let converted = match (value, p) {
                (Value::Single(f), _) => float_to(f64::from(*f), *p),
                (Value::Double(f), _) => float_to(*f, *p),
                (Value::Decimal(d), Primitive::Decimal) => Some(Value::Decimal(*d)),
                (Value::Decimal(d), Primitive::Double) => d.to_f64().map(Value::Double),
                (Value::Decimal(d), Primitive::Single) => d.to_f32().map(Value::Single),
                (Value::Decimal(d), _) => d.to_i64().and_then(|i| int_to(i, *p)),
                (v, _) => v.as_i64().and_then(|i| int_to(i, *p)),
            };
            converted.ok_or_else(fail)
        }
        TypeRef::Primitive(Primitive::String) => match value {
            Value::Text(_) => Ok(value.clone()),
            Value::StringEnum(s) => Ok(Value::Text(s.clone())),
            _ => Err(fail()),
        },
        TypeRef::StringEnum(_) => match value {
            Value::Text(s) | Value::StringEnum(s) => Ok(Value::StringEnum(s.clone())),
            _ => Err(fail()),
        },
        TypeRef::Enum(ty) => match value {
            Value::Enum(e) if e.ty == *ty => Ok(value.clone()),
            other => other
                .as_i64()
                .map(|d| Value::Enum(EnumValue::new(ty.clone(), d)))
                .ok_or_else(fail),
        },
        TypeRef::Sequence(_) | TypeRef::Queryable(_) | TypeRef::Array(_) | TypeRef::List(_) => {
            match value {
                Value::List(_) => Ok(value.clone()),
                _ => Err(fail()),
            }
        }
        TypeRef::Resource(_) | TypeRef::Record(_) | TypeRef::Dictionary(..) => match value {
            Value::Record(_) => Ok(value.clone()),
            _ => Err(fail()),
        },
        other => {
            if value.natural_type().as_ref() == Some(other) {
                Ok(value.clone())
            } else {
                Err(fail())
            }
        }
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn int_to(i: i64, target: Primitive) -> Option<Value> {
    let value = match target {
        Primitive::Byte => Value::Byte(i as u8),
        Primitive::Int16 => Value::Int16(i as i16),
        Primitive::Int32 => Value::Int32(i as i32),
        Primitive::Int64 => Value::Int64(i),
        #[allow(clippy::cast_precision_loss)]
        Primitive::Single => Value::Single(i as f32),
        #[allow(clippy::cast_precision_loss)]
        Primitive::Double => Value::Double(i as f64),
        Primitive::Decimal => Value::Decimal(Decimal::from(i)),
        _ => return None,
    };

    Some(value)
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn float_to(f: f64, target: Primitive) -> Option<Value> {
    let value = match target {
        Primitive::Single => Value::Single(f as f32),
        Primitive::Double => Value::Double(f),
        Primitive::Decimal => Value::Decimal(Decimal::from_f64(f)?),
        integral => return int_to(f.trunc() as i64, integral),
    };

    Some(value)
}
