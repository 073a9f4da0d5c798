use crate::{
    error::{ErrorClass, ErrorOrigin, InternalError},
    literal::NULL,
    meta::TypeResolver,
    types::{Primitive, TypeRef},
    value::{DateTimeKind, DateTimeValue, EnumValue, Value},
};
use chrono::{FixedOffset, NaiveDateTime};
use rust_decimal::Decimal;
use std::str::FromStr;
use thiserror::Error as ThisError;
use uuid::Uuid;

///
/// DecodeError
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum DecodeError {
    #[error("malformed {expected} literal: {token}")]
    Malformed { token: String, expected: String },

    #[error("enum '{ty}' has no variant '{name}'")]
    UnknownVariant { ty: String, name: String },

    #[error("unknown type name '{name}'")]
    UnknownType { name: String },

    #[error("null is not a valid {ty} literal")]
    NullForValueType { ty: String },

    #[error("type {ty} has no literal form")]
    Unsupported { ty: String },
}

impl From<DecodeError> for InternalError {
    fn from(err: DecodeError) -> Self {
        Self::new(ErrorClass::Unsupported, ErrorOrigin::Literal, err.to_string())
    }
}

fn malformed(token: &str, expected: impl ToString) -> DecodeError {
    DecodeError::Malformed {
        token: token.to_string(),
        expected: expected.to_string(),
    }
}

/// Decode a literal token produced by `encode` for type `ty`.
pub fn decode(token: &str, ty: &TypeRef, resolver: &dyn TypeResolver) -> Result<Value, DecodeError> {
    if token == NULL {
        return match ty {
            TypeRef::Nullable(_) => Ok(Value::Null),
            other if other.is_value_type() => Err(DecodeError::NullForValueType {
                ty: other.to_string(),
            }),
            _ => Ok(Value::Null),
        };
    }

    match ty {
        TypeRef::Nullable(inner) => decode(token, inner, resolver),
        TypeRef::Sequence(element)
        | TypeRef::Queryable(element)
        | TypeRef::Array(element)
        | TypeRef::List(element) => {
            let inner = token
                .strip_prefix('[')
                .and_then(|t| t.strip_suffix(']'))
                .ok_or_else(|| malformed(token, ty))?;

            split_items(inner)
                .into_iter()
                .map(|item| decode(item, element, resolver))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::List)
        }
        TypeRef::Enum(e) => {
            let name = unquote(token).ok_or_else(|| malformed(token, ty))?;

            EnumValue::named(e, &name)
                .map(Value::Enum)
                .ok_or_else(|| DecodeError::UnknownVariant {
                    ty: e.name.clone(),
                    name,
                })
        }
        TypeRef::StringEnum(_) => unquote(token)
            .map(Value::StringEnum)
            .ok_or_else(|| malformed(token, ty)),
        TypeRef::Primitive(p) => decode_primitive(token, *p, resolver),
        other => Err(DecodeError::Unsupported {
            ty: other.to_string(),
        }),
    }
}

fn decode_primitive(
    token: &str,
    primitive: Primitive,
    resolver: &dyn TypeResolver,
) -> Result<Value, DecodeError> {
    let fail = || malformed(token, primitive.native_name());

    let value = match primitive {
        Primitive::Bool => match token {
            "true" => Value::Bool(true),
            "false" => Value::Bool(false),
            _ => return Err(fail()),
        },
        Primitive::String => Value::Text(unquote(token).ok_or_else(fail)?),
        Primitive::Char => {
            let s = unquote(token).ok_or_else(fail)?;
            let mut chars = s.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => Value::Char(c),
                _ => return Err(fail()),
            }
        }
        Primitive::Int32 => Value::Int32(token.parse().map_err(|_| fail())?),
        Primitive::Int64 => {
            let digits = token.strip_suffix('L').ok_or_else(fail)?;
            Value::Int64(digits.parse().map_err(|_| fail())?)
        }
        Primitive::Double => Value::Double(parse_float(token).ok_or_else(fail)?),
        Primitive::Single => {
            let digits = token.strip_suffix('f').ok_or_else(fail)?;
            match digits {
                "NaN" => Value::Single(f32::NAN),
                "INF" => Value::Single(f32::INFINITY),
                "-INF" => Value::Single(f32::NEG_INFINITY),
                _ => Value::Single(digits.parse().map_err(|_| fail())?),
            }
        }
        Primitive::Decimal => {
            let digits = token.strip_suffix('m').ok_or_else(fail)?;
            Value::Decimal(Decimal::from_str(digits).map_err(|_| fail())?)
        }
        Primitive::Guid => {
            let inner = token
                .strip_prefix("guid'")
                .and_then(|t| t.strip_suffix('\''))
                .ok_or_else(fail)?;
            Value::Guid(Uuid::parse_str(inner).map_err(|_| fail())?)
        }
        Primitive::DateTime => {
            let inner = token
                .strip_prefix("datetime'")
                .and_then(|t| t.strip_suffix('\''))
                .ok_or_else(fail)?;
            Value::DateTime(parse_date_time(inner).ok_or_else(fail)?)
        }
        Primitive::Type => Value::Type(decode_type_literal(token, resolver)?),
        Primitive::Byte | Primitive::Int16 | Primitive::Object => {
            return Err(DecodeError::Unsupported {
                ty: primitive.native_name().to_string(),
            });
        }
    };

    Ok(value)
}

fn parse_float(token: &str) -> Option<f64> {
    match token {
        "NaN" => Some(f64::NAN),
        "INF" => Some(f64::INFINITY),
        "-INF" => Some(f64::NEG_INFINITY),
        _ => token.parse().ok(),
    }
}

fn parse_date_time(s: &str) -> Option<DateTimeValue> {
    const FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

    if let Some(naive) = s.strip_suffix('Z') {
        return NaiveDateTime::parse_from_str(naive, FORMAT)
            .ok()
            .map(DateTimeValue::utc);
    }

    // Trailing `+hh:mm` / `-hh:mm` offset; the date part also contains '-'
    // so only the last six characters are considered.
    if s.len() > 6 && s.is_char_boundary(s.len() - 6) {
        let (naive, offset) = s.split_at(s.len() - 6);
        if offset.starts_with(['+', '-'])
            && let Ok(offset) = FixedOffset::from_str(offset)
        {
            let naive = NaiveDateTime::parse_from_str(naive, FORMAT).ok()?;
            return Some(DateTimeValue {
                naive,
                kind: DateTimeKind::Local(offset),
            });
        }
    }

    NaiveDateTime::parse_from_str(s, FORMAT)
        .ok()
        .map(DateTimeValue::unspecified)
}

fn decode_type_literal(token: &str, resolver: &dyn TypeResolver) -> Result<TypeRef, DecodeError> {
    let inner = token
        .strip_prefix("t'")
        .and_then(|t| t.strip_suffix('\''))
        .ok_or_else(|| malformed(token, "type"))?;

    let (name, nullable) = match inner.strip_suffix('?') {
        Some(name) => (name, true),
        None => (inner, false),
    };

    let ty = resolver
        .resolve(name)
        .ok_or_else(|| DecodeError::UnknownType {
            name: name.to_string(),
        })?;

    Ok(if nullable { TypeRef::nullable(ty) } else { ty })
}

/// Strip surrounding quotes and undouble embedded ones. Rejects a lone
/// embedded quote.
fn unquote(token: &str) -> Option<String> {
    let inner = token.strip_prefix('\'')?.strip_suffix('\'')?;

    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\'' && chars.next_if_eq(&'\'').is_none() {
            return None;
        }
        out.push(c);
    }

    Some(out)
}

/// Split a list body on top-level commas, honouring quotes and brackets.
fn split_items(body: &str) -> Vec<&str> {
    if body.is_empty() {
        return Vec::new();
    }

    let mut items = Vec::new();
    let mut depth = 0_usize;
    let mut quoted = false;
    let mut start = 0;

    for (i, c) in body.char_indices() {
        match c {
            '\'' => quoted = !quoted,
            '[' if !quoted => depth += 1,
            ']' if !quoted => depth = depth.saturating_sub(1),
            ',' if !quoted && depth == 0 => {
                items.push(&body[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    items.push(&body[start..]);

    items
}
