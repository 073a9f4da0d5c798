//! Type-directed literal codec.
//!
//! `encode` renders a constant into its wire token, or `None` when no rule
//! applies. `decode` is the inverse for every encodable type.

mod decode;


use crate::{
    meta::TypeResolver,
    types::{Primitive, TypeRef},
    value::{DateTimeKind, DateTimeValue, Value},
};
use chrono::Timelike;

// re-exports
pub use decode::{DecodeError, decode};

pub const NULL: &str = "null";

const WHOLE_SECOND_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Encode `value` as a literal of type `ty`.
#[must_use]
pub fn encode(value: &Value, ty: &TypeRef, resolver: &dyn TypeResolver) -> Option<String> {
    if value.is_null() {
        return Some(NULL.to_string());
    }

    match ty {
        TypeRef::Nullable(inner) => encode(value, inner, resolver),
        TypeRef::Primitive(Primitive::Object) => {
            let natural = match value {
                Value::StringEnum(s) => return Some(quote(s)),
                Value::List(_) => TypeRef::sequence(TypeRef::OBJECT),
                other => other.natural_type()?,
            };
            encode(value, &natural, resolver)
        }
        TypeRef::Sequence(element)
        | TypeRef::Queryable(element)
        | TypeRef::Array(element)
        | TypeRef::List(element) => match value {
            Value::List(items) => {
                let encoded = items
                    .iter()
                    .map(|item| encode(item, element, resolver))
                    .collect::<Option<Vec<_>>>()?;
                Some(format!("[{}]", encoded.join(",")))
            }
            _ => None,
        },
        TypeRef::Enum(_) => match value {
            Value::Enum(e) => e.name().map(quote),
            _ => None,
        },
        TypeRef::StringEnum(_) => match value {
            Value::StringEnum(s) | Value::Text(s) => Some(quote(s)),
            _ => None,
        },
        TypeRef::Primitive(p) => encode_primitive(value, *p, resolver),
        _ => None,
    }
}

fn encode_primitive(value: &Value, primitive: Primitive, resolver: &dyn TypeResolver) -> Option<String> {
    let token = match (primitive, value) {
        (Primitive::Bool, Value::Bool(b)) => b.to_string(),
        (Primitive::Char, Value::Char(c)) => quote(&c.to_string()),
        (Primitive::String, Value::Text(s)) => quote(s),
        (Primitive::Int32, Value::Int32(v)) => v.to_string(),
        (Primitive::Int64, Value::Int64(v)) => format!("{v}L"),
        (Primitive::Double, Value::Double(v)) => encode_double(*v),
        (Primitive::Single, Value::Single(v)) => encode_single(*v),
        (Primitive::Decimal, Value::Decimal(v)) => format!("{v}m"),
        (Primitive::Guid, Value::Guid(v)) => format!("guid'{v}'"),
        (Primitive::DateTime, Value::DateTime(v)) => format!("datetime'{}'", format_date_time(v)),
        (Primitive::Type, Value::Type(t)) => type_literal(t, resolver)?,
        _ => return None,
    };

    Some(token)
}

/// Quote a string, doubling embedded quotes. No other escaping.
#[must_use]
pub fn quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

/// Doubles always carry a decimal point so they never read back as integers.
#[must_use]
pub fn encode_double(v: f64) -> String {
    if v.is_nan() {
        return "NaN".to_string();
    }
    if v.is_infinite() {
        return if v > 0.0 { "INF" } else { "-INF" }.to_string();
    }

    let s = v.to_string();
    if s.contains('.') { s } else { format!("{s}.0") }
}

#[must_use]
pub fn encode_single(v: f32) -> String {
    if v.is_nan() {
        return "NaNf".to_string();
    }
    if v.is_infinite() {
        return if v > 0.0 { "INFf" } else { "-INFf" }.to_string();
    }

    format!("{v}f")
}

/// Whole-second values use the short form with `Z` only for UTC; anything
/// with a fractional part uses the full round-trip form.
#[must_use]
pub fn format_date_time(v: &DateTimeValue) -> String {
    let base = v.naive.format(WHOLE_SECOND_FORMAT).to_string();

    if v.is_whole_second() {
        return if v.is_utc() { format!("{base}Z") } else { base };
    }

    let ticks = v.naive.nanosecond() / 100;
    let suffix = match v.kind {
        DateTimeKind::Utc => "Z".to_string(),
        DateTimeKind::Local(offset) => offset.to_string(),
        DateTimeKind::Unspecified => String::new(),
    };

    format!("{base}.{ticks:07}{suffix}")
}

/// `t'Name'` literal for a type; one level of nullable adds a `?` marker.
#[must_use]
pub fn type_literal(ty: &TypeRef, resolver: &dyn TypeResolver) -> Option<String> {
    let (inner, marker) = match ty {
        TypeRef::Nullable(inner) => (inner.as_ref(), "?"),
        other => (other, ""),
    };

    let name = match inner {
        TypeRef::Primitive(p) if resolver.is_native(inner) => p.native_name().to_string(),
        other => resolver.wire_name(other)?,
    };

    Some(format!("t'{name}{marker}'"))
}
