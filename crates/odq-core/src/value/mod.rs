mod ops;

#[cfg(test)]
mod tests;

use crate::types::{EnumType, Primitive, TypeRef};
use chrono::{FixedOffset, NaiveDateTime, Timelike};
use rust_decimal::Decimal;
use std::{
    hash::{Hash, Hasher},
    sync::Arc,
};
use uuid::Uuid;

// re-exports
pub use ops::{OpError, binary, convert, logical_not, negate};

///
/// DateTimeKind
///
/// Mirrors the host notion of a date/time "kind": only `Utc` values carry a
/// trailing `Z` on the wire.
///

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum DateTimeKind {
    Unspecified,
    Utc,
    Local(FixedOffset),
}

///
/// DateTimeValue
///
/// Equality and hashing look at the wall-clock value only; the kind is a
/// rendering hint, as in the host's own date/time comparison.
///

#[derive(Clone, Copy, Debug)]
pub struct DateTimeValue {
    pub naive: NaiveDateTime,
    pub kind: DateTimeKind,
}

impl PartialEq for DateTimeValue {
    fn eq(&self, other: &Self) -> bool {
        self.naive == other.naive
    }
}

impl Eq for DateTimeValue {}

impl Hash for DateTimeValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.naive.hash(state);
    }
}

impl DateTimeValue {
    #[must_use]
    pub const fn utc(naive: NaiveDateTime) -> Self {
        Self {
            naive,
            kind: DateTimeKind::Utc,
        }
    }

    #[must_use]
    pub const fn unspecified(naive: NaiveDateTime) -> Self {
        Self {
            naive,
            kind: DateTimeKind::Unspecified,
        }
    }

    #[must_use]
    pub const fn local(naive: NaiveDateTime, offset: FixedOffset) -> Self {
        Self {
            naive,
            kind: DateTimeKind::Local(offset),
        }
    }

    #[must_use]
    pub const fn is_utc(&self) -> bool {
        matches!(self.kind, DateTimeKind::Utc)
    }

    /// True when the value carries no fractional-second component.
    #[must_use]
    pub fn is_whole_second(&self) -> bool {
        self.naive.nanosecond() == 0
    }
}

///
/// EnumValue
///

#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct EnumValue {
    pub ty: Arc<EnumType>,
    pub discriminant: i64,
}

impl EnumValue {
    #[must_use]
    pub const fn new(ty: Arc<EnumType>, discriminant: i64) -> Self {
        Self { ty, discriminant }
    }

    /// Construct from a variant name; `None` when the enum has no such variant.
    #[must_use]
    pub fn named(ty: &Arc<EnumType>, name: &str) -> Option<Self> {
        ty.discriminant(name).map(|d| Self::new(ty.clone(), d))
    }

    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.ty.variant_name(self.discriminant)
    }
}

///
/// RecordValue
///
/// Plain-data object: closure environments, anonymous results, and
/// resource rows fetched for local evaluation.
///

#[derive(Clone, Debug, Default, PartialEq)]
pub struct RecordValue {
    pub type_name: Option<String>,
    pub fields: Vec<(String, Value)>,
}

impl RecordValue {
    #[must_use]
    pub const fn anonymous(fields: Vec<(String, Value)>) -> Self {
        Self {
            type_name: None,
            fields,
        }
    }

    #[must_use]
    pub fn typed(type_name: impl Into<String>, fields: Vec<(String, Value)>) -> Self {
        Self {
            type_name: Some(type_name.into()),
            fields,
        }
    }

    #[must_use]
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, value)| value)
    }
}

///
/// Value
///
/// Literal and runtime value model shared by constant encoding, constant
/// folding and local evaluation.
///
/// Null   → absent value of any nullable or reference type.
/// Opaque → host object with no literal form; never encodable.
///

#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Byte(u8),
    Char(char),
    DateTime(DateTimeValue),
    Decimal(Decimal),
    Double(f64),
    Enum(EnumValue),
    Guid(Uuid),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    List(Vec<Self>),
    Opaque(String),
    Record(RecordValue),
    Single(f32),
    StringEnum(String),
    Text(String),
    Type(TypeRef),
}

impl Value {
    #[must_use]
    pub fn text(s: impl Into<String>) -> Self {
        Self::Text(s.into())
    }

    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Widen any integral value (including enum discriminants) to `i64`.
    #[must_use]
    pub const fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Byte(v) => Some(*v as i64),
            Self::Int16(v) => Some(*v as i64),
            Self::Int32(v) => Some(*v as i64),
            Self::Int64(v) => Some(*v),
            Self::Enum(v) => Some(v.discriminant),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(v) => Some(*v),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(v) => Some(v),
            _ => None,
        }
    }

    /// The type a value would carry if it appeared without static type
    /// information (boxed constants).
    #[must_use]
    pub fn natural_type(&self) -> Option<TypeRef> {
        let ty = match self {
            Self::Null
            | Self::Opaque(_)
            | Self::Record(_)
            | Self::List(_)
            | Self::StringEnum(_) => return None,
            Self::Bool(_) => TypeRef::BOOL,
            Self::Byte(_) => TypeRef::BYTE,
            Self::Char(_) => TypeRef::CHAR,
            Self::DateTime(_) => TypeRef::DATE_TIME,
            Self::Decimal(_) => TypeRef::DECIMAL,
            Self::Double(_) => TypeRef::DOUBLE,
            Self::Enum(v) => TypeRef::Enum(v.ty.clone()),
            Self::Guid(_) => TypeRef::GUID,
            Self::Int16(_) => TypeRef::INT16,
            Self::Int32(_) => TypeRef::INT32,
            Self::Int64(_) => TypeRef::INT64,
            Self::Single(_) => TypeRef::SINGLE,
            Self::Text(_) => TypeRef::STRING,
            Self::Type(_) => TypeRef::TYPE,
        };

        Some(ty)
    }

    /// Runtime type test used by local `TypeIs` / `TypeAs` evaluation.
    #[must_use]
    pub fn is_instance_of(&self, ty: &TypeRef) -> bool {
        match (self, ty) {
            (Self::Null, _) => false,
            (_, TypeRef::Nullable(inner)) => self.is_instance_of(inner),
            (_, TypeRef::Primitive(Primitive::Object)) => true,
            (Self::Record(record), TypeRef::Resource(resource)) => {
                record.type_name.as_deref() == Some(resource.name.as_str())
            }
            (Self::Record(record), TypeRef::Record(shape)) => shape
                .fields
                .iter()
                .all(|(name, _)| record.field(name).is_some()),
            (Self::StringEnum(_), TypeRef::StringEnum(_)) => true,
            (Self::List(_), other) => other.is_enumerable(),
            (value, other) => value.natural_type().as_ref() == Some(other),
        }
    }

    /// Field lookup on record values.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&Self> {
        match self {
            Self::Record(record) => record.field(name),
            _ => None,
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::Int32(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int64(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Double(v)
    }
}

impl From<Decimal> for Value {
    fn from(v: Decimal) -> Self {
        Self::Decimal(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<Uuid> for Value {
    fn from(v: Uuid) -> Self {
        Self::Guid(v)
    }
}

impl From<EnumValue> for Value {
    fn from(v: EnumValue) -> Self {
        Self::Enum(v)
    }
}

impl From<RecordValue> for Value {
    fn from(v: RecordValue) -> Self {
        Self::Record(v)
    }
}
