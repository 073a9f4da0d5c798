//! Semantic type model for host query trees.
//!
//! Types are structural and cheap to clone; named types (enums, resources,
//! records) are shared behind `Arc` so equality stays by value.


use crate::expr::MemberRef;
use std::{fmt, sync::Arc};

///
/// Primitive
///
/// Built-in scalar types. Every primitive is a native wire type and renders
/// by its bare name inside type literals.
///

#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum Primitive {
    Bool,
    Byte,
    Char,
    DateTime,
    Decimal,
    Double,
    Guid,
    Int16,
    Int32,
    Int64,
    Object,
    Single,
    String,
    Type,
}

impl Primitive {
    pub const ALL: [Self; 14] = [
        Self::Bool,
        Self::Byte,
        Self::Char,
        Self::DateTime,
        Self::Decimal,
        Self::Double,
        Self::Guid,
        Self::Int16,
        Self::Int32,
        Self::Int64,
        Self::Object,
        Self::Single,
        Self::String,
        Self::Type,
    ];

    /// Wire-visible native name.
    #[must_use]
    pub const fn native_name(self) -> &'static str {
        match self {
            Self::Bool => "Boolean",
            Self::Byte => "Byte",
            Self::Char => "Char",
            Self::DateTime => "DateTime",
            Self::Decimal => "Decimal",
            Self::Double => "Double",
            Self::Guid => "Guid",
            Self::Int16 => "Int16",
            Self::Int32 => "Int32",
            Self::Int64 => "Int64",
            Self::Object => "Object",
            Self::Single => "Single",
            Self::String => "String",
            Self::Type => "Type",
        }
    }

    /// Inverse of [`Self::native_name`].
    #[must_use]
    pub fn from_native_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.native_name() == name)
    }

    #[must_use]
    pub const fn is_value_type(self) -> bool {
        !matches!(self, Self::Object | Self::String | Self::Type)
    }

    #[must_use]
    pub const fn is_integer(self) -> bool {
        matches!(self, Self::Byte | Self::Int16 | Self::Int32 | Self::Int64)
    }

    #[must_use]
    pub const fn is_numeric(self) -> bool {
        matches!(
            self,
            Self::Byte
                | Self::Int16
                | Self::Int32
                | Self::Int64
                | Self::Single
                | Self::Double
                | Self::Decimal
        )
    }
}

///
/// EnumType
///
/// Named enumeration with an integral underlying type.
///

#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct EnumType {
    pub name: String,
    pub underlying: Primitive,
    pub variants: Vec<(String, i64)>,
}

impl EnumType {
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        underlying: Primitive,
        variants: impl IntoIterator<Item = (&'static str, i64)>,
    ) -> Arc<Self> {
        debug_assert!(
            underlying.is_integer(),
            "enum underlying type must be an integer primitive",
        );

        Arc::new(Self {
            name: name.into(),
            underlying,
            variants: variants
                .into_iter()
                .map(|(name, value)| (name.to_string(), value))
                .collect(),
        })
    }

    /// Name of the first variant carrying this discriminant.
    #[must_use]
    pub fn variant_name(&self, discriminant: i64) -> Option<&str> {
        self.variants
            .iter()
            .find(|(_, value)| *value == discriminant)
            .map(|(name, _)| name.as_str())
    }

    #[must_use]
    pub fn discriminant(&self, name: &str) -> Option<i64> {
        self.variants
            .iter()
            .find(|(variant, _)| variant == name)
            .map(|(_, value)| *value)
    }
}

///
/// ResourceType
///
/// Named reference type served by the remote side. `identity` is the
/// designated key member; equality between two handles of the same
/// resource type degrades to equality of that member.
///

#[derive(Clone, Debug)]
pub struct ResourceType {
    pub name: String,
    pub identity: Option<MemberRef>,
}

impl ResourceType {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            name: name.into(),
            identity: None,
        })
    }

    #[must_use]
    pub fn with_identity(name: impl Into<String>, identity: MemberRef) -> Arc<Self> {
        Arc::new(Self {
            name: name.into(),
            identity: Some(identity),
        })
    }
}

// Resources are nominal: two handles describe the same type when their names match.
impl PartialEq for ResourceType {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for ResourceType {}

impl std::hash::Hash for ResourceType {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}

///
/// RecordType
///
/// Structural plain-data shape (anonymous objects and tuples).
///

#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct RecordType {
    pub fields: Vec<(String, TypeRef)>,
}

impl RecordType {
    #[must_use]
    pub fn new(fields: Vec<(String, TypeRef)>) -> Arc<Self> {
        Arc::new(Self { fields })
    }

    #[must_use]
    pub fn field(&self, name: &str) -> Option<&TypeRef> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, ty)| ty)
    }
}

///
/// TypeRef
///

#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub enum TypeRef {
    Primitive(Primitive),
    Nullable(Box<Self>),
    Enum(Arc<EnumType>),
    /// String-backed enumeration marker; values carry their own text.
    StringEnum(Arc<str>),
    Resource(Arc<ResourceType>),
    Record(Arc<RecordType>),
    Sequence(Box<Self>),
    Queryable(Box<Self>),
    Array(Box<Self>),
    List(Box<Self>),
    Dictionary(Box<Self>, Box<Self>),
    Function(Vec<Self>, Box<Self>),
}

impl TypeRef {
    pub const BOOL: Self = Self::Primitive(Primitive::Bool);
    pub const BYTE: Self = Self::Primitive(Primitive::Byte);
    pub const CHAR: Self = Self::Primitive(Primitive::Char);
    pub const DATE_TIME: Self = Self::Primitive(Primitive::DateTime);
    pub const DECIMAL: Self = Self::Primitive(Primitive::Decimal);
    pub const DOUBLE: Self = Self::Primitive(Primitive::Double);
    pub const GUID: Self = Self::Primitive(Primitive::Guid);
    pub const INT16: Self = Self::Primitive(Primitive::Int16);
    pub const INT32: Self = Self::Primitive(Primitive::Int32);
    pub const INT64: Self = Self::Primitive(Primitive::Int64);
    pub const OBJECT: Self = Self::Primitive(Primitive::Object);
    pub const SINGLE: Self = Self::Primitive(Primitive::Single);
    pub const STRING: Self = Self::Primitive(Primitive::String);
    pub const TYPE: Self = Self::Primitive(Primitive::Type);

    #[must_use]
    pub fn nullable(inner: Self) -> Self {
        Self::Nullable(Box::new(inner))
    }

    #[must_use]
    pub fn sequence(element: Self) -> Self {
        Self::Sequence(Box::new(element))
    }

    #[must_use]
    pub fn queryable(element: Self) -> Self {
        Self::Queryable(Box::new(element))
    }

    #[must_use]
    pub fn array(element: Self) -> Self {
        Self::Array(Box::new(element))
    }

    #[must_use]
    pub fn list(element: Self) -> Self {
        Self::List(Box::new(element))
    }

    #[must_use]
    pub fn dictionary(key: Self, value: Self) -> Self {
        Self::Dictionary(Box::new(key), Box::new(value))
    }

    #[must_use]
    pub fn function(params: Vec<Self>, result: Self) -> Self {
        Self::Function(params, Box::new(result))
    }

    #[must_use]
    pub const fn as_primitive(&self) -> Option<Primitive> {
        match self {
            Self::Primitive(p) => Some(*p),
            _ => None,
        }
    }

    #[must_use]
    pub const fn is_primitive(&self, primitive: Primitive) -> bool {
        matches!(self, Self::Primitive(p) if *p as u8 == primitive as u8)
    }

    #[must_use]
    pub const fn is_nullable(&self) -> bool {
        matches!(self, Self::Nullable(_))
    }

    /// Strip exactly one level of nullable wrapping.
    #[must_use]
    pub fn unwrap_nullable(&self) -> &Self {
        match self {
            Self::Nullable(inner) => inner,
            other => other,
        }
    }

    #[must_use]
    pub fn as_enum(&self) -> Option<&Arc<EnumType>> {
        match self {
            Self::Enum(ty) => Some(ty),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_resource(&self) -> Option<&Arc<ResourceType>> {
        match self {
            Self::Resource(ty) => Some(ty),
            _ => None,
        }
    }

    /// Value types must be boxed before they can travel in an object array.
    #[must_use]
    pub const fn is_value_type(&self) -> bool {
        match self {
            Self::Primitive(p) => p.is_value_type(),
            Self::Nullable(_) | Self::Enum(_) => true,
            _ => false,
        }
    }

    /// Element type of any enumerable shape other than `String`.
    #[must_use]
    pub fn element_type(&self) -> Option<&Self> {
        match self {
            Self::Sequence(element)
            | Self::Queryable(element)
            | Self::Array(element)
            | Self::List(element) => Some(element),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_enumerable(&self) -> bool {
        self.element_type().is_some()
    }

    /// Identity member of a resource type, if it declares one.
    #[must_use]
    pub fn identity_member(&self) -> Option<&MemberRef> {
        self.as_resource().and_then(|r| r.identity.as_ref())
    }
}

impl From<Primitive> for TypeRef {
    fn from(p: Primitive) -> Self {
        Self::Primitive(p)
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Primitive(p) => f.write_str(p.native_name()),
            Self::Nullable(inner) => write!(f, "{inner}?"),
            Self::Enum(ty) => f.write_str(&ty.name),
            Self::StringEnum(name) => f.write_str(name),
            Self::Resource(ty) => f.write_str(&ty.name),
            Self::Record(ty) => {
                f.write_str("{")?;
                for (i, (name, field)) in ty.fields.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{name}: {field}")?;
                }
                f.write_str("}")
            }
            Self::Sequence(element) => write!(f, "Sequence<{element}>"),
            Self::Queryable(element) => write!(f, "Queryable<{element}>"),
            Self::Array(element) => write!(f, "{element}[]"),
            Self::List(element) => write!(f, "List<{element}>"),
            Self::Dictionary(key, value) => write!(f, "Dictionary<{key}, {value}>"),
            Self::Function(params, result) => {
                f.write_str("Fn(")?;
                for (i, param) in params.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{param}")?;
                }
                write!(f, ") -> {result}")
            }
        }
    }
}
