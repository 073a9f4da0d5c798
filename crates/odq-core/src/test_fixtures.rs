//! Shared host-model fixtures for unit tests: a `Customer` resource with a
//! mix of server-visible and local-only members.

use crate::{
    compile::CompileContext,
    expr::{ExprArena, ExprId, MemberInfo, MemberRef},
    types::{EnumType, Primitive, ResourceType, TypeRef},
    value::{RecordValue, Value},
};
use std::sync::{Arc, LazyLock};

pub(crate) const CUSTOMER: &str = "Customer";

static STATUS: LazyLock<Arc<EnumType>> = LazyLock::new(|| {
    EnumType::new("Status", Primitive::Int32, [("Inactive", 0), ("Active", 1)])
});

static CUSTOMER_TYPE: LazyLock<Arc<ResourceType>> =
    LazyLock::new(|| ResourceType::with_identity(CUSTOMER, id()));

pub(crate) fn status() -> Arc<EnumType> {
    STATUS.clone()
}

pub(crate) fn status_value(discriminant: i64) -> Value {
    Value::Enum(crate::value::EnumValue::new(status(), discriminant))
}

pub(crate) fn customer() -> Arc<ResourceType> {
    CUSTOMER_TYPE.clone()
}

pub(crate) fn customer_ty() -> TypeRef {
    TypeRef::Resource(customer())
}

fn member(name: &str, ty: TypeRef) -> MemberRef {
    MemberInfo::new(CUSTOMER, name, ty).into_ref()
}

pub(crate) fn id() -> MemberRef {
    member("Id", TypeRef::INT32)
}

pub(crate) fn name() -> MemberRef {
    member("Name", TypeRef::STRING)
}

pub(crate) fn age() -> MemberRef {
    member("Age", TypeRef::INT32)
}

pub(crate) fn price() -> MemberRef {
    member("Price", TypeRef::DECIMAL)
}

pub(crate) fn status_member() -> MemberRef {
    member("Status", TypeRef::Enum(status()))
}

pub(crate) fn maybe_status() -> MemberRef {
    member("MaybeStatus", TypeRef::nullable(TypeRef::Enum(status())))
}

pub(crate) fn birthday() -> MemberRef {
    member("Birthday", TypeRef::DATE_TIME)
}

pub(crate) fn tags() -> MemberRef {
    member("Tags", TypeRef::list(TypeRef::STRING))
}

pub(crate) fn attributes() -> MemberRef {
    member("Attributes", TypeRef::dictionary(TypeRef::STRING, TypeRef::STRING))
}

pub(crate) fn friend() -> MemberRef {
    member("Friend", customer_ty())
}

pub(crate) fn is_active() -> MemberRef {
    member("IsActive", TypeRef::BOOL)
}

pub(crate) fn unit_price() -> MemberRef {
    member("UnitPrice", TypeRef::DECIMAL)
}

/// Computed property: number of order lines, evaluated from the fetched
/// entity.
pub(crate) fn count() -> MemberRef {
    MemberInfo::new(CUSTOMER, "Count", TypeRef::INT32)
        .with_getter(|value| match value.field("Lines")? {
            Value::List(lines) => i32::try_from(lines.len()).ok().map(Value::Int32),
            _ => None,
        })
        .local_only()
        .into_ref()
}

/// A fetched customer row.
pub(crate) fn customer_row(fields: Vec<(&str, Value)>) -> Value {
    Value::Record(RecordValue::typed(
        CUSTOMER,
        fields
            .into_iter()
            .map(|(name, value)| (name.to_string(), value))
            .collect(),
    ))
}

///
/// Scope
///
/// Arena plus the `x` parameter every fixture lambda is built over.
///

pub(crate) struct Scope {
    pub(crate) arena: ExprArena,
    pub(crate) ctx: CompileContext,
    pub(crate) x: ExprId,
}

impl Scope {
    pub(crate) fn new() -> Self {
        let mut arena = ExprArena::new();
        let x = arena.parameter("x", customer_ty());

        Self {
            arena,
            ctx: CompileContext::standard(),
            x,
        }
    }

    /// `x.<member>`
    pub(crate) fn get(&mut self, member: &MemberRef) -> ExprId {
        self.arena.field(self.x, member)
    }

    /// `x => body`
    pub(crate) fn lambda(&mut self, body: ExprId) -> ExprId {
        self.arena.lambda1(self.x, body)
    }
}
