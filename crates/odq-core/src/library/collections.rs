//! List and dictionary members.

use crate::{
    expr::{MethodInfo, MethodRef, ParamShape, SpecialMethod},
    library::{DICTIONARY, DICTIONARY_EXTENSIONS, LIST, enumerable},
    types::TypeRef,
    value::Value,
};

/// `list.Contains(item)`.
#[must_use]
pub fn list_contains() -> MethodRef {
    MethodInfo::new_instance(LIST, "Contains", vec![ParamShape::Value], TypeRef::BOOL)
        .with_implementation(|args| match args {
            [Value::List(items), item] => Some(Value::Bool(enumerable::contains(items, item))),
            _ => None,
        })
        .with_special(SpecialMethod::ListContains)
        .into_ref()
}

/// String-keyed dictionary indexer (`get_Item`), typed by its value type.
#[must_use]
pub fn indexer(value_ty: TypeRef) -> MethodRef {
    MethodInfo::new_instance(DICTIONARY, "get_Item", vec![ParamShape::Value], value_ty)
        .with_implementation(|args| match args {
            [Value::Record(record), Value::Text(key)] => record.field(key).cloned(),
            _ => None,
        })
        .with_special(SpecialMethod::DictionaryIndexer)
        .into_ref()
}

/// `SafeGet(dictionary, key)` helper; a missing key yields null.
#[must_use]
pub fn safe_get(value_ty: TypeRef) -> MethodRef {
    MethodInfo::new_static(
        DICTIONARY_EXTENSIONS,
        "SafeGet",
        vec![ParamShape::Value, ParamShape::Value],
        value_ty,
    )
    .with_implementation(|args| match args {
        [Value::Record(record), Value::Text(key)] => {
            Some(record.field(key).cloned().unwrap_or(Value::Null))
        }
        _ => None,
    })
    .with_special(SpecialMethod::SafeGet)
    .into_ref()
}
