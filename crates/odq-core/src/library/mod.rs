//! Standard host library metadata.
//!
//! Method, member and type descriptors for the operators and functions a
//! caller's query trees are built from. Implementations attached here back
//! constant folding and local evaluation.

pub mod collections;
pub mod datetime;
pub mod enumerable;
pub mod math;
pub mod queryable;
pub mod string;


use crate::{
    types::{EnumType, Primitive},
    value::{EnumValue, Value},
};
use std::sync::{Arc, LazyLock};

pub const STRING: &str = "String";
pub const DATE_TIME: &str = "DateTime";
pub const MATH: &str = "Math";
pub const ENUMERABLE: &str = "Enumerable";
pub const QUERYABLE: &str = "Queryable";
pub const LIST: &str = "List";
pub const DICTIONARY: &str = "Dictionary";
pub const DICTIONARY_EXTENSIONS: &str = "DictionaryExtensions";

static STRING_COMPARISON: LazyLock<Arc<EnumType>> = LazyLock::new(|| {
    EnumType::new(
        "StringComparison",
        Primitive::Int32,
        [
            ("CurrentCulture", 0),
            ("CurrentCultureIgnoreCase", 1),
            ("InvariantCulture", 2),
            ("InvariantCultureIgnoreCase", 3),
            ("Ordinal", 4),
            ("OrdinalIgnoreCase", 5),
        ],
    )
});

/// The `StringComparison` enumeration.
#[must_use]
pub fn string_comparison() -> Arc<EnumType> {
    STRING_COMPARISON.clone()
}

/// Named `StringComparison` value.
#[must_use]
pub fn comparison(name: &str) -> Option<Value> {
    EnumValue::named(&STRING_COMPARISON, name).map(Value::Enum)
}

/// True for the `*IgnoreCase` comparison modes.
#[must_use]
pub fn is_ignore_case(mode: &Value) -> bool {
    match mode {
        Value::Enum(e) => e.name().is_some_and(|name| name.ends_with("IgnoreCase")),
        other => other.as_i64().is_some_and(|d| d % 2 == 1),
    }
}
