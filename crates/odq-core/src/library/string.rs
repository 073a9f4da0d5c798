//! String members and methods.

use crate::{
    expr::{MemberInfo, MemberRef, MethodInfo, MethodRef, ParamShape, SpecialMethod},
    library::{STRING, is_ignore_case},
    types::TypeRef,
    value::Value,
};
use std::sync::LazyLock;

fn text_predicate(name: &str, f: fn(&str, &str) -> bool) -> MethodRef {
    MethodInfo::new_instance(STRING, name, vec![ParamShape::Value], TypeRef::BOOL)
        .with_implementation(move |args| match args {
            [Value::Text(s), Value::Text(arg)] => Some(Value::Bool(f(s, arg))),
            _ => None,
        })
        .into_ref()
}

fn text_transform(name: &str, f: fn(&str) -> String) -> MethodRef {
    MethodInfo::new_instance(STRING, name, vec![], TypeRef::STRING)
        .with_implementation(move |args| match args {
            [Value::Text(s)] => Some(Value::Text(f(s))),
            _ => None,
        })
        .into_ref()
}

fn char_substring(s: &str, start: usize, len: Option<usize>) -> Option<String> {
    let total = s.chars().count();
    let len = len.unwrap_or(total.checked_sub(start)?);
    if start.checked_add(len)? > total {
        return None;
    }

    Some(s.chars().skip(start).take(len).collect())
}

fn index(value: &Value) -> Option<usize> {
    value.as_i64().and_then(|i| usize::try_from(i).ok())
}

static STARTS_WITH: LazyLock<MethodRef> =
    LazyLock::new(|| text_predicate("StartsWith", |s, p| s.starts_with(p)));

static ENDS_WITH: LazyLock<MethodRef> =
    LazyLock::new(|| text_predicate("EndsWith", |s, p| s.ends_with(p)));

static CONTAINS: LazyLock<MethodRef> =
    LazyLock::new(|| text_predicate("Contains", |s, p| s.contains(p)));

static TO_LOWER: LazyLock<MethodRef> = LazyLock::new(|| text_transform("ToLower", str::to_lowercase));

static TO_UPPER: LazyLock<MethodRef> = LazyLock::new(|| text_transform("ToUpper", str::to_uppercase));

static TRIM: LazyLock<MethodRef> = LazyLock::new(|| text_transform("Trim", |s| s.trim().to_string()));

static INDEX_OF: LazyLock<MethodRef> = LazyLock::new(|| {
    MethodInfo::new_instance(STRING, "IndexOf", vec![ParamShape::Value], TypeRef::INT32)
        .with_implementation(|args| match args {
            [Value::Text(s), Value::Text(needle)] => {
                let position = s
                    .find(needle.as_str())
                    .map_or(-1, |byte| s[..byte].chars().count().try_into().unwrap_or(-1));
                Some(Value::Int32(position))
            }
            _ => None,
        })
        .into_ref()
});

static REPLACE: LazyLock<MethodRef> = LazyLock::new(|| {
    MethodInfo::new_instance(
        STRING,
        "Replace",
        vec![ParamShape::Value, ParamShape::Value],
        TypeRef::STRING,
    )
    .with_implementation(|args| match args {
        [Value::Text(s), Value::Text(from), Value::Text(to)] if !from.is_empty() => {
            Some(Value::Text(s.replace(from.as_str(), to)))
        }
        _ => None,
    })
    .into_ref()
});

static SUBSTRING: LazyLock<MethodRef> = LazyLock::new(|| {
    MethodInfo::new_instance(STRING, "Substring", vec![ParamShape::Value], TypeRef::STRING)
        .with_implementation(|args| match args {
            [Value::Text(s), start] => char_substring(s, index(start)?, None).map(Value::Text),
            _ => None,
        })
        .into_ref()
});

static SUBSTRING_LENGTH: LazyLock<MethodRef> = LazyLock::new(|| {
    MethodInfo::new_instance(
        STRING,
        "Substring",
        vec![ParamShape::Value, ParamShape::Value],
        TypeRef::STRING,
    )
    .with_implementation(|args| match args {
        [Value::Text(s), start, len] => {
            char_substring(s, index(start)?, Some(index(len)?)).map(Value::Text)
        }
        _ => None,
    })
    .into_ref()
});

static CONCAT: LazyLock<MethodRef> = LazyLock::new(|| {
    MethodInfo::new_static(
        STRING,
        "Concat",
        vec![ParamShape::Value, ParamShape::Value],
        TypeRef::STRING,
    )
    .with_implementation(|args| {
        let mut out = String::new();
        for arg in args {
            match arg {
                Value::Text(s) => out.push_str(s),
                Value::Null => {}
                _ => return None,
            }
        }
        Some(Value::Text(out))
    })
    .into_ref()
});

static EQUALS_COMPARISON: LazyLock<MethodRef> = LazyLock::new(|| {
    MethodInfo::new_static(
        STRING,
        "Equals",
        vec![ParamShape::Value, ParamShape::Value, ParamShape::Value],
        TypeRef::BOOL,
    )
    .with_implementation(|args| match args {
        [Value::Text(a), Value::Text(b), mode] => Some(Value::Bool(if is_ignore_case(mode) {
            a.to_lowercase() == b.to_lowercase()
        } else {
            a == b
        })),
        _ => None,
    })
    .with_special(SpecialMethod::StringEquals)
    .into_ref()
});

static LENGTH: LazyLock<MemberRef> = LazyLock::new(|| {
    MemberInfo::new(STRING, "Length", TypeRef::INT32)
        .with_getter(|value| match value {
            Value::Text(s) => i32::try_from(s.chars().count()).ok().map(Value::Int32),
            _ => None,
        })
        .into_ref()
});

#[must_use]
pub fn starts_with() -> MethodRef {
    STARTS_WITH.clone()
}

#[must_use]
pub fn ends_with() -> MethodRef {
    ENDS_WITH.clone()
}

#[must_use]
pub fn contains() -> MethodRef {
    CONTAINS.clone()
}

#[must_use]
pub fn to_lower() -> MethodRef {
    TO_LOWER.clone()
}

#[must_use]
pub fn to_upper() -> MethodRef {
    TO_UPPER.clone()
}

#[must_use]
pub fn trim() -> MethodRef {
    TRIM.clone()
}

#[must_use]
pub fn index_of() -> MethodRef {
    INDEX_OF.clone()
}

#[must_use]
pub fn replace() -> MethodRef {
    REPLACE.clone()
}

#[must_use]
pub fn substring() -> MethodRef {
    SUBSTRING.clone()
}

#[must_use]
pub fn substring_length() -> MethodRef {
    SUBSTRING_LENGTH.clone()
}

/// Static two-argument concatenation; string `+` folds into this call.
#[must_use]
pub fn concat() -> MethodRef {
    CONCAT.clone()
}

/// `String.Equals(a, b, StringComparison)`.
#[must_use]
pub fn equals_comparison() -> MethodRef {
    EQUALS_COMPARISON.clone()
}

#[must_use]
pub fn length() -> MemberRef {
    LENGTH.clone()
}
