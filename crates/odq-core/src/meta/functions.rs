use crate::{
    expr::{MemberKey, MethodRef},
    library::{self, DATE_TIME, ENUMERABLE, MATH, STRING},
};
use std::collections::HashMap;

///
/// CallStyle
///
/// Static   → `name(a0,a1,..)`
/// Chained  → `a0.name(a1,..)`
/// Template → explicit `{n}` positional template
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum CallStyle {
    Static,
    Chained,
    Template(String),
}

///
/// FunctionMapping
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FunctionMapping {
    pub name: String,
    pub style: CallStyle,
}

impl FunctionMapping {
    #[must_use]
    pub fn prefixed(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            style: CallStyle::Static,
        }
    }

    #[must_use]
    pub fn chained(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            style: CallStyle::Chained,
        }
    }

    #[must_use]
    pub fn template(name: impl Into<String>, template: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            style: CallStyle::Template(template.into()),
        }
    }

    /// Format template for a call with `argc` arguments (receiver included).
    #[must_use]
    pub fn format(&self, argc: usize) -> String {
        let placeholders = |from: usize| {
            (from..argc)
                .map(|i| format!("{{{i}}}"))
                .collect::<Vec<_>>()
                .join(",")
        };

        match &self.style {
            CallStyle::Static => format!("{}({})", self.name, placeholders(0)),
            CallStyle::Chained if argc > 0 => {
                format!("{{0}}.{}({})", self.name, placeholders(1))
            }
            CallStyle::Chained => format!("{}()", self.name),
            CallStyle::Template(template) => template.clone(),
        }
    }
}

///
/// FunctionMap
///
/// Member-to-function mapping table.
///

pub trait FunctionMap: Send + Sync {
    fn lookup(&self, key: &MemberKey) -> Option<&FunctionMapping>;

    /// Plain-enumerable overloads named `name`, candidates for replacing a
    /// queryable extension call.
    fn enumerable_overloads(&self, name: &str) -> Vec<MethodRef>;
}

///
/// DefaultFunctionMap
///

#[derive(Clone, Debug, Default)]
pub struct DefaultFunctionMap {
    mappings: HashMap<MemberKey, FunctionMapping>,
    overloads: Vec<MethodRef>,
}

impl DefaultFunctionMap {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The standard function library.
    #[must_use]
    pub fn standard() -> Self {
        let mut map = Self::new();

        for (name, arity, mapping) in [
            ("StartsWith", 1, FunctionMapping::prefixed("startswith")),
            ("EndsWith", 1, FunctionMapping::prefixed("endswith")),
            (
                "Contains",
                1,
                FunctionMapping::template("substringof", "substringof({1},{0})"),
            ),
            ("ToLower", 0, FunctionMapping::prefixed("tolower")),
            ("ToUpper", 0, FunctionMapping::prefixed("toupper")),
            ("Trim", 0, FunctionMapping::prefixed("trim")),
            ("IndexOf", 1, FunctionMapping::prefixed("indexof")),
            ("Replace", 2, FunctionMapping::prefixed("replace")),
            ("Substring", 1, FunctionMapping::prefixed("substring")),
            ("Substring", 2, FunctionMapping::prefixed("substring")),
            ("Concat", 2, FunctionMapping::prefixed("concat")),
        ] {
            map.register(MemberKey::method(STRING, name, arity), mapping);
        }
        map.register(
            MemberKey::property(STRING, "Length"),
            FunctionMapping::prefixed("length"),
        );

        for (name, function) in [
            ("Year", "year"),
            ("Month", "month"),
            ("Day", "day"),
            ("Hour", "hour"),
            ("Minute", "minute"),
            ("Second", "second"),
        ] {
            map.register(
                MemberKey::property(DATE_TIME, name),
                FunctionMapping::prefixed(function),
            );
        }

        for (name, function) in [("Round", "round"), ("Floor", "floor"), ("Ceiling", "ceiling")] {
            map.register(MemberKey::method(MATH, name, 1), FunctionMapping::prefixed(function));
        }

        for (name, arity, function) in [
            ("Any", 1, "any"),
            ("Any", 2, "any"),
            ("All", 2, "all"),
            ("Count", 1, "count"),
        ] {
            map.register(
                MemberKey::method(ENUMERABLE, name, arity),
                FunctionMapping::chained(function),
            );
        }

        for overload in library::enumerable::overloads() {
            map.add_overload(overload);
        }

        map
    }

    pub fn register(&mut self, key: MemberKey, mapping: FunctionMapping) {
        self.mappings.insert(key, mapping);
    }

    #[must_use]
    pub fn with(mut self, key: MemberKey, mapping: FunctionMapping) -> Self {
        self.register(key, mapping);
        self
    }

    pub fn add_overload(&mut self, method: MethodRef) {
        self.overloads.push(method);
    }
}

impl FunctionMap for DefaultFunctionMap {
    fn lookup(&self, key: &MemberKey) -> Option<&FunctionMapping> {
        self.mappings.get(key)
    }

    fn enumerable_overloads(&self, name: &str) -> Vec<MethodRef> {
        self.overloads
            .iter()
            .filter(|m| m.name == name)
            .cloned()
            .collect()
    }
}
