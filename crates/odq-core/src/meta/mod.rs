//! Metadata collaborators consumed by the compiler.
//!
//! Both traits sit at the boundary to the surrounding framework; the
//! in-crate implementations are registries populated by the caller.

mod functions;


use crate::types::{Primitive, TypeRef};
use std::collections::HashMap;

// re-exports
pub use functions::{CallStyle, DefaultFunctionMap, FunctionMap, FunctionMapping};

///
/// TypeResolver
///
/// Maps semantic types to wire-visible type names and back.
///

pub trait TypeResolver: Send + Sync {
    /// Registered wire name for a non-native type.
    fn wire_name(&self, ty: &TypeRef) -> Option<String>;

    /// Inverse of [`Self::wire_name`].
    fn resolve(&self, name: &str) -> Option<TypeRef>;

    /// Native primitives render by bare name and never reach the registry.
    fn is_native(&self, ty: &TypeRef) -> bool {
        matches!(ty, TypeRef::Primitive(p) if *p != Primitive::Type)
    }
}

///
/// StaticTypeResolver
///
/// Explicit registry. Named types that were never registered fall back to
/// their own nominal name.
///

#[derive(Clone, Debug, Default)]
pub struct StaticTypeResolver {
    names: HashMap<TypeRef, String>,
    types: HashMap<String, TypeRef>,
}

impl StaticTypeResolver {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `ty` under `name`, replacing any previous registration.
    #[must_use]
    pub fn with_type(mut self, ty: TypeRef, name: impl Into<String>) -> Self {
        self.register(ty, name);
        self
    }

    pub fn register(&mut self, ty: TypeRef, name: impl Into<String>) {
        let name = name.into();
        self.types.insert(name.clone(), ty.clone());
        self.names.insert(ty, name);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl TypeResolver for StaticTypeResolver {
    fn wire_name(&self, ty: &TypeRef) -> Option<String> {
        if let Some(name) = self.names.get(ty) {
            return Some(name.clone());
        }

        match ty {
            TypeRef::Enum(e) => Some(e.name.clone()),
            TypeRef::Resource(r) => Some(r.name.clone()),
            TypeRef::StringEnum(name) => Some(name.to_string()),
            _ => None,
        }
    }

    fn resolve(&self, name: &str) -> Option<TypeRef> {
        self.types
            .get(name)
            .cloned()
            .or_else(|| Primitive::from_native_name(name).map(TypeRef::Primitive))
    }
}
