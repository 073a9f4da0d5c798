use crate::{chain::QueryOperator, types::TypeRef, value::Value};
use std::{fmt, sync::Arc};

/// Host getter used by constant folding and local evaluation.
pub type Getter = Arc<dyn Fn(&Value) -> Option<Value> + Send + Sync>;

/// Host method body. Instance methods receive their receiver as the first
/// argument. `None` means the call cannot be evaluated for these inputs.
pub type HostFn = Arc<dyn Fn(&[Value]) -> Option<Value> + Send + Sync>;

/// Host body for methods taking lambda arguments, such as `Any(pred)`.
pub type HigherOrderFn = Arc<dyn Fn(&[HostArg<'_>]) -> Option<Value> + Send + Sync>;

///
/// HostArg
///
/// Argument to a higher-order host body. Lambda arguments arrive as local
/// functions over their parameters.
///

pub enum HostArg<'a> {
    Value(Value),
    Function(&'a dyn Fn(&[Value]) -> Option<Value>),
}

///
/// MemberKey
///
/// Identity of a callable member: declaring type, name and arity.
/// Properties carry no arity.
///

#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct MemberKey {
    pub declaring: String,
    pub name: String,
    pub arity: Option<usize>,
}

impl MemberKey {
    #[must_use]
    pub fn property(declaring: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            declaring: declaring.into(),
            name: name.into(),
            arity: None,
        }
    }

    #[must_use]
    pub fn method(declaring: impl Into<String>, name: impl Into<String>, arity: usize) -> Self {
        Self {
            declaring: declaring.into(),
            name: name.into(),
            arity: Some(arity),
        }
    }
}

impl fmt::Display for MemberKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.declaring, self.name)
    }
}

///
/// MemberInfo
///
/// Property or field metadata. `local_only` marks computed properties the
/// remote side cannot evaluate.
///

pub struct MemberInfo {
    pub declaring: String,
    pub name: String,
    pub ty: TypeRef,
    pub getter: Option<Getter>,
    pub local_only: bool,
}

impl MemberInfo {
    #[must_use]
    pub fn new(declaring: impl Into<String>, name: impl Into<String>, ty: TypeRef) -> Self {
        Self {
            declaring: declaring.into(),
            name: name.into(),
            ty,
            getter: None,
            local_only: false,
        }
    }

    #[must_use]
    pub fn with_getter(mut self, getter: impl Fn(&Value) -> Option<Value> + Send + Sync + 'static) -> Self {
        self.getter = Some(Arc::new(getter));
        self
    }

    #[must_use]
    pub const fn local_only(mut self) -> Self {
        self.local_only = true;
        self
    }

    #[must_use]
    pub fn into_ref(self) -> MemberRef {
        Arc::new(self)
    }

    #[must_use]
    pub fn key(&self) -> MemberKey {
        MemberKey::property(self.declaring.clone(), self.name.clone())
    }
}

impl fmt::Debug for MemberInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemberInfo")
            .field("declaring", &self.declaring)
            .field("name", &self.name)
            .field("ty", &self.ty)
            .field("local_only", &self.local_only)
            .finish_non_exhaustive()
    }
}

pub type MemberRef = Arc<MemberInfo>;

///
/// ParamShape
///
/// Coarse parameter classification used to match queryable overloads to
/// their plain-enumerable counterparts.
///

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum ParamShape {
    Queryable,
    Sequence,
    /// Quoted lambda (expression tree argument).
    Expression,
    /// Plain delegate argument.
    Function,
    Value,
}

impl ParamShape {
    /// Queryable and quoted-lambda shapes are equivalent to their plain
    /// enumerable and delegate counterparts.
    #[must_use]
    pub const fn equivalent(self, other: Self) -> bool {
        matches!(
            (self.normalized(), other.normalized()),
            (Self::Sequence, Self::Sequence)
                | (Self::Function, Self::Function)
                | (Self::Value, Self::Value)
        )
    }

    const fn normalized(self) -> Self {
        match self {
            Self::Queryable => Self::Sequence,
            Self::Expression => Self::Function,
            other => other,
        }
    }
}

///
/// SpecialMethod
///
/// Methods recognised ahead of the generic function table.
///

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum SpecialMethod {
    /// `string.Equals(a, b, StringComparison)`.
    StringEquals,
    /// `Enumerable.Contains(sequence, item)`.
    SequenceContains,
    /// `list.Contains(item)`.
    ListContains,
    /// `dictionary[key]` on string-keyed dictionaries.
    DictionaryIndexer,
    /// `dictionary.SafeGet(key)` helper.
    SafeGet,
    Query(QueryOperator),
}

///
/// MethodInfo
///

pub struct MethodInfo {
    pub declaring: String,
    pub name: String,
    pub params: Vec<ParamShape>,
    pub is_static: bool,
    pub result: TypeRef,
    pub implementation: Option<HostFn>,
    pub higher_order: Option<HigherOrderFn>,
    pub special: Option<SpecialMethod>,
}

impl MethodInfo {
    #[must_use]
    pub fn new_static(
        declaring: impl Into<String>,
        name: impl Into<String>,
        params: Vec<ParamShape>,
        result: TypeRef,
    ) -> Self {
        Self {
            declaring: declaring.into(),
            name: name.into(),
            params,
            is_static: true,
            result,
            implementation: None,
            higher_order: None,
            special: None,
        }
    }

    #[must_use]
    pub fn new_instance(
        declaring: impl Into<String>,
        name: impl Into<String>,
        params: Vec<ParamShape>,
        result: TypeRef,
    ) -> Self {
        Self {
            is_static: false,
            ..Self::new_static(declaring, name, params, result)
        }
    }

    #[must_use]
    pub fn with_implementation(
        mut self,
        implementation: impl Fn(&[Value]) -> Option<Value> + Send + Sync + 'static,
    ) -> Self {
        self.implementation = Some(Arc::new(implementation));
        self
    }

    #[must_use]
    pub fn with_higher_order(
        mut self,
        implementation: impl Fn(&[HostArg<'_>]) -> Option<Value> + Send + Sync + 'static,
    ) -> Self {
        self.higher_order = Some(Arc::new(implementation));
        self
    }

    #[must_use]
    pub const fn with_special(mut self, special: SpecialMethod) -> Self {
        self.special = Some(special);
        self
    }

    #[must_use]
    pub fn into_ref(self) -> MethodRef {
        Arc::new(self)
    }

    #[must_use]
    pub fn key(&self) -> MemberKey {
        MemberKey::method(self.declaring.clone(), self.name.clone(), self.params.len())
    }

    /// True for static extension-style methods over a queryable source.
    #[must_use]
    pub fn is_queryable_extension(&self) -> bool {
        self.is_static && self.params.first() == Some(&ParamShape::Queryable)
    }

    /// Same arity and pairwise-equivalent parameter shapes.
    #[must_use]
    pub fn shape_matches(&self, other: &Self) -> bool {
        self.is_static == other.is_static
            && self.params.len() == other.params.len()
            && self
                .params
                .iter()
                .zip(&other.params)
                .all(|(a, b)| a.equivalent(*b))
    }
}

impl fmt::Debug for MethodInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodInfo")
            .field("declaring", &self.declaring)
            .field("name", &self.name)
            .field("params", &self.params)
            .field("is_static", &self.is_static)
            .field("special", &self.special)
            .finish_non_exhaustive()
    }
}

pub type MethodRef = Arc<MethodInfo>;

///
/// Constructor
///
/// Host constructor for non-anonymous object construction; folding invokes
/// it when every argument is a literal.
///

#[derive(Clone)]
pub struct Constructor {
    pub ty: TypeRef,
    pub implementation: HostFn,
}

impl fmt::Debug for Constructor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Constructor")
            .field("ty", &self.ty)
            .finish_non_exhaustive()
    }
}
