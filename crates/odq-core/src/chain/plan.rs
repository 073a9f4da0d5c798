use crate::{
    node::{ExtendedNode, NodeKind, strip_scope},
    partition::LocalProjection,
    types::TypeRef,
};
use serde::{Serialize, Serializer};
use std::fmt;

///
/// ProjectionMode
///
/// How the caller consumes the result set.
///

#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub enum ProjectionMode {
    #[default]
    Stream,
    First,
    FirstOrDefault,
    FirstLazy,
    Any,
    Uri,
}

impl ProjectionMode {
    /// `$projection` token; streams carry none.
    #[must_use]
    pub const fn token(self) -> Option<&'static str> {
        match self {
            Self::Stream => None,
            Self::First => Some("first"),
            Self::FirstOrDefault => Some("firstOrDefault"),
            Self::FirstLazy => Some("firstLazy"),
            Self::Any => Some("any"),
            Self::Uri => Some("uri"),
        }
    }
}

///
/// QueryPlan
///
/// Fully resolved effect of one query chain, rendered once into named
/// parameters.
///

#[derive(Clone, Debug)]
pub struct QueryPlan {
    pub source: String,
    pub element_type: TypeRef,
    pub of_type: Option<String>,
    pub filter: Option<ExtendedNode>,
    pub order: Option<ExtendedNode>,
    pub group_by: Option<ExtendedNode>,
    pub select: Option<ExtendedNode>,
    pub skip: Option<u32>,
    pub take: Option<u32>,
    pub expand: Vec<String>,
    pub total_count: bool,
    pub mode: ProjectionMode,
}

impl QueryPlan {
    #[must_use]
    pub fn new(source: impl Into<String>, element_type: TypeRef) -> Self {
        Self {
            source: source.into(),
            element_type,
            of_type: None,
            filter: None,
            order: None,
            group_by: None,
            select: None,
            skip: None,
            take: None,
            expand: Vec::new(),
            total_count: false,
            mode: ProjectionMode::Stream,
        }
    }

    /// Local half of a partitioned projection, when the select was split.
    #[must_use]
    pub fn local_projection(&self) -> Option<&LocalProjection> {
        match self.select.as_ref()?.kind() {
            NodeKind::ClientServerSplit { local, .. } => Some(local),
            _ => None,
        }
    }

    /// Named parameters, in wire order; unset fields are omitted.
    #[must_use]
    pub fn parameters(&self) -> QueryParameters {
        let mut params = QueryParameters::default();

        if let Some(of_type) = &self.of_type {
            params.push("$oftype", of_type.clone());
        }
        if let Some(token) = self.mode.token() {
            params.push("$projection", token);
        }
        if let Some(filter) = &self.filter {
            params.push("$filter", strip_scope(filter));
        }
        if let Some(order) = &self.order {
            params.push("$orderby", order.render());
        }
        if let Some(group_by) = &self.group_by {
            params.push("$groupby", strip_scope(group_by));
        }
        if let Some(select) = &self.select {
            params.push("$select", strip_scope(select));
        }
        if let Some(skip) = self.skip {
            params.push("$skip", skip.to_string());
        }
        if let Some(take) = self.take {
            params.push("$top", take.to_string());
        }
        if !self.expand.is_empty() {
            params.push("$expand", self.expand.join(","));
        }
        if self.total_count {
            params.push("$totalcount", "true");
        }

        params
    }
}

///
/// QueryParameters
///
/// Ordered name/value pairs. Values are not percent-encoded.
///

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct QueryParameters(Vec<(&'static str, String)>);

impl QueryParameters {
    fn push(&mut self, name: &'static str, value: impl Into<String>) {
        self.0.push((name, value.into()));
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(param, _)| *param == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &str)> {
        self.0.iter().map(|(name, value)| (*name, value.as_str()))
    }

    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        self.0.iter().map(|(name, _)| *name).collect()
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for QueryParameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (name, value)) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("&")?;
            }
            write!(f, "{name}={value}")?;
        }

        Ok(())
    }
}

impl Serialize for QueryParameters {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.iter())
    }
}
