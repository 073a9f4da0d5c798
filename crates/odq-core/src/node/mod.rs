//! Extended-node family.
//!
//! Compiled output tree: every node is both a typed AST node and its own
//! renderer. Nodes are immutable and built in one pass; support flags are
//! computed at construction and the rendered text is memoized once.

mod render;


use crate::{expr::ExprId, partition::LocalProjection, types::TypeRef};
use derive_more::Display;
use std::{fmt, sync::Arc, sync::OnceLock};

// re-exports
pub use render::{render_template, strip_scope};

///
/// SortDirection
///

#[derive(Clone, Copy, Debug, Default, Display, Eq, Hash, PartialEq)]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

///
/// Segment
///
/// One child of a composite node: another node, or an opaque text value.
///

#[derive(Clone, Debug)]
pub enum Segment {
    Node(ExtendedNode),
    Text(String),
}

impl Segment {
    #[must_use]
    pub fn text(s: impl Into<String>) -> Self {
        Self::Text(s.into())
    }

    #[must_use]
    pub const fn as_node(&self) -> Option<&ExtendedNode> {
        match self {
            Self::Node(node) => Some(node),
            Self::Text(_) => None,
        }
    }
}

impl From<ExtendedNode> for Segment {
    fn from(node: ExtendedNode) -> Self {
        Self::Node(node)
    }
}

impl From<&str> for Segment {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

///
/// NodeKind
///

#[derive(Debug)]
pub enum NodeKind {
    /// One literal token: encoded constant, member name or `this`.
    Terminal(String),

    /// Template with `{n}` placeholders filled positionally.
    Formatted { template: String, args: Vec<Segment> },

    List(Vec<Segment>),

    /// Parenthesised child; a scoped child reuses its own parentheses.
    ParenScope(ExtendedNode),

    Select(Vec<(String, ExtendedNode)>),

    Order(Vec<(ExtendedNode, SortDirection)>),

    /// Server array projection plus the local function that rebuilds the
    /// caller's shape from it.
    ClientServerSplit {
        server: ExtendedNode,
        local: LocalProjection,
    },

    /// Untranslatable host sub-tree. Never rendered onto the wire.
    NotSupported {
        source: ExprId,
        cause: Option<String>,
    },
}

struct NodeInner {
    kind: NodeKind,
    ty: TypeRef,
    supported: bool,
    local_preferred: bool,
    rendered: OnceLock<String>,
}

///
/// ExtendedNode
///
/// Cheap-to-clone shared handle. Identity (`ptr_eq`) is what the memo cache
/// hands back for repeated visits of one host sub-tree.
///

#[derive(Clone)]
pub struct ExtendedNode(Arc<NodeInner>);

impl ExtendedNode {
    fn build(kind: NodeKind, ty: TypeRef, local_preferred: bool) -> Self {
        let supported = match &kind {
            NodeKind::NotSupported { .. } => false,
            other => children_of(other).all(|child| child.is_supported_on_server()),
        };
        let local_preferred = local_preferred || matches!(kind, NodeKind::NotSupported { .. });

        Self(Arc::new(NodeInner {
            kind,
            ty,
            supported,
            local_preferred,
            rendered: OnceLock::new(),
        }))
    }

    #[must_use]
    pub fn terminal(token: impl Into<String>, ty: TypeRef) -> Self {
        Self::build(NodeKind::Terminal(token.into()), ty, false)
    }

    /// Encoded literal. Literals prefer local execution: the partitioner
    /// never spends a server slot on a value it already has.
    #[must_use]
    pub fn literal(token: impl Into<String>, ty: TypeRef) -> Self {
        Self::build(NodeKind::Terminal(token.into()), ty, true)
    }

    #[must_use]
    pub fn formatted(template: impl Into<String>, args: Vec<Segment>, ty: TypeRef) -> Self {
        Self::build(
            NodeKind::Formatted {
                template: template.into(),
                args,
            },
            ty,
            false,
        )
    }

    #[must_use]
    pub fn list(segments: Vec<Segment>, ty: TypeRef) -> Self {
        Self::build(NodeKind::List(segments), ty, false)
    }

    #[must_use]
    pub fn scope(child: Self) -> Self {
        let ty = child.ty().clone();

        Self::build(NodeKind::ParenScope(child), ty, false)
    }

    #[must_use]
    pub fn select(fields: Vec<(String, Self)>, ty: TypeRef) -> Self {
        Self::build(NodeKind::Select(fields), ty, false)
    }

    #[must_use]
    pub fn order(keys: Vec<(Self, SortDirection)>) -> Self {
        Self::build(NodeKind::Order(keys), TypeRef::OBJECT, false)
    }

    #[must_use]
    pub fn split(server: Self, local: LocalProjection) -> Self {
        let ty = local.result_type().clone();

        Self::build(NodeKind::ClientServerSplit { server, local }, ty, false)
    }

    #[must_use]
    pub fn not_supported(source: ExprId, ty: TypeRef, cause: Option<String>) -> Self {
        Self::build(NodeKind::NotSupported { source, cause }, ty, true)
    }

    #[must_use]
    pub fn kind(&self) -> &NodeKind {
        &self.0.kind
    }

    #[must_use]
    pub fn ty(&self) -> &TypeRef {
        &self.0.ty
    }

    /// False when any reachable descendant is `NotSupported`.
    #[must_use]
    pub fn is_supported_on_server(&self) -> bool {
        self.0.supported
    }

    #[must_use]
    pub fn is_local_execution_preferred(&self) -> bool {
        self.0.local_preferred
    }

    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    #[must_use]
    pub fn is_scope(&self) -> bool {
        matches!(self.0.kind, NodeKind::ParenScope(_))
    }

    /// Child of a `ParenScope`, if this is one.
    #[must_use]
    pub fn scope_inner(&self) -> Option<&Self> {
        match &self.0.kind {
            NodeKind::ParenScope(child) => Some(child),
            _ => None,
        }
    }

    /// Direct node children.
    pub fn children(&self) -> impl Iterator<Item = &Self> {
        children_of(&self.0.kind)
    }

    /// First `NotSupported` node in depth-first order.
    #[must_use]
    pub fn first_unsupported(&self) -> Option<&Self> {
        if self.is_supported_on_server() {
            return None;
        }
        if matches!(self.0.kind, NodeKind::NotSupported { .. }) {
            return Some(self);
        }

        self.children().find_map(Self::first_unsupported)
    }

    /// Diagnostic cause of a `NotSupported` node.
    #[must_use]
    pub fn cause(&self) -> Option<&str> {
        match &self.0.kind {
            NodeKind::NotSupported { cause, .. } => cause.as_deref(),
            _ => None,
        }
    }

    /// Rendered text, computed on first use.
    #[must_use]
    pub fn render(&self) -> &str {
        self.0.rendered.get_or_init(|| {
            let mut out = String::new();
            render::render_into(self, &mut out);
            out
        })
    }
}

fn children_of(kind: &NodeKind) -> Box<dyn Iterator<Item = &ExtendedNode> + '_> {
    match kind {
        NodeKind::Terminal(_) | NodeKind::NotSupported { .. } => Box::new(std::iter::empty()),
        NodeKind::Formatted { args: segments, .. } | NodeKind::List(segments) => {
            Box::new(segments.iter().filter_map(Segment::as_node))
        }
        NodeKind::ParenScope(child) => Box::new(std::iter::once(child)),
        NodeKind::Select(fields) => Box::new(fields.iter().map(|(_, node)| node)),
        NodeKind::Order(keys) => Box::new(keys.iter().map(|(node, _)| node)),
        NodeKind::ClientServerSplit { server, .. } => Box::new(std::iter::once(server)),
    }
}

impl fmt::Debug for ExtendedNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtendedNode")
            .field("kind", &self.0.kind)
            .field("ty", &self.0.ty)
            .field("supported", &self.0.supported)
            .finish_non_exhaustive()
    }
}

impl fmt::Display for ExtendedNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.render())
    }
}
