//! Host query AST.
//!
//! Every node lives in an append-only [`ExprArena`] and is addressed by a
//! stable [`ExprId`]. Rewrites append new nodes; nothing already in the
//! arena is ever mutated, so ids stay valid for memo tables keyed on them.

mod builder;
mod member;
mod rewrite;

#[cfg(test)]
mod tests;

use crate::{node::ExtendedNode, types::TypeRef, value::Value};
use derive_more::Display;

// re-exports
pub use member::{
    Constructor, Getter, HigherOrderFn, HostArg, HostFn, MemberInfo, MemberKey, MemberRef,
    MethodInfo, MethodRef, ParamShape, SpecialMethod,
};
pub use rewrite::{children, references, replace_parameter, with_children};

///
/// ExprId
///

#[derive(Clone, Copy, Debug, Display, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[display("#{_0}")]
pub struct ExprId(u32);

impl ExprId {
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

///
/// BinaryOp
///

#[derive(Clone, Copy, Debug, Display, Eq, Hash, PartialEq)]
pub enum BinaryOp {
    And,
    Or,
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Coalesce,
}

impl BinaryOp {
    /// Wire keyword; `Coalesce` has none.
    #[must_use]
    pub const fn keyword(self) -> Option<&'static str> {
        let keyword = match self {
            Self::And => "and",
            Self::Or => "or",
            Self::Eq => "eq",
            Self::Ne => "ne",
            Self::Gt => "gt",
            Self::Ge => "ge",
            Self::Lt => "lt",
            Self::Le => "le",
            Self::Add => "add",
            Self::Sub => "sub",
            Self::Mul => "mul",
            Self::Div => "div",
            Self::Mod => "mod",
            Self::Coalesce => return None,
        };

        Some(keyword)
    }

    /// Binding strength, loosest first.
    #[must_use]
    pub const fn precedence(self) -> u8 {
        match self {
            Self::Coalesce => 0,
            Self::Or => 1,
            Self::And => 2,
            Self::Eq | Self::Ne | Self::Gt | Self::Ge | Self::Lt | Self::Le => 3,
            Self::Add | Self::Sub => 4,
            Self::Mul | Self::Div | Self::Mod => 5,
        }
    }

    #[must_use]
    pub const fn is_comparison(self) -> bool {
        matches!(
            self,
            Self::Eq | Self::Ne | Self::Gt | Self::Ge | Self::Lt | Self::Le
        )
    }

    #[must_use]
    pub const fn is_arithmetic(self) -> bool {
        matches!(
            self,
            Self::Add | Self::Sub | Self::Mul | Self::Div | Self::Mod
        )
    }
}

///
/// UnaryOp
///

#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub enum UnaryOp {
    Not,
    Negate,
    Convert(TypeRef),
    TypeAs(TypeRef),
    Quote,
    ArrayLength,
}

///
/// Expr
///

#[derive(Clone, Debug)]
pub enum Expr {
    Parameter {
        name: String,
    },
    Constant(Value),
    Member {
        receiver: Option<ExprId>,
        member: MemberRef,
    },
    Binary {
        op: BinaryOp,
        left: ExprId,
        right: ExprId,
    },
    Unary {
        op: UnaryOp,
        operand: ExprId,
    },
    ArrayIndex {
        array: ExprId,
        index: ExprId,
    },
    Call {
        receiver: Option<ExprId>,
        method: MethodRef,
        args: Vec<ExprId>,
    },
    Conditional {
        test: ExprId,
        if_true: ExprId,
        if_false: ExprId,
    },
    TypeIs {
        operand: ExprId,
        ty: TypeRef,
    },
    Lambda {
        params: Vec<ExprId>,
        body: ExprId,
    },
    /// Object construction. `members` names the fields of anonymous and
    /// record shapes; `constructor` is set for host types with a real
    /// constructor.
    New {
        constructor: Option<Constructor>,
        members: Option<Vec<String>>,
        args: Vec<ExprId>,
    },
    NewArray {
        items: Vec<ExprId>,
    },
    ListInit {
        items: Vec<ExprId>,
    },
    Source {
        name: String,
    },
    Compiled(ExtendedNode),
}

impl Expr {
    /// Short kind label used in diagnostics.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Parameter { .. } => "Parameter",
            Self::Constant(_) => "Constant",
            Self::Member { .. } => "MemberAccess",
            Self::Binary { .. } => "Binary",
            Self::Unary { op, .. } => match op {
                UnaryOp::Not => "Not",
                UnaryOp::Negate => "Negate",
                UnaryOp::Convert(_) => "Convert",
                UnaryOp::TypeAs(_) => "TypeAs",
                UnaryOp::Quote => "Quote",
                UnaryOp::ArrayLength => "ArrayLength",
            },
            Self::ArrayIndex { .. } => "ArrayIndex",
            Self::Call { .. } => "Call",
            Self::Conditional { .. } => "Conditional",
            Self::TypeIs { .. } => "TypeIs",
            Self::Lambda { .. } => "Lambda",
            Self::New { .. } => "New",
            Self::NewArray { .. } => "NewArray",
            Self::ListInit { .. } => "ListInit",
            Self::Source { .. } => "Source",
            Self::Compiled(_) => "Compiled",
        }
    }
}

///
/// ExprNode
///

#[derive(Clone, Debug)]
pub struct ExprNode {
    pub expr: Expr,
    pub ty: TypeRef,
}

///
/// ExprArena
///

#[derive(Clone, Debug, Default)]
pub struct ExprArena {
    nodes: Vec<ExprNode>,
}

impl ExprArena {
    #[must_use]
    pub const fn new() -> Self {
        Self { nodes: Vec::new() }
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Append a node. The only way nodes enter the arena.
    pub fn push(&mut self, expr: Expr, ty: TypeRef) -> ExprId {
        let id = u32::try_from(self.nodes.len()).expect("expression arena exceeded u32 ids");
        self.nodes.push(ExprNode { expr, ty });

        ExprId(id)
    }

    /// Ids are only minted by `push`, so indexing cannot go out of bounds
    /// for ids produced by this arena or a clone of it.
    #[must_use]
    pub fn node(&self, id: ExprId) -> &ExprNode {
        &self.nodes[id.index()]
    }

    #[must_use]
    pub fn get(&self, id: ExprId) -> &Expr {
        &self.node(id).expr
    }

    #[must_use]
    pub fn ty(&self, id: ExprId) -> &TypeRef {
        &self.node(id).ty
    }

    /// Constant payload, if `id` is a literal.
    #[must_use]
    pub fn as_constant(&self, id: ExprId) -> Option<&Value> {
        match self.get(id) {
            Expr::Constant(value) => Some(value),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_constant(&self, id: ExprId) -> bool {
        self.as_constant(id).is_some()
    }

    #[must_use]
    pub fn is_null_constant(&self, id: ExprId) -> bool {
        matches!(self.as_constant(id), Some(Value::Null))
    }

    /// Peel `Quote` wrappers, returning the lambda inside if there is one.
    #[must_use]
    pub fn as_lambda(&self, id: ExprId) -> Option<(&[ExprId], ExprId)> {
        match self.get(id) {
            Expr::Lambda { params, body } => Some((params, *body)),
            Expr::Unary {
                op: UnaryOp::Quote,
                operand,
            } => self.as_lambda(*operand),
            _ => None,
        }
    }

    /// Parameter name, if `id` is a parameter node.
    #[must_use]
    pub fn parameter_name(&self, id: ExprId) -> Option<&str> {
        match self.get(id) {
            Expr::Parameter { name } => Some(name),
            _ => None,
        }
    }
}
