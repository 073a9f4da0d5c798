//! Predicate/projection compiler.
//!
//! Visits a host query sub-tree and produces exactly one [`ExtendedNode`].
//! Untranslatable constructs become `NotSupported` nodes; the compiler itself
//! never fails.

mod binary;
mod call;
mod fold;
mod order;
mod select;


use crate::{
    config::MemberNaming,
    expr::{Expr, ExprArena, ExprId, MemberRef, UnaryOp},
    literal,
    meta::{DefaultFunctionMap, FunctionMap, StaticTypeResolver, TypeResolver},
    node::{ExtendedNode, Segment},
    types::{Primitive, TypeRef},
    value::Value,
};
use std::{collections::HashMap, sync::Arc};
use tracing::{debug, instrument};

// re-exports
pub use fold::fold;
pub use order::OrderByCompiler;
pub use select::SelectorCompiler;

pub const THIS: &str = "this";

///
/// CompileContext
///
/// Collaborators and naming policy shared by every compiler instance of one
/// query. Holds no mutable state.
///

#[derive(Clone)]
pub struct CompileContext {
    pub resolver: Arc<dyn TypeResolver>,
    pub functions: Arc<dyn FunctionMap>,
    pub naming: MemberNaming,
}

impl CompileContext {
    #[must_use]
    pub fn new(resolver: Arc<dyn TypeResolver>, functions: Arc<dyn FunctionMap>) -> Self {
        Self {
            resolver,
            functions,
            naming: MemberNaming::default(),
        }
    }

    /// Empty type registry plus the standard function library.
    #[must_use]
    pub fn standard() -> Self {
        Self::new(
            Arc::new(StaticTypeResolver::new()),
            Arc::new(DefaultFunctionMap::standard()),
        )
    }

    #[must_use]
    pub const fn with_naming(mut self, naming: MemberNaming) -> Self {
        self.naming = naming;
        self
    }

    /// Wire name of a member.
    #[must_use]
    pub fn member_name(&self, member: &MemberRef) -> String {
        self.naming.apply(&member.name)
    }
}

impl Default for CompileContext {
    fn default() -> Self {
        Self::standard()
    }
}

///
/// PredicateCompiler
///
/// One instance per compile; its memo table maps host ids to the node they
/// compiled to, so repeated visits of a shared sub-tree return the same node.
///

pub struct PredicateCompiler<'a> {
    arena: &'a ExprArena,
    ctx: &'a CompileContext,
    this_param: Option<ExprId>,
    memo: HashMap<ExprId, ExtendedNode>,
}

impl<'a> PredicateCompiler<'a> {
    #[must_use]
    pub fn new(arena: &'a ExprArena, ctx: &'a CompileContext) -> Self {
        Self {
            arena,
            ctx,
            this_param: None,
            memo: HashMap::new(),
        }
    }

    /// Compiler whose root parameter is already fixed.
    #[must_use]
    pub fn with_this(arena: &'a ExprArena, ctx: &'a CompileContext, this: ExprId) -> Self {
        Self {
            this_param: Some(this),
            ..Self::new(arena, ctx)
        }
    }

    /// Fresh instance for a nested sub-scope: empty memo, same root.
    fn nested(&self) -> Self {
        Self {
            arena: self.arena,
            ctx: self.ctx,
            this_param: self.this_param,
            memo: HashMap::new(),
        }
    }

    #[must_use]
    pub const fn this_param(&self) -> Option<ExprId> {
        self.this_param
    }

    pub(crate) const fn arena(&self) -> &'a ExprArena {
        self.arena
    }

    pub(crate) const fn context(&self) -> &'a CompileContext {
        self.ctx
    }

    /// Root entry. The first lambda entered fixes which parameter is `this`
    /// and compiles to its bare body.
    #[instrument(level = "trace", skip_all, fields(root = %id))]
    pub fn compile(&mut self, id: ExprId) -> ExtendedNode {
        if self.this_param.is_none()
            && let Some((params, body)) = self.arena.as_lambda(id)
        {
            self.this_param = params.first().copied();
            return self.visit(body);
        }

        self.visit(id)
    }

    /// Compile one sub-tree, consulting the memo table first.
    pub fn visit(&mut self, id: ExprId) -> ExtendedNode {
        if let Some(node) = self.memo.get(&id) {
            return node.clone();
        }

        let node = self.visit_uncached(id);
        self.memo.insert(id, node.clone());

        node
    }

    fn visit_uncached(&mut self, id: ExprId) -> ExtendedNode {
        let arena = self.arena;
        let ty = arena.ty(id).clone();

        match arena.get(id) {
            Expr::Compiled(node) => node.clone(),
            Expr::Parameter { name } => {
                if Some(id) == self.this_param {
                    ExtendedNode::terminal(THIS, ty)
                } else {
                    ExtendedNode::terminal(name.clone(), ty)
                }
            }
            Expr::Constant(value) => self.constant_node(id, value, &ty),
            Expr::Member { receiver, member } => self.member_access(id, *receiver, member),
            Expr::Binary { op, left, right } => self.visit_binary(id, *op, *left, *right),
            Expr::Unary { op, operand } => self.visit_unary(id, op, *operand),
            Expr::ArrayIndex { array, index } => {
                let args = vec![self.visit(*array).into(), self.visit(*index).into()];
                ExtendedNode::formatted("{0}[{1}]", args, ty)
            }
            Expr::Call {
                receiver,
                method,
                args,
            } => self.visit_call(id, *receiver, method, args),
            Expr::Conditional {
                test,
                if_true,
                if_false,
            } => {
                let args = vec![
                    strip(self.visit(*test)).into(),
                    strip(self.visit(*if_true)).into(),
                    strip(self.visit(*if_false)).into(),
                ];
                ExtendedNode::formatted("iif({0},{1},{2})", args, ty)
            }
            Expr::TypeIs { operand, ty: tested } => self.visit_type_is(id, *operand, tested),
            Expr::Lambda { params, body } => self.visit_nested_lambda(id, params, *body),
            Expr::NewArray { items } | Expr::ListInit { items } => self.array_literal(items, ty),
            Expr::New { .. } => self.unsupported(id, "object construction is not supported here"),
            Expr::Source { name } => {
                self.unsupported(id, format!("query source '{name}' cannot appear in a predicate"))
            }
        }
    }

    /// Record and log an untranslatable construct.
    pub(crate) fn unsupported(&self, id: ExprId, cause: impl Into<String>) -> ExtendedNode {
        let cause = cause.into();
        debug!(expr = %id, kind = self.arena.get(id).kind(), %cause, "expression not supported");

        ExtendedNode::not_supported(id, self.arena.ty(id).clone(), Some(cause))
    }

    pub(crate) fn constant_node(&self, id: ExprId, value: &Value, ty: &TypeRef) -> ExtendedNode {
        match literal::encode(value, ty, self.ctx.resolver.as_ref()) {
            Some(token) => ExtendedNode::literal(token, ty.clone()),
            None => self.unsupported(id, format!("constant of type {ty} has no literal form")),
        }
    }

    fn type_token(&self, id: ExprId, ty: &TypeRef) -> Result<ExtendedNode, ExtendedNode> {
        literal::type_literal(ty, self.ctx.resolver.as_ref())
            .map(|token| ExtendedNode::literal(token, TypeRef::TYPE))
            .ok_or_else(|| self.unsupported(id, format!("type {ty} has no wire name")))
    }

    fn is_this(&self, id: ExprId) -> bool {
        Some(id) == self.this_param
    }

    /// Member access: mapped function, bare name on `this`, or
    /// `receiver.name`.
    pub(crate) fn member_access(
        &mut self,
        id: ExprId,
        receiver: Option<ExprId>,
        member: &MemberRef,
    ) -> ExtendedNode {
        let ctx = self.ctx;
        let ty = member.ty.clone();

        if let Some(mapping) = ctx.functions.lookup(&member.key()) {
            let args: Vec<Segment> = receiver.map(|r| Segment::from(self.visit(r))).into_iter().collect();
            return ExtendedNode::formatted(mapping.format(args.len()), args, ty);
        }
        if member.local_only {
            return self.unsupported(
                id,
                format!("member '{}' of '{}' is only available locally", member.name, member.declaring),
            );
        }

        let name = ctx.member_name(member);
        match receiver {
            None => self.unsupported(
                id,
                format!("static member '{}.{}' is not supported", member.declaring, member.name),
            ),
            Some(r) if self.is_this(r) => ExtendedNode::terminal(name, ty),
            Some(r) => {
                let receiver = self.visit(r);
                ExtendedNode::formatted(format!("{{0}}.{name}"), vec![receiver.into()], ty)
            }
        }
    }

    fn visit_unary(&mut self, id: ExprId, op: &UnaryOp, operand: ExprId) -> ExtendedNode {
        let arena = self.arena;
        let ty = arena.ty(id).clone();

        match op {
            UnaryOp::Not => {
                let inner = ensure_scope(self.visit(operand));
                ExtendedNode::formatted("not {0}", vec![inner.into()], ty)
            }
            UnaryOp::Negate => {
                let inner = self.visit(operand);
                ExtendedNode::formatted("-{0}", vec![inner.into()], ty)
            }
            UnaryOp::Quote => self.visit(operand),
            UnaryOp::ArrayLength => {
                let inner = self.visit(operand);
                ExtendedNode::formatted("{0}.count()", vec![inner.into()], ty)
            }
            UnaryOp::Convert(target) => {
                if is_transparent_conversion(arena.ty(operand), target) {
                    return self.visit(operand);
                }
                let token = match self.type_token(id, target) {
                    Ok(token) => token,
                    Err(unsupported) => return unsupported,
                };
                if self.is_this(operand) {
                    ExtendedNode::formatted("cast({0})", vec![token.into()], ty)
                } else {
                    let inner = strip(self.visit(operand));
                    ExtendedNode::formatted("cast({0},{1})", vec![inner.into(), token.into()], ty)
                }
            }
            UnaryOp::TypeAs(target) => {
                let token = match self.type_token(id, target) {
                    Ok(token) => token,
                    Err(unsupported) => return unsupported,
                };
                let inner = self.visit(operand);
                ExtendedNode::scope(ExtendedNode::list(
                    vec![inner.into(), Segment::text(" as "), token.into()],
                    ty,
                ))
            }
        }
    }

    fn visit_type_is(&mut self, id: ExprId, operand: ExprId, tested: &TypeRef) -> ExtendedNode {
        let token = match self.type_token(id, tested) {
            Ok(token) => token,
            Err(unsupported) => return unsupported,
        };

        if self.is_this(operand) {
            ExtendedNode::formatted("isof({0})", vec![token.into()], TypeRef::BOOL)
        } else {
            let inner = strip(self.visit(operand));
            ExtendedNode::formatted("isof({0},{1})", vec![inner.into(), token.into()], TypeRef::BOOL)
        }
    }

    /// Nested sub-scope: fresh compiler, same root; renders `param:body`.
    fn visit_nested_lambda(&mut self, id: ExprId, params: &[ExprId], body: ExprId) -> ExtendedNode {
        let [param] = params else {
            return self.unsupported(id, format!("lambda with {} parameters", params.len()));
        };
        let name = self.arena.parameter_name(*param).unwrap_or(THIS).to_string();

        let mut nested = self.nested();
        let body = strip(nested.visit(body));

        ExtendedNode::list(
            vec![Segment::text(format!("{name}:")), body.into()],
            self.arena.ty(id).clone(),
        )
    }

    /// `[e1,e2,..]`; boxing to `object` is dropped from elements.
    fn array_literal(&mut self, items: &[ExprId], ty: TypeRef) -> ExtendedNode {
        let boxed = ty
            .element_type()
            .is_some_and(|element| element.is_primitive(Primitive::Object));

        let mut segments = vec![Segment::text("[")];
        for (i, item) in items.iter().enumerate() {
            if i > 0 {
                segments.push(Segment::text(","));
            }
            let item = if boxed { self.unbox(*item) } else { *item };
            segments.push(strip(self.visit(item)).into());
        }
        segments.push(Segment::text("]"));

        ExtendedNode::list(segments, ty)
    }

    fn unbox(&self, id: ExprId) -> ExprId {
        match self.arena.get(id) {
            Expr::Unary {
                op: UnaryOp::Convert(TypeRef::Primitive(Primitive::Object)),
                operand,
            } => *operand,
            _ => id,
        }
    }
}

/// Conversions with no wire effect: boxing, nullable lifting, identity and
/// enum-to-underlying widening.
fn is_transparent_conversion(from: &TypeRef, to: &TypeRef) -> bool {
    if from == to || to.is_primitive(Primitive::Object) {
        return true;
    }
    if let TypeRef::Nullable(inner) = to
        && inner.as_ref() == from.unwrap_nullable()
    {
        return true;
    }

    match (from.unwrap_nullable(), to.unwrap_nullable()) {
        (TypeRef::Enum(e), TypeRef::Primitive(p)) => e.underlying == *p,
        _ => false,
    }
}

/// Drop one redundant outer scope where the grammar position already
/// delimits the operand (function arguments, list items).
pub(crate) fn strip(node: ExtendedNode) -> ExtendedNode {
    match node.scope_inner() {
        Some(inner) => inner.clone(),
        None => node,
    }
}

fn ensure_scope(node: ExtendedNode) -> ExtendedNode {
    if node.is_scope() {
        node
    } else {
        ExtendedNode::scope(node)
    }
}
