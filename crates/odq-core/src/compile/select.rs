use crate::{
    compile::{CompileContext, PredicateCompiler, THIS, strip},
    expr::{Expr, ExprArena, ExprId},
    node::ExtendedNode,
};
use tracing::instrument;

///
/// SelectorCompiler
///
/// Projection entry point. Plain-data construction in the lambda body
/// becomes a `Select` node; collection literals compile directly; any other
/// body is projected as `body as this`.
///

pub struct SelectorCompiler<'a> {
    arena: &'a ExprArena,
    ctx: &'a CompileContext,
}

impl<'a> SelectorCompiler<'a> {
    #[must_use]
    pub const fn new(arena: &'a ExprArena, ctx: &'a CompileContext) -> Self {
        Self { arena, ctx }
    }

    #[instrument(level = "trace", skip_all, fields(root = %selector))]
    pub fn compile(&self, selector: ExprId) -> ExtendedNode {
        let (mut compiler, body) = match self.arena.as_lambda(selector) {
            Some((params, body)) => match params.first() {
                Some(this) => (PredicateCompiler::with_this(self.arena, self.ctx, *this), body),
                None => (PredicateCompiler::new(self.arena, self.ctx), body),
            },
            None => (PredicateCompiler::new(self.arena, self.ctx), selector),
        };
        let ty = self.arena.ty(body).clone();

        match self.arena.get(body) {
            Expr::New {
                constructor: None,
                members,
                args,
            } => {
                let names = members.clone().unwrap_or_else(|| {
                    (1..=args.len()).map(|i| format!("Item{i}")).collect()
                });
                let fields = names
                    .into_iter()
                    .zip(args)
                    .map(|(name, arg)| (name, strip(compiler.visit(*arg))))
                    .collect();

                ExtendedNode::select(fields, ty)
            }
            Expr::NewArray { .. } | Expr::ListInit { .. } => compiler.visit(body),
            _ => {
                let value = strip(compiler.visit(body));
                ExtendedNode::formatted(format!("{{0}} as {THIS}"), vec![value.into()], ty)
            }
        }
    }
}
