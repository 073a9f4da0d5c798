use crate::{
    compile::{CompileContext, PredicateCompiler, strip},
    expr::{ExprArena, ExprId},
    node::{ExtendedNode, SortDirection},
};
use tracing::instrument;

///
/// OrderByCompiler
///
/// Each key selector gets its own compiler instance; input order is kept.
///

pub struct OrderByCompiler<'a> {
    arena: &'a ExprArena,
    ctx: &'a CompileContext,
}

impl<'a> OrderByCompiler<'a> {
    #[must_use]
    pub const fn new(arena: &'a ExprArena, ctx: &'a CompileContext) -> Self {
        Self { arena, ctx }
    }

    #[instrument(level = "trace", skip_all, fields(keys = keys.len()))]
    pub fn compile(&self, keys: &[(ExprId, SortDirection)]) -> ExtendedNode {
        let keys = keys
            .iter()
            .map(|(selector, direction)| {
                let key = PredicateCompiler::new(self.arena, self.ctx).compile(*selector);
                (strip(key), *direction)
            })
            .collect();

        ExtendedNode::order(keys)
    }
}
