//! Query-expression compiler: host query trees in, OData-style query text
//! out.
//!
//! ## Layout
//! - `expr`: the host query AST arena the caller builds.
//! - `compile`: predicate, selector and order-by compilers plus constant
//!   folding.
//! - `node`: the compiled, self-rendering output tree.
//! - `partition`: client/server split of projections.
//! - `chain`: operator-chain parsing into a [`chain::QueryPlan`].
//! - `literal`, `value`, `types`, `meta`, `library`: supporting models and
//!   collaborators.
#![warn(unreachable_pub)]

pub mod chain;
pub mod compile;
pub mod config;
pub mod error;
pub mod eval;
pub mod expr;
pub mod library;
pub mod literal;
pub mod meta;
pub mod node;
pub mod partition;
pub mod types;
pub mod value;

#[cfg(test)]
pub(crate) mod test_fixtures;

///
/// Prelude
///
/// Domain vocabulary only; errors and collaborator implementations stay in
/// their modules.
///

pub mod prelude {
    pub use crate::{
        chain::{ChainParser, ProjectionMode, QueryOperator, QueryPlan},
        compile::{CompileContext, PredicateCompiler},
        expr::{BinaryOp, ExprArena, ExprId, MemberInfo, MethodInfo},
        node::{ExtendedNode, SortDirection},
        types::{Primitive, TypeRef},
        value::Value,
    };
}
