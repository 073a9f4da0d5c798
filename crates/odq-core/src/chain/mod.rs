//! Query-chain parser.
//!
//! Walks the outer operator chain from its source outwards, validates the
//! operator order, and accumulates one [`QueryPlan`]. Predicate, ordering
//! and projection arguments are handed to the compilers.

mod operator;
mod plan;

#[cfg(test)]
mod tests;

use crate::{
    compile::{CompileContext, OrderByCompiler, PredicateCompiler, SelectorCompiler, fold},
    config::{CompilerConfig, MemberNaming},
    error::InternalError,
    expr::{Expr, ExprArena, ExprId, SpecialMethod, replace_parameter},
    library::QUERYABLE,
    node::{ExtendedNode, SortDirection},
    partition::Partitioner,
    types::TypeRef,
    value::Value,
};
use thiserror::Error as ThisError;
use tracing::{debug, instrument};

// re-exports
pub use operator::QueryOperator;
pub use plan::{ProjectionMode, QueryParameters, QueryPlan};

///
/// ChainError
///
/// Operator-order violations.
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum ChainError {
    #[error("'{op}' cannot follow '{after}'")]
    Misplaced {
        op: QueryOperator,
        after: QueryOperator,
    },

    #[error("'{op}' may only be applied once")]
    Repeated { op: QueryOperator },

    #[error("'{op}' requires a preceding OrderBy")]
    ThenWithoutOrder { op: QueryOperator },

    #[error("'{op}' cannot be applied after terminal '{terminal}'")]
    AfterTerminal {
        op: QueryOperator,
        terminal: QueryOperator,
    },

    #[error("'{op}' expects a non-negative integer constant")]
    InvalidCount { op: QueryOperator },

    #[error("invalid argument to '{op}': {reason}")]
    InvalidArgument { op: QueryOperator, reason: String },
}

///
/// QueryError
///

#[derive(Clone, Debug, ThisError)]
pub enum QueryError {
    #[error(transparent)]
    Chain(#[from] ChainError),

    #[error("expression not supported: {construct}")]
    NotSupported { construct: String },

    #[error("unknown query operator '{name}' taking {arity} arguments")]
    UnknownOperator { name: String, arity: usize },

    #[error(transparent)]
    Internal(#[from] InternalError),
}

impl QueryError {
    fn not_supported(node: &ExtendedNode) -> Self {
        let construct = node
            .first_unsupported()
            .and_then(ExtendedNode::cause)
            .unwrap_or("expression")
            .to_string();

        Self::NotSupported { construct }
    }
}

type Handler = fn(&mut ChainState, &mut ExprArena, QueryOperator, &[ExprId]) -> Result<(), QueryError>;

/// Recognised operators: (operator, argument count excluding the source,
/// handler).
static OPERATORS: &[(QueryOperator, usize, Handler)] = &[
    (QueryOperator::Where, 1, ChainState::apply_where),
    (QueryOperator::OrderBy, 1, ChainState::apply_order_by),
    (QueryOperator::OrderByDescending, 1, ChainState::apply_order_by),
    (QueryOperator::ThenBy, 1, ChainState::apply_then_by),
    (QueryOperator::ThenByDescending, 1, ChainState::apply_then_by),
    (QueryOperator::Select, 1, ChainState::apply_select),
    (QueryOperator::GroupBy, 1, ChainState::apply_group_by),
    (QueryOperator::Skip, 1, ChainState::apply_skip),
    (QueryOperator::Take, 1, ChainState::apply_take),
    (QueryOperator::First, 0, ChainState::apply_first),
    (QueryOperator::First, 1, ChainState::apply_first),
    (QueryOperator::FirstOrDefault, 0, ChainState::apply_first),
    (QueryOperator::FirstOrDefault, 1, ChainState::apply_first),
    (QueryOperator::FirstLazy, 0, ChainState::apply_first),
    (QueryOperator::Any, 0, ChainState::apply_first),
    (QueryOperator::Any, 1, ChainState::apply_first),
    (QueryOperator::Expand, 1, ChainState::apply_expand),
    (QueryOperator::OfType, 1, ChainState::apply_of_type),
    (QueryOperator::WithTotalCount, 0, ChainState::apply_total_count),
    (QueryOperator::ToUri, 0, ChainState::apply_to_uri),
];

fn handler(op: QueryOperator, arity: usize) -> Option<Handler> {
    OPERATORS
        .iter()
        .find(|(candidate, candidate_arity, _)| *candidate == op && *candidate_arity == arity)
        .map(|(_, _, handler)| *handler)
}

///
/// ChainParser
///

#[derive(Clone, Default)]
pub struct ChainParser {
    ctx: CompileContext,
    config: CompilerConfig,
}

impl ChainParser {
    #[must_use]
    pub fn new(ctx: CompileContext, config: CompilerConfig) -> Self {
        let ctx = ctx.with_naming(config.naming.members);

        Self { ctx, config }
    }

    #[must_use]
    pub const fn context(&self) -> &CompileContext {
        &self.ctx
    }

    #[must_use]
    pub const fn config(&self) -> &CompilerConfig {
        &self.config
    }

    /// Parse the chain ending at `root` into a query plan.
    #[instrument(level = "trace", skip_all, fields(root = %root))]
    pub fn parse(&self, arena: &mut ExprArena, root: ExprId) -> Result<QueryPlan, QueryError> {
        let (source, element_type, calls) = unwind(arena, root)?;

        let mut state = ChainState::new(self, element_type);
        for (op, args) in calls {
            state.apply(arena, op, &args)?;
        }

        state.finish(arena, &self.ctx, source)
    }
}

/// Split the chain into its source and its operator calls, innermost first.
fn unwind(
    arena: &ExprArena,
    root: ExprId,
) -> Result<(String, TypeRef, Vec<(QueryOperator, Vec<ExprId>)>), QueryError> {
    let mut calls = Vec::new();
    let mut current = root;

    loop {
        match arena.get(current) {
            Expr::Source { name } => {
                let element_type = arena
                    .ty(current)
                    .element_type()
                    .cloned()
                    .unwrap_or(TypeRef::OBJECT);
                calls.reverse();

                return Ok((name.clone(), element_type, calls));
            }
            Expr::Call {
                receiver: None,
                method,
                args,
            } if !args.is_empty() => match method.special {
                Some(SpecialMethod::Query(op)) => {
                    calls.push((op, args[1..].to_vec()));
                    current = args[0];
                }
                _ if method.declaring == QUERYABLE => {
                    return Err(QueryError::UnknownOperator {
                        name: method.name.clone(),
                        arity: args.len(),
                    });
                }
                _ => {
                    return Err(QueryError::NotSupported {
                        construct: format!("call to '{}' in a query chain", method.name),
                    });
                }
            },
            other => {
                return Err(QueryError::NotSupported {
                    construct: format!("{} in a query chain", other.kind()),
                });
            }
        }
    }
}

///
/// ChainState
///
/// Operator effects accumulated so far, before any argument is compiled.
///

struct ChainState {
    naming: MemberNaming,
    default_top: Option<u32>,
    element_type: TypeRef,
    applied: Vec<QueryOperator>,
    terminal: Option<QueryOperator>,
    filter: Option<(ExprId, ExprId)>,
    order: Vec<(ExprId, SortDirection)>,
    group_by: Option<ExprId>,
    select: Option<ExprId>,
    skip: Option<u32>,
    take: Option<u32>,
    expand: Vec<String>,
    of_type: Option<TypeRef>,
    total_count: bool,
    mode: ProjectionMode,
}

impl ChainState {
    fn new(parser: &ChainParser, element_type: TypeRef) -> Self {
        Self {
            naming: parser.ctx.naming,
            default_top: parser.config.paging.default_top,
            element_type,
            applied: Vec::new(),
            terminal: None,
            filter: None,
            order: Vec::new(),
            group_by: None,
            select: None,
            skip: None,
            take: None,
            expand: Vec::new(),
            of_type: None,
            total_count: false,
            mode: ProjectionMode::Stream,
        }
    }

    fn apply(&mut self, arena: &mut ExprArena, op: QueryOperator, args: &[ExprId]) -> Result<(), QueryError> {
        if let Some(terminal) = self.terminal {
            return Err(self.reject(ChainError::AfterTerminal { op, terminal }));
        }
        let handler = handler(op, args.len()).ok_or_else(|| QueryError::UnknownOperator {
            name: op.to_string(),
            arity: args.len() + 1,
        })?;

        handler(self, arena, op, args)?;

        self.applied.push(op);
        if op.is_terminal() {
            self.terminal = Some(op);
        }

        Ok(())
    }

    fn reject(&self, err: ChainError) -> QueryError {
        debug!(applied = ?self.applied, %err, "query operator rejected");

        err.into()
    }

    /// Fail when any operator in `forbidden` was already applied.
    fn ensure_not_after(&self, op: QueryOperator, forbidden: &[QueryOperator]) -> Result<(), QueryError> {
        match self.applied.iter().find(|applied| forbidden.contains(applied)) {
            Some(after) => Err(self.reject(ChainError::Misplaced { op, after: *after })),
            None => Ok(()),
        }
    }

    fn ensure_once(&self, op: QueryOperator) -> Result<(), QueryError> {
        if self.applied.contains(&op) {
            return Err(self.reject(ChainError::Repeated { op }));
        }

        Ok(())
    }

    fn apply_where(&mut self, arena: &mut ExprArena, op: QueryOperator, args: &[ExprId]) -> Result<(), QueryError> {
        self.ensure_not_after(
            op,
            &[
                QueryOperator::Select,
                QueryOperator::GroupBy,
                QueryOperator::Skip,
                QueryOperator::Take,
            ],
        )?;

        self.add_filter(arena, op, args[0])
    }

    /// Conjoin a predicate into the filter. Later predicates are rewritten
    /// onto the first predicate's parameter.
    fn add_filter(&mut self, arena: &mut ExprArena, op: QueryOperator, predicate: ExprId) -> Result<(), QueryError> {
        let (param, body) = single_param_lambda(arena, op, predicate)?;

        self.filter = Some(match self.filter {
            None => (param, body),
            Some((canonical, existing)) => {
                let body = replace_parameter(arena, body, param, canonical);
                (canonical, arena.and(existing, body))
            }
        });

        Ok(())
    }

    fn apply_order_by(&mut self, arena: &mut ExprArena, op: QueryOperator, args: &[ExprId]) -> Result<(), QueryError> {
        self.ensure_ordering_position(op)?;
        if !self.order.is_empty() {
            return Err(self.reject(ChainError::Repeated { op }));
        }

        self.push_order(arena, op, args[0])
    }

    fn apply_then_by(&mut self, arena: &mut ExprArena, op: QueryOperator, args: &[ExprId]) -> Result<(), QueryError> {
        self.ensure_ordering_position(op)?;
        if self.order.is_empty() {
            return Err(self.reject(ChainError::ThenWithoutOrder { op }));
        }

        self.push_order(arena, op, args[0])
    }

    fn ensure_ordering_position(&self, op: QueryOperator) -> Result<(), QueryError> {
        self.ensure_not_after(
            op,
            &[
                QueryOperator::Skip,
                QueryOperator::Take,
                QueryOperator::Select,
                QueryOperator::GroupBy,
            ],
        )
    }

    fn push_order(&mut self, arena: &ExprArena, op: QueryOperator, selector: ExprId) -> Result<(), QueryError> {
        single_param_lambda(arena, op, selector)?;

        let direction = match op {
            QueryOperator::OrderByDescending | QueryOperator::ThenByDescending => SortDirection::Descending,
            _ => SortDirection::Ascending,
        };
        self.order.push((selector, direction));

        Ok(())
    }

    fn apply_select(&mut self, arena: &mut ExprArena, op: QueryOperator, args: &[ExprId]) -> Result<(), QueryError> {
        self.ensure_once(op)?;
        single_param_lambda(arena, op, args[0])?;

        self.select = Some(args[0]);

        Ok(())
    }

    fn apply_group_by(&mut self, arena: &mut ExprArena, op: QueryOperator, args: &[ExprId]) -> Result<(), QueryError> {
        self.ensure_once(op)?;
        self.ensure_not_after(op, &[QueryOperator::Skip, QueryOperator::Take])?;
        single_param_lambda(arena, op, args[0])?;

        self.group_by = Some(args[0]);

        Ok(())
    }

    fn apply_skip(&mut self, arena: &mut ExprArena, op: QueryOperator, args: &[ExprId]) -> Result<(), QueryError> {
        self.ensure_not_after(op, &[QueryOperator::Take])?;
        let count = count_argument(arena, op, args[0])?;

        self.skip = Some(self.skip.map_or(count, |skip| skip.saturating_add(count)));

        Ok(())
    }

    fn apply_take(&mut self, arena: &mut ExprArena, op: QueryOperator, args: &[ExprId]) -> Result<(), QueryError> {
        let count = count_argument(arena, op, args[0])?;
        self.limit(count);

        Ok(())
    }

    fn limit(&mut self, count: u32) {
        self.take = Some(self.take.map_or(count, |take| take.min(count)));
    }

    /// First, FirstOrDefault, FirstLazy and Any: optional predicate, an
    /// effective Take(1), and the terminal projection mode.
    fn apply_first(&mut self, arena: &mut ExprArena, op: QueryOperator, args: &[ExprId]) -> Result<(), QueryError> {
        if let Some(predicate) = args.first() {
            self.ensure_not_after(
                op,
                &[
                    QueryOperator::Select,
                    QueryOperator::GroupBy,
                    QueryOperator::Skip,
                    QueryOperator::Take,
                ],
            )?;
            self.add_filter(arena, op, *predicate)?;
        }

        self.limit(1);
        self.mode = match op {
            QueryOperator::First => ProjectionMode::First,
            QueryOperator::FirstOrDefault => ProjectionMode::FirstOrDefault,
            QueryOperator::FirstLazy => ProjectionMode::FirstLazy,
            _ => ProjectionMode::Any,
        };

        Ok(())
    }

    fn apply_expand(&mut self, arena: &mut ExprArena, op: QueryOperator, args: &[ExprId]) -> Result<(), QueryError> {
        let path = self.expand_path(arena, op, args[0])?;
        self.expand.push(path);

        Ok(())
    }

    /// Expand path from a string constant or a member-chain lambda
    /// (`x => x.Order.Lines` gives `order/lines`).
    fn expand_path(&self, arena: &ExprArena, op: QueryOperator, arg: ExprId) -> Result<String, QueryError> {
        let invalid = |reason: &str| {
            self.reject(ChainError::InvalidArgument {
                op,
                reason: reason.to_string(),
            })
        };

        if let Some(value) = arena.as_constant(arg) {
            return match value {
                Value::Text(path) if !path.is_empty() => Ok(path.clone()),
                _ => Err(invalid("path must be a non-empty string")),
            };
        }

        let (param, body) = single_param_lambda(arena, op, arg)?;
        let mut segments = Vec::new();
        let mut current = body;
        while let Expr::Member {
            receiver: Some(receiver),
            member,
        } = arena.get(current)
        {
            segments.push(self.naming.apply(&member.name));
            current = *receiver;
        }
        if current != param || segments.is_empty() {
            return Err(invalid("path must be a member chain on the lambda parameter"));
        }
        segments.reverse();

        Ok(segments.join("/"))
    }

    fn apply_of_type(&mut self, arena: &mut ExprArena, op: QueryOperator, args: &[ExprId]) -> Result<(), QueryError> {
        self.ensure_not_after(op, &[QueryOperator::Select, QueryOperator::GroupBy])?;

        match arena.as_constant(args[0]) {
            Some(Value::Type(ty)) => {
                self.element_type = ty.clone();
                self.of_type = Some(ty.clone());
                Ok(())
            }
            _ => Err(self.reject(ChainError::InvalidArgument {
                op,
                reason: "expected a type constant".to_string(),
            })),
        }
    }

    fn apply_total_count(&mut self, _arena: &mut ExprArena, _op: QueryOperator, _args: &[ExprId]) -> Result<(), QueryError> {
        self.total_count = true;

        Ok(())
    }

    fn apply_to_uri(&mut self, _arena: &mut ExprArena, _op: QueryOperator, _args: &[ExprId]) -> Result<(), QueryError> {
        self.mode = ProjectionMode::Uri;

        Ok(())
    }

    /// Compile every accumulated argument and assemble the plan.
    fn finish(self, arena: &mut ExprArena, ctx: &CompileContext, source: String) -> Result<QueryPlan, QueryError> {
        let mut plan = QueryPlan::new(source, self.element_type.clone());

        if let Some(ty) = &self.of_type {
            plan.of_type = Some(type_name(ctx, ty)?);
        }

        if let Some((param, body)) = self.filter {
            let predicate = arena.lambda1(param, body);
            let predicate = fold(arena, predicate);
            let node = PredicateCompiler::new(arena, ctx).compile(predicate);
            plan.filter = Some(ensure_supported(node)?);
        }

        if !self.order.is_empty() {
            let keys: Vec<_> = self
                .order
                .iter()
                .map(|(selector, direction)| (fold(arena, *selector), *direction))
                .collect();
            let node = OrderByCompiler::new(arena, ctx).compile(&keys);
            plan.order = Some(ensure_supported(node)?);
        }

        if let Some(selector) = self.group_by {
            let selector = fold(arena, selector);
            plan.group_by = Some(ensure_supported(group_key(arena, ctx, selector))?);
        }

        if let Some(selector) = self.select {
            let selector = fold(arena, selector);
            let node = SelectorCompiler::new(arena, ctx).compile(selector);
            plan.select = Some(if node.is_supported_on_server() {
                node
            } else {
                debug!("projection partially local; partitioning");
                Partitioner::partition(arena, ctx, selector)?
            });
        }

        plan.skip = self.skip;
        plan.take = self.take;
        if plan.take.is_none() && self.mode == ProjectionMode::Stream {
            plan.take = self.default_top;
        }
        plan.expand = self.expand;
        plan.total_count = self.total_count;
        plan.mode = self.mode;

        Ok(plan)
    }
}

/// Composite keys (`g => new { g.A, g.B }`) compile as a select list,
/// single keys as an ordinary expression.
fn group_key(arena: &ExprArena, ctx: &CompileContext, selector: ExprId) -> ExtendedNode {
    let composite = arena.as_lambda(selector).is_some_and(|(_, body)| {
        matches!(
            arena.get(body),
            Expr::New {
                constructor: None,
                ..
            }
        )
    });

    if composite {
        SelectorCompiler::new(arena, ctx).compile(selector)
    } else {
        PredicateCompiler::new(arena, ctx).compile(selector)
    }
}

fn ensure_supported(node: ExtendedNode) -> Result<ExtendedNode, QueryError> {
    if node.is_supported_on_server() {
        Ok(node)
    } else {
        Err(QueryError::not_supported(&node))
    }
}

fn single_param_lambda(arena: &ExprArena, op: QueryOperator, id: ExprId) -> Result<(ExprId, ExprId), QueryError> {
    match arena.as_lambda(id) {
        Some(([param], body)) => Ok((*param, body)),
        _ => Err(ChainError::InvalidArgument {
            op,
            reason: "expected a one-parameter lambda".to_string(),
        }
        .into()),
    }
}

fn count_argument(arena: &ExprArena, op: QueryOperator, id: ExprId) -> Result<u32, QueryError> {
    arena
        .as_constant(id)
        .and_then(Value::as_i64)
        .and_then(|count| u32::try_from(count).ok())
        .ok_or_else(|| ChainError::InvalidCount { op }.into())
}

/// Bare wire name of a type, for `$oftype`.
fn type_name(ctx: &CompileContext, ty: &TypeRef) -> Result<String, QueryError> {
    let name = match ty {
        TypeRef::Primitive(p) if ctx.resolver.is_native(ty) => Some(p.native_name().to_string()),
        other => ctx.resolver.wire_name(other),
    };

    name.ok_or_else(|| QueryError::NotSupported {
        construct: format!("type {ty} has no wire name"),
    })
}
