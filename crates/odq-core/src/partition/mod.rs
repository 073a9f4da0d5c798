//! Client/server partition of projections.
//!
//! Every sub-expression the remote side can evaluate becomes a slot in a
//! server-bound object array; what remains runs locally against that array.


use crate::{
    compile::{CompileContext, PredicateCompiler, strip},
    error::{ErrorClass, ErrorOrigin, InternalError},
    eval::{self, EvalError},
    expr::{Expr, ExprArena, ExprId, children, references, replace_parameter, with_children},
    node::{ExtendedNode, Segment, strip_scope},
    types::TypeRef,
    value::Value,
};
use std::{collections::HashMap, fmt, sync::Arc};
use tracing::{debug, instrument, trace};

/// Name of the row parameter the local function reads slots from.
pub const ROW: &str = "row";

///
/// LocalProjection
///
/// Client half of a split: the original projection body with every slot
/// replaced by `(T)row[i]`. Owns its own copy of the arena.
///

#[derive(Clone)]
pub struct LocalProjection {
    arena: Arc<ExprArena>,
    body: ExprId,
    row: ExprId,
    result_type: TypeRef,
    slot_count: usize,
}

impl LocalProjection {
    #[must_use]
    pub fn arena(&self) -> &ExprArena {
        &self.arena
    }

    #[must_use]
    pub const fn body(&self) -> ExprId {
        self.body
    }

    #[must_use]
    pub const fn row(&self) -> ExprId {
        self.row
    }

    #[must_use]
    pub const fn result_type(&self) -> &TypeRef {
        &self.result_type
    }

    #[must_use]
    pub const fn slot_count(&self) -> usize {
        self.slot_count
    }

    /// Rebuild the caller's projected value from one server row.
    pub fn evaluate(&self, row: &[Value]) -> Result<Value, EvalError> {
        eval::evaluate(&self.arena, self.body, &[(self.row, Value::List(row.to_vec()))])
    }
}

impl fmt::Debug for LocalProjection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalProjection")
            .field("body", &self.body)
            .field("row", &self.row)
            .field("result_type", &self.result_type)
            .field("slot_count", &self.slot_count)
            .finish_non_exhaustive()
    }
}

///
/// Partitioner
///
/// One instance per projection. The compiler memo and the slot table are
/// scoped to that instance.
///

pub struct Partitioner<'a> {
    arena: &'a ExprArena,
    compiler: PredicateCompiler<'a>,
    this: ExprId,
    local: ExprArena,
    row: ExprId,
    slots: Vec<ExtendedNode>,
    slot_index: HashMap<String, usize>,
}

impl<'a> Partitioner<'a> {
    /// Split `selector` (a one-parameter lambda) into server slots and a
    /// local projection.
    #[instrument(level = "trace", skip_all, fields(selector = %selector))]
    pub fn partition(
        arena: &'a ExprArena,
        ctx: &'a CompileContext,
        selector: ExprId,
    ) -> Result<ExtendedNode, InternalError> {
        let Some((params, body)) = arena.as_lambda(selector) else {
            return Err(InternalError::new(
                ErrorClass::Unsupported,
                ErrorOrigin::Partition,
                format!("projection {selector} is not a lambda"),
            ));
        };
        let [this] = params else {
            return Err(InternalError::new(
                ErrorClass::Unsupported,
                ErrorOrigin::Partition,
                format!("projection lambda takes {} parameters", params.len()),
            ));
        };

        let mut local = arena.clone();
        let row = local.parameter(ROW, TypeRef::array(TypeRef::OBJECT));

        let mut partitioner = Self {
            arena,
            compiler: PredicateCompiler::with_this(arena, ctx, *this),
            this: *this,
            local,
            row,
            slots: Vec::new(),
            slot_index: HashMap::new(),
        };

        let local_body = partitioner.visit(body)?;
        debug!(slots = partitioner.slots.len(), "projection partitioned");

        Ok(partitioner.finish(local_body, arena.ty(body).clone()))
    }

    fn visit(&mut self, id: ExprId) -> Result<ExprId, InternalError> {
        if matches!(self.arena.get(id), Expr::Compiled(_)) {
            return Err(InternalError::partition_invariant(format!(
                "compiled node {id} found where a host sub-tree was expected"
            )));
        }

        // nested sub-scopes pass through, reading the root parameter from
        // its own slot
        if self.arena.as_lambda(id).is_some() {
            if !references(self.arena, id, self.this) {
                return Ok(id);
            }
            let this = self.compiler.visit(self.this);
            let placeholder = self.slot(self.this, &this)?;

            return Ok(replace_parameter(&mut self.local, id, self.this, placeholder));
        }

        let node = self.compiler.visit(id);
        if node.is_supported_on_server() && !node.is_local_execution_preferred() {
            return self.slot(id, &node);
        }

        let replaced = children(self.arena, id)
            .into_iter()
            .map(|child| self.visit(child))
            .collect::<Result<Vec<_>, _>>()?;
        let rebuilt = with_children(&mut self.local, id, &replaced);

        if matches!(self.local.get(rebuilt), Expr::Compiled(_)) {
            return Err(InternalError::partition_invariant(format!(
                "local rewrite of {id} produced a compiled node"
            )));
        }

        Ok(rebuilt)
    }

    /// Register (or reuse) the slot for `node`, returning the local
    /// placeholder `(T)row[i]`.
    fn slot(&mut self, id: ExprId, node: &ExtendedNode) -> Result<ExprId, InternalError> {
        let text = strip_scope(node).to_string();

        let index = match self.slot_index.get(&text) {
            Some(index) => {
                trace!(expr = %id, index, slot = %text, "slot reused");
                *index
            }
            None => {
                let index = self.slots.len();
                trace!(expr = %id, index, slot = %text, "slot allocated");
                self.slots.push(node.clone());
                self.slot_index.insert(text, index);
                index
            }
        };

        let ty = self.arena.ty(id).clone();
        let position = i32::try_from(index).map_err(|_| {
            InternalError::partition_invariant(format!("slot index {index} exceeds the row width"))
        })?;
        let position = self.local.constant(position, TypeRef::INT32);
        let element = self.local.array_index(self.row, position);

        Ok(self.local.convert(element, ty))
    }

    fn finish(self, body: ExprId, result_type: TypeRef) -> ExtendedNode {
        let mut segments = vec![Segment::text("[")];
        for (i, slot) in self.slots.iter().enumerate() {
            if i > 0 {
                segments.push(Segment::text(","));
            }
            segments.push(strip(slot.clone()).into());
        }
        segments.push(Segment::text("]"));

        let server = ExtendedNode::list(segments, TypeRef::array(TypeRef::OBJECT));
        let local = LocalProjection {
            arena: Arc::new(self.local),
            body,
            row: self.row,
            result_type,
            slot_count: self.slots.len(),
        };

        ExtendedNode::split(server, local)
    }
}
