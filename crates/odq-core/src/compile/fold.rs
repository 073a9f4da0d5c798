//! Constant-folding pre-pass.
//!
//! Runs once over a host tree before compilation. Sub-trees whose inputs are
//! all literals are evaluated with the same host operator semantics local
//! evaluation uses, and replaced by their literal result. Nodes are never
//! mutated in place: every rewrite appends to the arena.

use crate::{
    expr::{BinaryOp, Expr, ExprArena, ExprId, HostFn, MemberRef, MethodRef, UnaryOp, children, with_children},
    library::string,
    types::Primitive,
    value::{self, Value},
};
use std::collections::HashMap;
use tracing::trace;

/// Fold `root`, returning the id of the folded tree (or `root` itself when
/// nothing folded).
pub fn fold(arena: &mut ExprArena, root: ExprId) -> ExprId {
    let mut folder = Folder {
        arena,
        memo: HashMap::new(),
    };

    folder.fold(root)
}

///
/// Folder
///

struct Folder<'a> {
    arena: &'a mut ExprArena,
    memo: HashMap<ExprId, ExprId>,
}

impl Folder<'_> {
    fn fold(&mut self, id: ExprId) -> ExprId {
        if let Some(folded) = self.memo.get(&id) {
            return *folded;
        }

        // compiled nodes are opaque to this pass
        let folded = if matches!(self.arena.get(id), Expr::Compiled(_)) {
            id
        } else {
            let replaced: Vec<ExprId> = children(self.arena, id)
                .into_iter()
                .map(|child| self.fold(child))
                .collect();
            let rebuilt = with_children(self.arena, id, &replaced);

            self.fold_node(rebuilt)
        };

        self.memo.insert(id, folded);
        folded
    }

    fn fold_node(&mut self, id: ExprId) -> ExprId {
        let expr = self.arena.get(id).clone();

        let value = match expr {
            Expr::Member { receiver, member } => self.member_value(receiver, &member),
            Expr::Binary { op, left, right } => return self.fold_binary(id, op, left, right),
            Expr::Unary { op, operand } => self.unary_value(&op, operand),
            Expr::ArrayIndex { array, index } => match (self.literal(array), self.literal(index)) {
                (Some(Value::List(items)), Some(index)) => index
                    .as_i64()
                    .and_then(|i| usize::try_from(i).ok())
                    .and_then(|i| items.get(i).cloned()),
                _ => None,
            },
            Expr::Call {
                receiver,
                method,
                args,
            } => self.call_value(receiver, &method, &args),
            Expr::New {
                constructor: Some(constructor),
                args,
                ..
            } => self.invoke(&constructor.implementation, None, &args),
            Expr::Conditional {
                test,
                if_true,
                if_false,
            } => {
                return match self.literal(test).and_then(Value::as_bool) {
                    Some(true) => if_true,
                    Some(false) => if_false,
                    None => id,
                };
            }
            _ => None,
        };

        match value {
            Some(value) => {
                let ty = self.arena.ty(id).clone();
                trace!(expr = %id, ?value, "folded to literal");
                self.arena.constant(value, ty)
            }
            None => id,
        }
    }

    fn literal(&self, id: ExprId) -> Option<&Value> {
        self.arena.as_constant(id)
    }

    /// Closed-over values: member reads on literal receivers, and static
    /// members with a getter.
    fn member_value(&self, receiver: Option<ExprId>, member: &MemberRef) -> Option<Value> {
        let null = Value::Null;
        let target = match receiver {
            Some(receiver) => self.literal(receiver)?,
            None => &null,
        };
        if target.is_null() && receiver.is_some() {
            return None;
        }

        match &member.getter {
            Some(getter) => getter(target),
            None => target.field(&member.name).cloned(),
        }
    }

    fn fold_binary(&mut self, id: ExprId, op: BinaryOp, left: ExprId, right: ExprId) -> ExprId {
        let is_text = |side: ExprId| {
            self.arena
                .ty(side)
                .unwrap_nullable()
                .is_primitive(Primitive::String)
        };

        if op == BinaryOp::Add && (is_text(left) || is_text(right)) {
            let concat = string::concat();
            let call = self.arena.call(None, &concat, vec![left, right]);

            return self.fold_node(call);
        }

        let (Some(l), Some(r)) = (self.literal(left), self.literal(right)) else {
            return id;
        };
        if !is_foldable(l) || !is_foldable(r) {
            return id;
        }

        match value::binary(op, l, r) {
            Ok(value) => {
                let ty = self.arena.ty(id).clone();
                self.arena.constant(value, ty)
            }
            Err(err) => {
                trace!(expr = %id, %err, "binary fold skipped");
                id
            }
        }
    }

    fn unary_value(&self, op: &UnaryOp, operand: ExprId) -> Option<Value> {
        let value = self.literal(operand)?;

        match op {
            UnaryOp::Convert(target) => value::convert(value, target).ok(),
            UnaryOp::Not => value::logical_not(value).ok(),
            UnaryOp::Negate => value::negate(value).ok(),
            UnaryOp::ArrayLength => match value {
                Value::List(items) => i32::try_from(items.len()).ok().map(Value::Int32),
                _ => None,
            },
            UnaryOp::TypeAs(_) | UnaryOp::Quote => None,
        }
    }

    fn call_value(&self, receiver: Option<ExprId>, method: &MethodRef, args: &[ExprId]) -> Option<Value> {
        let implementation = method.implementation.as_ref()?;

        self.invoke(implementation, receiver, args)
    }

    /// Run a host function when the receiver and every argument are literals.
    fn invoke(&self, implementation: &HostFn, receiver: Option<ExprId>, args: &[ExprId]) -> Option<Value> {
        let values = receiver
            .iter()
            .chain(args)
            .map(|arg| self.literal(*arg).cloned())
            .collect::<Option<Vec<_>>>()?;

        implementation(&values)
    }
}

/// Operand kinds binary folding applies to.
const fn is_foldable(value: &Value) -> bool {
    matches!(
        value,
        Value::Bool(_)
            | Value::Byte(_)
            | Value::Int16(_)
            | Value::Int32(_)
            | Value::Int64(_)
            | Value::Single(_)
            | Value::Double(_)
            | Value::Decimal(_)
            | Value::Text(_)
    )
}

