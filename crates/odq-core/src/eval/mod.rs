//! Local evaluation of host expression trees.
//!
//! Backs the client half of a client/server split: the partition rewrites
//! server-evaluable sub-trees into row reads, and what is left runs here.

#[cfg(test)]
mod tests;

use crate::{
    error::{ErrorClass, ErrorOrigin, InternalError},
    expr::{BinaryOp, Expr, ExprArena, ExprId, HigherOrderFn, HostArg, MemberRef, MethodInfo, UnaryOp},
    value::{self, OpError, RecordValue, Value},
};
use std::{cell::RefCell, collections::HashMap};
use thiserror::Error as ThisError;

///
/// EvalError
///

#[derive(Clone, Debug, PartialEq, ThisError)]
pub enum EvalError {
    #[error("parameter '{name}' is not bound")]
    UnboundParameter { name: String },

    #[error("lambdas cannot be evaluated as values")]
    Lambda,

    #[error("query source '{name}' cannot be evaluated locally")]
    Source { name: String },

    #[error("compiled node cannot be evaluated locally")]
    Compiled,

    #[error("member '{member}' read on a null receiver")]
    NullReceiver { member: String },

    #[error("value has no member '{member}'")]
    MissingMember { member: String },

    #[error("method '{method}' has no local implementation")]
    NoImplementation { method: String },

    #[error("method '{method}' failed for its arguments")]
    MethodFailed { method: String },

    #[error("index {index} is out of range for length {len}")]
    IndexOutOfRange { index: i64, len: usize },

    #[error("lambda takes {expected} arguments, called with {found}")]
    Arity { expected: usize, found: usize },

    #[error("expected {expected}, found {found}")]
    Mismatch { expected: &'static str, found: String },

    #[error(transparent)]
    Operator(#[from] OpError),
}

impl From<EvalError> for InternalError {
    fn from(err: EvalError) -> Self {
        let class = match err {
            EvalError::Compiled => ErrorClass::InvariantViolation,
            _ => ErrorClass::Internal,
        };

        Self::new(class, ErrorOrigin::Eval, err.to_string())
    }
}

fn mismatch(expected: &'static str, found: &Value) -> EvalError {
    EvalError::Mismatch {
        expected,
        found: format!("{found:?}"),
    }
}

/// Evaluate `root` with the given parameter bindings.
pub fn evaluate(arena: &ExprArena, root: ExprId, bindings: &[(ExprId, Value)]) -> Result<Value, EvalError> {
    Evaluator {
        arena,
        bindings: bindings.iter().cloned().collect(),
    }
    .eval(root)
}

///
/// Evaluator
///

struct Evaluator<'a> {
    arena: &'a ExprArena,
    bindings: HashMap<ExprId, Value>,
}

impl<'a> Evaluator<'a> {
    fn eval(&self, id: ExprId) -> Result<Value, EvalError> {
        match self.arena.get(id) {
            Expr::Parameter { name } => self
                .bindings
                .get(&id)
                .cloned()
                .ok_or_else(|| EvalError::UnboundParameter { name: name.clone() }),
            Expr::Constant(value) => Ok(value.clone()),
            Expr::Member { receiver, member } => self.member(*receiver, member),
            Expr::Binary { op, left, right } => self.binary(*op, *left, *right),
            Expr::Unary { op, operand } => self.unary(op, *operand),
            Expr::ArrayIndex { array, index } => {
                let array = self.eval(*array)?;
                let index = self.eval(*index)?;
                element_at(&array, &index)
            }
            Expr::Call {
                receiver,
                method,
                args,
            } => self.call(method, receiver.iter().chain(args).copied().collect()),
            Expr::Conditional {
                test,
                if_true,
                if_false,
            } => {
                let test = self.eval(*test)?;
                match test.as_bool() {
                    Some(true) => self.eval(*if_true),
                    Some(false) => self.eval(*if_false),
                    None => Err(mismatch("boolean", &test)),
                }
            }
            Expr::TypeIs { operand, ty } => Ok(Value::Bool(self.eval(*operand)?.is_instance_of(ty))),
            Expr::Lambda { .. } => Err(EvalError::Lambda),
            Expr::New {
                constructor,
                members,
                args,
            } => {
                let values = self.eval_all(args)?;
                match constructor {
                    Some(constructor) => {
                        (constructor.implementation)(&values).ok_or_else(|| EvalError::MethodFailed {
                            method: constructor.ty.to_string(),
                        })
                    }
                    None => {
                        let names = members.clone().unwrap_or_else(|| {
                            (1..=values.len()).map(|i| format!("Item{i}")).collect()
                        });
                        Ok(Value::Record(RecordValue::anonymous(
                            names.into_iter().zip(values).collect(),
                        )))
                    }
                }
            }
            Expr::NewArray { items } | Expr::ListInit { items } => self.eval_all(items).map(Value::List),
            Expr::Source { name } => Err(EvalError::Source { name: name.clone() }),
            Expr::Compiled(_) => Err(EvalError::Compiled),
        }
    }

    fn eval_all<'i>(&self, ids: impl IntoIterator<Item = &'i ExprId>) -> Result<Vec<Value>, EvalError> {
        ids.into_iter().map(|id| self.eval(*id)).collect()
    }

    fn call(&self, method: &MethodInfo, operands: Vec<ExprId>) -> Result<Value, EvalError> {
        if let Some(higher_order) = &method.higher_order {
            return self.call_higher_order(higher_order, method, &operands);
        }

        let implementation = method
            .implementation
            .as_ref()
            .ok_or_else(|| EvalError::NoImplementation {
                method: method.key().to_string(),
            })?;
        let values = self.eval_all(&operands)?;

        implementation(&values).ok_or_else(|| EvalError::MethodFailed {
            method: method.key().to_string(),
        })
    }

    /// Lambda operands are handed over as local functions; the first error
    /// raised inside one of them is reported in place of a generic failure.
    fn call_higher_order(
        &self,
        implementation: &HigherOrderFn,
        method: &MethodInfo,
        operands: &[ExprId],
    ) -> Result<Value, EvalError> {
        let failure = RefCell::new(None);
        let functions: Vec<_> = operands
            .iter()
            .map(|id| {
                self.function_operand(*id)
                    .map(|(params, body)| self.closure(params, body, &failure))
            })
            .collect();

        let mut args = Vec::with_capacity(operands.len());
        for (id, function) in operands.iter().zip(&functions) {
            args.push(match function {
                Some(function) => HostArg::Function(&**function),
                None => HostArg::Value(self.eval(*id)?),
            });
        }

        match implementation(args.as_slice()) {
            Some(value) => Ok(value),
            None => Err(failure.take().unwrap_or_else(|| EvalError::MethodFailed {
                method: method.key().to_string(),
            })),
        }
    }

    /// A lambda operand, looking through a quote.
    fn function_operand(&self, id: ExprId) -> Option<(&'a [ExprId], ExprId)> {
        let arena = self.arena;
        match arena.get(id) {
            Expr::Unary {
                op: UnaryOp::Quote,
                operand,
            } => arena.as_lambda(*operand),
            _ => arena.as_lambda(id),
        }
    }

    fn closure<'s>(
        &'s self,
        params: &'s [ExprId],
        body: ExprId,
        failure: &'s RefCell<Option<EvalError>>,
    ) -> Box<dyn Fn(&[Value]) -> Option<Value> + 's> {
        Box::new(move |args: &[Value]| {
            if args.len() != params.len() {
                record(
                    failure,
                    EvalError::Arity {
                        expected: params.len(),
                        found: args.len(),
                    },
                );
                return None;
            }

            let mut bindings = self.bindings.clone();
            bindings.extend(params.iter().copied().zip(args.iter().cloned()));
            let scope = Evaluator {
                arena: self.arena,
                bindings,
            };

            match scope.eval(body) {
                Ok(value) => Some(value),
                Err(err) => {
                    record(failure, err);
                    None
                }
            }
        })
    }

    fn member(&self, receiver: Option<ExprId>, member: &MemberRef) -> Result<Value, EvalError> {
        let target = match receiver {
            Some(receiver) => {
                let target = self.eval(receiver)?;
                if target.is_null() {
                    return Err(EvalError::NullReceiver {
                        member: member.name.clone(),
                    });
                }
                target
            }
            None => Value::Null,
        };

        let value = match &member.getter {
            Some(getter) => getter(&target),
            None => target.field(&member.name).cloned(),
        };

        value.ok_or_else(|| EvalError::MissingMember {
            member: member.key().to_string(),
        })
    }

    fn binary(&self, op: BinaryOp, left: ExprId, right: ExprId) -> Result<Value, EvalError> {
        let left = self.eval(left)?;

        // short-circuit forms
        match (op, left.as_bool()) {
            (BinaryOp::And, Some(false)) => return Ok(Value::Bool(false)),
            (BinaryOp::Or, Some(true)) => return Ok(Value::Bool(true)),
            (BinaryOp::Coalesce, _) if !left.is_null() => return Ok(left),
            _ => {}
        }

        let right = self.eval(right)?;

        Ok(value::binary(op, &left, &right)?)
    }

    fn unary(&self, op: &UnaryOp, operand: ExprId) -> Result<Value, EvalError> {
        let value = self.eval(operand)?;

        let result = match op {
            UnaryOp::Not => value::logical_not(&value)?,
            UnaryOp::Negate => value::negate(&value)?,
            UnaryOp::Convert(target) => value::convert(&value, target)?,
            UnaryOp::TypeAs(target) => {
                if value.is_instance_of(target) {
                    value
                } else {
                    Value::Null
                }
            }
            UnaryOp::ArrayLength => match &value {
                Value::List(items) => Value::Int32(
                    i32::try_from(items.len()).map_err(|_| mismatch("array length", &value))?,
                ),
                other => return Err(mismatch("array", other)),
            },
            UnaryOp::Quote => return Err(EvalError::Lambda),
        };

        Ok(result)
    }
}

/// Keep the first failure raised inside a local function.
fn record(failure: &RefCell<Option<EvalError>>, err: EvalError) {
    let mut slot = failure.borrow_mut();
    if slot.is_none() {
        *slot = Some(err);
    }
}

fn element_at(array: &Value, index: &Value) -> Result<Value, EvalError> {
    let Value::List(items) = array else {
        return Err(mismatch("array", array));
    };
    let index = index.as_i64().ok_or_else(|| mismatch("integer index", index))?;

    usize::try_from(index)
        .ok()
        .and_then(|i| items.get(i))
        .cloned()
        .ok_or(EvalError::IndexOutOfRange {
            index,
            len: items.len(),
        })
}
