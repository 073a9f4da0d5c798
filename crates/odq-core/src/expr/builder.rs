use crate::{
    expr::{BinaryOp, Constructor, Expr, ExprArena, ExprId, MemberRef, MethodRef, UnaryOp},
    node::ExtendedNode,
    types::{Primitive, RecordType, ResourceType, TypeRef},
    value::Value,
};
use std::sync::Arc;

///
/// Builder methods
///
/// Each method computes the node's semantic result type and appends it.
///

impl ExprArena {
    pub fn parameter(&mut self, name: impl Into<String>, ty: TypeRef) -> ExprId {
        self.push(Expr::Parameter { name: name.into() }, ty)
    }

    pub fn constant(&mut self, value: impl Into<Value>, ty: TypeRef) -> ExprId {
        self.push(Expr::Constant(value.into()), ty)
    }

    /// Literal typed by its own natural type (`Object` when it has none).
    pub fn literal(&mut self, value: impl Into<Value>) -> ExprId {
        let value = value.into();
        let ty = value.natural_type().unwrap_or(TypeRef::OBJECT);

        self.push(Expr::Constant(value), ty)
    }

    pub fn null(&mut self, ty: TypeRef) -> ExprId {
        self.push(Expr::Constant(Value::Null), ty)
    }

    pub fn member(&mut self, receiver: Option<ExprId>, member: &MemberRef) -> ExprId {
        let ty = member.ty.clone();

        self.push(
            Expr::Member {
                receiver,
                member: member.clone(),
            },
            ty,
        )
    }

    /// Member access on `receiver`.
    pub fn field(&mut self, receiver: ExprId, member: &MemberRef) -> ExprId {
        self.member(Some(receiver), member)
    }

    pub fn binary(&mut self, op: BinaryOp, left: ExprId, right: ExprId) -> ExprId {
        let ty = binary_result_type(op, self.ty(left), self.ty(right));

        self.push(Expr::Binary { op, left, right }, ty)
    }

    pub fn and(&mut self, left: ExprId, right: ExprId) -> ExprId {
        self.binary(BinaryOp::And, left, right)
    }

    pub fn or(&mut self, left: ExprId, right: ExprId) -> ExprId {
        self.binary(BinaryOp::Or, left, right)
    }

    pub fn eq(&mut self, left: ExprId, right: ExprId) -> ExprId {
        self.binary(BinaryOp::Eq, left, right)
    }

    pub fn gt(&mut self, left: ExprId, right: ExprId) -> ExprId {
        self.binary(BinaryOp::Gt, left, right)
    }

    pub fn unary(&mut self, op: UnaryOp, operand: ExprId) -> ExprId {
        let ty = match &op {
            UnaryOp::Not | UnaryOp::Negate | UnaryOp::Quote => self.ty(operand).clone(),
            UnaryOp::Convert(ty) | UnaryOp::TypeAs(ty) => ty.clone(),
            UnaryOp::ArrayLength => TypeRef::INT32,
        };

        self.push(Expr::Unary { op, operand }, ty)
    }

    pub fn not(&mut self, operand: ExprId) -> ExprId {
        self.unary(UnaryOp::Not, operand)
    }

    pub fn negate(&mut self, operand: ExprId) -> ExprId {
        self.unary(UnaryOp::Negate, operand)
    }

    pub fn convert(&mut self, operand: ExprId, ty: TypeRef) -> ExprId {
        self.unary(UnaryOp::Convert(ty), operand)
    }

    pub fn type_as(&mut self, operand: ExprId, ty: TypeRef) -> ExprId {
        self.unary(UnaryOp::TypeAs(ty), operand)
    }

    pub fn quote(&mut self, operand: ExprId) -> ExprId {
        self.unary(UnaryOp::Quote, operand)
    }

    pub fn array_length(&mut self, operand: ExprId) -> ExprId {
        self.unary(UnaryOp::ArrayLength, operand)
    }

    pub fn array_index(&mut self, array: ExprId, index: ExprId) -> ExprId {
        let ty = self
            .ty(array)
            .element_type()
            .cloned()
            .unwrap_or(TypeRef::OBJECT);

        self.push(Expr::ArrayIndex { array, index }, ty)
    }

    /// Call typed by the method's declared result.
    pub fn call(&mut self, receiver: Option<ExprId>, method: &MethodRef, args: Vec<ExprId>) -> ExprId {
        let ty = method.result.clone();

        self.call_typed(receiver, method, args, ty)
    }

    /// Call with an explicit result type, for generic methods whose result
    /// depends on their arguments.
    pub fn call_typed(
        &mut self,
        receiver: Option<ExprId>,
        method: &MethodRef,
        args: Vec<ExprId>,
        ty: TypeRef,
    ) -> ExprId {
        self.push(
            Expr::Call {
                receiver,
                method: method.clone(),
                args,
            },
            ty,
        )
    }

    pub fn conditional(&mut self, test: ExprId, if_true: ExprId, if_false: ExprId) -> ExprId {
        let ty = self.ty(if_true).clone();

        self.push(
            Expr::Conditional {
                test,
                if_true,
                if_false,
            },
            ty,
        )
    }

    pub fn type_is(&mut self, operand: ExprId, ty: TypeRef) -> ExprId {
        self.push(Expr::TypeIs { operand, ty }, TypeRef::BOOL)
    }

    pub fn lambda(&mut self, params: Vec<ExprId>, body: ExprId) -> ExprId {
        let param_types = params.iter().map(|p| self.ty(*p).clone()).collect();
        let ty = TypeRef::function(param_types, self.ty(body).clone());

        self.push(Expr::Lambda { params, body }, ty)
    }

    /// Single-parameter lambda, the common selector/predicate shape.
    pub fn lambda1(&mut self, param: ExprId, body: ExprId) -> ExprId {
        self.lambda(vec![param], body)
    }

    /// Anonymous object construction with named members.
    pub fn new_object(&mut self, fields: Vec<(&str, ExprId)>) -> ExprId {
        let shape = fields
            .iter()
            .map(|(name, id)| ((*name).to_string(), self.ty(*id).clone()))
            .collect();
        let (members, args): (Vec<String>, Vec<ExprId>) = fields
            .into_iter()
            .map(|(name, id)| (name.to_string(), id))
            .unzip();

        self.push(
            Expr::New {
                constructor: None,
                members: Some(members),
                args,
            },
            TypeRef::Record(RecordType::new(shape)),
        )
    }

    /// Tuple construction; fields are positional (`Item1`, `Item2`, ..).
    pub fn new_tuple(&mut self, args: Vec<ExprId>) -> ExprId {
        let shape = args
            .iter()
            .enumerate()
            .map(|(i, id)| (format!("Item{}", i + 1), self.ty(*id).clone()))
            .collect();

        self.push(
            Expr::New {
                constructor: None,
                members: None,
                args,
            },
            TypeRef::Record(RecordType::new(shape)),
        )
    }

    /// Construction of a host type through its constructor.
    pub fn new_with(&mut self, constructor: Constructor, args: Vec<ExprId>) -> ExprId {
        let ty = constructor.ty.clone();

        self.push(
            Expr::New {
                constructor: Some(constructor),
                members: None,
                args,
            },
            ty,
        )
    }

    pub fn new_array(&mut self, element: TypeRef, items: Vec<ExprId>) -> ExprId {
        self.push(Expr::NewArray { items }, TypeRef::array(element))
    }

    pub fn list_init(&mut self, element: TypeRef, items: Vec<ExprId>) -> ExprId {
        self.push(Expr::ListInit { items }, TypeRef::list(element))
    }

    /// Root resource set being queried.
    pub fn source(&mut self, resource: &Arc<ResourceType>) -> ExprId {
        self.push(
            Expr::Source {
                name: resource.name.clone(),
            },
            TypeRef::queryable(TypeRef::Resource(resource.clone())),
        )
    }

    /// Thread an already-compiled node back into the host tree.
    pub fn compiled(&mut self, node: ExtendedNode) -> ExprId {
        let ty = node.ty().clone();

        self.push(Expr::Compiled(node), ty)
    }
}

/// Result type of a binary operator over two operand types.
#[must_use]
pub(crate) fn binary_result_type(op: BinaryOp, left: &TypeRef, right: &TypeRef) -> TypeRef {
    match op {
        BinaryOp::And | BinaryOp::Or => TypeRef::BOOL,
        _ if op.is_comparison() => TypeRef::BOOL,
        BinaryOp::Coalesce => {
            if right.is_nullable() {
                right.clone()
            } else {
                left.unwrap_nullable().clone()
            }
        }
        _ => {
            let lifted = left.is_nullable() || right.is_nullable();
            let (l, r) = (left.unwrap_nullable(), right.unwrap_nullable());
            if l.is_primitive(Primitive::String) || r.is_primitive(Primitive::String) {
                return TypeRef::STRING;
            }
            let ty = match (l.as_primitive(), r.as_primitive()) {
                (Some(a), Some(b)) => TypeRef::Primitive(widest(a, b)),
                _ => l.clone(),
            };

            if lifted { TypeRef::nullable(ty) } else { ty }
        }
    }
}

// Mirrors value-level numeric promotion.
const fn widest(a: Primitive, b: Primitive) -> Primitive {
    const fn rank(p: Primitive) -> u8 {
        match p {
            Primitive::Int64 => 1,
            Primitive::Single => 2,
            Primitive::Double => 3,
            Primitive::Decimal => 4,
            _ => 0,
        }
    }

    let to = if rank(a) >= rank(b) { a } else { b };
    match to {
        Primitive::Byte | Primitive::Int16 => Primitive::Int32,
        other => other,
    }
}
