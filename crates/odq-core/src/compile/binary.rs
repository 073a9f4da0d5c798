use crate::{
    compile::PredicateCompiler,
    expr::{BinaryOp, Expr, ExprId, UnaryOp},
    literal,
    node::{ExtendedNode, Segment},
    types::{Primitive, TypeRef},
    value::{EnumValue, Value},
};

///
/// Operand
///
/// A binary operand after normalization: either an untouched host sub-tree
/// or a node rewritten during normalization.
///

enum Operand {
    Expr(ExprId),
    Node(ExtendedNode),
}

impl PredicateCompiler<'_> {
    pub(super) fn visit_binary(
        &mut self,
        id: ExprId,
        op: BinaryOp,
        left: ExprId,
        right: ExprId,
    ) -> ExtendedNode {
        let arena = self.arena();
        let ty = arena.ty(id).clone();

        let Some(keyword) = op.keyword() else {
            return self.unsupported(id, format!("operator '{op}' has no wire form"));
        };

        if op == BinaryOp::Add
            && (is_string(arena.ty(left)) || is_string(arena.ty(right)))
        {
            let args = vec![
                super::strip(self.visit(left)).into(),
                super::strip(self.visit(right)).into(),
            ];
            return ExtendedNode::formatted("concat({0},{1})", args, ty);
        }

        let (left, right) = self.normalize(left, right);
        let left = self.operand_node(left, op, true);
        let right = self.operand_node(right, op, false);

        ExtendedNode::scope(ExtendedNode::list(
            vec![
                left.into(),
                Segment::text(format!(" {keyword} ")),
                right.into(),
            ],
            ty,
        ))
    }

    /// Embed a tighter-binding binary operand without its own parentheses.
    fn operand_node(&mut self, operand: Operand, parent: BinaryOp, left_side: bool) -> ExtendedNode {
        let id = match operand {
            Operand::Node(node) => return node,
            Operand::Expr(id) => id,
        };
        let node = self.visit(id);

        if let Expr::Binary { op: inner, .. } = self.arena().get(id)
            && inner.keyword().is_some()
            && !(*inner == BinaryOp::Add && is_string(self.arena().ty(id)))
            && (inner.precedence() > parent.precedence()
                || (left_side && inner.precedence() == parent.precedence()))
            && let Some(child) = node.scope_inner()
        {
            return child.clone();
        }

        node
    }

    /// Operand normalization, applied to each side and then with sides
    /// swapped: boxing and nullable-lifting conversions are stripped, enum
    /// values compared as integers are restored to enum literals, and
    /// resource handles compare by identity member.
    fn normalize(&mut self, left: ExprId, right: ExprId) -> (Operand, Operand) {
        let left = self.strip_conversions(left, right);
        let right = self.strip_conversions(right, left);

        if let Some((operand, literal)) = self.enum_comparison(left, right) {
            return (Operand::Expr(operand), Operand::Node(literal));
        }
        if let Some((operand, literal)) = self.enum_comparison(right, left) {
            return (Operand::Node(literal), Operand::Expr(operand));
        }
        if let Some((l, r)) = self.identity_comparison(left, right) {
            return (Operand::Node(l), Operand::Node(r));
        }

        (Operand::Expr(left), Operand::Expr(right))
    }

    fn strip_conversions(&self, mut side: ExprId, other: ExprId) -> ExprId {
        let arena = self.arena();

        loop {
            match arena.get(side) {
                Expr::Unary {
                    op:
                        UnaryOp::Convert(TypeRef::Primitive(Primitive::Object))
                        | UnaryOp::TypeAs(TypeRef::Primitive(Primitive::Object)),
                    operand,
                } if !arena.is_null_constant(other) => side = *operand,
                Expr::Unary {
                    op: UnaryOp::Convert(TypeRef::Nullable(inner)),
                    operand,
                } if arena.ty(*operand) == inner.as_ref() => side = *operand,
                _ => return side,
            }
        }
    }

    /// `(int)x.Status == 1` → (`x.Status`, `'Active'`). Only byte, int and
    /// long underlying types and one level of nullable wrapping qualify.
    fn enum_comparison(&self, side: ExprId, other: ExprId) -> Option<(ExprId, ExtendedNode)> {
        let arena = self.arena();

        let Expr::Unary {
            op: UnaryOp::Convert(target),
            operand,
        } = arena.get(side)
        else {
            return None;
        };

        let operand_ty = arena.ty(*operand);
        let TypeRef::Enum(enum_ty) = operand_ty.unwrap_nullable() else {
            return None;
        };
        if operand_ty.is_nullable() && !target.is_nullable() {
            return None;
        }
        if !matches!(
            enum_ty.underlying,
            Primitive::Byte | Primitive::Int32 | Primitive::Int64
        ) || !target.unwrap_nullable().is_primitive(enum_ty.underlying)
        {
            return None;
        }

        let value = arena.as_constant(other)?;
        if !arena.ty(other).unwrap_nullable().is_primitive(enum_ty.underlying) {
            return None;
        }

        let enum_type = TypeRef::Enum(enum_ty.clone());
        let literal = match value {
            Value::Null => ExtendedNode::literal(literal::NULL, TypeRef::nullable(enum_type)),
            other_value => {
                let discriminant = other_value.as_i64()?;
                let enum_value = Value::Enum(EnumValue::new(enum_ty.clone(), discriminant));
                self.constant_node(other, &enum_value, &enum_type)
            }
        };

        Some((*operand, literal))
    }

    /// Two handles of one resource type with an identity member compare by
    /// that member.
    fn identity_comparison(&mut self, left: ExprId, right: ExprId) -> Option<(ExtendedNode, ExtendedNode)> {
        let arena = self.arena();

        let ty = arena.ty(left).unwrap_nullable();
        if ty != arena.ty(right).unwrap_nullable()
            || arena.is_null_constant(left)
            || arena.is_null_constant(right)
        {
            return None;
        }
        let identity = ty.identity_member()?.clone();

        let side = |this: &mut Self, id: ExprId| match arena.as_constant(id) {
            Some(value) => {
                let key = identity
                    .getter
                    .as_ref()
                    .and_then(|getter| getter(value))
                    .or_else(|| value.field(&identity.name).cloned());
                match key {
                    Some(key) => this.constant_node(id, &key, &identity.ty),
                    None => this.unsupported(id, "resource constant has no identity value"),
                }
            }
            None => this.member_access(id, Some(id), &identity),
        };

        let l = side(self, left);
        let r = side(self, right);

        Some((l, r))
    }
}

fn is_string(ty: &TypeRef) -> bool {
    ty.unwrap_nullable().is_primitive(Primitive::String)
}
