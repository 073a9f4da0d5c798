use crate::expr::{Expr, ExprArena, ExprId};

/// Direct children of a node, in evaluation order.
#[must_use]
pub fn children(arena: &ExprArena, id: ExprId) -> Vec<ExprId> {
    match arena.get(id) {
        Expr::Parameter { .. } | Expr::Constant(_) | Expr::Source { .. } | Expr::Compiled(_) => {
            Vec::new()
        }
        Expr::Member { receiver, .. } => receiver.iter().copied().collect(),
        Expr::Binary { left, right, .. } => vec![*left, *right],
        Expr::Unary { operand, .. } | Expr::TypeIs { operand, .. } => vec![*operand],
        Expr::ArrayIndex { array, index } => vec![*array, *index],
        Expr::Call { receiver, args, .. } => receiver.iter().chain(args).copied().collect(),
        Expr::Conditional {
            test,
            if_true,
            if_false,
        } => vec![*test, *if_true, *if_false],
        Expr::Lambda { params, body } => params.iter().chain([body]).copied().collect(),
        Expr::New { args, .. } => args.clone(),
        Expr::NewArray { items } | Expr::ListInit { items } => items.clone(),
    }
}

/// Rebuild `id` with replacement children (same order as [`children`]).
/// Returns `id` itself when nothing changed.
pub fn with_children(arena: &mut ExprArena, id: ExprId, replaced: &[ExprId]) -> ExprId {
    if children(arena, id) == replaced {
        return id;
    }

    let node = arena.node(id).clone();
    let mut next = replaced.iter().copied();
    let mut take = || next.next().unwrap_or(id);

    let expr = match node.expr {
        leaf @ (Expr::Parameter { .. }
        | Expr::Constant(_)
        | Expr::Source { .. }
        | Expr::Compiled(_)) => leaf,
        Expr::Member { receiver, member } => Expr::Member {
            receiver: receiver.map(|_| take()),
            member,
        },
        Expr::Binary { op, .. } => Expr::Binary {
            op,
            left: take(),
            right: take(),
        },
        Expr::Unary { op, .. } => Expr::Unary {
            op,
            operand: take(),
        },
        Expr::TypeIs { ty, .. } => Expr::TypeIs {
            operand: take(),
            ty,
        },
        Expr::ArrayIndex { .. } => Expr::ArrayIndex {
            array: take(),
            index: take(),
        },
        Expr::Call {
            receiver,
            method,
            args,
        } => Expr::Call {
            receiver: receiver.map(|_| take()),
            method,
            args: args.iter().map(|_| take()).collect(),
        },
        Expr::Conditional { .. } => Expr::Conditional {
            test: take(),
            if_true: take(),
            if_false: take(),
        },
        Expr::Lambda { params, .. } => Expr::Lambda {
            params: params.iter().map(|_| take()).collect(),
            body: take(),
        },
        Expr::New {
            constructor,
            members,
            args,
        } => Expr::New {
            constructor,
            members,
            args: args.iter().map(|_| take()).collect(),
        },
        Expr::NewArray { items } => Expr::NewArray {
            items: items.iter().map(|_| take()).collect(),
        },
        Expr::ListInit { items } => Expr::ListInit {
            items: items.iter().map(|_| take()).collect(),
        },
    };

    arena.push(expr, node.ty)
}

/// Substitute every occurrence of parameter `from` under `root` with `to`.
pub fn replace_parameter(arena: &mut ExprArena, root: ExprId, from: ExprId, to: ExprId) -> ExprId {
    if root == from {
        return to;
    }

    let replaced: Vec<ExprId> = children(arena, root)
        .into_iter()
        .map(|child| replace_parameter(arena, child, from, to))
        .collect();

    with_children(arena, root, &replaced)
}

/// True when `param` occurs anywhere under `root`.
#[must_use]
pub fn references(arena: &ExprArena, root: ExprId, param: ExprId) -> bool {
    root == param
        || children(arena, root)
            .into_iter()
            .any(|child| references(arena, child, param))
}
