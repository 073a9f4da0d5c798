use crate::{
    compile::{PredicateCompiler, strip},
    expr::{ExprId, MethodRef, SpecialMethod},
    library::is_ignore_case,
    node::{ExtendedNode, Segment},
    value::Value,
};

const IGNORE_CASE_EQ: &str = "ieq";

impl PredicateCompiler<'_> {
    pub(super) fn visit_call(
        &mut self,
        id: ExprId,
        receiver: Option<ExprId>,
        method: &MethodRef,
        args: &[ExprId],
    ) -> ExtendedNode {
        let method = if method.is_queryable_extension() {
            self.enumerable_counterpart(method)
                .unwrap_or_else(|| method.clone())
        } else {
            method.clone()
        };

        match (method.special, receiver.as_ref(), args) {
            (Some(SpecialMethod::StringEquals), None, [a, b, mode]) => {
                self.string_equals(id, *a, *b, *mode)
            }
            (Some(SpecialMethod::SequenceContains), None, [sequence, item])
            | (Some(SpecialMethod::ListContains), Some(sequence), [item]) => {
                self.contains(id, *item, *sequence)
            }
            (Some(SpecialMethod::DictionaryIndexer), Some(dictionary), [key]) => {
                let args = vec![self.visit(*dictionary).into(), strip(self.visit(*key)).into()];
                ExtendedNode::formatted("{0}[{1}]", args, self.arena().ty(id).clone())
            }
            (Some(SpecialMethod::SafeGet), None, [dictionary, key])
                if self.constant_identifier(*key).is_some() =>
            {
                let key = self.constant_identifier(*key).unwrap_or_default();
                let receiver = self.visit(*dictionary);
                ExtendedNode::formatted(
                    format!("{{0}}.{key}"),
                    vec![receiver.into()],
                    self.arena().ty(id).clone(),
                )
            }
            _ => self.mapped_call(id, receiver, &method, args),
        }
    }

    /// Plain-enumerable overload with the same arity and equivalent shapes.
    fn enumerable_counterpart(&self, method: &MethodRef) -> Option<MethodRef> {
        self.context()
            .functions
            .enumerable_overloads(&method.name)
            .into_iter()
            .find(|candidate| candidate.shape_matches(method))
    }

    fn string_equals(&mut self, id: ExprId, a: ExprId, b: ExprId, mode: ExprId) -> ExtendedNode {
        let Some(mode) = self.arena().as_constant(mode) else {
            return self.unsupported(id, "string comparison mode must be a constant");
        };
        let keyword = if is_ignore_case(mode) {
            IGNORE_CASE_EQ
        } else {
            "eq"
        };

        let a = self.visit(a);
        let b = self.visit(b);

        ExtendedNode::scope(ExtendedNode::list(
            vec![a.into(), Segment::text(format!(" {keyword} ")), b.into()],
            self.arena().ty(id).clone(),
        ))
    }

    /// `item in sequence`.
    fn contains(&mut self, id: ExprId, item: ExprId, sequence: ExprId) -> ExtendedNode {
        let item = self.visit(item);
        let sequence = self.visit(sequence);

        ExtendedNode::scope(ExtendedNode::list(
            vec![item.into(), Segment::text(" in "), sequence.into()],
            self.arena().ty(id).clone(),
        ))
    }

    /// Constant string key that is also a bare identifier.
    fn constant_identifier(&self, key: ExprId) -> Option<String> {
        match self.arena().as_constant(key) {
            Some(Value::Text(s)) if is_identifier(s) => Some(s.clone()),
            _ => None,
        }
    }

    /// Generic path through the function-mapping table. The receiver, when
    /// present, is the first argument.
    fn mapped_call(
        &mut self,
        id: ExprId,
        receiver: Option<ExprId>,
        method: &MethodRef,
        args: &[ExprId],
    ) -> ExtendedNode {
        let ctx = self.context();
        let Some(mapping) = ctx.functions.lookup(&method.key()) else {
            return self.unsupported(
                id,
                format!(
                    "method '{}' declared on '{}' is not supported",
                    method.name, method.declaring
                ),
            );
        };

        let segments: Vec<Segment> = receiver
            .into_iter()
            .chain(args.iter().copied())
            .map(|arg| Segment::from(strip(self.visit(arg))))
            .collect();

        ExtendedNode::formatted(
            mapping.format(segments.len()),
            segments,
            self.arena().ty(id).clone(),
        )
    }
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();

    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
