use crate::node::{ExtendedNode, NodeKind, Segment, SortDirection};

const DESCENDING: &str = " desc";

pub(super) fn render_into(node: &ExtendedNode, out: &mut String) {
    match node.kind() {
        NodeKind::Terminal(token) => out.push_str(token),
        NodeKind::Formatted { template, args } => out.push_str(&render_template(template, args)),
        NodeKind::List(segments) => {
            for segment in segments {
                push_segment(segment, out);
            }
        }
        NodeKind::ParenScope(child) => {
            if child.is_scope() {
                out.push_str(child.render());
            } else {
                out.push('(');
                out.push_str(child.render());
                out.push(')');
            }
        }
        NodeKind::Select(fields) => {
            for (i, (name, value)) in fields.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(value.render());
                out.push_str(" as ");
                out.push_str(name);
            }
        }
        NodeKind::Order(keys) => {
            for (i, (key, direction)) in keys.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(key.render());
                if *direction == SortDirection::Descending {
                    out.push_str(DESCENDING);
                }
            }
        }
        NodeKind::ClientServerSplit { server, .. } => out.push_str(server.render()),
        NodeKind::NotSupported { source, cause } => {
            out.push_str("#NotSupported(");
            match cause {
                Some(cause) => out.push_str(cause),
                None => out.push_str(&source.to_string()),
            }
            out.push_str(")#");
        }
    }
}

fn push_segment(segment: &Segment, out: &mut String) {
    match segment {
        Segment::Node(node) => out.push_str(node.render()),
        Segment::Text(text) => out.push_str(text),
    }
}

/// Positional substitution of `{n}` placeholders; `{{` and `}}` escape
/// literal braces. Out-of-range placeholders are left verbatim.
#[must_use]
pub fn render_template(template: &str, args: &[Segment]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut chars = template.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
                out.push('{');
            }
            '}' if chars.peek() == Some(&'}') => {
                chars.next();
                out.push('}');
            }
            '{' => {
                let mut digits = String::new();
                while let Some(d) = chars.peek().copied().filter(char::is_ascii_digit) {
                    digits.push(d);
                    chars.next();
                }

                let arg = digits.parse::<usize>().ok().and_then(|i| args.get(i));
                match (arg, chars.peek()) {
                    (Some(arg), Some('}')) => {
                        chars.next();
                        push_segment(arg, &mut out);
                    }
                    _ => {
                        out.push('{');
                        out.push_str(&digits);
                    }
                }
            }
            other => out.push(other),
        }
    }

    out
}

/// Render without the outermost parentheses; used for top-level query
/// parameters.
#[must_use]
pub fn strip_scope(node: &ExtendedNode) -> &str {
    match node.scope_inner() {
        Some(inner) => strip_scope(inner),
        None => node.render(),
    }
}
