//! Expression → JavaScript conversion shared by both backends.
//!
//! The backends differ only in how a path's root is spelled, so the printer
//! takes that as a callback. Member accesses after the root are optional
//! (`?.`) because context data is schema-less.

use crate::{format_number, is_plain_property, js_string};
use htms_parser::ast::{BinaryOp, ContextPath, ExprKind, Expression};

/// Spells the root of a path, e.g. `ctx`, `item` or `s.item3`.
pub type RootFn<'a> = dyn Fn(&str) -> String + 'a;

/// Convert an expression to JavaScript.
pub fn to_js(expr: &Expression, root: &RootFn) -> String {
    match &expr.kind {
        ExprKind::String(s) => js_string(s),
        ExprKind::Number(n) => format_number(*n),
        ExprKind::Boolean(b) => b.to_string(),
        ExprKind::Path(path) => path_to_js(path, root),
        ExprKind::Binary { left, op, right } => format!(
            "{} {} {}",
            operand(left, root),
            binary_op_to_js(*op),
            operand(right, root)
        ),
        ExprKind::Not(inner) => format!("!{}", operand(inner, root)),
        ExprKind::Ternary {
            condition,
            consequent,
            alternate,
        } => format!(
            "{} ? {} : {}",
            operand(condition, root),
            operand(consequent, root),
            operand(alternate, root)
        ),
    }
}

/// Compound operands are parenthesized so the source grouping survives.
fn operand(expr: &Expression, root: &RootFn) -> String {
    let js = to_js(expr, root);
    match expr.kind {
        ExprKind::Binary { .. } | ExprKind::Ternary { .. } => format!("({js})"),
        _ => js,
    }
}

/// `ctx.user.name` → `ctx.user?.name`, `item.first-name` → `item?.['first-name']`.
pub fn path_to_js(path: &ContextPath, root: &RootFn) -> String {
    let mut out = root(&path.root);
    for (i, segment) in path.segments.iter().enumerate() {
        // The context object itself is always present.
        let access = if i == 0 && out == "ctx" { "." } else { "?." };
        if is_plain_property(segment) {
            out.push_str(access);
            out.push_str(segment);
        } else {
            if access == "." {
                out.push('[');
            } else {
                out.push_str("?.[");
            }
            out.push_str(&js_string(segment));
            out.push(']');
        }
    }
    out
}

/// The segments of a path as a JavaScript string array, for `setPath`.
pub fn segments_to_js(path: &ContextPath) -> String {
    crate::js_string_array(&path.segments)
}

/// Text interpolation: literals and `text(expr)` joined with `+`.
///
/// `text_fn` is the name of the runtime helper that turns a value into
/// display text.
pub fn interpolate(
    segments: &[htms_parser::ast::TextSegment],
    root: &RootFn,
    text_fn: &str,
) -> String {
    use htms_parser::ast::TextSegment;

    let parts: Vec<String> = segments
        .iter()
        .map(|segment| match segment {
            TextSegment::Literal(s) => js_string(s),
            TextSegment::Interpolation(expr) => format!("{text_fn}({})", to_js(expr, root)),
        })
        .collect();

    if parts.is_empty() {
        "''".to_string()
    } else {
        parts.join(" + ")
    }
}

fn binary_op_to_js(op: BinaryOp) -> &'static str {
    match op {
        BinaryOp::Add => "+",
        BinaryOp::Eq => "===",
        BinaryOp::NotEq => "!==",
        BinaryOp::Lt => "<",
        BinaryOp::LtEq => "<=",
        BinaryOp::Gt => ">",
        BinaryOp::GtEq => ">=",
        BinaryOp::And => "&&",
        BinaryOp::Or => "||",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use htms_parser::ast::{Node, TextSegment};
    use htms_parser::Parser;
    use pretty_assertions::assert_eq;

    /// Parse `source` as the text of a page and lower its first
    /// interpolation.
    fn lower(source: &str) -> String {
        let (program, diagnostics) =
            Parser::parse(&format!("page p \"/\" {{ {{{{ ${{{source}}} }}}} }}"));
        assert!(diagnostics.is_empty(), "{diagnostics:?}");
        let Node::Text(text) = &program.declarations[0].body()[0] else {
            panic!("expected a text node");
        };
        let TextSegment::Interpolation(expr) = &text.segments[0] else {
            panic!("expected an interpolation");
        };
        to_js(expr, &|root| root.to_string())
    }

    // =========================================================================
    // Paths
    // =========================================================================

    #[test]
    fn test_context_path() {
        assert_eq!(lower("ctx.user.name"), "ctx.user?.name");
    }

    #[test]
    fn test_binder_path() {
        assert_eq!(lower("item.name"), "item?.name");
        assert_eq!(lower("item"), "item");
    }

    #[test]
    fn test_hyphenated_segment() {
        assert_eq!(lower("ctx.first-name"), "ctx['first-name']");
        assert_eq!(lower("item.first-name"), "item?.['first-name']");
    }

    #[test]
    fn test_root_callback() {
        let (program, _) = Parser::parse("page p \"/\" { {{ ${item.id} }} }");
        let Node::Text(text) = &program.declarations[0].body()[0] else {
            panic!("expected a text node");
        };
        let TextSegment::Interpolation(expr) = &text.segments[0] else {
            panic!("expected an interpolation");
        };
        assert_eq!(to_js(expr, &|root| format!("s.{root}3")), "s.item3?.id");
    }

    // =========================================================================
    // Operators
    // =========================================================================

    #[test]
    fn test_equality_is_strict() {
        assert_eq!(lower("a == 1"), "a === 1");
        assert_eq!(lower("a != 'x'"), "a !== 'x'");
    }

    #[test]
    fn test_grouping_is_preserved() {
        assert_eq!(lower("(a + b) == c"), "(a + b) === c");
        assert_eq!(lower("!(a && b)"), "!(a && b)");
        assert_eq!(lower("a ? b : c ? d : e"), "a ? b : (c ? d : e)");
    }

    #[test]
    fn test_literals() {
        assert_eq!(lower("\"it's\""), "'it\\'s'");
        assert_eq!(lower("1.5"), "1.5");
        assert_eq!(lower("true"), "true");
    }

    // =========================================================================
    // Interpolation
    // =========================================================================

    #[test]
    fn test_interpolate() {
        let segments = vec![
            TextSegment::Literal("Hello, ".into()),
            TextSegment::Interpolation(Expression::new(
                ExprKind::Path(ContextPath {
                    root: "ctx".into(),
                    segments: vec!["name".into()],
                }),
                htms_lexer::Span::default(),
            )),
            TextSegment::Literal("!".into()),
        ];
        assert_eq!(
            interpolate(&segments, &|root| root.to_string(), "text"),
            "'Hello, ' + text(ctx.name) + '!'"
        );
    }
}
