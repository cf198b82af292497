//! Resolution pass.
//!
//! Walks every declaration body with a lexical scope stack and checks each
//! component reference, argument, binder, slot and path expression against
//! the symbol table built by the collection pass.

use crate::symbols::{SymbolId, SymbolKind, SymbolTable};
use htms_lexer::{Diagnostic, DiagnosticCode, Location, Span};
use htms_parser::ast::{
    AttrValue, Attribute, Binder, ComponentRef, Declaration, Element, ElementDirective, ExprKind,
    Expression, Node, Program, TextSegment,
};

/// The reserved name of the context root.
pub const CONTEXT_ROOT: &str = "ctx";

/// Event modifiers the generated runtimes understand.
pub const KNOWN_MODIFIERS: [&str; 3] = ["prevent", "stop", "once"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BinderKind {
    Param,
    Item,
    Index,
}

#[derive(Debug)]
struct ScopeEntry {
    name: String,
    kind: BinderKind,
}

struct Resolver<'a> {
    table: &'a SymbolTable,
    diagnostics: Vec<Diagnostic>,
    scopes: Vec<Vec<ScopeEntry>>,
    referenced: Vec<bool>,
    /// Component reference graph, one edge list per symbol, in source order.
    edges: Vec<Vec<(SymbolId, Span)>>,
    current: Option<SymbolId>,
    in_page: bool,
}

/// Resolution pass over a program whose symbols were already collected.
pub fn resolve(program: &Program, table: &SymbolTable) -> Vec<Diagnostic> {
    let mut resolver = Resolver {
        table,
        diagnostics: Vec::new(),
        scopes: Vec::new(),
        referenced: vec![false; table.len()],
        edges: vec![Vec::new(); table.len()],
        current: None,
        in_page: false,
    };

    for declaration in &program.declarations {
        resolver.resolve_declaration(declaration);
    }

    resolver.check_cycles();
    resolver.check_usage();
    resolver.diagnostics
}

impl<'a> Resolver<'a> {
    fn resolve_declaration(&mut self, declaration: &Declaration) {
        // Duplicates were reported during collection; their bodies are still
        // checked, but edges are attributed to the first declaration only.
        let id = self
            .table
            .id_of(declaration.name())
            .filter(|&id| self.table.get(id).span == declaration.name_span());
        self.current = id;
        self.in_page = matches!(declaration, Declaration::Page(_));
        self.scopes.push(Vec::new());

        if let Declaration::Component(decl) | Declaration::Section(decl) = declaration {
            if let Some(param) = &decl.param {
                self.declare_binder(&param.name, param.span, BinderKind::Param);
            }
        }

        self.resolve_nodes(declaration.body());
        self.scopes.pop();
    }

    fn resolve_nodes(&mut self, nodes: &[Node]) {
        for node in nodes {
            self.resolve_node(node);
        }
    }

    fn resolve_node(&mut self, node: &Node) {
        match node {
            Node::Element(el) => self.resolve_element(el),
            Node::Text(text) => {
                for segment in &text.segments {
                    if let TextSegment::Interpolation(expr) = segment {
                        self.check_expression(expr);
                    }
                }
            }
            Node::ComponentRef(r) => self.resolve_component_ref(r),
            Node::Slot(slot) => {
                if self.in_page {
                    self.error(
                        DiagnosticCode::MisplacedSlot,
                        "'@slot' can only appear inside a component or section",
                        slot.span,
                    );
                }
            }
            Node::If(block) => {
                self.check_expression(&block.condition);
                self.resolve_scoped(&block.then_body);
                for branch in &block.else_ifs {
                    self.check_expression(&branch.condition);
                    self.resolve_scoped(&branch.body);
                }
                if let Some(body) = &block.else_body {
                    self.resolve_scoped(body);
                }
            }
            Node::Each(block) => {
                self.check_expression(&block.collection);
                self.scopes.push(Vec::new());
                self.declare_loop_binders(&block.item, block.index.as_ref());
                self.resolve_nodes(&block.body);
                self.scopes.pop();
            }
        }
    }

    fn resolve_scoped(&mut self, nodes: &[Node]) {
        self.scopes.push(Vec::new());
        self.resolve_nodes(nodes);
        self.scopes.pop();
    }

    fn resolve_element(&mut self, el: &Element) {
        // A `@for` element is repeated as a whole, so its own attributes
        // already see the loop binders.
        let scoped = match &el.directive {
            Some(ElementDirective::For(directive)) => {
                self.check_expression(&directive.collection);
                self.scopes.push(Vec::new());
                self.declare_loop_binders(&directive.item, directive.index.as_ref());
                true
            }
            Some(ElementDirective::If(directive)) => {
                self.check_expression(&directive.condition);
                false
            }
            None => false,
        };

        for attribute in &el.attributes {
            self.resolve_attribute(attribute);
        }
        self.resolve_scoped(&el.children);

        if scoped {
            self.scopes.pop();
        }
    }

    fn resolve_attribute(&mut self, attribute: &Attribute) {
        match &attribute.value {
            AttrValue::Expr(expr) => self.check_expression(expr),
            AttrValue::Event(event) => {
                for modifier in &event.modifiers {
                    if !KNOWN_MODIFIERS.contains(&modifier.as_str()) {
                        self.warning(
                            DiagnosticCode::UnknownModifier,
                            format!(
                                "Unknown event modifier '{modifier}'; expected prevent, stop or once"
                            ),
                            attribute.span,
                        );
                    }
                }
                for arg in &event.args {
                    self.check_expression(arg);
                }
            }
            AttrValue::Bind(target) => self.check_bind_target(target),
        }
    }

    fn resolve_component_ref(&mut self, r: &ComponentRef) {
        // Arguments and slot content belong to the caller's scope.
        if let Some(argument) = &r.argument {
            self.check_expression(&argument.value);
        }
        if let Some(children) = &r.children {
            self.resolve_scoped(children);
        }

        let table = self.table;
        let Some(id) = table.id_of(&r.name) else {
            self.error(
                DiagnosticCode::UndefinedComponent,
                format!("Undefined component: '{}'", r.name),
                r.span,
            );
            return;
        };

        let symbol = table.get(id);
        if symbol.kind == SymbolKind::Page {
            self.error(
                DiagnosticCode::UndefinedComponent,
                format!(
                    "Undefined component: '{}' is a page and cannot be used as a component",
                    r.name
                ),
                r.span,
            );
            return;
        }

        self.referenced[id.0] = true;
        if let Some(current) = self.current {
            let edges = &mut self.edges[current.0];
            if !edges.iter().any(|(target, _)| *target == id) {
                edges.push((id, r.span));
            }
        }

        match (&symbol.param, &r.argument) {
            (Some(param), None) => self.error(
                DiagnosticCode::ArityMismatch,
                format!(
                    "{} '{}' expects an argument for parameter '{}'",
                    capitalized(symbol.kind.label()),
                    r.name,
                    param.name
                ),
                r.span,
            ),
            (Some(param), Some(argument)) => {
                if let Some(label) = argument.label.as_ref().filter(|l| **l != param.name) {
                    self.error(
                        DiagnosticCode::ArityMismatch,
                        format!(
                            "{} '{}' has no parameter named '{label}'; expected '{}'",
                            capitalized(symbol.kind.label()),
                            r.name,
                            param.name
                        ),
                        argument.span,
                    );
                }
            }
            (None, Some(argument)) => self.warning(
                DiagnosticCode::UnexpectedArgument,
                format!(
                    "{} '{}' takes no parameter; the argument is ignored",
                    capitalized(symbol.kind.label()),
                    r.name
                ),
                argument.span,
            ),
            (None, None) => {}
        }

        if r.children.is_some() && !symbol.has_slot {
            self.error(
                DiagnosticCode::UnexpectedChildren,
                format!(
                    "{} '{}' has no '@slot' to receive child content",
                    capitalized(symbol.kind.label()),
                    r.name
                ),
                r.span,
            );
        }
    }

    // =========================================================================
    // Scopes and expressions
    // =========================================================================

    fn declare_loop_binders(&mut self, item: &Binder, index: Option<&Binder>) {
        self.declare_binder(&item.name, item.span, BinderKind::Item);
        if let Some(index) = index {
            self.declare_binder(&index.name, index.span, BinderKind::Index);
        }
    }

    /// Add a binder to the innermost scope. Shadowing an outer scope is fine;
    /// reusing a name within one scope is not.
    fn declare_binder(&mut self, name: &str, span: Span, kind: BinderKind) {
        if name == CONTEXT_ROOT {
            self.error(
                DiagnosticCode::ReservedBinder,
                "'ctx' is reserved for the context root and cannot be used as a binder name",
                span,
            );
            return;
        }

        let Some(scope) = self.scopes.last_mut() else {
            return;
        };
        if scope.iter().any(|entry| entry.name == name) {
            self.error(
                DiagnosticCode::DuplicateBinder,
                format!("Duplicate binder '{name}' in the same scope"),
                span,
            );
            return;
        }
        scope.push(ScopeEntry {
            name: name.to_string(),
            kind,
        });
    }

    fn lookup_binder(&self, name: &str) -> Option<BinderKind> {
        self.scopes
            .iter()
            .rev()
            .flat_map(|scope| scope.iter().rev())
            .find(|entry| entry.name == name)
            .map(|entry| entry.kind)
    }

    fn check_expression(&mut self, expr: &Expression) {
        match &expr.kind {
            ExprKind::String(_) | ExprKind::Number(_) | ExprKind::Boolean(_) => {}
            ExprKind::Path(path) => {
                if path.root != CONTEXT_ROOT && self.lookup_binder(&path.root).is_none() {
                    self.error(
                        DiagnosticCode::InvalidContextPath,
                        format!(
                            "Unknown name '{}' in '{}'; paths must start with 'ctx' or a variable in scope",
                            path.root,
                            path.dotted()
                        ),
                        expr.span,
                    );
                }
            }
            ExprKind::Binary { left, right, .. } => {
                self.check_expression(left);
                self.check_expression(right);
            }
            ExprKind::Not(operand) => self.check_expression(operand),
            ExprKind::Ternary {
                condition,
                consequent,
                alternate,
            } => {
                self.check_expression(condition);
                self.check_expression(consequent);
                self.check_expression(alternate);
            }
        }
    }

    /// A bind target must name a writable property: `ctx.name`, `item.title`.
    fn check_bind_target(&mut self, target: &Expression) {
        let Some(path) = target.as_path() else {
            return;
        };

        if path.root != CONTEXT_ROOT {
            match self.lookup_binder(&path.root) {
                None => {
                    self.check_expression(target);
                    return;
                }
                Some(BinderKind::Index) => {
                    self.error(
                        DiagnosticCode::InvalidContextPath,
                        format!("Cannot bind to the loop index '{}'", path.root),
                        target.span,
                    );
                    return;
                }
                Some(BinderKind::Param | BinderKind::Item) => {}
            }
        }

        if path.segments.is_empty() {
            self.error(
                DiagnosticCode::InvalidContextPath,
                format!(
                    "Bind target '{}' must be a property path such as {}.name",
                    path.root, path.root
                ),
                target.span,
            );
        }
    }

    // =========================================================================
    // Whole-program checks
    // =========================================================================

    /// Report each cycle in the component graph once, at the reference that
    /// closes it.
    fn check_cycles(&mut self) {
        #[derive(Clone, Copy, PartialEq)]
        enum Mark {
            Unvisited,
            InProgress,
            Done,
        }

        let mut marks = vec![Mark::Unvisited; self.table.len()];
        let mut found = Vec::new();

        for (start, _) in self.table.iter() {
            if marks[start.0] != Mark::Unvisited {
                continue;
            }

            // Iterative DFS: (node, next edge index), plus the current path.
            let mut stack = vec![(start, 0usize)];
            let mut path = vec![start];
            marks[start.0] = Mark::InProgress;

            while let Some((node, next)) = stack.last().copied() {
                if let Some(&(target, span)) = self.edges[node.0].get(next) {
                    if let Some(top) = stack.last_mut() {
                        top.1 += 1;
                    }
                    match marks[target.0] {
                        Mark::Unvisited => {
                            marks[target.0] = Mark::InProgress;
                            stack.push((target, 0));
                            path.push(target);
                        }
                        Mark::InProgress => {
                            let from = path.iter().position(|&n| n == target).unwrap_or(0);
                            let mut names: Vec<&str> = path[from..]
                                .iter()
                                .map(|&n| self.table.get(n).name.as_str())
                                .collect();
                            names.push(self.table.get(target).name.as_str());
                            found.push((names.join(" -> "), span));
                        }
                        Mark::Done => {}
                    }
                } else {
                    marks[node.0] = Mark::Done;
                    stack.pop();
                    path.pop();
                }
            }
        }

        for (cycle, span) in found {
            self.error(
                DiagnosticCode::CircularReference,
                format!("Circular component reference: {cycle}"),
                span,
            );
        }
    }

    fn check_usage(&mut self) {
        if self.table.pages().next().is_none() {
            self.diagnostics.push(
                Diagnostic::warning("No pages defined; nothing will be routed")
                    .with_code(DiagnosticCode::NoPages)
                    .with_location(Location {
                        line: 1,
                        column: 1,
                        length: 0,
                    }),
            );
            return;
        }

        for (id, symbol) in self.table.iter() {
            if symbol.kind.is_component() && !self.referenced[id.0] {
                let message = format!(
                    "{} '{}' is declared but never used",
                    capitalized(symbol.kind.label()),
                    symbol.name
                );
                self.warning(DiagnosticCode::UnusedComponent, message, symbol.span);
            }
        }
    }

    fn error(&mut self, code: DiagnosticCode, message: impl Into<String>, span: Span) {
        self.diagnostics
            .push(Diagnostic::error(message).with_code(code).with_span(span));
    }

    fn warning(&mut self, code: DiagnosticCode, message: impl Into<String>, span: Span) {
        self.diagnostics
            .push(Diagnostic::warning(message).with_code(code).with_span(span));
    }
}

fn capitalized(label: &str) -> String {
    let mut chars = label.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use crate::analyze;
    use htms_lexer::{Diagnostic, DiagnosticCode, Severity};
    use htms_parser::Parser;
    use pretty_assertions::assert_eq;

    fn analyze_source(source: &str) -> Vec<Diagnostic> {
        let (program, diagnostics) = Parser::parse(source);
        assert!(diagnostics.is_empty(), "parse diagnostics: {diagnostics:?}");
        analyze(&program).1
    }

    fn codes(source: &str) -> Vec<DiagnosticCode> {
        analyze_source(source).iter().filter_map(|d| d.code).collect()
    }

    // =========================================================================
    // Component references
    // =========================================================================

    #[test]
    fn test_clean_program() {
        assert_eq!(
            codes("component Hi { div { span {{ Hello }} } }\npage home \"/\" { Hi }"),
            vec![]
        );
    }

    #[test]
    fn test_undefined_component_location() {
        let diags = analyze_source("page home \"/\" {\n  div {\n    Missing\n  }\n}");
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].code, Some(DiagnosticCode::UndefinedComponent));
        assert_eq!(diags[0].message, "Undefined component: 'Missing'");
        assert_eq!(diags[0].location.line, 3);
        assert_eq!(diags[0].location.column, 5);
        assert_eq!(diags[0].location.length, 7);
    }

    #[test]
    fn test_forward_reference_is_allowed() {
        assert_eq!(codes("page home \"/\" { Later }\ncomponent Later { p }"), vec![]);
    }

    #[test]
    fn test_page_is_not_a_component() {
        assert_eq!(
            codes("page Home \"/\" { }\npage other \"/o\" { Home }"),
            vec![DiagnosticCode::UndefinedComponent]
        );
    }

    #[test]
    fn test_missing_argument_is_error() {
        let diags = analyze_source("component Card(title: string) { h2 {{ ${title} }} }\npage home \"/\" { Card }");
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].code, Some(DiagnosticCode::ArityMismatch));
        assert_eq!(diags[0].severity, Severity::Error);
        assert_eq!(
            diags[0].message,
            "Component 'Card' expects an argument for parameter 'title'"
        );
    }

    #[test]
    fn test_wrong_argument_label() {
        assert_eq!(
            codes("component Card(title: string) { }\npage home \"/\" { Card(name: \"x\") }"),
            vec![DiagnosticCode::ArityMismatch]
        );
    }

    #[test]
    fn test_surplus_argument_is_warning() {
        let diags = analyze_source("component Badge { span }\npage home \"/\" { Badge(\"new\") }");
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].code, Some(DiagnosticCode::UnexpectedArgument));
        assert_eq!(diags[0].severity, Severity::Warning);
    }

    #[test]
    fn test_children_without_slot() {
        assert_eq!(
            codes("component Badge { span }\npage home \"/\" { Badge { p } }"),
            vec![DiagnosticCode::UnexpectedChildren]
        );
    }

    #[test]
    fn test_children_with_slot() {
        assert_eq!(
            codes("component Frame { div { @slot } }\npage home \"/\" { Frame { p } }"),
            vec![]
        );
    }

    #[test]
    fn test_slot_in_page() {
        assert_eq!(
            codes("page home \"/\" { div { @slot } }"),
            vec![DiagnosticCode::MisplacedSlot]
        );
    }

    // =========================================================================
    // Paths and binders
    // =========================================================================

    #[test]
    fn test_path_must_start_at_ctx() {
        let diags = analyze_source("page home \"/\" { p {{ ${user.name} }} }");
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].code, Some(DiagnosticCode::InvalidContextPath));
        assert_eq!(
            diags[0].message,
            "Unknown name 'user' in 'user.name'; paths must start with 'ctx' or a variable in scope"
        );
    }

    #[test]
    fn test_each_binders_in_scope() {
        assert_eq!(
            codes("page home \"/\" { @each ctx.items as item, i { li [data-i: i] {{ ${item.name} }} } }"),
            vec![]
        );
    }

    #[test]
    fn test_binder_out_of_scope_after_block() {
        assert_eq!(
            codes("page home \"/\" { @each ctx.items as item { li } p {{ ${item.name} }} }"),
            vec![DiagnosticCode::InvalidContextPath]
        );
    }

    #[test]
    fn test_for_directive_binders_visible_in_own_attributes() {
        assert_eq!(
            codes("page home \"/\" { li @for(ctx.rows as row) [class: row.kind] {{ ${row.label} }} }"),
            vec![]
        );
    }

    #[test]
    fn test_component_parameter_in_scope() {
        assert_eq!(
            codes("component Card(title: string) { h2 {{ ${title} }} }\npage home \"/\" { Card(ctx.t) }"),
            vec![]
        );
    }

    #[test]
    fn test_duplicate_binder() {
        assert_eq!(
            codes("page home \"/\" { @each ctx.items as x, x { p } }"),
            vec![DiagnosticCode::DuplicateBinder]
        );
    }

    #[test]
    fn test_shadowing_outer_binder_is_allowed() {
        assert_eq!(
            codes("page home \"/\" { @each ctx.rows as x { @each x.cells as x { td {{ ${x.v} }} } } }"),
            vec![]
        );
    }

    #[test]
    fn test_ctx_binder_is_reserved() {
        assert_eq!(
            codes("page home \"/\" { @each ctx.items as ctx { p } }"),
            vec![DiagnosticCode::ReservedBinder]
        );
    }

    #[test]
    fn test_bind_targets() {
        assert_eq!(
            codes("page home \"/\" { input [bind: ctx.user.name] }"),
            vec![]
        );
        assert_eq!(
            codes("page home \"/\" { input [bind: ctx] }"),
            vec![DiagnosticCode::InvalidContextPath]
        );
        assert_eq!(
            codes("page home \"/\" { @each ctx.xs as x, i { input [bind: i] } }"),
            vec![DiagnosticCode::InvalidContextPath]
        );
        assert_eq!(
            codes("page home \"/\" { @each ctx.xs as x { input [bind: x.title] } }"),
            vec![]
        );
    }

    #[test]
    fn test_event_args_are_checked() {
        assert_eq!(
            codes("page home \"/\" { button [onClick: remove(item.id)] }"),
            vec![DiagnosticCode::InvalidContextPath]
        );
    }

    #[test]
    fn test_unknown_modifier_warns() {
        assert_eq!(
            codes("page home \"/\" { form [onSubmit.passive: save] }"),
            vec![DiagnosticCode::UnknownModifier]
        );
    }

    // =========================================================================
    // Whole program
    // =========================================================================

    #[test]
    fn test_circular_reference() {
        let diags = analyze_source(
            "component A { B }\ncomponent B { A }\npage home \"/\" { A }",
        );
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].code, Some(DiagnosticCode::CircularReference));
        assert_eq!(diags[0].message, "Circular component reference: A -> B -> A");
        assert_eq!(diags[0].location.line, 2);
    }

    #[test]
    fn test_self_reference() {
        assert_eq!(
            codes("component Tree { Tree }\npage home \"/\" { Tree }"),
            vec![DiagnosticCode::CircularReference]
        );
    }

    #[test]
    fn test_unused_component() {
        let diags = analyze_source("component Unused { p }\npage home \"/\" { }");
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].code, Some(DiagnosticCode::UnusedComponent));
        assert_eq!(diags[0].message, "Component 'Unused' is declared but never used");
    }

    #[test]
    fn test_no_pages() {
        assert_eq!(codes("component A { p }"), vec![DiagnosticCode::NoPages]);
        assert_eq!(codes(""), vec![DiagnosticCode::NoPages]);
    }

    #[test]
    fn test_all_errors_reported_in_one_pass() {
        let diags = analyze_source(
            "page a \"/\" { Missing p {{ ${nope} }} }\npage b \"/\" { Other }",
        );
        let codes: Vec<_> = diags.iter().filter_map(|d| d.code).collect();
        assert_eq!(
            codes,
            vec![
                DiagnosticCode::DuplicateRoute,
                DiagnosticCode::UndefinedComponent,
                DiagnosticCode::InvalidContextPath,
                DiagnosticCode::UndefinedComponent,
            ]
        );
    }
}
