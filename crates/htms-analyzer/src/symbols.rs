//! Symbol table and the collection pass that fills it.
//!
//! The table is an append-only arena of [`Symbol`]s plus two indexes: one by
//! declared name (components, sections and pages share a namespace) and one
//! by normalized route. It is built once and only read afterwards.

use htms_lexer::{Diagnostic, DiagnosticCode, Span};
use htms_parser::ast::{ComponentDecl, Declaration, Node, PageDecl, ParamType, Program};
use std::collections::HashMap;

/// Index of a symbol in the table's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SymbolId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolKind {
    Component,
    Section,
    Page,
}

impl SymbolKind {
    pub fn label(self) -> &'static str {
        match self {
            SymbolKind::Component => "component",
            SymbolKind::Section => "section",
            SymbolKind::Page => "page",
        }
    }

    pub fn is_component(self) -> bool {
        matches!(self, SymbolKind::Component | SymbolKind::Section)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParamInfo {
    pub name: String,
    pub ty: ParamType,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Symbol {
    pub name: String,
    pub kind: SymbolKind,
    pub param: Option<ParamInfo>,
    /// The body contains `@slot` somewhere.
    pub has_slot: bool,
    /// Location of the declared name.
    pub span: Span,
}

#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    symbols: Vec<Symbol>,
    by_name: HashMap<String, SymbolId>,
    by_route: HashMap<String, SymbolId>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a symbol. On a name collision the table is unchanged and the
    /// existing symbol's id is returned as the error.
    pub fn declare(&mut self, symbol: Symbol) -> Result<SymbolId, SymbolId> {
        if let Some(&existing) = self.by_name.get(&symbol.name) {
            return Err(existing);
        }
        let id = SymbolId(self.symbols.len());
        self.by_name.insert(symbol.name.clone(), id);
        self.symbols.push(symbol);
        Ok(id)
    }

    /// Claim a route for a page. Routes that differ only in parameter names
    /// or a trailing slash collide.
    pub fn register_route(&mut self, route: &str, page: SymbolId) -> Result<(), SymbolId> {
        let key = normalize_route(route);
        if let Some(&existing) = self.by_route.get(&key) {
            return Err(existing);
        }
        self.by_route.insert(key, page);
        Ok(())
    }

    pub fn id_of(&self, name: &str) -> Option<SymbolId> {
        self.by_name.get(name).copied()
    }

    pub fn lookup(&self, name: &str) -> Option<&Symbol> {
        self.id_of(name).map(|id| self.get(id))
    }

    pub fn get(&self, id: SymbolId) -> &Symbol {
        &self.symbols[id.0]
    }

    /// The page registered for a route, matching the way routes collide.
    pub fn page_for_route(&self, route: &str) -> Option<&Symbol> {
        self.by_route
            .get(&normalize_route(route))
            .map(|&id| self.get(id))
    }

    /// Symbols in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (SymbolId, &Symbol)> {
        self.symbols
            .iter()
            .enumerate()
            .map(|(i, symbol)| (SymbolId(i), symbol))
    }

    pub fn pages(&self) -> impl Iterator<Item = &Symbol> {
        self.symbols.iter().filter(|s| s.kind == SymbolKind::Page)
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}

/// Canonical form of a route for collision checks: `/users/:id/` and
/// `/users/:slug` both become `/users/:`.
pub fn normalize_route(route: &str) -> String {
    let segments: Vec<&str> = route
        .split('/')
        .filter(|segment| !segment.is_empty())
        .map(|segment| if segment.starts_with(':') { ":" } else { segment })
        .collect();
    format!("/{}", segments.join("/"))
}

/// Collection pass: declare every component, section and page and claim
/// every route.
pub fn collect(program: &Program) -> (SymbolTable, Vec<Diagnostic>) {
    let mut table = SymbolTable::new();
    let mut diagnostics = Vec::new();

    for declaration in &program.declarations {
        let symbol = match declaration {
            Declaration::Component(decl) => component_symbol(decl, SymbolKind::Component),
            Declaration::Section(decl) => component_symbol(decl, SymbolKind::Section),
            Declaration::Page(page) => page_symbol(page),
        };
        let kind = symbol.kind;

        let id = match table.declare(symbol) {
            Ok(id) => id,
            Err(existing) => {
                let first = table.get(existing);
                diagnostics.push(
                    Diagnostic::error(format!(
                        "Duplicate declaration: '{}' is already declared as a {} at line {}",
                        declaration.name(),
                        first.kind.label(),
                        first.span.line
                    ))
                    .with_code(DiagnosticCode::DuplicateDeclaration)
                    .with_span(declaration.name_span()),
                );
                continue;
            }
        };

        if let (SymbolKind::Page, Declaration::Page(page)) = (kind, declaration) {
            if !page.route.starts_with('/') {
                diagnostics.push(
                    Diagnostic::error(format!(
                        "Invalid route: '{}' must start with '/'",
                        page.route
                    ))
                    .with_code(DiagnosticCode::InvalidRoute)
                    .with_span(page.route_span),
                );
                continue;
            }

            if let Err(existing) = table.register_route(&page.route, id) {
                let other = table.get(existing);
                diagnostics.push(
                    Diagnostic::error(format!(
                        "Duplicate route: '{}' is already used by page '{}'",
                        page.route, other.name
                    ))
                    .with_code(DiagnosticCode::DuplicateRoute)
                    .with_span(page.route_span),
                );
            }
        }
    }

    (table, diagnostics)
}

fn component_symbol(decl: &ComponentDecl, kind: SymbolKind) -> Symbol {
    Symbol {
        name: decl.name.clone(),
        kind,
        param: decl.param.as_ref().map(|p| ParamInfo {
            name: p.name.clone(),
            ty: p.ty,
        }),
        has_slot: contains_slot(&decl.body),
        span: decl.name_span,
    }
}

fn page_symbol(page: &PageDecl) -> Symbol {
    Symbol {
        name: page.name.clone(),
        kind: SymbolKind::Page,
        param: None,
        has_slot: false,
        span: page.name_span,
    }
}

/// True when `@slot` appears anywhere in the nodes, including inside the
/// child block of a nested component reference (the slot is forwarded).
pub fn contains_slot(nodes: &[Node]) -> bool {
    nodes.iter().any(|node| match node {
        Node::Slot(_) => true,
        Node::Element(el) => contains_slot(&el.children),
        Node::ComponentRef(r) => r.children.as_deref().is_some_and(contains_slot),
        Node::If(block) => {
            contains_slot(&block.then_body)
                || block.else_ifs.iter().any(|b| contains_slot(&b.body))
                || block.else_body.as_deref().is_some_and(contains_slot)
        }
        Node::Each(block) => contains_slot(&block.body),
        Node::Text(_) => false,
    })
}
