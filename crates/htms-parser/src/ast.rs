//! Abstract Syntax Tree for HTMS.
//!
//! Contains the declaration-level nodes (components, sections, pages), the
//! node family that makes up a body, and the expression sub-AST used by
//! attribute values, interpolations and directives.
//!
//! Every node carries the [`Span`] of the source that produced it so later
//! stages can attach diagnostics to the right place.

use htms_lexer::Span;

// ---------------------------------------------------------------------------
// Declarations
// ---------------------------------------------------------------------------

/// A complete HTMS source document.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Program {
    pub declarations: Vec<Declaration>,
}

/// A top-level declaration.
#[derive(Debug, Clone, PartialEq)]
pub enum Declaration {
    Component(ComponentDecl),
    Section(ComponentDecl),
    Page(PageDecl),
}

impl Declaration {
    pub fn name(&self) -> &str {
        match self {
            Declaration::Component(decl) | Declaration::Section(decl) => &decl.name,
            Declaration::Page(page) => &page.name,
        }
    }

    pub fn name_span(&self) -> Span {
        match self {
            Declaration::Component(decl) | Declaration::Section(decl) => decl.name_span,
            Declaration::Page(page) => page.name_span,
        }
    }

    pub fn body(&self) -> &[Node] {
        match self {
            Declaration::Component(decl) | Declaration::Section(decl) => &decl.body,
            Declaration::Page(page) => &page.body,
        }
    }
}

/// `component Name(param: type) { ... }` or `section Name { ... }`.
#[derive(Debug, Clone, PartialEq)]
pub struct ComponentDecl {
    pub name: String,
    pub name_span: Span,
    pub param: Option<Param>,
    pub body: Vec<Node>,
    pub span: Span,
}

/// The single optional parameter of a component or section.
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: String,
    pub ty: ParamType,
    pub span: Span,
}

/// Declared parameter type label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamType {
    String,
    Function,
    Slot,
}

impl ParamType {
    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "string" => Some(ParamType::String),
            "function" => Some(ParamType::Function),
            "slot" => Some(ParamType::Slot),
            _ => None,
        }
    }
}

/// `page name "/route" { ... }`.
#[derive(Debug, Clone, PartialEq)]
pub struct PageDecl {
    pub name: String,
    pub name_span: Span,
    pub route: String,
    pub route_span: Span,
    pub body: Vec<Node>,
    pub span: Span,
}

// ---------------------------------------------------------------------------
// Body nodes
// ---------------------------------------------------------------------------

/// A node inside a declaration body.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// An element such as `div [class: "x"] { ... }`.
    Element(Element),

    /// `{{ literal ${expr} }}`, or a bare path like `ctx.user.name`.
    Text(TextNode),

    /// A capitalized name referring to a component or section.
    ComponentRef(ComponentRef),

    /// `@slot`
    Slot(SlotPlaceholder),

    /// `@if cond { } @else if cond { } @else { }`
    If(IfBlock),

    /// `@each ctx.items as item, index { }`
    Each(EachBlock),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub tag: String,
    pub attributes: Vec<Attribute>,
    pub directive: Option<ElementDirective>,
    pub children: Vec<Node>,
    pub span: Span,
}

/// HTML void elements that never have a closing tag.
pub const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source",
    "track", "wbr",
];

pub fn is_void_element(tag: &str) -> bool {
    VOID_ELEMENTS.contains(&tag)
}

/// A directive attached to a single element.
#[derive(Debug, Clone, PartialEq)]
pub enum ElementDirective {
    /// `@for(collection as item, index)`
    For(ForDirective),
    /// `@if(condition)`
    If(IfDirective),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ForDirective {
    pub collection: Expression,
    pub item: Binder,
    pub index: Option<Binder>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IfDirective {
    pub condition: Expression,
    pub span: Span,
}

/// A name introduced by `@each`/`@for`.
#[derive(Debug, Clone, PartialEq)]
pub struct Binder {
    pub name: String,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextNode {
    pub segments: Vec<TextSegment>,
    pub span: Span,
}

impl TextNode {
    /// True when the text has no interpolated parts.
    pub fn is_static(&self) -> bool {
        self.segments
            .iter()
            .all(|segment| matches!(segment, TextSegment::Literal(_)))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TextSegment {
    Literal(String),
    Interpolation(Expression),
}

/// A use of a component: `Card`, `Card(ctx.title)`, `Card(title: "x") { ... }`.
///
/// `span` covers the name token only.
#[derive(Debug, Clone, PartialEq)]
pub struct ComponentRef {
    pub name: String,
    pub argument: Option<Argument>,
    pub children: Option<Vec<Node>>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Argument {
    pub label: Option<String>,
    pub value: Expression,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SlotPlaceholder {
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IfBlock {
    pub condition: Expression,
    pub then_body: Vec<Node>,
    pub else_ifs: Vec<ElseIf>,
    pub else_body: Option<Vec<Node>>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ElseIf {
    pub condition: Expression,
    pub body: Vec<Node>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EachBlock {
    pub collection: Expression,
    pub item: Binder,
    pub index: Option<Binder>,
    pub body: Vec<Node>,
    pub span: Span,
}

// ---------------------------------------------------------------------------
// Attributes
// ---------------------------------------------------------------------------

/// `key: value` inside an element's `[...]` list.
#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    pub key: String,
    pub value: AttrValue,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    /// Literal, path, concatenation or ternary.
    Expr(Expression),
    /// `onClick.prevent: action(args)`
    Event(EventBinding),
    /// `bind: ctx.path`. Always a path expression.
    Bind(Expression),
}

/// An event handler reference. `event` is the DOM event type (`click`).
#[derive(Debug, Clone, PartialEq)]
pub struct EventBinding {
    pub event: String,
    pub modifiers: Vec<String>,
    pub action: String,
    pub args: Vec<Expression>,
    pub span: Span,
}

// ---------------------------------------------------------------------------
// Expressions
// ---------------------------------------------------------------------------

/// A complete expression node.
#[derive(Debug, Clone, PartialEq)]
pub struct Expression {
    pub kind: ExprKind,
    pub span: Span,
}

impl Expression {
    pub fn new(kind: ExprKind, span: Span) -> Self {
        Self { kind, span }
    }

    /// The path this expression consists of, if it is a bare path.
    pub fn as_path(&self) -> Option<&ContextPath> {
        match &self.kind {
            ExprKind::Path(path) => Some(path),
            _ => None,
        }
    }
}

/// Expression variants.
#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    /// `"hello"`, `'world'`
    String(String),

    /// `42`, `3.5`
    Number(f64),

    /// `true`, `false`
    Boolean(bool),

    /// `ctx.user.name`, `item`, `item.title`
    Path(ContextPath),

    /// `a + b`, `count > 0`
    Binary {
        left: Box<Expression>,
        op: BinaryOp,
        right: Box<Expression>,
    },

    /// `!active`
    Not(Box<Expression>),

    /// `cond ? a : b`
    Ternary {
        condition: Box<Expression>,
        consequent: Box<Expression>,
        alternate: Box<Expression>,
    },
}

/// A root name followed by member accesses.
#[derive(Debug, Clone, PartialEq)]
pub struct ContextPath {
    pub root: String,
    pub segments: Vec<String>,
}

impl ContextPath {
    /// Dotted form, e.g. `ctx.user.name`.
    pub fn dotted(&self) -> String {
        let mut out = self.root.clone();
        for segment in &self.segments {
            out.push('.');
            out.push_str(segment);
        }
        out
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    And,
    Or,
}

impl BinaryOp {
    pub fn as_str(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Eq => "==",
            BinaryOp::NotEq => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::LtEq => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::GtEq => ">=",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
        }
    }
}
