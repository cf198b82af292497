//! Declaration and body parser for HTMS.
//!
//! Parses the token stream from `htms-lexer` into a [`Program`]. One function
//! per grammar rule; expressions are delegated to `expr_parser`.
//!
//! The parser never gives up on a file. A malformed node is reported and
//! skipped up to the next balancing `}` (or past the broken node's own block),
//! a malformed declaration header skips to the next `component`, `section` or
//! `page` keyword, and a partial [`Program`] is always returned.

use crate::ast::{
    is_void_element, Argument, AttrValue, Attribute, Binder, ComponentDecl, ComponentRef, Declaration, EachBlock,
    ElementDirective, ElseIf, Element, EventBinding, ExprKind, ForDirective, IfBlock, IfDirective,
    Node, PageDecl, Param, ParamType, Program, SlotPlaceholder, TextNode, TextSegment,
};
use htms_lexer::{Diagnostic, DiagnosticCode, Location, Scanner, Span, Token, TokenKind};
use std::collections::HashSet;

pub(crate) type PResult<T> = Result<T, Diagnostic>;

/// How many blocks and expressions may be open at once. Deeper input is
/// reported and skipped instead of growing the call stack.
pub const MAX_NESTING: usize = 128;

/// HTMS parser.
///
/// Converts a flat token stream into a [`Program`] using recursive descent,
/// collecting `ParseError` diagnostics along the way.
pub struct Parser {
    pub(crate) tokens: Vec<Token>,
    pub(crate) pos: usize,
    diagnostics: Vec<Diagnostic>,
    /// The lexer hit end of input inside a text block; unclosed-brace errors
    /// at EOF would only repeat that.
    truncated: bool,
    /// Locations of tokens the lexer already rejected.
    rejected: HashSet<Location>,
    /// Blocks and expressions currently being parsed.
    depth: usize,
}

impl Parser {
    /// Create a new parser for the given tokens.
    pub fn new(tokens: Vec<Token>) -> Self {
        let truncated = tokens
            .iter()
            .rev()
            .nth(1)
            .is_some_and(|t| t.kind == TokenKind::TextClose && t.span.is_empty());
        let rejected = tokens
            .iter()
            .filter(|t| matches!(t.kind, TokenKind::Unknown(_)))
            .map(|t| Location::from(t.span))
            .collect();
        Self {
            tokens,
            pos: 0,
            diagnostics: Vec::new(),
            truncated,
            rejected,
            depth: 0,
        }
    }

    /// Lex and parse source text. Lexer diagnostics come first.
    pub fn parse(source: &str) -> (Program, Vec<Diagnostic>) {
        let (tokens, mut diagnostics) = Scanner::tokenize(source);
        tracing::debug!(tokens = tokens.len(), diagnostics = diagnostics.len(), "lexed");
        let (program, parse_diagnostics) = Self::parse_tokens(tokens);
        diagnostics.extend(parse_diagnostics);
        (program, diagnostics)
    }

    /// Parse an already lexed token stream.
    pub fn parse_tokens(tokens: Vec<Token>) -> (Program, Vec<Diagnostic>) {
        let mut parser = Parser::new(tokens);
        let program = parser.parse_program();
        (program, parser.diagnostics)
    }

    fn parse_program(&mut self) -> Program {
        let mut declarations = Vec::new();

        while !self.is_at_end() {
            if self.peek().kind.starts_declaration() {
                match self.parse_declaration() {
                    Ok(declaration) => declarations.push(declaration),
                    Err(diagnostic) => {
                        self.report(diagnostic);
                        self.skip_to_declaration();
                    }
                }
            } else {
                let found = &self.peek().kind;
                let diagnostic = self.error(format!(
                    "Expected 'component', 'section' or 'page', found {found}"
                ));
                self.report(diagnostic);
                self.advance();
                self.skip_to_declaration();
            }
        }

        Program { declarations }
    }

    // =========================================================================
    // Declarations
    // =========================================================================

    fn parse_declaration(&mut self) -> PResult<Declaration> {
        let keyword = self.advance();

        match keyword.kind {
            TokenKind::Page => self.parse_page(keyword.span).map(Declaration::Page),
            TokenKind::Section => self
                .parse_component(keyword.span, "section")
                .map(Declaration::Section),
            _ => self
                .parse_component(keyword.span, "component")
                .map(Declaration::Component),
        }
    }

    /// `component Name(param: type) { ... }`; the keyword is already consumed.
    fn parse_component(&mut self, start: Span, kind: &str) -> PResult<ComponentDecl> {
        let (name, name_span) = self.expect_identifier(&format!("a {kind} name"))?;

        if !starts_uppercase(&name) {
            self.report(
                Self::error_at(
                    format!("{} names must start with an uppercase letter: '{name}'", capitalize(kind)),
                    name_span,
                ),
            );
        }

        let param = if self.check(&TokenKind::LParen) {
            self.parse_param()?
        } else {
            None
        };

        let body = self.parse_block()?;

        Ok(ComponentDecl {
            name,
            name_span,
            param,
            body,
            span: start.to(self.previous_span()),
        })
    }

    /// `(name: type)`. Empty parentheses declare no parameter.
    fn parse_param(&mut self) -> PResult<Option<Param>> {
        self.advance(); // consume `(`
        if self.check(&TokenKind::RParen) {
            self.advance();
            return Ok(None);
        }

        let (name, name_span) = self.expect_identifier("a parameter name")?;
        self.expect(&TokenKind::Colon, "':' after the parameter name")?;
        let (label, label_span) = self.expect_identifier("a parameter type")?;

        let ty = match ParamType::from_label(&label) {
            Some(ty) => ty,
            None => {
                self.report(Self::error_at(
                    format!("Unknown parameter type '{label}'; expected string, function or slot"),
                    label_span,
                ));
                ParamType::String
            }
        };

        if self.check(&TokenKind::Comma) {
            return Err(self.error("Components take at most one parameter"));
        }
        self.expect(&TokenKind::RParen, "')' to close the parameter list")?;

        Ok(Some(Param {
            name,
            ty,
            span: name_span.to(label_span),
        }))
    }

    /// `page name "/route" { ... }`; the keyword is already consumed.
    fn parse_page(&mut self, start: Span) -> PResult<PageDecl> {
        let (name, name_span) = self.expect_identifier("a page name")?;

        let (route, route_span) = match &self.peek().kind {
            TokenKind::String(route) => {
                let route = route.clone();
                let span = self.advance().span;
                (route, span)
            }
            other => {
                return Err(self.error(format!(
                    "Expected a route string after page '{name}', found {other}"
                )))
            }
        };

        let body = self.parse_block()?;

        Ok(PageDecl {
            name,
            name_span,
            route,
            route_span,
            body,
            span: start.to(self.previous_span()),
        })
    }

    // =========================================================================
    // Blocks and nodes
    // =========================================================================

    /// `{ Node* }`. Node-level errors are reported and skipped here, so a
    /// block only fails when its opening brace is missing or it nests too deep.
    fn parse_block(&mut self) -> PResult<Vec<Node>> {
        self.nested(Parser::parse_block_body)
    }

    fn parse_block_body(&mut self) -> PResult<Vec<Node>> {
        let open = self.expect(&TokenKind::LBrace, "'{' to open a block")?;
        let mut nodes = Vec::new();

        loop {
            match &self.peek().kind {
                TokenKind::RBrace => {
                    self.advance();
                    break;
                }
                TokenKind::Eof => {
                    if !self.truncated {
                        self.report(Self::error_at(
                            "Unclosed block: expected '}' before end of input",
                            open.span,
                        ));
                    }
                    break;
                }
                kind if kind.starts_declaration() => {
                    let diagnostic =
                        self.error(format!("Expected '}}' to close the block before {kind}"));
                    self.report(diagnostic);
                    break;
                }
                // Already reported by the lexer.
                TokenKind::Unknown(_) => {
                    self.advance();
                }
                _ => match self.parse_node() {
                    Ok(node) => nodes.push(node),
                    Err(diagnostic) => {
                        self.report(diagnostic);
                        self.recover_in_block();
                    }
                },
            }
        }

        Ok(nodes)
    }

    fn parse_node(&mut self) -> PResult<Node> {
        match &self.peek().kind {
            TokenKind::TextOpen => Ok(Node::Text(self.parse_text())),
            TokenKind::Slot => {
                let span = self.advance().span;
                Ok(Node::Slot(SlotPlaceholder { span }))
            }
            TokenKind::If => self.parse_if_block(),
            TokenKind::Each => self.parse_each_block(),
            TokenKind::Identifier(_) if self.peek_at(1).kind == TokenKind::Dot => {
                self.parse_path_text()
            }
            TokenKind::Identifier(name) if starts_uppercase(name) => self.parse_component_ref(),
            TokenKind::Identifier(_) => self.parse_element(),
            TokenKind::Else => Err(self.error("'@else' without a preceding '@if' block")),
            TokenKind::For => Err(self.error(
                "'@for' must follow an element name, e.g. li @for(ctx.items as item)",
            )),
            other => Err(self.error(format!(
                "Expected an element, component, text block or directive, found {other}"
            ))),
        }
    }

    /// `tag [attrs] @directive(...) { children }` or `tag [attrs] {{ text }}`.
    fn parse_element(&mut self) -> PResult<Node> {
        let (tag, tag_span) = self.expect_identifier("an element name")?;
        let mut attributes: Option<Vec<Attribute>> = None;
        let mut directive: Option<ElementDirective> = None;

        loop {
            match &self.peek().kind {
                TokenKind::LBracket => {
                    if attributes.is_some() {
                        return Err(self.error(format!(
                            "Element '{tag}' already has an attribute list"
                        )));
                    }
                    attributes = Some(self.parse_attribute_list()?);
                }
                TokenKind::For | TokenKind::If if self.is_element_directive(tag_span) => {
                    if directive.is_some() {
                        return Err(self.error(
                            "An element may carry only one directive; wrap it in another element to combine them",
                        ));
                    }
                    directive = Some(self.parse_element_directive()?);
                }
                _ => break,
            }
        }

        let children = match &self.peek().kind {
            // Text on a later line follows a void element instead of filling it.
            TokenKind::TextOpen
                if is_void_element(&tag) && self.peek().span.line != self.previous_span().line =>
            {
                Vec::new()
            }
            TokenKind::LBrace | TokenKind::TextOpen if is_void_element(&tag) => {
                let diagnostic = self.error(format!("Void element '{tag}' cannot have children"));
                self.report(diagnostic);
                if self.check(&TokenKind::LBrace) {
                    self.parse_block()?;
                } else {
                    self.parse_text();
                }
                Vec::new()
            }
            TokenKind::LBrace => self.parse_block()?,
            TokenKind::TextOpen => vec![Node::Text(self.parse_text())],
            _ => Vec::new(),
        };

        Ok(Node::Element(Element {
            tag,
            attributes: attributes.unwrap_or_default(),
            directive,
            children,
            span: tag_span.to(self.previous_span()),
        }))
    }

    /// `@for` always attaches to the element before it. `@if` attaches only as
    /// `@if(...)` on the element's own line; otherwise it starts a sibling block.
    fn is_element_directive(&self, tag_span: Span) -> bool {
        let token = self.peek();
        match token.kind {
            TokenKind::For => true,
            TokenKind::If => {
                token.span.line == tag_span.line && self.peek_at(1).kind == TokenKind::LParen
            }
            _ => false,
        }
    }

    fn parse_element_directive(&mut self) -> PResult<ElementDirective> {
        let keyword = self.advance();
        self.expect(&TokenKind::LParen, "'(' after the directive")?;

        if keyword.kind == TokenKind::For {
            let collection = self.parse_expression()?;
            self.expect(&TokenKind::As, "'as' after the collection")?;
            let item = self.parse_binder()?;
            let index = if self.check(&TokenKind::Comma) {
                self.advance();
                Some(self.parse_binder()?)
            } else {
                None
            };
            let close = self.expect(&TokenKind::RParen, "')' to close '@for'")?;

            Ok(ElementDirective::For(ForDirective {
                collection,
                item,
                index,
                span: keyword.span.to(close.span),
            }))
        } else {
            let condition = self.parse_expression()?;
            let close = self.expect(&TokenKind::RParen, "')' to close '@if'")?;

            Ok(ElementDirective::If(IfDirective {
                condition,
                span: keyword.span.to(close.span),
            }))
        }
    }

    /// `Name`, `Name(expr)`, `Name(label: expr)`, each with an optional child block.
    fn parse_component_ref(&mut self) -> PResult<Node> {
        let (name, span) = self.expect_identifier("a component name")?;

        let argument = if self.check(&TokenKind::LParen) {
            let open = self.advance();
            let label = match (&self.peek().kind, &self.peek_at(1).kind) {
                (TokenKind::Identifier(label), TokenKind::Colon) => {
                    let label = label.clone();
                    self.advance();
                    self.advance();
                    Some(label)
                }
                _ => None,
            };
            let value = self.parse_expression()?;
            if self.check(&TokenKind::Comma) {
                return Err(self.error(format!("Component '{name}' takes at most one argument")));
            }
            let close = self.expect(&TokenKind::RParen, "')' to close the argument")?;
            Some(Argument {
                label,
                value,
                span: open.span.to(close.span),
            })
        } else {
            None
        };

        let children = if self.check(&TokenKind::LBrace) {
            Some(self.parse_block()?)
        } else {
            None
        };

        Ok(Node::ComponentRef(ComponentRef {
            name,
            argument,
            children,
            span,
        }))
    }

    /// `@if cond { } @else if cond { } @else { }`
    fn parse_if_block(&mut self) -> PResult<Node> {
        let start = self.advance().span;
        let condition = self.parse_expression()?;
        let then_body = self.parse_block()?;
        let mut else_ifs = Vec::new();
        let mut else_body = None;

        while self.check(&TokenKind::Else) {
            let else_span = self.advance().span;
            let chained = match &self.peek().kind {
                TokenKind::If => true,
                TokenKind::Identifier(word) => word == "if",
                _ => false,
            };

            if chained {
                self.advance();
                let condition = self.parse_expression()?;
                let body = self.parse_block()?;
                else_ifs.push(ElseIf {
                    condition,
                    body,
                    span: else_span.to(self.previous_span()),
                });
            } else {
                else_body = Some(self.parse_block()?);
                break;
            }
        }

        Ok(Node::If(IfBlock {
            condition,
            then_body,
            else_ifs,
            else_body,
            span: start.to(self.previous_span()),
        }))
    }

    /// `@each collection as item, index { }`
    fn parse_each_block(&mut self) -> PResult<Node> {
        let start = self.advance().span;
        let collection = self.parse_expression()?;
        self.expect(&TokenKind::As, "'as' after the collection")?;
        let item = self.parse_binder()?;
        let index = if self.check(&TokenKind::Comma) {
            self.advance();
            Some(self.parse_binder()?)
        } else {
            None
        };
        let body = self.parse_block()?;

        Ok(Node::Each(EachBlock {
            collection,
            item,
            index,
            body,
            span: start.to(self.previous_span()),
        }))
    }

    fn parse_binder(&mut self) -> PResult<Binder> {
        let (name, span) = self.expect_identifier("a binder name")?;
        Ok(Binder { name, span })
    }

    /// A bare `ctx.user.name` in node position renders as dynamic text.
    fn parse_path_text(&mut self) -> PResult<Node> {
        let expr = self.parse_path()?;
        let span = expr.span;
        Ok(Node::Text(TextNode {
            segments: vec![TextSegment::Interpolation(expr)],
            span,
        }))
    }

    // =========================================================================
    // Text blocks
    // =========================================================================

    /// `{{ literal ${expr} literal }}`. Errors inside an interpolation are
    /// reported and the interpolation skipped; the text node survives.
    fn parse_text(&mut self) -> TextNode {
        let open = self.advance().span;
        let mut segments = Vec::new();

        loop {
            match &self.peek().kind {
                TokenKind::Text(text) => {
                    segments.push(TextSegment::Literal(text.clone()));
                    self.advance();
                }
                TokenKind::InterpolationStart => {
                    self.advance();
                    match self.parse_expression() {
                        Ok(expr) if self.check(&TokenKind::InterpolationEnd) => {
                            self.advance();
                            segments.push(TextSegment::Interpolation(expr));
                        }
                        Ok(_) => {
                            let found = &self.peek().kind;
                            let diagnostic = self
                                .error(format!("Expected '}}' to close the interpolation, found {found}"));
                            self.report(diagnostic);
                            self.skip_interpolation();
                        }
                        Err(diagnostic) => {
                            self.report(diagnostic);
                            self.skip_interpolation();
                        }
                    }
                }
                TokenKind::TextClose => {
                    self.advance();
                    break;
                }
                other => {
                    let diagnostic = self.error(format!("Unexpected {other} inside a text block"));
                    self.report(diagnostic);
                    break;
                }
            }
        }

        TextNode {
            segments: normalize_segments(segments),
            span: open.to(self.previous_span()),
        }
    }

    fn skip_interpolation(&mut self) {
        while !self.is_at_end() {
            match self.peek().kind {
                TokenKind::InterpolationEnd => {
                    self.advance();
                    return;
                }
                TokenKind::TextClose => return,
                _ => {
                    self.advance();
                }
            }
        }
    }

    // =========================================================================
    // Attributes
    // =========================================================================

    /// `[key: value, key.modifier: action(args), bind: ctx.path]`
    fn parse_attribute_list(&mut self) -> PResult<Vec<Attribute>> {
        self.advance(); // consume `[`
        let mut attributes = Vec::new();

        loop {
            if self.check(&TokenKind::RBracket) {
                self.advance();
                break;
            }

            attributes.push(self.parse_attribute()?);

            match &self.peek().kind {
                TokenKind::Comma => {
                    self.advance();
                }
                TokenKind::RBracket => {
                    self.advance();
                    break;
                }
                other => {
                    return Err(self.error(format!(
                        "Expected ',' or ']' in attribute list, found {other}"
                    )))
                }
            }
        }

        Ok(attributes)
    }

    fn parse_attribute(&mut self) -> PResult<Attribute> {
        let (key, key_span) = self.expect_name("an attribute name")?;

        let mut modifiers = Vec::new();
        while self.check(&TokenKind::Dot) {
            self.advance();
            modifiers.push(self.expect_identifier("a modifier name after '.'")?.0);
        }

        self.expect(&TokenKind::Colon, &format!("':' after attribute '{key}'"))?;

        let value = if let Some(event) = event_type(&key) {
            let (action, action_span) = self.expect_identifier("an action name")?;
            let mut args = Vec::new();
            if self.check(&TokenKind::LParen) {
                self.advance();
                if !self.check(&TokenKind::RParen) {
                    args.push(self.parse_expression()?);
                    while self.check(&TokenKind::Comma) {
                        self.advance();
                        args.push(self.parse_expression()?);
                    }
                }
                self.expect(&TokenKind::RParen, "')' to close the action arguments")?;
            }
            AttrValue::Event(EventBinding {
                event,
                modifiers,
                action,
                args,
                span: action_span.to(self.previous_span()),
            })
        } else {
            if !modifiers.is_empty() {
                return Err(Self::error_at(
                    format!("Modifiers are only allowed on event attributes such as onClick, not '{key}'"),
                    key_span,
                ));
            }
            let value = self.parse_expression()?;
            if key == "bind" {
                if !matches!(value.kind, ExprKind::Path(_)) {
                    return Err(Self::error_at(
                        "A bind target must be a path such as ctx.name",
                        value.span,
                    ));
                }
                AttrValue::Bind(value)
            } else {
                AttrValue::Expr(value)
            }
        };

        Ok(Attribute {
            key,
            value,
            span: key_span.to(self.previous_span()),
        })
    }

    // =========================================================================
    // Recovery
    // =========================================================================

    /// Skip a broken node: stop before the enclosing block's `}`, after the
    /// broken node's own `{ ... }` group, or at a declaration keyword.
    fn recover_in_block(&mut self) {
        let mut depth = 0usize;

        loop {
            match &self.peek().kind {
                TokenKind::Eof => return,
                TokenKind::RBrace if depth == 0 => return,
                TokenKind::RBrace => {
                    self.advance();
                    depth -= 1;
                    if depth == 0 {
                        return;
                    }
                }
                TokenKind::LBrace => {
                    self.advance();
                    depth += 1;
                }
                kind if depth == 0 && kind.starts_declaration() => return,
                _ => {
                    self.advance();
                }
            }
        }
    }

    /// Run `parse` one nesting level deeper. Past [`MAX_NESTING`] this fails
    /// before consuming anything, so the enclosing block's recovery skips the
    /// whole over-deep group.
    pub(crate) fn nested<T>(&mut self, parse: impl FnOnce(&mut Self) -> PResult<T>) -> PResult<T> {
        if self.depth >= MAX_NESTING {
            return Err(self.error(format!(
                "Nesting too deep: blocks and expressions may nest at most {MAX_NESTING} levels"
            )));
        }
        self.depth += 1;
        let result = parse(self);
        self.depth -= 1;
        result
    }

    fn skip_to_declaration(&mut self) {
        while !self.is_at_end() && !self.peek().kind.starts_declaration() {
            self.advance();
        }
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    pub(crate) fn peek(&self) -> &Token {
        self.peek_at(0)
    }

    pub(crate) fn peek_at(&self, offset: usize) -> &Token {
        static EOF: std::sync::LazyLock<Token> =
            std::sync::LazyLock::new(|| Token::new(TokenKind::Eof, Span::default()));
        self.tokens
            .get(self.pos + offset)
            .or_else(|| self.tokens.last())
            .unwrap_or(&EOF)
    }

    pub(crate) fn check(&self, kind: &TokenKind) -> bool {
        &self.peek().kind == kind
    }

    /// Consume the current token and return it. Never moves past `Eof`.
    pub(crate) fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if self.pos < self.tokens.len() && token.kind != TokenKind::Eof {
            self.pos += 1;
        }
        token
    }

    pub(crate) fn previous_span(&self) -> Span {
        self.pos
            .checked_sub(1)
            .and_then(|i| self.tokens.get(i))
            .map(|t| t.span)
            .unwrap_or_default()
    }

    fn is_at_end(&self) -> bool {
        self.check(&TokenKind::Eof)
    }

    pub(crate) fn expect(&mut self, kind: &TokenKind, what: &str) -> PResult<Token> {
        if self.check(kind) {
            Ok(self.advance())
        } else {
            let found = &self.peek().kind;
            Err(self.error(format!("Expected {what}, found {found}")))
        }
    }

    pub(crate) fn expect_identifier(&mut self, what: &str) -> PResult<(String, Span)> {
        if let TokenKind::Identifier(name) = &self.peek().kind {
            let name = name.clone();
            let span = self.advance().span;
            Ok((name, span))
        } else {
            let found = &self.peek().kind;
            Err(self.error(format!("Expected {what}, found {found}")))
        }
    }

    /// Like `expect_identifier`, but also accepts keywords, which are valid
    /// attribute keys and property names (`ctx.page`).
    pub(crate) fn expect_name(&mut self, what: &str) -> PResult<(String, Span)> {
        let name = match &self.peek().kind {
            TokenKind::Identifier(name) => name.clone(),
            TokenKind::Component => "component".into(),
            TokenKind::Section => "section".into(),
            TokenKind::Page => "page".into(),
            TokenKind::As => "as".into(),
            found => return Err(self.error(format!("Expected {what}, found {found}"))),
        };
        let span = self.advance().span;
        Ok((name, span))
    }

    /// A `ParseError` at the current token.
    pub(crate) fn error(&self, message: impl Into<String>) -> Diagnostic {
        Self::error_at(message, self.peek().span)
    }

    fn error_at(message: impl Into<String>, span: Span) -> Diagnostic {
        Diagnostic::error(message)
            .with_code(DiagnosticCode::ParseError)
            .with_span(span)
    }

    /// Record a diagnostic, unless it sits on a token the lexer already
    /// rejected.
    fn report(&mut self, diagnostic: Diagnostic) {
        if !self.rejected.contains(&diagnostic.location) {
            self.diagnostics.push(diagnostic);
        }
    }
}

/// `onClick` → `click`, `onKeyDown` → `keydown`. `None` for non-event keys.
fn event_type(key: &str) -> Option<String> {
    let rest = key.strip_prefix("on")?;
    if rest.chars().next()?.is_uppercase() {
        Some(rest.to_lowercase())
    } else {
        None
    }
}

fn starts_uppercase(name: &str) -> bool {
    name.chars().next().is_some_and(char::is_uppercase)
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Trim the outer whitespace of a text block, fold line breaks (and the
/// indentation around them) into single spaces, and drop empty literals.
fn normalize_segments(segments: Vec<TextSegment>) -> Vec<TextSegment> {
    let last = segments.len().saturating_sub(1);

    segments
        .into_iter()
        .enumerate()
        .filter_map(|(i, segment)| match segment {
            TextSegment::Literal(text) => {
                let mut text = fold_line_breaks(&text);
                if i == 0 {
                    text = text.trim_start().to_string();
                }
                if i == last {
                    text = text.trim_end().to_string();
                }
                (!text.is_empty()).then_some(TextSegment::Literal(text))
            }
            interpolation => Some(interpolation),
        })
        .collect()
}

fn fold_line_breaks(text: &str) -> String {
    if !text.contains('\n') {
        return text.to_string();
    }

    let mut out = String::with_capacity(text.len());
    let mut pending = String::new();
    for c in text.chars() {
        if c.is_whitespace() {
            pending.push(c);
        } else {
            if pending.contains('\n') {
                out.push(' ');
            } else {
                out.push_str(&pending);
            }
            pending.clear();
            out.push(c);
        }
    }
    if pending.contains('\n') {
        out.push(' ');
    } else {
        out.push_str(&pending);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{BinaryOp, ContextPath, Expression};
    use pretty_assertions::assert_eq;

    /// Helper: parse source that must be free of diagnostics.
    fn parse(source: &str) -> Program {
        let (program, diagnostics) = Parser::parse(source);
        assert!(diagnostics.is_empty(), "unexpected diagnostics: {diagnostics:?}");
        program
    }

    fn parse_with_errors(source: &str) -> (Program, Vec<Diagnostic>) {
        Parser::parse(source)
    }

    /// Helper: body of the only declaration.
    fn body(source: &str) -> Vec<Node> {
        let program = parse(source);
        assert_eq!(program.declarations.len(), 1);
        program.declarations[0].body().to_vec()
    }

    /// Helper: the first node of a page wrapping `inner`.
    fn first_node(inner: &str) -> Node {
        body(&format!("page home \"/\" {{ {inner} }}"))
            .into_iter()
            .next()
            .expect("page has a node")
    }

    fn element(node: Node) -> Element {
        match node {
            Node::Element(el) => el,
            other => panic!("expected element, got {other:?}"),
        }
    }

    fn path(root: &str, segments: &[&str]) -> ExprKind {
        ExprKind::Path(ContextPath {
            root: root.into(),
            segments: segments.iter().map(|s| s.to_string()).collect(),
        })
    }

    fn literal(text: &str) -> TextSegment {
        TextSegment::Literal(text.into())
    }

    // =========================================================================
    // Declarations
    // =========================================================================

    #[test]
    fn test_empty_program() {
        assert_eq!(parse("").declarations, vec![]);
    }

    #[test]
    fn test_component_page_pair() {
        let program = parse("component Hi { div { span {{ Hello }} } }\npage home \"/\" { Hi }");
        assert_eq!(program.declarations.len(), 2);

        let Declaration::Component(hi) = &program.declarations[0] else {
            panic!("expected component");
        };
        assert_eq!(hi.name, "Hi");
        assert_eq!(hi.param, None);

        let div = element(hi.body[0].clone());
        assert_eq!(div.tag, "div");
        let span = element(div.children[0].clone());
        assert_eq!(span.tag, "span");
        assert_eq!(
            span.children,
            vec![Node::Text(TextNode {
                segments: vec![literal("Hello")],
                span: Span::new(26, 37, 1, 27),
            })]
        );

        let Declaration::Page(home) = &program.declarations[1] else {
            panic!("expected page");
        };
        assert_eq!(home.name, "home");
        assert_eq!(home.route, "/");
        assert!(matches!(&home.body[0], Node::ComponentRef(r) if r.name == "Hi"));
    }

    #[test]
    fn test_section_declaration() {
        let program = parse("section Hero { h1 {{ Welcome }} }");
        assert!(matches!(&program.declarations[0], Declaration::Section(s) if s.name == "Hero"));
    }

    #[test]
    fn test_component_parameter() {
        let program = parse("component Card(title: string) { h2 {{ ${title} }} }");
        let Declaration::Component(card) = &program.declarations[0] else {
            panic!("expected component");
        };
        let param = card.param.as_ref().unwrap();
        assert_eq!(param.name, "title");
        assert_eq!(param.ty, ParamType::String);
    }

    #[test]
    fn test_parameter_types() {
        for (label, ty) in [
            ("string", ParamType::String),
            ("function", ParamType::Function),
            ("slot", ParamType::Slot),
        ] {
            let program = parse(&format!("component C(p: {label}) {{ }}"));
            let Declaration::Component(c) = &program.declarations[0] else {
                panic!("expected component");
            };
            assert_eq!(c.param.as_ref().unwrap().ty, ty);
        }
    }

    #[test]
    fn test_unknown_parameter_type() {
        let (program, diags) = parse_with_errors("component C(p: number) { }");
        assert_eq!(program.declarations.len(), 1);
        assert_eq!(diags.len(), 1);
        assert_eq!(
            diags[0].message,
            "Unknown parameter type 'number'; expected string, function or slot"
        );
        assert_eq!(diags[0].location.column, 16);
    }

    #[test]
    fn test_lowercase_component_name() {
        let (program, diags) = parse_with_errors("component card { }");
        assert_eq!(program.declarations.len(), 1);
        assert_eq!(
            diags[0].message,
            "Component names must start with an uppercase letter: 'card'"
        );
    }

    #[test]
    fn test_page_without_route() {
        let (program, diags) = parse_with_errors("page home { }\ncomponent A { }");
        assert_eq!(program.declarations.len(), 1);
        assert_eq!(program.declarations[0].name(), "A");
        assert_eq!(diags.len(), 1);
        assert_eq!(
            diags[0].message,
            "Expected a route string after page 'home', found '{'"
        );
    }

    // =========================================================================
    // Elements and attributes
    // =========================================================================

    #[test]
    fn test_element_attributes() {
        let el = element(first_node(r#"a [href: "/about", class: ctx.linkClass] {{ About }}"#));
        assert_eq!(el.tag, "a");
        assert_eq!(el.attributes.len(), 2);
        assert_eq!(el.attributes[0].key, "href");
        assert!(matches!(
            &el.attributes[0].value,
            AttrValue::Expr(Expression { kind: ExprKind::String(s), .. }) if s == "/about"
        ));
        assert!(matches!(
            &el.attributes[1].value,
            AttrValue::Expr(e) if e.kind == path("ctx", &["linkClass"])
        ));
    }

    #[test]
    fn test_trailing_comma_in_attributes() {
        let el = element(first_node(r#"img [src: "a.png", alt: "A",]"#));
        assert_eq!(el.attributes.len(), 2);
        assert!(el.children.is_empty());
    }

    #[test]
    fn test_ternary_attribute() {
        let el = element(first_node(r#"li [class: ctx.active ? "on" : "off"]"#));
        let AttrValue::Expr(expr) = &el.attributes[0].value else {
            panic!("expected expression");
        };
        assert!(matches!(expr.kind, ExprKind::Ternary { .. }));
    }

    #[test]
    fn test_event_attribute() {
        let el = element(first_node("button [onClick.prevent.once: save(ctx.user.id, 1)] {{ Save }}"));
        let AttrValue::Event(event) = &el.attributes[0].value else {
            panic!("expected event");
        };
        assert_eq!(event.event, "click");
        assert_eq!(event.modifiers, vec!["prevent".to_string(), "once".to_string()]);
        assert_eq!(event.action, "save");
        assert_eq!(event.args.len(), 2);
        assert_eq!(event.args[0].kind, path("ctx", &["user", "id"]));
    }

    #[test]
    fn test_event_without_arguments() {
        let el = element(first_node("input [onKeyDown: search]"));
        let AttrValue::Event(event) = &el.attributes[0].value else {
            panic!("expected event");
        };
        assert_eq!(event.event, "keydown");
        assert!(event.args.is_empty());
    }

    #[test]
    fn test_bind_attribute() {
        let el = element(first_node("input [bind: ctx.user.name]"));
        assert!(matches!(
            &el.attributes[0].value,
            AttrValue::Bind(e) if e.kind == path("ctx", &["user", "name"])
        ));
    }

    #[test]
    fn test_bind_requires_path() {
        let (_, diags) = parse_with_errors("page home \"/\" { input [bind: \"x\"] }");
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].message, "A bind target must be a path such as ctx.name");
    }

    #[test]
    fn test_modifier_on_plain_attribute() {
        let (_, diags) = parse_with_errors("page home \"/\" { div [class.x: \"a\"] }");
        assert_eq!(diags.len(), 1);
        assert!(diags[0].message.starts_with("Modifiers are only allowed"));
    }

    #[test]
    fn test_keyword_attribute_key() {
        let el = element(first_node(r#"meta [page: "x"]"#));
        assert_eq!(el.attributes[0].key, "page");
    }

    // =========================================================================
    // Element directives
    // =========================================================================

    #[test]
    fn test_for_directive() {
        let el = element(first_node("div @for(ctx.items as item) { span {{ ${item.name} }} }"));
        let Some(ElementDirective::For(directive)) = &el.directive else {
            panic!("expected for directive");
        };
        assert_eq!(directive.collection.kind, path("ctx", &["items"]));
        assert_eq!(directive.item.name, "item");
        assert_eq!(directive.index, None);
        assert_eq!(el.children.len(), 1);
    }

    #[test]
    fn test_for_directive_with_index_and_attributes() {
        let el = element(first_node(r#"li [class: "row"] @for(ctx.rows as row, i) {{ ${i} }}"#));
        assert_eq!(el.attributes.len(), 1);
        let Some(ElementDirective::For(directive)) = &el.directive else {
            panic!("expected for directive");
        };
        assert_eq!(directive.index.as_ref().unwrap().name, "i");
    }

    #[test]
    fn test_directive_before_attributes() {
        let el = element(first_node(r#"p @if(ctx.show) [class: "note"] {{ Hi }}"#));
        assert!(matches!(el.directive, Some(ElementDirective::If(_))));
        assert_eq!(el.attributes.len(), 1);
    }

    #[test]
    fn test_two_directives_rejected() {
        let (_, diags) =
            parse_with_errors("page home \"/\" { div @for(ctx.a as x) @if(x) { } span }");
        assert_eq!(diags.len(), 1);
        assert!(diags[0].message.starts_with("An element may carry only one directive"));
    }

    #[test]
    fn test_if_on_next_line_is_a_block() {
        let nodes = body("page home \"/\" {\n  br\n  @if (ctx.ok) { p }\n}");
        assert_eq!(nodes.len(), 2);
        assert!(matches!(&nodes[0], Node::Element(el) if el.directive.is_none()));
        assert!(matches!(&nodes[1], Node::If(_)));
    }

    // =========================================================================
    // Text
    // =========================================================================

    #[test]
    fn test_text_with_interpolation() {
        let Node::Text(text) = first_node("{{ Hello, ${ctx.user.name}! }}") else {
            panic!("expected text");
        };
        assert_eq!(text.segments.len(), 3);
        assert_eq!(text.segments[0], literal("Hello, "));
        assert!(matches!(
            &text.segments[1],
            TextSegment::Interpolation(e) if e.kind == path("ctx", &["user", "name"])
        ));
        assert_eq!(text.segments[2], literal("!"));
    }

    #[test]
    fn test_text_line_breaks_fold() {
        let Node::Text(text) = first_node("{{\n    Hello\n    world  \n}}") else {
            panic!("expected text");
        };
        assert_eq!(text.segments, vec![literal("Hello world")]);
    }

    #[test]
    fn test_empty_text() {
        let Node::Text(text) = first_node("{{}}") else {
            panic!("expected text");
        };
        assert!(text.segments.is_empty());
    }

    #[test]
    fn test_bare_path_text() {
        let Node::Text(text) = first_node("ctx.user.name") else {
            panic!("expected text");
        };
        assert!(matches!(
            &text.segments[0],
            TextSegment::Interpolation(e) if e.kind == path("ctx", &["user", "name"])
        ));
    }

    #[test]
    fn test_empty_interpolation_recovers() {
        let (program, diags) = parse_with_errors("page home \"/\" { p {{ a ${} b }} span }");
        assert_eq!(diags.len(), 1);
        assert_eq!(program.declarations[0].body().len(), 2);
    }

    // =========================================================================
    // Components, slots, blocks
    // =========================================================================

    #[test]
    fn test_component_ref_with_argument_and_children() {
        let Node::ComponentRef(card) = first_node("Card(ctx.title) { p {{ Body }} }") else {
            panic!("expected component ref");
        };
        let argument = card.argument.unwrap();
        assert_eq!(argument.label, None);
        assert_eq!(argument.value.kind, path("ctx", &["title"]));
        assert_eq!(card.children.unwrap().len(), 1);
        assert_eq!(card.span, Span::new(16, 20, 1, 17));
    }

    #[test]
    fn test_component_ref_labeled_argument() {
        let Node::ComponentRef(card) = first_node(r#"Card(title: "Hi")"#) else {
            panic!("expected component ref");
        };
        assert_eq!(card.argument.unwrap().label, Some("title".into()));
        assert_eq!(card.children, None);
    }

    #[test]
    fn test_slot() {
        let nodes = body("component Frame { div { @slot } }");
        let div = element(nodes[0].clone());
        assert!(matches!(div.children[0], Node::Slot(_)));
    }

    #[test]
    fn test_if_else_chain() {
        let Node::If(block) =
            first_node("@if ctx.a { p } @else if ctx.b { span } @else @if ctx.c { b } @else { i }")
        else {
            panic!("expected if block");
        };
        assert_eq!(block.condition.kind, path("ctx", &["a"]));
        assert_eq!(block.else_ifs.len(), 2);
        assert_eq!(block.else_ifs[1].condition.kind, path("ctx", &["c"]));
        assert_eq!(block.else_body.unwrap().len(), 1);
    }

    #[test]
    fn test_each_block() {
        let Node::Each(block) = first_node("@each ctx.users as user, i { li {{ ${user.name} }} }")
        else {
            panic!("expected each block");
        };
        assert_eq!(block.collection.kind, path("ctx", &["users"]));
        assert_eq!(block.item.name, "user");
        assert_eq!(block.index.unwrap().name, "i");
        assert_eq!(block.body.len(), 1);
    }

    #[test]
    fn test_comparison_condition() {
        let Node::If(block) = first_node("@if ctx.count > 0 { p }") else {
            panic!("expected if block");
        };
        assert!(matches!(block.condition.kind, ExprKind::Binary { op: BinaryOp::Gt, .. }));
    }

    // =========================================================================
    // Error recovery
    // =========================================================================

    #[test]
    fn test_malformed_attribute_keeps_siblings() {
        let (program, diags) = parse_with_errors(
            "page home \"/\" {\n  div { }\n  a [href \"/x\"] { b }\n  span\n}",
        );
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].location.line, 3);
        assert_eq!(diags[0].message, "Expected ':' after attribute 'href', found string \"/x\"");
        let tags: Vec<_> = program.declarations[0]
            .body()
            .iter()
            .map(|n| match n {
                Node::Element(el) => el.tag.clone(),
                _ => String::new(),
            })
            .collect();
        assert_eq!(tags, vec!["div".to_string(), "span".to_string()]);
    }

    #[test]
    fn test_missing_close_brace_before_next_declaration() {
        let (program, diags) = parse_with_errors("component A { div\npage home \"/\" { A }");
        assert_eq!(program.declarations.len(), 2);
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].location.line, 2);
    }

    #[test]
    fn test_stray_top_level_tokens() {
        let (program, diags) = parse_with_errors("div { }\npage home \"/\" { }");
        assert_eq!(program.declarations.len(), 1);
        assert_eq!(diags.len(), 1);
        assert_eq!(
            diags[0].message,
            "Expected 'component', 'section' or 'page', found identifier 'div'"
        );
    }

    #[test]
    fn test_unclosed_block_at_eof() {
        let (program, diags) = parse_with_errors("page home \"/\" { div");
        assert_eq!(program.declarations.len(), 1);
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].location.column, 15);
    }

    #[test]
    fn test_unterminated_text_reports_once() {
        let (_, diags) = parse_with_errors("page home \"/\" { p {{ Hello }");
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].code, Some(DiagnosticCode::LexError));
    }

    #[test]
    fn test_unknown_character_reports_once() {
        let (program, diags) = parse_with_errors("page home \"/\" { # p }");
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].code, Some(DiagnosticCode::LexError));
        assert_eq!(program.declarations[0].body().len(), 1);
    }

    #[test]
    fn test_dangling_else() {
        let (_, diags) = parse_with_errors("page home \"/\" { @else { p } }");
        assert_eq!(diags[0].message, "'@else' without a preceding '@if' block");
    }

    #[test]
    fn test_text_after_void_element_on_next_line() {
        let nodes = body("page home \"/\" { img [src: \"a.png\"]\n  {{ Caption }} }");
        assert_eq!(nodes.len(), 2);
        let Node::Element(img) = &nodes[0] else {
            panic!("expected img");
        };
        assert!(img.children.is_empty());
        assert!(matches!(nodes[1], Node::Text(_)));
    }

    #[test]
    fn test_void_element_children_rejected() {
        for source in [
            "page home \"/\" { br {{ x }} p }",
            "page home \"/\" { input [name: \"q\"] { span } p }",
            "page home \"/\" { hr\n{ span } p }",
        ] {
            let (program, diags) = parse_with_errors(source);
            assert_eq!(diags.len(), 1, "{source}");
            assert!(diags[0].message.starts_with("Void element '"), "{source}");
            let nodes = program.declarations[0].body();
            assert_eq!(nodes.len(), 2, "{source}");
            let Node::Element(void) = &nodes[0] else {
                panic!("expected the void element");
            };
            assert!(void.children.is_empty());
        }
    }

    // =========================================================================
    // Nesting limits
    // =========================================================================

    fn nested_divs(levels: usize) -> String {
        format!("{}{}", "div { ".repeat(levels), "} ".repeat(levels))
    }

    #[test]
    fn test_nesting_within_limit() {
        let source = format!("page home \"/\" {{ {} }}", nested_divs(MAX_NESTING - 1));
        let program = parse(&source);
        assert_eq!(program.declarations[0].body().len(), 1);
    }

    #[test]
    fn test_deep_nesting_is_reported_and_skipped() {
        let source = format!("page home \"/\" {{ {} p {{{{ after }}}} }}", nested_divs(5000));
        let (program, diags) = parse_with_errors(&source);
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].code, Some(DiagnosticCode::ParseError));
        assert!(diags[0].message.starts_with("Nesting too deep"));

        let body = program.declarations[0].body();
        assert_eq!(body.len(), 2);
        let Node::Element(last) = &body[1] else {
            panic!("expected the sibling after the deep group");
        };
        assert_eq!(last.tag, "p");
    }

    #[test]
    fn test_long_negation_chain_is_reported() {
        let source = format!("page home \"/\" {{ p {{{{ ${{{}ctx.flag}} }}}} }}", "!".repeat(100_000));
        let (program, diags) = parse_with_errors(&source);
        assert_eq!(diags.len(), 1);
        assert!(diags[0].message.starts_with("Nesting too deep"));
        assert_eq!(program.declarations[0].body().len(), 1);
    }

    #[test]
    fn test_deep_parentheses_are_reported() {
        let source = format!(
            "page home \"/\" {{ p [title: {}ctx.x{}] }}",
            "(".repeat(1000),
            ")".repeat(1000)
        );
        let (_, diags) = parse_with_errors(&source);
        assert!(!diags.is_empty());
        assert!(diags[0].message.starts_with("Nesting too deep"));
    }

    #[test]
    fn test_many_errors_each_reported_once() {
        let source = format!("page home \"/\" {{ {}}}", "] {} ".repeat(5000));
        let (program, diags) = parse_with_errors(&source);
        assert_eq!(diags.len(), 5000);
        assert_eq!(program.declarations.len(), 1);
    }

    #[test]
    fn test_never_panics_on_garbage() {
        for source in ["}", "{{", "[", "page", "component (", "page x \"/\" { @each }", "@", "${"] {
            let _ = Parser::parse(source);
        }
    }
}
