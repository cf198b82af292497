use crate::diagnostic::{Diagnostic, DiagnosticCode};
use crate::token::{Span, Token, TokenKind};

/// Scanner mode determines how braces and dollar signs are interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScannerMode {
    /// Declarations, elements, attributes and expressions.
    Code,
    /// Inside `{{ ... }}`: everything is literal text until `}}` or `${`.
    Text,
    /// Inside `${ ... }` within a text block: code tokens until the matching `}`.
    Interpolation,
}

/// Where a token started.
#[derive(Debug, Clone, Copy)]
struct Mark {
    pos: usize,
    line: usize,
    column: usize,
}

/// HTMS source scanner.
///
/// Tokenizes source into a flat token stream terminated by `Eof`.
/// Malformed input never aborts the scan: each problem becomes a
/// `LexError` diagnostic and, where the parser needs one, a recovery token.
///
/// - `Vec<char>` source for index-based navigation
/// - Mode-aware brace handling for text blocks and interpolation
/// - Position tracking on every token
pub struct Scanner {
    chars: Vec<char>,
    pos: usize,
    line: usize,
    column: usize,
    tokens: Vec<Token>,
    diagnostics: Vec<Diagnostic>,
    mode: ScannerMode,
    /// Unclosed `{` inside the current interpolation.
    interpolation_depth: usize,
    text_open: Option<Mark>,
    interpolation_open: Option<Mark>,
}

impl Scanner {
    /// Create a new scanner for the given source.
    pub fn new(source: &str) -> Self {
        Self {
            chars: source.chars().collect(),
            pos: 0,
            line: 1,
            column: 1,
            tokens: Vec::new(),
            diagnostics: Vec::new(),
            mode: ScannerMode::Code,
            interpolation_depth: 0,
            text_open: None,
            interpolation_open: None,
        }
    }

    /// Tokenize the entire source. Always returns a token list ending in `Eof`.
    pub fn tokenize(source: &str) -> (Vec<Token>, Vec<Diagnostic>) {
        let mut scanner = Scanner::new(source);
        scanner.scan_tokens();
        (scanner.tokens, scanner.diagnostics)
    }

    fn scan_tokens(&mut self) {
        while !self.is_at_end() {
            match self.mode {
                ScannerMode::Code | ScannerMode::Interpolation => self.scan_token(),
                ScannerMode::Text => self.scan_text(),
            }
        }
        self.close_pending_text();

        let end = self.mark();
        self.push(TokenKind::Eof, end);
    }

    /// Report unterminated text blocks and emit the tokens the parser expects.
    fn close_pending_text(&mut self) {
        match self.mode {
            ScannerMode::Code => {}
            ScannerMode::Interpolation => {
                let open = self.interpolation_open.unwrap_or_else(|| self.mark());
                self.error_at("Unterminated interpolation: missing '}'", open, 2);
                let end = self.mark();
                self.push(TokenKind::InterpolationEnd, end);
                self.push(TokenKind::TextClose, end);
            }
            ScannerMode::Text => {
                let open = self.text_open.unwrap_or_else(|| self.mark());
                self.error_at("Unterminated text block: missing '}}'", open, 2);
                let end = self.mark();
                self.push(TokenKind::TextClose, end);
            }
        }
        self.mode = ScannerMode::Code;
    }

    /// Scan the next token in code or interpolation mode.
    fn scan_token(&mut self) {
        let start = self.mark();
        let ch = self.peek();

        match ch {
            ' ' | '\t' | '\r' => self.advance(),
            '\n' => self.newline(),

            '/' if self.peek_next() == '/' => self.skip_line_comment(),
            '/' if self.peek_next() == '*' => self.skip_block_comment(),

            '"' | '\'' => self.scan_string(),
            '0'..='9' => self.scan_number(),
            '@' => self.scan_directive(),

            '{' if self.mode == ScannerMode::Code && self.peek_next() == '{' => {
                self.advance();
                self.advance();
                self.push(TokenKind::TextOpen, start);
                self.mode = ScannerMode::Text;
                self.text_open = Some(start);
            }
            '{' => {
                self.advance();
                if self.mode == ScannerMode::Interpolation {
                    self.interpolation_depth += 1;
                }
                self.push(TokenKind::LBrace, start);
            }
            '}' if self.mode == ScannerMode::Interpolation && self.interpolation_depth == 0 => {
                self.advance();
                self.push(TokenKind::InterpolationEnd, start);
                self.mode = ScannerMode::Text;
                self.interpolation_open = None;
            }
            '}' => {
                self.advance();
                self.interpolation_depth = self.interpolation_depth.saturating_sub(1);
                self.push(TokenKind::RBrace, start);
            }

            '[' => self.single(TokenKind::LBracket),
            ']' => self.single(TokenKind::RBracket),
            '(' => self.single(TokenKind::LParen),
            ')' => self.single(TokenKind::RParen),
            ',' => self.single(TokenKind::Comma),
            ':' => self.single(TokenKind::Colon),
            '.' => self.single(TokenKind::Dot),
            '?' => self.single(TokenKind::Question),
            '+' => self.single(TokenKind::Plus),

            '=' if self.peek_next() == '=' => self.double(TokenKind::EqEq),
            '!' if self.peek_next() == '=' => self.double(TokenKind::NotEq),
            '!' => self.single(TokenKind::Bang),
            '<' if self.peek_next() == '=' => self.double(TokenKind::LtEq),
            '<' => self.single(TokenKind::Lt),
            '>' if self.peek_next() == '=' => self.double(TokenKind::GtEq),
            '>' => self.single(TokenKind::Gt),
            '&' if self.peek_next() == '&' => self.double(TokenKind::AndAnd),
            '|' if self.peek_next() == '|' => self.double(TokenKind::OrOr),

            c if c.is_alphabetic() || c == '_' => self.scan_identifier(),

            _ => {
                self.advance();
                self.error_at(format!("Unexpected character '{ch}'"), start, 1);
                self.push(TokenKind::Unknown(ch.to_string()), start);
            }
        }
    }

    // --- Text blocks ---

    /// Scan literal text inside `{{ ... }}` up to the next `}}` or `${`.
    fn scan_text(&mut self) {
        let start = self.mark();
        let mut run = String::new();

        while !self.is_at_end() {
            match self.peek() {
                '}' if self.peek_next() == '}' => {
                    self.flush_text(run, start);
                    let close = self.mark();
                    self.advance();
                    self.advance();
                    self.push(TokenKind::TextClose, close);
                    self.mode = ScannerMode::Code;
                    self.text_open = None;
                    return;
                }
                '$' if self.peek_next() == '{' => {
                    self.flush_text(run, start);
                    let open = self.mark();
                    self.advance();
                    self.advance();
                    self.push(TokenKind::InterpolationStart, open);
                    self.mode = ScannerMode::Interpolation;
                    self.interpolation_depth = 0;
                    self.interpolation_open = Some(open);
                    return;
                }
                '\\' if matches!(self.peek_next(), '{' | '}' | '$' | '\\') => {
                    self.advance();
                    run.push(self.peek());
                    self.advance();
                }
                '\n' => {
                    run.push('\n');
                    self.newline();
                }
                c => {
                    run.push(c);
                    self.advance();
                }
            }
        }

        self.flush_text(run, start);
    }

    fn flush_text(&mut self, run: String, start: Mark) {
        if !run.is_empty() {
            self.push(TokenKind::Text(run), start);
        }
    }

    // --- Scanners ---

    /// Scan a string literal. Unterminated strings end at the line break.
    fn scan_string(&mut self) {
        let quote = self.peek();
        let start = self.mark();
        self.advance(); // consume opening quote

        let mut value = String::new();

        while !self.is_at_end() && self.peek() != quote && self.peek() != '\n' {
            if self.peek() == '\\' {
                self.advance(); // consume backslash
                if self.is_at_end() {
                    break;
                }
                match self.peek() {
                    'n' => value.push('\n'),
                    't' => value.push('\t'),
                    'r' => value.push('\r'),
                    '\\' => value.push('\\'),
                    c if c == quote => value.push(c),
                    c => {
                        value.push('\\');
                        value.push(c);
                    }
                }
                self.advance();
            } else {
                value.push(self.peek());
                self.advance();
            }
        }

        if self.peek() == quote && !self.is_at_end() {
            self.advance(); // consume closing quote
        } else {
            let len = self.pos - start.pos;
            self.error_at("Unterminated string", start, len);
        }

        self.push(TokenKind::String(value), start);
    }

    /// Scan an identifier or keyword. Hyphens are allowed when followed by a
    /// letter, for attribute and tag names like `aria-label` or `my-widget`.
    fn scan_identifier(&mut self) {
        let start = self.mark();
        let mut ident = String::new();
        ident.push(self.peek());
        self.advance();

        while !self.is_at_end()
            && (self.peek().is_alphanumeric()
                || self.peek() == '_'
                || (self.peek() == '-' && self.peek_next().is_alphabetic()))
        {
            ident.push(self.peek());
            self.advance();
        }

        let kind = Self::keyword_or_ident(ident);
        self.push(kind, start);
    }

    /// Scan `@if`, `@else`, `@each`, `@for` or `@slot`.
    fn scan_directive(&mut self) {
        let start = self.mark();
        self.advance(); // consume `@`

        let mut name = String::new();
        while !self.is_at_end() && self.peek().is_alphanumeric() {
            name.push(self.peek());
            self.advance();
        }

        let kind = match name.as_str() {
            "if" => TokenKind::If,
            "else" => TokenKind::Else,
            "each" => TokenKind::Each,
            "for" => TokenKind::For,
            "slot" => TokenKind::Slot,
            "" => {
                self.error_at("Expected a directive name after '@'", start, 1);
                TokenKind::Unknown("@".into())
            }
            _ => {
                self.error_at(
                    format!("Unknown directive '@{name}'"),
                    start,
                    name.chars().count() + 1,
                );
                TokenKind::Unknown(format!("@{name}"))
            }
        };
        self.push(kind, start);
    }

    /// Scan a number literal (integer or decimal).
    fn scan_number(&mut self) {
        let start = self.mark();

        while self.peek().is_ascii_digit() {
            self.advance();
        }
        if self.peek() == '.' && self.peek_next().is_ascii_digit() {
            self.advance();
            while self.peek().is_ascii_digit() {
                self.advance();
            }
        }

        let text: String = self.chars[start.pos..self.pos].iter().collect();
        match text.parse::<f64>() {
            Ok(value) => self.push(TokenKind::Number(value), start),
            Err(_) => {
                let len = self.pos - start.pos;
                self.error_at(format!("Invalid number '{text}'"), start, len);
                self.push(TokenKind::Unknown(text), start);
            }
        }
    }

    fn skip_line_comment(&mut self) {
        while !self.is_at_end() && self.peek() != '\n' {
            self.advance();
        }
    }

    fn skip_block_comment(&mut self) {
        let start = self.mark();
        self.advance();
        self.advance();

        while !self.is_at_end() {
            if self.peek() == '*' && self.peek_next() == '/' {
                self.advance();
                self.advance();
                return;
            }
            if self.peek() == '\n' {
                self.newline();
            } else {
                self.advance();
            }
        }

        self.error_at("Unterminated block comment", start, 2);
    }

    // --- Keyword detection ---

    fn keyword_or_ident(ident: String) -> TokenKind {
        match ident.as_str() {
            "component" => TokenKind::Component,
            "section" => TokenKind::Section,
            "page" => TokenKind::Page,
            "as" => TokenKind::As,
            "true" => TokenKind::Boolean(true),
            "false" => TokenKind::Boolean(false),
            _ => TokenKind::Identifier(ident),
        }
    }

    // --- Helpers ---

    fn single(&mut self, kind: TokenKind) {
        let start = self.mark();
        self.advance();
        self.push(kind, start);
    }

    fn double(&mut self, kind: TokenKind) {
        let start = self.mark();
        self.advance();
        self.advance();
        self.push(kind, start);
    }

    fn push(&mut self, kind: TokenKind, start: Mark) {
        let span = Span::new(start.pos, self.pos, start.line, start.column);
        self.tokens.push(Token::new(kind, span));
    }

    fn error_at(&mut self, message: impl Into<String>, start: Mark, len: usize) {
        let span = Span::new(start.pos, start.pos + len, start.line, start.column);
        self.diagnostics.push(
            Diagnostic::error(message)
                .with_code(DiagnosticCode::LexError)
                .with_span(span),
        );
    }

    fn mark(&self) -> Mark {
        Mark {
            pos: self.pos,
            line: self.line,
            column: self.column,
        }
    }

    fn peek(&self) -> char {
        if self.is_at_end() {
            '\0'
        } else {
            self.chars[self.pos]
        }
    }

    fn peek_next(&self) -> char {
        if self.pos + 1 >= self.chars.len() {
            '\0'
        } else {
            self.chars[self.pos + 1]
        }
    }

    fn advance(&mut self) {
        if !self.is_at_end() {
            self.pos += 1;
            self.column += 1;
        }
    }

    fn newline(&mut self) {
        self.advance();
        self.line += 1;
        self.column = 1;
    }

    fn is_at_end(&self) -> bool {
        self.pos >= self.chars.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    /// Helper: tokenize and return token kinds (ignoring spans).
    fn kinds(source: &str) -> Vec<TokenKind> {
        let (tokens, diagnostics) = Scanner::tokenize(source);
        assert!(diagnostics.is_empty(), "unexpected diagnostics: {diagnostics:?}");
        tokens.into_iter().map(|t| t.kind).collect()
    }

    /// Helper: tokenize and return only the diagnostics.
    fn errors(source: &str) -> Vec<Diagnostic> {
        Scanner::tokenize(source).1
    }

    fn ident(name: &str) -> TokenKind {
        TokenKind::Identifier(name.into())
    }

    // =========================================================================
    // Structure: empty input, whitespace, comments
    // =========================================================================

    #[test]
    fn test_empty_source() {
        assert_eq!(kinds(""), vec![TokenKind::Eof]);
    }

    #[test]
    fn test_whitespace_only() {
        assert_eq!(kinds("  \n\t\r\n "), vec![TokenKind::Eof]);
    }

    #[test]
    fn test_line_comment_is_discarded() {
        assert_eq!(kinds("// hello\ndiv"), vec![ident("div"), TokenKind::Eof]);
    }

    #[test]
    fn test_block_comment_keeps_positions() {
        let (tokens, _) = Scanner::tokenize("/* a\n b */ div");
        assert_eq!(tokens[0].kind, ident("div"));
        assert_eq!(tokens[0].span.line, 2);
        assert_eq!(tokens[0].span.column, 7);
    }

    #[test]
    fn test_unterminated_block_comment() {
        let diags = errors("div /* never closed");
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].message, "Unterminated block comment");
        assert_eq!(diags[0].location.column, 5);
    }

    // =========================================================================
    // Keywords and directives
    // =========================================================================

    #[test]
    fn test_declaration_keywords() {
        assert_eq!(
            kinds("component section page as"),
            vec![
                TokenKind::Component,
                TokenKind::Section,
                TokenKind::Page,
                TokenKind::As,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_directives() {
        assert_eq!(
            kinds("@if @else @each @for @slot"),
            vec![
                TokenKind::If,
                TokenKind::Else,
                TokenKind::Each,
                TokenKind::For,
                TokenKind::Slot,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_unknown_directive() {
        let (tokens, diags) = Scanner::tokenize("@while");
        assert_eq!(tokens[0].kind, TokenKind::Unknown("@while".into()));
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].message, "Unknown directive '@while'");
        assert_eq!(diags[0].location.length, 6);
    }

    #[test]
    fn test_keyword_prefix_is_identifier() {
        assert_eq!(kinds("pages"), vec![ident("pages"), TokenKind::Eof]);
        assert_eq!(kinds("truthy"), vec![ident("truthy"), TokenKind::Eof]);
    }

    #[test]
    fn test_booleans() {
        assert_eq!(
            kinds("true false"),
            vec![
                TokenKind::Boolean(true),
                TokenKind::Boolean(false),
                TokenKind::Eof
            ]
        );
    }

    // =========================================================================
    // Identifiers, strings, numbers
    // =========================================================================

    #[test]
    fn test_hyphenated_identifier() {
        assert_eq!(
            kinds("aria-label data-id"),
            vec![ident("aria-label"), ident("data-id"), TokenKind::Eof]
        );
    }

    #[test]
    fn test_trailing_hyphen_is_not_part_of_identifier() {
        let (tokens, diags) = Scanner::tokenize("a-");
        assert_eq!(tokens[0].kind, ident("a"));
        assert_eq!(tokens[1].kind, TokenKind::Unknown("-".into()));
        assert_eq!(diags.len(), 1);
    }

    #[test]
    fn test_string_double_and_single_quotes() {
        assert_eq!(
            kinds(r#""/users" 'home'"#),
            vec![
                TokenKind::String("/users".into()),
                TokenKind::String("home".into()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_string_escapes() {
        assert_eq!(
            kinds(r#""a\"b\n""#),
            vec![TokenKind::String("a\"b\n".into()), TokenKind::Eof]
        );
    }

    #[test]
    fn test_unterminated_string_recovers() {
        let (tokens, diags) = Scanner::tokenize("page home \"/\n{ }");
        assert_eq!(tokens[2].kind, TokenKind::String("/".into()));
        assert_eq!(tokens[3].kind, TokenKind::LBrace);
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].message, "Unterminated string");
        assert_eq!(diags[0].location.line, 1);
        assert_eq!(diags[0].location.column, 11);
    }

    #[test]
    fn test_numbers() {
        assert_eq!(
            kinds("0 42 3.5"),
            vec![
                TokenKind::Number(0.0),
                TokenKind::Number(42.0),
                TokenKind::Number(3.5),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_number_followed_by_dot() {
        assert_eq!(
            kinds("1.x"),
            vec![TokenKind::Number(1.0), TokenKind::Dot, ident("x"), TokenKind::Eof]
        );
    }

    // =========================================================================
    // Punctuation and operators
    // =========================================================================

    #[test]
    fn test_punctuation() {
        assert_eq!(
            kinds("{ } [ ] ( ) , : . ?"),
            vec![
                TokenKind::LBrace,
                TokenKind::RBrace,
                TokenKind::LBracket,
                TokenKind::RBracket,
                TokenKind::LParen,
                TokenKind::RParen,
                TokenKind::Comma,
                TokenKind::Colon,
                TokenKind::Dot,
                TokenKind::Question,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_operators() {
        assert_eq!(
            kinds("+ == != < <= > >= && || !"),
            vec![
                TokenKind::Plus,
                TokenKind::EqEq,
                TokenKind::NotEq,
                TokenKind::Lt,
                TokenKind::LtEq,
                TokenKind::Gt,
                TokenKind::GtEq,
                TokenKind::AndAnd,
                TokenKind::OrOr,
                TokenKind::Bang,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_adjacent_close_braces_outside_text() {
        assert_eq!(
            kinds("a { b { } }}"),
            vec![
                ident("a"),
                TokenKind::LBrace,
                ident("b"),
                TokenKind::LBrace,
                TokenKind::RBrace,
                TokenKind::RBrace,
                TokenKind::RBrace,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_unexpected_character() {
        let (tokens, diags) = Scanner::tokenize("div # span");
        assert_eq!(tokens[1].kind, TokenKind::Unknown("#".into()));
        assert_eq!(tokens[2].kind, ident("span"));
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].message, "Unexpected character '#'");
        assert_eq!(diags[0].code, Some(DiagnosticCode::LexError));
    }

    // =========================================================================
    // Text blocks and interpolation
    // =========================================================================

    #[test]
    fn test_text_block() {
        assert_eq!(
            kinds("{{ Hello }}"),
            vec![
                TokenKind::TextOpen,
                TokenKind::Text(" Hello ".into()),
                TokenKind::TextClose,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_empty_text_block() {
        assert_eq!(
            kinds("{{}}"),
            vec![TokenKind::TextOpen, TokenKind::TextClose, TokenKind::Eof]
        );
    }

    #[test]
    fn test_text_interpolation() {
        assert_eq!(
            kinds("{{ Hi, ${ctx.user.name}! }}"),
            vec![
                TokenKind::TextOpen,
                TokenKind::Text(" Hi, ".into()),
                TokenKind::InterpolationStart,
                ident("ctx"),
                TokenKind::Dot,
                ident("user"),
                TokenKind::Dot,
                ident("name"),
                TokenKind::InterpolationEnd,
                TokenKind::Text("! ".into()),
                TokenKind::TextClose,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_text_keeps_keywords_and_symbols_literal() {
        assert_eq!(
            kinds("{{ page for $99 {ok} @if }}"),
            vec![
                TokenKind::TextOpen,
                TokenKind::Text(" page for $99 {ok} @if ".into()),
                TokenKind::TextClose,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_text_escapes() {
        assert_eq!(
            kinds(r"{{ \${x} \}} }}"),
            vec![
                TokenKind::TextOpen,
                TokenKind::Text(" ${x} }} ".into()),
                TokenKind::TextClose,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_text_non_ascii() {
        assert_eq!(
            kinds("{{ × }}"),
            vec![
                TokenKind::TextOpen,
                TokenKind::Text(" × ".into()),
                TokenKind::TextClose,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_interpolation_with_string_and_ternary() {
        assert_eq!(
            kinds("{{${ok ? \"}\" : 'no'}}}"),
            vec![
                TokenKind::TextOpen,
                TokenKind::InterpolationStart,
                ident("ok"),
                TokenKind::Question,
                TokenKind::String("}".into()),
                TokenKind::Colon,
                TokenKind::String("no".into()),
                TokenKind::InterpolationEnd,
                TokenKind::TextClose,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_multiline_text_tracks_lines() {
        let (tokens, _) = Scanner::tokenize("{{ a\nb }} div");
        let div = tokens.iter().find(|t| t.kind == ident("div")).unwrap();
        assert_eq!(div.span.line, 2);
        assert_eq!(div.span.column, 6);
    }

    #[test]
    fn test_unterminated_text_block() {
        let (tokens, diags) = Scanner::tokenize("span {{ Hello");
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].message, "Unterminated text block: missing '}}'");
        assert_eq!(diags[0].location.column, 6);
        let kinds: Vec<_> = tokens.into_iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![
                ident("span"),
                TokenKind::TextOpen,
                TokenKind::Text(" Hello".into()),
                TokenKind::TextClose,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_unterminated_interpolation() {
        let (tokens, diags) = Scanner::tokenize("{{ ${ctx.name");
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].message, "Unterminated interpolation: missing '}'");
        let tail: Vec<_> = tokens.iter().rev().take(3).map(|t| t.kind.clone()).collect();
        assert_eq!(
            tail,
            vec![
                TokenKind::Eof,
                TokenKind::TextClose,
                TokenKind::InterpolationEnd
            ]
        );
    }

    // =========================================================================
    // Positions
    // =========================================================================

    #[test]
    fn test_span_line_column() {
        let (tokens, _) = Scanner::tokenize("page home \"/\" {\n  Hi\n}");
        let hi = &tokens[4];
        assert_eq!(hi.kind, ident("Hi"));
        assert_eq!(hi.span, Span::new(18, 20, 2, 3));
    }

    #[test]
    fn test_spans_count_characters() {
        let (tokens, _) = Scanner::tokenize("{{ é }} x");
        let x = &tokens[3];
        assert_eq!(x.kind, ident("x"));
        assert_eq!(x.span.start, 8);
        assert_eq!(x.span.column, 9);
    }

    // =========================================================================
    // Full programs
    // =========================================================================

    #[test]
    fn test_component_and_page() {
        assert_eq!(
            kinds("component Hi { div { span {{ Hello }} } }\npage home \"/\" { Hi }"),
            vec![
                TokenKind::Component,
                ident("Hi"),
                TokenKind::LBrace,
                ident("div"),
                TokenKind::LBrace,
                ident("span"),
                TokenKind::TextOpen,
                TokenKind::Text(" Hello ".into()),
                TokenKind::TextClose,
                TokenKind::RBrace,
                TokenKind::RBrace,
                TokenKind::Page,
                ident("home"),
                TokenKind::String("/".into()),
                TokenKind::LBrace,
                ident("Hi"),
                TokenKind::RBrace,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_event_attribute() {
        assert_eq!(
            kinds("button [onClick.prevent: save(item.id)]"),
            vec![
                ident("button"),
                TokenKind::LBracket,
                ident("onClick"),
                TokenKind::Dot,
                ident("prevent"),
                TokenKind::Colon,
                ident("save"),
                TokenKind::LParen,
                ident("item"),
                TokenKind::Dot,
                ident("id"),
                TokenKind::RParen,
                TokenKind::RBracket,
                TokenKind::Eof,
            ]
        );
    }
}
