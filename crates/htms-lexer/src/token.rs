use std::fmt;

/// A region of source text. `start`/`end` are character offsets,
/// `line`/`column` are 1-based and point at `start`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    pub line: usize,
    pub column: usize,
}

impl Span {
    pub fn new(start: usize, end: usize, line: usize, column: usize) -> Self {
        Self {
            start,
            end,
            line,
            column,
        }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Span covering `self` through `other`, positioned at `self`.
    pub fn to(self, other: Span) -> Span {
        Span::new(self.start, other.end.max(self.end), self.line, self.column)
    }
}

/// Token classification for HTMS source.
///
/// Data-carrying variants embed their value directly.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // Keywords
    Component,
    Section,
    Page,
    As,

    // Directives
    If,
    Else,
    Each,
    For,
    Slot,

    // Literals
    Identifier(String),
    String(String),
    Number(f64),
    Boolean(bool),

    // Punctuation
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    LParen,
    RParen,
    Comma,
    Colon,
    Dot,
    Question,

    // Operators
    Plus,
    EqEq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    AndAnd,
    OrOr,
    Bang,

    // Text blocks: `{{ literal ${expr} }}`
    TextOpen,
    Text(String),
    InterpolationStart,
    InterpolationEnd,
    TextClose,

    Unknown(String),
    Eof,
}

impl TokenKind {
    /// True for tokens that can begin a top-level declaration.
    pub fn starts_declaration(&self) -> bool {
        matches!(
            self,
            TokenKind::Component | TokenKind::Section | TokenKind::Page
        )
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Component => write!(f, "'component'"),
            TokenKind::Section => write!(f, "'section'"),
            TokenKind::Page => write!(f, "'page'"),
            TokenKind::As => write!(f, "'as'"),
            TokenKind::If => write!(f, "'@if'"),
            TokenKind::Else => write!(f, "'@else'"),
            TokenKind::Each => write!(f, "'@each'"),
            TokenKind::For => write!(f, "'@for'"),
            TokenKind::Slot => write!(f, "'@slot'"),
            TokenKind::Identifier(name) => write!(f, "identifier '{name}'"),
            TokenKind::String(value) => write!(f, "string \"{value}\""),
            TokenKind::Number(n) => write!(f, "number {n}"),
            TokenKind::Boolean(b) => write!(f, "'{b}'"),
            TokenKind::LBrace => write!(f, "'{{'"),
            TokenKind::RBrace => write!(f, "'}}'"),
            TokenKind::LBracket => write!(f, "'['"),
            TokenKind::RBracket => write!(f, "']'"),
            TokenKind::LParen => write!(f, "'('"),
            TokenKind::RParen => write!(f, "')'"),
            TokenKind::Comma => write!(f, "','"),
            TokenKind::Colon => write!(f, "':'"),
            TokenKind::Dot => write!(f, "'.'"),
            TokenKind::Question => write!(f, "'?'"),
            TokenKind::Plus => write!(f, "'+'"),
            TokenKind::EqEq => write!(f, "'=='"),
            TokenKind::NotEq => write!(f, "'!='"),
            TokenKind::Lt => write!(f, "'<'"),
            TokenKind::LtEq => write!(f, "'<='"),
            TokenKind::Gt => write!(f, "'>'"),
            TokenKind::GtEq => write!(f, "'>='"),
            TokenKind::AndAnd => write!(f, "'&&'"),
            TokenKind::OrOr => write!(f, "'||'"),
            TokenKind::Bang => write!(f, "'!'"),
            TokenKind::TextOpen => write!(f, "'{{{{'"),
            TokenKind::Text(_) => write!(f, "text"),
            TokenKind::InterpolationStart => write!(f, "'${{'"),
            TokenKind::InterpolationEnd => write!(f, "'}}' closing the interpolation"),
            TokenKind::TextClose => write!(f, "'}}}}'"),
            TokenKind::Unknown(text) => write!(f, "'{text}'"),
            TokenKind::Eof => write!(f, "end of input"),
        }
    }
}

/// A token produced by the HTMS lexer.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

impl Token {
    pub fn new(kind: TokenKind, span: Span) -> Self {
        Self { kind, span }
    }
}
