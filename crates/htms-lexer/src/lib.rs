//! HTMS Lexer
//!
//! Tokenizes HTMS source into a stream of tokens: declaration keywords,
//! directives (`@if`, `@each`, ...), attribute and expression punctuation,
//! and `{{ ... }}` text blocks with `${expr}` interpolation.
//!
//! Also home to [`Diagnostic`], the value type every later stage reports
//! problems with.
//!
//! # Example
//!
//! ```
//! use htms_lexer::Scanner;
//!
//! let (tokens, diagnostics) = Scanner::tokenize("");
//! assert_eq!(tokens.len(), 1); // Just EOF
//! assert!(diagnostics.is_empty());
//! ```

pub mod diagnostic;
pub mod scanner;
pub mod token;

pub use diagnostic::{has_errors, Diagnostic, DiagnosticCode, Location, Severity};
pub use scanner::Scanner;
pub use token::{Span, Token, TokenKind};
