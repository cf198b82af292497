//! HTMS Parser
//!
//! Parses the token stream from `htms-lexer` into a [`Program`] AST:
//! `component`, `section` and `page` declarations whose bodies hold elements,
//! text blocks, component references, slots and `@if`/`@each` blocks.
//!
//! Parsing is error tolerant. Problems come back as `ParseError`
//! diagnostics next to a partial AST instead of aborting.
//!
//! ```
//! use htms_parser::Parser;
//!
//! let (program, diagnostics) = Parser::parse("page home \"/\" { h1 {{ Hello }} }");
//! assert!(diagnostics.is_empty());
//! assert_eq!(program.declarations.len(), 1);
//! ```

pub mod ast;
pub mod expr_parser;
pub mod parser;

pub use ast::{Declaration, Expression, Node, Program};
pub use parser::{Parser, MAX_NESTING};
