//! Diagnostics shared by every compiler stage.
//!
//! The lexer, parser and analyzer never fail outright. Each of them appends
//! [`Diagnostic`] values to a list that the driver hands back to the caller,
//! so one compilation reports every problem it can find.

use crate::token::Span;
use serde::{Deserialize, Serialize};
use std::fmt;

/// How serious a diagnostic is. Only errors block code generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Severity {
    Error,
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
        }
    }
}

/// 1-based source position plus the length of the offending text in characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Location {
    pub line: usize,
    pub column: usize,
    pub length: usize,
}

impl From<Span> for Location {
    fn from(span: Span) -> Self {
        Self {
            line: span.line,
            column: span.column,
            length: span.len(),
        }
    }
}

/// Machine-readable classification of a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DiagnosticCode {
    LexError,
    ParseError,
    DuplicateDeclaration,
    DuplicateRoute,
    UndefinedComponent,
    ArityMismatch,
    InvalidContextPath,
    UnexpectedChildren,
    DuplicateBinder,
    ReservedBinder,
    MisplacedSlot,
    InvalidRoute,
    CircularReference,
    InvalidTemplate,
    UnexpectedArgument,
    UnknownModifier,
    UnusedComponent,
    NoPages,
}

impl DiagnosticCode {
    pub fn as_str(self) -> &'static str {
        match self {
            DiagnosticCode::LexError => "LexError",
            DiagnosticCode::ParseError => "ParseError",
            DiagnosticCode::DuplicateDeclaration => "DuplicateDeclaration",
            DiagnosticCode::DuplicateRoute => "DuplicateRoute",
            DiagnosticCode::UndefinedComponent => "UndefinedComponent",
            DiagnosticCode::ArityMismatch => "ArityMismatch",
            DiagnosticCode::InvalidContextPath => "InvalidContextPath",
            DiagnosticCode::UnexpectedChildren => "UnexpectedChildren",
            DiagnosticCode::DuplicateBinder => "DuplicateBinder",
            DiagnosticCode::ReservedBinder => "ReservedBinder",
            DiagnosticCode::MisplacedSlot => "MisplacedSlot",
            DiagnosticCode::InvalidRoute => "InvalidRoute",
            DiagnosticCode::CircularReference => "CircularReference",
            DiagnosticCode::InvalidTemplate => "InvalidTemplate",
            DiagnosticCode::UnexpectedArgument => "UnexpectedArgument",
            DiagnosticCode::UnknownModifier => "UnknownModifier",
            DiagnosticCode::UnusedComponent => "UnusedComponent",
            DiagnosticCode::NoPages => "NoPages",
        }
    }
}

impl fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single problem found in the source.
///
/// Built with [`Diagnostic::error`] or [`Diagnostic::warning`] and refined
/// with the `with_*` builders:
///
/// ```
/// use htms_lexer::{Diagnostic, DiagnosticCode, Span};
///
/// let diag = Diagnostic::error("Undefined component 'Card'")
///     .with_code(DiagnosticCode::UndefinedComponent)
///     .with_span(Span::new(10, 14, 2, 3));
/// assert_eq!(diag.location.line, 2);
/// assert_eq!(diag.location.length, 4);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("{severity} at line {}, column {}: {message}", .location.line, .location.column)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    pub location: Location,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<DiagnosticCode>,
}

impl Diagnostic {
    pub fn error(message: impl Into<String>) -> Self {
        Self::new(Severity::Error, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, message)
    }

    fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            severity,
            message: message.into(),
            location: Location::default(),
            code: None,
        }
    }

    pub fn with_code(mut self, code: DiagnosticCode) -> Self {
        self.code = Some(code);
        self
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.location = span.into();
        self
    }

    pub fn with_location(mut self, location: Location) -> Self {
        self.location = location;
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

/// True when any diagnostic in the list is an error.
pub fn has_errors(diagnostics: &[Diagnostic]) -> bool {
    diagnostics.iter().any(Diagnostic::is_error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_location_from_span() {
        let location = Location::from(Span::new(4, 9, 3, 7));
        assert_eq!(
            location,
            Location {
                line: 3,
                column: 7,
                length: 5
            }
        );
    }

    #[test]
    fn test_display() {
        let diag = Diagnostic::error("Unexpected character '#'")
            .with_code(DiagnosticCode::LexError)
            .with_span(Span::new(0, 1, 1, 1));
        assert_eq!(
            diag.to_string(),
            "error at line 1, column 1: Unexpected character '#'"
        );
    }

    #[test]
    fn test_has_errors() {
        let warning = Diagnostic::warning("No pages defined").with_code(DiagnosticCode::NoPages);
        assert!(!has_errors(&[warning.clone()]));
        assert!(has_errors(&[warning, Diagnostic::error("boom")]));
        assert!(!has_errors(&[]));
    }

    #[test]
    fn test_code_as_str_matches_display() {
        assert_eq!(DiagnosticCode::DuplicateRoute.as_str(), "DuplicateRoute");
        assert_eq!(DiagnosticCode::NoPages.to_string(), "NoPages");
    }
}
