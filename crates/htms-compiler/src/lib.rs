//! HTMS Compiler
//!
//! Runs the whole pipeline on one source document:
//!
//! ```text
//! source → Parser::parse → analyze → (no errors?) generate → CompileResult
//! ```
//!
//! Every stage appends to one diagnostic list. Generation is skipped when
//! any error was reported; warnings never block it.

use htms_analyzer::analyze;
use htms_lexer::has_errors;
use htms_parser::Parser;
use serde::{Deserialize, Serialize};
use tracing::debug;

pub use htms_codegen::{CompileOptions, GeneratedFile, OptionsError, OutputFormat};
pub use htms_lexer::{Diagnostic, DiagnosticCode, Location, Severity};

/// Outcome of [`compile`] or [`check`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompileResult {
    /// True when no error diagnostic was reported.
    pub success: bool,
    pub files: Vec<GeneratedFile>,
    pub diagnostics: Vec<Diagnostic>,
}

impl CompileResult {
    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(|d| d.is_error())
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(|d| !d.is_error())
    }
}

/// Compile HTMS source into the files of the selected backend.
pub fn compile(source: &str, options: &CompileOptions) -> CompileResult {
    let span = tracing::debug_span!("compile", format = %options.output_format);
    let _guard = span.enter();

    let (program, mut diagnostics) = Parser::parse(source);
    debug!(
        declarations = program.declarations.len(),
        diagnostics = diagnostics.len(),
        "parsed"
    );

    let (table, semantic) = analyze(&program);
    diagnostics.extend(semantic);

    if options.output_format == OutputFormat::StaticDocument {
        if let Some(template) = &options.template_document {
            if !htms_codegen::html::has_body_tag(template) {
                diagnostics.push(
                    Diagnostic::error("Invalid template document: no <body> element found")
                        .with_code(DiagnosticCode::InvalidTemplate)
                        .with_location(Location {
                            line: 1,
                            column: 1,
                            length: 0,
                        }),
                );
            }
        }
    }

    if has_errors(&diagnostics) {
        debug!(diagnostics = diagnostics.len(), "generation skipped");
        return CompileResult {
            success: false,
            files: Vec::new(),
            diagnostics,
        };
    }

    let files = htms_codegen::generate(&program, &table, options);
    debug!(files = files.len(), diagnostics = diagnostics.len(), "compiled");

    CompileResult {
        success: true,
        files,
        diagnostics,
    }
}

/// Lex, parse and analyze without generating anything.
pub fn check(source: &str) -> CompileResult {
    let span = tracing::debug_span!("check");
    let _guard = span.enter();

    let (program, mut diagnostics) = Parser::parse(source);
    let (_, semantic) = analyze(&program);
    diagnostics.extend(semantic);
    debug!(diagnostics = diagnostics.len(), "checked");

    CompileResult {
        success: !has_errors(&diagnostics),
        files: Vec::new(),
        diagnostics,
    }
}

/// Render a diagnostic with the offending source line underlined.
///
/// ```text
/// error[UndefinedComponent]: Undefined component: 'Missing'
///   --> app.htms:1:17
///   |
/// 1 | page home "/" { Missing }
///   |                 ^^^^^^^
/// ```
pub fn render_diagnostic(diagnostic: &Diagnostic, source: &str, file_name: &str) -> String {
    let mut out = match diagnostic.code {
        Some(code) => format!(
            "{}[{code}]: {}\n",
            diagnostic.severity, diagnostic.message
        ),
        None => format!("{}: {}\n", diagnostic.severity, diagnostic.message),
    };

    let Location {
        line,
        column,
        length,
    } = diagnostic.location;
    let width = line.to_string().len();
    let pad = " ".repeat(width);
    out.push_str(&format!("{pad} --> {file_name}:{line}:{column}\n"));

    let Some(text) = line.checked_sub(1).and_then(|i| source.lines().nth(i)) else {
        return out;
    };

    let chars: Vec<char> = text.chars().collect();
    let start = column.saturating_sub(1).min(chars.len());
    // Keep tabs so the marker lines up with the source.
    let indent: String = chars[..start]
        .iter()
        .map(|&c| if c == '\t' { '\t' } else { ' ' })
        .collect();
    let carets = length.min(chars.len() - start).max(1);

    out.push_str(&format!("{pad} |\n"));
    out.push_str(&format!("{line:>width$} | {text}\n"));
    out.push_str(&format!("{pad} | {indent}{}\n", "^".repeat(carets)));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    // =========================================================================
    // Gating
    // =========================================================================

    #[test]
    fn test_warnings_do_not_block_generation() {
        let result = compile("component Unused { }\npage home \"/\" { }", &CompileOptions::default());
        assert!(result.success);
        assert_eq!(result.warnings().count(), 1);
        assert!(!result.files.is_empty());
    }

    #[test]
    fn test_errors_block_generation() {
        let result = compile("page home \"/\" { Missing }", &CompileOptions::default());
        assert!(!result.success);
        assert!(result.files.is_empty());
        assert_eq!(result.errors().count(), 1);
    }

    #[test]
    fn test_template_without_body() {
        let options = CompileOptions {
            output_format: OutputFormat::StaticDocument,
            template_document: Some("<html><head></head></html>".into()),
            ..CompileOptions::default()
        };
        let result = compile("page home \"/\" { }", &options);
        assert!(!result.success);
        assert_eq!(
            result.diagnostics[0].code,
            Some(DiagnosticCode::InvalidTemplate)
        );
    }

    #[test]
    fn test_template_ignored_by_procedural_backend() {
        let options = CompileOptions {
            template_document: Some("no body here".into()),
            ..CompileOptions::default()
        };
        assert!(compile("page home \"/\" { }", &options).success);
    }

    #[test]
    fn test_check_never_generates() {
        let result = check("component Hi { }\npage home \"/\" { Hi }");
        assert!(result.success);
        assert!(result.files.is_empty());
        assert!(result.diagnostics.is_empty());
    }

    // =========================================================================
    // Rendering
    // =========================================================================

    #[test]
    fn test_render_diagnostic() {
        let source = "page home \"/\" { Missing }";
        let result = check(source);
        assert_eq!(
            render_diagnostic(&result.diagnostics[0], source, "app.htms"),
            "error[UndefinedComponent]: Undefined component: 'Missing'
  --> app.htms:1:17
  |
1 | page home \"/\" { Missing }
  |                 ^^^^^^^
"
        );
    }

    #[test]
    fn test_render_diagnostic_keeps_tabs() {
        let source = "page home \"/\" {\n\tMissing\n}";
        let result = check(source);
        let rendered = render_diagnostic(&result.diagnostics[0], source, "app.htms");
        assert!(rendered.ends_with("2 | \tMissing\n  | \t^^^^^^^\n"));
    }

    #[test]
    fn test_render_zero_length_location() {
        let diagnostic = Diagnostic::warning("No pages declared").with_location(Location {
            line: 1,
            column: 1,
            length: 0,
        });
        assert_eq!(
            render_diagnostic(&diagnostic, "component A { }", "a.htms"),
            "warning: No pages declared
  --> a.htms:1:1
  |
1 | component A { }
  | ^
"
        );
    }

    #[test]
    fn test_render_location_past_end_of_source() {
        let diagnostic = Diagnostic::error("Unexpected end of input").with_location(Location {
            line: 9,
            column: 1,
            length: 1,
        });
        assert_eq!(
            render_diagnostic(&diagnostic, "page a \"/\" {", "a.htms"),
            "error: Unexpected end of input\n  --> a.htms:9:1\n"
        );
    }
}
