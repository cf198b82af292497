//! HTMS Code Generator
//!
//! Lowers an analyzed [`Program`] to one of two targets:
//!
//! ```text
//! Program + SymbolTable → generate() → Vec<GeneratedFile>
//!   Procedural      runtime.ts, components/*.ts, sections/*.ts, pages/*.ts,
//!                   router.ts, events.ts
//!   StaticDocument  index.html (+ pages/*.html in split mode)
//! ```
//!
//! Generation only runs on programs without error diagnostics, so it never
//! fails. Output is a pure function of its inputs: every collection that
//! reaches the emitted text is ordered.

pub mod events;
pub mod expr;
pub mod html;
pub mod procedural;
pub mod router;

use htms_analyzer::SymbolTable;
use htms_parser::ast::{AttrValue, Declaration, Node};
use htms_parser::Program;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::str::FromStr;

// =========================================================================
// Options and output
// =========================================================================

/// Which backend to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OutputFormat {
    /// Typed TypeScript render functions.
    #[default]
    Procedural,
    /// One HTML document with an embedded hash router.
    StaticDocument,
}

impl OutputFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            OutputFormat::Procedural => "procedural",
            OutputFormat::StaticDocument => "static-document",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rejected option value.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum OptionsError {
    #[error("unknown output format '{0}' (expected 'procedural' or 'static-document')")]
    UnknownFormat(String),
}

impl FromStr for OutputFormat {
    type Err = OptionsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "procedural" => Ok(OutputFormat::Procedural),
            "static-document" | "static" | "html" => Ok(OutputFormat::StaticDocument),
            other => Err(OptionsError::UnknownFormat(other.to_string())),
        }
    }
}

/// Compilation options. Missing fields take their defaults when
/// deserialized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct CompileOptions {
    pub output_format: OutputFormat,
    pub generate_router: bool,
    pub generate_events: bool,
    /// Host document for the static backend; content goes after `<body>`.
    pub template_document: Option<String>,
    /// File name of the static document. Defaults to `index.html`.
    pub output_document_name: Option<String>,
    /// Static backend: one fetched fragment per page instead of inline
    /// `<template>`s.
    pub split_templates: bool,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            output_format: OutputFormat::Procedural,
            generate_router: true,
            generate_events: true,
            template_document: None,
            output_document_name: None,
            split_templates: false,
        }
    }
}

/// One emitted artifact, `path` relative to the output root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedFile {
    pub path: String,
    pub content: String,
}

impl GeneratedFile {
    pub fn new(path: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
        }
    }
}

/// Run the selected backend.
pub fn generate(
    program: &Program,
    table: &SymbolTable,
    options: &CompileOptions,
) -> Vec<GeneratedFile> {
    let files = match options.output_format {
        OutputFormat::Procedural => procedural::generate(program, table, options),
        OutputFormat::StaticDocument => html::generate(program, table, options),
    };

    tracing::debug!(
        format = %options.output_format,
        files = files.len(),
        "code generation finished"
    );

    files
}

// =========================================================================
// Naming
// =========================================================================

/// File stem and render function name of every declaration, deduplicated
/// in declaration order so two names that fold to the same stem still get
/// distinct files.
#[derive(Debug, Default)]
pub(crate) struct Naming {
    entries: HashMap<String, DeclNames>,
}

#[derive(Debug, Clone)]
pub(crate) struct DeclNames {
    /// `components/nav-bar`, without extension.
    pub module: String,
    /// `renderNavBar`, `renderHomePage`.
    pub function: String,
}

impl Naming {
    pub fn new(program: &Program) -> Self {
        let mut entries = HashMap::new();
        let mut used_modules = BTreeSet::new();
        let mut used_functions = BTreeSet::new();

        for declaration in &program.declarations {
            if entries.contains_key(declaration.name()) {
                continue;
            }
            let dir = match declaration {
                Declaration::Component(_) => "components",
                Declaration::Section(_) => "sections",
                Declaration::Page(_) => "pages",
            };
            let suffix = if matches!(declaration, Declaration::Page(_)) {
                "Page"
            } else {
                ""
            };

            let module = unique(
                &mut used_modules,
                format!("{dir}/{}", kebab_case(declaration.name())),
                "-",
            );
            let function = unique(
                &mut used_functions,
                format!("render{}{suffix}", pascal_case(declaration.name())),
                "_",
            );
            entries.insert(
                declaration.name().to_string(),
                DeclNames { module, function },
            );
        }

        Self { entries }
    }

    pub fn get(&self, name: &str) -> Option<&DeclNames> {
        self.entries.get(name)
    }
}

fn unique(used: &mut BTreeSet<String>, base: String, separator: &str) -> String {
    let mut candidate = base.clone();
    let mut n = 2;
    while used.contains(&candidate) {
        candidate = format!("{base}{separator}{n}");
        n += 1;
    }
    used.insert(candidate.clone());
    candidate
}

/// `NavBar` → `nav-bar`, `user_list` → `user-list`.
pub fn kebab_case(name: &str) -> String {
    let mut out = String::new();
    let mut prev_lower = false;
    for c in name.chars() {
        if c == '_' || c == '-' {
            if !out.is_empty() && !out.ends_with('-') {
                out.push('-');
            }
            prev_lower = false;
        } else if c.is_uppercase() {
            if prev_lower {
                out.push('-');
            }
            out.extend(c.to_lowercase());
            prev_lower = false;
        } else {
            out.push(c);
            prev_lower = c.is_lowercase() || c.is_ascii_digit();
        }
    }
    out
}

/// `nav-bar` → `NavBar`, `home` → `Home`.
pub fn pascal_case(name: &str) -> String {
    name.split(['-', '_'])
        .filter(|part| !part.is_empty())
        .map(upper_first)
        .collect()
}

/// `user-list` → `User List`.
pub fn title_case(name: &str) -> String {
    kebab_case(name)
        .split('-')
        .filter(|part| !part.is_empty())
        .map(upper_first)
        .collect::<Vec<_>>()
        .join(" ")
}

fn upper_first(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

// =========================================================================
// JavaScript text helpers
// =========================================================================

/// Words a generated local may not use.
const JS_RESERVED: &[&str] = &[
    "arguments", "await", "break", "case", "catch", "class", "const", "continue", "debugger",
    "default", "delete", "do", "document", "else", "enum", "eval", "export", "extends", "false",
    "finally", "for", "function", "if", "implements", "import", "in", "instanceof", "interface",
    "let", "new", "null", "package", "private", "protected", "public", "return", "static",
    "super", "switch", "this", "throw", "true", "try", "typeof", "undefined", "var", "void",
    "while", "window", "with", "yield",
];

/// Names the generated code itself binds inside render functions.
const GENERATED_NAMES: &[&str] = &[
    "ctx", "slot", "root", "text", "list", "setAttr", "setPath", "onEvent", "event", "s", "el",
];

/// A JavaScript identifier for a source-level binder or parameter name.
///
/// Hyphens become underscores. Names that would shadow a keyword, a runtime
/// helper, a render function or an element local (`div0`) get a trailing
/// underscore; element locals never end in one.
pub fn js_local(name: &str) -> String {
    let ident: String = name
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '_' || c == '$' { c } else { '_' })
        .collect();

    let looks_generated = ident.starts_with("render")
        || ident.starts_with("host")
        || ident.ends_with(|c: char| c.is_ascii_digit());
    if looks_generated || JS_RESERVED.contains(&ident.as_str()) || GENERATED_NAMES.contains(&ident.as_str())
    {
        format!("{ident}_")
    } else {
        ident
    }
}

/// Whether `name` can follow a `.` in a member access.
pub fn is_plain_property(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_alphabetic() || c == '_' || c == '$')
        && chars.all(|c| c.is_alphanumeric() || c == '_' || c == '$')
}

/// Single-quoted JavaScript string literal.
///
/// `<` is escaped so the literal is also safe inside an inline `<script>`.
pub fn js_string(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('\'');
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '<' => out.push_str("\\x3C"),
            '\u{2028}' => out.push_str("\\u2028"),
            '\u{2029}' => out.push_str("\\u2029"),
            _ => out.push(c),
        }
    }
    out.push('\'');
    out
}

/// `['a', 'b']`
pub fn js_string_array<S: AsRef<str>>(items: &[S]) -> String {
    let parts: Vec<String> = items.iter().map(|item| js_string(item.as_ref())).collect();
    format!("[{}]", parts.join(", "))
}

/// Format a number, removing `.0` for integers.
pub fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.is_finite() && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}

// =========================================================================
// Markup helpers
// =========================================================================

pub use htms_parser::ast::{is_void_element, VOID_ELEMENTS};

/// Escape text content.
pub fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Escape a double-quoted attribute value.
pub fn escape_attr(s: &str) -> String {
    escape_html(s).replace('"', "&quot;")
}

// =========================================================================
// Program queries
// =========================================================================

/// Every event binding as `(action, event type)`, in source order.
pub(crate) fn event_bindings(program: &Program) -> Vec<(String, String)> {
    let mut found = Vec::new();
    for declaration in &program.declarations {
        collect_events(declaration.body(), &mut found);
    }
    found
}

fn collect_events(nodes: &[Node], found: &mut Vec<(String, String)>) {
    for node in nodes {
        match node {
            Node::Element(el) => {
                for attr in &el.attributes {
                    if let AttrValue::Event(binding) = &attr.value {
                        found.push((binding.action.clone(), binding.event.clone()));
                    }
                }
                collect_events(&el.children, found);
            }
            Node::ComponentRef(r) => {
                if let Some(children) = &r.children {
                    collect_events(children, found);
                }
            }
            Node::If(block) => {
                collect_events(&block.then_body, found);
                for branch in &block.else_ifs {
                    collect_events(&branch.body, found);
                }
                if let Some(body) = &block.else_body {
                    collect_events(body, found);
                }
            }
            Node::Each(block) => collect_events(&block.body, found),
            Node::Text(_) | Node::Slot(_) => {}
        }
    }
}
