//! HTMS Analyzer
//!
//! Two passes over a parsed [`Program`]:
//!
//! 1. **collect** declares every component, section and page in a
//!    [`SymbolTable`] and claims page routes, reporting duplicates;
//! 2. **resolve** checks every component reference, argument, binder, slot
//!    and path expression against that table.
//!
//! Declarations are hoisted: a page may use a component declared further
//! down the file. Both passes always run to completion.

pub mod resolver;
pub mod symbols;

pub use resolver::{CONTEXT_ROOT, KNOWN_MODIFIERS};
pub use symbols::{normalize_route, ParamInfo, Symbol, SymbolId, SymbolKind, SymbolTable};

use htms_lexer::Diagnostic;
use htms_parser::Program;

/// Run both analysis passes. The returned table is complete even when
/// diagnostics were reported.
pub fn analyze(program: &Program) -> (SymbolTable, Vec<Diagnostic>) {
    let (table, mut diagnostics) = symbols::collect(program);
    let collected = diagnostics.len();
    diagnostics.extend(resolver::resolve(program, &table));

    tracing::debug!(
        symbols = table.len(),
        collection_diagnostics = collected,
        resolution_diagnostics = diagnostics.len() - collected,
        "analysis finished"
    );

    (table, diagnostics)
}
