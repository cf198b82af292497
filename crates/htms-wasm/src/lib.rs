//! WASM bindings for the HTMS compiler.
//!
//! Exposes `compile()`, `check()` and `version()` to JavaScript via
//! wasm-bindgen. Results cross the boundary as plain objects shaped like
//! [`CompileResult`]: `{ success, files: [{ path, content }], diagnostics }`.

use htms_compiler::{CompileOptions, CompileResult};
use wasm_bindgen::prelude::*;

/// Compile HTMS source.
///
/// `options` may be `undefined`/`null` or a partial options object, e.g.
/// `{ output_format: "static-document", split_templates: true }`. Throws a
/// JS error only when the options object itself is malformed; compilation
/// problems are reported in `diagnostics`.
#[wasm_bindgen]
pub fn compile(source: &str, options: JsValue) -> Result<JsValue, JsError> {
    let options = parse_options(options)?;
    to_js(&htms_compiler::compile(source, &options))
}

/// Validate HTMS source without generating files.
#[wasm_bindgen]
pub fn check(source: &str) -> Result<JsValue, JsError> {
    to_js(&htms_compiler::check(source))
}

/// Get the compiler version.
#[wasm_bindgen]
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

fn parse_options(value: JsValue) -> Result<CompileOptions, JsError> {
    if value.is_undefined() || value.is_null() {
        return Ok(CompileOptions::default());
    }
    serde_wasm_bindgen::from_value(value)
        .map_err(|e| JsError::new(&format!("Invalid compile options: {e}")))
}

fn to_js(result: &CompileResult) -> Result<JsValue, JsError> {
    serde_wasm_bindgen::to_value(result).map_err(|e| JsError::new(&e.to_string()))
}
