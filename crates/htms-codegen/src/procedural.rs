//! Procedural backend.
//!
//! Every component, section and page becomes a TypeScript module exporting
//! one render function that builds a `DocumentFragment` with plain DOM calls.
//! Directives lower to `if`/`else if`/`else` and `list(x).forEach(...)`;
//! component references become calls, with child content passed as a slot
//! callback.

use crate::expr;
use crate::{events, js_local, js_string, router, CompileOptions, GeneratedFile, Naming};
use htms_analyzer::{SymbolTable, CONTEXT_ROOT};
use htms_parser::ast::{
    AttrValue, Attribute, ComponentRef, Declaration, EachBlock, Element, ElementDirective,
    ExprKind, Expression, IfBlock, Node, ParamType, TextNode,
};
use htms_parser::Program;
use std::collections::BTreeSet;

/// Banner on top of every generated module.
pub const HEADER: &str = "// Generated by htms. Do not edit.\n";

/// Shared helpers imported by the render modules.
pub const RUNTIME: &str = r#"// Generated by htms. Do not edit.

/** Runtime state handed to every render function. */
export type Context = Record<string, any>;

/** Renders the child content passed to a component into `parent`. */
export type SlotFn = (parent: Node) => void;

/** Deferred event arguments, per element and event type. */
export const eventArgs = new WeakMap<Element, Record<string, () => unknown[]>>();

export function text(value: unknown): string {
  return value === null || value === undefined ? '' : String(value);
}

export function list(value: unknown): any[] {
  return Array.isArray(value) ? value : [];
}

export function setAttr(el: Element, name: string, value: unknown): void {
  if (value === false || value === null || value === undefined) {
    el.removeAttribute(name);
  } else {
    el.setAttribute(name, value === true ? '' : String(value));
  }
}

export function setPath(target: any, path: string[], value: unknown): void {
  if (target === null || typeof target !== 'object' || path.length === 0) return;
  let cursor = target;
  for (const key of path.slice(0, -1)) {
    if (cursor[key] === null || typeof cursor[key] !== 'object') cursor[key] = {};
    cursor = cursor[key];
  }
  cursor[path[path.length - 1]] = value;
}

/** Mark `el` as the source of `action` for `type` events. */
export function onEvent(
  el: Element,
  type: string,
  action: string,
  modifiers: string[],
  args: () => unknown[],
): void {
  el.setAttribute(`data-on-${type}`, action);
  if (modifiers.length > 0) {
    el.setAttribute(`data-on-${type}-modifiers`, modifiers.join(' '));
  }
  const table = eventArgs.get(el) ?? {};
  table[type] = args;
  eventArgs.set(el, table);
}
"#;

pub fn generate(
    program: &Program,
    table: &SymbolTable,
    options: &CompileOptions,
) -> Vec<GeneratedFile> {
    let naming = Naming::new(program);
    let mut files = vec![GeneratedFile::new("runtime.ts", RUNTIME)];

    for declaration in &program.declarations {
        if let Some(file) = render_module(declaration, table, &naming) {
            files.push(file);
        }
    }

    if options.generate_router {
        files.push(router::procedural(program, &naming));
    }

    let bindings = crate::event_bindings(program);
    if options.generate_events && !bindings.is_empty() {
        files.push(events::generate(&bindings));
    }

    files
}

/// TypeScript type of a declared parameter.
fn param_type(ty: ParamType) -> &'static str {
    match ty {
        ParamType::String => "string",
        ParamType::Function => "(...args: any[]) => unknown",
        ParamType::Slot => "Node",
    }
}

fn render_module(
    declaration: &Declaration,
    table: &SymbolTable,
    naming: &Naming,
) -> Option<GeneratedFile> {
    let names = naming.get(declaration.name())?;
    let symbol = table.lookup(declaration.name())?;

    let mut writer = ModuleWriter::new(table, naming);
    let mut params = vec!["ctx: Context".to_string()];

    if let Some(param) = &symbol.param {
        let local = js_local(&param.name);
        params.push(format!("{local}: {}", param_type(param.ty)));
        writer.scope.push((param.name.clone(), local));
    }
    if symbol.has_slot {
        params.push("slot?: SlotFn".to_string());
    }

    writer.indent = 1;
    writer.line("const root = document.createDocumentFragment();");
    writer.nodes(declaration.body(), "root");
    writer.line("return root;");

    let mut content = String::from(HEADER);
    if !writer.helpers.is_empty() {
        let helpers: Vec<&str> = writer.helpers.iter().copied().collect();
        content.push_str(&format!(
            "import {{ {} }} from '../runtime';\n",
            helpers.join(", ")
        ));
    }
    if symbol.has_slot {
        content.push_str("import type { Context, SlotFn } from '../runtime';\n");
    } else {
        content.push_str("import type { Context } from '../runtime';\n");
    }
    for (module, function) in &writer.imports {
        content.push_str(&format!("import {{ {function} }} from '../{module}';\n"));
    }

    content.push_str(&format!(
        "\nexport function {}({}): DocumentFragment {{\n",
        names.function,
        params.join(", ")
    ));
    content.push_str(&writer.out);
    content.push_str("}\n");

    Some(GeneratedFile::new(format!("{}.ts", names.module), content))
}

/// Emits the body of one render function and records what it imports.
struct ModuleWriter<'a> {
    table: &'a SymbolTable,
    naming: &'a Naming,
    out: String,
    indent: usize,
    /// Numbers element locals and slot hosts.
    counter: usize,
    /// Source name → TypeScript local, innermost last.
    scope: Vec<(String, String)>,
    helpers: BTreeSet<&'static str>,
    /// `(module, function)` of referenced components.
    imports: BTreeSet<(String, String)>,
}

impl<'a> ModuleWriter<'a> {
    fn new(table: &'a SymbolTable, naming: &'a Naming) -> Self {
        Self {
            table,
            naming,
            out: String::new(),
            indent: 0,
            counter: 0,
            scope: Vec::new(),
            helpers: BTreeSet::new(),
            imports: BTreeSet::new(),
        }
    }

    fn line(&mut self, text: impl AsRef<str>) {
        for _ in 0..self.indent {
            self.out.push_str("  ");
        }
        self.out.push_str(text.as_ref());
        self.out.push('\n');
    }

    fn root(&self, name: &str) -> String {
        if name == CONTEXT_ROOT {
            return "ctx".to_string();
        }
        self.scope
            .iter()
            .rev()
            .find(|(source, _)| source == name)
            .map(|(_, local)| local.clone())
            .unwrap_or_else(|| js_local(name))
    }

    fn js(&self, expr: &Expression) -> String {
        expr::to_js(expr, &|root| self.root(root))
    }

    /// `div0`, `myCard3`
    fn fresh(&mut self, tag: &str) -> String {
        let mut base = String::new();
        let mut upper = false;
        for c in tag.chars() {
            if c.is_alphanumeric() {
                if upper {
                    base.extend(c.to_uppercase());
                } else {
                    base.push(c);
                }
                upper = false;
            } else {
                upper = !base.is_empty();
            }
        }
        if !base.starts_with(|c: char| c.is_alphabetic()) {
            base.insert_str(0, "el");
        }
        let name = format!("{base}{}", self.counter);
        self.counter += 1;
        name
    }

    // =====================================================================
    // Nodes
    // =====================================================================

    fn nodes(&mut self, nodes: &[Node], parent: &str) {
        for node in nodes {
            match node {
                Node::Element(el) => self.element(el, parent),
                Node::Text(text) => self.text(text, parent),
                Node::ComponentRef(r) => self.component_ref(r, parent),
                Node::Slot(_) => self.line(format!("if (slot) slot({parent});")),
                Node::If(block) => self.if_block(block, parent),
                Node::Each(block) => self.each_block(block, parent),
            }
        }
    }

    fn element(&mut self, el: &Element, parent: &str) {
        match &el.directive {
            Some(ElementDirective::For(dir)) => {
                let mark = self.scope.len();
                self.open_loop(&dir.collection, &dir.item.name, dir.index.as_ref().map(|b| b.name.as_str()));
                self.plain_element(el, parent);
                self.close_loop(mark);
            }
            Some(ElementDirective::If(dir)) => {
                let condition = self.js(&dir.condition);
                self.line(format!("if ({condition}) {{"));
                self.indent += 1;
                self.plain_element(el, parent);
                self.indent -= 1;
                self.line("}");
            }
            None => self.plain_element(el, parent),
        }
    }

    fn plain_element(&mut self, el: &Element, parent: &str) {
        let var = self.fresh(&el.tag);
        self.line(format!(
            "const {var} = document.createElement({});",
            js_string(&el.tag)
        ));
        for attr in &el.attributes {
            self.attribute(&var, attr);
        }
        self.nodes(&el.children, &var);
        self.line(format!("{parent}.appendChild({var});"));
    }

    fn attribute(&mut self, var: &str, attr: &Attribute) {
        let key = js_string(&attr.key);
        match &attr.value {
            AttrValue::Expr(value) => match &value.kind {
                ExprKind::String(s) => {
                    self.line(format!("{var}.setAttribute({key}, {});", js_string(s)))
                }
                ExprKind::Number(n) => self.line(format!(
                    "{var}.setAttribute({key}, {});",
                    js_string(&crate::format_number(*n))
                )),
                ExprKind::Boolean(true) => self.line(format!("{var}.setAttribute({key}, '');")),
                ExprKind::Boolean(false) => {}
                _ => {
                    self.helpers.insert("setAttr");
                    let js = self.js(value);
                    self.line(format!("setAttr({var}, {key}, {js});"));
                }
            },
            AttrValue::Event(binding) => {
                self.helpers.insert("onEvent");
                let args: Vec<String> = binding.args.iter().map(|a| self.js(a)).collect();
                self.line(format!(
                    "onEvent({var}, {}, {}, {}, () => [{}]);",
                    js_string(&binding.event),
                    js_string(&binding.action),
                    crate::js_string_array(&binding.modifiers),
                    args.join(", ")
                ));
            }
            AttrValue::Bind(value) => {
                let Some(path) = value.as_path() else {
                    return;
                };
                if path.segments.is_empty() {
                    return;
                }
                self.helpers.insert("text");
                self.helpers.insert("setPath");
                let current = self.js(value);
                let target = self.root(&path.root);
                self.line(format!(
                    "({var} as HTMLInputElement).value = text({current});"
                ));
                self.line(format!(
                    "{var}.addEventListener('input', (event) => setPath({target}, {}, (event.target as HTMLInputElement).value));",
                    expr::segments_to_js(path)
                ));
            }
        }
    }

    fn text(&mut self, text: &TextNode, parent: &str) {
        if text.segments.is_empty() {
            return;
        }
        if !text.is_static() {
            self.helpers.insert("text");
        }
        let content = expr::interpolate(&text.segments, &|root| self.root(root), "text");
        self.line(format!(
            "{parent}.appendChild(document.createTextNode({content}));"
        ));
    }

    fn component_ref(&mut self, r: &ComponentRef, parent: &str) {
        let table = self.table;
        let naming = self.naming;
        let (Some(symbol), Some(names)) = (table.lookup(&r.name), naming.get(&r.name)) else {
            return;
        };
        self.imports
            .insert((names.module.clone(), names.function.clone()));

        let mut args = vec!["ctx".to_string()];
        if symbol.param.is_some() {
            args.push(match &r.argument {
                Some(argument) => self.js(&argument.value),
                None => "undefined".to_string(),
            });
        }

        match &r.children {
            Some(children) if symbol.has_slot => {
                let host = format!("host{}", self.counter);
                self.counter += 1;
                self.line(format!(
                    "{parent}.appendChild({}({}, ({host}) => {{",
                    names.function,
                    args.join(", ")
                ));
                self.indent += 1;
                self.nodes(children, &host);
                self.indent -= 1;
                self.line("}));");
            }
            _ => self.line(format!(
                "{parent}.appendChild({}({}));",
                names.function,
                args.join(", ")
            )),
        }
    }

    fn if_block(&mut self, block: &IfBlock, parent: &str) {
        let condition = self.js(&block.condition);
        self.line(format!("if ({condition}) {{"));
        self.branch(&block.then_body, parent);

        for branch in &block.else_ifs {
            let condition = self.js(&branch.condition);
            self.line(format!("}} else if ({condition}) {{"));
            self.branch(&branch.body, parent);
        }

        if let Some(body) = &block.else_body {
            self.line("} else {");
            self.branch(body, parent);
        }
        self.line("}");
    }

    fn branch(&mut self, body: &[Node], parent: &str) {
        self.indent += 1;
        self.nodes(body, parent);
        self.indent -= 1;
    }

    fn each_block(&mut self, block: &EachBlock, parent: &str) {
        let mark = self.scope.len();
        self.open_loop(
            &block.collection,
            &block.item.name,
            block.index.as_ref().map(|b| b.name.as_str()),
        );
        self.nodes(&block.body, parent);
        self.close_loop(mark);
    }

    /// `list(collection).forEach((item, i) => {` with the binders in scope.
    fn open_loop(&mut self, collection: &Expression, item: &str, index: Option<&str>) {
        self.helpers.insert("list");
        let collection = self.js(collection);
        let item_local = js_local(item);
        let params = match index {
            Some(index) => {
                let index_local = js_local(index);
                let params = format!("({item_local}, {index_local})");
                self.scope.push((item.to_string(), item_local));
                self.scope.push((index.to_string(), index_local));
                params
            }
            None => {
                let params = format!("({item_local})");
                self.scope.push((item.to_string(), item_local));
                params
            }
        };
        self.line(format!("list({collection}).forEach({params} => {{"));
        self.indent += 1;
    }

    fn close_loop(&mut self, mark: usize) {
        self.indent -= 1;
        self.line("});");
        self.scope.truncate(mark);
    }
}
