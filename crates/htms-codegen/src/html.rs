//! Static-document backend.
//!
//! Pages are lowered to plain markup. Everything that depends on runtime
//! state is left as a hook into one compiled binding table:
//!
//! ```text
//! <!--htms:t3-->                        text, replaced by bindings.t3(ctx, s)
//! <button data-htms="e4">               element setup: attributes, events, bind
//! <template data-htms-each="v5"
//!           data-htms-item="item6">     loop over bindings.v5(ctx, s)
//! <template data-htms-if>
//!   <template data-htms-when="v7">      first truthy branch wins
//!   <template data-htms-else>
//! ```
//!
//! Components are inlined at every use. Loop binders are stored in the
//! runtime scope object `s` under numbered keys, so a component's binders
//! never collide with its caller's. Components that open every page render
//! once in `#layout`, outside the routed `#app` view.

use crate::expr;
use crate::router::{default_page, ordered_pages, route_segments};
use crate::{
    escape_attr, escape_html, is_void_element, js_string, js_string_array, title_case,
    CompileOptions, GeneratedFile, Naming,
};
use htms_analyzer::{SymbolTable, CONTEXT_ROOT};
use htms_parser::ast::{
    AttrValue, Attribute, ComponentDecl, ComponentRef, Declaration, EachBlock, Element,
    ElementDirective, ExprKind, Expression, IfBlock, Node, PageDecl, TextNode,
};
use htms_parser::Program;
use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;

/// Opening `<body ...>` tag of a template document.
static BODY_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<body[^>]*>").expect("valid regex"));

/// Whether a template document can host the generated content.
pub fn has_body_tag(template: &str) -> bool {
    BODY_TAG.is_match(template)
}

const DEFAULT_DOCUMENT: &str = "index.html";

/// Hydration, event wiring and the hash router. Expects `bindings`,
/// `routes` and `config` to be declared before it.
const RUNTIME: &str = r#"  const actions = {};
  let ctx = {};

  function text(value) {
    return value === null || value === undefined ? '' : String(value);
  }

  function list(value) {
    return Array.isArray(value) ? value : [];
  }

  function setAttr(el, name, value) {
    if (value === false || value === null || value === undefined) {
      el.removeAttribute(name);
    } else {
      el.setAttribute(name, value === true ? '' : String(value));
    }
  }

  function setPath(target, path, value) {
    if (target === null || typeof target !== 'object' || path.length === 0) return;
    let cursor = target;
    for (const key of path.slice(0, -1)) {
      if (cursor[key] === null || typeof cursor[key] !== 'object') cursor[key] = {};
      cursor = cursor[key];
    }
    cursor[path[path.length - 1]] = value;
  }

  function on(el, type, action, modifiers, args) {
    el.addEventListener(type, (event) => {
      if (modifiers.includes('prevent')) event.preventDefault();
      if (modifiers.includes('stop')) event.stopPropagation();
      const handler = actions[action];
      if (handler) {
        handler(event, ...args());
      } else {
        console.warn(`htms: no handler registered for action '${action}'`);
      }
    }, { once: modifiers.includes('once') });
  }

  function bind(el, get, set) {
    el.value = text(get());
    el.addEventListener('input', () => set(el.value));
  }

  function hydrate(node, s) {
    let child = node.firstChild;
    while (child) {
      const next = child.nextSibling;
      if (child.nodeType === Node.COMMENT_NODE && child.data.startsWith('htms:')) {
        const binding = bindings[child.data.slice(5)];
        child.replaceWith(document.createTextNode(binding ? text(binding(ctx, s)) : ''));
      } else if (child.nodeType === Node.ELEMENT_NODE) {
        if (child.hasAttribute('data-htms-each')) {
          expandEach(child, s);
        } else if (child.hasAttribute('data-htms-if')) {
          expandIf(child, s);
        } else {
          const setup = child.getAttribute('data-htms');
          if (setup !== null) {
            child.removeAttribute('data-htms');
            bindings[setup](child, ctx, s);
          }
          hydrate(child, s);
        }
      }
      child = next;
    }
  }

  function expandEach(template, s) {
    const items = list(bindings[template.getAttribute('data-htms-each')](ctx, s));
    const itemKey = template.getAttribute('data-htms-item');
    const indexKey = template.getAttribute('data-htms-index');
    const fragment = document.createDocumentFragment();
    items.forEach((item, index) => {
      const scope = Object.assign({}, s, { [itemKey]: item });
      if (indexKey) scope[indexKey] = index;
      const copy = template.content.cloneNode(true);
      hydrate(copy, scope);
      fragment.appendChild(copy);
    });
    template.replaceWith(fragment);
  }

  function expandIf(template, s) {
    for (const branch of Array.from(template.content.children)) {
      const when = branch.getAttribute('data-htms-when');
      if (when === null || bindings[when](ctx, s)) {
        const copy = branch.content.cloneNode(true);
        hydrate(copy, s);
        template.replaceWith(copy);
        return;
      }
    }
    template.remove();
  }

  function mount(app, template) {
    const copy = template.content.cloneNode(true);
    hydrate(copy, {});
    app.replaceChildren(copy);
  }

  function matchRoute(path) {
    const parts = path.split('?')[0].split('/').filter((part) => part.length > 0);
    for (const route of routes) {
      if (route.segments.length !== parts.length) continue;
      const params = {};
      const matched = route.segments.every((segment, i) => {
        if (segment.startsWith(':')) {
          const value = decodeSegment(parts[i]);
          if (value === null) return false;
          params[segment.slice(1)] = value;
          return true;
        }
        return segment === parts[i];
      });
      if (matched) return { route, params };
    }
    return null;
  }

  function decodeSegment(part) {
    try {
      return decodeURIComponent(part);
    } catch {
      return null;
    }
  }

  const fetched = new Map();

  function loadTemplate(route) {
    if (!route.source) {
      return Promise.resolve(document.getElementById(route.template));
    }
    if (!fetched.has(route.source)) {
      const request = fetch(route.source)
        .then((response) => {
          if (!response.ok) throw new Error(`${response.status} ${response.statusText}`);
          return response.text();
        })
        .then((html) => {
          const template = document.createElement('template');
          template.innerHTML = html;
          return template;
        })
        .catch((error) => {
          fetched.delete(route.source);
          throw error;
        });
      fetched.set(route.source, request);
    }
    return fetched.get(route.source);
  }

  function showNotFound(app, path) {
    const view = document.createElement('div');
    view.className = 'htms-not-found';
    const heading = document.createElement('h1');
    heading.textContent = 'Page not found';
    const detail = document.createElement('p');
    detail.textContent = `No page matches '${path}'.`;
    view.append(heading, detail);
    app.replaceChildren(view);
  }

  function currentPath() {
    return window.location.hash.slice(1) || '/';
  }

  let renderToken = 0;

  function render() {
    const app = document.getElementById('app');
    if (!app) return;
    const path = currentPath();
    const match = matchRoute(path);
    if (!match) {
      showNotFound(app, path);
      return;
    }
    const token = ++renderToken;
    ctx.params = match.params;
    loadTemplate(match.route)
      .then((template) => {
        if (token !== renderToken) return;
        if (template) {
          mount(app, template);
        } else {
          showNotFound(app, path);
        }
      })
      .catch((error) => {
        console.error(`htms: failed to load the page for '${path}'`, error);
        if (token === renderToken) showNotFound(app, path);
      });
  }

  function navigate(path) {
    window.location.hash = path;
  }

  function interceptLinks(event) {
    if (event.defaultPrevented || event.button !== 0) return;
    if (event.metaKey || event.ctrlKey || event.shiftKey || event.altKey) return;
    const link = event.target instanceof Element ? event.target.closest('a[href^="/"]') : null;
    if (!link || link.hasAttribute('target') || link.hasAttribute('download')) return;
    const href = link.getAttribute('href');
    if (!matchRoute(href)) return;
    event.preventDefault();
    navigate(href);
  }

  const snapshots = new Map();

  // Re-render a host from the markup it was served with.
  function remount(host) {
    if (!snapshots.has(host.id)) {
      const template = document.createElement('template');
      template.innerHTML = host.innerHTML;
      snapshots.set(host.id, template);
    }
    mount(host, snapshots.get(host.id));
  }

  function refresh() {
    const layout = document.getElementById('layout');
    if (layout) remount(layout);
    if (config.router) {
      render();
      return;
    }
    const app = document.getElementById('app');
    if (app) remount(app);
  }

  window.htms = {
    get context() {
      return ctx;
    },
    setContext(next) {
      ctx = next || {};
      refresh();
    },
    register(name, handler) {
      actions[name] = handler;
    },
    navigate,
    refresh,
  };

  function start() {
    ctx = window.htmsContext || ctx;
    if (config.router) {
      window.addEventListener('hashchange', render);
      document.addEventListener('click', interceptLinks);
    }
    refresh();
  }

  if (document.readyState === 'loading') {
    document.addEventListener('DOMContentLoaded', start);
  } else {
    start();
  }
"#;

pub fn generate(
    program: &Program,
    table: &SymbolTable,
    options: &CompileOptions,
) -> Vec<GeneratedFile> {
    let naming = Naming::new(program);
    let mut lowering = Lowering::new(program, options);
    let default = default_page(program, table);

    // Rendered pages in declaration order: (page, template id or fragment path, markup).
    let mut rendered: Vec<(&PageDecl, String, String)> = Vec::new();
    let mut default_markup = String::new();
    let mut layout_markup = String::new();

    if options.generate_router {
        let pages: Vec<&PageDecl> = program
            .declarations
            .iter()
            .filter_map(|declaration| match declaration {
                Declaration::Page(page) => Some(page),
                _ => None,
            })
            .collect();
        let shared = shared_layout(&pages, table);
        if let Some(&first) = pages.first().filter(|_| shared > 0) {
            layout_markup = lowering.body(&first.body[..shared]);
        }

        for page in pages {
            let Some(names) = naming.get(&page.name) else {
                continue;
            };
            let markup = lowering.body(&page.body[shared..]);
            if default.is_some_and(|d| std::ptr::eq(d, page)) {
                default_markup = markup.clone();
            }
            let location = if options.split_templates {
                format!("{}.html", names.module)
            } else {
                format!("page-{}", names.module.trim_start_matches("pages/"))
            };
            rendered.push((page, location, markup));
        }
    } else if let Some(page) = default {
        default_markup = lowering.body(&page.body);
    }

    let mut content = String::new();
    if !layout_markup.is_empty() {
        content.push_str(&format!("<div id=\"layout\">{layout_markup}</div>\n"));
    }
    content.push_str(&format!("<div id=\"app\">{default_markup}</div>\n"));
    if !options.split_templates {
        for (_, id, markup) in &rendered {
            content.push_str(&format!("<template id=\"{id}\">{markup}</template>\n"));
        }
    }
    content.push_str("<script>\n");
    content.push_str(&script(program, &rendered, &lowering.bindings, options));
    content.push_str("</script>\n");

    let document = match options.template_document.as_deref() {
        Some(template) if has_body_tag(template) => inject_into_body(template, &content),
        _ => shell(program, &content),
    };

    tracing::debug!(
        pages = rendered.len(),
        layout = !layout_markup.is_empty(),
        bindings = lowering.bindings.len(),
        split = options.split_templates,
        "static document lowered"
    );

    let mut files = vec![GeneratedFile::new(
        options
            .output_document_name
            .clone()
            .unwrap_or_else(|| DEFAULT_DOCUMENT.to_string()),
        document,
    )];
    if options.split_templates {
        for (_, path, markup) in rendered {
            files.push(GeneratedFile::new(path, format!("{markup}\n")));
        }
    }
    files
}

/// How many leading nodes every page shares and can render once, outside
/// the routed view: the longest common run of plain `Name` references (no
/// argument, no children) that opens every page. Needs at least two pages.
fn shared_layout(pages: &[&PageDecl], table: &SymbolTable) -> usize {
    let Some((first, rest)) = pages.split_first() else {
        return 0;
    };
    if rest.is_empty() {
        return 0;
    }

    first
        .body
        .iter()
        .enumerate()
        .take_while(|&(i, node)| {
            let Node::ComponentRef(r) = node else {
                return false;
            };
            let plain = r.argument.is_none()
                && r.children.is_none()
                && table
                    .lookup(&r.name)
                    .is_some_and(|symbol| symbol.kind.is_component() && symbol.param.is_none());
            plain
                && rest.iter().all(|page| {
                    matches!(
                        page.body.get(i),
                        Some(Node::ComponentRef(other))
                            if other.name == r.name
                                && other.argument.is_none()
                                && other.children.is_none()
                    )
                })
        })
        .count()
}

/// The `<script>` body: binding table, route table and runtime in one IIFE.
fn script(
    program: &Program,
    rendered: &[(&PageDecl, String, String)],
    bindings: &[(String, String)],
    options: &CompileOptions,
) -> String {
    let mut out = String::from("(() => {\n  'use strict';\n\n");

    out.push_str("  const bindings = {\n");
    for (id, function) in bindings {
        out.push_str(&format!("    {id}: {function},\n"));
    }
    out.push_str("  };\n\n");

    // Route order follows matching priority, not declaration order.
    let location_of: HashMap<&str, &str> = rendered
        .iter()
        .map(|(page, location, _)| (page.name.as_str(), location.as_str()))
        .collect();
    out.push_str("  const routes = [\n");
    for page in ordered_pages(program) {
        let Some(location) = location_of.get(page.name.as_str()) else {
            continue;
        };
        let target = if options.split_templates {
            format!("source: {}", js_string(location))
        } else {
            format!("template: {}", js_string(location))
        };
        out.push_str(&format!(
            "    {{ path: {}, segments: {}, {target} }},\n",
            js_string(&page.route),
            js_string_array(&route_segments(&page.route))
        ));
    }
    out.push_str("  ];\n\n");

    out.push_str(&format!(
        "  const config = {{ router: {} }};\n\n",
        options.generate_router
    ));
    out.push_str(RUNTIME);
    out.push_str("})();\n");
    out
}

/// Insert `content` right after the template's `<body ...>` tag.
fn inject_into_body(template: &str, content: &str) -> String {
    match BODY_TAG.find(template) {
        Some(tag) => {
            let mut out = String::with_capacity(template.len() + content.len() + 1);
            out.push_str(&template[..tag.end()]);
            out.push('\n');
            out.push_str(content);
            out.push_str(&template[tag.end()..]);
            out
        }
        None => template.to_string(),
    }
}

/// Minimal HTML5 document titled after the first page.
fn shell(program: &Program, content: &str) -> String {
    let title = program
        .declarations
        .iter()
        .find_map(|declaration| match declaration {
            Declaration::Page(page) => Some(title_case(&page.name)),
            _ => None,
        })
        .unwrap_or_else(|| "App".to_string());

    format!(
        "<!DOCTYPE html>
<html lang=\"en\">
<head>
  <meta charset=\"UTF-8\">
  <meta name=\"viewport\" content=\"width=device-width, initial-scale=1.0\">
  <title>{}</title>
</head>
<body>
{content}</body>
</html>
",
        escape_html(&title)
    )
}

// =========================================================================
// Lowering
// =========================================================================

/// Source names visible at a point, mapped to the JavaScript that reads
/// them. Innermost last.
type Env = Vec<(String, String)>;

/// Child content passed to an inlined component.
struct SlotFrame<'a> {
    children: &'a [Node],
    /// The caller's names; slot content is evaluated where it was written.
    env: Env,
    /// The slot that was active in the caller, for `@slot` forwarding.
    outer: Option<usize>,
}

struct Lowering<'a> {
    components: HashMap<&'a str, &'a ComponentDecl>,
    events: bool,
    /// `(id, function source)` in allocation order.
    bindings: Vec<(String, String)>,
    next_id: usize,
    env: Env,
    slots: Vec<SlotFrame<'a>>,
    current_slot: Option<usize>,
}

impl<'a> Lowering<'a> {
    fn new(program: &'a Program, options: &CompileOptions) -> Self {
        let components = program
            .declarations
            .iter()
            .filter_map(|declaration| match declaration {
                Declaration::Component(decl) | Declaration::Section(decl) => {
                    Some((decl.name.as_str(), decl))
                }
                Declaration::Page(_) => None,
            })
            .collect();

        Self {
            components,
            events: options.generate_events,
            bindings: Vec::new(),
            next_id: 0,
            env: Env::new(),
            slots: Vec::new(),
            current_slot: None,
        }
    }

    /// Markup for top-level nodes of a page or of the shared layout.
    fn body(&mut self, nodes: &'a [Node]) -> String {
        self.env.clear();
        self.slots.clear();
        self.current_slot = None;

        let mut out = String::new();
        self.nodes(nodes, &mut out);
        out
    }

    fn fresh(&mut self, prefix: &str) -> String {
        let id = format!("{prefix}{}", self.next_id);
        self.next_id += 1;
        id
    }

    /// Scope key for a binder: `item` → `item6`.
    fn binder_key(&mut self, name: &str) -> String {
        let base: String = name
            .chars()
            .map(|c| if c.is_alphanumeric() || c == '_' { c } else { '_' })
            .collect();
        self.fresh(&base)
    }

    fn root(&self, name: &str) -> String {
        if name == CONTEXT_ROOT {
            return "ctx".to_string();
        }
        self.env
            .iter()
            .rev()
            .find(|(source, _)| source == name)
            .map(|(_, js)| js.clone())
            .unwrap_or_else(|| "undefined".to_string())
    }

    fn js(&self, expr: &Expression) -> String {
        expr::to_js(expr, &|root| self.root(root))
    }

    /// Register `(ctx, s) => expr` and return its id.
    fn value(&mut self, expr: &Expression) -> String {
        let js = self.js(expr);
        let id = self.fresh("v");
        self.bindings.push((id.clone(), format!("(ctx, s) => {js}")));
        id
    }

    // =====================================================================
    // Nodes
    // =====================================================================

    fn nodes(&mut self, nodes: &'a [Node], out: &mut String) {
        for node in nodes {
            match node {
                Node::Element(el) => self.element(el, out),
                Node::Text(text) => self.text(text, out),
                Node::ComponentRef(r) => self.component_ref(r, out),
                Node::Slot(_) => self.slot(out),
                Node::If(block) => self.if_block(block, out),
                Node::Each(block) => self.each_block(block, out),
            }
        }
    }

    fn element(&mut self, el: &'a Element, out: &mut String) {
        match &el.directive {
            Some(ElementDirective::For(dir)) => {
                let mark = self.open_loop(
                    &dir.collection,
                    &dir.item.name,
                    dir.index.as_ref().map(|b| b.name.as_str()),
                    out,
                );
                self.plain_element(el, out);
                self.close_loop(mark, out);
            }
            Some(ElementDirective::If(dir)) => {
                let when = self.value(&dir.condition);
                out.push_str(&format!(
                    "<template data-htms-if><template data-htms-when=\"{when}\">"
                ));
                self.plain_element(el, out);
                out.push_str("</template></template>");
            }
            None => self.plain_element(el, out),
        }
    }

    fn plain_element(&mut self, el: &'a Element, out: &mut String) {
        out.push('<');
        out.push_str(&el.tag);

        let mut setup = Vec::new();
        for attr in &el.attributes {
            self.attribute(attr, out, &mut setup);
        }
        if !setup.is_empty() {
            let id = self.fresh("e");
            self.bindings.push((
                id.clone(),
                format!("(el, ctx, s) => {{ {} }}", setup.join(" ")),
            ));
            out.push_str(&format!(" data-htms=\"{id}\""));
        }
        out.push('>');

        if is_void_element(&el.tag) {
            return;
        }
        self.nodes(&el.children, out);
        out.push_str(&format!("</{}>", el.tag));
    }

    /// Literal attributes go straight into the markup; everything else
    /// becomes a statement of the element's setup function.
    fn attribute(&self, attr: &Attribute, out: &mut String, setup: &mut Vec<String>) {
        match &attr.value {
            AttrValue::Expr(value) => match &value.kind {
                ExprKind::String(s) => {
                    out.push_str(&format!(" {}=\"{}\"", attr.key, escape_attr(s)))
                }
                ExprKind::Number(n) => out.push_str(&format!(
                    " {}=\"{}\"",
                    attr.key,
                    crate::format_number(*n)
                )),
                ExprKind::Boolean(true) => {
                    out.push(' ');
                    out.push_str(&attr.key);
                }
                ExprKind::Boolean(false) => {}
                _ => setup.push(format!(
                    "setAttr(el, {}, {});",
                    js_string(&attr.key),
                    self.js(value)
                )),
            },
            AttrValue::Event(binding) => {
                if !self.events {
                    return;
                }
                let args: Vec<String> = binding.args.iter().map(|a| self.js(a)).collect();
                setup.push(format!(
                    "on(el, {}, {}, {}, () => [{}]);",
                    js_string(&binding.event),
                    js_string(&binding.action),
                    js_string_array(&binding.modifiers),
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
                setup.push(format!(
                    "bind(el, () => {}, (v) => setPath({}, {}, v));",
                    self.js(value),
                    self.root(&path.root),
                    expr::segments_to_js(path)
                ));
            }
        }
    }

    fn text(&mut self, text: &TextNode, out: &mut String) {
        if text.is_static() {
            for segment in &text.segments {
                if let htms_parser::ast::TextSegment::Literal(s) = segment {
                    out.push_str(&escape_html(s));
                }
            }
            return;
        }
        let js = expr::interpolate(&text.segments, &|root| self.root(root), "text");
        let id = self.fresh("t");
        self.bindings.push((id.clone(), format!("(ctx, s) => {js}")));
        out.push_str(&format!("<!--htms:{id}-->"));
    }

    fn component_ref(&mut self, r: &'a ComponentRef, out: &mut String) {
        let Some(decl) = self.components.get(r.name.as_str()).copied() else {
            return;
        };

        // The parameter is bound to the argument as written at the call site.
        let mut env = Env::new();
        if let (Some(param), Some(argument)) = (&decl.param, &r.argument) {
            let js = self.js(&argument.value);
            let js = match argument.value.kind {
                ExprKind::Binary { .. } | ExprKind::Not(_) | ExprKind::Ternary { .. } => {
                    format!("({js})")
                }
                _ => js,
            };
            env.push((param.name.clone(), js));
        }

        let slot_mark = self.slots.len();
        let slot = r.children.as_deref().map(|children| {
            self.slots.push(SlotFrame {
                children,
                env: self.env.clone(),
                outer: self.current_slot,
            });
            self.slots.len() - 1
        });

        let saved_env = std::mem::replace(&mut self.env, env);
        let saved_slot = std::mem::replace(&mut self.current_slot, slot);
        self.nodes(&decl.body, out);
        self.env = saved_env;
        self.current_slot = saved_slot;
        self.slots.truncate(slot_mark);
    }

    fn slot(&mut self, out: &mut String) {
        let Some(index) = self.current_slot else {
            return;
        };
        let frame = &self.slots[index];
        let children = frame.children;
        let env = frame.env.clone();
        let outer = frame.outer;

        let saved_env = std::mem::replace(&mut self.env, env);
        let saved_slot = std::mem::replace(&mut self.current_slot, outer);
        self.nodes(children, out);
        self.env = saved_env;
        self.current_slot = saved_slot;
    }

    fn if_block(&mut self, block: &'a IfBlock, out: &mut String) {
        out.push_str("<template data-htms-if>");

        let when = self.value(&block.condition);
        out.push_str(&format!("<template data-htms-when=\"{when}\">"));
        self.nodes(&block.then_body, out);
        out.push_str("</template>");

        for branch in &block.else_ifs {
            let when = self.value(&branch.condition);
            out.push_str(&format!("<template data-htms-when=\"{when}\">"));
            self.nodes(&branch.body, out);
            out.push_str("</template>");
        }

        if let Some(body) = &block.else_body {
            out.push_str("<template data-htms-else>");
            self.nodes(body, out);
            out.push_str("</template>");
        }

        out.push_str("</template>");
    }

    fn each_block(&mut self, block: &'a EachBlock, out: &mut String) {
        let mark = self.open_loop(
            &block.collection,
            &block.item.name,
            block.index.as_ref().map(|b| b.name.as_str()),
            out,
        );
        self.nodes(&block.body, out);
        self.close_loop(mark, out);
    }

    /// Open a loop template and bring its binders into scope. Returns the
    /// scope mark for [`Lowering::close_loop`].
    fn open_loop(
        &mut self,
        collection: &Expression,
        item: &str,
        index: Option<&str>,
        out: &mut String,
    ) -> usize {
        let each = self.value(collection);
        let item_key = self.binder_key(item);
        out.push_str(&format!(
            "<template data-htms-each=\"{each}\" data-htms-item=\"{item_key}\""
        ));

        let mark = self.env.len();
        self.env.push((item.to_string(), format!("s.{item_key}")));
        if let Some(index) = index {
            let index_key = self.binder_key(index);
            out.push_str(&format!(" data-htms-index=\"{index_key}\""));
            self.env.push((index.to_string(), format!("s.{index_key}")));
        }
        out.push('>');
        mark
    }

    fn close_loop(&mut self, mark: usize, out: &mut String) {
        out.push_str("</template>");
        self.env.truncate(mark);
    }
}
