//! Route tables shared by both backends, and the procedural `router.ts`.

use crate::procedural::HEADER;
use crate::{js_string, js_string_array, GeneratedFile, Naming};
use htms_analyzer::SymbolTable;
use htms_parser::ast::{Declaration, PageDecl};
use htms_parser::Program;

/// Path segments of a route: `/users/:id/` → `["users", ":id"]`.
pub fn route_segments(route: &str) -> Vec<String> {
    route
        .split('/')
        .filter(|segment| !segment.is_empty())
        .map(str::to_string)
        .collect()
}

/// Pages in matching order: declaration order, except that routes with
/// fewer `:param` segments are tried first so `/users/new` wins over
/// `/users/:id`.
pub fn ordered_pages(program: &Program) -> Vec<&PageDecl> {
    let mut pages: Vec<&PageDecl> = program
        .declarations
        .iter()
        .filter_map(|declaration| match declaration {
            Declaration::Page(page) => Some(page),
            _ => None,
        })
        .collect();
    pages.sort_by_key(|page| {
        route_segments(&page.route)
            .iter()
            .filter(|segment| segment.starts_with(':'))
            .count()
    });
    pages
}

/// The page shown when the location has no route: `/` if declared,
/// otherwise the first page.
pub fn default_page<'p>(program: &'p Program, table: &SymbolTable) -> Option<&'p PageDecl> {
    let mut pages = program.declarations.iter().filter_map(|d| match d {
        Declaration::Page(page) => Some(page),
        _ => None,
    });
    let first = pages.next()?;
    let Some(root) = table.page_for_route("/") else {
        return Some(first);
    };
    Some(
        std::iter::once(first)
            .chain(pages)
            .find(|page| page.name == root.name)
            .unwrap_or(first),
    )
}

const ROUTER_RUNTIME: &str = r#"
export interface RouteMatch {
  route: Route;
  params: Record<string, string>;
}

export function matchRoute(path: string): RouteMatch | null {
  const parts = path.split('?')[0].split('/').filter((part) => part.length > 0);
  for (const route of routes) {
    if (route.segments.length !== parts.length) continue;
    const params: Record<string, string> = {};
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

/** A malformed escape such as `%E0%A4%A` matches nothing. */
function decodeSegment(part: string): string | null {
  try {
    return decodeURIComponent(part);
  } catch {
    return null;
  }
}

export function currentPath(): string {
  return window.location.hash.slice(1) || '/';
}

/**
 * Render the page for the current location into `root` and follow hash
 * changes. Route parameters are exposed as `ctx.params`. Returns a function
 * that stops listening.
 */
export function mountRouter(
  root: Element,
  ctx: Context,
  notFound?: (path: string) => Node,
): () => void {
  const render = () => {
    const path = currentPath();
    const match = matchRoute(path);
    if (match) {
      ctx.params = match.params;
      root.replaceChildren(match.route.render(ctx));
    } else {
      root.replaceChildren(notFound ? notFound(path) : document.createTextNode(''));
    }
  };
  window.addEventListener('hashchange', render);
  render();
  return () => window.removeEventListener('hashchange', render);
}

export function navigate(path: string): void {
  window.location.hash = path;
}
"#;

/// `router.ts`: the route table plus matching and hash-based mounting.
pub(crate) fn procedural(program: &Program, naming: &Naming) -> GeneratedFile {
    let pages = ordered_pages(program);

    let mut imports = Vec::new();
    let mut entries = Vec::new();
    for page in &pages {
        let Some(names) = naming.get(&page.name) else {
            continue;
        };
        imports.push(format!(
            "import {{ {} }} from './{}';\n",
            names.function, names.module
        ));
        entries.push(format!(
            "  {{ path: {}, segments: {}, render: {} }},\n",
            js_string(&page.route),
            js_string_array(&route_segments(&page.route)),
            names.function
        ));
    }
    imports.sort();

    let mut content = String::from(HEADER);
    content.push_str("import type { Context } from './runtime';\n");
    for import in &imports {
        content.push_str(import);
    }
    content.push_str(
        "\nexport interface Route {\n  path: string;\n  segments: readonly string[];\n  render: (ctx: Context) => DocumentFragment;\n}\n\n",
    );
    if entries.is_empty() {
        content.push_str("export const routes: readonly Route[] = [];\n");
    } else {
        content.push_str("export const routes: readonly Route[] = [\n");
        for entry in &entries {
            content.push_str(entry);
        }
        content.push_str("];\n");
    }
    content.push_str(ROUTER_RUNTIME);

    GeneratedFile::new("router.ts", content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use htms_parser::Parser;
    use pretty_assertions::assert_eq;

    fn parse(source: &str) -> Program {
        let (program, diagnostics) = Parser::parse(source);
        assert!(diagnostics.is_empty(), "{diagnostics:?}");
        program
    }

    fn table(program: &Program) -> SymbolTable {
        htms_analyzer::analyze(program).0
    }

    #[test]
    fn test_route_segments() {
        assert_eq!(route_segments("/"), Vec::<String>::new());
        assert_eq!(route_segments("/users/:id/"), vec!["users", ":id"]);
    }

    #[test]
    fn test_literal_routes_first() {
        let program = parse("page user \"/users/:id\" { }\npage new \"/users/new\" { }\npage home \"/\" { }");
        let order: Vec<&str> = ordered_pages(&program).iter().map(|p| p.name.as_str()).collect();
        assert_eq!(order, vec!["new", "home", "user"]);
    }

    #[test]
    fn test_default_page() {
        let program = parse("page about \"/about\" { }\npage home \"/\" { }");
        assert_eq!(default_page(&program, &table(&program)).unwrap().name, "home");

        let program = parse("page about \"/about\" { }\npage faq \"/faq\" { }");
        assert_eq!(default_page(&program, &table(&program)).unwrap().name, "about");

        let program = parse("component A { }");
        assert!(default_page(&program, &table(&program)).is_none());
    }

    #[test]
    fn test_route_table() {
        let program = parse("page home \"/\" { }\npage user \"/users/:id\" { }");
        let file = procedural(&program, &Naming::new(&program));
        assert_eq!(file.path, "router.ts");
        assert!(file.content.contains("import { renderHomePage } from './pages/home';\n"));
        assert!(file.content.contains("import { renderUserPage } from './pages/user';\n"));
        assert!(file.content.contains(
            "export const routes: readonly Route[] = [
  { path: '/', segments: [], render: renderHomePage },
  { path: '/users/:id', segments: ['users', ':id'], render: renderUserPage },
];
"
        ));
        assert!(file.content.contains("export function mountRouter("));
    }

    #[test]
    fn test_malformed_escape_is_no_match() {
        let program = parse("page user \"/users/:id\" { }");
        let file = procedural(&program, &Naming::new(&program));
        assert!(file.content.contains(
            "        const value = decodeSegment(parts[i]);\n        if (value === null) return false;\n"
        ));
        assert!(file.content.contains("function decodeSegment(part: string): string | null {\n  try {\n"));
    }

    #[test]
    fn test_empty_route_table() {
        let program = parse("component A { }");
        let file = procedural(&program, &Naming::new(&program));
        assert!(file.content.contains("export const routes: readonly Route[] = [];\n"));
    }
}
