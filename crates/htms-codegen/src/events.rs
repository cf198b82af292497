//! `events.ts`: typed action registry and event delegation for elements
//! annotated by `onEvent`.

use crate::procedural::HEADER;
use crate::{js_string, js_string_array, GeneratedFile};
use std::collections::{BTreeMap, BTreeSet};

const DELEGATION: &str = r#"
const handlers: Partial<Record<ActionName, ActionHandler>> = {};

export function registerAction(name: ActionName, handler: ActionHandler): void {
  handlers[name] = handler;
}

export function registerActions(map: Partial<Record<ActionName, ActionHandler>>): void {
  Object.assign(handlers, map);
}

/** Events that do not bubble are caught in the capture phase. */
const captured = new Set(['blur', 'focus', 'load', 'mouseenter', 'mouseleave', 'scroll']);

/**
 * Dispatch events under `root` to the actions named by `data-on-*`
 * attributes. Returns a function that removes the listeners.
 */
export function installEventDelegation(root: Document | Element = document): () => void {
  const removers = eventTypes.map((type) => {
    const listener = (event: Event) => {
      const origin = event.target instanceof Element ? event.target : null;
      const el = origin?.closest(`[data-on-${type}]`);
      if (!el || !root.contains(el)) return;

      const modifiers = (el.getAttribute(`data-on-${type}-modifiers`) ?? '').split(' ');
      if (modifiers.includes('once')) {
        if (el.hasAttribute(`data-on-${type}-done`)) return;
        el.setAttribute(`data-on-${type}-done`, '');
      }
      if (modifiers.includes('prevent')) event.preventDefault();
      if (modifiers.includes('stop')) event.stopPropagation();

      const action = el.getAttribute(`data-on-${type}`) as ActionName;
      const handler = handlers[action];
      if (!handler) {
        console.warn(`htms: no handler registered for action '${action}'`);
        return;
      }
      const args = eventArgs.get(el)?.[type]?.() ?? [];
      handler(event, ...args);
    };
    const capture = captured.has(type);
    root.addEventListener(type, listener, capture);
    return () => root.removeEventListener(type, listener, capture);
  });
  return () => removers.forEach((remove) => remove());
}
"#;

/// Build `events.ts` from `(action, event type)` pairs.
pub fn generate(bindings: &[(String, String)]) -> GeneratedFile {
    let mut by_action: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
    let mut event_types = BTreeSet::new();
    for (action, event) in bindings {
        by_action
            .entry(action.as_str())
            .or_default()
            .insert(event.as_str());
        event_types.insert(event.as_str());
    }

    let mut content = String::from(HEADER);
    content.push_str("import { eventArgs } from './runtime';\n\n");

    let names: Vec<String> = by_action.keys().map(|action| js_string(action)).collect();
    let union = if names.is_empty() {
        "never".to_string()
    } else {
        names.join(" | ")
    };
    content.push_str(&format!("export type ActionName = {union};\n\n"));
    content.push_str(
        "export type ActionHandler = (event: Event, ...args: unknown[]) => void;\n\n",
    );

    content.push_str("/** Event types each action is bound to. */\n");
    content.push_str("export const actionEvents: Record<ActionName, readonly string[]> = {\n");
    for (action, events) in &by_action {
        let events: Vec<&str> = events.iter().copied().collect();
        content.push_str(&format!(
            "  {}: {},\n",
            js_string(action),
            js_string_array(&events)
        ));
    }
    content.push_str("};\n\n");

    let event_types: Vec<&str> = event_types.into_iter().collect();
    content.push_str(&format!(
        "const eventTypes: readonly string[] = {};\n",
        js_string_array(&event_types)
    ));
    content.push_str(DELEGATION);

    GeneratedFile::new("events.ts", content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn pairs(items: &[(&str, &str)]) -> Vec<(String, String)> {
        items
            .iter()
            .map(|(a, e)| (a.to_string(), e.to_string()))
            .collect()
    }

    #[test]
    fn test_actions_are_sorted_and_grouped() {
        let file = generate(&pairs(&[
            ("save", "submit"),
            ("remove", "click"),
            ("save", "click"),
        ]));
        assert_eq!(file.path, "events.ts");
        assert!(file
            .content
            .contains("export type ActionName = 'remove' | 'save';\n"));
        assert!(file.content.contains(
            "export const actionEvents: Record<ActionName, readonly string[]> = {
  'remove': ['click'],
  'save': ['click', 'submit'],
};
"
        ));
        assert!(file
            .content
            .contains("const eventTypes: readonly string[] = ['click', 'submit'];\n"));
    }

    #[test]
    fn test_delegation_honors_modifiers() {
        let file = generate(&pairs(&[("save", "click")]));
        for modifier in ["'once'", "'prevent'", "'stop'"] {
            assert!(file.content.contains(modifier), "missing {modifier}");
        }
        assert!(file.content.contains("export function installEventDelegation("));
    }

    #[test]
    fn test_output_is_stable() {
        let a = generate(&pairs(&[("b", "click"), ("a", "input")]));
        let b = generate(&pairs(&[("a", "input"), ("b", "click")]));
        assert_eq!(a, b);
    }
}
