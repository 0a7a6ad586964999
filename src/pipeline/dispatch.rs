//! Event Dispatch - Deliver synthetic events through the document.
//!
//! ```text
//! dispatch(event)
//!   ├─ pre-default   checkbox click toggles `checked`
//!   ├─ listeners     target, then each ancestor (bubbling events only)
//!   └─ post-default  unless prevented:
//!                    checkbox click  ─► input + change
//!                    submit click    ─► submit on the enclosing form
//!                    Tab / Shift+Tab ─► next focusable (inside the open trap)
//! ```
//!
//! Listeners are read per node right before running, so a listener that
//! removes nodes or rewires the page affects the rest of the walk.

use serde_json::Value;
use tracing::{debug, trace};

use super::binding::BIND_ATTR;
use super::Runtime;
use crate::primitives::split_bind;
use crate::state::focus::{is_hidden, next_focusable};
use crate::state::{Event, Listener};
use crate::types::NodeId;

impl Runtime {
    /// Dispatch `event` at its target. Returns false if a listener prevented
    /// the default action or the event was not delivered.
    pub fn dispatch(&mut self, event: Event) -> bool {
        let target = event.target;
        if !self.doc.contains(target) {
            return false;
        }
        if event.kind == "click" && self.doc.has_attr(target, "disabled") {
            trace!(%target, "click on disabled control ignored");
            return false;
        }

        let toggles = event.kind == "click" && self.doc.is_checkbox(target);
        if toggles {
            let checked = self.doc.checked(target);
            self.doc.set_checked(target, !checked);
        }

        for node in self.propagation_path(&event) {
            if !self.doc.contains(node) {
                continue;
            }
            for listener in self.listeners.listeners(node, &event.kind) {
                self.run_listener(&listener, &event, node);
            }
        }

        let prevented = event.default_prevented();
        if toggles {
            if prevented {
                let checked = self.doc.checked(target);
                self.doc.set_checked(target, !checked);
            } else {
                self.dispatch(Event::new("input", target));
                self.dispatch(Event::new("change", target));
            }
        } else if !prevented {
            self.default_action(&event);
        }
        !prevented
    }

    fn propagation_path(&self, event: &Event) -> Vec<NodeId> {
        let mut path = vec![event.target];
        if event.bubbles() {
            let mut cursor = self.doc.parent(event.target);
            while let Some(node) = cursor {
                path.push(node);
                cursor = self.doc.parent(node);
            }
        }
        path
    }

    fn run_listener(&mut self, listener: &Listener, event: &Event, node: NodeId) {
        match listener {
            Listener::Handler(name) => {
                let Some(handler) = self.handlers.get(name) else {
                    debug!(handler = %name, %node, "no handler registered");
                    return;
                };
                if event.kind == "submit" {
                    event.prevent_default();
                }
                handler(self, event, node);
            }
            Listener::InputBinding => {
                let Some(spec) = self.doc.attr(node, BIND_ATTR) else {
                    return;
                };
                let path = split_bind(spec).0.to_string();
                let value = if self.doc.is_checkbox(node) {
                    Value::Bool(self.doc.checked(node))
                } else {
                    Value::String(self.doc.value(node))
                };
                if !self.set_path(&path, value) {
                    debug!(%path, "input binding target does not resolve");
                }
            }
            Listener::Widget(action) => self.run_action(action, event, node),
        }
    }

    fn default_action(&mut self, event: &Event) {
        let target = event.target;
        match event.kind.as_str() {
            "click" if self.is_submit_control(target) => {
                if let Some(form) = self.enclosing_form(target) {
                    self.dispatch(Event::new("submit", form));
                }
            }
            "keydown" if event.is_key("Tab") => {
                let scope = self
                    .focus
                    .trap_container()
                    .unwrap_or_else(|| self.doc.body());
                let next = next_focusable(&self.doc, scope, self.focus.active(), !event.modifiers.shift);
                if let Some(next) = next {
                    self.focus(next);
                }
            }
            _ => {}
        }
    }

    fn is_submit_control(&self, node: NodeId) -> bool {
        match self.doc.tag(node) {
            Some("button") => self.doc.attr(node, "type").is_none_or(|t| t.eq_ignore_ascii_case("submit")),
            Some("input") => self.doc.input_type(node) == "submit",
            _ => false,
        }
    }

    fn enclosing_form(&self, node: NodeId) -> Option<NodeId> {
        let mut cursor = self.doc.parent(node);
        while let Some(current) = cursor {
            if self.doc.tag(current) == Some("form") {
                return Some(current);
            }
            cursor = self.doc.parent(current);
        }
        None
    }

    // =========================================================================
    // Shorthands
    // =========================================================================

    pub fn click(&mut self, node: NodeId) -> bool {
        self.dispatch(Event::new("click", node))
    }

    /// Type into a control: write its value, then dispatch `input`.
    pub fn input(&mut self, node: NodeId, value: &str) -> bool {
        if !self.doc.contains(node) {
            return false;
        }
        self.doc.set_value(node, value);
        self.dispatch(Event::new("input", node))
    }

    pub fn keydown(&mut self, node: NodeId, key: &str) -> bool {
        self.dispatch(Event::keydown(node, key))
    }

    /// Move focus to `node`, dispatching `blur` on the element losing it
    /// and `focus` on `node`. Hidden, disabled and detached elements do not
    /// take focus.
    pub fn focus(&mut self, node: NodeId) -> bool {
        if !self.doc.is_connected(node)
            || is_hidden(&self.doc, node)
            || self.doc.has_attr(node, "disabled")
        {
            return false;
        }
        if self.focus.is_focused(node) {
            return true;
        }
        if let Some(previous) = self.focus.set_active(Some(node)) {
            self.dispatch(Event::new("blur", previous));
        }
        self.dispatch(Event::new("focus", node));
        true
    }

    /// Drop focus from the active element.
    pub fn blur(&mut self) {
        if let Some(previous) = self.focus.set_active(None) {
            self.dispatch(Event::new("blur", previous));
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use crate::pipeline::Runtime;
    use crate::state::{Event, Modifiers};
    use serde_json::json;

    fn mounted(html: &str, state: serde_json::Value) -> Runtime {
        let mut rt = Runtime::from_html(html).unwrap();
        rt.patch_state(state);
        rt.mount(None);
        rt
    }

    #[test]
    fn test_handlers_bubble_from_target() {
        let mut rt = mounted(
            r#"<div data-m-on="c:outer"><button data-m-on="click:inner">x</button></div>"#,
            json!({}),
        );
        let seen = Rc::new(RefCell::new(Vec::new()));
        for name in ["inner", "outer"] {
            let seen = Rc::clone(&seen);
            rt.register_handler(name, move |_, event, node| {
                seen.borrow_mut().push((name, event.target, node));
            });
        }
        let button = rt.q("button").unwrap();
        let div = rt.q("div").unwrap();
        assert!(rt.click(button));
        assert_eq!(*seen.borrow(), vec![("inner", button, button), ("outer", button, div)]);
    }

    #[test]
    fn test_unknown_handler_is_skipped() {
        let mut rt = mounted(r#"<button data-m-on="click:nobody">x</button>"#, json!({}));
        let button = rt.q("button").unwrap();
        assert!(rt.click(button));
    }

    #[test]
    fn test_handler_can_mutate_state() {
        let mut rt = mounted(
            r#"<button data-m-on="c:inc">+</button><span data-m-bind="count"></span>"#,
            json!({"count": 1}),
        );
        rt.register_handler("inc", |rt, _, _| {
            let next = rt.snapshot()["count"].as_i64().unwrap_or(0) + 1;
            rt.set("count", next.into());
        });
        let button = rt.q("button").unwrap();
        rt.click(button);
        rt.click(button);
        assert_eq!(rt.document().text_content(rt.q("span").unwrap()), "3");
    }

    #[test]
    fn test_text_input_binding() {
        let mut rt = mounted(
            r#"<input data-m-bind="form.name|upper"><p data-m-bind="form.name|upper"></p>"#,
            json!({"form": {"name": ""}}),
        );
        let input = rt.q("input").unwrap();
        rt.input(input, "ada");
        assert_eq!(rt.snapshot()["form"]["name"], json!("ada"));
        assert_eq!(rt.document().text_content(rt.q("p").unwrap()), "ADA");
    }

    #[test]
    fn test_checkbox_prevented_click_reverts() {
        let mut rt = mounted(
            r#"<input type="checkbox" data-m-bind="flag" data-m-on="c:stop">"#,
            json!({"flag": false}),
        );
        rt.register_handler("stop", |_, event, _| event.prevent_default());
        let checkbox = rt.q("input").unwrap();
        assert!(!rt.click(checkbox));
        assert!(!rt.document().checked(checkbox));
        assert_eq!(rt.snapshot()["flag"], json!(false));
    }

    #[test]
    fn test_disabled_click_ignored() {
        let mut rt = mounted(
            r#"<button disabled data-m-on="c:boom">x</button>"#,
            json!({}),
        );
        rt.register_handler("boom", |rt, _, _| {
            rt.set("boom", json!(true));
        });
        let button = rt.q("button").unwrap();
        assert!(!rt.click(button));
        assert_eq!(rt.snapshot().get("boom"), None);
    }

    #[test]
    fn test_submit_button_submits_form() {
        let mut rt = mounted(
            r#"<form data-m-on="s:save"><input name="a"><button>Go</button><button type="button">No</button></form>"#,
            json!({"saved": 0}),
        );
        rt.register_handler("save", |rt, event, _| {
            assert!(event.default_prevented());
            let n = rt.snapshot()["saved"].as_i64().unwrap_or(0);
            rt.set("saved", (n + 1).into());
        });
        let buttons = rt.qa("button");
        rt.click(buttons[0]);
        rt.click(buttons[1]);
        assert_eq!(rt.snapshot()["saved"], json!(1));
    }

    #[test]
    fn test_focus_and_blur_events() {
        let mut rt = mounted(
            r#"<input id="a" data-m-on="f:fa, b:ba"><input id="b"><input id="h" hidden>"#,
            json!({}),
        );
        let log = Rc::new(RefCell::new(Vec::new()));
        for name in ["fa", "ba"] {
            let log = Rc::clone(&log);
            rt.register_handler(name, move |_, _, _| log.borrow_mut().push(name));
        }
        let a = rt.q("#a").unwrap();
        let b = rt.q("#b").unwrap();
        assert!(rt.focus(a));
        assert!(rt.focus(a));
        assert!(rt.focus(b));
        assert!(!rt.focus(rt.q("#h").unwrap()));
        assert_eq!(rt.active_element(), Some(b));
        assert_eq!(*log.borrow(), vec!["fa", "ba"]);
        rt.blur();
        assert_eq!(rt.active_element(), None);
    }

    #[test]
    fn test_tab_cycles_focus() {
        let mut rt = mounted(r#"<button id="one">1</button><a id="two">2</a>"#, json!({}));
        let one = rt.q("#one").unwrap();
        let two = rt.q("#two").unwrap();
        rt.focus(one);
        rt.keydown(one, "Tab");
        assert_eq!(rt.active_element(), Some(two));
        rt.keydown(two, "Tab");
        assert_eq!(rt.active_element(), Some(one));
        rt.dispatch(Event::keydown(one, "Tab").with_modifiers(Modifiers::shift()));
        assert_eq!(rt.active_element(), Some(two));
    }
}
