//! Events Module - Synthetic DOM events, listeners and the handler registry
//!
//! The runtime has no browser to deliver events, so hosts (and tests) feed
//! them in through [`Runtime::dispatch`](crate::Runtime::dispatch) and its
//! shorthands. This module holds the pieces that dispatch works with:
//!
//! - [`Event`] - kind, target, key and modifiers, plus a default-prevented flag
//! - [`Listener`] - what a node reacts with: a named handler, the two-way
//!   input binding, or a widget [`Action`]
//! - [`ListenerRegistry`] - per-node listener lists, deduplicated so repeated
//!   mounts never double-wire
//! - [`HandlerRegistry`] - host-registered handlers resolved by name
//!
//! # Example
//!
//! ```ignore
//! rt.register_handler("inc", |rt, _event, _node| {
//!     let next = rt.snapshot()["count"].as_i64().unwrap_or(0) + 1;
//!     rt.set("count", next.into());
//! });
//! rt.click(button);
//! ```

use std::cell::Cell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::engine::Document;
use crate::enhance::Action;
use crate::pipeline::Runtime;
use crate::types::NodeId;

// =============================================================================
// TYPES
// =============================================================================

/// Keyboard modifier state
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub ctrl: bool,
    pub alt: bool,
    pub shift: bool,
    pub meta: bool,
}

impl Modifiers {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn shift() -> Self {
        Self {
            shift: true,
            ..Self::default()
        }
    }

    pub fn ctrl() -> Self {
        Self {
            ctrl: true,
            ..Self::default()
        }
    }
}

/// A synthetic DOM event.
#[derive(Debug, Clone)]
pub struct Event {
    /// Event type, e.g. `click`, `input`, `keydown`.
    pub kind: String,
    /// Node the event was dispatched at.
    pub target: NodeId,
    /// Key name for keyboard events (`"Enter"`, `"Escape"`, `"Tab"`, `"a"`).
    pub key: Option<String>,
    pub modifiers: Modifiers,
    default_prevented: Cell<bool>,
}

impl Event {
    pub fn new(kind: impl Into<String>, target: NodeId) -> Self {
        Self {
            kind: kind.into(),
            target,
            key: None,
            modifiers: Modifiers::none(),
            default_prevented: Cell::new(false),
        }
    }

    /// A `keydown` event for `key`.
    pub fn keydown(target: NodeId, key: impl Into<String>) -> Self {
        Self {
            key: Some(key.into()),
            ..Self::new("keydown", target)
        }
    }

    pub fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }

    /// Cancel the built-in reaction (checkbox toggle, Tab focus move,
    /// form submission).
    pub fn prevent_default(&self) {
        self.default_prevented.set(true);
    }

    pub fn default_prevented(&self) -> bool {
        self.default_prevented.get()
    }

    /// Check the key of a keyboard event.
    pub fn is_key(&self, key: &str) -> bool {
        self.key.as_deref() == Some(key)
    }

    /// Focus and pointer-crossing events stay on their target; everything
    /// else bubbles to the root.
    pub fn bubbles(&self) -> bool {
        !matches!(
            self.kind.as_str(),
            "focus" | "blur" | "mouseenter" | "mouseleave"
        )
    }
}

/// Expand the one-letter event names accepted in `data-m-on`.
pub fn event_alias(name: &str) -> &str {
    match name {
        "c" => "click",
        "i" => "input",
        "s" => "submit",
        "f" => "focus",
        "b" => "blur",
        "k" => "keydown",
        "e" => "keyup",
        "m" => "mouseenter",
        "o" => "mouseleave",
        other => other,
    }
}

// =============================================================================
// LISTENERS
// =============================================================================

/// What a node does when an event of the listened kind reaches it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Listener {
    /// Call the host handler registered under this name.
    Handler(String),
    /// Write the control's value (or checked state) back into state.
    InputBinding,
    /// Run a built-in widget reaction.
    Widget(Action),
}

/// Per-node listener lists.
///
/// Adding a listener that is already present is a no-op, which keeps
/// repeated mounts and repeated enhancement passes from stacking reactions.
#[derive(Debug, Default)]
pub struct ListenerRegistry {
    entries: HashMap<NodeId, Vec<(String, Listener)>>,
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `listener` for `kind` on `node`. Returns false if it was
    /// already registered.
    pub fn add(&mut self, node: NodeId, kind: &str, listener: Listener) -> bool {
        let list = self.entries.entry(node).or_default();
        if list.iter().any(|(k, l)| k == kind && *l == listener) {
            return false;
        }
        list.push((kind.to_string(), listener));
        true
    }

    /// Listeners for `kind` on `node`, in registration order.
    pub fn listeners(&self, node: NodeId, kind: &str) -> Vec<Listener> {
        self.entries
            .get(&node)
            .map(|list| {
                list.iter()
                    .filter(|(k, _)| k == kind)
                    .map(|(_, l)| l.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn has(&self, node: NodeId, kind: &str, listener: &Listener) -> bool {
        self.entries
            .get(&node)
            .is_some_and(|list| list.iter().any(|(k, l)| k == kind && l == listener))
    }

    /// Drop the lists of nodes that no longer exist.
    pub fn prune(&mut self, doc: &Document) {
        self.entries.retain(|&node, _| doc.contains(node));
    }

    /// Total number of registered listeners.
    pub fn len(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// =============================================================================
// HANDLER REGISTRY
// =============================================================================

/// Host event handler: receives the runtime, the event and the node whose
/// `data-m-on` named it.
pub type Handler = Rc<dyn Fn(&mut Runtime, &Event, NodeId)>;

/// Named handlers resolved at dispatch time, so handlers registered after
/// mount still fire.
#[derive(Default, Clone)]
pub struct HandlerRegistry {
    handlers: HashMap<String, Handler>,
}

impl fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&String> = self.handlers.keys().collect();
        names.sort();
        f.debug_struct("HandlerRegistry")
            .field("handlers", &names)
            .finish()
    }
}

impl HandlerRegistry {
    /// Register (or replace) a handler.
    pub fn insert(&mut self, name: impl Into<String>, handler: Handler) {
        self.handlers.insert(name.into(), handler);
    }

    pub fn get(&self, name: &str) -> Option<Handler> {
        self.handlers.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (Document, NodeId) {
        let mut doc = Document::new();
        let button = doc.create_element("button");
        let body = doc.body();
        doc.append_child(body, button);
        (doc, button)
    }

    #[test]
    fn test_listener_dedup() {
        let (_, button) = setup();
        let mut reg = ListenerRegistry::new();

        assert!(reg.add(button, "click", Listener::Handler("inc".into())));
        assert!(!reg.add(button, "click", Listener::Handler("inc".into())));
        assert!(reg.add(button, "click", Listener::Handler("log".into())));
        assert!(reg.add(button, "keydown", Listener::Handler("inc".into())));

        assert_eq!(
            reg.listeners(button, "click"),
            vec![
                Listener::Handler("inc".into()),
                Listener::Handler("log".into())
            ]
        );
        assert_eq!(reg.len(), 3);
    }

    #[test]
    fn test_prune_dead_nodes() {
        let (mut doc, button) = setup();
        let mut reg = ListenerRegistry::new();
        reg.add(button, "click", Listener::InputBinding);

        doc.remove(button);
        reg.prune(&doc);
        assert!(reg.is_empty());
    }

    #[test]
    fn test_event_defaults() {
        let (_, button) = setup();
        let event = Event::keydown(button, "Tab").with_modifiers(Modifiers::shift());
        assert!(event.is_key("Tab"));
        assert!(event.modifiers.shift);
        assert!(event.bubbles());
        assert!(!event.default_prevented());
        event.prevent_default();
        assert!(event.default_prevented());

        assert!(!Event::new("focus", button).bubbles());
    }

    #[test]
    fn test_event_aliases() {
        assert_eq!(event_alias("c"), "click");
        assert_eq!(event_alias("k"), "keydown");
        assert_eq!(event_alias("submit"), "submit");
    }
}
