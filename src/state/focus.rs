//! Focus System - Active element, focus traps and Tab order
//!
//! Manages focus state and navigation:
//! - the active element (what `document.activeElement` would be)
//! - Focus cycling (Tab/Shift+Tab) over the focusable elements of a scope
//! - Focus trapping for modals (innermost trap wins)
//! - Focus history for restoration when a trap closes
//!
//! Dispatching the `focus`/`blur` events themselves is the runtime's job;
//! this module only tracks state and answers order questions.

use crate::engine::{Document, SelectorList};
use crate::types::NodeId;

/// Elements that take part in Tab order.
pub const FOCUSABLE_SELECTOR: &str =
    "button, a, [tabindex]:not([tabindex=\"-1\"]), input, select, textarea";

const MAX_HISTORY: usize = 10;

// =============================================================================
// FOCUS STATE
// =============================================================================

#[derive(Debug, Default, Clone)]
pub struct FocusState {
    active: Option<NodeId>,
    traps: Vec<NodeId>,
    history: Vec<NodeId>,
}

impl FocusState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Currently focused element, if any.
    pub fn active(&self) -> Option<NodeId> {
        self.active
    }

    pub fn is_focused(&self, node: NodeId) -> bool {
        self.active == Some(node)
    }

    /// Move focus, remembering the previous element. Returns the element
    /// that lost focus.
    pub fn set_active(&mut self, node: Option<NodeId>) -> Option<NodeId> {
        if self.active == node {
            return None;
        }
        let previous = self.active.take();
        if let Some(prev) = previous {
            self.history.push(prev);
            if self.history.len() > MAX_HISTORY {
                self.history.remove(0);
            }
        }
        self.active = node;
        previous
    }

    // =========================================================================
    // FOCUS TRAP (for modals/dialogs)
    // =========================================================================

    /// Push a focus trap - Tab stays inside this container.
    pub fn push_trap(&mut self, container: NodeId) {
        if self.trap_container() != Some(container) {
            self.traps.retain(|&t| t != container);
            self.traps.push(container);
        }
    }

    /// Remove a container from the trap stack wherever it sits.
    pub fn release_trap(&mut self, container: NodeId) -> bool {
        let before = self.traps.len();
        self.traps.retain(|&t| t != container);
        self.traps.len() != before
    }

    pub fn is_trapped(&self) -> bool {
        !self.traps.is_empty()
    }

    pub fn trap_container(&self) -> Option<NodeId> {
        self.traps.last().copied()
    }

    /// Pop history until an element that still exists and is focusable turns
    /// up.
    pub fn take_restorable(&mut self, doc: &Document) -> Option<NodeId> {
        while let Some(candidate) = self.history.pop() {
            if doc.is_connected(candidate) && !is_hidden(doc, candidate) {
                return Some(candidate);
            }
        }
        None
    }

    /// Forget elements that were removed from the document.
    pub fn prune(&mut self, doc: &Document) {
        if self.active.is_some_and(|a| !doc.is_connected(a)) {
            self.active = None;
        }
        self.traps.retain(|&t| doc.contains(t));
        self.history.retain(|&h| doc.contains(h));
    }
}

// =============================================================================
// FOCUSABLE QUERIES
// =============================================================================

/// Check whether the element or any ancestor is hidden (`hidden` attribute
/// or `display:none`).
pub fn is_hidden(doc: &Document, node: NodeId) -> bool {
    let mut cursor = Some(node);
    while let Some(current) = cursor {
        if doc.is_hidden(current) || doc.style_prop(current, "display").as_deref() == Some("none") {
            return true;
        }
        cursor = doc.parent(current);
    }
    false
}

/// Focusable elements under `scope` in Tab order: positive `tabindex` first
/// in ascending order, then everything else in document order. Disabled and
/// hidden elements are skipped.
pub fn focusable_elements(doc: &Document, scope: NodeId) -> Vec<NodeId> {
    let Ok(selector) = SelectorList::parse(FOCUSABLE_SELECTOR) else {
        return Vec::new();
    };
    let mut result: Vec<NodeId> = doc
        .select_all(scope, &selector)
        .into_iter()
        .filter(|&n| !doc.has_attr(n, "disabled") && !is_hidden(doc, n))
        .collect();

    // Stable sort keeps document order inside each tabindex group.
    result.sort_by_key(|&n| match doc.numeric_attr(n, "tabindex") {
        Some(t) if t > 0.0 => (0, t as i64),
        _ => (1, 0),
    });
    result
}

/// Next element in Tab order after `from` (or before it, going backwards),
/// wrapping at the ends. Without a current element the first (or last)
/// focusable is returned.
pub fn next_focusable(doc: &Document, scope: NodeId, from: Option<NodeId>, forward: bool) -> Option<NodeId> {
    let focusables = focusable_elements(doc, scope);
    if focusables.is_empty() {
        return None;
    }
    let len = focusables.len();
    let current = from.and_then(|f| focusables.iter().position(|&n| n == f));
    let next = match (current, forward) {
        (None, true) => 0,
        (None, false) => len - 1,
        (Some(pos), true) => (pos + 1) % len,
        (Some(pos), false) => (pos + len - 1) % len,
    };
    Some(focusables[next])
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (Document, Vec<NodeId>) {
        let mut doc = Document::new();
        let body = doc.body();
        let mut nodes = Vec::new();
        for tag in ["button", "input", "div", "a"] {
            let node = doc.create_element(tag);
            doc.append_child(body, node);
            nodes.push(node);
        }
        (doc, nodes)
    }

    #[test]
    fn test_initial_state() {
        let focus = FocusState::new();
        assert_eq!(focus.active(), None);
        assert!(!focus.is_trapped());
    }

    #[test]
    fn test_focusable_order_and_filters() {
        let (mut doc, nodes) = setup();
        let body = doc.body();
        assert_eq!(focusable_elements(&doc, body), vec![nodes[0], nodes[1], nodes[3]]);

        doc.set_attr(nodes[2], "tabindex", "0");
        doc.set_attr(nodes[3], "tabindex", "1");
        doc.set_attr(nodes[1], "disabled", "");
        assert_eq!(focusable_elements(&doc, body), vec![nodes[3], nodes[0], nodes[2]]);

        doc.set_attr(nodes[2], "tabindex", "-1");
        doc.set_style(nodes[0], "display", "none");
        assert_eq!(focusable_elements(&doc, body), vec![nodes[3]]);
    }

    #[test]
    fn test_next_focusable_wraps() {
        let (doc, nodes) = setup();
        let body = doc.body();
        assert_eq!(next_focusable(&doc, body, None, true), Some(nodes[0]));
        assert_eq!(next_focusable(&doc, body, None, false), Some(nodes[3]));
        assert_eq!(next_focusable(&doc, body, Some(nodes[3]), true), Some(nodes[0]));
        assert_eq!(next_focusable(&doc, body, Some(nodes[0]), false), Some(nodes[3]));
        assert_eq!(next_focusable(&doc, body, Some(nodes[0]), true), Some(nodes[1]));
    }

    #[test]
    fn test_focus_trap_stack() {
        let (_, nodes) = setup();
        let mut focus = FocusState::new();

        focus.push_trap(nodes[0]);
        focus.push_trap(nodes[2]);
        focus.push_trap(nodes[2]);
        assert_eq!(focus.trap_container(), Some(nodes[2]));

        assert!(focus.release_trap(nodes[2]));
        assert_eq!(focus.trap_container(), Some(nodes[0]));
        assert!(focus.release_trap(nodes[0]));
        assert!(!focus.is_trapped());
        assert!(!focus.release_trap(nodes[0]));
    }

    #[test]
    fn test_history_restore_skips_removed() {
        let (mut doc, nodes) = setup();
        let mut focus = FocusState::new();
        focus.set_active(Some(nodes[0]));
        focus.set_active(Some(nodes[1]));
        assert_eq!(focus.set_active(Some(nodes[3])), Some(nodes[1]));

        doc.remove(nodes[1]);
        assert_eq!(focus.take_restorable(&doc), Some(nodes[0]));
        assert_eq!(focus.take_restorable(&doc), None);
    }
}
