//! Document Registry - Arena allocation for nodes.
//!
//! Manages the lifecycle of node handles:
//! - Free slot pool for O(1) reuse
//! - Parent/child links kept in both directions
//! - Recursive release of detached subtrees
//! - Attribute, class, style, text and form-control accessors
//!
//! Nodes are NOT reference counted objects. They are indices into one arena
//! owned by the [`Document`]; a handle is valid until its node is released.

use serde_json::Value;
use tracing::warn;

use super::node::{Node, NodeKind};
use super::selector::SelectorList;
use crate::error::DomError;
use crate::types::{NodeFlags, NodeId};

/// Tags whose value the binding pass writes as a control value.
const INPUT_LIKE: [&str; 3] = ["input", "select", "textarea"];

/// An in-memory document: one root, an `<html>` element with `<head>` and
/// `<body>`, and whatever the host or the runtime put below them.
#[derive(Debug, Clone)]
pub struct Document {
    slots: Vec<Slot>,
    free: Vec<usize>,
    root: NodeId,
}

/// One arena cell. The generation bumps every time the cell is released.
#[derive(Debug, Clone)]
struct Slot {
    generation: u32,
    node: Option<Node>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Create an empty page: `<html><head></head><body></body></html>`.
    pub fn new() -> Self {
        let mut doc = Self {
            slots: Vec::new(),
            free: Vec::new(),
            root: NodeId::new(0, 0),
        };
        doc.root = doc.allocate(Node::new(NodeKind::Document));
        let html = doc.create_element("html");
        let head = doc.create_element("head");
        let body = doc.create_element("body");
        doc.append_child(doc.root, html);
        doc.append_child(html, head);
        doc.append_child(html, body);
        doc
    }

    // =========================================================================
    // Allocation
    // =========================================================================

    fn allocate(&mut self, node: Node) -> NodeId {
        match self.free.pop() {
            Some(index) => {
                let slot = &mut self.slots[index];
                slot.node = Some(node);
                NodeId::new(index, slot.generation)
            }
            None => {
                self.slots.push(Slot {
                    generation: 0,
                    node: Some(node),
                });
                NodeId::new(self.slots.len() - 1, 0)
            }
        }
    }

    /// Release a node and all of its descendants back to the pool.
    ///
    /// The node must already be detached; use [`Document::remove`] otherwise.
    fn release(&mut self, id: NodeId) {
        if !self.contains(id) {
            return;
        }
        let slot = &mut self.slots[id.index];
        let Some(node) = slot.node.take() else { return };
        slot.generation = slot.generation.wrapping_add(1);
        for child in node.children {
            self.release(child);
        }
        self.free.push(id.index);
    }

    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.allocate(Node::new(NodeKind::Element(tag.to_ascii_lowercase())))
    }

    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.allocate(Node::new(NodeKind::Text(text.to_string())))
    }

    pub fn create_comment(&mut self, text: &str) -> NodeId {
        self.allocate(Node::new(NodeKind::Comment(text.to_string())))
    }

    /// Number of live nodes in the arena.
    pub fn node_count(&self) -> usize {
        self.slots.iter().filter(|s| s.node.is_some()).count()
    }

    /// Check whether a handle still refers to a live node.
    pub fn contains(&self, id: NodeId) -> bool {
        self.get(id).is_some()
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.slots
            .get(id.index)
            .filter(|s| s.generation == id.generation)
            .and_then(|s| s.node.as_ref())
    }

    fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.slots
            .get_mut(id.index)
            .filter(|s| s.generation == id.generation)
            .and_then(|s| s.node.as_mut())
    }

    // =========================================================================
    // Well-known nodes
    // =========================================================================

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// The `<html>` element, or the root when the page has none.
    pub fn document_element(&self) -> NodeId {
        self.first_element_child(self.root).unwrap_or(self.root)
    }

    pub fn head(&self) -> NodeId {
        self.child_with_tag(self.document_element(), "head")
            .unwrap_or_else(|| self.document_element())
    }

    pub fn body(&self) -> NodeId {
        self.child_with_tag(self.document_element(), "body")
            .unwrap_or_else(|| self.document_element())
    }

    fn child_with_tag(&self, parent: NodeId, tag: &str) -> Option<NodeId> {
        self.children(parent)
            .iter()
            .copied()
            .find(|&c| self.tag(c) == Some(tag))
    }

    // =========================================================================
    // Tree navigation
    // =========================================================================

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(Node::parent)
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.get(id).map(Node::children).unwrap_or(&[])
    }

    pub fn element_children(&self, id: NodeId) -> Vec<NodeId> {
        self.children(id)
            .iter()
            .copied()
            .filter(|&c| self.is_element(c))
            .collect()
    }

    pub fn first_element_child(&self, id: NodeId) -> Option<NodeId> {
        self.children(id).iter().copied().find(|&c| self.is_element(c))
    }

    pub fn last_element_child(&self, id: NodeId) -> Option<NodeId> {
        self.children(id)
            .iter()
            .rev()
            .copied()
            .find(|&c| self.is_element(c))
    }

    /// Check whether `ancestor` is `node` or one of its ancestors.
    pub fn is_inclusive_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut cursor = Some(node);
        while let Some(current) = cursor {
            if current == ancestor {
                return true;
            }
            cursor = self.parent(current);
        }
        false
    }

    /// Check whether the node is reachable from the document root.
    pub fn is_connected(&self, id: NodeId) -> bool {
        self.contains(id) && self.is_inclusive_ancestor(self.root, id)
    }

    /// All descendants in document order, excluding `id` itself.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        self.collect_descendants(id, false, &mut out);
        out
    }

    /// Descendants in document order that a query can see: the content of
    /// nested `<template>` elements is inert and skipped.
    pub(crate) fn queryable_descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        self.collect_descendants(id, true, &mut out);
        out
    }

    fn collect_descendants(&self, id: NodeId, skip_templates: bool, out: &mut Vec<NodeId>) {
        for &child in self.children(id) {
            out.push(child);
            if skip_templates && self.tag(child) == Some("template") {
                continue;
            }
            self.collect_descendants(child, skip_templates, out);
        }
    }

    // =========================================================================
    // Mutation
    // =========================================================================

    /// Unlink a node from its parent. The subtree stays allocated.
    pub fn detach(&mut self, id: NodeId) {
        let Some(parent) = self.parent(id) else { return };
        if let Some(p) = self.get_mut(parent) {
            p.children.retain(|&c| c != id);
        }
        if let Some(node) = self.get_mut(id) {
            node.parent = None;
        }
    }

    /// Append `child` as the last child of `parent`, moving it if attached.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> bool {
        self.insert_before(parent, child, None)
    }

    /// Insert `child` before `reference` under `parent`, moving it if it is
    /// already attached somewhere. A missing or foreign reference appends.
    ///
    /// Returns false (and changes nothing) for dead handles or when the
    /// insertion would create a cycle.
    pub fn insert_before(&mut self, parent: NodeId, child: NodeId, reference: Option<NodeId>) -> bool {
        if !self.contains(parent) || !self.contains(child) || child == self.root {
            return false;
        }
        if self.is_inclusive_ancestor(child, parent) {
            warn!(%parent, %child, "refusing insertion that would create a cycle");
            return false;
        }
        self.detach(child);
        let Some(p) = self.get_mut(parent) else { return false };
        let position = reference
            .and_then(|r| p.children.iter().position(|&c| c == r))
            .unwrap_or(p.children.len());
        p.children.insert(position, child);
        if let Some(node) = self.get_mut(child) {
            node.parent = Some(parent);
        }
        true
    }

    /// Detach a node and release its whole subtree.
    pub fn remove(&mut self, id: NodeId) {
        if id == self.root {
            return;
        }
        self.detach(id);
        self.release(id);
    }

    /// Remove every child of `id`.
    pub fn clear_children(&mut self, id: NodeId) {
        let children = self.children(id).to_vec();
        for child in children {
            self.remove(child);
        }
    }

    /// Deep-clone a subtree. The clone is detached.
    pub fn clone_subtree(&mut self, id: NodeId) -> Option<NodeId> {
        let copy = self.get(id)?.detached_copy();
        let children = self.children(id).to_vec();
        let clone = self.allocate(copy);
        for child in children {
            if let Some(child_clone) = self.clone_subtree(child) {
                self.append_child(clone, child_clone);
            }
        }
        Some(clone)
    }

    // =========================================================================
    // Attributes
    // =========================================================================

    pub fn tag(&self, id: NodeId) -> Option<&str> {
        self.get(id).and_then(Node::tag)
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        self.get(id).is_some_and(Node::is_element)
    }

    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        self.get(id).and_then(|n| n.attr(name))
    }

    pub fn has_attr(&self, id: NodeId, name: &str) -> bool {
        self.attr(id, name).is_some()
    }

    pub fn set_attr(&mut self, id: NodeId, name: &str, value: &str) {
        if let Some(node) = self.get_mut(id).filter(|n| n.is_element()) {
            node.set_attr(name, value);
        }
    }

    pub fn remove_attr(&mut self, id: NodeId, name: &str) -> bool {
        self.get_mut(id).is_some_and(|n| n.remove_attr(name))
    }

    /// First element in document order whose `id` attribute equals `id`.
    pub fn get_element_by_id(&self, id: &str) -> Option<NodeId> {
        self.queryable_descendants(self.root)
            .into_iter()
            .find(|&n| self.attr(n, "id") == Some(id))
    }

    // =========================================================================
    // Classes
    // =========================================================================

    pub fn class_list(&self, id: NodeId) -> Vec<&str> {
        self.attr(id, "class")
            .map(|c| c.split_whitespace().collect())
            .unwrap_or_default()
    }

    pub fn has_class(&self, id: NodeId, class: &str) -> bool {
        self.class_list(id).contains(&class)
    }

    pub fn add_class(&mut self, id: NodeId, class: &str) {
        if class.is_empty() || self.has_class(id, class) {
            return;
        }
        let mut classes: Vec<String> = self.class_list(id).into_iter().map(String::from).collect();
        classes.push(class.to_string());
        self.set_attr(id, "class", &classes.join(" "));
    }

    pub fn remove_class(&mut self, id: NodeId, class: &str) {
        if !self.has_class(id, class) {
            return;
        }
        let classes: Vec<String> = self
            .class_list(id)
            .into_iter()
            .filter(|c| *c != class)
            .map(String::from)
            .collect();
        self.set_attr(id, "class", &classes.join(" "));
    }

    /// Add or remove a class. With `force = None` the class flips.
    /// Returns whether the class is present afterwards.
    pub fn toggle_class(&mut self, id: NodeId, class: &str, force: Option<bool>) -> bool {
        let on = force.unwrap_or(!self.has_class(id, class));
        if on {
            self.add_class(id, class);
        } else {
            self.remove_class(id, class);
        }
        on
    }

    // =========================================================================
    // Inline style
    // =========================================================================

    /// Read one declaration from the `style` attribute.
    pub fn style_prop(&self, id: NodeId, prop: &str) -> Option<String> {
        parse_style(self.attr(id, "style")?)
            .into_iter()
            .find(|(k, _)| k == prop)
            .map(|(_, v)| v)
    }

    /// Set (or with an empty value, remove) one declaration of the `style`
    /// attribute, keeping the order of the others.
    pub fn set_style(&mut self, id: NodeId, prop: &str, value: &str) {
        let mut decls = self.attr(id, "style").map(parse_style).unwrap_or_default();
        match decls.iter_mut().find(|(k, _)| k == prop) {
            Some((_, v)) if !value.is_empty() => *v = value.to_string(),
            Some(_) => decls.retain(|(k, _)| k != prop),
            None if !value.is_empty() => decls.push((prop.to_string(), value.to_string())),
            None => {}
        }
        let text: String = decls.iter().map(|(k, v)| format!("{k}:{v};")).collect();
        self.set_attr(id, "style", &text);
    }

    /// Set several declarations from a CSS declaration block.
    pub fn set_style_text(&mut self, id: NodeId, css: &str) {
        for (k, v) in parse_style(css) {
            self.set_style(id, &k, &v);
        }
    }

    // =========================================================================
    // Visibility
    // =========================================================================

    pub fn is_hidden(&self, id: NodeId) -> bool {
        self.has_attr(id, "hidden")
    }

    pub fn set_hidden(&mut self, id: NodeId, hidden: bool) {
        if hidden {
            if !self.is_hidden(id) {
                self.set_attr(id, "hidden", "");
            }
        } else {
            self.remove_attr(id, "hidden");
        }
    }

    // =========================================================================
    // Text
    // =========================================================================

    /// Concatenated text of the node and its descendants.
    pub fn text_content(&self, id: NodeId) -> String {
        match self.get(id).map(Node::kind) {
            Some(NodeKind::Text(text)) => text.clone(),
            Some(NodeKind::Comment(_)) | None => String::new(),
            Some(_) => self
                .children(id)
                .iter()
                .map(|&c| self.text_content(c))
                .collect(),
        }
    }

    /// Replace all children with a single text node (none for empty text).
    /// Writing the same text again leaves the tree untouched.
    pub fn set_text_content(&mut self, id: NodeId, text: &str) {
        match self.get_mut(id) {
            Some(Node {
                kind: NodeKind::Text(existing) | NodeKind::Comment(existing),
                ..
            }) => {
                *existing = text.to_string();
                return;
            }
            None => return,
            Some(_) => {}
        }
        let children = self.children(id);
        let unchanged = match children {
            [] => text.is_empty(),
            [only] => matches!(self.get(*only).map(Node::kind), Some(NodeKind::Text(t)) if t == text),
            _ => false,
        };
        if unchanged {
            return;
        }
        self.clear_children(id);
        if !text.is_empty() {
            let node = self.create_text(text);
            self.append_child(id, node);
        }
    }

    // =========================================================================
    // Form controls
    // =========================================================================

    /// `input`, `select` or `textarea`.
    pub fn is_input_like(&self, id: NodeId) -> bool {
        self.tag(id).is_some_and(|t| INPUT_LIKE.contains(&t))
    }

    /// Lowercased `type` attribute of an input, defaulting to `text`.
    pub fn input_type(&self, id: NodeId) -> String {
        self.attr(id, "type")
            .map(str::to_ascii_lowercase)
            .unwrap_or_else(|| "text".to_string())
    }

    pub fn is_checkbox(&self, id: NodeId) -> bool {
        self.tag(id) == Some("input") && self.input_type(id) == "checkbox"
    }

    /// Current value of a form control.
    pub fn value(&self, id: NodeId) -> String {
        let Some(node) = self.get(id) else { return String::new() };
        if node.flags.contains(NodeFlags::DIRTY_VALUE) {
            return node.value.clone();
        }
        match node.tag() {
            Some("textarea") => self.text_content(id),
            Some("select") => self
                .queryable_descendants(id)
                .into_iter()
                .filter(|&o| self.tag(o) == Some("option"))
                .find(|&o| self.has_attr(o, "selected"))
                .or_else(|| {
                    self.queryable_descendants(id)
                        .into_iter()
                        .find(|&o| self.tag(o) == Some("option"))
                })
                .map(|o| self.attr(o, "value").map(String::from).unwrap_or_else(|| self.text_content(o)))
                .unwrap_or_default(),
            _ => match node.attr("value") {
                Some(v) => v.to_string(),
                None if self.is_checkbox(id) => "on".to_string(),
                None => String::new(),
            },
        }
    }

    pub fn set_value(&mut self, id: NodeId, value: &str) {
        if let Some(node) = self.get_mut(id) {
            node.value = value.to_string();
            node.flags.insert(NodeFlags::DIRTY_VALUE);
        }
    }

    pub fn checked(&self, id: NodeId) -> bool {
        self.flags(id).contains(NodeFlags::CHECKED)
    }

    pub fn set_checked(&mut self, id: NodeId, checked: bool) {
        self.set_flag(id, NodeFlags::CHECKED, checked);
    }

    pub fn flags(&self, id: NodeId) -> NodeFlags {
        self.get(id).map(Node::flags).unwrap_or_default()
    }

    pub(crate) fn set_flag(&mut self, id: NodeId, flag: NodeFlags, on: bool) {
        if let Some(node) = self.get_mut(id) {
            node.flags.set(flag, on);
        }
    }

    /// Read a `data-*` attribute as a JSON number, if it parses as one.
    pub fn numeric_attr(&self, id: NodeId, name: &str) -> Option<f64> {
        let raw = self.attr(id, name)?.trim();
        raw.parse::<f64>().ok().filter(|f| f.is_finite())
    }

    /// Attribute as a JSON string value (for handing node data to handlers).
    pub fn attr_value(&self, id: NodeId, name: &str) -> Value {
        self.attr(id, name)
            .map(|v| Value::String(v.to_string()))
            .unwrap_or(Value::Null)
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// First match of `selector` among the descendants of `scope`.
    pub fn query_selector(&self, scope: NodeId, selector: &str) -> Result<Option<NodeId>, DomError> {
        let list = SelectorList::parse(selector)?;
        Ok(self.select_first(scope, &list))
    }

    /// All matches of `selector` among the descendants of `scope`, in
    /// document order.
    pub fn query_selector_all(&self, scope: NodeId, selector: &str) -> Result<Vec<NodeId>, DomError> {
        let list = SelectorList::parse(selector)?;
        Ok(self.select_all(scope, &list))
    }

    pub fn select_first(&self, scope: NodeId, list: &SelectorList) -> Option<NodeId> {
        self.queryable_descendants(scope)
            .into_iter()
            .find(|&n| list.matches(self, n))
    }

    pub fn select_all(&self, scope: NodeId, list: &SelectorList) -> Vec<NodeId> {
        self.queryable_descendants(scope)
            .into_iter()
            .filter(|&n| list.matches(self, n))
            .collect()
    }

    /// Every element below `scope` carrying `attr`, in document order.
    /// The binding pass uses this as its directive scan.
    pub fn elements_with_attr(&self, scope: NodeId, attr: &str) -> Vec<NodeId> {
        self.queryable_descendants(scope)
            .into_iter()
            .filter(|&n| self.has_attr(n, attr))
            .collect()
    }
}

/// Split a declaration block into `(property, value)` pairs.
fn parse_style(css: &str) -> Vec<(String, String)> {
    css.split(';')
        .filter_map(|decl| {
            let (k, v) = decl.split_once(':')?;
            let (k, v) = (k.trim(), v.trim());
            (!k.is_empty()).then(|| (k.to_string(), v.to_string()))
        })
        .collect()
}
