//! Node - One slot of the document arena.
//!
//! A node is either the document root, an element, a text run, or a comment.
//! Elements keep their attributes in source order; live properties that the
//! DOM does not reflect as attributes (checked, dirty value) sit in
//! [`NodeFlags`] and the `value` string.

use crate::types::{NodeFlags, NodeId};

/// What a node is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    /// The document root. Exactly one per arena.
    Document,
    /// An element with a lowercase tag name.
    Element(String),
    Text(String),
    Comment(String),
}

/// A node in the document arena.
///
/// Tree links are arena handles: `parent` is `None` for the root and for
/// detached subtrees (fresh clones, nodes created but not yet inserted).
#[derive(Debug, Clone)]
pub struct Node {
    pub(crate) kind: NodeKind,
    pub(crate) attrs: Vec<(String, String)>,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
    pub(crate) flags: NodeFlags,
    /// Value property of form controls. Only meaningful with `DIRTY_VALUE`.
    pub(crate) value: String,
}

impl Node {
    pub(crate) fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            attrs: Vec::new(),
            parent: None,
            children: Vec::new(),
            flags: NodeFlags::NONE,
            value: String::new(),
        }
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    /// Tag name for elements.
    pub fn tag(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Element(tag) => Some(tag),
            _ => None,
        }
    }

    pub fn is_element(&self) -> bool {
        matches!(self.kind, NodeKind::Element(_))
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn flags(&self) -> NodeFlags {
        self.flags
    }

    pub fn attrs(&self) -> &[(String, String)] {
        &self.attrs
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub(crate) fn set_attr(&mut self, name: &str, value: &str) {
        match self.attrs.iter_mut().find(|(k, _)| k == name) {
            Some((_, v)) => {
                if v != value {
                    *v = value.to_string();
                }
            }
            None => self.attrs.push((name.to_string(), value.to_string())),
        }
    }

    pub(crate) fn remove_attr(&mut self, name: &str) -> bool {
        let before = self.attrs.len();
        self.attrs.retain(|(k, _)| k != name);
        self.attrs.len() != before
    }

    /// Copy of this node without tree links, used when cloning subtrees.
    pub(crate) fn detached_copy(&self) -> Self {
        Self {
            kind: self.kind.clone(),
            attrs: self.attrs.clone(),
            parent: None,
            children: Vec::new(),
            flags: self.flags,
            value: self.value.clone(),
        }
    }
}
