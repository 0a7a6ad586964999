//! Control Flow Primitives - Conditional and list rendering.
//!
//! This module provides the two DOM-shaping primitives of the binding pass:
//! - [`show`] - Toggle an element's visibility (`hidden` + `aria-hidden`)
//! - [`reconcile`] - Keyed list rendering against a template
//!
//! # Keyed reconciliation
//!
//! A list-bound container holds one element per array item, each stamped
//! with `data-m-k="<key>"`. On every pass:
//!
//! ```text
//! children (minus <template>)   items            result
//! [k=1][k=2][k=3]               [{id:3},{id:1}]  [k=3][k=1]
//!                                                 k=2 removed, k=3 moved,
//!                                                 k=1 untouched
//! ```
//!
//! - Items tracked by key (`item[key_field]`, stringified)
//! - New keys: clone the template's first element, stamp it, `on_create`
//! - Existing keys: refresh `data-m-f` fields in place (NO recreation!)
//! - Removed keys: node removed and released
//! - Position fixed with at most one insertion per item

use std::collections::{HashMap, HashSet};

use serde_json::Value;
use tracing::{debug, trace};

use crate::engine::Document;
use crate::types::{key_string, render_string, NodeId};

/// Stamped on every keyed child.
pub const KEY_ATTR: &str = "data-m-k";
/// Marks a descendant that shows one field of its item.
pub const FIELD_ATTR: &str = "data-m-f";

/// Show or hide an element, keeping `aria-hidden` in step with `hidden`.
pub fn show(doc: &mut Document, node: NodeId, visible: bool) {
    doc.set_hidden(node, !visible);
    doc.set_attr(node, "aria-hidden", if visible { "false" } else { "true" });
}

// =============================================================================
// reconcile() - Keyed list rendering
// =============================================================================

/// What one reconcile call changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileStats {
    /// Nodes cloned from the template.
    pub inserted: usize,
    /// Nodes removed because their key disappeared.
    pub removed: usize,
    /// Existing nodes repositioned.
    pub moved: usize,
}

impl ReconcileStats {
    pub fn is_noop(&self) -> bool {
        *self == Self::default()
    }
}

/// Patch `container`'s children so they correspond 1:1, in order, with
/// `items` by key.
///
/// # Arguments
///
/// * `template` - Element whose first element child is the item root
///   (normally a `<template>`)
/// * `key_field` - Item field holding the key; a missing field keys as
///   `"undefined"`
/// * `on_create` - Called once for each freshly cloned node, before its
///   fields are filled and before it is inserted
///
/// Non-template children without a key in the new set are removed, which
/// includes children that were never stamped. Items sharing a key share one
/// node; the last item's fields win.
pub fn reconcile<F>(
    doc: &mut Document,
    container: NodeId,
    items: &[Value],
    template: NodeId,
    key_field: &str,
    mut on_create: F,
) -> ReconcileStats
where
    F: FnMut(&mut Document, NodeId),
{
    let mut stats = ReconcileStats::default();

    let current = keyed_children(doc, container);
    let mut by_key: HashMap<String, NodeId> = current
        .iter()
        .filter_map(|&c| doc.attr(c, KEY_ATTR).map(|k| (k.to_string(), c)))
        .collect();

    let keys: Vec<String> = items.iter().map(|item| item_key(item, key_field)).collect();
    let wanted: HashSet<&str> = keys.iter().map(String::as_str).collect();

    for &child in &current {
        let keep = doc.attr(child, KEY_ATTR).is_some_and(|k| wanted.contains(k));
        if !keep {
            doc.remove(child);
            stats.removed += 1;
        }
    }

    for (index, (item, key)) in items.iter().zip(&keys).enumerate() {
        let existing = by_key.get(key).copied().filter(|&n| doc.contains(n));
        let (node, created) = match existing {
            Some(node) => (node, false),
            None => {
                let Some(node) = clone_item(doc, template) else {
                    debug!(%template, "template has no element child, skipping item");
                    continue;
                };
                doc.set_attr(node, KEY_ATTR, key);
                by_key.insert(key.clone(), node);
                on_create(doc, node);
                (node, true)
            }
        };

        fill_fields(doc, node, item);

        let at = keyed_children(doc, container).get(index).copied();
        if at != Some(node) {
            doc.insert_before(container, node, at);
            if created {
                stats.inserted += 1;
            } else {
                stats.moved += 1;
            }
        } else if created {
            stats.inserted += 1;
        }
    }

    trace!(%container, ?stats, "reconciled list");
    stats
}

/// Element children of a list container, minus templates.
pub fn keyed_children(doc: &Document, container: NodeId) -> Vec<NodeId> {
    doc.element_children(container)
        .into_iter()
        .filter(|&c| doc.tag(c) != Some("template"))
        .collect()
}

fn item_key(item: &Value, key_field: &str) -> String {
    key_string(item.get(key_field))
}

fn clone_item(doc: &mut Document, template: NodeId) -> Option<NodeId> {
    let root = doc.first_element_child(template)?;
    doc.clone_subtree(root)
}

fn fill_fields(doc: &mut Document, node: NodeId, item: &Value) {
    for field_node in doc.elements_with_attr(node, FIELD_ATTR) {
        let text = doc
            .attr(field_node, FIELD_ATTR)
            .map(|field| render_string(item.get(field)))
            .unwrap_or_default();
        doc.set_text_content(field_node, &text);
    }
}

// =============================================================================
// TESTS
// =============================================================================
