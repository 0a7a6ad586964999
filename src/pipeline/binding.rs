//! Binding Pass - Recompute every directive from the current state.
//!
//! There is no dependency tracking: any mutation triggers a full pass that
//! re-queries the document and rewrites whatever differs. Writes that would
//! not change anything (same text, class already present) are no-ops, so a
//! pass over unchanged state touches nothing.
//!
//! ```text
//! data-m-if     ──evaluate──────────► hidden + aria-hidden
//! data-m-class  ──class_condition───► add/remove class
//! data-m-bind   ──lookup──┬─ array ─► reconcile(template, data-m-key)
//!                         ├─ input ─► value / checked
//!                         └─ other ─► text through the |pipe chain
//! data-m-route  ──resolve───────────► hidden + aria-hidden, route params
//! ```
//!
//! Directive nodes are collected before each phase runs; nodes created by
//! list reconciliation are picked up on the next pass.

use std::rc::Rc;

use serde_json::Value;
use tracing::{debug, trace};

use super::router::{fragment_from_hash, resolve};
use super::Runtime;
use crate::enhance::EnhanceCtx;
use crate::primitives::expr::{class_condition, class_rules};
use crate::primitives::{apply_transforms, evaluate, reconcile, show, split_bind, ReconcileStats, Scope};
use crate::types::{is_truthy, render_string, NodeId};

pub const IF_ATTR: &str = "data-m-if";
pub const CLASS_ATTR: &str = "data-m-class";
pub const BIND_ATTR: &str = "data-m-bind";
pub const ROUTE_ATTR: &str = "data-m-route";
pub const TEMPLATE_ATTR: &str = "data-m-tpl";
pub const KEY_FIELD_ATTR: &str = "data-m-key";
const DEFAULT_KEY_FIELD: &str = "id";

/// What one binding pass did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderStats {
    /// `data-m-if` elements evaluated.
    pub conditionals: usize,
    /// `data-m-class` rules evaluated.
    pub class_rules: usize,
    /// `data-m-bind` elements written (lists included).
    pub bindings: usize,
    /// Lists whose template could not be found.
    pub skipped_lists: usize,
    /// Sum over every reconciled list.
    pub lists: ReconcileStats,
}

impl Runtime {
    /// Run one binding pass over the whole document.
    pub fn render(&mut self) -> RenderStats {
        let mut stats = RenderStats::default();

        let Self {
            doc,
            state,
            route_params,
            listeners,
            timers,
            storage,
            config,
            enhanced,
            focus,
            ..
        } = self;

        listeners.prune(doc);
        focus.prune(doc);
        enhanced.retain(|(node, _)| doc.contains(*node));

        let graph = Rc::clone(state.shared_root());
        let graph = graph.borrow();
        let scope = Scope::new(&graph, route_params);
        let root = doc.root();

        // Visibility
        for node in doc.elements_with_attr(root, IF_ATTR) {
            let expr = doc.attr(node, IF_ATTR).unwrap_or_default().to_string();
            show(doc, node, evaluate(&expr, &scope));
            stats.conditionals += 1;
        }

        // Classes
        for node in doc.elements_with_attr(root, CLASS_ATTR) {
            let spec = doc.attr(node, CLASS_ATTR).unwrap_or_default();
            let decisions: Vec<(String, bool)> = class_rules(spec)
                .into_iter()
                .map(|(class, cond)| (class.to_string(), class_condition(cond, &scope)))
                .collect();
            for (class, on) in decisions {
                doc.toggle_class(node, &class, Some(on));
                stats.class_rules += 1;
            }
        }

        // Values and lists
        for node in doc.elements_with_attr(root, BIND_ATTR) {
            if !doc.contains(node) {
                continue;
            }
            let spec = doc.attr(node, BIND_ATTR).unwrap_or_default().to_string();
            let (path, pipes) = split_bind(&spec);
            let value = scope.lookup(path);

            match &value {
                Some(Value::Array(items)) => {
                    let template = match doc.attr(node, TEMPLATE_ATTR) {
                        Some(id) => doc.get_element_by_id(id),
                        None => doc.query_selector(node, "template").ok().flatten(),
                    };
                    let Some(template) = template else {
                        debug!(%node, path, "list binding without template, skipping");
                        stats.skipped_lists += 1;
                        continue;
                    };
                    let key_field = doc
                        .attr(node, KEY_FIELD_ATTR)
                        .unwrap_or(DEFAULT_KEY_FIELD)
                        .to_string();
                    let dark_mode_key = config.dark_mode_key.as_str();
                    let storage = &**storage;
                    let list = reconcile(doc, node, items, template, &key_field, |doc, created| {
                        let mut ctx = EnhanceCtx {
                            doc,
                            listeners: &mut *listeners,
                            timers: &mut *timers,
                            storage,
                            dark_mode_key,
                            applied: &mut *enhanced,
                        };
                        super::mount::wire_directives(&mut ctx, created);
                    });
                    stats.lists.inserted += list.inserted;
                    stats.lists.removed += list.removed;
                    stats.lists.moved += list.moved;
                }
                _ if doc.is_input_like(node) => {
                    if doc.is_checkbox(node) {
                        doc.set_checked(node, is_truthy(value.as_ref()));
                    } else {
                        let text = render_string(value.as_ref());
                        if doc.value(node) != text {
                            doc.set_value(node, &text);
                        }
                    }
                }
                _ => {
                    let text = apply_transforms(render_string(value.as_ref()), &pipes);
                    doc.set_text_content(node, &text);
                }
            }
            stats.bindings += 1;
        }

        self.render_count += 1;
        trace!(pass = self.render_count, ?stats, "binding pass");
        stats
    }

    /// Match the current hash against every `data-m-route` element, then
    /// render.
    pub(crate) fn resolve_routes(&mut self) -> RenderStats {
        let root = self.doc.root();
        let sections: Vec<NodeId> = self.doc.elements_with_attr(root, ROUTE_ATTR);
        let patterns: Vec<String> = sections
            .iter()
            .map(|&s| self.doc.attr(s, ROUTE_ATTR).unwrap_or_default().to_string())
            .collect();
        let fragment = fragment_from_hash(&self.hash);
        let resolution = resolve(&fragment, &patterns);

        for (&section, &visible) in sections.iter().zip(&resolution.visible) {
            show(&mut self.doc, section, visible);
        }
        debug!(%fragment, params = ?resolution.params, "routes resolved");
        self.route_params = resolution.params;
        self.render()
    }
}
