//! Widget reactions and deferred tasks.
//!
//! Setup in [`super`] only registers [`Action`]s; everything that happens
//! when the user interacts with a widget lives here, on the [`Runtime`],
//! because reactions move focus, dispatch follow-up events and schedule
//! timers.

use tracing::{debug, warn};

use super::{
    panel_for, progress_max, Action, Enhancement, COMBOBOX_BLUR_DELAY, DARK_CLASS, OPTION_SELECTOR,
    OPTION_VALUE_ATTR, PROGRESS_BAR_CLASS, RIPPLE_CLASS, RIPPLE_LIFETIME,
};
use crate::pipeline::Runtime;
use crate::state::focus::focusable_elements;
use crate::state::{Event, Task};
use crate::types::{format_f64, NodeFlags, NodeId};

const RIPPLE_CSS: &str = "position:absolute;border-radius:50%;background:rgba(255,255,255,0.4);width:100%;padding-bottom:100%;left:0;top:0;transform:scale(0);animation:m-rp .4s ease-out;pointer-events:none;";

impl Runtime {
    pub(crate) fn run_action(&mut self, action: &Action, event: &Event, node: NodeId) {
        match *action {
            Action::Ripple => {
                let span = self.doc.create_element("span");
                self.doc.add_class(span, RIPPLE_CLASS);
                self.doc.set_style_text(span, RIPPLE_CSS);
                self.doc.append_child(node, span);
                self.timers.schedule(RIPPLE_LIFETIME, Task::RemoveNode(span));
            }
            Action::ModalBackdrop => {
                if event.target == node {
                    self.close_modal(node);
                }
            }
            Action::ModalEscape => {
                if event.is_key("Escape") {
                    self.close_modal(node);
                }
            }
            Action::SelectTab { tablist } => self.select_tab(tablist, node),
            Action::ToggleSection { body } => {
                let expanded = self.doc.attr(node, "aria-expanded") == Some("true");
                self.doc
                    .set_attr(node, "aria-expanded", if expanded { "false" } else { "true" });
                self.doc.set_hidden(body, expanded);
            }
            Action::ClickOnActivationKey => {
                if event.is_key("Enter") || event.is_key(" ") {
                    self.click(node);
                }
            }
            Action::ShowTooltip { tip } => {
                self.doc.set_style(tip, "visibility", "visible");
                self.doc.set_style(tip, "opacity", "1");
            }
            Action::HideTooltip { tip } => {
                self.doc.set_style(tip, "visibility", "hidden");
                self.doc.set_style(tip, "opacity", "0");
            }
            Action::ComboboxOpen { list } => {
                self.filter_options(node, list);
                self.doc.set_style(list, "display", "block");
                self.doc.set_attr(node, "aria-expanded", "true");
            }
            Action::ComboboxBlur { list } => {
                self.timers
                    .schedule(COMBOBOX_BLUR_DELAY, Task::HideCombobox { input: node, list });
            }
            Action::ComboboxFilter { list } => self.filter_options(node, list),
            Action::ComboboxKey { list } => self.combobox_key(event, node, list),
            Action::ComboboxPick { input, list } => self.pick_option(input, list, node),
            Action::ToggleDarkMode => {
                let html = self.doc.document_element();
                let dark = self.doc.toggle_class(html, DARK_CLASS, None);
                let key = self.config.dark_mode_key.clone();
                if let Err(err) = self.storage.set(&key, if dark { "true" } else { "false" }) {
                    warn!(%err, "failed to store dark mode flag");
                }
            }
        }
    }

    /// Run a timer task that fell due.
    pub(crate) fn run_task(&mut self, task: Task) {
        match task {
            Task::HideToast(toast) => {
                if self.doc.contains(toast) {
                    self.doc.remove_class(toast, "show");
                }
            }
            Task::Focus(node) => {
                self.focus(node);
            }
            Task::RemoveNode(node) => {
                if self.doc.contains(node) {
                    self.doc.remove(node);
                }
            }
            Task::HideCombobox { input, list } => {
                if self.doc.contains(input) && self.doc.contains(list) {
                    self.hide_options(input, list);
                }
            }
        }
    }

    // =========================================================================
    // Modal
    // =========================================================================

    /// Show a modal, trap Tab inside it and focus its first focusable
    /// element.
    pub fn open_modal(&mut self, modal: NodeId) {
        if !self.doc.contains(modal) {
            return;
        }
        if self.doc.tag(modal) == Some("dialog") {
            self.doc.set_attr(modal, "open", "");
        } else {
            self.doc.set_style(modal, "display", "flex");
            self.doc.set_style(modal, "align-items", "center");
            self.doc.set_style(modal, "justify-content", "center");
        }
        self.doc.set_attr(modal, "aria-hidden", "false");
        self.doc.set_flag(modal, NodeFlags::TRAPS_FOCUS, true);
        self.focus.push_trap(modal);
        if let Some(&first) = focusable_elements(&self.doc, modal).first() {
            self.focus(first);
        }
    }

    /// Hide a modal and release its trap. Focus held inside goes back to
    /// the element focused before it.
    pub fn close_modal(&mut self, modal: NodeId) {
        if !self.doc.contains(modal) {
            return;
        }
        if self.doc.tag(modal) == Some("dialog") {
            self.doc.remove_attr(modal, "open");
        } else {
            self.doc.set_style(modal, "display", "none");
        }
        self.doc.set_attr(modal, "aria-hidden", "true");
        self.doc.set_flag(modal, NodeFlags::TRAPS_FOCUS, false);
        self.focus.release_trap(modal);

        let focus_inside = self
            .focus
            .active()
            .is_some_and(|active| self.doc.is_inclusive_ancestor(modal, active));
        if focus_inside {
            match self.focus.take_restorable(&self.doc) {
                Some(previous) => {
                    self.focus(previous);
                }
                None => self.blur(),
            }
        }
    }

    // =========================================================================
    // Tabs
    // =========================================================================

    fn select_tab(&mut self, tablist: NodeId, tab: NodeId) {
        let tabs = self.doc.query_selector_all(tablist, "[data-m-tab]").unwrap_or_default();
        let panels = self
            .doc
            .query_selector_all(tablist, "[data-m-panel]")
            .unwrap_or_default();
        for &other in &tabs {
            self.doc.set_attr(other, "aria-selected", "false");
            self.doc.remove_class(other, "active");
        }
        for &panel in &panels {
            self.doc.set_hidden(panel, true);
        }
        self.doc.set_attr(tab, "aria-selected", "true");
        self.doc.add_class(tab, "active");
        if let Some(panel) = panel_for(&self.doc, &panels, tab) {
            self.doc.set_hidden(panel, false);
        }
    }

    // =========================================================================
    // Combobox
    // =========================================================================

    fn options(&self, list: NodeId) -> Vec<NodeId> {
        self.doc.query_selector_all(list, OPTION_SELECTOR).unwrap_or_default()
    }

    /// Hide options whose text does not contain the input's value
    /// (case-insensitive).
    fn filter_options(&mut self, input: NodeId, list: NodeId) {
        let needle = self.doc.value(input).to_lowercase();
        for option in self.options(list) {
            let matches = self
                .doc
                .attr(option, OPTION_VALUE_ATTR)
                .is_some_and(|v| v.to_lowercase().contains(&needle));
            self.doc.set_hidden(option, !matches);
        }
    }

    fn hide_options(&mut self, input: NodeId, list: NodeId) {
        self.doc.set_style(list, "display", "none");
        self.doc.set_attr(input, "aria-expanded", "false");
        self.mark_active_option(list, None);
    }

    /// Mark the option at `index` among the visible ones with
    /// `aria-selected`. DOM focus stays on the input.
    fn mark_active_option(&mut self, list: NodeId, index: Option<usize>) {
        for option in self.options(list) {
            self.doc.remove_attr(option, "aria-selected");
        }
        match index {
            Some(i) => {
                if let Some(&option) = self.visible_options(list).get(i) {
                    self.doc.set_attr(option, "aria-selected", "true");
                }
                self.combobox_active.insert(list, i);
            }
            None => {
                self.combobox_active.remove(&list);
            }
        }
    }

    fn visible_options(&self, list: NodeId) -> Vec<NodeId> {
        self.options(list)
            .into_iter()
            .filter(|&o| !self.doc.is_hidden(o))
            .collect()
    }

    fn combobox_key(&mut self, event: &Event, input: NodeId, list: NodeId) {
        let visible = self.visible_options(list);
        let active = self.combobox_active.get(&list).copied();
        match event.key.as_deref() {
            Some("ArrowDown") => {
                event.prevent_default();
                if visible.is_empty() {
                    return;
                }
                let next = active.map_or(0, |i| (i + 1).min(visible.len() - 1));
                self.mark_active_option(list, Some(next));
            }
            Some("ArrowUp") => {
                event.prevent_default();
                if visible.is_empty() {
                    return;
                }
                let next = active.map_or(0, |i| i.saturating_sub(1));
                self.mark_active_option(list, Some(next));
            }
            Some("Enter") => {
                let Some(option) = active.and_then(|i| visible.get(i).copied()) else {
                    return;
                };
                event.prevent_default();
                self.pick_option(input, list, option);
            }
            Some("Escape") => self.hide_options(input, list),
            _ => {}
        }
    }

    /// Copy the option's text into the input, announce it with an `input`
    /// event and close the list.
    fn pick_option(&mut self, input: NodeId, list: NodeId, option: NodeId) {
        let text = self
            .doc
            .attr(option, OPTION_VALUE_ATTR)
            .unwrap_or_default()
            .to_string();
        debug!(%input, value = %text, "combobox option picked");
        self.input(input, &text);
        self.hide_options(input, list);
    }

    // =========================================================================
    // Progress and dark mode
    // =========================================================================

    /// Move a progress enhancement to `value`. Returns false if `node` is
    /// not an enhanced progress bar.
    pub fn set_progress(&mut self, node: NodeId, value: f64) -> bool {
        if !self.enhanced.contains(&(node, Enhancement::Progress)) {
            return false;
        }
        let Some(bar) = self
            .doc
            .element_children(node)
            .into_iter()
            .find(|&c| self.doc.has_class(c, PROGRESS_BAR_CLASS))
        else {
            return false;
        };
        let max = progress_max(&self.doc, node);
        self.doc.set_attr(node, "aria-valuenow", &format_f64(value));
        self.doc
            .set_style(bar, "width", &format!("{}%", format_f64(value / max * 100.0)));
        true
    }

    pub fn is_dark_mode(&self) -> bool {
        self.doc.has_class(self.doc.document_element(), DARK_CLASS)
    }
}
