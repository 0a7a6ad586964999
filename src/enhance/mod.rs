//! Enhancements - Declarative widgets wired from `data-m-enhance`.
//!
//! `data-m-enhance="modal ripple"` names one or more enhancements. Applying
//! one does two things:
//!
//! 1. **Setup** - ARIA roles, initial visibility and inline styles on the
//!    element and its parts
//! 2. **Wiring** - [`Listener::Widget`] entries whose [`Action`] runs when
//!    the event reaches the node
//!
//! ```text
//! <div data-m-enhance="accordion">
//!   <section data-m-acc>
//!     <h3 data-m-hd>Title</h3>   role=button aria-expanded tabindex=0
//!     <p data-m-bd>Body</p>      hidden until the header is activated
//!   </section>
//! </div>
//! ```
//!
//! Each enhancement is set up at most once per node, so repeated mounts
//! neither stack listeners nor reset widget state. Missing parts (a tooltip
//! without a tip, a combobox without an input) skip the enhancement.

pub mod actions;
pub mod toast;

use std::collections::HashSet;
use std::time::Duration;

use tracing::{debug, trace};

use crate::engine::Document;
use crate::state::{Listener, ListenerRegistry, Storage, Task, Timers};
use crate::types::{format_f64, NodeId};

/// Attribute listing a node's enhancements.
pub const ENHANCE_ATTR: &str = "data-m-enhance";
/// Marks the toast container.
pub const TOAST_ATTR: &str = "data-m-toast";
/// Filter text stamped on combobox options.
pub const OPTION_VALUE_ATTR: &str = "data-m-v";
/// Class of the fill element inside a progress bar.
pub const PROGRESS_BAR_CLASS: &str = "m-bar";
/// Class of the span a ripple click spawns.
pub const RIPPLE_CLASS: &str = "m-ripple";
/// Class toggled on `<html>` by the dark mode switch.
pub const DARK_CLASS: &str = "dark";

pub(crate) const OPTION_SELECTOR: &str = "[data-m-opt], li";
pub(crate) const RIPPLE_LIFETIME: Duration = Duration::from_millis(400);
pub(crate) const COMBOBOX_BLUR_DELAY: Duration = Duration::from_millis(150);

const TOOLTIP_CSS: &str = "position:absolute;visibility:hidden;opacity:0;transition:opacity .2s;z-index:9999;background:#333;color:#fff;padding:4px 8px;border-radius:4px;font-size:12px;white-space:nowrap;";
const LISTBOX_CSS: &str = "position:absolute;max-height:200px;overflow:auto;background:#fff;border:1px solid #ccc;display:none;z-index:9999;width:100%;";
const PROGRESS_CSS: &str = "width:100%;height:8px;background:#e0e0e0;border-radius:4px;overflow:hidden;";

// =============================================================================
// Enhancement - The closed set of widget names
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Enhancement {
    Ripple,
    Modal,
    Tabs,
    Accordion,
    Disclosure,
    Tooltip,
    /// Also spelled `filterable`.
    Combobox,
    Progress,
    Date,
    Toast,
    DarkMode,
    Primary,
    Secondary,
    Disabled,
    Autofocus,
    /// Marker only; forms are checked with `validate_form`.
    Validate,
}

impl Enhancement {
    pub fn parse(name: &str) -> Option<Self> {
        Some(match name {
            "ripple" => Self::Ripple,
            "modal" => Self::Modal,
            "tabs" => Self::Tabs,
            "accordion" => Self::Accordion,
            "disclosure" => Self::Disclosure,
            "tooltip" => Self::Tooltip,
            "combobox" | "filterable" => Self::Combobox,
            "progress" => Self::Progress,
            "date" => Self::Date,
            "toast" => Self::Toast,
            "darkmode" => Self::DarkMode,
            "primary" => Self::Primary,
            "secondary" => Self::Secondary,
            "disabled" => Self::Disabled,
            "autofocus" => Self::Autofocus,
            "validate" => Self::Validate,
            _ => return None,
        })
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Ripple => "ripple",
            Self::Modal => "modal",
            Self::Tabs => "tabs",
            Self::Accordion => "accordion",
            Self::Disclosure => "disclosure",
            Self::Tooltip => "tooltip",
            Self::Combobox => "combobox",
            Self::Progress => "progress",
            Self::Date => "date",
            Self::Toast => "toast",
            Self::DarkMode => "darkmode",
            Self::Primary => "primary",
            Self::Secondary => "secondary",
            Self::Disabled => "disabled",
            Self::Autofocus => "autofocus",
            Self::Validate => "validate",
        }
    }

    /// Parse a space-separated list, dropping unknown names.
    pub fn list(spec: &str) -> Vec<Self> {
        spec.split_whitespace()
            .filter_map(|name| {
                let parsed = Self::parse(name);
                if parsed.is_none() {
                    trace!(name, "unknown enhancement");
                }
                parsed
            })
            .collect()
    }
}

// =============================================================================
// Action - Widget reactions carried by listeners
// =============================================================================

/// A built-in reaction, run by [`Runtime::dispatch`](crate::Runtime::dispatch)
/// when its event reaches the node it was registered on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Spawn a ripple span inside the node.
    Ripple,
    /// Close the modal when the click landed on the backdrop itself.
    ModalBackdrop,
    /// Close the modal on Escape.
    ModalEscape,
    /// Select this tab inside `tablist`.
    SelectTab { tablist: NodeId },
    /// Flip `aria-expanded` on the node and the visibility of `body`.
    ToggleSection { body: NodeId },
    /// Turn Enter and Space into a click.
    ClickOnActivationKey,
    ShowTooltip { tip: NodeId },
    HideTooltip { tip: NodeId },
    /// Input focused: filter and open the list.
    ComboboxOpen { list: NodeId },
    /// Input blurred: close the list after a short delay.
    ComboboxBlur { list: NodeId },
    /// Input edited: filter the options.
    ComboboxFilter { list: NodeId },
    /// Arrow keys, Enter and Escape on the input.
    ComboboxKey { list: NodeId },
    /// An option was clicked.
    ComboboxPick { input: NodeId, list: NodeId },
    ToggleDarkMode,
}

// =============================================================================
// Setup
// =============================================================================

/// The runtime pieces enhancement setup writes to.
pub(crate) struct EnhanceCtx<'a> {
    pub doc: &'a mut Document,
    pub listeners: &'a mut ListenerRegistry,
    pub timers: &'a mut Timers,
    pub storage: &'a dyn Storage,
    pub dark_mode_key: &'a str,
    pub applied: &'a mut HashSet<(NodeId, Enhancement)>,
}

impl EnhanceCtx<'_> {
    fn on(&mut self, node: NodeId, kind: &str, action: Action) {
        self.listeners.add(node, kind, Listener::Widget(action));
    }

    fn query(&self, scope: NodeId, selector: &str) -> Option<NodeId> {
        self.doc.query_selector(scope, selector).ok().flatten()
    }

    fn query_all(&self, scope: NodeId, selector: &str) -> Vec<NodeId> {
        self.doc.query_selector_all(scope, selector).unwrap_or_default()
    }
}

/// Apply every enhancement `node` names. Returns how many were newly set up.
pub(crate) fn apply(ctx: &mut EnhanceCtx<'_>, node: NodeId) -> usize {
    let Some(spec) = ctx.doc.attr(node, ENHANCE_ATTR) else {
        return 0;
    };
    let mut count = 0;
    for enhancement in Enhancement::list(spec) {
        if !ctx.applied.insert((node, enhancement)) {
            continue;
        }
        setup(ctx, node, enhancement);
        count += 1;
    }
    count
}

/// Apply enhancements to `scope` and every element below it.
pub(crate) fn apply_tree(ctx: &mut EnhanceCtx<'_>, scope: NodeId) -> usize {
    let mut nodes = vec![scope];
    nodes.extend(ctx.doc.elements_with_attr(scope, ENHANCE_ATTR));
    nodes.into_iter().map(|node| apply(ctx, node)).sum()
}

fn setup(ctx: &mut EnhanceCtx<'_>, el: NodeId, enhancement: Enhancement) {
    debug!(node = %el, enhancement = enhancement.name(), "enhancing");
    match enhancement {
        Enhancement::Ripple => {
            ctx.doc.set_style(el, "position", "relative");
            ctx.doc.set_style(el, "overflow", "hidden");
            ctx.on(el, "click", Action::Ripple);
        }
        Enhancement::Modal => setup_modal(ctx, el),
        Enhancement::Tabs => setup_tabs(ctx, el),
        Enhancement::Accordion => setup_accordion(ctx, el),
        Enhancement::Disclosure => setup_disclosure(ctx, el),
        Enhancement::Tooltip => setup_tooltip(ctx, el),
        Enhancement::Combobox => setup_combobox(ctx, el),
        Enhancement::Progress => setup_progress(ctx, el),
        Enhancement::Date => {
            if ctx.doc.tag(el) == Some("input") && ctx.doc.input_type(el) != "date" {
                ctx.doc.set_attr(el, "type", "date");
            }
            if !ctx.doc.has_attr(el, "aria-label") {
                ctx.doc.set_attr(el, "aria-label", "Date input");
            }
        }
        Enhancement::Toast => {
            ctx.doc.set_attr(el, TOAST_ATTR, "");
            ctx.doc.set_attr(el, "aria-live", "polite");
        }
        Enhancement::DarkMode => {
            match ctx.storage.get(ctx.dark_mode_key) {
                Ok(Some(saved)) if saved == "true" => {
                    let html = ctx.doc.document_element();
                    ctx.doc.add_class(html, DARK_CLASS);
                }
                Ok(_) => {}
                Err(err) => debug!(%err, "dark mode flag unreadable"),
            }
            ctx.on(el, "click", Action::ToggleDarkMode);
        }
        Enhancement::Primary | Enhancement::Secondary => ctx.doc.add_class(el, "tr"),
        Enhancement::Disabled => {
            ctx.doc.set_attr(el, "disabled", "");
            ctx.doc.set_attr(el, "aria-disabled", "true");
            ctx.doc.set_style(el, "opacity", "0.5");
            ctx.doc.set_style(el, "cursor", "not-allowed");
        }
        Enhancement::Autofocus => {
            ctx.timers.schedule(Duration::ZERO, Task::Focus(el));
        }
        Enhancement::Validate => {}
    }
}

fn setup_modal(ctx: &mut EnhanceCtx<'_>, el: NodeId) {
    ctx.doc.set_attr(el, "role", "dialog");
    ctx.doc.set_attr(el, "aria-modal", "true");
    if ctx.doc.tag(el) != Some("dialog") {
        ctx.doc.set_style(el, "display", "none");
        ctx.doc.set_style(el, "position", "fixed");
        ctx.doc.set_style(el, "inset", "0");
        ctx.doc.set_style(el, "z-index", "9999");
    }
    ctx.on(el, "click", Action::ModalBackdrop);
    ctx.on(el, "keydown", Action::ModalEscape);
}

fn setup_tabs(ctx: &mut EnhanceCtx<'_>, el: NodeId) {
    let tabs = ctx.query_all(el, "[data-m-tab]");
    let panels = ctx.query_all(el, "[data-m-panel]");
    ctx.doc.set_attr(el, "role", "tablist");

    for (i, &tab) in tabs.iter().enumerate() {
        let first = i == 0;
        ctx.doc.set_attr(tab, "role", "tab");
        ctx.doc.set_attr(tab, "aria-selected", if first { "true" } else { "false" });
        if ctx.doc.attr(tab, "id").is_none_or(str::is_empty) {
            ctx.doc.set_attr(tab, "id", &format!("mt{i}"));
        }
        let tab_id = ctx.doc.attr(tab, "id").unwrap_or_default().to_string();
        if let Some(panel) = panel_for(ctx.doc, &panels, tab) {
            ctx.doc.set_attr(panel, "role", "tabpanel");
            ctx.doc.set_attr(panel, "aria-labelledby", &tab_id);
            ctx.doc.set_hidden(panel, !first);
        }
        ctx.on(tab, "click", Action::SelectTab { tablist: el });
    }
}

/// Panel whose `data-m-panel` equals the tab's `data-m-tab`.
pub(crate) fn panel_for(doc: &Document, panels: &[NodeId], tab: NodeId) -> Option<NodeId> {
    let name = doc.attr(tab, "data-m-tab")?;
    panels
        .iter()
        .copied()
        .find(|&p| doc.attr(p, "data-m-panel") == Some(name))
}

fn setup_accordion(ctx: &mut EnhanceCtx<'_>, el: NodeId) {
    for item in ctx.query_all(el, "[data-m-acc]") {
        let header = ctx
            .query(item, "[data-m-hd]")
            .or_else(|| ctx.doc.first_element_child(item));
        let body = ctx
            .query(item, "[data-m-bd]")
            .or_else(|| ctx.doc.last_element_child(item));
        let (Some(header), Some(body)) = (header, body) else {
            continue;
        };
        ctx.doc.set_attr(header, "role", "button");
        ctx.doc.set_attr(header, "aria-expanded", "false");
        ctx.doc.set_attr(header, "tabindex", "0");
        ctx.doc.set_hidden(body, true);
        ctx.on(header, "click", Action::ToggleSection { body });
        ctx.on(header, "keydown", Action::ClickOnActivationKey);
    }
}

fn setup_disclosure(ctx: &mut EnhanceCtx<'_>, el: NodeId) {
    let button = ctx
        .query(el, "button")
        .or_else(|| ctx.doc.first_element_child(el));
    let content = ctx
        .query(el, "[data-m-content]")
        .or_else(|| ctx.doc.last_element_child(el));
    let (Some(button), Some(content)) = (button, content) else {
        debug!(node = %el, "disclosure without button or content");
        return;
    };
    ctx.doc.set_attr(button, "aria-expanded", "false");
    ctx.doc.set_hidden(content, true);
    ctx.on(button, "click", Action::ToggleSection { body: content });
}

fn setup_tooltip(ctx: &mut EnhanceCtx<'_>, el: NodeId) {
    let target = ctx.doc.first_element_child(el);
    let tip = ctx
        .query(el, "[data-m-tip]")
        .or_else(|| ctx.doc.last_element_child(el));
    let (Some(target), Some(tip)) = (target, tip) else {
        debug!(node = %el, "tooltip without target or tip");
        return;
    };
    ctx.doc.set_attr(tip, "role", "tooltip");
    ctx.doc.set_style_text(tip, TOOLTIP_CSS);
    ctx.doc.set_style(el, "position", "relative");
    for kind in ["mouseenter", "focus"] {
        ctx.on(target, kind, Action::ShowTooltip { tip });
    }
    for kind in ["mouseleave", "blur"] {
        ctx.on(target, kind, Action::HideTooltip { tip });
    }
}

fn setup_combobox(ctx: &mut EnhanceCtx<'_>, el: NodeId) {
    let input = ctx.query(el, "input");
    let list = ctx.query(el, "ul, ol, [data-m-list]");
    let (Some(input), Some(list)) = (input, list) else {
        debug!(node = %el, "combobox without input or list");
        return;
    };
    ctx.doc.set_attr(input, "role", "combobox");
    ctx.doc.set_attr(input, "aria-expanded", "false");
    ctx.doc.set_attr(input, "aria-autocomplete", "list");
    ctx.doc.set_attr(list, "role", "listbox");
    ctx.doc.set_style_text(list, LISTBOX_CSS);
    ctx.doc.set_style(el, "position", "relative");

    for option in ctx.query_all(list, OPTION_SELECTOR) {
        let text = ctx.doc.text_content(option);
        ctx.doc.set_attr(option, "role", "option");
        ctx.doc.set_attr(option, "tabindex", "-1");
        ctx.doc.set_attr(option, OPTION_VALUE_ATTR, &text);
        ctx.on(option, "click", Action::ComboboxPick { input, list });
    }

    ctx.on(input, "focus", Action::ComboboxOpen { list });
    ctx.on(input, "blur", Action::ComboboxBlur { list });
    ctx.on(input, "input", Action::ComboboxFilter { list });
    ctx.on(input, "keydown", Action::ComboboxKey { list });
}

fn setup_progress(ctx: &mut EnhanceCtx<'_>, el: NodeId) {
    let max = progress_max(ctx.doc, el);
    let value = ctx
        .doc
        .numeric_attr(el, "data-m-value")
        .unwrap_or(0.0);
    ctx.doc.set_attr(el, "role", "progressbar");
    ctx.doc.set_attr(el, "aria-valuemin", "0");
    ctx.doc.set_attr(el, "aria-valuemax", &format_f64(max));
    ctx.doc.set_attr(el, "aria-valuenow", &format_f64(value));
    ctx.doc.set_style_text(el, PROGRESS_CSS);

    let bar = ctx.doc.create_element("div");
    ctx.doc.add_class(bar, PROGRESS_BAR_CLASS);
    ctx.doc.set_style_text(
        bar,
        &format!(
            "height:100%;background:var(--m-p,#0066ff);width:{}%;transition:width .3s;",
            format_f64(value / max * 100.0)
        ),
    );
    ctx.doc.append_child(el, bar);
}

/// `data-m-max`, with zero or unparsable values meaning 100.
pub(crate) fn progress_max(doc: &Document, el: NodeId) -> f64 {
    doc.numeric_attr(el, "data-m-max")
        .filter(|&m| m != 0.0)
        .unwrap_or(100.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::MemoryStorage;

    struct Fixture {
        doc: Document,
        listeners: ListenerRegistry,
        timers: Timers,
        storage: MemoryStorage,
        applied: HashSet<(NodeId, Enhancement)>,
    }

    impl Fixture {
        fn new(html: &str) -> Self {
            Self {
                doc: Document::parse_html(html).unwrap(),
                listeners: ListenerRegistry::new(),
                timers: Timers::new(),
                storage: MemoryStorage::new(),
                applied: HashSet::new(),
            }
        }

        fn apply_all(&mut self) -> usize {
            let root = self.doc.root();
            let mut ctx = EnhanceCtx {
                doc: &mut self.doc,
                listeners: &mut self.listeners,
                timers: &mut self.timers,
                storage: &self.storage,
                dark_mode_key: "dark",
                applied: &mut self.applied,
            };
            apply_tree(&mut ctx, root)
        }

        fn q(&self, selector: &str) -> NodeId {
            self.doc.query_selector(self.doc.root(), selector).unwrap().unwrap()
        }
    }

    #[test]
    fn test_parse_names() {
        assert_eq!(Enhancement::parse("filterable"), Some(Enhancement::Combobox));
        assert_eq!(Enhancement::parse("sparkle"), None);
        assert_eq!(
            Enhancement::list("  modal  nope ripple "),
            vec![Enhancement::Modal, Enhancement::Ripple]
        );
        assert_eq!(Enhancement::Combobox.name(), "combobox");
    }

    #[test]
    fn test_apply_is_once_per_node() {
        let mut f = Fixture::new(r#"<button data-m-enhance="ripple primary">Go</button>"#);
        assert_eq!(f.apply_all(), 2);
        assert_eq!(f.apply_all(), 0);
        let button = f.q("button");
        assert_eq!(f.listeners.listeners(button, "click"), vec![Listener::Widget(Action::Ripple)]);
        assert!(f.doc.has_class(button, "tr"));
        assert_eq!(f.doc.style_prop(button, "overflow").as_deref(), Some("hidden"));
    }

    #[test]
    fn test_tabs_setup() {
        let mut f = Fixture::new(
            r#"<div data-m-enhance="tabs">
                 <button data-m-tab="a">A</button><button data-m-tab="b" id="tb">B</button>
                 <div data-m-panel="a">pa</div><div data-m-panel="b">pb</div>
               </div>"#,
        );
        f.apply_all();
        let a = f.q("[data-m-tab=a]");
        let pb = f.q("[data-m-panel=b]");
        assert_eq!(f.doc.attr(a, "id"), Some("mt0"));
        assert_eq!(f.doc.attr(a, "aria-selected"), Some("true"));
        assert_eq!(f.doc.attr(pb, "aria-labelledby"), Some("tb"));
        assert!(f.doc.is_hidden(pb));
        assert!(!f.doc.is_hidden(f.q("[data-m-panel=a]")));
    }

    #[test]
    fn test_accordion_and_disclosure_parts() {
        let mut f = Fixture::new(
            r#"<div data-m-enhance="accordion"><section data-m-acc><h3>T</h3><p>B</p></section></div>
               <div data-m-enhance="disclosure"><span>x</span><button>Toggle</button><p data-m-content>C</p></div>"#,
        );
        f.apply_all();
        let h3 = f.q("h3");
        assert_eq!(f.doc.attr(h3, "role"), Some("button"));
        assert_eq!(f.doc.attr(h3, "tabindex"), Some("0"));
        assert!(f.doc.is_hidden(f.q("section p")));
        assert_eq!(f.listeners.listeners(h3, "keydown"), vec![Listener::Widget(Action::ClickOnActivationKey)]);

        let toggle = f.q("button");
        assert_eq!(f.doc.attr(toggle, "aria-expanded"), Some("false"));
        assert!(f.doc.is_hidden(f.q("[data-m-content]")));
    }

    #[test]
    fn test_missing_parts_skip() {
        let mut f = Fixture::new(
            r#"<div data-m-enhance="combobox"><span>no input</span></div><div data-m-enhance="tooltip"></div>"#,
        );
        f.apply_all();
        assert!(f.listeners.is_empty());
    }

    #[test]
    fn test_combobox_setup() {
        let mut f = Fixture::new(
            r#"<div data-m-enhance="combobox"><input><ul><li>Apple</li><li>Pear</li></ul></div>"#,
        );
        f.apply_all();
        let input = f.q("input");
        let list = f.q("ul");
        assert_eq!(f.doc.attr(input, "role"), Some("combobox"));
        assert_eq!(f.doc.style_prop(list, "display").as_deref(), Some("none"));
        let pear = f.q("li:not([data-m-v=Apple])");
        assert_eq!(f.doc.attr(pear, OPTION_VALUE_ATTR), Some("Pear"));
        assert!(f.listeners.has(pear, "click", &Listener::Widget(Action::ComboboxPick { input, list })));
        assert!(f.listeners.has(input, "blur", &Listener::Widget(Action::ComboboxBlur { list })));
    }

    #[test]
    fn test_progress_and_misc() {
        let mut f = Fixture::new(
            r#"<div data-m-enhance="progress" data-m-max="0" data-m-value="25"></div>
               <input data-m-enhance="date disabled autofocus">"#,
        );
        f.apply_all();
        let progress = f.q("[data-m-enhance=progress]");
        assert_eq!(f.doc.attr(progress, "aria-valuemax"), Some("100"));
        assert_eq!(f.doc.attr(progress, "aria-valuenow"), Some("25"));
        let bar = f.doc.last_element_child(progress).unwrap();
        assert!(f.doc.has_class(bar, PROGRESS_BAR_CLASS));
        assert_eq!(f.doc.style_prop(bar, "width").as_deref(), Some("25%"));

        let input = f.q("input");
        assert_eq!(f.doc.attr(input, "type"), Some("date"));
        assert_eq!(f.doc.attr(input, "aria-label"), Some("Date input"));
        assert_eq!(f.doc.attr(input, "aria-disabled"), Some("true"));
        assert_eq!(f.timers.pending(), 1);
    }

    #[test]
    fn test_darkmode_restores_flag() {
        let mut f = Fixture::new(r#"<button data-m-enhance="darkmode">D</button>"#);
        f.storage = MemoryStorage::with_entries([("dark", "true")]);
        f.apply_all();
        assert!(f.doc.has_class(f.doc.document_element(), DARK_CLASS));
    }
}
