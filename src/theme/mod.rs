//! Theme System for spark-dom.
//!
//! A theme is an ordered set of CSS custom properties (`--m-p: #0af`) taken
//! from the manifest. Installing it writes one `<style id="m-vars">` into
//! `<head>`: the [`UTILITY_CSS`] sheet followed by a `:root{...}` rule with
//! the tokens, so manifest tokens win over the sheet's defaults.
//!
//! # Example
//!
//! ```rust
//! use spark_dom::engine::Document;
//! use spark_dom::theme::{install_stylesheet, Theme};
//!
//! let mut doc = Document::new();
//! let mut theme = Theme::new();
//! theme.set("--m-p", "#ff0066");
//! let style = install_stylesheet(&mut doc, &theme);
//! assert!(doc.text_content(style).ends_with(":root{--m-p:#ff0066;}"));
//! ```

pub mod utility;

pub use utility::{ANIMATION_CSS, UTILITY_CSS};

use serde_json::{Map, Value};
use tracing::trace;

use crate::engine::Document;
use crate::types::{display_string, NodeId};

/// Id of the token stylesheet.
pub const VARS_STYLE_ID: &str = "m-vars";
/// Id of the animation stylesheet.
pub const ANIM_STYLE_ID: &str = "m-anim";

// =============================================================================
// Theme - Ordered design tokens
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Theme {
    tokens: Vec<(String, String)>,
}

impl Theme {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a manifest `theme` object. Non-string values use their
    /// display form (`12` -> `"12"`).
    pub fn from_tokens(map: &Map<String, Value>) -> Self {
        let mut theme = Self::new();
        for (name, value) in map {
            theme.set(name, &display_string(value));
        }
        theme
    }

    /// Add or replace a token, keeping its original position on replace.
    pub fn set(&mut self, name: &str, value: &str) {
        match self.tokens.iter_mut().find(|(n, _)| n == name) {
            Some((_, v)) => *v = value.to_string(),
            None => self.tokens.push((name.to_string(), value.to_string())),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.tokens
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn tokens(&self) -> &[(String, String)] {
        &self.tokens
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// `:root{name:value;...}`
    pub fn root_rule(&self) -> String {
        let body: String = self
            .tokens
            .iter()
            .map(|(name, value)| format!("{name}:{value};"))
            .collect();
        format!(":root{{{body}}}")
    }

    /// Full text of the `m-vars` stylesheet.
    pub fn stylesheet(&self) -> String {
        format!("{UTILITY_CSS}{}", self.root_rule())
    }
}

// =============================================================================
// Installation
// =============================================================================

/// Write the theme stylesheet, reusing the existing `m-vars` element.
pub fn install_stylesheet(doc: &mut Document, theme: &Theme) -> NodeId {
    let (style, _) = style_element(doc, VARS_STYLE_ID);
    doc.set_text_content(style, &theme.stylesheet());
    trace!(tokens = theme.tokens.len(), "theme stylesheet installed");
    style
}

/// Add the animation stylesheet unless it is already present.
pub fn install_animations(doc: &mut Document) -> NodeId {
    let (style, created) = style_element(doc, ANIM_STYLE_ID);
    if created {
        doc.set_text_content(style, ANIMATION_CSS);
    }
    style
}

fn style_element(doc: &mut Document, id: &str) -> (NodeId, bool) {
    if let Some(existing) = doc.get_element_by_id(id) {
        return (existing, false);
    }
    let style = doc.create_element("style");
    doc.set_attr(style, "id", id);
    let head = doc.head();
    doc.append_child(head, style);
    (style, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_root_rule_keeps_order_and_replaces() {
        let mut theme = Theme::new();
        theme.set("--a", "1");
        theme.set("--b", "2");
        theme.set("--a", "3");
        assert_eq!(theme.root_rule(), ":root{--a:3;--b:2;}");
        assert_eq!(theme.get("--b"), Some("2"));
        assert_eq!(Theme::new().root_rule(), ":root{}");
    }

    #[test]
    fn test_from_tokens_stringifies() {
        let map = json!({"--m-p": "#000", "--gap": 4});
        let theme = Theme::from_tokens(map.as_object().unwrap());
        assert_eq!(theme.get("--gap"), Some("4"));
        assert_eq!(theme.get("--m-p"), Some("#000"));
    }

    #[test]
    fn test_install_reuses_element() {
        let mut doc = Document::new();
        let first = install_stylesheet(&mut doc, &Theme::new());
        let mut theme = Theme::new();
        theme.set("--x", "y");
        let second = install_stylesheet(&mut doc, &theme);

        assert_eq!(first, second);
        assert_eq!(doc.parent(first), Some(doc.head()));
        let css = doc.text_content(first);
        assert!(css.starts_with(UTILITY_CSS));
        assert!(css.ends_with(":root{--x:y;}"));
    }

    #[test]
    fn test_animations_installed_once() {
        let mut doc = Document::new();
        let a = install_animations(&mut doc);
        doc.set_text_content(a, "custom");
        let b = install_animations(&mut doc);
        assert_eq!(a, b);
        assert_eq!(doc.text_content(b), "custom");
        assert_eq!(doc.element_children(doc.head()).len(), 1);
    }
}
