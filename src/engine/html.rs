//! HTML - Loading markup into the arena and serializing it back out.
//!
//! Parsing goes through `html_parser`; its tree is walked once and copied
//! into [`Document`] nodes. Serialization writes attributes in stored order,
//! escapes text, and keeps `<script>`/`<style>` bodies raw.

use html_parser::{Dom, Element, Node as HtmlNode};
use tracing::debug;

use super::node::NodeKind;
use super::registry::Document;
use crate::error::DomError;
use crate::types::NodeId;

const VOID_ELEMENTS: [&str; 14] = [
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

const RAW_TEXT_ELEMENTS: [&str; 2] = ["script", "style"];

impl Document {
    /// Parse a full page or a fragment.
    ///
    /// A page with an `<html>` element becomes the document element; missing
    /// `<head>`/`<body>` are created. A fragment lands inside a fresh `<body>`.
    pub fn parse_html(html: &str) -> Result<Self, DomError> {
        let dom = Dom::parse(html).map_err(|e| DomError::Parse(e.to_string()))?;
        for error in &dom.errors {
            debug!(%error, "html parser recovered from malformed markup");
        }

        let mut doc = Document::new();
        let html_root = dom.children.iter().find_map(|n| match n {
            HtmlNode::Element(el) if el.name.eq_ignore_ascii_case("html") => Some(el),
            _ => None,
        });

        match html_root {
            Some(root) => {
                let skeleton = doc.document_element();
                doc.remove(skeleton);
                let html_el = doc.import_element(root);
                doc.append_child(doc.root(), html_el);
                doc.ensure_head_and_body(html_el);
            }
            None => {
                let body = doc.body();
                doc.import_children(body, &dom.children);
            }
        }
        Ok(doc)
    }

    /// Parse a fragment and append its nodes to `parent`.
    pub fn append_html(&mut self, parent: NodeId, html: &str) -> Result<Vec<NodeId>, DomError> {
        let dom = Dom::parse(html).map_err(|e| DomError::Parse(e.to_string()))?;
        Ok(self.import_children(parent, &dom.children))
    }

    fn import_children(&mut self, parent: NodeId, nodes: &[HtmlNode]) -> Vec<NodeId> {
        let mut imported = Vec::with_capacity(nodes.len());
        for node in nodes {
            let id = match node {
                HtmlNode::Element(el) => self.import_element(el),
                HtmlNode::Text(text) => self.create_text(&decode_entities(text)),
                HtmlNode::Comment(text) => self.create_comment(text),
            };
            self.append_child(parent, id);
            imported.push(id);
        }
        imported
    }

    fn import_element(&mut self, el: &Element) -> NodeId {
        let id = self.create_element(&el.name);
        if let Some(el_id) = &el.id {
            self.set_attr(id, "id", &decode_entities(el_id));
        }
        if !el.classes.is_empty() {
            self.set_attr(id, "class", &el.classes.join(" "));
        }
        // The parser hands attributes back unordered.
        let mut attrs: Vec<(&String, &Option<String>)> = el.attributes.iter().collect();
        attrs.sort_by(|a, b| a.0.cmp(b.0));
        for (name, value) in attrs {
            let value = value.as_deref().map(decode_entities).unwrap_or_default();
            self.set_attr(id, &name.to_ascii_lowercase(), &value);
        }
        if self.has_attr(id, "checked") {
            self.set_checked(id, true);
        }
        self.import_children(id, &el.children);
        id
    }

    fn ensure_head_and_body(&mut self, html_el: NodeId) {
        let has = |doc: &Self, tag: &str| {
            doc.element_children(html_el)
                .into_iter()
                .any(|c| doc.tag(c) == Some(tag))
        };
        if !has(self, "head") {
            let head = self.create_element("head");
            let first = self.children(html_el).first().copied();
            self.insert_before(html_el, head, first);
        }
        if !has(self, "body") {
            let body = self.create_element("body");
            let strays: Vec<NodeId> = self
                .children(html_el)
                .iter()
                .copied()
                .filter(|&c| self.tag(c) != Some("head"))
                .collect();
            for stray in strays {
                self.append_child(body, stray);
            }
            self.append_child(html_el, body);
        }
    }

    // =========================================================================
    // Serialization
    // =========================================================================

    /// Serialize the whole document.
    pub fn to_html(&self) -> String {
        self.inner_html(self.root())
    }

    /// Markup of the node itself and its subtree.
    pub fn outer_html(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.write_node(id, false, &mut out);
        out
    }

    /// Markup of the node's children.
    pub fn inner_html(&self, id: NodeId) -> String {
        let raw = self.tag(id).is_some_and(|t| RAW_TEXT_ELEMENTS.contains(&t));
        let mut out = String::new();
        for &child in self.children(id) {
            self.write_node(child, raw, &mut out);
        }
        out
    }

    fn write_node(&self, id: NodeId, raw_text: bool, out: &mut String) {
        let Some(node) = self.get(id) else { return };
        match node.kind() {
            NodeKind::Document => out.push_str(&self.inner_html(id)),
            NodeKind::Text(text) if raw_text => out.push_str(text),
            NodeKind::Text(text) => out.push_str(&escape_text(text)),
            NodeKind::Comment(text) => {
                out.push_str("<!--");
                out.push_str(text);
                out.push_str("-->");
            }
            NodeKind::Element(tag) => {
                out.push('<');
                out.push_str(tag);
                for (name, value) in node.attrs() {
                    out.push(' ');
                    out.push_str(name);
                    out.push_str("=\"");
                    out.push_str(&escape_attr(value));
                    out.push('"');
                }
                out.push('>');
                if VOID_ELEMENTS.contains(&tag.as_str()) {
                    return;
                }
                out.push_str(&self.inner_html(id));
                out.push_str("</");
                out.push_str(tag);
                out.push('>');
            }
        }
    }
}

fn escape_text(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn escape_attr(value: &str) -> String {
    value.replace('&', "&amp;").replace('"', "&quot;")
}

/// Decode the handful of named and numeric entities markup commonly carries.
fn decode_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find('&') {
        out.push_str(&rest[..start]);
        let tail = &rest[start..];
        let decoded = tail.find(';').filter(|&end| end <= 10).and_then(|end| {
            let entity = &tail[1..end];
            let ch = match entity {
                "amp" => Some('&'),
                "lt" => Some('<'),
                "gt" => Some('>'),
                "quot" => Some('"'),
                "apos" => Some('\''),
                "nbsp" => Some('\u{a0}'),
                _ => entity
                    .strip_prefix("#x")
                    .or_else(|| entity.strip_prefix("#X"))
                    .and_then(|hex| u32::from_str_radix(hex, 16).ok())
                    .or_else(|| entity.strip_prefix('#').and_then(|dec| dec.parse().ok()))
                    .and_then(char::from_u32),
            }?;
            Some((ch, end + 1))
        });
        match decoded {
            Some((ch, len)) => {
                out.push(ch);
                rest = &tail[len..];
            }
            None => {
                out.push('&');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_fragment_lands_in_body() {
        let doc = Document::parse_html(r#"<p id="greeting" class="a b">Hi</p>"#).unwrap();
        let p = doc.get_element_by_id("greeting").unwrap();
        assert_eq!(doc.parent(p), Some(doc.body()));
        assert_eq!(doc.class_list(p), vec!["a", "b"]);
        assert_eq!(doc.text_content(p), "Hi");
    }

    #[test]
    fn test_parse_full_page() {
        let doc = Document::parse_html(
            "<!DOCTYPE html><html><head><title>T</title></head><body><main></main></body></html>",
        )
        .unwrap();
        assert_eq!(doc.tag(doc.head()), Some("head"));
        assert_eq!(doc.tag(doc.body()), Some("body"));
        assert!(doc.query_selector(doc.root(), "body > main").unwrap().is_some());
    }

    #[test]
    fn test_checked_attribute_sets_property() {
        let doc = Document::parse_html(r#"<input type="checkbox" id="c" checked>"#).unwrap();
        let input = doc.get_element_by_id("c").unwrap();
        assert!(doc.checked(input));
    }

    #[test]
    fn test_outer_html_escapes_and_voids() {
        let mut doc = Document::new();
        let body = doc.body();
        let div = doc.create_element("div");
        doc.set_attr(div, "title", "a \"b\" & c");
        let br = doc.create_element("br");
        doc.append_child(body, div);
        doc.append_child(div, br);
        let text = doc.create_text("1 < 2");
        doc.append_child(div, text);

        assert_eq!(
            doc.outer_html(div),
            r#"<div title="a &quot;b&quot; &amp; c"><br>1 &lt; 2</div>"#
        );
    }

    #[test]
    fn test_style_body_is_raw() {
        let mut doc = Document::new();
        let style = doc.create_element("style");
        doc.set_text_content(style, "a>b{color:red}");
        assert_eq!(doc.outer_html(style), "<style>a>b{color:red}</style>");
    }

    #[test]
    fn test_decode_entities() {
        assert_eq!(decode_entities("a &amp; b"), "a & b");
        assert_eq!(decode_entities("&#65;&#x42;"), "AB");
        assert_eq!(decode_entities("fish & chips"), "fish & chips");
        assert_eq!(decode_entities("&bogus;"), "&bogus;");
    }
}
