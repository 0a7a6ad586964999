//! Translations - Locale tables and `data-m-tx` application.
//!
//! A key may be written as `@key` or `key`. Lookup goes to the active
//! locale's table, then the fallback locale's table. A key found in neither
//! comes back exactly as it was passed in, `@` included, so a missing
//! translation is visible on the page.

use serde_json::Value;
use tracing::trace;

use crate::engine::Document;
use crate::pipeline::manifest::Locales;
use crate::types::display_string;

/// Attribute naming the translation key of an element.
pub const TX_ATTR: &str = "data-m-tx";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Translations {
    locales: Locales,
    locale: String,
    fallback: String,
}

impl Translations {
    pub fn new(locale: &str, fallback: &str) -> Self {
        Self {
            locales: Locales::new(),
            locale: locale.to_string(),
            fallback: fallback.to_string(),
        }
    }

    /// Replace every table.
    pub fn install(&mut self, locales: Locales) {
        self.locales = locales;
    }

    pub fn locale(&self) -> &str {
        &self.locale
    }

    pub fn set_locale(&mut self, locale: &str) {
        self.locale = locale.to_string();
    }

    pub fn has_locale(&self, locale: &str) -> bool {
        self.locales.contains_key(locale)
    }

    /// Translate `key` (`@key` or `key`).
    pub fn translate(&self, key: &str) -> String {
        if key.is_empty() {
            return String::new();
        }
        let bare = key.strip_prefix('@').unwrap_or(key);
        let table = self
            .locales
            .get(&self.locale)
            .or_else(|| self.locales.get(&self.fallback));
        match table.and_then(|t| t.get(bare)) {
            Some(Value::Null) | None => key.to_string(),
            Some(text) => display_string(text),
        }
    }

    /// Set the text of every `data-m-tx` element. Returns how many were
    /// written.
    pub fn apply(&self, doc: &mut Document) -> usize {
        let root = doc.root();
        let mut count = 0;
        for node in doc.elements_with_attr(root, TX_ATTR) {
            let Some(key) = doc.attr(node, TX_ATTR).filter(|k| !k.is_empty()) else {
                continue;
            };
            let text = self.translate(&format!("@{key}"));
            doc.set_text_content(node, &text);
            count += 1;
        }
        trace!(locale = %self.locale, count, "translations applied");
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn translations() -> Translations {
        let mut t = Translations::new("fr", "en");
        let locales: Locales = serde_json::from_value(json!({
            "en": {"hello": "Hello", "bye": "Bye", "n": 3},
            "fr": {"hello": "Bonjour"}
        }))
        .unwrap();
        t.install(locales);
        t
    }

    #[test]
    fn test_active_locale_then_missing() {
        let t = translations();
        assert_eq!(t.translate("@hello"), "Bonjour");
        assert_eq!(t.translate("hello"), "Bonjour");
        // The active table exists, so no fallback to `en` per key.
        assert_eq!(t.translate("@bye"), "@bye");
        assert_eq!(t.translate(""), "");
    }

    #[test]
    fn test_fallback_table_when_locale_unknown() {
        let mut t = translations();
        t.set_locale("de");
        assert!(!t.has_locale("de"));
        assert_eq!(t.translate("bye"), "Bye");
        assert_eq!(t.translate("n"), "3");
    }

    #[test]
    fn test_apply_sets_text() {
        let mut doc = Document::parse_html(
            r#"<p data-m-tx="hello">x</p><p data-m-tx="gone">y</p><p data-m-tx="">z</p>"#,
        )
        .unwrap();
        let t = translations();
        assert_eq!(t.apply(&mut doc), 2);
        let html = doc.inner_html(doc.body());
        assert!(html.contains(">Bonjour<"));
        assert!(html.contains(">@gone<"));
        assert!(html.contains(">z<"));
    }
}
