//! Toast notifications.
//!
//! One container per document, marked with `data-m-toast`. The first toast
//! creates it at the end of `<body>` unless a `toast` enhancement already
//! marked one. Showing a toast replaces the text and class; the `show`
//! class drops off when its timer fires.

use std::time::Duration;

use tracing::debug;

use super::TOAST_ATTR;
use crate::pipeline::Runtime;
use crate::state::Task;
use crate::types::NodeId;

const DEFAULT_KIND: &str = "info";

impl Runtime {
    /// Show `message` as a toast of `kind` (default `info`) for `duration`
    /// (default from the config). Returns the container.
    pub fn show_toast(&mut self, message: &str, kind: Option<&str>, duration: Option<Duration>) -> NodeId {
        let selector = format!("[{TOAST_ATTR}]");
        let toast = match self.q(&selector) {
            Some(existing) => existing,
            None => {
                let toast = self.doc.create_element("div");
                self.doc.set_attr(toast, TOAST_ATTR, "");
                self.doc.set_attr(toast, "aria-live", "polite");
                let body = self.doc.body();
                self.doc.append_child(body, toast);
                toast
            }
        };

        let kind = kind.filter(|k| !k.is_empty()).unwrap_or(DEFAULT_KIND);
        self.doc.set_text_content(toast, message);
        self.doc.set_attr(toast, "class", &format!("{kind} show"));
        self.doc.set_attr(toast, "role", if kind == "error" { "alert" } else { "status" });

        let duration = duration.unwrap_or_else(|| self.config.toast_duration());
        self.timers.schedule(duration, Task::HideToast(toast));
        debug!(%toast, kind, ?duration, "toast shown");
        toast
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use crate::pipeline::Runtime;

    #[test]
    fn test_toast_creates_container_and_hides() {
        let mut rt = Runtime::from_html("<main></main>").unwrap();
        rt.mount(None);
        let toast = rt.show_toast("Saved", None, None);
        let doc = rt.document();
        assert_eq!(doc.text_content(toast), "Saved");
        assert!(doc.has_class(toast, "info"));
        assert!(doc.has_class(toast, "show"));
        assert_eq!(doc.attr(toast, "role"), Some("status"));

        rt.advance(Duration::from_millis(2999));
        assert!(rt.document().has_class(toast, "show"));
        rt.advance(Duration::from_millis(1));
        assert!(!rt.document().has_class(toast, "show"));
        assert!(rt.document().has_class(toast, "info"));
    }

    #[test]
    fn test_toast_reuses_marked_container() {
        let mut rt = Runtime::from_html(r#"<div id="t" data-m-enhance="toast"></div>"#).unwrap();
        rt.mount(None);
        let marked = rt.q("#t").unwrap();
        let first = rt.show_toast("one", Some("error"), Some(Duration::from_millis(10)));
        let second = rt.show_toast("two", Some("success"), None);
        assert_eq!(first, marked);
        assert_eq!(second, marked);
        assert_eq!(rt.document().text_content(marked), "two");
        assert!(!rt.document().has_class(marked, "error"));
        assert_eq!(rt.qa("[data-m-toast]").len(), 1);
    }
}
