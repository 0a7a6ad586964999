//! Mount API - Application context and lifecycle.
//!
//! A [`Runtime`] owns everything one hosted page needs: the document, the
//! observed state graph, translations, theme, handlers, listeners, focus,
//! timers and durable storage. Nothing is global; two runtimes never share
//! state.
//!
//! # Example
//!
//! ```rust
//! use spark_dom::{Document, Manifest, Runtime};
//! use serde_json::json;
//!
//! let doc = Document::parse_html(r#"<p data-m-bind="count"></p>"#).unwrap();
//! let mut rt = Runtime::new(doc);
//! rt.mount(Some(Manifest::from_value(json!({"rootState": {"count": 0}})).unwrap()));
//!
//! rt.patch_state(json!({"count": 5}));
//! let p = rt.q("p").unwrap();
//! assert_eq!(rt.document().text_content(p), "5");
//! ```
//!
//! # Mutation flow
//!
//! ```text
//! set / patch_state / input binding / handler
//!     └─► ObservableState ──Change──► ChangeQueue
//!                                         └─► flush: persist + render (once per change)
//! ```

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;
use std::time::Duration;

use serde_json::{Map, Value};
use tracing::{debug, info, trace, warn};

use super::manifest::Manifest;
use crate::config::RuntimeConfig;
use crate::engine::Document;
use crate::enhance::{self, EnhanceCtx, Enhancement};
use crate::error::{DomError, ManifestError};
use crate::i18n::Translations;
use crate::state::events::event_alias;
use crate::state::observable::empty_object;
use crate::state::{
    Change, ChangeListener, Event, FocusState, Handler, HandlerRegistry, Listener, ListenerRegistry,
    MemoryStorage, ObservableState, StateScope, Storage, Timers,
};
use crate::theme::{self, Theme};
use crate::types::{NodeId, RouteParams};
use crate::validate::{self, ValidationReport};

use super::binding::BIND_ATTR;

/// Attribute wiring events to named handlers: `click:save, k:onKey`.
pub const ON_ATTR: &str = "data-m-on";
/// State key mirroring connectivity.
pub const OFFLINE_KEY: &str = "_offline";

// =============================================================================
// Change queue
// =============================================================================

/// Collects changes from the observable store until the runtime flushes.
#[derive(Debug, Default)]
pub(crate) struct ChangeQueue {
    changes: RefCell<Vec<Change>>,
}

impl ChangeQueue {
    fn drain(&self) -> Vec<Change> {
        std::mem::take(&mut *self.changes.borrow_mut())
    }
}

impl ChangeListener for ChangeQueue {
    fn on_change(&self, change: &Change) {
        self.changes.borrow_mut().push(change.clone());
    }
}

// =============================================================================
// Runtime
// =============================================================================

/// The application context of one hosted document.
pub struct Runtime {
    pub(crate) doc: Document,
    pub(crate) state: ObservableState,
    pub(crate) changes: Rc<ChangeQueue>,
    pub(crate) route_params: RouteParams,
    pub(crate) hash: String,
    pub(crate) translations: Translations,
    pub(crate) theme: Theme,
    pub(crate) persist_keys: Vec<String>,
    pub(crate) handlers: HandlerRegistry,
    pub(crate) listeners: ListenerRegistry,
    pub(crate) focus: FocusState,
    pub(crate) timers: Timers,
    pub(crate) storage: Box<dyn Storage>,
    pub(crate) config: RuntimeConfig,
    pub(crate) enhanced: HashSet<(NodeId, Enhancement)>,
    /// Active option index per combobox list.
    pub(crate) combobox_active: HashMap<NodeId, usize>,
    pub(crate) online: bool,
    pub(crate) mounted: bool,
    pub(crate) render_count: u64,
}

impl std::fmt::Debug for Runtime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runtime")
            .field("nodes", &self.doc.node_count())
            .field("hash", &self.hash)
            .field("locale", &self.translations.locale())
            .field("handlers", &self.handlers)
            .field("listeners", &self.listeners.len())
            .field("mounted", &self.mounted)
            .field("render_count", &self.render_count)
            .finish()
    }
}

impl Runtime {
    /// A runtime over `doc` with default configuration and in-memory
    /// storage.
    pub fn new(doc: Document) -> Self {
        Self::with_config(doc, RuntimeConfig::default())
    }

    pub fn with_config(doc: Document, config: RuntimeConfig) -> Self {
        let changes = Rc::new(ChangeQueue::default());
        let listener: Rc<dyn ChangeListener> = changes.clone();
        let state = ObservableState::new(Rc::new(RefCell::new(empty_object())), listener);
        Self {
            doc,
            state,
            changes,
            route_params: RouteParams::new(),
            hash: String::new(),
            translations: Translations::new(&config.default_locale, &config.fallback_locale),
            theme: Theme::new(),
            persist_keys: Vec::new(),
            handlers: HandlerRegistry::default(),
            listeners: ListenerRegistry::new(),
            focus: FocusState::new(),
            timers: Timers::new(),
            storage: Box::new(MemoryStorage::new()),
            online: config.online,
            config,
            enhanced: HashSet::new(),
            combobox_active: HashMap::new(),
            mounted: false,
            render_count: 0,
        }
    }

    /// Parse `html` and build a runtime over it.
    pub fn from_html(html: &str) -> Result<Self, DomError> {
        Ok(Self::new(Document::parse_html(html)?))
    }

    /// Replace the durable storage backend.
    pub fn with_storage(mut self, storage: impl Storage + 'static) -> Self {
        self.storage = Box::new(storage);
        self
    }

    // =========================================================================
    // Mount
    // =========================================================================

    /// Mount a manifest, or the one embedded in the document when `None`.
    ///
    /// A missing or malformed embedded manifest mounts empty defaults.
    /// Mounting again merges state and re-applies directives without
    /// duplicating listeners.
    pub fn mount(&mut self, manifest: Option<Manifest>) {
        theme::install_animations(&mut self.doc);

        let manifest = manifest.unwrap_or_else(|| match self.embedded_manifest() {
            Ok(found) => found,
            Err(err) => {
                debug!(%err, "mounting without a manifest");
                Manifest::default()
            }
        });

        if let Some(locales) = manifest.locales.clone() {
            self.translations.install(locales);
        }
        if let Some(tokens) = &manifest.theme {
            self.theme = Theme::from_tokens(tokens);
        }
        theme::install_stylesheet(&mut self.doc, &self.theme);
        if let Some(keys) = &manifest.persist_keys {
            self.persist_keys = keys.clone();
        }
        if let Some(initial) = manifest.initial_state() {
            self.merge_silently(initial.clone());
        }
        self.restore_persisted();

        self.translations.apply(&mut self.doc);
        let root = self.doc.root();
        let wired = self.wire(root);

        self.mounted = true;
        let mut offline = Map::new();
        offline.insert(OFFLINE_KEY.to_string(), Value::Bool(!self.online));
        self.merge_silently(offline);

        self.render();
        self.resolve_routes();
        info!(
            version = %manifest.version,
            listeners = self.listeners.len(),
            wired,
            "mounted"
        );
    }

    /// Parse the manifest held by the element with the configured id.
    pub fn embedded_manifest(&self) -> Result<Manifest, ManifestError> {
        let id = &self.config.manifest_element_id;
        let node = self
            .doc
            .get_element_by_id(id)
            .ok_or_else(|| ManifestError::Missing(id.clone()))?;
        Manifest::from_json_str(&self.doc.text_content(node))
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    /// Shallow-merge keys into the state graph without notifications.
    fn merge_silently(&mut self, entries: Map<String, Value>) {
        let mut root = self.state.shared_root().borrow_mut();
        if !root.is_object() {
            *root = empty_object();
        }
        if let Value::Object(map) = &mut *root {
            map.extend(entries);
        }
    }

    /// Wire directives under `scope`: enhancements, `data-m-on` handlers and
    /// input bindings. Returns the number of enhancements newly applied.
    fn wire(&mut self, scope: NodeId) -> usize {
        let mut ctx = EnhanceCtx {
            doc: &mut self.doc,
            listeners: &mut self.listeners,
            timers: &mut self.timers,
            storage: &*self.storage,
            dark_mode_key: &self.config.dark_mode_key,
            applied: &mut self.enhanced,
        };
        wire_directives(&mut ctx, scope)
    }

    // =========================================================================
    // State
    // =========================================================================

    /// Deep copy of the state graph.
    pub fn snapshot(&self) -> Value {
        self.state.value().unwrap_or_else(empty_object)
    }

    /// Copy of the parameters captured by the last route resolution.
    pub fn route_params(&self) -> RouteParams {
        self.route_params.clone()
    }

    /// Write every key of `patch` (an object) into state. Each key renders
    /// once, then one more pass runs.
    pub fn patch_state(&mut self, patch: Value) {
        let Value::Object(entries) = patch else {
            warn!("patch_state expects an object");
            return;
        };
        for (key, value) in entries {
            self.state.set(&key, value);
        }
        self.flush();
        self.render();
    }

    /// Set one top-level key.
    pub fn set(&mut self, key: &str, value: Value) -> bool {
        let written = self.state.set(key, value);
        self.flush();
        written
    }

    /// Set a dotted path whose parent already exists.
    pub fn set_path(&mut self, path: &str, value: Value) -> bool {
        let written = self.state.set_path(path, value);
        self.flush();
        written
    }

    pub fn delete(&mut self, key: &str) -> bool {
        let deleted = self.state.delete(key);
        self.flush();
        deleted
    }

    /// Mutate through a scoped handle (nested writes, array edits), then
    /// process the resulting changes. The handle cannot outlive the call.
    pub fn update<R>(&mut self, f: impl FnOnce(StateScope<'_>) -> R) -> R {
        let result = f(StateScope::new(self.state.clone()));
        self.flush();
        result
    }

    /// Persist and render once for every queued change.
    pub(crate) fn flush(&mut self) {
        loop {
            let batch = self.changes.drain();
            if batch.is_empty() {
                break;
            }
            for change in batch {
                trace!(path = ?change.path, kind = ?change.kind, "state changed");
                self.persist();
                self.render();
            }
        }
    }

    // =========================================================================
    // Persistence
    // =========================================================================

    fn persist(&mut self) {
        if self.persist_keys.is_empty() {
            return;
        }
        let snapshot = self.snapshot();
        let subset: Map<String, Value> = self
            .persist_keys
            .iter()
            .filter_map(|k| snapshot.get(k).map(|v| (k.clone(), v.clone())))
            .collect();
        let blob = Value::Object(subset).to_string();
        if let Err(err) = self.storage.set(&self.config.storage_key, &blob) {
            warn!(%err, "failed to persist state");
        }
    }

    fn restore_persisted(&mut self) {
        if self.persist_keys.is_empty() {
            return;
        }
        let saved = match self.storage.get(&self.config.storage_key) {
            Ok(Some(text)) => text,
            Ok(None) => return,
            Err(err) => {
                warn!(%err, "failed to read persisted state");
                return;
            }
        };
        let Ok(Value::Object(mut saved)) = serde_json::from_str::<Value>(&saved) else {
            warn!("persisted state is not a JSON object, ignoring");
            return;
        };
        let restored: Map<String, Value> = self
            .persist_keys
            .iter()
            .filter_map(|k| saved.remove(k).map(|v| (k.clone(), v)))
            .collect();
        debug!(keys = restored.len(), "restored persisted state");
        self.merge_silently(restored);
    }

    // =========================================================================
    // Routing, locale, connectivity
    // =========================================================================

    /// Change the location hash. Once mounted, a changed hash resolves
    /// routes.
    pub fn navigate(&mut self, hash: &str) {
        let hash = if hash.is_empty() || hash.starts_with('#') {
            hash.to_string()
        } else {
            format!("#{hash}")
        };
        if hash == self.hash {
            return;
        }
        self.hash = hash;
        if self.mounted {
            self.resolve_routes();
        }
    }

    /// Current location hash, `#` included.
    pub fn hash(&self) -> &str {
        &self.hash
    }

    pub fn switch_locale(&mut self, locale: &str) {
        self.translations.set_locale(locale);
        self.translations.apply(&mut self.doc);
    }

    pub fn locale(&self) -> &str {
        self.translations.locale()
    }

    /// Translate a key (`@key` or `key`) with the active locale.
    pub fn translate(&self, key: &str) -> String {
        self.translations.translate(key)
    }

    /// Report connectivity. Once mounted, `_offline` follows it.
    pub fn set_online(&mut self, online: bool) {
        self.online = online;
        if self.mounted {
            self.set(OFFLINE_KEY, Value::Bool(!online));
        }
    }

    pub fn is_online(&self) -> bool {
        self.online
    }

    // =========================================================================
    // Handlers
    // =========================================================================

    pub fn register_handler<F>(&mut self, name: &str, handler: F)
    where
        F: Fn(&mut Runtime, &Event, NodeId) + 'static,
    {
        self.handlers.insert(name, Rc::new(handler));
    }

    /// Register several handlers; later names replace earlier ones.
    pub fn register_handlers<I, S>(&mut self, handlers: I)
    where
        I: IntoIterator<Item = (S, Handler)>,
        S: Into<String>,
    {
        for (name, handler) in handlers {
            self.handlers.insert(name, handler);
        }
    }

    // =========================================================================
    // Timers
    // =========================================================================

    /// Move the virtual clock forward, running every task that falls due.
    pub fn advance(&mut self, by: Duration) {
        let deadline = self.timers.now() + by;
        while let Some(task) = self.timers.pop_due(deadline) {
            self.run_task(task);
        }
        self.timers.settle(deadline);
    }

    pub fn pending_timers(&self) -> usize {
        self.timers.pending()
    }

    // =========================================================================
    // Queries and accessors
    // =========================================================================

    /// First element matching `selector`. Invalid selectors match nothing.
    pub fn q(&self, selector: &str) -> Option<NodeId> {
        self.doc
            .query_selector(self.doc.root(), selector)
            .unwrap_or_else(|err| {
                warn!(%err, "query failed");
                None
            })
    }

    /// Every element matching `selector`, in document order.
    pub fn qa(&self, selector: &str) -> Vec<NodeId> {
        self.doc
            .query_selector_all(self.doc.root(), selector)
            .unwrap_or_else(|err| {
                warn!(%err, "query failed");
                Vec::new()
            })
    }

    pub fn document(&self) -> &Document {
        &self.doc
    }

    /// Direct document access. Changes show up in the next binding pass.
    pub fn document_mut(&mut self) -> &mut Document {
        &mut self.doc
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    pub fn theme(&self) -> &Theme {
        &self.theme
    }

    /// Element holding focus.
    pub fn active_element(&self) -> Option<NodeId> {
        self.focus.active()
    }

    /// Binding passes run so far.
    pub fn render_count(&self) -> u64 {
        self.render_count
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    // =========================================================================
    // Validation
    // =========================================================================

    pub fn validate_schema(&self, schema: &Value, data: &Value) -> ValidationReport {
        validate::validate_schema(schema, data)
    }

    pub fn validate_form(&self, form: NodeId) -> ValidationReport {
        validate::validate_form(&self.doc, form)
    }
}

// =============================================================================
// Directive wiring
// =============================================================================

/// Split `data-m-on` into `(event, handler)` pairs, expanding one-letter
/// event names.
pub fn parse_on(spec: &str) -> Vec<(&str, &str)> {
    spec.split(',')
        .filter_map(|pair| {
            let mut parts = pair.split(':').map(str::trim);
            let event = parts.next()?;
            let handler = parts.next()?;
            (!event.is_empty() && !handler.is_empty()).then(|| (event_alias(event), handler))
        })
        .collect()
}

/// Activate the directives of `scope` and everything below it.
pub(crate) fn wire_directives(ctx: &mut EnhanceCtx<'_>, scope: NodeId) -> usize {
    let applied = enhance::apply_tree(ctx, scope);

    let mut on_nodes = vec![scope];
    on_nodes.extend(ctx.doc.elements_with_attr(scope, ON_ATTR));
    for node in on_nodes {
        let Some(spec) = ctx.doc.attr(node, ON_ATTR) else {
            continue;
        };
        for (event, handler) in parse_on(spec) {
            ctx.listeners
                .add(node, event, Listener::Handler(handler.to_string()));
        }
    }

    let mut bound = vec![scope];
    bound.extend(ctx.doc.elements_with_attr(scope, BIND_ATTR));
    for node in bound {
        if ctx.doc.has_attr(node, BIND_ATTR) && ctx.doc.is_input_like(node) {
            ctx.listeners.add(node, "input", Listener::InputBinding);
        }
    }
    applied
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::storage::MemoryStorage;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn manifest(value: Value) -> Manifest {
        Manifest::from_value(value).unwrap()
    }

    #[test]
    fn test_parse_on() {
        assert_eq!(
            parse_on("c:save, keydown : onKey,bad, :x"),
            vec![("click", "save"), ("keydown", "onKey")]
        );
    }

    #[test]
    fn test_mount_merges_state_and_installs_theme() {
        let mut rt = Runtime::from_html(r#"<p data-m-bind="count"></p>"#).unwrap();
        rt.patch_state(json!({"keep": 1, "count": 9}));
        rt.mount(Some(manifest(json!({"rootState": {"count": 0}, "theme": {"--m-p": "red"}}))));

        assert_eq!(rt.snapshot(), json!({"keep": 1, "count": 0, "_offline": false}));
        let style = rt.q("#m-vars").unwrap();
        assert!(rt.document().text_content(style).ends_with(":root{--m-p:red;}"));
        assert!(rt.q("#m-anim").is_some());
        assert_eq!(rt.document().text_content(rt.q("p").unwrap()), "0");
    }

    #[test]
    fn test_embedded_manifest() {
        let mut rt = Runtime::from_html(
            r#"<script id="manifest" type="application/json">{"r":{"s":{"who":"world"}}}</script>
               <b data-m-bind="who"></b>"#,
        )
        .unwrap();
        rt.mount(None);
        assert_eq!(rt.document().text_content(rt.q("b").unwrap()), "world");
    }

    #[test]
    fn test_malformed_embedded_manifest_mounts_defaults() {
        let mut rt = Runtime::from_html(r#"<script id="manifest">{nope</script><b data-m-bind="x">?</b>"#).unwrap();
        assert!(rt.embedded_manifest().is_err());
        rt.mount(None);
        assert!(rt.is_mounted());
        assert_eq!(rt.document().text_content(rt.q("b").unwrap()), "");
    }

    #[test]
    fn test_repeated_mount_does_not_duplicate_listeners() {
        let mut rt = Runtime::from_html(
            r#"<button data-m-on="click:go" data-m-enhance="ripple">x</button><input data-m-bind="name">"#,
        )
        .unwrap();
        rt.mount(None);
        let count = rt.listener_count();
        assert_eq!(count, 3);
        rt.mount(Some(manifest(json!({"rootState": {"name": "n"}}))));
        assert_eq!(rt.listener_count(), count);
        assert_eq!(rt.snapshot()["name"], json!("n"));
    }

    #[test]
    fn test_persist_and_restore() {
        let storage = MemoryStorage::new();
        let mut rt = Runtime::from_html("<p></p>").unwrap().with_storage(storage.clone());
        rt.mount(Some(manifest(json!({"rootState": {"a": 1, "b": 1}, "persistKeys": ["a"]}))));
        rt.set("a", json!(7));
        rt.set("b", json!(7));
        let saved = storage.get("spark-dom").unwrap().unwrap();
        assert_eq!(serde_json::from_str::<Value>(&saved).unwrap(), json!({"a": 7}));

        let mut again = Runtime::from_html("<p></p>").unwrap().with_storage(storage);
        again.mount(Some(manifest(json!({"rootState": {"a": 1, "b": 1}, "persistKeys": ["a"]}))));
        assert_eq!(again.snapshot()["a"], json!(7));
        assert_eq!(again.snapshot()["b"], json!(1));
    }

    #[test]
    fn test_corrupt_persisted_blob_is_ignored() {
        let storage = MemoryStorage::with_entries([("spark-dom", "not json")]);
        let mut rt = Runtime::from_html("<p></p>").unwrap().with_storage(storage);
        rt.mount(Some(manifest(json!({"rootState": {"a": 1}, "persist": ["a"]}))));
        assert_eq!(rt.snapshot()["a"], json!(1));
    }

    #[test]
    fn test_each_change_renders_once() {
        let mut rt = Runtime::from_html("<p></p>").unwrap();
        rt.mount(None);
        let before = rt.render_count();
        rt.update(|state| {
            state.set("a", json!({"b": 1}));
            if let Some(a) = state.child("a") {
                a.set("b", json!(2));
            }
        });
        assert_eq!(rt.render_count(), before + 2);
        assert_eq!(rt.snapshot()["a"], json!({"b": 2}));

        assert!(!rt.set_path("missing.deep", json!(1)));
        assert_eq!(rt.render_count(), before + 2);
    }

    #[test]
    fn test_nested_update_renders_before_returning() {
        let mut rt = Runtime::from_html(r#"<span data-m-bind="cart.count"></span>"#).unwrap();
        rt.mount(Some(manifest(json!({"rootState": {"cart": {"count": 0, "items": []}}}))));
        let span = rt.q("span").unwrap();
        let before = rt.render_count();

        let grew = rt.update(|state| {
            let cart = state.child("cart")?;
            cart.set("count", json!(5));
            Some(cart.child("items")?.set("0", json!("apple")))
        });
        assert_eq!(grew, Some(true));
        assert_eq!(rt.render_count(), before + 2);
        assert_eq!(rt.document().text_content(span), "5");
        assert_eq!(rt.snapshot()["cart"]["items"], json!(["apple"]));
    }

    #[test]
    fn test_connectivity_flag() {
        let mut rt = Runtime::from_html(r#"<p data-m-if="_offline">offline</p>"#).unwrap();
        rt.set_online(false);
        rt.mount(None);
        let p = rt.q("p").unwrap();
        assert!(!rt.document().is_hidden(p));
        rt.set_online(true);
        assert_eq!(rt.snapshot()["_offline"], json!(false));
        assert!(rt.document().is_hidden(p));
    }

    #[test]
    fn test_navigate_before_and_after_mount() {
        let mut rt = Runtime::from_html(
            r#"<section data-m-route="/">home</section><section data-m-route="/user/:id">user</section>"#,
        )
        .unwrap();
        rt.navigate("/user/7");
        assert_eq!(rt.hash(), "#/user/7");
        assert!(rt.route_params().is_empty());

        rt.mount(None);
        assert_eq!(rt.route_params().get("id").map(String::as_str), Some("7"));
        let sections = rt.qa("section");
        assert!(rt.document().is_hidden(sections[0]));
        assert!(!rt.document().is_hidden(sections[1]));

        rt.navigate("#/");
        assert!(rt.route_params().is_empty());
        assert!(!rt.document().is_hidden(sections[0]));
    }

    #[test]
    fn test_queries_tolerate_bad_selectors() {
        let rt = Runtime::from_html(r#"<i class="item"></i><i class="item"></i>"#).unwrap();
        assert_eq!(rt.qa(".item").len(), 2);
        assert_eq!(rt.q("[unclosed"), None);
        assert!(rt.qa("").is_empty());
    }
}
