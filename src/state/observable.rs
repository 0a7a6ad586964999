//! Observable State - Change-notifying wrapper over a JSON value graph
//!
//! [`wrap`] turns a value into an [`Observed`]: objects and arrays become an
//! [`ObservableState`], anything else passes through untouched. Reading a
//! nested container through [`ObservableState::get`] yields a child wrapper
//! over the same shared graph with the same listener, so a write at any
//! depth notifies exactly once:
//!
//! ```text
//! root ──get("user")──► child(path=["user"]) ──set("name", ..)──► listener(Change)
//! ```
//!
//! Wrappers hold a path, never a reference into the graph. Every access
//! re-resolves the path against the shared root, so writes are visible to
//! every wrapper immediately. If a wrapper's path stops resolving (its
//! container was replaced or deleted), reads return `None` and writes fail
//! without notifying.
//!
//! The listener runs after the mutation and after the graph's borrow is
//! released, so it may read the graph freely.

use std::cell::RefCell;
use std::fmt;
use std::marker::PhantomData;
use std::rc::Rc;

use serde_json::{Map, Value};

// =============================================================================
// CHANGES
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Set,
    Delete,
}

/// One successful mutation: the full path of the written key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Change {
    pub path: Vec<String>,
    pub kind: ChangeKind,
}

impl Change {
    /// Top-level state key the change falls under.
    pub fn root_key(&self) -> Option<&str> {
        self.path.first().map(String::as_str)
    }
}

/// Receives one call per successful set or delete.
pub trait ChangeListener {
    fn on_change(&self, change: &Change);
}

impl<F: Fn(&Change)> ChangeListener for F {
    fn on_change(&self, change: &Change) {
        self(change)
    }
}

// =============================================================================
// WRAPPER
// =============================================================================

/// Result of wrapping or reading a value.
#[derive(Clone)]
pub enum Observed {
    /// An object or array, observed.
    Object(ObservableState),
    /// Any other value, returned as is.
    Scalar(Value),
}

impl Observed {
    pub fn as_object(&self) -> Option<&ObservableState> {
        match self {
            Observed::Object(state) => Some(state),
            Observed::Scalar(_) => None,
        }
    }

    /// Deep copy of the underlying value (`Null` if an object wrapper no
    /// longer resolves).
    pub fn to_value(&self) -> Value {
        match self {
            Observed::Object(state) => state.value().unwrap_or(Value::Null),
            Observed::Scalar(v) => v.clone(),
        }
    }
}

impl fmt::Debug for Observed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Observed::Object(state) => f.debug_tuple("Object").field(state).finish(),
            Observed::Scalar(v) => f.debug_tuple("Scalar").field(v).finish(),
        }
    }
}

/// Wrap a value so mutations through the wrapper notify `listener`.
///
/// Scalars are returned as [`Observed::Scalar`]; wrapping them is not an
/// error.
pub fn wrap(initial: Value, listener: Rc<dyn ChangeListener>) -> Observed {
    match initial {
        Value::Object(_) | Value::Array(_) => {
            Observed::Object(ObservableState::new(Rc::new(RefCell::new(initial)), listener))
        }
        scalar => Observed::Scalar(scalar),
    }
}

/// Observed view of one container inside a shared value graph.
#[derive(Clone)]
pub struct ObservableState {
    root: Rc<RefCell<Value>>,
    path: Vec<String>,
    listener: Rc<dyn ChangeListener>,
}

impl fmt::Debug for ObservableState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObservableState")
            .field("path", &self.path)
            .field("value", &self.value())
            .finish()
    }
}

impl ObservableState {
    /// Root wrapper over an existing shared graph.
    pub fn new(root: Rc<RefCell<Value>>, listener: Rc<dyn ChangeListener>) -> Self {
        Self {
            root,
            path: Vec::new(),
            listener,
        }
    }

    /// Path of this wrapper from the graph root.
    pub fn path(&self) -> &[String] {
        &self.path
    }

    /// The shared graph this wrapper observes.
    pub fn shared_root(&self) -> &Rc<RefCell<Value>> {
        &self.root
    }

    /// Deep copy of the container this wrapper points at.
    pub fn value(&self) -> Option<Value> {
        let root = self.root.borrow();
        resolve(&root, &self.path).cloned()
    }

    /// Read one key. Containers come back as child wrappers.
    pub fn get(&self, key: &str) -> Option<Observed> {
        let root = self.root.borrow();
        let container = resolve(&root, &self.path)?;
        match child(container, key)? {
            Value::Object(_) | Value::Array(_) => Some(Observed::Object(self.child(key))),
            scalar => Some(Observed::Scalar(scalar.clone())),
        }
    }

    /// Deep copy of one key's value.
    pub fn get_value(&self, key: &str) -> Option<Value> {
        let root = self.root.borrow();
        child(resolve(&root, &self.path)?, key).cloned()
    }

    /// Deep copy of the value at a dotted path below this wrapper.
    pub fn get_path(&self, dotted: &str) -> Option<Value> {
        let root = self.root.borrow();
        let mut current = resolve(&root, &self.path)?;
        for segment in dotted.split('.') {
            current = child(current, segment)?;
        }
        Some(current.clone())
    }

    /// Keys of an object, or indices of an array.
    pub fn keys(&self) -> Vec<String> {
        let root = self.root.borrow();
        match resolve(&root, &self.path) {
            Some(Value::Object(map)) => map.keys().cloned().collect(),
            Some(Value::Array(items)) => (0..items.len()).map(|i| i.to_string()).collect(),
            _ => Vec::new(),
        }
    }

    /// Write one key and notify.
    ///
    /// On arrays the key must be a canonical index (or `length`); writing
    /// past the end pads with `null`. Returns false, without notifying, when
    /// the key is not valid for the container or the container no longer
    /// resolves.
    pub fn set(&self, key: &str, value: Value) -> bool {
        let written = {
            let mut root = self.root.borrow_mut();
            match resolve_mut(&mut root, &self.path) {
                Some(Value::Object(map)) => {
                    map.insert(key.to_string(), value);
                    true
                }
                Some(Value::Array(items)) => set_array(items, key, value),
                _ => false,
            }
        };
        if written {
            self.notify(key, ChangeKind::Set);
        }
        written
    }

    /// Delete one key and notify.
    ///
    /// Deleting a key an object does not have still counts as a deletion.
    /// On arrays an in-range index becomes `null` (the slot stays).
    pub fn delete(&self, key: &str) -> bool {
        let deleted = {
            let mut root = self.root.borrow_mut();
            match resolve_mut(&mut root, &self.path) {
                Some(Value::Object(map)) => {
                    map.remove(key);
                    true
                }
                Some(Value::Array(items)) => match parse_index(key) {
                    Some(i) => {
                        if let Some(slot) = items.get_mut(i) {
                            *slot = Value::Null;
                        }
                        true
                    }
                    None => false,
                },
                _ => false,
            }
        };
        if deleted {
            self.notify(key, ChangeKind::Delete);
        }
        deleted
    }

    /// Write at a dotted path below this wrapper. Every segment but the last
    /// must already resolve to a container.
    pub fn set_path(&self, dotted: &str, value: Value) -> bool {
        match self.parent_of(dotted) {
            Some((parent, last)) => parent.set(last, value),
            None => false,
        }
    }

    /// Delete at a dotted path below this wrapper.
    pub fn delete_path(&self, dotted: &str) -> bool {
        match self.parent_of(dotted) {
            Some((parent, last)) => parent.delete(last),
            None => false,
        }
    }

    fn parent_of<'p>(&self, dotted: &'p str) -> Option<(ObservableState, &'p str)> {
        let mut segments: Vec<&str> = dotted.split('.').collect();
        let last = segments.pop()?;
        let mut parent = self.clone();
        for segment in segments {
            parent = match parent.get(segment)? {
                Observed::Object(next) => next,
                Observed::Scalar(_) => return None,
            };
        }
        Some((parent, last))
    }

    fn child(&self, key: &str) -> ObservableState {
        let mut path = self.path.clone();
        path.push(key.to_string());
        Self {
            root: Rc::clone(&self.root),
            path,
            listener: Rc::clone(&self.listener),
        }
    }

    fn notify(&self, key: &str, kind: ChangeKind) {
        let mut path = self.path.clone();
        path.push(key.to_string());
        self.listener.on_change(&Change { path, kind });
    }
}

// =============================================================================
// SCOPED HANDLE
// =============================================================================

/// Borrowed view of an observed graph, valid for one closure call.
///
/// It is neither `Clone` nor able to outlive the call that produced it, so
/// the owner can process every change the closure made before returning.
///
/// ```compile_fail
/// use serde_json::json;
/// use spark_dom::Runtime;
///
/// let mut rt = Runtime::from_html("<p></p>").unwrap();
/// let escaped = rt.update(|state| state);
/// escaped.set("count", json!(5));
/// ```
pub struct StateScope<'a> {
    state: ObservableState,
    _call: PhantomData<&'a ()>,
}

impl fmt::Debug for StateScope<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("StateScope").field(&self.state).finish()
    }
}

impl<'a> StateScope<'a> {
    pub(crate) fn new(state: ObservableState) -> Self {
        Self {
            state,
            _call: PhantomData,
        }
    }

    /// Scoped handle on a nested object or array.
    pub fn child(&self, key: &str) -> Option<StateScope<'a>> {
        match self.state.get(key)? {
            Observed::Object(state) => Some(StateScope::new(state)),
            Observed::Scalar(_) => None,
        }
    }

    pub fn value(&self) -> Option<Value> {
        self.state.value()
    }

    pub fn get_value(&self, key: &str) -> Option<Value> {
        self.state.get_value(key)
    }

    pub fn get_path(&self, dotted: &str) -> Option<Value> {
        self.state.get_path(dotted)
    }

    pub fn keys(&self) -> Vec<String> {
        self.state.keys()
    }

    /// See [`ObservableState::set`].
    pub fn set(&self, key: &str, value: Value) -> bool {
        self.state.set(key, value)
    }

    pub fn delete(&self, key: &str) -> bool {
        self.state.delete(key)
    }

    pub fn set_path(&self, dotted: &str, value: Value) -> bool {
        self.state.set_path(dotted, value)
    }

    pub fn delete_path(&self, dotted: &str) -> bool {
        self.state.delete_path(dotted)
    }
}

// =============================================================================
// PATH RESOLUTION
// =============================================================================

/// Canonical array index: digits only, no leading zeros.
pub(crate) fn parse_index(key: &str) -> Option<usize> {
    let canonical = !key.is_empty()
        && key.bytes().all(|b| b.is_ascii_digit())
        && (key == "0" || !key.starts_with('0'));
    if canonical { key.parse().ok() } else { None }
}

fn child<'a>(container: &'a Value, key: &str) -> Option<&'a Value> {
    match container {
        Value::Object(map) => map.get(key),
        Value::Array(items) => parse_index(key).and_then(|i| items.get(i)),
        _ => None,
    }
}

fn resolve<'a>(root: &'a Value, path: &[String]) -> Option<&'a Value> {
    path.iter().try_fold(root, |current, segment| child(current, segment))
}

fn resolve_mut<'a>(root: &'a mut Value, path: &[String]) -> Option<&'a mut Value> {
    let mut current = root;
    for segment in path {
        current = match current {
            Value::Object(map) => map.get_mut(segment)?,
            Value::Array(items) => items.get_mut(parse_index(segment)?)?,
            _ => return None,
        };
    }
    Some(current)
}

/// Largest array length a write may produce (2^32 - 1).
const MAX_ARRAY_LEN: u64 = u32::MAX as u64;

/// Grow or shrink to `len`, refusing lengths past [`MAX_ARRAY_LEN`] and
/// growth the allocator cannot satisfy.
fn resize_array(items: &mut Vec<Value>, len: u64) -> bool {
    let Some(len) = usize::try_from(len).ok().filter(|_| len <= MAX_ARRAY_LEN) else {
        return false;
    };
    if len > items.len() && items.try_reserve_exact(len - items.len()).is_err() {
        return false;
    }
    items.resize(len, Value::Null);
    true
}

fn set_array(items: &mut Vec<Value>, key: &str, value: Value) -> bool {
    if key == "length" {
        return value.as_u64().is_some_and(|len| resize_array(items, len));
    }
    let Some(index) = parse_index(key) else {
        return false;
    };
    if index >= items.len() && !resize_array(items, (index as u64).saturating_add(1)) {
        return false;
    }
    items[index] = value;
    true
}

/// An empty object value, the shape every runtime state graph starts from.
pub fn empty_object() -> Value {
    Value::Object(Map::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::cell::Cell;

    fn setup(initial: Value) -> (ObservableState, Rc<RefCell<Vec<Change>>>) {
        let log: Rc<RefCell<Vec<Change>>> = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&log);
        let listener: Rc<dyn ChangeListener> =
            Rc::new(move |c: &Change| sink.borrow_mut().push(c.clone()));
        match wrap(initial, listener) {
            Observed::Object(state) => (state, log),
            Observed::Scalar(v) => panic!("expected container, got {v}"),
        }
    }

    #[test]
    fn test_scalar_passthrough() {
        let listener: Rc<dyn ChangeListener> = Rc::new(|_: &Change| {});
        assert!(matches!(wrap(json!(5), listener.clone()), Observed::Scalar(v) if v == json!(5)));
        assert!(matches!(wrap(json!(null), listener), Observed::Scalar(Value::Null)));
    }

    #[test]
    fn test_nested_set_notifies_once() {
        let (state, log) = setup(json!({"user": {"profile": {"name": "a"}}}));
        let user = state.get("user").unwrap();
        let profile = user.as_object().unwrap().get("profile").unwrap();
        assert!(log.borrow().is_empty(), "reads never notify");

        assert!(profile.as_object().unwrap().set("name", json!("b")));
        assert_eq!(log.borrow().len(), 1);
        assert_eq!(log.borrow()[0].path, vec!["user", "profile", "name"]);
        assert_eq!(log.borrow()[0].root_key(), Some("user"));
        assert_eq!(state.get_path("user.profile.name"), Some(json!("b")));
    }

    #[test]
    fn test_read_your_write_across_wrappers() {
        let (state, _) = setup(json!({"a": {"n": 1}}));
        let a1 = state.get("a").unwrap();
        let a2 = state.get("a").unwrap();
        a1.as_object().unwrap().set("n", json!(2));
        assert_eq!(a2.as_object().unwrap().get_value("n"), Some(json!(2)));
    }

    #[test]
    fn test_array_keys() {
        let (state, log) = setup(json!({"items": [1]}));
        let items = state.get("items").unwrap();
        let items = items.as_object().unwrap();

        assert!(items.set("3", json!(4)));
        assert_eq!(state.get_value("items"), Some(json!([1, null, null, 4])));

        assert!(!items.set("name", json!(1)));
        assert!(!items.set("01", json!(1)));
        assert_eq!(log.borrow().len(), 1);

        assert!(items.set("length", json!(2)));
        assert_eq!(state.get_value("items"), Some(json!([1, null])));
    }

    #[test]
    fn test_array_growth_is_bounded() {
        let (state, log) = setup(json!({"items": [1, 2]}));
        let items = state.get("items").unwrap();
        let items = items.as_object().unwrap();

        assert!(!items.set("length", json!(u64::MAX)));
        assert!(!items.set("length", json!(u32::MAX as u64 + 1)));
        assert!(!items.set("99999999999", json!(1)));
        assert!(!items.set(&u32::MAX.to_string(), json!(1)));
        assert!(!items.set(&u64::MAX.to_string(), json!(1)));
        assert!(!items.set("length", json!(-1)));
        assert_eq!(state.get_value("items"), Some(json!([1, 2])));
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn test_delete_semantics() {
        let (state, log) = setup(json!({"a": 1}));
        assert!(state.delete("a"));
        assert!(state.delete("missing"));
        assert_eq!(log.borrow().len(), 2);
        assert_eq!(log.borrow()[1].kind, ChangeKind::Delete);
        assert_eq!(state.value(), Some(json!({})));
    }

    #[test]
    fn test_stale_wrapper_fails_quietly() {
        let (state, log) = setup(json!({"a": {"b": 1}}));
        let a = state.get("a").unwrap();
        let a = a.as_object().unwrap().clone();
        state.set("a", json!(3));
        log.borrow_mut().clear();

        assert!(!a.set("b", json!(2)));
        assert!(!a.delete("b"));
        assert_eq!(a.get("b").map(|o| o.to_value()), None);
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn test_dotted_paths() {
        let (state, log) = setup(json!({"form": {"email": ""}}));
        assert!(state.set_path("form.email", json!("x@y.z")));
        assert_eq!(state.get_path("form.email"), Some(json!("x@y.z")));
        assert!(!state.set_path("nope.email", json!(1)));
        assert!(!state.set_path("form.email.deeper", json!(1)));
        assert!(state.delete_path("form.email"));
        assert_eq!(log.borrow().len(), 2);
    }

    #[test]
    fn test_listener_may_read_graph() {
        let seen = Rc::new(Cell::new(0));
        let root = Rc::new(RefCell::new(json!({"count": 0})));
        let reader_root = Rc::clone(&root);
        let seen_in = Rc::clone(&seen);
        let listener: Rc<dyn ChangeListener> = Rc::new(move |_: &Change| {
            let value = reader_root.borrow()["count"].as_i64().unwrap_or(-1);
            seen_in.set(value);
        });
        let state = ObservableState::new(root, listener);
        state.set("count", json!(7));
        assert_eq!(seen.get(), 7);
    }
}
