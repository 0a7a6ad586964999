//! Expressions - Lookups and conditions for `data-m-if` and `data-m-class`.
//!
//! The condition language is deliberately tiny:
//!
//! ```text
//! !expr                 negate whatever follows
//! items.length>0        length comparison (== === != > < >= <=)
//! user.role==admin      string form of a lookup equals the literal
//! status!=done          string form of a lookup differs from the literal
//! flag                  truthiness of a lookup
//! ```
//!
//! Anything that is not one of the first forms is looked up as a path, so
//! `count>2` is the key `"count>2"`: missing, therefore false. Evaluation
//! never fails.

use std::borrow::Cow;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use crate::state::observable::parse_index;
use crate::types::{is_truthy, key_string, RouteParams};

static LENGTH_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([A-Za-z0-9_]+)\.length([=<>!]+)([0-9]+)$").expect("length regex")
});

static EQ_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([A-Za-z0-9_]+(?:\.[A-Za-z0-9_]+)?)==(.+)$").expect("equality regex")
});

static NE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([A-Za-z0-9_]+(?:\.[A-Za-z0-9_]+)?)!=(.+)$").expect("inequality regex")
});

static CLASS_EQ_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([A-Za-z0-9_]+)==([A-Za-z0-9_]+)$").expect("class equality regex")
});

/// What expressions read from: the state graph plus the current route
/// parameters.
#[derive(Debug, Clone, Copy)]
pub struct Scope<'a> {
    pub state: &'a Value,
    pub params: &'a RouteParams,
}

impl<'a> Scope<'a> {
    pub fn new(state: &'a Value, params: &'a RouteParams) -> Self {
        Self { state, params }
    }

    /// Resolve a dotted path.
    ///
    /// Each segment reads the property of the current value; when that is
    /// missing or `null` the route parameter of the same name stands in.
    /// Arrays and strings expose `length`, arrays expose numeric indices.
    pub fn lookup(&self, path: &str) -> Option<Value> {
        let mut current: Cow<'a, Value> = Cow::Borrowed(self.state);
        for segment in path.split('.') {
            if current.is_null() {
                return None;
            }
            let found = match current {
                Cow::Borrowed(value) => property(value, segment),
                Cow::Owned(value) => property(&value, segment).map(|v| Cow::Owned(v.into_owned())),
            };
            current = match found {
                Some(v) if !v.is_null() => v,
                _ => Cow::Owned(Value::String(self.params.get(segment)?.clone())),
            };
        }
        Some(current.into_owned())
    }

    /// Top-level key read with route parameter fallback (no dotted paths).
    pub fn top_level(&self, key: &str) -> Option<Value> {
        match self.state.get(key) {
            Some(v) if !v.is_null() => Some(v.clone()),
            _ => self.params.get(key).map(|p| Value::String(p.clone())),
        }
    }
}

fn property<'v>(value: &'v Value, key: &str) -> Option<Cow<'v, Value>> {
    match value {
        Value::Object(map) => map.get(key).map(Cow::Borrowed),
        Value::Array(items) if key == "length" => Some(Cow::Owned(Value::from(items.len()))),
        Value::Array(items) => parse_index(key)
            .and_then(|i| items.get(i))
            .map(Cow::Borrowed),
        Value::String(s) if key == "length" => {
            Some(Cow::Owned(Value::from(s.encode_utf16().count())))
        }
        _ => None,
    }
}

/// Evaluate a condition against state and route parameters.
pub fn evaluate(expr: &str, scope: &Scope<'_>) -> bool {
    if expr.is_empty() {
        return false;
    }
    let (negated, body) = match expr.strip_prefix('!') {
        Some(rest) => (true, rest.trim()),
        None => (false, expr.trim()),
    };
    negated != evaluate_positive(body, scope)
}

fn evaluate_positive(expr: &str, scope: &Scope<'_>) -> bool {
    if let Some(caps) = LENGTH_RE.captures(expr) {
        let len = match scope.state.get(&caps[1]) {
            Some(Value::Array(items)) => items.len() as u64,
            _ => 0,
        };
        let n: u64 = caps[3].parse().unwrap_or(u64::MAX);
        return match &caps[2] {
            "==" | "===" => len == n,
            "!=" => len != n,
            ">" => len > n,
            "<" => len < n,
            ">=" => len >= n,
            "<=" => len <= n,
            _ => false,
        };
    }
    if let Some(caps) = EQ_RE.captures(expr) {
        return key_string(scope.lookup(&caps[1]).as_ref()) == caps[2];
    }
    if let Some(caps) = NE_RE.captures(expr) {
        return key_string(scope.lookup(&caps[1]).as_ref()) != caps[2];
    }
    is_truthy(scope.lookup(expr).as_ref())
}

/// Evaluate one `data-m-class` condition.
///
/// The bare form `left==right` (two identifiers) compares two lookups, the
/// right side falling back to its own text when it resolves to nothing;
/// everything else goes through [`evaluate`].
pub fn class_condition(cond: &str, scope: &Scope<'_>) -> bool {
    if let Some(caps) = CLASS_EQ_RE.captures(cond) {
        let left = key_string(scope.top_level(&caps[1]).as_ref());
        let right = scope
            .top_level(&caps[2])
            .map(|v| key_string(Some(&v)))
            .unwrap_or_else(|| caps[2].to_string());
        return left == right;
    }
    evaluate(cond, scope)
}

/// Split a `data-m-class` value into `(class, condition)` rules, skipping
/// rules with an empty side.
pub fn class_rules(spec: &str) -> Vec<(&str, &str)> {
    spec.split(',')
        .filter_map(|rule| {
            let mut parts = rule.split(':').map(str::trim);
            let class = parts.next()?;
            let cond = parts.next()?;
            (!class.is_empty() && !cond.is_empty()).then_some((class, cond))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn eval(expr: &str, state: Value) -> bool {
        let params = RouteParams::new();
        evaluate(expr, &Scope::new(&state, &params))
    }

    #[test]
    fn test_empty_and_negation() {
        assert!(!eval("", json!({})));
        assert!(eval("!loading", json!({"loading": false})));
        assert!(!eval("! loading", json!({"loading": true})));
        assert!(eval("!", json!({})));
    }

    #[test]
    fn test_length_comparisons() {
        let state = json!({"items": [], "full": [1, 2, 3], "text": "abc"});
        assert!(eval("items.length==0", state.clone()));
        assert!(eval("full.length===3", state.clone()));
        assert!(eval("full.length>2", state.clone()));
        assert!(eval("full.length<=3", state.clone()));
        assert!(eval("full.length!=0", state.clone()));
        assert!(eval("text.length==0", state.clone()), "non-arrays count as 0");
        assert!(eval("missing.length<1", state.clone()));
        assert!(!eval("full.length=>1", state.clone()), "unknown operator is false");
        assert!(eval("!full.length=>1", state));
    }

    #[test]
    fn test_equality_forms() {
        let state = json!({"status": "active", "n": 5, "user": {"role": "admin"}});
        assert!(eval("status==active", state.clone()));
        assert!(!eval("status==idle", state.clone()));
        assert!(eval("n==5", state.clone()));
        assert!(eval("user.role==admin", state.clone()));
        assert!(eval("status!=idle", state.clone()));
        assert!(eval("missing==undefined", state.clone()));
        assert!(!eval("!status==active", state));
    }

    #[test]
    fn test_unparsed_comparison_is_raw_key() {
        assert!(!eval("count>2", json!({"count": 1})));
        assert!(eval("count>2", json!({"count>2": true})));
    }

    #[test]
    fn test_lookup_with_param_fallback() {
        let state = json!({"user": {"name": "Ann", "nick": null}, "list": [10, 20]});
        let mut params = RouteParams::new();
        params.insert("id".into(), "42".into());
        params.insert("nick".into(), "annie".into());
        let scope = Scope::new(&state, &params);

        assert_eq!(scope.lookup("user.name"), Some(json!("Ann")));
        assert_eq!(scope.lookup("id"), Some(json!("42")));
        assert_eq!(scope.lookup("user.nick"), Some(json!("annie")));
        assert_eq!(scope.lookup("list.1"), Some(json!(20)));
        assert_eq!(scope.lookup("list.length"), Some(json!(2)));
        assert_eq!(scope.lookup("user.name.length"), Some(json!(3)));
        assert_eq!(scope.lookup("user.missing.deeper"), None);
    }

    #[test]
    fn test_class_conditions() {
        let state = json!({"selectedId": 3, "id": 3, "mode": "dark", "on": true});
        let params = RouteParams::new();
        let scope = Scope::new(&state, &params);

        assert!(class_condition("selectedId==id", &scope));
        assert!(class_condition("mode==dark", &scope), "right side falls back to literal");
        assert!(!class_condition("mode==light", &scope));
        assert!(class_condition("on", &scope));
        assert!(class_condition("!missing", &scope));
    }

    #[test]
    fn test_class_rule_parsing() {
        assert_eq!(
            class_rules("active: on , done:!todo,:x, bad"),
            vec![("active", "on"), ("done", "!todo")]
        );
    }
}
