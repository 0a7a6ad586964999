//! Router - Hash fragment matching for `data-m-route` sections.
//!
//! Patterns come in two shapes:
//!
//! ```text
//! /about          static: matches the fragment exactly
//! /user/:id       param: same number of `/` segments, literal segments equal,
//!                 `:name` segments capture whatever sits in their position
//! ```
//!
//! Every route element is judged on its own, so several sections can be
//! visible at once. The parameters of the last matching param route win.

use crate::types::RouteParams;

/// Outcome of matching one fragment against a list of patterns.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolution {
    /// One entry per pattern, in input order.
    pub visible: Vec<bool>,
    pub params: RouteParams,
}

/// Fragment of a location hash: without `#`, defaulting to `/`.
pub fn fragment_from_hash(hash: &str) -> String {
    let fragment = hash.strip_prefix('#').unwrap_or(hash);
    if fragment.is_empty() {
        "/".to_string()
    } else {
        fragment.to_string()
    }
}

/// Match one pattern. Static patterns yield empty parameters on a match.
pub fn match_route(pattern: &str, fragment: &str) -> Option<RouteParams> {
    if !pattern.contains(':') {
        return (pattern == fragment).then(RouteParams::new);
    }
    let pattern_parts: Vec<&str> = pattern.split('/').collect();
    let fragment_parts: Vec<&str> = fragment.split('/').collect();
    if pattern_parts.len() != fragment_parts.len() {
        return None;
    }
    let mut params = RouteParams::new();
    for (p, f) in pattern_parts.iter().zip(&fragment_parts) {
        match p.strip_prefix(':') {
            Some(name) => {
                params.insert(name.to_string(), f.to_string());
            }
            None if p != f => return None,
            None => {}
        }
    }
    Some(params)
}

/// Match a fragment against every pattern.
pub fn resolve<S: AsRef<str>>(fragment: &str, patterns: &[S]) -> Resolution {
    let mut resolution = Resolution::default();
    for pattern in patterns {
        let pattern = pattern.as_ref();
        let matched = match_route(pattern, fragment);
        if let Some(params) = matched.as_ref().filter(|_| pattern.contains(':')) {
            resolution.params = params.clone();
        }
        resolution.visible.push(matched.is_some());
    }
    resolution
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fragment_default() {
        assert_eq!(fragment_from_hash(""), "/");
        assert_eq!(fragment_from_hash("#"), "/");
        assert_eq!(fragment_from_hash("#/about"), "/about");
        assert_eq!(fragment_from_hash("/x"), "/x");
    }

    #[test]
    fn test_static_routes() {
        assert_eq!(match_route("/", "/"), Some(RouteParams::new()));
        assert_eq!(match_route("/about", "/about/"), None);
    }

    #[test]
    fn test_param_routes() {
        let params = match_route("/user/:id", "/user/42").unwrap();
        assert_eq!(params.get("id").map(String::as_str), Some("42"));
        assert_eq!(match_route("/user/:id", "/user/42/x"), None);
        assert_eq!(match_route("/user/:id", "/team/42"), None);

        let empty = match_route("/user/:id", "/user/").unwrap();
        assert_eq!(empty["id"], "");
    }

    #[test]
    fn test_resolve_last_match_wins() {
        let r = resolve("/a/1", &["/", "/a/:x", "/:y/1", "/a/1"]);
        assert_eq!(r.visible, vec![false, true, true, true]);
        assert_eq!(r.params.len(), 1);
        assert_eq!(r.params["y"], "a");
    }

    #[test]
    fn test_resolve_no_match_clears_params() {
        let r = resolve("/nowhere", &["/user/:id"]);
        assert_eq!(r.visible, vec![false]);
        assert!(r.params.is_empty());
    }
}
