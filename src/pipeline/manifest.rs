//! Manifest - The JSON document a page mounts from.
//!
//! ```json
//! {
//!   "version": 1,
//!   "locales": { "en": { "hello": "Hello" } },
//!   "theme": { "--m-p": "#0af" },
//!   "rootState": { "count": 0 },
//!   "persistKeys": ["count"]
//! }
//! ```
//!
//! The short spellings `v`, `l`, `t`, `r.s` and `persist` are accepted too.
//! Every section is optional; an absent section leaves the runtime's current
//! value alone on a repeated mount.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ManifestError;

/// Translation tables: locale code to key to text.
pub type Locales = BTreeMap<String, BTreeMap<String, Value>>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    #[serde(default, alias = "v", skip_serializing_if = "Value::is_null")]
    pub version: Value,
    /// Informational route table; routing itself reads `data-m-route`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub routes: Option<Value>,
    #[serde(default, alias = "l", skip_serializing_if = "Option::is_none")]
    pub locales: Option<Locales>,
    /// CSS custom properties, e.g. `{"--m-p": "#0af"}`.
    #[serde(default, alias = "t", skip_serializing_if = "Option::is_none")]
    pub theme: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root_state: Option<Map<String, Value>>,
    /// Legacy `{"r": {"s": {...}}}` form of `rootState`.
    #[serde(default, rename = "r", skip_serializing_if = "Option::is_none")]
    legacy_root: Option<LegacyRoot>,
    #[serde(default, alias = "persist", skip_serializing_if = "Option::is_none")]
    pub persist_keys: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct LegacyRoot {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    s: Option<Map<String, Value>>,
}

impl Manifest {
    pub fn from_json_str(json: &str) -> Result<Self, ManifestError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_value(value: Value) -> Result<Self, ManifestError> {
        Ok(serde_json::from_value(value)?)
    }

    /// Initial state, preferring `rootState` over the legacy `r.s`.
    pub fn initial_state(&self) -> Option<&Map<String, Value>> {
        self.root_state
            .as_ref()
            .or_else(|| self.legacy_root.as_ref().and_then(|r| r.s.as_ref()))
    }
}
