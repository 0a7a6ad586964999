//! Core types for spark-dom.
//!
//! These types define the foundation that everything builds on:
//! node handles into the document arena, per-node property flags, route
//! parameters, and the loose value coercions that the attribute DSLs rely on.

use std::collections::BTreeMap;
use std::fmt;

use serde_json::Value;

// =============================================================================
// Node handles
// =============================================================================

/// Handle to a node in a [`Document`](crate::engine::Document) arena.
///
/// A handle is an arena index plus the generation of the slot it was issued
/// for. Released slots are reused by later allocations with a bumped
/// generation, so a stale handle never resolves to the node that took its
/// place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId {
    pub(crate) index: usize,
    pub(crate) generation: u32,
}

impl NodeId {
    pub(crate) fn new(index: usize, generation: u32) -> Self {
        Self { index, generation }
    }

    /// Raw arena index.
    pub fn index(self) -> usize {
        self.index
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.index)
    }
}

// =============================================================================
// Node flags (bitflags)
// =============================================================================

bitflags::bitflags! {
    /// Live element properties that are not reflected as attributes.
    ///
    /// Mirrors the DOM split between an attribute (`checked="..."`, the
    /// initial state) and the property (what the control shows right now).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct NodeFlags: u8 {
        const NONE = 0;
        /// Checkbox/radio checked property.
        const CHECKED = 1 << 0;
        /// The value property was written; the `value` attribute no longer applies.
        const DIRTY_VALUE = 1 << 1;
        /// Open modal holding a focus trap.
        const TRAPS_FOCUS = 1 << 2;
    }
}

// =============================================================================
// Route parameters
// =============================================================================

/// Parameters captured from the hash fragment by `:name` route segments.
pub type RouteParams = BTreeMap<String, String>;

// =============================================================================
// Value coercion
// =============================================================================

/// Truthiness with script semantics: `null`, `false`, `0`, `NaN` and `""` are
/// falsy, everything else (including empty arrays and objects) is truthy.
pub fn is_truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(_)) | Some(Value::Object(_)) => true,
    }
}

/// String form of a value as a script engine would print it.
///
/// Integral numbers print without a fractional part, objects print as
/// `[object Object]`, arrays join their elements with commas.
pub fn display_string(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                i.to_string()
            } else if let Some(u) = n.as_u64() {
                u.to_string()
            } else {
                format_f64(n.as_f64().unwrap_or(f64::NAN))
            }
        }
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .map(|v| match v {
                Value::Null => String::new(),
                other => display_string(other),
            })
            .collect::<Vec<_>>()
            .join(","),
        Value::Object(_) => "[object Object]".to_string(),
    }
}

/// Text to render for a possibly missing value: missing and `null` become
/// the empty string.
pub fn render_string(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(v) => display_string(v),
    }
}

/// Key string for a possibly missing item field. A missing field stringifies
/// to `"undefined"`.
pub fn key_string(value: Option<&Value>) -> String {
    match value {
        None => "undefined".to_string(),
        Some(v) => display_string(v),
    }
}

/// Shortest round-trip form, switching to exponent notation (`1e+21`,
/// `1.5e-7`) outside `[1e-6, 1e21)`. Negative zero prints as `0`.
pub(crate) fn format_f64(f: f64) -> String {
    if f.is_nan() {
        "NaN".to_string()
    } else if f.is_infinite() {
        let sign = if f > 0.0 { "" } else { "-" };
        format!("{sign}Infinity")
    } else if f == 0.0 {
        "0".to_string()
    } else if f.abs() >= 1e21 || f.abs() < 1e-6 {
        let formatted = format!("{f:e}");
        match formatted.split_once('e') {
            Some((mantissa, exp)) if !exp.starts_with('-') => format!("{mantissa}e+{exp}"),
            _ => formatted,
        }
    } else if f.fract() == 0.0 {
        format!("{f:.0}")
    } else {
        f.to_string()
    }
}
