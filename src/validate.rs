//! Validation - Schema checks over plain data and constraint checks over forms.
//!
//! Schema rules, per field:
//!
//! ```text
//! req  value must be present and not null or ""
//! min  numbers only, value >= min          message "min N"
//! max  numbers only, value <= max          message "max N"
//! ml   strings only, length >= ml          message "minlength N"
//! xl   strings only, length <= xl          message "maxlength N"
//! pt   strings only, regex must match      message "pattern"
//! ```
//!
//! A rule that does not apply to the value's type is skipped, so `{min: 0}`
//! says nothing about a string.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::engine::Document;
use crate::types::{format_f64, is_truthy, NodeId};

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^[A-Za-z0-9.!#$%&'*+/=?^_`{|}~-]+@[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?)*$",
    )
    .expect("email pattern is valid")
});

static URL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9+.-]*:\S+$").expect("url pattern is valid"));

// =============================================================================
// Report
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    /// Schema key, or the control's `name` (then `id`) for forms.
    pub field: String,
    pub message: String,
}

impl FieldError {
    fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub valid: bool,
    pub errors: Vec<FieldError>,
}

impl ValidationReport {
    fn from_errors(errors: Vec<FieldError>) -> Self {
        Self {
            valid: errors.is_empty(),
            errors,
        }
    }

    /// Messages reported for one field.
    pub fn messages_for(&self, field: &str) -> Vec<&str> {
        self.errors
            .iter()
            .filter(|e| e.field == field)
            .map(|e| e.message.as_str())
            .collect()
    }
}

// =============================================================================
// Schema validation
// =============================================================================

/// Rules for one schema field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldRule {
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub req: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ml: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub xl: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pt: Option<String>,
}

/// Check `data` (an object) against `schema` (field name to [`FieldRule`]).
///
/// Entries whose rules do not parse, and patterns that do not compile, are
/// logged and skipped.
pub fn validate_schema(schema: &Value, data: &Value) -> ValidationReport {
    let mut errors = Vec::new();
    let Some(fields) = schema.as_object() else {
        warn!("validation schema is not an object");
        return ValidationReport::from_errors(errors);
    };

    for (field, raw) in fields {
        let rule: FieldRule = match serde_json::from_value(raw.clone()) {
            Ok(rule) => rule,
            Err(err) => {
                warn!(%field, %err, "skipping unreadable schema rule");
                continue;
            }
        };
        check_field(field, &rule, data.get(field), &mut errors);
    }
    ValidationReport::from_errors(errors)
}

fn check_field(field: &str, rule: &FieldRule, value: Option<&Value>, errors: &mut Vec<FieldError>) {
    let missing = matches!(value, None | Some(Value::Null))
        || value.and_then(Value::as_str) == Some("");
    if is_truthy(Some(&rule.req)) && missing {
        errors.push(FieldError::new(field, "required"));
    }

    if let Some(n) = value.and_then(Value::as_f64) {
        if let Some(min) = rule.min.filter(|&min| n < min) {
            errors.push(FieldError::new(field, format!("min {}", format_f64(min))));
        }
        if let Some(max) = rule.max.filter(|&max| n > max) {
            errors.push(FieldError::new(field, format!("max {}", format_f64(max))));
        }
    }

    if let Some(s) = value.and_then(Value::as_str) {
        let len = s.chars().count() as f64;
        if let Some(ml) = rule.ml.filter(|&ml| len < ml) {
            errors.push(FieldError::new(field, format!("minlength {}", format_f64(ml))));
        }
        if let Some(xl) = rule.xl.filter(|&xl| len > xl) {
            errors.push(FieldError::new(field, format!("maxlength {}", format_f64(xl))));
        }
        if let Some(pattern) = rule.pt.as_deref().filter(|p| !p.is_empty()) {
            match Regex::new(pattern) {
                Ok(re) if !re.is_match(s) => errors.push(FieldError::new(field, "pattern")),
                Ok(_) => {}
                Err(err) => warn!(%field, %pattern, %err, "invalid schema pattern"),
            }
        }
    }
}

// =============================================================================
// Form validation
// =============================================================================

/// Check the constraint attributes of every control inside a `<form>`.
///
/// Controls checked: `input`, `select` and `textarea`, minus disabled ones
/// and inputs of type `hidden`, `submit`, `button` and `reset`. Anything
/// other than a form yields `valid == false` with the message `Not a form`.
pub fn validate_form(doc: &Document, form: NodeId) -> ValidationReport {
    if doc.tag(form) != Some("form") {
        return ValidationReport::from_errors(vec![FieldError::new("", "Not a form")]);
    }

    let mut errors = Vec::new();
    for control in doc.descendants(form) {
        if !doc.is_input_like(control) || doc.has_attr(control, "disabled") {
            continue;
        }
        if doc.tag(control) == Some("input")
            && matches!(doc.input_type(control).as_str(), "hidden" | "submit" | "button" | "reset")
        {
            continue;
        }
        if let Some(message) = control_error(doc, control) {
            let field = doc
                .attr(control, "name")
                .filter(|n| !n.is_empty())
                .or_else(|| doc.attr(control, "id"))
                .unwrap_or_default();
            errors.push(FieldError::new(field, message));
        }
    }
    ValidationReport::from_errors(errors)
}

/// First failing constraint of a control.
fn control_error(doc: &Document, control: NodeId) -> Option<String> {
    if doc.is_checkbox(control) {
        return (doc.has_attr(control, "required") && !doc.checked(control))
            .then(|| "required".to_string());
    }

    let value = doc.value(control);
    if value.is_empty() {
        return doc.has_attr(control, "required").then(|| "required".to_string());
    }

    let len = value.chars().count() as f64;
    if let Some(ml) = doc.numeric_attr(control, "minlength").filter(|&ml| len < ml) {
        return Some(format!("minlength {}", format_f64(ml)));
    }
    if let Some(xl) = doc.numeric_attr(control, "maxlength").filter(|&xl| len > xl) {
        return Some(format!("maxlength {}", format_f64(xl)));
    }

    if doc.tag(control) == Some("input") {
        match doc.input_type(control).as_str() {
            "email" if !EMAIL_RE.is_match(&value) => return Some("email".to_string()),
            "url" if !URL_RE.is_match(&value) => return Some("url".to_string()),
            "number" | "range" => {
                let Ok(n) = value.trim().parse::<f64>() else {
                    return Some("number".to_string());
                };
                if let Some(min) = doc.numeric_attr(control, "min").filter(|&min| n < min) {
                    return Some(format!("min {}", format_f64(min)));
                }
                if let Some(max) = doc.numeric_attr(control, "max").filter(|&max| n > max) {
                    return Some(format!("max {}", format_f64(max)));
                }
            }
            _ => {}
        }

        if let Some(pattern) = doc.attr(control, "pattern").filter(|p| !p.is_empty()) {
            // Form patterns must match the whole value.
            match Regex::new(&format!("^(?:{pattern})$")) {
                Ok(re) if !re.is_match(&value) => return Some("pattern".to_string()),
                Ok(_) => {}
                Err(err) => warn!(%pattern, %err, "invalid form pattern"),
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_schema_valid_and_invalid() {
        let schema = json!({"name": {"req": true}, "age": {"min": 0, "max": 150}});
        let ok = validate_schema(&schema, &json!({"name": "Alice", "age": 30}));
        assert!(ok.valid);
        assert!(ok.errors.is_empty());

        let bad = validate_schema(&schema, &json!({"name": "", "age": 200}));
        assert!(!bad.valid);
        assert_eq!(bad.messages_for("name"), vec!["required"]);
        assert_eq!(bad.messages_for("age"), vec!["max 150"]);
    }

    #[test]
    fn test_schema_string_rules() {
        let schema = json!({"code": {"ml": 2, "xl": 4, "pt": "^[a-z]+$"}});
        let short = validate_schema(&schema, &json!({"code": "A"}));
        assert_eq!(short.messages_for("code"), vec!["minlength 2", "pattern"]);

        let long = validate_schema(&schema, &json!({"code": "abcdef"}));
        assert_eq!(long.messages_for("code"), vec!["maxlength 4"]);

        // Type-mismatched rules and absent optional fields say nothing.
        let other = validate_schema(&schema, &json!({"code": 12}));
        assert!(other.valid);
        assert!(validate_schema(&schema, &json!({})).valid);
    }

    #[test]
    fn test_schema_bad_entries_are_skipped() {
        let schema = json!({"a": {"pt": "("}, "b": {"min": "zero"}, "c": {"req": 1}});
        let report = validate_schema(&schema, &json!({"a": "x", "b": -1}));
        assert_eq!(report.errors, vec![FieldError::new("c", "required")]);
        assert!(validate_schema(&json!([1]), &json!({})).valid);
    }

    fn form(html: &str) -> (Document, NodeId) {
        let doc = Document::parse_html(html).unwrap();
        let form = doc.query_selector(doc.root(), "form").unwrap().unwrap();
        (doc, form)
    }

    #[test]
    fn test_not_a_form() {
        let doc = Document::parse_html("<div id=x></div>").unwrap();
        let div = doc.get_element_by_id("x").unwrap();
        let report = validate_form(&doc, div);
        assert!(!report.valid);
        assert_eq!(report.errors[0].message, "Not a form");
    }

    #[test]
    fn test_form_constraints() {
        let (mut doc, f) = form(
            r#"<form>
                <input name="user" required>
                <input id="mail" type="email" value="nope">
                <input name="age" type="number" min="18" value="12">
                <input name="zip" pattern="[0-9]{5}" value="123456">
                <input name="skip" required disabled>
                <input type="submit">
                <input name="agree" type="checkbox" required>
            </form>"#,
        );
        let report = validate_form(&doc, f);
        assert!(!report.valid);
        assert_eq!(report.messages_for("user"), vec!["required"]);
        assert_eq!(report.messages_for("mail"), vec!["email"]);
        assert_eq!(report.messages_for("age"), vec!["min 18"]);
        assert_eq!(report.messages_for("zip"), vec!["pattern"]);
        assert_eq!(report.messages_for("agree"), vec!["required"]);
        assert!(report.messages_for("skip").is_empty());

        let user = doc.query_selector(f, "[name=user]").unwrap().unwrap();
        doc.set_value(user, "bob");
        assert!(validate_form(&doc, f).messages_for("user").is_empty());
    }

    #[test]
    fn test_valid_form() {
        let (doc, f) = form(
            r#"<form><input name="a" type="url" value="https://x.dev/p">
               <textarea name="t" maxlength="10">short</textarea>
               <select name="s" required><option value="v">V</option></select></form>"#,
        );
        assert_eq!(validate_form(&doc, f), ValidationReport { valid: true, errors: vec![] });
    }
}
