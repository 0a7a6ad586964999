//! Transforms - The `|pipe` chain of `data-m-bind`.
//!
//! `data-m-bind="user.name | trim | title"` renders the looked-up value
//! through each named transform, left to right. Unknown names pass the text
//! through unchanged.

/// Split a bind spec into its path and the transform names after it.
pub fn split_bind(spec: &str) -> (&str, Vec<&str>) {
    let mut parts = spec.split('|').map(str::trim);
    let path = parts.next().unwrap_or_default();
    (path, parts.filter(|p| !p.is_empty()).collect())
}

/// Apply one named transform.
pub fn apply_transform(name: &str, text: &str) -> String {
    match name {
        "upper" => text.to_uppercase(),
        "lower" => text.to_lowercase(),
        "title" => title_case(text),
        "trim" => text.trim().to_string(),
        _ => text.to_string(),
    }
}

/// Apply a chain of transforms in order.
pub fn apply_transforms(text: String, names: &[&str]) -> String {
    names
        .iter()
        .fold(text, |acc, name| apply_transform(name, &acc))
}

/// Uppercase every word character that follows a non-word character (or
/// starts the text). Word characters are ASCII letters, digits and `_`.
fn title_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut prev_word = false;
    for c in text.chars() {
        let word = c.is_ascii_alphanumeric() || c == '_';
        if word && !prev_word {
            out.push(c.to_ascii_uppercase());
        } else {
            out.push(c);
        }
        prev_word = word;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_bind() {
        assert_eq!(split_bind("name"), ("name", vec![]));
        assert_eq!(split_bind(" user.name | trim|upper "), ("user.name", vec!["trim", "upper"]));
        assert_eq!(split_bind("x||lower"), ("x", vec!["lower"]));
    }

    #[test]
    fn test_transforms() {
        assert_eq!(apply_transform("upper", "abc"), "ABC");
        assert_eq!(apply_transform("lower", "AbC"), "abc");
        assert_eq!(apply_transform("trim", "  a b "), "a b");
        assert_eq!(apply_transform("title", "hello wide-world o'neil"), "Hello Wide-World O'Neil");
        assert_eq!(apply_transform("shout", "same"), "same");
    }

    #[test]
    fn test_chain_runs_left_to_right() {
        let out = apply_transforms("  mixed Case ".to_string(), &["trim", "lower", "title"]);
        assert_eq!(out, "Mixed Case");
        assert_eq!(apply_transforms("x".into(), &[]), "x");
    }
}
