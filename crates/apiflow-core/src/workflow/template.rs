//! Placeholder substitution over JSON values.
//!
//! Strings may reference previously extracted data as `{key}`. Substitution
//! is all-or-nothing per string: if any referenced key is missing, the string
//! is returned untouched so that a step without dependencies (or with a
//! dependency that was never extracted) is still dispatched as written.

use std::sync::LazyLock;

use regex::{Captures, Regex};
use serde_json::Value;

use crate::workflow::schema::ExtractedData;

/// `{identifier}` — JSON-looking text such as `{"a": 1}` or `{}` never matches.
static PLACEHOLDER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{([A-Za-z_][A-Za-z0-9_.\-]*)\}").expect("placeholder pattern is valid")
});

/// Recursively substitute placeholders in strings, object values and arrays.
/// Object keys and non-string scalars pass through unchanged.
pub fn substitute(value: &Value, bindings: &ExtractedData) -> Value {
    match value {
        Value::String(s) => Value::String(substitute_str(s, bindings)),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), substitute(v, bindings)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.iter().map(|v| substitute(v, bindings)).collect()),
        other => other.clone(),
    }
}

/// Substitute every `{key}` in `template`, or return it unchanged if any key is absent.
pub fn substitute_str(template: &str, bindings: &ExtractedData) -> String {
    let mut missing = false;
    let resolved = PLACEHOLDER_RE.replace_all(template, |caps: &Captures| {
        match bindings.get(&caps[1]) {
            Some(v) => render(v),
            None => {
                missing = true;
                String::new()
            }
        }
    });

    if missing {
        template.to_string()
    } else {
        resolved.into_owned()
    }
}

fn render(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
