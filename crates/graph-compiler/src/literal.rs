//! Rendering of parameter values as source literals

use serde_json::Value;

use crate::constants::{literals, names};

/// Whether `text` matches `^[A-Za-z_][A-Za-z0-9_]*$`
pub fn is_identifier(text: &str) -> bool {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Single-quote a string, escaping backslashes and embedded quotes
pub fn quote(text: &str) -> String {
    format!("'{}'", text.replace('\\', "\\\\").replace('\'', "\\'"))
}

/// Render a value as a literal
///
/// Strings that look like identifiers are emitted bare because they name
/// bound variables. Strings nested inside arrays and objects are always
/// quoted.
pub fn format_value(value: &Value) -> String {
    match value {
        Value::String(s) if is_identifier(s) => s.clone(),
        other => format_nested(other),
    }
}

fn format_nested(value: &Value) -> String {
    match value {
        Value::Null => literals::NULL.to_string(),
        Value::Bool(true) => literals::TRUE.to_string(),
        Value::Bool(false) => literals::FALSE.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => quote(s),
        Value::Array(items) => {
            let items: Vec<String> = items.iter().map(format_nested).collect();
            format!("[{}]", items.join(", "))
        }
        Value::Object(map) => {
            let entries: Vec<String> = map
                .iter()
                .map(|(k, v)| format!("{}: {}", quote(k), format_nested(v)))
                .collect();
            format!("{{{}}}", entries.join(", "))
        }
    }
}

/// Resolve a dataset-relative path against an optional root directory
///
/// Returns the quoted literal. The root's own separator is used for the
/// joined path; quoting doubles the backslashes of a `\` separator.
pub fn resolve_filepath(path: &str, root: Option<&str>) -> String {
    let normalized = path.replace('\\', "/");
    let mut relative = normalized.strip_prefix("./").unwrap_or(&normalized);
    relative = relative.trim_start_matches('/');

    let dataset_prefix = format!("{}/", names::DATASET_ROOT);
    let relative = if relative.starts_with(&dataset_prefix) {
        relative.to_string()
    } else {
        format!("{}{}", dataset_prefix, relative)
    };

    let root = match root {
        Some(root) if !root.is_empty() => root,
        _ => return quote(&relative),
    };

    let separator = if root.contains('\\') && !root.contains('/') {
        '\\'
    } else {
        '/'
    };
    let base = root.trim_end_matches(separator);
    let relative = relative.replace('/', &separator.to_string());
    quote(&format!("{}{}{}", base, separator, relative))
}

/// Render a named parameter, applying the `filepath` special case
pub fn format_parameter(name: &str, value: &Value, root: Option<&str>) -> String {
    match value {
        Value::String(path) if name == names::FILEPATH_PARAMETER && !path.is_empty() => {
            resolve_filepath(path, root)
        }
        other => format_value(other),
    }
}
