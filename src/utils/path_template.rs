//! Path-template helpers shared by routing and response mapping.
//!
//! A template is plain text with `{name}` placeholders, e.g.
//! `/users/{id}/orders?status={status}`.

use std::collections::HashMap;

use serde_json::Value;

/// Returns the placeholder names of `pattern` in order of appearance.
///
/// Duplicates are kept. A placeholder is a `{` followed by at least one
/// character that is not `}`, closed by `}`; `{}` is not a placeholder.
pub fn extract_params(pattern: &str) -> Vec<String> {
    let mut params = Vec::new();
    let mut rest = pattern;

    while let Some(open) = rest.find('{') {
        let after_open = &rest[open + 1..];
        match after_open.find('}') {
            Some(0) => rest = after_open,
            Some(close) => {
                params.push(after_open[..close].to_string());
                rest = &after_open[close + 1..];
            }
            None => break,
        }
    }

    params
}

/// Replaces every `{name}` in `pattern` with `values[name]`.
///
/// Placeholders without a value are left verbatim.
pub fn substitute(pattern: &str, values: &HashMap<String, String>) -> String {
    let mut output = pattern.to_string();
    for name in extract_params(pattern) {
        if let Some(value) = values.get(&name) {
            output = output.replace(&placeholder(&name), value);
        }
    }
    output
}

/// Like [`substitute`], but every placeholder must resolve.
///
/// Returns the name of the first placeholder with no value.
pub fn resolve(pattern: &str, values: &HashMap<String, String>) -> Result<String, String> {
    if let Some(missing) = extract_params(pattern)
        .into_iter()
        .find(|name| !values.contains_key(name))
    {
        return Err(missing);
    }
    Ok(substitute(pattern, values))
}

/// Builds an enrichment lookup URL.
///
/// The placeholder token is removed from the pattern (separators around it
/// stay) and the value is appended, so `/users/{id}` with `7` becomes
/// `<origin>/users/7`. No separator is inserted.
pub fn lookup_url(origin: &str, pattern: &str, param: &str, value: &str) -> String {
    format!("{}{}{}", origin, pattern.replace(&placeholder(param), ""), value)
}

/// String form of a record field used as a lookup key.
pub fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Splits a resolved target into its path and optional query.
pub fn split_query(target: &str) -> (&str, Option<&str>) {
    match target.split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (target, None),
    }
}

fn placeholder(name: &str) -> String {
    format!("{{{}}}", name)
}
