//! Field extraction strategies
//!
//! Parsing strategies are tried in a fixed priority order until one
//! yields at least one field:
//!
//! 1. JSON object - recursive flatten with `.`-joined paths
//! 2. `key=value` pairs, whitespace- or comma-separated, quoted values
//!    allowed
//! 3. `key: value` lines
//! 4. Positional whitespace tokens named `field_1..field_n`
//!
//! The same extractor backs template learning, filter evaluation, and
//! aggregation key computation, so all three agree on field names.

use serde_json::Value;

/// Ordered set of extracted `(name, value)` fields.
///
/// Order matters: the learned template records fields in extraction
/// order, and positional names depend on it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldMap {
    fields: Vec<(String, String)>,
}

impl FieldMap {
    /// Number of extracted fields
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// True when extraction produced nothing
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Look up a field value by name (first match wins)
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Iterate fields in extraction order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.fields.push((name.into(), value.into()));
    }
}

/// Extract fields from a raw payload using the strategy priority list.
pub fn extract_fields(raw: &str) -> FieldMap {
    let raw = raw.trim();
    if raw.is_empty() {
        return FieldMap::default();
    }

    if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(raw) {
        let mut fields = FieldMap::default();
        flatten_object(&map, "", &mut fields);
        if !fields.is_empty() {
            return fields;
        }
    }

    let fields = extract_key_value(raw);
    if !fields.is_empty() {
        return fields;
    }

    let fields = extract_colon_separated(raw);
    if !fields.is_empty() {
        return fields;
    }

    extract_positional(raw)
}

/// Convenience lookup: extract and fetch a single field.
pub fn lookup_field(raw: &str, name: &str) -> Option<String> {
    extract_fields(raw).get(name).map(str::to_owned)
}

/// Recursive flatten of a JSON object with `.`-joined paths.
///
/// Arrays and non-object leaves become string values; nested objects
/// recurse into their children.
fn flatten_object(map: &serde_json::Map<String, Value>, prefix: &str, out: &mut FieldMap) {
    for (key, value) in map {
        let path = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}.{key}")
        };

        match value {
            Value::Object(inner) => flatten_object(inner, &path, out),
            Value::String(s) => out.push(path, s.clone()),
            Value::Null => out.push(path, "null"),
            other => out.push(path, other.to_string()),
        }
    }
}

/// Parse `key=value` pairs separated by whitespace or commas.
///
/// Values may be double-quoted to contain separators; quotes are
/// stripped from the extracted value.
fn extract_key_value(raw: &str) -> FieldMap {
    let mut fields = FieldMap::default();

    for token in tokenize(raw, &[' ', '\t', ',']) {
        if let Some((key, value)) = token.split_once('=') {
            let key = key.trim();
            if key.is_empty() {
                continue;
            }
            fields.push(key, unquote(value.trim()));
        }
    }

    fields
}

/// Parse `key: value` lines (one pair per line).
fn extract_colon_separated(raw: &str) -> FieldMap {
    let mut fields = FieldMap::default();

    for line in raw.lines() {
        if let Some((key, value)) = line.split_once(':') {
            let key = key.trim();
            let value = value.trim();
            if key.is_empty() || key.contains(char::is_whitespace) || value.is_empty() {
                continue;
            }
            fields.push(key, unquote(value));
        }
    }

    fields
}

/// Name whitespace-separated tokens `field_1..field_n`.
fn extract_positional(raw: &str) -> FieldMap {
    let mut fields = FieldMap::default();

    for (idx, token) in raw.split_whitespace().enumerate() {
        fields.push(format!("field_{}", idx + 1), token);
    }

    fields
}

/// Split on any of `separators`, keeping double-quoted runs intact.
fn tokenize<'a>(raw: &'a str, separators: &[char]) -> Vec<&'a str> {
    let mut tokens = Vec::new();
    let mut start = None;
    let mut in_quotes = false;

    for (idx, ch) in raw.char_indices() {
        if ch == '"' {
            in_quotes = !in_quotes;
        }

        if !in_quotes && separators.contains(&ch) {
            if let Some(s) = start.take() {
                tokens.push(&raw[s..idx]);
            }
        } else if start.is_none() {
            start = Some(idx);
        }
    }

    if let Some(s) = start {
        tokens.push(&raw[s..]);
    }

    tokens
}

fn unquote(value: &str) -> &str {
    value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value)
}

#[cfg(test)]
#[path = "extract_test.rs"]
mod extract_test;
