//! Path-addressable event record shared by both pipeline stages.
//!
//! Fields are addressed by dotted (`dns.resolved`) or bracketed
//! (`[dns][resolved]`) paths; both name the same nested field.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Mutable JSON-object record flowing through the event pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Event {
    value: Value,
}

impl Event {
    pub fn new() -> Self {
        Self {
            value: Value::Object(Map::new()),
        }
    }

    /// Wrap an existing JSON record. Non-object values are replaced with an
    /// empty object so field access is always defined.
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(_) => Self { value },
            _ => Self::new(),
        }
    }

    pub fn as_value(&self) -> &Value {
        &self.value
    }

    pub fn into_value(self) -> Value {
        self.value
    }

    /// Field lookup by path. Returns `None` when any segment is missing or
    /// an intermediate is not an object.
    pub fn get(&self, path: &str) -> Option<&Value> {
        let mut current = &self.value;
        for segment in parse_path(path) {
            current = current.as_object()?.get(segment)?;
        }
        Some(current)
    }

    pub fn get_str(&self, path: &str) -> Option<&str> {
        self.get(path).and_then(|v| v.as_str())
    }

    /// Write a field by path, creating intermediate objects as needed.
    /// Non-object intermediates along the path are overwritten.
    pub fn set(&mut self, path: &str, new_value: Value) {
        let segments = parse_path(path);
        let Some((last, parents)) = segments.split_last() else {
            return;
        };
        let mut current = &mut self.value;
        for segment in parents {
            if !current.is_object() {
                *current = Value::Object(Map::new());
            }
            let Some(map) = current.as_object_mut() else {
                return;
            };
            current = map.entry(segment.to_string()).or_insert(Value::Null);
        }
        if !current.is_object() {
            *current = Value::Object(Map::new());
        }
        if let Some(map) = current.as_object_mut() {
            map.insert(last.to_string(), new_value);
        }
    }

    /// Tags currently set on the event.
    pub fn tags(&self) -> Vec<String> {
        match self.value.get("tags") {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Append a tag, creating the collection on first use. An existing
    /// non-array `tags` field is left alone.
    pub fn add_tag(&mut self, tag: &str) {
        let Some(map) = self.value.as_object_mut() else {
            return;
        };
        let tags = map
            .entry("tags".to_string())
            .or_insert_with(|| Value::Array(Vec::new()));
        if let Value::Array(items) = tags {
            items.push(Value::String(tag.to_string()));
        }
    }
}

impl Default for Event {
    fn default() -> Self {
        Self::new()
    }
}

/// Split a field path into segments, accepting both `a.b` and `[a][b]`.
fn parse_path(path: &str) -> Vec<&str> {
    if path.starts_with('[') && path.ends_with(']') {
        path[1..path.len() - 1]
            .split("][")
            .filter(|s| !s.is_empty())
            .collect()
    } else {
        path.split('.').filter(|s| !s.is_empty()).collect()
    }
}
