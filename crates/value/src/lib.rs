#![forbid(unsafe_code)]
#![warn(missing_docs)]

//! # Moduly Value
//!
//! The generic JSON-tree value payload nodes pass to one another, plus
//! the value-selector navigation the engine's input view (spec §4.1.4)
//! uses to address a specific ancestor's output.
//!
//! [`Value`] is a thin wrapper over [`serde_json::Value`] rather than a
//! bespoke tree: every node's configuration and output is already JSON
//! at the storage boundary, so re-deriving a tagged tree buys nothing
//! and would need its own serde impls to cross that boundary anyway.

use serde::{Deserialize, Serialize};

/// A node's input/output payload: an arbitrary JSON tree.
///
/// Cloning is cheap relative to the data it typically carries (engine
/// inputs are shallow snapshots, not the whole run), so [`Value`]
/// derives `Clone` without trying to make it free.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Value(pub serde_json::Value);

impl Value {
    /// The JSON `null` value.
    #[must_use]
    pub fn null() -> Self {
        Self(serde_json::Value::Null)
    }

    /// Wrap an existing [`serde_json::Value`].
    #[must_use]
    pub fn new(inner: serde_json::Value) -> Self {
        Self(inner)
    }

    /// Borrow the underlying JSON value.
    #[must_use]
    pub fn as_json(&self) -> &serde_json::Value {
        &self.0
    }

    /// Consume this value, returning the underlying JSON value.
    #[must_use]
    pub fn into_json(self) -> serde_json::Value {
        self.0
    }

    /// Navigate an ordered path of object keys / array indices.
    ///
    /// An array index is any path segment that parses as a `usize`;
    /// everything else is treated as an object key. Returns `None` as
    /// soon as a segment can't be resolved — including indexing into a
    /// scalar or missing a key — rather than panicking, matching the
    /// unresolved-path-yields-null behavior the engine's input view
    /// relies on (callers typically fall back to [`Value::null`]).
    #[must_use]
    pub fn get_path(&self, path: &[impl AsRef<str>]) -> Option<&serde_json::Value> {
        let mut current = &self.0;
        for segment in path {
            let segment = segment.as_ref();
            current = match current {
                serde_json::Value::Object(map) => map.get(segment)?,
                serde_json::Value::Array(items) => {
                    let index: usize = segment.parse().ok()?;
                    items.get(index)?
                }
                _ => return None,
            };
        }
        Some(current)
    }
}

impl From<serde_json::Value> for Value {
    fn from(inner: serde_json::Value) -> Self {
        Self(inner)
    }
}

impl From<Value> for serde_json::Value {
    fn from(value: Value) -> Self {
        value.0
    }
}

impl Default for Value {
    fn default() -> Self {
        Self::null()
    }
}

/// An ordered path `[node_id, key, key, ...]` into a run's results map.
///
/// The first segment is always a node id; the remaining segments
/// navigate that node's output tree. Selectors are the only way a
/// node's configuration references another node's output, so they are
/// validated against the graph's node-id set at load time (spec
/// §4.1.2) even though [`Selector`] itself performs no validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Selector(pub Vec<String>);

impl Selector {
    /// Build a selector from path segments.
    #[must_use]
    pub fn new(segments: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self(segments.into_iter().map(Into::into).collect())
    }

    /// The node id this selector addresses, if any segment is present.
    #[must_use]
    pub fn node_id(&self) -> Option<&str> {
        self.0.first().map(String::as_str)
    }

    /// The segments after the node id, used to navigate that node's output.
    #[must_use]
    pub fn sub_path(&self) -> &[String] {
        self.0.get(1..).unwrap_or_default()
    }

    /// Resolve this selector against a results map keyed by node id.
    ///
    /// Returns [`Value::null`] for any unresolved path — missing node,
    /// missing key, out-of-range index — per spec §4.1.4.
    #[must_use]
    pub fn resolve(&self, results: &std::collections::HashMap<String, Value>) -> Value {
        let Some(node_id) = self.node_id() else {
            return Value::null();
        };
        let Some(root) = results.get(node_id) else {
            return Value::null();
        };
        root.get_path(self.sub_path())
            .cloned()
            .map(Value::new)
            .unwrap_or_else(Value::null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    #[test]
    fn get_path_navigates_object_keys() {
        let value = Value::new(serde_json::json!({"a": {"b": 42}}));
        assert_eq!(
            value.get_path(&["a", "b"]),
            Some(&serde_json::json!(42))
        );
    }

    #[test]
    fn get_path_navigates_array_indices() {
        let value = Value::new(serde_json::json!({"items": [1, 2, 3]}));
        assert_eq!(
            value.get_path(&["items", "1"]),
            Some(&serde_json::json!(2))
        );
    }

    #[test]
    fn get_path_returns_none_for_missing_key() {
        let value = Value::new(serde_json::json!({"a": 1}));
        assert_eq!(value.get_path(&["missing"]), None);
    }

    #[test]
    fn get_path_returns_none_for_index_into_scalar() {
        let value = Value::new(serde_json::json!(5));
        assert_eq!(value.get_path(&["0"]), None);
    }

    #[test]
    fn get_path_empty_returns_self() {
        let value = Value::new(serde_json::json!({"a": 1}));
        assert_eq!(value.get_path::<&str>(&[]), Some(value.as_json()));
    }

    #[test]
    fn selector_resolves_nested_value() {
        let mut results = HashMap::new();
        results.insert(
            "node1".to_string(),
            Value::new(serde_json::json!({"output": {"text": "hello"}})),
        );
        let selector = Selector::new(["node1", "output", "text"]);
        assert_eq!(
            selector.resolve(&results).into_json(),
            serde_json::json!("hello")
        );
    }

    #[test]
    fn selector_resolves_to_null_for_unknown_node() {
        let results = HashMap::new();
        let selector = Selector::new(["missing_node", "key"]);
        assert_eq!(selector.resolve(&results), Value::null());
    }

    #[test]
    fn selector_resolves_to_null_for_unresolved_subpath() {
        let mut results = HashMap::new();
        results.insert("node1".to_string(), Value::new(serde_json::json!({"a": 1})));
        let selector = Selector::new(["node1", "b", "c"]);
        assert_eq!(selector.resolve(&results), Value::null());
    }

    #[test]
    fn selector_node_id_and_sub_path() {
        let selector = Selector::new(["node1", "a", "b"]);
        assert_eq!(selector.node_id(), Some("node1"));
        assert_eq!(selector.sub_path(), &["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn selector_with_only_node_id_has_empty_sub_path() {
        let selector = Selector::new(["node1"]);
        assert!(selector.sub_path().is_empty());
    }

    #[test]
    fn serde_roundtrip_selector() {
        let selector = Selector::new(["node1", "output"]);
        let json = serde_json::to_string(&selector).unwrap();
        let back: Selector = serde_json::from_str(&json).unwrap();
        assert_eq!(back, selector);
    }
}
