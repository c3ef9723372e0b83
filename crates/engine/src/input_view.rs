//! The input view a node's [`ActionContext`](moduly_action::ActionContext)
//! receives (spec §4.1.4): the trigger node sees the raw payload;
//! everything else sees a snapshot of the whole `results` map, addressed
//! through the node's configured value selectors.

use std::collections::HashMap;

use moduly_value::Value;

/// Build the input view for a non-trigger node: the full results-map
/// snapshot, so any of the node's configured selectors can be resolved
/// downstream by the node implementation itself against this view.
///
/// The engine hands over the whole map rather than pre-resolving
/// selectors here, matching spec §4.1.4's "inputs = a shallow snapshot
/// of the complete results map" — selector resolution is a per-field
/// concern of the node's own configuration, not something the scheduler
/// can know in general without parsing every node type's config schema.
#[must_use]
pub fn snapshot(results: &HashMap<String, Value>) -> Value {
    let object = results
        .iter()
        .map(|(k, v)| (k.clone(), v.as_json().clone()))
        .collect();
    Value::new(serde_json::Value::Object(object))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_includes_every_result() {
        let mut results = HashMap::new();
        results.insert("a".to_string(), Value::new(serde_json::json!(1)));
        results.insert("b".to_string(), Value::new(serde_json::json!("x")));
        let snap = snapshot(&results);
        assert_eq!(snap.get_path(&["a"]), Some(&serde_json::json!(1)));
        assert_eq!(snap.get_path(&["b"]), Some(&serde_json::json!("x")));
    }

    #[test]
    fn empty_results_yields_empty_object() {
        let snap = snapshot(&HashMap::new());
        assert_eq!(snap.as_json(), &serde_json::json!({}));
    }
}
