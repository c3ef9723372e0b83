//! Graph node definitions (spec §3 "Graph").

use std::time::Duration;

use moduly_value::Value;
use serde::{Deserialize, Serialize};

/// The three node types that may serve as a graph's unique entry point
/// (spec §3, §4.1 trigger uniqueness).
pub const TRIGGER_NODE_TYPES: [&str; 3] = ["startNode", "webhookTrigger", "scheduleTrigger"];

/// The fallback per-node timeout when a node declares none (spec §4.1).
pub const DEFAULT_NODE_TIMEOUT: Duration = Duration::from_secs(300);

/// One node in a user-authored graph.
///
/// `id` is graph-local and author-chosen (unlike [`moduly_core::NodeRunId`],
/// which the engine generates per execution). `config` is type-specific and
/// opaque to the graph layer; node implementations interpret it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    /// Graph-local identifier, unique within the graph.
    pub id: String,
    /// The node's type tag, e.g. `"httpRequest"`, `"llmNode"`, `"answerNode"`.
    #[serde(rename = "type")]
    pub node_type: String,
    /// Type-specific configuration data.
    #[serde(default)]
    pub data: Value,
    /// Per-node execution deadline; falls back to
    /// [`DEFAULT_NODE_TIMEOUT`] when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<Duration>,
    /// The enclosing loop/sub-graph node, if this node lives inside one.
    ///
    /// Parented nodes are exempt from the top-level reachability check
    /// (spec §4.1): a loop's body is only reachable through the loop
    /// node's own iteration logic, not through ordinary edges.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
}

impl Node {
    /// Create a node with no timeout override and no parent.
    #[must_use]
    pub fn new(id: impl Into<String>, node_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            node_type: node_type.into(),
            data: Value::null(),
            timeout: None,
            parent_id: None,
        }
    }

    /// Attach configuration data.
    #[must_use]
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = data;
        self
    }

    /// Attach a per-node timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Nest this node under a parent (loop body membership).
    #[must_use]
    pub fn with_parent(mut self, parent_id: impl Into<String>) -> Self {
        self.parent_id = Some(parent_id.into());
        self
    }

    /// Returns `true` if this node's type is one of [`TRIGGER_NODE_TYPES`].
    #[must_use]
    pub fn is_trigger(&self) -> bool {
        TRIGGER_NODE_TYPES.contains(&self.node_type.as_str())
    }

    /// The effective execution deadline for this node.
    #[must_use]
    pub fn effective_timeout(&self) -> Duration {
        self.timeout.unwrap_or(DEFAULT_NODE_TIMEOUT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trigger_types_recognized() {
        assert!(Node::new("n1", "startNode").is_trigger());
        assert!(Node::new("n1", "webhookTrigger").is_trigger());
        assert!(Node::new("n1", "scheduleTrigger").is_trigger());
        assert!(!Node::new("n1", "httpRequest").is_trigger());
    }

    #[test]
    fn effective_timeout_falls_back_to_default() {
        let n = Node::new("n1", "httpRequest");
        assert_eq!(n.effective_timeout(), DEFAULT_NODE_TIMEOUT);
    }

    #[test]
    fn effective_timeout_uses_override() {
        let n = Node::new("n1", "httpRequest").with_timeout(Duration::from_secs(5));
        assert_eq!(n.effective_timeout(), Duration::from_secs(5));
    }

    #[test]
    fn builder_chain() {
        let n = Node::new("loop_body_1", "codeNode")
            .with_parent("loop_1")
            .with_data(Value::new(serde_json::json!({"x": 1})));
        assert_eq!(n.parent_id.as_deref(), Some("loop_1"));
        assert_eq!(n.data.as_json(), &serde_json::json!({"x": 1}));
    }
}
