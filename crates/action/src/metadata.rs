//! Static per-node-type metadata (spec §9: "Node configuration is
//! validated against a per-type schema at graph load").

use serde::{Deserialize, Serialize};

/// Static description of one node type, independent of any particular
/// node instance's configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionMetadata {
    /// The node type tag this metadata describes, e.g. `"httpRequest"`.
    pub node_type: String,
    /// Human-readable summary shown in the graph editor.
    pub description: String,
    /// JSON Schema the node's `data` configuration must validate
    /// against at graph-load time.
    pub config_schema: serde_json::Value,
    /// The distinct `selected_handle` values this node type may emit,
    /// empty for node types that always fan out unconditionally.
    #[serde(default)]
    pub branches: Vec<String>,
}

impl ActionMetadata {
    /// Build metadata for a node type with no configuration schema and
    /// no branches (the common case for most node types).
    #[must_use]
    pub fn new(node_type: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            node_type: node_type.into(),
            description: description.into(),
            config_schema: serde_json::json!({}),
            branches: Vec::new(),
        }
    }

    /// Attach a configuration schema.
    #[must_use]
    pub fn with_config_schema(mut self, schema: serde_json::Value) -> Self {
        self.config_schema = schema;
        self
    }

    /// Declare the branch labels this node type may select between.
    #[must_use]
    pub fn with_branches(mut self, branches: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.branches = branches.into_iter().map(Into::into).collect();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_chain() {
        let meta = ActionMetadata::new("ifNode", "Conditional branch")
            .with_branches(["true", "false"]);
        assert_eq!(meta.branches, vec!["true".to_string(), "false".to_string()]);
    }
}
