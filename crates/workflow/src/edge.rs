//! Graph edge definitions (spec §3 "Graph").

use serde::{Deserialize, Serialize};

/// A directed connection between two nodes.
///
/// `source_handle` is the branch label attached to the *source* node's
/// output (e.g. a conditional node's `"true"`/`"false"` arms); an edge
/// without one is followed unconditionally whenever its source finishes
/// successfully (spec §4.1 step 3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Edge {
    /// Unique identifier for this edge.
    pub id: String,
    /// Source node id.
    pub source: String,
    /// Target node id.
    pub target: String,
    /// Branch label on the source node's output this edge follows.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_handle: Option<String>,
    /// Input slot on the target node this edge feeds, if the node has more
    /// than one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_handle: Option<String>,
}

impl Edge {
    /// Create an unconditional edge between two nodes.
    #[must_use]
    pub fn new(id: impl Into<String>, source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            source: source.into(),
            target: target.into(),
            source_handle: None,
            target_handle: None,
        }
    }

    /// Attach a source handle (branch label).
    #[must_use]
    pub fn with_source_handle(mut self, handle: impl Into<String>) -> Self {
        self.source_handle = Some(handle.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unconditional_edge_has_no_handle() {
        let e = Edge::new("e1", "a", "b");
        assert!(e.source_handle.is_none());
    }

    #[test]
    fn branch_edge_carries_handle() {
        let e = Edge::new("e1", "cond", "p").with_source_handle("true");
        assert_eq!(e.source_handle.as_deref(), Some("true"));
    }
}
