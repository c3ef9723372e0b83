//! Precomputed adjacency/handle/type indices (spec §4.1 "Precomputed
//! structures"), built once per graph load so the engine's scheduling
//! loop never re-scans the edge list.

use indexmap::IndexMap;
use std::collections::HashMap;

use crate::graph::Graph;

/// O(1)-lookup structures derived from a [`Graph`]'s node and edge lists.
///
/// Built once when a graph is loaded for execution and shared read-only
/// across the run; nothing here mutates once constructed.
#[derive(Debug, Clone)]
pub struct GraphIndex {
    /// `source node id -> [target node ids]`, in edge-declaration order.
    forward: HashMap<String, Vec<String>>,
    /// `target node id -> [source node ids]`, used for readiness checks.
    reverse: HashMap<String, Vec<String>>,
    /// `(source node id, source handle) -> [target node ids]`.
    handles: HashMap<(String, String), Vec<String>>,
    /// `node type -> [node ids]`, used to find e.g. every `answerNode`.
    by_type: IndexMap<String, Vec<String>>,
}

impl GraphIndex {
    /// Build every index from a graph's nodes and edges in one pass.
    #[must_use]
    pub fn build(graph: &Graph) -> Self {
        let mut forward: HashMap<String, Vec<String>> = HashMap::new();
        let mut reverse: HashMap<String, Vec<String>> = HashMap::new();
        let mut handles: HashMap<(String, String), Vec<String>> = HashMap::new();
        let mut by_type: IndexMap<String, Vec<String>> = IndexMap::new();

        for node in &graph.nodes {
            by_type.entry(node.node_type.clone()).or_default().push(node.id.clone());
        }

        for edge in &graph.edges {
            forward.entry(edge.source.clone()).or_default().push(edge.target.clone());
            reverse.entry(edge.target.clone()).or_default().push(edge.source.clone());
            if let Some(handle) = &edge.source_handle {
                handles
                    .entry((edge.source.clone(), handle.clone()))
                    .or_default()
                    .push(edge.target.clone());
            }
        }

        Self {
            forward,
            reverse,
            handles,
            by_type,
        }
    }

    /// Every node an edge points to, out of `node_id`, regardless of handle.
    #[must_use]
    pub fn successors(&self, node_id: &str) -> &[String] {
        self.forward.get(node_id).map_or(&[], Vec::as_slice)
    }

    /// Every node with an edge into `node_id`; used to test readiness.
    #[must_use]
    pub fn predecessors(&self, node_id: &str) -> &[String] {
        self.reverse.get(node_id).map_or(&[], Vec::as_slice)
    }

    /// Targets of `node_id`'s outgoing edges labeled `handle`, for
    /// conditional-node branch resolution (spec §4.1 step 3).
    #[must_use]
    pub fn successors_for_handle(&self, node_id: &str, handle: &str) -> &[String] {
        self.handles
            .get(&(node_id.to_string(), handle.to_string()))
            .map_or(&[], Vec::as_slice)
    }

    /// Node ids of a given type, e.g. every `answerNode`.
    #[must_use]
    pub fn nodes_of_type(&self, node_type: &str) -> &[String] {
        self.by_type.get(node_type).map_or(&[], Vec::as_slice)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edge::Edge;
    use crate::node::Node;

    fn sample_graph() -> Graph {
        Graph {
            nodes: vec![
                Node::new("start", "startNode"),
                Node::new("cond", "ifNode"),
                Node::new("p", "answerNode"),
                Node::new("q", "answerNode"),
            ],
            edges: vec![
                Edge::new("e1", "start", "cond"),
                Edge::new("e2", "cond", "p").with_source_handle("true"),
                Edge::new("e3", "cond", "q").with_source_handle("false"),
            ],
        }
    }

    #[test]
    fn forward_and_reverse_adjacency() {
        let idx = GraphIndex::build(&sample_graph());
        assert_eq!(idx.successors("start"), ["cond"]);
        assert_eq!(idx.predecessors("cond"), ["start"]);
        assert!(idx.predecessors("start").is_empty());
    }

    #[test]
    fn handle_index_resolves_branch() {
        let idx = GraphIndex::build(&sample_graph());
        assert_eq!(idx.successors_for_handle("cond", "true"), ["p"]);
        assert_eq!(idx.successors_for_handle("cond", "false"), ["q"]);
        assert!(idx.successors_for_handle("cond", "other").is_empty());
    }

    #[test]
    fn type_index_groups_by_type() {
        let idx = GraphIndex::build(&sample_graph());
        let mut answers = idx.nodes_of_type("answerNode").to_vec();
        answers.sort();
        assert_eq!(answers, vec!["p".to_string(), "q".to_string()]);
    }
}
