//! The graph type itself (spec §3 "Graph": a pair of nodes and edges).

use moduly_error::Error;
use serde::{Deserialize, Serialize};

use crate::edge::Edge;
use crate::index::GraphIndex;
use crate::node::Node;
use crate::validate;

/// A directed graph of typed nodes, as authored by a user and frozen into
/// a [`Deployment`](crate) snapshot at publish time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Graph {
    /// Every node in the graph.
    pub nodes: Vec<Node>,
    /// Every edge connecting nodes in the graph.
    pub edges: Vec<Edge>,
}

impl Graph {
    /// Construct a graph from its node and edge lists without validating.
    #[must_use]
    pub fn new(nodes: Vec<Node>, edges: Vec<Edge>) -> Self {
        Self { nodes, edges }
    }

    /// Run the full pre-execution validation pipeline (spec §4.1): cycle
    /// detection, trigger uniqueness, reachability, in that order.
    ///
    /// `entry_point_ids` is non-empty only for the sub-graph case (a
    /// `loopNode`'s body or a `workflowNode`'s referenced deployment),
    /// where the caller already knows the entry points and trigger
    /// uniqueness does not apply.
    pub fn validate(&self, entry_point_ids: &[String]) -> Result<(), Error> {
        validate::validate(self, entry_point_ids)
    }

    /// Find a node by its graph-local id.
    #[must_use]
    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// The graph's unique trigger node, if exactly one exists.
    ///
    /// Does not itself validate uniqueness; callers that need the
    /// guarantee should call [`validate`](Self::validate) first.
    #[must_use]
    pub fn trigger_node(&self) -> Option<&Node> {
        self.nodes.iter().find(|n| n.is_trigger())
    }

    /// Build the [`GraphIndex`] of precomputed adjacency/handle/type
    /// lookups used by the engine's scheduling loop.
    #[must_use]
    pub fn build_index(&self) -> GraphIndex {
        GraphIndex::build(self)
    }

    /// Extract a `loopNode`'s body as a standalone sub-graph (spec §4.1
    /// "Sub-workflows and loops"): every node whose `parent_id` is
    /// `parent_id`, the edges between them, and the entry points among
    /// them (children with no incoming edge from a sibling child).
    ///
    /// Returns `Err(Error::Validation)` if `parent_id` has no children —
    /// a loop node with an empty body is a configuration error, not an
    /// empty-input edge case.
    pub fn sub_graph(&self, parent_id: &str) -> Result<(Self, Vec<String>), Error> {
        let child_ids: std::collections::HashSet<&str> = self
            .nodes
            .iter()
            .filter(|n| n.parent_id.as_deref() == Some(parent_id))
            .map(|n| n.id.as_str())
            .collect();
        if child_ids.is_empty() {
            return Err(Error::Validation(format!(
                "node {parent_id} has no body nodes (no node has parent_id = {parent_id})"
            )));
        }

        let nodes: Vec<Node> = self
            .nodes
            .iter()
            .filter(|n| child_ids.contains(n.id.as_str()))
            .cloned()
            .collect();
        let edges: Vec<Edge> = self
            .edges
            .iter()
            .filter(|e| child_ids.contains(e.source.as_str()) && child_ids.contains(e.target.as_str()))
            .cloned()
            .collect();

        let has_internal_incoming: std::collections::HashSet<&str> =
            edges.iter().map(|e| e.target.as_str()).collect();
        let mut entry_points: Vec<String> = nodes
            .iter()
            .filter(|n| !has_internal_incoming.contains(n.id.as_str()))
            .map(|n| n.id.clone())
            .collect();
        entry_points.sort();

        Ok((Self { nodes, edges }, entry_points))
    }
}
