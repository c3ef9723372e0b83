//! Pre-execution graph validation (spec §4.1, in validation order):
//! cycle detection, trigger uniqueness, and reachability.

use std::collections::HashSet;

use moduly_error::Error;
use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;

use crate::graph::Graph;

/// Run every pre-execution check in the order spec §4.1 specifies.
///
/// `entry_point_ids`, when non-empty, names the sub-graph case: the
/// trigger-uniqueness check is skipped and reachability is computed from
/// these ids instead of a single trigger node.
pub fn validate(graph: &Graph, entry_point_ids: &[String]) -> Result<(), Error> {
    check_unique_node_ids(graph)?;
    check_edges_reference_existing_nodes(graph)?;
    check_no_cycles(graph)?;

    let entry_points: Vec<String> = if entry_point_ids.is_empty() {
        vec![check_single_trigger(graph)?]
    } else {
        entry_point_ids.to_vec()
    };

    check_reachability(graph, &entry_points)?;
    Ok(())
}

fn check_unique_node_ids(graph: &Graph) -> Result<(), Error> {
    let mut seen = HashSet::new();
    for node in &graph.nodes {
        if !seen.insert(node.id.as_str()) {
            return Err(Error::Validation(format!("duplicate node id {}", node.id)));
        }
    }
    Ok(())
}

fn check_edges_reference_existing_nodes(graph: &Graph) -> Result<(), Error> {
    let ids: HashSet<&str> = graph.nodes.iter().map(|n| n.id.as_str()).collect();
    for edge in &graph.edges {
        if !ids.contains(edge.source.as_str()) {
            return Err(Error::Validation(format!(
                "edge {} references unknown source node {}",
                edge.id, edge.source
            )));
        }
        if !ids.contains(edge.target.as_str()) {
            return Err(Error::Validation(format!(
                "edge {} references unknown target node {}",
                edge.id, edge.target
            )));
        }
    }
    Ok(())
}

/// Depth-first cycle detection via `petgraph::algo::toposort`: any back
/// edge to a vertex on the recursion stack surfaces as `Err` carrying the
/// offending node.
fn check_no_cycles(graph: &Graph) -> Result<(), Error> {
    let mut g: DiGraphMap<&str, ()> = DiGraphMap::new();
    for node in &graph.nodes {
        g.add_node(node.id.as_str());
    }
    for edge in &graph.edges {
        g.add_edge(edge.source.as_str(), edge.target.as_str(), ());
    }
    toposort(&g, None).map_err(|cycle| Error::GraphCycle {
        node_id: cycle.node_id().to_string(),
    })?;
    Ok(())
}

/// Exactly one trigger-typed node is required unless the caller supplied
/// explicit entry points (the sub-graph case, spec §4.1 step 2).
fn check_single_trigger(graph: &Graph) -> Result<String, Error> {
    let triggers: Vec<&str> = graph
        .nodes
        .iter()
        .filter(|n| n.is_trigger())
        .map(|n| n.id.as_str())
        .collect();
    match triggers.as_slice() {
        [only] => Ok((*only).to_string()),
        other => Err(Error::BadTriggerCount { count: other.len() }),
    }
}

/// Breadth-first search from the entry points plus the transitive closure
/// of `parent_id` (spec §4.1 step 3): any non-parented node not reached
/// is isolated.
fn check_reachability(graph: &Graph, entry_points: &[String]) -> Result<(), Error> {
    let mut g: DiGraphMap<&str, ()> = DiGraphMap::new();
    for node in &graph.nodes {
        g.add_node(node.id.as_str());
    }
    for edge in &graph.edges {
        g.add_edge(edge.source.as_str(), edge.target.as_str(), ());
    }

    let mut reached: HashSet<&str> = HashSet::new();
    for entry in entry_points {
        let mut bfs = petgraph::visit::Bfs::new(&g, entry.as_str());
        while let Some(visited) = petgraph::visit::Walker::walk_next(&mut bfs, &g) {
            reached.insert(visited);
        }
        reached.insert(entry.as_str());
    }

    // A node parented (directly or transitively) under a reached node is
    // exempt from the direct-reachability requirement: loop bodies are
    // only reachable through the loop node's own iteration logic.
    let mut parent_of: std::collections::HashMap<&str, &str> = std::collections::HashMap::new();
    for node in &graph.nodes {
        if let Some(parent) = &node.parent_id {
            parent_of.insert(node.id.as_str(), parent.as_str());
        }
    }
    let has_reached_ancestor = |mut id: &str| -> bool {
        let mut hops = 0;
        while let Some(&parent) = parent_of.get(id) {
            if reached.contains(parent) {
                return true;
            }
            id = parent;
            hops += 1;
            if hops > graph.nodes.len() {
                break; // defensive: malformed parent cycle, not our concern here
            }
        }
        false
    };

    for node in &graph.nodes {
        if node.parent_id.is_some() {
            continue;
        }
        if !reached.contains(node.id.as_str()) && !has_reached_ancestor(&node.id) {
            return Err(Error::IsolatedNode {
                node_id: node.id.clone(),
            });
        }
    }
    Ok(())
}
